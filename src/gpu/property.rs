//! Per-particle property pass.
//!
//! Writes the normalised local speed of each particle's front position,
//! blended with its previous value by `property_smoothing`, into the back
//! property texture. Rendering reads it to pick a ramp colour; advection
//! never does.

use super::params::PassBindings;
use super::particle_state::ParticleStateStore;
use super::{draw_fullscreen, fullscreen_pipeline, shaders, GpuContext, STATE_FORMAT};
use crate::error::GpuError;

pub struct PropertyPass {
    pipeline: wgpu::RenderPipeline,
}

impl PropertyPass {
    pub fn new(ctx: &GpuContext, bindings: &PassBindings) -> Result<Self, GpuError> {
        let module = ctx.validated("Property Shader", |device| {
            shaders::create_module(device, "Property Shader", shaders::property_shader())
        })?;
        let pipeline = fullscreen_pipeline(
            ctx,
            "Property Pipeline",
            &module,
            "fs_property",
            &[bindings.field_layout(), bindings.state_layout()],
            STATE_FORMAT,
            None,
        )?;
        Ok(Self { pipeline })
    }

    pub fn encode(&self, encoder: &mut wgpu::CommandEncoder, bindings: &PassBindings, state: &ParticleStateStore) {
        draw_fullscreen(
            encoder,
            "Property Pass",
            &self.pipeline,
            &[bindings.field_group(), bindings.state_group(state.front_slot())],
            &state.properties().back().view,
        );
    }
}
