//! Particle advection pass.
//!
//! A fullscreen fragment pass over the `res×res` position texture: every
//! texel decodes its particle, samples the blended field, moves the
//! particle and writes the re-encoded position into the back buffer.
//! [`crate::kernel::advect`] computes the same result on the CPU.

use super::params::PassBindings;
use super::particle_state::ParticleStateStore;
use super::{draw_fullscreen, fullscreen_pipeline, shaders, GpuContext, STATE_FORMAT};
use crate::error::GpuError;

pub struct AdvectionPass {
    pipeline: wgpu::RenderPipeline,
}

impl AdvectionPass {
    pub fn new(ctx: &GpuContext, bindings: &PassBindings) -> Result<Self, GpuError> {
        let module = ctx.validated("Advection Shader", |device| {
            shaders::create_module(device, "Advection Shader", shaders::update_shader())
        })?;
        let pipeline = fullscreen_pipeline(
            ctx,
            "Advection Pipeline",
            &module,
            "fs_update",
            &[bindings.field_layout(), bindings.state_layout()],
            STATE_FORMAT,
            None,
        )?;
        Ok(Self { pipeline })
    }

    /// Encode front → back position update.
    pub fn encode(&self, encoder: &mut wgpu::CommandEncoder, bindings: &PassBindings, state: &ParticleStateStore) {
        draw_fullscreen(
            encoder,
            "Advection Pass",
            &self.pipeline,
            &[bindings.field_group(), bindings.state_group(state.front_slot())],
            &state.positions().back().view,
        );
    }
}
