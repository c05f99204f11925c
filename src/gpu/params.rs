//! Uniforms and bind groups shared by the advection and property passes.
//!
//! Group 0 holds the [`FieldParams`] uniform and the two bracketing field
//! textures; it is rebuilt only when the timeline moves to a new pair of
//! textures. Group 1 holds the front particle state textures and has one
//! precreated variant per ping-pong slot.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::field_gpu::FieldTexture;
use super::particle_state::ParticleStateStore;
use super::{texture_entry, uniform_entry, GpuContext};
use crate::error::GpuError;
use crate::field::ValueRange;
use crate::kernel::{StepParams, DISPLACEMENT_SCALE};
use crate::timeline::TimelinePair;

/// Uniform block mirrored by `FieldParams` in `field.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct FieldParams {
    /// `(u_min, v_min, u_max, v_max)` of the current frame.
    pub current_range: [f32; 4],
    pub next_range: [f32; 4],
    /// `(speed_min, speed_span, blend, rand_seed)`.
    pub speed: [f32; 4],
    /// `(speed_factor, drop_rate, drop_rate_bump, dt * DISPLACEMENT_SCALE)`.
    pub motion: [f32; 4],
    /// Layers of the current and next frame.
    pub layers: [u32; 4],
    /// `x` is the property smoothing weight.
    pub property: [f32; 4],
}

fn range_vec(u: ValueRange, v: ValueRange) -> [f32; 4] {
    [u.min, v.min, u.max, v.max]
}

impl FieldParams {
    pub fn new(pair: &TimelinePair<'_>, step: &StepParams, property_smoothing: f32) -> Self {
        let speed = pair.speed_range();
        Self {
            current_range: range_vec(pair.current.field.u, pair.current.field.v),
            next_range: range_vec(pair.next.field.u, pair.next.field.v),
            speed: [speed.min, speed.span(), pair.blend, step.rand_seed],
            motion: [
                step.speed_factor,
                step.drop_rate,
                step.drop_rate_bump,
                step.dt * DISPLACEMENT_SCALE,
            ],
            layers: [pair.current.layer, pair.next.layer, 0, 0],
            property: [property_smoothing, 0.0, 0.0, 0.0],
        }
    }
}

/// Params buffer plus the bind groups of both particle passes.
pub struct PassBindings {
    params_buffer: wgpu::Buffer,
    field_layout: wgpu::BindGroupLayout,
    state_layout: wgpu::BindGroupLayout,
    /// Indexed by the state store's front slot.
    state_groups: [wgpu::BindGroup; 2],
    /// Field group and the `(current, next)` texture indices it binds.
    field_group: ((usize, usize), wgpu::BindGroup),
}

impl PassBindings {
    /// `textures` must not be empty; group 0 starts out binding texture 0
    /// as both frames.
    pub fn new(ctx: &GpuContext, state: &ParticleStateStore, textures: &[FieldTexture]) -> Result<Self, GpuError> {
        let device = &ctx.device;
        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Field Params Buffer"),
            contents: bytemuck::bytes_of(&FieldParams::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let fragment = wgpu::ShaderStages::FRAGMENT;
        let field_layout = ctx.validated("Field Bind Group Layout", |device| {
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Field Bind Group Layout"),
                entries: &[
                    uniform_entry(0, fragment),
                    texture_entry(1, fragment),
                    texture_entry(2, fragment),
                ],
            })
        })?;
        let state_layout = ctx.validated("State Bind Group Layout", |device| {
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("State Bind Group Layout"),
                entries: &[texture_entry(0, fragment), texture_entry(1, fragment)],
            })
        })?;

        let state_group = |slot: usize| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("State Bind Group {slot}")),
                layout: &state_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&state.positions().slots()[slot].view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&state.properties().slots()[slot].view),
                    },
                ],
            })
        };
        let state_groups = [state_group(0), state_group(1)];
        let field_group = create_field_group(device, &field_layout, &params_buffer, textures, (0, 0));

        Ok(Self {
            params_buffer,
            field_layout,
            state_layout,
            state_groups,
            field_group: ((0, 0), field_group),
        })
    }

    pub fn field_layout(&self) -> &wgpu::BindGroupLayout {
        &self.field_layout
    }

    pub fn state_layout(&self) -> &wgpu::BindGroupLayout {
        &self.state_layout
    }

    /// Upload this frame's parameters.
    pub fn write_params(&self, queue: &wgpu::Queue, params: &FieldParams) {
        queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(params));
    }

    /// Point group 0 at the `(current, next)` field textures.
    ///
    /// The bind group is only rebuilt when the pair changes.
    pub fn bind_fields(&mut self, device: &wgpu::Device, textures: &[FieldTexture], pair: (usize, usize)) {
        if self.field_group.0 != pair {
            log::debug!("binding field textures {pair:?}");
            let group = create_field_group(device, &self.field_layout, &self.params_buffer, textures, pair);
            self.field_group = (pair, group);
        }
    }

    /// Group 0 for the most recently bound field pair.
    pub fn field_group(&self) -> &wgpu::BindGroup {
        &self.field_group.1
    }

    /// State bind group reading the slot currently in front.
    pub fn state_group(&self, front_slot: usize) -> &wgpu::BindGroup {
        &self.state_groups[front_slot]
    }
}

fn create_field_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    params_buffer: &wgpu::Buffer,
    textures: &[FieldTexture],
    (current, next): (usize, usize),
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Field Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: params_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&textures[current].view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(&textures[next].view),
            },
        ],
    })
}
