//! Trail accumulation and compositing.
//!
//! Trails live in two screen-sized `Rgba32Float` textures. Each frame the
//! front texture is copied into the back one scaled by `fade_opacity`, the
//! particles are drawn on top as points, the pair is swapped, and the new
//! front is alpha-blended onto the caller's target. After `k` frames without
//! a redraw a pixel holds `initial * fade_opacity^k`.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::particle_state::ParticleStateStore;
use super::{fullscreen_pipeline, shaders, texture_entry, uniform_entry, GpuContext, TRAIL_FORMAT};
use crate::config::check_fade_opacity;
use crate::error::{ConfigError, GpuError};
use crate::ping_pong::PingPong;
use crate::ramp::{ColorRamp, RAMP_WIDTH};

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct ScreenParams {
    opacity: f32,
    _pad: [f32; 3],
}

impl ScreenParams {
    fn new(opacity: f32) -> Self {
        Self {
            opacity,
            _pad: [0.0; 3],
        }
    }
}

struct TrailTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

fn create_trail_textures(ctx: &GpuContext, width: u32, height: u32) -> Result<PingPong<TrailTexture>, GpuError> {
    let create = |label: &str| -> Result<TrailTexture, GpuError> {
        let texture = ctx.create_texture(
            label,
            width,
            height,
            TRAIL_FORMAT,
            wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::COPY_SRC,
            None,
        )?;
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(TrailTexture { texture, view })
    };
    Ok(PingPong::new(create("Trail Texture A")?, create("Trail Texture B")?))
}

/// Owns the trail buffers and draws the only externally visible output.
pub struct TrailCompositor {
    fade_opacity: f32,
    clear_color: Option<wgpu::Color>,
    width: u32,
    height: u32,
    trails: PingPong<TrailTexture>,

    screen_layout: wgpu::BindGroupLayout,
    fade_params: wgpu::Buffer,
    composite_params: wgpu::Buffer,
    /// Indexed by the slot being read.
    fade_groups: [wgpu::BindGroup; 2],
    composite_groups: [wgpu::BindGroup; 2],
    fade_pipeline: wgpu::RenderPipeline,
    composite_pipeline: wgpu::RenderPipeline,

    draw_pipeline: wgpu::RenderPipeline,
    /// Indexed by the particle state's front slot.
    draw_groups: [wgpu::BindGroup; 2],
    _ramp: wgpu::Texture,
}

impl TrailCompositor {
    /// Create trail buffers of `width×height` compositing onto
    /// `target_format` textures.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ctx: &GpuContext,
        particles: &ParticleStateStore,
        ramp: &ColorRamp,
        fade_opacity: f32,
        clear_color: Option<wgpu::Color>,
        target_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Result<Self, GpuError> {
        let device = &ctx.device;
        let (width, height) = (width.max(1), height.max(1));
        let trails = create_trail_textures(ctx, width, height)?;

        let fragment = wgpu::ShaderStages::FRAGMENT;
        let screen_layout = ctx.validated("Screen Bind Group Layout", |device| {
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Screen Bind Group Layout"),
                entries: &[texture_entry(0, fragment), uniform_entry(1, fragment)],
            })
        })?;
        let fade_params = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Fade Params Buffer"),
            contents: bytemuck::bytes_of(&ScreenParams::new(fade_opacity)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let composite_params = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Composite Params Buffer"),
            contents: bytemuck::bytes_of(&ScreenParams::new(1.0)),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let fade_groups = screen_groups(device, &screen_layout, &trails, &fade_params, "Fade");
        let composite_groups = screen_groups(device, &screen_layout, &trails, &composite_params, "Composite");

        let screen_module = ctx.validated("Screen Shader", |device| {
            shaders::create_module(device, "Screen Shader", shaders::screen_shader())
        })?;
        let fade_pipeline = fullscreen_pipeline(
            ctx,
            "Trail Fade Pipeline",
            &screen_module,
            "fs_screen",
            &[&screen_layout],
            TRAIL_FORMAT,
            None,
        )?;
        let composite_pipeline = fullscreen_pipeline(
            ctx,
            "Trail Composite Pipeline",
            &screen_module,
            "fs_screen",
            &[&screen_layout],
            target_format,
            Some(wgpu::BlendState::ALPHA_BLENDING),
        )?;

        let ramp_texture = ctx.create_texture(
            "Color Ramp Texture",
            RAMP_WIDTH,
            1,
            wgpu::TextureFormat::Rgba8Unorm,
            wgpu::TextureUsages::TEXTURE_BINDING,
            Some(&ramp.pixels),
        )?;
        let ramp_view = ramp_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let vertex = wgpu::ShaderStages::VERTEX;
        let draw_layout = ctx.validated("Draw Bind Group Layout", |device| {
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Draw Bind Group Layout"),
                entries: &[
                    texture_entry(0, vertex),
                    texture_entry(1, vertex),
                    texture_entry(2, vertex),
                ],
            })
        })?;
        let draw_group = |slot: usize| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("Draw Bind Group {slot}")),
                layout: &draw_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&particles.positions().slots()[slot].view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&particles.properties().slots()[slot].view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(&ramp_view),
                    },
                ],
            })
        };
        let draw_groups = [draw_group(0), draw_group(1)];

        let draw_module = ctx.validated("Draw Shader", |device| {
            shaders::create_module(device, "Draw Shader", shaders::draw_shader())
        })?;
        let draw_pipeline = ctx.validated("Particle Draw Pipeline", |device| {
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Particle Draw Pipeline Layout"),
                bind_group_layouts: &[&draw_layout],
                push_constant_ranges: &[],
            });
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Particle Draw Pipeline"),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &draw_module,
                    entry_point: Some("vs_draw"),
                    buffers: &[],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &draw_module,
                    entry_point: Some("fs_draw"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: TRAIL_FORMAT,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::PointList,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        })?;

        log::info!("trail buffers {width}x{height}, fade opacity {fade_opacity}");

        Ok(Self {
            fade_opacity,
            clear_color,
            width,
            height,
            trails,
            screen_layout,
            fade_params,
            composite_params,
            fade_groups,
            composite_groups,
            fade_pipeline,
            composite_pipeline,
            draw_pipeline,
            draw_groups,
            _ramp: ramp_texture,
        })
    }

    pub fn fade_opacity(&self) -> f32 {
        self.fade_opacity
    }

    /// Frames until an undrawn trail pixel halves in intensity.
    pub fn half_life_frames(&self) -> f32 {
        crate::kernel::half_life_frames(self.fade_opacity)
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Change the per-frame fade; takes effect on the next fade.
    ///
    /// Values outside `(0, 1)` are rejected and the current fade is kept.
    pub fn set_fade_opacity(&mut self, queue: &wgpu::Queue, fade_opacity: f32) -> Result<(), ConfigError> {
        check_fade_opacity(fade_opacity)?;
        self.fade_opacity = fade_opacity;
        queue.write_buffer(&self.fade_params, 0, bytemuck::bytes_of(&ScreenParams::new(fade_opacity)));
        Ok(())
    }

    /// Fade, draw `particles`' front state, swap, then composite onto `target`.
    pub fn render_frame(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        particles: &ParticleStateStore,
        target: &wgpu::TextureView,
    ) {
        {
            let mut pass = self.begin_fade(encoder, "Trail Fade And Draw Pass");
            pass.set_pipeline(&self.draw_pipeline);
            pass.set_bind_group(0, &self.draw_groups[particles.front_slot()], &[]);
            pass.draw(0..particles.particle_count(), 0..1);
        }
        self.trails.swap();
        self.composite(encoder, target);
    }

    /// Fade the trails one step without drawing particles.
    pub fn fade_frame(&mut self, encoder: &mut wgpu::CommandEncoder) {
        drop(self.begin_fade(encoder, "Trail Fade Pass"));
        self.trails.swap();
    }

    /// Alpha-blend the front trail buffer onto `target`.
    ///
    /// With a clear colour the target is cleared first; otherwise the
    /// trails are drawn over its existing content.
    pub fn composite(&self, encoder: &mut wgpu::CommandEncoder, target: &wgpu::TextureView) {
        let load = match self.clear_color {
            Some(color) => wgpu::LoadOp::Clear(color),
            None => wgpu::LoadOp::Load,
        };
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Trail Composite Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.composite_pipeline);
        pass.set_bind_group(0, &self.composite_groups[self.trails.front_slot()], &[]);
        pass.draw(0..3, 0..1);
    }

    /// Render pass writing the faded front buffer into the back buffer.
    fn begin_fade<'e>(&self, encoder: &'e mut wgpu::CommandEncoder, label: &str) -> wgpu::RenderPass<'e> {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.trails.back().view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.fade_pipeline);
        pass.set_bind_group(0, &self.fade_groups[self.trails.front_slot()], &[]);
        pass.draw(0..3, 0..1);
        pass
    }

    /// Recreate the trail buffers at a new size. History is discarded
    /// unless the size is unchanged or either side is 0.
    pub fn resize(&mut self, ctx: &GpuContext, width: u32, height: u32) -> Result<(), GpuError> {
        // A zero extent means a minimised window; keep the history.
        if width == 0 || height == 0 || (width, height) == (self.width, self.height) {
            return Ok(());
        }
        let trails = create_trail_textures(ctx, width, height)?;
        self.fade_groups = screen_groups(&ctx.device, &self.screen_layout, &trails, &self.fade_params, "Fade");
        self.composite_groups = screen_groups(
            &ctx.device,
            &self.screen_layout,
            &trails,
            &self.composite_params,
            "Composite",
        );
        self.trails = trails;
        self.width = width;
        self.height = height;
        log::debug!("resized trail buffers to {width}x{height}");
        Ok(())
    }

    /// Erase all trail history.
    pub fn clear(&mut self, ctx: &GpuContext) {
        let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Trail Clear Encoder"),
        });
        for trail in self.trails.slots() {
            encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Trail Clear Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &trail.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }
        ctx.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Front accumulation buffer as RGBA floats, row-major.
    pub fn read_accumulation(&self, ctx: &GpuContext) -> Result<Vec<[f32; 4]>, GpuError> {
        let bytes = ctx.read_texture(&self.trails.front().texture)?;
        Ok(bytemuck::pod_collect_to_vec(&bytes))
    }
}

fn screen_groups(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    trails: &PingPong<TrailTexture>,
    params: &wgpu::Buffer,
    name: &str,
) -> [wgpu::BindGroup; 2] {
    let group = |slot: usize| {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{name} Bind Group {slot}")),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&trails.slots()[slot].view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: params.as_entire_binding(),
                },
            ],
        })
    };
    [group(0), group(1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_params_is_one_vec4() {
        assert_eq!(std::mem::size_of::<ScreenParams>(), 16);
    }
}
