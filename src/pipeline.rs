//! The per-frame orchestrator.
//!
//! [`WindPipeline`] owns every GPU resource of one visualisation and runs a
//! frame in a single command encoder:
//!
//! 1. advance the [`FieldTimeline`] and upload the frame's [`FieldParams`];
//! 2. advection (front positions → back positions);
//! 3. property update (front → back);
//! 4. swap particle state;
//! 5. trail fade and particle draw, trail swap, composite onto the target.
//!
//! ```ignore
//! let ctx = GpuContext::headless()?;
//! let fields = FieldEncoder::encode_series(&samples)?;
//! let mut pipeline = WindPipeline::new(&ctx, fields, WindConfig::default(), &ColorRamp::default(),
//!     wgpu::TextureFormat::Rgba8Unorm, 512, 256)?;
//! pipeline.advance_and_render(&ctx, 1.0 / 60.0, &target_view);
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::WindConfig;
use crate::error::{ConfigError, Error, FieldError};
use crate::field::EncodedField;
use crate::gpu::advection::AdvectionPass;
use crate::gpu::particle_state::ParticleStateStore;
use crate::gpu::property::PropertyPass;
use crate::gpu::trails::TrailCompositor;
use crate::gpu::{FieldParams, FieldTexture, GpuContext, PassBindings};
use crate::kernel::StepParams;
use crate::ramp::ColorRamp;
use crate::timeline::FieldTimeline;

pub struct WindPipeline {
    config: WindConfig,
    timeline: FieldTimeline,
    field_textures: Vec<FieldTexture>,
    state: ParticleStateStore,
    bindings: PassBindings,
    advection: AdvectionPass,
    property: PropertyPass,
    trails: TrailCompositor,
    rng: StdRng,
    frame: u64,
}

impl WindPipeline {
    /// Validate `config`, upload `fields` and build every pass.
    ///
    /// The trail buffers are `width×height`; the target passed to
    /// [`advance_and_render`](Self::advance_and_render) must use
    /// `target_format`.
    pub fn new(
        ctx: &GpuContext,
        fields: Vec<EncodedField>,
        config: WindConfig,
        ramp: &ColorRamp,
        target_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Result<Self, Error> {
        config.validate()?;
        if fields.is_empty() {
            return Err(FieldError::EmptyInput.into());
        }

        let timeline = FieldTimeline::new(fields, config.animation_speed, config.loop_mode);
        let field_textures = FieldTexture::upload_all(ctx, timeline.fields())?;

        let mut rng = StdRng::seed_from_u64(config.seed);
        let state = ParticleStateStore::new(ctx, config.num_particles, &mut rng)?;
        let bindings = PassBindings::new(ctx, &state, &field_textures)?;
        let advection = AdvectionPass::new(ctx, &bindings)?;
        let property = PropertyPass::new(ctx, &bindings)?;
        let trails = TrailCompositor::new(
            ctx,
            &state,
            ramp,
            config.fade_opacity,
            config.clear_color(),
            target_format,
            width,
            height,
        )?;

        log::info!(
            "wind pipeline ready: {} frame(s), {} particles",
            timeline.frame_count(),
            state.particle_count()
        );

        Ok(Self {
            config,
            timeline,
            field_textures,
            state,
            bindings,
            advection,
            property,
            trails,
            rng,
            frame: 0,
        })
    }

    /// Step the simulation by `dt` seconds and draw onto `target`.
    ///
    /// The per-frame random seed is drawn from the pipeline's seeded RNG.
    pub fn advance_and_render(&mut self, ctx: &GpuContext, dt: f32, target: &wgpu::TextureView) {
        let seed = self.rng.gen::<f32>();
        self.advance_and_render_seeded(ctx, dt, seed, target);
    }

    /// As [`advance_and_render`](Self::advance_and_render) with an explicit
    /// random seed for the respawn draws.
    pub fn advance_and_render_seeded(&mut self, ctx: &GpuContext, dt: f32, seed: f32, target: &wgpu::TextureView) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.timeline.advance(dt);

        let pair = self.timeline.current_pair();
        let step = StepParams {
            speed_factor: self.config.speed_factor,
            drop_rate: self.config.drop_rate,
            drop_rate_bump: self.config.drop_rate_bump,
            dt,
            rand_seed: seed,
        };
        let params = FieldParams::new(&pair, &step, self.config.property_smoothing);
        let textures = (pair.current.field_index, pair.next.field_index);
        self.bindings.write_params(&ctx.queue, &params);
        self.bindings.bind_fields(&ctx.device, &self.field_textures, textures);

        let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Wind Frame Encoder"),
        });
        self.advection.encode(&mut encoder, &self.bindings, &self.state);
        self.property.encode(&mut encoder, &self.bindings, &self.state);
        self.state.swap();
        self.trails.render_frame(&mut encoder, &self.state, target);
        ctx.queue.submit(std::iter::once(encoder.finish()));

        self.frame += 1;
        if self.frame % 600 == 0 {
            let (index, blend) = self.timeline.cursor();
            log::debug!("frame {}: timeline at {index} + {blend:.2}", self.frame);
        }
    }

    /// Fade the trails and composite without moving particles.
    pub fn render_paused(&mut self, ctx: &GpuContext, target: &wgpu::TextureView) {
        let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Wind Paused Encoder"),
        });
        self.trails.fade_frame(&mut encoder);
        self.trails.composite(&mut encoder, target);
        ctx.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Resize the trail buffers, discarding trail history.
    pub fn resize(&mut self, ctx: &GpuContext, width: u32, height: u32) -> Result<(), Error> {
        self.trails.resize(ctx, width, height)?;
        Ok(())
    }

    /// Change the per-frame trail fade, keeping it inside `(0, 1)`.
    pub fn set_fade_opacity(&mut self, ctx: &GpuContext, fade_opacity: f32) -> Result<(), ConfigError> {
        self.trails.set_fade_opacity(&ctx.queue, fade_opacity)?;
        self.config.fade_opacity = fade_opacity;
        Ok(())
    }

    /// Scatter particles, clear trails and rewind the timeline.
    pub fn reset(&mut self, ctx: &GpuContext) {
        self.state.reseed(ctx, &mut self.rng);
        self.trails.clear(ctx);
        self.timeline.reset();
        log::info!("pipeline reset");
    }

    pub fn config(&self) -> &WindConfig {
        &self.config
    }

    pub fn timeline(&self) -> &FieldTimeline {
        &self.timeline
    }

    pub fn particles(&self) -> &ParticleStateStore {
        &self.state
    }

    pub fn trails(&self) -> &TrailCompositor {
        &self.trails
    }

    /// Frames rendered since construction.
    pub fn frame(&self) -> u64 {
        self.frame
    }
}
