//! # windtrail
//!
//! GPU wind-particle trails driven by gridded vector fields.
//!
//! A vector field (one `u` and one `v` component per grid cell, optionally
//! over several time steps) is quantised into textures. Particle state lives
//! entirely in textures too: every frame a fragment pass moves each
//! particle through the time-interpolated field, a second pass records its
//! normalised speed, and the particles are drawn as points into a fading
//! trail buffer that is finally composited onto the caller's target.
//!
//! ## Quick Start
//!
//! ```ignore
//! use windtrail::prelude::*;
//!
//! let dataset = FieldDataset::double_gyre(128, 64, 4);
//! let fields = FieldEncoder::encode_series(&dataset.samples()?)?;
//!
//! let ctx = GpuContext::headless()?;
//! let target = OffscreenTarget::new(&ctx, 1024, 512)?;
//! let mut pipeline = WindPipeline::new(
//!     &ctx,
//!     fields,
//!     WindConfig::default().with_particle_count(65_536),
//!     &ColorRamp::palette(Palette::Wind),
//!     OFFSCREEN_FORMAT,
//!     1024,
//!     512,
//! )?;
//!
//! for _ in 0..300 {
//!     pipeline.advance_and_render(&ctx, 1.0 / 60.0, &target.view);
//! }
//! target.to_image(&ctx)?.save("wind.png")?;
//! ```
//!
//! ## Modules
//!
//! | Concern | Module |
//! |---------|--------|
//! | Encoding samples into textures | [`field`] |
//! | Animation over time steps | [`timeline`] |
//! | Per-particle maths on the CPU | [`kernel`] |
//! | GPU passes and particle state | [`gpu`] |
//! | Frame orchestration | [`pipeline`] |
//! | Colour ramps | [`ramp`] |
//! | Settings | [`config`] |

pub mod app;
pub mod config;
pub mod error;
pub mod field;
pub mod gpu;
pub mod kernel;
pub mod offscreen;
pub mod ping_pong;
pub mod pipeline;
pub mod ramp;
pub mod time;
pub mod timeline;

pub use config::WindConfig;
pub use error::{ConfigError, Error, FieldError, GpuError, RampError, Result};
pub use field::{EncodedField, FieldDataset, FieldEncoder, ValueRange, VectorFieldSample};
pub use glam::Vec2;
pub use gpu::particle_state::ParticleStateStore;
pub use gpu::trails::TrailCompositor;
pub use gpu::GpuContext;
pub use offscreen::{OffscreenTarget, OFFSCREEN_FORMAT};
pub use ping_pong::PingPong;
pub use pipeline::WindPipeline;
pub use ramp::{ColorRamp, Palette};
pub use timeline::{FieldTimeline, LoopMode, TimelinePair};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::WindConfig;
    pub use crate::field::{FieldDataset, FieldEncoder, VectorFieldSample};
    pub use crate::gpu::GpuContext;
    pub use crate::offscreen::{OffscreenTarget, OFFSCREEN_FORMAT};
    pub use crate::pipeline::WindPipeline;
    pub use crate::ramp::{ColorRamp, Palette};
    pub use crate::timeline::{FieldTimeline, LoopMode};
    pub use crate::Vec2;
}
