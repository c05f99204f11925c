//! Pipeline construction parameters.
//!
//! [`WindConfig`] can be built in code with `with_*` methods or loaded from
//! JSON. Missing JSON keys take the defaults below.
//!
//! ```json
//! {
//!     "num_particles": 65536,
//!     "animation_speed": 10.0,
//!     "fade_opacity": 0.996,
//!     "palette": "viridis"
//! }
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::ramp::Palette;
use crate::timeline::LoopMode;

/// Configuration for a [`WindPipeline`](crate::WindPipeline).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WindConfig {
    /// Desired particle count, rounded up to the next perfect square.
    pub num_particles: u32,
    /// Seconds spent on each dataset time step.
    pub animation_speed: f32,
    /// Per-frame trail opacity in `(0, 1)`; higher keeps trails longer.
    pub fade_opacity: f32,
    /// Velocity multiplier for advection.
    pub speed_factor: f32,
    /// Base per-frame probability of respawning a particle.
    pub drop_rate: f32,
    /// Extra respawn probability at full normalised speed.
    pub drop_rate_bump: f32,
    /// Weight of the new speed in the property update, in `(0, 1]`.
    pub property_smoothing: f32,
    /// Behaviour after the last time step.
    pub loop_mode: LoopMode,
    /// Seed for initial particle state and per-frame random draws.
    pub seed: u64,
    /// Clear colour behind the trails; `None` draws over existing content.
    pub background: Option<[f64; 4]>,
    /// Built-in palette used when no ramp is supplied.
    pub palette: Palette,
}

impl Default for WindConfig {
    fn default() -> Self {
        Self {
            num_particles: 65_536,
            animation_speed: 10.0,
            fade_opacity: 0.99,
            speed_factor: 0.8,
            drop_rate: 0.005,
            drop_rate_bump: 0.02,
            property_smoothing: 1.0,
            loop_mode: LoopMode::Loop,
            seed: 0,
            background: Some([0.0, 0.0, 0.0, 1.0]),
            palette: Palette::Wind,
        }
    }
}

impl WindConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and validate a JSON configuration file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: WindConfig = serde_json::from_str(&text)?;
        config.validate()?;
        log::info!("loaded config from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn with_particle_count(mut self, count: u32) -> Self {
        self.num_particles = count;
        self
    }

    pub fn with_animation_speed(mut self, seconds: f32) -> Self {
        self.animation_speed = seconds;
        self
    }

    pub fn with_fade_opacity(mut self, opacity: f32) -> Self {
        self.fade_opacity = opacity;
        self
    }

    pub fn with_speed_factor(mut self, factor: f32) -> Self {
        self.speed_factor = factor;
        self
    }

    /// Set base and speed-dependent respawn rates.
    pub fn with_drop_rate(mut self, rate: f32, bump: f32) -> Self {
        self.drop_rate = rate;
        self.drop_rate_bump = bump;
        self
    }

    pub fn with_property_smoothing(mut self, smoothing: f32) -> Self {
        self.property_smoothing = smoothing;
        self
    }

    pub fn with_loop_mode(mut self, mode: LoopMode) -> Self {
        self.loop_mode = mode;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_background(mut self, rgba: Option<[f64; 4]>) -> Self {
        self.background = rgba;
        self
    }

    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    /// Check every parameter range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
            ConfigError::Invalid {
                field,
                reason: reason.into(),
            }
        }

        if self.num_particles == 0 {
            return Err(invalid("num_particles", "must be at least 1"));
        }
        if !(self.animation_speed.is_finite() && self.animation_speed > 0.0) {
            return Err(invalid("animation_speed", "must be a positive number of seconds"));
        }
        check_fade_opacity(self.fade_opacity)?;
        if !self.speed_factor.is_finite() {
            return Err(invalid("speed_factor", "must be finite"));
        }
        if !(0.0..=1.0).contains(&self.drop_rate) {
            return Err(invalid("drop_rate", format!("{} is outside [0, 1]", self.drop_rate)));
        }
        if !(0.0..=1.0).contains(&self.drop_rate_bump) {
            return Err(invalid(
                "drop_rate_bump",
                format!("{} is outside [0, 1]", self.drop_rate_bump),
            ));
        }
        if !(self.property_smoothing > 0.0 && self.property_smoothing <= 1.0) {
            return Err(invalid(
                "property_smoothing",
                format!("{} is outside (0, 1]", self.property_smoothing),
            ));
        }
        Ok(())
    }

    pub(crate) fn clear_color(&self) -> Option<wgpu::Color> {
        self.background.map(|[r, g, b, a]| wgpu::Color { r, g, b, a })
    }
}

/// `fade_opacity` must lie strictly inside `(0, 1)`.
pub(crate) fn check_fade_opacity(fade_opacity: f32) -> Result<(), ConfigError> {
    if fade_opacity > 0.0 && fade_opacity < 1.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field: "fade_opacity",
            reason: format!("{fade_opacity} is outside (0, 1)"),
        })
    }
}
