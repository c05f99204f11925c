//! Frame timing for hosts driving a [`WindPipeline`](crate::WindPipeline).
//!
//! The pipeline takes `dt` explicitly; [`FrameClock`] produces it from wall
//! time with pause, time scale, a fixed-step mode for recordings, and a cap
//! so a stalled frame does not fling particles across the field.
//!
//! # Example
//!
//! ```ignore
//! let mut clock = FrameClock::new();
//! // once per redraw:
//! let dt = clock.tick();
//! if clock.is_paused() {
//!     pipeline.render_paused(&ctx, &view);
//! } else {
//!     pipeline.advance_and_render(&ctx, dt, &view);
//! }
//! ```

use std::time::{Duration, Instant};

/// Longest step handed to the pipeline, in seconds.
pub const MAX_DELTA: f32 = 0.1;

#[derive(Debug)]
pub struct FrameClock {
    last_frame: Instant,
    frame_count: u64,
    fps: f32,
    fps_frame_count: u64,
    fps_update_time: Instant,
    fps_update_interval: Duration,
    paused: bool,
    /// Fixed step used instead of wall time, if set.
    fixed_delta: Option<f32>,
    time_scale: f32,
}

impl FrameClock {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            last_frame: now,
            frame_count: 0,
            fps: 0.0,
            fps_frame_count: 0,
            fps_update_time: now,
            fps_update_interval: Duration::from_millis(500),
            paused: false,
            fixed_delta: None,
            time_scale: 1.0,
        }
    }

    /// Advance one frame and return the step in seconds.
    ///
    /// Returns 0 while paused.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let raw_delta = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.frame_count += 1;

        let fps_elapsed = now.duration_since(self.fps_update_time);
        if fps_elapsed >= self.fps_update_interval {
            let frames_since = self.frame_count - self.fps_frame_count;
            self.fps = frames_since as f32 / fps_elapsed.as_secs_f32();
            self.fps_frame_count = self.frame_count;
            self.fps_update_time = now;
        }

        if self.paused {
            return 0.0;
        }
        self.fixed_delta.unwrap_or(raw_delta.min(MAX_DELTA)) * self.time_scale
    }

    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[inline]
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
        log::info!("{}", if self.paused { "paused" } else { "resumed" });
    }

    /// Use `delta` seconds per tick regardless of wall time; `None` restores
    /// real timing.
    pub fn set_fixed_delta(&mut self, delta: Option<f32>) {
        self.fixed_delta = delta;
    }

    /// Negative scales clamp to 0.
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
