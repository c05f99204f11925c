//! Animation cursor over the time steps of an encoded dataset.
//!
//! The timeline expands its fields into *frames*: a single-layer field is one
//! frame, a two-layer field contributes one frame per layer. The cursor sits
//! between frame `i` and frame `i + 1` at blend fraction `f`, advancing by
//! `dt / animation_speed` per call.
//!
//! # Example
//!
//! ```ignore
//! let mut timeline = FieldTimeline::new(fields, 10.0, LoopMode::Loop);
//! timeline.advance(25.0);
//! let pair = timeline.current_pair();
//! // pair.current is frame 2, pair.next is frame 0 (wrapped), pair.blend = 0.5
//! ```

use serde::Deserialize;

use crate::field::{EncodedField, ValueRange};

/// What happens when the cursor passes the last frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopMode {
    /// Wrap to the first frame (default).
    #[default]
    Loop,
    /// Stop on the last frame with blend 0.
    Clamp,
}

/// One time step: a field plus the layer (RG = 0, BA = 1) holding it.
#[derive(Debug, Clone, Copy)]
pub struct FieldFrame<'a> {
    pub field: &'a EncodedField,
    pub field_index: usize,
    pub layer: u32,
}

/// Bracketing frames for the current animation position.
#[derive(Debug, Clone, Copy)]
pub struct TimelinePair<'a> {
    pub current: FieldFrame<'a>,
    pub next: FieldFrame<'a>,
    /// Interpolation weight of `next`, in `[0, 1)`.
    pub blend: f32,
}

impl TimelinePair<'_> {
    /// Speed range covering both frames.
    pub fn speed_range(&self) -> ValueRange {
        self.current.field.speed.union(self.next.field.speed)
    }
}

/// Sequence of encoded fields with an animation cursor.
#[derive(Debug, Clone)]
pub struct FieldTimeline {
    fields: Vec<EncodedField>,
    /// `(field index, layer)` for each frame.
    frames: Vec<(usize, u32)>,
    index: usize,
    blend: f32,
    animation_speed: f32,
    loop_mode: LoopMode,
}

impl FieldTimeline {
    /// Create a timeline over `fields`.
    ///
    /// `animation_speed` is the number of seconds spent on each time step.
    ///
    /// # Panics
    ///
    /// Panics if `fields` is empty.
    pub fn new(fields: Vec<EncodedField>, animation_speed: f32, loop_mode: LoopMode) -> Self {
        assert!(!fields.is_empty(), "FieldTimeline needs at least one field");
        let frames = fields
            .iter()
            .enumerate()
            .flat_map(|(i, field)| (0..field.layers.clamp(1, 2)).map(move |layer| (i, layer)))
            .collect();
        Self {
            fields,
            frames,
            index: 0,
            blend: 0.0,
            animation_speed: animation_speed.max(f32::EPSILON),
            loop_mode,
        }
    }

    /// Number of time steps across all fields.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// All encoded fields, in upload order.
    pub fn fields(&self) -> &[EncodedField] {
        &self.fields
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.loop_mode
    }

    pub fn animation_speed(&self) -> f32 {
        self.animation_speed
    }

    /// Current `(frame index, blend fraction)`.
    pub fn cursor(&self) -> (usize, f32) {
        (self.index, self.blend)
    }

    /// Move the cursor forward by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        let count = self.frames.len();
        if count == 1 || !dt.is_finite() || dt <= 0.0 {
            return;
        }
        if self.loop_mode == LoopMode::Clamp && self.index == count - 1 {
            return;
        }

        let total = f64::from(self.blend) + f64::from(dt) / f64::from(self.animation_speed);
        let steps = total.floor();
        match self.loop_mode {
            LoopMode::Loop => {
                let skip = (steps % count as f64) as usize;
                self.index = (self.index + skip) % count;
                self.blend = (total - steps) as f32;
            }
            LoopMode::Clamp => {
                let remaining = (count - 1 - self.index) as f64;
                if steps >= remaining {
                    self.index = count - 1;
                    self.blend = 0.0;
                } else {
                    self.index += steps as usize;
                    self.blend = (total - steps) as f32;
                }
            }
        }
        // Narrowing `total - steps` to f32 can round up to 1.
        self.blend = self.blend.min(1.0 - f32::EPSILON / 2.0);
    }

    /// Jump to `index` with blend 0.
    pub fn seek(&mut self, index: usize) {
        self.index = index.min(self.frames.len() - 1);
        self.blend = 0.0;
    }

    /// Return to the first frame.
    pub fn reset(&mut self) {
        self.seek(0);
    }

    fn frame(&self, index: usize) -> FieldFrame<'_> {
        let (field_index, layer) = self.frames[index];
        FieldFrame {
            field: &self.fields[field_index],
            field_index,
            layer,
        }
    }

    /// The frames bracketing the cursor and the blend between them.
    pub fn current_pair(&self) -> TimelinePair<'_> {
        let count = self.frames.len();
        let next = match self.loop_mode {
            LoopMode::Loop => (self.index + 1) % count,
            LoopMode::Clamp => (self.index + 1).min(count - 1),
        };
        TimelinePair {
            current: self.frame(self.index),
            next: self.frame(next),
            blend: if count == 1 { 0.0 } else { self.blend },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldEncoder, VectorFieldSample};

    fn fields(count: usize) -> Vec<EncodedField> {
        let samples: Vec<_> = (0..count)
            .map(|i| VectorFieldSample::uniform(i as f32, 0.0, 2, 2))
            .collect();
        FieldEncoder::encode_series(&samples).unwrap()
    }

    #[test]
    fn test_advance_wraps_over_three_steps() {
        let mut timeline = FieldTimeline::new(fields(3), 10.0, LoopMode::Loop);
        timeline.advance(25.0);
        let (index, blend) = timeline.cursor();
        assert_eq!(index, 2);
        assert!((blend - 0.5).abs() < 1e-6);

        let pair = timeline.current_pair();
        assert_eq!(pair.current.field_index, 2);
        assert_eq!(pair.next.field_index, 0);
    }

    #[test]
    fn test_advance_accumulates_small_steps() {
        let mut timeline = FieldTimeline::new(fields(3), 1.0, LoopMode::Loop);
        for _ in 0..10 {
            timeline.advance(0.25);
        }
        let (index, blend) = timeline.cursor();
        assert_eq!(index, 2);
        assert!((blend - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_loop_wraps_to_start() {
        let mut timeline = FieldTimeline::new(fields(3), 1.0, LoopMode::Loop);
        timeline.advance(3.25);
        let (index, blend) = timeline.cursor();
        assert_eq!(index, 0);
        assert!((blend - 0.25).abs() < 1e-5);
    }

    #[test]
    fn test_clamp_stops_on_last_frame() {
        let mut timeline = FieldTimeline::new(fields(3), 1.0, LoopMode::Clamp);
        timeline.advance(10.0);
        assert_eq!(timeline.cursor(), (2, 0.0));

        let pair = timeline.current_pair();
        assert_eq!(pair.current.field_index, 2);
        assert_eq!(pair.next.field_index, 2);

        timeline.advance(0.5);
        assert_eq!(timeline.cursor(), (2, 0.0));
    }

    #[test]
    fn test_single_step_never_blends() {
        let mut timeline = FieldTimeline::new(fields(1), 1.0, LoopMode::Loop);
        timeline.advance(7.3);
        let pair = timeline.current_pair();
        assert_eq!(pair.blend, 0.0);
        assert!(std::ptr::eq(pair.current.field, pair.next.field));
        assert_eq!(timeline.cursor(), (0, 0.0));
    }

    #[test]
    fn test_two_layer_field_yields_two_frames() {
        let a = VectorFieldSample::uniform(0.0, 0.0, 2, 2);
        let b = VectorFieldSample::uniform(1.0, 0.0, 2, 2);
        let field = FieldEncoder::encode(&[a, b]).unwrap();
        let mut timeline = FieldTimeline::new(vec![field], 2.0, LoopMode::Loop);
        assert_eq!(timeline.frame_count(), 2);

        timeline.advance(1.0);
        let pair = timeline.current_pair();
        assert_eq!(pair.current.layer, 0);
        assert_eq!(pair.next.layer, 1);
        assert!((pair.blend - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_seek_and_reset() {
        let mut timeline = FieldTimeline::new(fields(4), 1.0, LoopMode::Loop);
        timeline.advance(1.5);
        timeline.seek(3);
        assert_eq!(timeline.cursor(), (3, 0.0));
        timeline.seek(99);
        assert_eq!(timeline.cursor(), (3, 0.0));
        timeline.reset();
        assert_eq!(timeline.cursor(), (0, 0.0));
    }

    #[test]
    fn test_huge_step_returns_promptly() {
        let mut timeline = FieldTimeline::new(fields(3), 1e-6, LoopMode::Loop);
        timeline.advance(20.0);
        let (index, blend) = timeline.cursor();
        assert!(index < 3);
        assert!((0.0..1.0).contains(&blend));

        timeline.advance(f32::MAX);
        let (index, blend) = timeline.cursor();
        assert!(index < 3);
        assert!((0.0..1.0).contains(&blend));
    }

    #[test]
    fn test_whole_cycles_keep_index() {
        let mut timeline = FieldTimeline::new(fields(3), 0.5, LoopMode::Loop);
        timeline.advance(0.75);
        // 3_000 frames is exactly 1_000 cycles.
        timeline.advance(1500.0);
        let (index, blend) = timeline.cursor();
        assert_eq!(index, 1);
        assert!((blend - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_clamp_huge_step_pins_last_frame() {
        let mut timeline = FieldTimeline::new(fields(4), 1e-6, LoopMode::Clamp);
        timeline.advance(1e9);
        assert_eq!(timeline.cursor(), (3, 0.0));
    }

    #[test]
    fn test_non_positive_dt_is_ignored() {
        let mut timeline = FieldTimeline::new(fields(2), 1.0, LoopMode::Loop);
        timeline.advance(-1.0);
        timeline.advance(f32::NAN);
        assert_eq!(timeline.cursor(), (0, 0.0));
    }

    #[test]
    fn test_pair_speed_range_spans_both_frames() {
        let timeline = FieldTimeline::new(fields(3), 1.0, LoopMode::Loop);
        let range = timeline.current_pair().speed_range();
        assert_eq!(range.min, 0.0);
        // Frame 1 holds u = 1 quantised against [0, 2].
        assert!((range.max - 1.0).abs() <= 2.0 / 255.0);
    }
}
