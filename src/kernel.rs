//! CPU mirror of the per-particle shader functions.
//!
//! Every GPU pass is a pure function of its inputs. The functions here
//! compute the same results on the CPU so readback data can be decoded and
//! each contract can be checked without a GPU. They follow the WGSL in
//! `gpu/shaders/` operation for operation; keep both in step.

use glam::Vec2;

use crate::field::{EncodedField, ValueRange};
use crate::timeline::TimelinePair;

/// Distance travelled per unit velocity per second, in field widths.
pub const DISPLACEMENT_SCALE: f32 = 0.006;

const RAND_A: f32 = 12.9898;
const RAND_B: f32 = 78.233;
const RAND_C: f32 = 4375.85453;

/// Per-frame inputs of the advection step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepParams {
    pub speed_factor: f32,
    pub drop_rate: f32,
    pub drop_rate_bump: f32,
    /// Seconds covered by this step.
    pub dt: f32,
    pub rand_seed: f32,
}

/// Result of advancing one particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleStep {
    pub position: Vec2,
    pub respawned: bool,
}

#[inline]
fn fract(v: Vec2) -> Vec2 {
    v - v.floor()
}

#[inline]
fn unorm(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Pack a position in `[0, 1)²` into RGBA8, 16 bits per coordinate.
///
/// RG hold the low bytes, BA the high bytes.
pub fn encode_position(pos: Vec2) -> [u8; 4] {
    let scaled = pos * 255.0;
    let low = fract(scaled);
    let high = scaled.floor() / 255.0;
    [unorm(low.x), unorm(low.y), unorm(high.x), unorm(high.y)]
}

/// Unpack a position written by [`encode_position`] or the update shader.
pub fn decode_position(texel: [u8; 4]) -> Vec2 {
    let [r, g, b, a] = texel.map(|c| c as f32 / 255.0);
    Vec2::new(r / 255.0 + b, g / 255.0 + a)
}

fn field_texel(field: &EncodedField, layer: u32, x: i32, y: i32) -> Vec2 {
    let x = x.clamp(0, field.width as i32 - 1) as u32;
    let y = y.clamp(0, field.height as i32 - 1) as u32;
    let [u, v] = field.texel(x, y, layer);
    Vec2::new(u as f32 / 255.0, v as f32 / 255.0)
}

/// Bilinear, clamp-to-edge sample of normalised `(u, v)` at `uv`.
///
/// Texel centres sit at `(i + 0.5) / size`.
pub fn sample_field(field: &EncodedField, layer: u32, uv: Vec2) -> Vec2 {
    let dims = Vec2::new(field.width as f32, field.height as f32);
    let p = uv * dims - Vec2::splat(0.5);
    let base = p.floor();
    let f = p - base;
    let (x, y) = (base.x as i32, base.y as i32);

    let tl = field_texel(field, layer, x, y);
    let tr = field_texel(field, layer, x + 1, y);
    let bl = field_texel(field, layer, x, y + 1);
    let br = field_texel(field, layer, x + 1, y + 1);
    tl.lerp(tr, f.x).lerp(bl.lerp(br, f.x), f.y)
}

/// Map normalised channels back to velocity.
pub fn decode_velocity(normalized: Vec2, u: ValueRange, v: ValueRange) -> Vec2 {
    Vec2::new(
        u.min + normalized.x * (u.max - u.min),
        v.min + normalized.y * (v.max - v.min),
    )
}

/// Velocity at `uv`, interpolated between the bracketing frames.
pub fn field_velocity(pair: &TimelinePair<'_>, uv: Vec2) -> Vec2 {
    let current = pair.current;
    let next = pair.next;
    let a = decode_velocity(
        sample_field(current.field, current.layer, uv),
        current.field.u,
        current.field.v,
    );
    let b = decode_velocity(sample_field(next.field, next.layer, uv), next.field.u, next.field.v);
    a.lerp(b, pair.blend)
}

/// Speed mapped into `[0, 1]` over `range`.
pub fn normalized_speed(velocity: Vec2, range: ValueRange) -> f32 {
    ((velocity.length() - range.min) / range.span()).clamp(0.0, 1.0)
}

/// Hash-based pseudo random value in `[0, 1)`.
pub fn rand(co: Vec2) -> f32 {
    let t = RAND_A * co.x + RAND_B * co.y;
    let x = t.sin() * (RAND_C + t);
    x - x.floor()
}

/// Advance one particle at `pos`.
///
/// `tex_pos` is the particle's own texel centre in the state texture,
/// which decorrelates the random draws of particles sharing a position.
pub fn advect(pos: Vec2, tex_pos: Vec2, pair: &TimelinePair<'_>, params: &StepParams) -> ParticleStep {
    let velocity = field_velocity(pair, pos);
    let speed_t = normalized_speed(velocity, pair.speed_range());
    let offset = Vec2::new(velocity.x, -velocity.y)
        * params.speed_factor
        * (params.dt * DISPLACEMENT_SCALE);
    let moved = fract(Vec2::ONE + pos + offset);

    let seed = (moved + tex_pos) * params.rand_seed;
    let drop_rate = params.drop_rate + speed_t * params.drop_rate_bump;
    if rand(seed) >= 1.0 - drop_rate {
        let respawn = Vec2::new(
            rand(seed + Vec2::splat(1.3)),
            rand(seed + Vec2::splat(2.1)),
        );
        return ParticleStep {
            position: respawn,
            respawned: true,
        };
    }
    ParticleStep {
        position: moved,
        respawned: false,
    }
}

/// New property value from the previous one and the local speed.
pub fn update_property(previous: f32, speed_t: f32, smoothing: f32) -> f32 {
    previous + (speed_t - previous) * smoothing
}

/// One fade step of the trail accumulation buffer.
pub fn fade(color: [f32; 4], opacity: f32) -> [f32; 4] {
    color.map(|c| c * opacity)
}

/// Frames until a trail drops to half intensity.
pub fn half_life_frames(fade_opacity: f32) -> f32 {
    0.5f32.ln() / fade_opacity.ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldEncoder, VectorFieldSample};
    use crate::timeline::{FieldTimeline, LoopMode};

    fn uniform_timeline(u: f32, v: f32) -> FieldTimeline {
        let field = FieldEncoder::encode(&[VectorFieldSample::uniform(u, v, 8, 4)]).unwrap();
        FieldTimeline::new(vec![field], 1.0, LoopMode::Loop)
    }

    fn still_params() -> StepParams {
        StepParams {
            speed_factor: 1.0,
            drop_rate: 0.0,
            drop_rate_bump: 0.0,
            dt: 1.0,
            rand_seed: 0.37,
        }
    }

    #[test]
    fn test_position_codec_precision() {
        for i in 0..500 {
            let pos = Vec2::new(i as f32 / 500.0, 1.0 - (i as f32 + 0.5) / 501.0);
            let decoded = decode_position(encode_position(pos));
            assert!((decoded - pos).abs().max_element() < 1.0 / 65025.0 + 1e-6);
        }
    }

    #[test]
    fn test_decode_position_of_bytes() {
        assert_eq!(decode_position([0, 0, 0, 0]), Vec2::ZERO);
        let p = decode_position([0, 0, 128, 255]);
        assert!((p.x - 128.0 / 255.0).abs() < 1e-6);
        assert!((p.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_sample_field_interpolates_between_centres() {
        // Two cells: u = 0 on the left, u = 10 on the right.
        let sample = VectorFieldSample::new(vec![0.0, 10.0], vec![0.0, 0.0], 2, 1).unwrap();
        let field = FieldEncoder::encode(&[sample]).unwrap();
        let mid = decode_velocity(sample_field(&field, 0, Vec2::new(0.5, 0.5)), field.u, field.v);
        assert!((mid.x - 5.0).abs() < 1e-4);

        // Outside the centres the sample clamps to the edge value.
        let edge = decode_velocity(sample_field(&field, 0, Vec2::new(0.0, 0.5)), field.u, field.v);
        assert!(edge.x.abs() < 1e-6);
        let far = decode_velocity(sample_field(&field, 0, Vec2::new(1.0, 0.5)), field.u, field.v);
        assert!((far.x - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_field_velocity_blends_layers() {
        let a = VectorFieldSample::uniform(0.0, 0.0, 2, 2);
        let b = VectorFieldSample::uniform(4.0, 2.0, 2, 2);
        let field = FieldEncoder::encode(&[a, b]).unwrap();
        let mut timeline = FieldTimeline::new(vec![field], 4.0, LoopMode::Loop);
        timeline.advance(1.0);
        let velocity = field_velocity(&timeline.current_pair(), Vec2::splat(0.5));
        assert!((velocity - Vec2::new(1.0, 0.5)).length() < 1e-5);
    }

    #[test]
    fn test_uniform_field_moves_every_particle_right() {
        let timeline = uniform_timeline(5.0, 0.0);
        let pair = timeline.current_pair();
        let expected = 5.0 * DISPLACEMENT_SCALE;
        for i in 0..100 {
            let pos = Vec2::new(i as f32 / 137.0, (i * 7 % 100) as f32 / 100.0);
            let tex_pos = Vec2::new((i % 10) as f32 + 0.5, (i / 10) as f32 + 0.5) / 10.0;
            let step = advect(pos, tex_pos, &pair, &still_params());
            assert!(!step.respawned);
            let dx = (step.position.x - pos.x).rem_euclid(1.0);
            assert!((dx - expected).abs() < 1e-5, "dx {dx}");
            assert!((step.position.y - pos.y).abs() < 1e-6);
        }
    }

    #[test]
    fn test_positive_v_moves_up() {
        let timeline = uniform_timeline(0.0, 2.0);
        let step = advect(Vec2::splat(0.5), Vec2::splat(0.5), &timeline.current_pair(), &still_params());
        assert!(step.position.y < 0.5);
    }

    #[test]
    fn test_positions_wrap_into_unit_square() {
        let timeline = uniform_timeline(100.0, 0.0);
        let step = advect(Vec2::new(0.9, 0.2), Vec2::splat(0.5), &timeline.current_pair(), &still_params());
        assert!(step.position.x >= 0.0 && step.position.x < 1.0);
        assert!((step.position.x - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_full_drop_rate_respawns() {
        let timeline = uniform_timeline(1.0, 1.0);
        let params = StepParams {
            drop_rate: 1.0,
            ..still_params()
        };
        let step = advect(Vec2::splat(0.25), Vec2::splat(0.5), &timeline.current_pair(), &params);
        assert!(step.respawned);
        assert!(step.position.cmpge(Vec2::ZERO).all() && step.position.cmplt(Vec2::ONE).all());
    }

    #[test]
    fn test_rand_is_in_unit_interval() {
        for i in 0..1000 {
            let r = rand(Vec2::new(i as f32 * 0.013, i as f32 * 0.007));
            assert!((0.0..1.0).contains(&r));
        }
    }

    #[test]
    fn test_normalized_speed_guards_degenerate_range() {
        let range = ValueRange::new(3.0, 3.0);
        assert_eq!(normalized_speed(Vec2::new(3.0, 0.0), range), 0.0);
        let range = ValueRange::new(0.0, 10.0);
        assert!((normalized_speed(Vec2::new(3.0, 4.0), range) - 0.5).abs() < 1e-6);
        assert_eq!(normalized_speed(Vec2::new(30.0, 0.0), range), 1.0);
    }

    #[test]
    fn test_update_property_smoothing() {
        assert_eq!(update_property(0.2, 0.8, 1.0), 0.8);
        assert!((update_property(0.2, 0.8, 0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_trail_decay_is_geometric() {
        let mut color = [1.0, 0.5, 0.25, 1.0];
        for _ in 0..100 {
            color = fade(color, 0.99);
        }
        let expected = 0.99f32.powi(100);
        assert!((color[0] - expected).abs() < 1e-4);
        assert!((color[3] - expected).abs() < 1e-4);
    }

    #[test]
    fn test_half_life() {
        let frames = half_life_frames(0.99);
        assert!((frames - 68.967).abs() < 0.01);
        assert!((0.99f32.powf(frames) - 0.5).abs() < 1e-4);
    }
}
