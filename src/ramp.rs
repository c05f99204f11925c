//! Colour ramps for particle colouring.
//!
//! A ramp is a list of colour stops rasterised once into a 256×1 RGBA
//! lookup image. The draw shader indexes it with the particle's normalised
//! speed.
//!
//! ```ignore
//! let ramp = ColorRamp::palette(Palette::Wind);
//! let ramp = ColorRamp::from_hex_stops(&[(0.0, "#000000"), (1.0, "#ffffff")])?;
//! let ramp = ColorRamp::from_image("assets/ramp.png")?;
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::RampError;

/// Width of the rasterised lookup image.
pub const RAMP_WIDTH: u32 = 256;

/// Built-in ramps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Palette {
    /// Blue through yellow to red, the classic wind-speed scale.
    #[default]
    Wind,
    /// Flat light grey, for monochrome trails.
    Mono,
    /// Viridis - perceptually uniform, colorblind-friendly (purple to yellow).
    Viridis,
    /// Magma - perceptually uniform (black to yellow through red).
    Magma,
}

impl Palette {
    fn stops(&self) -> Vec<(f32, [u8; 4])> {
        match self {
            Palette::Wind => vec![
                (0.0, [0x32, 0x88, 0xbd, 0xff]),
                (0.1, [0x66, 0xc2, 0xa5, 0xff]),
                (0.2, [0xab, 0xdd, 0xa4, 0xff]),
                (0.3, [0xe6, 0xf5, 0x98, 0xff]),
                (0.4, [0xfe, 0xe0, 0x8b, 0xff]),
                (0.5, [0xfd, 0xae, 0x61, 0xff]),
                (0.6, [0xf4, 0x6d, 0x43, 0xff]),
                (1.0, [0xd5, 0x3e, 0x4f, 0xff]),
            ],
            Palette::Mono => vec![(0.0, [0xee, 0xee, 0xee, 0xff]), (1.0, [0xee, 0xee, 0xee, 0xff])],
            Palette::Viridis => vec![
                (0.0, [68, 1, 84, 255]),
                (0.25, [72, 36, 117, 255]),
                (0.5, [32, 144, 140, 255]),
                (0.75, [94, 201, 98, 255]),
                (1.0, [253, 231, 37, 255]),
            ],
            Palette::Magma => vec![
                (0.0, [0, 0, 4, 255]),
                (0.25, [84, 18, 111, 255]),
                (0.5, [183, 55, 121, 255]),
                (0.75, [253, 138, 97, 255]),
                (1.0, [252, 253, 191, 255]),
            ],
        }
    }
}

/// A rasterised colour ramp.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorRamp {
    /// `RAMP_WIDTH * 4` RGBA bytes.
    pub pixels: Vec<u8>,
}

impl ColorRamp {
    /// Rasterise a built-in palette.
    pub fn palette(palette: Palette) -> Self {
        Self {
            pixels: rasterize(&palette.stops()),
        }
    }

    /// Rasterise `(position, rgba)` stops; positions must lie in `[0, 1]`.
    ///
    /// Stops are sorted by position. Before the first and after the last
    /// stop the end colours are held.
    pub fn from_stops(stops: &[(f32, [u8; 4])]) -> Result<Self, RampError> {
        if stops.is_empty() {
            return Err(RampError::NoStops);
        }
        if let Some(&(bad, _)) = stops
            .iter()
            .find(|(pos, _)| !pos.is_finite() || !(0.0..=1.0).contains(pos))
        {
            return Err(RampError::StopOutOfRange(bad));
        }
        let mut sorted = stops.to_vec();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(Self {
            pixels: rasterize(&sorted),
        })
    }

    /// Stops given as `#rrggbb` or `#rrggbbaa` strings.
    ///
    /// Unparseable colours fall back to opaque white.
    pub fn from_hex_stops(stops: &[(f32, &str)]) -> Result<Self, RampError> {
        let parsed: Vec<_> = stops.iter().map(|&(pos, hex)| (pos, parse_hex(hex))).collect();
        Self::from_stops(&parsed)
    }

    /// Use the first row of an image as the ramp, resampled to `RAMP_WIDTH`.
    pub fn from_image<P: AsRef<Path>>(path: P) -> Result<Self, RampError> {
        let img = image::open(path.as_ref())?.into_rgba8();
        let width = img.width();
        let mut pixels = Vec::with_capacity((RAMP_WIDTH * 4) as usize);
        for x in 0..RAMP_WIDTH {
            let src = (x * width.saturating_sub(1)) / (RAMP_WIDTH - 1);
            pixels.extend_from_slice(&img.get_pixel(src, 0).0);
        }
        log::debug!("loaded colour ramp from {}", path.as_ref().display());
        Ok(Self { pixels })
    }

    /// Colour at ramp position `t ∈ [0, 1]`, as sampled by the draw shader.
    pub fn color_at(&self, t: f32) -> [u8; 4] {
        let last = RAMP_WIDTH as f32 - 1.0;
        let x = (t * last + 0.5).clamp(0.0, last) as usize;
        let mut rgba = [0u8; 4];
        rgba.copy_from_slice(&self.pixels[x * 4..x * 4 + 4]);
        rgba
    }
}

impl Default for ColorRamp {
    fn default() -> Self {
        Self::palette(Palette::default())
    }
}

impl From<Palette> for ColorRamp {
    fn from(palette: Palette) -> Self {
        Self::palette(palette)
    }
}

/// Helper function for linear interpolation of u8 values.
fn lerp_u8(a: u8, b: u8, t: f32) -> u8 {
    let a = a as f32;
    let b = b as f32;
    (a + (b - a) * t).round() as u8
}

fn rasterize(stops: &[(f32, [u8; 4])]) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((RAMP_WIDTH * 4) as usize);
    for x in 0..RAMP_WIDTH {
        let t = x as f32 / (RAMP_WIDTH - 1) as f32;
        let upper = stops.iter().position(|(pos, _)| *pos >= t);
        let color = match upper {
            None => stops[stops.len() - 1].1,
            Some(0) => stops[0].1,
            Some(i) => {
                let (p0, c0) = stops[i - 1];
                let (p1, c1) = stops[i];
                let local = if p1 > p0 { (t - p0) / (p1 - p0) } else { 0.0 };
                [
                    lerp_u8(c0[0], c1[0], local),
                    lerp_u8(c0[1], c1[1], local),
                    lerp_u8(c0[2], c1[2], local),
                    lerp_u8(c0[3], c1[3], local),
                ]
            }
        };
        pixels.extend_from_slice(&color);
    }
    pixels
}

fn parse_hex(hex: &str) -> [u8; 4] {
    let digits = hex.trim_start_matches('#');
    let byte = |i: usize| digits.get(i..i + 2).and_then(|s| u8::from_str_radix(s, 16).ok());
    match digits.len() {
        6 => match (byte(0), byte(2), byte(4)) {
            (Some(r), Some(g), Some(b)) => [r, g, b, 255],
            _ => [255; 4],
        },
        8 => match (byte(0), byte(2), byte(4), byte(6)) {
            (Some(r), Some(g), Some(b), Some(a)) => [r, g, b, a],
            _ => [255; 4],
        },
        _ => [255; 4],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ramp_has_fixed_width() {
        let ramp = ColorRamp::palette(Palette::Viridis);
        assert_eq!(ramp.pixels.len(), (RAMP_WIDTH * 4) as usize);
    }

    #[test]
    fn test_two_stop_gradient_endpoints_and_middle() {
        let ramp = ColorRamp::from_stops(&[(0.0, [0, 0, 0, 255]), (1.0, [255, 255, 255, 255])]).unwrap();
        assert_eq!(ramp.color_at(0.0), [0, 0, 0, 255]);
        assert_eq!(ramp.color_at(1.0), [255, 255, 255, 255]);
        let mid = ramp.color_at(0.5);
        assert!((mid[0] as i32 - 128).abs() <= 1);
    }

    #[test]
    fn test_stops_are_sorted_and_ends_held() {
        let ramp = ColorRamp::from_stops(&[(0.75, [0, 0, 255, 255]), (0.25, [255, 0, 0, 255])]).unwrap();
        assert_eq!(ramp.color_at(0.0), [255, 0, 0, 255]);
        assert_eq!(ramp.color_at(1.0), [0, 0, 255, 255]);
    }

    #[test]
    fn test_rejects_bad_stops() {
        assert!(matches!(ColorRamp::from_stops(&[]), Err(RampError::NoStops)));
        assert!(matches!(
            ColorRamp::from_stops(&[(1.5, [0; 4])]),
            Err(RampError::StopOutOfRange(_))
        ));
    }

    #[test]
    fn test_hex_stops() {
        let ramp = ColorRamp::from_hex_stops(&[(0.0, "#3288bd"), (1.0, "#d53e4f80")]).unwrap();
        assert_eq!(ramp.color_at(0.0), [0x32, 0x88, 0xbd, 0xff]);
        assert_eq!(ramp.color_at(1.0), [0xd5, 0x3e, 0x4f, 0x80]);
        assert_eq!(parse_hex("nope"), [255; 4]);
    }

    #[test]
    fn test_mono_palette_is_flat() {
        let ramp = ColorRamp::palette(Palette::Mono);
        assert!(ramp.pixels.chunks_exact(4).all(|p| p == [0xee, 0xee, 0xee, 0xff]));
    }
}
