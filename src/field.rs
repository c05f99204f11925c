//! Vector-field samples and their 8-bit texture encoding.
//!
//! A [`VectorFieldSample`] holds raw `u`/`v` components on a regular grid.
//! [`FieldEncoder`] quantises one or two time-aligned samples into RGBA
//! texels that the advection shaders decode with
//! `value = min + (c / 255) * (max - min)`.
//!
//! # Channel layout
//!
//! | Channel | Single step | Two steps |
//! |---------|-------------|-----------|
//! | R       | `u` (t0)    | `u` (t0)  |
//! | G       | `v` (t0)    | `v` (t0)  |
//! | B       | 0           | `u` (t1)  |
//! | A       | 0           | `v` (t1)  |
//!
//! All samples encoded together share one range per component, so a single
//! decode formula is valid for every layer.
//!
//! # Example
//!
//! ```ignore
//! let sample = VectorFieldSample::new(u, v, 360, 180)?;
//! let encoded = FieldEncoder::encode(&[sample])?;
//! assert_eq!(encoded.texels.len(), 360 * 180 * 4);
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::FieldError;

/// Closed value interval used to quantise one component.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ValueRange {
    pub min: f32,
    pub max: f32,
}

impl ValueRange {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Range covering every finite value in `values`.
    ///
    /// Returns `[0, 0]` when there is no finite value.
    pub fn of(values: impl IntoIterator<Item = f32>) -> Self {
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for value in values {
            if value.is_finite() {
                min = min.min(value);
                max = max.max(value);
            }
        }
        if min > max {
            return Self::new(0.0, 0.0);
        }
        Self { min, max }
    }

    /// Smallest range containing both `self` and `other`.
    pub fn union(self, other: ValueRange) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Whether `max - min` is zero, negative or not finite.
    pub fn is_degenerate(&self) -> bool {
        let span = self.max - self.min;
        !span.is_finite() || span <= 0.0
    }

    /// Divisor used for quantisation; `1.0` for degenerate ranges.
    pub fn span(&self) -> f32 {
        if self.is_degenerate() {
            1.0
        } else {
            self.max - self.min
        }
    }
}

/// Quantise `value` into a byte of `range`.
#[inline]
pub fn quantize(value: f32, range: ValueRange) -> u8 {
    let t = (value - range.min) / range.span();
    (t * 255.0).floor().clamp(0.0, 255.0) as u8
}

/// Decode a byte back into `range`.
#[inline]
pub fn dequantize(byte: u8, range: ValueRange) -> f32 {
    range.min + (byte as f32 / 255.0) * (range.max - range.min)
}

/// One time step of a 2-D vector field.
///
/// Row 0 is the top of the image and positive `v` points up.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorFieldSample {
    pub u: Vec<f32>,
    pub v: Vec<f32>,
    pub width: u32,
    pub height: u32,
}

impl VectorFieldSample {
    /// Create a sample, checking that both components fill the grid.
    pub fn new(u: Vec<f32>, v: Vec<f32>, width: u32, height: u32) -> Result<Self, FieldError> {
        let sample = Self { u, v, width, height };
        sample.validate()?;
        Ok(sample)
    }

    /// A sample where every cell holds the same vector.
    pub fn uniform(u: f32, v: f32, width: u32, height: u32) -> Self {
        let cells = (width * height) as usize;
        Self {
            u: vec![u; cells],
            v: vec![v; cells],
            width,
            height,
        }
    }

    /// Number of grid cells.
    pub fn cells(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Check `u.len() == v.len() == width * height`.
    pub fn validate(&self) -> Result<(), FieldError> {
        if self.width == 0 || self.height == 0 {
            return Err(FieldError::ShapeMismatch(format!(
                "grid {}x{} has no cells",
                self.width, self.height
            )));
        }
        if self.u.len() != self.v.len() {
            return Err(FieldError::ShapeMismatch(format!(
                "u has {} values but v has {}",
                self.u.len(),
                self.v.len()
            )));
        }
        let width = self.width as usize;
        if self.u.len() % width != 0 {
            return Err(FieldError::ShapeMismatch(format!(
                "{} values are not a multiple of width {}",
                self.u.len(),
                width
            )));
        }
        if self.u.len() / width != self.height as usize {
            return Err(FieldError::ShapeMismatch(format!(
                "{} values make {} rows, expected height {}",
                self.u.len(),
                self.u.len() / width,
                self.height
            )));
        }
        Ok(())
    }

    /// Mirror the rows so the first row becomes the last.
    pub fn flip_y(&mut self) {
        flip_rows(&mut self.u, self.width as usize);
        flip_rows(&mut self.v, self.width as usize);
    }
}

fn flip_rows(data: &mut [f32], width: usize) {
    let rows = data.len() / width;
    for y in 0..rows / 2 {
        let (top, bottom) = data.split_at_mut((rows - 1 - y) * width);
        top[y * width..(y + 1) * width].swap_with_slice(&mut bottom[..width]);
    }
}

/// A field quantised into RGBA8 texels plus the ranges to decode it.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedField {
    /// `width * height * 4` bytes, row-major, top row first.
    pub texels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Decode range of the `u` channels.
    pub u: ValueRange,
    /// Decode range of the `v` channels.
    pub v: ValueRange,
    /// Range of decoded speed `sqrt(u² + v²)` over every layer.
    pub speed: ValueRange,
    /// Number of time steps packed in the texels (1 or 2).
    pub layers: u32,
}

impl EncodedField {
    /// Raw `(u, v)` bytes of `layer` at cell `(x, y)`.
    pub fn texel(&self, x: u32, y: u32, layer: u32) -> [u8; 2] {
        let base = ((y * self.width + x) * 4 + layer.min(1) * 2) as usize;
        [self.texels[base], self.texels[base + 1]]
    }

    /// Decoded velocity of `layer` at cell `(x, y)`.
    pub fn velocity(&self, x: u32, y: u32, layer: u32) -> [f32; 2] {
        let [cu, cv] = self.texel(x, y, layer);
        [dequantize(cu, self.u), dequantize(cv, self.v)]
    }
}

/// Converts raw samples into [`EncodedField`]s.
pub struct FieldEncoder;

impl FieldEncoder {
    /// Encode one sample, or two time-aligned samples into RG and BA.
    pub fn encode(samples: &[VectorFieldSample]) -> Result<EncodedField, FieldError> {
        if samples.is_empty() {
            return Err(FieldError::EmptyInput);
        }
        if samples.len() > 2 {
            return Err(FieldError::TooManyLayers(samples.len()));
        }
        check_shapes(samples)?;
        let (u_range, v_range) = global_ranges(samples);
        Ok(pack(samples, u_range, v_range))
    }

    /// Encode a time series as single-layer fields sharing one range.
    pub fn encode_series(samples: &[VectorFieldSample]) -> Result<Vec<EncodedField>, FieldError> {
        if samples.is_empty() {
            return Err(FieldError::EmptyInput);
        }
        check_shapes(samples)?;
        let (u_range, v_range) = global_ranges(samples);
        Ok(samples
            .iter()
            .map(|sample| pack(std::slice::from_ref(sample), u_range, v_range))
            .collect())
    }

    /// Pack bytes that were already quantised against `valid_min/valid_max`.
    pub fn from_quantized(
        u: &[u8],
        v: &[u8],
        width: u32,
        height: u32,
        u_range: ValueRange,
        v_range: ValueRange,
    ) -> Result<EncodedField, FieldError> {
        let cells = width as usize * height as usize;
        if u.len() != v.len() || u.len() != cells {
            return Err(FieldError::ShapeMismatch(format!(
                "quantised u ({}) and v ({}) must both hold {}x{} = {} bytes",
                u.len(),
                v.len(),
                width,
                height,
                cells
            )));
        }
        warn_degenerate(u_range, "u");
        warn_degenerate(v_range, "v");

        let mut texels = vec![0u8; cells * 4];
        for (i, (&cu, &cv)) in u.iter().zip(v).enumerate() {
            texels[i * 4] = cu;
            texels[i * 4 + 1] = cv;
        }
        let speed = speed_range(&texels, 1, u_range, v_range);
        Ok(EncodedField {
            texels,
            width,
            height,
            u: u_range,
            v: v_range,
            speed,
            layers: 1,
        })
    }
}

fn check_shapes(samples: &[VectorFieldSample]) -> Result<(), FieldError> {
    let first = &samples[0];
    for sample in samples {
        sample.validate()?;
        if sample.width != first.width || sample.height != first.height {
            return Err(FieldError::ShapeMismatch(format!(
                "sample grid {}x{} differs from {}x{}",
                sample.width, sample.height, first.width, first.height
            )));
        }
    }
    Ok(())
}

fn global_ranges(samples: &[VectorFieldSample]) -> (ValueRange, ValueRange) {
    let u_range = ValueRange::of(samples.iter().flat_map(|s| s.u.iter().copied()));
    let v_range = ValueRange::of(samples.iter().flat_map(|s| s.v.iter().copied()));
    warn_degenerate(u_range, "u");
    warn_degenerate(v_range, "v");
    (u_range, v_range)
}

fn warn_degenerate(range: ValueRange, component: &str) {
    if range.is_degenerate() {
        log::warn!(
            "{component} range [{}, {}] is degenerate; quantising with unit span",
            range.min,
            range.max
        );
    }
}

fn pack(samples: &[VectorFieldSample], u_range: ValueRange, v_range: ValueRange) -> EncodedField {
    let first = &samples[0];
    let mut texels = vec![0u8; first.cells() * 4];
    for (layer, sample) in samples.iter().enumerate() {
        for (i, (&u, &v)) in sample.u.iter().zip(&sample.v).enumerate() {
            texels[i * 4 + layer * 2] = quantize(u, u_range);
            texels[i * 4 + layer * 2 + 1] = quantize(v, v_range);
        }
    }
    let layers = samples.len() as u32;
    let speed = speed_range(&texels, layers, u_range, v_range);
    log::debug!(
        "encoded {}x{} field ({} layer(s)), u [{}, {}], v [{}, {}]",
        first.width,
        first.height,
        layers,
        u_range.min,
        u_range.max,
        v_range.min,
        v_range.max
    );
    EncodedField {
        texels,
        width: first.width,
        height: first.height,
        u: u_range,
        v: v_range,
        speed,
        layers,
    }
}

fn speed_range(texels: &[u8], layers: u32, u_range: ValueRange, v_range: ValueRange) -> ValueRange {
    ValueRange::of(texels.chunks_exact(4).flat_map(|texel| {
        (0..layers as usize).map(move |layer| {
            let u = dequantize(texel[layer * 2], u_range);
            let v = dequantize(texel[layer * 2 + 1], v_range);
            (u * u + v * v).sqrt()
        })
    }))
}

/// A dataset with a leading time dimension, laid out `[time][row][column]`.
///
/// Matches the shape of gridded reanalysis arrays such as 10 m wind
/// components, flattened into two arrays.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldDataset {
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_times")]
    pub times: u32,
    pub u: Vec<f32>,
    pub v: Vec<f32>,
    /// Source rows run bottom-up and must be mirrored.
    #[serde(default)]
    pub flip_y: bool,
}

fn default_times() -> u32 {
    1
}

impl FieldDataset {
    /// Load a dataset from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, FieldError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let dataset: FieldDataset = serde_json::from_str(&text)?;
        log::info!(
            "loaded {}x{} dataset with {} time step(s) from {}",
            dataset.width,
            dataset.height,
            dataset.times,
            path.as_ref().display()
        );
        Ok(dataset)
    }

    /// Split the time dimension into per-step samples.
    pub fn samples(&self) -> Result<Vec<VectorFieldSample>, FieldError> {
        let cells = self.width as usize * self.height as usize;
        let expected = cells * self.times as usize;
        if self.times == 0 || self.u.len() != expected || self.v.len() != expected {
            return Err(FieldError::ShapeMismatch(format!(
                "dataset {}x{}x{} needs {} values per component, got u={} v={}",
                self.times,
                self.height,
                self.width,
                expected,
                self.u.len(),
                self.v.len()
            )));
        }
        (0..self.times as usize)
            .map(|t| {
                let range = t * cells..(t + 1) * cells;
                let mut sample = VectorFieldSample::new(
                    self.u[range.clone()].to_vec(),
                    self.v[range].to_vec(),
                    self.width,
                    self.height,
                )?;
                if self.flip_y {
                    sample.flip_y();
                }
                Ok(sample)
            })
            .collect()
    }

    /// Synthetic rotating double-gyre used by the demo when no file is given.
    ///
    /// Each time step shifts the gyre centres so the animation has
    /// something to interpolate between.
    pub fn double_gyre(width: u32, height: u32, times: u32) -> Self {
        let cells = (width * height) as usize;
        let mut u = Vec::with_capacity(cells * times as usize);
        let mut v = Vec::with_capacity(cells * times as usize);
        for t in 0..times {
            let phase = t as f32 / times.max(1) as f32 * std::f32::consts::TAU;
            let epsilon = 0.25 * phase.sin();
            for row in 0..height {
                // Field y points up; row 0 is the top.
                let y = 1.0 - (row as f32 + 0.5) / height as f32;
                for col in 0..width {
                    let x = 2.0 * (col as f32 + 0.5) / width as f32;
                    let a = epsilon;
                    let b = 1.0 - 2.0 * epsilon;
                    let f = a * x * x + b * x;
                    let df = 2.0 * a * x + b;
                    let pi = std::f32::consts::PI;
                    u.push(-10.0 * pi * (pi * f).sin() * (pi * y).cos());
                    v.push(10.0 * pi * (pi * f).cos() * (pi * y).sin() * df);
                }
            }
        }
        Self {
            width,
            height,
            times,
            u,
            v,
            flip_y: false,
        }
    }
}
