//! Particle positions and properties stored as texture pairs.
//!
//! Particle `i` lives at texel `(i % res, i / res)` of two `res×res`
//! `Rgba8Unorm` textures: one holding its encoded position, one its
//! normalised speed. Each kind is double buffered; passes read the front
//! and render into the back, then [`ParticleStateStore::swap`] flips both.

use glam::Vec2;
use rand::{Rng, RngCore};

use super::{GpuContext, STATE_FORMAT};
use crate::error::GpuError;
use crate::kernel::decode_position;
use crate::ping_pong::PingPong;

/// Initial byte of every property channel.
const INITIAL_PROPERTY: u8 = 128;

/// Smallest `res` with `res * res >= desired`, at least 1.
pub fn particle_resolution(desired: u32) -> u32 {
    let desired = u64::from(desired.max(1));
    let mut res = (desired as f64).sqrt() as u64;
    while res * res < desired {
        res += 1;
    }
    while res > 1 && (res - 1) * (res - 1) >= desired {
        res -= 1;
    }
    res as u32
}

/// Bytes in one `res×res` state texture.
fn state_bytes(resolution: u32) -> usize {
    (resolution as usize).pow(2) * 4
}

/// One state texture and its view.
pub struct StateTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl StateTexture {
    fn new(ctx: &GpuContext, label: &str, res: u32, data: &[u8]) -> Result<Self, GpuError> {
        let texture = ctx.create_texture(
            label,
            res,
            res,
            STATE_FORMAT,
            wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::COPY_SRC,
            Some(data),
        )?;
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(Self { texture, view })
    }
}

/// Double-buffered particle state.
pub struct ParticleStateStore {
    resolution: u32,
    positions: PingPong<StateTexture>,
    properties: PingPong<StateTexture>,
}

impl ParticleStateStore {
    /// Allocate state for at least `desired` particles.
    ///
    /// Positions start as uniformly random bytes drawn from `rng`; every
    /// property byte starts at 128.
    pub fn new<R: Rng + ?Sized>(ctx: &GpuContext, desired: u32, rng: &mut R) -> Result<Self, GpuError> {
        let resolution = particle_resolution(desired);
        let max_side = ctx.device.limits().max_texture_dimension_2d;
        if resolution > max_side {
            return Err(GpuError::ResourceCreation {
                label: "Particle Positions A".to_string(),
                message: format!(
                    "{desired} particles need {resolution}x{resolution} state textures, device allows {max_side}x{max_side}"
                ),
            });
        }
        let texels = state_bytes(resolution);

        let mut position_bytes = vec![0u8; texels];
        rng.fill_bytes(&mut position_bytes);
        let property_bytes = vec![INITIAL_PROPERTY; texels];

        let positions = PingPong::new(
            StateTexture::new(ctx, "Particle Positions A", resolution, &position_bytes)?,
            StateTexture::new(ctx, "Particle Positions B", resolution, &position_bytes)?,
        );
        let properties = PingPong::new(
            StateTexture::new(ctx, "Particle Properties A", resolution, &property_bytes)?,
            StateTexture::new(ctx, "Particle Properties B", resolution, &property_bytes)?,
        );

        log::info!(
            "particle state {res}x{res} ({} particles, {desired} requested)",
            resolution * resolution,
            res = resolution
        );

        Ok(Self {
            resolution,
            positions,
            properties,
        })
    }

    pub fn positions(&self) -> &PingPong<StateTexture> {
        &self.positions
    }

    pub fn properties(&self) -> &PingPong<StateTexture> {
        &self.properties
    }

    /// Slot index of the front buffers (positions and properties agree).
    pub fn front_slot(&self) -> usize {
        self.positions.front_slot()
    }

    /// Make the freshly written back buffers current.
    pub fn swap(&mut self) {
        self.positions.swap();
        self.properties.swap();
    }

    /// Side length of the state textures.
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn particle_count(&self) -> u32 {
        self.resolution * self.resolution
    }

    /// Decoded front positions, in particle order.
    pub fn read_positions(&self, ctx: &GpuContext) -> Result<Vec<Vec2>, GpuError> {
        let bytes = ctx.read_texture(&self.positions.front().texture)?;
        Ok(bytes
            .chunks_exact(4)
            .map(|c| decode_position([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    /// Front property values (normalised speed), in particle order.
    pub fn read_properties(&self, ctx: &GpuContext) -> Result<Vec<f32>, GpuError> {
        let bytes = ctx.read_texture(&self.properties.front().texture)?;
        Ok(bytes.chunks_exact(4).map(|c| c[0] as f32 / 255.0).collect())
    }

    /// Scatter particles to fresh random positions and reset properties.
    ///
    /// Writes into the existing front textures so bind groups stay valid.
    pub fn reseed<R: Rng + ?Sized>(&mut self, ctx: &GpuContext, rng: &mut R) {
        let texels = state_bytes(self.resolution);
        let mut position_bytes = vec![0u8; texels];
        rng.fill_bytes(&mut position_bytes);
        ctx.write_texture(&self.positions.front().texture, &position_bytes);
        ctx.write_texture(&self.properties.front().texture, &vec![INITIAL_PROPERTY; texels]);
        log::debug!("reseeded {} particles", self.particle_count());
    }
}
