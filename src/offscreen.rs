//! Offscreen render target for headless rendering and tests.

use image::RgbaImage;

use crate::error::GpuError;
use crate::gpu::GpuContext;

/// Format of [`OffscreenTarget`] textures.
pub const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// A colour texture that can stand in for a window surface.
pub struct OffscreenTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl OffscreenTarget {
    pub fn new(ctx: &GpuContext, width: u32, height: u32) -> Result<Self, GpuError> {
        let texture = ctx.create_texture(
            "Offscreen Target",
            width.max(1),
            height.max(1),
            OFFSCREEN_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            None,
        )?;
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(Self { texture, view })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.texture.width(), self.texture.height())
    }

    /// Read the target back as an image.
    pub fn to_image(&self, ctx: &GpuContext) -> Result<RgbaImage, GpuError> {
        let (width, height) = self.size();
        let pixels = ctx.read_texture(&self.texture)?;
        RgbaImage::from_raw(width, height, pixels)
            .ok_or_else(|| GpuError::BufferMapping("readback does not match target size".to_string()))
    }
}
