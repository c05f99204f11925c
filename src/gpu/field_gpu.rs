//! Field textures on the GPU.

use super::{GpuContext, STATE_FORMAT};
use crate::error::GpuError;
use crate::field::EncodedField;

/// An [`EncodedField`] uploaded as an `Rgba8Unorm` texture.
///
/// Bytes are uploaded unchanged, so a shader `textureLoad` returns `c / 255`
/// per channel. The decode ranges stay on the CPU side.
pub struct FieldTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl FieldTexture {
    pub fn upload(ctx: &GpuContext, field: &EncodedField, index: usize) -> Result<Self, GpuError> {
        let label = format!("Field Texture {index}");
        let texture = ctx.create_texture(
            &label,
            field.width,
            field.height,
            STATE_FORMAT,
            wgpu::TextureUsages::TEXTURE_BINDING,
            Some(&field.texels),
        )?;
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        log::debug!(
            "uploaded {label} ({}x{}, {} layer(s))",
            field.width,
            field.height,
            field.layers
        );
        Ok(Self { texture, view })
    }

    /// Upload every field in order; texture `i` holds `fields[i]`.
    pub fn upload_all(ctx: &GpuContext, fields: &[EncodedField]) -> Result<Vec<Self>, GpuError> {
        fields
            .iter()
            .enumerate()
            .map(|(i, field)| Self::upload(ctx, field, i))
            .collect()
    }
}
