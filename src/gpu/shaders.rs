//! WGSL sources for every pass.
//!
//! Shared snippets are concatenated in front of each pass body so that
//! helpers like `decode_position` are defined once.

const QUAD: &str = include_str!("shaders/quad.wgsl");
const PARTICLE_STATE: &str = include_str!("shaders/particle_state.wgsl");
const FIELD: &str = include_str!("shaders/field.wgsl");
const UPDATE: &str = include_str!("shaders/update.wgsl");
const PROPERTY: &str = include_str!("shaders/property.wgsl");
const DRAW: &str = include_str!("shaders/draw.wgsl");
const SCREEN: &str = include_str!("shaders/screen.wgsl");

/// Advection: `vs_quad` + `fs_update`.
pub fn update_shader() -> String {
    format!("{QUAD}\n{PARTICLE_STATE}\n{FIELD}\n{UPDATE}")
}

/// Property update: `vs_quad` + `fs_property`.
pub fn property_shader() -> String {
    format!("{QUAD}\n{PARTICLE_STATE}\n{FIELD}\n{PROPERTY}")
}

/// Particle points: `vs_draw` + `fs_draw`.
pub fn draw_shader() -> String {
    format!("{PARTICLE_STATE}\n{DRAW}")
}

/// Trail fade and composite: `vs_quad` + `fs_screen`.
pub fn screen_shader() -> String {
    format!("{QUAD}\n{SCREEN}")
}

/// Compile `source` into a module.
pub(crate) fn create_module(device: &wgpu::Device, label: &str, source: String) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use naga::front::wgsl;
    use naga::valid::{Capabilities, ValidationFlags, Validator};

    fn validate(name: &str, source: &str) -> naga::Module {
        let module = wgsl::parse_str(source)
            .unwrap_or_else(|e| panic!("{name} failed to parse:\n{}", e.emit_to_string(source)));
        Validator::new(ValidationFlags::all(), Capabilities::all())
            .validate(&module)
            .unwrap_or_else(|e| panic!("{name} failed validation: {e:?}"));
        module
    }

    fn entry_points(module: &naga::Module) -> Vec<&str> {
        module.entry_points.iter().map(|ep| ep.name.as_str()).collect()
    }

    #[test]
    fn test_update_shader_validates() {
        let module = validate("update", &update_shader());
        let entries = entry_points(&module);
        assert!(entries.contains(&"vs_quad"));
        assert!(entries.contains(&"fs_update"));
    }

    #[test]
    fn test_property_shader_validates() {
        let module = validate("property", &property_shader());
        assert!(entry_points(&module).contains(&"fs_property"));
    }

    #[test]
    fn test_draw_shader_validates() {
        let module = validate("draw", &draw_shader());
        let entries = entry_points(&module);
        assert!(entries.contains(&"vs_draw"));
        assert!(entries.contains(&"fs_draw"));
    }

    #[test]
    fn test_screen_shader_validates() {
        let module = validate("screen", &screen_shader());
        assert!(entry_points(&module).contains(&"fs_screen"));
    }

    #[test]
    fn test_field_params_layout_matches_shader() {
        let module = validate("update", &update_shader());
        let (_, ty) = module
            .types
            .iter()
            .find(|(_, ty)| ty.name.as_deref() == Some("FieldParams"))
            .expect("FieldParams struct");
        let size = ty.inner.size(module.to_ctx());
        assert_eq!(size as usize, std::mem::size_of::<crate::gpu::params::FieldParams>());
    }
}
