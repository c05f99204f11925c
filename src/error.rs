//! Error types for windtrail.
//!
//! Field and configuration errors are raised while the pipeline is being
//! built, before any GPU object exists. GPU errors carry the label of the
//! resource the driver refused so a failing shader or texture can be found.

use thiserror::Error;

/// Errors raised while validating or encoding vector-field samples.
#[derive(Debug, Error)]
pub enum FieldError {
    /// Sample lengths disagree with each other or with the declared grid.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
    /// Nothing to encode.
    #[error("no vector-field samples were supplied")]
    EmptyInput,
    /// A single texture holds at most two time steps (RG and BA).
    #[error("cannot pack {0} samples into one field texture (maximum is 2)")]
    TooManyLayers(usize),
    /// Failed to read a dataset file.
    #[error("failed to read field dataset: {0}")]
    Io(#[from] std::io::Error),
    /// Dataset file is not valid JSON for a [`FieldDataset`](crate::field::FieldDataset).
    #[error("failed to parse field dataset: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur during GPU initialization or resource creation.
#[derive(Debug, Error)]
pub enum GpuError {
    /// Failed to create a surface for rendering.
    #[error("failed to create GPU surface: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    #[error("no compatible GPU adapter found")]
    NoAdapter,
    /// Failed to create GPU device.
    #[error("failed to create GPU device: {0}")]
    DeviceCreation(#[from] wgpu::RequestDeviceError),
    /// The driver rejected a texture, shader or pipeline.
    #[error("failed to create {label}: {message}")]
    ResourceCreation {
        /// Label of the rejected resource.
        label: String,
        /// Validation message reported by wgpu.
        message: String,
    },
    /// Failed to map buffer for reading.
    #[error("failed to map GPU buffer: {0}")]
    BufferMapping(String),
}

/// Errors in pipeline configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A parameter is outside its accepted range.
    #[error("invalid `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
    /// Failed to read the configuration file.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// Configuration file is not valid JSON.
    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors while building a colour ramp.
#[derive(Debug, Error)]
pub enum RampError {
    /// Failed to load the ramp image.
    #[error("failed to load colour ramp image: {0}")]
    Image(#[from] image::ImageError),
    /// A ramp needs at least one colour stop.
    #[error("colour ramp has no stops")]
    NoStops,
    /// A stop position is outside `[0, 1]` or not finite.
    #[error("colour stop position {0} is outside [0, 1]")]
    StopOutOfRange(f32),
}

/// Any error produced by the crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Field(#[from] FieldError),
    #[error(transparent)]
    Gpu(#[from] GpuError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Ramp(#[from] RampError),
}

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_error_converts_into_crate_error() {
        let err: Error = FieldError::EmptyInput.into();
        assert!(matches!(err, Error::Field(FieldError::EmptyInput)));
        assert_eq!(err.to_string(), "no vector-field samples were supplied");
    }

    #[test]
    fn test_resource_creation_message_names_resource() {
        let err = GpuError::ResourceCreation {
            label: "Advection Pipeline".into(),
            message: "entry point missing".into(),
        };
        assert_eq!(
            err.to_string(),
            "failed to create Advection Pipeline: entry point missing"
        );
    }
}
