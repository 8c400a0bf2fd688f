//! GPU error types for refinement backends.

use lepp_refine::RefineError;
use thiserror::Error;

/// Errors that can occur during GPU operations.
#[derive(Debug, Error)]
pub enum GpuError {
    /// GPU device is not available on this system.
    #[error("GPU not available: no compatible device found")]
    NotAvailable,

    /// Adapter found but the device request was refused.
    #[error("device request failed: {0}")]
    DeviceRequest(String),

    /// GPU ran out of memory during computation.
    #[error("GPU out of memory: {0}")]
    OutOfMemory(String),

    /// Shader compilation or pipeline creation failed.
    #[error("shader compilation failed: {0}")]
    ShaderCompilation(String),

    /// GPU execution failed.
    #[error("GPU execution failed: {0}")]
    Execution(String),

    /// Buffer mapping failed.
    #[error("buffer mapping failed: {0}")]
    BufferMapping(String),

    /// Mesh too large for the device's storage buffer or dispatch limits.
    #[error("mesh too large for GPU: {elements} {kind}, max supported: {max}")]
    MeshTooLarge {
        kind: &'static str,
        elements: usize,
        max: usize,
    },

    /// Topology could not be packed for upload.
    #[error("cannot upload topology: {0}")]
    Upload(#[from] RefineError),
}

/// Result type for GPU operations.
pub type GpuResult<T> = Result<T, GpuError>;

impl GpuError {
    /// Classify an error popped from a wgpu error scope.
    pub(crate) fn from_scope(error: wgpu::Error, context: &str) -> Self {
        match error {
            wgpu::Error::OutOfMemory { .. } => GpuError::OutOfMemory(context.to_string()),
            other => GpuError::Execution(format!("{context}: {other}")),
        }
    }
}

impl From<GpuError> for RefineError {
    fn from(error: GpuError) -> Self {
        match error {
            GpuError::Upload(inner) => inner,
            other => RefineError::backend("wgpu", other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lepp_refine::ErrorCode;

    #[test]
    fn test_gpu_error_maps_to_backend_error() {
        let err: RefineError = GpuError::NotAvailable.into();
        assert_eq!(err.code(), ErrorCode::Backend);
        assert!(err.to_string().contains("no compatible device"));
    }

    #[test]
    fn test_upload_error_passes_through() {
        let err: RefineError = GpuError::Upload(RefineError::invariant("dangling")).into();
        assert_eq!(err.code(), ErrorCode::InvariantViolation);
    }

    #[test]
    fn test_mesh_too_large_message() {
        let err = GpuError::MeshTooLarge {
            kind: "edges",
            elements: 10,
            max: 4,
        };
        assert_eq!(err.to_string(), "mesh too large for GPU: 10 edges, max supported: 4");
    }
}
