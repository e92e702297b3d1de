//! Device error types.

use marchlife_core::MarchlifeError;
use thiserror::Error;

/// Errors that can occur on the wgpu device.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Failed to create wgpu adapter.
    #[error("failed to create graphics adapter")]
    AdapterCreationFailed,

    /// Failed to create wgpu device.
    #[error("failed to create graphics device: {0}")]
    DeviceCreationFailed(#[from] wgpu::RequestDeviceError),

    /// Mapping a readback buffer failed.
    #[error("GPU buffer mapping failed")]
    BufferMapFailed,

    /// Readback data did not have the expected size.
    #[error("readback size mismatch: expected {expected} bytes, got {actual}")]
    ReadbackSize { expected: usize, actual: usize },

    /// A buffer exceeds the device's storage binding limit.
    #[error("{label} buffer needs {size} bytes, device limit is {limit}")]
    BufferTooLarge {
        label: &'static str,
        size: u64,
        limit: u64,
    },

    /// Writing a captured frame failed.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Unsupported capture file format.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// Captured pixel data does not match the frame size.
    #[error("invalid image data")]
    InvalidImageData,
}

/// A specialized Result type for device operations.
pub type RenderResult<T> = std::result::Result<T, RenderError>;

impl From<RenderError> for MarchlifeError {
    fn from(err: RenderError) -> Self {
        MarchlifeError::Render(err.to_string())
    }
}
