// SPDX-License-Identifier: MPL-2.0

//! Error types for the edge viewer
//!
//! Each pipeline stage has its own error enum so failures stay local to the
//! context that produced them. Capture and processing failures become
//! pipeline notices on the capture thread; only render, config and storage
//! failures reach [`AppError`] at the application boundary.

use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// GPU presentation errors
    Render(RenderError),
    /// Configuration errors
    Config(String),
    /// Storage/filesystem errors
    Storage(String),
    /// Generic error with message
    Other(String),
}

/// Errors raised while repacking a raw frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    /// Width or height is zero
    InvalidDimensions { width: u32, height: u32 },
    /// A plane descriptor points outside the frame data
    PlaneOutOfBounds {
        plane: &'static str,
        required: usize,
        available: usize,
    },
    /// Strides too small for the frame width
    InvalidStride { plane: &'static str, stride: usize },
}

/// Errors raised by the processing stage. Each one drops a single frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingError {
    /// Width or height is zero
    InvalidDimensions { width: u32, height: u32 },
    /// Input or output buffer does not match the declared dimensions
    BufferSizeMismatch { expected: usize, actual: usize },
    /// The transform reported a failure
    Transform(String),
    /// The transform panicked; the panic was contained
    Panicked(String),
}

/// GPU presentation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// Window surface could not be created or configured
    Surface(String),
    /// No GPU adapter compatible with the surface
    NoAdapter(String),
    /// Device request failed
    Device(String),
    /// Shader module or render pipeline failed validation
    ShaderBuild(String),
    /// GPU ran out of memory
    OutOfMemory,
    /// Pixel buffer does not match the texture size
    TextureSizeMismatch { expected: usize, actual: usize },
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Render(e) => write!(f, "Render error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionError::InvalidDimensions { width, height } => {
                write!(f, "Invalid frame dimensions {}x{}", width, height)
            }
            ConversionError::PlaneOutOfBounds {
                plane,
                required,
                available,
            } => write!(
                f,
                "{} plane needs {} bytes but frame holds {}",
                plane, required, available
            ),
            ConversionError::InvalidStride { plane, stride } => {
                write!(f, "{} plane has invalid stride {}", plane, stride)
            }
        }
    }
}

impl fmt::Display for ProcessingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingError::InvalidDimensions { width, height } => {
                write!(f, "Invalid frame dimensions {}x{}", width, height)
            }
            ProcessingError::BufferSizeMismatch { expected, actual } => write!(
                f,
                "Buffer size mismatch: expected {} bytes, got {}",
                expected, actual
            ),
            ProcessingError::Transform(msg) => write!(f, "Transform failed: {}", msg),
            ProcessingError::Panicked(msg) => write!(f, "Transform panicked: {}", msg),
        }
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Surface(msg) => write!(f, "Surface error: {}", msg),
            RenderError::NoAdapter(msg) => write!(f, "No suitable GPU adapter: {}", msg),
            RenderError::Device(msg) => write!(f, "Failed to create GPU device: {}", msg),
            RenderError::ShaderBuild(msg) => write!(f, "Shader build failed: {}", msg),
            RenderError::OutOfMemory => write!(f, "GPU out of memory"),
            RenderError::TextureSizeMismatch { expected, actual } => write!(
                f,
                "Texture upload size mismatch: expected {} bytes, got {}",
                expected, actual
            ),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for ConversionError {}
impl std::error::Error for ProcessingError {}
impl std::error::Error for RenderError {}

// Conversions from sub-errors to AppError
impl From<RenderError> for AppError {
    fn from(err: RenderError) -> Self {
        AppError::Render(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

// Conversions for I/O errors
impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<image::ImageError> for AppError {
    fn from(err: image::ImageError) -> Self {
        AppError::Storage(err.to_string())
    }
}
