//! Error types for PTZ engine setup.
//!
//! The per-frame path never fails; these errors surface only while
//! configuring a stream or wrapping a frame buffer.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for engine operations.
pub type PtzResult<T> = Result<T, PtzError>;

/// Errors that can occur while setting up face tracking.
#[derive(Debug, Error)]
pub enum PtzError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid frame dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Frame buffer too small: {actual} bytes, layout needs {required}")]
    BufferTooSmall { required: usize, actual: usize },

    #[error("Config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl PtzError {
    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Create an invalid dimensions error.
    pub fn invalid_dimensions(width: u32, height: u32) -> Self {
        Self::InvalidDimensions { width, height }
    }
}
