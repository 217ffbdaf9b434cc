//! Shared data models for the auto-PTZ engine.
//!
//! This crate provides Serde-serializable types for:
//! - Detected face boxes
//! - Crop rectangles and aim points
//! - Control-loop zoom states

pub mod rect;
pub mod zoom_state;

// Re-export common types
pub use rect::{Center, CropRect, FaceBox};
pub use zoom_state::{ZoomState, ZoomStateParseError};
