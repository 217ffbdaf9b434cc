//! Face-driven virtual pan/tilt/zoom for fixed cameras.
//!
//! This crate provides:
//! - Face metadata parsing and filtering
//! - Temporal smoothing with face-count hysteresis
//! - A frame-rate aware crop planner (zoom, pan/tilt, zoom out)
//! - Debug overlays drawn into NV12/NV16 frames
//! - Per-stream processor selection

pub mod error;
pub mod pipeline;
pub mod ptz;

pub use autoptz_models::{Center, CropRect, FaceBox, ZoomState};
pub use error::{PtzError, PtzResult};
pub use pipeline::StreamProcessor;
pub use ptz::{
    CropDecision, CropPlanner, FaceTrackController, FeatureFlags, FrameBuffer, PixelLayout,
    Target, TrackingConfig,
};
