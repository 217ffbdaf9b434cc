//! Automatic pan/tilt/zoom driven by face detection metadata.
//!
//! A fixed camera feed is reframed by cropping: the crop shrinks around
//! the tracked faces (zoom), follows them (pan/tilt), and widens back to
//! the full frame once they are gone.
//!
//! # Architecture
//!
//! ```text
//!  Detector metadata (JSON)
//!          │
//!          ▼
//! ┌──────────────────┐
//! │  Metadata parser │ ← Confidence filter, face cap
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │ Temporal smoother│ ← Leap gating, face-count hysteresis, moving average
//! └────────┬─────────┘
//!          │ Option<Target>
//!          ▼
//! ┌──────────────────┐     ┌────────────────┐
//! │   Crop planner   │ ◄── │ Rate controller│ ← fps → zoom / pan speed tiers
//! └────────┬─────────┘     └────────────────┘
//!          │ CropRect
//!          ▼
//! ┌──────────────────┐
//! │  Overlay (debug) │ ← Face boxes remapped into the cropped output
//! └──────────────────┘
//! ```
//!
//! Every component is owned by one [`FaceTrackController`]; one controller
//! serves exactly one stream.

pub mod config;
pub mod controller;
pub mod crop_planner;
pub mod frame;
pub mod metadata;
pub mod overlay;
pub mod rate;
pub mod smoother;

#[cfg(test)]
mod tests;

pub use config::{FeatureFlags, TierValues, TrackingConfig};
pub use controller::{remap_faces, FaceTrackController};
pub use crop_planner::{CropDecision, CropPlanner, Target};
pub use frame::{FrameBuffer, PixelLayout, PlaneGeometry};
pub use metadata::parse_faces;
pub use overlay::{draw_boxes, OverlayColor};
pub use rate::{FrameRateEstimator, MovingParams, RateController, RateTier, ZoomCurve};
pub use smoother::{SmoothingWindow, TemporalSmoother};
