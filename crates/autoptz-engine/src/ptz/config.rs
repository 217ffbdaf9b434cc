//! Configuration for the face tracking PTZ engine.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PtzError, PtzResult};

/// Default sentinel file enabling face-rectangle overlay drawing.
pub const DEFAULT_OVERLAY_FLAG_PATH: &str = "/var/lib/autoptz/debug_draw_faces";

/// Default sentinel file enabling "focus widest face" mode.
pub const DEFAULT_WIDEST_FACE_FLAG_PATH: &str = "/var/lib/autoptz/focus_widest_face";

/// Per-tier values, fastest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierValues {
    pub fast: u32,
    pub medium: u32,
    pub slow: u32,
}

impl TierValues {
    pub const fn new(fast: u32, medium: u32, slow: u32) -> Self {
        Self { fast, medium, slow }
    }

    fn any_zero(&self) -> bool {
        self.fast == 0 || self.medium == 0 || self.slow == 0
    }
}

/// Configuration for one tracked video stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    // === Face Filtering ===
    /// Faces below this confidence are discarded (default: 70)
    pub confidence_threshold: u16,

    /// Faces kept per frame; the rest are ignored (default: 6)
    pub max_faces: usize,

    // === Temporal Smoothing ===
    /// Frames between update decisions (default: 6)
    pub leap: u32,

    /// Leap used once fps drops to `low_fps_threshold` or below (default: 3)
    pub low_fps_leap: u32,

    /// Fps at or below which `low_fps_leap` applies (default: 15.0)
    pub low_fps_threshold: f64,

    /// Rectangles averaged by the smoothing window (default: 8)
    pub smoothing_capacity: usize,

    /// Same-count frames required before a new face count is accepted (default: 10)
    pub decision_threshold: u32,

    // === Rate Control ===
    /// Timestamps kept by the fps estimator (default: 120)
    pub fps_window: usize,

    /// Fps at or above which the fast tiers apply (default: 20.0)
    pub fast_fps_threshold: f64,

    /// Fps at or above which the medium tiers apply (default: 10.0)
    pub medium_fps_threshold: f64,

    /// Zoom steps from full frame to full zoom, per tier (default: 40/20/10)
    pub zoom_tier_steps: TierValues,

    /// Frames to complete one pan/tilt move, per tier (default: 10/5/3)
    pub pan_tilt_tier_frames: TierValues,

    // === Crop Planning ===
    /// Largest per-axis aim point displacement of one pan/tilt move (default: 60)
    pub max_pan_step: i32,

    /// Face widths spanned by the fully zoomed crop (default: 3.0)
    pub face_frame_ratio: f64,

    /// Largest magnification relative to the full frame (default: 2.0)
    pub max_zoom: f64,

    // === Debug Toggles ===
    /// Sentinel file enabling overlay drawing
    pub overlay_flag_path: PathBuf,

    /// Sentinel file enabling "focus widest face" mode
    pub widest_face_flag_path: PathBuf,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 70,
            max_faces: 6,

            leap: 6,
            low_fps_leap: 3,
            low_fps_threshold: 15.0,
            smoothing_capacity: 8,
            decision_threshold: 10,

            fps_window: 120,
            fast_fps_threshold: 20.0,
            medium_fps_threshold: 10.0,
            zoom_tier_steps: TierValues::new(40, 20, 10),
            pan_tilt_tier_frames: TierValues::new(10, 5, 3),

            max_pan_step: 60,
            face_frame_ratio: 3.0,
            max_zoom: 2.0,

            overlay_flag_path: PathBuf::from(DEFAULT_OVERLAY_FLAG_PATH),
            widest_face_flag_path: PathBuf::from(DEFAULT_WIDEST_FACE_FLAG_PATH),
        }
    }
}

impl TrackingConfig {
    /// Create config from `AUTOPTZ_*` environment variables.
    ///
    /// Unset or unparsable variables keep their default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            confidence_threshold: env_or(
                "AUTOPTZ_CONFIDENCE_THRESHOLD",
                defaults.confidence_threshold,
            ),
            max_faces: env_or("AUTOPTZ_MAX_FACES", defaults.max_faces),
            leap: env_or("AUTOPTZ_LEAP", defaults.leap),
            low_fps_leap: env_or("AUTOPTZ_LOW_FPS_LEAP", defaults.low_fps_leap),
            low_fps_threshold: env_or("AUTOPTZ_LOW_FPS_THRESHOLD", defaults.low_fps_threshold),
            smoothing_capacity: env_or("AUTOPTZ_SMOOTHING_WINDOW", defaults.smoothing_capacity),
            decision_threshold: env_or("AUTOPTZ_DECISION_THRESHOLD", defaults.decision_threshold),
            fps_window: env_or("AUTOPTZ_FPS_WINDOW", defaults.fps_window),
            max_pan_step: env_or("AUTOPTZ_MAX_PAN_STEP", defaults.max_pan_step),
            face_frame_ratio: env_or("AUTOPTZ_FACE_FRAME_RATIO", defaults.face_frame_ratio),
            max_zoom: env_or("AUTOPTZ_MAX_ZOOM", defaults.max_zoom),
            overlay_flag_path: std::env::var("AUTOPTZ_OVERLAY_FLAG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| defaults.overlay_flag_path.clone()),
            widest_face_flag_path: std::env::var("AUTOPTZ_WIDEST_FACE_FLAG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| defaults.widest_face_flag_path.clone()),
            ..defaults
        }
    }

    /// Load config from a JSON file. Missing keys keep their default.
    pub fn from_json_file(path: impl AsRef<Path>) -> PtzResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PtzError::ConfigNotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        debug!(path = %path.display(), "Loaded tracking config");
        Ok(config)
    }

    /// Check that every tunable is usable.
    pub fn validate(&self) -> PtzResult<()> {
        if self.max_faces == 0 {
            return Err(PtzError::invalid_config("max_faces must be at least 1"));
        }
        if self.leap == 0 || self.low_fps_leap == 0 {
            return Err(PtzError::invalid_config("leap intervals must be at least 1"));
        }
        if self.smoothing_capacity == 0 {
            return Err(PtzError::invalid_config("smoothing_capacity must be at least 1"));
        }
        if self.fps_window < 2 {
            return Err(PtzError::invalid_config("fps_window must hold at least 2 samples"));
        }
        if self.zoom_tier_steps.any_zero() || self.pan_tilt_tier_frames.any_zero() {
            return Err(PtzError::invalid_config("tier values must be at least 1"));
        }
        if !(self.fast_fps_threshold >= self.medium_fps_threshold
            && self.medium_fps_threshold >= 0.0)
        {
            return Err(PtzError::invalid_config(format!(
                "fps thresholds out of order: fast={} medium={}",
                self.fast_fps_threshold, self.medium_fps_threshold
            )));
        }
        if self.max_pan_step <= 0 {
            return Err(PtzError::invalid_config("max_pan_step must be positive"));
        }
        if !(self.face_frame_ratio > 0.0) {
            return Err(PtzError::invalid_config("face_frame_ratio must be positive"));
        }
        if !(self.max_zoom >= 1.0) {
            return Err(PtzError::invalid_config("max_zoom must be at least 1.0"));
        }
        Ok(())
    }
}

/// Debug toggles read from sentinel files once per stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Draw face rectangles into output frames
    pub draw_overlay: bool,
    /// Track only the largest face instead of the union of all faces
    pub focus_widest_face: bool,
}

impl FeatureFlags {
    /// Check the sentinel files named by `config`.
    pub fn detect(config: &TrackingConfig) -> Self {
        let flags = Self {
            draw_overlay: config.overlay_flag_path.exists(),
            focus_widest_face: config.widest_face_flag_path.exists(),
        };
        info!(
            draw_overlay = flags.draw_overlay,
            focus_widest_face = flags.focus_widest_face,
            "Face tracking debug toggles"
        );
        flags
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
