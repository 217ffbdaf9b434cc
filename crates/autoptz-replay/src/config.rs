//! Replay configuration.

use autoptz_engine::PixelLayout;

/// Settings for one replay run.
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Frame rate assumed for records without a timestamp
    pub default_fps: f64,
    /// Frame size for records that omit it
    pub frame_width: u32,
    pub frame_height: u32,
    /// Only print frames whose crop changed
    pub changes_only: bool,
    /// Layout of overlay frames written to disk
    pub layout: PixelLayout,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            default_fps: 30.0,
            frame_width: 1920,
            frame_height: 1080,
            changes_only: false,
            layout: PixelLayout::Nv12,
        }
    }
}

impl ReplayConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_fps: std::env::var("REPLAY_FPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|fps: &f64| *fps > 0.0)
                .unwrap_or(defaults.default_fps),
            frame_width: std::env::var("REPLAY_WIDTH")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.frame_width),
            frame_height: std::env::var("REPLAY_HEIGHT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.frame_height),
            changes_only: std::env::var("REPLAY_CHANGES_ONLY")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.changes_only),
            layout: std::env::var("REPLAY_LAYOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.layout),
        }
    }

    /// Milliseconds between frames at the default frame rate.
    pub fn frame_interval_ms(&self) -> f64 {
        1000.0 / self.default_fps
    }
}
