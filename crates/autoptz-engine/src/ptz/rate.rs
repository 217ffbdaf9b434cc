//! Frame-rate driven motion speeds.
//!
//! The crop planner moves in discrete steps, one per frame. To keep the
//! perceived zoom and pan speed stable, the number of steps per move is
//! picked from three tiers according to the measured frame rate:
//!
//! | fps        | zoom steps | pan/tilt frames |
//! |------------|------------|-----------------|
//! | >= 20      | 40         | 10              |
//! | >= 10      | 20         | 5               |
//! | below      | 10         | 3               |
//!
//! Each zoom tier owns an eased curve so zooms accelerate and decelerate
//! instead of moving at constant speed.

use std::collections::VecDeque;
use std::fmt;
use std::time::Instant;

use tracing::debug;

use super::config::{TierValues, TrackingConfig};

/// Bounded window of frame timestamps.
#[derive(Debug, Clone)]
pub struct FrameRateEstimator {
    samples: VecDeque<Instant>,
    capacity: usize,
}

impl FrameRateEstimator {
    /// Create an estimator keeping at most `capacity` timestamps.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record a frame at `now`, evicting the oldest sample when full.
    pub fn push_sample(&mut self, now: Instant) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(now);
    }

    /// Number of timestamps currently held.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Frames per second over the window: `count * 1000 / span_ms`.
    ///
    /// `None` until two samples spanning a non-zero interval exist.
    pub fn current_fps(&self) -> Option<f64> {
        if self.samples.len() < 2 {
            return None;
        }
        let first = self.samples.front()?;
        let last = self.samples.back()?;
        let span_ms = last.saturating_duration_since(*first).as_secs_f64() * 1000.0;
        if span_ms <= 0.0 {
            return None;
        }
        Some(self.samples.len() as f64 * 1000.0 / span_ms)
    }
}

/// Speed tier chosen from the measured frame rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RateTier {
    #[default]
    Fast,
    Medium,
    Slow,
}

impl RateTier {
    /// Pick the tier for `fps` given the fast/medium thresholds.
    pub fn for_fps(fps: f64, fast_threshold: f64, medium_threshold: f64) -> Self {
        if fps >= fast_threshold {
            RateTier::Fast
        } else if fps >= medium_threshold {
            RateTier::Medium
        } else {
            RateTier::Slow
        }
    }

    /// Select this tier's entry from a per-tier table.
    pub fn pick(&self, values: &TierValues) -> u32 {
        match self {
            RateTier::Fast => values.fast,
            RateTier::Medium => values.medium,
            RateTier::Slow => values.slow,
        }
    }

    fn index(&self) -> usize {
        match self {
            RateTier::Fast => 0,
            RateTier::Medium => 1,
            RateTier::Slow => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RateTier::Fast => "fast",
            RateTier::Medium => "medium",
            RateTier::Slow => "slow",
        }
    }
}

impl fmt::Display for RateTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Precomputed eased zoom progress, indexed by zoom level `0..=steps`.
///
/// `value(0) == 0`, `value(steps) == steps`, strictly increasing in between.
/// The shape is a smoothstep: slow start, fast middle, slow finish.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoomCurve {
    values: Vec<f64>,
}

impl ZoomCurve {
    /// Build the curve for a tier with `steps` zoom steps.
    pub fn eased(steps: u32) -> Self {
        let steps = steps.max(1);
        let n = steps as f64;
        let values = (0..=steps)
            .map(|level| {
                let t = level as f64 / n;
                n * t * t * (3.0 - 2.0 * t)
            })
            .collect();
        Self { values }
    }

    /// Highest zoom level of this curve.
    pub fn max_level(&self) -> u32 {
        (self.values.len() - 1) as u32
    }

    /// Curve value at `level`, saturating at the last entry.
    pub fn value(&self, level: u32) -> f64 {
        let idx = (level as usize).min(self.values.len() - 1);
        self.values[idx]
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// Motion parameters of the active stream.
///
/// `zoom_level` persists across frames; the tiers follow the frame rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MovingParams {
    pub zoom_level: u32,
    pub zoom_tier: RateTier,
    pub pan_tilt_tier: RateTier,
}

/// Maps the measured frame rate onto zoom and pan/tilt speeds.
#[derive(Debug, Clone)]
pub struct RateController {
    estimator: FrameRateEstimator,
    curves: [ZoomCurve; 3],
    pan_tilt_frames: TierValues,
    fast_threshold: f64,
    medium_threshold: f64,
    zoom_tier: RateTier,
    pan_tilt_tier: RateTier,
}

impl RateController {
    /// Create a rate controller starting in the fast tiers.
    pub fn new(config: &TrackingConfig) -> Self {
        let steps = config.zoom_tier_steps;
        Self {
            estimator: FrameRateEstimator::new(config.fps_window),
            curves: [
                ZoomCurve::eased(steps.fast),
                ZoomCurve::eased(steps.medium),
                ZoomCurve::eased(steps.slow),
            ],
            pan_tilt_frames: config.pan_tilt_tier_frames,
            fast_threshold: config.fast_fps_threshold,
            medium_threshold: config.medium_fps_threshold,
            zoom_tier: RateTier::Fast,
            pan_tilt_tier: RateTier::Fast,
        }
    }

    /// Record a frame timestamp.
    pub fn push_sample(&mut self, now: Instant) {
        self.estimator.push_sample(now);
    }

    /// Measured frames per second, if known.
    pub fn current_fps(&self) -> Option<f64> {
        self.estimator.current_fps()
    }

    /// Re-evaluate the zoom tier. Keeps the current tier while fps is unknown.
    pub fn refresh_zoom_tier(&mut self) -> RateTier {
        if let Some(fps) = self.current_fps() {
            let tier = RateTier::for_fps(fps, self.fast_threshold, self.medium_threshold);
            if tier != self.zoom_tier {
                debug!(fps, from = %self.zoom_tier, to = %tier, "Zoom rate tier changed");
                self.zoom_tier = tier;
            }
        }
        self.zoom_tier
    }

    /// Re-evaluate the pan/tilt tier and return the frames one move takes.
    pub fn refresh_pan_tilt_tier(&mut self) -> u32 {
        if let Some(fps) = self.current_fps() {
            let tier = RateTier::for_fps(fps, self.fast_threshold, self.medium_threshold);
            if tier != self.pan_tilt_tier {
                debug!(fps, from = %self.pan_tilt_tier, to = %tier, "Pan/tilt rate tier changed");
                self.pan_tilt_tier = tier;
            }
        }
        self.pan_tilt_frames()
    }

    /// Curve and tier of the active zoom speed.
    pub fn zoom_curve(&self) -> (&ZoomCurve, RateTier) {
        (&self.curves[self.zoom_tier.index()], self.zoom_tier)
    }

    /// Frames one pan/tilt move takes in the active tier.
    pub fn pan_tilt_frames(&self) -> u32 {
        self.pan_tilt_tier.pick(&self.pan_tilt_frames)
    }

    pub fn zoom_tier(&self) -> RateTier {
        self.zoom_tier
    }

    pub fn pan_tilt_tier(&self) -> RateTier {
        self.pan_tilt_tier
    }
}
