//! PTZ control loop producing one crop rectangle per frame.
//!
//! ```text
//!            target                    zoom level at max
//!   NORMAL ──────────► (zooming in) ─────────────────────► ZOOM_IN
//!     ▲                                                    │    ▲
//!     │ zoom level 0                   target moved        │    │ move done
//!     │                                                    ▼    │
//!   ZOOM_OUT ◄──────────── target lost ─────────────── PAN_AND_TILT
//! ```
//!
//! The crop is always centered on the aim point and clamped so it stays
//! inside the frame. Its size comes from the active zoom curve:
//! `frame_dimension - step * curve[zoom_level]`.

use autoptz_models::{Center, CropRect, ZoomState};
use std::time::Instant;
use tracing::{debug, trace};

use super::config::TrackingConfig;
use super::rate::{MovingParams, RateController};
use crate::error::{PtzError, PtzResult};

/// Where the camera should aim, and how large the subject is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub center: Center,
    pub width: u32,
    pub height: u32,
}

impl Target {
    /// Build a target from a center point.
    ///
    /// A center of exactly `(0, 0)` means "lost track" and yields `None`.
    // TODO: carry an explicit lost-track flag from the detector so a face
    // centered on the top-left pixel is not mistaken for no face.
    pub fn from_center(x: i32, y: i32, width: u32, height: u32) -> Option<Self> {
        if x == 0 && y == 0 {
            return None;
        }
        Some(Self {
            center: Center::new(x, y),
            width,
            height,
        })
    }

    /// Target covering the visible region of `rect` in a `frame_width x frame_height` frame.
    pub fn from_rect(rect: &CropRect, frame_width: u32, frame_height: u32) -> Option<Self> {
        let center = rect.center(frame_width, frame_height);
        Self::from_center(
            center.x,
            center.y,
            rect.visible_width(frame_width).max(0) as u32,
            rect.visible_height(frame_height).max(0) as u32,
        )
    }
}

/// Result of one planning step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropDecision {
    pub crop: CropRect,
    /// True when `crop` differs from what was last applied
    pub changed: bool,
}

/// An in-flight pan/tilt move.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct PanMove {
    start: Center,
    end: Center,
    duration: u32,
    step: u32,
}

impl PanMove {
    fn position(&self) -> Center {
        let duration = self.duration.max(1) as i64;
        let step = self.step.min(self.duration) as i64;
        let lerp = |a: i32, b: i32| (a as i64 + (b as i64 - a as i64) * step / duration) as i32;
        Center::new(
            lerp(self.start.x, self.end.x),
            lerp(self.start.y, self.end.y),
        )
    }

    fn is_done(&self) -> bool {
        self.step >= self.duration
    }
}

/// Crop planner for one video stream.
pub struct CropPlanner {
    frame_width: u32,
    frame_height: u32,
    max_pan_step: i32,
    face_frame_ratio: f64,
    max_zoom: f64,
    rate: RateController,
    state: ZoomState,
    params: MovingParams,
    center: Center,
    /// Pixels trimmed per unit of curve value, per axis
    zoom_step: (f64, f64),
    pan: PanMove,
    crop: CropRect,
}

impl CropPlanner {
    /// Create a planner for a `frame_width x frame_height` stream.
    pub fn new(config: &TrackingConfig, frame_width: u32, frame_height: u32) -> PtzResult<Self> {
        if frame_width == 0 || frame_height == 0 {
            return Err(PtzError::invalid_dimensions(frame_width, frame_height));
        }
        Ok(Self {
            frame_width,
            frame_height,
            max_pan_step: config.max_pan_step,
            face_frame_ratio: config.face_frame_ratio,
            max_zoom: config.max_zoom,
            rate: RateController::new(config),
            state: ZoomState::Normal,
            params: MovingParams::default(),
            center: Center::default(),
            zoom_step: (0.0, 0.0),
            pan: PanMove::default(),
            crop: CropRect::IDENTITY,
        })
    }

    /// Switch to new frame dimensions, restarting from the full frame.
    ///
    /// The frame rate history is kept.
    pub fn resize(&mut self, frame_width: u32, frame_height: u32) -> PtzResult<()> {
        if frame_width == 0 || frame_height == 0 {
            return Err(PtzError::invalid_dimensions(frame_width, frame_height));
        }
        if (frame_width, frame_height) == (self.frame_width, self.frame_height) {
            return Ok(());
        }
        debug!(
            from_width = self.frame_width,
            from_height = self.frame_height,
            to_width = frame_width,
            to_height = frame_height,
            "Frame size changed, resetting PTZ"
        );
        self.frame_width = frame_width;
        self.frame_height = frame_height;
        self.state = ZoomState::Normal;
        self.params.zoom_level = 0;
        self.center = Center::default();
        self.zoom_step = (0.0, 0.0);
        self.pan = PanMove::default();
        self.crop = CropRect::IDENTITY;
        Ok(())
    }

    /// Record a frame timestamp for rate control.
    pub fn record_frame(&mut self, now: Instant) {
        self.rate.push_sample(now);
    }

    /// Measured frames per second, if known.
    pub fn current_fps(&self) -> Option<f64> {
        self.rate.current_fps()
    }

    /// Advance the control loop by one frame.
    pub fn plan(&mut self, target: Option<Target>) -> CropDecision {
        match self.state {
            ZoomState::Normal => self.plan_normal(target),
            ZoomState::ZoomIn => self.plan_zoom_in(target),
            ZoomState::PanAndTilt => self.plan_pan_and_tilt(),
            ZoomState::ZoomOut => self.plan_zoom_out(),
        }
    }

    fn plan_normal(&mut self, target: Option<Target>) -> CropDecision {
        if self.params.zoom_level == 0 {
            self.params.zoom_tier = self.rate.refresh_zoom_tier();
        }

        let Some(target) = target else {
            if self.params.zoom_level > 0 {
                // lost before the zoom-in finished
                self.transition(ZoomState::ZoomOut);
            }
            return self.unchanged();
        };

        let max_level = self.rate.zoom_curve().0.max_level();
        self.center = target.center;
        self.zoom_step = self.zoom_step_for(&target, max_level);
        self.params.zoom_level = (self.params.zoom_level + 1).min(max_level);
        let decision = self.recompute_crop();

        if self.params.zoom_level == max_level {
            self.transition(ZoomState::ZoomIn);
        }
        decision
    }

    fn plan_zoom_in(&mut self, target: Option<Target>) -> CropDecision {
        let Some(target) = target else {
            self.transition(ZoomState::ZoomOut);
            return self.unchanged();
        };
        if target.center == self.center {
            return self.unchanged();
        }

        let limit = self.max_pan_step.max(0);
        let dx = target.center.x.saturating_sub(self.center.x).clamp(-limit, limit);
        let dy = target.center.y.saturating_sub(self.center.y).clamp(-limit, limit);
        let duration = self.rate.refresh_pan_tilt_tier();
        self.params.pan_tilt_tier = self.rate.pan_tilt_tier();
        self.pan = PanMove {
            start: self.center,
            end: Center::new(self.center.x + dx, self.center.y + dy),
            duration,
            step: 0,
        };
        trace!(dx, dy, duration, "Pan/tilt move captured");
        self.transition(ZoomState::PanAndTilt);
        self.unchanged()
    }

    fn plan_pan_and_tilt(&mut self) -> CropDecision {
        self.pan.step += 1;
        self.center = self.pan.position();
        let decision = self.recompute_crop();
        if self.pan.is_done() {
            self.transition(ZoomState::ZoomIn);
        }
        decision
    }

    fn plan_zoom_out(&mut self) -> CropDecision {
        self.params.zoom_level = self.params.zoom_level.saturating_sub(1);
        let decision = self.recompute_crop();
        if self.params.zoom_level == 0 {
            self.transition(ZoomState::Normal);
            self.params.zoom_tier = self.rate.refresh_zoom_tier();
        }
        decision
    }

    /// Per-axis pixels trimmed per curve unit so the last level frames `target`.
    fn zoom_step_for(&self, target: &Target, max_level: u32) -> (f64, f64) {
        let frame_w = self.frame_width as f64;
        let frame_h = self.frame_height as f64;
        let wanted_w = target.width as f64 * self.face_frame_ratio;
        let wanted_h = target.height as f64 * self.face_frame_ratio;

        // uniform zoom keeps the frame aspect ratio
        let zoom = (frame_w / wanted_w)
            .min(frame_h / wanted_h)
            .min(self.max_zoom)
            .max(1.0);
        let steps = max_level.max(1) as f64;
        (
            (frame_w - frame_w / zoom) / steps,
            (frame_h - frame_h / zoom) / steps,
        )
    }

    /// Size the crop from the zoom curve, center it on the aim point and clamp it into the frame.
    fn recompute_crop(&mut self) -> CropDecision {
        let progress = self.rate.zoom_curve().0.value(self.params.zoom_level);
        let (left, right) = place_span(
            self.frame_width,
            self.zoom_step.0 * progress,
            self.center.x,
        );
        let (top, bottom) = place_span(
            self.frame_height,
            self.zoom_step.1 * progress,
            self.center.y,
        );
        self.crop = CropRect::new(top, bottom, left, right);
        metrics::counter!("autoptz_crop_updates_total").increment(1);
        trace!(
            state = %self.state,
            zoom_level = self.params.zoom_level,
            top, bottom, left, right,
            "Crop recomputed"
        );
        CropDecision {
            crop: self.crop,
            changed: true,
        }
    }

    fn unchanged(&self) -> CropDecision {
        CropDecision {
            crop: self.crop,
            changed: false,
        }
    }

    fn transition(&mut self, to: ZoomState) {
        debug!(
            from = %self.state,
            to = %to,
            zoom_level = self.params.zoom_level,
            center_x = self.center.x,
            center_y = self.center.y,
            "PTZ state transition"
        );
        metrics::counter!("autoptz_state_transitions_total", "to" => to.as_str()).increment(1);
        self.state = to;
    }

    pub fn state(&self) -> ZoomState {
        self.state
    }

    pub fn zoom_level(&self) -> u32 {
        self.params.zoom_level
    }

    pub fn params(&self) -> MovingParams {
        self.params
    }

    pub fn center(&self) -> Center {
        self.center
    }

    /// The crop last produced.
    pub fn crop(&self) -> CropRect {
        self.crop
    }

    pub fn frame_size(&self) -> (u32, u32) {
        (self.frame_width, self.frame_height)
    }

    pub fn rate(&self) -> &RateController {
        &self.rate
    }
}

/// Place a span of `frame - trim` pixels centered on `center`, clamped into
/// `[0, frame)`. Returns the pixels removed before and after it.
///
/// The span is at least one pixel wide, so `before + after < frame`.
fn place_span(frame: u32, trim: f64, center: i32) -> (i32, i32) {
    let frame = frame as i64;
    let span = ((frame as f64 - trim).round() as i64).clamp(1, frame);
    let before = (center as i64 - span / 2).clamp(0, frame - span);
    let after = frame - span - before;
    (before as i32, after as i32)
}
