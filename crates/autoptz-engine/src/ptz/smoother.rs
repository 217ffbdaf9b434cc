//! Temporal smoothing of the tracking target.
//!
//! Two mechanisms keep the virtual camera calm:
//! - an update gate that only re-evaluates every `leap` frames and
//!   requires a new face count to hold for `decision_threshold` frames
//!   before it is accepted, so one flickering detection cannot trigger a move
//! - a sliding window averaging the last accepted target rectangles

use std::collections::VecDeque;

use autoptz_models::CropRect;
use tracing::{debug, trace};

use super::config::TrackingConfig;

/// Running component-wise sum of crop rectangles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct RectSum {
    top: i64,
    bottom: i64,
    left: i64,
    right: i64,
}

impl RectSum {
    fn add(&mut self, rect: &CropRect) {
        self.top += rect.top as i64;
        self.bottom += rect.bottom as i64;
        self.left += rect.left as i64;
        self.right += rect.right as i64;
    }

    fn sub(&mut self, rect: &CropRect) {
        self.top -= rect.top as i64;
        self.bottom -= rect.bottom as i64;
        self.left -= rect.left as i64;
        self.right -= rect.right as i64;
    }
}

/// Fixed-capacity queue of rectangles with an incrementally kept sum.
#[derive(Debug, Clone)]
pub struct SmoothingWindow {
    rects: VecDeque<CropRect>,
    sum: RectSum,
    capacity: usize,
}

impl SmoothingWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            rects: VecDeque::with_capacity(capacity),
            sum: RectSum::default(),
            capacity,
        }
    }

    /// Push a rectangle, evicting the oldest one when full. O(1).
    pub fn push(&mut self, rect: CropRect) {
        if self.rects.len() == self.capacity {
            if let Some(oldest) = self.rects.pop_front() {
                self.sum.sub(&oldest);
            }
        }
        self.sum.add(&rect);
        self.rects.push_back(rect);
    }

    /// Mean of the queued rectangles, truncated toward zero.
    pub fn average(&self) -> CropRect {
        let n = self.rects.len() as i64;
        if n == 0 {
            return CropRect::default();
        }
        CropRect::new(
            (self.sum.top / n) as i32,
            (self.sum.bottom / n) as i32,
            (self.sum.left / n) as i32,
            (self.sum.right / n) as i32,
        )
    }

    pub fn len(&self) -> usize {
        self.rects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.rects.clear();
        self.sum = RectSum::default();
    }
}

/// Gates target updates and smooths accepted targets.
#[derive(Debug, Clone)]
pub struct TemporalSmoother {
    window: SmoothingWindow,
    base_leap: u32,
    low_fps_leap: u32,
    low_fps_threshold: f64,
    leap: u32,
    decision_threshold: u32,
    /// Frames since the last decision
    frame_counter: u32,
    /// Face count accepted by the last decision
    selected_count: usize,
    /// Face count seen on the previous frame
    previous_count: usize,
    /// Consecutive frames `previous_count` has held
    stable_frames: u32,
}

impl TemporalSmoother {
    pub fn new(config: &TrackingConfig) -> Self {
        Self {
            window: SmoothingWindow::new(config.smoothing_capacity),
            base_leap: config.leap.max(1),
            low_fps_leap: config.low_fps_leap.max(1),
            low_fps_threshold: config.low_fps_threshold,
            leap: config.leap.max(1),
            decision_threshold: config.decision_threshold,
            frame_counter: 0,
            selected_count: 0,
            previous_count: 0,
            stable_frames: 0,
        }
    }

    /// Pick the leap for the measured frame rate. Unknown fps keeps the current leap.
    pub fn adapt_leap(&mut self, fps: Option<f64>) {
        let Some(fps) = fps else {
            return;
        };
        let leap = if fps <= self.low_fps_threshold {
            self.low_fps_leap
        } else {
            self.base_leap
        };
        if leap != self.leap {
            debug!(fps, from = self.leap, to = leap, "Smoothing leap changed");
            self.leap = leap;
        }
    }

    /// Record this frame's face count and report whether a target update is due.
    ///
    /// The count is tracked every frame; the decision itself runs once per
    /// `leap` frames. A count equal to the selected one is accepted right
    /// away, a new count only after holding for `decision_threshold` frames.
    pub fn needs_update(&mut self, face_count: usize) -> bool {
        if face_count == self.previous_count {
            self.stable_frames = self.stable_frames.saturating_add(1);
        } else {
            self.stable_frames = 0;
            self.previous_count = face_count;
        }

        self.frame_counter += 1;
        if self.frame_counter < self.leap {
            return false;
        }
        self.frame_counter = 0;

        if face_count == self.selected_count {
            self.stable_frames = 0;
            trace!(face_count, "Face count unchanged, update accepted");
            return true;
        }

        if self.stable_frames >= self.decision_threshold {
            debug!(
                from = self.selected_count,
                to = face_count,
                stable_frames = self.stable_frames,
                "Face count settled, update accepted"
            );
            self.selected_count = face_count;
            self.stable_frames = 0;
            return true;
        }

        false
    }

    /// Add an accepted target rectangle to the window.
    pub fn push(&mut self, rect: CropRect) {
        self.window.push(rect);
    }

    /// Sliding-window mean of the accepted rectangles.
    pub fn average(&self) -> CropRect {
        self.window.average()
    }

    /// Drop every smoothed rectangle, keeping the gating state.
    pub fn clear_window(&mut self) {
        self.window.clear();
    }

    pub fn leap(&self) -> u32 {
        self.leap
    }

    pub fn selected_count(&self) -> usize {
        self.selected_count
    }

    pub fn window(&self) -> &SmoothingWindow {
        &self.window
    }
}
