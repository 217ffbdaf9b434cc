//! Per-stream face tracking: metadata in, crop rectangle out.
//!
//! Each frame runs
//! 1. parse and filter the detector's face metadata
//! 2. pick one face (widest, or the union of all)
//! 3. gate and smooth it through the [`TemporalSmoother`]
//! 4. advance the [`CropPlanner`] toward the smoothed target
//!
//! The resulting crop is handed to the caller only when it changed.

use std::time::Instant;

use autoptz_models::{CropRect, FaceBox, ZoomState};
use tracing::{debug, info, warn};

use super::config::{FeatureFlags, TrackingConfig};
use super::crop_planner::{CropPlanner, Target};
use super::frame::FrameBuffer;
use super::metadata::parse_faces;
use super::overlay::OverlayColor;
use super::smoother::TemporalSmoother;
use crate::error::PtzResult;

/// Face tracking controller for one video stream.
pub struct FaceTrackController {
    config: TrackingConfig,
    flags: FeatureFlags,
    smoother: TemporalSmoother,
    planner: Option<CropPlanner>,
    /// Faces detected on the current frame, full-frame coordinates
    faces: Vec<FaceBox>,
    /// Target of the last accepted update
    target: Option<Target>,
    /// Crop changed since the caller last took it
    crop_dirty: bool,
    /// Crop last handed to the caller, the one the output frames carry
    applied_crop: CropRect,
}

impl FaceTrackController {
    /// Create a controller, reading the debug toggles from their sentinel files.
    pub fn new(config: TrackingConfig) -> PtzResult<Self> {
        let flags = FeatureFlags::detect(&config);
        Self::with_flags(config, flags)
    }

    /// Create a controller with explicit debug toggles.
    pub fn with_flags(config: TrackingConfig, flags: FeatureFlags) -> PtzResult<Self> {
        config.validate()?;
        info!(
            confidence_threshold = config.confidence_threshold,
            leap = config.leap,
            smoothing_capacity = config.smoothing_capacity,
            focus_widest_face = flags.focus_widest_face,
            "Face tracking enabled"
        );
        Ok(Self {
            smoother: TemporalSmoother::new(&config),
            config,
            flags,
            planner: None,
            faces: Vec::new(),
            target: None,
            crop_dirty: false,
            applied_crop: CropRect::IDENTITY,
        })
    }

    /// Feed one frame's metadata.
    pub fn update(&mut self, metadata: &[u8], width: u32, height: u32) {
        self.update_at(metadata, width, height, Instant::now());
    }

    /// Feed one frame's metadata, captured at `now`.
    pub fn update_at(&mut self, metadata: &[u8], width: u32, height: u32, now: Instant) {
        let Some(planner) = self.planner_for(width, height) else {
            return;
        };
        planner.record_frame(now);
        let fps = planner.current_fps();
        if let Some(fps) = fps {
            metrics::gauge!("autoptz_fps").set(fps);
        }
        self.smoother.adapt_leap(fps);

        self.faces = parse_faces(
            metadata,
            self.config.confidence_threshold,
            self.config.max_faces,
        );

        let previous_count = self.smoother.selected_count();
        if self.smoother.needs_update(self.faces.len()) {
            if (previous_count == 0) != self.faces.is_empty() {
                // whole-frame rects and face rects never share a window
                self.smoother.clear_window();
            }
            let face = self
                .select_face()
                .unwrap_or_else(|| FaceBox::whole_frame(width, height));
            self.smoother.push(CropRect::around(&face, width, height));
            self.target = if self.faces.is_empty() {
                None
            } else {
                Target::from_rect(&self.smoother.average(), width, height)
            };
            metrics::counter!("autoptz_target_updates_total").increment(1);
            debug!(
                faces = self.faces.len(),
                target = ?self.target,
                "Tracking target updated"
            );
        }

        let target = self.target;
        if let Some(planner) = self.planner.as_mut() {
            let decision = planner.plan(target);
            self.crop_dirty |= decision.changed;
        }
    }

    /// The planner for this frame size, created or reset as needed.
    fn planner_for(&mut self, width: u32, height: u32) -> Option<&mut CropPlanner> {
        if width == 0 || height == 0 {
            debug!(width, height, "Skipping frame without dimensions");
            return None;
        }
        match self.planner.as_mut() {
            Some(planner) => {
                if planner.frame_size() != (width, height) {
                    if let Err(e) = planner.resize(width, height) {
                        warn!(error = %e, "Cannot resize crop planner");
                        return None;
                    }
                    self.target = None;
                    self.crop_dirty = true;
                }
            }
            None => match CropPlanner::new(&self.config, width, height) {
                Ok(planner) => {
                    info!(width, height, "Crop planner created");
                    self.planner = Some(planner);
                }
                Err(e) => {
                    warn!(error = %e, "Cannot create crop planner");
                    return None;
                }
            },
        }
        self.planner.as_mut()
    }

    /// The single face to track this frame.
    ///
    /// Widest-face mode picks the largest box; otherwise all faces merge
    /// into their bounding union.
    fn select_face(&self) -> Option<FaceBox> {
        match self.faces.as_slice() {
            [] => None,
            [only] => Some(*only),
            faces if self.flags.focus_widest_face => faces
                .iter()
                .copied()
                .reduce(|widest, face| {
                    if face.area() > widest.area() {
                        face
                    } else {
                        widest
                    }
                }),
            faces => FaceBox::union(faces),
        }
    }

    /// Crop to apply, if it changed since the last call.
    pub fn take_crop_change(&mut self) -> Option<CropRect> {
        if !std::mem::take(&mut self.crop_dirty) {
            return None;
        }
        self.applied_crop = self.crop();
        Some(self.applied_crop)
    }

    /// Current frame's faces mapped into the output of `rect`.
    pub fn remap(&self, rect: &CropRect) -> Vec<FaceBox> {
        match self.planner.as_ref() {
            Some(planner) => {
                let (width, height) = planner.frame_size();
                remap_faces(rect, width, height, &self.faces)
            }
            None => Vec::new(),
        }
    }

    /// Draw the current faces when the overlay is on.
    ///
    /// Boxes are remapped through [`applied_crop`](Self::applied_crop), so a
    /// crop the planner computed but the caller has not taken yet does not
    /// shift them. Returns the number of boxes drawn.
    pub fn draw_overlay(&self, frame: &mut FrameBuffer<'_>) -> usize {
        if !self.flags.draw_overlay {
            return 0;
        }
        let faces = self.remap(&self.applied_crop);
        frame.draw_faces(&faces, OverlayColor::default())
    }

    /// The crop the planner produced last.
    pub fn crop(&self) -> CropRect {
        self.planner
            .as_ref()
            .map(CropPlanner::crop)
            .unwrap_or(CropRect::IDENTITY)
    }

    /// The crop last returned by [`take_crop_change`](Self::take_crop_change).
    pub fn applied_crop(&self) -> CropRect {
        self.applied_crop
    }

    pub fn state(&self) -> ZoomState {
        self.planner
            .as_ref()
            .map(CropPlanner::state)
            .unwrap_or_default()
    }

    pub fn faces(&self) -> &[FaceBox] {
        &self.faces
    }

    pub fn target(&self) -> Option<Target> {
        self.target
    }

    pub fn planner(&self) -> Option<&CropPlanner> {
        self.planner.as_ref()
    }

    pub fn smoother(&self) -> &TemporalSmoother {
        &self.smoother
    }

    pub fn flags(&self) -> FeatureFlags {
        self.flags
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }
}

/// Map full-frame face boxes into the output of `rect`.
///
/// The visible region is scaled back up to `frame_width x frame_height`:
/// `x' = (x - left) * W / visible_width`, likewise for y. Boxes are clipped
/// to the output and dropped when nothing of them remains visible.
pub fn remap_faces(
    rect: &CropRect,
    frame_width: u32,
    frame_height: u32,
    faces: &[FaceBox],
) -> Vec<FaceBox> {
    let visible_w = rect.visible_width(frame_width) as i64;
    let visible_h = rect.visible_height(frame_height) as i64;
    if visible_w <= 0 || visible_h <= 0 {
        return Vec::new();
    }
    let out_w = frame_width as i64;
    let out_h = frame_height as i64;
    let map = |value: i64, offset: i32, out: i64, visible: i64| {
        ((value - offset as i64) * out / visible).clamp(0, out)
    };

    faces
        .iter()
        .filter_map(|face| {
            let x1 = map(face.x as i64, rect.left, out_w, visible_w);
            let x2 = map(face.x2() as i64, rect.left, out_w, visible_w);
            let y1 = map(face.y as i64, rect.top, out_h, visible_h);
            let y2 = map(face.y2() as i64, rect.top, out_h, visible_h);
            let (w, h) = (x2 - x1, y2 - y1);
            if w <= 0 || h <= 0 {
                return None;
            }
            Some(FaceBox::new(
                to_u16(x1),
                to_u16(y1),
                to_u16(w),
                to_u16(h),
                face.confidence,
            ))
        })
        .collect()
}

fn to_u16(value: i64) -> u16 {
    value.clamp(0, u16::MAX as i64) as u16
}
