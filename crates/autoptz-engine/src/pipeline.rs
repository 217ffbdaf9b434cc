//! Per-stream post-processing, selected once at stream setup.

use std::time::Instant;

use autoptz_models::CropRect;
use tracing::info;

use crate::error::PtzResult;
use crate::ptz::{FaceTrackController, FeatureFlags, FrameBuffer, TrackingConfig};

/// What a stream does with each frame after the detector has run.
pub enum StreamProcessor {
    /// Frames pass through untouched.
    Passthrough,
    /// Faces drive a virtual pan/tilt/zoom crop.
    FaceTracking(Box<FaceTrackController>),
}

impl StreamProcessor {
    /// Face tracking with debug toggles read from their sentinel files.
    pub fn face_tracking(config: TrackingConfig) -> PtzResult<Self> {
        Ok(Self::FaceTracking(Box::new(FaceTrackController::new(config)?)))
    }

    /// Face tracking with explicit debug toggles.
    pub fn face_tracking_with_flags(
        config: TrackingConfig,
        flags: FeatureFlags,
    ) -> PtzResult<Self> {
        Ok(Self::FaceTracking(Box::new(FaceTrackController::with_flags(
            config, flags,
        )?)))
    }

    /// Pick the processor for a stream.
    pub fn for_stream(tracking: bool, config: TrackingConfig) -> PtzResult<Self> {
        if tracking {
            Self::face_tracking(config)
        } else {
            info!("Face tracking disabled, passing frames through");
            Ok(Self::Passthrough)
        }
    }

    /// First per-frame call: hand over the detector metadata.
    pub fn push_metadata(&mut self, metadata: &[u8], width: u32, height: u32) {
        match self {
            Self::Passthrough => {}
            Self::FaceTracking(controller) => controller.update(metadata, width, height),
        }
    }

    /// [`push_metadata`](Self::push_metadata) for a frame captured at `now`.
    pub fn push_metadata_at(&mut self, metadata: &[u8], width: u32, height: u32, now: Instant) {
        match self {
            Self::Passthrough => {}
            Self::FaceTracking(controller) => controller.update_at(metadata, width, height, now),
        }
    }

    /// Second per-frame call.
    ///
    /// Returns the crop to apply when it changed since the previous frame,
    /// and draws the face overlay into `frame` when that is enabled.
    pub fn post_process(&mut self, frame: Option<&mut FrameBuffer<'_>>) -> Option<CropRect> {
        match self {
            Self::Passthrough => None,
            Self::FaceTracking(controller) => {
                if let Some(frame) = frame {
                    controller.draw_overlay(frame);
                }
                controller.take_crop_change()
            }
        }
    }

    pub fn controller(&self) -> Option<&FaceTrackController> {
        match self {
            Self::Passthrough => None,
            Self::FaceTracking(controller) => Some(controller.as_ref()),
        }
    }

    pub fn controller_mut(&mut self) -> Option<&mut FaceTrackController> {
        match self {
            Self::Passthrough => None,
            Self::FaceTracking(controller) => Some(controller.as_mut()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Passthrough => "passthrough",
            Self::FaceTracking(_) => "face_tracking",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ptz::PixelLayout;

    const FACE: &[u8] =
        br#"{"faces": [{"confidence": 90, "x": 160, "y": 120, "w": 100, "h": 100}]}"#;

    #[test]
    fn test_passthrough_never_crops() {
        let mut processor = StreamProcessor::for_stream(false, TrackingConfig::default()).unwrap();
        let mut data = vec![0u8; 64 * 48 * 3 / 2];
        let mut frame = FrameBuffer::new(&mut data, 64, 48, PixelLayout::Nv12).unwrap();

        for _ in 0..30 {
            processor.push_metadata(FACE, 640, 480);
            assert_eq!(processor.post_process(Some(&mut frame)), None);
        }
        assert!(processor.controller().is_none());
        assert_eq!(processor.name(), "passthrough");
        assert!(data.iter().all(|b| *b == 0));
    }

    #[test]
    fn test_face_tracking_reports_crop() {
        let config = TrackingConfig {
            leap: 1,
            low_fps_leap: 1,
            decision_threshold: 1,
            ..Default::default()
        };
        let mut processor =
            StreamProcessor::face_tracking_with_flags(config, FeatureFlags::default()).unwrap();

        let mut crops = Vec::new();
        for _ in 0..10 {
            processor.push_metadata(FACE, 640, 480);
            crops.extend(processor.post_process(None));
        }
        assert!(!crops.is_empty());
        assert!(crops.iter().all(|c| c.is_valid_for(640, 480)));
        assert_eq!(processor.name(), "face_tracking");
    }

    #[test]
    fn test_overlay_drawn_when_enabled() {
        let flags = FeatureFlags {
            draw_overlay: true,
            ..Default::default()
        };
        let mut processor =
            StreamProcessor::face_tracking_with_flags(TrackingConfig::default(), flags).unwrap();
        let mut data = vec![0u8; 640 * 480 * 3 / 2];

        processor.push_metadata(FACE, 640, 480);
        let mut frame = FrameBuffer::new(&mut data, 640, 480, PixelLayout::Nv12).unwrap();
        processor.post_process(Some(&mut frame));

        // crop still full frame, so the box lands where it was detected
        assert_eq!(frame.luma(120, 160), Some(149));
        assert_eq!(frame.luma(150, 200), Some(0));
    }
}
