//! End-to-end scenarios for the face tracking loop.
//!
//! Frames are fed with synthetic timestamps, 83 ms apart (about 12 fps)
//! unless a scenario says otherwise. That puts the stream in the medium
//! zoom tier (20 steps) with the low-fps leap of 3 frames.

#[cfg(test)]
mod scenario_tests {
    use std::time::{Duration, Instant};

    use autoptz_models::{CropRect, FaceBox, ZoomState};

    use crate::ptz::config::{FeatureFlags, TrackingConfig};
    use crate::ptz::controller::FaceTrackController;
    use crate::ptz::rate::RateTier;

    const W: u32 = 640;
    const H: u32 = 480;
    const FRAME_INTERVAL: Duration = Duration::from_millis(83);
    /// About 30 fps: fast tiers (40 zoom steps), base leap of 6 frames
    const FAST_FRAME_INTERVAL: Duration = Duration::from_millis(33);

    struct Stream {
        controller: FaceTrackController,
        start: Instant,
        interval: Duration,
        frame: u32,
    }

    impl Stream {
        fn new(flags: FeatureFlags) -> Self {
            Self::with_interval(flags, FRAME_INTERVAL)
        }

        fn with_interval(flags: FeatureFlags, interval: Duration) -> Self {
            Self {
                controller: FaceTrackController::with_flags(TrackingConfig::default(), flags)
                    .unwrap(),
                start: Instant::now(),
                interval,
                frame: 0,
            }
        }

        /// Feed one frame, returning the crop if it changed.
        fn step(&mut self, metadata: &[u8]) -> Option<CropRect> {
            self.frame += 1;
            let now = self.start + self.interval * self.frame;
            self.controller.update_at(metadata, W, H, now);
            self.controller.take_crop_change()
        }
    }

    fn faces_json(faces: &[FaceBox]) -> Vec<u8> {
        let entries: Vec<String> = faces
            .iter()
            .map(|f| {
                format!(
                    r#"{{"confidence": {}, "x": {}, "y": {}, "w": {}, "h": {}}}"#,
                    f.confidence, f.x, f.y, f.w, f.h
                )
            })
            .collect();
        format!(r#"{{"faces": [{}]}}"#, entries.join(", ")).into_bytes()
    }

    fn face() -> FaceBox {
        FaceBox::new(160, 120, 100, 100, 90)
    }

    fn assert_in_bounds(crop: &CropRect) {
        assert!(crop.top >= 0 && crop.bottom >= 0 && crop.left >= 0 && crop.right >= 0, "{crop:?}");
        assert!(crop.left + crop.right < W as i32, "{crop:?}");
        assert!(crop.top + crop.bottom < H as i32, "{crop:?}");
    }

    #[test]
    fn test_no_face_keeps_full_frame() {
        let mut stream = Stream::new(FeatureFlags::default());
        let empty = faces_json(&[]);

        for _ in 0..100 {
            assert_eq!(stream.step(&empty), None);
        }

        let planner = stream.controller.planner().unwrap();
        assert_eq!(planner.state(), ZoomState::Normal);
        assert_eq!(planner.zoom_level(), 0);
        assert_eq!(planner.crop(), CropRect::IDENTITY);
    }

    #[test]
    fn test_constant_face_zooms_in() {
        let mut stream = Stream::new(FeatureFlags::default());
        let metadata = faces_json(&[face()]);

        let mut zoom_in_at = None;
        let mut previous_width = W as i32;
        for _ in 0..50 {
            stream.step(&metadata);
            let crop = stream.controller.crop();
            assert_in_bounds(&crop);

            let width = crop.visible_width(W);
            assert!(width <= previous_width, "crop grew at frame {}", stream.frame);
            previous_width = width;

            if zoom_in_at.is_none() && stream.controller.state() == ZoomState::ZoomIn {
                zoom_in_at = Some(stream.frame);
            }
        }

        // count accepted at frame 12, then one zoom step per frame
        assert_eq!(zoom_in_at, Some(31));
        let planner = stream.controller.planner().unwrap();
        assert_eq!(planner.rate().zoom_tier(), RateTier::Medium);
        assert_eq!(planner.zoom_level(), 20);
        assert_eq!(stream.controller.smoother().leap(), 3);

        // 1.6x zoom: a 400x300 window centered on the face
        assert_eq!(planner.crop(), CropRect::new(20, 160, 10, 230));
    }

    #[test]
    fn test_constant_face_zooms_in_at_fast_rate() {
        let mut stream = Stream::with_interval(FeatureFlags::default(), FAST_FRAME_INTERVAL);
        let metadata = faces_json(&[face()]);

        // count accepted at frame 12, 40 steps still need one more frame
        for _ in 0..50 {
            stream.step(&metadata);
        }
        let planner = stream.controller.planner().unwrap();
        assert_eq!(planner.rate().zoom_tier(), RateTier::Fast);
        assert_eq!(planner.state(), ZoomState::Normal);
        assert_eq!(planner.zoom_level(), 39);
        assert_eq!(stream.controller.smoother().leap(), 6);

        stream.step(&metadata);
        let planner = stream.controller.planner().unwrap();
        assert_eq!(stream.frame, 51);
        assert_eq!(planner.state(), ZoomState::ZoomIn);
        assert_eq!(planner.zoom_level(), 40);
        assert_eq!(planner.crop(), CropRect::new(20, 160, 10, 230));
    }

    #[test]
    fn test_face_after_empty_stretch_zooms_like_fresh_stream() {
        let metadata = faces_json(&[face()]);
        let empty = faces_json(&[]);

        let mut fresh = Stream::with_interval(FeatureFlags::default(), FAST_FRAME_INTERVAL);
        for _ in 0..300 {
            fresh.step(&metadata);
        }

        let mut late = Stream::with_interval(FeatureFlags::default(), FAST_FRAME_INTERVAL);
        for _ in 0..120 {
            late.step(&empty);
        }
        for _ in 0..300 {
            late.step(&metadata);
        }

        for stream in [&fresh, &late] {
            let planner = stream.controller.planner().unwrap();
            assert_eq!(planner.state(), ZoomState::ZoomIn);
            assert_eq!(planner.zoom_level(), 40);
            assert_eq!(planner.crop(), CropRect::new(20, 160, 10, 230));
        }
    }

    #[test]
    fn test_face_returning_after_loss_zooms_fully() {
        let mut stream = Stream::with_interval(FeatureFlags::default(), FAST_FRAME_INTERVAL);
        let metadata = faces_json(&[face()]);
        let empty = faces_json(&[]);

        for _ in 0..100 {
            stream.step(&metadata);
        }
        for _ in 0..30 {
            stream.step(&empty);
        }
        for _ in 0..200 {
            stream.step(&metadata);
        }

        assert_eq!(stream.controller.state(), ZoomState::ZoomIn);
        assert_eq!(stream.controller.crop(), CropRect::new(20, 160, 10, 230));
    }

    #[test]
    fn test_low_confidence_face_is_ignored() {
        let mut stream = Stream::new(FeatureFlags::default());
        let metadata = faces_json(&[FaceBox::new(160, 120, 100, 100, 50)]);

        for _ in 0..100 {
            assert_eq!(stream.step(&metadata), None);
        }
        assert!(stream.controller.faces().is_empty());
        assert!(stream.controller.target().is_none());
        assert_eq!(stream.controller.crop(), CropRect::IDENTITY);
    }

    #[test]
    fn test_lost_face_zooms_back_out() {
        let mut stream = Stream::new(FeatureFlags::default());
        let metadata = faces_json(&[face()]);
        let empty = faces_json(&[]);

        for _ in 0..40 {
            stream.step(&metadata);
        }
        assert_eq!(stream.controller.state(), ZoomState::ZoomIn);

        let mut saw_zoom_out = false;
        let mut previous_width = stream.controller.crop().visible_width(W);
        for _ in 0..60 {
            stream.step(&empty);
            let width = stream.controller.crop().visible_width(W);
            assert!(width >= previous_width);
            previous_width = width;
            saw_zoom_out |= stream.controller.state() == ZoomState::ZoomOut;
        }

        assert!(saw_zoom_out);
        assert_eq!(stream.controller.state(), ZoomState::Normal);
        assert_eq!(stream.controller.planner().unwrap().zoom_level(), 0);
        assert_eq!(stream.controller.crop(), CropRect::IDENTITY);
    }

    #[test]
    fn test_moving_face_pans_in_clamped_steps() {
        let mut stream = Stream::new(FeatureFlags::default());
        for _ in 0..40 {
            stream.step(&faces_json(&[face()]));
        }
        let start = stream.controller.planner().unwrap().center();

        // jump 200 px to the right
        let moved = faces_json(&[FaceBox::new(360, 120, 100, 100, 90)]);
        let mut saw_pan = false;
        let mut previous = start;
        for _ in 0..30 {
            stream.step(&moved);
            let planner = stream.controller.planner().unwrap();
            let center = planner.center();
            assert!((center.x - previous.x).abs() <= 60);
            assert_eq!(center.y, start.y);
            previous = center;
            saw_pan |= planner.state() == ZoomState::PanAndTilt;
            assert_in_bounds(&planner.crop());
        }

        assert!(saw_pan);
        assert!(previous.x > start.x);
    }

    #[test]
    fn test_flickering_count_never_moves_camera() {
        let mut stream = Stream::new(FeatureFlags::default());
        let one = faces_json(&[face()]);
        let two = faces_json(&[face(), FaceBox::new(400, 200, 80, 80, 90)]);

        for i in 0..100 {
            let metadata = if i % 2 == 0 { &one } else { &two };
            assert_eq!(stream.step(metadata), None);
        }
        assert_eq!(stream.controller.smoother().selected_count(), 0);
        assert_eq!(stream.controller.state(), ZoomState::Normal);
    }

    #[test]
    fn test_widest_face_mode_tracks_largest() {
        let flags = FeatureFlags {
            focus_widest_face: true,
            ..Default::default()
        };
        let mut stream = Stream::new(flags);
        let metadata = faces_json(&[
            FaceBox::new(20, 20, 40, 40, 95),
            FaceBox::new(400, 200, 120, 120, 80),
        ]);

        for _ in 0..20 {
            stream.step(&metadata);
        }
        let target = stream.controller.target().unwrap();
        assert_eq!((target.center.x, target.center.y), (460, 260));
        assert_eq!((target.width, target.height), (120, 120));
    }

    #[test]
    fn test_merged_faces_track_union() {
        let mut stream = Stream::new(FeatureFlags::default());
        let metadata = faces_json(&[
            FaceBox::new(20, 20, 40, 40, 95),
            FaceBox::new(400, 200, 120, 120, 80),
        ]);

        for _ in 0..20 {
            stream.step(&metadata);
        }
        let target = stream.controller.target().unwrap();
        assert_eq!((target.width, target.height), (500, 300));
        assert_eq!((target.center.x, target.center.y), (270, 170));
    }

    #[test]
    fn test_remap_under_full_frame_is_identity() {
        let mut stream = Stream::new(FeatureFlags::default());
        let faces = [face(), FaceBox::new(400, 200, 80, 80, 75)];
        stream.step(&faces_json(&faces));

        assert_eq!(stream.controller.remap(&CropRect::IDENTITY), faces.to_vec());
    }

    #[test]
    fn test_crop_stays_in_bounds_under_noise() {
        let mut stream = Stream::new(FeatureFlags::default());
        // xorshift, fixed seed
        let mut seed: u32 = 0x9e37_79b9;
        let mut next = move || {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            seed
        };

        for _ in 0..600 {
            let count = (next() % 4) as usize;
            let faces: Vec<FaceBox> = (0..count)
                .map(|_| {
                    FaceBox::new(
                        (next() % 700) as u16,
                        (next() % 520) as u16,
                        (next() % 400) as u16,
                        (next() % 400) as u16,
                        (next() % 101) as u16,
                    )
                })
                .collect();
            // hold each detection set for a while so targets get accepted
            let metadata = faces_json(&faces);
            for _ in 0..(next() % 30) {
                if let Some(crop) = stream.step(&metadata) {
                    assert_in_bounds(&crop);
                }
                assert_in_bounds(&stream.controller.crop());
            }
        }
    }
}
