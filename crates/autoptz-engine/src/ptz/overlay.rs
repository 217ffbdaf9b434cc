//! Debug overlay: face rectangles drawn straight into the frame.

use autoptz_models::FaceBox;

use super::frame::{FrameBuffer, PixelLayout, PlaneGeometry};

/// Outline thickness in pixels.
const LINE_WIDTH: u32 = 2;

/// A YUV color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayColor {
    pub y: u8,
    pub u: u8,
    pub v: u8,
}

impl OverlayColor {
    pub const fn new(y: u8, u: u8, v: u8) -> Self {
        Self { y, u, v }
    }

    /// Pure green (BT.601).
    pub const GREEN: OverlayColor = OverlayColor::new(149, 43, 21);
}

impl Default for OverlayColor {
    fn default() -> Self {
        Self::GREEN
    }
}

/// Outline each face in `buffer` with a 2-pixel border.
///
/// Corners are clamped to `[0, stride] x [0, height]`; boxes left empty by
/// the clamp are skipped. Writes falling outside `buffer` are dropped.
/// Returns the number of boxes drawn.
pub fn draw_boxes(
    buffer: &mut [u8],
    stride: u32,
    height: u32,
    faces: &[FaceBox],
    layout: PixelLayout,
    color: OverlayColor,
) -> usize {
    let geometry = PlaneGeometry::new(stride, height, layout);
    let mut drawn = 0;

    for face in faces {
        let x0 = (face.x as u32).min(stride);
        let y0 = (face.y as u32).min(height);
        let x1 = face.x2().min(stride);
        let y1 = face.y2().min(height);
        if x1 <= x0 || y1 <= y0 {
            continue;
        }

        let top_end = (y0 + LINE_WIDTH).min(y1);
        let bottom_start = y1.saturating_sub(LINE_WIDTH).max(y0);
        let left_end = (x0 + LINE_WIDTH).min(x1);
        let right_start = x1.saturating_sub(LINE_WIDTH).max(x0);

        for row in (y0..top_end).chain(bottom_start..y1) {
            for col in x0..x1 {
                paint(buffer, &geometry, row, col, color);
            }
        }
        for row in y0..y1 {
            for col in (x0..left_end).chain(right_start..x1) {
                paint(buffer, &geometry, row, col, color);
            }
        }
        drawn += 1;
    }

    drawn
}

fn paint(buffer: &mut [u8], geometry: &PlaneGeometry, row: u32, col: u32, color: OverlayColor) {
    if let Some(px) = geometry.luma_offset(row, col).and_then(|o| buffer.get_mut(o)) {
        *px = color.y;
    }
    if let Some(offset) = geometry.chroma_offset(row, col) {
        if let Some(pair) = buffer.get_mut(offset..offset + 2) {
            pair[0] = color.u;
            pair[1] = color.v;
        }
    }
}

impl FrameBuffer<'_> {
    /// Outline `faces` in this frame. Returns the number of boxes drawn.
    pub fn draw_faces(&mut self, faces: &[FaceBox], color: OverlayColor) -> usize {
        let geometry = self.geometry();
        draw_boxes(
            self.data_mut(),
            geometry.stride,
            geometry.height,
            faces,
            geometry.layout,
            color,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRAY: u8 = 128;

    fn gray_frame(stride: u32, height: u32, layout: PixelLayout) -> Vec<u8> {
        vec![GRAY; PlaneGeometry::new(stride, height, layout).required_len()]
    }

    #[test]
    fn test_outline_is_two_pixels_wide() {
        let mut data = gray_frame(32, 32, PixelLayout::Nv12);
        let mut frame = FrameBuffer::new(&mut data, 32, 32, PixelLayout::Nv12).unwrap();

        let drawn = frame.draw_faces(&[FaceBox::new(4, 4, 10, 10, 90)], OverlayColor::GREEN);
        assert_eq!(drawn, 1);

        // border
        assert_eq!(frame.luma(4, 4), Some(149));
        assert_eq!(frame.luma(5, 10), Some(149));
        assert_eq!(frame.luma(10, 5), Some(149));
        assert_eq!(frame.luma(13, 13), Some(149));
        assert_eq!(frame.luma(12, 8), Some(149));
        // interior and outside untouched
        assert_eq!(frame.luma(6, 6), Some(GRAY));
        assert_eq!(frame.luma(9, 9), Some(GRAY));
        assert_eq!(frame.luma(3, 4), Some(GRAY));
        assert_eq!(frame.luma(14, 14), Some(GRAY));
        // chroma of a border pixel
        assert_eq!(frame.chroma(4, 4), Some((43, 21)));
    }

    #[test]
    fn test_chroma_rows_follow_layout() {
        // single-row face on luma row 6
        let face = FaceBox::new(0, 6, 8, 1, 90);

        let mut nv12 = gray_frame(8, 8, PixelLayout::Nv12);
        draw_boxes(&mut nv12, 8, 8, &[face], PixelLayout::Nv12, OverlayColor::GREEN);
        // chroma row 3 of NV12
        assert_eq!(&nv12[64 + 24..64 + 26], &[43, 21]);
        assert_eq!(nv12[64 + 16], GRAY);

        let mut nv16 = gray_frame(8, 8, PixelLayout::Nv16);
        draw_boxes(&mut nv16, 8, 8, &[face], PixelLayout::Nv16, OverlayColor::GREEN);
        // chroma row 6 of NV16
        assert_eq!(&nv16[64 + 48..64 + 50], &[43, 21]);
        assert_eq!(nv16[64 + 24], GRAY);
    }

    #[test]
    fn test_boxes_clamped_to_frame() {
        let mut data = gray_frame(16, 16, PixelLayout::Nv12);
        let faces = [
            FaceBox::new(10, 10, 100, 100, 90),
            FaceBox::new(40, 40, 10, 10, 90),
            FaceBox::new(5, 5, 0, 0, 90),
        ];

        let drawn = draw_boxes(&mut data, 16, 16, &faces, PixelLayout::Nv12, OverlayColor::GREEN);
        assert_eq!(drawn, 1);
        assert_eq!(data.len(), PlaneGeometry::new(16, 16, PixelLayout::Nv12).required_len());
        assert_eq!(data[15 * 16 + 15], 149);
    }

    #[test]
    fn test_short_buffer_does_not_panic() {
        let mut data = vec![GRAY; 10];
        let drawn = draw_boxes(
            &mut data,
            64,
            64,
            &[FaceBox::new(0, 0, 64, 64, 90)],
            PixelLayout::Nv16,
            OverlayColor::GREEN,
        );
        assert_eq!(drawn, 1);
        assert!(data.iter().all(|b| *b == 149));
    }
}
