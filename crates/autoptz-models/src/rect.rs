use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A detected face in full-frame pixel coordinates.
///
/// `x`/`y` are the top-left corner of the box in the uncropped frame.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema,
)]
pub struct FaceBox {
    pub x: u16,
    pub y: u16,
    pub w: u16,
    pub h: u16,
    /// Detector confidence, 0-100.
    pub confidence: u16,
}

impl FaceBox {
    /// Create a new face box.
    pub fn new(x: u16, y: u16, w: u16, h: u16, confidence: u16) -> Self {
        Self {
            x,
            y,
            w,
            h,
            confidence,
        }
    }

    /// A box covering the whole frame, used when nothing is detected.
    pub fn whole_frame(width: u32, height: u32) -> Self {
        Self::new(0, 0, saturate_u16(width), saturate_u16(height), 100)
    }

    /// Box area in pixels.
    #[inline]
    pub fn area(&self) -> u32 {
        self.w as u32 * self.h as u32
    }

    /// Right edge (exclusive).
    #[inline]
    pub fn x2(&self) -> u32 {
        self.x as u32 + self.w as u32
    }

    /// Bottom edge (exclusive).
    #[inline]
    pub fn y2(&self) -> u32 {
        self.y as u32 + self.h as u32
    }

    /// Smallest box containing every input box, with averaged confidence.
    pub fn union(faces: &[FaceBox]) -> Option<FaceBox> {
        if faces.is_empty() {
            return None;
        }

        let x = faces.iter().map(|f| f.x as u32).min()?;
        let y = faces.iter().map(|f| f.y as u32).min()?;
        let x2 = faces.iter().map(FaceBox::x2).max()?;
        let y2 = faces.iter().map(FaceBox::y2).max()?;
        let confidence =
            faces.iter().map(|f| f.confidence as u32).sum::<u32>() / faces.len() as u32;

        Some(FaceBox::new(
            saturate_u16(x),
            saturate_u16(y),
            saturate_u16(x2 - x),
            saturate_u16(y2 - y),
            saturate_u16(confidence),
        ))
    }
}

/// Pixels trimmed from each edge of a frame.
///
/// For a frame of `W x H` the visible region is
/// `[left, W - right) x [top, H - bottom)`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema,
)]
pub struct CropRect {
    pub top: i32,
    pub bottom: i32,
    pub left: i32,
    pub right: i32,
}

impl CropRect {
    /// Create a new crop rectangle.
    pub fn new(top: i32, bottom: i32, left: i32, right: i32) -> Self {
        Self {
            top,
            bottom,
            left,
            right,
        }
    }

    /// The crop that keeps the whole frame.
    pub const IDENTITY: CropRect = CropRect {
        top: 0,
        bottom: 0,
        left: 0,
        right: 0,
    };

    /// The crop that isolates `face` inside a `width x height` frame.
    ///
    /// Faces reaching past the frame edge are clipped to it.
    pub fn around(face: &FaceBox, width: u32, height: u32) -> Self {
        let width = width as i64;
        let height = height as i64;
        let left = (face.x as i64).min(width);
        let top = (face.y as i64).min(height);
        let right = (width - face.x2() as i64).max(0);
        let bottom = (height - face.y2() as i64).max(0);
        Self::new(top as i32, bottom as i32, left as i32, right as i32)
    }

    /// Width of the visible region for a frame `frame_width` wide.
    #[inline]
    pub fn visible_width(&self, frame_width: u32) -> i32 {
        frame_width as i32 - self.left - self.right
    }

    /// Height of the visible region for a frame `frame_height` tall.
    #[inline]
    pub fn visible_height(&self, frame_height: u32) -> i32 {
        frame_height as i32 - self.top - self.bottom
    }

    /// True when every edge is non-negative and the visible region is non-empty.
    pub fn is_valid_for(&self, frame_width: u32, frame_height: u32) -> bool {
        self.top >= 0
            && self.bottom >= 0
            && self.left >= 0
            && self.right >= 0
            && self.visible_width(frame_width) > 0
            && self.visible_height(frame_height) > 0
    }

    /// Center of the visible region in full-frame coordinates.
    pub fn center(&self, frame_width: u32, frame_height: u32) -> Center {
        Center::new(
            self.left + self.visible_width(frame_width) / 2,
            self.top + self.visible_height(frame_height) / 2,
        )
    }
}

/// PTZ aim point in full-frame coordinates.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema,
)]
pub struct Center {
    pub x: i32,
    pub y: i32,
}

impl Center {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

fn saturate_u16(value: u32) -> u16 {
    value.min(u16::MAX as u32) as u16
}
