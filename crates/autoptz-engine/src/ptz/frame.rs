//! Semi-planar YUV frame buffers.
//!
//! Both supported layouts store a full-resolution luma plane followed by
//! one interleaved chroma plane (`U V U V ...`) sharing the luma row stride:
//!
//! - `Nv12` (4:2:0): one chroma row per two luma rows
//! - `Nv16` (4:2:2): one chroma row per luma row
//!
//! Every byte offset is computed by [`PlaneGeometry`]; callers never do
//! stride arithmetic themselves.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{PtzError, PtzResult};

/// Chroma subsampling layout of a frame buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelLayout {
    #[default]
    Nv12,
    Nv16,
}

impl PixelLayout {
    /// Chroma plane rows for a frame `height` luma rows tall.
    pub fn chroma_rows(&self, height: u32) -> u32 {
        match self {
            PixelLayout::Nv12 => height.div_ceil(2),
            PixelLayout::Nv16 => height,
        }
    }

    /// Chroma row holding the samples of luma row `row`.
    pub fn chroma_row(&self, row: u32) -> u32 {
        match self {
            PixelLayout::Nv12 => row / 2,
            PixelLayout::Nv16 => row,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PixelLayout::Nv12 => "nv12",
            PixelLayout::Nv16 => "nv16",
        }
    }
}

impl fmt::Display for PixelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PixelLayout {
    type Err = PtzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nv12" | "yuv420sp" => Ok(PixelLayout::Nv12),
            "nv16" | "yuv422sp" => Ok(PixelLayout::Nv16),
            _ => Err(PtzError::invalid_config(format!("unknown pixel layout: {}", s))),
        }
    }
}

/// Byte offsets inside a semi-planar frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneGeometry {
    pub stride: u32,
    pub height: u32,
    pub layout: PixelLayout,
}

impl PlaneGeometry {
    pub fn new(stride: u32, height: u32, layout: PixelLayout) -> Self {
        Self {
            stride,
            height,
            layout,
        }
    }

    /// Size of the luma plane in bytes.
    pub fn luma_len(&self) -> usize {
        self.stride as usize * self.height as usize
    }

    /// Size of luma plus chroma planes in bytes.
    pub fn required_len(&self) -> usize {
        self.luma_len() + self.stride as usize * self.layout.chroma_rows(self.height) as usize
    }

    /// Offset of the luma sample at (`row`, `col`), or `None` outside the plane.
    pub fn luma_offset(&self, row: u32, col: u32) -> Option<usize> {
        if row >= self.height || col >= self.stride {
            return None;
        }
        Some(row as usize * self.stride as usize + col as usize)
    }

    /// Offset of the `U` byte of the chroma pair covering luma (`row`, `col`).
    ///
    /// `V` follows at the next byte. `None` outside the plane.
    pub fn chroma_offset(&self, row: u32, col: u32) -> Option<usize> {
        if row >= self.height || col >= self.stride {
            return None;
        }
        let pair_col = col & !1;
        if pair_col + 1 >= self.stride {
            return None;
        }
        let chroma_row = self.layout.chroma_row(row) as usize;
        Some(self.luma_len() + chroma_row * self.stride as usize + pair_col as usize)
    }
}

/// A borrowed, size-checked frame buffer.
#[derive(Debug)]
pub struct FrameBuffer<'a> {
    data: &'a mut [u8],
    geometry: PlaneGeometry,
}

impl<'a> FrameBuffer<'a> {
    /// Wrap `data` as a `stride x height` frame in `layout`.
    pub fn new(
        data: &'a mut [u8],
        stride: u32,
        height: u32,
        layout: PixelLayout,
    ) -> PtzResult<Self> {
        if stride == 0 || height == 0 {
            return Err(PtzError::invalid_dimensions(stride, height));
        }
        let geometry = PlaneGeometry::new(stride, height, layout);
        let required = geometry.required_len();
        if data.len() < required {
            return Err(PtzError::BufferTooSmall {
                required,
                actual: data.len(),
            });
        }
        Ok(Self { data, geometry })
    }

    pub fn geometry(&self) -> PlaneGeometry {
        self.geometry
    }

    pub fn data(&self) -> &[u8] {
        &*self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut *self.data
    }

    /// Luma sample at (`row`, `col`).
    pub fn luma(&self, row: u32, col: u32) -> Option<u8> {
        let offset = self.geometry.luma_offset(row, col)?;
        self.data.get(offset).copied()
    }

    /// Chroma pair covering luma (`row`, `col`).
    pub fn chroma(&self, row: u32, col: u32) -> Option<(u8, u8)> {
        let offset = self.geometry.chroma_offset(row, col)?;
        Some((*self.data.get(offset)?, *self.data.get(offset + 1)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_len() {
        assert_eq!(
            PlaneGeometry::new(640, 480, PixelLayout::Nv12).required_len(),
            640 * 480 * 3 / 2
        );
        assert_eq!(PlaneGeometry::new(640, 480, PixelLayout::Nv16).required_len(), 640 * 480 * 2);
        // odd heights round the chroma plane up
        assert_eq!(PlaneGeometry::new(4, 3, PixelLayout::Nv12).required_len(), 12 + 8);
    }

    #[test]
    fn test_chroma_offsets_differ_by_layout() {
        let nv12 = PlaneGeometry::new(8, 4, PixelLayout::Nv12);
        let nv16 = PlaneGeometry::new(8, 4, PixelLayout::Nv16);

        assert_eq!(nv12.chroma_offset(0, 0), Some(32));
        assert_eq!(nv12.chroma_offset(1, 1), Some(32));
        assert_eq!(nv12.chroma_offset(3, 5), Some(32 + 8 + 4));

        assert_eq!(nv16.chroma_offset(1, 1), Some(32 + 8));
        assert_eq!(nv16.chroma_offset(3, 5), Some(32 + 24 + 4));
    }

    #[test]
    fn test_offsets_out_of_bounds() {
        let geometry = PlaneGeometry::new(8, 4, PixelLayout::Nv12);
        assert_eq!(geometry.luma_offset(4, 0), None);
        assert_eq!(geometry.luma_offset(0, 8), None);
        assert_eq!(geometry.chroma_offset(0, 8), None);

        // odd stride: the last column has no complete chroma pair
        let odd = PlaneGeometry::new(5, 2, PixelLayout::Nv12);
        assert_eq!(odd.chroma_offset(0, 4), None);
        assert_eq!(odd.chroma_offset(0, 3), Some(10 + 2));
    }

    #[test]
    fn test_frame_buffer_size_checked() {
        let mut small = vec![0u8; 100];
        let err = FrameBuffer::new(&mut small, 640, 480, PixelLayout::Nv12).unwrap_err();
        assert!(matches!(err, PtzError::BufferTooSmall { required: 460_800, actual: 100 }));

        let mut empty: Vec<u8> = Vec::new();
        assert!(FrameBuffer::new(&mut empty, 0, 480, PixelLayout::Nv12).is_err());
    }

    #[test]
    fn test_layout_from_str() {
        assert_eq!("NV12".parse::<PixelLayout>().unwrap(), PixelLayout::Nv12);
        assert_eq!("yuv422sp".parse::<PixelLayout>().unwrap(), PixelLayout::Nv16);
        assert!("rgb24".parse::<PixelLayout>().is_err());
    }
}
