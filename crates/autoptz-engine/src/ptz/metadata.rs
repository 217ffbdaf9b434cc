//! Per-frame face detection metadata.
//!
//! The detector attaches a JSON document to every frame:
//!
//! ```json
//! {"faces": [{"confidence": 92, "x": 160, "y": 120, "w": 100, "h": 100}]}
//! ```
//!
//! Malformed documents, a missing `faces` key, and incomplete entries all
//! degrade to fewer (or zero) faces instead of failing the frame.

use autoptz_models::FaceBox;
use serde::Deserialize;
use tracing::{debug, trace};

#[derive(Debug, Default, Deserialize)]
struct FaceMetadata {
    #[serde(default)]
    faces: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawFace {
    confidence: Option<i64>,
    x: Option<i64>,
    y: Option<i64>,
    w: Option<i64>,
    h: Option<i64>,
}

impl RawFace {
    fn into_face_box(self) -> Option<FaceBox> {
        Some(FaceBox::new(
            clamp_u16(self.x?),
            clamp_u16(self.y?),
            clamp_u16(self.w?),
            clamp_u16(self.h?),
            clamp_u16(self.confidence?),
        ))
    }
}

/// Parse and filter the faces of one frame.
///
/// Entries missing any of `confidence, x, y, w, h` are skipped, entries
/// below `confidence_threshold` discarded, negative values clamped to zero,
/// and at most `max_faces` faces kept.
pub fn parse_faces(metadata: &[u8], confidence_threshold: u16, max_faces: usize) -> Vec<FaceBox> {
    // C producers often hand over NUL-terminated buffers
    let end = metadata
        .iter()
        .rposition(|b| *b != 0)
        .map_or(0, |pos| pos + 1);
    let metadata = &metadata[..end];

    let document: FaceMetadata = match serde_json::from_slice(metadata) {
        Ok(document) => document,
        Err(e) => {
            debug!(error = %e, "Unreadable face metadata, treating as no faces");
            metrics::counter!("autoptz_metadata_parse_failures_total").increment(1);
            return Vec::new();
        }
    };

    let faces: Vec<FaceBox> = document
        .faces
        .into_iter()
        .filter_map(|entry| serde_json::from_value::<RawFace>(entry).ok())
        .filter_map(RawFace::into_face_box)
        .filter(|face| face.confidence >= confidence_threshold)
        .take(max_faces)
        .collect();

    trace!(count = faces.len(), "Parsed face metadata");
    faces
}

fn clamp_u16(value: i64) -> u16 {
    value.clamp(0, u16::MAX as i64) as u16
}
