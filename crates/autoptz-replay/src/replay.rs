//! Metadata replay: one recorded frame in, one crop decision out.
//!
//! Input is JSON lines, one object per frame:
//!
//! ```json
//! {"timestamp_ms": 83, "width": 640, "height": 480,
//!  "metadata": {"faces": [{"confidence": 90, "x": 160, "y": 120, "w": 100, "h": 100}]}}
//! ```
//!
//! `metadata` may also be the detector's raw string. Missing timestamps
//! are synthesized from the configured frame rate, missing sizes from the
//! configured frame size.

use std::io::{BufRead, Write};
use std::time::{Duration, Instant};

use autoptz_engine::ptz::PlaneGeometry;
use autoptz_engine::{CropRect, FrameBuffer, StreamProcessor, ZoomState};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ReplayConfig;
use crate::error::ReplayResult;

const BLACK_LUMA: u8 = 16;
const NEUTRAL_CHROMA: u8 = 128;

/// One recorded frame.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FrameRecord {
    #[serde(default)]
    pub timestamp_ms: Option<u64>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl FrameRecord {
    /// The metadata bytes as the detector would have attached them.
    fn metadata_bytes(&self) -> Vec<u8> {
        match &self.metadata {
            serde_json::Value::String(raw) => raw.clone().into_bytes(),
            serde_json::Value::Null => Vec::new(),
            other => other.to_string().into_bytes(),
        }
    }
}

/// What the engine decided for one frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecisionLine {
    pub frame: u64,
    pub timestamp_ms: u64,
    pub state: ZoomState,
    pub zoom_level: u32,
    pub faces: usize,
    /// The crop differs from the previous frame's
    pub changed: bool,
    pub crop: CropRect,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub frames: u64,
    pub changes: u64,
    /// Input lines that were not valid records
    pub skipped: u64,
}

/// Drives one [`StreamProcessor`] through a recording.
pub struct Replayer {
    processor: StreamProcessor,
    config: ReplayConfig,
    start: Instant,
    frames: u64,
    /// Raw YUV frames with the face overlay, when requested
    overlay_sink: Option<Box<dyn Write>>,
    scratch: Vec<u8>,
}

impl Replayer {
    pub fn new(processor: StreamProcessor, config: ReplayConfig) -> Self {
        Self {
            processor,
            config,
            start: Instant::now(),
            frames: 0,
            overlay_sink: None,
            scratch: Vec::new(),
        }
    }

    /// Write every frame, overlay included, to `sink` as raw YUV.
    pub fn with_overlay_sink(mut self, sink: Box<dyn Write>) -> Self {
        self.overlay_sink = Some(sink);
        self
    }

    /// Feed one recorded frame through the processor.
    pub fn process(&mut self, record: &FrameRecord) -> ReplayResult<DecisionLine> {
        let frame = self.frames;
        self.frames += 1;

        let width = record.width.unwrap_or(self.config.frame_width);
        let height = record.height.unwrap_or(self.config.frame_height);
        let timestamp_ms = record
            .timestamp_ms
            .unwrap_or_else(|| (frame as f64 * self.config.frame_interval_ms()).round() as u64);
        let now = self.start + Duration::from_millis(timestamp_ms);

        self.processor
            .push_metadata_at(&record.metadata_bytes(), width, height, now);

        let change = match self.overlay_sink.as_mut() {
            Some(sink) if width > 0 && height > 0 => {
                let geometry = PlaneGeometry::new(width, height, self.config.layout);
                self.scratch.clear();
                self.scratch.resize(geometry.luma_len(), BLACK_LUMA);
                self.scratch.resize(geometry.required_len(), NEUTRAL_CHROMA);

                let mut buffer =
                    FrameBuffer::new(&mut self.scratch, width, height, self.config.layout)?;
                let change = self.processor.post_process(Some(&mut buffer));
                sink.write_all(&self.scratch)?;
                change
            }
            _ => self.processor.post_process(None),
        };

        let decision = match self.processor.controller() {
            Some(controller) => DecisionLine {
                frame,
                timestamp_ms,
                state: controller.state(),
                zoom_level: controller.planner().map_or(0, |p| p.zoom_level()),
                faces: controller.faces().len(),
                changed: change.is_some(),
                crop: controller.crop(),
            },
            None => DecisionLine {
                frame,
                timestamp_ms,
                state: ZoomState::Normal,
                zoom_level: 0,
                faces: 0,
                changed: false,
                crop: CropRect::IDENTITY,
            },
        };
        debug!(frame, state = %decision.state, changed = decision.changed, "Frame replayed");
        Ok(decision)
    }

    /// Replay every record in `input`, writing decision lines to `output`.
    ///
    /// Unreadable lines are skipped and counted.
    pub fn run<R: BufRead, O: Write>(
        &mut self,
        input: R,
        mut output: O,
    ) -> ReplayResult<ReplaySummary> {
        let mut summary = ReplaySummary::default();

        for (index, line) in input.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let record: FrameRecord = match serde_json::from_str(line) {
                Ok(record) => record,
                Err(e) => {
                    warn!(line = index + 1, error = %e, "Skipping unreadable record");
                    summary.skipped += 1;
                    continue;
                }
            };

            let decision = self.process(&record)?;
            summary.frames += 1;
            if decision.changed {
                summary.changes += 1;
            }
            if decision.changed || !self.config.changes_only {
                serde_json::to_writer(&mut output, &decision)?;
                output.write_all(b"\n")?;
            }
        }

        output.flush()?;
        if let Some(sink) = self.overlay_sink.as_mut() {
            sink.flush()?;
        }
        info!(
            processor = self.processor.name(),
            frames = summary.frames,
            changes = summary.changes,
            skipped = summary.skipped,
            "Replay finished"
        );
        Ok(summary)
    }
}
