//! Auto-PTZ replay binary.

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

use autoptz_engine::{FeatureFlags, PixelLayout, StreamProcessor, TrackingConfig};
use autoptz_replay::{logging, ReplayConfig, Replayer};

/// Replay recorded face detection metadata through the auto-PTZ engine
/// and print one crop decision per frame as JSON lines.
#[derive(Parser, Debug)]
#[command(name = "autoptz-replay")]
#[command(about = "Replay face metadata through the auto-PTZ engine")]
struct Args {
    /// JSON-lines recording, `-` for stdin
    #[arg(default_value = "-")]
    input: String,

    /// Tracking config (JSON); defaults come from AUTOPTZ_* variables
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Frame rate for records without timestamps
    #[arg(long)]
    fps: Option<f64>,

    /// Frame width for records without one
    #[arg(long)]
    width: Option<u32>,

    /// Frame height for records without one
    #[arg(long)]
    height: Option<u32>,

    /// Only print frames whose crop changed
    #[arg(long)]
    changes_only: bool,

    /// Track the largest face instead of all faces
    #[arg(long)]
    widest_face: bool,

    /// Disable tracking and pass frames through
    #[arg(long, conflicts_with = "widest_face")]
    passthrough: bool,

    /// Write raw YUV frames with face boxes drawn to this file
    #[arg(long)]
    overlay_out: Option<PathBuf>,

    /// Pixel layout of overlay frames (nv12, nv16)
    #[arg(long)]
    layout: Option<PixelLayout>,

    /// Print Prometheus metrics to stderr when done
    #[arg(long)]
    metrics: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init_tracing();

    let args = Args::parse();

    let metrics = if args.metrics {
        Some(
            PrometheusBuilder::new()
                .install_recorder()
                .context("Failed to install Prometheus recorder")?,
        )
    } else {
        None
    };

    let tracking = match &args.config {
        Some(path) => TrackingConfig::from_json_file(path)
            .with_context(|| format!("Failed to load tracking config {}", path.display()))?,
        None => TrackingConfig::from_env(),
    };

    let mut replay = ReplayConfig::from_env();
    if let Some(fps) = args.fps {
        anyhow::ensure!(fps > 0.0, "--fps must be positive");
        replay.default_fps = fps;
    }
    replay.frame_width = args.width.unwrap_or(replay.frame_width);
    replay.frame_height = args.height.unwrap_or(replay.frame_height);
    replay.layout = args.layout.unwrap_or(replay.layout);
    replay.changes_only |= args.changes_only;

    let processor = if args.passthrough {
        StreamProcessor::Passthrough
    } else {
        let detected = FeatureFlags::detect(&tracking);
        let flags = FeatureFlags {
            draw_overlay: detected.draw_overlay || args.overlay_out.is_some(),
            focus_widest_face: detected.focus_widest_face || args.widest_face,
        };
        StreamProcessor::face_tracking_with_flags(tracking, flags)
            .context("Invalid tracking config")?
    };
    info!(processor = processor.name(), input = %args.input, "Starting replay");

    let mut replayer = Replayer::new(processor, replay);
    if let Some(path) = &args.overlay_out {
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        replayer = replayer.with_overlay_sink(Box::new(BufWriter::new(file)));
    }

    let stdout = io::stdout();
    let output = BufWriter::new(stdout.lock());
    let summary = if args.input == "-" {
        replayer.run(io::stdin().lock(), output)
    } else {
        let file = File::open(&args.input)
            .with_context(|| format!("Failed to open {}", args.input))?;
        replayer.run(BufReader::new(file), output)
    }
    .context("Replay failed")?;

    info!(
        frames = summary.frames,
        changes = summary.changes,
        skipped = summary.skipped,
        "Replay complete"
    );

    if let Some(handle) = metrics {
        eprintln!("{}", handle.render());
    }
    Ok(())
}
