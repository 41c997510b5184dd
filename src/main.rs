// src/main.rs
use anyhow::{Context, Result};
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hand_gesture_tracker::data::{read_recording, DataExporter};
use hand_gesture_tracker::pipeline::Handedness;
use hand_gesture_tracker::{HandTracker, TrackerConfig};

/// Replay recorded hand landmarks through the stabilizer and gesture classifier
#[derive(Parser, Debug)]
#[command(name = "hand_gesture_tracker")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON Lines landmark recording
    #[arg(short, long)]
    input: PathBuf,

    /// Directory the session folder is written to
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// Config file path (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Session name (defaults to a timestamp)
    #[arg(short, long)]
    session: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = match &cli.config {
        Some(path) => TrackerConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => TrackerConfig::load_default()?,
    };

    let frames = read_recording(&cli.input)
        .with_context(|| format!("reading recording {}", cli.input.display()))?;
    info!("Replaying {} frames from {}", frames.len(), cli.input.display());

    let mut tracker = HandTracker::new(config)?;
    let mut exporter = DataExporter::new(&cli.output, cli.session.clone());
    let mut last_gesture: HashMap<Handedness, String> = HashMap::new();

    for frame in &frames {
        let result = match tracker.process_frame(frame.timestamp, &frame.hands) {
            Ok(result) => result,
            Err(e) => {
                warn!("Skipping frame at t={:.3}: {}", frame.timestamp, e);
                continue;
            }
        };

        for (hand, hand_result) in &result.hands {
            let gesture = &hand_result.gesture;
            if last_gesture.get(hand) != Some(&gesture.name) {
                info!(
                    frame = result.frame,
                    hand = %hand,
                    confidence = gesture.confidence,
                    pattern = %hand_result.pattern,
                    sign = hand_result.sign.map_or("-", |sign| sign.label()),
                    "Gesture: {}",
                    gesture.name
                );
                last_gesture.insert(*hand, gesture.name.clone());
            }
        }

        exporter.add_frame(&result);
    }

    let csv_path = exporter.export_csv()?;
    let summary_path = exporter.export_summary()?;
    let summary = exporter.summary();
    info!(
        "Session {}: {} frames, {} tracked, {} occluded",
        summary.session_name, summary.total_frames, summary.tracked_frames, summary.occluded_frames
    );
    info!("Wrote {} and {}", csv_path.display(), summary_path.display());

    Ok(())
}
