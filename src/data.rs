// src/data.rs - Landmark recordings in, per-frame tracking data out
use chrono::Local;
use csv::Writer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::pipeline::{HandObservation, TrackingResult};
use crate::{Error, Result};

/// One line of a JSON Lines landmark recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub timestamp: f64,
    #[serde(default)]
    pub hands: Vec<HandObservation>,
}

#[derive(Debug, Serialize)]
struct TrackingRecord {
    timestamp: f64,
    frame: u64,
    hand: String,
    tracked: bool,
    occluded: bool,

    gesture: String,
    gesture_confidence: f64,
    pattern: Option<String>,
    hand_sign: Option<String>,

    smoothness: f64,
    stability: f64,

    palm_x: Option<f64>,
    palm_y: Option<f64>,
    palm_rotation_deg: Option<f64>,

    wrist_x: Option<f64>,
    wrist_y: Option<f64>,
    wrist_z: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionSummary {
    pub session_name: String,
    pub total_frames: usize,
    pub hand_frames: usize,
    pub tracked_frames: usize,
    pub occluded_frames: usize,
    pub gesture_counts: BTreeMap<String, usize>,
}

pub struct DataExporter {
    output_dir: PathBuf,
    session_name: String,
    records: Vec<TrackingRecord>,
    total_frames: usize,
}

/// Read a JSON Lines recording from disk
pub fn read_recording(path: &Path) -> Result<Vec<FrameRecord>> {
    let file = File::open(path)?;
    parse_recording(BufReader::new(file))
}

/// Parse a JSON Lines recording. Blank lines are skipped; line numbers in
/// errors are 1-based.
pub fn parse_recording<R: BufRead>(reader: R) -> Result<Vec<FrameRecord>> {
    let mut frames = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let frame = serde_json::from_str(&line).map_err(|e| Error::Recording {
            line: idx + 1,
            message: e.to_string(),
        })?;
        frames.push(frame);
    }
    Ok(frames)
}

impl DataExporter {
    pub fn new(output_dir: impl AsRef<Path>, session_name: Option<String>) -> Self {
        let session_name = session_name.unwrap_or_else(|| {
            format!("session_{}", Local::now().format("%Y%m%d_%H%M%S"))
        });

        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            session_name,
            records: Vec::new(),
            total_frames: 0,
        }
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    pub fn session_dir(&self) -> PathBuf {
        self.output_dir.join(&self.session_name)
    }

    /// Flatten one tracker frame into a row per hand
    pub fn add_frame(&mut self, result: &TrackingResult) {
        self.total_frames += 1;
        for (hand, frame) in &result.hands {
            let wrist = frame.landmarks.map(|lm| lm.wrist());
            self.records.push(TrackingRecord {
                timestamp: result.timestamp,
                frame: result.frame,
                hand: hand.to_string(),
                tracked: frame.landmarks.is_some(),
                occluded: frame.occluded,
                gesture: frame.gesture.name.clone(),
                gesture_confidence: frame.gesture.confidence,
                pattern: frame.pattern.label(),
                hand_sign: frame.sign.map(|sign| sign.to_string()),
                smoothness: frame.quality.smoothness,
                stability: frame.quality.stability,
                palm_x: frame.palm.map(|p| p.center.x),
                palm_y: frame.palm.map(|p| p.center.y),
                palm_rotation_deg: frame.palm.map(|p| p.rotation_degrees),
                wrist_x: wrist.map(|w| w.x),
                wrist_y: wrist.map(|w| w.y),
                wrist_z: wrist.map(|w| w.z),
            });
        }
    }

    pub fn row_count(&self) -> usize {
        self.records.len()
    }

    pub fn summary(&self) -> SessionSummary {
        let mut gesture_counts = BTreeMap::new();
        for record in &self.records {
            *gesture_counts.entry(record.gesture.clone()).or_insert(0) += 1;
        }

        SessionSummary {
            session_name: self.session_name.clone(),
            total_frames: self.total_frames,
            hand_frames: self.records.len(),
            tracked_frames: self.records.iter().filter(|r| r.tracked).count(),
            occluded_frames: self.records.iter().filter(|r| r.occluded).count(),
            gesture_counts,
        }
    }

    pub fn export_csv(&self) -> Result<PathBuf> {
        let csv_path = self.session_dir().join("tracking_data.csv");

        if let Some(parent) = csv_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = File::create(&csv_path)?;
        let mut writer = Writer::from_writer(file);
        for record in &self.records {
            writer.serialize(record)?;
        }
        writer.flush()?;

        tracing::info!(rows = self.records.len(), "Exported {}", csv_path.display());
        Ok(csv_path)
    }

    pub fn export_summary(&self) -> Result<PathBuf> {
        let summary_path = self.session_dir().join("summary.json");

        if let Some(parent) = summary_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&summary_path, serde_json::to_string_pretty(&self.summary())?)?;
        Ok(summary_path)
    }
}
