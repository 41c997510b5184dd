// src/pipeline.rs - Per-hand stabilize -> classify pipeline and the multi-hand tracker
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::time::{Duration, Instant};

use crate::config::TrackerConfig;
use crate::gesture::{GestureClassifier, GestureMatch, TemporalPattern};
use crate::history::RingBuffer;
use crate::landmarks::{HandLandmarks, PalmPose};
use crate::sign::{recognize_sign, HandSign};
use crate::tracking::{LandmarkStabilizer, TrackingQuality};
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handedness {
    Left,
    Right,
}

/// One hand as reported by the landmark detector for a single frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandObservation {
    pub handedness: Handedness,
    /// `None` when the detector lost the hand this frame
    #[serde(default)]
    pub landmarks: Option<Vec<[f64; 3]>>,
    #[serde(default = "full_confidence")]
    pub confidence: f64,
}

fn full_confidence() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameResult {
    pub landmarks: Option<HandLandmarks>,
    /// Landmarks were extrapolated instead of taken from the detector
    pub occluded: bool,
    pub gesture: GestureMatch,
    /// Rule-based sign of the stabilized landmarks
    pub sign: Option<HandSign>,
    pub pattern: TemporalPattern,
    pub quality: TrackingQuality,
    pub palm: Option<PalmPose>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TrackingResult {
    pub frame: u64,
    pub timestamp: f64,
    pub hands: BTreeMap<Handedness, FrameResult>,
}

#[derive(Debug, Clone)]
pub struct PerformanceMetrics {
    pub avg_fps: f64,
    /// Mean per-frame processing time in seconds
    pub avg_processing_time: f64,
    /// Mean detection confidence over the window
    pub tracking_confidence: f64,
    pub frames_processed: u64,
    pub frames_occluded: u64,
    frame_times: RingBuffer<f64>,
    confidences: RingBuffer<f64>,
}

pub struct HandPipeline {
    stabilizer: LandmarkStabilizer,
    classifier: GestureClassifier,
    palm_smoothing_factor: f64,
    smoothed_palm: Option<PalmPose>,
    metrics: PerformanceMetrics,
}

pub struct HandTracker {
    config: TrackerConfig,
    hands: HashMap<Handedness, HandPipeline>,
    frame_counter: u64,
}

impl fmt::Display for Handedness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handedness::Left => write!(f, "left"),
            Handedness::Right => write!(f, "right"),
        }
    }
}

/// Exponential smoothing; the first sample passes through.
fn smooth_value(prev: Option<f64>, new: f64, factor: f64) -> f64 {
    match prev {
        Some(prev) => prev * (1.0 - factor) + new * factor,
        None => new,
    }
}

impl PerformanceMetrics {
    pub fn new(window: usize) -> Self {
        Self {
            avg_fps: 0.0,
            avg_processing_time: 0.0,
            tracking_confidence: 0.0,
            frames_processed: 0,
            frames_occluded: 0,
            frame_times: RingBuffer::new(window),
            confidences: RingBuffer::new(window),
        }
    }

    pub fn record(&mut self, elapsed: Duration, detection_confidence: f64, occluded: bool) {
        self.frames_processed += 1;
        if occluded {
            self.frames_occluded += 1;
        }

        self.frame_times.push(elapsed.as_secs_f64());
        self.confidences.push(detection_confidence);

        self.avg_processing_time = self.frame_times.iter().sum::<f64>() / self.frame_times.len() as f64;
        self.avg_fps = if self.avg_processing_time > 0.0 {
            1.0 / self.avg_processing_time
        } else {
            0.0
        };
        self.tracking_confidence = self.confidences.iter().sum::<f64>() / self.confidences.len() as f64;
    }

    pub fn window_len(&self) -> usize {
        self.frame_times.len()
    }
}

impl HandPipeline {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            stabilizer: LandmarkStabilizer::new(config.stabilizer.clone()),
            classifier: GestureClassifier::new(config.classifier.clone()),
            palm_smoothing_factor: config.palm_smoothing_factor,
            smoothed_palm: None,
            metrics: PerformanceMetrics::new(config.metrics_window),
        }
    }

    /// Process one frame for this hand.
    ///
    /// A landmark slice of the wrong length is an integration bug and fails
    /// the call before any state changes.
    pub fn process(&mut self, raw: Option<&[[f64; 3]]>, detection_confidence: f64) -> Result<FrameResult> {
        let detected = raw.map(HandLandmarks::from_slice).transpose()?;
        Ok(self.process_landmarks(detected.as_ref(), detection_confidence))
    }

    /// Process already validated landmarks. A missing detection counts as
    /// zero confidence, so motion history can bridge the gap.
    pub fn process_landmarks(&mut self, detected: Option<&HandLandmarks>, detection_confidence: f64) -> FrameResult {
        let start = Instant::now();
        let confidence = if detected.is_some() { detection_confidence } else { 0.0 };

        // Only a frame actually filled by prediction counts as occluded
        let predicting = self.stabilizer.is_occluded(confidence);
        let input = self.stabilizer.handle_occlusion(detected, confidence);
        let occluded = predicting && input.is_some();
        let landmarks = self.stabilizer.smooth_landmarks(input.as_ref());

        let gesture = self.classifier.detect_gesture(landmarks.as_ref());
        let sign = landmarks.as_ref().map(recognize_sign);
        let pattern = self.classifier.detect_combination();
        let quality = self.stabilizer.tracking_quality();
        let palm = landmarks.as_ref().map(|lm| self.smooth_palm(lm.palm_pose()));

        self.metrics.record(start.elapsed(), confidence, occluded);

        FrameResult {
            landmarks,
            occluded,
            gesture,
            sign,
            pattern,
            quality,
            palm,
        }
    }

    fn smooth_palm(&mut self, pose: PalmPose) -> PalmPose {
        let factor = self.palm_smoothing_factor;
        let prev = self.smoothed_palm;
        let mut smoothed = pose;
        smoothed.center.x = smooth_value(prev.map(|p| p.center.x), pose.center.x, factor);
        smoothed.center.y = smooth_value(prev.map(|p| p.center.y), pose.center.y, factor);
        smoothed.center.z = smooth_value(prev.map(|p| p.center.z), pose.center.z, factor);
        self.smoothed_palm = Some(smoothed);
        smoothed
    }

    pub fn stabilizer(&self) -> &LandmarkStabilizer {
        &self.stabilizer
    }

    pub fn classifier(&self) -> &GestureClassifier {
        &self.classifier
    }

    pub fn metrics(&self) -> &PerformanceMetrics {
        &self.metrics
    }

    pub fn reset(&mut self) {
        self.stabilizer.reset();
        self.classifier.clear_history();
        self.smoothed_palm = None;
    }
}

impl HandTracker {
    pub fn new(config: TrackerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            hands: HashMap::new(),
            frame_counter: 0,
        })
    }

    /// Run every observed hand through its own pipeline. Hands absent from
    /// `observations` keep their state untouched.
    ///
    /// All observations are validated first: a malformed hand fails the
    /// whole frame and leaves every pipeline and the frame counter as they
    /// were.
    pub fn process_frame(&mut self, timestamp: f64, observations: &[HandObservation]) -> Result<TrackingResult> {
        let mut seen = HashSet::new();
        let mut validated = Vec::with_capacity(observations.len());
        for observation in observations {
            if !seen.insert(observation.handedness) {
                tracing::warn!(
                    frame = self.frame_counter,
                    hand = %observation.handedness,
                    "Duplicate hand in frame, ignoring"
                );
                continue;
            }
            let landmarks = observation
                .landmarks
                .as_deref()
                .map(HandLandmarks::from_slice)
                .transpose()?;
            validated.push((observation.handedness, landmarks, observation.confidence));
        }

        let mut result = TrackingResult {
            frame: self.frame_counter,
            timestamp,
            hands: BTreeMap::new(),
        };
        self.frame_counter += 1;

        let config = &self.config;
        for (handedness, landmarks, confidence) in validated {
            let pipeline = self.hands.entry(handedness).or_insert_with(|| {
                tracing::info!(hand = %handedness, "Started tracking hand");
                HandPipeline::new(config)
            });
            let hand = pipeline.process_landmarks(landmarks.as_ref(), confidence);
            result.hands.insert(handedness, hand);
        }

        Ok(result)
    }

    pub fn pipeline(&self, handedness: Handedness) -> Option<&HandPipeline> {
        self.hands.get(&handedness)
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn frames_processed(&self) -> u64 {
        self.frame_counter
    }

    pub fn reset(&mut self) {
        self.hands.clear();
        self.frame_counter = 0;
    }
}
