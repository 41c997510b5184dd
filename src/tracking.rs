// src/tracking.rs - Landmark smoothing, motion prediction and occlusion recovery
use nalgebra::Vector3;
use serde::Serialize;

use crate::config::StabilizerConfig;
use crate::history::RingBuffer;
use crate::landmarks::{HandLandmarks, LANDMARK_COUNT};
use crate::Result;

/// Per-landmark frame-to-frame displacement
pub type LandmarkVelocity = [Vector3<f64>; LANDMARK_COUNT];

/// Scalar Kalman filter over one landmark. The three coordinates share a
/// single error variance and a constant-position motion model.
#[derive(Debug, Clone)]
pub struct KalmanFilter {
    estimate: Option<Vector3<f64>>,
    error_variance: f64,
    process_noise: f64,
    measurement_noise: f64,
    initial_error_variance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrackingQuality {
    /// Position history fill ratio in [0, 1]
    pub smoothness: f64,
    /// 1.0 once at least two velocity samples exist, else 0.0
    pub stability: f64,
}

pub struct LandmarkStabilizer {
    config: StabilizerConfig,
    filters: [KalmanFilter; LANDMARK_COUNT],
    position_history: RingBuffer<HandLandmarks>,
    velocity_history: RingBuffer<LandmarkVelocity>,
    /// Consecutive frames answered with a prediction instead of a detection
    predicted_streak: usize,
}

impl KalmanFilter {
    pub fn new(process_noise: f64, measurement_noise: f64, initial_error_variance: f64) -> Self {
        Self {
            estimate: None,
            error_variance: 0.0,
            process_noise,
            measurement_noise,
            initial_error_variance,
        }
    }

    pub fn from_config(config: &StabilizerConfig) -> Self {
        Self::new(
            config.process_noise,
            config.measurement_noise,
            config.initial_error_variance,
        )
    }

    /// Fold in a measurement and return the corrected estimate. The first
    /// measurement is taken as-is.
    pub fn update(&mut self, measurement: Vector3<f64>) -> Vector3<f64> {
        let Some(estimate) = self.estimate else {
            self.estimate = Some(measurement);
            self.error_variance = self.initial_error_variance;
            return measurement;
        };

        let gain = self.gain();
        let corrected = estimate + (measurement - estimate) * gain;
        self.estimate = Some(corrected);
        self.error_variance *= 1.0 - gain;
        corrected
    }

    /// Grow the uncertainty by the process noise and return the unchanged
    /// estimate, or `None` before the first measurement.
    pub fn predict(&mut self) -> Option<Vector3<f64>> {
        let estimate = self.estimate?;
        self.error_variance += self.process_noise;
        Some(estimate)
    }

    /// Gain the next update would apply
    pub fn gain(&self) -> f64 {
        self.error_variance / (self.error_variance + self.measurement_noise)
    }

    pub fn estimate(&self) -> Option<Vector3<f64>> {
        self.estimate
    }

    pub fn error_variance(&self) -> f64 {
        self.error_variance
    }

    pub fn is_initialized(&self) -> bool {
        self.estimate.is_some()
    }

    pub fn reset(&mut self) {
        self.estimate = None;
        self.error_variance = 0.0;
    }
}

impl LandmarkStabilizer {
    /// Build without validating `config`; callers holding untrusted config
    /// should use [`LandmarkStabilizer::try_new`].
    pub fn new(config: StabilizerConfig) -> Self {
        let filters = std::array::from_fn(|_| KalmanFilter::from_config(&config));
        Self {
            position_history: RingBuffer::new(config.buffer_size),
            velocity_history: RingBuffer::new(config.buffer_size),
            filters,
            predicted_streak: 0,
            config,
        }
    }

    pub fn try_new(config: StabilizerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Run update then predict on every landmark filter and record the
    /// smoothed set. Returns `None` (and leaves state untouched) when the
    /// detector produced nothing this frame.
    pub fn smooth_landmarks(&mut self, landmarks: Option<&HandLandmarks>) -> Option<HandLandmarks> {
        let landmarks = landmarks?;

        let points = landmarks.points();
        let smoothed = std::array::from_fn(|i| {
            let filter = &mut self.filters[i];
            let corrected = filter.update(points[i]);
            filter.predict().unwrap_or(corrected)
        });
        let smoothed = HandLandmarks::new(smoothed);

        self.record_position(smoothed);
        Some(smoothed)
    }

    /// Push a position into the motion history, deriving a velocity sample
    /// from the previous one.
    pub fn record_position(&mut self, position: HandLandmarks) {
        if let Some(previous) = self.position_history.newest() {
            self.velocity_history.push(position.displacement_from(previous));
        }
        self.position_history.push(position);
    }

    /// Linear extrapolation from the two most recent positions.
    pub fn predict_next_position(&self) -> Option<HandLandmarks> {
        let last = self.position_history.nth_newest(0)?;
        let second_to_last = self.position_history.nth_newest(1)?;
        Some(last.translated(&last.displacement_from(second_to_last)))
    }

    /// When the detector is unsure and we have motion history, trust the
    /// extrapolated position over the detection. The whole set is replaced.
    /// After `max_predicted_frames` substitutions in a row the detection is
    /// passed through again, so a vanished hand stops producing output.
    pub fn handle_occlusion(
        &mut self,
        landmarks: Option<&HandLandmarks>,
        detection_confidence: f64,
    ) -> Option<HandLandmarks> {
        if self.is_occluded(detection_confidence) {
            let predicted = self.predict_next_position();
            if predicted.is_some() {
                self.predicted_streak += 1;
            }
            tracing::debug!(
                detection_confidence,
                recovered = predicted.is_some(),
                streak = self.predicted_streak,
                "Low detection confidence, substituting predicted landmarks"
            );
            return predicted;
        }
        if landmarks.is_some() {
            self.predicted_streak = 0;
        } else if self.predicted_streak > 0 {
            tracing::debug!(streak = self.predicted_streak, "Prediction limit reached, hand lost");
        }
        landmarks.copied()
    }

    /// Whether a detection at this confidence would be replaced by prediction
    pub fn is_occluded(&self, detection_confidence: f64) -> bool {
        detection_confidence < self.config.occlusion_confidence_threshold
            && !self.position_history.is_empty()
            && self.predicted_streak < self.config.max_predicted_frames
    }

    pub fn predicted_streak(&self) -> usize {
        self.predicted_streak
    }

    pub fn tracking_quality(&self) -> TrackingQuality {
        TrackingQuality {
            smoothness: self.position_history.len() as f64 / self.position_history.capacity() as f64,
            stability: if self.velocity_history.len() > 1 { 1.0 } else { 0.0 },
        }
    }

    pub fn filters(&self) -> &[KalmanFilter; LANDMARK_COUNT] {
        &self.filters
    }

    /// Recent smoothed positions, oldest first
    pub fn position_history(&self) -> Vec<HandLandmarks> {
        self.position_history.to_vec()
    }

    pub fn config(&self) -> &StabilizerConfig {
        &self.config
    }

    pub fn reset(&mut self) {
        self.filters.iter_mut().for_each(KalmanFilter::reset);
        self.position_history.clear();
        self.velocity_history.clear();
        self.predicted_streak = 0;
    }
}

impl Default for LandmarkStabilizer {
    fn default() -> Self {
        Self::new(StabilizerConfig::default())
    }
}
