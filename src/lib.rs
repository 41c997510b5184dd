// src/lib.rs
//! Hand landmark stabilization and gesture recognition.
//!
//! Raw 21-point hand skeletons come in from an external detector. The
//! [`LandmarkStabilizer`] smooths them and bridges short occlusions, the
//! [`GestureClassifier`] turns them into scored gesture labels and temporal
//! patterns. [`HandPipeline`] and [`HandTracker`] compose the two per hand.

pub mod config;
pub mod data;
pub mod gesture;
pub mod history;
pub mod landmarks;
pub mod pipeline;
pub mod sign;
pub mod tracking;

pub use config::{ClassifierConfig, StabilizerConfig, TrackerConfig};
pub use gesture::{GestureClassifier, GestureDefinition, GestureMatch, HandShape, TemporalPattern};
pub use history::RingBuffer;
pub use landmarks::{HandLandmarks, PalmPose, LANDMARK_COUNT};
pub use pipeline::{FrameResult, HandPipeline, HandTracker, PerformanceMetrics, TrackingResult};
pub use sign::{recognize_sign, HandSign};
pub use tracking::{KalmanFilter, LandmarkStabilizer, TrackingQuality};

/// Result type alias for the tracker
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the tracker
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Landmark shape mismatch: expected {expected} points, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Recording error at line {line}: {message}")]
    Recording { line: usize, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
