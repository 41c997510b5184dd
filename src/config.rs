// src/config.rs
//! Tracker configuration

use directories::ProjectDirs;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::gesture::GestureDefinition;
use crate::{Error, Result};

/// Built-in gesture table, in registration (tie-break) order
pub static DEFAULT_GESTURES: Lazy<Vec<GestureDefinition>> = Lazy::new(|| {
    vec![
        GestureDefinition::with_fingers("open_palm", 5, 1.0),
        GestureDefinition::with_fingers("fist", 0, 0.95),
        GestureDefinition::with_fingers("peace", 2, 0.9),
        GestureDefinition::without_fingers("thumbs_up", 0.85),
        GestureDefinition::with_fingers("point", 1, 0.88),
    ]
});

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub stabilizer: StabilizerConfig,
    pub classifier: ClassifierConfig,
    /// Exponential smoothing factor for the palm center (0 = frozen, 1 = raw)
    pub palm_smoothing_factor: f64,
    /// Number of frame timings averaged into the performance metrics
    pub metrics_window: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizerConfig {
    /// Capacity of the position and velocity histories
    pub buffer_size: usize,
    pub process_noise: f64,
    pub measurement_noise: f64,
    /// Error variance assigned on a filter's first observation
    pub initial_error_variance: f64,
    /// Detection confidence below which prediction replaces the detection
    pub occlusion_confidence_threshold: f64,
    /// Consecutive frames that may be filled by prediction before the hand
    /// is reported lost (0 disables occlusion recovery)
    pub max_predicted_frames: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Capacity of the accepted-gesture history
    pub history_length: usize,
    /// Minimum score for a gesture to be accepted
    pub confidence_threshold: f64,
    pub gestures: Vec<GestureDefinition>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            stabilizer: StabilizerConfig::default(),
            classifier: ClassifierConfig::default(),
            palm_smoothing_factor: 0.3,
            metrics_window: 30,
        }
    }
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            buffer_size: 5,
            process_noise: 0.1,
            measurement_noise: 0.1,
            initial_error_variance: 1.0,
            occlusion_confidence_threshold: 0.3,
            max_predicted_frames: 5,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            history_length: 10,
            confidence_threshold: 0.7,
            gestures: DEFAULT_GESTURES.clone(),
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<()> {
        self.stabilizer.validate()?;
        self.classifier.validate()?;
        if !(0.0..=1.0).contains(&self.palm_smoothing_factor) {
            return Err(Error::Config(format!(
                "palm_smoothing_factor must be in [0, 1], got {}",
                self.palm_smoothing_factor
            )));
        }
        if self.metrics_window == 0 {
            return Err(Error::Config("metrics_window must be at least 1".into()));
        }
        Ok(())
    }

    /// Load and validate a JSON config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        tracing::info!("Loaded tracker config from {}", path.display());
        Ok(config)
    }

    /// Load from the platform config directory, or fall back to defaults
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => {
                tracing::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "handgesture", "hand_gesture_tracker")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }
}

impl StabilizerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(Error::Config("buffer_size must be at least 1".into()));
        }
        for (name, value) in [
            ("process_noise", self.process_noise),
            ("measurement_noise", self.measurement_noise),
            ("initial_error_variance", self.initial_error_variance),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::Config(format!("{} must be positive, got {}", name, value)));
            }
        }
        if !(0.0..=1.0).contains(&self.occlusion_confidence_threshold) {
            return Err(Error::Config(format!(
                "occlusion_confidence_threshold must be in [0, 1], got {}",
                self.occlusion_confidence_threshold
            )));
        }
        Ok(())
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<()> {
        if self.history_length == 0 {
            return Err(Error::Config("history_length must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(Error::Config(format!(
                "confidence_threshold must be in [0, 1], got {}",
                self.confidence_threshold
            )));
        }

        let mut seen = HashSet::new();
        for gesture in &self.gestures {
            if gesture.name.is_empty() || gesture.name == crate::gesture::UNKNOWN_GESTURE {
                return Err(Error::Config(format!("invalid gesture name {:?}", gesture.name)));
            }
            if !seen.insert(gesture.name.as_str()) {
                return Err(Error::Config(format!("duplicate gesture {:?}", gesture.name)));
            }
            if !(0.0..=1.0).contains(&gesture.confidence_weight) {
                return Err(Error::Config(format!(
                    "gesture {:?}: confidence_weight must be in [0, 1], got {}",
                    gesture.name, gesture.confidence_weight
                )));
            }
            if matches!(gesture.expected_extended_fingers, Some(n) if n > 5) {
                return Err(Error::Config(format!(
                    "gesture {:?}: a hand has at most 5 fingers",
                    gesture.name
                )));
            }
        }
        Ok(())
    }
}
