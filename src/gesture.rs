// src/gesture.rs - Gesture scoring and temporal pattern detection
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ClassifierConfig;
use crate::history::RingBuffer;
use crate::landmarks::{HandLandmarks, FINGERTIPS, TIP_JOINT_PAIRS, WRIST};
use crate::Result;

/// Label reported when no definition clears the confidence threshold
pub const UNKNOWN_GESTURE: &str = "unknown";

/// Number of most recent accepted gestures inspected for a pattern
const PATTERN_WINDOW: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureDefinition {
    pub name: String,
    /// Definitions without a finger count never score above zero
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_extended_fingers: Option<u8>,
    pub confidence_weight: f64,
}

/// Palm-relative fingertip geometry in the image plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HandShape {
    pub avg_distance: f64,
    pub spread: f64,
    /// Thumb tip distance, used as a scale proxy
    pub palm_width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GestureMatch {
    pub name: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TemporalPattern {
    /// Fewer than three accepted gestures so far
    None,
    /// The last three accepted gestures were identical
    Sustained(String),
    /// The last three accepted gestures were mixed
    Combination,
}

pub struct GestureClassifier {
    definitions: Vec<GestureDefinition>,
    history: RingBuffer<String>,
    confidence_threshold: f64,
}

impl GestureDefinition {
    pub fn with_fingers(name: &str, fingers: u8, confidence_weight: f64) -> Self {
        Self {
            name: name.to_string(),
            expected_extended_fingers: Some(fingers),
            confidence_weight,
        }
    }

    pub fn without_fingers(name: &str, confidence_weight: f64) -> Self {
        Self {
            name: name.to_string(),
            expected_extended_fingers: None,
            confidence_weight,
        }
    }

    /// Score against the observed features, capped at 1.0.
    pub fn score(&self, fingers_extended: u8, _shape: &HandShape) -> f64 {
        let score = match self.expected_extended_fingers {
            Some(expected) if expected == fingers_extended => self.confidence_weight,
            _ => 0.0,
        };
        score.min(1.0)
    }
}

impl GestureMatch {
    pub fn unknown() -> Self {
        Self {
            name: UNKNOWN_GESTURE.to_string(),
            confidence: 0.0,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.name == UNKNOWN_GESTURE
    }
}

impl TemporalPattern {
    pub fn is_none(&self) -> bool {
        matches!(self, TemporalPattern::None)
    }

    pub fn label(&self) -> Option<String> {
        match self {
            TemporalPattern::None => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for TemporalPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemporalPattern::None => write!(f, "none"),
            TemporalPattern::Sustained(name) => write!(f, "sustained_{}", name),
            TemporalPattern::Combination => write!(f, "combination"),
        }
    }
}

/// Count digits whose tip sits above (smaller y than) the joint below it.
/// The thumb gets the same vertical test as the other fingers.
pub fn count_extended_fingers(landmarks: &HandLandmarks) -> u8 {
    let points = landmarks.points();
    TIP_JOINT_PAIRS
        .iter()
        .filter(|&&(tip, joint)| points[tip].y < points[joint].y)
        .count() as u8
}

pub fn analyze_hand_shape(landmarks: &HandLandmarks) -> HandShape {
    let points = landmarks.points();
    let palm = points[WRIST].xy();
    let distances = FINGERTIPS.map(|tip| (points[tip].xy() - palm).norm());

    let n = distances.len() as f64;
    let avg_distance = distances.iter().sum::<f64>() / n;
    let variance = distances.iter().map(|d| (d - avg_distance).powi(2)).sum::<f64>() / n;

    HandShape {
        avg_distance,
        spread: variance.sqrt(),
        palm_width: distances[0],
    }
}

impl GestureClassifier {
    /// Build without validating `config`. A NaN threshold here rejects every
    /// gesture; use [`GestureClassifier::try_new`] for untrusted tables.
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            history: RingBuffer::new(config.history_length),
            confidence_threshold: config.confidence_threshold,
            definitions: config.gestures,
        }
    }

    pub fn try_new(config: ClassifierConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Classify one frame. Only accepted gestures enter the history.
    pub fn detect_gesture(&mut self, landmarks: Option<&HandLandmarks>) -> GestureMatch {
        let Some(landmarks) = landmarks else {
            return GestureMatch::unknown();
        };

        let fingers_extended = count_extended_fingers(landmarks);
        let shape = analyze_hand_shape(landmarks);

        // Strict comparison keeps the first-registered definition on ties
        let mut best: Option<(&GestureDefinition, f64)> = None;
        for definition in &self.definitions {
            let score = definition.score(fingers_extended, &shape);
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((definition, score));
            }
        }

        match best {
            Some((definition, score)) if score >= self.confidence_threshold => {
                tracing::debug!(
                    gesture = %definition.name,
                    score,
                    fingers_extended,
                    spread = shape.spread,
                    "Gesture accepted"
                );
                let accepted = GestureMatch {
                    name: definition.name.clone(),
                    confidence: score,
                };
                self.history.push(accepted.name.clone());
                accepted
            }
            _ => GestureMatch::unknown(),
        }
    }

    /// Accepted gestures, oldest first
    pub fn gesture_pattern(&self) -> Vec<String> {
        self.history.to_vec()
    }

    pub fn detect_combination(&self) -> TemporalPattern {
        if self.history.len() < PATTERN_WINDOW {
            return TemporalPattern::None;
        }

        let Some(newest) = self.history.newest() else {
            return TemporalPattern::None;
        };
        let sustained = (1..PATTERN_WINDOW).all(|n| self.history.nth_newest(n) == Some(newest));
        if sustained {
            TemporalPattern::Sustained(newest.clone())
        } else {
            TemporalPattern::Combination
        }
    }

    pub fn definitions(&self) -> &[GestureDefinition] {
        &self.definitions
    }

    pub fn confidence_threshold(&self) -> f64 {
        self.confidence_threshold
    }

    pub fn history_capacity(&self) -> usize {
        self.history.capacity()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

impl Default for GestureClassifier {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}
