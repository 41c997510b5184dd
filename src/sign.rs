// src/sign.rs
//! Stateless rule-based hand sign recognition.
//!
//! Unlike [`crate::gesture::GestureClassifier`] this keeps no history and has
//! no configurable table: a fixed list of finger-state rules is checked in
//! order and the first match wins.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::landmarks::{
    HandLandmarks, INDEX_PIP, INDEX_TIP, MIDDLE_PIP, MIDDLE_TIP, PINKY_PIP, PINKY_TIP, RING_PIP,
    RING_TIP, THUMB_IP, THUMB_TIP,
};

/// Thumb-to-index tip distance below which a raised thumb and index pinch
pub const PINCH_DISTANCE: f64 = 0.05;

/// (tip, PIP joint) for the four fingers
const FINGER_PIP_PAIRS: [(usize, usize); 4] = [
    (INDEX_TIP, INDEX_PIP),
    (MIDDLE_TIP, MIDDLE_PIP),
    (RING_TIP, RING_PIP),
    (PINKY_TIP, PINKY_PIP),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandSign {
    OpenHand,
    ClosedFist,
    Pointing,
    PeaceSign,
    ThumbsUp,
    Pinch,
    Unknown,
}

impl HandSign {
    pub fn label(&self) -> &'static str {
        match self {
            HandSign::OpenHand => "Open Hand",
            HandSign::ClosedFist => "Closed Fist",
            HandSign::Pointing => "Pointing",
            HandSign::PeaceSign => "Peace Sign",
            HandSign::ThumbsUp => "Thumbs Up",
            HandSign::Pinch => "Pinch",
            HandSign::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for HandSign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raised state of each digit, thumb first.
///
/// The thumb is judged sideways (tip left of the IP joint in image x), the
/// other fingers vertically (tip above the PIP joint).
pub fn finger_states(landmarks: &HandLandmarks) -> [bool; 5] {
    let lm = landmarks.points();
    let mut states = [false; 5];
    states[0] = lm[THUMB_TIP].x < lm[THUMB_IP].x;
    for (i, &(tip, pip)) in FINGER_PIP_PAIRS.iter().enumerate() {
        states[i + 1] = lm[tip].y < lm[pip].y;
    }
    states
}

pub fn recognize_sign(landmarks: &HandLandmarks) -> HandSign {
    let fingers = finger_states(landmarks);
    let [thumb, index, middle, ring, pinky] = fingers;

    if fingers.iter().all(|&up| up) {
        HandSign::OpenHand
    } else if !fingers.iter().any(|&up| up) {
        HandSign::ClosedFist
    } else if index && !(middle || ring || pinky) {
        HandSign::Pointing
    } else if index && middle && !(ring || pinky) {
        HandSign::PeaceSign
    } else if thumb && !(index || middle || ring || pinky) {
        HandSign::ThumbsUp
    } else if thumb && index && pinch_distance(landmarks) < PINCH_DISTANCE {
        HandSign::Pinch
    } else {
        HandSign::Unknown
    }
}

fn pinch_distance(landmarks: &HandLandmarks) -> f64 {
    let lm = landmarks.points();
    (lm[THUMB_TIP] - lm[INDEX_TIP]).norm()
}
