// src/landmarks.rs
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Number of keypoints in a hand skeleton
pub const LANDMARK_COUNT: usize = 21;

// Hand landmark indices
pub const WRIST: usize = 0;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_PIP: usize = 6;
pub const INDEX_DIP: usize = 7;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_DIP: usize = 11;
pub const MIDDLE_TIP: usize = 12;
pub const RING_PIP: usize = 14;
pub const RING_DIP: usize = 15;
pub const RING_TIP: usize = 16;
pub const PINKY_PIP: usize = 18;
pub const PINKY_DIP: usize = 19;
pub const PINKY_TIP: usize = 20;

/// Fingertips, thumb first
pub const FINGERTIPS: [usize; 5] = [THUMB_TIP, INDEX_TIP, MIDDLE_TIP, RING_TIP, PINKY_TIP];

/// (tip, joint below the tip) for each digit, thumb first
pub const TIP_JOINT_PAIRS: [(usize, usize); 5] = [
    (THUMB_TIP, THUMB_IP),
    (INDEX_TIP, INDEX_DIP),
    (MIDDLE_TIP, MIDDLE_DIP),
    (RING_TIP, RING_DIP),
    (PINKY_TIP, PINKY_DIP),
];

/// One hand skeleton: 21 points in anatomical index order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HandLandmarks {
    points: [Vector3<f64>; LANDMARK_COUNT],
}

impl HandLandmarks {
    pub fn new(points: [Vector3<f64>; LANDMARK_COUNT]) -> Self {
        Self { points }
    }

    /// Build from detector output. Anything other than 21 points is a
    /// malformed upstream frame and is rejected.
    pub fn from_slice(raw: &[[f64; 3]]) -> Result<Self> {
        if raw.len() != LANDMARK_COUNT {
            return Err(Error::ShapeMismatch {
                expected: LANDMARK_COUNT,
                actual: raw.len(),
            });
        }
        Ok(Self {
            points: std::array::from_fn(|i| Vector3::new(raw[i][0], raw[i][1], raw[i][2])),
        })
    }

    pub fn from_vectors(points: &[Vector3<f64>]) -> Result<Self> {
        let points: [Vector3<f64>; LANDMARK_COUNT] =
            points.try_into().map_err(|_| Error::ShapeMismatch {
                expected: LANDMARK_COUNT,
                actual: points.len(),
            })?;
        Ok(Self { points })
    }

    pub fn points(&self) -> &[Vector3<f64>; LANDMARK_COUNT] {
        &self.points
    }

    pub fn point(&self, index: usize) -> Option<&Vector3<f64>> {
        self.points.get(index)
    }

    pub fn wrist(&self) -> Vector3<f64> {
        self.points[WRIST]
    }

    pub fn to_array(&self) -> [[f64; 3]; LANDMARK_COUNT] {
        std::array::from_fn(|i| [self.points[i].x, self.points[i].y, self.points[i].z])
    }

    /// Per-landmark displacement from `previous` to `self`.
    pub fn displacement_from(&self, previous: &HandLandmarks) -> [Vector3<f64>; LANDMARK_COUNT] {
        std::array::from_fn(|i| self.points[i] - previous.points[i])
    }

    /// Move every landmark by its own offset.
    pub fn translated(&self, offsets: &[Vector3<f64>; LANDMARK_COUNT]) -> HandLandmarks {
        HandLandmarks {
            points: std::array::from_fn(|i| self.points[i] + offsets[i]),
        }
    }

    /// Palm center and in-plane orientation of the hand.
    pub fn palm_pose(&self) -> PalmPose {
        let wrist = self.points[WRIST];
        let middle_mcp = self.points[MIDDLE_MCP];
        let center = (wrist + middle_mcp) / 2.0;
        let dx = middle_mcp.x - wrist.x;
        let dy = middle_mcp.y - wrist.y;
        PalmPose {
            center,
            rotation_degrees: dy.atan2(dx).to_degrees(),
        }
    }
}

/// Palm position and rotation derived from wrist and middle-finger base.
/// Coordinates are the detector's normalized image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PalmPose {
    pub center: Vector3<f64>,
    pub rotation_degrees: f64,
}
