//! Facial landmark types

use serde::{Deserialize, Serialize};

/// Mesh index of the left eye's outer corner
pub const LEFT_EYE_OUTER: usize = 133;
/// Mesh index of the right eye's outer corner
pub const RIGHT_EYE_OUTER: usize = 263;
/// Number of points in a full face mesh
pub const MESH_POINTS: usize = 468;

/// A single tracked landmark in frame coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 3]", into = "[f32; 3]")]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Keypoint {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl From<[f32; 3]> for Keypoint {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self { x, y, z }
    }
}

impl From<Keypoint> for [f32; 3] {
    fn from(p: Keypoint) -> Self {
        [p.x, p.y, p.z]
    }
}

/// One detected face as an ordered keypoint list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacialLandmarks {
    pub keypoints: Vec<Keypoint>,
}

impl FacialLandmarks {
    pub fn new(keypoints: Vec<Keypoint>) -> Self {
        Self { keypoints }
    }

    /// The (left, right) outer eye corners, if the mesh contains them
    pub fn eye_corners(&self) -> Option<(Keypoint, Keypoint)> {
        let left = self.keypoints.get(LEFT_EYE_OUTER)?;
        let right = self.keypoints.get(RIGHT_EYE_OUTER)?;
        Some((*left, *right))
    }
}

#[cfg(test)]
pub(crate) fn mesh_with_eyes(left: (f32, f32), right: (f32, f32)) -> FacialLandmarks {
    let mut keypoints = vec![Keypoint::default(); MESH_POINTS];
    keypoints[LEFT_EYE_OUTER] = Keypoint::new(left.0, left.1, 0.0);
    keypoints[RIGHT_EYE_OUTER] = Keypoint::new(right.0, right.1, 0.0);
    FacialLandmarks::new(keypoints)
}
