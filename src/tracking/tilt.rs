//! Head tilt classification
//!
//! The angle of the line through both outer eye corners picks the lane.
//! Canvas y grows downward, so a lower right eye reads as a positive
//! (rightward) tilt.

use serde::Serialize;

use crate::game::state::Lane;
use crate::tracking::landmarks::Keypoint;

/// A classified tilt
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TiltReading {
    /// Signed angle in degrees, after inversion
    pub angle_deg: f32,
    pub lane: Lane,
}

/// Tilt classification settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TiltClassifier {
    /// Degrees of tilt needed to leave the center lane
    pub threshold_deg: f32,
    /// Negate the angle before classifying
    pub invert: bool,
}

impl TiltClassifier {
    pub fn new(threshold_deg: u32, invert: bool) -> Self {
        Self {
            threshold_deg: threshold_deg as f32,
            invert,
        }
    }

    /// Classify the line from the left eye corner to the right one
    pub fn classify(&self, left_eye: Keypoint, right_eye: Keypoint) -> TiltReading {
        let dx = right_eye.x - left_eye.x;
        let dy = right_eye.y - left_eye.y;
        let angle = dy.atan2(dx).to_degrees();
        self.classify_angle(angle)
    }

    /// Classify a raw angle in degrees
    pub fn classify_angle(&self, angle_deg: f32) -> TiltReading {
        let angle_deg = if self.invert { -angle_deg } else { angle_deg };

        let lane = if angle_deg > self.threshold_deg {
            Lane::Right
        } else if angle_deg < -self.threshold_deg {
            Lane::Left
        } else {
            Lane::Center
        };

        TiltReading { angle_deg, lane }
    }
}
