//! Landmark estimator boundary
//!
//! Inference is an external capability. The control loop only relies on
//! this contract: hand over a frame, get back zero or more faces. Only the
//! first face is ever consumed.

use std::time::Duration;

use reqwest::StatusCode;

use crate::tracking::http::HttpLandmarkEstimator;
use crate::tracking::landmarks::FacialLandmarks;
use crate::vision::Frame;

/// Estimator failures
#[derive(Debug, thiserror::Error)]
pub enum EstimatorError {
    /// The model could not be brought up; fatal to starting the game
    #[error("Could not load face model: {0}")]
    ModelLoad(String),
    #[error("Inference request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Inference service returned status {0}")]
    Status(StatusCode),
    #[error("Malformed inference response: {0}")]
    Decode(String),
    #[error("Inference timed out after {0:?}")]
    Timeout(Duration),
}

/// Facial landmark inference
#[allow(async_fn_in_trait)]
pub trait LandmarkEstimator {
    /// Detect faces in `frame`; an empty list means no face
    async fn estimate(&self, frame: &Frame) -> Result<Vec<FacialLandmarks>, EstimatorError>;
}

/// Estimator that never finds a face (preview without a model)
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEstimator;

impl LandmarkEstimator for NullEstimator {
    async fn estimate(&self, _frame: &Frame) -> Result<Vec<FacialLandmarks>, EstimatorError> {
        Ok(Vec::new())
    }
}

/// The backend chosen at startup
pub enum Estimator {
    Null(NullEstimator),
    Http(HttpLandmarkEstimator),
}

impl Estimator {
    pub fn name(&self) -> &'static str {
        match self {
            Estimator::Null(_) => "none",
            Estimator::Http(_) => "http",
        }
    }
}

impl LandmarkEstimator for Estimator {
    async fn estimate(&self, frame: &Frame) -> Result<Vec<FacialLandmarks>, EstimatorError> {
        match self {
            Estimator::Null(e) => e.estimate(frame).await,
            Estimator::Http(e) => e.estimate(frame).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_null_estimator_finds_nothing() {
        let estimator = Estimator::Null(NullEstimator);
        let faces = estimator.estimate(&Frame::encoded(vec![1, 2, 3])).await.unwrap();
        assert!(faces.is_empty());
        assert_eq!(estimator.name(), "none");
    }
}
