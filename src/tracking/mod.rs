//! Face tracking: landmark inference boundary and tilt classification

pub mod estimator;
pub mod http;
pub mod landmarks;
pub mod tilt;

pub use estimator::{Estimator, EstimatorError, LandmarkEstimator, NullEstimator};
pub use landmarks::{FacialLandmarks, Keypoint};
pub use tilt::{TiltClassifier, TiltReading};
