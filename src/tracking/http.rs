//! HTTP inference backend
//!
//! Talks to a landmark service exposing:
//! - `GET  {base}/health`   - 2xx once the model is loaded
//! - `POST {base}/estimate` - frame bytes in, `{"faces":[{"keypoints":[[x,y,z],...]}]}` out

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::tracking::estimator::{EstimatorError, LandmarkEstimator};
use crate::tracking::landmarks::FacialLandmarks;
use crate::vision::{Frame, FrameFormat};

#[derive(Debug, Deserialize)]
struct EstimateResponse {
    #[serde(default)]
    faces: Vec<FacialLandmarks>,
}

/// Decode an `/estimate` response body
pub fn parse_faces(body: &[u8]) -> Result<Vec<FacialLandmarks>, EstimatorError> {
    serde_json::from_slice::<EstimateResponse>(body)
        .map(|r| r.faces)
        .map_err(|e| EstimatorError::Decode(e.to_string()))
}

/// Landmark estimator backed by a remote inference service.
///
/// Per-call time limits are applied by the caller.
pub struct HttpLandmarkEstimator {
    client: Client,
    base_url: String,
}

impl HttpLandmarkEstimator {
    /// Probe the service and return a ready estimator.
    ///
    /// Any failure here is a model-load failure.
    pub async fn connect(base_url: &str, timeout: Duration) -> Result<Self, EstimatorError> {
        let client = Client::builder()
            .no_proxy()
            .build()
            .map_err(|e| EstimatorError::ModelLoad(e.to_string()))?;
        let base_url = base_url.trim_end_matches('/').to_string();
        let health = format!("{}/health", base_url);

        debug!("Probing landmark service at {}", health);
        let response = tokio::time::timeout(timeout, client.get(&health).send())
            .await
            .map_err(|_| EstimatorError::ModelLoad(format!("health check timed out after {:?}", timeout)))?
            .map_err(|e| EstimatorError::ModelLoad(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EstimatorError::ModelLoad(format!(
                "health check returned {}",
                response.status()
            )));
        }

        info!("Landmark service ready at {}", base_url);
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl LandmarkEstimator for HttpLandmarkEstimator {
    async fn estimate(&self, frame: &Frame) -> Result<Vec<FacialLandmarks>, EstimatorError> {
        let mut request = self
            .client
            .post(format!("{}/estimate", self.base_url))
            .body(frame.data.to_vec());

        request = match frame.format {
            FrameFormat::Encoded => request.header(CONTENT_TYPE, "application/octet-stream"),
            FrameFormat::Rgb24 { width, height } => request
                .header(CONTENT_TYPE, "application/x-rgb24")
                .header("x-frame-width", width)
                .header("x-frame-height", height),
        };

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(EstimatorError::Status(response.status()));
        }

        let body = response.bytes().await?;
        parse_faces(&body)
    }
}
