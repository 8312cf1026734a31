//! Text detection providers
//!
//! Defines the detector trait and the Google Cloud Vision implementation.

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;

use crate::error::AppError;
use crate::metrics::observe_upstream_call;

/// One annotation returned by a detector
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedText {
    pub description: String,
    /// Missing when the provider does not score annotations
    pub confidence: Option<f32>,
}

impl DetectedText {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            confidence: None,
        }
    }
}

/// Text detector trait
///
/// The first annotation is the full text of the image, the rest are the
/// individual tokens. An image without text yields an empty list.
#[async_trait]
pub trait TextDetector: Send + Sync {
    async fn detect(&self, image: &[u8]) -> Result<Vec<DetectedText>, AppError>;
}

/// Google Cloud Vision `images:annotate` with TEXT_DETECTION
pub struct VisionTextDetector {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl VisionTextDetector {
    pub fn new(client: reqwest::Client, endpoint: &str, api_key: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    #[serde(default)]
    text_annotations: Vec<TextAnnotation>,
    error: Option<StatusMessage>,
}

#[derive(Debug, Deserialize)]
struct TextAnnotation {
    #[serde(default)]
    description: String,
    score: Option<f32>,
    confidence: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct StatusMessage {
    #[serde(default)]
    message: String,
}

#[async_trait]
impl TextDetector for VisionTextDetector {
    async fn detect(&self, image: &[u8]) -> Result<Vec<DetectedText>, AppError> {
        let request = serde_json::json!({
            "requests": [{
                "image": {
                    "content": base64::engine::general_purpose::STANDARD.encode(image)
                },
                "features": [{ "type": "TEXT_DETECTION" }]
            }]
        });

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            // The URL carries the API key
            .map_err(reqwest::Error::without_url)
            .inspect_err(|_| observe_upstream_call("vision", false))?;

        if !response.status().is_success() {
            observe_upstream_call("vision", false);
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "Vision returned {}: {}",
                status, body
            )));
        }

        let parsed: AnnotateResponse = response
            .json()
            .await
            .inspect_err(|_| observe_upstream_call("vision", false))?;

        let Some(first) = parsed.responses.into_iter().next() else {
            observe_upstream_call("vision", true);
            return Ok(Vec::new());
        };
        if let Some(error) = first.error {
            observe_upstream_call("vision", false);
            return Err(AppError::Upstream(format!("Vision error: {}", error.message)));
        }
        observe_upstream_call("vision", true);

        Ok(first
            .text_annotations
            .into_iter()
            .map(|a| DetectedText {
                description: a.description,
                confidence: a.score.or(a.confidence),
            })
            .collect())
    }
}
