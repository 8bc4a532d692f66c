//! Veo video generation client.
//!
//! Image-to-video with synchronized speech. One `generate` call creates a
//! long-running operation and polls it to a terminal state, blocking for up
//! to the per-clip budget.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::adapters::{GeneratedClip, VideoGenerator, VideoRequest};
use crate::error::{PipelineError, PipelineResult};

const DEFAULT_MODEL: &str = "veo-3.1-generate-preview";
const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const POLL_INTERVAL: Duration = Duration::from_secs(10);
const POLL_BUDGET: Duration = Duration::from_secs(600);

/// Markers that identify a content-policy denial in engine error text.
const CONTENT_POLICY_MARKERS: &[&str] = &[
    "safety filter",
    "blocked by",
    "violates",
    "content policy",
    "usage guidelines",
    "inappropriate content",
];

/// Veo API client.
pub struct VeoClient {
    api_key: String,
    model: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct Operation {
    name: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<OperationError>,
    #[serde(default)]
    response: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize, Serialize)]
struct OperationError {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

impl VeoClient {
    /// Create a new Veo client.
    pub fn new() -> PipelineResult<Self> {
        let api_key = std::env::var("VEO_API_KEY")
            .or_else(|_| std::env::var("GEMINI_API_KEY"))
            .map_err(|_| PipelineError::validation("VEO_API_KEY or GEMINI_API_KEY not set"))?;
        let model = std::env::var("VEO_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| PipelineError::transient(e.to_string()))?;

        Ok(Self {
            api_key,
            model,
            client,
        })
    }

    /// Snap a target duration to the engine's allowed values.
    fn snap_duration(seconds: u32) -> u32 {
        if seconds > 6 {
            8
        } else if seconds > 4 {
            6
        } else {
            4
        }
    }

    fn classify_engine_error(message: &str) -> PipelineError {
        let lower = message.to_lowercase();
        if CONTENT_POLICY_MARKERS.iter().any(|m| lower.contains(m)) {
            PipelineError::content_policy(message.to_string())
        } else {
            PipelineError::transient(message.to_string())
        }
    }

    async fn start_operation(&self, request: &VideoRequest<'_>) -> PipelineResult<String> {
        use base64::Engine as _;
        let image_b64 = base64::engine::general_purpose::STANDARD.encode(request.reference_image);

        // The spoken line rides with the prompt so the engine lip-syncs it.
        let prompt = format!(
            "{} The character speaks: \"{}\"",
            request.visual_prompt, request.spoken_text
        );

        let body = json!({
            "instances": [{
                "prompt": prompt,
                "image": {
                    "bytesBase64Encoded": image_b64,
                    "mimeType": "image/png",
                },
            }],
            "parameters": {
                "aspectRatio": request.aspect_ratio.as_str(),
                "resolution": request.resolution.as_str(),
                "durationSeconds": Self::snap_duration(request.duration_seconds),
                "sampleCount": 1,
                "generateAudio": true,
            },
        });

        let url = format!(
            "{}/models/{}:predictLongRunning?key={}",
            API_BASE, self.model, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::transient(format!("Veo request failed: {}", e)))?;

        let status = response.status().as_u16();
        if status != 200 {
            let text = response.text().await.unwrap_or_default();
            return if PipelineError::status_is_transient(status) {
                Err(PipelineError::transient(format!("Veo returned {}: {}", status, text)))
            } else {
                Err(Self::classify_engine_error(&text))
            };
        }

        let op: Operation = response
            .json()
            .await
            .map_err(|e| PipelineError::transient(format!("Unparseable Veo response: {}", e)))?;

        debug!("Veo operation started: {}", op.name);
        Ok(op.name)
    }

    async fn poll_operation(&self, operation_name: &str) -> PipelineResult<serde_json::Value> {
        let url = format!("{}/{}?key={}", API_BASE, operation_name, self.api_key);
        let deadline = tokio::time::Instant::now() + POLL_BUDGET;

        loop {
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| PipelineError::transient(format!("Veo poll failed: {}", e)))?;

            let status = response.status().as_u16();
            if status != 200 {
                let text = response.text().await.unwrap_or_default();
                return Err(PipelineError::transient(format!(
                    "Veo poll returned {}: {}",
                    status, text
                )));
            }

            let op: Operation = response
                .json()
                .await
                .map_err(|e| PipelineError::transient(format!("Unparseable Veo poll: {}", e)))?;

            if op.done {
                if let Some(error) = op.error {
                    return Err(Self::classify_engine_error(&error.message));
                }
                return op.response.ok_or_else(|| {
                    PipelineError::transient("Veo operation finished with no response")
                });
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(PipelineError::Timeout(format!(
                    "Veo operation {} still running after {:?}",
                    operation_name, POLL_BUDGET
                )));
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    fn extract_video(response: &serde_json::Value) -> PipelineResult<Vec<u8>> {
        let encoded = response
            .pointer("/generateVideoResponse/generatedSamples/0/video/bytesBase64Encoded")
            .or_else(|| response.pointer("/videos/0/bytesBase64Encoded"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| PipelineError::transient("Veo response carried no video bytes"))?;

        use base64::Engine as _;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| PipelineError::transient(format!("Undecodable video payload: {}", e)))
    }
}

#[async_trait]
impl VideoGenerator for VeoClient {
    async fn generate(&self, request: &VideoRequest<'_>) -> PipelineResult<GeneratedClip> {
        let operation = self.start_operation(request).await?;
        let response = self.poll_operation(&operation).await?;
        let bytes = Self::extract_video(&response)?;

        info!("Veo produced {} bytes for prompt ({} chars)", bytes.len(), request.visual_prompt.len());

        Ok(GeneratedClip {
            bytes,
            duration_seconds: Some(Self::snap_duration(request.duration_seconds) as f64),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_snapping() {
        assert_eq!(VeoClient::snap_duration(7), 8);
        assert_eq!(VeoClient::snap_duration(6), 6);
        assert_eq!(VeoClient::snap_duration(5), 6);
        assert_eq!(VeoClient::snap_duration(4), 4);
        assert_eq!(VeoClient::snap_duration(2), 4);
    }

    #[test]
    fn test_content_policy_classification() {
        let err = VeoClient::classify_engine_error("Request blocked by safety filter");
        assert!(matches!(err, PipelineError::ContentPolicy(_)));

        let err = VeoClient::classify_engine_error("internal error, try again");
        assert!(matches!(err, PipelineError::Transient(_)));
    }

    #[test]
    fn test_extract_video_from_operation_response() {
        use base64::Engine as _;
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"mp4-bytes");
        let response = serde_json::json!({
            "generateVideoResponse": {
                "generatedSamples": [
                    { "video": { "bytesBase64Encoded": encoded } }
                ]
            }
        });
        assert_eq!(VeoClient::extract_video(&response).unwrap(), b"mp4-bytes");
    }

    #[test]
    fn test_extract_video_missing_payload() {
        let response = serde_json::json!({ "generateVideoResponse": {} });
        assert!(VeoClient::extract_video(&response).is_err());
    }
}
