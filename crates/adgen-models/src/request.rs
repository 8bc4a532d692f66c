//! Request and response shapes for the ad creation API.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{AdJob, AdJobStatus, ClipRecord, Segment};

/// Request body for creating an ad.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CreateAdRequest {
    /// The dialogue script
    pub script: String,

    /// Character reference image: raw base64 or a data URI
    pub character_image: String,

    /// Character name used in prompts
    #[serde(default = "default_character_name")]
    pub character_name: String,

    /// Speech model voice ID
    #[serde(default)]
    pub voice_id: Option<String>,

    /// Campaign the ad belongs to
    #[serde(default)]
    pub campaign_id: Option<String>,

    /// Output aspect ratio, "16:9" or "9:16"
    #[serde(default)]
    pub aspect_ratio: crate::AspectRatio,

    /// Output resolution, "720p" or "1080p"
    #[serde(default)]
    pub resolution: crate::Resolution,

    /// Run the vision check after each clip
    #[serde(default)]
    pub enable_verification: bool,

    /// Minimum confidence for verification to pass
    #[serde(default = "default_verification_threshold")]
    pub verification_threshold: f64,
}

fn default_character_name() -> String {
    "character".to_string()
}

fn default_verification_threshold() -> f64 {
    0.6
}

/// Failure to decode the submitted character image.
#[derive(Debug, Error)]
pub enum ImageDecodeError {
    #[error("character image is empty")]
    Empty,

    #[error("invalid base64 in character image: {0}")]
    InvalidBase64(String),
}

impl CreateAdRequest {
    /// Decode the character image field into raw bytes.
    ///
    /// Accepts either plain base64 or a `data:image/...;base64,` URI; the
    /// data-URI prefix is stripped before decoding.
    pub fn decode_character_image(&self) -> Result<Vec<u8>, ImageDecodeError> {
        let raw = self.character_image.trim();
        if raw.is_empty() {
            return Err(ImageDecodeError::Empty);
        }

        let payload = match raw.split_once(";base64,") {
            Some((prefix, rest)) if prefix.starts_with("data:") => rest,
            _ => raw,
        };

        use base64::Engine as _;
        base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| ImageDecodeError::InvalidBase64(e.to_string()))
    }
}

/// Polling response for job status.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobStatusResponse {
    pub job_id: String,
    pub status: AdJobStatus,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step: Option<String>,
    pub final_video_url: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub segments: Vec<Segment>,
    pub clips: Vec<ClipRecord>,
}

impl From<&AdJob> for JobStatusResponse {
    fn from(job: &AdJob) -> Self {
        Self {
            job_id: job.job_id.to_string(),
            status: job.status,
            progress: job.progress,
            current_step: job.current_step.clone(),
            final_video_url: job.final_video_url.clone(),
            error_message: job.error_message.clone(),
            created_at: job.created_at,
            updated_at: job.updated_at,
            segments: job.segments.clone(),
            clips: job.clips.clone(),
        }
    }
}
