//! Ad job document.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{AdJobStatus, AspectRatio, ClipRecord, Resolution, Segment};

/// Unique identifier for an ad job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(format!("ad_{}", Uuid::new_v4().simple()))
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Durable state of one ad request.
///
/// The document stays small: media lives in the artifact store and is
/// referenced by URL only. Raw bytes must never land in this struct before a
/// save; the document store has a per-document size limit that base64 video
/// payloads blow through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AdJob {
    /// Unique job ID
    pub job_id: JobId,

    /// Owning user
    pub user_id: String,

    /// Campaign this ad belongs to, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,

    /// Script exactly as submitted
    pub script: String,

    /// Script after punctuation normalization; the planner and the speech
    /// path both work from this form
    pub normalized_script: String,

    /// Storage URL of the uploaded character reference image
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character_image_url: Option<String>,

    /// Character name used in visual prompts
    pub character_name: String,

    /// Speech model voice, if the caller picked one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,

    /// Output aspect ratio
    #[serde(default)]
    pub aspect_ratio: AspectRatio,

    /// Output resolution
    #[serde(default)]
    pub resolution: Resolution,

    /// Whether the vision check runs after each clip
    #[serde(default)]
    pub enable_verification: bool,

    /// Minimum confidence for a clip to pass verification
    #[serde(default = "default_verification_threshold")]
    pub verification_threshold: f64,

    /// Planned shots; set once at planning time, never reordered
    #[serde(default)]
    pub segments: Vec<Segment>,

    /// Per-clip production records, same length as `segments`
    #[serde(default)]
    pub clips: Vec<ClipRecord>,

    /// Job state
    #[serde(default)]
    pub status: AdJobStatus,

    /// Progress 0-100, monotonically non-decreasing
    #[serde(default)]
    pub progress: u8,

    /// Human-readable description of the current step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step: Option<String>,

    /// Signed URL of the published final video
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_video_url: Option<String>,

    /// Whether the final audio track is the synthesized voiceover
    #[serde(default)]
    pub audio_enhanced: bool,

    /// Terminal error reason, if the job failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,

    /// Completion timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

fn default_verification_threshold() -> f64 {
    0.6
}

impl AdJob {
    /// Create a freshly admitted job.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: impl Into<String>,
        script: impl Into<String>,
        normalized_script: impl Into<String>,
        character_name: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            job_id: JobId::new(),
            user_id: user_id.into(),
            campaign_id: None,
            script: script.into(),
            normalized_script: normalized_script.into(),
            character_image_url: None,
            character_name: character_name.into(),
            voice_id: None,
            aspect_ratio: AspectRatio::default(),
            resolution: Resolution::default(),
            enable_verification: false,
            verification_threshold: default_verification_threshold(),
            segments: Vec::new(),
            clips: Vec::new(),
            status: AdJobStatus::Pending,
            progress: 0,
            current_step: None,
            final_video_url: None,
            audio_enhanced: false,
            error_message: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Move to a new step, updating status and the step description.
    pub fn set_step(&mut self, status: AdJobStatus, step: impl Into<String>) {
        self.status = status;
        self.current_step = Some(step.into());
        self.updated_at = Utc::now();
    }

    /// Raise progress. Progress never goes backwards; a lower value is a
    /// programming error upstream and is ignored here.
    pub fn set_progress(&mut self, progress: u8) {
        let clamped = progress.min(100);
        if clamped > self.progress {
            self.progress = clamped;
            self.updated_at = Utc::now();
        }
    }

    /// Mark the job completed with its published video URL.
    pub fn complete(&mut self, final_video_url: impl Into<String>) {
        self.status = AdJobStatus::Completed;
        self.final_video_url = Some(final_video_url.into());
        self.progress = 100;
        self.current_step = Some("Complete".into());
        self.completed_at = Some(Utc::now());
        self.updated_at = Utc::now();
    }

    /// Mark the job failed with a terminal reason.
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.status = AdJobStatus::Failed;
        self.error_message = Some(reason.into());
        self.updated_at = Utc::now();
    }

    /// Number of planned clips.
    pub fn total_clips(&self) -> u32 {
        self.segments.len() as u32
    }

    /// Number of clips with a usable artifact.
    pub fn clips_done(&self) -> u32 {
        self.clips.iter().filter(|c| c.status.has_artifact()).count() as u32
    }
}
