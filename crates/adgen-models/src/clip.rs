//! Clip records and verification results.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Per-clip production state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClipStatus {
    /// No artifact and no attempt yet
    #[default]
    Absent,
    /// A generation call is in flight
    Generating,
    /// Artifact written to storage by this run
    Completed,
    /// All attempts exhausted or unrecoverable rejection
    Failed,
    /// Artifact existed at job start and was adopted without regeneration
    Recovered,
}

impl ClipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClipStatus::Absent => "absent",
            ClipStatus::Generating => "generating",
            ClipStatus::Completed => "completed",
            ClipStatus::Failed => "failed",
            ClipStatus::Recovered => "recovered",
        }
    }

    /// A clip in this state has a usable artifact in storage.
    pub fn has_artifact(&self) -> bool {
        matches!(self, ClipStatus::Completed | ClipStatus::Recovered)
    }
}

impl std::fmt::Display for ClipStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of checking a clip against its script segment with the vision
/// model. An observation only; it never triggers regeneration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VerificationRecord {
    /// Match confidence in [0, 1]
    pub confidence: f64,
    /// What the model saw in the clip
    pub visual_description: String,
    /// Alignment feedback from the model
    pub feedback: String,
    /// Whether confidence cleared the job's threshold
    pub passed: bool,
}

/// One produced (or adopted) video clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClipRecord {
    /// 0-based index, equals the index of the segment it renders
    pub index: u32,

    /// Production state
    #[serde(default)]
    pub status: ClipStatus,

    /// Canonical storage URL once the artifact exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_url: Option<String>,

    /// Duration reported by the engine or probed from the artifact
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,

    /// Number of additional generation attempts beyond the first
    #[serde(default)]
    pub retry_count: u32,

    /// Verification outcome when the verification step is enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationRecord>,
}

impl ClipRecord {
    /// Create a fresh record for the given index.
    pub fn new(index: u32) -> Self {
        Self {
            index,
            status: ClipStatus::Absent,
            artifact_url: None,
            duration_seconds: None,
            retry_count: 0,
            verification: None,
        }
    }

    /// Adopt a pre-existing artifact found by the recovery scan.
    pub fn recovered(index: u32, artifact_url: impl Into<String>) -> Self {
        Self {
            index,
            status: ClipStatus::Recovered,
            artifact_url: Some(artifact_url.into()),
            duration_seconds: None,
            retry_count: 0,
            verification: None,
        }
    }
}
