//! Contracts for the external engines and stores.
//!
//! Each adapter is a narrow capability trait. Production implementations
//! live in this crate (`gemini`, `veo`, `elevenlabs`, `ports`); tests drive
//! the pipeline with in-memory fakes.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use adgen_models::{AdJob, AspectRatio, JobId, Resolution};

use crate::error::PipelineResult;

/// One planned shot from the text model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedShot {
    /// Verbatim slice of the script spoken in this shot
    pub spoken_text: String,
    /// Camera framing, subject action, setting; never the spoken line
    pub visual_prompt: String,
}

/// Planning request for the text model.
#[derive(Debug, Clone)]
pub struct PlanRequest<'a> {
    pub script: &'a str,
    pub character_name: &'a str,
    pub target_seconds_per_clip: u32,
    /// Corrective instruction appended on the one re-prompt after an
    /// invariant violation
    pub corrective_note: Option<&'a str>,
}

/// Splits a script into ordered shot-sized segments with paired prompts.
#[async_trait]
pub trait TextPlanner: Send + Sync {
    async fn plan(&self, request: &PlanRequest<'_>) -> PipelineResult<Vec<PlannedShot>>;
}

/// Generation request for the video model.
#[derive(Debug, Clone)]
pub struct VideoRequest<'a> {
    pub visual_prompt: &'a str,
    /// Delivered separately from the prompt so the engine drives lip-sync
    pub spoken_text: &'a str,
    /// Conditioning image: the character image or a continuity frame
    pub reference_image: &'a [u8],
    pub aspect_ratio: AspectRatio,
    pub resolution: Resolution,
    pub duration_seconds: u32,
}

/// A finished clip from the video model.
#[derive(Debug, Clone)]
pub struct GeneratedClip {
    pub bytes: Vec<u8>,
    pub duration_seconds: Option<f64>,
}

/// Turns a (prompt, reference image) pair into video bytes.
///
/// A single call polls the backing long-running operation until terminal and
/// may block for up to the per-clip budget. Content-policy denial surfaces as
/// `PipelineError::ContentPolicy`, distinct from transient failure.
#[async_trait]
pub trait VideoGenerator: Send + Sync {
    async fn generate(&self, request: &VideoRequest<'_>) -> PipelineResult<GeneratedClip>;
}

/// Synthesizes speech for the full normalized script.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, voice_id: Option<&str>) -> PipelineResult<Vec<u8>>;
}

/// Verification outcome from the vision model.
#[derive(Debug, Clone)]
pub struct VerificationOutcome {
    pub confidence: f64,
    pub visual_description: String,
    pub feedback: String,
}

/// Checks a produced clip against its script segment.
#[async_trait]
pub trait ClipVerifier: Send + Sync {
    async fn verify(
        &self,
        clip_url: &str,
        spoken_text: &str,
        visual_prompt: &str,
    ) -> PipelineResult<VerificationOutcome>;
}

/// Content-addressed artifact store (clip bytes, prompts, outputs).
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Idempotent overwrite.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> PipelineResult<()>;

    async fn get(&self, key: &str) -> PipelineResult<Vec<u8>>;

    /// Keys under the prefix.
    async fn list(&self, prefix: &str) -> PipelineResult<Vec<String>>;

    /// Time-bounded HTTPS URL, valid for internal reads and as mux input.
    async fn signed_url(&self, key: &str, ttl: Duration) -> PipelineResult<String>;

    /// Stable canonical URL recorded on job documents.
    fn canonical_url(&self, key: &str) -> String;
}

/// Durable document-per-job store.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Upsert; last writer wins, and the orchestrator is the only writer.
    async fn save(&self, job: &AdJob) -> PipelineResult<()>;

    async fn load(&self, job_id: &JobId) -> PipelineResult<Option<AdJob>>;
}

/// Local mux tool boundary (subprocess per invocation).
#[async_trait]
pub trait MuxTool: Send + Sync {
    /// Concatenate clip references (HTTPS or local) into `output`.
    async fn concat(
        &self,
        clip_refs: &[String],
        output: &Path,
        work_dir: &Path,
    ) -> PipelineResult<()>;

    /// Replace the audio track of `video_ref` with `audio`, writing `output`.
    async fn replace_audio(
        &self,
        video_ref: &str,
        audio: &Path,
        output: &Path,
    ) -> PipelineResult<()>;

    /// Extract the last frame of a local video file, returning PNG bytes.
    async fn last_frame(&self, video: &Path, work_dir: &Path) -> PipelineResult<Vec<u8>>;
}
