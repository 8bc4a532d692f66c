//! Pipeline error types.

use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors surfacing from pipeline steps.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed request; rejected before any state is created
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Text model produced an unusable plan after the corrective retry
    #[error("Planning failed: {0}")]
    Planning(String),

    /// Video model refused the (prompt, frame) pair
    #[error("Content policy rejection: {0}")]
    ContentPolicy(String),

    /// Retryable external failure (timeout, rate limit, 5xx)
    #[error("Transient failure: {0}")]
    Transient(String),

    /// Mux tool failure with captured stderr
    #[error("Mux failed: {0}")]
    Mux(#[from] adgen_media::MediaError),

    /// Artifact store failure
    #[error("Storage error: {0}")]
    Storage(#[from] adgen_storage::StorageError),

    /// Job document store failure
    #[error("Job store error: {0}")]
    JobStore(#[from] adgen_firestore::FirestoreError),

    /// Recovered clips present but planner output absent from the job
    #[error("Resume skew: {0}")]
    ResumeSkew(String),

    /// A step exceeded its wall-clock budget
    #[error("Step timed out: {0}")]
    Timeout(String),
}

impl PipelineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn planning(msg: impl Into<String>) -> Self {
        Self::Planning(msg.into())
    }

    pub fn content_policy(msg: impl Into<String>) -> Self {
        Self::ContentPolicy(msg.into())
    }

    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    /// Whether backoff-and-retry is worth attempting.
    pub fn is_transient(&self) -> bool {
        match self {
            PipelineError::Transient(_) | PipelineError::Timeout(_) => true,
            PipelineError::Storage(e) => e.is_retryable(),
            PipelineError::JobStore(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Whether an HTTP status from an external engine should be retried.
    pub fn status_is_transient(status: u16) -> bool {
        status == 408 || status == 429 || status >= 500
    }

    /// Short reason code recorded on failed job documents.
    pub fn reason_code(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "validation",
            PipelineError::Planning(_) => "planning",
            PipelineError::ContentPolicy(_) => "content_policy",
            PipelineError::Transient(_) => "transient",
            PipelineError::Mux(_) => "mux",
            PipelineError::Storage(_) => "storage",
            PipelineError::JobStore(_) => "job_store",
            PipelineError::ResumeSkew(_) => "resume_skew",
            PipelineError::Timeout(_) => "timeout",
        }
    }
}
