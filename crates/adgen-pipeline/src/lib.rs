//! Ad creation pipeline for the adgen backend.
//!
//! A durable, resumable, step-structured job runner: script planning, clip
//! production with inter-clip visual continuity, artifact checkpointing,
//! assembly, and progress streaming. One orchestrator task owns each job.

pub mod adapters;
pub mod assembly;
pub mod config;
pub mod elevenlabs;
pub mod error;
pub mod gemini;
pub mod orchestrator;
pub mod planner;
pub mod ports;
pub mod producer;
pub mod progress;
pub mod retry;
pub mod veo;

pub use adapters::{
    ArtifactStore, ClipVerifier, GeneratedClip, JobStore, MuxTool, PlanRequest, PlannedShot,
    SpeechSynthesizer, TextPlanner, VerificationOutcome, VideoGenerator, VideoRequest,
};
pub use assembly::Assembler;
pub use config::PipelineConfig;
pub use elevenlabs::ElevenLabsClient;
pub use error::{PipelineError, PipelineResult};
pub use gemini::GeminiClient;
pub use orchestrator::Orchestrator;
pub use planner::ScriptPlanner;
pub use ports::{FfmpegMux, FirestoreJobs, ObjectStorage};
pub use producer::ClipProducer;
pub use progress::{progress_channel, ProgressSender};
pub use retry::{with_backoff, BackoffPolicy};
pub use veo::VeoClient;
