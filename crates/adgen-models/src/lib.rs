//! Shared data models for the adgen backend.
//!
//! This crate provides Serde-serializable types for:
//! - Ad jobs, script segments and clip records
//! - Progress events streamed to clients
//! - Request/response shapes for the HTTP surface
//! - Script normalization

pub mod clip;
pub mod events;
pub mod job;
pub mod request;
pub mod script;
pub mod segment;
pub mod status;
pub mod video;

// Re-export common types
pub use clip::{ClipRecord, ClipStatus, VerificationRecord};
pub use events::ProgressEvent;
pub use job::{AdJob, JobId};
pub use request::{CreateAdRequest, ImageDecodeError, JobStatusResponse};
pub use script::normalize_script;
pub use segment::{segments_cover_script, Segment};
pub use status::AdJobStatus;
pub use video::{AspectRatio, Resolution};
