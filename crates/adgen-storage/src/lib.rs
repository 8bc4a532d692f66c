//! Artifact store for the adgen backend.
//!
//! Content-addressed blob I/O against an S3-compatible object store:
//! clip bytes, prompts, merged/final videos, plus time-bounded signed URLs
//! for streaming artifacts into the mux tool over HTTPS.

pub mod client;
pub mod error;
pub mod paths;

pub use client::{ArtifactStoreClient, ObjectInfo, StorageConfig};
pub use error::{StorageError, StorageResult};
pub use paths::ArtifactPaths;
