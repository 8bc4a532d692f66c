//! Firestore-backed job store for the adgen backend.
//!
//! REST client with token caching, bounded retry, and a typed repository for
//! ad job documents.

pub mod client;
pub mod error;
pub mod jobs;
pub mod retry;
pub mod token_cache;
pub mod types;

pub use client::{FirestoreClient, FirestoreConfig};
pub use error::{FirestoreError, FirestoreResult};
pub use jobs::AdJobRepository;
pub use retry::RetryConfig;
