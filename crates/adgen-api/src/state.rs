//! Application state.

use std::sync::Arc;

use adgen_firestore::{AdJobRepository, FirestoreClient};
use adgen_pipeline::{
    ElevenLabsClient, FfmpegMux, FirestoreJobs, GeminiClient, ObjectStorage, Orchestrator,
    PipelineConfig, VeoClient,
};
use adgen_storage::{ArtifactStoreClient, StorageConfig};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pipeline_config: PipelineConfig,
    pub firestore: FirestoreClient,
    pub storage: Arc<ObjectStorage>,
    pub gemini: Arc<GeminiClient>,
    pub veo: Arc<VeoClient>,
    pub elevenlabs: Arc<ElevenLabsClient>,
    pub mux: Arc<FfmpegMux>,
}

impl AppState {
    /// Create new application state.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let storage_config = StorageConfig::from_env()?;
        let canonical_base = format!(
            "{}/{}",
            storage_config.endpoint_url.trim_end_matches('/'),
            storage_config.bucket_name
        );
        let storage_client = ArtifactStoreClient::new(storage_config).await?;
        let storage = Arc::new(ObjectStorage::new(storage_client, canonical_base));

        let firestore = FirestoreClient::from_env().await?;

        Ok(Self {
            config,
            pipeline_config: PipelineConfig::from_env(),
            firestore,
            storage,
            gemini: Arc::new(GeminiClient::new()?),
            veo: Arc::new(VeoClient::new()?),
            elevenlabs: Arc::new(ElevenLabsClient::new()?),
            mux: Arc::new(FfmpegMux),
        })
    }

    /// Job repository scoped to one user.
    pub fn jobs_for(&self, user_id: &str) -> AdJobRepository {
        AdJobRepository::new(self.firestore.clone(), user_id)
    }

    /// Build the orchestrator for one user's request.
    ///
    /// The job store is per-user (documents live under the user's
    /// collection), so each request gets its own orchestrator instance over
    /// the shared clients.
    pub fn orchestrator_for(&self, user_id: &str) -> Orchestrator {
        Orchestrator {
            store: self.storage.clone(),
            jobs: Arc::new(FirestoreJobs::new(self.jobs_for(user_id))),
            planner: self.gemini.clone(),
            video: self.veo.clone(),
            speech: self.elevenlabs.clone(),
            verifier: Some(self.gemini.clone()),
            config: self.pipeline_config.clone(),
            mux: self.mux.clone(),
        }
    }
}
