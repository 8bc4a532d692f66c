//! Production implementations of the store and mux contracts.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use adgen_firestore::AdJobRepository;
use adgen_models::{AdJob, JobId};
use adgen_storage::ArtifactStoreClient;

use crate::adapters::{ArtifactStore, JobStore, MuxTool};
use crate::error::{PipelineError, PipelineResult};

/// Artifact store backed by the S3-compatible client.
pub struct ObjectStorage {
    client: ArtifactStoreClient,
    /// Base for canonical URLs, `{endpoint}/{bucket}` with no trailing slash
    base_url: String,
}

impl ObjectStorage {
    pub fn new(client: ArtifactStoreClient, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { client, base_url }
    }
}

#[async_trait]
impl ArtifactStore for ObjectStorage {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> PipelineResult<()> {
        self.client.put(key, bytes, content_type).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> PipelineResult<Vec<u8>> {
        Ok(self.client.get(key).await?)
    }

    async fn list(&self, prefix: &str) -> PipelineResult<Vec<String>> {
        let objects = self.client.list(prefix).await?;
        Ok(objects
            .into_iter()
            .filter(|o| o.size > 0)
            .map(|o| o.key)
            .collect())
    }

    async fn signed_url(&self, key: &str, ttl: Duration) -> PipelineResult<String> {
        Ok(self.client.signed_url(key, ttl).await?)
    }

    fn canonical_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }
}

/// Job store backed by the Firestore repository.
pub struct FirestoreJobs {
    repo: AdJobRepository,
}

impl FirestoreJobs {
    pub fn new(repo: AdJobRepository) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl JobStore for FirestoreJobs {
    async fn save(&self, job: &AdJob) -> PipelineResult<()> {
        self.repo.save(job).await?;
        Ok(())
    }

    async fn load(&self, job_id: &JobId) -> PipelineResult<Option<AdJob>> {
        Ok(self.repo.load(job_id).await?)
    }
}

/// Mux tool backed by ffmpeg subprocesses.
#[derive(Debug, Default)]
pub struct FfmpegMux;

#[async_trait]
impl MuxTool for FfmpegMux {
    async fn concat(
        &self,
        clip_refs: &[String],
        output: &Path,
        work_dir: &Path,
    ) -> PipelineResult<()> {
        adgen_media::concat_clips(clip_refs, output, work_dir).await?;
        if let Ok(duration) = adgen_media::get_duration(output).await {
            tracing::info!("Concatenated video runs {:.1}s", duration);
        }
        Ok(())
    }

    async fn replace_audio(
        &self,
        video_ref: &str,
        audio: &Path,
        output: &Path,
    ) -> PipelineResult<()> {
        adgen_media::replace_audio(video_ref, audio, output).await?;
        Ok(())
    }

    async fn last_frame(&self, video: &Path, work_dir: &Path) -> PipelineResult<Vec<u8>> {
        let frame_path = work_dir.join("last_frame.png");
        adgen_media::extract_last_frame(video, &frame_path).await?;
        tokio::fs::read(&frame_path)
            .await
            .map_err(|e| PipelineError::Mux(adgen_media::MediaError::Io(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adgen_storage::StorageConfig;

    #[tokio::test]
    async fn test_canonical_url_joins_base_and_key() {
        let client = ArtifactStoreClient::new(StorageConfig {
            endpoint_url: "https://store.example.com".into(),
            access_key_id: "k".into(),
            secret_access_key: "s".into(),
            bucket_name: "ads".into(),
            region: "auto".into(),
        })
        .await
        .unwrap();

        let storage = ObjectStorage::new(client, "https://store.example.com/ads/");
        assert_eq!(
            storage.canonical_url("u/j/clips/clip_0.mp4"),
            "https://store.example.com/ads/u/j/clips/clip_0.mp4"
        );
    }
}
