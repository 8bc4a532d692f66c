//! Assembly: concatenate clips, replace the audio track, publish.

use std::time::Duration;

use tracing::{info, warn};

use adgen_media::JobWorkspace;
use adgen_models::AdJob;
use adgen_storage::ArtifactPaths;

use crate::adapters::{ArtifactStore, MuxTool, SpeechSynthesizer};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::retry::{with_backoff, BackoffPolicy};

/// Post-clip assembly for one job.
pub struct Assembler<'a> {
    pub store: &'a dyn ArtifactStore,
    pub speech: &'a dyn SpeechSynthesizer,
    pub mux: &'a dyn MuxTool,
    pub config: &'a PipelineConfig,
}

impl<'a> Assembler<'a> {
    /// Concatenate all clips into `merged.mp4`.
    ///
    /// Clips are referenced by signed URL so the mux tool streams them over
    /// HTTPS; nothing is downloaded to this host. A single-clip job skips
    /// the concat and promotes the clip bytes directly.
    pub async fn merge(&self, job: &AdJob, paths: &ArtifactPaths) -> PipelineResult<()> {
        let total = job.segments.len() as u32;

        if total == 1 {
            let bytes = self.store.get(&paths.clip(0)).await?;
            self.store.put(&paths.merged(), bytes, "video/mp4").await?;
            info!("Single clip promoted to {}", paths.merged());
            return Ok(());
        }

        let mut clip_refs = Vec::with_capacity(total as usize);
        for index in 0..total {
            let url = self
                .store
                .signed_url(&paths.clip(index), self.config.mux_url_ttl)
                .await?;
            clip_refs.push(url);
        }

        let workspace = JobWorkspace::new().map_err(PipelineError::Mux)?;
        let output = workspace.file("merged.mp4");

        self.mux.concat(&clip_refs, &output, workspace.path()).await?;

        let bytes = tokio::fs::read(&output)
            .await
            .map_err(|e| PipelineError::Mux(adgen_media::MediaError::Io(e)))?;
        self.store.put(&paths.merged(), bytes, "video/mp4").await?;

        info!("Merged {} clips into {}", total, paths.merged());
        Ok(())
    }

    /// Synthesize the full-script voiceover and swap it onto the merged
    /// video, producing `final.mp4`.
    ///
    /// Returns `Ok(true)` when the enhanced video was written and `Ok(false)`
    /// when enhancement failed after bounded retry; the caller then promotes
    /// `merged.mp4` as the final artifact.
    pub async fn enhance_voice(&self, job: &AdJob, paths: &ArtifactPaths) -> PipelineResult<bool> {
        let backoff = BackoffPolicy::new(
            self.config.max_transient_attempts,
            self.config.backoff_base,
            self.config.backoff_max,
        );

        let voice_id = job.voice_id.as_deref();
        let script = job.normalized_script.clone();

        let audio = match with_backoff(&backoff, "synthesize_voiceover", || {
            let script = script.clone();
            async move { self.speech.synthesize(&script, voice_id).await }
        })
        .await
        {
            Ok(audio) => audio,
            Err(e) => {
                warn!("Voice synthesis failed after retries, promoting merged video: {}", e);
                return Ok(false);
            }
        };

        let workspace = JobWorkspace::new().map_err(PipelineError::Mux)?;
        let audio_path = workspace.file("voiceover.mp3");
        tokio::fs::write(&audio_path, &audio)
            .await
            .map_err(|e| PipelineError::Mux(adgen_media::MediaError::Io(e)))?;

        let merged_url = self
            .store
            .signed_url(&paths.merged(), self.config.mux_url_ttl)
            .await?;
        let output = workspace.file("final.mp4");

        if let Err(e) = self.mux.replace_audio(&merged_url, &audio_path, &output).await {
            warn!("Audio replacement failed, promoting merged video: {}", e);
            return Ok(false);
        }

        let bytes = tokio::fs::read(&output)
            .await
            .map_err(|e| PipelineError::Mux(adgen_media::MediaError::Io(e)))?;
        self.store.put(&paths.final_video(), bytes, "video/mp4").await?;

        info!("Voiceover applied, wrote {}", paths.final_video());
        Ok(true)
    }

    /// Issue the long-lived signed URL for the published artifact.
    pub async fn publish(
        &self,
        paths: &ArtifactPaths,
        audio_enhanced: bool,
        ttl: Duration,
    ) -> PipelineResult<String> {
        let key = if audio_enhanced {
            paths.final_video()
        } else {
            paths.merged()
        };
        self.store.signed_url(&key, ttl).await
    }
}
