//! Per-clip production state machine.
//!
//! Clips are produced strictly sequentially: clip `i` conditions on clip
//! `i-1`'s last frame, so there is no intra-job parallelism to exploit.

use tracing::{info, warn};

use adgen_media::JobWorkspace;
use adgen_models::{AdJob, ClipRecord, ClipStatus, ProgressEvent, Segment, VerificationRecord};
use adgen_storage::ArtifactPaths;

use crate::adapters::{
    ArtifactStore, ClipVerifier, GeneratedClip, JobStore, MuxTool, VideoGenerator, VideoRequest,
};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::progress::ProgressSender;
use crate::retry::BackoffPolicy;

/// Drives clip production for one job.
pub struct ClipProducer<'a> {
    pub video: &'a dyn VideoGenerator,
    pub verifier: Option<&'a dyn ClipVerifier>,
    pub mux: &'a dyn MuxTool,
    pub store: &'a dyn ArtifactStore,
    pub jobs: &'a dyn JobStore,
    pub config: &'a PipelineConfig,
}

impl<'a> ClipProducer<'a> {
    /// Scan the artifact store for clips that already exist and adopt them.
    ///
    /// Runs before the clip loop. Present artifacts become `recovered` and
    /// skip generation entirely. Artifacts present for a job with no planner
    /// output is skew the operator has to resolve.
    pub async fn recovery_scan(
        &self,
        job: &mut AdJob,
        paths: &ArtifactPaths,
    ) -> PipelineResult<u32> {
        let keys = self.store.list(&paths.clips_prefix()).await?;

        let found: Vec<u32> = keys
            .iter()
            .filter_map(|k| paths.parse_clip_index(k))
            .collect();

        if !found.is_empty() && job.segments.is_empty() {
            return Err(PipelineError::ResumeSkew(format!(
                "{} clip artifacts exist but the job has no planned segments",
                found.len()
            )));
        }

        let total = job.segments.len();
        if job.clips.len() != total {
            job.clips = (0..total as u32).map(ClipRecord::new).collect();
        }

        let mut recovered = 0u32;
        for index in found {
            if let Some(clip) = job.clips.get_mut(index as usize) {
                if !clip.status.has_artifact() {
                    let key = paths.clip(index);
                    *clip = ClipRecord::recovered(index, self.store.canonical_url(&key));
                    recovered += 1;
                }
            }
        }

        if recovered > 0 {
            info!("RECOVERY MODE: {}/{} clips present", recovered, total);
        }

        Ok(recovered)
    }

    /// Produce every clip that does not already have an artifact.
    ///
    /// A clip that exhausts its attempts fails the whole job: a gap in the
    /// shot list would make the assembled video unusable.
    pub async fn produce_all(
        &self,
        job: &mut AdJob,
        paths: &ArtifactPaths,
        progress: &ProgressSender,
    ) -> PipelineResult<()> {
        let total = job.segments.len() as u32;
        let workspace = JobWorkspace::new().map_err(PipelineError::Mux)?;

        let character_image = self.store.get(&paths.character_image()).await?;

        // Conditioning image for the next generated clip; None means the
        // character image.
        let mut continuity: Option<Vec<u8>> = None;

        for index in 0..total {
            let segment = job.segments[index as usize].clone();
            let mut generated_bytes: Option<Vec<u8>> = None;

            if job.clips[index as usize].status.has_artifact() {
                let done = job
                    .clips
                    .iter()
                    .take(index as usize + 1)
                    .filter(|c| c.status.has_artifact())
                    .count() as u32;
                job.set_progress(clip_progress(done, total));
                progress
                    .emit(ProgressEvent::step2_clip(
                        format!("Recovered clip {}/{}", index + 1, total),
                        index + 1,
                        total,
                        job.progress,
                    ))
                    .await;
            } else {
                let reference = continuity.as_deref().unwrap_or(&character_image);

                let clip = match self
                    .generate_clip(job, &segment, reference, &character_image)
                    .await
                {
                    Ok(clip) => clip,
                    Err(e) => {
                        job.clips[index as usize].status = ClipStatus::Failed;
                        self.jobs.save(job).await?;
                        return Err(e);
                    }
                };

                let key = paths.clip(index);
                self.store.put(&key, clip.bytes.clone(), "video/mp4").await?;

                {
                    let record = &mut job.clips[index as usize];
                    record.status = ClipStatus::Completed;
                    record.artifact_url = Some(self.store.canonical_url(&key));
                    record.duration_seconds = clip.duration_seconds;
                }

                if job.enable_verification {
                    self.verify_clip(job, index, &segment, &key).await;
                }

                job.set_progress(clip_progress(index + 1, total));
                self.jobs.save(job).await?;

                progress
                    .emit(ProgressEvent::step2_clip(
                        format!("Generated clip {}/{}", index + 1, total),
                        index + 1,
                        total,
                        job.progress,
                    ))
                    .await;

                generated_bytes = Some(clip.bytes);
            }

            // Prepare the conditioning frame for the next clip, unless it
            // already has an artifact and will not be generated.
            let next = index + 1;
            if next < total && !job.clips[next as usize].status.has_artifact() {
                continuity = self
                    .extract_continuity(paths, index, &workspace, generated_bytes.as_deref())
                    .await;
                if continuity.is_none() {
                    warn!(
                        "Last-frame extraction failed for clip {}, clip {} falls back to the character image",
                        index, next
                    );
                }
            }
        }

        Ok(())
    }

    /// Run the generation state machine for one clip.
    ///
    /// Transient failures retry with backoff up to the attempt budget. A
    /// content-policy rejection swaps the reference back to the character
    /// image for one retry, with the transient budget reset for that retry
    /// (for clip 0 the swap is a no-op re-attempt); a second rejection is
    /// terminal.
    async fn generate_clip(
        &self,
        job: &mut AdJob,
        segment: &Segment,
        reference: &[u8],
        character_image: &[u8],
    ) -> PipelineResult<GeneratedClip> {
        let index = segment.index;
        let backoff = BackoffPolicy::new(
            self.config.max_transient_attempts,
            self.config.backoff_base,
            self.config.backoff_max,
        );

        let mut reference = reference;
        let mut fallback_used = false;
        let mut failed_attempts = 0u32;

        job.clips[index as usize].status = ClipStatus::Generating;
        self.jobs.save(job).await?;

        loop {
            let request = VideoRequest {
                visual_prompt: &segment.visual_prompt,
                spoken_text: &segment.spoken_text,
                reference_image: reference,
                aspect_ratio: job.aspect_ratio,
                resolution: job.resolution,
                duration_seconds: self.config.target_clip_seconds,
            };

            let result = match tokio::time::timeout(
                self.config.clip_timeout,
                self.video.generate(&request),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(PipelineError::Timeout(format!(
                    "clip {} generation exceeded {:?}",
                    index, self.config.clip_timeout
                ))),
            };

            match result {
                Ok(clip) => return Ok(clip),
                Err(e) if e.is_transient() => {
                    failed_attempts += 1;
                    if failed_attempts >= self.config.max_transient_attempts {
                        return Err(e);
                    }
                    job.clips[index as usize].retry_count += 1;
                    let delay = backoff.delay_for(failed_attempts);
                    warn!(
                        "Clip {} attempt {}/{} failed, retrying in {:?}: {}",
                        index, failed_attempts, self.config.max_transient_attempts, delay, e
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(PipelineError::ContentPolicy(msg)) => {
                    if fallback_used {
                        return Err(PipelineError::content_policy(msg));
                    }
                    warn!(
                        "Clip {} rejected, retrying once with the character image: {}",
                        index, msg
                    );
                    reference = character_image;
                    fallback_used = true;
                    failed_attempts = 0;
                    job.clips[index as usize].retry_count += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Vision check for a freshly completed clip. The outcome is recorded
    /// for observability and never regenerates the clip.
    async fn verify_clip(&self, job: &mut AdJob, index: u32, segment: &Segment, key: &str) {
        let Some(verifier) = self.verifier else { return };

        let url = match self.store.signed_url(key, self.config.mux_url_ttl).await {
            Ok(url) => url,
            Err(e) => {
                warn!("Skipping verification of clip {}: {}", index, e);
                return;
            }
        };

        match verifier
            .verify(&url, &segment.spoken_text, &segment.visual_prompt)
            .await
        {
            Ok(outcome) => {
                let passed = outcome.confidence >= job.verification_threshold;
                if !passed {
                    warn!(
                        "Clip {} failed verification: confidence {:.2} below {:.2} ({})",
                        index, outcome.confidence, job.verification_threshold, outcome.feedback
                    );
                }
                job.clips[index as usize].verification = Some(VerificationRecord {
                    confidence: outcome.confidence,
                    visual_description: outcome.visual_description,
                    feedback: outcome.feedback,
                    passed,
                });
            }
            Err(e) => warn!("Verification call failed for clip {}: {}", index, e),
        }
    }

    /// Obtain clip `index`'s last frame for conditioning the next clip.
    ///
    /// Uses the bytes just generated when available, otherwise fetches the
    /// stored artifact (recovered clips). Returns `None` on any failure; the
    /// caller substitutes the character image.
    async fn extract_continuity(
        &self,
        paths: &ArtifactPaths,
        index: u32,
        workspace: &JobWorkspace,
        in_hand: Option<&[u8]>,
    ) -> Option<Vec<u8>> {
        let bytes = match in_hand {
            Some(b) => b.to_vec(),
            None => match self.store.get(&paths.clip(index)).await {
                Ok(b) => b,
                Err(e) => {
                    warn!("Could not fetch clip {} for continuity: {}", index, e);
                    return None;
                }
            },
        };

        let video_path = workspace.file(&format!("clip_{}.mp4", index));
        if let Err(e) = tokio::fs::write(&video_path, &bytes).await {
            warn!("Could not stage clip {} for frame extraction: {}", index, e);
            return None;
        }

        match self.mux.last_frame(&video_path, workspace.path()).await {
            Ok(frame) => Some(frame),
            Err(e) => {
                warn!("Frame extraction failed for clip {}: {}", index, e);
                None
            }
        }
    }
}

/// Overall progress inside the clip loop: 20 at entry, 60 when every clip is
/// done, linear in completed clips.
pub fn clip_progress(done: u32, total: u32) -> u8 {
    if total == 0 {
        return 20;
    }
    (20 + (40 * done) / total) as u8
}
