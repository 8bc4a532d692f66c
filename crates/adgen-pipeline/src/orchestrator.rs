//! The orchestrator: one task per job, sole owner of its state.

use std::sync::Arc;

use tracing::{error, info};

use adgen_models::{
    normalize_script, AdJob, AdJobStatus, ClipRecord, CreateAdRequest, JobId, ProgressEvent,
};
use adgen_storage::ArtifactPaths;

use crate::adapters::{
    ArtifactStore, ClipVerifier, JobStore, MuxTool, SpeechSynthesizer, TextPlanner, VideoGenerator,
};
use crate::assembly::Assembler;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::planner::ScriptPlanner;
use crate::producer::ClipProducer;
use crate::progress::ProgressSender;

/// Drives the full step sequence for ad jobs.
///
/// All mutation of a job's state happens inside the single task running
/// [`Orchestrator::run`]; nothing else writes the job document.
pub struct Orchestrator {
    pub store: Arc<dyn ArtifactStore>,
    pub jobs: Arc<dyn JobStore>,
    pub planner: Arc<dyn TextPlanner>,
    pub video: Arc<dyn VideoGenerator>,
    pub speech: Arc<dyn SpeechSynthesizer>,
    pub verifier: Option<Arc<dyn ClipVerifier>>,
    pub config: PipelineConfig,
    pub mux: Arc<dyn MuxTool>,
}

impl Orchestrator {
    /// Validate a request and build the initial job.
    ///
    /// Rejects before a `job_id` is assigned: an invalid request leaves no
    /// state anywhere. Returns the job plus the decoded character image
    /// bytes, which must go to the artifact store and never into the job
    /// document.
    pub fn admit(
        &self,
        user_id: &str,
        request: &CreateAdRequest,
    ) -> PipelineResult<(AdJob, Vec<u8>)> {
        let normalized = normalize_script(&request.script);
        if normalized.is_empty() {
            return Err(PipelineError::validation("script is empty"));
        }

        let image = request
            .decode_character_image()
            .map_err(|e| PipelineError::validation(e.to_string()))?;

        if !(0.0..=1.0).contains(&request.verification_threshold) {
            return Err(PipelineError::validation(
                "verification_threshold must be within [0, 1]",
            ));
        }

        let mut job = AdJob::new(
            user_id,
            request.script.clone(),
            normalized,
            request.character_name.clone(),
        );
        job.campaign_id = request.campaign_id.clone();
        job.voice_id = request.voice_id.clone();
        job.aspect_ratio = request.aspect_ratio;
        job.resolution = request.resolution;
        job.enable_verification = request.enable_verification;
        job.verification_threshold = request.verification_threshold;

        Ok((job, image))
    }

    /// Run a job to a terminal state, emitting progress along the way.
    ///
    /// `image` carries the character image bytes on first admission and is
    /// `None` on resume, where the upload already happened. The returned job
    /// is the final persisted snapshot.
    pub async fn run(
        &self,
        mut job: AdJob,
        image: Option<Vec<u8>>,
        progress: ProgressSender,
    ) -> AdJob {
        info!("Starting ad pipeline for job {}", job.job_id);

        let outcome = match tokio::time::timeout(
            self.config.job_timeout,
            self.execute(&mut job, image, &progress),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(PipelineError::Timeout(format!(
                "job exceeded {:?} wall clock",
                self.config.job_timeout
            ))),
        };

        match outcome {
            Ok(final_url) => {
                job.complete(&final_url);
                if let Err(e) = self.jobs.save(&job).await {
                    error!("Failed to persist completed job {}: {}", job.job_id, e);
                }
                progress
                    .emit(ProgressEvent::complete(job.job_id.to_string(), final_url))
                    .await;
                info!("Ad pipeline completed for job {}", job.job_id);
            }
            Err(e) => {
                error!("Ad pipeline failed for job {}: {}", job.job_id, e);
                job.fail(format!("{}: {}", e.reason_code(), e));
                if let Err(save_err) = self.jobs.save(&job).await {
                    error!("Failed to persist failed job {}: {}", job.job_id, save_err);
                }
                progress.emit(ProgressEvent::error(e.to_string())).await;
            }
        }

        job
    }

    /// Resume an existing job after a process restart.
    ///
    /// Planner output is reloaded from the job document, the recovery scan
    /// adopts existing clips, and the loop continues at the first absent
    /// index. Terminal jobs come back unchanged.
    pub async fn resume(&self, job_id: &JobId, progress: ProgressSender) -> PipelineResult<AdJob> {
        let job = self
            .jobs
            .load(job_id)
            .await?
            .ok_or_else(|| PipelineError::validation(format!("unknown job {}", job_id)))?;

        if job.status.is_terminal() {
            info!("Job {} already terminal ({}), nothing to resume", job_id, job.status);
            return Ok(job);
        }

        Ok(self.run(job, None, progress).await)
    }

    async fn execute(
        &self,
        job: &mut AdJob,
        image: Option<Vec<u8>>,
        progress: &ProgressSender,
    ) -> PipelineResult<String> {
        let paths = ArtifactPaths::new(&job.user_id, job.job_id.as_str());

        // The character image goes to the artifact store before the first
        // save; the job document carries only its URL.
        if let Some(bytes) = image {
            let key = paths.character_image();
            self.store.put(&key, bytes, "image/png").await?;
            job.character_image_url = Some(self.store.canonical_url(&key));
        }
        self.jobs.save(job).await?;

        let total = self.plan_step(job, &paths, progress).await?;

        // Clip loop
        job.set_step(AdJobStatus::GeneratingClips, format!("Generating {} video clips...", total));
        self.jobs.save(job).await?;

        let producer = ClipProducer {
            video: &*self.video,
            verifier: self.verifier.as_deref(),
            mux: &*self.mux,
            store: &*self.store,
            jobs: &*self.jobs,
            config: &self.config,
        };
        producer.recovery_scan(job, &paths).await?;
        producer.produce_all(job, &paths, progress).await?;

        // Merge
        progress.emit(ProgressEvent::step3("Merging video clips...")).await;
        job.set_step(AdJobStatus::Merging, "Merging video clips...");
        job.set_progress(60);
        self.jobs.save(job).await?;

        let assembler = Assembler {
            store: &*self.store,
            speech: &*self.speech,
            mux: &*self.mux,
            config: &self.config,
        };
        assembler.merge(job, &paths).await?;
        job.set_progress(75);
        self.jobs.save(job).await?;

        // Voice enhancement
        let mut audio_enhanced = false;
        if self.config.enable_voice_enhancement {
            progress.emit(ProgressEvent::step4("Generating voiceover...")).await;
            job.set_step(AdJobStatus::EnhancingVoice, "Generating voiceover...");
            job.set_progress(80);
            self.jobs.save(job).await?;

            audio_enhanced = assembler.enhance_voice(job, &paths).await?;
            if audio_enhanced {
                job.set_progress(90);
            }
        }
        job.audio_enhanced = audio_enhanced;

        // Finalize
        progress.emit(ProgressEvent::step5("Publishing final video...")).await;
        job.set_step(AdJobStatus::Finalizing, "Publishing final video...");
        job.set_progress(95);
        self.jobs.save(job).await?;

        assembler
            .publish(&paths, audio_enhanced, self.config.publish_url_ttl)
            .await
    }

    /// Planning, or plan reload when resuming.
    async fn plan_step(
        &self,
        job: &mut AdJob,
        paths: &ArtifactPaths,
        progress: &ProgressSender,
    ) -> PipelineResult<u32> {
        if !job.segments.is_empty() {
            let total = job.total_clips();
            info!("Resuming job {} with {} planned segments", job.job_id, total);
            progress
                .emit(ProgressEvent::step1_complete("Reusing existing plan", total))
                .await;
            return Ok(total);
        }

        // Artifacts without planner output cannot be reconciled.
        let existing = self.store.list(&paths.clips_prefix()).await?;
        if !existing.is_empty() {
            return Err(PipelineError::ResumeSkew(format!(
                "{} clip artifacts exist but the job has no planned segments",
                existing.len()
            )));
        }

        progress
            .emit(ProgressEvent::step1("Analyzing script and planning shots..."))
            .await;
        job.set_step(AdJobStatus::Planning, "Analyzing script and planning shots...");
        job.set_progress(10);
        self.jobs.save(job).await?;

        let planner = ScriptPlanner::new(&*self.planner, self.config.target_clip_seconds);
        let segments = match tokio::time::timeout(
            self.config.planning_timeout,
            planner.plan(&job.normalized_script, &job.character_name),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(PipelineError::Timeout(format!(
                    "planning exceeded {:?}",
                    self.config.planning_timeout
                )))
            }
        };

        // Persist prompts for audit and recovery.
        for segment in &segments {
            self.store
                .put(
                    &paths.prompt(segment.index),
                    segment.visual_prompt.clone().into_bytes(),
                    "text/plain",
                )
                .await?;
        }

        let total = segments.len() as u32;
        job.segments = segments;
        job.clips = (0..total).map(ClipRecord::new).collect();
        job.set_progress(20);
        self.jobs.save(job).await?;

        progress
            .emit(ProgressEvent::step1_complete(
                format!("Planned {} shots", total),
                total,
            ))
            .await;

        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(script: &str, image: &str) -> CreateAdRequest {
        serde_json::from_value(serde_json::json!({
            "script": script,
            "character_image": image,
        }))
        .unwrap()
    }

    fn orchestrator_for_admit() -> Orchestrator {
        // Admission never touches the adapters, so panicking stubs suffice.
        use crate::adapters::*;
        use async_trait::async_trait;
        use std::path::Path;
        use std::time::Duration;

        struct Stub;

        #[async_trait]
        impl ArtifactStore for Stub {
            async fn put(&self, _: &str, _: Vec<u8>, _: &str) -> PipelineResult<()> {
                unreachable!()
            }
            async fn get(&self, _: &str) -> PipelineResult<Vec<u8>> {
                unreachable!()
            }
            async fn list(&self, _: &str) -> PipelineResult<Vec<String>> {
                unreachable!()
            }
            async fn signed_url(&self, _: &str, _: Duration) -> PipelineResult<String> {
                unreachable!()
            }
            fn canonical_url(&self, key: &str) -> String {
                format!("https://store.test/{}", key)
            }
        }

        #[async_trait]
        impl JobStore for Stub {
            async fn save(&self, _: &AdJob) -> PipelineResult<()> {
                unreachable!()
            }
            async fn load(&self, _: &JobId) -> PipelineResult<Option<AdJob>> {
                unreachable!()
            }
        }

        #[async_trait]
        impl TextPlanner for Stub {
            async fn plan(&self, _: &PlanRequest<'_>) -> PipelineResult<Vec<PlannedShot>> {
                unreachable!()
            }
        }

        #[async_trait]
        impl VideoGenerator for Stub {
            async fn generate(&self, _: &VideoRequest<'_>) -> PipelineResult<GeneratedClip> {
                unreachable!()
            }
        }

        #[async_trait]
        impl SpeechSynthesizer for Stub {
            async fn synthesize(&self, _: &str, _: Option<&str>) -> PipelineResult<Vec<u8>> {
                unreachable!()
            }
        }

        #[async_trait]
        impl MuxTool for Stub {
            async fn concat(&self, _: &[String], _: &Path, _: &Path) -> PipelineResult<()> {
                unreachable!()
            }
            async fn replace_audio(&self, _: &str, _: &Path, _: &Path) -> PipelineResult<()> {
                unreachable!()
            }
            async fn last_frame(&self, _: &Path, _: &Path) -> PipelineResult<Vec<u8>> {
                unreachable!()
            }
        }

        Orchestrator {
            store: Arc::new(Stub),
            jobs: Arc::new(Stub),
            planner: Arc::new(Stub),
            video: Arc::new(Stub),
            speech: Arc::new(Stub),
            verifier: None,
            config: PipelineConfig::default(),
            mux: Arc::new(Stub),
        }
    }

    #[test]
    fn test_admit_rejects_empty_script_before_job_creation() {
        let orchestrator = orchestrator_for_admit();
        let result = orchestrator.admit("user-1", &request("   \u{200B} ", "aGk="));
        assert!(matches!(result, Err(PipelineError::Validation(_))));
    }

    #[test]
    fn test_admit_rejects_bad_image() {
        let orchestrator = orchestrator_for_admit();
        let result = orchestrator.admit("user-1", &request("Buy now.", "!!not-base64!!"));
        assert!(matches!(result, Err(PipelineError::Validation(_))));
    }

    #[test]
    fn test_admit_builds_pending_job() {
        let orchestrator = orchestrator_for_admit();
        let (job, image) = orchestrator
            .admit("user-1", &request("Buy \u{201C}now\u{201D}.", "aGk="))
            .unwrap();

        assert_eq!(job.status, AdJobStatus::Pending);
        assert_eq!(job.user_id, "user-1");
        assert_eq!(job.normalized_script, "Buy \"now\".");
        assert_eq!(image, b"hi");
        assert!(job.character_image_url.is_none());
    }

    #[test]
    fn test_admit_rejects_out_of_range_threshold() {
        let orchestrator = orchestrator_for_admit();
        let mut req = request("Buy now.", "aGk=");
        req.verification_threshold = 1.5;
        let result = orchestrator.admit("user-1", &req);
        assert!(matches!(result, Err(PipelineError::Validation(_))));
    }
}
