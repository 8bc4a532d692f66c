//! End-to-end pipeline scenarios with in-memory stores and fake engines.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use std::sync::Arc;

use adgen_models::{AdJob, AdJobStatus, ClipStatus, CreateAdRequest, JobId, ProgressEvent};
use adgen_pipeline::{
    progress_channel, ArtifactStore, GeneratedClip, JobStore, MuxTool, Orchestrator,
    PipelineConfig, PipelineError, PipelineResult, PlanRequest, PlannedShot, ProgressSender,
    SpeechSynthesizer, TextPlanner, VideoGenerator, VideoRequest,
};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemoryStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    fn insert(&self, key: &str, bytes: &[u8]) {
        self.objects.lock().unwrap().insert(key.to_string(), bytes.to_vec());
    }

    fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> PipelineResult<()> {
        self.objects.lock().unwrap().insert(key.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, key: &str) -> PipelineResult<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| PipelineError::Storage(adgen_storage::StorageError::not_found(key)))
    }

    async fn list(&self, prefix: &str) -> PipelineResult<Vec<String>> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn signed_url(&self, key: &str, _ttl: Duration) -> PipelineResult<String> {
        Ok(format!("https://store.test/{}?sig=1", key))
    }

    fn canonical_url(&self, key: &str) -> String {
        format!("https://store.test/{}", key)
    }
}

/// Job store keeping every saved snapshot, for monotonicity assertions.
#[derive(Default)]
struct MemoryJobs {
    snapshots: Mutex<Vec<AdJob>>,
}

impl MemoryJobs {
    fn latest(&self) -> Option<AdJob> {
        self.snapshots.lock().unwrap().last().cloned()
    }

    fn seed(&self, job: AdJob) {
        self.snapshots.lock().unwrap().push(job);
    }

    fn progress_history(&self) -> Vec<u8> {
        self.snapshots.lock().unwrap().iter().map(|j| j.progress).collect()
    }
}

#[async_trait]
impl JobStore for MemoryJobs {
    async fn save(&self, job: &AdJob) -> PipelineResult<()> {
        self.snapshots.lock().unwrap().push(job.clone());
        Ok(())
    }

    async fn load(&self, job_id: &JobId) -> PipelineResult<Option<AdJob>> {
        Ok(self
            .snapshots
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|j| &j.job_id == job_id)
            .cloned())
    }
}

/// Planner that splits on sentence boundaries.
struct SentencePlanner;

fn split_sentences(script: &str) -> Vec<String> {
    script
        .split_inclusive('.')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[async_trait]
impl TextPlanner for SentencePlanner {
    async fn plan(&self, request: &PlanRequest<'_>) -> PipelineResult<Vec<PlannedShot>> {
        Ok(split_sentences(request.script)
            .into_iter()
            .enumerate()
            .map(|(i, sentence)| PlannedShot {
                spoken_text: sentence,
                visual_prompt: format!("medium shot {} of {}", i, request.character_name),
            })
            .collect())
    }
}

/// Planner that always drops the last sentence, violating the coverage
/// invariant on both attempts.
struct LossyPlanner {
    calls: AtomicU32,
}

#[async_trait]
impl TextPlanner for LossyPlanner {
    async fn plan(&self, request: &PlanRequest<'_>) -> PipelineResult<Vec<PlannedShot>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut sentences = split_sentences(request.script);
        sentences.pop();
        Ok(sentences
            .into_iter()
            .map(|sentence| PlannedShot {
                spoken_text: sentence,
                visual_prompt: "a shot".into(),
            })
            .collect())
    }
}

#[derive(Default)]
struct CountingVideo {
    calls: AtomicU32,
}

#[async_trait]
impl VideoGenerator for CountingVideo {
    async fn generate(&self, request: &VideoRequest<'_>) -> PipelineResult<GeneratedClip> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(GeneratedClip {
            bytes: format!("clip-{}-{}", n, request.spoken_text).into_bytes(),
            duration_seconds: Some(8.0),
        })
    }
}

struct FakeSpeech {
    fail: bool,
}

#[async_trait]
impl SpeechSynthesizer for FakeSpeech {
    async fn synthesize(&self, _text: &str, _voice_id: Option<&str>) -> PipelineResult<Vec<u8>> {
        if self.fail {
            Err(PipelineError::transient("speech engine down"))
        } else {
            Ok(b"voiceover-mp3".to_vec())
        }
    }
}

struct FakeMux;

#[async_trait]
impl MuxTool for FakeMux {
    async fn concat(&self, refs: &[String], output: &Path, _: &Path) -> PipelineResult<()> {
        assert!(refs.iter().all(|r| r.starts_with("https://")));
        std::fs::write(output, b"merged-bytes").unwrap();
        Ok(())
    }

    async fn replace_audio(&self, _: &str, _: &Path, output: &Path) -> PipelineResult<()> {
        std::fs::write(output, b"final-bytes").unwrap();
        Ok(())
    }

    async fn last_frame(&self, _: &Path, _: &Path) -> PipelineResult<Vec<u8>> {
        Ok(b"frame-png".to_vec())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct Harness {
    store: Arc<MemoryStore>,
    jobs: Arc<MemoryJobs>,
    video: Arc<CountingVideo>,
    orchestrator: Orchestrator,
}

fn harness_with(planner: Arc<dyn TextPlanner>, speech_fails: bool) -> Harness {
    let store = Arc::new(MemoryStore::default());
    let jobs = Arc::new(MemoryJobs::default());
    let video = Arc::new(CountingVideo::default());

    let config = PipelineConfig {
        backoff_base: Duration::from_millis(1),
        backoff_max: Duration::from_millis(2),
        ..PipelineConfig::default()
    };

    let orchestrator = Orchestrator {
        store: store.clone(),
        jobs: jobs.clone(),
        planner,
        video: video.clone(),
        speech: Arc::new(FakeSpeech { fail: speech_fails }),
        verifier: None,
        config,
        mux: Arc::new(FakeMux),
    };

    Harness {
        store,
        jobs,
        video,
        orchestrator,
    }
}

fn harness() -> Harness {
    harness_with(Arc::new(SentencePlanner), false)
}

fn request(script: &str) -> CreateAdRequest {
    serde_json::from_value(serde_json::json!({
        "script": script,
        "character_image": "cG5nLWJ5dGVz", // "png-bytes"
    }))
    .unwrap()
}

async fn collect_events(
    mut rx: tokio::sync::mpsc::Receiver<ProgressEvent>,
) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Some(e) = rx.recv().await {
        events.push(e);
    }
    events
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn happy_path_three_clips_emits_full_event_sequence() {
    let h = harness();
    let (job, image) = h.orchestrator.admit("user-1", &request("A. B. C.")).unwrap();
    let job_id = job.job_id.clone();

    let (progress, rx) = progress_channel();
    let final_job = h.orchestrator.run(job, Some(image), progress).await;
    let events = collect_events(rx).await;

    let names: Vec<&str> = events.iter().map(|e| e.event_name()).collect();
    assert_eq!(
        names,
        vec![
            "step1",
            "step1_complete",
            "step2_clip",
            "step2_clip",
            "step2_clip",
            "step3",
            "step4",
            "step5",
            "complete",
        ]
    );

    // Terminal event carries the job id and a final URL
    match events.last().unwrap() {
        ProgressEvent::Complete {
            job_id: id,
            final_video_url,
            status,
        } => {
            assert_eq!(id, job_id.as_str());
            assert_eq!(status, "completed");
            assert!(final_video_url.contains("final.mp4"));
        }
        other => panic!("expected complete, got {:?}", other.event_name()),
    }

    // Final job state
    assert_eq!(final_job.status, AdJobStatus::Completed);
    assert_eq!(final_job.progress, 100);
    assert!(final_job.audio_enhanced);
    assert!(final_job.final_video_url.is_some());
    assert_eq!(final_job.segments.len(), 3);
    assert!(final_job.clips.iter().all(|c| c.status == ClipStatus::Completed));

    // Store contents under the job prefix
    let prefix = format!("user-1/{}", job_id);
    let expected = [
        format!("{}/character_image.png", prefix),
        format!("{}/clips/clip_0.mp4", prefix),
        format!("{}/clips/clip_1.mp4", prefix),
        format!("{}/clips/clip_2.mp4", prefix),
        format!("{}/final.mp4", prefix),
        format!("{}/merged.mp4", prefix),
        format!("{}/prompts/prompt_0.txt", prefix),
        format!("{}/prompts/prompt_1.txt", prefix),
        format!("{}/prompts/prompt_2.txt", prefix),
    ];
    assert_eq!(h.store.keys(), expected);
}

#[tokio::test]
async fn persisted_progress_is_monotonic() {
    let h = harness();
    let (job, image) = h.orchestrator.admit("user-1", &request("A. B. C.")).unwrap();

    let progress = ProgressSender::detached();
    h.orchestrator.run(job, Some(image), progress).await;

    let history = h.jobs.progress_history();
    assert!(!history.is_empty());
    assert!(history.windows(2).all(|w| w[0] <= w[1]), "history: {:?}", history);
    assert_eq!(*history.last().unwrap(), 100);
}

#[tokio::test]
async fn resume_generates_only_the_missing_clip() {
    let h = harness();

    // First run plans and produces everything; use it to build crash state.
    let (job, image) = h.orchestrator.admit("user-1", &request("A. B. C.")).unwrap();
    let job_id = job.job_id.clone();
    let progress = ProgressSender::detached();
    let done = h.orchestrator.run(job, Some(image), progress).await;
    assert_eq!(done.status, AdJobStatus::Completed);
    assert_eq!(h.video.calls.load(Ordering::SeqCst), 3);

    // Simulate the crash: job document as of mid-run (planned, in the clip
    // loop), clip 2 and the assembly outputs gone from the store.
    let prefix = format!("user-1/{}", job_id);
    {
        let mut objects = h.store.objects.lock().unwrap();
        objects.remove(&format!("{}/clips/clip_2.mp4", prefix));
        objects.remove(&format!("{}/merged.mp4", prefix));
        objects.remove(&format!("{}/final.mp4", prefix));
    }
    let mut crashed = done.clone();
    crashed.status = AdJobStatus::GeneratingClips;
    crashed.progress = 46;
    crashed.final_video_url = None;
    crashed.completed_at = None;
    for clip in &mut crashed.clips {
        *clip = adgen_models::ClipRecord::new(clip.index);
    }
    h.jobs.seed(crashed);

    let (progress, rx) = progress_channel();
    let resumed = h.orchestrator.resume(&job_id, progress).await.unwrap();
    let events = collect_events(rx).await;

    // Exactly one more generation call, for clip 2
    assert_eq!(h.video.calls.load(Ordering::SeqCst), 4);
    assert_eq!(resumed.status, AdJobStatus::Completed);
    assert_eq!(resumed.clips[0].status, ClipStatus::Recovered);
    assert_eq!(resumed.clips[1].status, ClipStatus::Recovered);
    assert_eq!(resumed.clips[2].status, ClipStatus::Completed);

    assert!(events.iter().any(|e| e.event_name() == "complete"));
    assert!(h.store.contains(&format!("{}/final.mp4", prefix)));
}

#[tokio::test]
async fn planning_violation_fails_job_before_any_clip_work() {
    let h = harness_with(
        Arc::new(LossyPlanner {
            calls: AtomicU32::new(0),
        }),
        false,
    );
    let (job, image) = h.orchestrator.admit("user-1", &request("A. B. C.")).unwrap();
    let job_id = job.job_id.clone();

    let (progress, rx) = progress_channel();
    let failed = h.orchestrator.run(job, Some(image), progress).await;
    let events = collect_events(rx).await;

    assert_eq!(failed.status, AdJobStatus::Failed);
    assert!(failed.error_message.as_deref().unwrap().starts_with("planning:"));

    // No clip events, no clip artifacts, no video model calls
    assert!(events.iter().all(|e| e.event_name() != "step2_clip"));
    assert_eq!(events.last().unwrap().event_name(), "error");
    assert_eq!(h.video.calls.load(Ordering::SeqCst), 0);
    assert!(!h.store.contains(&format!("user-1/{}/clips/clip_0.mp4", job_id)));
}

#[tokio::test]
async fn voice_failure_promotes_merged_video() {
    let h = harness_with(Arc::new(SentencePlanner), true);
    let (job, image) = h.orchestrator.admit("user-1", &request("A. B.")).unwrap();
    let job_id = job.job_id.clone();

    let (progress, rx) = progress_channel();
    let final_job = h.orchestrator.run(job, Some(image), progress).await;
    let events = collect_events(rx).await;

    assert_eq!(final_job.status, AdJobStatus::Completed);
    assert!(!final_job.audio_enhanced);
    assert!(final_job.final_video_url.as_deref().unwrap().contains("merged.mp4"));
    assert!(!h.store.contains(&format!("user-1/{}/final.mp4", job_id)));

    // step4 was emitted (enhancement attempted), then the stream completed
    let names: Vec<&str> = events.iter().map(|e| e.event_name()).collect();
    assert!(names.contains(&"step4"));
    assert_eq!(*names.last().unwrap(), "complete");
}

#[tokio::test]
async fn single_segment_script_runs_without_concat() {
    let h = harness();
    let (job, image) = h.orchestrator.admit("user-1", &request("Only line.")).unwrap();
    let job_id = job.job_id.clone();

    let progress = ProgressSender::detached();
    let final_job = h.orchestrator.run(job, Some(image), progress).await;

    assert_eq!(final_job.status, AdJobStatus::Completed);
    assert_eq!(final_job.segments.len(), 1);
    assert_eq!(h.video.calls.load(Ordering::SeqCst), 1);

    // Merged artifact equals the single clip's bytes
    let prefix = format!("user-1/{}", job_id);
    let clip = h.store.get(&format!("{}/clips/clip_0.mp4", prefix)).await.unwrap();
    let merged = h.store.get(&format!("{}/merged.mp4", prefix)).await.unwrap();
    assert_eq!(clip, merged);
}

#[tokio::test]
async fn client_disconnect_does_not_stop_the_job() {
    let h = harness();
    let (job, image) = h.orchestrator.admit("user-1", &request("A. B. C.")).unwrap();
    let job_id = job.job_id.clone();

    let (progress, rx) = progress_channel();
    drop(rx); // consumer goes away before the job even starts

    let final_job = h.orchestrator.run(job, Some(image), progress).await;

    assert_eq!(final_job.status, AdJobStatus::Completed);
    assert_eq!(h.jobs.latest().unwrap().job_id, job_id);
    assert!(h.store.contains(&format!("user-1/{}/final.mp4", job_id)));
}

#[tokio::test]
async fn resume_skew_fails_the_job() {
    let h = harness();
    let (job, image) = h.orchestrator.admit("user-1", &request("A. B.")).unwrap();
    let job_id = job.job_id.clone();

    // A clip artifact exists before planning ever ran
    h.store.insert(&format!("user-1/{}/clips/clip_0.mp4", job_id), b"stray");

    let progress = ProgressSender::detached();
    let failed = h.orchestrator.run(job, Some(image), progress).await;

    assert_eq!(failed.status, AdJobStatus::Failed);
    assert!(failed.error_message.as_deref().unwrap().starts_with("resume_skew:"));
    assert_eq!(h.video.calls.load(Ordering::SeqCst), 0);
}
