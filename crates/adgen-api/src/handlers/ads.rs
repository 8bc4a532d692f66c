//! Ad creation and job status handlers.

use std::convert::Infallible;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::Redirect;
use axum::Json;
use futures_util::stream::Stream;
use tracing::info;

use adgen_models::{AdJobStatus, CreateAdRequest, JobId, JobStatusResponse};
use adgen_pipeline::{progress_channel, ProgressSender};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Start an ad creation job and return immediately.
///
/// The orchestrator task runs detached; clients poll `GET /ads/{job_id}` for
/// progress.
pub async fn create_ad(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateAdRequest>,
) -> ApiResult<(StatusCode, Json<JobStatusResponse>)> {
    let orchestrator = state.orchestrator_for(&user.user_id);
    let (job, image) = orchestrator.admit(&user.user_id, &request)?;
    let snapshot = JobStatusResponse::from(&job);

    info!("Admitted ad job {} for user {}", job.job_id, user.user_id);

    tokio::spawn(async move {
        orchestrator
            .run(job, Some(image), ProgressSender::detached())
            .await;
    });

    Ok((StatusCode::ACCEPTED, Json(snapshot)))
}

/// Start an ad creation job and stream progress as server-sent events.
///
/// The stream carries the step event sequence and terminates with `complete`
/// or `error`. Disconnecting only stops the stream; the job runs to
/// completion and remains pollable.
pub async fn stream_ad(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateAdRequest>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let orchestrator = state.orchestrator_for(&user.user_id);
    let (job, image) = orchestrator.admit(&user.user_id, &request)?;

    info!("Streaming ad job {} for user {}", job.job_id, user.user_id);

    let (progress, rx) = progress_channel();
    tokio::spawn(async move {
        orchestrator.run(job, Some(image), progress).await;
    });

    Ok(Sse::new(event_stream(rx)).keep_alive(KeepAlive::default()))
}

/// Resume a non-terminal job after a process restart.
pub async fn resume_ad(
    State(state): State<AppState>,
    user: AuthUser,
    Path(job_id): Path<String>,
) -> ApiResult<(StatusCode, Json<JobStatusResponse>)> {
    let job_id = JobId::from_string(job_id);
    let repo = state.jobs_for(&user.user_id);

    let job = repo
        .load(&job_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("job {} not found", job_id)))?;
    let snapshot = JobStatusResponse::from(&job);

    if job.status.is_terminal() {
        return Ok((StatusCode::OK, Json(snapshot)));
    }

    info!("Resuming ad job {} for user {}", job_id, user.user_id);

    let orchestrator = state.orchestrator_for(&user.user_id);
    tokio::spawn(async move {
        let _ = orchestrator.resume(&job_id, ProgressSender::detached()).await;
    });

    Ok((StatusCode::ACCEPTED, Json(snapshot)))
}

/// Poll job status.
pub async fn get_ad_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobStatusResponse>> {
    let repo = state.jobs_for(&user.user_id);
    let job = repo
        .load(&JobId::from_string(job_id.clone()))
        .await?
        .ok_or_else(|| ApiError::not_found(format!("job {} not found", job_id)))?;

    Ok(Json(JobStatusResponse::from(&job)))
}

/// List the caller's jobs, newest first.
pub async fn list_ad_jobs(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<JobStatusResponse>>> {
    let repo = state.jobs_for(&user.user_id);
    let jobs = repo.list().await?;
    Ok(Json(jobs.iter().map(JobStatusResponse::from).collect()))
}

/// Redirect to the final video of a completed job.
pub async fn download_ad(
    State(state): State<AppState>,
    user: AuthUser,
    Path(job_id): Path<String>,
) -> ApiResult<Redirect> {
    let repo = state.jobs_for(&user.user_id);
    let job = repo
        .load(&JobId::from_string(job_id.clone()))
        .await?
        .ok_or_else(|| ApiError::not_found(format!("job {} not found", job_id)))?;

    if job.status != AdJobStatus::Completed {
        return Err(ApiError::Conflict(format!(
            "job not completed yet, status: {}",
            job.status
        )));
    }

    let url = job
        .final_video_url
        .ok_or_else(|| ApiError::not_found("final video URL not available"))?;

    Ok(Redirect::temporary(&url))
}

/// Turn the progress channel into an SSE event stream.
///
/// The channel closes when the orchestrator drops its sender, after the
/// terminal event; nothing follows `complete` or `error`.
fn event_stream(
    rx: tokio::sync::mpsc::Receiver<adgen_models::ProgressEvent>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    futures_util::stream::unfold(rx, |mut rx| async move {
        let event = rx.recv().await?;
        let sse = Event::default()
            .event(event.event_name())
            .json_data(&event)
            .ok()?;
        Some((Ok(sse), rx))
    })
}
