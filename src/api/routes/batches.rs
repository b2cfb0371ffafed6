use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::upload::Upload;
use crate::api::{
    error::{ApiError, ApiResult},
    middleware::Session,
    state::AppState,
};
use crate::application::SavePayload;
use crate::infrastructure::{BatchJob, JobSnapshot, JobStatus};

#[derive(Serialize)]
pub struct BatchAccepted {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub documents: usize,
}

#[derive(Debug, Deserialize)]
pub struct EditRequest {
    pub field: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct CommitRequest {
    #[serde(default)]
    pub url: String,
}

#[derive(Serialize)]
pub struct CommitResponse {
    pub success: bool,
    pub rows: usize,
}

/// Accepts repeated `file` parts and one `headers` part, then runs the batch
/// on a background task.
pub async fn create_batch(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<BatchAccepted>)> {
    let upload = Upload::read(multipart).await?;
    let schema = upload.schema()?;
    let documents = upload.documents;
    if documents.is_empty() {
        return Err(ApiError::bad_request("At least one file is required"));
    }

    let job = BatchJob::new(schema.clone(), documents.len());
    let accepted = BatchAccepted {
        job_id: job.job_id,
        status: job.status,
        documents: job.documents,
    };
    let job_id = state.jobs.insert(job)?;
    info!(%job_id, documents = accepted.documents, "batch accepted");

    let jobs = state.jobs.clone();
    let orchestrator = state.orchestrator.clone();
    tokio::spawn(async move {
        if jobs.mark_processing(job_id).is_err() {
            debug!(%job_id, "batch discarded before it started");
            return;
        }

        let progress = jobs.clone();
        let outcome = orchestrator
            .run_batch(documents, &schema, move |percent| {
                if let Err(e) = progress.set_progress(job_id, percent) {
                    debug!(%job_id, error = %e, "progress dropped");
                }
            })
            .await;

        if let Err(e) = &outcome {
            warn!(%job_id, error = %e, "batch failed");
        }
        if let Err(e) = jobs.finish(job_id, outcome) {
            debug!(%job_id, error = %e, "batch discarded while running");
        }
    });

    Ok((StatusCode::ACCEPTED, Json(accepted)))
}

pub async fn get_batch(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<JobSnapshot>> {
    Ok(Json(state.jobs.snapshot(job_id)?))
}

pub async fn edit_record(
    State(state): State<AppState>,
    Path((job_id, index)): Path<(Uuid, usize)>,
    Json(request): Json<EditRequest>,
) -> ApiResult<Json<JobSnapshot>> {
    state
        .jobs
        .with_review(job_id, |review| review.edit(index, &request.field, request.value))?;
    Ok(Json(state.jobs.snapshot(job_id)?))
}

pub async fn delete_record(
    State(state): State<AppState>,
    Path((job_id, index)): Path<(Uuid, usize)>,
) -> ApiResult<Json<JobSnapshot>> {
    state
        .jobs
        .with_review(job_id, |review| review.delete_record(index))?;
    Ok(Json(state.jobs.snapshot(job_id)?))
}

/// Saves the reviewed records. The review stays locked while the rows are
/// written and reopens if the write fails.
pub async fn commit_batch(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Session(session): Session,
    Json(request): Json<CommitRequest>,
) -> ApiResult<Json<CommitResponse>> {
    let records = state.jobs.with_review(job_id, |review| review.begin_commit())?;
    let saved = state
        .sheets
        .save(&session, &request.url, SavePayload::Many(records))
        .await;

    let rows = match saved {
        Ok(rows) => rows,
        Err(e) => {
            if let Err(reopen) = state.jobs.with_review(job_id, |review| review.abort_commit()) {
                debug!(%job_id, error = %reopen, "review gone before it could reopen");
            }
            return Err(e.into());
        }
    };

    if let Err(e) = state.jobs.with_review(job_id, |review| review.finish_commit()) {
        debug!(%job_id, error = %e, "batch discarded while committing");
    }
    info!(%job_id, rows, "batch committed");
    Ok(Json(CommitResponse {
        success: true,
        rows,
    }))
}

pub async fn discard_batch(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.jobs.remove(job_id)?;
    info!(%job_id, "batch discarded");
    Ok(StatusCode::NO_CONTENT)
}
