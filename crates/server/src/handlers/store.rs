//! Content store endpoints: ingest, fingerprints-before and retrieval.

use crate::error::{ApiError, ApiResult};
use crate::handlers::form::SubmissionForm;
use crate::metrics;
use crate::state::StoreState;
use axum::Json;
use axum::body::Body;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use futures::StreamExt;
use serde::Deserialize;
use sleuth_core::wire::{IngestResponse, PreviousWork, PreviousWorksResponse};
use sleuth_core::{Fingerprint, timestamp};
use sleuth_metadata::ArtifactRepo;
use sleuth_metadata::models::NewArtifact;
use sleuth_storage::{ArtifactKey, StorageError};
use std::time::Instant;
use tracing::instrument;

/// POST /works - Persist a submitted file and record it.
///
/// The fingerprint is computed here from the received bytes; callers never
/// supply it. Bytes are written before the row so a visible record always
/// has its object; if the insert fails the object is removed again.
#[instrument(skip(state, multipart))]
pub async fn ingest_work(
    State(state): State<StoreState>,
    multipart: Multipart,
) -> ApiResult<Json<IngestResponse>> {
    let form = SubmissionForm::from_multipart(multipart).await?;
    let started = Instant::now();

    let hash = Fingerprint::compute(&form.data);
    let key = ArtifactKey::generate(form.file_name.as_deref());
    let size = form.data.len() as u64;

    if let Err(e) = state.storage.put(&key.key, form.data).await {
        metrics::record_ingest_error("storage");
        return Err(e.into());
    }

    let artifact = NewArtifact {
        student_id: form.student_id,
        assignment_id: form.assignment_id,
        storage_key: key.key.clone(),
        file_name: key.file_name,
        hash,
    };
    let row = match state
        .metadata
        .create_artifact(&artifact, timestamp::now())
        .await
    {
        Ok(row) => row,
        Err(e) => {
            metrics::record_ingest_error("metadata");
            if let Err(cleanup) = state.storage.delete(&key.key).await {
                tracing::warn!(
                    key = %key.key,
                    error = %cleanup,
                    "failed to remove bytes of unrecorded work"
                );
            }
            return Err(e.into());
        }
    };

    metrics::WORKS_INGESTED.inc();
    metrics::BYTES_INGESTED.inc_by(size);
    metrics::INGEST_DURATION.observe(started.elapsed().as_secs_f64());
    tracing::info!(
        work_id = row.id,
        hash = %hash,
        size,
        student_id = %row.student_id,
        assignment_id = %row.assignment_id,
        "work ingested"
    );

    Ok(Json(IngestResponse {
        work_id: row.id,
        hash,
        timestamp: row.submitted_at()?,
    }))
}

#[derive(Debug, Deserialize)]
pub struct PreviousWorksQuery {
    /// Exclusive upper bound on submission time. Absent or empty means all.
    pub before: Option<String>,
}

/// GET /previous_works - Fingerprints of works submitted strictly before
/// `before`, ordered by id.
#[instrument(skip(state))]
pub async fn previous_works(
    State(state): State<StoreState>,
    Query(query): Query<PreviousWorksQuery>,
) -> ApiResult<Json<PreviousWorksResponse>> {
    let cutoff = match query.before.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => {
            let before = timestamp::parse(raw)
                .map_err(|e| ApiError::BadRequest(format!("invalid 'before': {e}")))?;
            Some(timestamp::cutoff_micros(before))
        }
    };

    let rows = state.metadata.list_fingerprints_before(cutoff).await?;
    let previous_works = rows
        .iter()
        .map(|row| {
            Ok(PreviousWork {
                id: row.id,
                hash: row.fingerprint()?,
            })
        })
        .collect::<ApiResult<Vec<_>>>()?;

    tracing::debug!(count = previous_works.len(), cutoff_us = ?cutoff, "listed fingerprints");
    Ok(Json(PreviousWorksResponse { previous_works }))
}

/// GET /works/{work_id}/file - Stream the stored bytes of a work.
#[instrument(skip(state))]
pub async fn retrieve_work(
    State(state): State<StoreState>,
    Path(work_id): Path<i64>,
) -> ApiResult<Response> {
    let artifact = state
        .metadata
        .get_artifact(work_id)
        .await?
        .ok_or(ApiError::WorkNotFound(work_id))?;

    let missing = |e: StorageError| match e {
        StorageError::NotFound(_) => {
            tracing::warn!(work_id, key = %artifact.storage_key, "recorded work has no bytes");
            ApiError::FileNotFound(work_id)
        }
        other => other.into(),
    };
    let meta = state
        .storage
        .head(&artifact.storage_key)
        .await
        .map_err(missing)?;
    let stream = state
        .storage
        .get_stream(&artifact.storage_key)
        .await
        .map_err(missing)?;
    let body = stream.map(|chunk| chunk.map_err(|e| std::io::Error::other(e.to_string())));

    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, "application/octet-stream".to_string()),
            (CONTENT_LENGTH, meta.size.to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", artifact.file_name),
            ),
        ],
        Body::from_stream(body),
    )
        .into_response())
}
