//! Gateway endpoints: the single client entry point.

use crate::error::{ApiError, ApiResult};
use crate::handlers::form::SubmissionForm;
use crate::metrics;
use crate::state::GatewayState;
use axum::Json;
use axum::extract::{Multipart, Path, State};
use sleuth_core::wire::{AnalyzeRequest, ReportResponse, SubmitResponse, UnreportedResponse};
use std::collections::BTreeSet;
use tracing::instrument;

/// POST /upload - Store a submission, then have it evaluated.
///
/// If the store succeeds and evaluation fails, the work stays stored
/// without a report; the error names the work so it can be re-evaluated.
#[instrument(skip(state, multipart))]
pub async fn submit(
    State(state): State<GatewayState>,
    multipart: Multipart,
) -> ApiResult<Json<SubmitResponse>> {
    let form = SubmissionForm::from_multipart(multipart).await?;

    let stored = match state.store.ingest(form.into_upload()).await {
        Ok(stored) => stored,
        Err(e) => {
            metrics::record_upstream_failure("store");
            metrics::record_submission("storage_failed");
            tracing::warn!(error = %e, "content store rejected submission");
            return Err(ApiError::StorageUnavailable(e.to_string()));
        }
    };

    let request = AnalyzeRequest {
        file_hash: stored.hash,
        upload_time: stored.timestamp,
    };
    let verdict = match state.detector.analyze(stored.work_id, &request).await {
        Ok(verdict) => verdict,
        Err(e) => {
            metrics::record_upstream_failure("detector");
            metrics::record_submission("stored_without_report");
            metrics::STORED_WITHOUT_REPORT.inc();
            tracing::warn!(
                work_id = stored.work_id,
                error = %e,
                "work stored without report"
            );
            return Err(ApiError::DetectionFailed {
                work_id: stored.work_id,
                reason: e.to_string(),
            });
        }
    };

    metrics::record_submission("completed");
    tracing::info!(
        work_id = stored.work_id,
        report_id = verdict.report_id,
        plagiarism = verdict.plagiarism,
        "submission reviewed"
    );
    Ok(Json(SubmitResponse {
        work_id: stored.work_id,
        report_id: verdict.report_id,
        plagiarism: verdict.plagiarism,
    }))
}

/// GET /works/{work_id}/reports - The detector's report for a work.
#[instrument(skip(state))]
pub async fn get_review(
    State(state): State<GatewayState>,
    Path(work_id): Path<i64>,
) -> ApiResult<Json<ReportResponse>> {
    match state.detector.report(work_id).await {
        Ok(Some(report)) => Ok(Json(report)),
        Ok(None) => Err(ApiError::ReportNotFound(work_id)),
        Err(e) => {
            metrics::record_upstream_failure("detector");
            tracing::warn!(work_id, error = %e, "report lookup failed");
            Err(e.into())
        }
    }
}

/// GET /v1/admin/unreported - Stored works that have no report.
#[instrument(skip(state))]
pub async fn reconcile(State(state): State<GatewayState>) -> ApiResult<Json<UnreportedResponse>> {
    // Stored first: a work evaluated between the two listings then shows
    // up in both, never only in the stored list.
    let stored = state.store.previous_works(None).await.inspect_err(|e| {
        metrics::record_upstream_failure("store");
        tracing::warn!(error = %e, "listing stored works failed");
    })?;
    let reported = state.detector.reported_works().await.inspect_err(|e| {
        metrics::record_upstream_failure("detector");
        tracing::warn!(error = %e, "listing reported works failed");
    })?;

    let work_ids = unreported(stored.iter().map(|work| work.id), reported);
    if !work_ids.is_empty() {
        tracing::info!(count = work_ids.len(), "works stored without report");
    }
    Ok(Json(UnreportedResponse { work_ids }))
}

/// Stored ids absent from `reported`, ascending.
pub fn unreported(stored: impl IntoIterator<Item = i64>, reported: Vec<i64>) -> Vec<i64> {
    let reported: BTreeSet<i64> = reported.into_iter().collect();
    let stored: BTreeSet<i64> = stored.into_iter().collect();
    stored.difference(&reported).copied().collect()
}
