//! Detector endpoints: evaluate a work, serve reports.

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::DetectorState;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use sleuth_core::timestamp;
use sleuth_core::wire::{
    AnalyzeRequest, AnalyzeResponse, PreviousWork, ReportResponse, ReportedWorksResponse,
};
use sleuth_metadata::ReportRepo;
use sleuth_metadata::models::NewReport;
use std::time::Instant;
use tracing::instrument;

/// The earliest prior work with the same fingerprint, if any.
pub fn first_match(previous: &[PreviousWork], request: &AnalyzeRequest) -> Option<i64> {
    previous
        .iter()
        .find(|work| work.hash == request.file_hash)
        .map(|work| work.id)
}

/// POST /analyze/{work_id} - Evaluate a stored work and record the verdict.
///
/// Compares the fingerprint against works submitted strictly before
/// `upload_time`. A work is evaluated at most once; if the content store
/// cannot be queried nothing is recorded.
#[instrument(skip(state, payload))]
pub async fn analyze_work(
    State(state): State<DetectorState>,
    Path(work_id): Path<i64>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> ApiResult<Json<AnalyzeResponse>> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    if work_id <= 0 {
        return Err(ApiError::BadRequest(format!("invalid work id {work_id}")));
    }
    let started = Instant::now();

    if state.metadata.get_report_by_work(work_id).await?.is_some() {
        return Err(ApiError::Conflict(format!(
            "work {work_id} has already been evaluated"
        )));
    }

    let previous = match state.store.previous_works(Some(request.upload_time)).await {
        Ok(previous) => previous,
        Err(e) => {
            metrics::record_upstream_failure("store");
            tracing::warn!(work_id, error = %e, "content store query failed, no report recorded");
            return Err(e.into());
        }
    };

    let matched_work_id = first_match(&previous, &request);
    let report = state
        .metadata
        .create_report(&NewReport {
            work_id,
            plagiarism: matched_work_id.is_some(),
            matched_work_id,
            created_at: timestamp::now(),
        })
        .await?;

    metrics::record_evaluation(report.plagiarism);
    metrics::EVALUATION_DURATION.observe(started.elapsed().as_secs_f64());
    tracing::info!(
        work_id,
        report_id = report.id,
        plagiarism = report.plagiarism,
        matched_work_id = ?report.matched_work_id,
        compared = previous.len(),
        "work evaluated"
    );

    Ok(Json(AnalyzeResponse {
        report_id: report.id,
        plagiarism: report.plagiarism,
        matched_work_id: report.matched_work_id,
    }))
}

/// GET /reports/{work_id} - The report recorded for a work.
#[instrument(skip(state))]
pub async fn get_report(
    State(state): State<DetectorState>,
    Path(work_id): Path<i64>,
) -> ApiResult<Json<ReportResponse>> {
    let report = state
        .metadata
        .get_report_by_work(work_id)
        .await?
        .ok_or(ApiError::ReportNotFound(work_id))?;

    Ok(Json(ReportResponse {
        report_id: report.id,
        work_id: report.work_id,
        plagiarism: report.plagiarism,
        timestamp: report.created_at()?,
        matched_work_id: report.matched_work_id,
    }))
}

/// GET /reports - Ids of every work that has a report, ascending.
#[instrument(skip(state))]
pub async fn list_reported_works(
    State(state): State<DetectorState>,
) -> ApiResult<Json<ReportedWorksResponse>> {
    let work_ids = state.metadata.list_reported_work_ids().await?;
    Ok(Json(ReportedWorksResponse { work_ids }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sleuth_core::Fingerprint;

    fn work(id: i64, content: &[u8]) -> PreviousWork {
        PreviousWork {
            id,
            hash: Fingerprint::compute(content),
        }
    }

    fn request(content: &[u8]) -> AnalyzeRequest {
        AnalyzeRequest {
            file_hash: Fingerprint::compute(content),
            upload_time: timestamp::now(),
        }
    }

    #[test]
    fn test_first_match_wins() {
        let previous = vec![work(1, b"a"), work(2, b"b"), work(3, b"b")];
        assert_eq!(first_match(&previous, &request(b"b")), Some(2));
    }

    #[test]
    fn test_no_match() {
        let previous = vec![work(1, b"a")];
        assert_eq!(first_match(&previous, &request(b"z")), None);
        assert_eq!(first_match(&[], &request(b"a")), None);
    }
}
