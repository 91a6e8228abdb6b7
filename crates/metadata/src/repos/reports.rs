//! Report repository (detector).

use crate::error::MetadataResult;
use crate::models::{NewReport, ReportRow};
use async_trait::async_trait;

/// Repository for evaluation reports.
#[async_trait]
pub trait ReportRepo: Send + Sync {
    /// Persist a report. Fails with `AlreadyExists` if the work already has
    /// one, and with `Constraint` if the verdict and match disagree.
    async fn create_report(&self, report: &NewReport) -> MetadataResult<ReportRow>;

    /// Get the report for a work.
    async fn get_report_by_work(&self, work_id: i64) -> MetadataResult<Option<ReportRow>>;

    /// Ids of all works that have a report, ascending.
    async fn list_reported_work_ids(&self) -> MetadataResult<Vec<i64>>;
}
