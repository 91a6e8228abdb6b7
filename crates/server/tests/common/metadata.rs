//! Metadata store wrappers for failure injection.

use async_trait::async_trait;
use sleuth_metadata::models::{ArtifactRow, FingerprintRow, NewArtifact, NewReport, ReportRow};
use sleuth_metadata::{ArtifactRepo, MetadataError, MetadataResult, MetadataStore, ReportRepo};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use time::OffsetDateTime;

/// Delegates to `inner` but refuses every artifact insert.
pub struct RejectingArtifacts {
    pub inner: Arc<dyn MetadataStore>,
    pub inserts: Arc<AtomicUsize>,
}

impl RejectingArtifacts {
    pub fn new(inner: Arc<dyn MetadataStore>) -> Self {
        Self {
            inner,
            inserts: Arc::default(),
        }
    }
}

#[async_trait]
impl ArtifactRepo for RejectingArtifacts {
    async fn create_artifact(
        &self,
        artifact: &NewArtifact,
        _now: OffsetDateTime,
    ) -> MetadataResult<ArtifactRow> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        Err(MetadataError::Internal(format!(
            "insert of {} refused",
            artifact.storage_key
        )))
    }

    async fn get_artifact(&self, id: i64) -> MetadataResult<Option<ArtifactRow>> {
        self.inner.get_artifact(id).await
    }

    async fn list_fingerprints_before(
        &self,
        cutoff_us: Option<i64>,
    ) -> MetadataResult<Vec<FingerprintRow>> {
        self.inner.list_fingerprints_before(cutoff_us).await
    }

    async fn count_artifacts(&self) -> MetadataResult<u64> {
        self.inner.count_artifacts().await
    }
}

#[async_trait]
impl ReportRepo for RejectingArtifacts {
    async fn create_report(&self, report: &NewReport) -> MetadataResult<ReportRow> {
        self.inner.create_report(report).await
    }

    async fn get_report_by_work(&self, work_id: i64) -> MetadataResult<Option<ReportRow>> {
        self.inner.get_report_by_work(work_id).await
    }

    async fn list_reported_work_ids(&self) -> MetadataResult<Vec<i64>> {
        self.inner.list_reported_work_ids().await
    }
}

#[async_trait]
impl MetadataStore for RejectingArtifacts {
    async fn migrate(&self) -> MetadataResult<()> {
        self.inner.migrate().await
    }

    async fn health_check(&self) -> MetadataResult<()> {
        self.inner.health_check().await
    }
}
