//! Artifact repository (content store).

use crate::error::MetadataResult;
use crate::models::{ArtifactRow, FingerprintRow, NewArtifact};
use async_trait::async_trait;
use time::OffsetDateTime;

/// Repository for submitted artifacts.
#[async_trait]
pub trait ArtifactRepo: Send + Sync {
    /// Record an artifact whose bytes are already persisted.
    ///
    /// Assigns the id and the submission time in one transaction. The time
    /// is `now` truncated to microseconds, bumped to one microsecond past the
    /// newest existing artifact if the clock has not moved beyond it.
    async fn create_artifact(
        &self,
        artifact: &NewArtifact,
        now: OffsetDateTime,
    ) -> MetadataResult<ArtifactRow>;

    /// Get an artifact by id.
    async fn get_artifact(&self, id: i64) -> MetadataResult<Option<ArtifactRow>>;

    /// Fingerprints of artifacts submitted strictly before `cutoff_us`
    /// (all artifacts when `None`), ordered by id ascending.
    async fn list_fingerprints_before(
        &self,
        cutoff_us: Option<i64>,
    ) -> MetadataResult<Vec<FingerprintRow>>;

    /// Number of stored artifacts.
    async fn count_artifacts(&self) -> MetadataResult<u64>;
}
