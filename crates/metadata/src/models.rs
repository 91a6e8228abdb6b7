//! Database models mapping to the metadata schema.

use crate::error::{MetadataError, MetadataResult};
use sleuth_core::{Fingerprint, timestamp};
use sqlx::FromRow;
use time::OffsetDateTime;

// =============================================================================
// Artifacts (content store)
// =============================================================================

/// One accepted submission.
#[derive(Debug, Clone, FromRow)]
pub struct ArtifactRow {
    pub id: i64,
    pub student_id: String,
    pub assignment_id: String,
    /// Acceptance time, microseconds since the Unix epoch. Strictly
    /// increasing with `id`.
    pub submitted_at_us: i64,
    pub storage_key: String,
    pub file_name: String,
    /// Lowercase hex SHA-256 of the stored bytes.
    pub hash: String,
}

impl ArtifactRow {
    pub fn submitted_at(&self) -> MetadataResult<OffsetDateTime> {
        timestamp::from_unix_micros(self.submitted_at_us)
            .map_err(|e| MetadataError::Internal(format!("artifact {}: {e}", self.id)))
    }

    pub fn fingerprint(&self) -> MetadataResult<Fingerprint> {
        parse_stored_hash(self.id, &self.hash)
    }
}

/// Fields supplied by the caller when recording an artifact. The id and
/// submission time are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewArtifact {
    pub student_id: String,
    pub assignment_id: String,
    pub storage_key: String,
    pub file_name: String,
    pub hash: Fingerprint,
}

/// Projection used by the "fingerprints before" query.
#[derive(Debug, Clone, FromRow)]
pub struct FingerprintRow {
    pub id: i64,
    pub hash: String,
}

impl FingerprintRow {
    pub fn fingerprint(&self) -> MetadataResult<Fingerprint> {
        parse_stored_hash(self.id, &self.hash)
    }
}

fn parse_stored_hash(id: i64, hash: &str) -> MetadataResult<Fingerprint> {
    Fingerprint::from_hex(hash)
        .map_err(|e| MetadataError::Internal(format!("artifact {id} has corrupt hash: {e}")))
}

// =============================================================================
// Reports (detector)
// =============================================================================

/// Outcome of evaluating one artifact.
#[derive(Debug, Clone, FromRow)]
pub struct ReportRow {
    pub id: i64,
    pub work_id: i64,
    pub plagiarism: bool,
    /// Present iff `plagiarism`.
    pub matched_work_id: Option<i64>,
    pub created_at_us: i64,
}

impl ReportRow {
    pub fn created_at(&self) -> MetadataResult<OffsetDateTime> {
        timestamp::from_unix_micros(self.created_at_us)
            .map_err(|e| MetadataError::Internal(format!("report {}: {e}", self.id)))
    }
}

#[derive(Debug, Clone)]
pub struct NewReport {
    pub work_id: i64,
    pub plagiarism: bool,
    pub matched_work_id: Option<i64>,
    pub created_at: OffsetDateTime,
}
