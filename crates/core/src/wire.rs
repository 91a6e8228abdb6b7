//! JSON contracts exchanged between the services.
//!
//! Every payload crossing a service boundary is one of these types. Hashes
//! deserialize through [`Fingerprint`] and timestamps through
//! [`crate::timestamp::iso8601`], so malformed values are rejected at the
//! edge instead of deep inside a handler.

use crate::fingerprint::Fingerprint;
use crate::{Error, Result, timestamp};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Content store reply to an ingest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestResponse {
    pub work_id: i64,
    pub hash: Fingerprint,
    #[serde(with = "timestamp::iso8601")]
    pub timestamp: OffsetDateTime,
}

/// One entry of a "fingerprints before" listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviousWork {
    pub id: i64,
    pub hash: Fingerprint,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviousWorksResponse {
    pub previous_works: Vec<PreviousWork>,
}

/// Detector evaluation request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub file_hash: Fingerprint,
    #[serde(with = "timestamp::iso8601")]
    pub upload_time: OffsetDateTime,
}

/// Detector evaluation result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub report_id: i64,
    pub plagiarism: bool,
    #[serde(default)]
    pub matched_work_id: Option<i64>,
}

impl AnalyzeResponse {
    pub fn validate(&self) -> Result<()> {
        check_verdict(self.plagiarism, self.matched_work_id)
    }
}

/// A stored report as served by the detector and passed through the gateway.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportResponse {
    pub report_id: i64,
    pub work_id: i64,
    pub plagiarism: bool,
    #[serde(with = "timestamp::iso8601")]
    pub timestamp: OffsetDateTime,
    #[serde(default)]
    pub matched_work_id: Option<i64>,
}

impl ReportResponse {
    pub fn validate(&self) -> Result<()> {
        check_verdict(self.plagiarism, self.matched_work_id)
    }
}

/// Work ids that already have a report.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedWorksResponse {
    pub work_ids: Vec<i64>,
}

/// Gateway reply to a submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub work_id: i64,
    pub report_id: i64,
    pub plagiarism: bool,
}

/// Works stored without a report.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreportedResponse {
    pub work_ids: Vec<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub role: String,
    pub version: String,
}

/// A verdict names a matched work exactly when it is positive.
pub fn check_verdict(plagiarism: bool, matched_work_id: Option<i64>) -> Result<()> {
    match (plagiarism, matched_work_id) {
        (true, Some(_)) | (false, None) => Ok(()),
        (true, None) => Err(Error::InconsistentVerdict(
            "positive verdict without matched_work_id".to_string(),
        )),
        (false, Some(id)) => Err(Error::InconsistentVerdict(format!(
            "negative verdict with matched_work_id {id}"
        ))),
    }
}

/// Validate an opaque identity field taken from a submission form.
pub fn require_non_empty(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::field(field, "must not be empty"));
    }
    Ok(())
}
