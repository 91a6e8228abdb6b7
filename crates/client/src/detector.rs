//! Detector client.

use crate::error::{ClientError, ClientResult};
use crate::http::{HttpBase, decode_json};
use async_trait::async_trait;
use sleuth_core::config::UpstreamConfig;
use sleuth_core::wire::{AnalyzeRequest, AnalyzeResponse, ReportResponse, ReportedWorksResponse};
use tracing::instrument;

/// Operations the detector offers to its peers.
#[async_trait]
pub trait DetectorApi: Send + Sync {
    /// Evaluate a freshly stored work. Never retried.
    async fn analyze(&self, work_id: i64, request: &AnalyzeRequest)
    -> ClientResult<AnalyzeResponse>;

    /// The report for `work_id`, or `None` if the detector has none.
    async fn report(&self, work_id: i64) -> ClientResult<Option<ReportResponse>>;

    /// Ids of all works that have a report.
    async fn reported_works(&self) -> ClientResult<Vec<i64>>;
}

/// HTTP client for the detector.
#[derive(Clone)]
pub struct DetectorClient {
    base: HttpBase,
}

impl DetectorClient {
    pub fn new(config: &UpstreamConfig) -> ClientResult<Self> {
        Ok(Self {
            base: HttpBase::new(config)?,
        })
    }
}

fn invalid(op: &'static str, err: sleuth_core::Error) -> ClientError {
    ClientError::Decode {
        op,
        reason: err.to_string(),
    }
}

#[async_trait]
impl DetectorApi for DetectorClient {
    #[instrument(skip(self, request))]
    async fn analyze(
        &self,
        work_id: i64,
        request: &AnalyzeRequest,
    ) -> ClientResult<AnalyzeResponse> {
        const OP: &str = "detector.analyze";
        let url = self.base.url(&format!("/analyze/{work_id}"))?;
        let response = self
            .base
            .send_once(OP, self.base.post(url).json(request))
            .await?;
        let verdict: AnalyzeResponse = decode_json(OP, response).await?;
        verdict.validate().map_err(|e| invalid(OP, e))?;
        Ok(verdict)
    }

    #[instrument(skip(self))]
    async fn report(&self, work_id: i64) -> ClientResult<Option<ReportResponse>> {
        const OP: &str = "detector.report";
        let url = self.base.url(&format!("/reports/{work_id}"))?;
        let response = self.base.get(OP, url).await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let report: ReportResponse = decode_json(OP, response).await?;
        report.validate().map_err(|e| invalid(OP, e))?;
        if report.work_id != work_id {
            return Err(ClientError::Decode {
                op: OP,
                reason: format!("asked for work {work_id}, got report for {}", report.work_id),
            });
        }
        Ok(Some(report))
    }

    #[instrument(skip(self))]
    async fn reported_works(&self) -> ClientResult<Vec<i64>> {
        const OP: &str = "detector.reported_works";
        let url = self.base.url("/reports")?;
        let response = self.base.get(OP, url).await?;
        let body: ReportedWorksResponse = decode_json(OP, response).await?;
        Ok(body.work_ids)
    }
}
