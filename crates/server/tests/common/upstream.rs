//! In-process peers: `StoreApi` / `DetectorApi` implementations that call a
//! role's router directly, plus peers that always fail.

use super::fixtures::{FormPart, multipart_body, query_value, request, send};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use serde::de::DeserializeOwned;
use sleuth_client::{ClientError, ClientResult, DetectorApi, StoreApi, Upload};
use sleuth_core::timestamp;
use sleuth_core::wire::{
    AnalyzeRequest, AnalyzeResponse, IngestResponse, PreviousWork, PreviousWorksResponse,
    ReportResponse, ReportedWorksResponse,
};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use time::OffsetDateTime;

async fn call<T: DeserializeOwned>(
    router: &axum::Router,
    op: &'static str,
    request: Request<Body>,
) -> ClientResult<T> {
    let (status, body) = send(router, request).await;
    if !status.is_success() {
        return Err(ClientError::Status {
            op,
            status: status.as_u16(),
            body: String::from_utf8_lossy(&body).into_owned(),
        });
    }
    serde_json::from_slice(&body).map_err(|e| ClientError::Decode {
        op,
        reason: e.to_string(),
    })
}

/// Content store reached through its router.
#[derive(Clone)]
pub struct RouterStore {
    pub router: axum::Router,
    pub token: Option<String>,
}

#[async_trait]
impl StoreApi for RouterStore {
    async fn ingest(&self, upload: Upload) -> ClientResult<IngestResponse> {
        let file_name = upload.file_name.unwrap_or_else(|| "upload.txt".to_string());
        let (content_type, body) = multipart_body(&[
            FormPart::Text("student_id", &upload.student_id),
            FormPart::Text("assignment_id", &upload.assignment_id),
            FormPart::File {
                name: "file",
                file_name: &file_name,
                data: &upload.data,
            },
        ]);
        let req = request(
            "POST",
            "/works",
            Some(&content_type),
            body,
            self.token.as_deref(),
        );
        call(&self.router, "store.ingest", req).await
    }

    async fn previous_works(
        &self,
        before: Option<OffsetDateTime>,
    ) -> ClientResult<Vec<PreviousWork>> {
        let uri = match before {
            Some(ts) => format!(
                "/previous_works?before={}",
                query_value(&timestamp::format(ts))
            ),
            None => "/previous_works".to_string(),
        };
        let req = request("GET", &uri, None, Vec::new(), self.token.as_deref());
        let body: PreviousWorksResponse = call(&self.router, "store.previous_works", req).await?;
        Ok(body.previous_works)
    }
}

/// Detector reached through its router.
#[derive(Clone)]
pub struct RouterDetector {
    pub router: axum::Router,
    pub token: Option<String>,
}

#[async_trait]
impl DetectorApi for RouterDetector {
    async fn analyze(
        &self,
        work_id: i64,
        analyze: &AnalyzeRequest,
    ) -> ClientResult<AnalyzeResponse> {
        let req = request(
            "POST",
            &format!("/analyze/{work_id}"),
            Some("application/json"),
            serde_json::to_vec(analyze).unwrap(),
            self.token.as_deref(),
        );
        call(&self.router, "detector.analyze", req).await
    }

    async fn report(&self, work_id: i64) -> ClientResult<Option<ReportResponse>> {
        let req = request(
            "GET",
            &format!("/reports/{work_id}"),
            None,
            Vec::new(),
            self.token.as_deref(),
        );
        match call(&self.router, "detector.report", req).await {
            Ok(report) => Ok(Some(report)),
            Err(ClientError::Status { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn reported_works(&self) -> ClientResult<Vec<i64>> {
        let req = request("GET", "/reports", None, Vec::new(), self.token.as_deref());
        let body: ReportedWorksResponse = call(&self.router, "detector.reported_works", req).await?;
        Ok(body.work_ids)
    }
}

fn unavailable(op: &'static str) -> ClientError {
    ClientError::Status {
        op,
        status: 503,
        body: "peer unavailable".to_string(),
    }
}

/// A content store that is down. Counts the calls it receives.
#[derive(Clone, Default)]
pub struct FailingStore {
    pub calls: Arc<AtomicUsize>,
}

#[async_trait]
impl StoreApi for FailingStore {
    async fn ingest(&self, _upload: Upload) -> ClientResult<IngestResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(unavailable("store.ingest"))
    }

    async fn previous_works(
        &self,
        _before: Option<OffsetDateTime>,
    ) -> ClientResult<Vec<PreviousWork>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(unavailable("store.previous_works"))
    }
}

/// A detector that is down. Counts the calls it receives.
#[derive(Clone, Default)]
pub struct FailingDetector {
    pub calls: Arc<AtomicUsize>,
}

#[async_trait]
impl DetectorApi for FailingDetector {
    async fn analyze(&self, _work_id: i64, _request: &AnalyzeRequest) -> ClientResult<AnalyzeResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(unavailable("detector.analyze"))
    }

    async fn report(&self, _work_id: i64) -> ClientResult<Option<ReportResponse>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(unavailable("detector.report"))
    }

    async fn reported_works(&self) -> ClientResult<Vec<i64>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(unavailable("detector.reported_works"))
    }
}

/// Shared record of peer calls, in completion order.
pub type CallLog = Arc<Mutex<Vec<&'static str>>>;

/// A content store that lists slowly and logs when each listing completes.
pub struct SlowListingStore {
    pub inner: Arc<dyn StoreApi>,
    pub log: CallLog,
}

#[async_trait]
impl StoreApi for SlowListingStore {
    async fn ingest(&self, upload: Upload) -> ClientResult<IngestResponse> {
        self.inner.ingest(upload).await
    }

    async fn previous_works(
        &self,
        before: Option<OffsetDateTime>,
    ) -> ClientResult<Vec<PreviousWork>> {
        self.log.lock().unwrap().push("store.previous_works:start");
        let works = self.inner.previous_works(before).await;
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        self.log.lock().unwrap().push("store.previous_works:done");
        works
    }
}

/// A detector that logs when its listing is requested.
pub struct LoggingDetector {
    pub inner: Arc<dyn DetectorApi>,
    pub log: CallLog,
}

#[async_trait]
impl DetectorApi for LoggingDetector {
    async fn analyze(&self, work_id: i64, request: &AnalyzeRequest) -> ClientResult<AnalyzeResponse> {
        self.inner.analyze(work_id, request).await
    }

    async fn report(&self, work_id: i64) -> ClientResult<Option<ReportResponse>> {
        self.inner.report(work_id).await
    }

    async fn reported_works(&self) -> ClientResult<Vec<i64>> {
        self.log.lock().unwrap().push("detector.reported_works");
        self.inner.reported_works().await
    }
}
