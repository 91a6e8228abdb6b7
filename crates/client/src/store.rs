//! Content store client.

use crate::error::{ClientError, ClientResult};
use crate::http::{HttpBase, decode_json};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use sleuth_core::config::UpstreamConfig;
use sleuth_core::timestamp;
use sleuth_core::wire::{IngestResponse, PreviousWork, PreviousWorksResponse};
use time::OffsetDateTime;
use tracing::instrument;

/// One file submitted for storage.
#[derive(Clone, Debug)]
pub struct Upload {
    pub student_id: String,
    pub assignment_id: String,
    /// Client-side file name; only its extension is kept.
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Operations the content store offers to its peers.
#[async_trait]
pub trait StoreApi: Send + Sync {
    /// Persist a file. Never retried.
    async fn ingest(&self, upload: Upload) -> ClientResult<IngestResponse>;

    /// Fingerprints of works submitted strictly before `before`, or of all
    /// works when `None`, ordered by id.
    async fn previous_works(
        &self,
        before: Option<OffsetDateTime>,
    ) -> ClientResult<Vec<PreviousWork>>;
}

/// HTTP client for the content store.
#[derive(Clone)]
pub struct StoreClient {
    base: HttpBase,
}

impl StoreClient {
    pub fn new(config: &UpstreamConfig) -> ClientResult<Self> {
        Ok(Self {
            base: HttpBase::new(config)?,
        })
    }
}

#[async_trait]
impl StoreApi for StoreClient {
    #[instrument(skip(self, upload), fields(size = upload.data.len()))]
    async fn ingest(&self, upload: Upload) -> ClientResult<IngestResponse> {
        const OP: &str = "store.ingest";
        let mut part = Part::bytes(upload.data.to_vec())
            .file_name(upload.file_name.unwrap_or_else(|| "upload.txt".to_string()));
        if let Some(content_type) = upload.content_type.as_deref() {
            part = part
                .mime_str(content_type)
                .map_err(|e| ClientError::Config(format!("content type: {e}")))?;
        }
        let form = Form::new()
            .text("student_id", upload.student_id)
            .text("assignment_id", upload.assignment_id)
            .part("file", part);

        let url = self.base.url("/works")?;
        let response = self
            .base
            .send_once(OP, self.base.post(url).multipart(form))
            .await?;
        decode_json(OP, response).await
    }

    #[instrument(skip(self))]
    async fn previous_works(
        &self,
        before: Option<OffsetDateTime>,
    ) -> ClientResult<Vec<PreviousWork>> {
        const OP: &str = "store.previous_works";
        let mut url = self.base.url("/previous_works")?;
        if let Some(before) = before {
            url.query_pairs_mut()
                .append_pair("before", &timestamp::format(before));
        }
        let response = self.base.get(OP, url).await?;
        let body: PreviousWorksResponse = decode_json(OP, response).await?;
        Ok(body.previous_works)
    }
}
