//! Shared request plumbing: base URL, bearer token, timeouts and the
//! read-retry policy.

use crate::error::{ClientError, ClientResult};
use reqwest::{Response, Url};
use serde::de::DeserializeOwned;
use sleuth_core::config::UpstreamConfig;

/// Longest error body kept in a [`ClientError::Status`].
const MAX_ERROR_BODY: usize = 1024;

#[derive(Clone)]
pub(crate) struct HttpBase {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
    retry_reads: bool,
}

impl HttpBase {
    pub(crate) fn new(config: &UpstreamConfig) -> ClientResult<Self> {
        // A trailing slash makes relative joins append instead of replace.
        let raw = if config.url.ends_with('/') {
            config.url.clone()
        } else {
            format!("{}/", config.url)
        };
        let base_url = Url::parse(&raw).map_err(|e| ClientError::InvalidUrl {
            url: config.url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ClientError::InvalidUrl {
                url: config.url.clone(),
                reason: "scheme must be http or https".to_string(),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| ClientError::Config(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            token: config.token.clone(),
            retry_reads: config.retry_reads,
        })
    }

    pub(crate) fn url(&self, path: &str) -> ClientResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ClientError::InvalidUrl {
                url: format!("{}{path}", self.base_url),
                reason: e.to_string(),
            })
    }

    pub(crate) fn post(&self, url: Url) -> reqwest::RequestBuilder {
        self.authorized(self.http.post(url))
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Send a request exactly once.
    pub(crate) async fn send_once(
        &self,
        op: &'static str,
        req: reqwest::RequestBuilder,
    ) -> ClientResult<Response> {
        req.send()
            .await
            .map_err(|source| ClientError::Transport { op, source })
    }

    /// GET `url`, retrying once after a transport error or a 5xx when
    /// read retries are enabled.
    pub(crate) async fn get(&self, op: &'static str, url: Url) -> ClientResult<Response> {
        let attempts = if self.retry_reads { 2 } else { 1 };
        let mut attempt = 1;
        loop {
            let result = self.authorized(self.http.get(url.clone())).send().await;
            let retryable = match &result {
                Err(_) => true,
                Ok(response) => response.status().is_server_error(),
            };
            if retryable && attempt < attempts {
                match &result {
                    Err(err) => tracing::warn!(op, error = %err, "retrying read"),
                    Ok(response) => {
                        tracing::warn!(op, status = response.status().as_u16(), "retrying read")
                    }
                }
                attempt += 1;
                continue;
            }
            return result.map_err(|source| ClientError::Transport { op, source });
        }
    }
}

/// Fail on non-2xx, then decode the body as JSON.
pub(crate) async fn decode_json<T: DeserializeOwned>(
    op: &'static str,
    response: Response,
) -> ClientResult<T> {
    let response = error_for_status(op, response).await?;
    let body = response
        .bytes()
        .await
        .map_err(|source| ClientError::Transport { op, source })?;
    serde_json::from_slice(&body).map_err(|e| ClientError::Decode {
        op,
        reason: e.to_string(),
    })
}

pub(crate) async fn error_for_status(
    op: &'static str,
    response: Response,
) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }
    Err(ClientError::Status {
        op,
        status: status.as_u16(),
        body,
    })
}
