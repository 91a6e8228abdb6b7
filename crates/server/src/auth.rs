//! Service credential and trace-id middleware.

use crate::error::ApiError;
use crate::metrics;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use sha2::{Digest, Sha256};
use sleuth_core::config::AuthConfig;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Maximum length for trace IDs.
/// Longer trace IDs are truncated to prevent log bloat and potential log injection.
const MAX_TRACE_ID_LEN: usize = 128;

/// Paths reachable without the service credential.
const UNAUTHENTICATED_PATHS: &[&str] = &["/v1/health", "/metrics"];

/// Trace ID for request correlation.
#[derive(Clone, Debug)]
pub struct TraceId(pub String);

impl TraceId {
    /// Generate a new random trace ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create a trace ID from a client-provided value, keeping at most
    /// [`MAX_TRACE_ID_LEN`] printable ASCII characters.
    pub fn from_client(value: &str) -> Self {
        let sanitized: String = value
            .chars()
            .take(MAX_TRACE_ID_LEN)
            .filter(|c| c.is_ascii_graphic() || *c == ' ')
            .collect();

        if sanitized.trim().is_empty() {
            Self::new()
        } else {
            Self(sanitized)
        }
    }

    /// Get the trace ID as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inbound credential check for one service.
///
/// Disabled when no token hash is configured; the gateway always runs
/// with it disabled.
#[derive(Clone, Debug, Default)]
pub struct ServiceAuth {
    expected_hash: Option<Arc<str>>,
}

impl ServiceAuth {
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            expected_hash: config.expected_hash().map(Arc::from),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    fn check(&self, req: &Request) -> Result<(), ApiError> {
        let Some(expected) = self.expected_hash.as_deref() else {
            return Ok(());
        };
        if UNAUTHENTICATED_PATHS.contains(&req.uri().path()) {
            return Ok(());
        }
        let token = extract_bearer_token(req)
            .ok_or_else(|| ApiError::Unauthorized("service token required".to_string()))?;
        if hash_token(token) != expected {
            return Err(ApiError::Unauthorized("invalid service token".to_string()));
        }
        Ok(())
    }
}

/// Extract bearer token from Authorization header.
/// Per RFC 6750, the "Bearer" scheme is case-insensitive.
fn extract_bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            if v.len() >= 7 && v[..7].eq_ignore_ascii_case("bearer ") {
                Some(v[7..].trim())
            } else {
                None
            }
        })
}

/// Extract trace ID from X-Trace-Id header or generate a new one.
fn extract_or_generate_trace_id(req: &Request) -> TraceId {
    req.headers()
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .map(TraceId::from_client)
        .unwrap_or_else(TraceId::new)
}

/// Lowercase hex SHA-256 of a presented token.
pub fn hash_token(token: &str) -> String {
    Sha256::digest(token.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Assign a trace id, enforce the service credential and run the request
/// inside a span carrying the trace id.
pub async fn auth_middleware(
    State(auth): State<ServiceAuth>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let trace_id = extract_or_generate_trace_id(&req);
    let span = tracing::info_span!("request", trace_id = %trace_id);

    if let Err(e) = auth.check(&req) {
        metrics::AUTH_FAILURES.inc();
        span.in_scope(|| {
            tracing::warn!(path = %req.uri().path(), error = %e, "rejected request");
        });
        return Err(e);
    }

    Ok(next.run(req).instrument(span).await)
}
