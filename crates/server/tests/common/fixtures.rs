//! Request builders and response helpers.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use bytes::Bytes;
use serde_json::Value;
use tower::ServiceExt;

/// Bearer token matching `AuthConfig::for_testing()`.
pub const SERVICE_TOKEN: &str = "test-service-token";

const BOUNDARY: &str = "sleuth-test-boundary-7d1f";

/// Deterministic pseudo-random bytes; same seed, same output.
pub fn seeded_bytes(seed: u64, len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    let mut state = seed;
    for chunk in data.chunks_mut(8) {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        let bytes = state.to_le_bytes();
        chunk.copy_from_slice(&bytes[..chunk.len()]);
    }
    data
}

/// One part of a multipart submission form.
pub enum FormPart<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        data: &'a [u8],
    },
}

/// Encode a multipart/form-data body. Returns the content type and body.
pub fn multipart_body(parts: &[FormPart<'_>]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            FormPart::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            FormPart::File {
                name,
                file_name,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

/// The standard three-part submission form.
pub fn submission(
    student_id: &str,
    assignment_id: &str,
    file_name: &str,
    data: &[u8],
) -> (String, Vec<u8>) {
    multipart_body(&[
        FormPart::Text("student_id", student_id),
        FormPart::Text("assignment_id", assignment_id),
        FormPart::File {
            name: "file",
            file_name,
            data,
        },
    ])
}

/// Build a request with optional bearer token.
pub fn request(
    method: &str,
    uri: &str,
    content_type: Option<&str>,
    body: Vec<u8>,
    token: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(content_type) = content_type {
        builder = builder.header("Content-Type", content_type);
    }
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body)).unwrap()
}

/// Send a request and collect status and raw body.
pub async fn send(router: &axum::Router, request: Request<Body>) -> (StatusCode, Bytes) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body)
}

/// Send a request and parse the body as JSON (`Null` when empty or not JSON).
pub async fn send_json(router: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(router, request).await;
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, json)
}

/// GET with an optional token, parsed as JSON.
pub async fn get_json(router: &axum::Router, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
    send_json(router, request("GET", uri, None, Vec::new(), token)).await
}

/// POST a multipart submission, parsed as JSON.
pub async fn post_form(
    router: &axum::Router,
    uri: &str,
    (content_type, body): (String, Vec<u8>),
    token: Option<&str>,
) -> (StatusCode, Value) {
    send_json(router, request("POST", uri, Some(&content_type), body, token)).await
}

/// POST a JSON body, parsed as JSON.
pub async fn post_json(
    router: &axum::Router,
    uri: &str,
    body: &Value,
    token: Option<&str>,
) -> (StatusCode, Value) {
    send_json(
        router,
        request(
            "POST",
            uri,
            Some("application/json"),
            serde_json::to_vec(body).unwrap(),
            token,
        ),
    )
    .await
}

/// Percent-encode a timestamp for use in a query string.
pub fn query_value(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('+', "%2B")
        .replace(' ', "%20")
        .replace(':', "%3A")
}
