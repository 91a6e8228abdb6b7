//! Prometheus metrics for the sleuth services.
//!
//! Every role registers the same set; counters a role never touches stay at
//! zero. The `/metrics` endpoint is unauthenticated so Prometheus can scrape
//! it, and must be network-restricted to the scraper in deployment.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    self, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Content store
pub static WORKS_INGESTED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "sleuth_store_works_ingested_total",
        "Total number of works persisted by the content store",
    )
    .expect("metric creation failed")
});

pub static BYTES_INGESTED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "sleuth_store_bytes_ingested_total",
        "Total bytes persisted by the content store",
    )
    .expect("metric creation failed")
});

pub static INGEST_ERRORS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "sleuth_store_ingest_errors_total",
            "Failed ingests by the stage that failed",
        ),
        &["stage"],
    )
    .expect("metric creation failed")
});

pub static INGEST_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "sleuth_store_ingest_duration_seconds",
            "Time taken to persist one work",
        )
        .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
    )
    .expect("metric creation failed")
});

// Detector
pub static EVALUATIONS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "sleuth_detector_evaluations_total",
            "Completed evaluations by verdict",
        ),
        &["verdict"],
    )
    .expect("metric creation failed")
});

pub static EVALUATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "sleuth_detector_evaluation_duration_seconds",
            "Time taken to evaluate one work, including the content store query",
        )
        .buckets(vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
    )
    .expect("metric creation failed")
});

// Gateway
pub static SUBMISSIONS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "sleuth_gateway_submissions_total",
            "Submissions handled by the gateway by outcome",
        ),
        &["outcome"],
    )
    .expect("metric creation failed")
});

pub static STORED_WITHOUT_REPORT: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "sleuth_gateway_stored_without_report_total",
        "Works stored by the content store whose evaluation failed",
    )
    .expect("metric creation failed")
});

// Shared
pub static UPSTREAM_FAILURES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "sleuth_upstream_failures_total",
            "Failed calls to peer services by peer",
        ),
        &["peer"],
    )
    .expect("metric creation failed")
});

pub static AUTH_FAILURES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "sleuth_auth_failures_total",
        "Requests rejected for a missing or invalid service token",
    )
    .expect("metric creation failed")
});

static REGISTER_ONCE: Once = Once::new();

/// Register all metrics with the global registry. Safe to call repeatedly.
pub fn register_metrics() {
    REGISTER_ONCE.call_once(|| {
        REGISTRY
            .register(Box::new(WORKS_INGESTED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(BYTES_INGESTED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(INGEST_ERRORS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(INGEST_DURATION.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(EVALUATIONS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(EVALUATION_DURATION.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(SUBMISSIONS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(STORED_WITHOUT_REPORT.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(UPSTREAM_FAILURES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(AUTH_FAILURES.clone()))
            .expect("metric registration failed");
    });
}

/// GET /metrics - Prometheus text exposition.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}

pub fn record_ingest_error(stage: &str) {
    INGEST_ERRORS.with_label_values(&[stage]).inc();
}

pub fn record_evaluation(plagiarism: bool) {
    let verdict = if plagiarism { "plagiarism" } else { "original" };
    EVALUATIONS.with_label_values(&[verdict]).inc();
}

pub fn record_submission(outcome: &str) {
    SUBMISSIONS.with_label_values(&[outcome]).inc();
}

pub fn record_upstream_failure(peer: &str) {
    UPSTREAM_FAILURES.with_label_values(&[peer]).inc();
}
