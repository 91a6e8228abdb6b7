//! Route configuration, one router per role.

use crate::auth::{ServiceAuth, auth_middleware};
use crate::handlers;
use crate::metrics::metrics_handler;
use crate::state::{DetectorState, GatewayState, StoreState};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

/// Content store router.
pub fn content_store_router(state: StoreState) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.config.server.max_upload_bytes);
    let routes = Router::new()
        .route("/v1/health", get(handlers::store_health))
        .route("/works", post(handlers::ingest_work).layer(upload_limit))
        .route("/works/{work_id}/file", get(handlers::retrieve_work))
        .route("/previous_works", get(handlers::previous_works));

    let auth = state.auth();
    let metrics_enabled = state.config.server.metrics_enabled;
    finish(routes, auth, metrics_enabled).with_state(state)
}

/// Detector router.
pub fn detector_router(state: DetectorState) -> Router {
    let routes = Router::new()
        .route("/v1/health", get(handlers::detector_health))
        .route("/analyze/{work_id}", post(handlers::analyze_work))
        .route("/reports", get(handlers::list_reported_works))
        .route("/reports/{work_id}", get(handlers::get_report));

    let auth = state.auth();
    let metrics_enabled = state.config.server.metrics_enabled;
    finish(routes, auth, metrics_enabled).with_state(state)
}

/// Gateway router. Client-facing, so no service credential is required.
pub fn gateway_router(state: GatewayState) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.config.server.max_upload_bytes);
    let routes = Router::new()
        .route("/v1/health", get(handlers::gateway_health))
        .route("/upload", post(handlers::submit).layer(upload_limit))
        .route("/works/{work_id}/reports", get(handlers::get_review))
        .route("/v1/admin/unreported", get(handlers::reconcile));

    let metrics_enabled = state.config.server.metrics_enabled;
    finish(routes, ServiceAuth::disabled(), metrics_enabled).with_state(state)
}

/// Add the metrics endpoint (when enabled) and the shared middleware stack.
/// Order of execution: TraceLayer -> Auth/trace id -> Handler.
fn finish<S>(routes: Router<S>, auth: ServiceAuth, metrics_enabled: bool) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let mut router = routes;
    if metrics_enabled {
        router = router.route("/metrics", get(metrics_handler));
    }

    router
        .layer(middleware::from_fn_with_state(auth, auth_middleware))
        .layer(TraceLayer::new_for_http())
}
