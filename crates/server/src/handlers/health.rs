//! Health endpoints, one per role.

use crate::error::ApiResult;
use crate::state::{DetectorState, GatewayState, StoreState};
use axum::Json;
use axum::extract::State;
use sleuth_core::Role;
use sleuth_core::wire::HealthResponse;

fn healthy(role: Role) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        role: role.as_str().to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /v1/health - content store; checks the database and object store.
pub async fn store_health(State(state): State<StoreState>) -> ApiResult<Json<HealthResponse>> {
    state.metadata.health_check().await?;
    state.storage.health_check().await?;
    Ok(healthy(Role::ContentStore))
}

/// GET /v1/health - detector; checks its database.
pub async fn detector_health(
    State(state): State<DetectorState>,
) -> ApiResult<Json<HealthResponse>> {
    state.metadata.health_check().await?;
    Ok(healthy(Role::Detector))
}

/// GET /v1/health - gateway. Stateless, so always healthy; peers are
/// probed through their own endpoints.
pub async fn gateway_health(State(_state): State<GatewayState>) -> Json<HealthResponse> {
    healthy(Role::Gateway)
}
