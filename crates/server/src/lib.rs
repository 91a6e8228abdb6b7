//! HTTP services for Sleuth.
//!
//! One crate serves all three roles:
//! - Content store: persists works, answers "fingerprints before T"
//! - Detector: evaluates works against strictly earlier ones, keeps reports
//! - Gateway: sequences store-then-detect for clients, reconciliation

pub mod auth;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod routes;
pub mod state;

pub use auth::{ServiceAuth, TraceId};
pub use error::ApiError;
pub use routes::{content_store_router, detector_router, gateway_router};
pub use state::{DetectorState, GatewayState, StoreState};
