//! Typed HTTP clients for calls between Sleuth services.
//!
//! The detector reads from the content store; the gateway writes to the
//! content store and the detector. Each peer is reached through a trait
//! ([`StoreApi`], [`DetectorApi`]) so services can be wired to in-process
//! fakes in tests.
//!
//! Every client applies the per-call and connect timeouts from its
//! [`UpstreamConfig`](sleuth_core::config::UpstreamConfig). Idempotent reads
//! are retried at most once after a transport error or a 5xx; ingest and
//! analyze are never retried.

pub mod detector;
pub mod error;
mod http;
pub mod store;

pub use detector::{DetectorApi, DetectorClient};
pub use error::{ClientError, ClientResult};
pub use store::{StoreApi, StoreClient, Upload};
