//! Core domain types shared by the sleuth services.
//!
//! - Content fingerprints (SHA-256)
//! - Submission timestamp parsing and storage encoding
//! - Wire contracts between the content store, detector and gateway
//! - Configuration for every role

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod timestamp;
pub mod wire;

pub use config::{AppConfig, Role};
pub use error::{Error, Result};
pub use fingerprint::{Fingerprint, FingerprintHasher};
