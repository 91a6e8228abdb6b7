//! Per-role application state shared across handlers.

use crate::auth::ServiceAuth;
use sleuth_client::{DetectorApi, StoreApi};
use sleuth_core::config::AppConfig;
use sleuth_metadata::MetadataStore;
use sleuth_storage::ObjectStore;
use std::sync::Arc;

/// Content store state: artifact bytes and their records.
#[derive(Clone)]
pub struct StoreState {
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn ObjectStore>,
    pub metadata: Arc<dyn MetadataStore>,
}

impl StoreState {
    pub fn new(
        config: AppConfig,
        storage: Arc<dyn ObjectStore>,
        metadata: Arc<dyn MetadataStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            storage,
            metadata,
        }
    }

    pub fn auth(&self) -> ServiceAuth {
        ServiceAuth::from_config(&self.config.auth)
    }
}

/// Detector state: reports plus a client for the content store.
#[derive(Clone)]
pub struct DetectorState {
    pub config: Arc<AppConfig>,
    pub metadata: Arc<dyn MetadataStore>,
    pub store: Arc<dyn StoreApi>,
}

impl DetectorState {
    pub fn new(
        config: AppConfig,
        metadata: Arc<dyn MetadataStore>,
        store: Arc<dyn StoreApi>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            metadata,
            store,
        }
    }

    pub fn auth(&self) -> ServiceAuth {
        ServiceAuth::from_config(&self.config.auth)
    }
}

/// Gateway state. The gateway persists nothing of its own.
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn StoreApi>,
    pub detector: Arc<dyn DetectorApi>,
}

impl GatewayState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn StoreApi>,
        detector: Arc<dyn DetectorApi>,
    ) -> Self {
        if config.auth.token_hash.is_some() {
            tracing::warn!("auth.token_hash is ignored by the gateway; its routes are public");
        }
        Self {
            config: Arc::new(config),
            store,
            detector,
        }
    }
}
