//! Test servers for each role, wired together in-process.

use super::metadata::RejectingArtifacts;
use super::upstream::{RouterDetector, RouterStore};
use sleuth_client::{DetectorApi, StoreApi};
use sleuth_core::config::{AppConfig, AuthConfig, MetadataConfig, StorageConfig};
use sleuth_metadata::{MetadataStore, SqliteStore};
use sleuth_server::{
    DetectorState, GatewayState, StoreState, content_store_router, detector_router,
    gateway_router,
};
use sleuth_storage::{FilesystemBackend, ObjectStore};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

fn config_in(dir: &TempDir) -> AppConfig {
    AppConfig {
        storage: StorageConfig::Filesystem {
            path: dir.path().join("works"),
        },
        metadata: MetadataConfig::Sqlite {
            path: dir.path().join("metadata.db"),
            query_timeout_secs: None,
        },
        ..AppConfig::for_testing()
    }
}

async fn sqlite(dir: &TempDir) -> Arc<dyn MetadataStore> {
    Arc::new(
        SqliteStore::new(dir.path().join("metadata.db"), None)
            .await
            .expect("Failed to create metadata store"),
    )
}

/// A content store with temporary storage.
pub struct TestStore {
    pub router: axum::Router,
    pub state: StoreState,
    pub token: Option<String>,
    _temp_dir: TempDir,
}

impl TestStore {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// A content store requiring the test service token.
    pub async fn authenticated() -> Self {
        let mut store = Self::with_config(|config| config.auth = AuthConfig::for_testing()).await;
        store.token = Some(super::fixtures::SERVICE_TOKEN.to_string());
        store
    }

    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        Self::build(modifier, |metadata| metadata).await
    }

    /// A content store whose database refuses every artifact insert.
    pub async fn rejecting_inserts() -> (Self, Arc<RejectingArtifacts>) {
        let mut wrapper = None;
        let store = Self::build(
            |_| {},
            |inner| {
                let rejecting = Arc::new(RejectingArtifacts::new(inner));
                wrapper = Some(rejecting.clone());
                rejecting as Arc<dyn MetadataStore>
            },
        )
        .await;
        (store, wrapper.expect("metadata wrapper installed"))
    }

    async fn build<F, W>(modifier: F, wrap: W) -> Self
    where
        F: FnOnce(&mut AppConfig),
        W: FnOnce(Arc<dyn MetadataStore>) -> Arc<dyn MetadataStore>,
    {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let mut config = config_in(&temp_dir);
        modifier(&mut config);

        let storage: Arc<dyn ObjectStore> = Arc::new(
            FilesystemBackend::new(temp_dir.path().join("works"))
                .await
                .expect("Failed to create storage backend"),
        );
        let metadata = wrap(sqlite(&temp_dir).await);

        let state = StoreState::new(config, storage, metadata);
        let router = content_store_router(state.clone());
        Self {
            router,
            state,
            token: None,
            _temp_dir: temp_dir,
        }
    }

    /// Root directory of the filesystem object store.
    pub fn storage_root(&self) -> PathBuf {
        self._temp_dir.path().join("works")
    }

    /// This store as a peer of the detector or gateway.
    pub fn client(&self) -> Arc<dyn StoreApi> {
        Arc::new(RouterStore {
            router: self.router.clone(),
            token: self.token.clone(),
        })
    }
}

/// A detector with its own database.
pub struct TestDetector {
    pub router: axum::Router,
    pub state: DetectorState,
    pub token: Option<String>,
    _temp_dir: TempDir,
}

impl TestDetector {
    pub async fn new(store: Arc<dyn StoreApi>) -> Self {
        Self::with_config(store, |_| {}).await
    }

    pub async fn with_config<F>(store: Arc<dyn StoreApi>, modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let mut config = config_in(&temp_dir);
        modifier(&mut config);

        let metadata = sqlite(&temp_dir).await;
        let state = DetectorState::new(config, metadata, store);
        let router = detector_router(state.clone());
        Self {
            router,
            state,
            token: None,
            _temp_dir: temp_dir,
        }
    }

    pub fn client(&self) -> Arc<dyn DetectorApi> {
        Arc::new(RouterDetector {
            router: self.router.clone(),
            token: self.token.clone(),
        })
    }
}

/// The three roles wired together.
pub struct TestStack {
    pub store: TestStore,
    pub detector: TestDetector,
    pub gateway: axum::Router,
}

impl TestStack {
    pub async fn new() -> Self {
        let store = TestStore::new().await;
        let detector = TestDetector::new(store.client()).await;
        let gateway = test_gateway(store.client(), detector.client());
        Self {
            store,
            detector,
            gateway,
        }
    }

    /// Stack whose gateway talks to `detector` instead of the real one.
    pub async fn with_detector(detector_api: Arc<dyn DetectorApi>) -> Self {
        let store = TestStore::new().await;
        let detector = TestDetector::new(store.client()).await;
        let gateway = test_gateway(store.client(), detector_api);
        Self {
            store,
            detector,
            gateway,
        }
    }
}

/// A gateway in front of the given peers.
pub fn test_gateway(store: Arc<dyn StoreApi>, detector: Arc<dyn DetectorApi>) -> axum::Router {
    gateway_router(GatewayState::new(AppConfig::for_testing(), store, detector))
}
