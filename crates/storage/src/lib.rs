//! Object storage for submitted artifact bytes.
//!
//! This crate provides:
//! - The [`ObjectStore`] abstraction used by the content store
//! - A local filesystem backend with atomic writes and streaming reads
//! - Object key allocation for new artifacts

pub mod backends;
pub mod error;
pub mod keys;
pub mod traits;

pub use backends::filesystem::FilesystemBackend;
pub use error::{StorageError, StorageResult};
pub use keys::{ArtifactKey, file_extension};
pub use traits::{ByteStream, ObjectMeta, ObjectStore};

use sleuth_core::config::StorageConfig;
use std::sync::Arc;

/// Create an object store from configuration.
pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn ObjectStore>> {
    match config {
        StorageConfig::Filesystem { path } => {
            if path.as_os_str().is_empty() {
                return Err(StorageError::Config(
                    "filesystem storage path must not be empty".to_string(),
                ));
            }
            let backend = FilesystemBackend::new(path).await?;
            Ok(Arc::new(backend))
        }
    }
}
