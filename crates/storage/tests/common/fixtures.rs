use bytes::Bytes;
use futures::TryStreamExt;
use sleuth_storage::{FilesystemBackend, ObjectStore};
use std::sync::Arc;
use tempfile::TempDir;

/// Generate deterministic test data using a seeded pseudo-random generator.
/// Same seed produces same output.
pub fn seeded_bytes(seed: u64, len: usize) -> Bytes {
    let mut data = vec![0u8; len];
    let mut state = seed;

    // Simple LCG (Linear Congruential Generator)
    for chunk in data.chunks_mut(8) {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        let bytes = state.to_le_bytes();
        for (i, byte) in chunk.iter_mut().enumerate() {
            *byte = bytes[i % 8];
        }
    }

    Bytes::from(data)
}

/// A filesystem backend in a fresh temp dir. Keep the `TempDir` alive.
pub async fn temp_backend() -> (TempDir, Arc<FilesystemBackend>) {
    let dir = TempDir::new().unwrap();
    let backend = FilesystemBackend::new(dir.path()).await.unwrap();
    (dir, Arc::new(backend))
}

/// Read a whole object through its stream.
pub async fn read_all(backend: &FilesystemBackend, key: &str) -> Bytes {
    let chunks: Vec<Bytes> = backend
        .get_stream(key)
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();
    Bytes::from(chunks.concat())
}
