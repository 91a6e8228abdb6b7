//! Object key allocation for artifacts.

use uuid::Uuid;

/// Prefix under which artifact bytes are stored.
pub const ARTIFACT_PREFIX: &str = "works";

const DEFAULT_EXTENSION: &str = "txt";
const MAX_EXTENSION_LEN: usize = 16;

/// A freshly allocated, collision-free location for one artifact.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactKey {
    /// Full object key, `works/<uuid>.<ext>`.
    pub key: String,
    /// Last path segment of `key`.
    pub file_name: String,
}

impl ArtifactKey {
    /// Allocate a key whose extension follows the client-supplied file name.
    pub fn generate(client_file_name: Option<&str>) -> Self {
        let file_name = format!(
            "{}.{}",
            Uuid::new_v4(),
            file_extension(client_file_name.unwrap_or_default())
        );
        Self {
            key: format!("{ARTIFACT_PREFIX}/{file_name}"),
            file_name,
        }
    }
}

/// Extension for a stored object: the last `.`-separated segment of the
/// client file name when it is short and ASCII alphanumeric, else `txt`.
pub fn file_extension(client_file_name: &str) -> &str {
    // Only the final path segment counts, whatever separator the client used.
    let base = client_file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    match base.rsplit_once('.') {
        Some((_, ext))
            if !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.bytes().all(|b| b.is_ascii_alphanumeric()) =>
        {
            ext
        }
        _ => DEFAULT_EXTENSION,
    }
}
