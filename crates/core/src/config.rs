//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Which service a process runs as.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    ContentStore,
    Detector,
    Gateway,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ContentStore => "content-store",
            Self::Detector => "detector",
            Self::Gateway => "gateway",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum accepted upload body in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// Enable the /metrics endpoint for Prometheus scraping (default: true).
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_max_upload_bytes() -> usize {
    64 * 1024 * 1024
}

fn default_metrics_enabled() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_bytes: default_max_upload_bytes(),
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

/// Object storage configuration for artifact bytes.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem storage.
    Filesystem {
        /// Root directory for storage.
        path: PathBuf,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Filesystem {
            path: PathBuf::from("./data/works"),
        }
    }
}

/// PostgreSQL SSL mode configuration.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PgSslMode {
    /// Disable SSL/TLS entirely.
    Disable,
    /// Prefer SSL/TLS but allow unencrypted connections (default).
    #[default]
    Prefer,
    /// Require SSL/TLS for all connections.
    Require,
}

/// Metadata store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataConfig {
    /// SQLite database (single node).
    Sqlite {
        /// Database file path.
        path: PathBuf,
        /// Query duration in seconds after which a warning is logged.
        /// SQLite cannot cancel a running query.
        #[serde(default = "default_sqlite_query_timeout_secs")]
        query_timeout_secs: Option<u64>,
    },
    /// PostgreSQL database.
    Postgres {
        /// Connection URL. Takes precedence over individual fields.
        url: Option<String>,
        host: Option<String>,
        #[serde(default = "default_pg_port")]
        port: Option<u16>,
        username: Option<String>,
        /// Prefer SLEUTH_METADATA__PASSWORD over storing this in a file.
        password: Option<String>,
        database: Option<String>,
        ssl_mode: Option<PgSslMode>,
        /// Maximum connections in the pool.
        #[serde(default = "default_max_connections")]
        max_connections: u32,
        /// Statement timeout in milliseconds, enforced by the server.
        #[serde(default = "default_statement_timeout_ms")]
        statement_timeout_ms: Option<u64>,
    },
}

fn default_max_connections() -> u32 {
    10
}

fn default_pg_port() -> Option<u16> {
    Some(5432)
}

fn default_statement_timeout_ms() -> Option<u64> {
    Some(30_000)
}

fn default_sqlite_query_timeout_secs() -> Option<u64> {
    Some(30)
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("./data/metadata.db"),
            query_timeout_secs: default_sqlite_query_timeout_secs(),
        }
    }
}

impl MetadataConfig {
    /// Validate metadata configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            MetadataConfig::Sqlite { .. } => Ok(()),
            MetadataConfig::Postgres {
                url,
                host,
                database,
                max_connections,
                ..
            } => {
                if *max_connections == 0 {
                    return Err("postgres max_connections must be at least 1".to_string());
                }
                match (url.as_ref(), host.as_ref(), database.as_ref()) {
                    (Some(_), _, _) => Ok(()),
                    (None, Some(_), Some(_)) => Ok(()),
                    (None, None, _) => Err(
                        "postgres config requires either 'url' or 'host' + 'database'".to_string(),
                    ),
                    (None, Some(_), None) => Err(
                        "postgres config requires 'database' when using individual fields"
                            .to_string(),
                    ),
                }
            }
        }
    }
}

/// Service credential checked on inbound requests.
///
/// When `token_hash` is set, every request except health and metrics must
/// carry `Authorization: Bearer <token>` whose SHA-256 matches.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// SHA-256 hex of the service token, optionally prefixed with `sha256:`.
    /// Generate with: `echo -n "your-secret-token" | sha256sum`
    #[serde(default)]
    pub token_hash: Option<String>,
}

impl AuthConfig {
    /// Normalized (lowercase, unprefixed) token hash, if configured.
    pub fn expected_hash(&self) -> Option<String> {
        self.token_hash.as_deref().map(|h| {
            h.trim()
                .strip_prefix("sha256:")
                .unwrap_or(h.trim())
                .to_ascii_lowercase()
        })
    }

    pub fn validate(&self) -> Result<(), String> {
        if let Some(hash) = self.expected_hash()
            && (hash.len() != 64 || !hash.bytes().all(|b| b.is_ascii_hexdigit()))
        {
            return Err("auth.token_hash must be 64 hex characters (SHA-256)".to_string());
        }
        Ok(())
    }

    /// Test configuration expecting the token `test-service-token`.
    pub fn for_testing() -> Self {
        Self {
            // SHA256 of "test-service-token"
            token_hash: Some(
                "sha256:a954fc0f2f00bb3a8a29a4556649ac783d8f79c67c421e4b6b75975d2f715c22"
                    .to_string(),
            ),
        }
    }
}

/// Connection settings for a peer service.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL, e.g. "http://127.0.0.1:8081".
    pub url: String,
    /// Bearer token attached to every call.
    #[serde(default)]
    pub token: Option<String>,
    /// Per-call timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Retry idempotent reads once after a transport error or 5xx.
    #[serde(default = "default_retry_reads")]
    pub retry_reads: bool,
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_connect_timeout_ms() -> u64 {
    2_000
}

fn default_retry_reads() -> bool {
    true
}

impl UpstreamConfig {
    /// Upstream at `url` with default timeouts and no token.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: None,
            timeout_ms: default_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            retry_reads: default_retry_reads(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn validate(&self, name: &str) -> Result<(), String> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(format!("{name}.url must be an http(s) URL, got {:?}", self.url));
        }
        if self.timeout_ms == 0 || self.connect_timeout_ms == 0 {
            return Err(format!("{name} timeouts must be greater than 0"));
        }
        Ok(())
    }
}

/// Complete application configuration.
///
/// One file serves any role; each role only reads the sections it needs
/// and [`AppConfig::validate_for`] checks that those are present.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    /// Artifact byte storage (content store only).
    #[serde(default)]
    pub storage: StorageConfig,
    /// Metadata database (content store and detector).
    #[serde(default)]
    pub metadata: MetadataConfig,
    /// Inbound service credential (content store and detector).
    #[serde(default)]
    pub auth: AuthConfig,
    /// Content store upstream (detector and gateway).
    #[serde(default)]
    pub store: Option<UpstreamConfig>,
    /// Detector upstream (gateway).
    #[serde(default)]
    pub detector: Option<UpstreamConfig>,
}

impl AppConfig {
    /// Validate the sections `role` depends on.
    pub fn validate_for(&self, role: Role) -> Result<(), String> {
        if self.server.max_upload_bytes == 0 {
            return Err("server.max_upload_bytes must be greater than 0".to_string());
        }
        match role {
            Role::ContentStore => {
                self.metadata.validate()?;
                self.auth.validate()
            }
            Role::Detector => {
                self.metadata.validate()?;
                self.auth.validate()?;
                required(&self.store, "store", role)?.validate("store")
            }
            Role::Gateway => {
                required(&self.store, "store", role)?.validate("store")?;
                required(&self.detector, "detector", role)?.validate("detector")
            }
        }
    }

    /// Create a test configuration with sensible defaults.
    ///
    /// **For testing only.** Uses filesystem storage, SQLite metadata and
    /// no service credential.
    pub fn for_testing() -> Self {
        Self::default()
    }
}

fn required<'a>(
    upstream: &'a Option<UpstreamConfig>,
    name: &str,
    role: Role,
) -> Result<&'a UpstreamConfig, String> {
    upstream
        .as_ref()
        .ok_or_else(|| format!("role {role} requires a [{name}] upstream section"))
}
