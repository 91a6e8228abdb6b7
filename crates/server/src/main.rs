//! Sleuth server binary. Runs one role per process.

use anyhow::{Context, Result};
use axum::Router;
use clap::{Parser, Subcommand};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use sleuth_client::{DetectorApi, DetectorClient, StoreApi, StoreClient};
use sleuth_core::{AppConfig, Role};
use sleuth_metadata::ArtifactRepo;
use sleuth_server::{
    DetectorState, GatewayState, StoreState, content_store_router, detector_router,
    gateway_router,
};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Sleuth - duplicate submission detection services
#[derive(Parser, Debug)]
#[command(name = "sleuthd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "SLEUTH_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    role: RoleCommand,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum RoleCommand {
    /// Persist works and answer fingerprint queries
    ContentStore,
    /// Evaluate works and keep reports
    Detector,
    /// Client entry point: store, then detect
    Gateway,
}

impl RoleCommand {
    fn role(self) -> Role {
        match self {
            Self::ContentStore => Role::ContentStore,
            Self::Detector => Role::Detector,
            Self::Gateway => Role::Gateway,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let role = args.role.role();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(%role, "Sleuth v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(args.config.as_deref())?;

    sleuth_server::metrics::register_metrics();
    tracing::info!("Prometheus metrics registered");

    let bind = config.server.bind.clone();
    let app = build_app(role, config).await?;

    let addr: SocketAddr = bind.parse().context("invalid bind address")?;
    tracing::info!(%role, "Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!(%role, "shut down");
    Ok(())
}

/// Merge the optional TOML file with `SLEUTH_`-prefixed environment
/// variables (`__` separates nested keys, e.g. `SLEUTH_SERVER__BIND`).
fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let mut figment = Figment::new();
    if let Some(path) = path {
        if !path.exists() {
            anyhow::bail!("config file {} does not exist", path.display());
        }
        tracing::info!(config_path = %path.display(), "Loading configuration from file");
        figment = figment.merge(Toml::file(path));
    } else {
        tracing::info!("No config file given, using defaults and environment variables");
    }

    figment
        .merge(Env::prefixed("SLEUTH_").split("__"))
        .extract()
        .context("failed to load configuration")
}

/// Validate the configuration for `role`, connect its backends and build
/// its router.
async fn build_app(role: Role, config: AppConfig) -> Result<Router> {
    config
        .validate_for(role)
        .map_err(|e| anyhow::anyhow!("invalid configuration for {role}: {e}"))?;

    match role {
        Role::ContentStore => {
            let storage = sleuth_storage::from_config(&config.storage)
                .await
                .context("failed to initialize storage")?;
            storage
                .health_check()
                .await
                .context("storage health check failed")?;
            tracing::info!(backend = storage.backend_name(), "Storage backend initialized");

            let metadata = sleuth_metadata::from_config(&config.metadata)
                .await
                .context("failed to initialize metadata store")?;
            tracing::info!(
                artifacts = metadata.count_artifacts().await?,
                "Metadata store initialized"
            );
            warn_if_open(&config);

            Ok(content_store_router(StoreState::new(
                config, storage, metadata,
            )))
        }
        Role::Detector => {
            let metadata = sleuth_metadata::from_config(&config.metadata)
                .await
                .context("failed to initialize metadata store")?;
            tracing::info!("Metadata store initialized");
            let store = store_client(&config)?;
            warn_if_open(&config);

            Ok(detector_router(DetectorState::new(config, metadata, store)))
        }
        Role::Gateway => {
            let store = store_client(&config)?;
            let detector_config = config
                .detector
                .as_ref()
                .context("gateway requires a [detector] section")?;
            let detector: Arc<dyn DetectorApi> = Arc::new(
                DetectorClient::new(detector_config).context("invalid detector upstream")?,
            );
            tracing::info!(url = %detector_config.url, "Detector client configured");

            Ok(gateway_router(GatewayState::new(config, store, detector)))
        }
    }
}

fn store_client(config: &AppConfig) -> Result<Arc<dyn StoreApi>> {
    let store_config = config
        .store
        .as_ref()
        .context("role requires a [store] section")?;
    let client = StoreClient::new(store_config).context("invalid store upstream")?;
    tracing::info!(url = %store_config.url, "Content store client configured");
    Ok(Arc::new(client))
}

fn warn_if_open(config: &AppConfig) {
    if config.auth.token_hash.is_none() {
        tracing::warn!("auth.token_hash not set, accepting unauthenticated service calls");
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
