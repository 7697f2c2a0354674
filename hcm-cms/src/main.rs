//! hcm-cms - content hierarchy and asset lifecycle service
//!
//! Serves the class → region → topic → lesson tree and the special article
//! collection as JSON, with a session-gated admin surface for mutations.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use hcm_cms::assets::FsAssetStore;
use hcm_cms::{build_router, AppState};
use hcm_common::config::{
    load_toml_config, resolve_config_path, CompiledDefaults, ConfigOverrides, ServerConfig,
};
use hcm_common::db::init_database;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for hcm-cms
#[derive(Parser, Debug)]
#[command(name = "hcm-cms")]
#[command(about = "Content hierarchy and asset lifecycle service")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "HCM_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(long, env = "HCM_HOST")]
    host: Option<String>,

    /// SQLite database file
    #[arg(short, long, env = "HCM_DATABASE")]
    database: Option<PathBuf>,

    /// Directory holding uploaded assets
    #[arg(long, env = "HCM_ASSET_ROOT")]
    asset_root: Option<PathBuf>,

    /// TOML config file (HCM_CONFIG is read by the config loader)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Admin login name
    #[arg(long, env = "HCM_ADMIN_USER")]
    admin_user: Option<String>,

    /// Admin password
    #[arg(long, env = "HCM_ADMIN_PASS", hide_env_values = true)]
    admin_pass: Option<String>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            host: self.host.clone(),
            port: self.port,
            database_path: self.database.clone(),
            asset_root: self.asset_root.clone(),
            admin_user: self.admin_user.clone(),
            admin_pass: self.admin_pass.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // The TOML layer may carry the log filter, so read it before tracing starts
    let config_path = resolve_config_path(args.config.as_deref());
    let toml_config = load_toml_config(config_path.as_deref())?;
    let config = ServerConfig::resolve(
        &args.overrides(),
        &toml_config,
        &CompiledDefaults::for_current_platform(),
    );

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Build identification first, before any slow startup work
    info!(
        "Starting hcm-cms v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("HCM_GIT_HASH"),
        env!("HCM_BUILD_TIMESTAMP"),
        env!("HCM_BUILD_PROFILE")
    );

    match &config_path {
        Some(path) if path.exists() => info!("Config file: {}", path.display()),
        _ => info!("No config file, using defaults"),
    }
    if config.admin_pass == "admin" {
        warn!("Admin password is the default; set HCM_ADMIN_PASS");
    }

    info!("Database path: {}", config.database_path.display());
    let pool = match init_database(&config.database_path, config.db_max_connections).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };

    let store = FsAssetStore::new(
        &config.asset_root,
        config.asset_url_prefix.clone(),
        config.max_upload_bytes,
    );
    store
        .ensure_root()
        .await
        .with_context(|| format!("Failed to create asset root {}", config.asset_root.display()))?;
    info!(
        "Asset root: {} served at {}",
        config.asset_root.display(),
        config.asset_url_prefix
    );

    let state = AppState::new(pool, Arc::new(store), &config);
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("hcm-cms listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
