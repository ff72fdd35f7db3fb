//! lyricgen-api - Lyric Generation Microservice
//!
//! **Module Identity:**
//! - Name: lyricgen-api
//! - Default port: 5780
//!
//! Generates lyrics and title candidates from a theme and emotion weights,
//! streaming the lyric body live over SSE and storing finished results.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use lyricgen_common::config::{
    default_config_path, prepare_root_folder, resolve_root_folder, TomlConfig, ROOT_FOLDER_ENV,
};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lyricgen_api::services::OpenAiTokenSource;
use lyricgen_api::{build_router, AppState};

/// Command-line arguments for lyricgen-api
#[derive(Parser, Debug)]
#[command(name = "lyricgen-api")]
#[command(about = "Lyric generation microservice")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides config file)
    #[arg(short, long, env = "LYRICGEN_PORT")]
    port: Option<u16>,

    /// Bootstrap config file
    #[arg(short, long, env = "LYRICGEN_CONFIG")]
    config: Option<PathBuf>,

    /// Folder holding the database
    #[arg(short, long, env = "LYRICGEN_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// OpenAI API key (overrides config file)
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    /// Model identifier (overrides config file)
    #[arg(long, env = "OPENAI_MODEL")]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().or_else(default_config_path);
    let mut config = TomlConfig::load_or_default(config_path.as_deref());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting lyricgen-api v{}", env!("CARGO_PKG_VERSION"));
    match &config_path {
        Some(path) if path.exists() => info!("Config file: {}", path.display()),
        _ => info!("No config file found, using defaults"),
    }

    if let Some(key) = args.openai_api_key {
        config.openai.api_key = Some(key);
    }
    if let Some(model) = args.model {
        config.openai.model = model;
    }
    let port = args.port.unwrap_or(config.port);

    info!(
        model = %config.openai.model,
        base_url = %config.openai.base_url,
        api_key_configured = config.openai.api_key.is_some(),
        pacing_interval_ms = config.streaming.pacing_interval_ms,
        "Configuration resolved"
    );

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), ROOT_FOLDER_ENV, &config);
    let db_path = prepare_root_folder(&root_folder)
        .with_context(|| format!("Failed to prepare root folder {}", root_folder.display()))?;
    info!("Database: {}", db_path.display());

    let pool = lyricgen_api::db::init_database(&db_path)
        .await
        .context("Failed to initialize database")?;
    info!("Database connection established");

    let token_source =
        OpenAiTokenSource::new(&config.openai).context("Failed to build OpenAI client")?;
    if config.openai.api_key.is_none() {
        tracing::warn!("No OpenAI API key configured; generation requests will fail");
    }

    let state = AppState::from_config(pool, Arc::new(token_source), &config.streaming);
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/api/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
