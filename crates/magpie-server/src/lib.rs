//! Magpie Server
//!
//! HTTP surface for the page ingestion and query pipeline: crawl URLs into
//! the canonical store, search the corpus by similarity, and answer
//! questions over it with retrieval-augmented generation.

#![warn(missing_docs)]

pub mod app;
pub mod config;
pub mod handlers;

use app::Pipeline;
use config::ServerConfig;
use handlers::{create_router, AppState};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Server error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Pipeline initialization error
    #[error("Initialization error: {0}")]
    Init(String),

    /// Server binding error
    #[error("Failed to bind server: {0}")]
    Bind(#[from] std::io::Error),

    /// Server error
    #[error("Server error: {0}")]
    Server(String),
}

/// Start the HTTP server
///
/// Initializes tracing, assembles the pipeline from configuration,
/// and serves the axum router until shutdown.
pub async fn start_server(config: ServerConfig) -> Result<(), ServerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting Magpie server");
    info!("Bind address: {}", config.bind_addr());
    info!("Database path: {}", config.database_path);

    let pipeline =
        Pipeline::from_config(&config).map_err(|e| ServerError::Init(e.to_string()))?;
    info!("LLM provider: {}", pipeline.current_provider());

    let state = AppState {
        pipeline: Arc::new(pipeline),
    };

    let app = create_router(state);

    let listener = TcpListener::bind(&config.bind_addr()).await?;
    info!("Server listening on {}", config.bind_addr());

    axum::serve(listener, app)
        .await
        .map_err(|e| ServerError::Server(e.to_string()))?;

    Ok(())
}
