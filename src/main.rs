use std::path::PathBuf;

use anyhow::anyhow;
use clap::Parser;
use http::{Method, header::CONTENT_TYPE};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tts_manager::{ServerConfig, handlers, routes, state::AppState};

/// TTS manager - real-time speaking sessions for PBX calls
#[derive(Parser, Debug)]
#[command(name = "tts-manager")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Must be installed before the first vendor WebSocket is opened
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install default crypto provider"))?;

    let cli = Cli::parse();

    let config = if let Some(config_path) = cli.config {
        info!("Loading configuration from {}", config_path.display());
        ServerConfig::from_file(&config_path).map_err(|e| anyhow!(e.to_string()))?
    } else {
        ServerConfig::from_env().map_err(|e| anyhow!(e.to_string()))?
    };

    if config.elevenlabs_api_key.is_none() {
        info!("ELEVENLABS_API_KEY not set, speaking sessions will fail to synthesize");
    }

    let address = config.address();
    let streaming_address = config.streaming_listen_address.clone();
    info!(pod_id = %config.pod_id, "Starting tts-manager");

    let app_state = AppState::new(config).map_err(|e| anyhow!(e.to_string()))?;

    // PBX media listener
    let media_listener = TcpListener::bind(&streaming_address)
        .await
        .map_err(|e| anyhow!("Failed to bind media listener on {streaming_address}: {e}"))?;
    let streaming = app_state.streaming.clone();
    let media_task = tokio::spawn(streaming.serve(media_listener));

    let public_routes =
        axum::Router::new().route("/", axum::routing::get(handlers::api::health_check));

    let cors_layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(false);

    let app = public_routes
        .merge(routes::api::create_api_router())
        .with_state(app_state.clone())
        .layer(cors_layer);

    let listener = TcpListener::bind(&address)
        .await
        .map_err(|e| anyhow!("Failed to bind API listener on {address}: {e}"))?;
    info!("API listening on {}", address);

    let shutdown_state = app_state.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutting down");
            shutdown_state.streaming.shutdown();
        })
        .await?;

    match media_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("Media listener failed: {}", e),
        Err(e) => error!("Media listener task panicked: {}", e),
    }

    Ok(())
}
