//! SVG to PDF Conversion Service
//!
//! Serves `POST /v1/convert/svg` (JSON) and `POST /v1/convert/svg/file`
//! (multipart), converting SVG documents to vector PDF via svg2pdf.
//!
//! ## Configuration
//!
//! Environment variables (an optional `.env` file is loaded first):
//! - `API_KEY`: Shared secret required in the `X-API-Key` header
//! - `HOST` / `PORT`: Bind address (default: 0.0.0.0:8000)
//! - `CONVERSION_TIMEOUT_SECS`: Per-conversion timeout (default: 30)
//! - `MAX_UPLOAD_BYTES`: Request body limit (default: 10 MiB)
//! - `LOAD_SYSTEM_FONTS`: Load installed fonts for `<text>` (default: true)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP collector endpoint (telemetry off if unset)
//! - `LOG_FORMAT`: `text` or `json` (default: text)
//! - `OTEL_SERVICE_NAME`: Service name for exported spans (default: svg2pdf-service)
//! - `RUST_LOG`: Log level (default: info)

use anyhow::{Context, Result};
use svg2pdf_service::config::{Config, LogFormat};
use svg2pdf_service::{routes, state::AppState, telemetry};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("Failed to load configuration")?;

    // Initialize tracing
    let json = config.log_format == LogFormat::Json;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();

    if let Some(endpoint) = &config.otlp_endpoint {
        if let Err(e) = telemetry::init_telemetry(endpoint, &config.otel_service_name) {
            warn!("Failed to initialize telemetry: {}", e);
        }
    }

    info!("Starting SVG to PDF service v{}", env!("CARGO_PKG_VERSION"));
    info!(?config, "Configuration loaded");
    if config.api_key.is_none() {
        warn!("API_KEY is not set; conversion requests will be rejected with 500");
    }

    let addr = config.socket_addr();
    let app = routes::router(AppState::with_svg2pdf(config));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    telemetry::shutdown_telemetry();
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
