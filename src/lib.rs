//! SVG to PDF Conversion Service Library
//!
//! This library provides the core functionality for the SVG to PDF HTTP service.
//! It exposes modules for request validation, SVG conversion, API key checks,
//! routing, and telemetry.
//!
//! ## Module Overview
//!
//! - `auth`: `X-API-Key` middleware
//! - `config`: Environment-driven configuration
//! - `conversion`: Conversion requests, validation and lifecycle
//! - `converter`: SVG to PDF conversion using svg2pdf
//! - `error`: HTTP error taxonomy
//! - `routes`: axum router and handlers
//! - `state`: Shared application state
//! - `telemetry`: OpenTelemetry integration and structured logging
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use svg2pdf_service::{config::Config, routes, state::AppState};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let addr = config.socket_addr();
//!
//!     let app = routes::router(AppState::with_svg2pdf(config));
//!     let listener = tokio::net::TcpListener::bind(addr).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod conversion;
pub mod converter;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;
