//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API on its own, without the periodic patchlist refresh.
//!
//! ## Intended use
//! Useful for development and debugging. The workspace's main `patchlist-run` binary also
//! regenerates the patchlist at startup and keeps refreshing it on a timer.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use patchlist_core::{CoreConfig, PatchService};

/// Main entry point for the patchlist REST API server
///
/// # Environment Variables
/// - `PATCHLIST_REST_ADDR`: Server address (default: "127.0.0.1:5000")
/// - everything read by [`CoreConfig::from_env`]
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the configuration or ledger is invalid,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("PATCHLIST_REST_ADDR").unwrap_or_else(|_| "127.0.0.1:5000".into());

    tracing::info!("-- Starting patchlist REST API on {}", addr);

    let cfg = Arc::new(CoreConfig::from_env()?);
    let service = PatchService::open(cfg)?;
    let app = api_rest::router(AppState::new(service));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
