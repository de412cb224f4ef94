use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use patchlist_core::{spawn_patchlist_refresh, CoreConfig, PatchService};

/// Main entry point for the patchlist manager
///
/// Opens the upload tree and the status ledger, writes a fresh patchlist, then serves the REST
/// API while the periodic patchlist refresh runs in the background.
///
/// # Environment Variables
/// - `HOST`: address to bind (default: "0.0.0.0")
/// - `PORT`: port to bind (default: 5000)
/// - everything read by [`CoreConfig::from_env`]
///
/// # Errors
/// Returns an error if:
/// - the configuration is invalid,
/// - the ledger is malformed and `ALLOW_LEDGER_RESET` is not set,
/// - the address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("patchlist_run=info".parse()?)
                .add_directive("patchlist_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = bind_addr_from_env_values(std::env::var("HOST").ok(), std::env::var("PORT").ok())?;
    let cfg = Arc::new(CoreConfig::from_env()?);

    tracing::info!(
        "uploads in {}, ledger {}, patchlist {}",
        cfg.upload_dir().display(),
        cfg.status_file().display(),
        cfg.patchlist_file().display()
    );

    let service = PatchService::open(cfg)?;
    let startup = service.clone();
    let entries = tokio::task::spawn_blocking(move || startup.regenerate_patchlist()).await??;
    tracing::info!("patchlist written with {} entries", entries);

    let refresh = spawn_patchlist_refresh(service.clone());

    let app = api_rest::router(AppState::new(service));

    tracing::info!("++ Starting patchlist manager on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    refresh.abort();
    tracing::info!("patchlist manager stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Resolve the listen address from `HOST` and `PORT` values.
///
/// `HOST` must be an IPv4 or IPv6 literal.
fn bind_addr_from_env_values(
    host: Option<String>,
    port: Option<String>,
) -> anyhow::Result<SocketAddr> {
    let host = host
        .map(|h| h.trim().to_owned())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "0.0.0.0".into());
    let ip: IpAddr = host
        .trim_start_matches('[')
        .trim_end_matches(']')
        .parse()
        .map_err(|e| anyhow::anyhow!("HOST must be an IP address, got {:?}: {}", host, e))?;
    let port: u16 = match port.as_deref().map(str::trim) {
        None | Some("") => 5000,
        Some(p) => p
            .parse()
            .map_err(|e| anyhow::anyhow!("PORT must be a port number, got {:?}: {}", p, e))?,
    };
    Ok(SocketAddr::new(ip, port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_addr_defaults() {
        let addr = bind_addr_from_env_values(None, None).unwrap();
        assert_eq!(addr, "0.0.0.0:5000".parse().unwrap());
    }

    #[test]
    fn test_bind_addr_overrides() {
        let addr =
            bind_addr_from_env_values(Some("127.0.0.1".into()), Some(" 8080 ".into())).unwrap();
        assert_eq!(addr, "127.0.0.1:8080".parse().unwrap());
    }

    #[test]
    fn test_bind_addr_accepts_ipv6() {
        let addr = bind_addr_from_env_values(Some("::".into()), None).unwrap();
        assert_eq!(addr, "[::]:5000".parse().unwrap());
        assert!(addr.is_ipv6());

        let addr = bind_addr_from_env_values(Some("[::1]".into()), Some("8080".into())).unwrap();
        assert_eq!(addr, "[::1]:8080".parse().unwrap());
    }

    #[test]
    fn test_bind_addr_rejects_hostname() {
        assert!(bind_addr_from_env_values(Some("example.invalid".into()), None).is_err());
    }

    #[test]
    fn test_bind_addr_rejects_bad_port() {
        assert!(bind_addr_from_env_values(None, Some("http".into())).is_err());
        assert!(bind_addr_from_env_values(None, Some("70000".into())).is_err());
    }
}
