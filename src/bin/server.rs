//! Server binary - single process serving the studio API.
//!
//! It wires up:
//! - Store backends (Redis when reachable, in-process otherwise)
//! - Outbound adapters (object storage, render worker) when configured
//! - The HTTP inbound adapter

use hypegate::adapters::backends::Backends;
use hypegate::clock::{Clock, SystemClock};
use hypegate::{create_router, AppConfig, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("hypegate=info,tower_http=info")),
        )
        .init();

    let config = AppConfig::from_env();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    if config.hmac_secret.is_empty() {
        warn!("EDGE_HMAC_SECRET is empty, requests are not authenticated");
    }
    if config.storage.is_none() {
        warn!("Storage not configured, storage operations will fail");
    }

    // 1. Backends
    let backends = Backends::select(config.redis_url.as_deref(), clock.clone()).await;
    backends.spawn_sweeper(SWEEP_INTERVAL);

    // 2. Application services
    let state = match AppState::build(&config, &backends, clock) {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "Failed to build application state");
            std::process::exit(1);
        }
    };

    // 3. HTTP layer
    let app = create_router(state);

    // 4. Start server
    let bind = format!("{}:{}", config.addr, config.port);
    let listener = match tokio::net::TcpListener::bind(&bind).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(address = %bind, error = %e, "Failed to bind TCP listener");
            std::process::exit(1);
        }
    };
    info!(address = %bind, backend = backends.name, "Listening");
    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    {
        error!(error = %e, "Server failed");
        std::process::exit(1);
    }
}
