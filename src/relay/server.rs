//! Relay Server
//!
//! Binds the relay router behind request-id, CORS, timeout and HTTP tracing
//! layers and serves it until Ctrl+C or SIGTERM.

use super::{
    errors::RelayError,
    forwarder::Forwarder,
    handlers::RelayState,
    metrics::RelayMetrics,
    middleware::{create_cors_layer, request_id_middleware},
    routes::create_router,
};
use crate::config::RelayConfig;
use axum::Router;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{info, warn};

/// Router with the full middleware stack
pub fn build_app(state: Arc<RelayState>, config: &RelayConfig) -> Router {
    create_router(state)
        // Request ID middleware (first for tracing)
        .layer(axum::middleware::from_fn(request_id_middleware))
        // CORS layer (before timeout to handle preflight)
        .layer(create_cors_layer(&config.allowed_origins))
        .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
        .layer(TraceLayer::new_for_http())
}

pub struct RelayServer {
    config: RelayConfig,
    forwarder: Arc<dyn Forwarder>,
}

impl RelayServer {
    pub fn new(config: RelayConfig, forwarder: Arc<dyn Forwarder>) -> Self {
        Self { config, forwarder }
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, RelayError> {
        let ip = self.config.host.parse::<std::net::IpAddr>().map_err(|e| {
            RelayError::NotConfigured(format!("invalid listen host '{}': {}", self.config.host, e))
        })?;
        Ok(SocketAddr::from((ip, self.config.port)))
    }

    /// Serve until a shutdown signal arrives
    pub async fn run(self) -> Result<(), RelayError> {
        let metrics = Arc::new(RelayMetrics::new()?);
        let state = Arc::new(RelayState::new(self.forwarder.clone(), metrics));
        let app = build_app(state, &self.config);
        let addr = self.socket_addr()?;

        let listener = tokio::net::TcpListener::bind(addr).await?;
        self.log_server_info(addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Relay server stopped gracefully");
        Ok(())
    }

    fn log_server_info(&self, addr: SocketAddr) {
        info!("Casino relay running on http://{}", addr);
        info!("   Chain id: {:?}", self.forwarder.chain_id());
        info!("   CORS: {:?}", self.config.allowed_origins);
        info!("   Request timeout: {}s", self.config.request_timeout_secs);
        info!("   Gas limit: {}", self.config.gas_limit);
        info!("Available endpoints:");
        info!("   GET  /api/health");
        info!("   POST /api/spin-slots");
        info!("   POST /api/play-mines");
        info!("   POST /api/play-blackjack");
        info!("   POST /api/play-crash");
        info!("   GET  /metrics");
    }
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("failed to listen for Ctrl+C: {}", e);
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
                warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}
