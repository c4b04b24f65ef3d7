//! Route Definitions

use super::handlers::*;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Build the relay router with all endpoints
pub fn create_router(state: Arc<RelayState>) -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/spin-slots", post(spin_slots_handler))
        .route("/api/play-mines", post(play_mines_handler))
        .route("/api/play-blackjack", post(play_blackjack_handler))
        .route("/api/play-crash", post(play_crash_handler))
        // Metrics endpoint for Prometheus
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}
