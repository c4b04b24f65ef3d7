//! Request Handlers
//!
//! Every game route validates its fields, encodes the game call and hands it
//! to the forwarder. The handlers hold no state beyond the shared metrics.

use super::{
    calldata::{encode_game_call, missing_fields_message, require_fields, wager_wei},
    errors::RelayError,
    forwarder::{parse_address, ForwardCall, Forwarder},
    metrics::RelayMetrics,
    middleware::RequestId,
    models::{HealthResponse, PlayRequest, PlayResponse},
};
use crate::games::types::GameType;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::header,
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Shared application state
pub struct RelayState {
    pub forwarder: Arc<dyn Forwarder>,
    pub metrics: Arc<RelayMetrics>,
}

impl RelayState {
    pub fn new(forwarder: Arc<dyn Forwarder>, metrics: Arc<RelayMetrics>) -> Self {
        Self { forwarder, metrics }
    }
}

/// GET /api/health
pub async fn health_handler(State(state): State<Arc<RelayState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        chain_id: state.forwarder.chain_id(),
    })
}

/// POST /api/spin-slots
pub async fn spin_slots_handler(
    request_id: Option<Extension<RequestId>>,
    State(state): State<Arc<RelayState>>,
    request: Result<Json<PlayRequest>, JsonRejection>,
) -> Result<Json<PlayResponse>, RelayError> {
    relay_play(&state, GameType::Slots, request, request_id).await
}

/// POST /api/play-mines
pub async fn play_mines_handler(
    request_id: Option<Extension<RequestId>>,
    State(state): State<Arc<RelayState>>,
    request: Result<Json<PlayRequest>, JsonRejection>,
) -> Result<Json<PlayResponse>, RelayError> {
    relay_play(&state, GameType::Mines, request, request_id).await
}

/// POST /api/play-blackjack
pub async fn play_blackjack_handler(
    request_id: Option<Extension<RequestId>>,
    State(state): State<Arc<RelayState>>,
    request: Result<Json<PlayRequest>, JsonRejection>,
) -> Result<Json<PlayResponse>, RelayError> {
    relay_play(&state, GameType::Blackjack, request, request_id).await
}

/// POST /api/play-crash
pub async fn play_crash_handler(
    request_id: Option<Extension<RequestId>>,
    State(state): State<Arc<RelayState>>,
    request: Result<Json<PlayRequest>, JsonRejection>,
) -> Result<Json<PlayResponse>, RelayError> {
    relay_play(&state, GameType::Crash, request, request_id).await
}

/// GET /metrics
pub async fn metrics_handler(State(state): State<Arc<RelayState>>) -> Result<impl IntoResponse, RelayError> {
    let body = state.metrics.render()?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}

async fn relay_play(
    state: &RelayState,
    game: GameType,
    request: Result<Json<PlayRequest>, JsonRejection>,
    request_id: Option<Extension<RequestId>>,
) -> Result<Json<PlayResponse>, RelayError> {
    let request_id = request_id.map(|Extension(RequestId(id))| id).unwrap_or_default();
    let started = Instant::now();

    let result = match request {
        Ok(Json(request)) => forward_play(state, game, &request).await,
        Err(rejection) => Err(RelayError::from(rejection)),
    };
    let elapsed = started.elapsed();
    match &result {
        Ok(response) => {
            state.metrics.record(game, "ok", elapsed);
            info!(%request_id, game = %game, tx_hash = %response.tx_hash, elapsed_ms = elapsed.as_millis() as u64, "bet relayed");
        }
        Err(e) => {
            let status = if matches!(e, RelayError::MissingField(_)) { "rejected" } else { "error" };
            state.metrics.record(game, status, elapsed);
            warn!(%request_id, game = %game, error = %e, "bet relay failed");
        }
    }
    result.map(Json)
}

async fn forward_play(state: &RelayState, game: GameType, request: &PlayRequest) -> Result<PlayResponse, RelayError> {
    require_fields(game, request)?;
    let missing = || RelayError::MissingField(missing_fields_message(game).to_string());

    let user = parse_address("user", request.user().ok_or_else(missing)?)?;
    let value = wager_wei(request.bet().ok_or_else(missing)?)?;
    let data = encode_game_call(game, request)?;

    let receipt = state
        .forwarder
        .forward(ForwardCall {
            game,
            user,
            data,
            value,
        })
        .await?;

    Ok(PlayResponse {
        tx_hash: receipt.tx_hash,
        events: receipt.events,
    })
}
