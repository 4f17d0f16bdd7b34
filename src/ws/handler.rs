//! Axum WebSocket upgrade handler.

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::IntoResponse;

use super::connection::run_connection;
use crate::app_state::AppState;
use crate::domain::Principal;
use crate::error::MarketError;

/// `GET /ws` — Upgrade HTTP connection to WebSocket.
///
/// The caller is resolved to an active member before the upgrade, so a
/// missing identity or membership is reported as a plain HTTP error.
///
/// # Errors
///
/// Returns [`MarketError::Unauthenticated`] or [`MarketError::NotAMember`].
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    principal: Principal,
) -> Result<impl IntoResponse, MarketError> {
    let member = state.service.resolve_member(principal).await?;
    let event_rx = state.event_bus.subscribe();
    Ok(ws.on_upgrade(move |socket| run_connection(socket, event_rx, member)))
}
