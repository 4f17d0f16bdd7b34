//! Admin endpoints: event log audit.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{EventLogQuery, EventLogResponse};
use crate::app_state::AppState;
use crate::domain::Principal;
use crate::error::{ErrorResponse, MarketError};

/// `GET /admin/events` — The community's persisted events.
///
/// # Errors
///
/// Returns [`MarketError::PermissionDenied`] for non-admins and
/// [`MarketError::InvalidState`] when the event log is disabled.
#[utoipa::path(
    get,
    path = "/api/v1/admin/events",
    tag = "Admin",
    summary = "Audit the event log",
    description = "Admin-only view of the persisted event log for the caller's community, in commit order.",
    params(EventLogQuery),
    responses(
        (status = 200, description = "Stored events", body = EventLogResponse),
        (status = 403, description = "Not an admin", body = ErrorResponse),
        (status = 409, description = "Event log disabled", body = ErrorResponse),
    )
)]
pub async fn list_events(
    State(state): State<AppState>,
    principal: Principal,
    Query(query): Query<EventLogQuery>,
) -> Result<impl IntoResponse, MarketError> {
    let member = state.service.resolve_member(principal).await?;
    if !member.is_admin() {
        return Err(MarketError::PermissionDenied(
            "only community admins can read the event log".to_string(),
        ));
    }
    let Some(persistence) = state.persistence.as_ref() else {
        return Err(MarketError::InvalidState(
            "event log is disabled".to_string(),
        ));
    };
    let data = persistence
        .load_events(member.community_id, &query.into())
        .await?;
    Ok(Json(EventLogResponse { data }))
}

/// Admin routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/admin/events", get(list_events))
}
