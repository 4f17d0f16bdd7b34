//! Dispute handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{OpenDisputeRequest, ResolveDisputeRequest};
use crate::app_state::AppState;
use crate::domain::{Dispute, DisputeId, Principal, TransactionId};
use crate::error::{ErrorResponse, MarketError};

/// `POST /transactions/{id}/disputes` — Freeze held funds.
///
/// # Errors
///
/// Returns [`MarketError`] unless a party disputes held funds for the
/// first time.
#[utoipa::path(
    post,
    path = "/api/v1/transactions/{id}/disputes",
    tag = "Disputes",
    summary = "Open a dispute",
    description = "Either party may dispute while funds are held in escrow. A transaction can be disputed only once.",
    params(("id" = uuid::Uuid, Path, description = "Transaction UUID")),
    request_body = OpenDisputeRequest,
    responses(
        (status = 201, description = "Dispute opened", body = Dispute),
        (status = 400, description = "Empty description", body = ErrorResponse),
        (status = 403, description = "Not a party", body = ErrorResponse),
        (status = 409, description = "Funds not held or already disputed", body = ErrorResponse),
    )
)]
pub async fn open_dispute(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<TransactionId>,
    Json(req): Json<OpenDisputeRequest>,
) -> Result<impl IntoResponse, MarketError> {
    let dispute = state
        .service
        .open_dispute(principal, id, req.reason, &req.description)
        .await?;
    Ok((StatusCode::CREATED, Json(dispute)))
}

/// `GET /disputes/{id}` — Dispute details.
///
/// # Errors
///
/// Returns [`MarketError::PermissionDenied`] unless the caller is a party
/// or an admin.
#[utoipa::path(
    get,
    path = "/api/v1/disputes/{id}",
    tag = "Disputes",
    summary = "Get a dispute",
    params(("id" = uuid::Uuid, Path, description = "Dispute UUID")),
    responses(
        (status = 200, description = "Dispute", body = Dispute),
        (status = 403, description = "Not a party", body = ErrorResponse),
        (status = 404, description = "Dispute not found", body = ErrorResponse),
    )
)]
pub async fn get_dispute(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<DisputeId>,
) -> Result<impl IntoResponse, MarketError> {
    Ok(Json(state.service.get_dispute(principal, id).await?))
}

/// `POST /disputes/{id}/resolve` — Admin settles a dispute.
///
/// # Errors
///
/// Returns [`MarketError`] for non-admins or an already resolved dispute.
#[utoipa::path(
    post,
    path = "/api/v1/disputes/{id}/resolve",
    tag = "Disputes",
    summary = "Resolve a dispute",
    description = "Admin-only. `release_to_seller` completes the transaction; `refund_to_buyer` refunds it.",
    params(("id" = uuid::Uuid, Path, description = "Dispute UUID")),
    request_body = ResolveDisputeRequest,
    responses(
        (status = 200, description = "Resolved dispute", body = Dispute),
        (status = 403, description = "Not an admin", body = ErrorResponse),
        (status = 409, description = "Already resolved", body = ErrorResponse),
    )
)]
pub async fn resolve_dispute(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<DisputeId>,
    Json(req): Json<ResolveDisputeRequest>,
) -> Result<impl IntoResponse, MarketError> {
    Ok(Json(
        state
            .service
            .resolve_dispute(principal, id, req.resolution, req.note)
            .await?,
    ))
}

/// Dispute routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/transactions/{id}/disputes", post(open_dispute))
        .route("/disputes/{id}", get(get_dispute))
        .route("/disputes/{id}/resolve", post(resolve_dispute))
}
