//! Purchase and escrow handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{PurchaseRequest, TrackingRequest, TransactionListResponse, TransactionQuery};
use crate::app_state::AppState;
use crate::domain::{ListingId, Principal, Transaction, TransactionId};
use crate::error::{ErrorResponse, MarketError};

/// `POST /listings/{id}/purchase` — Start a purchase.
///
/// # Errors
///
/// Returns [`MarketError`] when the listing cannot be bought by the caller.
#[utoipa::path(
    post,
    path = "/api/v1/listings/{id}/purchase",
    tag = "Transactions",
    summary = "Buy a listing",
    description = "Creates a pending transaction with the fee and totals frozen at the current price. Funds are held in escrow once the payment webhook confirms capture.",
    params(("id" = uuid::Uuid, Path, description = "Listing UUID")),
    request_body = PurchaseRequest,
    responses(
        (status = 201, description = "Transaction created", body = Transaction),
        (status = 400, description = "Delivery method not offered", body = ErrorResponse),
        (status = 403, description = "Seller cannot buy own listing", body = ErrorResponse),
        (status = 409, description = "Listing not purchasable", body = ErrorResponse),
    )
)]
pub async fn initiate_purchase(
    State(state): State<AppState>,
    principal: Principal,
    Path(listing_id): Path<ListingId>,
    Json(req): Json<PurchaseRequest>,
) -> Result<impl IntoResponse, MarketError> {
    let tx = state
        .service
        .initiate_purchase(principal, listing_id, req.delivery_method)
        .await?;
    Ok((StatusCode::CREATED, Json(tx)))
}

/// `GET /transactions` — The caller's purchases and sales.
///
/// # Errors
///
/// Returns [`MarketError`] if the caller is not a member.
#[utoipa::path(
    get,
    path = "/api/v1/transactions",
    tag = "Transactions",
    summary = "List transactions",
    params(TransactionQuery),
    responses(
        (status = 200, description = "Paginated transactions, newest first", body = TransactionListResponse),
    )
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    principal: Principal,
    Query(query): Query<TransactionQuery>,
) -> Result<impl IntoResponse, MarketError> {
    let all = state
        .service
        .list_transactions(principal, query.role)
        .await?;
    let (data, pagination) = query.pagination().paginate(all);
    Ok(Json(TransactionListResponse { data, pagination }))
}

/// `GET /transactions/{id}` — Transaction details.
///
/// # Errors
///
/// Returns [`MarketError::PermissionDenied`] unless the caller is a party
/// or an admin.
#[utoipa::path(
    get,
    path = "/api/v1/transactions/{id}",
    tag = "Transactions",
    summary = "Get a transaction",
    params(("id" = uuid::Uuid, Path, description = "Transaction UUID")),
    responses(
        (status = 200, description = "Transaction", body = Transaction),
        (status = 403, description = "Not a party", body = ErrorResponse),
        (status = 404, description = "Transaction not found", body = ErrorResponse),
    )
)]
pub async fn get_transaction(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<TransactionId>,
) -> Result<impl IntoResponse, MarketError> {
    Ok(Json(state.service.get_transaction(principal, id).await?))
}

/// `POST /transactions/{id}/confirm` — Buyer confirms delivery.
///
/// # Errors
///
/// Returns [`MarketError`] unless the buyer confirms while funds are held.
#[utoipa::path(
    post,
    path = "/api/v1/transactions/{id}/confirm",
    tag = "Transactions",
    summary = "Confirm delivery",
    description = "Buyer-only. Completes the transaction and releases escrow to the seller.",
    params(("id" = uuid::Uuid, Path, description = "Transaction UUID")),
    responses(
        (status = 200, description = "Completed transaction", body = Transaction),
        (status = 403, description = "Not the buyer", body = ErrorResponse),
        (status = 409, description = "Funds not held", body = ErrorResponse),
    )
)]
pub async fn confirm_delivery(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<TransactionId>,
) -> Result<impl IntoResponse, MarketError> {
    Ok(Json(state.service.confirm_delivery(principal, id).await?))
}

/// `POST /transactions/{id}/cancel` — Cancel before payment.
///
/// # Errors
///
/// Returns [`MarketError`] once the transaction is paid.
#[utoipa::path(
    post,
    path = "/api/v1/transactions/{id}/cancel",
    tag = "Transactions",
    summary = "Cancel a transaction",
    params(("id" = uuid::Uuid, Path, description = "Transaction UUID")),
    responses(
        (status = 200, description = "Cancelled transaction", body = Transaction),
        (status = 409, description = "Already paid", body = ErrorResponse),
    )
)]
pub async fn cancel_transaction(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<TransactionId>,
) -> Result<impl IntoResponse, MarketError> {
    Ok(Json(state.service.cancel_transaction(principal, id).await?))
}

/// `POST /transactions/{id}/refund` — Seller refunds held funds.
///
/// # Errors
///
/// Returns [`MarketError`] unless the seller refunds while funds are held.
#[utoipa::path(
    post,
    path = "/api/v1/transactions/{id}/refund",
    tag = "Transactions",
    summary = "Refund a transaction",
    params(("id" = uuid::Uuid, Path, description = "Transaction UUID")),
    responses(
        (status = 200, description = "Refunded transaction", body = Transaction),
        (status = 403, description = "Not the seller", body = ErrorResponse),
        (status = 409, description = "Funds not held", body = ErrorResponse),
    )
)]
pub async fn refund_transaction(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<TransactionId>,
) -> Result<impl IntoResponse, MarketError> {
    Ok(Json(state.service.refund_transaction(principal, id).await?))
}

/// `POST /transactions/{id}/tracking` — Seller adds shipment tracking.
///
/// # Errors
///
/// Returns [`MarketError`] unless the seller ships a paid order.
#[utoipa::path(
    post,
    path = "/api/v1/transactions/{id}/tracking",
    tag = "Transactions",
    summary = "Add tracking",
    params(("id" = uuid::Uuid, Path, description = "Transaction UUID")),
    request_body = TrackingRequest,
    responses(
        (status = 200, description = "Shipped transaction", body = Transaction),
        (status = 400, description = "Empty tracking number", body = ErrorResponse),
        (status = 403, description = "Not the seller", body = ErrorResponse),
        (status = 409, description = "Not paid", body = ErrorResponse),
    )
)]
pub async fn add_tracking(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<TransactionId>,
    Json(req): Json<TrackingRequest>,
) -> Result<impl IntoResponse, MarketError> {
    Ok(Json(
        state
            .service
            .add_tracking(principal, id, &req.tracking_number, req.carrier)
            .await?,
    ))
}

/// Transaction routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/listings/{id}/purchase", post(initiate_purchase))
        .route("/transactions", get(list_transactions))
        .route("/transactions/{id}", get(get_transaction))
        .route("/transactions/{id}/confirm", post(confirm_delivery))
        .route("/transactions/{id}/cancel", post(cancel_transaction))
        .route("/transactions/{id}/refund", post(refund_transaction))
        .route("/transactions/{id}/tracking", post(add_tracking))
}
