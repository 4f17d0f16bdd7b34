//! Review and reputation handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{PaginationParams, ReviewListResponse, SubmitReviewRequest};
use crate::app_state::AppState;
use crate::domain::{MemberId, Principal, Review, SellerStats, TransactionId};
use crate::error::{ErrorResponse, MarketError};

/// `POST /transactions/{id}/reviews` — Review the counterpart.
///
/// # Errors
///
/// Returns [`MarketError`] unless a party reviews a completed transaction
/// for the first time.
#[utoipa::path(
    post,
    path = "/api/v1/transactions/{id}/reviews",
    tag = "Reviews",
    summary = "Submit a review",
    params(("id" = uuid::Uuid, Path, description = "Transaction UUID")),
    request_body = SubmitReviewRequest,
    responses(
        (status = 201, description = "Review stored", body = Review),
        (status = 403, description = "Not a party", body = ErrorResponse),
        (status = 409, description = "Not completed or already reviewed", body = ErrorResponse),
    )
)]
pub async fn submit_review(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<TransactionId>,
    Json(req): Json<SubmitReviewRequest>,
) -> Result<impl IntoResponse, MarketError> {
    let review = state
        .service
        .submit_review(principal, id, req.rating, req.content)
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// `GET /members/{id}/reviews` — Reviews about a member.
///
/// # Errors
///
/// Returns [`MarketError`] if the caller is not a member.
#[utoipa::path(
    get,
    path = "/api/v1/members/{id}/reviews",
    tag = "Reviews",
    summary = "List reviews about a member",
    params(
        ("id" = uuid::Uuid, Path, description = "Member UUID"),
        PaginationParams,
    ),
    responses(
        (status = 200, description = "Paginated reviews, newest first", body = ReviewListResponse),
    )
)]
pub async fn list_reviews(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<MemberId>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, MarketError> {
    let reviews = state.service.list_reviews(principal, id).await?;
    let (data, pagination) = pagination.paginate(reviews);
    Ok(Json(ReviewListResponse { data, pagination }))
}

/// `GET /members/{id}/stats` — Seller reputation.
///
/// # Errors
///
/// Returns [`MarketError`] if the caller is not a member.
#[utoipa::path(
    get,
    path = "/api/v1/members/{id}/stats",
    tag = "Reviews",
    summary = "Seller statistics",
    description = "Sales, revenue, rating and response rate derived from the member's completed sales, reviews and conversations.",
    params(("id" = uuid::Uuid, Path, description = "Member UUID")),
    responses(
        (status = 200, description = "Seller statistics", body = SellerStats),
    )
)]
pub async fn seller_stats(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<MemberId>,
) -> Result<impl IntoResponse, MarketError> {
    Ok(Json(state.service.seller_stats(principal, id).await?))
}

/// Review routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/transactions/{id}/reviews", post(submit_review))
        .route("/members/{id}/reviews", get(list_reviews))
        .route("/members/{id}/stats", get(seller_stats))
}
