//! Listing handlers: CRUD, status transitions, favorites and views.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{ListingListResponse, ListingQuery, PaginationParams, ViewCountResponse};
use crate::app_state::AppState;
use crate::domain::{Listing, ListingDraft, ListingId, ListingPatch, Principal};
use crate::error::{ErrorResponse, MarketError};
use crate::service::{FavoriteState, ListingAction};

/// `POST /listings` — Create a listing.
///
/// # Errors
///
/// Returns [`MarketError`] on invalid input or missing membership.
#[utoipa::path(
    post,
    path = "/api/v1/listings",
    tag = "Listings",
    summary = "Create a listing",
    description = "Creates a draft, or an active listing when `publish` is set. An active listing must offer shipping or pickup.",
    request_body = ListingDraft,
    responses(
        (status = 201, description = "Listing created", body = Listing),
        (status = 400, description = "Invalid listing", body = ErrorResponse),
        (status = 401, description = "Missing identity headers", body = ErrorResponse),
        (status = 403, description = "Not a community member", body = ErrorResponse),
    )
)]
pub async fn create_listing(
    State(state): State<AppState>,
    principal: Principal,
    Json(draft): Json<ListingDraft>,
) -> Result<impl IntoResponse, MarketError> {
    let listing = state.service.create_listing(principal, draft).await?;
    Ok((StatusCode::CREATED, Json(listing)))
}

/// `GET /listings` — Browse the community's listings.
///
/// # Errors
///
/// Returns [`MarketError`] if the caller is not a member.
#[utoipa::path(
    get,
    path = "/api/v1/listings",
    tag = "Listings",
    summary = "List listings",
    description = "Returns a paginated list of listings, featured first and then newest. Drafts are only visible to their seller.",
    params(ListingQuery),
    responses(
        (status = 200, description = "Paginated listing list", body = ListingListResponse),
        (status = 403, description = "Not a community member", body = ErrorResponse),
    )
)]
pub async fn list_listings(
    State(state): State<AppState>,
    principal: Principal,
    Query(query): Query<ListingQuery>,
) -> Result<impl IntoResponse, MarketError> {
    let (filter, pagination) = query.into_parts();
    let listings = state.service.list_listings(principal, &filter).await?;
    let (data, pagination) = pagination.paginate(listings);
    Ok(Json(ListingListResponse { data, pagination }))
}

/// `GET /listings/{id}` — Listing details.
///
/// # Errors
///
/// Returns [`MarketError::NotFound`] for unknown or hidden listings.
#[utoipa::path(
    get,
    path = "/api/v1/listings/{id}",
    tag = "Listings",
    summary = "Get a listing",
    params(("id" = uuid::Uuid, Path, description = "Listing UUID")),
    responses(
        (status = 200, description = "Listing", body = Listing),
        (status = 404, description = "Listing not found", body = ErrorResponse),
    )
)]
pub async fn get_listing(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<ListingId>,
) -> Result<impl IntoResponse, MarketError> {
    Ok(Json(state.service.get_listing(principal, id).await?))
}

/// `PATCH /listings/{id}` — Edit a listing.
///
/// # Errors
///
/// Returns [`MarketError`] unless the caller is the seller and the patch
/// is valid.
#[utoipa::path(
    patch,
    path = "/api/v1/listings/{id}",
    tag = "Listings",
    summary = "Update a listing",
    description = "Seller-only partial update. Price edits never affect transactions already started.",
    params(("id" = uuid::Uuid, Path, description = "Listing UUID")),
    request_body = ListingPatch,
    responses(
        (status = 200, description = "Updated listing", body = Listing),
        (status = 400, description = "Invalid patch", body = ErrorResponse),
        (status = 403, description = "Not the seller", body = ErrorResponse),
        (status = 404, description = "Listing not found", body = ErrorResponse),
    )
)]
pub async fn update_listing(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<ListingId>,
    Json(patch): Json<ListingPatch>,
) -> Result<impl IntoResponse, MarketError> {
    Ok(Json(state.service.update_listing(principal, id, &patch).await?))
}

/// `DELETE /listings/{id}` — Soft-delete a listing.
///
/// # Errors
///
/// Returns [`MarketError::InvalidState`] while a purchase is in flight.
#[utoipa::path(
    delete,
    path = "/api/v1/listings/{id}",
    tag = "Listings",
    summary = "Delete a listing",
    description = "Seller or moderator soft delete. Refused while the listing has an open transaction.",
    params(("id" = uuid::Uuid, Path, description = "Listing UUID")),
    responses(
        (status = 200, description = "Deleted listing", body = Listing),
        (status = 403, description = "Not allowed", body = ErrorResponse),
        (status = 409, description = "Open transaction", body = ErrorResponse),
    )
)]
pub async fn delete_listing(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<ListingId>,
) -> Result<impl IntoResponse, MarketError> {
    Ok(Json(state.service.delete_listing(principal, id).await?))
}

async fn apply_action(
    state: &AppState,
    principal: Principal,
    id: ListingId,
    action: ListingAction,
) -> Result<Json<Listing>, MarketError> {
    Ok(Json(
        state
            .service
            .change_listing_status(principal, id, action)
            .await?,
    ))
}

/// `POST /listings/{id}/publish` — Draft or inactive to active.
///
/// # Errors
///
/// Returns [`MarketError`] on an illegal transition.
#[utoipa::path(
    post,
    path = "/api/v1/listings/{id}/publish",
    tag = "Listings",
    summary = "Publish a listing",
    params(("id" = uuid::Uuid, Path, description = "Listing UUID")),
    responses(
        (status = 200, description = "Published listing", body = Listing),
        (status = 409, description = "Illegal transition", body = ErrorResponse),
    )
)]
pub async fn publish_listing(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<ListingId>,
) -> Result<Json<Listing>, MarketError> {
    apply_action(&state, principal, id, ListingAction::Publish).await
}

/// `POST /listings/{id}/unpublish` — Active to inactive.
///
/// # Errors
///
/// Returns [`MarketError`] on an illegal transition.
#[utoipa::path(
    post,
    path = "/api/v1/listings/{id}/unpublish",
    tag = "Listings",
    summary = "Unpublish a listing",
    params(("id" = uuid::Uuid, Path, description = "Listing UUID")),
    responses(
        (status = 200, description = "Unpublished listing", body = Listing),
        (status = 409, description = "Illegal transition", body = ErrorResponse),
    )
)]
pub async fn unpublish_listing(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<ListingId>,
) -> Result<Json<Listing>, MarketError> {
    apply_action(&state, principal, id, ListingAction::Unpublish).await
}

/// `POST /listings/{id}/reserve` — Active to reserved.
///
/// # Errors
///
/// Returns [`MarketError`] on an illegal transition.
#[utoipa::path(
    post,
    path = "/api/v1/listings/{id}/reserve",
    tag = "Listings",
    summary = "Reserve a listing",
    params(("id" = uuid::Uuid, Path, description = "Listing UUID")),
    responses(
        (status = 200, description = "Reserved listing", body = Listing),
        (status = 409, description = "Illegal transition", body = ErrorResponse),
    )
)]
pub async fn reserve_listing(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<ListingId>,
) -> Result<Json<Listing>, MarketError> {
    apply_action(&state, principal, id, ListingAction::Reserve).await
}

/// `POST /listings/{id}/sold` — Mark as sold.
///
/// # Errors
///
/// Returns [`MarketError`] on an illegal transition.
#[utoipa::path(
    post,
    path = "/api/v1/listings/{id}/sold",
    tag = "Listings",
    summary = "Mark a listing sold",
    params(("id" = uuid::Uuid, Path, description = "Listing UUID")),
    responses(
        (status = 200, description = "Sold listing", body = Listing),
        (status = 409, description = "Illegal transition", body = ErrorResponse),
    )
)]
pub async fn mark_listing_sold(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<ListingId>,
) -> Result<Json<Listing>, MarketError> {
    apply_action(&state, principal, id, ListingAction::MarkSold).await
}

/// `POST /listings/{id}/relist` — Sold or reserved back to active.
///
/// # Errors
///
/// Returns [`MarketError`] on an illegal transition.
#[utoipa::path(
    post,
    path = "/api/v1/listings/{id}/relist",
    tag = "Listings",
    summary = "Relist a listing",
    params(("id" = uuid::Uuid, Path, description = "Listing UUID")),
    responses(
        (status = 200, description = "Relisted listing", body = Listing),
        (status = 409, description = "Illegal transition", body = ErrorResponse),
    )
)]
pub async fn relist_listing(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<ListingId>,
) -> Result<Json<Listing>, MarketError> {
    apply_action(&state, principal, id, ListingAction::Relist).await
}

/// `POST /listings/{id}/favorite` — Toggle the caller's favorite.
///
/// # Errors
///
/// Returns [`MarketError::NotFound`] for unknown or hidden listings.
#[utoipa::path(
    post,
    path = "/api/v1/listings/{id}/favorite",
    tag = "Listings",
    summary = "Toggle favorite",
    params(("id" = uuid::Uuid, Path, description = "Listing UUID")),
    responses(
        (status = 200, description = "Favorite state after the toggle", body = FavoriteState),
        (status = 404, description = "Listing not found", body = ErrorResponse),
    )
)]
pub async fn toggle_favorite(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<ListingId>,
) -> Result<impl IntoResponse, MarketError> {
    Ok(Json(state.service.toggle_favorite(principal, id).await?))
}

/// `POST /listings/{id}/views` — Count a view.
///
/// # Errors
///
/// Returns [`MarketError::NotFound`] for unknown or hidden listings.
#[utoipa::path(
    post,
    path = "/api/v1/listings/{id}/views",
    tag = "Listings",
    summary = "Record a view",
    params(("id" = uuid::Uuid, Path, description = "Listing UUID")),
    responses(
        (status = 200, description = "Updated view counter", body = ViewCountResponse),
        (status = 404, description = "Listing not found", body = ErrorResponse),
    )
)]
pub async fn record_view(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<ListingId>,
) -> Result<impl IntoResponse, MarketError> {
    let views_count = state.service.record_view(principal, id).await?;
    Ok(Json(ViewCountResponse {
        listing_id: id,
        views_count,
    }))
}

/// `GET /favorites` — The caller's favorited listings.
///
/// # Errors
///
/// Returns [`MarketError`] if the caller is not a member.
#[utoipa::path(
    get,
    path = "/api/v1/favorites",
    tag = "Listings",
    summary = "List favorites",
    params(PaginationParams),
    responses(
        (status = 200, description = "Paginated favorites", body = ListingListResponse),
    )
)]
pub async fn list_favorites(
    State(state): State<AppState>,
    principal: Principal,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, MarketError> {
    let favorites = state.service.list_favorites(principal).await?;
    let (data, pagination) = params.paginate(favorites);
    Ok(Json(ListingListResponse { data, pagination }))
}

/// Listing routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/listings", post(create_listing).get(list_listings))
        .route(
            "/listings/{id}",
            get(get_listing).patch(update_listing).delete(delete_listing),
        )
        .route("/listings/{id}/publish", post(publish_listing))
        .route("/listings/{id}/unpublish", post(unpublish_listing))
        .route("/listings/{id}/reserve", post(reserve_listing))
        .route("/listings/{id}/sold", post(mark_listing_sold))
        .route("/listings/{id}/relist", post(relist_listing))
        .route("/listings/{id}/favorite", post(toggle_favorite))
        .route("/listings/{id}/views", post(record_view))
        .route("/favorites", get(list_favorites))
}
