//! Conversation and message handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    ConversationListResponse, MarkReadResponse, MessageListResponse, PaginationParams,
    SendMessageRequest,
};
use crate::app_state::AppState;
use crate::domain::{Conversation, ConversationId, ListingId, Message, Principal};
use crate::error::{ErrorResponse, MarketError};

/// `POST /listings/{id}/conversations` — Open or resume the caller's
/// conversation with the seller.
///
/// # Errors
///
/// Returns [`MarketError`] when the caller is the seller or the listing
/// is not open for contact.
#[utoipa::path(
    post,
    path = "/api/v1/listings/{id}/conversations",
    tag = "Conversations",
    summary = "Contact the seller",
    description = "Returns the existing conversation for this buyer and listing, or creates it.",
    params(("id" = uuid::Uuid, Path, description = "Listing UUID")),
    responses(
        (status = 200, description = "Conversation", body = Conversation),
        (status = 403, description = "Seller cannot contact themselves", body = ErrorResponse),
        (status = 404, description = "Listing not found", body = ErrorResponse),
        (status = 409, description = "Listing not available", body = ErrorResponse),
    )
)]
pub async fn open_conversation(
    State(state): State<AppState>,
    principal: Principal,
    Path(listing_id): Path<ListingId>,
) -> Result<impl IntoResponse, MarketError> {
    Ok(Json(
        state.service.open_conversation(principal, listing_id).await?,
    ))
}

/// `GET /conversations` — The caller's conversations.
///
/// # Errors
///
/// Returns [`MarketError`] if the caller is not a member.
#[utoipa::path(
    get,
    path = "/api/v1/conversations",
    tag = "Conversations",
    summary = "List conversations",
    description = "Paginated conversations where the caller is buyer or seller, most recent activity first.",
    params(PaginationParams),
    responses(
        (status = 200, description = "Paginated conversations", body = ConversationListResponse),
    )
)]
pub async fn list_conversations(
    State(state): State<AppState>,
    principal: Principal,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, MarketError> {
    let conversations = state.service.list_conversations(principal).await?;
    let (data, pagination) = pagination.paginate(conversations);
    Ok(Json(ConversationListResponse { data, pagination }))
}

/// `GET /conversations/{id}/messages` — Message history.
///
/// # Errors
///
/// Returns [`MarketError::PermissionDenied`] for non-participants.
#[utoipa::path(
    get,
    path = "/api/v1/conversations/{id}/messages",
    tag = "Conversations",
    summary = "List messages",
    params(
        ("id" = uuid::Uuid, Path, description = "Conversation UUID"),
        PaginationParams,
    ),
    responses(
        (status = 200, description = "Paginated messages, oldest first", body = MessageListResponse),
        (status = 403, description = "Not a participant", body = ErrorResponse),
        (status = 404, description = "Conversation not found", body = ErrorResponse),
    )
)]
pub async fn list_messages(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<ConversationId>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, MarketError> {
    let messages = state.service.list_messages(principal, id).await?;
    let (data, pagination) = pagination.paginate(messages);
    Ok(Json(MessageListResponse { data, pagination }))
}

/// `POST /conversations/{id}/messages` — Send a message or an offer.
///
/// # Errors
///
/// Returns [`MarketError`] on invalid content, a blocked conversation or a
/// non-participant caller.
#[utoipa::path(
    post,
    path = "/api/v1/conversations/{id}/messages",
    tag = "Conversations",
    summary = "Send a message",
    params(("id" = uuid::Uuid, Path, description = "Conversation UUID")),
    request_body = SendMessageRequest,
    responses(
        (status = 201, description = "Message sent", body = Message),
        (status = 400, description = "Invalid message", body = ErrorResponse),
        (status = 403, description = "Not a participant", body = ErrorResponse),
        (status = 409, description = "Conversation blocked", body = ErrorResponse),
    )
)]
pub async fn send_message(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<ConversationId>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, MarketError> {
    let message = state
        .service
        .send_message(principal, id, req.into())
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// `POST /conversations/{id}/read` — Mark the counterpart's messages read.
///
/// # Errors
///
/// Returns [`MarketError::PermissionDenied`] for non-participants.
#[utoipa::path(
    post,
    path = "/api/v1/conversations/{id}/read",
    tag = "Conversations",
    summary = "Mark messages read",
    params(("id" = uuid::Uuid, Path, description = "Conversation UUID")),
    responses(
        (status = 200, description = "Number of messages marked", body = MarkReadResponse),
        (status = 403, description = "Not a participant", body = ErrorResponse),
    )
)]
pub async fn mark_read(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<ConversationId>,
) -> Result<impl IntoResponse, MarketError> {
    let marked = state.service.mark_read(principal, id).await?;
    Ok(Json(MarkReadResponse {
        conversation_id: id,
        marked,
    }))
}

/// `POST /conversations/{id}/block` — Stop all new messages.
///
/// # Errors
///
/// Returns [`MarketError::PermissionDenied`] for non-participants.
#[utoipa::path(
    post,
    path = "/api/v1/conversations/{id}/block",
    tag = "Conversations",
    summary = "Block a conversation",
    params(("id" = uuid::Uuid, Path, description = "Conversation UUID")),
    responses(
        (status = 200, description = "Blocked conversation", body = Conversation),
        (status = 403, description = "Not a participant", body = ErrorResponse),
    )
)]
pub async fn block_conversation(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<ConversationId>,
) -> Result<impl IntoResponse, MarketError> {
    Ok(Json(
        state
            .service
            .set_conversation_blocked(principal, id, true)
            .await?,
    ))
}

/// `POST /conversations/{id}/unblock` — Reopen a blocked conversation.
///
/// # Errors
///
/// Returns [`MarketError::PermissionDenied`] for non-participants.
#[utoipa::path(
    post,
    path = "/api/v1/conversations/{id}/unblock",
    tag = "Conversations",
    summary = "Unblock a conversation",
    params(("id" = uuid::Uuid, Path, description = "Conversation UUID")),
    responses(
        (status = 200, description = "Active conversation", body = Conversation),
        (status = 403, description = "Not a participant", body = ErrorResponse),
    )
)]
pub async fn unblock_conversation(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<ConversationId>,
) -> Result<impl IntoResponse, MarketError> {
    Ok(Json(
        state
            .service
            .set_conversation_blocked(principal, id, false)
            .await?,
    ))
}

/// Conversation routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/listings/{id}/conversations", post(open_conversation))
        .route("/conversations", get(list_conversations))
        .route(
            "/conversations/{id}/messages",
            get(list_messages).post(send_message),
        )
        .route("/conversations/{id}/read", post(mark_read))
        .route("/conversations/{id}/block", post(block_conversation))
        .route("/conversations/{id}/unblock", post(unblock_conversation))
}
