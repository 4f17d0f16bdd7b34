//! Conversation and message DTOs.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::PaginationMeta;
use crate::domain::{Conversation, ConversationId, Message, MessageType};
use crate::service::NewMessage;

/// Request body for `POST /conversations/{id}/messages`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SendMessageRequest {
    /// Message text (1-5000 characters).
    pub content: String,
    /// `text` (default) or `offer`.
    #[serde(default)]
    pub message_type: Option<MessageType>,
    /// Offered price, required for offers.
    #[serde(default)]
    pub offer_amount: Option<Decimal>,
}

impl From<SendMessageRequest> for NewMessage {
    fn from(req: SendMessageRequest) -> Self {
        Self {
            content: req.content,
            message_type: req.message_type.unwrap_or(MessageType::Text),
            offer_amount: req.offer_amount,
        }
    }
}

/// Response body for `POST /conversations/{id}/read`.
#[derive(Debug, Serialize, ToSchema)]
pub struct MarkReadResponse {
    /// Conversation read.
    pub conversation_id: ConversationId,
    /// Messages newly marked as read.
    pub marked: usize,
}

/// Response body for `GET /conversations`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ConversationListResponse {
    /// Conversations on this page, most recent activity first.
    pub data: Vec<Conversation>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}

/// Response body for `GET /conversations/{id}/messages`.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageListResponse {
    /// Messages on this page, oldest first.
    pub data: Vec<Message>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}
