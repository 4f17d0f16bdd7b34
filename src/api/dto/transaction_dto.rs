//! Purchase, escrow, dispute and review DTOs.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::common_dto::{PaginationMeta, PaginationParams, default_page, default_per_page};
use crate::domain::{
    DeliveryMethod, DisputeReason, DisputeResolution, Review, Side, Transaction, TransactionId,
};

/// Request body for `POST /listings/{id}/purchase`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct PurchaseRequest {
    /// `shipping` or `pickup`. Shipping when the listing offers it.
    #[serde(default)]
    pub delivery_method: Option<DeliveryMethod>,
}

/// Query string for `GET /transactions`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TransactionQuery {
    /// `buyer` or `seller`; both sides when omitted.
    pub role: Option<Side>,
    /// Page number (1-indexed).
    #[serde(default = "default_page")]
    pub page: u32,
    /// Items per page (max 100).
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

impl TransactionQuery {
    /// Pagination part of the query.
    #[must_use]
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// Response body for `GET /transactions`.
#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionListResponse {
    /// Transactions on this page.
    pub data: Vec<Transaction>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}

/// Request body for `POST /transactions/{id}/tracking`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TrackingRequest {
    /// Carrier tracking number.
    pub tracking_number: String,
    /// Carrier name.
    #[serde(default)]
    pub carrier: Option<String>,
}

/// Request body for `POST /transactions/{id}/disputes`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OpenDisputeRequest {
    /// Dispute category.
    pub reason: DisputeReason,
    /// What went wrong.
    pub description: String,
}

/// Request body for `POST /disputes/{id}/resolve`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ResolveDisputeRequest {
    /// Where the held funds go.
    pub resolution: DisputeResolution,
    /// Note for the parties.
    #[serde(default)]
    pub note: Option<String>,
}

/// Request body for `POST /transactions/{id}/reviews`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SubmitReviewRequest {
    /// Star rating; values outside 1-5 are clamped.
    pub rating: i64,
    /// Optional review text.
    #[serde(default)]
    pub content: Option<String>,
}

/// Response body for `GET /members/{id}/reviews`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewListResponse {
    /// Reviews on this page, newest first.
    pub data: Vec<Review>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}

/// Request body for `POST /webhooks/payments`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PaymentWebhookRequest {
    /// Transaction the payment belongs to.
    pub transaction_id: TransactionId,
    /// Provider's payment reference.
    #[serde(default)]
    pub payment_reference: Option<String>,
}
