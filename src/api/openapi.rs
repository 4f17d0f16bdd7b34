//! OpenAPI document for the REST surface.

use utoipa::OpenApi;

use super::dto::{
    ConversationListResponse, EventLogResponse, ListingListResponse, MarkReadResponse,
    MessageListResponse, OpenDisputeRequest, PaginationMeta, PaymentWebhookRequest,
    PurchaseRequest, ResolveDisputeRequest, ReviewListResponse, SendMessageRequest,
    SubmitReviewRequest, TrackingRequest, TransactionListResponse, ViewCountResponse,
};
use super::handlers::{
    admin, conversations, disputes, listings, reviews, system, transactions, webhooks,
};
use crate::domain::{
    Conversation, Dispute, Listing, ListingDraft, ListingPatch, Message, Review, SellerStats,
    Transaction,
};
use crate::error::{ErrorBody, ErrorResponse};
use crate::persistence::StoredEvent;
use crate::service::FavoriteState;

/// Generated OpenAPI specification.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "commons-market",
        description = "Community marketplace with escrow-backed purchases."
    ),
    paths(
        system::health_handler,
        listings::create_listing,
        listings::list_listings,
        listings::get_listing,
        listings::update_listing,
        listings::delete_listing,
        listings::publish_listing,
        listings::unpublish_listing,
        listings::reserve_listing,
        listings::mark_listing_sold,
        listings::relist_listing,
        listings::toggle_favorite,
        listings::record_view,
        listings::list_favorites,
        conversations::open_conversation,
        conversations::list_conversations,
        conversations::list_messages,
        conversations::send_message,
        conversations::mark_read,
        conversations::block_conversation,
        conversations::unblock_conversation,
        transactions::initiate_purchase,
        transactions::list_transactions,
        transactions::get_transaction,
        transactions::confirm_delivery,
        transactions::cancel_transaction,
        transactions::refund_transaction,
        transactions::add_tracking,
        disputes::open_dispute,
        disputes::get_dispute,
        disputes::resolve_dispute,
        reviews::submit_review,
        reviews::list_reviews,
        reviews::seller_stats,
        webhooks::payment_captured,
        admin::list_events,
    ),
    components(schemas(
        ErrorResponse,
        ErrorBody,
        PaginationMeta,
        Listing,
        ListingDraft,
        ListingPatch,
        ListingListResponse,
        ViewCountResponse,
        FavoriteState,
        Conversation,
        Message,
        ConversationListResponse,
        MessageListResponse,
        SendMessageRequest,
        MarkReadResponse,
        Transaction,
        TransactionListResponse,
        PurchaseRequest,
        TrackingRequest,
        Dispute,
        OpenDisputeRequest,
        ResolveDisputeRequest,
        Review,
        ReviewListResponse,
        SubmitReviewRequest,
        SellerStats,
        PaymentWebhookRequest,
        StoredEvent,
        EventLogResponse,
    )),
    tags(
        (name = "Listings", description = "Listings, favorites and views"),
        (name = "Conversations", description = "Buyer and seller messaging"),
        (name = "Transactions", description = "Purchases and escrow"),
        (name = "Disputes", description = "Frozen funds and admin resolution"),
        (name = "Reviews", description = "Reviews and seller reputation"),
        (name = "Webhooks", description = "Payment provider callbacks"),
        (name = "Admin", description = "Event log audit"),
        (name = "System", description = "Health"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_core_paths() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/api/v1/listings",
            "/api/v1/listings/{id}/purchase",
            "/api/v1/transactions/{id}/disputes",
            "/api/v1/members/{id}/stats",
            "/api/v1/webhooks/payments",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
