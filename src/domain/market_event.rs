//! Domain events reflecting marketplace state changes.
//!
//! Every accepted mutation emits a [`MarketEvent`] through the
//! [`super::EventBus`] after it commits. Events are pushed to WebSocket
//! subscribers and optionally persisted to the PostgreSQL event log.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{
    CommunityId, ConversationId, DisputeId, DisputeReason, DisputeResolution, EscrowStatus,
    ListingId, ListingStatus, Member, MemberId, Message, ReviewId, Transaction, TransactionId,
    TransactionStatus,
};

/// What happened to a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionChange {
    /// Purchase initiated.
    Initiated,
    /// Payment captured, funds held.
    Paid,
    /// Seller added shipment tracking.
    TrackingAdded,
    /// Buyer confirmed delivery, funds released.
    DeliveryConfirmed,
    /// Seller refunded the buyer.
    Refunded,
    /// Unpaid purchase abandoned.
    Cancelled,
    /// Funds frozen by a dispute.
    Disputed,
    /// Dispute settled by an admin.
    DisputeSettled,
}

/// Who may observe an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    /// Every active member of the event's community.
    Community,
    /// Only the listed members (plus nobody else).
    Members(Vec<MemberId>),
}

/// Domain event emitted after every state mutation.
///
/// Money amounts are omitted; subscribers re-read the record when they need
/// them.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum MarketEvent {
    /// A listing was created (as draft or active).
    ListingCreated {
        /// Owning community.
        community_id: CommunityId,
        /// New listing.
        listing_id: ListingId,
        /// Seller.
        seller_id: MemberId,
        /// Initial status.
        status: ListingStatus,
        /// Event time.
        timestamp: DateTime<Utc>,
    },

    /// Descriptive fields or price changed.
    ListingUpdated {
        /// Owning community.
        community_id: CommunityId,
        /// Edited listing.
        listing_id: ListingId,
        /// Seller.
        seller_id: MemberId,
        /// Current status.
        status: ListingStatus,
        /// Event time.
        timestamp: DateTime<Utc>,
    },

    /// A listing moved between statuses.
    ListingStatusChanged {
        /// Owning community.
        community_id: CommunityId,
        /// Affected listing.
        listing_id: ListingId,
        /// Seller.
        seller_id: MemberId,
        /// Previous status.
        from: ListingStatus,
        /// New status.
        to: ListingStatus,
        /// Member who made the change.
        changed_by: MemberId,
        /// Event time.
        timestamp: DateTime<Utc>,
    },

    /// A member added or removed a favorite.
    FavoriteToggled {
        /// Owning community.
        community_id: CommunityId,
        /// Affected listing.
        listing_id: ListingId,
        /// Seller of the listing.
        seller_id: MemberId,
        /// Favoriting member.
        member_id: MemberId,
        /// State after the toggle.
        favorited: bool,
        /// Counter after the toggle.
        favorites_count: u64,
        /// Event time.
        timestamp: DateTime<Utc>,
    },

    /// First contact about a listing.
    ConversationStarted {
        /// Owning community.
        community_id: CommunityId,
        /// New conversation.
        conversation_id: ConversationId,
        /// Listing discussed.
        listing_id: ListingId,
        /// Buyer.
        buyer_id: MemberId,
        /// Seller.
        seller_id: MemberId,
        /// Event time.
        timestamp: DateTime<Utc>,
    },

    /// A message was appended to a conversation.
    MessageSent {
        /// Owning community.
        community_id: CommunityId,
        /// Conversation.
        conversation_id: ConversationId,
        /// Member who should be notified.
        recipient_id: MemberId,
        /// The stored message.
        message: Message,
        /// Event time.
        timestamp: DateTime<Utc>,
    },

    /// A participant read the other side's messages.
    MessagesRead {
        /// Owning community.
        community_id: CommunityId,
        /// Conversation.
        conversation_id: ConversationId,
        /// Reader.
        reader_id: MemberId,
        /// The other participant.
        counterpart_id: MemberId,
        /// Messages newly marked read.
        marked: usize,
        /// Event time.
        timestamp: DateTime<Utc>,
    },

    /// A participant blocked or unblocked a conversation.
    ConversationBlockChanged {
        /// Owning community.
        community_id: CommunityId,
        /// Conversation.
        conversation_id: ConversationId,
        /// Participant who changed it.
        changed_by: MemberId,
        /// The other participant.
        counterpart_id: MemberId,
        /// State after the change.
        blocked: bool,
        /// Event time.
        timestamp: DateTime<Utc>,
    },

    /// A transaction changed status or escrow state.
    TransactionUpdated {
        /// Owning community.
        community_id: CommunityId,
        /// Transaction.
        transaction_id: TransactionId,
        /// Purchased listing.
        listing_id: ListingId,
        /// Buyer.
        buyer_id: MemberId,
        /// Seller.
        seller_id: MemberId,
        /// What happened.
        change: TransactionChange,
        /// Status after the change.
        status: TransactionStatus,
        /// Escrow status after the change.
        escrow_status: EscrowStatus,
        /// Event time.
        timestamp: DateTime<Utc>,
    },

    /// A dispute was opened.
    DisputeOpened {
        /// Owning community.
        community_id: CommunityId,
        /// New dispute.
        dispute_id: DisputeId,
        /// Disputed transaction.
        transaction_id: TransactionId,
        /// Buyer.
        buyer_id: MemberId,
        /// Seller.
        seller_id: MemberId,
        /// Party who opened it.
        initiated_by: MemberId,
        /// Reason category.
        reason: DisputeReason,
        /// Event time.
        timestamp: DateTime<Utc>,
    },

    /// A dispute was resolved by an admin.
    DisputeResolved {
        /// Owning community.
        community_id: CommunityId,
        /// Resolved dispute.
        dispute_id: DisputeId,
        /// Settled transaction.
        transaction_id: TransactionId,
        /// Buyer.
        buyer_id: MemberId,
        /// Seller.
        seller_id: MemberId,
        /// Outcome.
        resolution: DisputeResolution,
        /// Admin who resolved it.
        resolved_by: MemberId,
        /// Event time.
        timestamp: DateTime<Utc>,
    },

    /// A review was submitted.
    ReviewSubmitted {
        /// Owning community.
        community_id: CommunityId,
        /// New review.
        review_id: ReviewId,
        /// Reviewed transaction.
        transaction_id: TransactionId,
        /// Author.
        reviewer_id: MemberId,
        /// Subject.
        reviewee_id: MemberId,
        /// Rating, 1 to 5.
        rating: u8,
        /// Event time.
        timestamp: DateTime<Utc>,
    },
}

impl MarketEvent {
    /// Builds a [`MarketEvent::TransactionUpdated`] from the committed row.
    #[must_use]
    pub fn transaction_updated(tx: &Transaction, change: TransactionChange) -> Self {
        Self::TransactionUpdated {
            community_id: tx.community_id,
            transaction_id: tx.id,
            listing_id: tx.listing_id,
            buyer_id: tx.buyer_id,
            seller_id: tx.seller_id,
            change,
            status: tx.status,
            escrow_status: tx.escrow_status,
            timestamp: tx.updated_at,
        }
    }

    /// Returns the community the event belongs to.
    #[must_use]
    pub fn community_id(&self) -> CommunityId {
        match self {
            Self::ListingCreated { community_id, .. }
            | Self::ListingUpdated { community_id, .. }
            | Self::ListingStatusChanged { community_id, .. }
            | Self::FavoriteToggled { community_id, .. }
            | Self::ConversationStarted { community_id, .. }
            | Self::MessageSent { community_id, .. }
            | Self::MessagesRead { community_id, .. }
            | Self::ConversationBlockChanged { community_id, .. }
            | Self::TransactionUpdated { community_id, .. }
            | Self::DisputeOpened { community_id, .. }
            | Self::DisputeResolved { community_id, .. }
            | Self::ReviewSubmitted { community_id, .. } => *community_id,
        }
    }

    /// Returns the subscription topic: the listing, conversation or
    /// transaction the event is about.
    #[must_use]
    pub fn topic(&self) -> uuid::Uuid {
        match self {
            Self::ListingCreated { listing_id, .. }
            | Self::ListingUpdated { listing_id, .. }
            | Self::ListingStatusChanged { listing_id, .. }
            | Self::FavoriteToggled { listing_id, .. } => (*listing_id).into(),
            Self::ConversationStarted {
                conversation_id, ..
            }
            | Self::MessageSent {
                conversation_id, ..
            }
            | Self::MessagesRead {
                conversation_id, ..
            }
            | Self::ConversationBlockChanged {
                conversation_id, ..
            } => (*conversation_id).into(),
            Self::TransactionUpdated { transaction_id, .. }
            | Self::DisputeOpened { transaction_id, .. }
            | Self::DisputeResolved { transaction_id, .. }
            | Self::ReviewSubmitted { transaction_id, .. } => (*transaction_id).into(),
        }
    }

    /// Returns who may observe the event.
    #[must_use]
    pub fn audience(&self) -> Audience {
        match self {
            Self::ListingCreated {
                seller_id, status, ..
            }
            | Self::ListingUpdated {
                seller_id, status, ..
            }
            | Self::ListingStatusChanged {
                seller_id,
                to: status,
                ..
            } => {
                if matches!(status, ListingStatus::Draft | ListingStatus::Deleted) {
                    Audience::Members(vec![*seller_id])
                } else {
                    Audience::Community
                }
            }
            Self::FavoriteToggled {
                seller_id,
                member_id,
                ..
            } => Audience::Members(vec![*member_id, *seller_id]),
            Self::ConversationStarted {
                buyer_id,
                seller_id,
                ..
            }
            | Self::TransactionUpdated {
                buyer_id,
                seller_id,
                ..
            }
            | Self::DisputeOpened {
                buyer_id,
                seller_id,
                ..
            }
            | Self::DisputeResolved {
                buyer_id,
                seller_id,
                ..
            } => Audience::Members(vec![*buyer_id, *seller_id]),
            Self::MessageSent {
                recipient_id,
                message,
                ..
            } => Audience::Members(vec![message.sender_id, *recipient_id]),
            Self::MessagesRead {
                reader_id,
                counterpart_id,
                ..
            }
            | Self::ConversationBlockChanged {
                changed_by: reader_id,
                counterpart_id,
                ..
            } => Audience::Members(vec![*reader_id, *counterpart_id]),
            Self::ReviewSubmitted {
                reviewer_id,
                reviewee_id,
                ..
            } => Audience::Members(vec![*reviewer_id, *reviewee_id]),
        }
    }

    /// Returns `true` if `member` may receive this event.
    #[must_use]
    pub fn is_visible_to(&self, member: &Member) -> bool {
        if member.community_id != self.community_id() {
            return false;
        }
        match self.audience() {
            Audience::Community => true,
            Audience::Members(ids) => ids.contains(&member.member_id),
        }
    }

    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::ListingCreated { .. } => "listing_created",
            Self::ListingUpdated { .. } => "listing_updated",
            Self::ListingStatusChanged { .. } => "listing_status_changed",
            Self::FavoriteToggled { .. } => "favorite_toggled",
            Self::ConversationStarted { .. } => "conversation_started",
            Self::MessageSent { .. } => "message_sent",
            Self::MessagesRead { .. } => "messages_read",
            Self::ConversationBlockChanged { .. } => "conversation_block_changed",
            Self::TransactionUpdated { .. } => "transaction_updated",
            Self::DisputeOpened { .. } => "dispute_opened",
            Self::DisputeResolved { .. } => "dispute_resolved",
            Self::ReviewSubmitted { .. } => "review_submitted",
        }
    }
}
