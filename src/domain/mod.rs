//! Domain layer: marketplace records, their state machines, and events.
//!
//! Every record here is scoped to one community. The types own their
//! transition rules; the service layer only decides who may call them and
//! in which lock order.

pub mod conversation;
pub mod dispute;
pub mod event_bus;
pub mod fee;
pub mod ids;
pub mod listing;
pub mod market_event;
pub mod member;
pub mod review;
pub mod transaction;

pub use conversation::{Conversation, ConversationStatus, Message, MessageType, Side};
pub use dispute::{Dispute, DisputeReason, DisputeResolution};
pub use event_bus::EventBus;
pub use fee::{FeeSchedule, FeeTier, TieredFeeSchedule};
pub use ids::{
    CommunityId, ConversationId, DisputeId, ListingId, MemberId, MessageId, ReviewId,
    TransactionId, UserId,
};
pub use listing::{ItemCondition, Listing, ListingDraft, ListingPatch, ListingStatus};
pub use market_event::{Audience, MarketEvent, TransactionChange};
pub use member::{Member, MemberRole, MemberStatus, Principal};
pub use review::{Review, SellerStats};
pub use transaction::{
    DeliveryMethod, EscrowStatus, PurchaseQuote, Transaction, TransactionStatus,
};
