//! Buyer/seller conversations and their messages.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{CommunityId, ConversationId, Listing, ListingId, MemberId, MessageId};
use crate::error::MarketError;

/// Longest accepted message body, in characters.
pub const MAX_MESSAGE_LEN: usize = 4_000;

/// Which side of a conversation or transaction a member is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// The member who contacted the seller / bought the item.
    Buyer,
    /// The listing owner.
    Seller,
}

/// Conversation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    /// Messages may be exchanged.
    Active,
    /// One participant blocked the thread; no new messages.
    Blocked,
}

/// Kind of message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// Plain text.
    Text,
    /// Price offer; carries `offer_amount`.
    Offer,
    /// Generated by the platform, never by members.
    System,
}

/// Messaging thread between one buyer and the seller of one listing.
///
/// Unique per `(listing_id, buyer_id)`. The seller is copied from the listing
/// when the conversation is created and never re-derived.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Conversation {
    /// Conversation identifier.
    pub id: ConversationId,
    /// Owning community.
    pub community_id: CommunityId,
    /// Listing being discussed.
    pub listing_id: ListingId,
    /// Interested member.
    pub buyer_id: MemberId,
    /// Listing owner at creation time.
    pub seller_id: MemberId,
    /// Time of the latest message, if any.
    pub last_message_at: Option<DateTime<Utc>>,
    /// Messages the buyer has not read yet.
    pub buyer_unread_count: u32,
    /// Messages the seller has not read yet.
    pub seller_unread_count: u32,
    /// Thread status.
    pub status: ConversationStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Opens a conversation about `listing` for `buyer_id`.
    #[must_use]
    pub fn open(listing: &Listing, buyer_id: MemberId) -> Self {
        Self {
            id: ConversationId::new(),
            community_id: listing.community_id,
            listing_id: listing.id,
            buyer_id,
            seller_id: listing.seller_id,
            last_message_at: None,
            buyer_unread_count: 0,
            seller_unread_count: 0,
            status: ConversationStatus::Active,
            created_at: Utc::now(),
        }
    }

    /// Returns the side `member_id` is on, or `None` for outsiders.
    #[must_use]
    pub fn side_of(&self, member_id: MemberId) -> Option<Side> {
        if member_id == self.buyer_id {
            Some(Side::Buyer)
        } else if member_id == self.seller_id {
            Some(Side::Seller)
        } else {
            None
        }
    }

    /// Returns the member on the opposite side.
    #[must_use]
    pub fn counterpart(&self, side: Side) -> MemberId {
        match side {
            Side::Buyer => self.seller_id,
            Side::Seller => self.buyer_id,
        }
    }

    /// Records a new message from `sender`: bumps `last_message_at` and the
    /// other side's unread counter.
    pub fn record_message(&mut self, sender: Side, at: DateTime<Utc>) {
        self.last_message_at = Some(at);
        match sender {
            Side::Buyer => self.seller_unread_count = self.seller_unread_count.saturating_add(1),
            Side::Seller => self.buyer_unread_count = self.buyer_unread_count.saturating_add(1),
        }
    }

    /// Zeroes `reader`'s unread counter.
    pub fn clear_unread(&mut self, reader: Side) {
        match reader {
            Side::Buyer => self.buyer_unread_count = 0,
            Side::Seller => self.seller_unread_count = 0,
        }
    }

    /// Returns `reader`'s unread counter.
    #[must_use]
    pub fn unread_for(&self, reader: Side) -> u32 {
        match reader {
            Side::Buyer => self.buyer_unread_count,
            Side::Seller => self.seller_unread_count,
        }
    }
}

/// A single message.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Message {
    /// Message identifier.
    pub id: MessageId,
    /// Owning conversation.
    pub conversation_id: ConversationId,
    /// Author.
    pub sender_id: MemberId,
    /// Body text.
    pub content: String,
    /// Kind of message.
    pub message_type: MessageType,
    /// Offered price, present exactly for offers.
    pub offer_amount: Option<Decimal>,
    /// Whether the recipient has read it.
    pub is_read: bool,
    /// When the recipient read it.
    pub read_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Builds a member-authored message after validating its shape.
    ///
    /// Offers may omit `content`; a short description of the offer is used.
    ///
    /// # Errors
    ///
    /// [`MarketError::PermissionDenied`] for `System` messages,
    /// [`MarketError::Validation`] for an empty body, a missing or
    /// non-positive offer amount, or an amount on a non-offer message.
    pub fn compose(
        conversation_id: ConversationId,
        sender_id: MemberId,
        content: &str,
        message_type: MessageType,
        offer_amount: Option<Decimal>,
    ) -> Result<Self, MarketError> {
        let content = content.trim();
        let content = match (message_type, offer_amount) {
            (MessageType::System, _) => {
                return Err(MarketError::PermissionDenied(
                    "system messages are generated by the platform".to_string(),
                ));
            }
            (MessageType::Offer, None) => {
                return Err(MarketError::Validation(
                    "offer messages need an offer_amount".to_string(),
                ));
            }
            (MessageType::Offer, Some(amount)) if amount <= Decimal::ZERO => {
                return Err(MarketError::Validation(format!(
                    "offer_amount must be positive, got {amount}"
                )));
            }
            (MessageType::Offer, Some(amount)) if content.is_empty() => {
                format!("Offered {amount}")
            }
            (MessageType::Text, Some(_)) => {
                return Err(MarketError::Validation(
                    "offer_amount is only allowed on offer messages".to_string(),
                ));
            }
            (MessageType::Text, None) if content.is_empty() => {
                return Err(MarketError::Validation(
                    "message content is required".to_string(),
                ));
            }
            _ => content.to_string(),
        };
        if content.chars().count() > MAX_MESSAGE_LEN {
            return Err(MarketError::Validation(format!(
                "message exceeds {MAX_MESSAGE_LEN} characters"
            )));
        }

        Ok(Self {
            id: MessageId::new(),
            conversation_id,
            sender_id,
            content,
            message_type,
            offer_amount,
            is_read: false,
            read_at: None,
            created_at: Utc::now(),
        })
    }

    /// Marks the message read at `at` unless it already was.
    ///
    /// Returns `true` if the message changed.
    pub fn mark_read(&mut self, at: DateTime<Utc>) -> bool {
        if self.is_read {
            return false;
        }
        self.is_read = true;
        self.read_at = Some(at);
        true
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn conversation() -> Conversation {
        Conversation {
            id: ConversationId::new(),
            community_id: CommunityId::new(),
            listing_id: ListingId::new(),
            buyer_id: MemberId::new(),
            seller_id: MemberId::new(),
            last_message_at: None,
            buyer_unread_count: 0,
            seller_unread_count: 0,
            status: ConversationStatus::Active,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn message_increments_other_side() {
        let mut c = conversation();
        c.record_message(Side::Buyer, Utc::now());
        c.record_message(Side::Buyer, Utc::now());
        assert_eq!(c.seller_unread_count, 2);
        assert_eq!(c.buyer_unread_count, 0);
        assert!(c.last_message_at.is_some());
        c.clear_unread(Side::Seller);
        assert_eq!(c.unread_for(Side::Seller), 0);
    }

    #[test]
    fn side_of_outsider_is_none() {
        let c = conversation();
        assert_eq!(c.side_of(c.buyer_id), Some(Side::Buyer));
        assert_eq!(c.side_of(c.seller_id), Some(Side::Seller));
        assert_eq!(c.side_of(MemberId::new()), None);
        assert_eq!(c.counterpart(Side::Buyer), c.seller_id);
    }

    #[test]
    fn offer_requires_positive_amount() {
        let c = conversation();
        let missing = Message::compose(c.id, c.buyer_id, "how about", MessageType::Offer, None);
        assert!(matches!(missing, Err(MarketError::Validation(_))));
        let zero = Message::compose(c.id, c.buyer_id, "", MessageType::Offer, Some(dec!(0)));
        assert!(matches!(zero, Err(MarketError::Validation(_))));
        let Ok(ok) = Message::compose(c.id, c.buyer_id, "", MessageType::Offer, Some(dec!(30)))
        else {
            panic!("offer with amount should be accepted");
        };
        assert_eq!(ok.content, "Offered 30");
    }

    #[test]
    fn text_rejects_amount_and_empty_body() {
        let c = conversation();
        assert!(Message::compose(c.id, c.buyer_id, "hi", MessageType::Text, Some(dec!(5))).is_err());
        assert!(Message::compose(c.id, c.buyer_id, "  ", MessageType::Text, None).is_err());
    }

    #[test]
    fn members_cannot_send_system_messages() {
        let c = conversation();
        let result = Message::compose(c.id, c.buyer_id, "sold!", MessageType::System, None);
        assert!(matches!(result, Err(MarketError::PermissionDenied(_))));
    }

    #[test]
    fn mark_read_is_idempotent() {
        let c = conversation();
        let Ok(mut m) = Message::compose(c.id, c.buyer_id, "hello", MessageType::Text, None) else {
            panic!("valid message");
        };
        assert!(m.mark_read(Utc::now()));
        let first = m.read_at;
        assert!(!m.mark_read(Utc::now()));
        assert_eq!(m.read_at, first);
    }
}
