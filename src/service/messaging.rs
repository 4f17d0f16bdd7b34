//! Buyer/seller conversations.

use chrono::Utc;
use rust_decimal::Decimal;

use super::MarketService;
use crate::domain::{
    Conversation, ConversationId, ConversationStatus, ListingId, ListingStatus, MarketEvent,
    Member, Message, MessageType, Principal, Side,
};
use crate::error::MarketError;
use crate::store::ConversationThread;

/// Member-authored message content.
#[derive(Debug, Clone)]
pub struct NewMessage {
    /// Body text; may be empty for offers.
    pub content: String,
    /// Kind of message.
    pub message_type: MessageType,
    /// Offered price, for offers only.
    pub offer_amount: Option<Decimal>,
}

/// Returns the caller's side, hiding foreign threads and refusing outsiders.
fn participant_side(member: &Member, conversation: &Conversation) -> Result<Side, MarketError> {
    if conversation.community_id != member.community_id {
        return Err(MarketError::not_found("conversation", conversation.id));
    }
    conversation.side_of(member.member_id).ok_or_else(|| {
        MarketError::PermissionDenied(
            "only the buyer and seller can access this conversation".to_string(),
        )
    })
}

impl MarketService {
    /// Returns the caller's conversation about a listing, opening it on
    /// first contact.
    ///
    /// # Errors
    ///
    /// [`MarketError::PermissionDenied`] for the listing's own seller,
    /// [`MarketError::InvalidState`] when opening a new conversation on a
    /// listing that is neither active nor reserved.
    pub async fn open_conversation(
        &self,
        principal: Principal,
        listing_id: ListingId,
    ) -> Result<Conversation, MarketError> {
        let member = self.resolve_member(principal).await?;
        let listing = self.store.listings.snapshot(listing_id).await?;
        if listing.community_id != member.community_id || listing.is_hidden() {
            return Err(MarketError::not_found("listing", listing_id));
        }
        if listing.seller_id == member.member_id {
            return Err(MarketError::PermissionDenied(
                "sellers cannot open a conversation on their own listing".to_string(),
            ));
        }

        let (conversation_id, created) = self
            .store
            .conversation_for(listing_id, member.member_id, || {
                if matches!(listing.status, ListingStatus::Active | ListingStatus::Reserved) {
                    Ok(Conversation::open(&listing, member.member_id))
                } else {
                    Err(MarketError::InvalidState(format!(
                        "listing is {}, conversations need an active or reserved listing",
                        listing.status.as_str()
                    )))
                }
            })
            .await?;
        let thread = self.store.conversations.snapshot(conversation_id).await?;

        if created {
            let c = &thread.conversation;
            self.emit(MarketEvent::ConversationStarted {
                community_id: c.community_id,
                conversation_id,
                listing_id,
                buyer_id: c.buyer_id,
                seller_id: c.seller_id,
                timestamp: c.created_at,
            });
            tracing::info!(%conversation_id, %listing_id, buyer_id = %c.buyer_id, "conversation started");
        }
        Ok(thread.conversation)
    }

    /// Lists the caller's conversations, most recent activity first.
    ///
    /// # Errors
    ///
    /// [`MarketError::NotAMember`].
    pub async fn list_conversations(
        &self,
        principal: Principal,
    ) -> Result<Vec<Conversation>, MarketError> {
        let member = self.resolve_member(principal).await?;
        let mut conversations: Vec<Conversation> = self
            .store
            .conversations
            .collect(|t| {
                t.conversation.community_id == member.community_id
                    && t.conversation.side_of(member.member_id).is_some()
            })
            .await
            .into_iter()
            .map(|t| t.conversation)
            .collect();
        conversations.sort_by(|a, b| {
            let a_at = a.last_message_at.unwrap_or(a.created_at);
            let b_at = b.last_message_at.unwrap_or(b.created_at);
            b_at.cmp(&a_at)
        });
        Ok(conversations)
    }

    /// Returns the messages of a conversation in send order.
    ///
    /// # Errors
    ///
    /// [`MarketError::PermissionDenied`] for non-participants.
    pub async fn list_messages(
        &self,
        principal: Principal,
        conversation_id: ConversationId,
    ) -> Result<Vec<Message>, MarketError> {
        let member = self.resolve_member(principal).await?;
        let row = self.store.conversations.get(conversation_id).await?;
        let thread = row.read().await;
        participant_side(&member, &thread.conversation)?;
        Ok(thread.messages.clone())
    }

    /// Appends a message and bumps the other side's unread counter.
    ///
    /// # Errors
    ///
    /// [`MarketError::PermissionDenied`] for non-participants and system
    /// messages, [`MarketError::InvalidState`] on a blocked conversation,
    /// [`MarketError::Validation`] for malformed content or offers.
    pub async fn send_message(
        &self,
        principal: Principal,
        conversation_id: ConversationId,
        input: NewMessage,
    ) -> Result<Message, MarketError> {
        let member = self.resolve_member(principal).await?;
        let row = self.store.conversations.get(conversation_id).await?;
        let mut thread = row.write().await;
        let side = participant_side(&member, &thread.conversation)?;
        if thread.conversation.status == ConversationStatus::Blocked {
            return Err(MarketError::InvalidState(
                "conversation is blocked".to_string(),
            ));
        }
        let message = Message::compose(
            conversation_id,
            member.member_id,
            &input.content,
            input.message_type,
            input.offer_amount,
        )?;

        let ConversationThread {
            conversation,
            messages,
        } = &mut *thread;
        conversation.record_message(side, message.created_at);
        messages.push(message.clone());
        let (community_id, recipient_id) = (conversation.community_id, conversation.counterpart(side));
        self.emit(MarketEvent::MessageSent {
            community_id,
            conversation_id,
            recipient_id,
            message: message.clone(),
            timestamp: message.created_at,
        });
        drop(thread);

        tracing::debug!(
            %conversation_id,
            message_id = %message.id,
            sender_id = %member.member_id,
            "message sent"
        );
        Ok(message)
    }

    /// Zeroes the caller's unread counter and stamps the other side's
    /// unread messages. Returns how many messages changed.
    ///
    /// # Errors
    ///
    /// [`MarketError::PermissionDenied`] for non-participants.
    pub async fn mark_read(
        &self,
        principal: Principal,
        conversation_id: ConversationId,
    ) -> Result<usize, MarketError> {
        let member = self.resolve_member(principal).await?;
        let row = self.store.conversations.get(conversation_id).await?;
        let mut thread = row.write().await;
        let side = participant_side(&member, &thread.conversation)?;

        let now = Utc::now();
        let ConversationThread {
            conversation,
            messages,
        } = &mut *thread;
        conversation.clear_unread(side);
        let marked = messages
            .iter_mut()
            .filter(|m| m.sender_id != member.member_id)
            .map(|m| m.mark_read(now))
            .filter(|changed| *changed)
            .count();
        let (community_id, counterpart_id) = (conversation.community_id, conversation.counterpart(side));
        if marked > 0 {
            self.emit(MarketEvent::MessagesRead {
                community_id,
                conversation_id,
                reader_id: member.member_id,
                counterpart_id,
                marked,
                timestamp: now,
            });
        }
        drop(thread);

        Ok(marked)
    }

    /// Blocks or unblocks a conversation. Either participant may do both.
    ///
    /// # Errors
    ///
    /// [`MarketError::PermissionDenied`] for non-participants.
    pub async fn set_conversation_blocked(
        &self,
        principal: Principal,
        conversation_id: ConversationId,
        blocked: bool,
    ) -> Result<Conversation, MarketError> {
        let member = self.resolve_member(principal).await?;
        let row = self.store.conversations.get(conversation_id).await?;
        let mut thread = row.write().await;
        let side = participant_side(&member, &thread.conversation)?;
        let next = if blocked {
            ConversationStatus::Blocked
        } else {
            ConversationStatus::Active
        };
        let changed = thread.conversation.status != next;
        thread.conversation.status = next;
        let conversation = thread.conversation.clone();
        if changed {
            self.emit(MarketEvent::ConversationBlockChanged {
                community_id: conversation.community_id,
                conversation_id,
                changed_by: member.member_id,
                counterpart_id: conversation.counterpart(side),
                blocked,
                timestamp: Utc::now(),
            });
            tracing::info!(%conversation_id, by = %member.member_id, blocked, "conversation block changed");
        }
        drop(thread);

        Ok(conversation)
    }
}
