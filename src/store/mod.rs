//! In-process market store.
//!
//! Tables follow the registry layout of [`table::Table`]: one outer map and
//! one lock per row. Unique constraints that span rows (one conversation per
//! listing and buyer, one dispute per transaction, one review per
//! transaction and reviewer, one favorite per member and listing) live in
//! small indexes guarded by their own mutex.
//!
//! Lock order for operations touching several rows:
//! listing → favorites → transaction → dispute index / dispute rows →
//! reviews. Conversation rows are never locked together with any of those.

pub mod table;

use std::collections::{HashMap, HashSet};

use tokio::sync::{Mutex, RwLock};

use crate::domain::{
    Conversation, ConversationId, Dispute, DisputeId, Listing, ListingId, MemberId, Message,
    Review, Transaction, TransactionId,
};
use crate::error::MarketError;

pub use table::{Row, Table};

/// A conversation together with its messages, locked as one row.
#[derive(Debug, Clone)]
pub struct ConversationThread {
    /// Conversation header with unread counters.
    pub conversation: Conversation,
    /// Messages in send order.
    pub messages: Vec<Message>,
}

/// All marketplace records of every community.
#[derive(Debug)]
pub struct MarketStore {
    /// Listings by id.
    pub listings: Table<ListingId, Listing>,
    /// Conversations with their messages.
    pub conversations: Table<ConversationId, ConversationThread>,
    /// Transactions by id.
    pub transactions: Table<TransactionId, Transaction>,
    /// Disputes by id.
    pub disputes: Table<DisputeId, Dispute>,
    favorites: Mutex<HashSet<(ListingId, MemberId)>>,
    conversation_index: Mutex<HashMap<(ListingId, MemberId), ConversationId>>,
    dispute_index: Mutex<HashMap<TransactionId, DisputeId>>,
    reviews: RwLock<HashMap<(TransactionId, MemberId), Review>>,
}

impl MarketStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            listings: Table::new("listing"),
            conversations: Table::new("conversation"),
            transactions: Table::new("transaction"),
            disputes: Table::new("dispute"),
            favorites: Mutex::new(HashSet::new()),
            conversation_index: Mutex::new(HashMap::new()),
            dispute_index: Mutex::new(HashMap::new()),
            reviews: RwLock::new(HashMap::new()),
        }
    }

    /// Flips the favorite flag of `(listing, member)` and returns the new
    /// state. Callers hold the listing's write lock so the listing counter
    /// moves together with the set.
    pub async fn toggle_favorite(&self, listing_id: ListingId, member_id: MemberId) -> bool {
        let mut favorites = self.favorites.lock().await;
        let key = (listing_id, member_id);
        if favorites.remove(&key) {
            false
        } else {
            favorites.insert(key);
            true
        }
    }

    /// Returns the listings `member_id` has favorited.
    pub async fn favorites_of(&self, member_id: MemberId) -> Vec<ListingId> {
        self.favorites
            .lock()
            .await
            .iter()
            .filter(|(_, member)| *member == member_id)
            .map(|(listing, _)| *listing)
            .collect()
    }

    /// Returns the conversation for `(listing, buyer)`, creating it with
    /// `open` if none exists. The flag is `true` when a row was created.
    ///
    /// # Errors
    ///
    /// Propagates errors from `open` and from the insert.
    pub async fn conversation_for<F>(
        &self,
        listing_id: ListingId,
        buyer_id: MemberId,
        open: F,
    ) -> Result<(ConversationId, bool), MarketError>
    where
        F: FnOnce() -> Result<Conversation, MarketError>,
    {
        let mut index = self.conversation_index.lock().await;
        if let Some(id) = index.get(&(listing_id, buyer_id)) {
            return Ok((*id, false));
        }
        let conversation = open()?;
        let id = conversation.id;
        self.conversations
            .insert(
                id,
                ConversationThread {
                    conversation,
                    messages: Vec::new(),
                },
            )
            .await?;
        index.insert((listing_id, buyer_id), id);
        Ok((id, true))
    }

    /// Returns the dispute ever filed against `transaction_id`, if any.
    pub async fn dispute_of(&self, transaction_id: TransactionId) -> Option<DisputeId> {
        self.dispute_index
            .lock()
            .await
            .get(&transaction_id)
            .copied()
    }

    /// Returns every transaction that has (or had) a dispute.
    pub async fn disputed_transactions(&self) -> HashSet<TransactionId> {
        self.dispute_index.lock().await.keys().copied().collect()
    }

    /// Inserts a dispute under the one-per-transaction unique index.
    ///
    /// # Errors
    ///
    /// [`MarketError::Conflict`] if the transaction already has a dispute.
    pub async fn insert_dispute(&self, dispute: Dispute) -> Result<(), MarketError> {
        let mut index = self.dispute_index.lock().await;
        if index.contains_key(&dispute.transaction_id) {
            return Err(MarketError::Conflict(format!(
                "transaction {} already has a dispute",
                dispute.transaction_id
            )));
        }
        let (id, transaction_id) = (dispute.id, dispute.transaction_id);
        self.disputes.insert(id, dispute).await?;
        index.insert(transaction_id, id);
        Ok(())
    }

    /// Inserts a review under the one-per-reviewer unique index.
    ///
    /// # Errors
    ///
    /// [`MarketError::DuplicateReview`] if the reviewer already reviewed the
    /// transaction.
    pub async fn insert_review(&self, review: Review) -> Result<(), MarketError> {
        let mut reviews = self.reviews.write().await;
        let key = (review.transaction_id, review.reviewer_id);
        if reviews.contains_key(&key) {
            return Err(MarketError::DuplicateReview);
        }
        reviews.insert(key, review);
        Ok(())
    }

    /// Returns copies of every review matching `keep`, newest first.
    pub async fn reviews_where<F>(&self, keep: F) -> Vec<Review>
    where
        F: Fn(&Review) -> bool,
    {
        let mut out: Vec<Review> = self
            .reviews
            .read()
            .await
            .values()
            .filter(|r| keep(r))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out
    }
}

impl Default for MarketStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{CommunityId, DisputeReason, ReviewId};
    use chrono::Utc;

    #[tokio::test]
    async fn favorite_toggle_twice_nets_zero() {
        let store = MarketStore::new();
        let (listing, member) = (ListingId::new(), MemberId::new());
        assert!(store.toggle_favorite(listing, member).await);
        assert_eq!(store.favorites_of(member).await, vec![listing]);
        assert!(!store.toggle_favorite(listing, member).await);
        assert!(store.favorites_of(member).await.is_empty());
    }

    fn dispute(transaction_id: TransactionId) -> Dispute {
        Dispute {
            id: DisputeId::new(),
            community_id: CommunityId::new(),
            transaction_id,
            initiated_by: MemberId::new(),
            reason: DisputeReason::Other,
            description: "broken".to_string(),
            resolved: false,
            resolution: None,
            resolution_note: None,
            resolved_by: None,
            created_at: Utc::now(),
            resolved_at: None,
        }
    }

    #[tokio::test]
    async fn second_dispute_violates_unique_index() {
        let store = MarketStore::new();
        let tx = TransactionId::new();
        assert!(store.insert_dispute(dispute(tx)).await.is_ok());
        assert!(matches!(
            store.insert_dispute(dispute(tx)).await,
            Err(MarketError::Conflict(_))
        ));
        assert!(store.dispute_of(tx).await.is_some());
        assert_eq!(store.disputes.len().await, 1);
    }

    #[tokio::test]
    async fn duplicate_review_rejected() {
        let store = MarketStore::new();
        let review = Review {
            id: ReviewId::new(),
            community_id: CommunityId::new(),
            transaction_id: TransactionId::new(),
            reviewer_id: MemberId::new(),
            reviewee_id: MemberId::new(),
            listing_id: ListingId::new(),
            rating: 4,
            content: None,
            is_buyer_review: true,
            created_at: Utc::now(),
        };
        let mut again = review.clone();
        again.id = ReviewId::new();
        assert!(store.insert_review(review).await.is_ok());
        assert!(matches!(
            store.insert_review(again).await,
            Err(MarketError::DuplicateReview)
        ));
    }
}
