//! Reviews and the derived seller reputation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::conversation::Side;
use super::{CommunityId, ListingId, MemberId, ReviewId, Transaction, TransactionId, TransactionStatus};
use crate::error::MarketError;

/// Lowest rating.
pub const MIN_RATING: u8 = 1;
/// Highest rating.
pub const MAX_RATING: u8 = 5;

/// Clamps any integer rating into `MIN_RATING..=MAX_RATING`.
#[must_use]
pub fn clamp_rating(rating: i64) -> u8 {
    let clamped = rating.clamp(i64::from(MIN_RATING), i64::from(MAX_RATING));
    u8::try_from(clamped).unwrap_or(MIN_RATING)
}

/// Rating left by one transaction party about the other. Immutable.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Review {
    /// Review identifier.
    pub id: ReviewId,
    /// Owning community.
    pub community_id: CommunityId,
    /// Reviewed transaction.
    pub transaction_id: TransactionId,
    /// Author.
    pub reviewer_id: MemberId,
    /// Subject (the other party).
    pub reviewee_id: MemberId,
    /// Purchased listing.
    pub listing_id: ListingId,
    /// Rating, 1 to 5.
    pub rating: u8,
    /// Optional text.
    pub content: Option<String>,
    /// `true` if the buyer wrote it (i.e. it rates the seller).
    pub is_buyer_review: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Review {
    /// Writes a review of the other party on a completed transaction.
    ///
    /// Uniqueness per reviewer is enforced by the store.
    ///
    /// # Errors
    ///
    /// [`MarketError::PermissionDenied`] unless `reviewer_id` is a party,
    /// [`MarketError::InvalidState`] unless the transaction is completed.
    pub fn for_transaction(
        tx: &Transaction,
        reviewer_id: MemberId,
        rating: i64,
        content: Option<String>,
    ) -> Result<Self, MarketError> {
        let side = tx.side_of(reviewer_id).ok_or_else(|| {
            MarketError::PermissionDenied(
                "only the buyer or seller can review a transaction".to_string(),
            )
        })?;
        if tx.status != TransactionStatus::Completed {
            return Err(MarketError::InvalidState(format!(
                "transaction is {}, reviews need a completed transaction",
                tx.status.as_str()
            )));
        }
        let reviewee_id = match side {
            Side::Buyer => tx.seller_id,
            Side::Seller => tx.buyer_id,
        };
        Ok(Self {
            id: ReviewId::new(),
            community_id: tx.community_id,
            transaction_id: tx.id,
            reviewer_id,
            reviewee_id,
            listing_id: tx.listing_id,
            rating: clamp_rating(rating),
            content: content
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            is_buyer_review: side == Side::Buyer,
            created_at: Utc::now(),
        })
    }
}

/// Seller reputation rolled up from transactions, reviews and conversations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SellerStats {
    /// Member the stats describe.
    pub member_id: MemberId,
    /// Completed sales.
    pub total_sales: u64,
    /// Sum of net amounts of completed sales.
    pub total_revenue: Decimal,
    /// Mean rating from buyer reviews, two decimals; zero without reviews.
    pub average_rating: Decimal,
    /// Number of buyer reviews.
    pub total_reviews: u64,
    /// Completed sales that never had a dispute.
    pub successful_transactions: u64,
    /// Percentage of seller-side conversations the member replied to.
    pub response_rate: Decimal,
}
