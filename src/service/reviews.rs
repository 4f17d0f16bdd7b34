//! Reviews on completed transactions.

use super::{MarketService, ensure_community};
use crate::domain::{MarketEvent, MemberId, Principal, Review, TransactionId};
use crate::error::MarketError;

impl MarketService {
    /// Records the caller's review of the other party.
    ///
    /// Ratings outside 1..=5 are clamped.
    ///
    /// # Errors
    ///
    /// [`MarketError::PermissionDenied`] unless the caller is a party,
    /// [`MarketError::InvalidState`] unless the transaction is completed,
    /// [`MarketError::DuplicateReview`] on a second review by the same
    /// member.
    pub async fn submit_review(
        &self,
        principal: Principal,
        transaction_id: TransactionId,
        rating: i64,
        content: Option<String>,
    ) -> Result<Review, MarketError> {
        let member = self.resolve_member(principal).await?;
        let row = self.store.transactions.get(transaction_id).await?;
        let tx = row.read().await;
        ensure_community(&member, tx.community_id, "transaction", transaction_id)?;
        let review = Review::for_transaction(&tx, member.member_id, rating, content)?;
        self.store.insert_review(review.clone()).await?;
        self.emit(MarketEvent::ReviewSubmitted {
            community_id: review.community_id,
            review_id: review.id,
            transaction_id,
            reviewer_id: review.reviewer_id,
            reviewee_id: review.reviewee_id,
            rating: review.rating,
            timestamp: review.created_at,
        });
        drop(tx);

        tracing::info!(
            review_id = %review.id,
            %transaction_id,
            reviewer_id = %review.reviewer_id,
            rating = review.rating,
            "review submitted"
        );
        Ok(review)
    }

    /// Lists reviews written about `member_id`, newest first.
    ///
    /// # Errors
    ///
    /// [`MarketError::NotAMember`].
    pub async fn list_reviews(
        &self,
        principal: Principal,
        member_id: MemberId,
    ) -> Result<Vec<Review>, MarketError> {
        let caller = self.resolve_member(principal).await?;
        Ok(self
            .store
            .reviews_where(|r| r.community_id == caller.community_id && r.reviewee_id == member_id)
            .await)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::domain::{MemberRole, Transaction};
    use crate::service::test_support::{Fixture, draft};

    async fn completed(fx: &Fixture) -> (Principal, Principal, Transaction) {
        let (seller, _) = fx.join(MemberRole::Member).await;
        let (buyer, _) = fx.join(MemberRole::Member).await;
        let Ok(listing) = fx.service.create_listing(seller, draft(dec!(30), dec!(0))).await else {
            panic!("listing should be created");
        };
        let Ok(tx) = fx.service.initiate_purchase(buyer, listing.id, None).await else {
            panic!("purchase should start");
        };
        let _ = fx.service.mark_paid(tx.id, None).await;
        let Ok(tx) = fx.service.confirm_delivery(buyer, tx.id).await else {
            panic!("buyer confirms");
        };
        (seller, buyer, tx)
    }

    #[tokio::test]
    async fn second_review_is_duplicate() {
        let fx = Fixture::new();
        let (_, buyer, tx) = completed(&fx).await;
        let Ok(review) = fx
            .service
            .submit_review(buyer, tx.id, 5, Some("smooth".to_string()))
            .await
        else {
            panic!("first review accepted");
        };
        assert_eq!(review.reviewee_id, tx.seller_id);
        assert!(matches!(
            fx.service.submit_review(buyer, tx.id, 1, None).await,
            Err(MarketError::DuplicateReview)
        ));
    }

    #[tokio::test]
    async fn both_sides_may_review_once() {
        let fx = Fixture::new();
        let (seller, buyer, tx) = completed(&fx).await;
        assert!(fx.service.submit_review(buyer, tx.id, 4, None).await.is_ok());
        let Ok(review) = fx.service.submit_review(seller, tx.id, 0, None).await else {
            panic!("seller review accepted");
        };
        assert_eq!(review.rating, 1);
        assert!(!review.is_buyer_review);

        let Ok(about_seller) = fx.service.list_reviews(buyer, tx.seller_id).await else {
            panic!("reviews listed");
        };
        assert_eq!(about_seller.len(), 1);
    }

    #[tokio::test]
    async fn open_transaction_cannot_be_reviewed() {
        let fx = Fixture::new();
        let (seller, _) = fx.join(MemberRole::Member).await;
        let (buyer, _) = fx.join(MemberRole::Member).await;
        let Ok(listing) = fx.service.create_listing(seller, draft(dec!(30), dec!(0))).await else {
            panic!("listing should be created");
        };
        let Ok(tx) = fx.service.initiate_purchase(buyer, listing.id, None).await else {
            panic!("purchase should start");
        };
        assert!(matches!(
            fx.service.submit_review(buyer, tx.id, 5, None).await,
            Err(MarketError::InvalidState(_))
        ));
    }
}
