//! Seller reputation, derived on read.
//!
//! Nothing here is stored; every call folds the current transactions,
//! reviews and conversations of the caller's community.

use std::collections::HashSet;

use rust_decimal::Decimal;

use super::MarketService;
use crate::domain::fee::round_cents;
use crate::domain::{
    MemberId, Principal, Review, SellerStats, Transaction, TransactionId, TransactionStatus,
};
use crate::error::MarketError;

/// Folds a seller's records into [`SellerStats`].
///
/// `sales` may contain any transaction; only completed sales by
/// `member_id` count. `replied` has one entry per seller-side conversation,
/// `true` if the seller sent at least one message in it.
#[must_use]
pub fn aggregate(
    member_id: MemberId,
    sales: &[Transaction],
    disputed: &HashSet<TransactionId>,
    reviews: &[Review],
    replied: &[bool],
) -> SellerStats {
    let completed: Vec<&Transaction> = sales
        .iter()
        .filter(|t| t.seller_id == member_id && t.status == TransactionStatus::Completed)
        .collect();
    let total_revenue = completed
        .iter()
        .fold(Decimal::ZERO, |acc, t| acc.saturating_add(t.net_amount));
    let successful = completed
        .iter()
        .filter(|t| !disputed.contains(&t.id))
        .count();

    let ratings: Vec<u8> = reviews
        .iter()
        .filter(|r| r.reviewee_id == member_id && r.is_buyer_review)
        .map(|r| r.rating)
        .collect();
    let average_rating = if ratings.is_empty() {
        Decimal::ZERO
    } else {
        let sum = ratings.iter().map(|r| Decimal::from(*r)).sum::<Decimal>();
        round_cents(sum / Decimal::from(ratings.len()))
    };

    let response_rate = if replied.is_empty() {
        Decimal::ZERO
    } else {
        let answered = replied.iter().filter(|r| **r).count();
        round_cents(
            Decimal::from(answered) * Decimal::ONE_HUNDRED / Decimal::from(replied.len()),
        )
    };

    SellerStats {
        member_id,
        total_sales: completed.len() as u64,
        total_revenue,
        average_rating,
        total_reviews: ratings.len() as u64,
        successful_transactions: successful as u64,
        response_rate,
    }
}

impl MarketService {
    /// Computes a member's seller stats within the caller's community.
    ///
    /// # Errors
    ///
    /// [`MarketError::NotAMember`].
    pub async fn seller_stats(
        &self,
        principal: Principal,
        member_id: MemberId,
    ) -> Result<SellerStats, MarketError> {
        let caller = self.resolve_member(principal).await?;
        let community_id = caller.community_id;

        let sales = self
            .store
            .transactions
            .collect(|t| t.community_id == community_id && t.seller_id == member_id)
            .await;
        let disputed = self.store.disputed_transactions().await;
        let reviews = self
            .store
            .reviews_where(|r| r.community_id == community_id && r.reviewee_id == member_id)
            .await;
        let replied: Vec<bool> = self
            .store
            .conversations
            .collect(|t| {
                t.conversation.community_id == community_id
                    && t.conversation.seller_id == member_id
            })
            .await
            .iter()
            .map(|t| t.messages.iter().any(|m| m.sender_id == member_id))
            .collect();

        Ok(aggregate(member_id, &sales, &disputed, &reviews, &replied))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::domain::{DisputeReason, DisputeResolution, MemberRole, MessageType};
    use crate::service::NewMessage;
    use crate::service::test_support::{Fixture, draft};

    #[test]
    fn empty_history_is_all_zero() {
        let stats = aggregate(MemberId::new(), &[], &HashSet::new(), &[], &[]);
        assert_eq!(stats.total_sales, 0);
        assert_eq!(stats.average_rating, Decimal::ZERO);
        assert_eq!(stats.response_rate, Decimal::ZERO);
    }

    #[test]
    fn response_rate_rounds_to_cents() {
        let stats = aggregate(
            MemberId::new(),
            &[],
            &HashSet::new(),
            &[],
            &[true, false, false],
        );
        assert_eq!(stats.response_rate, dec!(33.33));
    }

    #[tokio::test]
    async fn hundred_dollar_sale_through_review() {
        let fx = Fixture::new();
        let (seller, seller_member) = fx.join(MemberRole::Member).await;
        let (buyer, _) = fx.join(MemberRole::Member).await;
        let Ok(listing) = fx
            .service
            .create_listing(seller, draft(dec!(100.00), dec!(10.00)))
            .await
        else {
            panic!("listing should be created");
        };

        let Ok(conv) = fx.service.open_conversation(buyer, listing.id).await else {
            panic!("conversation should open");
        };
        let hello = NewMessage {
            content: "Is it still available?".to_string(),
            message_type: MessageType::Text,
            offer_amount: None,
        };
        let reply = NewMessage {
            content: "Yes!".to_string(),
            ..hello.clone()
        };
        let _ = fx.service.send_message(buyer, conv.id, hello).await;
        let _ = fx.service.send_message(seller, conv.id, reply).await;

        let Ok(tx) = fx.service.initiate_purchase(buyer, listing.id, None).await else {
            panic!("purchase should start");
        };
        assert_eq!(tx.total_price, dec!(115.50));
        let _ = fx.service.mark_paid(tx.id, Some("pi_42".to_string())).await;
        let _ = fx.service.confirm_delivery(buyer, tx.id).await;
        let Ok(_) = fx.service.submit_review(buyer, tx.id, 5, None).await else {
            panic!("review accepted");
        };

        let Ok(stats) = fx.service.seller_stats(buyer, seller_member.member_id).await else {
            panic!("stats computed");
        };
        assert_eq!(stats.total_sales, 1);
        assert_eq!(stats.total_revenue, dec!(104.50));
        assert_eq!(stats.successful_transactions, 1);
        assert_eq!(stats.average_rating, dec!(5.00));
        assert_eq!(stats.total_reviews, 1);
        assert_eq!(stats.response_rate, dec!(100.00));
    }

    #[tokio::test]
    async fn disputed_sale_is_not_successful() {
        let fx = Fixture::new();
        let (seller, seller_member) = fx.join(MemberRole::Member).await;
        let (buyer, _) = fx.join(MemberRole::Member).await;
        let (admin, _) = fx.join(MemberRole::Admin).await;
        let Ok(listing) = fx.service.create_listing(seller, draft(dec!(50), dec!(0))).await else {
            panic!("listing should be created");
        };
        let Ok(tx) = fx.service.initiate_purchase(buyer, listing.id, None).await else {
            panic!("purchase should start");
        };
        let _ = fx.service.mark_paid(tx.id, None).await;
        let Ok(dispute) = fx
            .service
            .open_dispute(buyer, tx.id, DisputeReason::ItemNotReceived, "nothing came")
            .await
        else {
            panic!("dispute opened");
        };
        let _ = fx
            .service
            .resolve_dispute(admin, dispute.id, DisputeResolution::ReleaseToSeller, None)
            .await;

        let Ok(stats) = fx.service.seller_stats(seller, seller_member.member_id).await else {
            panic!("stats computed");
        };
        assert_eq!(stats.total_sales, 1);
        assert_eq!(stats.successful_transactions, 0);
        assert_eq!(stats.total_reviews, 0);
    }
}
