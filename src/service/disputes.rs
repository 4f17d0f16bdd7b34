//! Dispute filing and admin resolution.
//!
//! Both operations change a dispute row and its transaction together. The
//! transaction's write lock is taken first and held across the dispute
//! update, and every check runs on copies before anything is written, so
//! either both rows change or neither does.

use super::{MarketService, ensure_community};
use crate::domain::{
    Dispute, DisputeId, DisputeReason, DisputeResolution, MarketEvent, Principal,
    TransactionChange, TransactionId,
};
use crate::error::MarketError;

impl MarketService {
    /// Opens the one dispute a transaction may ever have and freezes its
    /// funds.
    ///
    /// # Errors
    ///
    /// [`MarketError::PermissionDenied`] unless the caller is a party,
    /// [`MarketError::InvalidState`] unless escrow is held and no dispute
    /// was filed before, [`MarketError::Validation`] for an empty
    /// description, [`MarketError::Conflict`] on a unique-index race.
    pub async fn open_dispute(
        &self,
        principal: Principal,
        transaction_id: TransactionId,
        reason: DisputeReason,
        description: &str,
    ) -> Result<Dispute, MarketError> {
        let member = self.resolve_member(principal).await?;
        let row = self.store.transactions.get(transaction_id).await?;
        let mut tx = row.write().await;
        ensure_community(&member, tx.community_id, "transaction", transaction_id)?;
        tx.ensure_disputable(member.member_id)?;
        if self.store.dispute_of(transaction_id).await.is_some() {
            return Err(MarketError::InvalidState(
                "this transaction already had a dispute".to_string(),
            ));
        }

        let dispute = Dispute::file(&tx, member.member_id, reason, description)?;
        let mut next = tx.clone();
        next.mark_disputed()?;
        self.store.insert_dispute(dispute.clone()).await?;
        *tx = next;
        let updated = tx.clone();
        self.emit(MarketEvent::DisputeOpened {
            community_id: dispute.community_id,
            dispute_id: dispute.id,
            transaction_id,
            buyer_id: updated.buyer_id,
            seller_id: updated.seller_id,
            initiated_by: member.member_id,
            reason,
            timestamp: dispute.created_at,
        });
        self.emit(MarketEvent::transaction_updated(
            &updated,
            TransactionChange::Disputed,
        ));
        drop(tx);

        tracing::warn!(
            dispute_id = %dispute.id,
            %transaction_id,
            initiated_by = %member.member_id,
            ?reason,
            "dispute opened, funds frozen"
        );
        Ok(dispute)
    }

    /// Settles an open dispute. Admins only.
    ///
    /// # Errors
    ///
    /// [`MarketError::PermissionDenied`] for non-admins,
    /// [`MarketError::InvalidState`] if the dispute is already resolved or
    /// the transaction is not disputed.
    pub async fn resolve_dispute(
        &self,
        principal: Principal,
        dispute_id: DisputeId,
        resolution: DisputeResolution,
        note: Option<String>,
    ) -> Result<Dispute, MarketError> {
        let member = self.resolve_member(principal).await?;
        let dispute_row = self.store.disputes.get(dispute_id).await?;
        let (community_id, transaction_id) = {
            let d = dispute_row.read().await;
            (d.community_id, d.transaction_id)
        };
        ensure_community(&member, community_id, "dispute", dispute_id)?;
        if !member.is_admin() {
            return Err(MarketError::PermissionDenied(
                "only community admins can resolve disputes".to_string(),
            ));
        }

        let tx_row = self.store.transactions.get(transaction_id).await?;
        let mut tx = tx_row.write().await;
        let mut dispute = dispute_row.write().await;

        let mut next_tx = tx.clone();
        next_tx.settle_dispute(resolution == DisputeResolution::ReleaseToSeller)?;
        let mut next_dispute = dispute.clone();
        next_dispute.resolve(member.member_id, resolution, note)?;
        *tx = next_tx;
        *dispute = next_dispute;
        let (updated_tx, resolved) = (tx.clone(), dispute.clone());
        self.emit(MarketEvent::DisputeResolved {
            community_id,
            dispute_id,
            transaction_id,
            buyer_id: updated_tx.buyer_id,
            seller_id: updated_tx.seller_id,
            resolution,
            resolved_by: member.member_id,
            timestamp: updated_tx.updated_at,
        });
        self.emit(MarketEvent::transaction_updated(
            &updated_tx,
            TransactionChange::DisputeSettled,
        ));
        drop(dispute);
        drop(tx);

        tracing::info!(
            %dispute_id,
            %transaction_id,
            resolved_by = %member.member_id,
            ?resolution,
            escrow = updated_tx.escrow_status.as_str(),
            "dispute resolved"
        );
        Ok(resolved)
    }

    /// Returns a dispute to the transaction's parties or an admin.
    ///
    /// # Errors
    ///
    /// [`MarketError::PermissionDenied`] for anyone else.
    pub async fn get_dispute(
        &self,
        principal: Principal,
        dispute_id: DisputeId,
    ) -> Result<Dispute, MarketError> {
        let member = self.resolve_member(principal).await?;
        let dispute = self.store.disputes.snapshot(dispute_id).await?;
        ensure_community(&member, dispute.community_id, "dispute", dispute_id)?;
        let tx = self.store.transactions.snapshot(dispute.transaction_id).await?;
        if tx.side_of(member.member_id).is_none() && !member.is_admin() {
            return Err(MarketError::PermissionDenied(
                "only the parties or an admin can view this dispute".to_string(),
            ));
        }
        Ok(dispute)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::domain::{EscrowStatus, MemberRole, Transaction, TransactionStatus};
    use crate::service::test_support::{Fixture, draft};

    struct Parties {
        buyer: Principal,
        seller: Principal,
        admin: Principal,
        tx: Transaction,
    }

    async fn paid_purchase(fx: &Fixture) -> Parties {
        let (seller, _) = fx.join(MemberRole::Member).await;
        let (buyer, _) = fx.join(MemberRole::Member).await;
        let (admin, _) = fx.join(MemberRole::Admin).await;
        let Ok(listing) = fx.service.create_listing(seller, draft(dec!(60), dec!(0))).await else {
            panic!("listing should be created");
        };
        let Ok(tx) = fx.service.initiate_purchase(buyer, listing.id, None).await else {
            panic!("purchase should start");
        };
        let Ok(tx) = fx.service.mark_paid(tx.id, None).await else {
            panic!("payment should be captured");
        };
        Parties {
            buyer,
            seller,
            admin,
            tx,
        }
    }

    #[tokio::test]
    async fn dispute_then_refund_to_buyer() {
        let fx = Fixture::new();
        let p = paid_purchase(&fx).await;
        let Ok(dispute) = fx
            .service
            .open_dispute(p.buyer, p.tx.id, DisputeReason::ItemDamaged, "cracked screen")
            .await
        else {
            panic!("buyer may dispute held funds");
        };
        assert!(!dispute.resolved);
        let Ok(tx) = fx.service.get_transaction(p.buyer, p.tx.id).await else {
            panic!("transaction readable");
        };
        assert_eq!(tx.status, TransactionStatus::Disputed);
        assert_eq!(tx.escrow_status, EscrowStatus::Disputed);

        assert!(matches!(
            fx.service
                .open_dispute(p.seller, p.tx.id, DisputeReason::Other, "again")
                .await,
            Err(MarketError::InvalidState(_))
        ));
        assert!(fx.service.confirm_delivery(p.buyer, p.tx.id).await.is_err());
        assert!(matches!(
            fx.service
                .resolve_dispute(p.seller, dispute.id, DisputeResolution::ReleaseToSeller, None)
                .await,
            Err(MarketError::PermissionDenied(_))
        ));

        let Ok(resolved) = fx
            .service
            .resolve_dispute(
                p.admin,
                dispute.id,
                DisputeResolution::RefundToBuyer,
                Some("photos confirm damage".to_string()),
            )
            .await
        else {
            panic!("admin resolves");
        };
        assert!(resolved.resolved);
        assert_eq!(resolved.resolution, Some(DisputeResolution::RefundToBuyer));

        let Ok(tx) = fx.service.get_transaction(p.buyer, p.tx.id).await else {
            panic!("transaction readable");
        };
        assert_eq!(tx.status, TransactionStatus::Refunded);
        assert_eq!(tx.escrow_status, EscrowStatus::Refunded);
        assert_eq!(fx.service.store().disputes.len().await, 1);

        assert!(matches!(
            fx.service
                .resolve_dispute(p.admin, dispute.id, DisputeResolution::ReleaseToSeller, None)
                .await,
            Err(MarketError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn release_to_seller_completes() {
        let fx = Fixture::new();
        let p = paid_purchase(&fx).await;
        let Ok(dispute) = fx
            .service
            .open_dispute(p.seller, p.tx.id, DisputeReason::CommunicationIssue, "buyer silent")
            .await
        else {
            panic!("seller may dispute held funds");
        };
        let Ok(_) = fx
            .service
            .resolve_dispute(p.admin, dispute.id, DisputeResolution::ReleaseToSeller, None)
            .await
        else {
            panic!("admin resolves");
        };
        let Ok(tx) = fx.service.get_transaction(p.seller, p.tx.id).await else {
            panic!("transaction readable");
        };
        assert_eq!(tx.status, TransactionStatus::Completed);
        assert_eq!(tx.escrow_status, EscrowStatus::Released);
        assert!(
            fx.service
                .open_dispute(p.buyer, p.tx.id, DisputeReason::Other, "late")
                .await
                .is_err()
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn confirm_and_dispute_race_has_one_winner() {
        let fx = Fixture::new();
        for _ in 0..200 {
            let p = paid_purchase(&fx).await;
            let (buyer, seller, tx_id) = (p.buyer, p.seller, p.tx.id);
            let confirm = {
                let service = fx.service.clone();
                tokio::spawn(async move { service.confirm_delivery(buyer, tx_id).await })
            };
            let dispute = {
                let service = fx.service.clone();
                tokio::spawn(async move {
                    service
                        .open_dispute(seller, tx_id, DisputeReason::Other, "never arrived")
                        .await
                })
            };
            let (Ok(confirmed), Ok(disputed)) = tokio::join!(confirm, dispute) else {
                panic!("tasks should not panic");
            };
            assert!(
                confirmed.is_ok() != disputed.is_ok(),
                "exactly one of confirm and dispute must win"
            );

            let Ok(tx) = fx.service.get_transaction(p.buyer, p.tx.id).await else {
                panic!("transaction readable");
            };
            if confirmed.is_ok() {
                assert_eq!(tx.escrow_status, EscrowStatus::Released);
                assert!(fx.service.store().dispute_of(p.tx.id).await.is_none());
            } else {
                assert_eq!(tx.escrow_status, EscrowStatus::Disputed);
                assert!(fx.service.store().dispute_of(p.tx.id).await.is_some());
            }
        }
    }

    #[tokio::test]
    async fn no_dispute_after_release() {
        let fx = Fixture::new();
        let p = paid_purchase(&fx).await;
        let _ = fx.service.confirm_delivery(p.buyer, p.tx.id).await;
        assert!(matches!(
            fx.service
                .open_dispute(p.buyer, p.tx.id, DisputeReason::ItemNotAsDescribed, "meh")
                .await,
            Err(MarketError::InvalidState(_))
        ));
        assert!(fx.service.store().disputes.is_empty().await);
    }

    #[tokio::test]
    async fn empty_description_changes_nothing() {
        let fx = Fixture::new();
        let p = paid_purchase(&fx).await;
        assert!(matches!(
            fx.service
                .open_dispute(p.buyer, p.tx.id, DisputeReason::Other, "   ")
                .await,
            Err(MarketError::Validation(_))
        ));
        let Ok(tx) = fx.service.get_transaction(p.buyer, p.tx.id).await else {
            panic!("transaction readable");
        };
        assert_eq!(tx.escrow_status, EscrowStatus::Held);
    }

    #[tokio::test]
    async fn outsiders_cannot_dispute_or_read() {
        let fx = Fixture::new();
        let p = paid_purchase(&fx).await;
        let (neighbour, _) = fx.join(MemberRole::Member).await;
        assert!(matches!(
            fx.service
                .open_dispute(neighbour, p.tx.id, DisputeReason::Other, "nosy")
                .await,
            Err(MarketError::PermissionDenied(_))
        ));
        let Ok(dispute) = fx
            .service
            .open_dispute(p.buyer, p.tx.id, DisputeReason::WrongItem, "got a toaster")
            .await
        else {
            panic!("buyer may dispute");
        };
        assert!(fx.service.get_dispute(neighbour, dispute.id).await.is_err());
        assert!(fx.service.get_dispute(p.admin, dispute.id).await.is_ok());
        assert!(fx.service.get_dispute(p.seller, dispute.id).await.is_ok());
    }
}
