//! Purchases and escrow transitions.

use super::{MarketService, ensure_community};
use crate::domain::{
    DeliveryMethod, ListingId, MarketEvent, Member, Principal, Side, Transaction,
    TransactionChange, TransactionId,
};
use crate::error::MarketError;

/// Parties see their own transactions; admins see every one in the
/// community.
fn ensure_party_or_admin(member: &Member, tx: &Transaction) -> Result<(), MarketError> {
    ensure_community(member, tx.community_id, "transaction", tx.id)?;
    if tx.side_of(member.member_id).is_some() || member.is_admin() {
        Ok(())
    } else {
        Err(MarketError::PermissionDenied(
            "only the buyer, the seller or an admin can view this transaction".to_string(),
        ))
    }
}

impl MarketService {
    /// Starts a purchase of an active listing with frozen amounts.
    ///
    /// # Errors
    ///
    /// [`MarketError::InvalidState`] if the listing is not active,
    /// [`MarketError::PermissionDenied`] for the listing's own seller,
    /// [`MarketError::Validation`] for an unsupported delivery method.
    pub async fn initiate_purchase(
        &self,
        principal: Principal,
        listing_id: ListingId,
        delivery: Option<DeliveryMethod>,
    ) -> Result<Transaction, MarketError> {
        let member = self.resolve_member(principal).await?;
        let row = self.store.listings.get(listing_id).await?;
        let listing = row.read().await;
        if listing.community_id != member.community_id || listing.is_hidden() {
            return Err(MarketError::not_found("listing", listing_id));
        }
        let tx = Transaction::initiate(&listing, member.member_id, delivery, self.fees())?;
        // Inserted under the listing lock so soft deletes see it.
        self.store.transactions.insert(tx.id, tx.clone()).await?;
        self.emit(MarketEvent::transaction_updated(&tx, TransactionChange::Initiated));
        drop(listing);

        tracing::info!(
            transaction_id = %tx.id,
            %listing_id,
            buyer_id = %tx.buyer_id,
            total = %tx.total_price,
            fee = %tx.fee,
            "purchase initiated"
        );
        Ok(tx)
    }

    /// Records payment capture reported by the payment processor.
    ///
    /// Not caller-scoped; the webhook authenticates the processor.
    ///
    /// # Errors
    ///
    /// [`MarketError::NotFound`] or [`MarketError::InvalidState`] unless the
    /// transaction is pending/pending.
    pub async fn mark_paid(
        &self,
        transaction_id: TransactionId,
        payment_reference: Option<String>,
    ) -> Result<Transaction, MarketError> {
        let row = self.store.transactions.get(transaction_id).await?;
        let mut tx = row.write().await;
        tx.mark_paid(payment_reference)?;
        let updated = tx.clone();
        self.emit(MarketEvent::transaction_updated(&updated, TransactionChange::Paid));
        drop(tx);

        tracing::info!(%transaction_id, amount = %updated.total_price, "payment captured, funds held");
        Ok(updated)
    }

    /// Seller adds shipment tracking while funds are held.
    ///
    /// # Errors
    ///
    /// [`MarketError::PermissionDenied`] unless the caller is the seller,
    /// [`MarketError::InvalidState`] unless paid/held.
    pub async fn add_tracking(
        &self,
        principal: Principal,
        transaction_id: TransactionId,
        tracking_number: &str,
        carrier: Option<String>,
    ) -> Result<Transaction, MarketError> {
        self.transition(principal, transaction_id, TransactionChange::TrackingAdded, |tx, m| {
            tx.add_tracking(m.member_id, tracking_number, carrier)
        })
        .await
    }

    /// Buyer confirms delivery; escrow is released to the seller.
    ///
    /// # Errors
    ///
    /// [`MarketError::PermissionDenied`] unless the caller is the buyer,
    /// [`MarketError::InvalidState`] unless paid/held.
    pub async fn confirm_delivery(
        &self,
        principal: Principal,
        transaction_id: TransactionId,
    ) -> Result<Transaction, MarketError> {
        self.transition(
            principal,
            transaction_id,
            TransactionChange::DeliveryConfirmed,
            |tx, m| tx.confirm_delivery(m.member_id),
        )
        .await
    }

    /// Seller returns held funds to the buyer.
    ///
    /// # Errors
    ///
    /// [`MarketError::PermissionDenied`] unless the caller is the seller,
    /// [`MarketError::InvalidState`] unless paid/held.
    pub async fn refund_transaction(
        &self,
        principal: Principal,
        transaction_id: TransactionId,
    ) -> Result<Transaction, MarketError> {
        self.transition(principal, transaction_id, TransactionChange::Refunded, |tx, m| {
            tx.refund_by_seller(m.member_id)
        })
        .await
    }

    /// Either party abandons an unpaid purchase.
    ///
    /// # Errors
    ///
    /// [`MarketError::PermissionDenied`] for outsiders,
    /// [`MarketError::InvalidState`] once payment was captured.
    pub async fn cancel_transaction(
        &self,
        principal: Principal,
        transaction_id: TransactionId,
    ) -> Result<Transaction, MarketError> {
        self.transition(principal, transaction_id, TransactionChange::Cancelled, |tx, m| {
            tx.cancel(m.member_id)
        })
        .await
    }

    /// Returns one transaction.
    ///
    /// # Errors
    ///
    /// [`MarketError::PermissionDenied`] unless the caller is a party or an
    /// admin.
    pub async fn get_transaction(
        &self,
        principal: Principal,
        transaction_id: TransactionId,
    ) -> Result<Transaction, MarketError> {
        let member = self.resolve_member(principal).await?;
        let tx = self.store.transactions.snapshot(transaction_id).await?;
        ensure_party_or_admin(&member, &tx)?;
        Ok(tx)
    }

    /// Lists the caller's purchases and/or sales, newest first.
    ///
    /// # Errors
    ///
    /// [`MarketError::NotAMember`].
    pub async fn list_transactions(
        &self,
        principal: Principal,
        role: Option<Side>,
    ) -> Result<Vec<Transaction>, MarketError> {
        let member = self.resolve_member(principal).await?;
        let mut txs = self
            .store
            .transactions
            .collect(|tx| {
                tx.community_id == member.community_id
                    && match (role, tx.side_of(member.member_id)) {
                        (_, None) => false,
                        (None, Some(_)) => true,
                        (Some(wanted), Some(side)) => wanted == side,
                    }
            })
            .await;
        txs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(txs)
    }

    /// Applies one party transition under the transaction's write lock,
    /// then publishes it.
    async fn transition<F>(
        &self,
        principal: Principal,
        transaction_id: TransactionId,
        change: TransactionChange,
        apply: F,
    ) -> Result<Transaction, MarketError>
    where
        F: FnOnce(&mut Transaction, &Member) -> Result<(), MarketError>,
    {
        let member = self.resolve_member(principal).await?;
        let row = self.store.transactions.get(transaction_id).await?;
        let mut tx = row.write().await;
        ensure_community(&member, tx.community_id, "transaction", transaction_id)?;
        apply(&mut *tx, &member)?;
        let updated = tx.clone();
        self.emit(MarketEvent::transaction_updated(&updated, change));
        drop(tx);

        tracing::info!(
            %transaction_id,
            actor = %member.member_id,
            status = updated.status.as_str(),
            escrow = updated.escrow_status.as_str(),
            "transaction updated"
        );
        Ok(updated)
    }
}
