//! Disputes filed against held escrow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{CommunityId, DisputeId, MemberId, Transaction, TransactionId};
use crate::error::MarketError;

/// Longest accepted dispute description, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 2_000;

/// Why a party disputes a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DisputeReason {
    /// Item never arrived.
    ItemNotReceived,
    /// Item differs from the listing.
    ItemNotAsDescribed,
    /// Item arrived damaged.
    ItemDamaged,
    /// A different item arrived.
    WrongItem,
    /// Problem with the payment itself.
    PaymentIssue,
    /// The other party stopped responding.
    CommunicationIssue,
    /// Anything else; see the description.
    Other,
}

/// Admin decision closing a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DisputeResolution {
    /// Pay the held funds out to the seller.
    ReleaseToSeller,
    /// Return the held funds to the buyer.
    RefundToBuyer,
}

/// A dispute. At most one ever exists per transaction; resolution is final.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Dispute {
    /// Dispute identifier.
    pub id: DisputeId,
    /// Owning community.
    pub community_id: CommunityId,
    /// Disputed transaction.
    pub transaction_id: TransactionId,
    /// Party who opened it.
    pub initiated_by: MemberId,
    /// Reason category.
    pub reason: DisputeReason,
    /// Free-form explanation (required).
    pub description: String,
    /// Whether an admin has settled it.
    pub resolved: bool,
    /// Outcome, once resolved.
    pub resolution: Option<DisputeResolution>,
    /// Admin's note, once resolved.
    pub resolution_note: Option<String>,
    /// Admin who resolved it.
    pub resolved_by: Option<MemberId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Resolution timestamp.
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Dispute {
    /// Files a new, unresolved dispute against `tx`.
    ///
    /// Transaction state checks belong to [`Transaction::ensure_disputable`].
    ///
    /// # Errors
    ///
    /// [`MarketError::Validation`] if the description is empty or too long.
    pub fn file(
        tx: &Transaction,
        initiated_by: MemberId,
        reason: DisputeReason,
        description: &str,
    ) -> Result<Self, MarketError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(MarketError::Validation(
                "a dispute needs a description".to_string(),
            ));
        }
        if description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(MarketError::Validation(format!(
                "description exceeds {MAX_DESCRIPTION_LEN} characters"
            )));
        }
        Ok(Self {
            id: DisputeId::new(),
            community_id: tx.community_id,
            transaction_id: tx.id,
            initiated_by,
            reason,
            description: description.to_string(),
            resolved: false,
            resolution: None,
            resolution_note: None,
            resolved_by: None,
            created_at: Utc::now(),
            resolved_at: None,
        })
    }

    /// Closes the dispute.
    ///
    /// # Errors
    ///
    /// [`MarketError::InvalidState`] if it was already resolved.
    pub fn resolve(
        &mut self,
        resolved_by: MemberId,
        resolution: DisputeResolution,
        note: Option<String>,
    ) -> Result<(), MarketError> {
        if self.resolved {
            return Err(MarketError::InvalidState(
                "dispute is already resolved".to_string(),
            ));
        }
        self.resolved = true;
        self.resolution = Some(resolution);
        self.resolution_note = note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        self.resolved_by = Some(resolved_by);
        self.resolved_at = Some(Utc::now());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::domain::fee::TieredFeeSchedule;
    use crate::domain::listing::{ItemCondition, Listing, ListingDraft};

    fn held_transaction() -> Transaction {
        let draft = ListingDraft {
            title: "Desk lamp".to_string(),
            description: String::new(),
            category: "home".to_string(),
            condition: ItemCondition::LikeNew,
            price: dec!(20),
            original_price: None,
            quantity: 1,
            images: Vec::new(),
            shipping_available: false,
            shipping_cost: dec!(0),
            pickup_available: true,
            pickup_location: Some("Garage".to_string()),
            publish: true,
        };
        let Ok(listing) = Listing::from_draft(draft, CommunityId::new(), MemberId::new()) else {
            panic!("valid draft");
        };
        let fees = TieredFeeSchedule::default();
        let Ok(mut tx) = Transaction::initiate(&listing, MemberId::new(), None, &fees) else {
            panic!("purchase should start");
        };
        let Ok(()) = tx.mark_paid(None) else {
            panic!("payment accepted");
        };
        tx
    }

    #[test]
    fn file_trims_and_copies_ids() {
        let tx = held_transaction();
        let Ok(d) = Dispute::file(&tx, tx.buyer_id, DisputeReason::ItemNotReceived, "  never came ")
        else {
            panic!("dispute should be filed");
        };
        assert_eq!(d.description, "never came");
        assert_eq!(d.transaction_id, tx.id);
        assert_eq!(d.community_id, tx.community_id);
        assert!(!d.resolved);
        assert!(d.resolved_at.is_none());
    }

    #[test]
    fn description_bounds() {
        let tx = held_transaction();
        assert!(matches!(
            Dispute::file(&tx, tx.buyer_id, DisputeReason::Other, " \n "),
            Err(MarketError::Validation(_))
        ));
        let long = "x".repeat(MAX_DESCRIPTION_LEN + 1);
        assert!(matches!(
            Dispute::file(&tx, tx.buyer_id, DisputeReason::Other, &long),
            Err(MarketError::Validation(_))
        ));
    }

    #[test]
    fn resolves_once() {
        let tx = held_transaction();
        let Ok(mut d) = Dispute::file(&tx, tx.seller_id, DisputeReason::PaymentIssue, "no payout")
        else {
            panic!("dispute should be filed");
        };
        let admin = MemberId::new();
        let Ok(()) = d.resolve(admin, DisputeResolution::ReleaseToSeller, Some("   ".to_string()))
        else {
            panic!("first resolution succeeds");
        };
        assert!(d.resolved);
        assert_eq!(d.resolved_by, Some(admin));
        assert!(d.resolution_note.is_none());
        assert!(matches!(
            d.resolve(admin, DisputeResolution::RefundToBuyer, None),
            Err(MarketError::InvalidState(_))
        ));
        assert_eq!(d.resolution, Some(DisputeResolution::ReleaseToSeller));
    }
}
