//! Purchases and their escrow track.
//!
//! A [`Transaction`] runs two parallel state machines:
//!
//! ```text
//! status:  pending ──► paid ──► completed | refunded | disputed ──► completed | refunded
//!             └──► cancelled
//! escrow:  none ──► pending ──► held ──► released | refunded | disputed ──► released | refunded
//! ```
//!
//! Every transition method checks its precondition and mutates in one call,
//! so holding the row's write lock around it gives compare-and-set semantics.
//! A rejected transition leaves the row untouched.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::conversation::Side;
use super::fee::{FeeSchedule, round_cents};
use super::{CommunityId, Listing, ListingId, MemberId, TransactionId};
use crate::error::MarketError;

/// Purchase status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Created, waiting for payment capture.
    Pending,
    /// Payment captured; funds held in escrow.
    Paid,
    /// Buyer confirmed delivery (or a dispute was settled for the seller).
    Completed,
    /// Funds returned to the buyer.
    Refunded,
    /// A dispute is open.
    Disputed,
    /// Abandoned before payment.
    Cancelled,
}

impl TransactionStatus {
    /// Returns the status as the snake_case string used on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Completed => "completed",
            Self::Refunded => "refunded",
            Self::Disputed => "disputed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns `true` for states with no outgoing transition.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Refunded | Self::Cancelled)
    }
}

/// Escrow status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EscrowStatus {
    /// No escrow yet.
    None,
    /// Purchase initiated, payment not captured.
    Pending,
    /// Funds captured and held by the platform.
    Held,
    /// Funds paid out to the seller.
    Released,
    /// Funds returned to the buyer.
    Refunded,
    /// Funds frozen by an open dispute.
    Disputed,
}

impl EscrowStatus {
    /// Returns the status as the snake_case string used on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Pending => "pending",
            Self::Held => "held",
            Self::Released => "released",
            Self::Refunded => "refunded",
            Self::Disputed => "disputed",
        }
    }

    /// Returns `true` if the escrow graph has an edge `self → next`.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::None, Self::Pending)
                | (Self::Pending, Self::Held)
                | (Self::Held, Self::Released | Self::Refunded | Self::Disputed)
                | (Self::Disputed, Self::Released | Self::Refunded)
        )
    }
}

/// How the item reaches the buyer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    /// Seller ships; the listing's shipping cost is charged.
    Shipping,
    /// Buyer collects; no shipping cost.
    Pickup,
}

/// Frozen amounts of a purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PurchaseQuote {
    /// Listing price at purchase time.
    pub item_price: Decimal,
    /// Shipping charged (zero for pickup).
    pub shipping_cost: Decimal,
    /// Platform fee on `item_price + shipping_cost`.
    pub fee: Decimal,
    /// What the buyer pays: `item_price + shipping_cost + fee`.
    pub total_price: Decimal,
    /// What the seller receives: `item_price + shipping_cost - fee`.
    pub net_amount: Decimal,
}

impl PurchaseQuote {
    /// Prices a purchase of `listing` with the given delivery method.
    #[must_use]
    pub fn compute(listing: &Listing, delivery: DeliveryMethod, fees: &dyn FeeSchedule) -> Self {
        let item_price = round_cents(listing.price);
        let shipping_cost = match delivery {
            DeliveryMethod::Shipping => round_cents(listing.shipping_cost),
            DeliveryMethod::Pickup => Decimal::ZERO,
        };
        let subtotal = item_price + shipping_cost;
        let fee = round_cents(fees.compute(subtotal));
        Self {
            item_price,
            shipping_cost,
            fee,
            total_price: subtotal + fee,
            net_amount: subtotal - fee,
        }
    }
}

/// A purchase of one listing by one buyer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    /// Transaction identifier.
    pub id: TransactionId,
    /// Owning community.
    pub community_id: CommunityId,
    /// Purchased listing.
    pub listing_id: ListingId,
    /// Paying member.
    pub buyer_id: MemberId,
    /// Listing owner at purchase time.
    pub seller_id: MemberId,
    /// Chosen delivery method.
    pub delivery_method: DeliveryMethod,
    /// Listing price at purchase time.
    pub item_price: Decimal,
    /// Shipping charged.
    pub shipping_cost: Decimal,
    /// Platform fee.
    pub fee: Decimal,
    /// Amount charged to the buyer.
    pub total_price: Decimal,
    /// Amount paid out to the seller.
    pub net_amount: Decimal,
    /// Purchase status.
    pub status: TransactionStatus,
    /// Escrow status.
    pub escrow_status: EscrowStatus,
    /// Reference reported by the payment processor.
    pub payment_reference: Option<String>,
    /// Payment capture time.
    pub paid_at: Option<DateTime<Utc>>,
    /// Buyer's delivery confirmation time.
    pub buyer_confirmed_at: Option<DateTime<Utc>>,
    /// Escrow payout time.
    pub escrow_released_at: Option<DateTime<Utc>>,
    /// Refund time.
    pub refunded_at: Option<DateTime<Utc>>,
    /// Cancellation time.
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Parcel tracking number.
    pub tracking_number: Option<String>,
    /// Parcel carrier.
    pub shipping_carrier: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Starts a purchase of `listing` by `buyer_id`.
    ///
    /// Without an explicit delivery method, shipping is chosen when the
    /// listing offers it and pickup otherwise.
    ///
    /// # Errors
    ///
    /// [`MarketError::InvalidState`] if the listing is not active,
    /// [`MarketError::PermissionDenied`] if the buyer is the seller,
    /// [`MarketError::Validation`] if the listing does not offer the
    /// requested delivery method.
    pub fn initiate(
        listing: &Listing,
        buyer_id: MemberId,
        delivery: Option<DeliveryMethod>,
        fees: &dyn FeeSchedule,
    ) -> Result<Self, MarketError> {
        if !listing.is_purchasable() {
            return Err(MarketError::InvalidState(format!(
                "listing is {}, only active listings can be purchased",
                listing.status.as_str()
            )));
        }
        if listing.seller_id == buyer_id {
            return Err(MarketError::PermissionDenied(
                "sellers cannot buy their own listing".to_string(),
            ));
        }
        let delivery = match delivery {
            Some(DeliveryMethod::Shipping) if !listing.shipping_available => {
                return Err(MarketError::Validation(
                    "this listing does not offer shipping".to_string(),
                ));
            }
            Some(DeliveryMethod::Pickup) if !listing.pickup_available => {
                return Err(MarketError::Validation(
                    "this listing does not offer pickup".to_string(),
                ));
            }
            Some(method) => method,
            None if listing.shipping_available => DeliveryMethod::Shipping,
            None => DeliveryMethod::Pickup,
        };

        let quote = PurchaseQuote::compute(listing, delivery, fees);
        let now = Utc::now();
        let mut tx = Self {
            id: TransactionId::new(),
            community_id: listing.community_id,
            listing_id: listing.id,
            buyer_id,
            seller_id: listing.seller_id,
            delivery_method: delivery,
            item_price: quote.item_price,
            shipping_cost: quote.shipping_cost,
            fee: quote.fee,
            total_price: quote.total_price,
            net_amount: quote.net_amount,
            status: TransactionStatus::Pending,
            escrow_status: EscrowStatus::None,
            payment_reference: None,
            paid_at: None,
            buyer_confirmed_at: None,
            escrow_released_at: None,
            refunded_at: None,
            cancelled_at: None,
            tracking_number: None,
            shipping_carrier: None,
            created_at: now,
            updated_at: now,
        };
        tx.move_escrow(EscrowStatus::Pending)?;
        Ok(tx)
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

    /// Returns `true` while the purchase can still change state.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Payment captured: pending/pending → paid/held.
    ///
    /// # Errors
    ///
    /// [`MarketError::InvalidState`] for any other starting state.
    pub fn mark_paid(&mut self, payment_reference: Option<String>) -> Result<(), MarketError> {
        self.expect(TransactionStatus::Pending, EscrowStatus::Pending)?;
        let now = Utc::now();
        self.move_escrow(EscrowStatus::Held)?;
        self.status = TransactionStatus::Paid;
        self.payment_reference = payment_reference;
        self.paid_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Seller records shipment details while funds are held.
    ///
    /// # Errors
    ///
    /// [`MarketError::PermissionDenied`] unless `actor` is the seller,
    /// [`MarketError::InvalidState`] unless paid/held,
    /// [`MarketError::Validation`] for an empty tracking number.
    pub fn add_tracking(
        &mut self,
        actor: MemberId,
        tracking_number: &str,
        carrier: Option<String>,
    ) -> Result<(), MarketError> {
        self.require_side(actor, Side::Seller, "add tracking details")?;
        self.expect(TransactionStatus::Paid, EscrowStatus::Held)?;
        let tracking_number = tracking_number.trim();
        if tracking_number.is_empty() {
            return Err(MarketError::Validation(
                "tracking_number is required".to_string(),
            ));
        }
        self.tracking_number = Some(tracking_number.to_string());
        self.shipping_carrier = carrier
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Buyer confirms delivery: paid/held → completed/released.
    ///
    /// The only path that pays the seller outside dispute resolution.
    ///
    /// # Errors
    ///
    /// [`MarketError::PermissionDenied`] unless `actor` is the buyer,
    /// [`MarketError::InvalidState`] unless paid/held.
    pub fn confirm_delivery(&mut self, actor: MemberId) -> Result<(), MarketError> {
        self.require_side(actor, Side::Buyer, "confirm delivery")?;
        self.expect(TransactionStatus::Paid, EscrowStatus::Held)?;
        let now = Utc::now();
        self.move_escrow(EscrowStatus::Released)?;
        self.status = TransactionStatus::Completed;
        self.buyer_confirmed_at = Some(now);
        self.escrow_released_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Seller returns held funds: paid/held → refunded/refunded.
    ///
    /// # Errors
    ///
    /// [`MarketError::PermissionDenied`] unless `actor` is the seller,
    /// [`MarketError::InvalidState`] unless paid/held.
    pub fn refund_by_seller(&mut self, actor: MemberId) -> Result<(), MarketError> {
        self.require_side(actor, Side::Seller, "refund the buyer")?;
        self.expect(TransactionStatus::Paid, EscrowStatus::Held)?;
        let now = Utc::now();
        self.move_escrow(EscrowStatus::Refunded)?;
        self.status = TransactionStatus::Refunded;
        self.refunded_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Either party abandons an unpaid purchase: pending → cancelled.
    ///
    /// Escrow stays `pending`; nothing was captured.
    ///
    /// # Errors
    ///
    /// [`MarketError::PermissionDenied`] for outsiders,
    /// [`MarketError::InvalidState`] unless pending/pending.
    pub fn cancel(&mut self, actor: MemberId) -> Result<(), MarketError> {
        if self.side_of(actor).is_none() {
            return Err(MarketError::PermissionDenied(
                "only the buyer or seller can cancel a purchase".to_string(),
            ));
        }
        self.expect(TransactionStatus::Pending, EscrowStatus::Pending)?;
        let now = Utc::now();
        self.status = TransactionStatus::Cancelled;
        self.cancelled_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Checks that `actor` may open a dispute now. Does not mutate.
    ///
    /// # Errors
    ///
    /// [`MarketError::PermissionDenied`] for outsiders,
    /// [`MarketError::InvalidState`] if already disputed or escrow is not held.
    pub fn ensure_disputable(&self, actor: MemberId) -> Result<Side, MarketError> {
        let side = self.side_of(actor).ok_or_else(|| {
            MarketError::PermissionDenied(
                "only the buyer or seller can open a dispute".to_string(),
            )
        })?;
        if self.status == TransactionStatus::Disputed {
            return Err(MarketError::InvalidState(
                "a dispute is already open for this transaction".to_string(),
            ));
        }
        if self.escrow_status != EscrowStatus::Held {
            return Err(MarketError::InvalidState(format!(
                "escrow is {}, disputes need held funds",
                self.escrow_status.as_str()
            )));
        }
        Ok(side)
    }

    /// Freezes funds for a dispute: held → disputed on both tracks.
    ///
    /// # Errors
    ///
    /// [`MarketError::InvalidState`] unless escrow is held and status is not
    /// already disputed.
    pub fn mark_disputed(&mut self) -> Result<(), MarketError> {
        if self.status == TransactionStatus::Disputed {
            return Err(MarketError::InvalidState(
                "transaction is already disputed".to_string(),
            ));
        }
        self.move_escrow(EscrowStatus::Disputed)?;
        self.status = TransactionStatus::Disputed;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Settles a disputed transaction in favor of the seller (`release`) or
    /// the buyer.
    ///
    /// # Errors
    ///
    /// [`MarketError::InvalidState`] unless disputed/disputed.
    pub fn settle_dispute(&mut self, release_to_seller: bool) -> Result<(), MarketError> {
        self.expect(TransactionStatus::Disputed, EscrowStatus::Disputed)?;
        let now = Utc::now();
        if release_to_seller {
            self.move_escrow(EscrowStatus::Released)?;
            self.status = TransactionStatus::Completed;
            self.escrow_released_at = Some(now);
        } else {
            self.move_escrow(EscrowStatus::Refunded)?;
            self.status = TransactionStatus::Refunded;
            self.refunded_at = Some(now);
        }
        self.updated_at = now;
        Ok(())
    }

    fn move_escrow(&mut self, next: EscrowStatus) -> Result<(), MarketError> {
        if !self.escrow_status.can_transition_to(next) {
            return Err(MarketError::InvalidState(format!(
                "escrow cannot move from {} to {}",
                self.escrow_status.as_str(),
                next.as_str()
            )));
        }
        self.escrow_status = next;
        Ok(())
    }

    fn expect(
        &self,
        status: TransactionStatus,
        escrow: EscrowStatus,
    ) -> Result<(), MarketError> {
        if self.status != status || self.escrow_status != escrow {
            return Err(MarketError::InvalidState(format!(
                "transaction is {}/{}, expected {}/{}",
                self.status.as_str(),
                self.escrow_status.as_str(),
                status.as_str(),
                escrow.as_str()
            )));
        }
        Ok(())
    }

    fn require_side(&self, actor: MemberId, side: Side, action: &str) -> Result<(), MarketError> {
        if self.side_of(actor) != Some(side) {
            let who = match side {
                Side::Buyer => "buyer",
                Side::Seller => "seller",
            };
            return Err(MarketError::PermissionDenied(format!(
                "only the {who} can {action}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::fee::TieredFeeSchedule;
    use crate::domain::listing::{ItemCondition, ListingDraft};
    use rust_decimal_macros::dec;

    fn listing(price: Decimal, shipping: Decimal) -> Listing {
        let draft = ListingDraft {
            title: "Road bike".to_string(),
            description: String::new(),
            category: "sports".to_string(),
            condition: ItemCondition::Good,
            price,
            original_price: None,
            quantity: 1,
            images: Vec::new(),
            shipping_available: true,
            shipping_cost: shipping,
            pickup_available: true,
            pickup_location: None,
            publish: true,
        };
        let Ok(listing) = Listing::from_draft(draft, CommunityId::new(), MemberId::new()) else {
            panic!("valid draft");
        };
        listing
    }

    fn purchase() -> Transaction {
        let fees = TieredFeeSchedule::flat(dec!(5));
        let Ok(tx) = Transaction::initiate(
            &listing(dec!(100.00), dec!(10.00)),
            MemberId::new(),
            None,
            &fees,
        ) else {
            panic!("purchase should start");
        };
        tx
    }

    fn paid() -> Transaction {
        let mut tx = purchase();
        let Ok(()) = tx.mark_paid(Some("pi_123".to_string())) else {
            panic!("payment should be accepted");
        };
        tx
    }

    #[test]
    fn escrow_graph_never_skips_held() {
        use EscrowStatus as E;
        assert!(E::None.can_transition_to(E::Pending));
        assert!(E::Pending.can_transition_to(E::Held));
        assert!(!E::Pending.can_transition_to(E::Released));
        assert!(!E::Pending.can_transition_to(E::Disputed));
        assert!(E::Held.can_transition_to(E::Disputed));
        assert!(!E::Released.can_transition_to(E::Held));
        assert!(E::Disputed.can_transition_to(E::Refunded));
        assert!(!E::Refunded.can_transition_to(E::Released));
    }

    #[test]
    fn initiate_freezes_amounts() {
        let tx = purchase();
        assert_eq!(tx.delivery_method, DeliveryMethod::Shipping);
        assert_eq!(tx.fee, dec!(5.50));
        assert_eq!(tx.total_price, dec!(115.50));
        assert_eq!(tx.net_amount, dec!(104.50));
        assert_eq!(tx.status, TransactionStatus::Pending);
        assert_eq!(tx.escrow_status, EscrowStatus::Pending);
    }

    #[test]
    fn pickup_skips_shipping_cost() {
        let fees = TieredFeeSchedule::flat(dec!(5));
        let Ok(tx) = Transaction::initiate(
            &listing(dec!(100.00), dec!(10.00)),
            MemberId::new(),
            Some(DeliveryMethod::Pickup),
            &fees,
        ) else {
            panic!("purchase should start");
        };
        assert_eq!(tx.shipping_cost, Decimal::ZERO);
        assert_eq!(tx.total_price, dec!(105.00));
    }

    #[test]
    fn seller_cannot_buy_own_listing() {
        let l = listing(dec!(10), dec!(0));
        let result = Transaction::initiate(&l, l.seller_id, None, &TieredFeeSchedule::default());
        assert!(matches!(result, Err(MarketError::PermissionDenied(_))));
    }

    #[test]
    fn inactive_listing_cannot_be_bought() {
        let mut l = listing(dec!(10), dec!(0));
        let _ = l.mark_sold();
        let result = Transaction::initiate(&l, MemberId::new(), None, &TieredFeeSchedule::default());
        assert!(matches!(result, Err(MarketError::InvalidState(_))));
    }

    #[test]
    fn nothing_moves_before_payment() {
        let mut tx = purchase();
        let buyer = tx.buyer_id;
        assert!(tx.confirm_delivery(buyer).is_err());
        assert!(tx.ensure_disputable(buyer).is_err());
        assert_eq!(tx.escrow_status, EscrowStatus::Pending);
    }

    #[test]
    fn mark_paid_only_once() {
        let mut tx = paid();
        assert_eq!(tx.escrow_status, EscrowStatus::Held);
        assert_eq!(tx.payment_reference.as_deref(), Some("pi_123"));
        assert!(matches!(tx.mark_paid(None), Err(MarketError::InvalidState(_))));
    }

    #[test]
    fn only_buyer_confirms() {
        let mut tx = paid();
        let seller = tx.seller_id;
        assert!(matches!(
            tx.confirm_delivery(seller),
            Err(MarketError::PermissionDenied(_))
        ));
        assert!(matches!(
            tx.confirm_delivery(MemberId::new()),
            Err(MarketError::PermissionDenied(_))
        ));
        assert_eq!(tx.escrow_status, EscrowStatus::Held);

        let buyer = tx.buyer_id;
        assert!(tx.confirm_delivery(buyer).is_ok());
        assert_eq!(tx.status, TransactionStatus::Completed);
        assert_eq!(tx.escrow_status, EscrowStatus::Released);
        assert!(tx.buyer_confirmed_at.is_some());
        assert!(tx.escrow_released_at.is_some());
    }

    #[test]
    fn released_transaction_cannot_be_disputed() {
        let mut tx = paid();
        let buyer = tx.buyer_id;
        let _ = tx.confirm_delivery(buyer);
        assert!(matches!(
            tx.ensure_disputable(buyer),
            Err(MarketError::InvalidState(_))
        ));
        assert!(tx.mark_disputed().is_err());
        assert_eq!(tx.escrow_status, EscrowStatus::Released);
    }

    #[test]
    fn dispute_then_refund() {
        let mut tx = paid();
        let buyer = tx.buyer_id;
        assert_eq!(tx.ensure_disputable(buyer).ok(), Some(Side::Buyer));
        assert!(tx.mark_disputed().is_ok());
        assert_eq!(tx.status, TransactionStatus::Disputed);
        assert!(tx.ensure_disputable(buyer).is_err());
        assert!(tx.confirm_delivery(buyer).is_err());

        assert!(tx.settle_dispute(false).is_ok());
        assert_eq!(tx.status, TransactionStatus::Refunded);
        assert_eq!(tx.escrow_status, EscrowStatus::Refunded);
        assert!(tx.settle_dispute(true).is_err());
    }

    #[test]
    fn dispute_release_completes() {
        let mut tx = paid();
        let _ = tx.mark_disputed();
        assert!(tx.settle_dispute(true).is_ok());
        assert_eq!(tx.status, TransactionStatus::Completed);
        assert_eq!(tx.escrow_status, EscrowStatus::Released);
    }

    #[test]
    fn cancel_only_before_payment() {
        let mut tx = purchase();
        assert!(tx.cancel(MemberId::new()).is_err());
        let seller = tx.seller_id;
        assert!(tx.cancel(seller).is_ok());
        assert_eq!(tx.status, TransactionStatus::Cancelled);
        assert!(!tx.is_open());

        let mut tx = paid();
        let buyer = tx.buyer_id;
        assert!(matches!(tx.cancel(buyer), Err(MarketError::InvalidState(_))));
    }

    #[test]
    fn seller_refund_and_tracking() {
        let mut tx = paid();
        let buyer = tx.buyer_id;
        let seller = tx.seller_id;
        assert!(tx.add_tracking(buyer, "1Z999", None).is_err());
        assert!(tx.add_tracking(seller, "  ", None).is_err());
        assert!(tx.add_tracking(seller, "1Z999", Some("UPS".to_string())).is_ok());
        assert_eq!(tx.shipping_carrier.as_deref(), Some("UPS"));

        assert!(tx.refund_by_seller(buyer).is_err());
        assert!(tx.refund_by_seller(seller).is_ok());
        assert_eq!(tx.escrow_status, EscrowStatus::Refunded);
        assert_eq!(tx.status, TransactionStatus::Refunded);
    }
}
