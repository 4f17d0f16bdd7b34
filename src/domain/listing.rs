//! Marketplace listings and their status lifecycle.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{CommunityId, ListingId, MemberId};
use crate::error::MarketError;

/// Longest accepted listing title, in characters.
pub const MAX_TITLE_LEN: usize = 200;

/// Largest accepted price, original price or shipping cost.
pub const MAX_PRICE: Decimal = dec!(1000000000);

/// Physical condition of the listed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ItemCondition {
    /// Unused, in original packaging.
    New,
    /// Used but indistinguishable from new.
    LikeNew,
    /// Normal signs of use.
    Good,
    /// Visible wear, fully functional.
    Fair,
    /// Heavy wear or partially functional.
    Poor,
}

/// Listing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    /// Visible to the seller only.
    Draft,
    /// Published and purchasable.
    Active,
    /// Sold by the seller.
    Sold,
    /// Held for a buyer; still visible, not purchasable.
    Reserved,
    /// Taken down by the listing expiry job.
    Expired,
    /// Soft-deleted. Never hard-removed while transactions reference it.
    Deleted,
}

impl ListingStatus {
    /// Returns the status as the snake_case string used on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Sold => "sold",
            Self::Reserved => "reserved",
            Self::Expired => "expired",
            Self::Deleted => "deleted",
        }
    }
}

/// A marketplace listing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Listing {
    /// Listing identifier.
    pub id: ListingId,
    /// Owning community.
    pub community_id: CommunityId,
    /// Seller's membership id.
    pub seller_id: MemberId,
    /// Short title.
    pub title: String,
    /// Free-form description.
    pub description: String,
    /// Category slug.
    pub category: String,
    /// Item condition.
    pub condition: ItemCondition,
    /// Asking price.
    pub price: Decimal,
    /// Pre-discount price, display only.
    pub original_price: Option<Decimal>,
    /// Units available.
    pub quantity: u32,
    /// Image URLs; the first one is the cover.
    pub images: Vec<String>,
    /// Current status.
    pub status: ListingStatus,
    /// Whether the seller ships the item.
    pub shipping_available: bool,
    /// Shipping cost charged when shipping is chosen.
    pub shipping_cost: Decimal,
    /// Whether the buyer may pick the item up.
    pub pickup_available: bool,
    /// Pickup address or instructions.
    pub pickup_location: Option<String>,
    /// Approximate number of views.
    pub views_count: u64,
    /// Number of members who favorited the listing.
    pub favorites_count: u64,
    /// Promoted by community staff.
    pub is_featured: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Listing {
    /// Builds a new listing from a validated draft.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Validation`] if the draft is malformed.
    pub fn from_draft(
        draft: ListingDraft,
        community_id: CommunityId,
        seller_id: MemberId,
    ) -> Result<Self, MarketError> {
        draft.validate()?;
        let now = Utc::now();
        let status = if draft.publish {
            ListingStatus::Active
        } else {
            ListingStatus::Draft
        };
        Ok(Self {
            id: ListingId::new(),
            community_id,
            seller_id,
            title: draft.title.trim().to_string(),
            description: draft.description,
            category: draft.category,
            condition: draft.condition,
            price: draft.price,
            original_price: draft.original_price,
            quantity: draft.quantity,
            images: draft.images,
            status,
            shipping_available: draft.shipping_available,
            shipping_cost: if draft.shipping_available {
                draft.shipping_cost
            } else {
                Decimal::ZERO
            },
            pickup_available: draft.pickup_available,
            pickup_location: draft.pickup_location,
            views_count: 0,
            favorites_count: 0,
            is_featured: false,
            created_at: now,
            updated_at: now,
        })
    }

    /// Returns `true` if at least one delivery option is enabled.
    #[must_use]
    pub fn has_delivery_option(&self) -> bool {
        self.shipping_available || self.pickup_available
    }

    /// Returns the cover image URL, if any.
    #[must_use]
    pub fn cover_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    /// Returns `true` if buyers can currently start a purchase.
    #[must_use]
    pub fn is_purchasable(&self) -> bool {
        self.status == ListingStatus::Active
    }

    /// Returns `true` for listings only their seller and moderators see.
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        matches!(self.status, ListingStatus::Draft | ListingStatus::Deleted)
    }

    /// Draft → active.
    ///
    /// # Errors
    ///
    /// [`MarketError::InvalidState`] unless the listing is a draft, or
    /// [`MarketError::Validation`] if no delivery option is enabled.
    pub fn publish(&mut self) -> Result<ListingStatus, MarketError> {
        self.transition(&[ListingStatus::Draft], ListingStatus::Active)
    }

    /// Active → draft.
    ///
    /// # Errors
    ///
    /// [`MarketError::InvalidState`] unless the listing is active.
    pub fn unpublish(&mut self) -> Result<ListingStatus, MarketError> {
        self.transition(&[ListingStatus::Active], ListingStatus::Draft)
    }

    /// Active → reserved.
    ///
    /// # Errors
    ///
    /// [`MarketError::InvalidState`] unless the listing is active.
    pub fn reserve(&mut self) -> Result<ListingStatus, MarketError> {
        self.transition(&[ListingStatus::Active], ListingStatus::Reserved)
    }

    /// Active or reserved → sold.
    ///
    /// # Errors
    ///
    /// [`MarketError::InvalidState`] for any other status.
    pub fn mark_sold(&mut self) -> Result<ListingStatus, MarketError> {
        self.transition(
            &[ListingStatus::Active, ListingStatus::Reserved],
            ListingStatus::Sold,
        )
    }

    /// Sold, reserved or expired → active.
    ///
    /// # Errors
    ///
    /// [`MarketError::InvalidState`] for any other status, or
    /// [`MarketError::Validation`] if no delivery option is enabled.
    pub fn relist(&mut self) -> Result<ListingStatus, MarketError> {
        self.transition(
            &[
                ListingStatus::Sold,
                ListingStatus::Reserved,
                ListingStatus::Expired,
            ],
            ListingStatus::Active,
        )
    }

    /// Any status → deleted. Open-transaction checks are the caller's job.
    ///
    /// # Errors
    ///
    /// [`MarketError::InvalidState`] if the listing is already deleted.
    pub fn soft_delete(&mut self) -> Result<ListingStatus, MarketError> {
        self.transition(
            &[
                ListingStatus::Draft,
                ListingStatus::Active,
                ListingStatus::Sold,
                ListingStatus::Reserved,
                ListingStatus::Expired,
            ],
            ListingStatus::Deleted,
        )
    }

    /// Applies `to` if the current status is in `from`; returns the old status.
    fn transition(
        &mut self,
        from: &[ListingStatus],
        to: ListingStatus,
    ) -> Result<ListingStatus, MarketError> {
        let old = self.status;
        if !from.contains(&old) {
            return Err(MarketError::InvalidState(format!(
                "listing is {}, cannot move to {}",
                old.as_str(),
                to.as_str()
            )));
        }
        if to == ListingStatus::Active && !self.has_delivery_option() {
            return Err(MarketError::Validation(
                "an active listing needs shipping or pickup enabled".to_string(),
            ));
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(old)
    }
}

fn default_quantity() -> u32 {
    1
}

fn default_category() -> String {
    "other".to_string()
}

/// Seller-supplied fields for a new listing.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ListingDraft {
    /// Short title (required, at most 200 characters).
    pub title: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Category slug. Defaults to `"other"`.
    #[serde(default = "default_category")]
    pub category: String,
    /// Item condition.
    pub condition: ItemCondition,
    /// Asking price (≥ 0).
    pub price: Decimal,
    /// Pre-discount price for display (≥ 0).
    #[serde(default)]
    pub original_price: Option<Decimal>,
    /// Units available (≥ 1). Defaults to 1.
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    /// Image URLs, cover first.
    #[serde(default)]
    pub images: Vec<String>,
    /// Whether the seller ships the item.
    #[serde(default)]
    pub shipping_available: bool,
    /// Shipping cost (≥ 0); ignored without shipping.
    #[serde(default)]
    pub shipping_cost: Decimal,
    /// Whether the buyer may pick the item up.
    #[serde(default)]
    pub pickup_available: bool,
    /// Pickup address or instructions.
    #[serde(default)]
    pub pickup_location: Option<String>,
    /// Create as active instead of draft.
    #[serde(default)]
    pub publish: bool,
}

impl ListingDraft {
    /// Checks the field-level rules shared by creation and edits.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Validation`] describing the first broken rule.
    pub fn validate(&self) -> Result<(), MarketError> {
        validate_fields(&FieldView {
            title: &self.title,
            category: &self.category,
            price: self.price,
            original_price: self.original_price,
            quantity: self.quantity,
            images: &self.images,
            shipping_cost: self.shipping_cost,
        })?;
        if !self.shipping_available && !self.pickup_available {
            return Err(MarketError::Validation(
                "enable shipping, pickup, or both".to_string(),
            ));
        }
        Ok(())
    }
}

/// Partial update of a listing's descriptive fields.
///
/// Absent fields are left unchanged. Status is not editable here; use the
/// dedicated transitions.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ListingPatch {
    /// New title.
    #[serde(default)]
    pub title: Option<String>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// New category slug.
    #[serde(default)]
    pub category: Option<String>,
    /// New condition.
    #[serde(default)]
    pub condition: Option<ItemCondition>,
    /// New asking price. Existing transactions keep their frozen totals.
    #[serde(default)]
    pub price: Option<Decimal>,
    /// New display-only original price.
    #[serde(default)]
    pub original_price: Option<Decimal>,
    /// New quantity.
    #[serde(default)]
    pub quantity: Option<u32>,
    /// Replacement image list.
    #[serde(default)]
    pub images: Option<Vec<String>>,
    /// Toggle shipping.
    #[serde(default)]
    pub shipping_available: Option<bool>,
    /// New shipping cost.
    #[serde(default)]
    pub shipping_cost: Option<Decimal>,
    /// Toggle pickup.
    #[serde(default)]
    pub pickup_available: Option<bool>,
    /// New pickup location.
    #[serde(default)]
    pub pickup_location: Option<String>,
}

impl ListingPatch {
    /// Applies the patch to `listing` if the result is valid.
    ///
    /// The listing is left untouched on error.
    ///
    /// # Errors
    ///
    /// [`MarketError::InvalidState`] for sold or deleted listings,
    /// [`MarketError::Validation`] if the patched listing breaks a field rule
    /// or an active listing would lose its last delivery option.
    pub fn apply_to(&self, listing: &mut Listing) -> Result<(), MarketError> {
        if matches!(listing.status, ListingStatus::Sold | ListingStatus::Deleted) {
            return Err(MarketError::InvalidState(format!(
                "a {} listing cannot be edited",
                listing.status.as_str()
            )));
        }

        let mut next = listing.clone();
        if let Some(title) = &self.title {
            next.title = title.trim().to_string();
        }
        if let Some(description) = &self.description {
            next.description.clone_from(description);
        }
        if let Some(category) = &self.category {
            next.category.clone_from(category);
        }
        if let Some(condition) = self.condition {
            next.condition = condition;
        }
        if let Some(price) = self.price {
            next.price = price;
        }
        if self.original_price.is_some() {
            next.original_price = self.original_price;
        }
        if let Some(quantity) = self.quantity {
            next.quantity = quantity;
        }
        if let Some(images) = &self.images {
            next.images.clone_from(images);
        }
        if let Some(shipping) = self.shipping_available {
            next.shipping_available = shipping;
        }
        if let Some(cost) = self.shipping_cost {
            next.shipping_cost = cost;
        }
        if let Some(pickup) = self.pickup_available {
            next.pickup_available = pickup;
        }
        if self.pickup_location.is_some() {
            next.pickup_location.clone_from(&self.pickup_location);
        }
        if !next.shipping_available {
            next.shipping_cost = Decimal::ZERO;
        }

        validate_fields(&FieldView {
            title: &next.title,
            category: &next.category,
            price: next.price,
            original_price: next.original_price,
            quantity: next.quantity,
            images: &next.images,
            shipping_cost: next.shipping_cost,
        })?;
        if next.status == ListingStatus::Active && !next.has_delivery_option() {
            return Err(MarketError::Validation(
                "an active listing needs shipping or pickup enabled".to_string(),
            ));
        }

        next.updated_at = Utc::now();
        *listing = next;
        Ok(())
    }
}

struct FieldView<'a> {
    title: &'a str,
    category: &'a str,
    price: Decimal,
    original_price: Option<Decimal>,
    quantity: u32,
    images: &'a [String],
    shipping_cost: Decimal,
}

fn validate_fields(fields: &FieldView<'_>) -> Result<(), MarketError> {
    let title = fields.title.trim();
    if title.is_empty() {
        return Err(MarketError::Validation("title is required".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(MarketError::Validation(format!(
            "title exceeds {MAX_TITLE_LEN} characters"
        )));
    }
    if fields.category.trim().is_empty() {
        return Err(MarketError::Validation("category is required".to_string()));
    }
    check_amount("price", fields.price)?;
    if let Some(original) = fields.original_price {
        check_amount("original_price", original)?;
    }
    check_amount("shipping_cost", fields.shipping_cost)?;
    if fields.quantity == 0 {
        return Err(MarketError::Validation(
            "quantity must be at least 1".to_string(),
        ));
    }
    if fields.images.iter().any(|url| url.trim().is_empty()) {
        return Err(MarketError::Validation(
            "image URLs must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn check_amount(field: &str, value: Decimal) -> Result<(), MarketError> {
    if value < Decimal::ZERO {
        return Err(MarketError::Validation(format!(
            "{field} must be non-negative, got {value}"
        )));
    }
    if value > MAX_PRICE {
        return Err(MarketError::Validation(format!(
            "{field} must not exceed {MAX_PRICE}, got {value}"
        )));
    }
    Ok(())
}
