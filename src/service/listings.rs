//! Listing lifecycle, favorites and views.

use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use super::{MarketService, ensure_community};
use crate::domain::{
    Listing, ListingDraft, ListingId, ListingPatch, ListingStatus, MarketEvent, Member, MemberId,
    Principal,
};
use crate::error::MarketError;

/// Status transitions exposed as dedicated endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingAction {
    /// Draft → active. Seller or moderator.
    Publish,
    /// Active → draft. Seller or moderator.
    Unpublish,
    /// Active → reserved. Seller only.
    Reserve,
    /// Active or reserved → sold. Seller only.
    MarkSold,
    /// Sold, reserved or expired → active. Seller only.
    Relist,
}

impl ListingAction {
    const fn moderators_allowed(self) -> bool {
        matches!(self, Self::Publish | Self::Unpublish)
    }

    const fn verb(self) -> &'static str {
        match self {
            Self::Publish => "publish",
            Self::Unpublish => "unpublish",
            Self::Reserve => "reserve",
            Self::MarkSold => "mark sold",
            Self::Relist => "relist",
        }
    }

    fn apply(self, listing: &mut Listing) -> Result<ListingStatus, MarketError> {
        match self {
            Self::Publish => listing.publish(),
            Self::Unpublish => listing.unpublish(),
            Self::Reserve => listing.reserve(),
            Self::MarkSold => listing.mark_sold(),
            Self::Relist => listing.relist(),
        }
    }
}

/// Listing search criteria. Empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct ListingFilter {
    /// Only this status. Without it, deleted listings are skipped.
    pub status: Option<ListingStatus>,
    /// Only this category.
    pub category: Option<String>,
    /// Only this seller.
    pub seller_id: Option<MemberId>,
}

impl ListingFilter {
    fn matches(&self, listing: &Listing) -> bool {
        let status_ok = match self.status {
            Some(status) => listing.status == status,
            None => listing.status != ListingStatus::Deleted,
        };
        status_ok
            && self
                .category
                .as_deref()
                .is_none_or(|c| listing.category.eq_ignore_ascii_case(c))
            && self.seller_id.is_none_or(|s| listing.seller_id == s)
    }
}

/// Result of a favorite toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct FavoriteState {
    /// Listing toggled.
    pub listing_id: ListingId,
    /// Whether the caller now favorites it.
    pub favorited: bool,
    /// Counter after the toggle.
    pub favorites_count: u64,
}

/// Drafts and deleted listings are visible only to their seller and staff.
fn can_see(member: &Member, listing: &Listing) -> bool {
    !listing.is_hidden() || listing.seller_id == member.member_id || member.can_moderate()
}

fn ensure_visible(member: &Member, listing: &Listing) -> Result<(), MarketError> {
    ensure_community(member, listing.community_id, "listing", listing.id)?;
    if can_see(member, listing) {
        Ok(())
    } else {
        Err(MarketError::not_found("listing", listing.id))
    }
}

fn ensure_seller(member: &Member, listing: &Listing, action: &str) -> Result<(), MarketError> {
    if listing.seller_id == member.member_id {
        Ok(())
    } else {
        Err(MarketError::PermissionDenied(format!(
            "only the seller can {action} this listing"
        )))
    }
}

fn ensure_seller_or_staff(
    member: &Member,
    listing: &Listing,
    action: &str,
) -> Result<(), MarketError> {
    if listing.seller_id == member.member_id || member.can_moderate() {
        Ok(())
    } else {
        Err(MarketError::PermissionDenied(format!(
            "only the seller or a moderator can {action} this listing"
        )))
    }
}

impl MarketService {
    /// Creates a listing owned by the caller.
    ///
    /// # Errors
    ///
    /// [`MarketError::NotAMember`] or [`MarketError::Validation`].
    pub async fn create_listing(
        &self,
        principal: Principal,
        draft: ListingDraft,
    ) -> Result<Listing, MarketError> {
        let member = self.resolve_member(principal).await?;
        let listing = Listing::from_draft(draft, member.community_id, member.member_id)?;
        self.store.listings.insert(listing.id, listing.clone()).await?;

        self.emit(MarketEvent::ListingCreated {
            community_id: listing.community_id,
            listing_id: listing.id,
            seller_id: listing.seller_id,
            status: listing.status,
            timestamp: listing.created_at,
        });
        tracing::info!(
            listing_id = %listing.id,
            seller_id = %listing.seller_id,
            status = listing.status.as_str(),
            "listing created"
        );
        Ok(listing)
    }

    /// Returns one listing visible to the caller.
    ///
    /// # Errors
    ///
    /// [`MarketError::NotFound`] for missing, foreign or hidden listings.
    pub async fn get_listing(
        &self,
        principal: Principal,
        listing_id: ListingId,
    ) -> Result<Listing, MarketError> {
        let member = self.resolve_member(principal).await?;
        let listing = self.store.listings.snapshot(listing_id).await?;
        ensure_visible(&member, &listing)?;
        Ok(listing)
    }

    /// Lists the caller's community listings, newest first.
    ///
    /// # Errors
    ///
    /// [`MarketError::NotAMember`].
    pub async fn list_listings(
        &self,
        principal: Principal,
        filter: &ListingFilter,
    ) -> Result<Vec<Listing>, MarketError> {
        let member = self.resolve_member(principal).await?;
        let mut listings = self
            .store
            .listings
            .collect(|l| {
                l.community_id == member.community_id && can_see(&member, l) && filter.matches(l)
            })
            .await;
        listings.sort_by(|a, b| {
            b.is_featured
                .cmp(&a.is_featured)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(listings)
    }

    /// Edits descriptive fields and price. Seller only.
    ///
    /// Transactions already created keep their frozen amounts.
    ///
    /// # Errors
    ///
    /// [`MarketError::PermissionDenied`], [`MarketError::InvalidState`] for
    /// sold or deleted listings, or [`MarketError::Validation`].
    pub async fn update_listing(
        &self,
        principal: Principal,
        listing_id: ListingId,
        patch: &ListingPatch,
    ) -> Result<Listing, MarketError> {
        let member = self.resolve_member(principal).await?;
        let row = self.store.listings.get(listing_id).await?;
        let mut listing = row.write().await;
        ensure_visible(&member, &listing)?;
        ensure_seller(&member, &listing, "edit")?;
        patch.apply_to(&mut listing)?;
        let updated = listing.clone();
        self.emit(MarketEvent::ListingUpdated {
            community_id: updated.community_id,
            listing_id,
            seller_id: updated.seller_id,
            status: updated.status,
            timestamp: updated.updated_at,
        });
        drop(listing);

        tracing::info!(%listing_id, "listing updated");
        Ok(updated)
    }

    /// Runs one of the dedicated status transitions.
    ///
    /// # Errors
    ///
    /// [`MarketError::PermissionDenied`] if the caller may not run
    /// `action`, [`MarketError::InvalidState`] for an illegal move, or
    /// [`MarketError::Validation`] when activating without a delivery
    /// option.
    pub async fn change_listing_status(
        &self,
        principal: Principal,
        listing_id: ListingId,
        action: ListingAction,
    ) -> Result<Listing, MarketError> {
        let member = self.resolve_member(principal).await?;
        let row = self.store.listings.get(listing_id).await?;
        let mut listing = row.write().await;
        ensure_visible(&member, &listing)?;
        if action.moderators_allowed() {
            ensure_seller_or_staff(&member, &listing, action.verb())?;
        } else {
            ensure_seller(&member, &listing, action.verb())?;
        }
        let from = action.apply(&mut listing)?;
        let updated = listing.clone();
        self.emit_status_change(&updated, from, member.member_id);
        drop(listing);

        Ok(updated)
    }

    /// Soft-deletes a listing. Seller or moderator.
    ///
    /// # Errors
    ///
    /// [`MarketError::InvalidState`] while a pending, paid or disputed
    /// transaction references the listing, or if it is already deleted.
    pub async fn delete_listing(
        &self,
        principal: Principal,
        listing_id: ListingId,
    ) -> Result<Listing, MarketError> {
        let member = self.resolve_member(principal).await?;
        let row = self.store.listings.get(listing_id).await?;
        let mut listing = row.write().await;
        ensure_visible(&member, &listing)?;
        ensure_seller_or_staff(&member, &listing, "delete")?;

        // Purchases insert under the listing read lock, so none can start
        // while this write lock is held.
        let open = self
            .store
            .transactions
            .collect(|t| t.listing_id == listing_id && t.is_open())
            .await;
        if !open.is_empty() {
            return Err(MarketError::InvalidState(format!(
                "listing has {} open transaction(s)",
                open.len()
            )));
        }
        let from = listing.soft_delete()?;
        let updated = listing.clone();
        self.emit_status_change(&updated, from, member.member_id);
        drop(listing);

        Ok(updated)
    }

    /// Adds or removes the caller's favorite and moves the counter with it.
    ///
    /// # Errors
    ///
    /// [`MarketError::NotFound`] for listings the caller cannot see.
    pub async fn toggle_favorite(
        &self,
        principal: Principal,
        listing_id: ListingId,
    ) -> Result<FavoriteState, MarketError> {
        let member = self.resolve_member(principal).await?;
        let row = self.store.listings.get(listing_id).await?;
        let mut listing = row.write().await;
        ensure_visible(&member, &listing)?;

        let favorited = self
            .store
            .toggle_favorite(listing_id, member.member_id)
            .await;
        listing.favorites_count = if favorited {
            listing.favorites_count.saturating_add(1)
        } else {
            listing.favorites_count.saturating_sub(1)
        };
        let state = FavoriteState {
            listing_id,
            favorited,
            favorites_count: listing.favorites_count,
        };
        let (community_id, seller_id) = (listing.community_id, listing.seller_id);
        self.emit(MarketEvent::FavoriteToggled {
            community_id,
            listing_id,
            seller_id,
            member_id: member.member_id,
            favorited,
            favorites_count: state.favorites_count,
            timestamp: Utc::now(),
        });
        drop(listing);

        tracing::debug!(%listing_id, member_id = %member.member_id, favorited, "favorite toggled");
        Ok(state)
    }

    /// Bumps the view counter and returns the new value.
    ///
    /// # Errors
    ///
    /// [`MarketError::NotFound`] for listings the caller cannot see.
    pub async fn record_view(
        &self,
        principal: Principal,
        listing_id: ListingId,
    ) -> Result<u64, MarketError> {
        let member = self.resolve_member(principal).await?;
        let row = self.store.listings.get(listing_id).await?;
        let mut listing = row.write().await;
        ensure_visible(&member, &listing)?;
        listing.views_count = listing.views_count.saturating_add(1);
        Ok(listing.views_count)
    }

    /// Returns the listings the caller favorited that are still visible.
    ///
    /// # Errors
    ///
    /// [`MarketError::NotAMember`].
    pub async fn list_favorites(&self, principal: Principal) -> Result<Vec<Listing>, MarketError> {
        let member = self.resolve_member(principal).await?;
        let mut out = Vec::new();
        for listing_id in self.store.favorites_of(member.member_id).await {
            if let Ok(listing) = self.store.listings.snapshot(listing_id).await
                && listing.community_id == member.community_id
                && can_see(&member, &listing)
            {
                out.push(listing);
            }
        }
        out.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(out)
    }

    fn emit_status_change(&self, listing: &Listing, from: ListingStatus, changed_by: MemberId) {
        self.emit(MarketEvent::ListingStatusChanged {
            community_id: listing.community_id,
            listing_id: listing.id,
            seller_id: listing.seller_id,
            from,
            to: listing.status,
            changed_by,
            timestamp: listing.updated_at,
        });
        tracing::info!(
            listing_id = %listing.id,
            from = from.as_str(),
            to = listing.status.as_str(),
            %changed_by,
            "listing status changed"
        );
    }
}
