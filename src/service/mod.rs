//! Service layer: marketplace operations.
//!
//! [`MarketService`] resolves the caller's membership, applies the domain
//! transition under the row lock and publishes a [`MarketEvent`] on the
//! [`EventBus`] before releasing it, so events on one topic arrive in
//! commit order. Operations are grouped by concern
//! in the submodules; each adds an `impl MarketService` block.

pub mod disputes;
pub mod escrow;
pub mod listings;
pub mod messaging;
pub mod reputation;
pub mod reviews;

use std::fmt;
use std::sync::Arc;

use crate::domain::{CommunityId, EventBus, FeeSchedule, MarketEvent, Member, Principal};
use crate::error::MarketError;
use crate::membership::MembershipDirectory;
use crate::store::MarketStore;

pub use listings::{FavoriteState, ListingAction, ListingFilter};
pub use messaging::NewMessage;

/// Orchestration layer for every marketplace operation.
///
/// Cheap to clone; all state lives behind the shared store.
#[derive(Clone)]
pub struct MarketService {
    store: Arc<MarketStore>,
    directory: Arc<dyn MembershipDirectory>,
    fees: Arc<dyn FeeSchedule>,
    event_bus: EventBus,
}

impl fmt::Debug for MarketService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarketService")
            .field("store", &self.store)
            .field("fees", &self.fees)
            .field("event_bus", &self.event_bus)
            .finish_non_exhaustive()
    }
}

impl MarketService {
    /// Creates a new `MarketService`.
    #[must_use]
    pub fn new(
        store: Arc<MarketStore>,
        directory: Arc<dyn MembershipDirectory>,
        fees: Arc<dyn FeeSchedule>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            store,
            directory,
            fees,
            event_bus,
        }
    }

    /// Returns a reference to the inner [`EventBus`].
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Returns a reference to the inner [`MarketStore`].
    #[must_use]
    pub fn store(&self) -> &Arc<MarketStore> {
        &self.store
    }

    /// Returns the active fee schedule.
    #[must_use]
    pub fn fees(&self) -> &dyn FeeSchedule {
        self.fees.as_ref()
    }

    /// Resolves the caller to an active membership.
    ///
    /// # Errors
    ///
    /// [`MarketError::NotAMember`] if the user has no active membership in
    /// the community, or whatever the directory reports.
    pub async fn resolve_member(&self, principal: Principal) -> Result<Member, MarketError> {
        self.directory
            .get_active_member(principal.community_id, principal.user_id)
            .await?
            .ok_or(MarketError::NotAMember)
    }

    fn emit(&self, event: MarketEvent) {
        let _ = self.event_bus.publish(event);
    }
}

/// Records of other communities are reported as missing.
fn ensure_community(
    member: &Member,
    community_id: CommunityId,
    entity: &'static str,
    id: impl Into<uuid::Uuid>,
) -> Result<(), MarketError> {
    if member.community_id == community_id {
        Ok(())
    } else {
        Err(MarketError::not_found(entity, id))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
pub(crate) mod test_support {
    //! Shared fixtures for the service tests.

    use std::sync::Arc;

    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::MarketService;
    use crate::domain::{
        CommunityId, EventBus, ItemCondition, ListingDraft, Member, MemberId, MemberRole,
        MemberStatus, Principal, TieredFeeSchedule, UserId,
    };
    use crate::membership::InMemoryDirectory;
    use crate::store::MarketStore;

    /// A service over an in-memory directory plus a few members.
    pub(crate) struct Fixture {
        pub service: MarketService,
        pub directory: Arc<InMemoryDirectory>,
        pub community: CommunityId,
    }

    impl Fixture {
        pub(crate) fn new() -> Self {
            let directory = Arc::new(InMemoryDirectory::new());
            let service = MarketService::new(
                Arc::new(MarketStore::new()),
                Arc::clone(&directory) as Arc<dyn crate::membership::MembershipDirectory>,
                Arc::new(TieredFeeSchedule::default()),
                EventBus::new(64),
            );
            Self {
                service,
                directory,
                community: CommunityId::new(),
            }
        }

        pub(crate) async fn join(&self, role: MemberRole) -> (Principal, Member) {
            let member = Member {
                member_id: MemberId::new(),
                user_id: UserId::new(),
                community_id: self.community,
                display_name: String::new(),
                role,
                status: MemberStatus::Active,
            };
            self.directory.upsert(member.clone()).await;
            (
                Principal {
                    community_id: self.community,
                    user_id: member.user_id,
                },
                member,
            )
        }
    }

    pub(crate) fn draft(price: Decimal, shipping_cost: Decimal) -> ListingDraft {
        ListingDraft {
            title: "Espresso machine".to_string(),
            description: "Works fine".to_string(),
            category: "kitchen".to_string(),
            condition: ItemCondition::Good,
            price,
            original_price: Some(dec!(300)),
            quantity: 1,
            images: vec!["https://img.example/1.jpg".to_string()],
            shipping_available: true,
            shipping_cost,
            pickup_available: true,
            pickup_location: Some("Lobby".to_string()),
            publish: true,
        }
    }
}
