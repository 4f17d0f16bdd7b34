//! Community membership as seen by the marketplace.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{CommunityId, MemberId, UserId};

/// Role of a member inside their community.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    /// Regular resident or tenant.
    Member,
    /// Can moderate marketplace listings.
    Moderator,
    /// Community administrator; resolves disputes.
    Admin,
}

/// Membership status. Only `Active` members may use the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    /// Approved, non-suspended member.
    Active,
    /// Awaiting approval by a community admin.
    Pending,
    /// Suspended by a community admin.
    Suspended,
}

/// Membership record resolved by the [`crate::membership::MembershipDirectory`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Member {
    /// Membership identifier, used as seller/buyer/reviewer on records.
    pub member_id: MemberId,
    /// Account behind the membership.
    pub user_id: UserId,
    /// Community the membership belongs to.
    pub community_id: CommunityId,
    /// Display name shown next to listings and messages.
    #[serde(default)]
    pub display_name: String,
    /// Role inside the community.
    pub role: MemberRole,
    /// Membership status.
    pub status: MemberStatus,
}

impl Member {
    /// Returns `true` if the membership is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == MemberStatus::Active
    }

    /// Returns `true` for moderators and admins.
    #[must_use]
    pub fn can_moderate(&self) -> bool {
        matches!(self.role, MemberRole::Moderator | MemberRole::Admin)
    }

    /// Returns `true` for community admins.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == MemberRole::Admin
    }
}

/// Caller identity as asserted by the upstream authentication proxy.
///
/// A principal is only a claim; services resolve it to an active [`Member`]
/// before doing anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    /// Community the request is scoped to.
    pub community_id: CommunityId,
    /// Authenticated user.
    pub user_id: UserId,
}
