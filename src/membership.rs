//! Membership directory seam.
//!
//! The marketplace does not own community membership. Every operation
//! resolves the caller through a [`MembershipDirectory`] first; the bundled
//! [`InMemoryDirectory`] serves tests and single-node deployments seeded
//! from a JSON file.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{CommunityId, Member, UserId};
use crate::error::MarketError;

/// Resolves callers to community memberships.
/// Mockable for testing via mockall.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MembershipDirectory: Send + Sync {
    /// Returns the membership of `user_id` in `community_id`, whatever its
    /// status, or `None` if the user never joined.
    async fn find_member(
        &self,
        community_id: CommunityId,
        user_id: UserId,
    ) -> Result<Option<Member>, MarketError>;

    /// Returns the membership only if it is active.
    async fn get_active_member(
        &self,
        community_id: CommunityId,
        user_id: UserId,
    ) -> Result<Option<Member>, MarketError> {
        Ok(self
            .find_member(community_id, user_id)
            .await?
            .filter(Member::is_active))
    }
}

/// Directory held in memory.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    members: RwLock<HashMap<(CommunityId, UserId), Member>>,
}

impl InMemoryDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a directory from a list of members.
    #[must_use]
    pub fn with_members(members: impl IntoIterator<Item = Member>) -> Self {
        let map = members
            .into_iter()
            .map(|m| ((m.community_id, m.user_id), m))
            .collect();
        Self {
            members: RwLock::new(map),
        }
    }

    /// Loads a JSON array of members from `path`.
    ///
    /// # Errors
    ///
    /// [`MarketError::Internal`] if the file cannot be read or parsed.
    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self, MarketError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            MarketError::Internal(format!("cannot read {}: {e}", path.display()))
        })?;
        let members: Vec<Member> = serde_json::from_str(&raw).map_err(|e| {
            MarketError::Internal(format!("invalid member file {}: {e}", path.display()))
        })?;
        tracing::info!(path = %path.display(), count = members.len(), "member directory loaded");
        Ok(Self::with_members(members))
    }

    /// Inserts or replaces a membership.
    pub async fn upsert(&self, member: Member) {
        self.members
            .write()
            .await
            .insert((member.community_id, member.user_id), member);
    }
}

#[async_trait]
impl MembershipDirectory for InMemoryDirectory {
    async fn find_member(
        &self,
        community_id: CommunityId,
        user_id: UserId,
    ) -> Result<Option<Member>, MarketError> {
        Ok(self
            .members
            .read()
            .await
            .get(&(community_id, user_id))
            .cloned())
    }
}
