//! Type-safe identifiers.
//!
//! Every record kind gets its own newtype around [`uuid::Uuid`] (v4) so that
//! a listing id can never be passed where a transaction id is expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
        )]
        #[serde(transparent)]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Creates a new random identifier (UUID v4).
            #[must_use]
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Creates an identifier from an existing [`uuid::Uuid`].
            #[must_use]
            pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner [`uuid::Uuid`].
            #[must_use]
            pub const fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                uuid::Uuid::parse_str(s).map(Self)
            }
        }

        impl From<uuid::Uuid> for $name {
            fn from(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for uuid::Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(
    /// Tenant: one housing or office community.
    CommunityId
);
define_id!(
    /// Authenticated user account, as asserted by the upstream auth proxy.
    UserId
);
define_id!(
    /// A user's membership row inside one community.
    MemberId
);
define_id!(
    /// Marketplace listing.
    ListingId
);
define_id!(
    /// Buyer/seller messaging thread about one listing.
    ConversationId
);
define_id!(
    /// Single message inside a conversation.
    MessageId
);
define_id!(
    /// Purchase with its escrow track.
    TransactionId
);
define_id!(
    /// Dispute filed against a transaction.
    DisputeId
);
define_id!(
    /// Rating left by one transaction party about the other.
    ReviewId
);

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn new_generates_unique_ids() {
        assert_ne!(ListingId::new(), ListingId::new());
    }

    #[test]
    fn display_and_parse_agree() {
        let id = TransactionId::new();
        let Ok(parsed) = id.to_string().parse::<TransactionId>() else {
            panic!("display output should parse back");
        };
        assert_eq!(parsed, id);
    }

    #[test]
    fn serializes_as_bare_uuid_string() {
        let uuid = uuid::Uuid::new_v4();
        let id = MemberId::from_uuid(uuid);
        let json = serde_json::to_string(&id).unwrap_or_default();
        assert_eq!(json, format!("\"{uuid}\""));
    }

    #[test]
    fn rejects_garbage() {
        assert!("not-a-uuid".parse::<ConversationId>().is_err());
    }
}
