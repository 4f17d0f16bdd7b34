//! Database models for the event log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A stored row from the `market_events` table.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StoredEvent {
    /// Auto-increment row ID.
    pub id: i64,
    /// Community the event belongs to.
    pub community_id: Uuid,
    /// Listing, conversation or transaction the event is filed under.
    pub topic: Uuid,
    /// Event type discriminator (e.g. `"transaction_updated"`).
    pub event_type: String,
    /// JSONB payload, the serialized event.
    pub payload: serde_json::Value,
    /// Server-side creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Query for [`super::PostgresPersistence::load_events`].
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    /// Only events strictly after this time.
    pub after: Option<DateTime<Utc>>,
    /// Only events filed under this topic.
    pub topic: Option<Uuid>,
    /// Only this event type.
    pub event_type: Option<String>,
    /// Maximum rows returned.
    pub limit: i64,
}
