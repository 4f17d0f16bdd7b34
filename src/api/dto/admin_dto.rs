//! Audit log DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::persistence::StoredEvent;
use crate::persistence::models::EventQuery;

/// Query string for `GET /admin/events`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EventLogQuery {
    /// Only events after this instant (RFC 3339).
    pub after: Option<DateTime<Utc>>,
    /// Only events filed under this listing, conversation or transaction.
    pub topic: Option<Uuid>,
    /// Only this event type, e.g. `transaction_updated`.
    pub event_type: Option<String>,
    /// Maximum rows (default 100, max 1000).
    pub limit: Option<i64>,
}

impl From<EventLogQuery> for EventQuery {
    fn from(q: EventLogQuery) -> Self {
        Self {
            after: q.after,
            topic: q.topic,
            event_type: q.event_type,
            limit: q.limit.unwrap_or(100),
        }
    }
}

/// Response body for `GET /admin/events`.
#[derive(Debug, Serialize, ToSchema)]
pub struct EventLogResponse {
    /// Events in commit order.
    pub data: Vec<StoredEvent>,
}
