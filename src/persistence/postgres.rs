//! PostgreSQL implementation of the event log.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use super::models::{EventQuery, StoredEvent};
use crate::config::MarketConfig;
use crate::domain::{CommunityId, MarketEvent};
use crate::error::MarketError;

/// Hard cap on rows returned by one audit query.
pub const MAX_EVENTS_PER_QUERY: i64 = 1_000;

type EventRow = (i64, Uuid, Uuid, String, serde_json::Value, DateTime<Utc>);

/// PostgreSQL-backed event log using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresPersistence {
    pool: PgPool,
}

impl PostgresPersistence {
    /// Creates a new persistence layer with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects using the pool settings from `config` and applies the
    /// embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns a [`MarketError::Persistence`] if the database is
    /// unreachable or a migration fails.
    pub async fn connect(config: &MarketConfig) -> Result<Self, MarketError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| MarketError::Persistence(e.to_string()))?;
        tracing::info!("event log database ready");
        Ok(Self::new(pool))
    }

    /// Appends an event to the event log.
    ///
    /// # Errors
    ///
    /// Returns a [`MarketError::Persistence`] on database or encoding
    /// failure.
    pub async fn save_event(&self, event: &MarketEvent) -> Result<i64, MarketError> {
        let payload = serde_json::to_value(event)
            .map_err(|e| MarketError::Persistence(format!("event encoding failed: {e}")))?;
        let community_id: Uuid = event.community_id().into();

        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO market_events (community_id, topic, event_type, payload) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(community_id)
        .bind(event.topic())
        .bind(event.event_type_str())
        .bind(&payload)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    /// Loads a community's events in commit order.
    ///
    /// # Errors
    ///
    /// Returns a [`MarketError::Persistence`] on database failure.
    pub async fn load_events(
        &self,
        community_id: CommunityId,
        query: &EventQuery,
    ) -> Result<Vec<StoredEvent>, MarketError> {
        let limit = query.limit.clamp(1, MAX_EVENTS_PER_QUERY);
        let community: Uuid = community_id.into();
        let rows = sqlx::query_as::<_, EventRow>(
            "SELECT id, community_id, topic, event_type, payload, created_at FROM market_events \
             WHERE community_id = $1 \
               AND ($2::timestamptz IS NULL OR created_at > $2) \
               AND ($3::uuid IS NULL OR topic = $3) \
               AND ($4::text IS NULL OR event_type = $4) \
             ORDER BY id ASC LIMIT $5",
        )
        .bind(community)
        .bind(query.after)
        .bind(query.topic)
        .bind(query.event_type.as_deref())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(id, community_id, topic, event_type, payload, created_at)| StoredEvent {
                    id,
                    community_id,
                    topic,
                    event_type,
                    payload,
                    created_at,
                },
            )
            .collect())
    }
}
