//! Persistence layer: PostgreSQL audit log of market events.
//!
//! The in-process store stays authoritative; the event log is an
//! append-only record of every [`crate::domain::MarketEvent`] for audit
//! and replay, written by a background task that follows the event bus.

pub mod event_log;
pub mod models;
pub mod postgres;

pub use event_log::spawn_event_log_writer;
pub use models::StoredEvent;
pub use postgres::PostgresPersistence;
