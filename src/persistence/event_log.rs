//! Background writer that copies bus events into the event log.

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use super::PostgresPersistence;
use crate::domain::EventBus;

/// Spawns a task that appends every published event to PostgreSQL.
///
/// Write failures are logged and skipped; the in-process store is
/// unaffected. The task ends when the bus is dropped.
#[must_use]
pub fn spawn_event_log_writer(persistence: PostgresPersistence, bus: &EventBus) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Err(e) = persistence.save_event(&event).await {
                        tracing::error!(
                            error = %e,
                            event_type = event.event_type_str(),
                            topic = %event.topic(),
                            "failed to append event to log"
                        );
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event log writer lagged, events dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
        tracing::info!("event log writer stopped");
    })
}
