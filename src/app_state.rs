//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::EventBus;
use crate::persistence::PostgresPersistence;
use crate::service::MarketService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Market service for all business logic.
    pub service: Arc<MarketService>,
    /// Event bus for WebSocket subscriptions.
    pub event_bus: EventBus,
    /// Event log, present when persistence is enabled.
    pub persistence: Option<PostgresPersistence>,
    /// HMAC key for payment webhook signatures. Webhooks are refused when
    /// unset.
    pub webhook_secret: Option<Arc<str>>,
}

impl AppState {
    /// Builds state around `service`, sharing its event bus.
    #[must_use]
    pub fn new(service: Arc<MarketService>) -> Self {
        let event_bus = service.event_bus().clone();
        Self {
            service,
            event_bus,
            persistence: None,
            webhook_secret: None,
        }
    }

    /// Attaches the event log.
    #[must_use]
    pub fn with_persistence(mut self, persistence: PostgresPersistence) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// Sets the payment webhook secret.
    #[must_use]
    pub fn with_webhook_secret(mut self, secret: impl Into<Arc<str>>) -> Self {
        self.webhook_secret = Some(secret.into());
        self
    }
}
