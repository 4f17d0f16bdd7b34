//! REST endpoint handlers organized by resource.

pub mod admin;
pub mod conversations;
pub mod disputes;
pub mod listings;
pub mod reviews;
pub mod system;
pub mod transactions;
pub mod webhooks;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(listings::routes())
        .merge(conversations::routes())
        .merge(transactions::routes())
        .merge(disputes::routes())
        .merge(reviews::routes())
        .merge(webhooks::routes())
        .merge(admin::routes())
}
