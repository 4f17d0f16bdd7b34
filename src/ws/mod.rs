//! WebSocket layer: connection handling, message routing, subscriptions.
//!
//! The WebSocket endpoint at `/ws` streams market events to members. A
//! connection only sees events from its own community, and conversation
//! or transaction events only when the member is a participant.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod subscription;
