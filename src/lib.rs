//! # commons-market
//!
//! Marketplace and escrow engine for multi-tenant community apps.
//!
//! Members of a community list items for sale, favorite them, message the
//! seller and buy through an escrow: funds are held once the payment
//! provider confirms capture and released when the buyer confirms
//! delivery. Either party can freeze held funds with a dispute that a
//! community admin settles. Completed purchases can be reviewed, and
//! seller reputation is derived on demand.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)          Payment provider (webhook)
//!     │                                   │
//!     ├── REST Handlers (api/) ───────────┘
//!     ├── WS Handler (ws/)
//!     │
//!     ├── MarketService (service/) ── MembershipDirectory (membership)
//!     ├── EventBus (domain/) ──────── event log writer (persistence/)
//!     │
//!     ├── MarketStore (store/)
//!     │
//!     └── PostgreSQL event log (optional)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod membership;
pub mod persistence;
pub mod service;
pub mod store;
pub mod ws;
