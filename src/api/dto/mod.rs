//! Data Transfer Objects for REST request/response serialization.
//!
//! Domain records are returned as-is; this module only holds request
//! bodies, query strings and list envelopes. Money is serialized by
//! `rust_decimal` as JSON strings.

pub mod admin_dto;
pub mod common_dto;
pub mod conversation_dto;
pub mod listing_dto;
pub mod transaction_dto;

pub use admin_dto::*;
pub use common_dto::*;
pub use conversation_dto::*;
pub use listing_dto::*;
pub use transaction_dto::*;
