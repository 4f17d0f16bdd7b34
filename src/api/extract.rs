//! Caller identity extraction from the upstream auth proxy headers.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;

use crate::domain::{CommunityId, Principal, UserId};
use crate::error::MarketError;

/// Header carrying the caller's community UUID.
pub const COMMUNITY_HEADER: &str = "x-community-id";
/// Header carrying the caller's user UUID.
pub const USER_HEADER: &str = "x-user-id";

/// Reads the caller identity from request headers.
///
/// # Errors
///
/// Returns [`MarketError::Unauthenticated`] if either header is missing or
/// not a UUID.
pub fn principal_from_headers(headers: &HeaderMap) -> Result<Principal, MarketError> {
    Ok(Principal {
        community_id: parse_header::<CommunityId>(headers, COMMUNITY_HEADER)?,
        user_id: parse_header::<UserId>(headers, USER_HEADER)?,
    })
}

fn parse_header<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Result<T, MarketError> {
    let raw = headers
        .get(name)
        .ok_or_else(|| MarketError::Unauthenticated(format!("missing {name} header")))?;
    raw.to_str()
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(|| MarketError::Unauthenticated(format!("malformed {name} header")))
}

impl<S: Send + Sync> FromRequestParts<S> for Principal {
    type Rejection = MarketError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        principal_from_headers(&parts.headers)
    }
}
