//! Payment provider callbacks.
//!
//! Calls are signed with HMAC-SHA256 over `"{timestamp}.{body}"` using the
//! shared webhook secret, and sent as `t=<unix seconds>,v1=<hex digest>` in
//! [`WEBHOOK_SIGNATURE_HEADER`]. Signatures older than
//! [`SIGNATURE_TOLERANCE_SECS`] are refused.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::api::dto::PaymentWebhookRequest;
use crate::app_state::AppState;
use crate::domain::Transaction;
use crate::error::{ErrorResponse, MarketError};

/// Header carrying the payload signature.
pub const WEBHOOK_SIGNATURE_HEADER: &str = "x-market-signature";

/// Accepted clock skew between signer and server.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// `POST /webhooks/payments` — Payment captured by the provider.
///
/// # Errors
///
/// Returns [`MarketError::Unauthenticated`] without a signature,
/// [`MarketError::PermissionDenied`] for a bad or stale one,
/// [`MarketError::Validation`] for a malformed body, and
/// [`MarketError::InvalidState`] unless the transaction is pending.
#[utoipa::path(
    post,
    path = "/api/v1/webhooks/payments",
    tag = "Webhooks",
    summary = "Payment captured",
    description = "Moves a pending transaction to paid and holds the funds in escrow. Signed with HMAC-SHA256 in the `x-market-signature` header as `t=<unix>,v1=<hex>` over `\"{t}.{body}\"`.",
    request_body = PaymentWebhookRequest,
    responses(
        (status = 200, description = "Paid transaction", body = Transaction),
        (status = 400, description = "Malformed body", body = ErrorResponse),
        (status = 401, description = "Missing signature", body = ErrorResponse),
        (status = 403, description = "Bad or stale signature, or webhooks disabled", body = ErrorResponse),
        (status = 409, description = "Transaction not pending", body = ErrorResponse),
    )
)]
pub async fn payment_captured(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, MarketError> {
    let Some(secret) = state.webhook_secret.as_deref() else {
        return Err(MarketError::PermissionDenied(
            "payment webhooks are not configured".to_string(),
        ));
    };
    let sig_header = headers
        .get(WEBHOOK_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| MarketError::Unauthenticated("missing webhook signature".to_string()))?;
    if let Err(reason) = verify_signature(&body, sig_header, secret, Utc::now().timestamp()) {
        tracing::warn!(reason, "payment webhook rejected");
        return Err(MarketError::PermissionDenied(format!(
            "webhook signature rejected: {reason}"
        )));
    }

    let req: PaymentWebhookRequest = serde_json::from_slice(&body)
        .map_err(|e| MarketError::Validation(format!("invalid webhook payload: {e}")))?;
    let tx = state
        .service
        .mark_paid(req.transaction_id, req.payment_reference)
        .await?;
    Ok(Json(tx))
}

/// Checks `sig_header` against `payload` as signed at its timestamp.
fn verify_signature(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
    now: i64,
) -> Result<(), &'static str> {
    let mut timestamp = "";
    let mut signature = "";
    for part in sig_header.split(',').map(str::trim) {
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = t;
        } else if let Some(v) = part.strip_prefix("v1=") {
            signature = v;
        }
    }
    if timestamp.is_empty() || signature.is_empty() {
        return Err("malformed signature header");
    }

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| "key error")?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    let sig_bytes = hex::decode(signature).map_err(|_| "signature is not hex")?;
    mac.verify_slice(&sig_bytes)
        .map_err(|_| "signature mismatch")?;

    let ts: i64 = timestamp.parse().map_err(|_| "invalid timestamp")?;
    if (now - ts).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err("timestamp outside tolerance");
    }
    Ok(())
}

/// Webhook routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/webhooks/payments", post(payment_captured))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_unit";
    const BODY: &[u8] = br#"{"transaction_id":"00000000-0000-0000-0000-000000000000"}"#;

    fn sign(secret: &str, timestamp: i64, payload: &[u8]) -> String {
        let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
            return String::new();
        };
        mac.update(format!("{timestamp}.").as_bytes());
        mac.update(payload);
        format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn valid_signature_passes() {
        let header = sign(SECRET, 1_700_000_000, BODY);
        assert_eq!(
            verify_signature(BODY, &header, SECRET, 1_700_000_100),
            Ok(())
        );
    }

    #[test]
    fn tampered_body_or_wrong_key_fails() {
        let header = sign(SECRET, 1_700_000_000, BODY);
        let tampered = br#"{"transaction_id":"11111111-1111-1111-1111-111111111111"}"#;
        assert_eq!(
            verify_signature(tampered, &header, SECRET, 1_700_000_000),
            Err("signature mismatch")
        );
        let other = sign("whsec_other", 1_700_000_000, BODY);
        assert_eq!(
            verify_signature(BODY, &other, SECRET, 1_700_000_000),
            Err("signature mismatch")
        );
    }

    #[test]
    fn replayed_signature_expires() {
        let header = sign(SECRET, 1_700_000_000, BODY);
        assert_eq!(
            verify_signature(BODY, &header, SECRET, 1_700_000_000 + SIGNATURE_TOLERANCE_SECS + 1),
            Err("timestamp outside tolerance")
        );
    }

    #[test]
    fn moving_the_timestamp_breaks_the_signature() {
        let header = sign(SECRET, 1_700_000_000, BODY);
        let forged = header.replacen("t=1700000000", "t=1700000900", 1);
        assert_eq!(
            verify_signature(BODY, &forged, SECRET, 1_700_000_900),
            Err("signature mismatch")
        );
    }

    #[test]
    fn malformed_headers_fail() {
        assert_eq!(
            verify_signature(BODY, "v1=abcd", SECRET, 0),
            Err("malformed signature header")
        );
        assert_eq!(
            verify_signature(BODY, "t=1,v1=zz", SECRET, 1),
            Err("signature is not hex")
        );
    }
}
