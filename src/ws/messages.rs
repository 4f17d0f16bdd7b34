//! WebSocket message types: envelope and commands.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Top-level WebSocket message envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsMessage {
    /// Client-provided ID for requests; server-generated for events.
    #[serde(default)]
    pub id: String,
    /// Message type discriminator.
    #[serde(rename = "type")]
    pub msg_type: WsMessageType,
    /// ISO-8601 timestamp. Optional on client commands.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// Variant-specific payload.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl WsMessage {
    /// Builds a server-side message stamped with the current time.
    #[must_use]
    pub fn new(id: impl Into<String>, msg_type: WsMessageType, payload: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            msg_type,
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Builds an error reply.
    #[must_use]
    pub fn error(id: impl Into<String>, code: u16, message: &str) -> Self {
        Self::new(
            id,
            WsMessageType::Error,
            serde_json::json!({ "code": code, "message": message }),
        )
    }

    /// Serializes the envelope; `None` only if serialization fails.
    #[must_use]
    pub fn to_json(&self) -> Option<String> {
        serde_json::to_string(self).ok()
    }
}

/// Discriminator for WebSocket message types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WsMessageType {
    /// Client → Server command.
    Command,
    /// Server → Client response to a command.
    Response,
    /// Server → Client broadcast event.
    Event,
    /// Server → Client error.
    Error,
}

/// Commands that a client can send in a `command` envelope's payload.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum WsCommand {
    /// Subscribe to listing, conversation or transaction topics.
    Subscribe {
        /// Topic UUIDs. `"*"` subscribes to every visible event.
        topics: Vec<String>,
    },
    /// Drop topics from the subscription.
    Unsubscribe {
        /// Topic UUIDs. `"*"` clears the wildcard.
        topics: Vec<String>,
    },
    /// Liveness check.
    Ping,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn command_envelope_without_timestamp() {
        let raw = r#"{"id":"1","type":"command","payload":{"command":"subscribe","topics":["*"]}}"#;
        let Ok(msg) = serde_json::from_str::<WsMessage>(raw) else {
            panic!("envelope should parse");
        };
        assert_eq!(msg.msg_type, WsMessageType::Command);
        let Ok(cmd) = serde_json::from_value::<WsCommand>(msg.payload) else {
            panic!("command should parse");
        };
        assert_eq!(
            cmd,
            WsCommand::Subscribe {
                topics: vec!["*".to_string()]
            }
        );
    }

    #[test]
    fn ping_has_no_fields() {
        let Ok(cmd) = serde_json::from_str::<WsCommand>(r#"{"command":"ping"}"#) else {
            panic!("ping should parse");
        };
        assert_eq!(cmd, WsCommand::Ping);
    }

    #[test]
    fn error_reply_shape() {
        let Some(json) = WsMessage::error("7", 400, "malformed JSON").to_json() else {
            panic!("serializes");
        };
        assert!(json.contains(r#""type":"error""#));
        assert!(json.contains(r#""code":400"#));
    }
}
