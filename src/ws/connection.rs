//! WebSocket connection state machine.
//!
//! Handles the read/write loop for a single WebSocket connection,
//! dispatching incoming commands and forwarding filtered events.

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use super::messages::{WsCommand, WsMessage, WsMessageType};
use super::subscription::{ParsedTopics, SubscriptionManager};
use crate::domain::{MarketEvent, Member};

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Reads commands from the client and dispatches them.
/// - Forwards events whose topic is subscribed and which `member` may see.
pub async fn run_connection(
    socket: WebSocket,
    mut event_rx: broadcast::Receiver<MarketEvent>,
    member: Member,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut subs = SubscriptionManager::new();
    tracing::debug!(member_id = %member.member_id, "ws connection opened");

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let response = handle_text_message(&text, &mut subs);
                        if let Some(resp_json) = response
                            && ws_tx.send(Message::text(resp_json)).await.is_err() {
                                break;
                            }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(error = %e, "ws read failed");
                        break;
                    }
                    _ => {}
                }
            }
            event = event_rx.recv() => {
                match event {
                    Ok(event) => {
                        if !subs.matches(event.topic()) || !event.is_visible_to(&member) {
                            continue;
                        }
                        let Some(json) = event_envelope(&event) else {
                            continue;
                        };
                        if ws_tx.send(Message::text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(lagged = n, member_id = %member.member_id, "ws client lagged behind event bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::debug!(member_id = %member.member_id, "ws connection closed");
}

fn event_envelope(event: &MarketEvent) -> Option<String> {
    let payload = serde_json::to_value(event).ok()?;
    WsMessage::new(uuid::Uuid::new_v4().to_string(), WsMessageType::Event, payload).to_json()
}

/// Handles a text message from the client, returning an optional JSON response.
fn handle_text_message(text: &str, subs: &mut SubscriptionManager) -> Option<String> {
    let Ok(msg) = serde_json::from_str::<WsMessage>(text) else {
        return WsMessage::error("", 400, "malformed JSON").to_json();
    };
    if msg.msg_type != WsMessageType::Command {
        return WsMessage::error(msg.id, 400, "expected a command").to_json();
    }
    let Ok(command) = serde_json::from_value::<WsCommand>(msg.payload) else {
        return WsMessage::error(msg.id, 404, "unknown command").to_json();
    };

    let payload = match command {
        WsCommand::Subscribe { topics } => {
            let parsed = ParsedTopics::parse(&topics);
            subs.subscribe(&parsed.topics, parsed.wildcard);
            serde_json::json!({
                "subscribed": parsed.topics,
                "rejected": parsed.rejected,
                "count": subs.count(),
                "wildcard": subs.is_subscribed_all(),
            })
        }
        WsCommand::Unsubscribe { topics } => {
            let parsed = ParsedTopics::parse(&topics);
            subs.unsubscribe(&parsed.topics, parsed.wildcard);
            serde_json::json!({
                "unsubscribed": parsed.topics,
                "remaining_count": subs.count(),
                "wildcard": subs.is_subscribed_all(),
            })
        }
        WsCommand::Ping => serde_json::json!({ "pong": true }),
    };
    WsMessage::new(msg.id, WsMessageType::Response, payload).to_json()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn reply(text: &str, subs: &mut SubscriptionManager) -> serde_json::Value {
        let Some(json) = handle_text_message(text, subs) else {
            panic!("every command gets a reply");
        };
        let Ok(value) = serde_json::from_str(&json) else {
            panic!("reply is JSON");
        };
        value
    }

    #[test]
    fn subscribe_then_unsubscribe() {
        let mut subs = SubscriptionManager::new();
        let topic = Uuid::new_v4();
        let v = reply(
            &format!(
                r#"{{"id":"a","type":"command","payload":{{"command":"subscribe","topics":["{topic}"]}}}}"#
            ),
            &mut subs,
        );
        assert_eq!(v.pointer("/type"), Some(&serde_json::json!("response")));
        assert_eq!(v.pointer("/id"), Some(&serde_json::json!("a")));
        assert_eq!(v.pointer("/payload/count"), Some(&serde_json::json!(1)));
        assert!(subs.matches(topic));

        let v = reply(
            &format!(
                r#"{{"id":"b","type":"command","payload":{{"command":"unsubscribe","topics":["{topic}"]}}}}"#
            ),
            &mut subs,
        );
        assert_eq!(v.pointer("/payload/remaining_count"), Some(&serde_json::json!(0)));
        assert!(!subs.matches(topic));
    }

    #[test]
    fn ping_pongs() {
        let mut subs = SubscriptionManager::new();
        let v = reply(r#"{"id":"p","type":"command","payload":{"command":"ping"}}"#, &mut subs);
        assert_eq!(v.pointer("/payload/pong"), Some(&serde_json::json!(true)));
    }

    #[test]
    fn garbage_is_an_error() {
        let mut subs = SubscriptionManager::new();
        let v = reply("{not json", &mut subs);
        assert_eq!(v.pointer("/type"), Some(&serde_json::json!("error")));
        assert_eq!(v.pointer("/payload/code"), Some(&serde_json::json!(400)));

        let v = reply(r#"{"id":"x","type":"command","payload":{"command":"teleport"}}"#, &mut subs);
        assert_eq!(v.pointer("/payload/code"), Some(&serde_json::json!(404)));
    }
}
