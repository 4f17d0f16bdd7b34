//! WebSocket feed: identity, subscriptions and per-member visibility.

#![allow(clippy::panic)]

mod common;

use std::time::Duration;

use common::{TestServer, create_listing, paid_purchase, send, text};
use commons_market::domain::Member;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect(server: &TestServer, who: &Member) -> Socket {
    let Ok(mut request) = format!("ws://{}/ws", server.addr).into_client_request() else {
        panic!("valid ws url");
    };
    let (Ok(community), Ok(user)) = (
        HeaderValue::from_str(&who.community_id.to_string()),
        HeaderValue::from_str(&who.user_id.to_string()),
    ) else {
        panic!("uuid header values");
    };
    request.headers_mut().insert("x-community-id", community);
    request.headers_mut().insert("x-user-id", user);
    let Ok((socket, _)) = tokio_tungstenite::connect_async(request).await else {
        panic!("ws upgrade should succeed for members");
    };
    socket
}

async fn command(socket: &mut Socket, id: &str, payload: Value) -> Value {
    let envelope = json!({ "id": id, "type": "command", "payload": payload });
    let Ok(()) = socket.send(Message::text(envelope.to_string())).await else {
        panic!("ws send");
    };
    next_of_type(socket, "response").await
}

/// Reads frames until one of `kind` arrives.
async fn next_of_type(socket: &mut Socket, kind: &str) -> Value {
    loop {
        let Ok(Some(Ok(frame))) = tokio::time::timeout(Duration::from_secs(5), socket.next()).await
        else {
            panic!("expected a {kind} frame");
        };
        let Ok(raw) = frame.into_text() else {
            continue;
        };
        let Ok(value) = serde_json::from_str::<Value>(&raw) else {
            continue;
        };
        if text(&value, "/type") == kind {
            return value;
        }
    }
}

async fn next_event(socket: &mut Socket) -> Value {
    next_of_type(socket, "event").await
}

#[tokio::test]
async fn upgrade_requires_identity() {
    let server = TestServer::spawn().await;
    let result = tokio_tungstenite::connect_async(format!("ws://{}/ws", server.addr)).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn ping_gets_pong() {
    let server = TestServer::spawn().await;
    let mut socket = connect(&server, &server.buyer).await;
    let reply = command(&mut socket, "p1", json!({ "command": "ping" })).await;
    assert_eq!(reply.pointer("/id"), Some(&json!("p1")));
    assert_eq!(reply.pointer("/payload/pong"), Some(&json!(true)));
}

#[tokio::test]
async fn private_events_reach_only_participants() {
    let server = TestServer::spawn().await;
    let mut seller = connect(&server, &server.seller).await;
    let mut neighbour = connect(&server, &server.neighbour).await;
    for socket in [&mut seller, &mut neighbour] {
        let reply = command(socket, "s", json!({ "command": "subscribe", "topics": ["*"] })).await;
        assert_eq!(reply.pointer("/payload/wildcard"), Some(&json!(true)));
    }

    let listing_id = create_listing(&server, "100.00", "10.00").await;
    for socket in [&mut seller, &mut neighbour] {
        let event = next_event(socket).await;
        assert_eq!(text(&event, "/payload/event_type"), "listing_created");
        assert_eq!(text(&event, "/payload/listing_id"), listing_id);
    }

    // Buyer pays; only the seller hears about the transaction.
    let tx_id = paid_purchase(&server, &listing_id).await;
    let event = next_event(&mut seller).await;
    assert_eq!(text(&event, "/payload/event_type"), "transaction_updated");
    assert_eq!(text(&event, "/payload/change"), "initiated");
    let event = next_event(&mut seller).await;
    assert_eq!(text(&event, "/payload/transaction_id"), tx_id);
    assert_eq!(text(&event, "/payload/escrow_status"), "held");

    // The neighbour's next event is the next public one.
    let second = create_listing(&server, "5", "0").await;
    let event = next_event(&mut neighbour).await;
    assert_eq!(text(&event, "/payload/event_type"), "listing_created");
    assert_eq!(text(&event, "/payload/listing_id"), second);
}

#[tokio::test]
async fn topic_subscription_filters_events() {
    let server = TestServer::spawn().await;
    let watched = create_listing(&server, "30", "0").await;
    let mut buyer = connect(&server, &server.buyer).await;
    let reply = command(
        &mut buyer,
        "t",
        json!({ "command": "subscribe", "topics": [watched, "not-a-uuid"] }),
    )
    .await;
    assert_eq!(reply.pointer("/payload/count"), Some(&json!(1)));
    assert_eq!(reply.pointer("/payload/rejected/0"), Some(&json!("not-a-uuid")));

    let _other = create_listing(&server, "31", "0").await;
    let (status, _) = send(server.post(&server.buyer, &format!("/listings/{watched}/favorite"))).await;
    assert_eq!(status, 200);

    let event = next_event(&mut buyer).await;
    assert_eq!(text(&event, "/payload/event_type"), "favorite_toggled");
    assert_eq!(text(&event, "/payload/listing_id"), watched);
}
