//! Shared harness: a real server on an ephemeral port with a seeded
//! in-memory member directory.

#![allow(dead_code, clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use commons_market::api;
use commons_market::app_state::AppState;
use commons_market::domain::{
    CommunityId, EventBus, Member, MemberId, MemberRole, MemberStatus, TieredFeeSchedule, UserId,
};
use commons_market::membership::InMemoryDirectory;
use commons_market::service::MarketService;
use commons_market::store::MarketStore;
use hmac::{Hmac, Mac};
use reqwest::{Client, Method, RequestBuilder};
use serde_json::Value;
use sha2::Sha256;

pub const WEBHOOK_SECRET: &str = "whsec_test";

/// Builds the `x-market-signature` value for `body` signed at `timestamp`.
pub fn sign_webhook(secret: &str, timestamp: i64, body: &str) -> String {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        panic!("hmac accepts any key length");
    };
    mac.update(format!("{timestamp}.{body}").as_bytes());
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}

pub struct TestServer {
    pub addr: std::net::SocketAddr,
    pub client: Client,
    pub community: CommunityId,
    pub seller: Member,
    pub buyer: Member,
    pub neighbour: Member,
    pub admin: Member,
    pub suspended: Member,
}

fn member(community_id: CommunityId, name: &str, role: MemberRole, status: MemberStatus) -> Member {
    Member {
        member_id: MemberId::new(),
        user_id: UserId::new(),
        community_id,
        display_name: name.to_string(),
        role,
        status,
    }
}

impl TestServer {
    pub async fn spawn() -> Self {
        let community = CommunityId::new();
        let seller = member(community, "Sam", MemberRole::Member, MemberStatus::Active);
        let buyer = member(community, "Bea", MemberRole::Member, MemberStatus::Active);
        let neighbour = member(community, "Nia", MemberRole::Member, MemberStatus::Active);
        let admin = member(community, "Ada", MemberRole::Admin, MemberStatus::Active);
        let suspended = member(community, "Sid", MemberRole::Member, MemberStatus::Suspended);

        let directory = InMemoryDirectory::with_members([
            seller.clone(),
            buyer.clone(),
            neighbour.clone(),
            admin.clone(),
            suspended.clone(),
        ]);
        let service = Arc::new(MarketService::new(
            Arc::new(MarketStore::new()),
            Arc::new(directory),
            Arc::new(TieredFeeSchedule::default()),
            EventBus::new(1_024),
        ));
        let state = AppState::new(service).with_webhook_secret(WEBHOOK_SECRET);
        let app = api::build_app(state, Duration::from_secs(10));

        let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
            panic!("bind ephemeral port");
        };
        let Ok(addr) = listener.local_addr() else {
            panic!("local addr");
        };
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            client: Client::new(),
            community,
            seller,
            buyer,
            neighbour,
            admin,
            suspended,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Request under `/api/v1` with `who`'s identity headers.
    pub fn request(&self, who: &Member, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(&format!("/api/v1{path}")))
            .header("x-community-id", who.community_id.to_string())
            .header("x-user-id", who.user_id.to_string())
    }

    pub fn get(&self, who: &Member, path: &str) -> RequestBuilder {
        self.request(who, Method::GET, path)
    }

    pub fn post(&self, who: &Member, path: &str) -> RequestBuilder {
        self.request(who, Method::POST, path)
    }

    /// Payment webhook call carrying `payload`, signed now with `secret`
    /// when one is given.
    pub fn webhook(&self, secret: Option<&str>, payload: &str) -> RequestBuilder {
        let req = self
            .client
            .post(self.url("/api/v1/webhooks/payments"))
            .header("content-type", "application/json")
            .body(payload.to_string());
        match secret {
            Some(secret) => req.header(
                "x-market-signature",
                sign_webhook(secret, chrono::Utc::now().timestamp(), payload),
            ),
            None => req,
        }
    }
}

/// Sends the request and returns status plus JSON body.
pub async fn send(req: RequestBuilder) -> (u16, Value) {
    let Ok(resp) = req.send().await else {
        panic!("request failed to send");
    };
    let status = resp.status().as_u16();
    let body = resp.json::<Value>().await.unwrap_or(Value::Null);
    (status, body)
}

/// String field at a JSON pointer, e.g. `/escrow_status`.
pub fn text<'a>(body: &'a Value, pointer: &str) -> &'a str {
    body.pointer(pointer).and_then(Value::as_str).unwrap_or_default()
}

/// Money field (serialized as a string) at a JSON pointer.
pub fn money(body: &Value, pointer: &str) -> rust_decimal::Decimal {
    let Ok(amount) = text(body, pointer).parse() else {
        panic!("{pointer} is not a decimal in {body}");
    };
    amount
}

pub fn listing_body(price: &str, shipping_cost: &str) -> Value {
    serde_json::json!({
        "title": "Espresso machine",
        "description": "Barely used, descaled last week",
        "category": "kitchen",
        "condition": "like_new",
        "price": price,
        "quantity": 1,
        "images": ["https://img.example/espresso.jpg"],
        "shipping_available": true,
        "shipping_cost": shipping_cost,
        "pickup_available": true,
        "pickup_location": "Lobby",
        "publish": true
    })
}

/// Creates a published listing as `seller` and returns its id.
pub async fn create_listing(server: &TestServer, price: &str, shipping_cost: &str) -> String {
    let (status, body) = send(
        server
            .post(&server.seller, "/listings")
            .json(&listing_body(price, shipping_cost)),
    )
    .await;
    assert_eq!(status, 201, "create listing: {body}");
    text(&body, "/id").to_string()
}

/// Buys `listing_id` as the buyer and captures payment via the webhook.
pub async fn paid_purchase(server: &TestServer, listing_id: &str) -> String {
    let (status, body) = send(
        server
            .post(&server.buyer, &format!("/listings/{listing_id}/purchase"))
            .json(&serde_json::json!({})),
    )
    .await;
    assert_eq!(status, 201, "purchase: {body}");
    let tx_id = text(&body, "/id").to_string();
    let payload =
        serde_json::json!({ "transaction_id": tx_id, "payment_reference": "pi_1" }).to_string();
    let (status, body) = send(server.webhook(Some(WEBHOOK_SECRET), &payload)).await;
    assert_eq!(status, 200, "webhook: {body}");
    tx_id
}
