//! Shared helpers for gateway integration tests.

#![allow(dead_code)]

use linkless::codec::{self, PlaceholderCipher, SharedSecret};
use linkless::config::Config;
use linkless::gateway;
use std::time::Duration;
use wiremock::MockServer;

/// Serve the gateway router on an ephemeral loopback port; returns `host:port`.
pub async fn serve(config: Config) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local_addr");
    let app = gateway::router(gateway::build_state(config).expect("gateway state"));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr.to_string()
}

/// `LK:` request body for `url` under the placeholder codec.
pub fn request_body(url: &str) -> String {
    format!(
        "LK:{}",
        codec::encode_text(&PlaceholderCipher, &SharedSecret::default(), url).expect("encode")
    )
}

/// Wait until `server` has seen at least `count` requests, or give up after 5s.
pub async fn wait_for_requests(server: &MockServer, count: usize) -> Vec<wiremock::Request> {
    for _ in 0..100 {
        let received = server.received_requests().await.unwrap_or_default();
        if received.len() >= count {
            return received;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("expected {} request(s) within 5s", count);
}

/// Destination and wire text from a relay POST body (`text` or concatenated `parts`).
pub fn sent_reply(req: &wiremock::Request) -> (String, String) {
    let body: serde_json::Value = req.body_json().expect("relay body is JSON");
    let to = body["to"].as_str().expect("to").to_string();
    let text = match body.get("text").and_then(|v| v.as_str()) {
        Some(text) => text.to_string(),
        None => body["parts"]
            .as_array()
            .expect("text or parts")
            .iter()
            .filter_map(|p| p.as_str())
            .collect::<String>(),
    };
    (to, text)
}

/// Like [`sent_reply`], with the wire text decoded (page replies are encoded).
pub fn decoded_reply(req: &wiremock::Request) -> (String, String) {
    let (to, encoded) = sent_reply(req);
    let text = codec::decode_text(&PlaceholderCipher, &SharedSecret::default(), &encoded)
        .expect("reply decodes");
    (to, text)
}
