//! End-to-end SMS path: webhook delivery → fetch from a mock page host → reply via a mock relay.

mod common;

use common::{decoded_reply, request_body, sent_reply, serve, wait_for_requests};
use linkless::config::Config;
use linkless::gateway;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SENDER: &str = "+15550100";

async fn relay() -> MockServer {
    let relay = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&relay)
        .await;
    relay
}

fn config_for(relay: &MockServer) -> Config {
    let mut config = Config::default();
    config.transport.relay_url = Some(format!("{}/send", relay.uri()));
    config
}

async fn deliver(addr: &str, body: &str) -> reqwest::StatusCode {
    reqwest::Client::new()
        .post(format!("http://{}/sms/inbound", addr))
        .json(&json!({ "sender": SENDER, "body": body }))
        .send()
        .await
        .expect("webhook reachable")
        .status()
}

#[tokio::test]
async fn request_is_answered_with_page_text() {
    let pages = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><head><title>t</title></head><body><h1>Example Domain</h1>\
             <p>For use in illustrative examples.</p></body></html>",
        ))
        .mount(&pages)
        .await;
    let relay = relay().await;
    let addr = serve(config_for(&relay)).await;

    let status = deliver(&addr, &request_body(&format!("{}/article", pages.uri()))).await;
    assert_eq!(status, reqwest::StatusCode::OK);

    let sent = wait_for_requests(&relay, 1).await;
    let (to, text) = decoded_reply(&sent[0]);
    assert_eq!(to, SENDER);
    assert_eq!(text, "Example Domain For use in illustrative examples.");
}

#[tokio::test]
async fn long_page_reply_is_bounded_and_multipart() {
    let pages = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!("<body>{}</body>", "x".repeat(4000))),
        )
        .mount(&pages)
        .await;
    let relay = relay().await;
    let addr = serve(config_for(&relay)).await;

    deliver(&addr, &request_body(&pages.uri())).await;

    let sent = wait_for_requests(&relay, 1).await;
    let body: serde_json::Value = sent[0].body_json().unwrap();
    assert!(body.get("parts").is_some());
    let (_, text) = decoded_reply(&sent[0]);
    assert_eq!(text.len(), 1203);
    assert!(text.ends_with("..."));
}

#[tokio::test]
async fn http_error_is_answered_with_error_reply() {
    let pages = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&pages)
        .await;
    let relay = relay().await;
    let addr = serve(config_for(&relay)).await;

    deliver(&addr, &request_body(&format!("{}/missing", pages.uri()))).await;

    let sent = wait_for_requests(&relay, 1).await;
    let (to, text) = sent_reply(&sent[0]);
    assert_eq!(to, SENDER);
    assert_eq!(text, "Error: HTTP 404: Not Found");
}

#[tokio::test]
async fn unreachable_host_is_answered_with_network_error() {
    let relay = relay().await;
    let addr = serve(config_for(&relay)).await;

    // Nothing listens on the discard port.
    deliver(&addr, &request_body("http://127.0.0.1:9/")).await;

    let sent = wait_for_requests(&relay, 1).await;
    let (_, text) = sent_reply(&sent[0]);
    assert!(text.starts_with("Error: Failed to fetch page:"), "{}", text);
    assert!(text.len() <= "Error: ".len() + 100);
}

#[tokio::test]
async fn plain_message_gets_no_reply() {
    let relay = relay().await;
    let addr = serve(config_for(&relay)).await;

    let status = deliver(&addr, "hello world").await;
    assert_eq!(status, reqwest::StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(relay.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn inbound_secret_is_enforced() {
    let relay = relay().await;
    let mut config = config_for(&relay);
    config.transport.inbound_secret = Some("s3cret".to_string());
    let addr = serve(config).await;

    let status = deliver(&addr, "hello world").await;
    assert_eq!(status, reqwest::StatusCode::FORBIDDEN);

    let status = reqwest::Client::new()
        .post(format!("http://{}/sms/inbound", addr))
        .header("X-Linkless-Secret", "s3cret")
        .json(&json!({ "sender": SENDER, "body": "hello world" }))
        .send()
        .await
        .unwrap()
        .status();
    assert_eq!(status, reqwest::StatusCode::OK);
}

#[tokio::test]
async fn malformed_webhook_body_is_rejected() {
    let relay = relay().await;
    let addr = serve(config_for(&relay)).await;

    let status = reqwest::Client::new()
        .post(format!("http://{}/sms/inbound", addr))
        .body("not json")
        .send()
        .await
        .unwrap()
        .status();
    assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn webhook_is_unavailable_without_relay() {
    let addr = serve(Config::default()).await;
    let status = deliver(&addr, &request_body("http://example.com")).await;
    assert_eq!(status, reqwest::StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn shutdown_waits_for_in_flight_reply() {
    let pages = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<body>slow page</body>")
                .set_delay(Duration::from_millis(800)),
        )
        .mount(&pages)
        .await;
    let relay = relay().await;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let state = gateway::build_state(config_for(&relay)).unwrap();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(gateway::serve_until(listener, state, async {
        let _ = stop_rx.await;
    }));

    let status = deliver(&addr, &request_body(&pages.uri())).await;
    assert_eq!(status, reqwest::StatusCode::OK);
    wait_for_requests(&pages, 1).await;
    stop_tx.send(()).unwrap();

    server.await.unwrap().unwrap();
    let sent = relay.received_requests().await.unwrap();
    assert_eq!(sent.len(), 1);
    let (to, text) = decoded_reply(&sent[0]);
    assert_eq!(to, SENDER);
    assert_eq!(text, "slow page");
}
