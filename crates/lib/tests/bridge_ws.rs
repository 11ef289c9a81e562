//! Fetch bridge over the gateway WebSocket: connect handshake, ping, fetchWeb.

mod common;

use common::serve;
use futures_util::{SinkExt, StreamExt};
use linkless::config::Config;
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::Message;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

type Ws = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn open(addr: &str) -> Ws {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", addr))
        .await
        .expect("ws connect");
    ws
}

/// Send one request and wait for the response with the same id.
async fn call(ws: &mut Ws, id: &str, method: &str, params: Value) -> Value {
    let req = json!({ "type": "req", "id": id, "method": method, "params": params });
    ws.send(Message::Text(req.to_string())).await.expect("send");
    while let Some(msg) = ws.next().await {
        let Message::Text(text) = msg.expect("frame") else {
            continue;
        };
        let res: Value = serde_json::from_str(&text).expect("json frame");
        if res["id"] == json!(id) {
            return res;
        }
    }
    panic!("socket closed before response {}", id);
}

#[tokio::test]
async fn ping_after_connect_returns_pong() {
    let addr = serve(Config::default()).await;
    let mut ws = open(&addr).await;

    let hello = call(&mut ws, "1", "connect", json!({ "client": { "id": "test" } })).await;
    assert_eq!(hello["ok"], json!(true));
    assert_eq!(hello["payload"]["type"], json!("hello-ok"));

    let res = call(&mut ws, "2", "ping", Value::Null).await;
    assert_eq!(res["ok"], json!(true));
    assert_eq!(res["payload"], json!("pong"));
}

#[tokio::test]
async fn requests_before_connect_are_refused() {
    let addr = serve(Config::default()).await;
    let mut ws = open(&addr).await;

    let res = call(&mut ws, "1", "ping", Value::Null).await;
    assert_eq!(res["ok"], json!(false));
    assert_eq!(res["error"], json!("first request must be connect"));
}

#[tokio::test]
async fn fetch_web_returns_bounded_body_text() {
    let pages = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(header(
            "user-agent",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
        ))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<head><script>x()</script></head><body>Hello <b>bridge</b></body>"),
        )
        .mount(&pages)
        .await;

    let addr = serve(Config::default()).await;
    let mut ws = open(&addr).await;
    call(&mut ws, "1", "connect", json!({})).await;

    let res = call(&mut ws, "2", "fetchWeb", json!({ "url": pages.uri() })).await;
    assert_eq!(res["ok"], json!(true), "{}", res);
    assert_eq!(res["payload"], json!("Hello bridge"));
}

#[tokio::test]
async fn fetch_web_errors_carry_codes() {
    let pages = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&pages)
        .await;

    let addr = serve(Config::default()).await;
    let mut ws = open(&addr).await;
    call(&mut ws, "1", "connect", json!({})).await;

    let res = call(&mut ws, "2", "fetchWeb", json!({})).await;
    assert_eq!(res["code"], json!("INVALID_ARGUMENT"));
    assert_eq!(res["error"], json!("URL is required"));

    let res = call(&mut ws, "3", "fetchWeb", json!({ "url": pages.uri() })).await;
    assert_eq!(res["code"], json!("HTTP_ERROR"));
    assert_eq!(res["error"], json!("HTTP 503: Service Unavailable"));

    let res = call(&mut ws, "4", "fetchWeb", json!({ "url": "http://127.0.0.1:9/" })).await;
    assert_eq!(res["code"], json!("NETWORK_ERROR"));

    let res = call(&mut ws, "5", "shutdown", json!({})).await;
    assert_eq!(res["code"], json!("NOT_IMPLEMENTED"));
}

#[tokio::test]
async fn connect_requires_configured_token() {
    let mut config = Config::default();
    config.gateway.auth.token = Some("gw-token".to_string());
    let addr = serve(config).await;
    let mut ws = open(&addr).await;

    let res = call(&mut ws, "1", "connect", json!({ "auth": { "token": "wrong" } })).await;
    assert_eq!(res["ok"], json!(false));

    let res = call(&mut ws, "2", "connect", json!({ "auth": { "token": "gw-token" } })).await;
    assert_eq!(res["ok"], json!(true));
}
