//! Gateway HTTP + WebSocket server (single port).

use crate::bridge::{FetchBridge, METHOD_FETCH_WEB, METHOD_PING};
use crate::codec::{PayloadCipher, PlaceholderCipher};
use crate::config::{self, Config};
use crate::fetch::{ContentFetcher, FETCH_TIMEOUT};
use crate::gateway::protocol::{ConnectParams, HelloOk, WsRequest, WsResponse};
use crate::pipeline::RequestPipeline;
use crate::transport::{InboundMessage, RelayTransport};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{HeaderMap, StatusCode},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const PROTOCOL_VERSION: u32 = 1;

/// Header carrying `transport.inboundSecret` on webhook deliveries.
const INBOUND_SECRET_HEADER: &str = "X-Linkless-Secret";

/// Time allowed after a send starts, on top of the fetch timeout, when draining at shutdown.
const SEND_MARGIN: Duration = Duration::from_secs(10);

const METHOD_CONNECT: &str = "connect";
const METHOD_HEALTH: &str = "health";

/// Shared state for the gateway (config, bridge, SMS pipeline).
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<Config>,
    /// When Some, WebSocket connect must provide params.auth.token matching this.
    pub required_token: Option<String>,
    pub bridge: FetchBridge,
    /// None when no relay is configured; the webhook then answers 503.
    pub pipeline: Option<Arc<RequestPipeline>>,
}

/// Build gateway state from config: one HTTP fetcher shared by the bridge and the pipeline.
pub fn build_state(config: Config) -> Result<GatewayState> {
    let fetcher = ContentFetcher::http().context("building page fetch client")?;
    let cipher: Arc<dyn PayloadCipher> = Arc::new(PlaceholderCipher);

    let relay_url = config
        .transport
        .relay_url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty());
    let pipeline = match relay_url {
        Some(url) => {
            let transport = Arc::new(RelayTransport::new(url, config::resolve_relay_token(&config)));
            let secret = config::resolve_shared_secret(&config);
            if secret.is_empty() {
                log::warn!("crypto.sharedSecret not set; sms payloads are only base64 encoded");
            }
            log::info!(
                "sms relay transport at {} (max {} concurrent fetches, {:?} decode)",
                url,
                config.dispatch.max_concurrent_fetches,
                config.dispatch.decode_mode
            );
            Some(Arc::new(RequestPipeline::new(
                cipher,
                secret,
                config.dispatch.decode_mode,
                fetcher.clone(),
                transport,
                config.dispatch.max_concurrent_fetches,
            )))
        }
        None => {
            log::info!("transport.relayUrl not set; sms path disabled, bridge only");
            None
        }
    };

    Ok(GatewayState {
        required_token: config::resolve_gateway_token(&config),
        config: Arc::new(config),
        bridge: FetchBridge::new(fetcher),
        pipeline,
    })
}

/// Routes: `GET /` health, `GET /ws` bridge, `POST /sms/inbound` webhook.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route("/ws", get(ws_handler))
        .route("/sms/inbound", post(sms_inbound))
        .with_state(state)
}

/// Run the gateway server; binds to config.gateway.bind:config.gateway.port.
/// When bind is not loopback, a gateway token must be configured or startup fails.
/// Blocks until shutdown (e.g. Ctrl+C).
pub async fn run_gateway(config: Config) -> Result<()> {
    let bind = config.gateway.bind.trim().to_string();
    if !config::is_loopback_bind(&bind) && config::resolve_gateway_token(&config).is_none() {
        anyhow::bail!(
            "refusing to bind gateway to {} without auth (set gateway.auth.token or LINKLESS_GATEWAY_TOKEN)",
            bind
        );
    }

    let bind_addr = format!("{}:{}", bind, config.gateway.port);
    let state = build_state(config)?;
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    serve_until(listener, state, shutdown_signal()).await
}

/// Serve `state` on `listener` until `shutdown` completes, then wait for in-flight SMS requests
/// (bounded by the fetch timeout plus a send margin) so their replies still go out.
pub async fn serve_until(
    listener: tokio::net::TcpListener,
    state: GatewayState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let pipeline = state.pipeline.clone();
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("gateway server exited")?;

    if let Some(pipeline) = pipeline {
        pipeline.drain(FETCH_TIMEOUT + SEND_MARGIN).await;
    }
    log::info!("gateway stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received");
}

/// POST /sms/inbound: one received text message `{ "sender", "body" }`. Returns as soon as the
/// message is handed to the pipeline; the reply is sent from a background task.
async fn sms_inbound(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if let Some(expected) = state
        .config
        .transport
        .inbound_secret
        .as_deref()
        .filter(|s| !s.is_empty())
    {
        let provided = headers
            .get(INBOUND_SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !constant_time_eq(provided, expected) {
            return StatusCode::FORBIDDEN;
        }
    }
    let msg: InboundMessage = match serde_json::from_slice(&body) {
        Ok(m) => m,
        Err(_) => return StatusCode::BAD_REQUEST,
    };
    let Some(ref pipeline) = state.pipeline else {
        return StatusCode::SERVICE_UNAVAILABLE;
    };
    pipeline.deliver(msg);
    StatusCode::OK
}

/// Compare secrets without an early exit on the first differing byte.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "protocol": PROTOCOL_VERSION,
        "port": state.config.gateway.port,
    }))
}

/// GET /ws upgrades to WebSocket. First frame must be connect; we reply with hello-ok.
async fn ws_handler(State(state): State<GatewayState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Check connect params against the required token. Err carries the rejection message.
fn authorize_connect(state: &GatewayState, params: &ConnectParams) -> Result<(), &'static str> {
    let Some(ref required) = state.required_token else {
        return Ok(());
    };
    let provided = params.auth.token.as_deref().unwrap_or("").trim();
    if provided.is_empty() {
        return Err("unauthorized: gateway token missing (set LINKLESS_GATEWAY_TOKEN or gateway.auth.token)");
    }
    if provided != required {
        return Err("unauthorized: gateway token mismatch");
    }
    Ok(())
}

async fn handle_socket(mut socket: WebSocket, state: GatewayState) {
    let mut connected = false;
    // Bridge calls finish on their own tasks and report back here.
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<WsResponse>();

    loop {
        tokio::select! {
            Some(res) = reply_rx.recv() => {
                if socket.send(Message::Text(res.to_frame())).await.is_err() {
                    break;
                }
            }
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                let Message::Text(text) = msg else { continue };
                let Ok(req): Result<WsRequest, _> = serde_json::from_str(&text) else { continue };

                if req.typ != "req" {
                    continue;
                }

                let res = match req.method.as_str() {
                    METHOD_CONNECT => {
                        let params: ConnectParams = if req.params.is_null() {
                            ConnectParams::default()
                        } else {
                            match serde_json::from_value(req.params.clone()) {
                                Ok(p) => p,
                                Err(_) => {
                                    let res = WsResponse::err(&req.id, "invalid connect params");
                                    let _ = socket.send(Message::Text(res.to_frame())).await;
                                    continue;
                                }
                            }
                        };
                        match authorize_connect(&state, &params) {
                            Ok(()) => {
                                connected = true;
                                log::debug!(
                                    "ws client connected: {}",
                                    params.client.id.as_deref().unwrap_or("unknown")
                                );
                                let hello = HelloOk {
                                    typ: "hello-ok".to_string(),
                                    protocol: PROTOCOL_VERSION,
                                    methods: vec![
                                        METHOD_FETCH_WEB.to_string(),
                                        METHOD_PING.to_string(),
                                        METHOD_HEALTH.to_string(),
                                    ],
                                };
                                WsResponse::ok(
                                    &req.id,
                                    serde_json::to_value(&hello).unwrap_or(json!({})),
                                )
                            }
                            Err(e) => WsResponse::err(&req.id, e),
                        }
                    }
                    _ if !connected => WsResponse::err(&req.id, "first request must be connect"),
                    METHOD_HEALTH => WsResponse::ok(
                        &req.id,
                        json!({
                            "runtime": "running",
                            "protocol": PROTOCOL_VERSION,
                            "sms": state.pipeline.is_some(),
                        }),
                    ),
                    _ => {
                        let bridge = state.bridge.clone();
                        let tx = reply_tx.clone();
                        tokio::spawn(async move {
                            let res = match bridge.call(&req.method, &req.params).await {
                                Ok(payload) => WsResponse::ok(&req.id, payload),
                                Err(e) => WsResponse::bridge_err(&req.id, e),
                            };
                            let _ = tx.send(res);
                        });
                        continue;
                    }
                };
                if socket.send(Message::Text(res.to_frame())).await.is_err() {
                    break;
                }
            }
        }
    }

    if !connected {
        log::debug!("ws client disconnected before sending connect");
    }
}
