//! Gateway: HTTP + WebSocket surface of the device.
//!
//! Single port serves the health probe, the inbound SMS webhook that feeds the request
//! pipeline, and the fetch bridge over WebSocket (first frame must be `connect`, then
//! `fetchWeb` / `ping` requests).

mod protocol;
mod server;

pub use protocol::{ConnectParams, HelloOk, WsRequest, WsResponse};
pub use server::{build_state, router, run_gateway, serve_until, GatewayState};
