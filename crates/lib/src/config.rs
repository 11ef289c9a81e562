//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.linkless/config.json`) and environment.
//! Every field has a default, so a missing file runs a loopback gateway with the bridge only.

use crate::codec::SharedSecret;
use crate::dispatch::DecodeMode;
use crate::pipeline::DEFAULT_MAX_CONCURRENT_FETCHES;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Gateway server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Request handling (concurrency, decode policy).
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// SMS relay settings. Without a relay URL the SMS path is disabled.
    #[serde(default)]
    pub transport: TransportConfig,

    /// Payload codec settings.
    #[serde(default)]
    pub crypto: CryptoConfig,
}

/// Gateway bind, port, and auth settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for HTTP and WebSocket (default 15152).
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_gateway_bind")]
    pub bind: String,

    #[serde(default)]
    pub auth: GatewayAuthConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayAuthConfig {
    /// Shared secret for WebSocket connect. Overridden by LINKLESS_GATEWAY_TOKEN env.
    pub token: Option<String>,
}

fn default_gateway_port() -> u16 {
    15152
}

fn default_gateway_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
            auth: GatewayAuthConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchConfig {
    /// Upper bound on page fetches running at once; further requests wait (default 8).
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    /// "lenient" (default) uses an undecodable payload as the URL; "strict" rejects it.
    #[serde(default)]
    pub decode_mode: DecodeMode,
}

fn default_max_concurrent_fetches() -> usize {
    DEFAULT_MAX_CONCURRENT_FETCHES
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: default_max_concurrent_fetches(),
            decode_mode: DecodeMode::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportConfig {
    /// Relay endpoint that sends SMS on the gateway's behalf.
    pub relay_url: Option<String>,
    /// Bearer token for the relay. Overridden by LINKLESS_RELAY_TOKEN env.
    pub relay_token: Option<String>,
    /// When set, `/sms/inbound` requires a matching X-Linkless-Secret header.
    pub inbound_secret: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoConfig {
    /// Secret shared with the peer. Overridden by LINKLESS_SHARED_SECRET env.
    pub shared_secret: Option<String>,
}

/// Non-empty trimmed env var, else the trimmed non-empty config value.
fn env_or(var: &str, configured: Option<&String>) -> Option<String> {
    std::env::var(var)
        .ok()
        .and_then(|s| {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .or_else(|| {
            configured
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// Resolve the gateway token: env LINKLESS_GATEWAY_TOKEN overrides config.
pub fn resolve_gateway_token(config: &Config) -> Option<String> {
    env_or("LINKLESS_GATEWAY_TOKEN", config.gateway.auth.token.as_ref())
}

/// Resolve the relay token: env LINKLESS_RELAY_TOKEN overrides config.
pub fn resolve_relay_token(config: &Config) -> Option<String> {
    env_or("LINKLESS_RELAY_TOKEN", config.transport.relay_token.as_ref())
}

/// Resolve the shared secret: env LINKLESS_SHARED_SECRET overrides config. Empty when unset.
pub fn resolve_shared_secret(config: &Config) -> SharedSecret {
    env_or("LINKLESS_SHARED_SECRET", config.crypto.shared_secret.as_ref())
        .map(SharedSecret::new)
        .unwrap_or_default()
}

/// True if the bind address is loopback (127.0.0.1, ::1, etc.).
pub fn is_loopback_bind(bind: &str) -> bool {
    let b = bind.trim();
    b == "127.0.0.1" || b == "::1" || b == "localhost"
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("LINKLESS_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".linkless").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the given path, or the default path. Missing file => default config.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
