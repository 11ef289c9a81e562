//! Fetch-on-demand bridge for a co-located caller.
//!
//! Methods: `fetchWeb { url }` returns bounded page text or a coded error; `ping` returns
//! `pong` without I/O. Fetches run on their own task so the caller's context never blocks, and
//! use the same fetcher as the SMS pipeline.

use crate::fetch::{ContentFetcher, FailureKind, FetchResult};
use serde::Serialize;
use tokio::task::JoinHandle;

pub const METHOD_FETCH_WEB: &str = "fetchWeb";
pub const METHOD_PING: &str = "ping";

/// Error codes returned to bridge callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BridgeCode {
    InvalidArgument,
    HttpError,
    NetworkError,
    FetchError,
    NotImplemented,
}

impl BridgeCode {
    pub fn as_str(self) -> &'static str {
        match self {
            BridgeCode::InvalidArgument => "INVALID_ARGUMENT",
            BridgeCode::HttpError => "HTTP_ERROR",
            BridgeCode::NetworkError => "NETWORK_ERROR",
            BridgeCode::FetchError => "FETCH_ERROR",
            BridgeCode::NotImplemented => "NOT_IMPLEMENTED",
        }
    }
}

impl From<FailureKind> for BridgeCode {
    fn from(kind: FailureKind) -> Self {
        match kind {
            FailureKind::HttpStatus => BridgeCode::HttpError,
            FailureKind::Network => BridgeCode::NetworkError,
            FailureKind::Other => BridgeCode::FetchError,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}: {message}", .code.as_str())]
pub struct BridgeError {
    pub code: BridgeCode,
    pub message: String,
}

impl BridgeError {
    pub fn new(code: BridgeCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Local entry point over the shared fetcher.
#[derive(Clone)]
pub struct FetchBridge {
    fetcher: ContentFetcher,
}

impl FetchBridge {
    pub fn new(fetcher: ContentFetcher) -> Self {
        Self { fetcher }
    }

    /// Liveness probe.
    pub fn ping(&self) -> &'static str {
        "pong"
    }

    /// Fetch `url` into bounded text. A missing URL is an `INVALID_ARGUMENT` error.
    pub async fn fetch_web(&self, url: Option<&str>) -> Result<String, BridgeError> {
        let url = url
            .ok_or_else(|| BridgeError::new(BridgeCode::InvalidArgument, "URL is required"))?;
        match self.fetcher.fetch(url).await {
            FetchResult::Success { text } => Ok(text),
            FetchResult::Failure { kind, detail } => Err(BridgeError::new(kind.into(), detail)),
        }
    }

    /// Run `fetch_web` on its own task; the caller awaits the handle when it wants the result.
    pub fn spawn_fetch_web(&self, url: Option<String>) -> JoinHandle<Result<String, BridgeError>> {
        let bridge = self.clone();
        tokio::spawn(async move { bridge.fetch_web(url.as_deref()).await })
    }

    /// Dispatch a method call by name. `params` is the argument object (`{ "url": ... }`).
    pub async fn call(
        &self,
        method: &str,
        params: &serde_json::Value,
    ) -> Result<serde_json::Value, BridgeError> {
        match method {
            METHOD_PING => Ok(serde_json::Value::String(self.ping().to_string())),
            METHOD_FETCH_WEB => {
                let url = params.get("url").and_then(|v| v.as_str()).map(str::to_string);
                let text = self.spawn_fetch_web(url).await.map_err(|e| {
                    BridgeError::new(BridgeCode::FetchError, format!("fetch task failed: {}", e))
                })??;
                Ok(serde_json::Value::String(text))
            }
            other => Err(BridgeError::new(
                BridgeCode::NotImplemented,
                format!("unknown method: {}", other),
            )),
        }
    }
}
