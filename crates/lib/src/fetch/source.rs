//! HTML source: GET a URL and return the page markup, or a classified failure.

use crate::fetch::{FailureKind, FetchFailure};
use async_trait::async_trait;
use futures_util::StreamExt;
use std::time::Duration;

/// Client identity sent with every page request.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Bytes of page body read before the rest is discarded.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Retrieves raw page markup. Implementations classify their own failures.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn get_html(&self, url: &str) -> Result<String, FetchFailure>;
}

/// reqwest-backed source: fixed user agent, 15 s timeout, default redirect policy.
#[derive(Clone)]
pub struct HttpPageSource {
    client: reqwest::Client,
}

impl HttpPageSource {
    pub fn new() -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(FETCH_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn get_html(&self, url: &str) -> Result<String, FetchFailure> {
        let url = reqwest::Url::parse(url).map_err(|e| {
            FetchFailure::new(FailureKind::Other, format!("invalid URL {}: {}", url, e))
        })?;
        let res = self.client.get(url).send().await.map_err(classify)?;
        let status = res.status();
        if !status.is_success() {
            return Err(FetchFailure::new(
                FailureKind::HttpStatus,
                format!(
                    "{}: {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("HTTP error fetching URL")
                ),
            ));
        }
        if let Some(content_type) = res
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            if !is_markup(content_type) {
                return Err(FetchFailure::new(
                    FailureKind::Network,
                    format!("unhandled content type: {}", content_type),
                ));
            }
        }

        let mut body = Vec::new();
        let mut stream = res.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(classify)?;
            let room = MAX_BODY_BYTES - body.len();
            if chunk.len() >= room {
                body.extend_from_slice(&chunk[..room]);
                log::debug!("page body cut at {} bytes", MAX_BODY_BYTES);
                break;
            }
            body.extend_from_slice(&chunk);
        }
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

/// Text and XML media types: `text/*`, `application/xhtml+xml`, `application/xml`, `*+xml`.
fn is_markup(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    mime.starts_with("text/")
        || mime == "application/xml"
        || mime == "application/xhtml+xml"
        || (mime.starts_with("application/") && mime.ends_with("+xml"))
}

/// Connectivity, timeout, DNS, body I/O and redirect failures are network failures; anything
/// else (builder or decode errors) is unclassified.
fn classify(e: reqwest::Error) -> FetchFailure {
    if e.is_timeout() || e.is_connect() || e.is_request() || e.is_body() || e.is_redirect() {
        FetchFailure::new(FailureKind::Network, e.to_string())
    } else if let Some(status) = e.status() {
        FetchFailure::new(FailureKind::HttpStatus, format!("{}: {}", status.as_u16(), e))
    } else {
        FetchFailure::new(FailureKind::Other, e.to_string())
    }
}
