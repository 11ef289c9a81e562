//! Content fetcher: normalize a URL, fetch the page, reduce it to bounded body text.
//!
//! Shared by the SMS request pipeline and the local fetch bridge so both entry points apply the
//! same normalization, truncation length and failure taxonomy.

mod extract;
mod source;

pub use extract::body_text;
pub use source::{HttpPageSource, PageSource, FETCH_TIMEOUT, MAX_BODY_BYTES, USER_AGENT};

use crate::bounded;
use serde::Serialize;
use std::sync::Arc;

/// Maximum page text length, in UTF-16 units, before the truncation marker.
pub const MAX_BODY_UNITS: usize = 1200;

/// Failure taxonomy shared by SMS replies and bridge error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    HttpStatus,
    Network,
    Other,
}

/// A classified failure as reported by a [`PageSource`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct FetchFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Human-readable detail carried into replies.
    pub fn detail(&self) -> String {
        match self.kind {
            FailureKind::HttpStatus => format!("HTTP {}", self.message),
            FailureKind::Network => format!("Failed to fetch page: {}", self.message),
            FailureKind::Other => format!("Error fetching web page: {}", self.message),
        }
    }
}

/// Outcome of one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    /// Body text, at most [`MAX_BODY_UNITS`] units plus the truncation marker.
    Success { text: String },
    Failure { kind: FailureKind, detail: String },
}

impl From<FetchFailure> for FetchResult {
    fn from(f: FetchFailure) -> Self {
        FetchResult::Failure {
            kind: f.kind,
            detail: f.detail(),
        }
    }
}

/// Prepend `https://` unless the URL already names http or https.
pub fn normalize_url(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

/// Fetcher over a page source. Stateless across requests; clone freely.
#[derive(Clone)]
pub struct ContentFetcher {
    source: Arc<dyn PageSource>,
}

impl ContentFetcher {
    pub fn new(source: Arc<dyn PageSource>) -> Self {
        Self { source }
    }

    /// Fetcher backed by the real HTTP client.
    pub fn http() -> reqwest::Result<Self> {
        Ok(Self::new(Arc::new(HttpPageSource::new()?)))
    }

    /// Fetch `url` and return bounded body text or a classified failure. Never retries.
    pub async fn fetch(&self, url: &str) -> FetchResult {
        let url = normalize_url(url);
        log::debug!("fetching {}", url);
        match self.source.get_html(&url).await {
            Ok(html) => {
                let text = bounded::bound_with_marker(body_text(&html), MAX_BODY_UNITS);
                log::debug!("fetched {} units from {}", bounded::utf16_len(&text), url);
                FetchResult::Success { text }
            }
            Err(failure) => {
                log::debug!("fetch of {} failed: {}", url, failure);
                failure.into()
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Page source returning a canned response and recording requested URLs.
    pub struct StubSource {
        response: Result<String, FetchFailure>,
        delay: Option<Duration>,
        pub requested: Mutex<Vec<String>>,
    }

    impl StubSource {
        pub fn page(html: impl Into<String>) -> Arc<Self> {
            Arc::new(Self {
                response: Ok(html.into()),
                delay: None,
                requested: Mutex::new(Vec::new()),
            })
        }

        /// Like `page`, answering only after `delay`.
        pub fn slow_page(html: impl Into<String>, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                response: Ok(html.into()),
                delay: Some(delay),
                requested: Mutex::new(Vec::new()),
            })
        }

        pub fn failing(kind: FailureKind, message: &str) -> Arc<Self> {
            Arc::new(Self {
                response: Err(FetchFailure::new(kind, message)),
                delay: None,
                requested: Mutex::new(Vec::new()),
            })
        }

        pub fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageSource for StubSource {
        async fn get_html(&self, url: &str) -> Result<String, FetchFailure> {
            self.requested.lock().unwrap().push(url.to_string());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.response.clone()
        }
    }
}
