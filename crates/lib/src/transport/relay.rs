//! HTTP relay transport: sends through a relay service fronting the SMS modem or provider.
//!
//! Outbound: `POST <relay_url>` with `{ "to", "text" }` or `{ "to", "parts" }`.
//! Inbound messages arrive at the gateway's `/sms/inbound` webhook.

use crate::transport::sms::SmsTransport;
use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct SingleBody<'a> {
    to: &'a str,
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct MultipartBody<'a> {
    to: &'a str,
    parts: &'a [String],
}

/// Relay transport: one POST per outbound message.
pub struct RelayTransport {
    id: String,
    relay_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl RelayTransport {
    pub fn new(relay_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            id: "relay".to_string(),
            relay_url: relay_url.into(),
            token,
            client: reqwest::Client::new(),
        }
    }

    async fn post<T: Serialize + ?Sized>(&self, body: &T) -> Result<(), String> {
        let mut req = self.client.post(&self.relay_url).json(body);
        if let Some(ref token) = self.token {
            req = req.bearer_auth(token);
        }
        let res = req.send().await.map_err(|e| e.to_string())?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(format!("relay send failed: {} {}", status, body));
        }
        Ok(())
    }
}

#[async_trait]
impl SmsTransport for RelayTransport {
    fn id(&self) -> &str {
        &self.id
    }

    async fn send_text(&self, destination: &str, text: &str) -> Result<(), String> {
        self.post(&SingleBody {
            to: destination,
            text,
        })
        .await
    }

    async fn send_multipart(&self, destination: &str, parts: &[String]) -> Result<(), String> {
        self.post(&MultipartBody {
            to: destination,
            parts,
        })
        .await
    }
}
