//! Send capability of a text-message transport.

use crate::transport::segment;
use async_trait::async_trait;

/// Handle to a text-message transport. Shared across concurrent requests without coordination,
/// so implementations must be safe for concurrent sends.
#[async_trait]
pub trait SmsTransport: Send + Sync {
    /// Transport id (e.g. "relay").
    fn id(&self) -> &str;

    /// Split `text` into ordered transport-sized parts. The transport is the single source of
    /// truth for its own size limit. Default is GSM 03.38 segmentation.
    fn divide_message(&self, text: &str) -> Vec<String> {
        segment::divide_message(text)
    }

    /// Send one single-part message.
    async fn send_text(&self, destination: &str, text: &str) -> Result<(), String>;

    /// Send an ordered multi-part message; the receiver's handset reassembles it.
    async fn send_multipart(&self, destination: &str, parts: &[String]) -> Result<(), String>;
}
