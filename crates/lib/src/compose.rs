//! Response composer: turns a fetch result into reply text, encodes page text, and sends it
//! through the transport's own segmentation facility.
//!
//! Error replies stay plain text so the sender can read them even when its cipher or key does
//! not match ours.

use crate::bounded;
use crate::codec::{self, PayloadCipher, SharedSecret};
use crate::fetch::FetchResult;
use crate::transport::SmsTransport;

/// Error details are cut to this many UTF-16 units before composing.
pub const MAX_ERROR_DETAIL_UNITS: usize = 100;

const ERROR_PREFIX: &str = "Error: ";
const UNKNOWN_ERROR: &str = "Unknown error";

/// A reply ready for the transport. Never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundPayload {
    pub destination: String,
    pub encoded_text: String,
}

/// Reply text for an error detail: `"Error: "` plus at most 100 units of detail.
pub fn compose_error(detail: &str) -> String {
    let detail = bounded::prefix(detail, MAX_ERROR_DETAIL_UNITS);
    let detail = if detail.is_empty() { UNKNOWN_ERROR } else { detail };
    format!("{}{}", ERROR_PREFIX, detail)
}

/// Reply text for a fetch result: bounded text verbatim, or a composed error.
pub fn compose(result: &FetchResult) -> String {
    match result {
        FetchResult::Success { text } => text.clone(),
        FetchResult::Failure { detail, .. } => compose_error(detail),
    }
}

/// Encode reply text for the peer. Falls back to plaintext when the cipher fails, so a reply
/// still goes out.
pub fn encode(cipher: &dyn PayloadCipher, key: &SharedSecret, plaintext: &str) -> String {
    match codec::encode_text(cipher, key, plaintext) {
        Ok(encoded) => encoded,
        Err(e) => {
            log::warn!("reply encoding failed ({}); sending plaintext", e);
            plaintext.to_string()
        }
    }
}

/// Reply for `result`, addressed to `destination`. Page text is encoded; errors are not.
pub fn outbound(
    cipher: &dyn PayloadCipher,
    key: &SharedSecret,
    destination: &str,
    result: &FetchResult,
) -> OutboundPayload {
    let encoded_text = match result {
        FetchResult::Success { text } => encode(cipher, key, text),
        FetchResult::Failure { .. } => compose(result),
    };
    OutboundPayload {
        destination: destination.to_string(),
        encoded_text,
    }
}

/// Hand `text` to the transport: one part goes out as a single message, more as an ordered
/// multi-part message. The transport decides the split.
pub async fn send(transport: &dyn SmsTransport, destination: &str, text: &str) -> Result<(), String> {
    let parts = transport.divide_message(text);
    if parts.len() <= 1 {
        transport.send_text(destination, text).await
    } else {
        log::debug!("sending {} part reply via {}", parts.len(), transport.id());
        transport.send_multipart(destination, &parts).await
    }
}
