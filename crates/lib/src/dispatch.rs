//! Request dispatcher: recognizes protocol requests among inbound text messages and recovers the
//! target URL from the encoded payload.

use crate::codec::{self, CodecError, PayloadCipher, SharedSecret};
use crate::transport::InboundMessage;
use serde::{Deserialize, Serialize};

/// Literal prefix marking a transport message as a protocol request.
pub const REQUEST_MARKER: &str = "LK:";

/// A recognized request, alive for one processing cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub sender: String,
    pub target_url: String,
}

#[derive(Debug, thiserror::Error)]
#[error("could not decode request payload: {0}")]
pub struct DecodeError(#[from] pub CodecError);

/// What to do when a payload does not decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodeMode {
    /// Use the raw payload as the URL (unencrypted testing payloads keep working).
    #[default]
    Lenient,
    /// Reject the request.
    Strict,
}

/// Encoded payload of a protocol request, or `None` for any other message.
pub fn recognize(body: &str) -> Option<&str> {
    body.strip_prefix(REQUEST_MARKER)
}

/// Decode a payload into the plaintext URL.
pub fn decode(
    cipher: &dyn PayloadCipher,
    key: &SharedSecret,
    payload: &str,
) -> Result<String, DecodeError> {
    Ok(codec::decode_text(cipher, key, payload)?)
}

/// Decode under `mode`; lenient mode never fails.
pub fn resolve_url(
    cipher: &dyn PayloadCipher,
    key: &SharedSecret,
    payload: &str,
    mode: DecodeMode,
) -> Result<String, DecodeError> {
    match decode(cipher, key, payload) {
        Ok(url) => Ok(url),
        Err(e) if mode == DecodeMode::Lenient => {
            log::warn!("{}; using payload as-is", e);
            Ok(payload.to_string())
        }
        Err(e) => Err(e),
    }
}

/// Encode a URL into a complete request body (marker included). Used by peers and the CLI.
pub fn encode_request(
    cipher: &dyn PayloadCipher,
    key: &SharedSecret,
    url: &str,
) -> Result<String, CodecError> {
    Ok(format!("{}{}", REQUEST_MARKER, codec::encode_text(cipher, key, url)?))
}

/// Recognize and decode in one step. `Ok(None)` means the message is not a request.
pub fn dispatch(
    cipher: &dyn PayloadCipher,
    key: &SharedSecret,
    msg: &InboundMessage,
    mode: DecodeMode,
) -> Result<Option<Request>, DecodeError> {
    let Some(payload) = recognize(&msg.body) else {
        return Ok(None);
    };
    let target_url = resolve_url(cipher, key, payload, mode)?;
    Ok(Some(Request {
        sender: msg.sender.clone(),
        target_url,
    }))
}
