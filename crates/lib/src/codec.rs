//! Payload codec at the protocol boundary.
//!
//! Requests and replies travel as text, but the protocol treats the payload as bytes sealed
//! with a shared secret. `PayloadCipher` is the capability the dispatcher and composer depend on;
//! `PlaceholderCipher` is the reversible, non-secret encoding shipped today (standard base64).
//! A real authenticated cipher must keep `decode(encode(p, k), k) == p` and produce transport-safe
//! text, so it can be swapped in without touching dispatch or compose logic.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use std::fmt;

/// Standard alphabet, padding emitted on encode and optional on decode.
const PLACEHOLDER_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("malformed payload encoding: {0}")]
    Malformed(String),
    #[error("payload is not valid UTF-8")]
    NotUtf8,
}

/// Shared secret between the gateway and its peer. Provisioning happens outside this crate.
#[derive(Clone, Default)]
pub struct SharedSecret(Vec<u8>);

impl SharedSecret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret(<redacted>)")
    }
}

/// Encode/decode a byte payload with a shared secret.
pub trait PayloadCipher: Send + Sync {
    /// Seal `plaintext`. Output must be representable as transport text (UTF-8).
    fn encode(&self, plaintext: &[u8], key: &SharedSecret) -> Result<Vec<u8>, CodecError>;

    /// Recover exactly the plaintext `encode` produced for the same key.
    fn decode(&self, payload: &[u8], key: &SharedSecret) -> Result<Vec<u8>, CodecError>;
}

/// Reversible stand-in for a real cipher: base64 of the bytes, key ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderCipher;

impl PayloadCipher for PlaceholderCipher {
    fn encode(&self, plaintext: &[u8], _key: &SharedSecret) -> Result<Vec<u8>, CodecError> {
        Ok(PLACEHOLDER_ENGINE.encode(plaintext).into_bytes())
    }

    fn decode(&self, payload: &[u8], _key: &SharedSecret) -> Result<Vec<u8>, CodecError> {
        PLACEHOLDER_ENGINE
            .decode(payload)
            .map_err(|e| CodecError::Malformed(e.to_string()))
    }
}

/// Encode a text payload into transport text.
pub fn encode_text(
    cipher: &dyn PayloadCipher,
    key: &SharedSecret,
    plaintext: &str,
) -> Result<String, CodecError> {
    let sealed = cipher.encode(plaintext.as_bytes(), key)?;
    String::from_utf8(sealed).map_err(|_| CodecError::NotUtf8)
}

/// Decode transport text back into the plaintext it was encoded from.
pub fn decode_text(
    cipher: &dyn PayloadCipher,
    key: &SharedSecret,
    payload: &str,
) -> Result<String, CodecError> {
    let opened = cipher.decode(payload.as_bytes(), key)?;
    String::from_utf8(opened).map_err(|_| CodecError::NotUtf8)
}
