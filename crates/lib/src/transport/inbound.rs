//! Inbound message from the transport: delivered to the request pipeline for recognition.

use serde::Deserialize;

/// A text message as the transport received it. Consumed once by the dispatcher.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    /// Opaque sender address (e.g. an MSISDN); replies go back here.
    pub sender: String,
    pub body: String,
}
