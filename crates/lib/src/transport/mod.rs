//! Text-message transport.
//!
//! `SmsTransport` is the send capability the composer uses; segmentation is the transport's
//! own facility (`divide_message`). `RelayTransport` talks to an HTTP relay fronting the modem
//! or SMS provider; inbound messages reach the gateway through its webhook.

mod inbound;
mod relay;
pub mod segment;
mod sms;

pub use inbound::InboundMessage;
pub use relay::RelayTransport;
pub use sms::SmsTransport;
