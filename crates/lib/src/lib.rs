//! Linkless core library: the SMS web-fetch protocol (dispatch, fetch, compose), the local
//! fetch bridge, transports, and the gateway server used by the CLI.

pub mod bounded;
pub mod bridge;
pub mod codec;
pub mod compose;
pub mod config;
pub mod dispatch;
pub mod fetch;
pub mod gateway;
pub mod pipeline;
pub mod transport;
