//! Realtime update channel: wire protocol, reconnect policy, handler registry
//! and the WebSocket driver.

pub mod backoff;
pub mod channel;
pub mod protocol;
pub mod registry;
pub mod transport;
pub mod ws;

pub use backoff::*;
pub use channel::*;
pub use protocol::*;
pub use registry::*;
pub use transport::*;
pub use ws::{SharedChannel, WsChannel, WsTransport};
