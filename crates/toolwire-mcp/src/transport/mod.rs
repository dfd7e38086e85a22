//! Transport layer for MCP communication.

pub mod framing;
#[cfg(feature = "stdio")]
pub mod stdio;
#[cfg(feature = "ws")]
pub mod ws;

#[cfg(feature = "stdio")]
pub use stdio::StdioTransport;
#[cfg(feature = "ws")]
pub use ws::{ListenerHandle, WsTransport};
