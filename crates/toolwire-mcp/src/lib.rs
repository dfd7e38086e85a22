//! Toolwire MCP server: tool and resource providers behind a persistent
//! JSON-RPC 2.0 session, served over WebSocket or stdio.

pub mod config;
pub mod protocol;
pub mod provider;
pub mod resources;
pub mod session;
pub mod tools;
pub mod transport;
pub mod types;

pub use config::ServerConfig;
pub use protocol::ProtocolHandler;
pub use provider::{CallContext, ProviderRegistry, ResourceProvider, ToolProvider};
pub use session::{Session, SessionRegistry};
#[cfg(feature = "stdio")]
pub use transport::StdioTransport;
#[cfg(feature = "ws")]
pub use transport::{ListenerHandle, WsTransport};

/// Registry with the built-in providers: arithmetic tools and server resources.
pub fn default_registry() -> ProviderRegistry {
    ProviderRegistry::new()
        .with_tool(tools::MathToolProvider::new())
        .with_resource(resources::ServerResourceProvider::new())
}
