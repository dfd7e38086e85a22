//! MCP resource provider implementations.

pub mod server;

pub use server::ServerResourceProvider;
