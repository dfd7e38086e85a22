//! MCP protocol handling: method routing and per-session dispatch.

pub mod handler;
pub mod method;
pub mod negotiation;
pub mod validator;

pub use handler::ProtocolHandler;
pub use method::{Method, NotificationMethod};
