//! MCP tool provider implementations.

pub mod math;

pub use math::MathToolProvider;
