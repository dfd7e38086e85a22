//! Toolwire core arithmetic: typed operations, operand parsing, and result formatting.

pub mod arith;
pub mod types;

pub use arith::{evaluate, format_number, number_arg};
pub use types::*;
