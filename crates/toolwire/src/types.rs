//! Core data types for arithmetic operations.

use serde::{Deserialize, Serialize};

/// A binary arithmetic operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Add,
    Multiply,
    Divide,
    Power,
}

impl Operation {
    /// Every supported operation, in listing order.
    pub const ALL: [Operation; 4] = [
        Operation::Add,
        Operation::Multiply,
        Operation::Divide,
        Operation::Power,
    ];

    /// Tool-facing name of the operation.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Multiply => "multiply",
            Operation::Divide => "divide",
            Operation::Power => "power",
        }
    }

    /// Resolve an operation from its tool-facing name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    /// Infix symbol used when rendering a calculation.
    pub fn symbol(&self) -> &'static str {
        match self {
            Operation::Add => "+",
            Operation::Multiply => "×",
            Operation::Divide => "÷",
            Operation::Power => "^",
        }
    }

    /// Names of the two operands, left then right.
    pub fn operand_names(&self) -> (&'static str, &'static str) {
        match self {
            Operation::Power => ("base", "exponent"),
            _ => ("a", "b"),
        }
    }

    /// One-line human description.
    pub fn description(&self) -> &'static str {
        match self {
            Operation::Add => "Add two numbers together",
            Operation::Multiply => "Multiply two numbers",
            Operation::Divide => "Divide one number by another",
            Operation::Power => "Calculate a number raised to a power",
        }
    }
}

/// A completed calculation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calculation {
    pub operation: Operation,
    pub lhs: f64,
    pub rhs: f64,
    pub result: f64,
}

impl std::fmt::Display for Calculation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {} = {}",
            crate::arith::format_number(self.lhs),
            self.operation.symbol(),
            crate::arith::format_number(self.rhs),
            crate::arith::format_number(self.result)
        )
    }
}

/// Errors that can occur while evaluating an operation.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CalcError {
    #[error("missing required argument: {0}")]
    MissingArgument(String),

    #[error("invalid number format for {name}: {value}")]
    InvalidNumber { name: String, value: String },

    #[error("invalid argument type for {name}: expected number, got {found}")]
    InvalidType { name: String, found: &'static str },

    #[error("division by zero")]
    DivisionByZero,

    #[error("result of {0} is not a finite number")]
    NonFinite(String),
}

pub type CalcResult<T> = Result<T, CalcError>;
