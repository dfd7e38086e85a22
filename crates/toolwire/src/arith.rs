//! Evaluation of arithmetic operations and argument extraction.

use serde_json::{Map, Value};

use crate::types::{CalcError, CalcResult, Calculation, Operation};

/// Evaluate `op` over two operands.
pub fn evaluate(op: Operation, lhs: f64, rhs: f64) -> CalcResult<Calculation> {
    let result = match op {
        Operation::Add => lhs + rhs,
        Operation::Multiply => lhs * rhs,
        Operation::Divide => {
            if rhs == 0.0 {
                return Err(CalcError::DivisionByZero);
            }
            lhs / rhs
        }
        Operation::Power => lhs.powf(rhs),
    };

    if !result.is_finite() {
        return Err(CalcError::NonFinite(op.name().to_string()));
    }

    tracing::debug!("{} {lhs} {rhs} -> {result}", op.name());

    Ok(Calculation {
        operation: op,
        lhs,
        rhs,
        result,
    })
}

/// Extract a numeric argument. Accepts JSON numbers and numeric strings.
pub fn number_arg(args: &Map<String, Value>, name: &str) -> CalcResult<f64> {
    let value = args
        .get(name)
        .ok_or_else(|| CalcError::MissingArgument(name.to_string()))?;

    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| CalcError::InvalidNumber {
            name: name.to_string(),
            value: n.to_string(),
        }),
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| CalcError::InvalidNumber {
            name: name.to_string(),
            value: s.clone(),
        }),
        Value::Null => Err(CalcError::InvalidType {
            name: name.to_string(),
            found: "null",
        }),
        Value::Bool(_) => Err(CalcError::InvalidType {
            name: name.to_string(),
            found: "boolean",
        }),
        Value::Array(_) => Err(CalcError::InvalidType {
            name: name.to_string(),
            found: "array",
        }),
        Value::Object(_) => Err(CalcError::InvalidType {
            name: name.to_string(),
            found: "object",
        }),
    }
}

/// Render a number without trailing decimals when it is integral.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        let s = format!("{n:.6}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}
