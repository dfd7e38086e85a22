//! Tool provider: add, multiply, divide, power.

use async_trait::async_trait;
use serde_json::{json, Value};

use toolwire::{evaluate, number_arg, Operation};

use crate::provider::{CallContext, ProviderResult, ToolProvider};
use crate::types::{ToolCallResult, ToolDefinition};

/// Basic arithmetic over two numeric arguments.
///
/// Argument problems and arithmetic failures come back as error content
/// (`isError: true`), not as provider failures.
#[derive(Debug, Default, Clone)]
pub struct MathToolProvider;

impl MathToolProvider {
    pub fn new() -> Self {
        Self
    }

    fn definition(op: Operation) -> ToolDefinition {
        let (lhs, rhs) = op.operand_names();
        ToolDefinition {
            name: op.name().to_string(),
            description: Some(op.description().to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    lhs: { "type": "number", "description": operand_description(op, lhs) },
                    rhs: { "type": "number", "description": operand_description(op, rhs) }
                },
                "required": [lhs, rhs]
            }),
        }
    }
}

fn operand_description(op: Operation, operand: &str) -> &'static str {
    match (op, operand) {
        (Operation::Power, "base") => "Base number",
        (Operation::Power, _) => "Exponent",
        (Operation::Divide, "a") => "Dividend",
        (Operation::Divide, _) => "Divisor",
        (_, "a") => "First number",
        _ => "Second number",
    }
}

#[async_trait]
impl ToolProvider for MathToolProvider {
    fn name(&self) -> &str {
        "math"
    }

    async fn list_tools(&self, _ctx: &CallContext) -> ProviderResult<Vec<ToolDefinition>> {
        Ok(Operation::ALL.into_iter().map(Self::definition).collect())
    }

    async fn call_tool(
        &self,
        _ctx: &CallContext,
        name: &str,
        arguments: Value,
    ) -> ProviderResult<ToolCallResult> {
        let Some(op) = Operation::from_name(name) else {
            return Ok(ToolCallResult::error(format!("Unknown tool: {name}")));
        };

        let args = match arguments {
            Value::Object(map) => map,
            Value::Null => serde_json::Map::new(),
            other => {
                return Ok(ToolCallResult::error(format!(
                    "arguments must be an object, got {other}"
                )))
            }
        };

        let (lhs_name, rhs_name) = op.operand_names();
        let operands = number_arg(&args, lhs_name)
            .and_then(|lhs| number_arg(&args, rhs_name).map(|rhs| (lhs, rhs)));

        let result = operands.and_then(|(lhs, rhs)| evaluate(op, lhs, rhs));

        Ok(match result {
            Ok(calc) => ToolCallResult::text(calc.to_string()),
            Err(e) => ToolCallResult::error(e.to_string()),
        })
    }
}
