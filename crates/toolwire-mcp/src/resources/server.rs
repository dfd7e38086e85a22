//! Resource provider: toolwire://server/info and toolwire://math/operations

use std::time::Instant;

use async_trait::async_trait;
use serde_json::json;

use toolwire::Operation;

use crate::provider::{CallContext, ProviderError, ProviderResult, ResourceProvider};
use crate::types::{
    ReadResourceResult, ResourceContent, ResourceDefinition, MCP_VERSION, SERVER_NAME,
    SERVER_VERSION,
};

pub const SERVER_INFO_URI: &str = "toolwire://server/info";
pub const MATH_OPERATIONS_URI: &str = "toolwire://math/operations";

/// Static server metadata exposed as JSON resources.
#[derive(Debug, Clone)]
pub struct ServerResourceProvider {
    started_at: Instant,
}

impl ServerResourceProvider {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
        }
    }
}

impl Default for ServerResourceProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceProvider for ServerResourceProvider {
    fn name(&self) -> &str {
        "server"
    }

    async fn list_resources(&self, _ctx: &CallContext) -> ProviderResult<Vec<ResourceDefinition>> {
        Ok(vec![
            ResourceDefinition {
                uri: SERVER_INFO_URI.to_string(),
                name: "Server info".to_string(),
                description: Some("Server identity, protocol version, and uptime".to_string()),
                mime_type: Some("application/json".to_string()),
            },
            ResourceDefinition {
                uri: MATH_OPERATIONS_URI.to_string(),
                name: "Math operations".to_string(),
                description: Some("Arithmetic operations available as tools".to_string()),
                mime_type: Some("application/json".to_string()),
            },
        ])
    }

    async fn read_resource(
        &self,
        _ctx: &CallContext,
        uri: &str,
    ) -> ProviderResult<ReadResourceResult> {
        let content = match uri {
            SERVER_INFO_URI => json!({
                "name": SERVER_NAME,
                "version": SERVER_VERSION,
                "protocol_version": MCP_VERSION,
                "uptime_secs": self.started_at.elapsed().as_secs(),
            }),
            MATH_OPERATIONS_URI => {
                let ops: Vec<_> = Operation::ALL
                    .into_iter()
                    .map(|op| {
                        let (lhs, rhs) = op.operand_names();
                        json!({
                            "name": op.name(),
                            "symbol": op.symbol(),
                            "description": op.description(),
                            "operands": [lhs, rhs],
                        })
                    })
                    .collect();
                json!({ "count": ops.len(), "operations": ops })
            }
            _ => return Err(ProviderError::failed(format!("unknown resource: {uri}"))),
        };

        Ok(ReadResourceResult {
            contents: vec![ResourceContent::json(uri, &content)],
        })
    }
}
