//! Tool and resource provider contracts and the registry that aggregates them.

pub mod context;
pub mod registry;

use async_trait::async_trait;
use serde_json::Value;

use crate::types::{ReadResourceResult, ResourceDefinition, ToolCallResult, ToolDefinition};

pub use context::CallContext;
pub use registry::{DispatchError, ProviderRegistry};

/// Failure reported by a provider's `list` or `invoke`.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("{0}")]
    Failed(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl ProviderError {
    pub fn failed(message: impl Into<String>) -> Self {
        ProviderError::Failed(message.into())
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// A backend exposing callable tools.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Label used in logs.
    fn name(&self) -> &str;

    async fn list_tools(&self, ctx: &CallContext) -> ProviderResult<Vec<ToolDefinition>>;

    async fn call_tool(
        &self,
        ctx: &CallContext,
        name: &str,
        arguments: Value,
    ) -> ProviderResult<ToolCallResult>;
}

/// A backend exposing readable resources, keyed by URI.
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// Label used in logs.
    fn name(&self) -> &str;

    async fn list_resources(&self, ctx: &CallContext) -> ProviderResult<Vec<ResourceDefinition>>;

    async fn read_resource(&self, ctx: &CallContext, uri: &str)
        -> ProviderResult<ReadResourceResult>;
}
