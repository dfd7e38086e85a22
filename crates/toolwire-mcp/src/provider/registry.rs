//! Provider registration, aggregate listing, and name-based dispatch.
//!
//! The registry is populated before serving starts and then shared behind an
//! `Arc`, so it is immutable while connections are live and lookups need no
//! lock. Lookup is first-registered-provider-wins.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use serde_json::Value;

use crate::types::{ReadResourceResult, ResourceDefinition, ToolCallResult, ToolDefinition};

use super::{CallContext, ProviderError, ProviderResult, ResourceProvider, ToolProvider};

/// Outcome of a failed name-based dispatch.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

#[derive(Default, Clone)]
pub struct ProviderRegistry {
    tools: Vec<Arc<dyn ToolProvider>>,
    resources: Vec<Arc<dyn ResourceProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_tool(&mut self, provider: impl ToolProvider + 'static) -> &mut Self {
        tracing::debug!("Registered tool provider: {}", provider.name());
        self.tools.push(Arc::new(provider));
        self
    }

    pub fn register_resource(&mut self, provider: impl ResourceProvider + 'static) -> &mut Self {
        tracing::debug!("Registered resource provider: {}", provider.name());
        self.resources.push(Arc::new(provider));
        self
    }

    pub fn with_tool(mut self, provider: impl ToolProvider + 'static) -> Self {
        self.register_tool(provider);
        self
    }

    pub fn with_resource(mut self, provider: impl ResourceProvider + 'static) -> Self {
        self.register_resource(provider);
        self
    }

    pub fn tool_provider_count(&self) -> usize {
        self.tools.len()
    }

    pub fn resource_provider_count(&self) -> usize {
        self.resources.len()
    }

    /// Concatenate every tool provider's listing in registration order.
    /// Any single failure aborts the whole call.
    pub async fn list_all_tools(&self, ctx: &CallContext) -> ProviderResult<Vec<ToolDefinition>> {
        let mut all = Vec::new();
        for provider in &self.tools {
            let tools = cancellable(ctx, provider.list_tools(ctx)).await?;
            all.extend(tools);
        }
        Ok(all)
    }

    /// Invoke `name` on the first provider whose listing contains it.
    pub async fn dispatch_tool(
        &self,
        ctx: &CallContext,
        name: &str,
        arguments: Value,
    ) -> Result<ToolCallResult, DispatchError> {
        for provider in &self.tools {
            let tools = match cancellable(ctx, provider.list_tools(ctx)).await {
                Ok(tools) => tools,
                Err(ProviderError::Cancelled) => return Err(ProviderError::Cancelled.into()),
                Err(e) => {
                    tracing::warn!(
                        "Skipping tool provider {} during lookup of {name}: {e}",
                        provider.name()
                    );
                    continue;
                }
            };

            if tools.iter().any(|t| t.name == name) {
                tracing::debug!(
                    "Session {}: dispatching tool {name} to provider {}",
                    ctx.session_id(),
                    provider.name()
                );
                let result = cancellable(ctx, provider.call_tool(ctx, name, arguments)).await?;
                return Ok(result);
            }
        }
        Err(DispatchError::NotFound(name.to_string()))
    }

    /// Concatenate every resource provider's listing in registration order.
    pub async fn list_all_resources(
        &self,
        ctx: &CallContext,
    ) -> ProviderResult<Vec<ResourceDefinition>> {
        let mut all = Vec::new();
        for provider in &self.resources {
            let resources = cancellable(ctx, provider.list_resources(ctx)).await?;
            all.extend(resources);
        }
        Ok(all)
    }

    /// Read `uri` from the first provider whose listing contains it.
    pub async fn dispatch_resource(
        &self,
        ctx: &CallContext,
        uri: &str,
    ) -> Result<ReadResourceResult, DispatchError> {
        for provider in &self.resources {
            let resources = match cancellable(ctx, provider.list_resources(ctx)).await {
                Ok(resources) => resources,
                Err(ProviderError::Cancelled) => return Err(ProviderError::Cancelled.into()),
                Err(e) => {
                    tracing::warn!(
                        "Skipping resource provider {} during lookup of {uri}: {e}",
                        provider.name()
                    );
                    continue;
                }
            };

            if resources.iter().any(|r| r.uri == uri) {
                tracing::debug!("Reading resource {uri} from provider {}", provider.name());
                let result = cancellable(ctx, provider.read_resource(ctx, uri)).await?;
                return Ok(result);
            }
        }
        Err(DispatchError::NotFound(uri.to_string()))
    }

    /// Tool names and resource URIs listed by more than one provider.
    /// Only the first registered provider is ever reached for these.
    pub async fn collisions(&self, ctx: &CallContext) -> ProviderResult<Vec<String>> {
        let mut dupes = Vec::new();

        let mut seen = HashSet::new();
        for tool in self.list_all_tools(ctx).await? {
            if !seen.insert(tool.name.clone()) {
                dupes.push(tool.name);
            }
        }

        let mut seen = HashSet::new();
        for resource in self.list_all_resources(ctx).await? {
            if !seen.insert(resource.uri.clone()) {
                dupes.push(resource.uri);
            }
        }

        Ok(dupes)
    }
}

/// Race a provider future against the call's cancellation scope.
async fn cancellable<T>(
    ctx: &CallContext,
    fut: impl Future<Output = ProviderResult<T>>,
) -> ProviderResult<T> {
    tokio::select! {
        biased;
        _ = ctx.cancelled() => Err(ProviderError::Cancelled),
        result = fut => result,
    }
}
