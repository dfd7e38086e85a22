//! Per-session request dispatcher: enforces the handshake and routes methods
//! to the provider registry.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::provider::{CallContext, DispatchError, ProviderRegistry};
use crate::session::SessionState;
use crate::types::*;

use super::method::{Method, NotificationMethod};
use super::negotiation::NegotiatedCapabilities;
use super::validator::validate_request;

/// Dispatches the envelopes of one session.
///
/// All processing happens under the session's state lock, so at most one
/// envelope is in flight per session and envelopes are handled in the order
/// they are submitted.
pub struct ProtocolHandler {
    session_id: Uuid,
    registry: Arc<ProviderRegistry>,
    state: Mutex<NegotiatedCapabilities>,
    scope: CancellationToken,
}

impl ProtocolHandler {
    /// A handler with its own root scope, not tied to any server.
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self::with_scope(Uuid::new_v4(), registry, CancellationToken::new())
    }

    /// A handler whose provider calls are cancelled together with `scope`.
    pub fn with_scope(
        session_id: Uuid,
        registry: Arc<ProviderRegistry>,
        scope: CancellationToken,
    ) -> Self {
        Self {
            session_id,
            registry,
            state: Mutex::new(NegotiatedCapabilities::default()),
            scope,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub async fn state(&self) -> SessionState {
        self.state.lock().await.state
    }

    /// Cancel in-flight provider work and move to `Closed`.
    pub async fn close(&self) {
        self.scope.cancel();
        self.state.lock().await.close();
    }

    /// Handle one classified envelope. Requests always produce a response;
    /// notifications never do.
    pub async fn handle_message(&self, msg: JsonRpcMessage) -> Option<JsonRpcResponse> {
        let mut state = self.state.lock().await;

        if state.state == SessionState::Closed {
            tracing::debug!("Session {} closed, dropping message", self.session_id);
            return None;
        }

        match msg {
            JsonRpcMessage::Request(req) => Some(self.handle_request(&mut state, req).await),
            JsonRpcMessage::Notification(notif) => {
                self.handle_notification(&mut state, notif);
                None
            }
            JsonRpcMessage::Invalid(id) => {
                tracing::warn!("Received envelope without a method from client (id {id})");
                Some(
                    McpError::InvalidRequest("Invalid message format".to_string())
                        .to_json_rpc_error(id),
                )
            }
        }
    }

    async fn handle_request(
        &self,
        state: &mut NegotiatedCapabilities,
        request: JsonRpcRequest,
    ) -> JsonRpcResponse {
        if let Err(e) = validate_request(&request) {
            return e.to_json_rpc_error(request.id);
        }

        tracing::debug!("Session {} request {} ({})", self.session_id, request.method, request.id);

        let id = request.id.clone();
        match self.dispatch_request(state, request).await {
            Ok(value) => JsonRpcResponse::new(id, value),
            Err(e) => {
                tracing::debug!("Session {} request {id} failed: {e}", self.session_id);
                e.to_json_rpc_error(id)
            }
        }
    }

    async fn dispatch_request(
        &self,
        state: &mut NegotiatedCapabilities,
        request: JsonRpcRequest,
    ) -> McpResult<Value> {
        let method = Method::parse(&request.method);

        if method.requires_ready() && !state.is_ready() {
            tracing::debug!("Session {} rejected {} before handshake", self.session_id, method.as_str());
            return Err(McpError::NotInitialized);
        }

        match method {
            Method::Initialize => self.handle_initialize(state, request.params),
            Method::ToolsList => self.handle_tools_list().await,
            Method::ToolsCall => self.handle_tools_call(request.params).await,
            Method::ResourcesList => self.handle_resources_list().await,
            Method::ResourcesRead => self.handle_resources_read(request.params).await,
            Method::Unknown(name) => Err(McpError::MethodNotFound(name)),
        }
    }

    fn handle_notification(
        &self,
        state: &mut NegotiatedCapabilities,
        notification: JsonRpcNotification,
    ) {
        if notification.jsonrpc != JSONRPC_VERSION {
            tracing::warn!(
                "Dropping notification {} with jsonrpc version \"{}\"",
                notification.method,
                notification.jsonrpc
            );
            return;
        }

        match NotificationMethod::parse(&notification.method) {
            NotificationMethod::Initialized => {
                if !state.mark_initialized() {
                    tracing::debug!("Session {} already initialized", self.session_id);
                }
            }
            NotificationMethod::Cancelled => {
                let params = notification
                    .params
                    .and_then(|p| serde_json::from_value::<CancelRequestParams>(p).ok());
                match params {
                    Some(p) => tracing::info!(
                        "Client cancelled request {} ({})",
                        p.request_id,
                        p.reason.as_deref().unwrap_or("no reason")
                    ),
                    None => tracing::info!("Received cancellation notification"),
                }
            }
            NotificationMethod::Unknown(method) => {
                tracing::warn!("Unknown notification: {method}");
            }
        }
    }

    fn handle_initialize(
        &self,
        state: &mut NegotiatedCapabilities,
        params: Option<Value>,
    ) -> McpResult<Value> {
        let init_params: InitializeParams = match params {
            Some(params) => serde_json::from_value(params).map_err(|e| McpError::InvalidParams {
                message: "Invalid initialize parameters".to_string(),
                data: Some(e.to_string()),
            })?,
            None => InitializeParams::default(),
        };

        let result = state.negotiate(init_params)?;

        serde_json::to_value(result).map_err(|e| McpError::InternalError(e.to_string()))
    }

    async fn handle_tools_list(&self) -> McpResult<Value> {
        let tools = self
            .registry
            .list_all_tools(&self.call_context())
            .await
            .map_err(|e| McpError::ListFailed {
                kind: "tools",
                reason: e.to_string(),
            })?;

        let result = ToolListResult {
            tools,
            next_cursor: None,
        };
        serde_json::to_value(result).map_err(|e| McpError::InternalError(e.to_string()))
    }

    async fn handle_tools_call(&self, params: Option<Value>) -> McpResult<Value> {
        let call_params: ToolCallParams = parse_params(params, "tool call")?;
        let arguments = call_params
            .arguments
            .unwrap_or(Value::Object(serde_json::Map::new()));

        let result = self
            .registry
            .dispatch_tool(&self.call_context(), &call_params.name, arguments)
            .await
            .map_err(|e| match e {
                DispatchError::NotFound(name) => McpError::ToolNotFound(name),
                DispatchError::Provider(err) => {
                    tracing::warn!("Tool {} failed: {err}", call_params.name);
                    McpError::ToolFailed(err.to_string())
                }
            })?;

        serde_json::to_value(result).map_err(|e| McpError::InternalError(e.to_string()))
    }

    async fn handle_resources_list(&self) -> McpResult<Value> {
        let resources = self
            .registry
            .list_all_resources(&self.call_context())
            .await
            .map_err(|e| McpError::ListFailed {
                kind: "resources",
                reason: e.to_string(),
            })?;

        let result = ResourceListResult {
            resources,
            next_cursor: None,
        };
        serde_json::to_value(result).map_err(|e| McpError::InternalError(e.to_string()))
    }

    async fn handle_resources_read(&self, params: Option<Value>) -> McpResult<Value> {
        let read_params: ResourceReadParams = parse_params(params, "resource read")?;

        let result = self
            .registry
            .dispatch_resource(&self.call_context(), &read_params.uri)
            .await
            .map_err(|e| match e {
                DispatchError::NotFound(uri) => McpError::ResourceNotFound(uri),
                DispatchError::Provider(err) => {
                    tracing::warn!("Resource {} failed: {err}", read_params.uri);
                    McpError::ResourceFailed(err.to_string())
                }
            })?;

        serde_json::to_value(result).map_err(|e| McpError::InternalError(e.to_string()))
    }

    /// Fresh child scope of the session for one provider call.
    fn call_context(&self) -> CallContext {
        CallContext::new(self.session_id, self.scope.child_token())
    }
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>, what: &str) -> McpResult<T> {
    params
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| McpError::InvalidParams {
            message: format!("Invalid {what} parameters"),
            data: Some(e.to_string()),
        })?
        .ok_or_else(|| McpError::invalid_params(format!("{what} params required")))
}
