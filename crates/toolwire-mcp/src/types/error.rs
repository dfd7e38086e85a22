//! Error types and JSON-RPC error codes for the MCP server.

use serde_json::Value;

use super::message::{JsonRpcResponse, RequestId};

/// Standard JSON-RPC 2.0 error codes.
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// All errors that can occur in the MCP server.
#[derive(thiserror::Error, Debug)]
pub enum McpError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("client not initialized")]
    NotInitialized,

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {message}")]
    InvalidParams {
        message: String,
        data: Option<String>,
    },

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// A tool provider failed; the provider's text travels in `data`.
    #[error("Tool execution failed")]
    ToolFailed(String),

    /// A resource provider failed; the provider's text travels in `data`.
    #[error("Resource read failed")]
    ResourceFailed(String),

    /// Listing tools or resources failed in one of the providers.
    #[error("Failed to list {kind}")]
    ListFailed { kind: &'static str, reason: String },

    #[error("Shutdown deadline elapsed with {0} session(s) still open")]
    ShutdownTimeout(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl McpError {
    /// Shorthand for `InvalidParams` without a data payload.
    pub fn invalid_params(message: impl Into<String>) -> Self {
        McpError::InvalidParams {
            message: message.into(),
            data: None,
        }
    }

    pub fn code(&self) -> i32 {
        use error_codes::*;
        match self {
            McpError::ParseError(_) | McpError::Json(_) => PARSE_ERROR,
            McpError::InvalidRequest(_) | McpError::NotInitialized => INVALID_REQUEST,
            McpError::MethodNotFound(_)
            | McpError::ToolNotFound(_)
            | McpError::ResourceNotFound(_) => METHOD_NOT_FOUND,
            McpError::InvalidParams { .. } => INVALID_PARAMS,
            McpError::InternalError(_)
            | McpError::ToolFailed(_)
            | McpError::ResourceFailed(_)
            | McpError::ListFailed { .. }
            | McpError::ShutdownTimeout(_)
            | McpError::Io(_) => INTERNAL_ERROR,
        }
    }

    /// Optional `data` payload for the JSON-RPC error object.
    pub fn data(&self) -> Option<Value> {
        match self {
            McpError::ToolFailed(reason)
            | McpError::ResourceFailed(reason)
            | McpError::ListFailed { reason, .. } => Some(Value::String(reason.clone())),
            McpError::InvalidParams { data, .. } => data.clone().map(Value::String),
            _ => None,
        }
    }

    pub fn to_json_rpc_error(&self, id: RequestId) -> JsonRpcResponse {
        JsonRpcResponse::error(id, self.code(), self.to_string(), self.data())
    }
}

pub type McpResult<T> = Result<T, McpError>;
