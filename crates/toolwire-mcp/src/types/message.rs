//! JSON-RPC 2.0 envelope types and inbound classification.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC 2.0 protocol version.
pub const JSONRPC_VERSION: &str = "2.0";

/// Client-chosen request identifier. Echoed back verbatim in the response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    String(String),
    Number(i64),
    Null,
    /// Any other JSON value a client chose as an id (floats, objects, ...).
    Other(Value),
}

impl RequestId {
    /// Build an id from a raw JSON value. `null` maps to `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(RequestId::String(s)),
            Value::Number(n) => Some(match n.as_i64() {
                Some(i) => RequestId::Number(i),
                None => RequestId::Other(Value::Number(n)),
            }),
            other => Some(RequestId::Other(other)),
        }
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestId::String(s) => write!(f, "{s}"),
            RequestId::Number(n) => write!(f, "{n}"),
            RequestId::Null => write!(f, "null"),
            RequestId::Other(v) => write!(f, "{v}"),
        }
    }
}

/// The raw wire envelope. Every field is optional until classified.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonrpc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcErrorObject>,
}

/// A JSON-RPC 2.0 request message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: RequestId,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// A JSON-RPC 2.0 notification (no id, no response expected).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// Either a `result` or an `error`, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResponsePayload {
    #[serde(rename = "result")]
    Result(Value),
    #[serde(rename = "error")]
    Error(JsonRpcErrorObject),
}

/// A JSON-RPC 2.0 response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: RequestId,
    #[serde(flatten)]
    pub payload: ResponsePayload,
}

/// Error object within a JSON-RPC error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A decoded inbound envelope after classification.
#[derive(Debug, Clone)]
pub enum JsonRpcMessage {
    Request(JsonRpcRequest),
    Notification(JsonRpcNotification),
    /// Neither a request nor a notification. Carries the id, if any, so the
    /// rejection can be correlated.
    Invalid(RequestId),
}

impl Envelope {
    /// Non-empty method + non-null id is a request; non-empty method without
    /// id is a notification; anything else is invalid.
    pub fn classify(self) -> JsonRpcMessage {
        let jsonrpc = self
            .jsonrpc
            .unwrap_or_else(|| JSONRPC_VERSION.to_string());
        let id = self.id.and_then(RequestId::from_value);

        match (self.method, id) {
            (Some(method), Some(id)) if !method.is_empty() => {
                JsonRpcMessage::Request(JsonRpcRequest {
                    jsonrpc,
                    id,
                    method,
                    params: self.params,
                })
            }
            (Some(method), None) if !method.is_empty() => {
                JsonRpcMessage::Notification(JsonRpcNotification {
                    jsonrpc,
                    method,
                    params: self.params,
                })
            }
            (_, id) => JsonRpcMessage::Invalid(id.unwrap_or(RequestId::Null)),
        }
    }
}

impl JsonRpcResponse {
    pub fn new(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            payload: ResponsePayload::Result(result),
        }
    }

    pub fn error(id: RequestId, code: i32, message: String, data: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            payload: ResponsePayload::Error(JsonRpcErrorObject {
                code,
                message,
                data,
            }),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.payload, ResponsePayload::Error(_))
    }
}
