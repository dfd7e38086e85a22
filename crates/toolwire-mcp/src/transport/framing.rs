//! Envelope codec: bytes to `Envelope`, responses to text.
//!
//! There is no partial-frame recovery. A frame that fails to decode is fatal
//! to the connection that sent it.

use crate::types::{Envelope, JsonRpcResponse, McpError, McpResult};

/// Decode one frame into a raw envelope.
pub fn decode(frame: &[u8]) -> McpResult<Envelope> {
    if frame.iter().all(u8::is_ascii_whitespace) {
        return Err(McpError::ParseError("Empty message".to_string()));
    }

    serde_json::from_slice(frame).map_err(|e| McpError::ParseError(e.to_string()))
}

/// Encode a response as a single JSON text.
pub fn encode(response: &JsonRpcResponse) -> McpResult<String> {
    serde_json::to_string(response).map_err(McpError::Json)
}
