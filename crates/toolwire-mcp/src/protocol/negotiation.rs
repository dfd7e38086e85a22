//! MCP capability negotiation and the handshake state machine.

use crate::session::SessionState;
use crate::types::{
    ClientCapabilities, Implementation, InitializeParams, InitializeResult, McpResult, MCP_VERSION,
};

/// Per-session protocol state: what the client announced and where the
/// handshake stands.
#[derive(Debug, Clone, Default)]
pub struct NegotiatedCapabilities {
    pub client: ClientCapabilities,
    pub client_info: Option<Implementation>,
    pub state: SessionState,
}

impl NegotiatedCapabilities {
    /// Answer an `initialize` request. Does not change the session state.
    pub fn negotiate(&mut self, params: InitializeParams) -> McpResult<InitializeResult> {
        if let Some(requested) = &params.protocol_version {
            if requested != MCP_VERSION {
                tracing::warn!(
                    "Client requested protocol version {requested}, server supports {MCP_VERSION}. Proceeding with server version."
                );
            }
        }

        self.client = params.capabilities;

        if let Some(info) = &params.client_info {
            tracing::info!("Initialize from client: {} v{}", info.name, info.version);
        }
        self.client_info = params.client_info;

        Ok(InitializeResult::default_result())
    }

    /// Handle the `initialized` notification. Returns whether the state changed.
    pub fn mark_initialized(&mut self) -> bool {
        match self.state {
            SessionState::AwaitingInitialize => {
                self.state = SessionState::Ready;
                tracing::info!("MCP handshake complete");
                true
            }
            SessionState::Ready | SessionState::Closed => false,
        }
    }

    pub fn close(&mut self) {
        self.state = SessionState::Closed;
    }

    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready
    }
}
