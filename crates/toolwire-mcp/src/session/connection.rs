//! One client's session: identity, lifetime scope, and frame processing.

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::protocol::ProtocolHandler;
use crate::provider::ProviderRegistry;
use crate::transport::framing;
use crate::types::McpError;

use super::SessionState;

/// What the transport should do after a frame was processed.
#[derive(Debug)]
pub enum FrameOutcome {
    /// Send this encoded response.
    Reply(String),
    /// Nothing to send (notification).
    NoReply,
    /// The frame could not be decoded; the connection must be closed.
    Terminate(McpError),
}

/// Server-side state for one live connection.
pub struct Session {
    handler: ProtocolHandler,
    peer: Option<SocketAddr>,
    connected_at: DateTime<Utc>,
    scope: CancellationToken,
}

impl Session {
    /// Create a session whose lifetime scope is a child of `parent`.
    pub fn new(
        registry: Arc<ProviderRegistry>,
        parent: &CancellationToken,
        peer: Option<SocketAddr>,
    ) -> Self {
        let id = Uuid::new_v4();
        let scope = parent.child_token();
        Self {
            handler: ProtocolHandler::with_scope(id, registry, scope.clone()),
            peer,
            connected_at: Utc::now(),
            scope,
        }
    }

    pub fn id(&self) -> Uuid {
        self.handler.session_id()
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Cancelled when the connection closes or the server shuts down.
    pub fn scope(&self) -> &CancellationToken {
        &self.scope
    }

    pub async fn state(&self) -> SessionState {
        self.handler.state().await
    }

    /// Decode, dispatch, and encode one inbound frame.
    pub async fn process_frame(&self, frame: &[u8]) -> FrameOutcome {
        let envelope = match framing::decode(frame) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!("Session {}: undecodable frame, closing: {e}", self.id());
                return FrameOutcome::Terminate(e);
            }
        };

        match self.handler.handle_message(envelope.classify()).await {
            Some(response) => match framing::encode(&response) {
                Ok(text) => FrameOutcome::Reply(text),
                Err(e) => FrameOutcome::Terminate(e),
            },
            None => FrameOutcome::NoReply,
        }
    }

    /// Cancel in-flight work and move to `Closed`.
    pub async fn close(&self) {
        self.handler.close().await;
        tracing::debug!("Session {} closed", self.id());
    }
}
