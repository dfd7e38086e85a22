//! Per-call context handed to providers.

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Context for one provider `list`/`invoke` call.
///
/// The token is a child of the owning session's scope, which is itself a
/// child of the server's shutdown scope, so closing either cancels the call.
#[derive(Debug, Clone)]
pub struct CallContext {
    session_id: Uuid,
    cancellation: CancellationToken,
}

impl CallContext {
    pub fn new(session_id: Uuid, cancellation: CancellationToken) -> Self {
        Self {
            session_id,
            cancellation,
        }
    }

    /// A context that is never cancelled from outside. Used by the CLI `info`
    /// command and in tests.
    pub fn detached() -> Self {
        Self::new(Uuid::nil(), CancellationToken::new())
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Resolves once the call has been cancelled.
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancellation
    }
}
