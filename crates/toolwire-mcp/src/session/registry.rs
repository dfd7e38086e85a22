//! Registry of live sessions, owned by the listener.
//!
//! Writes happen on connect and disconnect; the bulk read happens once, when
//! the listener shuts down and closes everything it tracks.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Notify, RwLock};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::types::{McpError, McpResult};

use super::Session;

/// Snapshot of one tracked session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: Uuid,
    pub peer: Option<SocketAddr>,
    pub connected_at: DateTime<Utc>,
}

struct Entry {
    info: SessionInfo,
    scope: CancellationToken,
}

#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, Entry>>,
    drained: Notify,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, session: &Session) {
        let info = SessionInfo {
            id: session.id(),
            peer: session.peer(),
            connected_at: session.connected_at(),
        };
        let mut sessions = self.sessions.write().await;
        sessions.insert(
            info.id,
            Entry {
                info,
                scope: session.scope().clone(),
            },
        );
        tracing::debug!("Tracking {} live session(s)", sessions.len());
    }

    /// Stop tracking a session. Wakes shutdown waiters once the last one goes.
    pub async fn remove(&self, id: Uuid) -> bool {
        let mut sessions = self.sessions.write().await;
        let removed = sessions.remove(&id).is_some();
        if sessions.is_empty() {
            self.drained.notify_waiters();
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    pub async fn snapshot(&self) -> Vec<SessionInfo> {
        self.sessions
            .read()
            .await
            .values()
            .map(|e| e.info.clone())
            .collect()
    }

    /// Cancel every tracked session's scope. Returns how many were signalled.
    pub async fn close_all(&self) -> usize {
        let sessions = self.sessions.read().await;
        for entry in sessions.values() {
            entry.scope.cancel();
        }
        sessions.len()
    }

    /// Wait until every session has been removed, or fail once `deadline`
    /// elapses with sessions still tracked.
    pub async fn wait_drained(&self, deadline: Duration) -> McpResult<()> {
        let drained = async {
            loop {
                let notified = self.drained.notified();
                if self.is_empty().await {
                    return;
                }
                notified.await;
            }
        };

        match tokio::time::timeout(deadline, drained).await {
            Ok(()) => Ok(()),
            Err(_) => Err(McpError::ShutdownTimeout(self.len().await)),
        }
    }
}
