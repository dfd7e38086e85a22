//! WebSocket transport: one MCP session per `/mcp` connection, plus `/health`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json as AxumJson, Response},
    routing::get,
    Router,
};
use futures::stream::SplitStream;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::provider::ProviderRegistry;
use crate::session::{FrameOutcome, Session, SessionRegistry};
use crate::types::{McpError, McpResult};

/// Frames a client may pipeline ahead of the dispatch loop. A client that
/// exceeds it is disconnected.
pub const MAX_PIPELINED_FRAMES: usize = 1024;

/// Shared server state passed to all handlers via axum State.
struct ServerState {
    registry: Arc<ProviderRegistry>,
    sessions: Arc<SessionRegistry>,
    shutdown: CancellationToken,
    service_name: String,
    max_frame_bytes: usize,
}

/// WebSocket listener for MCP clients.
pub struct WsTransport {
    registry: Arc<ProviderRegistry>,
    config: ServerConfig,
}

impl WsTransport {
    /// Takes ownership of the registry; it is read-only from here on.
    pub fn new(registry: ProviderRegistry, config: ServerConfig) -> Self {
        Self::with_shared(Arc::new(registry), config)
    }

    pub fn with_shared(registry: Arc<ProviderRegistry>, config: ServerConfig) -> Self {
        Self { registry, config }
    }

    /// Bind the configured address and start accepting connections.
    pub async fn start(self) -> McpResult<ListenerHandle> {
        let shutdown = CancellationToken::new();
        let state = Arc::new(ServerState {
            registry: self.registry,
            sessions: Arc::new(SessionRegistry::new()),
            shutdown: shutdown.clone(),
            service_name: self.config.service_name.clone(),
            max_frame_bytes: self.config.max_frame_bytes,
        });

        let app = Router::new()
            .route("/mcp", get(handle_upgrade))
            .route("/health", get(handle_health))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind(&self.config.addr)
            .await
            .map_err(McpError::Io)?;
        let local_addr = listener.local_addr().map_err(McpError::Io)?;

        tracing::info!("WebSocket transport listening on ws://{local_addr}/mcp");
        tracing::info!("Health check: http://{local_addr}/health");

        let server = tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move { shutdown.cancelled_owned().await })
            .await
        });

        Ok(ListenerHandle {
            local_addr,
            state,
            server,
            shutdown_timeout: self.config.shutdown_timeout,
        })
    }

    /// Serve until Ctrl-C, then stop within the configured shutdown timeout.
    pub async fn run(self) -> McpResult<()> {
        let handle = self.start().await?;

        tokio::signal::ctrl_c().await.map_err(McpError::Io)?;
        tracing::info!("Received interrupt, shutting down");

        let deadline = handle.shutdown_timeout;
        handle.stop(deadline).await
    }
}

/// A running listener.
pub struct ListenerHandle {
    local_addr: SocketAddr,
    state: Arc<ServerState>,
    server: JoinHandle<std::io::Result<()>>,
    shutdown_timeout: Duration,
}

impl ListenerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn sessions(&self) -> Arc<SessionRegistry> {
        self.state.sessions.clone()
    }

    /// Stop accepting, close every tracked session, and wait for the
    /// connection tasks to finish, bounded by `deadline`.
    pub async fn stop(self, deadline: Duration) -> McpResult<()> {
        let started = tokio::time::Instant::now();

        self.state.shutdown.cancel();
        let closing = self.state.sessions.close_all().await;
        tracing::info!("Stopping listener, closing {closing} session(s)");

        let drained = self.state.sessions.wait_drained(deadline).await;
        if let Err(e) = &drained {
            tracing::warn!("{e}; abandoning remaining sessions");
        }

        let remaining = deadline.saturating_sub(started.elapsed());
        let mut server = self.server;
        match tokio::time::timeout(remaining, &mut server).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => tracing::error!("Listener error during shutdown: {e}"),
            Ok(Err(e)) => tracing::error!("Listener task failed: {e}"),
            Err(_) => {
                tracing::warn!("Listener did not stop before the deadline, aborting");
                server.abort();
            }
        }

        tracing::info!("Listener stopped");
        drained
    }
}

async fn handle_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> Response {
    if state.shutdown.is_cancelled() {
        return (StatusCode::SERVICE_UNAVAILABLE, "server shutting down").into_response();
    }

    ws.max_message_size(state.max_frame_bytes)
        .on_upgrade(move |socket| serve_socket(socket, state, peer))
}

/// Health check endpoint, independent of any session.
async fn handle_health(State(state): State<Arc<ServerState>>) -> AxumJson<serde_json::Value> {
    AxumJson(serde_json::json!({
        "service": state.service_name,
        "status": "healthy",
        "timestamp": chrono::Utc::now().timestamp().to_string(),
    }))
}

/// Drive one connection: a reader task feeds frames in arrival order, this
/// loop dispatches them one at a time and writes the responses.
async fn serve_socket(socket: WebSocket, state: Arc<ServerState>, peer: SocketAddr) {
    let session = Session::new(state.registry.clone(), &state.shutdown, Some(peer));
    let id = session.id();
    state.sessions.register(&session).await;
    tracing::info!("Session {id} connected from {peer}");

    let (mut sender, receiver) = socket.split();
    let (frames_tx, mut frames_rx) = mpsc::channel(MAX_PIPELINED_FRAMES);
    let reader = tokio::spawn(read_frames(receiver, frames_tx, session.scope().clone()));

    loop {
        let frame: Vec<u8> = tokio::select! {
            biased;
            _ = session.scope().cancelled() => break,
            frame = frames_rx.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };

        let outcome = tokio::select! {
            biased;
            _ = session.scope().cancelled() => break,
            outcome = session.process_frame(&frame) => outcome,
        };

        match outcome {
            FrameOutcome::Reply(text) => {
                if let Err(e) = sender.send(Message::Text(text)).await {
                    tracing::warn!("Session {id}: failed to write response: {e}");
                    break;
                }
            }
            FrameOutcome::NoReply => {}
            FrameOutcome::Terminate(_) => break,
        }
    }

    session.close().await;
    let _ = sender.send(Message::Close(None)).await;
    let _ = sender.close().await;
    reader.abort();

    state.sessions.remove(id).await;
    tracing::info!("Session {id} disconnected");
}

/// Forward inbound data frames. Cancels the session scope when the peer goes
/// away so in-flight provider calls are abandoned.
///
/// Never waits on the queue: the socket must stay polled while a slow call
/// holds the dispatch loop, or a disconnect would go unnoticed.
async fn read_frames(
    mut receiver: SplitStream<WebSocket>,
    frames: mpsc::Sender<Vec<u8>>,
    scope: CancellationToken,
) {
    loop {
        let msg = tokio::select! {
            _ = scope.cancelled() => return,
            msg = receiver.next() => msg,
        };

        let frame = match msg {
            Some(Ok(Message::Text(text))) => text.into_bytes(),
            Some(Ok(Message::Binary(bytes))) => bytes,
            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
            Some(Ok(Message::Close(_))) | None => {
                tracing::debug!("Peer closed the connection");
                break;
            }
            Some(Err(e)) => {
                tracing::warn!("WebSocket receive error: {e}");
                break;
            }
        };

        match frames.try_send(frame) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(
                    "Peer pipelined more than {MAX_PIPELINED_FRAMES} frames, disconnecting"
                );
                break;
            }
            Err(mpsc::error::TrySendError::Closed(_)) => return,
        }
    }

    scope.cancel();
}
