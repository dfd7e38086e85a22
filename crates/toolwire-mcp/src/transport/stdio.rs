//! Stdio transport: one session over newline-delimited stdin/stdout.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::provider::ProviderRegistry;
use crate::session::{FrameOutcome, Session};
use crate::types::{McpError, McpResult};

/// Stdio transport for desktop MCP clients.
pub struct StdioTransport {
    registry: Arc<ProviderRegistry>,
    shutdown: CancellationToken,
}

impl StdioTransport {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self {
            registry,
            shutdown: CancellationToken::new(),
        }
    }

    /// Token that ends the session when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run the transport loop, reading from stdin, writes to stdout.
    pub async fn run(&self) -> McpResult<()> {
        self.run_with(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Run the session loop over any line-oriented byte stream.
    pub async fn run_with<R, W>(&self, reader: R, mut writer: W) -> McpResult<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let session = Session::new(self.registry.clone(), &self.shutdown, None);
        let mut reader = BufReader::new(reader);
        let mut line = Vec::new();

        tracing::info!("Stdio transport started (session {})", session.id());

        let result = loop {
            line.clear();
            let bytes_read = tokio::select! {
                _ = session.scope().cancelled() => {
                    tracing::info!("Shutdown requested, closing stdio session");
                    break Ok(());
                }
                read = reader.read_until(b'\n', &mut line) => match read {
                    Ok(n) => n,
                    Err(e) => break Err(McpError::Io(e)),
                },
            };

            if bytes_read == 0 {
                tracing::info!("EOF on stdin, shutting down");
                break Ok(());
            }

            let frame = line.trim_ascii();
            if frame.is_empty() {
                continue;
            }

            match session.process_frame(frame).await {
                FrameOutcome::Reply(text) => {
                    if let Err(e) = write_line(&mut writer, &text).await {
                        break Err(e);
                    }
                }
                FrameOutcome::NoReply => {}
                FrameOutcome::Terminate(e) => {
                    tracing::warn!("Closing stdio session: {e}");
                    break Ok(());
                }
            }
        };

        session.close().await;
        result
    }
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, text: &str) -> McpResult<()> {
    writer.write_all(text.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
