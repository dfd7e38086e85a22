//! Toolwire MCP server entry point.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use toolwire_mcp::config::{ConfigOverrides, ServerConfig};
use toolwire_mcp::provider::{CallContext, ProviderRegistry};
use toolwire_mcp::types::InitializeResult;

#[derive(Parser)]
#[command(
    name = "toolwire-mcp",
    about = "MCP server for Toolwire: tool and resource providers over a persistent WebSocket session",
    version
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the WebSocket listener (default).
    Serve {
        /// Listen address (host:port). Also reads TOOLWIRE_ADDR.
        #[arg(long)]
        addr: Option<String>,

        /// Service name reported by /health. Also reads TOOLWIRE_SERVICE_NAME.
        #[arg(long)]
        service_name: Option<String>,

        /// Seconds to wait for sessions to drain on shutdown.
        /// Also reads TOOLWIRE_SHUTDOWN_TIMEOUT_SECS.
        #[arg(long)]
        shutdown_timeout: Option<u64>,

        /// Largest accepted WebSocket message in bytes.
        /// Also reads TOOLWIRE_MAX_FRAME_BYTES.
        #[arg(long)]
        max_frame_bytes: Option<usize>,
    },

    /// Serve a single session over stdin/stdout.
    #[cfg(feature = "stdio")]
    ServeStdio,

    /// Print server capabilities, tools, and resources as JSON.
    Info,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   toolwire-mcp completions bash > ~/.local/share/bash-completion/completions/toolwire-mcp
    ///   toolwire-mcp completions zsh > ~/.zfunc/_toolwire-mcp
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or(Commands::Serve {
        addr: None,
        service_name: None,
        shutdown_timeout: None,
        max_frame_bytes: None,
    }) {
        Commands::Serve {
            addr,
            service_name,
            shutdown_timeout,
            max_frame_bytes,
        } => {
            let config = ServerConfig::resolve(ConfigOverrides {
                addr,
                service_name,
                shutdown_timeout_secs: shutdown_timeout,
                max_frame_bytes,
            });

            let registry = build_registry().await;
            tracing::info!("Toolwire MCP server ({})", config.service_name);
            tracing::info!(
                "Providers: {} tool, {} resource",
                registry.tool_provider_count(),
                registry.resource_provider_count()
            );

            #[cfg(feature = "ws")]
            {
                let transport = toolwire_mcp::transport::WsTransport::new(registry, config);
                transport.run().await?;
            }

            #[cfg(not(feature = "ws"))]
            {
                let _ = (registry, config);
                anyhow::bail!("built without the `ws` feature; use serve-stdio");
            }
        }

        #[cfg(feature = "stdio")]
        Commands::ServeStdio => {
            let registry = std::sync::Arc::new(build_registry().await);
            let transport = toolwire_mcp::transport::StdioTransport::new(registry);

            let shutdown = transport.shutdown_token();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    shutdown.cancel();
                }
            });

            transport.run().await?;
        }

        Commands::Info => {
            let registry = toolwire_mcp::default_registry();
            let ctx = CallContext::detached();
            let capabilities = InitializeResult::default_result();
            let tools = registry.list_all_tools(&ctx).await?;
            let resources = registry.list_all_resources(&ctx).await?;
            let info = serde_json::json!({
                "server": capabilities.server_info,
                "protocol_version": capabilities.protocol_version,
                "capabilities": capabilities.capabilities,
                "tools": tools.iter().map(|t| &t.name).collect::<Vec<_>>(),
                "tool_count": tools.len(),
                "resources": resources.iter().map(|r| &r.uri).collect::<Vec<_>>(),
                "resource_count": resources.len(),
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "toolwire-mcp", &mut std::io::stdout());
        }
    }

    Ok(())
}

/// Built-in providers, with duplicate names reported before serving.
async fn build_registry() -> ProviderRegistry {
    let registry = toolwire_mcp::default_registry();

    match registry.collisions(&CallContext::detached()).await {
        Ok(dupes) => {
            for name in dupes {
                tracing::warn!("Duplicate provider entry {name:?}; the first registered wins");
            }
        }
        Err(e) => tracing::warn!("Could not check providers for duplicates: {e}"),
    }

    registry
}
