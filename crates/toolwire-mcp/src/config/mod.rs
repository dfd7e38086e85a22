//! Configuration loading and resolution.
//!
//! Every setting resolves as: explicit CLI value > environment variable >
//! built-in default.

use std::time::Duration;

pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_SERVICE_NAME: &str = "toolwire";
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_FRAME_BYTES: usize = 10 * 1024 * 1024;

pub const ENV_ADDR: &str = "TOOLWIRE_ADDR";
pub const ENV_SERVICE_NAME: &str = "TOOLWIRE_SERVICE_NAME";
pub const ENV_SHUTDOWN_TIMEOUT_SECS: &str = "TOOLWIRE_SHUTDOWN_TIMEOUT_SECS";
pub const ENV_MAX_FRAME_BYTES: &str = "TOOLWIRE_MAX_FRAME_BYTES";

/// Listener settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Bind address (host:port).
    pub addr: String,
    /// Reported by `/health`.
    pub service_name: String,
    /// Upper bound on how long `stop` waits for sessions to drain.
    pub shutdown_timeout: Duration,
    /// Largest accepted WebSocket message.
    pub max_frame_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            shutdown_timeout: Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

/// Overrides supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub addr: Option<String>,
    pub service_name: Option<String>,
    pub shutdown_timeout_secs: Option<u64>,
    pub max_frame_bytes: Option<usize>,
}

impl ServerConfig {
    /// Resolve against the process environment.
    pub fn resolve(overrides: ConfigOverrides) -> Self {
        Self::resolve_with(overrides, |key| std::env::var(key).ok())
    }

    /// Resolve with an explicit environment lookup.
    pub fn resolve_with(overrides: ConfigOverrides, env: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let addr = overrides
            .addr
            .or_else(|| env(ENV_ADDR))
            .unwrap_or(defaults.addr);

        let service_name = overrides
            .service_name
            .or_else(|| env(ENV_SERVICE_NAME))
            .unwrap_or(defaults.service_name);

        let shutdown_timeout = overrides
            .shutdown_timeout_secs
            .or_else(|| parse_env(&env, ENV_SHUTDOWN_TIMEOUT_SECS))
            .map(Duration::from_secs)
            .unwrap_or(defaults.shutdown_timeout);

        let max_frame_bytes = overrides
            .max_frame_bytes
            .or_else(|| parse_env(&env, ENV_MAX_FRAME_BYTES))
            .unwrap_or(defaults.max_frame_bytes);

        Self {
            addr,
            service_name,
            shutdown_timeout,
            max_frame_bytes,
        }
    }
}

fn parse_env<T: std::str::FromStr>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = env(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring {key}={raw}: not a valid number");
            None
        }
    }
}
