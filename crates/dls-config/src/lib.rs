//! Shared configuration for the DLiteScript worker host and provisioning tools.
//!
//! Configuration is layered with `ortho_config`: built-in defaults, then a
//! TOML file (`--config-path` or `DLS_CONFIG_PATH`), then `DLS_*` environment
//! variables, then command-line flags. The worker supervisor never caches the
//! result; it reloads through its configuration source on every start so a
//! stop/start cycle always observes current settings.

mod defaults;
mod handshake;
mod logging;
mod server;

use std::ffi::OsString;
use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_RESOURCES_DIR, DEFAULT_SERVER_ARGS, DEFAULT_SETTLE_DELAY_MS,
    DEFAULT_START_TIMEOUT_MS, DEFAULT_STOP_TIMEOUT_MS, default_handshake, default_log_filter,
    default_log_filter_string, default_log_format, default_resources_dir, default_server_args,
};
pub use handshake::{HandshakeMode, HandshakeModeParseError};
pub use logging::{LogFormat, LogFormatParseError};
pub use server::ServerConfiguration;

/// Result type returned by the layered loader.
pub type LoadResult = Result<Config, Arc<OrthoError>>;

/// Resolved configuration for the worker host.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "DLS")]
pub struct Config {
    /// Whether the worker should run at all.
    #[ortho_config(default = true)]
    pub enabled: bool,
    /// Explicit worker executable; `dlitescript` or empty means "resolve".
    #[serde(default)]
    pub server_path: Option<String>,
    /// Arguments passed to the worker; `["lsp"]` when unset.
    #[serde(default)]
    pub server_args: Option<Vec<String>>,
    /// Directory holding bundled `dlitescript-<platform>` binaries.
    #[ortho_config(default = default_resources_dir())]
    pub resources_dir: Utf8PathBuf,
    /// Start handshake spoken by the stdio transport.
    #[ortho_config(default = default_handshake())]
    pub handshake: HandshakeMode,
    /// Bound on spawn plus handshake, in milliseconds.
    #[ortho_config(default = DEFAULT_START_TIMEOUT_MS)]
    pub start_timeout_ms: u64,
    /// Grace period before a stopping worker is killed, in milliseconds.
    #[ortho_config(default = DEFAULT_STOP_TIMEOUT_MS)]
    pub stop_timeout_ms: u64,
    /// Minimum pause between stop and start during a restart, in milliseconds.
    #[ortho_config(default = DEFAULT_SETTLE_DELAY_MS)]
    pub settle_delay_ms: u64,
    /// `tracing` filter expression.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Telemetry output format.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: true,
            server_path: None,
            server_args: None,
            resources_dir: default_resources_dir(),
            handshake: default_handshake(),
            start_timeout_ms: DEFAULT_START_TIMEOUT_MS,
            stop_timeout_ms: DEFAULT_STOP_TIMEOUT_MS,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Runs the layered loader over an explicit argument list.
    ///
    /// The first element is treated as the program name, as with
    /// [`std::env::args_os`].
    pub fn load_from_args<I, T>(args: I) -> LoadResult
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as OrthoConfig>::load_from_iter(args)
    }

    /// Projects the fields the supervisor consults on every start.
    #[must_use]
    pub fn server_configuration(&self) -> ServerConfiguration {
        ServerConfiguration {
            enabled: self.enabled,
            server_path_override: self.server_path.clone(),
            server_args: self
                .server_args
                .clone()
                .unwrap_or_else(default_server_args),
        }
    }

    /// Directory holding bundled worker binaries.
    #[must_use]
    pub fn resources_dir(&self) -> &Utf8Path {
        self.resources_dir.as_path()
    }

    /// Start handshake mode.
    #[must_use]
    pub const fn handshake(&self) -> HandshakeMode {
        self.handshake
    }

    /// Bound on spawn plus handshake.
    #[must_use]
    pub const fn start_timeout(&self) -> Duration {
        Duration::from_millis(self.start_timeout_ms)
    }

    /// Grace period for graceful shutdown.
    #[must_use]
    pub const fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    /// Settle delay applied inside a restart.
    #[must_use]
    pub const fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
