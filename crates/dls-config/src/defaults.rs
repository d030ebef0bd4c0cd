use camino::Utf8PathBuf;

use crate::handshake::HandshakeMode;
use crate::logging::LogFormat;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Arguments passed to the worker when none are configured.
pub const DEFAULT_SERVER_ARGS: &[&str] = &["lsp"];

/// Directory, relative to the working directory, holding bundled binaries.
pub const DEFAULT_RESOURCES_DIR: &str = "resources";

/// Upper bound on spawning the worker and completing its start handshake.
pub const DEFAULT_START_TIMEOUT_MS: u64 = 10_000;

/// Grace period granted to the worker to exit before it is killed.
pub const DEFAULT_STOP_TIMEOUT_MS: u64 = 2_000;

/// Extra pause between the stop and start phases of a restart.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 0;

/// Default log filter expression used by the binaries.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
#[must_use]
pub fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Default start handshake.
#[must_use]
pub fn default_handshake() -> HandshakeMode {
    HandshakeMode::Lsp
}

/// Owned copy of [`DEFAULT_SERVER_ARGS`].
#[must_use]
pub fn default_server_args() -> Vec<String> {
    DEFAULT_SERVER_ARGS
        .iter()
        .map(|arg| (*arg).to_owned())
        .collect()
}

/// Default directory searched for bundled worker binaries.
#[must_use]
pub fn default_resources_dir() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_RESOURCES_DIR)
}
