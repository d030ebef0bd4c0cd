//! Where the supervisor reads its per-start configuration from.

use std::ffi::OsString;
use std::sync::{Arc, PoisonError, RwLock};

use dls_config::{Config, ServerConfiguration};
use thiserror::Error;

/// Error raised when configuration cannot be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to load configuration: {message}")]
pub struct ConfigSourceError {
    message: String,
}

impl ConfigSourceError {
    /// Wraps a loader failure message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The loader's description of the failure.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}

/// Supplies fresh worker settings on demand.
///
/// The supervisor calls [`ConfigSource::load`] on every start attempt and
/// every toggle, never caching the result.
pub trait ConfigSource: Send + Sync {
    /// Reads the current settings.
    ///
    /// # Errors
    /// Returns an error when the backing store cannot be read or parsed.
    fn load(&self) -> Result<ServerConfiguration, ConfigSourceError>;
}

impl<T> ConfigSource for Arc<T>
where
    T: ConfigSource + ?Sized,
{
    fn load(&self) -> Result<ServerConfiguration, ConfigSourceError> {
        (**self).load()
    }
}

/// In-memory source whose value can be replaced at any time.
///
/// Clones share the same value, so a host keeps one handle for updates while
/// the supervisor reads through another.
#[derive(Debug, Clone, Default)]
pub struct StaticConfigSource {
    shared: Arc<RwLock<ServerConfiguration>>,
}

impl StaticConfigSource {
    /// Creates a source holding `config`.
    #[must_use]
    pub fn new(config: ServerConfiguration) -> Self {
        Self {
            shared: Arc::new(RwLock::new(config)),
        }
    }

    /// Replaces the stored configuration.
    pub fn set(&self, config: ServerConfiguration) {
        *self.shared.write().unwrap_or_else(PoisonError::into_inner) = config;
    }

    /// Flips the `enabled` flag.
    pub fn set_enabled(&self, enabled: bool) {
        self.shared
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .enabled = enabled;
    }

    /// Returns a copy of the stored configuration.
    #[must_use]
    pub fn current(&self) -> ServerConfiguration {
        self.shared
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ConfigSource for StaticConfigSource {
    fn load(&self) -> Result<ServerConfiguration, ConfigSourceError> {
        Ok(self.current())
    }
}

/// Source that re-runs the layered `ortho_config` loader on every read.
///
/// File, environment and command-line layers are all consulted again, so
/// edits to the configuration file take effect on the next start.
#[derive(Debug, Clone)]
pub struct OrthoConfigSource {
    args: Vec<OsString>,
}

impl OrthoConfigSource {
    /// Captures the argument list replayed into the loader.
    #[must_use]
    pub fn new<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl ConfigSource for OrthoConfigSource {
    fn load(&self) -> Result<ServerConfiguration, ConfigSourceError> {
        Config::load_from_args(self.args.clone())
            .map(|config| config.server_configuration())
            .map_err(|error| ConfigSourceError::new(error.to_string()))
    }
}
