use dls_targets::COMMAND_NAME;

use crate::defaults::default_server_args;

/// Settings consulted every time the worker is started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfiguration {
    /// Whether the worker should run.
    pub enabled: bool,
    /// Raw `server_path` value, including the "unset" sentinel forms.
    pub server_path_override: Option<String>,
    /// Ordered arguments passed to the worker.
    pub server_args: Vec<String>,
}

impl ServerConfiguration {
    /// Returns the override only when it names something other than the
    /// bare command, which stands for "use default resolution".
    #[must_use]
    pub fn explicit_override(&self) -> Option<&str> {
        self.server_path_override
            .as_deref()
            .filter(|path| !path.is_empty() && *path != COMMAND_NAME)
    }

    /// Configuration with the worker disabled.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Replaces the server path override.
    #[must_use]
    pub fn with_server_path(mut self, path: impl Into<String>) -> Self {
        self.server_path_override = Some(path.into());
        self
    }

    /// Replaces the worker arguments.
    #[must_use]
    pub fn with_server_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.server_args = args.into_iter().map(Into::into).collect();
        self
    }
}

impl Default for ServerConfiguration {
    fn default() -> Self {
        Self {
            enabled: true,
            server_path_override: None,
            server_args: default_server_args(),
        }
    }
}
