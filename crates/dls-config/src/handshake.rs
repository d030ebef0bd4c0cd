use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Start handshake performed once the worker process has been spawned.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum HandshakeMode {
    /// LSP `initialize`/`initialized` exchange over header-framed JSON-RPC.
    #[default]
    Lsp,
    /// The worker counts as started as soon as it is spawned and alive.
    None,
}

/// Errors encountered while parsing a [`HandshakeMode`] from text.
pub type HandshakeModeParseError = strum::ParseError;
