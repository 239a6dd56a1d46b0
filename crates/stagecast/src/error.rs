//! Error types shared by the presenter core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading a deck from disk.
#[derive(Debug, Error)]
pub enum DeckError {
    /// Neither `deck.yaml` nor `deck.json` exists in the directory.
    #[error("no deck.yaml or deck.json in {0}")]
    MissingManifest(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid deck file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// The deck contains no slides at all.
    #[error("deck {0} has no slides")]
    Empty(String),
}

/// Errors raised while pushing a message to the audience surface.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The remote window or process is gone even though the handle was still marked open.
    #[error("audience surface is no longer reachable")]
    Disconnected,

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("transport failure: {0}")]
    Other(String),
}

/// Errors raised by a host while creating or managing the audience surface.
#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("the host refused to open an audience window: {0}")]
    OpenFailed(String),
}

/// Errors raised by presenter session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unknown deck: {0}")]
    UnknownDeck(String),
}
