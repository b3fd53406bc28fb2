//! # Networking Error Types
//!
//! All errors that can occur while running a session. None of them is fatal
//! to the process: the session manager turns each one into a status line,
//! an event log entry and a well-defined state-machine state.

use std::path::PathBuf;

use thiserror::Error;

use crate::transport::{ChannelId, RoomId};

/// Errors raised by the discovery layer or a data channel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Sending on a channel that is not (or no longer) open.
    #[error("channel {0} is not open")]
    ChannelClosed(ChannelId),

    /// No peer is registered under the requested room id.
    #[error("no peer is listening on room {0}")]
    UnknownRoom(RoomId),

    /// The requested room id is already owned by another peer.
    #[error("room id {0} is already taken")]
    RoomTaken(RoomId),

    /// The local peer identity was destroyed.
    #[error("peer identity has been destroyed")]
    IdentityDestroyed,
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors returned by session actions.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Create/join attempted while a session is already active.
    #[error("a session is already active")]
    Busy,

    /// Join attempted without a room id.
    #[error("a room id is required to join")]
    EmptyRoomId,

    /// The action needs an open channel.
    #[error("not connected to a peer")]
    NotConnected,

    /// The discovery layer or channel failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Result type for session actions.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for `EngineConfig`.
    #[error("invalid config syntax: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;
