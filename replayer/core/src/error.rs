//! Error Types
//!
//! A single error enum covers every failure the replay engine can surface.
//! Callers decide the policy per variant:
//!
//! - [`ReplayError::Connection`] is fatal at startup
//! - [`ReplayError::Io`] aborts the current cycle (or stops the receiver)
//! - [`ReplayError::File`] skips the current cycle
//! - [`ReplayError::Encoding`] skips a single line

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Which step of connection establishment failed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectOp {
    /// Binding the listening socket (server role)
    Bind,
    /// Waiting for the single peer (server role)
    Accept,
    /// Connecting to the peer (client role)
    Connect,
}

impl fmt::Display for ConnectOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bind => write!(f, "bind"),
            Self::Accept => write!(f, "accept on"),
            Self::Connect => write!(f, "connect to"),
        }
    }
}

/// Errors produced by the replay engine
#[derive(Debug, Error)]
pub enum ReplayError {
    /// Establishing the TCP connection failed
    #[error("failed to {op} {endpoint}: {source}")]
    Connection {
        /// The step that failed
        op: ConnectOp,
        /// `host:port` the step was aimed at
        endpoint: String,
        /// Underlying socket error
        #[source]
        source: io::Error,
    },

    /// Sending or receiving on an established connection failed
    #[error("{op} failed: {source}")]
    Io {
        /// Short name of the operation (`send`, `receive`, `close`)
        op: &'static str,
        /// Underlying socket error
        #[source]
        source: io::Error,
    },

    /// The recording could not be opened or read
    #[error("cannot read recording {path:?}: {source}")]
    File {
        /// Path of the recording
        path: PathBuf,
        /// Underlying file error
        #[source]
        source: io::Error,
    },

    /// A line could not be decoded as hex
    #[error("invalid hex payload: {0}")]
    Encoding(#[from] hex::FromHexError),
}

impl ReplayError {
    pub(crate) fn io(op: &'static str, source: io::Error) -> Self {
        Self::Io { op, source }
    }

    /// Whether the error only affects a single line
    #[must_use]
    pub fn is_line_local(&self) -> bool {
        matches!(self, Self::Encoding(_))
    }
}

/// Result alias used across the crate
pub type Result<T, E = ReplayError> = std::result::Result<T, E>;
