//! Error types for the fallible outer layers.
//!
//! The simulation core never fails; these cover configuration loading and
//! the network layer.

use thiserror::Error;

/// Errors raised while loading or validating a [`crate::SimConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File system errors
    #[error("config file error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing errors
    #[error("config JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A value is out of its meaningful range
    #[error("invalid config value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    #[must_use]
    pub fn invalid<S: Into<String>>(field: &'static str, reason: S) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// A received frame could not be decoded. Always local to the network layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("frame has {actual} bytes, expected {expected}")]
    FrameLength { expected: usize, actual: usize },

    #[error("unknown message type {0}")]
    UnknownType(u8),

    #[error("protocol version {received} not supported (local {local})")]
    Version { local: u8, received: u8 },

    #[error("non-finite value in {field}")]
    NonFinite { field: &'static str },

    #[error("unknown enum code {code} in {field}")]
    BadPayload { field: &'static str, code: i32 },
}

/// Transport-level failures.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown peer {0}")]
    UnknownPeer(u32),

    #[error("transport closed")]
    Closed,
}

/// Result type alias for network operations.
pub type NetResult<T> = std::result::Result<T, TransportError>;
