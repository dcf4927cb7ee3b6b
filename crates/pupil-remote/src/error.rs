// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for the Pupil Remote client

/// Error type a callback handler may return
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias using RemoteError
pub type Result<T> = std::result::Result<T, RemoteError>;

/// Error types for the Pupil Remote client
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// ZMQ communication error
    #[error("ZMQ error: {0}")]
    Zmq(#[from] zmq::Error),

    /// Payload could not be serialized to msgpack
    #[error("Payload encoding error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// Payload could not be decoded from msgpack
    #[error("Payload decoding error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// Handshake with the remote application failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection timeout
    #[error("Connection timeout: {0}")]
    Timeout(String),

    /// Notification is missing its subject
    #[error("Invalid notification: {0}")]
    InvalidNotification(String),

    /// Reply from the command channel could not be interpreted
    #[error("Invalid reply: {0}")]
    InvalidReply(String),

    /// Message from a subscription socket has an unexpected shape
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] pupil_config::ConfigError),

    /// A callback handler failed while events were dispatched
    #[error("Callback for event '{event}' failed: {source}")]
    Callback {
        event: String,
        #[source]
        source: HandlerError,
    },

    /// The communicator was closed
    #[error("Communicator is closed")]
    Closed,

    /// Generic client error
    #[error("Remote error: {0}")]
    Other(String),
}

impl RemoteError {
    /// Check if error is retryable (for reconnection logic)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RemoteError::Zmq(_) | RemoteError::Timeout(_) | RemoteError::ConnectionFailed(_)
        )
    }
}
