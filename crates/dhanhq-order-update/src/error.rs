/*
[INPUT]:  Error sources (transport, login handshake, frame decoding, update handler, config)
[OUTPUT]: Structured error type with retry and auth hints
[POS]:    Error handling layer - unified error type for the whole crate
[UPDATE]: When adding new failure points to the session lifecycle
*/

use std::fmt;

use thiserror::Error;

/// Stage of the session a timeout fired in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutStage {
    /// Opening the transport connection
    Connect,
    /// Waiting for the next frame
    Idle,
}

impl fmt::Display for TimeoutStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeoutStage::Connect => f.write_str("connect"),
            TimeoutStage::Idle => f.write_str("idle"),
        }
    }
}

/// Main error type for the order update feed
#[derive(Error, Debug)]
pub enum OrderUpdateError {
    /// Transport could not be opened or the login frame could not be sent
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A received frame is not valid JSON
    #[error("Malformed frame ({bytes} bytes): {reason}")]
    MalformedFrame { reason: String, bytes: usize },

    /// Server ended the feed and no further session is allowed
    #[error("Order update stream ended")]
    StreamEnded,

    /// Registered update handler returned an error
    #[error("Update handler failed: {0}")]
    HandlerFault(String),

    /// Transport failed while the session was live
    #[error("WebSocket error: {0}")]
    Transport(String),

    /// Connect or inter-frame timeout
    #[error("Timed out in {stage} stage after {duration_secs}s")]
    Timeout {
        stage: TimeoutStage,
        duration_secs: u64,
    },

    /// Server closed the session before sending anything after login
    #[error("Login rejected: connection closed before any frame was received")]
    LoginRejected,

    /// Reconnect budget used up
    #[error("Gave up after {attempts} reconnect attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl OrderUpdateError {
    /// Check if a new session may be attempted after this error
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            OrderUpdateError::ConnectionFailed(_)
                | OrderUpdateError::Transport(_)
                | OrderUpdateError::Timeout { .. }
                | OrderUpdateError::StreamEnded
        )
    }

    /// Check if error indicates the credentials were refused
    pub fn is_auth_error(&self) -> bool {
        matches!(self, OrderUpdateError::LoginRejected)
    }

    pub(crate) fn malformed(reason: impl fmt::Display, raw_len: usize) -> Self {
        OrderUpdateError::MalformedFrame {
            reason: reason.to_string(),
            bytes: raw_len,
        }
    }
}

/// Result type alias for order update operations
pub type Result<T> = std::result::Result<T, OrderUpdateError>;
