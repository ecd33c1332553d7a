/// Error types for the real-time session client

use std::time::Duration;

use thiserror::Error;

use crate::realtime::SessionState;

/// Real-time session errors
#[derive(Error, Debug)]
pub enum RealtimeError {
    /// Failed to establish the transport connection
    #[error("Failed to connect to server: {0}")]
    Connection(String),

    /// Authentication failed (invalid auth token)
    #[error("Authentication failed: invalid auth token")]
    AuthenticationFailed,

    /// Handshake did not complete within the connect timeout
    #[error("Connection timeout after {0:?}")]
    ConnectTimeout(Duration),

    /// The server rejected the session configuration
    #[error("Server rejected the configuration: {0}")]
    Configuration(String),

    /// The server reported a fatal recognition error
    #[error("Transcription error: {0}")]
    Transcription(String),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Failed to serialize or parse a control message
    #[error("Failed to serialize message: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Connection closed before the session finished
    #[error("Connection closed unexpectedly")]
    ConnectionClosed,

    /// Invalid configuration detected before any network call
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Reading from the caller's audio source failed
    #[error("Audio source error: {0}")]
    AudioSource(String),

    /// The session cannot start from its current state
    #[error("Session is in state {0:?} and cannot start")]
    InvalidSessionState(SessionState),

    /// The server did not acknowledge audio within the buffer timeout
    #[error("Timed out waiting for audio buffer capacity")]
    BufferAcquireTimeout,

    /// The overall session timeout was exceeded
    #[error("Session timed out")]
    SessionTimeout,

    /// Temporary token generation failed
    #[error("Temporary token request failed: {0}")]
    TempToken(String),

    /// A session task failed in an unexpected way
    #[error("Internal session error: {0}")]
    Internal(String),
}

/// Result type for real-time operations
pub type RealtimeResult<T> = Result<T, RealtimeError>;

impl From<tokio_tungstenite::tungstenite::http::Error> for RealtimeError {
    fn from(err: tokio_tungstenite::tungstenite::http::Error) -> Self {
        RealtimeError::Connection(err.to_string())
    }
}
