//! Client library for the Skald speech recognition service.
//!
//! Two workflows are supported:
//!
//! - **Real-time**: stream audio over a WebSocket session and receive
//!   incremental transcripts through registered handlers
//!   ([`realtime::RealtimeClient`]).
//! - **Batch**: submit a complete file (or fetch URL) over HTTP, poll the
//!   job and fetch the finished transcript ([`batch::BatchClient`]).
//!
//! Connection defaults (auth token, endpoint URLs) can be persisted in a
//! TOML profile file ([`profile::ProfileStore`]) and folded into
//! [`settings::ConnectionSettings`] at startup.

/// Temporary token generation
mod auth;

/// Batch job client
pub mod batch;

/// Transcription configuration values
pub mod config;

/// Event handler registry
pub mod handlers;

/// Wire protocol message types
pub mod messages;

/// Stored connection profiles
pub mod profile;

/// Real-time session client
pub mod realtime;

/// Connection settings
pub mod settings;

/// Utility modules
pub mod utils;

pub use batch::{BatchClient, BatchError};
pub use config::{AudioSettings, BatchTranscriptionConfig, TranscriptionConfig};
pub use handlers::{EventHandlerRegistry, HandlerOutcome, MiddlewareOutcome};
pub use messages::{ServerMessage, ServerMessageKind};
pub use realtime::{RealtimeClient, RealtimeError, SessionState};
pub use settings::ConnectionSettings;

/// Client identification sent to the service with every connection.
pub(crate) fn sdk_tag() -> String {
    format!("rust-{}", env!("CARGO_PKG_VERSION"))
}
