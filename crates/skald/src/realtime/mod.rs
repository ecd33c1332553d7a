//! Real-time transcription session client
//!
//! Manages one recognition session end-to-end: connect, configure, stream
//! audio, dispatch incremental results to registered handlers, terminate.
//!
//! # Session lifecycle
//!
//! ```text
//! Idle -> Connecting   transport handshake (bounded by connect timeout)
//!      -> Configuring  StartRecognition sent, awaiting acknowledgment
//!      -> Streaming    audio chunks out, transcripts in
//!      -> Draining     EndOfStream sent, awaiting EndOfTranscript
//!      -> Closed       transport released
//! ```
//!
//! An `Errored` absorbing state is reached from any non-terminal state on
//! transport failure, a fatal server `Error` message, or a handler-raised
//! force-end that cannot drain.
//!
//! # Example
//!
//! ```no_run
//! use skald::config::{AudioSettings, TranscriptionConfig};
//! use skald::handlers::HandlerOutcome;
//! use skald::messages::ServerMessageKind;
//! use skald::realtime::RealtimeClient;
//! use skald::settings::ConnectionSettings;
//!
//! #[tokio::main]
//! async fn main() {
//!     let settings = ConnectionSettings::new("wss://rt.api.skald.io/v2")
//!         .with_auth_token("your-token");
//!
//!     let mut client = RealtimeClient::new(settings);
//!     client.add_event_handler(ServerMessageKind::AddTranscript, |msg| {
//!         println!("{}", msg.transcript().unwrap_or_default());
//!         HandlerOutcome::Continue
//!     });
//!
//!     let audio = tokio::fs::File::open("recording.wav").await.unwrap();
//!     let config = TranscriptionConfig::new("en").with_partials();
//!     client
//!         .run(audio, &config, &AudioSettings::default())
//!         .await
//!         .unwrap();
//! }
//! ```

pub mod error;
mod tasks;
mod transport;

pub use error::{RealtimeError, RealtimeResult};

use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::time::Duration;

use serde_json::Value;
use tokio::io::AsyncRead;
use tokio::sync::{Semaphore, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::auth;
use crate::config::{AudioSettings, TranscriptionConfig};
use crate::handlers::{Dispatch, EventHandlerRegistry, HandlerOutcome, MiddlewareOutcome};
use crate::messages::{ClientMessage, ServerMessage, ServerMessageKind};
use crate::settings::ConnectionSettings;

/// Queue depth for outgoing frames awaiting the socket.
const OUTGOING_QUEUE_SIZE: usize = 32;

/// Queue depth for parsed server messages awaiting dispatch.
const INCOMING_QUEUE_SIZE: usize = 100;

/// How long session cleanup waits for a task before aborting it.
const TASK_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifecycle state of a real-time session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session has run yet
    Idle,
    /// Transport handshake in progress
    Connecting,
    /// StartRecognition sent, awaiting RecognitionStarted
    Configuring,
    /// Audio flowing, transcripts arriving
    Streaming,
    /// EndOfStream sent, awaiting EndOfTranscript
    Draining,
    /// Session finished cleanly
    Closed,
    /// Session failed; absorbing state
    Errored,
}

/// Requests a caller can make against a running session.
#[derive(Debug)]
enum ControlRequest {
    Stop,
    UpdateConfig(TranscriptionConfig),
}

/// Cloneable handle for controlling a session from other tasks.
///
/// Obtained from [`RealtimeClient::control`] before the session starts.
/// Requests against a session that is not running are ignored.
#[derive(Debug, Clone)]
pub struct SessionControl {
    tx: mpsc::UnboundedSender<ControlRequest>,
}

impl SessionControl {
    /// Ask the session to stop: the client sends `EndOfStream`
    /// best-effort, drains and closes. Not an error.
    pub fn stop(&self) {
        let _ = self.tx.send(ControlRequest::Stop);
    }

    /// Replace the transcription configuration mid-session.
    ///
    /// This is the only reconfiguration the server accepts after
    /// recognition has started; everything else is frozen.
    pub fn update_config(&self, config: TranscriptionConfig) {
        let _ = self.tx.send(ControlRequest::UpdateConfig(config));
    }
}

/// Client for one real-time recognition session
///
/// Register handlers, then call [`run`](RealtimeClient::run) (or
/// [`run_synchronously`](RealtimeClient::run_synchronously)) with an audio
/// source. One client serves one session at a time; run several clients
/// for parallel sessions.
pub struct RealtimeClient {
    settings: ConnectionSettings,
    registry: EventHandlerRegistry,
    state: SessionState,
    control_tx: mpsc::UnboundedSender<ControlRequest>,
    control_rx: mpsc::UnboundedReceiver<ControlRequest>,
    session_id: Option<String>,
    language_pack_info: Option<Value>,
}

impl RealtimeClient {
    /// Create a client for the given connection settings.
    pub fn new(settings: ConnectionSettings) -> Self {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        Self {
            settings,
            registry: EventHandlerRegistry::new(),
            state: SessionState::Idle,
            control_tx,
            control_rx,
            session_id: None,
            language_pack_info: None,
        }
    }

    /// Append a handler for the given message kind.
    ///
    /// See [`EventHandlerRegistry::add_event_handler`]. Handlers must be
    /// registered before the session starts.
    pub fn add_event_handler<F>(&mut self, kind: ServerMessageKind, handler: F)
    where
        F: FnMut(&ServerMessage) -> HandlerOutcome + Send + 'static,
    {
        self.registry.add_event_handler(kind, handler);
    }

    /// Append a middleware for the given message kind.
    ///
    /// See [`EventHandlerRegistry::add_middleware`].
    pub fn add_middleware<F>(&mut self, kind: ServerMessageKind, middleware: F)
    where
        F: FnMut(&mut ServerMessage) -> MiddlewareOutcome + Send + 'static,
    {
        self.registry.add_middleware(kind, middleware);
    }

    /// Handle for stopping or reconfiguring the session from elsewhere.
    pub fn control(&self) -> SessionControl {
        SessionControl {
            tx: self.control_tx.clone(),
        }
    }

    /// Ask the running session to stop. Convenience for
    /// [`SessionControl::stop`].
    pub fn stop(&self) {
        self.control().stop();
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Server-assigned session id, available once recognition started.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Language pack details from the RecognitionStarted message, if the
    /// server sent any.
    pub fn language_pack_info(&self) -> Option<&Value> {
        self.language_pack_info.as_ref()
    }

    /// Run a recognition session to completion.
    ///
    /// Connects, sends `StartRecognition`, streams the audio source and
    /// dispatches every server message to the registered handlers. Returns
    /// once the server's `EndOfTranscript` arrives (or the drain timeout
    /// expires after a stop/force-end).
    ///
    /// Transport errors are not retried; the caller owns retry policy.
    ///
    /// # Errors
    /// - [`RealtimeError::InvalidConfig`] before any network call if the
    ///   language is blank
    /// - [`RealtimeError::Connection`] / [`RealtimeError::ConnectTimeout`]
    ///   if the handshake fails
    /// - [`RealtimeError::Configuration`] if the server rejects the config
    /// - [`RealtimeError::Transcription`] on a fatal server error message
    pub async fn run<A>(
        &mut self,
        audio: A,
        config: &TranscriptionConfig,
        audio_settings: &AudioSettings,
    ) -> RealtimeResult<()>
    where
        A: AsyncRead + Send + Unpin + 'static,
    {
        if !matches!(self.state, SessionState::Idle | SessionState::Closed) {
            return Err(RealtimeError::InvalidSessionState(self.state));
        }
        if !config.has_valid_language() {
            return Err(RealtimeError::InvalidConfig(
                "language must not be blank".to_string(),
            ));
        }

        // Stale requests from a previous session must not affect this one
        while self.control_rx.try_recv().is_ok() {}
        self.session_id = None;
        self.language_pack_info = None;

        let result = self.run_inner(audio, config, audio_settings).await;

        match &result {
            Ok(()) => {
                self.state = SessionState::Closed;
                info!("Session closed");
            }
            Err(e) => {
                self.state = SessionState::Errored;
                error!(error = %e, "Session errored");
            }
        }
        result
    }

    /// Run the session on a dedicated runtime, blocking until it finishes.
    ///
    /// With a timeout, the session is cut off once the budget elapses and
    /// [`RealtimeError::SessionTimeout`] is returned.
    pub fn run_synchronously<A>(
        &mut self,
        audio: A,
        config: &TranscriptionConfig,
        audio_settings: &AudioSettings,
        timeout: Option<Duration>,
    ) -> RealtimeResult<()>
    where
        A: AsyncRead + Send + Unpin + 'static,
    {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| RealtimeError::Internal(format!("failed to build runtime: {e}")))?;

        runtime.block_on(async {
            match timeout {
                Some(budget) => {
                    let outcome =
                        tokio::time::timeout(budget, self.run(audio, config, audio_settings))
                            .await;
                    match outcome {
                        Ok(result) => result,
                        Err(_) => {
                            self.state = SessionState::Errored;
                            Err(RealtimeError::SessionTimeout)
                        }
                    }
                }
                None => self.run(audio, config, audio_settings).await,
            }
        })
    }

    async fn run_inner<A>(
        &mut self,
        audio: A,
        config: &TranscriptionConfig,
        audio_settings: &AudioSettings,
    ) -> RealtimeResult<()>
    where
        A: AsyncRead + Send + Unpin + 'static,
    {
        info!(language = %config.language, "Starting recognition session");
        self.state = SessionState::Connecting;

        let bearer_token = self.resolve_token().await?;
        let ws = transport::connect(&self.settings, &config.language, bearer_token.as_deref())
            .await?;

        use futures_util::StreamExt;
        let (writer, reader) = ws.split();

        let (outgoing_tx, outgoing_rx) = mpsc::channel::<Message>(OUTGOING_QUEUE_SIZE);
        let (incoming_tx, mut incoming_rx) = mpsc::channel::<ServerMessage>(INCOMING_QUEUE_SIZE);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (started_tx, started_rx) = oneshot::channel::<()>();
        let (producer_done_tx, mut producer_done_rx) = oneshot::channel::<RealtimeResult<()>>();

        let writer_handle = tokio::spawn(tasks::writer_task(writer, outgoing_rx));
        let reader_handle = tokio::spawn(tasks::reader_task(reader, incoming_tx));

        self.state = SessionState::Configuring;
        let start_message = ClientMessage::start_recognition(&audio_settings.format, config);
        let json = serde_json::to_string(&start_message)?;
        debug!("StartRecognition: {}", json);
        outgoing_tx
            .send(Message::Text(json.into()))
            .await
            .map_err(|_| RealtimeError::ConnectionClosed)?;

        let permits = Arc::new(Semaphore::new(self.settings.message_buffer_size));
        let seq_no = Arc::new(AtomicU64::new(0));

        let producer_handle = {
            let outgoing_tx = outgoing_tx.clone();
            let permits = Arc::clone(&permits);
            let seq_no = Arc::clone(&seq_no);
            let acquire_timeout = self.settings.buffer_acquire_timeout;
            let chunk_size = audio_settings.chunk_size;
            let shutdown_rx = shutdown_rx.clone();
            tokio::spawn(async move {
                let result = tasks::producer_task(
                    audio,
                    outgoing_tx,
                    permits,
                    acquire_timeout,
                    chunk_size,
                    started_rx,
                    shutdown_rx,
                    seq_no,
                )
                .await;
                let _ = producer_done_tx.send(result);
            })
        };

        // Dispatch loop. Borrows of disjoint fields are split up front so
        // the select arms can use them independently.
        let registry = &mut self.registry;
        let control_rx = &mut self.control_rx;
        let state = &mut self.state;
        let session_id = &mut self.session_id;
        let language_pack_info = &mut self.language_pack_info;
        let drain_timeout = self.settings.drain_timeout;

        let mut started_tx = Some(started_tx);
        let mut producer_running = true;
        let mut drain_deadline: Option<Instant> = None;

        let loop_result: RealtimeResult<()> = loop {
            tokio::select! {
                // The producer finished: all audio is out (or shutdown was
                // observed), EndOfStream is queued, begin draining.
                result = &mut producer_done_rx, if producer_running => {
                    producer_running = false;
                    match result {
                        Ok(Ok(())) => {
                            if matches!(*state, SessionState::Streaming) {
                                debug!("Audio exhausted, draining");
                                *state = SessionState::Draining;
                            }
                            drain_deadline = Some(Instant::now() + drain_timeout);
                        }
                        Ok(Err(e)) => break Err(e),
                        Err(_) => {
                            break Err(RealtimeError::Internal(
                                "producer task dropped without a result".to_string(),
                            ));
                        }
                    }
                }

                // Bound the drain phase: if EndOfTranscript never arrives,
                // close anyway.
                _ = sleep_until_opt(drain_deadline), if drain_deadline.is_some() => {
                    warn!("Timed out waiting for EndOfTranscript, closing");
                    break Ok(());
                }

                // Caller requests via a SessionControl handle.
                request = control_rx.recv() => {
                    match request {
                        Some(ControlRequest::Stop) => {
                            info!("Stop requested, draining session");
                            let _ = shutdown_tx.send(true);
                            if matches!(*state, SessionState::Configuring | SessionState::Streaming) {
                                *state = SessionState::Draining;
                            }
                            drain_deadline = Some(Instant::now() + drain_timeout);
                        }
                        Some(ControlRequest::UpdateConfig(new_config)) => {
                            debug!("Sending SetRecognitionConfig");
                            let message = ClientMessage::set_recognition_config(&new_config);
                            let json = match serde_json::to_string(&message) {
                                Ok(json) => json,
                                Err(e) => break Err(RealtimeError::Serialization(e)),
                            };
                            if outgoing_tx.send(Message::Text(json.into())).await.is_err() {
                                break Err(RealtimeError::ConnectionClosed);
                            }
                        }
                        // The client holds a sender, so this cannot close
                        None => {}
                    }
                }

                // Server messages.
                maybe_message = incoming_rx.recv() => {
                    let Some(mut message) = maybe_message else {
                        if matches!(*state, SessionState::Draining) {
                            warn!("Connection closed while draining, treating as end of session");
                            break Ok(());
                        }
                        break Err(RealtimeError::ConnectionClosed);
                    };

                    match registry.dispatch(&mut message) {
                        Dispatch::ForceEnd => {
                            if matches!(message, ServerMessage::EndOfTranscript) {
                                break Ok(());
                            }
                            let _ = shutdown_tx.send(true);
                            *state = SessionState::Draining;
                            drain_deadline = Some(Instant::now() + drain_timeout);
                        }
                        Dispatch::Suppressed => {
                            debug!(kind = %message.kind(), "Message suppressed by middleware");
                        }
                        Dispatch::Continue => match &message {
                            ServerMessage::RecognitionStarted { id, language_pack_info: lpi } => {
                                info!(session_id = ?id, "Recognition started");
                                *session_id = id.clone();
                                *language_pack_info = lpi.clone();
                                *state = SessionState::Streaming;
                                if let Some(tx) = started_tx.take() {
                                    let _ = tx.send(());
                                }
                            }
                            ServerMessage::AudioAdded { .. } => {
                                permits.add_permits(1);
                            }
                            ServerMessage::EndOfTranscript => {
                                debug!("EndOfTranscript received");
                                break Ok(());
                            }
                            ServerMessage::Warning { reason, .. } => {
                                warn!(reason = %reason, "Server warning");
                            }
                            ServerMessage::Info { reason, .. } => {
                                info!(reason = %reason, "Server info");
                            }
                            ServerMessage::Error { error_type, reason } => {
                                let detail = match error_type {
                                    Some(t) => format!("{t}: {reason}"),
                                    None => reason.clone(),
                                };
                                break Err(if matches!(*state, SessionState::Configuring) {
                                    RealtimeError::Configuration(detail)
                                } else {
                                    RealtimeError::Transcription(detail)
                                });
                            }
                            _ => {}
                        },
                    }
                }
            }
        };

        // Teardown, regardless of outcome: wake a blocked producer, close
        // the outgoing queue so the writer closes the socket, then reap
        // the tasks.
        let _ = shutdown_tx.send(true);
        permits.close();
        drop(outgoing_tx);

        join_quietly("producer", producer_handle).await;
        join_quietly("writer", writer_handle).await;
        join_quietly("reader", reader_handle).await;

        loop_result
    }

    /// Resolve the bearer token for this session, exchanging it for a
    /// temporary key when configured to do so.
    async fn resolve_token(&self) -> RealtimeResult<Option<String>> {
        match (&self.settings.auth_token, self.settings.generate_temp_token) {
            (Some(_), true) => Ok(Some(auth::fetch_temp_token(&self.settings, "rt").await?)),
            (Some(token), false) => Ok(Some(token.clone())),
            (None, _) => Ok(None),
        }
    }
}

impl std::fmt::Debug for RealtimeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeClient")
            .field("url", &self.settings.url)
            .field("state", &self.state)
            .finish()
    }
}

/// Sleep until the deadline, or forever if there is none. Paired with a
/// select guard on `deadline.is_some()`.
async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Wait briefly for a session task, aborting it if it does not finish.
async fn join_quietly<T>(name: &'static str, mut handle: JoinHandle<T>) {
    match tokio::time::timeout(TASK_JOIN_TIMEOUT, &mut handle).await {
        Ok(Ok(_)) => debug!("{name} task completed"),
        Ok(Err(e)) => error!("{name} task panicked: {e}"),
        Err(_) => {
            warn!("{name} task did not finish in time, aborting");
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ConnectionSettings;

    fn test_client() -> RealtimeClient {
        RealtimeClient::new(ConnectionSettings::new("wss://rt.example.com/v2"))
    }

    #[test]
    fn test_new_client_is_idle() {
        let client = test_client();
        assert_eq!(client.state(), SessionState::Idle);
        assert_eq!(client.session_id(), None);
        assert!(client.language_pack_info().is_none());
    }

    #[tokio::test]
    async fn test_run_rejects_blank_language() {
        let mut client = test_client();
        let config = TranscriptionConfig::new("   ");

        let err = client
            .run(
                std::io::Cursor::new(Vec::new()),
                &config,
                &AudioSettings::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, RealtimeError::InvalidConfig(_)));
        // Validation failures never start a session
        assert_eq!(client.state(), SessionState::Idle);
    }

    #[test]
    fn test_control_requests_without_session_are_ignored() {
        let client = test_client();
        let control = client.control();

        control.stop();
        control.update_config(TranscriptionConfig::new("en"));
        // Nothing to assert beyond "does not panic": the requests sit in
        // the queue and are drained before the next session starts.
    }

    #[test]
    fn test_handler_registration_counts() {
        let mut client = test_client();
        client.add_event_handler(ServerMessageKind::AddTranscript, |_| {
            HandlerOutcome::Continue
        });
        client.add_event_handler(ServerMessageKind::AddTranscript, |_| {
            HandlerOutcome::Continue
        });
        client.add_middleware(ServerMessageKind::Error, |_| MiddlewareOutcome::Continue);

        assert_eq!(
            client.registry.handler_count(ServerMessageKind::AddTranscript),
            2
        );
        assert_eq!(client.registry.middleware_count(ServerMessageKind::Error), 1);
    }
}
