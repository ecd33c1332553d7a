/// Event handler registry for server messages
///
/// Callers react to a real-time session by registering handlers for
/// particular message kinds before the session starts. Middlewares for a
/// kind run before its handlers and may rewrite the message, suppress it,
/// or end the session; handlers observe the (possibly rewritten) message.
/// Within each group, invocation order is registration order.

use std::collections::HashMap;

use tracing::warn;

use crate::messages::{ServerMessage, ServerMessageKind};

/// What a handler asks the session to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandlerOutcome {
    /// Keep going
    #[default]
    Continue,

    /// Gracefully end the session: stop sending audio, drain the
    /// remaining server messages and close. Not reported as an error.
    ForceEnd,
}

/// What a middleware asks the session to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MiddlewareOutcome {
    /// Keep going
    #[default]
    Continue,

    /// Drop this message: downstream handlers do not see it, and the
    /// session does not act on it. Suppressing an `Error` message keeps
    /// the session alive.
    Suppress,

    /// Gracefully end the session
    ForceEnd,
}

/// Net effect of dispatching one message through the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// All middlewares and handlers ran
    Continue,

    /// A middleware suppressed the message
    Suppressed,

    /// A middleware or handler requested a graceful end
    ForceEnd,
}

/// A callback invoked for each incoming message of a registered kind.
pub type EventHandler = Box<dyn FnMut(&ServerMessage) -> HandlerOutcome + Send>;

/// A callback that may rewrite or suppress a message before handlers run.
pub type Middleware = Box<dyn FnMut(&mut ServerMessage) -> MiddlewareOutcome + Send>;

/// Ordered mapping from message kind to callbacks
///
/// The registry is populated before a session starts; registration during
/// active streaming is unsupported.
///
/// # Example
/// ```
/// use skald::handlers::{EventHandlerRegistry, HandlerOutcome};
/// use skald::messages::ServerMessageKind;
///
/// let mut registry = EventHandlerRegistry::new();
/// registry.add_event_handler(ServerMessageKind::AddTranscript, |msg| {
///     println!("{}", msg.transcript().unwrap_or_default());
///     HandlerOutcome::Continue
/// });
/// ```
#[derive(Default)]
pub struct EventHandlerRegistry {
    handlers: HashMap<ServerMessageKind, Vec<EventHandler>>,
    middlewares: HashMap<ServerMessageKind, Vec<Middleware>>,
}

impl EventHandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler for the given message kind.
    ///
    /// Handlers are not deduplicated; registering a handler twice runs it
    /// twice. Multiple handlers for one kind all run, in registration
    /// order.
    pub fn add_event_handler<F>(&mut self, kind: ServerMessageKind, handler: F)
    where
        F: FnMut(&ServerMessage) -> HandlerOutcome + Send + 'static,
    {
        self.handlers.entry(kind).or_default().push(Box::new(handler));
    }

    /// Append a middleware for the given message kind.
    ///
    /// Middlewares run before handlers and may mutate the message in
    /// place.
    pub fn add_middleware<F>(&mut self, kind: ServerMessageKind, middleware: F)
    where
        F: FnMut(&mut ServerMessage) -> MiddlewareOutcome + Send + 'static,
    {
        self.middlewares
            .entry(kind)
            .or_default()
            .push(Box::new(middleware));
    }

    /// Number of handlers registered for a kind.
    pub fn handler_count(&self, kind: ServerMessageKind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }

    /// Number of middlewares registered for a kind.
    pub fn middleware_count(&self, kind: ServerMessageKind) -> usize {
        self.middlewares.get(&kind).map_or(0, Vec::len)
    }

    /// Run one message through the middlewares and handlers for its kind.
    ///
    /// Order: middlewares in registration order, then handlers in
    /// registration order. The first `Suppress` or `ForceEnd` stops the
    /// chain.
    pub fn dispatch(&mut self, message: &mut ServerMessage) -> Dispatch {
        let kind = message.kind();

        if let Some(middlewares) = self.middlewares.get_mut(&kind) {
            for middleware in middlewares.iter_mut() {
                match middleware(message) {
                    MiddlewareOutcome::Continue => {}
                    MiddlewareOutcome::Suppress => {
                        return Dispatch::Suppressed;
                    }
                    MiddlewareOutcome::ForceEnd => {
                        warn!(%kind, "Session forcefully ended by a middleware");
                        return Dispatch::ForceEnd;
                    }
                }
            }
        }

        if let Some(handlers) = self.handlers.get_mut(&kind) {
            for handler in handlers.iter_mut() {
                match handler(message) {
                    HandlerOutcome::Continue => {}
                    HandlerOutcome::ForceEnd => {
                        warn!(%kind, "Session forcefully ended by an event handler");
                        return Dispatch::ForceEnd;
                    }
                }
            }
        }

        Dispatch::Continue
    }
}

impl std::fmt::Debug for EventHandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHandlerRegistry")
            .field("handlers", &self.handlers.len())
            .field("middlewares", &self.middlewares.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::messages::TranscriptMetadata;

    fn transcript_message(text: &str) -> ServerMessage {
        ServerMessage::AddTranscript {
            metadata: TranscriptMetadata {
                transcript: text.to_string(),
                start_time: 0.0,
                end_time: 1.0,
            },
            results: vec![],
            format: None,
        }
    }

    #[test]
    fn test_handlers_invoked_in_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut registry = EventHandlerRegistry::new();

        for label in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            registry.add_event_handler(ServerMessageKind::AddTranscript, move |_| {
                order.lock().unwrap().push(label);
                HandlerOutcome::Continue
            });
        }

        let mut msg = transcript_message("hello");
        let result = registry.dispatch(&mut msg);

        assert_eq!(result, Dispatch::Continue);
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_handlers_only_run_for_their_kind() {
        let calls = Arc::new(Mutex::new(0));
        let mut registry = EventHandlerRegistry::new();

        let calls_clone = Arc::clone(&calls);
        registry.add_event_handler(ServerMessageKind::AddPartialTranscript, move |_| {
            *calls_clone.lock().unwrap() += 1;
            HandlerOutcome::Continue
        });

        let mut msg = transcript_message("final");
        registry.dispatch(&mut msg);

        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn test_middleware_runs_before_handlers_and_may_mutate() {
        let seen = Arc::new(Mutex::new(String::new()));
        let mut registry = EventHandlerRegistry::new();

        registry.add_middleware(ServerMessageKind::AddTranscript, |msg| {
            if let ServerMessage::AddTranscript { metadata, .. } = msg {
                metadata.transcript = metadata.transcript.to_uppercase();
            }
            MiddlewareOutcome::Continue
        });

        let seen_clone = Arc::clone(&seen);
        registry.add_event_handler(ServerMessageKind::AddTranscript, move |msg| {
            seen_clone
                .lock()
                .unwrap()
                .push_str(msg.transcript().unwrap_or_default());
            HandlerOutcome::Continue
        });

        let mut msg = transcript_message("quiet");
        registry.dispatch(&mut msg);

        assert_eq!(*seen.lock().unwrap(), "QUIET");
    }

    #[test]
    fn test_middleware_suppress_skips_handlers() {
        let calls = Arc::new(Mutex::new(0));
        let mut registry = EventHandlerRegistry::new();

        registry.add_middleware(ServerMessageKind::Error, |_| MiddlewareOutcome::Suppress);

        let calls_clone = Arc::clone(&calls);
        registry.add_event_handler(ServerMessageKind::Error, move |_| {
            *calls_clone.lock().unwrap() += 1;
            HandlerOutcome::Continue
        });

        let mut msg = ServerMessage::Error {
            error_type: None,
            reason: "boom".to_string(),
        };

        assert_eq!(registry.dispatch(&mut msg), Dispatch::Suppressed);
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn test_force_end_stops_the_chain() {
        let calls = Arc::new(Mutex::new(0));
        let mut registry = EventHandlerRegistry::new();

        let calls_first = Arc::clone(&calls);
        registry.add_event_handler(ServerMessageKind::AddTranscript, move |_| {
            *calls_first.lock().unwrap() += 1;
            HandlerOutcome::ForceEnd
        });

        let calls_second = Arc::clone(&calls);
        registry.add_event_handler(ServerMessageKind::AddTranscript, move |_| {
            *calls_second.lock().unwrap() += 1;
            HandlerOutcome::Continue
        });

        let mut msg = transcript_message("stop here");

        assert_eq!(registry.dispatch(&mut msg), Dispatch::ForceEnd);
        // The second handler never ran
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn test_handler_counts() {
        let mut registry = EventHandlerRegistry::new();
        registry.add_event_handler(ServerMessageKind::Info, |_| HandlerOutcome::Continue);
        registry.add_event_handler(ServerMessageKind::Info, |_| HandlerOutcome::Continue);
        registry.add_middleware(ServerMessageKind::Info, |_| MiddlewareOutcome::Continue);

        assert_eq!(registry.handler_count(ServerMessageKind::Info), 2);
        assert_eq!(registry.middleware_count(ServerMessageKind::Info), 1);
        assert_eq!(registry.handler_count(ServerMessageKind::Warning), 0);
    }
}
