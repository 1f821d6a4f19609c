use parking_lot::RwLock;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Events delivered to caller handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A session opened and the desired subscriptions were replayed
    Open,
    /// A server frame, unparsed
    Message(String),
    /// The current session ended
    Close { reason: String },
    /// A recoverable problem worth surfacing, e.g. an undecodable frame
    Error(String),
    /// A reconnect attempt is scheduled after `delay`
    Reconnecting { attempt: u32, delay: Duration },
    /// The caller disconnected; no further reconnects
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Open,
    Message,
    Close,
    Error,
    Reconnecting,
    Stopped,
}

impl StreamEvent {
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Open => EventKind::Open,
            Self::Message(_) => EventKind::Message,
            Self::Close { .. } => EventKind::Close,
            Self::Error(_) => EventKind::Error,
            Self::Reconnecting { .. } => EventKind::Reconnecting,
            Self::Stopped => EventKind::Stopped,
        }
    }
}

pub type EventHandler = Arc<dyn Fn(&StreamEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

struct Registration {
    id: HandlerId,
    kind: Option<EventKind>,
    handler: EventHandler,
}

/// Caller-facing handler table
///
/// Owned by the client, shared with the supervisor, never by a session, so
/// reconnects leave every registration in place. Handlers run on the stream
/// task and must not block. A panicking handler is logged and skipped; the
/// remaining handlers still see the event.
pub struct EventDispatcher {
    handlers: RwLock<Vec<Registration>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("handlers", &self.handler_count())
            .finish()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a handler for one kind of event
    pub fn on<F>(&self, kind: EventKind, handler: F) -> HandlerId
    where
        F: Fn(&StreamEvent) + Send + Sync + 'static,
    {
        self.register(Some(kind), Arc::new(handler))
    }

    /// Register a handler for every event
    pub fn on_any<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&StreamEvent) + Send + Sync + 'static,
    {
        self.register(None, Arc::new(handler))
    }

    /// Remove a handler; returns false if it was not registered
    pub fn off(&self, id: HandlerId) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|r| r.id != id);
        handlers.len() != before
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Deliver an event to every matching handler, in registration order
    pub fn dispatch(&self, event: &StreamEvent) {
        let kind = event.kind();
        // Snapshot so handlers may register or remove handlers while running
        let targets: Vec<EventHandler> = self
            .handlers
            .read()
            .iter()
            .filter(|r| r.kind.map_or(true, |k| k == kind))
            .map(|r| Arc::clone(&r.handler))
            .collect();

        for handler in targets {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| handler(event))) {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                warn!(?kind, %message, "event handler panicked");
            }
        }
    }

    fn register(&self, kind: Option<EventKind>, handler: EventHandler) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.write().push(Registration { id, kind, handler });
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_dispatch_filters_by_kind() {
        let dispatcher = EventDispatcher::new();
        let messages = Arc::new(AtomicUsize::new(0));
        let all = Arc::new(AtomicUsize::new(0));

        let m = Arc::clone(&messages);
        dispatcher.on(EventKind::Message, move |_| {
            m.fetch_add(1, Ordering::SeqCst);
        });
        let a = Arc::clone(&all);
        dispatcher.on_any(move |_| {
            a.fetch_add(1, Ordering::SeqCst);
        });

        dispatcher.dispatch(&StreamEvent::Open);
        dispatcher.dispatch(&StreamEvent::Message("{}".to_string()));

        assert_eq!(messages.load(Ordering::SeqCst), 1);
        assert_eq!(all.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_off_removes_handler() {
        let dispatcher = EventDispatcher::new();
        let id = dispatcher.on(EventKind::Close, |_| {});
        assert_eq!(dispatcher.handler_count(), 1);
        assert!(dispatcher.off(id));
        assert!(!dispatcher.off(id));
        assert_eq!(dispatcher.handler_count(), 0);
    }

    #[test]
    fn test_handler_can_register_during_dispatch() {
        let dispatcher = Arc::new(EventDispatcher::new());
        let inner = Arc::clone(&dispatcher);
        dispatcher.on(EventKind::Open, move |_| {
            inner.on(EventKind::Stopped, |_| {});
        });

        dispatcher.dispatch(&StreamEvent::Open);
        assert_eq!(dispatcher.handler_count(), 2);
    }

    #[test]
    fn test_panicking_handler_does_not_starve_others() {
        let dispatcher = EventDispatcher::new();
        let delivered = Arc::new(AtomicUsize::new(0));

        dispatcher.on(EventKind::Message, |_| panic!("boom"));
        let d = Arc::clone(&delivered);
        dispatcher.on(EventKind::Message, move |_| {
            d.fetch_add(1, Ordering::SeqCst);
        });

        dispatcher.dispatch(&StreamEvent::Message("{}".to_string()));
        dispatcher.dispatch(&StreamEvent::Message("{}".to_string()));
        assert_eq!(delivered.load(Ordering::SeqCst), 2);
    }
}
