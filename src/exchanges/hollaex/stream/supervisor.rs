use super::auth::AuthQueryBuilder;
use super::dispatcher::{EventDispatcher, StreamEvent};
use super::registry::{SubscriptionRegistry, WireOp};
use super::session::{SessionEvent, SessionHandle, SessionId, SessionSignal};
use super::topic::{parse_keys, SubscriptionKey};
use crate::core::config::StreamConfig;
use crate::core::errors::HollaexError;
use crate::core::kernel::WsConnector;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, instrument, trace, warn};

const SIGNAL_BUFFER: usize = 1024;

/// Lifecycle of the logical stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Closing,
    Faulted,
    WaitingToReconnect,
    /// Entered only through an explicit disconnect
    Stopped,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Faulted => "faulted",
            Self::WaitingToReconnect => "waiting_to_reconnect",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

type Reply<T> = oneshot::Sender<Result<T, HollaexError>>;

/// Requests from the caller-facing client
#[derive(Debug)]
pub(crate) enum Command {
    Connect {
        topics: Vec<String>,
        reply: Reply<()>,
    },
    Disconnect {
        reply: Reply<()>,
    },
    Subscribe {
        topics: Vec<String>,
        reply: Reply<()>,
    },
    Unsubscribe {
        topics: Vec<String>,
        reply: Reply<()>,
    },
    Desired {
        reply: oneshot::Sender<Vec<SubscriptionKey>>,
    },
}

/// Owns the registry and at most one session, and drives the state machine
///
/// Runs as a single task; commands, session signals and the reconnect timer
/// are all handled from one `select!` loop, so the desired set is never
/// touched concurrently.
pub(crate) struct ConnectionSupervisor {
    auth: AuthQueryBuilder,
    config: StreamConfig,
    connector: Arc<dyn WsConnector>,
    dispatcher: Arc<EventDispatcher>,
    registry: SubscriptionRegistry,
    state: watch::Sender<ConnectionState>,
    commands: mpsc::Receiver<Command>,
    signals_tx: mpsc::Sender<SessionSignal>,
    signals_rx: mpsc::Receiver<SessionSignal>,
    session: Option<SessionHandle>,
    next_session_id: SessionId,
    /// Bumped on every connect and disconnect
    generation: u64,
    stopped: bool,
    /// Keys to replay when the pending session opens
    replay: Vec<SubscriptionKey>,
    /// Scheduled reconnect and the generation it was armed under
    reconnect_at: Option<(Instant, u64)>,
    attempt: u32,
    pending_connect: Option<Reply<()>>,
}

impl ConnectionSupervisor {
    pub(crate) fn new(
        auth: AuthQueryBuilder,
        config: StreamConfig,
        connector: Arc<dyn WsConnector>,
        dispatcher: Arc<EventDispatcher>,
        state: watch::Sender<ConnectionState>,
        commands: mpsc::Receiver<Command>,
    ) -> Self {
        let (signals_tx, signals_rx) = mpsc::channel(SIGNAL_BUFFER);
        Self {
            auth,
            config,
            connector,
            dispatcher,
            registry: SubscriptionRegistry::new(),
            state,
            commands,
            signals_tx,
            signals_rx,
            session: None,
            next_session_id: 0,
            generation: 0,
            stopped: false,
            replay: Vec::new(),
            reconnect_at: None,
            attempt: 0,
            pending_connect: None,
        }
    }

    pub(crate) async fn run(mut self) {
        loop {
            let reconnect = self.reconnect_at;
            let wake = reconnect.map_or_else(Instant::now, |(at, _)| at);

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        debug!("stream client dropped, shutting down supervisor");
                        self.shutdown();
                        break;
                    }
                },

                Some(signal) = self.signals_rx.recv() => self.handle_signal(signal),

                () = sleep_until(wake), if reconnect.is_some() => {
                    self.reconnect_at = None;
                    if let Some((_, generation)) = reconnect {
                        self.fire_reconnect(generation);
                    }
                }
            }
        }
    }

    fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    fn set_state(&self, next: ConnectionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            trace!(from = %previous, to = %next, "state transition");
        }
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect { topics, reply } => self.connect(topics, reply),
            Command::Disconnect { reply } => {
                let _ = reply.send(self.disconnect());
            }
            Command::Subscribe { topics, reply } => {
                let _ = reply.send(self.subscribe(&topics));
            }
            Command::Unsubscribe { topics, reply } => {
                let _ = reply.send(self.unsubscribe(&topics));
            }
            Command::Desired { reply } => {
                let _ = reply.send(self.registry.desired().to_vec());
            }
        }
    }

    #[instrument(skip(self, topics, reply), fields(generation = self.generation + 1))]
    fn connect(&mut self, topics: Vec<String>, reply: Reply<()>) {
        let state = self.state();
        if !matches!(state, ConnectionState::Idle | ConnectionState::Stopped) {
            let _ = reply.send(Err(HollaexError::ValidationError(format!(
                "stream is already {}",
                state
            ))));
            return;
        }

        self.generation += 1;
        self.stopped = false;
        self.attempt = 0;
        self.reconnect_at = None;
        self.registry.clear();
        self.replay = parse_keys(&topics);
        self.pending_connect = Some(reply);

        info!(topics = self.replay.len(), "connecting stream");
        self.open_session();
    }

    #[instrument(skip(self), fields(generation = self.generation))]
    fn disconnect(&mut self) -> Result<(), HollaexError> {
        let state = self.state();
        if matches!(state, ConnectionState::Idle | ConnectionState::Stopped) {
            return Err(HollaexError::NotConnected);
        }

        self.generation += 1;
        self.stopped = true;
        self.reconnect_at = None;
        self.set_state(ConnectionState::Closing);

        if let Some(session) = self.session.take() {
            session.close();
        }
        if state == ConnectionState::Open {
            self.dispatcher.dispatch(&StreamEvent::Close {
                reason: "disconnected".to_string(),
            });
        }

        self.set_state(ConnectionState::Stopped);
        self.settle_connect(Ok(()));
        info!("stream stopped");
        self.dispatcher.dispatch(&StreamEvent::Stopped);
        Ok(())
    }

    fn subscribe(&mut self, topics: &[String]) -> Result<(), HollaexError> {
        if self.state() != ConnectionState::Open {
            return Err(HollaexError::NotConnected);
        }
        let ops = self.registry.plan_subscribe(topics);
        self.write_ops(&ops);
        Ok(())
    }

    fn unsubscribe(&mut self, topics: &[String]) -> Result<(), HollaexError> {
        if self.state() != ConnectionState::Open {
            return Err(HollaexError::NotConnected);
        }
        let ops = self.registry.plan_unsubscribe(topics);
        self.write_ops(&ops);
        Ok(())
    }

    fn write_ops(&self, ops: &[WireOp]) {
        let Some(session) = &self.session else {
            return;
        };
        for op in ops {
            debug!(session = session.id(), %op, "writing wire op");
            // a lost op is recovered by the replay after the next reconnect
            if let Err(e) = session.send(op) {
                warn!(%op, "Failed to queue wire op: {}", e);
            }
        }
    }

    fn open_session(&mut self) {
        self.set_state(ConnectionState::Connecting);

        let url = match self.auth.build_url() {
            Ok(url) => url,
            Err(e) => {
                self.handle_failure(format!("failed to build stream URL: {}", e));
                return;
            }
        };

        self.next_session_id += 1;
        let id = self.next_session_id;
        debug!(session = id, generation = self.generation, "opening session");
        self.session = Some(SessionHandle::spawn(
            id,
            url,
            Arc::clone(&self.connector),
            &self.config,
            self.signals_tx.clone(),
        ));
    }

    fn handle_signal(&mut self, signal: SessionSignal) {
        let current = self.session.as_ref().map(SessionHandle::id);
        if current != Some(signal.session_id) {
            trace!(session = signal.session_id, "dropping signal from stale session");
            return;
        }

        match signal.event {
            SessionEvent::Opened => self.on_opened(),
            SessionEvent::Frame(text) => self.dispatcher.dispatch(&StreamEvent::Message(text)),
            SessionEvent::Undecodable(reason) => {
                warn!(session = signal.session_id, %reason, "undecodable frame");
                self.dispatcher.dispatch(&StreamEvent::Error(reason));
            }
            SessionEvent::Closed { reason } => self.handle_failure(reason),
        }
    }

    fn on_opened(&mut self) {
        let keys = std::mem::take(&mut self.replay);
        let ops = self.registry.plan_replay(&keys);
        self.write_ops(&ops);

        self.attempt = 0;
        self.set_state(ConnectionState::Open);
        info!(
            generation = self.generation,
            replayed = ops.len(),
            "stream open"
        );
        self.dispatcher.dispatch(&StreamEvent::Open);
        self.settle_connect(Ok(()));
    }

    #[instrument(skip(self), fields(generation = self.generation))]
    fn handle_failure(&mut self, reason: String) {
        let previous = self.state();
        self.session = None;
        self.set_state(ConnectionState::Faulted);
        warn!(%reason, "stream faulted");

        // replay what was live; a failure before open keeps the pending set
        if previous == ConnectionState::Open {
            self.replay = self.registry.desired().to_vec();
        }
        self.dispatcher.dispatch(&StreamEvent::Close {
            reason: reason.clone(),
        });

        if self.stopped {
            self.set_state(ConnectionState::Stopped);
            self.settle_connect(Ok(()));
            return;
        }

        if !self.config.reconnect {
            self.set_state(ConnectionState::Idle);
            self.settle_connect(Err(HollaexError::NetworkError(reason)));
            return;
        }

        self.attempt += 1;
        let delay = self.config.reconnect_interval;
        self.reconnect_at = Some((Instant::now() + delay, self.generation));
        self.set_state(ConnectionState::WaitingToReconnect);
        info!(attempt = self.attempt, ?delay, "reconnect scheduled");
        self.dispatcher.dispatch(&StreamEvent::Reconnecting {
            attempt: self.attempt,
            delay,
        });
        self.settle_connect(Ok(()));
    }

    fn fire_reconnect(&mut self, generation: u64) {
        if generation != self.generation
            || self.stopped
            || self.state() != ConnectionState::WaitingToReconnect
        {
            debug!(
                armed = generation,
                current = self.generation,
                "discarding stale reconnect"
            );
            return;
        }
        debug!(attempt = self.attempt, "reconnecting stream");
        self.open_session();
    }

    fn settle_connect(&mut self, result: Result<(), HollaexError>) {
        if let Some(reply) = self.pending_connect.take() {
            let _ = reply.send(result);
        }
    }

    fn shutdown(&mut self) {
        self.generation += 1;
        self.stopped = true;
        self.reconnect_at = None;
        if let Some(session) = self.session.take() {
            session.close();
        }
        self.set_state(ConnectionState::Stopped);
    }
}
