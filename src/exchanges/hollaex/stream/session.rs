use crate::core::config::StreamConfig;
use crate::core::errors::HollaexError;
use crate::core::kernel::{WsCodec, WsConnection, WsConnector};
use crate::exchanges::hollaex::codec::{HollaexCodec, HollaexWsMessage};
use crate::exchanges::hollaex::stream::registry::WireOp;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, instrument, trace, warn};

pub(crate) type SessionId = u64;

/// Floor for the ping interval and pong timeout
const MIN_HEARTBEAT_PERIOD: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub(crate) enum SessionEvent {
    Opened,
    Frame(String),
    Undecodable(String),
    Closed { reason: String },
}

/// A session event tagged with the session that produced it
#[derive(Debug)]
pub(crate) struct SessionSignal {
    pub session_id: SessionId,
    pub event: SessionEvent,
}

#[derive(Debug)]
enum SessionCommand {
    Send(Message),
    Close,
}

#[derive(Debug, Clone, Copy)]
struct Heartbeat {
    ping_interval: Duration,
    pong_timeout: Duration,
}

/// Handle to one physical connection attempt
///
/// The session runs on its own task. It reports `Opened`, every inbound frame
/// and finally `Closed` through the supervisor's signal channel, unless the
/// supervisor closed it first, in which case it exits silently. Dropping the
/// handle without calling [`close`](Self::close) aborts the task.
pub(crate) struct SessionHandle {
    id: SessionId,
    commands: mpsc::UnboundedSender<SessionCommand>,
    task: Option<JoinHandle<()>>,
}

impl SessionHandle {
    pub(crate) fn spawn(
        id: SessionId,
        url: String,
        connector: Arc<dyn WsConnector>,
        config: &StreamConfig,
        signals: mpsc::Sender<SessionSignal>,
    ) -> Self {
        let (commands, commands_rx) = mpsc::unbounded_channel();
        let heartbeat = Heartbeat {
            ping_interval: config.ping_interval.max(MIN_HEARTBEAT_PERIOD),
            pong_timeout: config.pong_timeout.max(MIN_HEARTBEAT_PERIOD),
        };
        let task = tokio::spawn(run(id, url, connector, heartbeat, commands_rx, signals));

        Self {
            id,
            commands,
            task: Some(task),
        }
    }

    pub(crate) const fn id(&self) -> SessionId {
        self.id
    }

    /// Queue one wire operation for the socket
    pub(crate) fn send(&self, op: &WireOp) -> Result<(), HollaexError> {
        let message = HollaexCodec::new().encode_op(op)?;
        self.commands
            .send(SessionCommand::Send(message))
            .map_err(|_| HollaexError::NetworkError("Session already closed".to_string()))
    }

    /// Ask the session to close its socket and exit
    pub(crate) fn close(mut self) {
        if self.commands.send(SessionCommand::Close).is_ok() {
            // let the task finish the close handshake on its own
            self.task = None;
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn signal(signals: &mpsc::Sender<SessionSignal>, session_id: SessionId, event: SessionEvent) {
    if signals
        .send(SessionSignal { session_id, event })
        .await
        .is_err()
    {
        trace!(session = session_id, "supervisor gone, dropping session event");
    }
}

/// Reports `Closed` when the session future is dropped, by a panic or an
/// abort, before it reported an exit of its own
struct ExitGuard {
    id: SessionId,
    signals: mpsc::Sender<SessionSignal>,
    armed: bool,
}

impl ExitGuard {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        warn!(session = self.id, "session task ended without reporting");
        let _ = self.signals.try_send(SessionSignal {
            session_id: self.id,
            event: SessionEvent::Closed {
                reason: "session task ended unexpectedly".to_string(),
            },
        });
    }
}

/// Drain commands until a close is requested
async fn close_requested(commands: &mut mpsc::UnboundedReceiver<SessionCommand>) {
    while let Some(command) = commands.recv().await {
        if matches!(command, SessionCommand::Close) {
            return;
        }
    }
}

#[instrument(skip_all, fields(session = id))]
async fn run(
    id: SessionId,
    url: String,
    connector: Arc<dyn WsConnector>,
    heartbeat: Heartbeat,
    mut commands: mpsc::UnboundedReceiver<SessionCommand>,
    signals: mpsc::Sender<SessionSignal>,
) {
    let mut guard = ExitGuard {
        id,
        signals: signals.clone(),
        armed: true,
    };

    let connection = tokio::select! {
        result = connector.connect(&url) => result,
        () = close_requested(&mut commands) => {
            debug!("session closed while connecting");
            guard.disarm();
            return;
        }
    };

    let mut connection = match connection {
        Ok(connection) => connection,
        Err(e) => {
            warn!("Failed to open stream: {}", e);
            guard.disarm();
            signal(&signals, id, SessionEvent::Closed { reason: e.to_string() }).await;
            return;
        }
    };

    debug!("stream opened");
    signal(&signals, id, SessionEvent::Opened).await;

    let reason = match pump(id, connection.as_mut(), heartbeat, &mut commands, &signals).await {
        Some(reason) => reason,
        None => {
            guard.disarm();
            if let Err(e) = connection.close().await {
                debug!("close handshake failed: {}", e);
            }
            return;
        }
    };

    debug!(%reason, "stream closed");
    guard.disarm();
    signal(&signals, id, SessionEvent::Closed { reason }).await;
}

/// Drive an open connection
///
/// Returns the failure reason, or `None` when the supervisor asked to close.
async fn pump(
    id: SessionId,
    connection: &mut dyn WsConnection,
    heartbeat: Heartbeat,
    commands: &mut mpsc::UnboundedReceiver<SessionCommand>,
    signals: &mpsc::Sender<SessionSignal>,
) -> Option<String> {
    let codec = HollaexCodec::new();
    let start = Instant::now();
    let mut ping = interval_at(start + heartbeat.ping_interval, heartbeat.ping_interval);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // armed by the first unanswered ping, cleared by any inbound frame
    let mut pong_deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(SessionCommand::Send(message)) => {
                    if let Err(e) = connection.send_raw(message).await {
                        return Some(e.to_string());
                    }
                }
                Some(SessionCommand::Close) | None => return None,
            },

            inbound = connection.next_raw() => {
                let message = match inbound {
                    Some(Ok(message)) => message,
                    Some(Err(e)) => return Some(e.to_string()),
                    None => return Some("stream ended".to_string()),
                };
                pong_deadline = None;

                if let Message::Close(frame) = &message {
                    return Some(frame.as_ref().map_or_else(
                        || "closed by server".to_string(),
                        |f| format!("closed by server: {} {}", u16::from(f.code), f.reason),
                    ));
                }

                match codec.decode_message(message) {
                    Ok(Some(HollaexWsMessage::Frame(text))) => {
                        signal(signals, id, SessionEvent::Frame(text)).await;
                    }
                    Ok(Some(HollaexWsMessage::Pong)) => trace!("pong"),
                    Ok(None) => {}
                    Err(e) => {
                        signal(signals, id, SessionEvent::Undecodable(e.to_string())).await;
                    }
                }
            }

            _ = ping.tick() => {
                let message = match codec.encode_ping() {
                    Ok(message) => message,
                    Err(e) => return Some(e.to_string()),
                };
                if let Err(e) = connection.send_raw(message).await {
                    return Some(e.to_string());
                }
                if pong_deadline.is_none() {
                    pong_deadline = Some(Instant::now() + heartbeat.pong_timeout);
                }
            }

            () = sleep_until(pong_deadline.unwrap_or(start)), if pong_deadline.is_some() => {
                warn!(timeout = ?heartbeat.pong_timeout, "no heartbeat response, tearing down session");
                if let Err(e) = connection.close().await {
                    debug!("close after heartbeat timeout failed: {}", e);
                }
                return Some("heartbeat timeout".to_string());
            }
        }
    }
}
