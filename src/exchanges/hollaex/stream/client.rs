use super::auth::AuthQueryBuilder;
use super::dispatcher::{EventDispatcher, EventKind, HandlerId, StreamEvent};
use super::supervisor::{Command, ConnectionState, ConnectionSupervisor};
use super::topic::SubscriptionKey;
use crate::core::config::StreamConfig;
use crate::core::errors::HollaexError;
use crate::core::kernel::{TungsteniteConnector, WsConnector};
use crate::exchanges::hollaex::VENUE;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

/// Caller-facing handle to the HollaEx stream
///
/// Spawns the supervisor task on creation, so it must be built inside a tokio
/// runtime. The event dispatcher lives as long as the client; handlers
/// registered on it survive every reconnect. Dropping the client stops the
/// stream.
///
/// # Example
///
/// ```no_run
/// use hollaex::core::config::StreamConfig;
/// use hollaex::exchanges::hollaex::stream::{AuthQueryBuilder, EventKind, StreamClient};
///
/// # async fn run() -> Result<(), hollaex::core::errors::HollaexError> {
/// let auth = AuthQueryBuilder::new("wss://api.hollaex.com/stream".to_string());
/// let client = StreamClient::new(auth, StreamConfig::default());
/// client.on(EventKind::Message, |event| println!("{:?}", event));
///
/// client.connect(&["orderbook:xht-usdt", "trade"]).await?;
/// client.subscribe(&["orderbook:btc-usdt"]).await?;
/// # Ok(())
/// # }
/// ```
pub struct StreamClient {
    commands: mpsc::Sender<Command>,
    dispatcher: Arc<EventDispatcher>,
    state: watch::Receiver<ConnectionState>,
    _task: JoinHandle<()>,
}

impl std::fmt::Debug for StreamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamClient")
            .field("state", &self.state())
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

impl StreamClient {
    /// Client over the real websocket transport
    pub fn new(auth: AuthQueryBuilder, config: StreamConfig) -> Self {
        let connector = TungsteniteConnector::new(VENUE.to_string(), config.connect_timeout);
        Self::with_connector(auth, config, Arc::new(connector))
    }

    /// Client over a caller-supplied transport
    pub fn with_connector(
        auth: AuthQueryBuilder,
        config: StreamConfig,
        connector: Arc<dyn WsConnector>,
    ) -> Self {
        let (commands, commands_rx) = mpsc::channel(config.command_buffer.max(1));
        let (state_tx, state) = watch::channel(ConnectionState::Idle);
        let dispatcher = Arc::new(EventDispatcher::new());

        let supervisor = ConnectionSupervisor::new(
            auth,
            config,
            connector,
            Arc::clone(&dispatcher),
            state_tx,
            commands_rx,
        );
        let task = tokio::spawn(supervisor.run());

        Self {
            commands,
            dispatcher,
            state,
            _task: task,
        }
    }

    /// The long-lived handler table
    pub fn events(&self) -> &Arc<EventDispatcher> {
        &self.dispatcher
    }

    pub fn on<F>(&self, kind: EventKind, handler: F) -> HandlerId
    where
        F: Fn(&StreamEvent) + Send + Sync + 'static,
    {
        self.dispatcher.on(kind, handler)
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// A receiver that observes every state change
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Wait until the stream reaches `target`
    pub async fn wait_for_state(&self, target: ConnectionState) -> Result<(), HollaexError> {
        let mut state = self.state.clone();
        state
            .wait_for(|current| *current == target)
            .await
            .map(|_| ())
            .map_err(|_| HollaexError::Closed)
    }

    /// Open the stream with `topics` as the initial desired set
    ///
    /// Valid from `Idle` or `Stopped`. Returns once the first attempt has
    /// settled: the stream is open, or the failure was handed to the reconnect
    /// loop.
    pub async fn connect<S: AsRef<str>>(&self, topics: &[S]) -> Result<(), HollaexError> {
        let topics = to_owned(topics);
        self.request(|reply| Command::Connect { topics, reply })
            .await?
    }

    /// Stop the stream; no reconnect is attempted afterwards
    pub async fn disconnect(&self) -> Result<(), HollaexError> {
        self.request(|reply| Command::Disconnect { reply }).await?
    }

    /// Add topics to the desired set; requires an open stream
    pub async fn subscribe<S: AsRef<str>>(&self, topics: &[S]) -> Result<(), HollaexError> {
        let topics = to_owned(topics);
        self.request(|reply| Command::Subscribe { topics, reply })
            .await?
    }

    /// Remove topics from the desired set; requires an open stream
    pub async fn unsubscribe<S: AsRef<str>>(&self, topics: &[S]) -> Result<(), HollaexError> {
        let topics = to_owned(topics);
        self.request(|reply| Command::Unsubscribe { topics, reply })
            .await?
    }

    pub async fn desired_subscriptions(&self) -> Result<Vec<SubscriptionKey>, HollaexError> {
        self.request(|reply| Command::Desired { reply }).await
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, HollaexError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| HollaexError::Closed)?;
        response.await.map_err(|_| HollaexError::Closed)
    }
}

fn to_owned<S: AsRef<str>>(topics: &[S]) -> Vec<String> {
    topics.iter().map(|t| t.as_ref().to_string()).collect()
}
