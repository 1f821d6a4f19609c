#![allow(dead_code)]

use async_trait::async_trait;
use hollaex::core::errors::HollaexError;
use hollaex::core::kernel::{WsConnection, WsConnector};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio_tungstenite::tungstenite::Message;

pub const PING: &str = r#"{"op":"ping"}"#;

enum Inbound {
    Frame(Message),
    Fail(String),
    Crash,
}

/// In-memory transport; every successful connect hands a [`MockServer`] to the test
pub struct MockConnector {
    attempts: AtomicUsize,
    fail_next: AtomicUsize,
    urls: Mutex<Vec<String>>,
    gate: Mutex<Option<Arc<Notify>>>,
    servers_tx: mpsc::UnboundedSender<MockServer>,
    servers_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<MockServer>>,
}

impl MockConnector {
    pub fn new() -> Arc<Self> {
        let (servers_tx, servers_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            attempts: AtomicUsize::new(0),
            fail_next: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
            gate: Mutex::new(None),
            servers_tx,
            servers_rx: tokio::sync::Mutex::new(servers_rx),
        })
    }

    /// Refuse the next `n` connection attempts
    pub fn fail_next(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Hold the next connection attempt until the returned gate is notified
    pub fn stall_next(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }

    /// Wait for the next accepted connection
    pub async fn next_server(&self) -> MockServer {
        self.servers_rx
            .lock()
            .await
            .recv()
            .await
            .expect("connector dropped")
    }

    /// An accepted connection, if one is already waiting
    pub async fn try_next_server(&self) -> Option<MockServer> {
        self.servers_rx.lock().await.try_recv().ok()
    }
}

#[async_trait]
impl WsConnector for MockConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn WsConnection>, HollaexError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.to_string());

        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let refuse = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refuse {
            return Err(HollaexError::NetworkError("connection refused".to_string()));
        }

        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));

        let _ = self.servers_tx.send(MockServer {
            url: url.to_string(),
            sent: sent_rx,
            inbound: inbound_tx,
            closed: Arc::clone(&closed),
        });

        Ok(Box::new(MockConnection {
            sent: sent_tx,
            inbound: inbound_rx,
            closed,
        }))
    }
}

struct MockConnection {
    sent: mpsc::UnboundedSender<Message>,
    inbound: mpsc::UnboundedReceiver<Inbound>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl WsConnection for MockConnection {
    async fn send_raw(&mut self, msg: Message) -> Result<(), HollaexError> {
        self.sent
            .send(msg)
            .map_err(|_| HollaexError::NetworkError("peer gone".to_string()))
    }

    async fn next_raw(&mut self) -> Option<Result<Message, HollaexError>> {
        match self.inbound.recv().await? {
            Inbound::Frame(message) => Some(Ok(message)),
            Inbound::Fail(reason) => Some(Err(HollaexError::NetworkError(reason))),
            Inbound::Crash => panic!("transport crashed"),
        }
    }

    async fn close(&mut self) -> Result<(), HollaexError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// The server side of one mock connection
pub struct MockServer {
    pub url: String,
    sent: mpsc::UnboundedReceiver<Message>,
    inbound: mpsc::UnboundedSender<Inbound>,
    closed: Arc<AtomicBool>,
}

fn text_of(message: Message) -> String {
    match message {
        Message::Text(text) => text,
        other => panic!("Expected text frame, got {:?}", other),
    }
}

impl MockServer {
    /// Next frame written by the client, pings included
    pub async fn recv_raw(&mut self) -> Option<String> {
        self.sent.recv().await.map(text_of)
    }

    /// Next non-ping frame written by the client
    pub async fn recv_text(&mut self) -> String {
        loop {
            let text = self.recv_raw().await.expect("client went away");
            if text != PING {
                return text;
            }
        }
    }

    /// Non-ping frames already written, without waiting
    pub fn drain_text(&mut self) -> Vec<String> {
        let mut frames = Vec::new();
        while let Ok(message) = self.sent.try_recv() {
            let text = text_of(message);
            if text != PING {
                frames.push(text);
            }
        }
        frames
    }

    pub fn push_text(&self, text: &str) {
        let _ = self
            .inbound
            .send(Inbound::Frame(Message::Text(text.to_string())));
    }

    pub fn push(&self, message: Message) {
        let _ = self.inbound.send(Inbound::Frame(message));
    }

    /// Make the client's next read fail
    pub fn fail(&self, reason: &str) {
        let _ = self.inbound.send(Inbound::Fail(reason.to_string()));
    }

    /// Make the client's next read panic inside the session task
    pub fn crash(&self) {
        let _ = self.inbound.send(Inbound::Crash);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Answer every ping with a pong until the client goes away
    pub fn spawn_pong_responder(mut self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(text) = self.recv_raw().await {
                if text == PING {
                    self.push_text(r#"{"message":"pong"}"#);
                }
            }
        })
    }
}

pub fn subscribe_frame(key: &str) -> String {
    format!(r#"{{"op":"subscribe","args":["{}"]}}"#, key)
}

pub fn unsubscribe_frame(key: &str) -> String {
    format!(r#"{{"op":"unsubscribe","args":["{}"]}}"#, key)
}

/// Let spawned tasks run; with paused time this only advances the clock a little
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}
