/*
[INPUT]:  Stream configuration, optional signer, caller subscription commands
[OUTPUT]: Session state snapshots and forwarded stream events
[POS]:    WebSocket layer - connection lifecycle, heartbeat, reconnect and replay
[UPDATE]: When changing reconnect policy, heartbeat or subscription replay
*/

use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use reqwest::{Method, Url};
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at, sleep_until};
use tracing::{debug, info, warn};

use super::connection::{Connection, ConnectionEvent};
use super::message::{ClientFrame, Inbound, StreamEvent, log_frame_sent};
use super::registry::SubscriptionRegistry;
use super::topic::Topic;
use crate::auth::{Credentials, RequestSigner};
use crate::http::{ClientConfig, HollaexError, Result};

const EVENT_CHANNEL_CAPACITY: usize = 1024;
const CLOSE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);
const DROP_LOG_LIMIT: usize = 3;

static EVENT_DROP_LOG_COUNT: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Open,
    Closing,
}

#[derive(Debug)]
enum Command {
    Connect(Vec<Topic>),
    Subscribe(Vec<Topic>),
    Unsubscribe(Vec<Topic>),
    Disconnect,
}

/// Handle to one streaming session.
///
/// A background worker owns the socket and all state transitions; this
/// handle only enqueues commands and observes the published state. The
/// worker is spawned by the first [`connect`](Self::connect) and stops when
/// the handle is dropped.
pub struct StreamSession {
    cmd_tx: mpsc::UnboundedSender<Command>,
    state_rx: watch::Receiver<SessionState>,
    events_rx: Option<mpsc::Receiver<StreamEvent>>,
    pending_worker: Mutex<Option<SessionWorker>>,
}

impl fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamSession")
            .field("state", &*self.state_rx.borrow())
            .finish_non_exhaustive()
    }
}

impl StreamSession {
    /// Create a session; `credentials` enable the signed stream URL.
    pub fn new(config: ClientConfig, credentials: Option<Credentials>) -> Result<Self> {
        let signer = match credentials {
            Some(credentials) => {
                credentials.validate()?;
                Some(RequestSigner::new(credentials, config.api_expires_after))
            }
            None => None,
        };
        Self::with_signer(config, signer)
    }

    pub fn with_signer(config: ClientConfig, signer: Option<RequestSigner>) -> Result<Self> {
        config.validate()?;
        let stream_url = config.stream_url()?;

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SessionState::Disconnected);
        let (event_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let worker = SessionWorker {
            config,
            stream_url,
            signer,
            cmd_rx,
            state_tx,
            event_tx,
            registry: SubscriptionRegistry::new(),
            auto_reconnect: false,
            generation: 0,
            connection: None,
            reconnect_at: None,
            heartbeat: None,
            pong_deadline: None,
            close_deadline: None,
        };

        Ok(Self {
            cmd_tx,
            state_rx,
            events_rx: Some(events_rx),
            pending_worker: Mutex::new(Some(worker)),
        })
    }

    /// Receiver for forwarded stream events. Returns `None` after the first call.
    pub fn take_receiver(&mut self) -> Option<mpsc::Receiver<StreamEvent>> {
        self.events_rx.take()
    }

    pub fn state(&self) -> SessionState {
        *self.state_rx.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Open
    }

    /// Watch channel publishing every state transition.
    pub fn state_changes(&self) -> watch::Receiver<SessionState> {
        self.state_rx.clone()
    }

    /// Replace the desired topics and (re)open the socket.
    ///
    /// Unknown topic names are ignored. Auto-reconnect stays on until
    /// [`disconnect`](Self::disconnect). Requires a Tokio runtime.
    pub fn connect<I, T>(&self, topics: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        self.start_worker_if_needed()?;
        self.send_command(Command::Connect(parse_topics(topics)))
    }

    /// Subscribe while open; topics already desired are not sent again.
    pub fn subscribe<I, T>(&self, topics: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        self.ensure_open()?;
        self.send_command(Command::Subscribe(parse_topics(topics)))
    }

    pub fn unsubscribe<I, T>(&self, topics: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        self.ensure_open()?;
        self.send_command(Command::Unsubscribe(parse_topics(topics)))
    }

    /// Close the socket, clear the desired topics and stop reconnecting.
    pub fn disconnect(&self) -> Result<()> {
        self.ensure_open()?;
        self.send_command(Command::Disconnect)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(HollaexError::NotConnected)
        }
    }

    fn send_command(&self, command: Command) -> Result<()> {
        self.cmd_tx
            .send(command)
            .map_err(|_| HollaexError::WebSocket("stream session worker stopped".to_string()))
    }

    fn start_worker_if_needed(&self) -> Result<()> {
        let mut pending = self
            .pending_worker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if pending.is_none() {
            return Ok(());
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            HollaexError::Config("stream session requires a Tokio runtime".to_string())
        })?;

        if let Some(worker) = pending.take() {
            runtime.spawn(worker.run());
        }
        Ok(())
    }
}

fn parse_topics<I, T>(topics: I) -> Vec<Topic>
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    topics
        .into_iter()
        .filter_map(|raw| {
            let raw = raw.as_ref();
            let topic = Topic::parse(raw);
            if topic.is_none() {
                debug!(topic = raw, "unknown stream topic ignored");
            }
            topic
        })
        .collect()
}

struct SessionWorker {
    config: ClientConfig,
    stream_url: Url,
    signer: Option<RequestSigner>,
    cmd_rx: mpsc::UnboundedReceiver<Command>,
    state_tx: watch::Sender<SessionState>,
    event_tx: mpsc::Sender<StreamEvent>,
    registry: SubscriptionRegistry,
    auto_reconnect: bool,
    generation: u64,
    connection: Option<Connection>,
    reconnect_at: Option<Instant>,
    heartbeat: Option<Interval>,
    pong_deadline: Option<Instant>,
    close_deadline: Option<Instant>,
}

impl SessionWorker {
    async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.cmd_rx.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                (generation, event) = next_connection_event(&mut self.connection) => {
                    self.handle_connection_event(generation, event);
                }
                _ = sleep_until_opt(self.reconnect_at) => {
                    self.reconnect_at = None;
                    info!("ws reconnecting");
                    self.open_connection();
                }
                _ = tick_opt(&mut self.heartbeat) => self.send_ping(),
                _ = sleep_until_opt(self.pong_deadline) => {
                    self.pong_deadline = None;
                    self.handle_failure("heartbeat timed out waiting for pong");
                }
                _ = sleep_until_opt(self.close_deadline) => {
                    warn!("ws close did not complete in time; dropping socket");
                    self.handle_closed();
                }
            }
        }

        self.shutdown();
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect(topics) => {
                self.registry.replace(topics);
                self.auto_reconnect = true;
                self.reconnect_at = None;
                self.open_connection();
            }
            Command::Subscribe(topics) => {
                let to_send = self.registry.subscribe(&topics);
                if self.state() == SessionState::Open {
                    for topic in &to_send {
                        self.send_frame(&ClientFrame::subscribe(topic));
                    }
                }
            }
            Command::Unsubscribe(topics) => {
                let to_send = self.registry.unsubscribe(&topics);
                if self.state() == SessionState::Open {
                    for topic in &to_send {
                        self.send_frame(&ClientFrame::unsubscribe(topic));
                    }
                }
            }
            Command::Disconnect => {
                info!("ws disconnect requested");
                self.auto_reconnect = false;
                self.reconnect_at = None;
                self.registry.clear();
                if self.state() == SessionState::Open {
                    self.begin_close();
                } else {
                    self.handle_closed();
                }
            }
        }
    }

    fn handle_connection_event(&mut self, generation: u64, event: ConnectionEvent) {
        if self.connection.as_ref().map(Connection::generation) != Some(generation) {
            debug!(generation, "ws event from superseded connection dropped");
            return;
        }

        match event {
            ConnectionEvent::Opened => self.handle_open(),
            ConnectionEvent::Inbound(Inbound::Pong) => {
                self.pong_deadline = None;
            }
            ConnectionEvent::Inbound(Inbound::Event(event)) => self.forward(event),
            ConnectionEvent::Inbound(Inbound::Ignored) => {}
            ConnectionEvent::Failed(reason) => self.handle_failure(&reason),
            ConnectionEvent::Closed => self.handle_closed(),
        }
    }

    fn open_connection(&mut self) {
        self.teardown();
        self.generation += 1;

        let url = self.signed_stream_url();
        self.set_state(SessionState::Connecting);
        info!(
            generation = self.generation,
            host = self.stream_url.host_str().unwrap_or_default(),
            authenticated = self.signer.is_some(),
            "ws connecting"
        );
        self.connection = Some(Connection::open(self.generation, url.into()));
    }

    fn signed_stream_url(&self) -> Url {
        let mut url = self.stream_url.clone();
        if let Some(signer) = &self.signer {
            let headers = signer.sign_url(&Method::CONNECT, url.path(), None);
            let mut query = url.query_pairs_mut();
            for (name, value) in headers.pairs() {
                query.append_pair(name, &value);
            }
        }
        url
    }

    fn handle_open(&mut self) {
        self.set_state(SessionState::Open);

        let replay = self.registry.replay();
        info!(generation = self.generation, topics = replay.len(), "ws connected");
        for topic in &replay {
            self.send_frame(&ClientFrame::subscribe(topic));
        }

        let period = self.config.ping_interval;
        let mut heartbeat = interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.heartbeat = Some(heartbeat);
        self.pong_deadline = None;
    }

    fn handle_failure(&mut self, reason: &str) {
        match self.state() {
            SessionState::Closing => {
                debug!(reason, "ws failure while closing ignored");
            }
            SessionState::Open => {
                warn!(reason, "ws connection failed; closing");
                self.begin_close();
            }
            SessionState::Connecting | SessionState::Disconnected => {
                warn!(reason, "ws connection attempt failed");
                self.teardown();
                self.set_state(SessionState::Disconnected);
                self.schedule_reconnect();
            }
        }
    }

    fn handle_closed(&mut self) {
        self.teardown();
        self.set_state(SessionState::Disconnected);
        if self.auto_reconnect {
            self.schedule_reconnect();
        } else {
            info!("ws disconnected");
        }
    }

    fn begin_close(&mut self) {
        self.set_state(SessionState::Closing);
        self.heartbeat = None;
        self.pong_deadline = None;
        self.close_deadline = Some(Instant::now() + CLOSE_TIMEOUT);
        if let Some(connection) = self.connection.as_mut() {
            connection.close();
        }
    }

    fn schedule_reconnect(&mut self) {
        if !self.auto_reconnect {
            return;
        }
        let delay = self.config.reconnect_interval;
        info!(delay_ms = delay.as_millis() as u64, "ws reconnect scheduled");
        self.reconnect_at = Some(Instant::now() + delay);
    }

    fn send_ping(&mut self) {
        if self.state() != SessionState::Open {
            return;
        }
        self.send_frame(&ClientFrame::Ping);
        if self.pong_deadline.is_none() {
            self.pong_deadline = Some(Instant::now() + self.config.pong_timeout);
        }
    }

    fn send_frame(&self, frame: &ClientFrame) {
        let Some(connection) = self.connection.as_ref() else {
            return;
        };
        match frame.to_text() {
            Ok(text) => {
                if connection.send_text(text) {
                    log_frame_sent(frame);
                } else {
                    debug!(?frame, "ws frame dropped; socket task stopped");
                }
            }
            Err(err) => warn!(error = %err, "ws frame encode failed"),
        }
    }

    fn forward(&self, event: StreamEvent) {
        if let Err(mpsc::error::TrySendError::Full(_)) = self.event_tx.try_send(event) {
            let count = EVENT_DROP_LOG_COUNT.fetch_add(1, Ordering::Relaxed);
            if count < DROP_LOG_LIMIT {
                warn!(
                    sample_index = count + 1,
                    sample_limit = DROP_LOG_LIMIT,
                    capacity = EVENT_CHANNEL_CAPACITY,
                    "ws event dropped; receiver is not keeping up"
                );
            }
        }
    }

    /// Drop the socket and every timer bound to it.
    fn teardown(&mut self) {
        self.connection = None;
        self.heartbeat = None;
        self.pong_deadline = None;
        self.close_deadline = None;
    }

    fn shutdown(&mut self) {
        self.auto_reconnect = false;
        self.reconnect_at = None;
        if let Some(connection) = self.connection.take() {
            connection.close_detached();
        }
        self.teardown();
        self.set_state(SessionState::Disconnected);
        debug!("ws session worker stopped");
    }

    fn state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    fn set_state(&self, state: SessionState) {
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            debug!(from = ?*current, to = ?state, "ws state change");
            *current = state;
            true
        });
    }
}

async fn next_connection_event(connection: &mut Option<Connection>) -> (u64, ConnectionEvent) {
    match connection {
        Some(connection) => (connection.generation(), connection.next_event().await),
        None => std::future::pending().await,
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn tick_opt(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
