use futures_util::Stream;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::backoff::Backoff;
use super::decoder::decode;
use super::envelope::Envelope;
use super::registry::{PendingAcks, SessionGeneration, SubscriptionRegistry};
use super::transport::{Connector, Transport, WsConnector};
use crate::config::ClientConfig;
use crate::error::{Error, Result, TransportError};
use crate::types::{
    AckAction, ClientMessage, Feature, FeatureKind, MarketId, OhlcDuration, Topic,
};

/// Close code used when every client handle has been dropped
const NORMAL_CLOSURE: u16 = 1000;

/// Lifecycle of the client
///
/// `Connecting(g) -> Connected(g) -> (Disconnected(g) -> Connecting(g + 1))* -> Closing -> Closed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting(SessionGeneration),
    Connected(SessionGeneration),
    Disconnected(SessionGeneration),
    Closing,
    Closed,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected(_))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Closing | ConnectionState::Closed)
    }

    /// Generation of the session this state refers to
    pub fn generation(&self) -> Option<SessionGeneration> {
        match self {
            ConnectionState::Connecting(g)
            | ConnectionState::Connected(g)
            | ConnectionState::Disconnected(g) => Some(*g),
            ConnectionState::Closing | ConnectionState::Closed => None,
        }
    }
}

enum Command {
    /// Fire-and-forget frame bound to one session
    Send {
        generation: SessionGeneration,
        message: ClientMessage,
    },
    /// Connection-scoped configuration whose outcome the caller awaits
    Configure {
        generation: SessionGeneration,
        message: ClientMessage,
        reply: oneshot::Sender<Result<SessionGeneration>>,
    },
}

struct Inner {
    registry: SubscriptionRegistry,
    pending: PendingAcks,
    state: ConnectionState,
    close_frame: Option<(u16, String)>,
}

/// State shared by caller handles and the worker task
struct Shared {
    inner: Mutex<Inner>,
    state_tx: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Must be called with the lock held so watchers never see states out of order
    fn publish(&self, inner: &mut Inner, state: ConnectionState) {
        inner.state = state;
        self.state_tx.send_replace(state);
    }

    /// Record a close request; returns `false` if one was already made
    fn request_close(&self, code: u16, reason: &str) -> bool {
        let mut inner = self.lock();
        if inner.state.is_terminal() {
            return false;
        }
        inner.close_frame = Some((code, reason.to_string()));
        self.publish(&mut inner, ConnectionState::Closing);
        drop(inner);

        self.cancel.cancel();
        true
    }
}

/// Ordered sequence of decoded envelopes across all sessions
///
/// Ends once the client is closed. Meant for a single consumer; use
/// [`EnvelopeStream::fan_out`] or [`EnvelopeStream::partition`] to feed
/// several.
#[derive(Debug)]
pub struct EnvelopeStream {
    receiver: mpsc::UnboundedReceiver<Envelope>,
}

impl EnvelopeStream {
    pub(crate) fn new(receiver: mpsc::UnboundedReceiver<Envelope>) -> Self {
        Self { receiver }
    }

    /// Next envelope, `None` once the client is closed and the backlog drained
    pub async fn next_envelope(&mut self) -> Option<Envelope> {
        self.receiver.recv().await
    }

    /// Like [`next_envelope`](Self::next_envelope) but gives up after `timeout`
    pub async fn next_envelope_timeout(&mut self, timeout: Duration) -> Result<Option<Envelope>> {
        tokio::time::timeout(timeout, self.receiver.recv())
            .await
            .map_err(|_| Error::Timeout)
    }

    /// Take an already-buffered envelope without waiting
    pub fn try_next_envelope(&mut self) -> Option<Envelope> {
        self.receiver.try_recv().ok()
    }
}

impl Stream for EnvelopeStream {
    type Item = Envelope;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Envelope>> {
        self.receiver.poll_recv(cx)
    }
}

/// Websocket client that survives disconnects
///
/// Subscriptions are remembered and replayed on every new session. Transport
/// failures are never reported to callers; they only show up as a pause in
/// the [`EnvelopeStream`] and as [`ConnectionState`] changes.
///
/// Cloning the client gives another handle to the same connection. When the
/// last handle is dropped the connection is closed.
///
/// # Example
///
/// ```no_run
/// use funkybit_rs::{ClientConfig, ReconnectingClient, Topic};
///
/// # async fn example() -> funkybit_rs::Result<()> {
/// let config = ClientConfig::default().with_auth_token("token");
/// let (client, mut envelopes) = ReconnectingClient::connect(config)?;
///
/// client.subscribe(Topic::Balances)?;
///
/// while let Some(envelope) = envelopes.next_envelope().await {
///     println!("{:?}", envelope);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ReconnectingClient {
    shared: Arc<Shared>,
    commands: mpsc::UnboundedSender<Command>,
}

impl ReconnectingClient {
    /// Start a client talking to the real server
    ///
    /// Must be called from within a tokio runtime. Connecting happens in the
    /// background; the call only fails if the configured url is unusable.
    pub fn connect(config: ClientConfig) -> Result<(Self, EnvelopeStream)> {
        Self::connect_with(config, WsConnector)
    }

    /// Start a client on top of a custom [`Connector`]
    pub fn connect_with(
        config: ClientConfig,
        connector: impl Connector,
    ) -> Result<(Self, EnvelopeStream)> {
        config.validate()?;

        let (state_tx, _) = watch::channel(ConnectionState::Connecting(1));
        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner {
                registry: SubscriptionRegistry::new(),
                pending: PendingAcks::new(),
                state: ConnectionState::Connecting(1),
                close_frame: None,
            }),
            state_tx,
            cancel: CancellationToken::new(),
        });

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (envelope_tx, envelope_rx) = mpsc::unbounded_channel();

        let worker = Worker {
            backoff: Backoff::new(config.reconnect.policy.clone()),
            config,
            connector: Box::new(connector),
            shared: shared.clone(),
            cancel: shared.cancel.clone(),
            commands: command_rx,
            envelopes: envelope_tx,
        };
        tokio::spawn(worker.run());

        Ok((
            Self {
                shared,
                commands: command_tx,
            },
            EnvelopeStream::new(envelope_rx),
        ))
    }

    /// Add a topic and, when a session is live, request it right away
    ///
    /// The topic is requested again on every future session until
    /// [`unsubscribe`](Self::unsubscribe) is called. Subscribing twice keeps
    /// one registry entry but still forwards the second request.
    pub fn subscribe(&self, topic: Topic) -> Result<()> {
        self.request(topic, AckAction::Subscribe)
    }

    /// Remove a topic and, when a session is live, tell the server
    pub fn unsubscribe(&self, topic: Topic) -> Result<()> {
        self.request(topic, AckAction::Unsubscribe)
    }

    fn request(&self, topic: Topic, action: AckAction) -> Result<()> {
        let mut inner = self.shared.lock();
        match action {
            AckAction::Subscribe => inner.registry.insert(topic.clone()),
            AckAction::Unsubscribe => inner.registry.remove(&topic),
        };

        let state = inner.state;
        match state {
            ConnectionState::Connected(generation) => {
                let message = match action {
                    AckAction::Subscribe => ClientMessage::Subscribe {
                        topic: topic.clone(),
                    },
                    AckAction::Unsubscribe => ClientMessage::Unsubscribe {
                        topic: topic.clone(),
                    },
                };
                inner.pending.record(topic, action);
                self.commands
                    .send(Command::Send {
                        generation,
                        message,
                    })
                    .map_err(|_| Error::Closed)
            }
            ConnectionState::Closing | ConnectionState::Closed => Err(Error::Closed),
            _ => {
                debug!(%topic, %action, "No live session, request deferred to next connect");
                Ok(())
            }
        }
    }

    pub fn subscribe_to_balances(&self) -> Result<()> {
        self.subscribe(Topic::Balances)
    }

    pub fn subscribe_to_my_orders(&self) -> Result<()> {
        self.subscribe(Topic::MyOrders)
    }

    pub fn subscribe_to_my_trades(&self) -> Result<()> {
        self.subscribe(Topic::MyTrades)
    }

    pub fn subscribe_to_order_book(&self, market_id: impl Into<MarketId>) -> Result<()> {
        self.subscribe(Topic::order_book(market_id))
    }

    pub fn subscribe_to_incremental_order_book(
        &self,
        market_id: impl Into<MarketId>,
    ) -> Result<()> {
        self.subscribe(Topic::incremental_order_book(market_id))
    }

    pub fn subscribe_to_prices(
        &self,
        market_id: impl Into<MarketId>,
        duration: OhlcDuration,
    ) -> Result<()> {
        self.subscribe(Topic::prices(market_id, duration))
    }

    pub fn subscribe_to_market_trades(&self, market_id: impl Into<MarketId>) -> Result<()> {
        self.subscribe(Topic::market_trades(market_id))
    }

    pub fn subscribe_to_consumptions(&self, market_id: impl Into<MarketId>) -> Result<()> {
        self.subscribe(Topic::consumption(market_id))
    }

    /// Ask the server to cancel open orders in `market_ids` if this session drops
    ///
    /// Applies to the current session only. It is not remembered and is not
    /// sent again after a reconnect; watch [`state_changes`](Self::state_changes)
    /// and call it again on each new session if the protection should persist.
    ///
    /// Resolves to the generation the directive was written on. Fails with
    /// [`Error::NotConnected`] when there is no live session or the session
    /// ends before the frame is written.
    pub async fn set_cancel_on_disconnect(
        &self,
        market_ids: impl IntoIterator<Item = MarketId>,
    ) -> Result<SessionGeneration> {
        let feature = Feature::CancelOnDisconnect {
            market_ids: market_ids.into_iter().collect(),
        };
        self.configure(ClientMessage::SetFeature { feature }).await
    }

    /// Withdraw the cancel-on-disconnect directive on the current session
    pub async fn clear_cancel_on_disconnect(&self) -> Result<SessionGeneration> {
        self.configure(ClientMessage::UnsetFeature {
            feature: FeatureKind::CancelOnDisconnect,
        })
        .await
    }

    async fn configure(&self, message: ClientMessage) -> Result<SessionGeneration> {
        let (reply_tx, reply_rx) = oneshot::channel();
        {
            let inner = self.shared.lock();
            let generation = match inner.state {
                ConnectionState::Connected(generation) => generation,
                ConnectionState::Closing | ConnectionState::Closed => return Err(Error::Closed),
                _ => return Err(Error::NotConnected),
            };
            self.commands
                .send(Command::Configure {
                    generation,
                    message,
                    reply: reply_tx,
                })
                .map_err(|_| Error::Closed)?;
        }

        reply_rx.await.map_err(|_| Error::Closed)?
    }

    /// Close the connection and stop reconnecting
    ///
    /// Waits until the worker has shut down. Calling it again, from any
    /// handle, is a no-op.
    pub async fn close(&self, code: u16, reason: &str) {
        if self.shared.request_close(code, reason) {
            info!(code, reason, "Closing websocket client");
        }

        let mut states = self.shared.state_tx.subscribe();
        let _ = states
            .wait_for(|state| *state == ConnectionState::Closed)
            .await;
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.lock().state
    }

    /// Receiver that observes every state transition
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    /// Topics that will be requested on the next session, in subscription order
    pub fn subscriptions(&self) -> Vec<Topic> {
        self.shared.lock().registry.topics().to_vec()
    }

    /// Requests on the live session still waiting for an acknowledgment
    pub fn pending_acks(&self) -> Vec<(Topic, AckAction)> {
        self.shared.lock().pending.entries()
    }
}

impl std::fmt::Debug for ReconnectingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconnectingClient")
            .field("state", &self.state())
            .finish()
    }
}

enum Establish {
    Ready(Box<dyn Transport>),
    Failed(TransportError),
    Cancelled,
}

enum SessionEnd {
    Closed,
    Dropped(TransportError),
}

struct Worker {
    config: ClientConfig,
    connector: Box<dyn Connector>,
    shared: Arc<Shared>,
    cancel: CancellationToken,
    commands: mpsc::UnboundedReceiver<Command>,
    envelopes: mpsc::UnboundedSender<Envelope>,
    backoff: Backoff,
}

impl Worker {
    async fn run(mut self) {
        let mut generation: SessionGeneration = 0;
        let mut failed_attempts: u32 = 0;

        loop {
            generation += 1;
            if !self.transition(ConnectionState::Connecting(generation)) {
                break;
            }

            let cause = match self.establish().await {
                Establish::Cancelled => break,
                Establish::Failed(err) => {
                    failed_attempts += 1;
                    warn!(generation, error = %err, attempt = failed_attempts, "Websocket connection failed");
                    err
                }
                Establish::Ready(transport) => {
                    failed_attempts = 0;
                    match self.run_session(generation, transport).await {
                        SessionEnd::Closed => break,
                        SessionEnd::Dropped(err) => {
                            warn!(generation, error = %err, "Websocket session ended");
                            err
                        }
                    }
                }
            };

            self.end_session(generation);

            if let Some(max_attempts) = self.config.reconnect.max_attempts {
                if failed_attempts >= max_attempts {
                    error!(attempts = failed_attempts, "Giving up on websocket reconnection");
                    break;
                }
            }

            let delay = match cause {
                TransportError::Maintenance => self.config.reconnect.maintenance_delay,
                _ => self.backoff.next_delay(),
            };
            debug!(generation, ?delay, "Reconnecting after delay");

            if !self.wait_before_reconnect(delay).await {
                break;
            }
        }

        self.finish();
    }

    /// Move to `state` unless a close was requested
    fn transition(&self, state: ConnectionState) -> bool {
        let mut inner = self.shared.lock();
        if inner.state.is_terminal() {
            return false;
        }
        self.shared.publish(&mut inner, state);
        true
    }

    async fn establish(&self) -> Establish {
        let endpoint = match self.config.websocket_endpoint() {
            Ok(endpoint) => endpoint,
            Err(err) => return Establish::Failed(TransportError::Connect(err.to_string())),
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Establish::Cancelled,
            result = tokio::time::timeout(
                self.config.connect_timeout,
                self.connector.connect(&endpoint),
            ) => match result {
                Ok(Ok(transport)) => Establish::Ready(transport),
                Ok(Err(err)) => Establish::Failed(err),
                Err(_) => Establish::Failed(TransportError::Connect(format!(
                    "timed out after {:?}",
                    self.config.connect_timeout
                ))),
            },
        }
    }

    async fn run_session(
        &mut self,
        generation: SessionGeneration,
        mut transport: Box<dyn Transport>,
    ) -> SessionEnd {
        let resubscribe = {
            let mut inner = self.shared.lock();
            if inner.state.is_terminal() {
                None
            } else {
                self.shared
                    .publish(&mut inner, ConnectionState::Connected(generation));
                let topics = inner.registry.topics().to_vec();
                inner.pending.begin(generation);
                for topic in &topics {
                    inner.pending.record(topic.clone(), AckAction::Subscribe);
                }
                Some(topics)
            }
        };

        let Some(topics) = resubscribe else {
            let (code, reason) = self.close_frame();
            transport.close(code, &reason).await;
            return SessionEnd::Closed;
        };

        info!(generation, subscriptions = topics.len(), "Websocket connected");

        for topic in topics {
            if let Err(err) = send(&mut transport, &ClientMessage::Subscribe { topic }).await {
                return SessionEnd::Dropped(err);
            }
        }

        let heartbeat_interval = self.config.heartbeat_interval;
        let mut heartbeat =
            tokio::time::interval_at(Instant::now() + heartbeat_interval, heartbeat_interval);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let idle_timeout = self.config.idle_timeout;
        let idle = tokio::time::sleep(idle_timeout);
        tokio::pin!(idle);

        let max_decode_failures = self.config.max_consecutive_decode_failures;
        let mut decode_failures: u32 = 0;
        // Backoff resets only once the server has sent something
        let mut heard_from_server = false;

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    let (code, reason) = self.close_frame();
                    transport.close(code, &reason).await;
                    return SessionEnd::Closed;
                }
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        debug!(generation, "All client handles dropped");
                        self.shared.request_close(NORMAL_CLOSURE, "");
                        transport.close(NORMAL_CLOSURE, "").await;
                        return SessionEnd::Closed;
                    };
                    if let Err(err) = self.execute(generation, &mut transport, command).await {
                        return SessionEnd::Dropped(err);
                    }
                }
                frame = transport.recv() => {
                    idle.as_mut().reset(Instant::now() + idle_timeout);
                    let frame = match frame {
                        Some(Ok(frame)) => frame,
                        Some(Err(err)) => return SessionEnd::Dropped(err),
                        None => return SessionEnd::Dropped(TransportError::Closed),
                    };
                    if !heard_from_server {
                        heard_from_server = true;
                        self.backoff.reset();
                    }

                    match decode(&frame) {
                        Ok(envelope) => {
                            decode_failures = 0;
                            self.deliver(generation, envelope);
                        }
                        Err(err) => {
                            decode_failures += 1;
                            warn!(generation, error = %err, failures = decode_failures, "Dropping undecodable frame");
                            if decode_failures >= max_decode_failures {
                                return SessionEnd::Dropped(TransportError::TooManyDecodeFailures {
                                    count: decode_failures,
                                });
                            }
                        }
                    }
                }
                _ = &mut idle => return SessionEnd::Dropped(TransportError::IdleTimeout),
                _ = heartbeat.tick() => {
                    trace!(generation, "Sending heartbeat");
                    if let Err(err) = send(&mut transport, &ClientMessage::Ping).await {
                        return SessionEnd::Dropped(err);
                    }
                }
            }
        }
    }

    async fn execute(
        &self,
        generation: SessionGeneration,
        transport: &mut Box<dyn Transport>,
        command: Command,
    ) -> std::result::Result<(), TransportError> {
        match command {
            Command::Send {
                generation: target,
                message,
            } => {
                if target != generation {
                    debug!(generation, queued_for = target, "Dropping request queued for an earlier session");
                    return Ok(());
                }
                send(transport, &message).await
            }
            Command::Configure {
                generation: target,
                message,
                reply,
            } => {
                if target != generation {
                    let _ = reply.send(Err(Error::NotConnected));
                    return Ok(());
                }
                match send(transport, &message).await {
                    Ok(()) => {
                        debug!(generation, "Connection feature updated");
                        let _ = reply.send(Ok(generation));
                        Ok(())
                    }
                    Err(err) => {
                        let _ = reply.send(Err(Error::NotConnected));
                        Err(err)
                    }
                }
            }
        }
    }

    fn deliver(&self, generation: SessionGeneration, envelope: Envelope) {
        if let Envelope::Ack { topic, action, .. } = &envelope {
            let resolved = self
                .shared
                .lock()
                .pending
                .resolve(generation, topic, *action);
            if !resolved {
                warn!(
                    generation,
                    %topic,
                    %action,
                    "Protocol violation: acknowledgment for a request that is not pending"
                );
                return;
            }
        }

        if self.envelopes.send(envelope).is_err() {
            trace!(generation, "Envelope stream dropped, discarding");
        }
    }

    fn end_session(&self, generation: SessionGeneration) {
        let mut inner = self.shared.lock();
        inner.pending.end();
        if !inner.state.is_terminal() {
            self.shared
                .publish(&mut inner, ConnectionState::Disconnected(generation));
        }
    }

    /// Sleep out the backoff while answering anything queued for dead sessions
    ///
    /// Returns `false` if the client was closed in the meantime.
    async fn wait_before_reconnect(&mut self, delay: Duration) -> bool {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return false,
                _ = &mut sleep => return true,
                command = self.commands.recv() => match command {
                    Some(Command::Send { .. }) => {}
                    Some(Command::Configure { reply, .. }) => {
                        let _ = reply.send(Err(Error::NotConnected));
                    }
                    None => {
                        debug!("All client handles dropped");
                        self.shared.request_close(NORMAL_CLOSURE, "");
                        return false;
                    }
                },
            }
        }
    }

    fn close_frame(&self) -> (u16, String) {
        self.shared
            .lock()
            .close_frame
            .clone()
            .unwrap_or((NORMAL_CLOSURE, String::new()))
    }

    fn finish(self) {
        info!("Websocket client closed");
    }
}

/// Publishes `Closed` however the worker exits, panics included. Runs before
/// the fields drop, so watchers see `Closed` before the envelope stream ends.
impl Drop for Worker {
    fn drop(&mut self) {
        let mut inner = self.shared.lock();
        inner.pending.end();
        self.shared.publish(&mut inner, ConnectionState::Closed);
        drop(inner);

        self.cancel.cancel();
    }
}

async fn send(
    transport: &mut Box<dyn Transport>,
    message: &ClientMessage,
) -> std::result::Result<(), TransportError> {
    let text = message
        .to_json()
        .map_err(|e| TransportError::Send(e.to_string()))?;
    transport.send(text).await
}
