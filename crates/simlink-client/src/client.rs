//! Synchronization client
//!
//! Owns the transport lifecycle as an explicit state machine:
//! `Idle → Connecting → Open → Closed`, with `Closed → Connecting` scheduled
//! after a configurable delay while auto-reconnect is enabled, and a terminal
//! `Disposed` state on explicit disconnect. Transport failures never cross
//! the client boundary; they become state transitions, log lines, and
//! optional callback invocations.

use crate::{
    lock,
    registry::{SnapshotCallback, SubscriberRegistry, Subscription},
    state::StateCache,
    transport::{Transport, TransportConn, WsTransport},
    ClientError,
};
use simlink_protocol::{Envelope, OutboundIntent, Payload, SimulationSnapshot, UpstreamError};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Lifecycle of the channel to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Never connected.
    Idle,
    /// A connection attempt is in flight.
    Connecting,
    /// The channel is live.
    Open,
    /// The channel is down; a reconnect may be scheduled.
    Closed,
    /// Explicitly torn down. Terminal.
    Disposed,
}

/// Hook invoked with every decoded inbound envelope.
pub type MessageHook = dyn Fn(&Envelope) + Send + Sync;
/// Hook invoked on transport faults and backend-reported errors.
pub type ErrorHook = dyn Fn(&ClientError) + Send + Sync;
/// Hook invoked when the channel opens or closes.
pub type LifecycleHook = dyn Fn() + Send + Sync;

/// Client construction parameters.
pub struct ClientConfig {
    /// Backend endpoint URL, e.g. `ws://localhost:8080/feed`.
    pub endpoint: String,
    /// Reconnect automatically after a transport failure.
    pub auto_reconnect: bool,
    /// Flat delay between a failure and the next connection attempt.
    pub reconnect_interval: Duration,
    /// Start connecting as soon as the client is constructed.
    pub connect_on_start: bool,
    pub on_message: Option<Arc<MessageHook>>,
    pub on_error: Option<Arc<ErrorHook>>,
    pub on_connect: Option<Arc<LifecycleHook>>,
    pub on_disconnect: Option<Arc<LifecycleHook>>,
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            auto_reconnect: true,
            reconnect_interval: Duration::from_millis(3000),
            connect_on_start: false,
            on_message: None,
            on_error: None,
            on_connect: None,
            on_disconnect: None,
        }
    }
}

/// Handle to the synchronization client.
///
/// Cheap to clone; all clones share one transport connection and one state
/// cache. `connect` and `send` return immediately; effects are observed
/// through `current()`, registered subscribers, and the configured hooks.
#[derive(Clone)]
pub struct SyncClient {
    inner: Arc<Inner>,
}

struct Inner {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    state: Mutex<ConnectionState>,
    cache: StateCache,
    registry: Arc<SubscriberRegistry>,
    /// Sender into the live connection's write loop; present only while open.
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
    shutdown: watch::Sender<bool>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl SyncClient {
    /// Build a client over the production WebSocket transport.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_transport(config, Arc::new(WsTransport))
    }

    /// Build a client over a custom transport.
    ///
    /// Tests use this to inject a deterministic in-memory transport.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let (shutdown, _) = watch::channel(false);
        let eager = config.connect_on_start;

        let client = Self {
            inner: Arc::new(Inner {
                config,
                transport,
                state: Mutex::new(ConnectionState::Idle),
                cache: StateCache::default(),
                registry: Arc::new(SubscriberRegistry::default()),
                outbound: Mutex::new(None),
                shutdown,
                driver: Mutex::new(None),
            }),
        };

        if eager {
            client.connect();
        }
        client
    }

    /// Start the connection driver. Idempotent: a second call while a driver
    /// is live is a no-op. Must be called within a Tokio runtime.
    pub fn connect(&self) {
        if self.state() == ConnectionState::Disposed {
            warn!("connect() called on a disposed client");
            return;
        }

        let mut driver = lock(&self.inner.driver);
        if driver.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!("connect() ignored: driver already running");
            return;
        }

        let inner = Arc::clone(&self.inner);
        let shutdown_rx = self.inner.shutdown.subscribe();
        *driver = Some(tokio::spawn(run_driver(inner, shutdown_rx)));
    }

    /// Tear the client down: cancel any pending reconnect, close the live
    /// connection, and clear the subscriber registry. No callbacks fire once
    /// this returns. Terminal; the client cannot be reconnected afterwards.
    pub async fn disconnect(&self) {
        self.inner.set_state(ConnectionState::Disposed);
        let _ = self.inner.shutdown.send(true);

        let handle = lock(&self.inner.driver).take();
        if let Some(handle) = handle {
            if handle.await.is_err() {
                warn!("driver task panicked during shutdown");
            }
        }

        *lock(&self.inner.outbound) = None;
        self.inner.registry.clear();
        info!("client disposed");
    }

    /// Transmit an intent if the channel is open.
    ///
    /// While not open the intent is dropped with a diagnostic; this never
    /// fails and never queues.
    pub fn send(&self, intent: &OutboundIntent) {
        if self.state() != ConnectionState::Open {
            warn!(?intent, "dropping outbound intent while not connected");
            return;
        }

        let frame = match Envelope::encode_intent(intent, Envelope::timestamp_now()) {
            Ok(frame) => frame,
            Err(err) => {
                warn!("failed to encode outbound intent: {err}");
                return;
            }
        };

        let delivered = lock(&self.inner.outbound)
            .as_ref()
            .is_some_and(|tx| tx.send(frame).is_ok());
        if !delivered {
            warn!(?intent, "connection lost before intent could be transmitted");
        }
    }

    /// Request scoped updates for an area of the simulation.
    pub fn subscribe_to_area(&self, area_id: impl Into<String>) {
        self.send(&OutboundIntent::SubscribeArea {
            area_id: area_id.into(),
        });
    }

    /// Register a snapshot consumer. Every accepted snapshot is delivered
    /// once to each registered callback, synchronously, in registration
    /// order. The returned handle removes the subscriber when asked.
    pub fn register(
        &self,
        callback: impl Fn(&Arc<SimulationSnapshot>) + Send + Sync + 'static,
    ) -> Subscription {
        let callback: Arc<SnapshotCallback> = Arc::new(callback);
        let id = self.inner.registry.register(callback);
        Subscription::new(id, Arc::downgrade(&self.inner.registry))
    }

    /// The latest snapshot, or `None` if no frame has arrived yet. Never
    /// blocks.
    pub fn current(&self) -> Option<Arc<SimulationSnapshot>> {
        self.inner.cache.current()
    }

    /// The most recent backend-reported error, if any.
    pub fn last_error(&self) -> Option<UpstreamError> {
        self.inner.cache.last_error()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *lock(&self.inner.state)
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Open
    }
}

impl Inner {
    fn set_state(&self, next: ConnectionState) {
        let mut state = lock(&self.state);
        // Disposed is terminal; a late driver transition must not revive it.
        if *state == next || *state == ConnectionState::Disposed {
            return;
        }
        debug!(from = ?*state, to = ?next, "connection state transition");
        *state = next;
    }

    /// Process one raw inbound frame. Undecodable frames are dropped without
    /// touching the connection state or the subscribers.
    fn handle_frame(&self, raw: &str) {
        let envelope = match Envelope::decode(raw) {
            Ok(envelope) => envelope,
            Err(err) => {
                debug!("dropping undecodable frame: {err}");
                return;
            }
        };

        if let Some(hook) = &self.config.on_message {
            hook(&envelope);
        }

        match envelope.payload {
            Payload::StateUpdate(snapshot) => {
                let shared = self.cache.apply_snapshot(snapshot);
                self.registry.notify(&shared);
            }
            Payload::Error(error) => {
                warn!(code = ?error.code, "backend reported: {}", error.message);
                self.cache.record_error(error.clone());
                if let Some(hook) = &self.config.on_error {
                    hook(&ClientError::Upstream {
                        message: error.message,
                        code: error.code,
                    });
                }
            }
            Payload::Connection(notice) => {
                info!(status = ?notice.status, client_id = ?notice.client_id,
                      "connection notice from backend");
            }
            Payload::Command(command) => {
                debug!(command = %command.command, "ignoring command envelope from backend");
            }
        }
    }
}

/// Connection driver: runs the connect / pump / reschedule loop until the
/// client is disposed or reconnection is disabled after a failure.
async fn run_driver(inner: Arc<Inner>, mut shutdown: watch::Receiver<bool>) {
    let mut attempt: u32 = 0;

    loop {
        if *shutdown.borrow() {
            break;
        }

        inner.set_state(ConnectionState::Connecting);
        if attempt > 0 {
            debug!(attempt, "reconnecting to {}", inner.config.endpoint);
        }

        let outcome = tokio::select! {
            _ = shutdown.changed() => break,
            outcome = inner.transport.connect(&inner.config.endpoint) => outcome,
        };

        match outcome {
            Ok(conn) => {
                attempt = 0;
                let (tx, rx) = mpsc::unbounded_channel();
                *lock(&inner.outbound) = Some(tx);
                inner.set_state(ConnectionState::Open);
                info!("connected to {}", inner.config.endpoint);
                if let Some(hook) = &inner.config.on_connect {
                    hook();
                }

                let fault = pump(&inner, conn, rx, &mut shutdown).await;

                *lock(&inner.outbound) = None;
                if *shutdown.borrow() {
                    break;
                }
                inner.set_state(ConnectionState::Closed);
                match fault {
                    Some(err) => {
                        warn!("connection lost: {err}");
                        if let Some(hook) = &inner.config.on_error {
                            hook(&err);
                        }
                    }
                    None => info!("connection closed by peer"),
                }
                if let Some(hook) = &inner.config.on_disconnect {
                    hook();
                }
            }
            Err(err) => {
                // A synchronously failing attempt re-enters Closed and
                // reschedules like any other fault.
                inner.set_state(ConnectionState::Closed);
                warn!("connection attempt failed: {err}");
                if let Some(hook) = &inner.config.on_error {
                    hook(&err);
                }
                if let Some(hook) = &inner.config.on_disconnect {
                    hook();
                }
            }
        }

        if !inner.config.auto_reconnect {
            debug!("auto-reconnect disabled; driver stopping");
            break;
        }

        attempt += 1;
        tokio::select! {
            _ = shutdown.changed() => break,
            () = sleep(inner.config.reconnect_interval) => {}
        }
    }

    debug!("sync driver stopped");
}

enum PumpExit {
    Shutdown,
    ClosedByPeer,
    Fault(ClientError),
}

/// Drive one live connection: forward outbound frames, decode inbound ones.
/// Returns the fault that ended the connection, if any.
async fn pump(
    inner: &Arc<Inner>,
    mut conn: Box<dyn TransportConn>,
    mut outbound: mpsc::UnboundedReceiver<String>,
    shutdown: &mut watch::Receiver<bool>,
) -> Option<ClientError> {
    let exit = loop {
        tokio::select! {
            _ = shutdown.changed() => break PumpExit::Shutdown,
            frame = outbound.recv() => {
                // The sender half lives in `inner.outbound` for the whole
                // life of this pump, so `recv` only yields real frames here.
                if let Some(frame) = frame {
                    if let Err(err) = conn.send(frame).await {
                        break PumpExit::Fault(err);
                    }
                }
            }
            inbound = conn.recv() => match inbound {
                Ok(Some(raw)) => inner.handle_frame(&raw),
                Ok(None) => break PumpExit::ClosedByPeer,
                Err(err) => break PumpExit::Fault(err),
            },
        }
    };

    match exit {
        PumpExit::Shutdown => {
            conn.close().await;
            None
        }
        PumpExit::ClosedByPeer => None,
        PumpExit::Fault(err) => Some(err),
    }
}
