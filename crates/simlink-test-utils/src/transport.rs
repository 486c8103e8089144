//! Scriptable in-memory transport
//!
//! Shares the production `Transport` contract so the sync client under test
//! behaves exactly as it does over a real socket, while the test controls the
//! backend side: deliver frames, drop the connection, fail handshakes.

use async_trait::async_trait;
use simlink_client::{ClientError, Transport, TransportConn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio::time::Instant;

enum FakeEvent {
    Frame(String),
    Close,
    Fault(String),
}

#[derive(Default)]
struct FakeShared {
    /// Paused-clock instant of every connection attempt, in order.
    attempts: Vec<Instant>,
    /// Number of upcoming connection attempts that must fail.
    fail_next: usize,
    /// Event channel into the currently attached connection, if any.
    active: Option<mpsc::UnboundedSender<FakeEvent>>,
    /// Frames the client transmitted, across all connection epochs.
    sent: Vec<String>,
}

/// Deterministic in-memory transport.
///
/// Hand a clone to the client under test and keep one to script the backend.
#[derive(Clone, Default)]
pub struct FakeTransport {
    shared: Arc<Mutex<FakeShared>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FakeShared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the next `n` connection attempts fail at handshake.
    pub fn fail_next_connects(&self, n: usize) {
        self.lock().fail_next = n;
    }

    /// Number of connection attempts observed so far.
    pub fn connect_attempts(&self) -> usize {
        self.lock().attempts.len()
    }

    /// Clock instants at which each connection attempt arrived.
    pub fn attempt_instants(&self) -> Vec<Instant> {
        self.lock().attempts.clone()
    }

    /// Whether a connection is currently attached.
    pub fn is_attached(&self) -> bool {
        self.lock().active.is_some()
    }

    /// Frames the client transmitted, across all connection epochs.
    pub fn sent_frames(&self) -> Vec<String> {
        self.lock().sent.clone()
    }

    /// Deliver a raw frame to the client, as if pushed by the backend.
    ///
    /// # Panics
    ///
    /// Panics if no connection is attached.
    pub fn push_frame(&self, raw: impl Into<String>) {
        self.lock()
            .active
            .as_ref()
            .expect("push_frame: no attached connection")
            .send(FakeEvent::Frame(raw.into()))
            .ok();
    }

    /// Close the attached connection cleanly, as the backend would.
    pub fn close_connection(&self) {
        if let Some(active) = self.lock().active.as_ref() {
            active.send(FakeEvent::Close).ok();
        }
    }

    /// Tear the attached connection down with a transport fault.
    pub fn drop_connection(&self) {
        if let Some(active) = self.lock().active.as_ref() {
            active
                .send(FakeEvent::Fault("simulated network failure".to_string()))
                .ok();
        }
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn connect(&self, _endpoint: &str) -> Result<Box<dyn TransportConn>, ClientError> {
        let mut shared = self.lock();
        shared.attempts.push(Instant::now());

        if shared.fail_next > 0 {
            shared.fail_next -= 1;
            return Err(ClientError::ConnectionFailed(
                "simulated handshake failure".to_string(),
            ));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        shared.active = Some(tx.clone());
        Ok(Box::new(FakeConn {
            events: rx,
            sender: tx,
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct FakeConn {
    events: mpsc::UnboundedReceiver<FakeEvent>,
    sender: mpsc::UnboundedSender<FakeEvent>,
    shared: Arc<Mutex<FakeShared>>,
}

#[async_trait]
impl TransportConn for FakeConn {
    async fn send(&mut self, frame: String) -> Result<(), ClientError> {
        self.shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sent
            .push(frame);
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<String>, ClientError> {
        match self.events.recv().await {
            Some(FakeEvent::Frame(raw)) => Ok(Some(raw)),
            Some(FakeEvent::Close) | None => Ok(None),
            Some(FakeEvent::Fault(reason)) => Err(ClientError::Transport(reason)),
        }
    }

    async fn close(&mut self) {}
}

impl Drop for FakeConn {
    fn drop(&mut self) {
        let mut shared = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
        // Detach only if a newer connection has not replaced this one.
        if shared
            .active
            .as_ref()
            .is_some_and(|active| active.same_channel(&self.sender))
        {
            shared.active = None;
        }
    }
}
