//! Real-time synchronization client for Simlink
//!
//! A resilient, typed, bidirectional channel to the simulation backend:
//! decodes the high-frequency state feed into immutable snapshots, fans them
//! out to any number of consumers, sends commands upstream, and reconnects
//! automatically after transport failures. No failure inside the client ever
//! propagates to a consumer as an unhandled error; every failure path ends in
//! a state transition, a log line, or an optional callback.

pub mod client;
pub mod transport;

mod registry;
mod state;

pub use client::{
    ClientConfig, ConnectionState, ErrorHook, LifecycleHook, MessageHook, SyncClient,
};
pub use registry::{SnapshotCallback, Subscription};
pub use transport::{Transport, TransportConn, WsTransport};

use thiserror::Error;

/// Failures the client converts into state transitions and diagnostics.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The transport handshake did not complete.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A live connection failed mid-stream.
    #[error("Transport error: {0}")]
    Transport(String),

    /// An error envelope sent deliberately by the backend.
    #[error("Backend error: {message}")]
    Upstream {
        message: String,
        code: Option<String>,
    },
}

/// Lock a mutex, recovering the guard if a panicking callback poisoned it.
pub(crate) fn lock<T>(mutex: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
