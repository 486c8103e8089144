//! Test utilities for simlink integration tests
//!
//! Provides a deterministic in-memory transport for driving the sync client
//! without a network socket, plus wire-frame fixtures.

pub mod fixtures;
pub mod transport;

pub use fixtures::{connection_frame, error_frame, snapshot_frame};
pub use transport::FakeTransport;

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("simlink_client=debug,simlink_test_utils=debug")),
            )
            .with_test_writer()
            .init();
    });
}

/// Let spawned client tasks run to quiescence.
///
/// Tests run on the current-thread runtime, so a burst of yields hands the
/// driver task every slice it needs without advancing the (paused) clock.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}
