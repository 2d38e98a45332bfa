//! Shared helpers for integration tests against a live coordination
//! runtime.

use std::sync::Once;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::sync::mpsc;
use tokio::time::timeout;

use palaver_protocol::{
    ClientEvent, CoordinationRuntime, DirectoryAddr, RuntimeConfig, Session,
};

/// How long a test waits for an event that should arrive.
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(1);

/// How long a test watches a mailbox that should stay silent.
pub const SILENCE_WINDOW: Duration = Duration::from_millis(100);

static TRACING: Once = Once::new();

/// Initialize tracing once per test binary, honoring `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Spawn a fresh runtime with default configuration.
pub fn spawn_runtime() -> DirectoryAddr {
    init_tracing();
    CoordinationRuntime::spawn(RuntimeConfig::default())
}

/// Create a session for `user` and connect it, consuming the ack.
pub async fn connected_session(
    directory: &DirectoryAddr,
    user: &str,
) -> Result<(Session, mpsc::Receiver<ClientEvent>)> {
    let (session, mut events) = Session::new(user, directory.clone(), 64);
    session.connect().await?;
    match next_event(&mut events).await? {
        ClientEvent::ConnectAck { .. } => Ok((session, events)),
        other => bail!("expected ConnectAck for {user}, got {other:?}"),
    }
}

/// Receive the next event or fail after [`EVENT_TIMEOUT`].
pub async fn next_event(events: &mut mpsc::Receiver<ClientEvent>) -> Result<ClientEvent> {
    timeout(EVENT_TIMEOUT, events.recv())
        .await
        .context("timed out waiting for event")?
        .context("event channel closed")
}

/// Receive a Notification and return its text.
pub async fn next_notification(events: &mut mpsc::Receiver<ClientEvent>) -> Result<String> {
    match next_event(events).await? {
        ClientEvent::Notification { text } => Ok(text),
        other => bail!("expected Notification, got {other:?}"),
    }
}

/// Assert that no event arrives within [`SILENCE_WINDOW`].
pub async fn assert_silent(events: &mut mpsc::Receiver<ClientEvent>) {
    if let Ok(Some(event)) = timeout(SILENCE_WINDOW, events.recv()).await {
        panic!("expected silence, got {event:?}");
    }
}
