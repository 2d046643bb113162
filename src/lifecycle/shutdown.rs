//! Shutdown coordination for the proxy.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::broadcast;

/// How long in-flight requests may run after shutdown starts.
pub const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Graceful shutdown did not complete cleanly.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Requests were still in flight when the grace period ran out.
    #[error("in-flight requests did not finish within {grace:?}")]
    DeadlineExceeded { grace: Duration },

    /// The server failed while serving or closing the listener.
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that the server (and tests) can wait on.
pub struct Shutdown {
    /// Broadcast channel sender.
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// A future that resolves once `trigger` is called (or the coordinator is
    /// dropped). Subscribes immediately, so a trigger after this call is
    /// never missed.
    pub fn wait(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.subscribe();
        async move {
            let _ = rx.recv().await;
        }
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Get the number of active subscribers (tasks still running).
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_wait_resolves_on_trigger() {
        let shutdown = Shutdown::new();
        let waiter = tokio::spawn(shutdown.wait());
        assert_eq!(shutdown.receiver_count(), 1);

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should resolve")
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_resolves_when_dropped() {
        let shutdown = Shutdown::new();
        let waiter = shutdown.wait();
        drop(shutdown);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should resolve");
    }
}
