//! Shutdown coordination for the forwarder.

use tokio::sync::broadcast;

/// Coordinator for graceful shutdown.
///
/// Hands out [`ShutdownSignal`]s that resolve once [`Shutdown::trigger`] is
/// called, or once the coordinator itself is dropped.
#[derive(Debug)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Get a signal for one long-running task.
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Fire every outstanding signal.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Number of signals still waiting.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// One task's view of the shutdown coordinator.
#[derive(Debug)]
pub struct ShutdownSignal {
    rx: broadcast::Receiver<()>,
}

impl ShutdownSignal {
    /// Resolve when shutdown is triggered. A dropped coordinator counts too.
    pub async fn recv(mut self) {
        let _ = self.rx.recv().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_trigger_resolves_all_signals() {
        let shutdown = Shutdown::new();
        let a = tokio::spawn(shutdown.subscribe().recv());
        let b = tokio::spawn(shutdown.subscribe().recv());
        assert_eq!(shutdown.subscriber_count(), 2);

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), async {
            a.await.unwrap();
            b.await.unwrap();
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_dropped_coordinator_resolves_signal() {
        let shutdown = Shutdown::new();
        let signal = shutdown.subscribe();
        drop(shutdown);
        tokio::time::timeout(Duration::from_secs(1), signal.recv())
            .await
            .unwrap();
    }
}
