//! A shared cancellation signal for a group of cooperating listener tasks.
//!
//! One [ShutdownManager] owns the signal; any number of [ShutdownReceiver]s may wait on it. A
//! receiver whose manager was dropped without signalling also observes a shutdown, so a listener
//! can never outlive the task that is supposed to stop it.

use tokio::sync::broadcast;

pub struct ShutdownManager {
    shutdown_tx: broadcast::Sender<()>,
    shutdown: bool,
}

impl Default for ShutdownManager {
    fn default() -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            shutdown_tx,
            shutdown: false,
        }
    }
}

impl ShutdownManager {
    pub fn new_pair() -> (Self, ShutdownReceiver) {
        let mut manager = Self::default();
        let recv = manager.add_receiver();
        (manager, recv)
    }

    pub fn add_receiver(&mut self) -> ShutdownReceiver {
        ShutdownReceiver {
            shutdown_rx: self.shutdown_tx.subscribe(),
            observed: false,
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown
    }

    /// Signals every receiver. Returns the number of receivers still listening.
    ///
    /// Signalling twice is a no-op.
    pub fn shutdown(&mut self) -> usize {
        if self.shutdown {
            return 0;
        }
        self.shutdown = true;
        // An error only means every receiver has already gone away.
        self.shutdown_tx.send(()).unwrap_or(0)
    }
}

pub struct ShutdownReceiver {
    shutdown_rx: broadcast::Receiver<()>,
    observed: bool,
}

impl ShutdownReceiver {
    /// Resolves once shutdown is signalled or the manager is dropped.
    ///
    /// Cancel-safe; once resolved, every later call resolves immediately.
    pub async fn recv_shutdown(&mut self) {
        if self.observed {
            return;
        }
        // Both a sent signal and a dropped sender mean "stop".
        let _ = self.shutdown_rx.recv().await;
        self.observed = true;
    }
}
