use tokio::sync::Notify;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, error};
use crate::state_management::ledger_manager::LedgerManager;

/// Coordinates shutdown of the state manager and the final ledger flush.
pub struct StateManagerLifecycle {
    shutdown_signal: Notify,
    shutdown_triggered: AtomicBool,
    ledger: Arc<LedgerManager>,
}

impl StateManagerLifecycle {
    pub fn new(ledger: Arc<LedgerManager>) -> Self {
        Self {
            shutdown_signal: Notify::new(),
            shutdown_triggered: AtomicBool::new(false),
            ledger,
        }
    }

    /// Resolves once `trigger_shutdown` has been called, including when it was called before this wait started.
    pub async fn wait_for_shutdown(&self) {
        let notified = self.shutdown_signal.notified();
        if self.is_shutdown_triggered() {
            return;
        }
        notified.await;
        info!("Shutdown signal received");
    }

    pub fn trigger_shutdown(&self) {
        info!("Triggering shutdown");
        self.shutdown_triggered.store(true, Ordering::SeqCst);
        self.shutdown_signal.notify_waiters();
    }

    pub fn is_shutdown_triggered(&self) -> bool {
        self.shutdown_triggered.load(Ordering::SeqCst)
    }

    /// Flushes whatever the ledger still holds. Sink errors are logged, not returned.
    pub async fn cleanup(&self) {
        info!("Starting cleanup process");
        if let Err(e) = self.ledger.flush().await {
            error!("Error flushing audit ledger during cleanup: {:?}", e);
        }
        info!("Cleanup process completed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::audit_sink::MemoryAuditSink;

    #[tokio::test]
    async fn wait_returns_when_shutdown_was_already_triggered() {
        let lifecycle = StateManagerLifecycle::new(Arc::new(LedgerManager::new(1, Arc::new(MemoryAuditSink::new()))));
        lifecycle.trigger_shutdown();
        tokio::time::timeout(std::time::Duration::from_secs(1), lifecycle.wait_for_shutdown())
            .await
            .expect("wait should not hang");
    }
}
