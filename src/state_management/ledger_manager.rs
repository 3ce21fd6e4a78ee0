use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, error};
use crate::errors::TerminalResult;
use crate::models::LedgerBatch;
use crate::services::audit_sink::AuditSink;

/// Buffers committed ledger rows and forwards them to the durable sink in batches.
pub struct LedgerManager {
    /// Rows committed but not yet handed to the sink.
    pending: RwLock<LedgerBatch>,
    /// The number of rows to accumulate before flushing on its own.
    batch_size: usize,
    sink: Arc<dyn AuditSink>,
}

impl LedgerManager {
    /// Creates a new `LedgerManager`.
    ///
    /// # Arguments
    ///
    /// * `batch_size` - The number of rows to accumulate before automatically flushing.
    /// * `sink` - Where flushed rows are written.
    pub fn new(batch_size: usize, sink: Arc<dyn AuditSink>) -> Self {
        Self {
            pending: RwLock::new(LedgerBatch::default()),
            batch_size: batch_size.max(1),
            sink,
        }
    }

    /// Queues committed rows. When the batch is full the flush runs in the background so the caller never waits on
    /// the sink.
    pub async fn record(self: &Arc<Self>, rows: LedgerBatch) {
        if rows.is_empty() {
            return;
        }
        let mut pending = self.pending.write().await;
        pending.extend(rows);
        let full = pending.len() >= self.batch_size;
        drop(pending);

        if full {
            let manager = Arc::clone(self);
            tokio::spawn(async move {
                if let Err(e) = manager.flush().await {
                    error!("Background ledger flush failed: {:?}", e);
                }
            });
        }
    }

    /// Hands every pending row to the sink.
    ///
    /// Rows are dropped from the buffer before the write; a failed write is logged and the rows stay in the
    /// in-memory ledger only.
    pub async fn flush(&self) -> TerminalResult<()> {
        let batch = std::mem::take(&mut *self.pending.write().await);
        if batch.is_empty() {
            return Ok(());
        }

        info!(
            "Flushing {} ledger rows ({} audit, {} gate, {} custody)",
            batch.len(),
            batch.audit.len(),
            batch.gate_events.len(),
            batch.trip_events.len()
        );
        match self.sink.append(&batch).await {
            Ok(()) => Ok(()),
            Err(e) => {
                error!("Failed to write {} ledger rows to sink: {:?}", batch.len(), e);
                Err(e)
            }
        }
    }

    pub async fn pending_len(&self) -> usize {
        self.pending.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::errors::TerminalError;
    use crate::models::{local_now, AuditEntry};
    use crate::services::audit_sink::MemoryAuditSink;

    fn entry(id: &str) -> AuditEntry {
        AuditEntry {
            id: id.into(),
            request_id: "r".into(),
            actor_id: "a".into(),
            entity_type: "Bay".into(),
            entity_id: "b".into(),
            action: "ASSIGN_BAY".into(),
            before: None,
            after: None,
            recorded_at: local_now(),
        }
    }

    fn audit_only(audit: Vec<AuditEntry>) -> LedgerBatch {
        LedgerBatch { audit, ..Default::default() }
    }

    struct FailingSink;

    #[async_trait]
    impl AuditSink for FailingSink {
        async fn append(&self, _batch: &LedgerBatch) -> TerminalResult<()> {
            Err(TerminalError::ConnectionError("sink offline".into()))
        }
    }

    #[tokio::test]
    async fn flush_hands_pending_rows_to_sink() {
        let sink = Arc::new(MemoryAuditSink::new());
        let manager = Arc::new(LedgerManager::new(100, sink.clone()));
        manager.record(audit_only(vec![entry("1"), entry("2")])).await;
        assert_eq!(manager.pending_len().await, 2);

        manager.flush().await.unwrap();
        assert_eq!(manager.pending_len().await, 0);
        assert_eq!(sink.entries().await.len(), 2);
    }

    #[tokio::test]
    async fn sink_failure_is_reported_and_buffer_cleared() {
        let manager = Arc::new(LedgerManager::new(100, Arc::new(FailingSink)));
        manager.record(audit_only(vec![entry("1")])).await;
        assert!(manager.flush().await.is_err());
        assert_eq!(manager.pending_len().await, 0);
    }
}
