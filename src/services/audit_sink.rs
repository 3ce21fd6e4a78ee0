//! # Ledger Sinks

//! Durable destinations for committed ledger rows. A sink failure never undoes the change that produced the rows.

use async_trait::async_trait;
use tokio::sync::RwLock;
use crate::errors::TerminalResult;
use crate::models::{AuditEntry, AuditLogRow, GateEvent, GateEventRow, LedgerBatch, TripEvent, TripEventRow};
use crate::services::db::DatabaseService;

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, batch: &LedgerBatch) -> TerminalResult<()>;
}

/// Writes gate events, custody events and audit rows to their MSSQL tables.
pub struct MssqlAuditSink {
    db_service: DatabaseService,
    terminal_id: String,
}

impl MssqlAuditSink {
    pub fn new(db_service: DatabaseService, terminal_id: String) -> Self {
        Self { db_service, terminal_id }
    }
}

#[async_trait]
impl AuditSink for MssqlAuditSink {
    async fn append(&self, batch: &LedgerBatch) -> TerminalResult<()> {
        let gate_rows = batch
            .gate_events
            .iter()
            .map(|event| GateEventRow::from_gate_event(&self.terminal_id, event))
            .collect::<TerminalResult<Vec<_>>>()?;
        let trip_rows: Vec<TripEventRow> = batch
            .trip_events
            .iter()
            .map(|event| TripEventRow::from_trip_event(&self.terminal_id, event))
            .collect();
        let audit_rows: Vec<AuditLogRow> = batch
            .audit
            .iter()
            .map(|entry| AuditLogRow::from_audit_entry(&self.terminal_id, entry))
            .collect();

        self.db_service.insert_gate_event_rows(&gate_rows).await?;
        self.db_service.insert_trip_event_rows(&trip_rows).await?;
        self.db_service.insert_audit_rows(&audit_rows).await
    }
}

/// Keeps rows in memory. Used when no database is configured, and in tests.
#[derive(Default)]
pub struct MemoryAuditSink {
    rows: RwLock<LedgerBatch>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<AuditEntry> {
        self.rows.read().await.audit.clone()
    }

    pub async fn gate_events(&self) -> Vec<GateEvent> {
        self.rows.read().await.gate_events.clone()
    }

    pub async fn trip_events(&self) -> Vec<TripEvent> {
        self.rows.read().await.trip_events.clone()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn append(&self, batch: &LedgerBatch) -> TerminalResult<()> {
        self.rows.write().await.extend(batch.clone());
        Ok(())
    }
}
