//! # Database Services

//! Connects to the ledger database and writes committed ledger rows to it.

use secrecy::ExposeSecret;
use tracing::info;
use crate::config::DatabaseSettings;
use crate::errors::TerminalResult;
use crate::models::{AuditLogRow, GateEventRow, TripEventRow};
use crate::repositories::{AuditLogRepository, GateEventRepository, Repository, TripEventRepository};
use crate::services::DatabaseClient;

/// Provides access to the ledger database
#[derive(Debug, Clone)]
pub struct DatabaseService {
    audit_repository: AuditLogRepository,
    gate_event_repository: GateEventRepository,
    trip_event_repository: TripEventRepository,
}

impl DatabaseService {
    /// Creates a new `DatabaseService`, connecting and making sure the ledger tables exist
    ///
    /// # Arguments
    ///
    /// * `settings`: The database section of the application settings
    ///
    /// # Returns
    ///
    /// * `Ok(Self)`: The initialized `DatabaseService` instance
    /// * `Err(TerminalError)`: If the connection or the table setup fails
    pub async fn new(settings: &DatabaseSettings) -> TerminalResult<Self> {
        info!("Connecting to ledger database: {}", settings);
        let client = DatabaseClient::new(
            settings.connection_string().expose_secret(),
            &settings.app_name,
        ).await?;

        let audit_repository = AuditLogRepository::new(client.clone());
        let gate_event_repository = GateEventRepository::new(client.clone());
        let trip_event_repository = TripEventRepository::new(client);
        audit_repository.ensure_table().await?;
        gate_event_repository.ensure_table().await?;
        trip_event_repository.ensure_table().await?;

        Ok(Self { audit_repository, gate_event_repository, trip_event_repository })
    }

    /// Inserts a batch of audit rows
    ///
    /// # Arguments
    ///
    /// * `rows`: The rows to be inserted, in ledger order
    ///
    /// # Returns
    ///
    /// * `Ok(())`: If every row was inserted
    /// * `Err(TerminalError)`: On the first failed insert
    pub async fn insert_audit_rows(&self, rows: &[AuditLogRow]) -> TerminalResult<()> {
        for row in rows {
            self.audit_repository.insert(row).await?;
        }
        Ok(())
    }

    pub async fn insert_gate_event_rows(&self, rows: &[GateEventRow]) -> TerminalResult<()> {
        for row in rows {
            self.gate_event_repository.insert(row).await?;
        }
        Ok(())
    }

    pub async fn insert_trip_event_rows(&self, rows: &[TripEventRow]) -> TerminalResult<()> {
        for row in rows {
            self.trip_event_repository.insert(row).await?;
        }
        Ok(())
    }
}
