use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn, error};
use crate::config::{Settings, TerminalSettings};
use crate::errors::{TerminalError, TerminalResult};
use crate::models::TerminalEvent;
use crate::monitoring::QueuePolicy;
use crate::rules::SafetyGate;
use crate::services::audit_sink::AuditSink;
use crate::services::auth::ActorContext;
use crate::state_management::event_dispatcher::EventDispatcher;
use crate::state_management::ledger_manager::LedgerManager;
use crate::state_management::state_manager_lifecycle::StateManagerLifecycle;
use crate::state_management::terminal_state_repository::{TerminalSnapshot, TerminalStateRepository, TerminalTx};

/// Owns terminal state and the single commit path every mutating operation goes through.
///
/// `execute` is where the ledger and notifications are centralized: the operation only stages ledger rows and events
/// inside its transaction, and this type forwards them once the transaction has committed.
pub struct TerminalStateManager {
    repository: Arc<TerminalStateRepository>,
    safety_gate: SafetyGate,
    queue_policy: QueuePolicy,
    terminal: TerminalSettings,
    ledger: Arc<LedgerManager>,
    event_dispatcher: EventDispatcher,
    lifecycle: StateManagerLifecycle,
}

impl TerminalStateManager {
    /// Creates a new `TerminalStateManager` seeded with the configured bays.
    ///
    /// # Arguments
    ///
    /// * `settings` - The application settings.
    /// * `sink` - The durable destination for committed ledger rows.
    ///
    /// # Returns
    ///
    /// The manager and the receiving end of its notification channel.
    pub fn new(settings: &Settings, sink: Arc<dyn AuditSink>) -> (Self, mpsc::Receiver<TerminalEvent>) {
        let repository = Arc::new(TerminalStateRepository::from_settings(&settings.terminal));
        Self::with_repository(settings, repository, sink)
    }

    pub fn with_repository(
        settings: &Settings,
        repository: Arc<TerminalStateRepository>,
        sink: Arc<dyn AuditSink>,
    ) -> (Self, mpsc::Receiver<TerminalEvent>) {
        let (event_sender, event_receiver) = mpsc::channel(settings.notifications.channel_capacity);
        let ledger = Arc::new(LedgerManager::new(settings.ledger.batch_size, sink));
        let lifecycle = StateManagerLifecycle::new(Arc::clone(&ledger));

        (Self {
            repository,
            safety_gate: SafetyGate::default(),
            queue_policy: QueuePolicy::from(&settings.queue),
            terminal: settings.terminal.clone(),
            ledger,
            event_dispatcher: EventDispatcher::new(event_sender),
            lifecycle,
        }, event_receiver)
    }

    /// Runs one mutating operation atomically, then forwards its ledger rows and notifications.
    ///
    /// # Arguments
    ///
    /// * `operation` - Name used in logs.
    /// * `actor` - The authenticated actor performing the change.
    /// * `f` - The mutation. Its writes are rolled back if it returns `Err`.
    ///
    /// # Returns
    ///
    /// The operation's value, or its error with nothing applied.
    pub async fn execute<T, F>(&self, operation: &str, actor: &ActorContext, f: F) -> TerminalResult<T>
    where
        F: FnOnce(&mut TerminalTx<'_>) -> TerminalResult<T> + Send,
    {
        match self.repository.transaction(actor, f).await {
            Ok(committed) => {
                info!(
                    operation,
                    request_id = %actor.request_id,
                    actor_id = %actor.actor_id,
                    audit_rows = committed.ledger.audit.len(),
                    event_rows = committed.ledger.gate_events.len() + committed.ledger.trip_events.len(),
                    "Committed"
                );
                self.ledger.record(committed.ledger).await;
                self.event_dispatcher.dispatch_events(committed.events);
                Ok(committed.value)
            }
            Err(e) => {
                match &e {
                    TerminalError::Blocked(_) | TerminalError::Conflict(_) => {
                        warn!(operation, request_id = %actor.request_id, "Refused: {}", e)
                    }
                    TerminalError::DatabaseError(_)
                    | TerminalError::SerializationError(_)
                    | TerminalError::IoError(_) => {
                        error!(operation, request_id = %actor.request_id, "Failed: {}", e)
                    }
                    _ => info!(operation, request_id = %actor.request_id, "Rejected: {}", e),
                }
                Err(e)
            }
        }
    }

    /// Read-only projection of current state.
    pub async fn read<T, F>(&self, f: F) -> T
    where
        F: FnOnce(&TerminalSnapshot) -> T + Send,
    {
        self.repository.read(f).await
    }

    pub fn repository(&self) -> Arc<TerminalStateRepository> {
        Arc::clone(&self.repository)
    }

    pub fn safety_gate(&self) -> &SafetyGate {
        &self.safety_gate
    }

    pub fn queue_policy(&self) -> &QueuePolicy {
        &self.queue_policy
    }

    pub fn terminal_settings(&self) -> &TerminalSettings {
        &self.terminal
    }

    pub async fn flush_ledger(&self) -> TerminalResult<()> {
        self.ledger.flush().await
    }

    pub fn trigger_shutdown(&self) {
        self.lifecycle.trigger_shutdown();
    }

    pub async fn wait_for_shutdown(&self) {
        self.lifecycle.wait_for_shutdown().await;
    }

    /// Flushes the ledger before the process exits.
    pub async fn shutdown(&self) {
        info!("Initiating shutdown process");
        self.lifecycle.cleanup().await;
        info!("TerminalStateManager shutdown complete");
    }
}
