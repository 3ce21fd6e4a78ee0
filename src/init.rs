use std::sync::Arc;
use anyhow::{Context, Result};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use crate::alerting::AlertManager;
use crate::api::AppState;
use crate::config::Settings;
use crate::event_handling::NotificationWorker;
use crate::services::audit_sink::{AuditSink, MemoryAuditSink, MssqlAuditSink};
use crate::services::auth::RoleAuthorizer;
use crate::services::db::DatabaseService;
use crate::services::RateLimiter;
use crate::state_management::TerminalStateManager;
use crate::utils::logging;

pub struct AppContext {
    pub settings: Arc<Settings>,
    pub state_manager: Arc<TerminalStateManager>,
    pub app_state: Arc<AppState>,
    pub notification_worker: NotificationWorker,
    /// Keeps the non-blocking file writer alive for the life of the process.
    pub log_guard: Option<WorkerGuard>,
}

/// Loads settings, starts logging and wires every component.
pub async fn initialize() -> Result<AppContext> {
    let settings = Settings::new().context("failed to load settings")?;
    let log_guard = logging::init_logger(&settings.logging)?;
    let mut context = build_context(settings).await?;
    context.log_guard = log_guard;
    Ok(context)
}

/// Wires the components for already-loaded settings, without touching the global logger.
pub async fn build_context(settings: Settings) -> Result<AppContext> {
    let settings = Arc::new(settings);

    let sink: Arc<dyn AuditSink> = if settings.database.enabled {
        let db_service = DatabaseService::new(&settings.database)
            .await
            .context("failed to connect to the audit database")?;
        Arc::new(MssqlAuditSink::new(db_service, settings.terminal.terminal_id.clone()))
    } else {
        info!("Ledger database disabled; ledger rows are kept in memory");
        Arc::new(MemoryAuditSink::new())
    };

    let (state_manager, event_receiver) = TerminalStateManager::new(&settings, sink);
    let state_manager = Arc::new(state_manager);

    let alert_manager = Arc::new(AlertManager::new(&settings.notifications)?);
    let notification_worker = NotificationWorker::new(event_receiver, alert_manager);

    let app_state = Arc::new(AppState::new(
        Arc::clone(&state_manager),
        Arc::new(RoleAuthorizer::from_settings(&settings.authorization)),
        RateLimiter::from_settings(&settings.rate_limit),
    ));

    info!(terminal_id = %settings.terminal.terminal_id, "Application context initialized");
    Ok(AppContext {
        settings,
        state_manager,
        app_state,
        notification_worker,
        log_guard: None,
    })
}
