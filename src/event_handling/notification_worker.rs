use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use crate::alerting::AlertManager;
use crate::models::TerminalEvent;

/// Drains the notification channel fed by the state manager and hands each event to the `AlertManager`.
///
/// Runs until every sender is dropped. Delivery failures are logged and never reach the operation that produced
/// the event.
pub struct NotificationWorker {
    receiver: mpsc::Receiver<TerminalEvent>,
    alert_manager: Arc<AlertManager>,
}

impl NotificationWorker {
    pub fn new(receiver: mpsc::Receiver<TerminalEvent>, alert_manager: Arc<AlertManager>) -> Self {
        Self { receiver, alert_manager }
    }

    /// Processes events until the channel closes, returning how many were handled.
    pub async fn run(mut self) -> usize {
        info!("NotificationWorker started");
        let mut handled = 0;
        while let Some(event) = self.receiver.recv().await {
            debug!(subject = %event.subject_key(), "Processing notification");
            if let Err(e) = self.alert_manager.handle_event(&event).await {
                error!("Error delivering notification: {}", e);
            }
            handled += 1;
        }
        info!(handled, "NotificationWorker stopped");
        handled
    }
}
