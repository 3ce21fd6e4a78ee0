use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use crate::models::TerminalEvent;
use tracing::{debug, warn};

/// Hands committed `TerminalEvent`s to the notification worker without ever blocking the caller.
#[derive(Clone)]
pub struct EventDispatcher {
    event_sender: mpsc::Sender<TerminalEvent>,
}

impl EventDispatcher {
    pub fn new(event_sender: mpsc::Sender<TerminalEvent>) -> Self {
        Self { event_sender }
    }

    /// Dispatches an event. A full or closed channel drops the event with a warning.
    ///
    /// # Returns
    ///
    /// `true` when the event was queued.
    pub fn dispatch_event(&self, event: TerminalEvent) -> bool {
        debug!("Dispatching event: {:?}", event);
        match self.event_sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                warn!("Notification channel full, dropping event {}", event.subject_key());
                false
            }
            Err(TrySendError::Closed(event)) => {
                warn!("Notification channel closed, dropping event {}", event.subject_key());
                false
            }
        }
    }

    /// Dispatches events in order and returns how many were queued.
    pub fn dispatch_events(&self, events: Vec<TerminalEvent>) -> usize {
        events.into_iter().map(|event| self.dispatch_event(event)).filter(|queued| *queued).count()
    }

    pub fn is_channel_open(&self) -> bool {
        !self.event_sender.is_closed()
    }
}
