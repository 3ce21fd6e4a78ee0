use std::collections::HashMap;
use chrono::{Duration, NaiveDateTime};
use reqwest::{Client, Url};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use crate::config::NotificationSettings;
use crate::errors::{TerminalError, TerminalResult};
use crate::models::{local_now, TerminalEvent};

/// Turns committed terminal events into operator notifications.
///
/// Messages are posted to the configured webhook as `{"text": ...}`. Without a webhook they are only logged.
/// Repeats about the same subject are suppressed for `cooldown_secs`.
pub struct AlertManager {
    webhook_url: Option<Url>,
    client: Client,
    cooldown: Duration,
    alert_cooldown: Mutex<HashMap<String, NaiveDateTime>>,
}

impl AlertManager {
    pub fn new(settings: &NotificationSettings) -> TerminalResult<Self> {
        info!("Initializing Alert Manager");
        Ok(Self {
            webhook_url: settings.webhook_url()?,
            client: Client::new(),
            cooldown: Duration::seconds(settings.cooldown_secs.min(u32::MAX as u64) as i64),
            alert_cooldown: Mutex::new(HashMap::new()),
        })
    }

    /// Sends a notification for `event` unless one about the same subject went out recently.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The notification was delivered (or logged)
    /// * `Ok(false)` - The notification was suppressed by the cooldown
    /// * `Err(TerminalError::ConnectionError)` - The webhook could not be reached
    pub async fn handle_event(&self, event: &TerminalEvent) -> TerminalResult<bool> {
        self.handle_event_at(event, local_now()).await
    }

    pub async fn handle_event_at(&self, event: &TerminalEvent, now: NaiveDateTime) -> TerminalResult<bool> {
        let key = event.subject_key();
        if !self.check_cooldown(&key, now).await {
            warn!(subject = %key, "Notification suppressed due to cooldown");
            return Ok(false);
        }

        self.send_alert(event).await?;
        let mut cooldown_map = self.alert_cooldown.lock().await;
        cooldown_map.retain(|_, last_sent| now.signed_duration_since(*last_sent) < self.cooldown);
        cooldown_map.insert(key, now);
        Ok(true)
    }

    pub async fn tracked_subjects(&self) -> usize {
        self.alert_cooldown.lock().await.len()
    }

    async fn send_alert(&self, event: &TerminalEvent) -> TerminalResult<()> {
        let message = format_alert_message(event);
        let Some(webhook_url) = &self.webhook_url else {
            info!("{}", message);
            return Ok(());
        };

        let response = self.client.post(webhook_url.clone())
            .json(&json!({ "text": message }))
            .send()
            .await
            .map_err(|e| TerminalError::ConnectionError(e.to_string()))?;

        if response.status().is_success() {
            info!("Notification sent: {}", message);
        } else {
            error!(status = %response.status(), "Failed to send notification: {}", message);
        }
        Ok(())
    }

    async fn check_cooldown(&self, key: &str, now: NaiveDateTime) -> bool {
        let cooldown_map = self.alert_cooldown.lock().await;
        match cooldown_map.get(key) {
            Some(last_sent) => now.signed_duration_since(*last_sent) >= self.cooldown,
            None => true,
        }
    }
}

pub fn format_alert_message(event: &TerminalEvent) -> String {
    match event {
        TerminalEvent::TruckCheckedIn { truck_number, trip_id, priority_class, .. } => {
            format!("🚛 TRUCK CHECKED IN: {} (trip {}) is in the terminal. Priority: {}", truck_number, trip_id, priority_class)
        }
        TerminalEvent::BayAssigned { truck_number, bay_id, product_id, actor_id, .. } => {
            format!("📍 BAY ASSIGNED: {} to bay {} for product {}. Assigned by {}", truck_number, bay_id, product_id, actor_id)
        }
        TerminalEvent::BayReleased { bay_id, trip_id, .. } => {
            format!("✅ BAY RELEASED: Bay {} is available again after trip {}", bay_id, trip_id)
        }
        TerminalEvent::TripReclassified { trip_id, from, to, reason, .. } => {
            format!("🔁 TRIP RECLASSIFIED: Trip {} moved from {} to {}. Reason: {}", trip_id, from, to, reason)
        }
        TerminalEvent::EtaFlagged { trip_id, eta_minutes, .. } => {
            format!("⚠️ IMPLAUSIBLE ETA: Trip {} reported an ETA of {} minutes", trip_id, eta_minutes)
        }
        TerminalEvent::CustodyAdvanced { trip_id, from, to, .. } => {
            format!("📦 CUSTODY ADVANCED: Trip {} moved from {} to {}", trip_id, from, to)
        }
        TerminalEvent::BookingStatusChanged { booking_id, from, to, .. } => {
            format!("📋 BOOKING UPDATED: Booking {} moved from {} to {}", booking_id, from, to)
        }
        TerminalEvent::StopWorkIssued { booking_id, reason, .. } => {
            format!("🛑 STOP WORK ISSUED: Booking {} is halted. Reason: {}", booking_id, reason)
        }
        TerminalEvent::StopWorkLifted { booking_id, stop_work_id, .. } => {
            format!("🟢 STOP WORK LIFTED: Order {} on booking {} was lifted", stop_work_id, booking_id)
        }
    }
}
