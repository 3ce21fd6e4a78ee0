#![allow(dead_code)]

use std::sync::Arc;
use chrono::NaiveDateTime;
use tokio::sync::mpsc;
use iqx_terminal_ops::config::Settings;
use iqx_terminal_ops::controllers::{BayController, BookingController, GateController};
use iqx_terminal_ops::controllers::booking_controller::NewBooking;
use iqx_terminal_ops::controllers::gate_controller::CheckInRequest;
use iqx_terminal_ops::models::{Booking, BookingStatus, CustodyStage, TerminalEvent, TruckTrip};
use iqx_terminal_ops::services::audit_sink::MemoryAuditSink;
use iqx_terminal_ops::services::auth::ActorContext;
use iqx_terminal_ops::state_management::TerminalStateManager;

pub const SETTINGS_YAML: &str = r#"
database:
  enabled: false
  host: localhost
  port: 1433
  database_name: TERMINAL
  app_name: iqx-terminal-ops-tests
  win_auth: false
  trusted: true
logging:
  level: debug
server:
  bind_address: "127.0.0.1:0"
terminal:
  terminal_id: TERM-01
  default_window_minutes: 90
  recent_recommendations_limit: 20
  gantries:
    - gantry_id: G1
      name: Gantry 1
      bays:
        - bay_id: B1
          name: Bay 1
        - bay_id: B2
          name: Bay 2
queue:
  appointment_grace_minutes: 30
  long_wait_minutes: 120
  max_plausible_eta_minutes: 1440
rate_limit:
  max_requests: 1000
  window_secs: 60
notifications:
  webhook_url: null
  cooldown_secs: 300
  channel_capacity: 256
authorization:
  roles:
    controller: ["*"]
    gate_officer: ["CHECK_IN", "SCAN_LOOKUP", "ADVANCE_CUSTODY", "VERIFY_DOCUMENTS"]
    viewer: ["VIEW_CONSOLE", "SCAN_LOOKUP"]
ledger:
  batch_size: 100
"#;

pub fn settings() -> Settings {
    Settings::from_yaml_str(SETTINGS_YAML).expect("test settings are valid")
}

pub fn controller(actor_id: &str) -> ActorContext {
    ActorContext::new(actor_id.to_string(), "controller".to_string(), format!("req-{}", actor_id))
}

/// The engine wired against an in-memory audit sink.
pub struct Harness {
    pub state: Arc<TerminalStateManager>,
    pub bookings: Arc<BookingController>,
    pub gate: Arc<GateController>,
    pub bays: Arc<BayController>,
    pub sink: Arc<MemoryAuditSink>,
    pub events: mpsc::Receiver<TerminalEvent>,
    pub actor: ActorContext,
}

impl Harness {
    pub fn new() -> Self {
        let sink = Arc::new(MemoryAuditSink::new());
        let (state, events) = TerminalStateManager::new(&settings(), sink.clone());
        let state = Arc::new(state);
        Self {
            bookings: Arc::new(BookingController::new(Arc::clone(&state))),
            gate: Arc::new(GateController::new(Arc::clone(&state))),
            bays: Arc::new(BayController::new(Arc::clone(&state))),
            state,
            sink,
            events,
            actor: controller("ctl-1"),
        }
    }

    /// Drains every notification emitted so far.
    pub fn drain_events(&mut self) -> Vec<TerminalEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    /// A booking walked from `DRAFT` to `OPS_SCHEDULED`.
    pub async fn scheduled_booking(&self, appointment_at: Option<NaiveDateTime>) -> Booking {
        let booking = self
            .bookings
            .create_booking(&self.actor, NewBooking {
                client_id: "CLIENT-1".into(),
                product_id: "DIESEL".into(),
                terminal_id: None,
                quantity_requested: 30_000.0,
                appointment_at,
            })
            .await
            .expect("booking created");
        let mut last = booking;
        for to in [BookingStatus::Submitted, BookingStatus::ClientApproved, BookingStatus::OpsScheduled] {
            last = self.bookings.transition_booking(&self.actor, &last.id, to).await.expect("booking advanced");
        }
        last
    }

    /// A trip holding a QR code against a freshly scheduled booking.
    pub async fn trip_with_qr(&self) -> (Booking, TruckTrip) {
        let booking = self.scheduled_booking(None).await;
        let trip = self.bookings.register_trip(&self.actor, &booking.id, "abc 123").await.expect("trip registered");
        let trip = self.bookings.issue_qr(&self.actor, &trip.id).await.expect("qr issued");
        let booking = self.bookings.get_booking(&booking.id).await.expect("booking exists");
        (booking, trip)
    }

    pub async fn check_in(&self, trip: &TruckTrip) {
        self.gate
            .check_in(&self.actor, CheckInRequest {
                trip_id: None,
                qr_token: trip.qr_token.clone(),
                ..Default::default()
            })
            .await
            .expect("checked in");
    }

    /// A checked-in trip advanced to `READY_FOR_BAY`.
    pub async fn ready_trip(&self) -> (Booking, TruckTrip) {
        let (booking, trip) = self.trip_with_qr().await;
        self.check_in(&trip).await;
        for stage in [CustodyStage::SafetyApproved, CustodyStage::ReadyForBay] {
            self.gate.advance_custody(&self.actor, &trip.id, stage).await.expect("custody advanced");
        }
        let trip = self.state.read(|s| s.trip(&trip.id).cloned()).await.expect("trip exists");
        (booking, trip)
    }
}
