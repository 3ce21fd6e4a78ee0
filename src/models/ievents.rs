//! # Terminal Ledger and Event Definitions

//! This module defines the append-only ledger rows (`GateEvent`, `TripEvent`, `AuditEntry`) that form the historical
//! record of every state change, and the `TerminalEvent` enum broadcast to collaborators after a change commits.
//! Ledger rows are never updated or deleted.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::models::istates::{BookingStatus, CustodyStage, PriorityClass};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateEventType {
    CheckIn,
}

impl GateEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateEventType::CheckIn => "CHECK_IN",
        }
    }
}

/// Optional evidence captured at the gate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateEvidence {
    pub gross_weight_kg: Option<f64>,
    #[serde(default)]
    pub photo_refs: Vec<String>,
    pub notes: Option<String>,
}

/// A gate-side ledger row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateEvent {
    pub id: String,
    pub truck_trip_id: String,
    pub event_type: GateEventType,
    pub actor_id: String,
    pub evidence: GateEvidence,
    pub recorded_at: NaiveDateTime,
}

/// A custody ledger row. `stage` is the custody stage the trip was in when the event was recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripEvent {
    pub id: String,
    pub truck_trip_id: String,
    pub event_type: String,
    pub stage: Option<CustodyStage>,
    pub actor_id: String,
    pub details: Value,
    pub recorded_at: NaiveDateTime,
}

/// One before/after record of a state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: String,
    pub request_id: String,
    pub actor_id: String,
    pub entity_type: String,
    pub entity_id: String,
    pub action: String,
    pub before: Option<Value>,
    pub after: Option<Value>,
    pub recorded_at: NaiveDateTime,
}

/// Ledger rows appended by one or more committed transactions, in commit order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerBatch {
    pub audit: Vec<AuditEntry>,
    pub gate_events: Vec<GateEvent>,
    pub trip_events: Vec<TripEvent>,
}

impl LedgerBatch {
    pub fn len(&self) -> usize {
        self.audit.len() + self.gate_events.len() + self.trip_events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn extend(&mut self, other: LedgerBatch) {
        self.audit.extend(other.audit);
        self.gate_events.extend(other.gate_events);
        self.trip_events.extend(other.trip_events);
    }
}

/// Notable changes emitted after a transaction commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TerminalEvent {
    TruckCheckedIn {
        trip_id: String,
        truck_number: String,
        booking_id: String,
        priority_class: PriorityClass,
        timestamp: NaiveDateTime,
    },
    BayAssigned {
        trip_id: String,
        truck_number: String,
        bay_id: String,
        product_id: String,
        actor_id: String,
        timestamp: NaiveDateTime,
    },
    BayReleased {
        trip_id: String,
        bay_id: String,
        timestamp: NaiveDateTime,
    },
    TripReclassified {
        trip_id: String,
        from: PriorityClass,
        to: PriorityClass,
        reason: String,
        timestamp: NaiveDateTime,
    },
    EtaFlagged {
        trip_id: String,
        eta_minutes: i64,
        timestamp: NaiveDateTime,
    },
    CustodyAdvanced {
        trip_id: String,
        from: CustodyStage,
        to: CustodyStage,
        timestamp: NaiveDateTime,
    },
    BookingStatusChanged {
        booking_id: String,
        from: BookingStatus,
        to: BookingStatus,
        timestamp: NaiveDateTime,
    },
    StopWorkIssued {
        booking_id: String,
        stop_work_id: String,
        reason: String,
        timestamp: NaiveDateTime,
    },
    StopWorkLifted {
        booking_id: String,
        stop_work_id: String,
        timestamp: NaiveDateTime,
    },
}

impl TerminalEvent {
    /// Key used to suppress repeated notifications about the same subject.
    pub fn subject_key(&self) -> String {
        match self {
            TerminalEvent::TruckCheckedIn { trip_id, .. } => format!("checked_in_{}", trip_id),
            TerminalEvent::BayAssigned { bay_id, trip_id, .. } => format!("bay_assigned_{}_{}", bay_id, trip_id),
            TerminalEvent::BayReleased { bay_id, trip_id, .. } => format!("bay_released_{}_{}", bay_id, trip_id),
            TerminalEvent::TripReclassified { trip_id, to, .. } => format!("reclassified_{}_{}", trip_id, to),
            TerminalEvent::EtaFlagged { trip_id, .. } => format!("eta_flagged_{}", trip_id),
            TerminalEvent::CustodyAdvanced { trip_id, to, .. } => format!("custody_{}_{}", trip_id, to),
            TerminalEvent::BookingStatusChanged { booking_id, to, .. } => format!("booking_{}_{}", booking_id, to),
            TerminalEvent::StopWorkIssued { stop_work_id, .. } => format!("stop_work_issued_{}", stop_work_id),
            TerminalEvent::StopWorkLifted { stop_work_id, .. } => format!("stop_work_lifted_{}", stop_work_id),
        }
    }
}
