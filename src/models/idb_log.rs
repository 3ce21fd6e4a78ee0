//! # Ledger Rows

//! This module defines the flat row shapes written to the ledger tables: `AuditLogRow` for `TERMINAL_AUDIT_LOG`,
//! `GateEventRow` for `TERMINAL_GATE_EVENTS` and `TripEventRow` for `TERMINAL_TRIP_EVENTS`. JSON payloads are stored as
//! text.

#![allow(non_snake_case)]

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx_oldapi::FromRow;
use crate::errors::TerminalResult;
use crate::models::ievents::{AuditEntry, GateEvent, TripEvent};

/// Represents a record to be inserted into the audit table, derived from an `AuditEntry`
#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
pub struct AuditLogRow {
    /// Identifier of the audit entry
    pub AUDIT_ID: String,
    /// Terminal the change happened in
    pub TERMINAL_ID: String,
    /// Request that carried the change
    pub REQUEST_ID: String,
    /// Who made the change
    pub ACTOR_ID: String,
    /// Kind of entity that changed, e.g. `Bay` or `TruckTrip`
    pub ENTITY_TYPE: String,
    pub ENTITY_ID: String,
    /// Operation name, e.g. `ASSIGN_BAY`
    pub ACTION: String,
    /// JSON snapshot before the change
    pub BEFORE_JSON: Option<String>,
    /// JSON snapshot after the change
    pub AFTER_JSON: Option<String>,
    pub LOG_DTTM: NaiveDateTime,
}

impl AuditLogRow {
    /// Creates an `AuditLogRow` from an `AuditEntry`
    ///
    /// # Arguments
    /// * `terminal_id`: The terminal the entry belongs to
    /// * `entry`: The `AuditEntry` to flatten
    ///
    /// # Returns
    /// * A new `AuditLogRow` ready for insertion
    pub fn from_audit_entry(terminal_id: &str, entry: &AuditEntry) -> Self {
        AuditLogRow {
            AUDIT_ID: entry.id.clone(),
            TERMINAL_ID: terminal_id.to_string(),
            REQUEST_ID: entry.request_id.clone(),
            ACTOR_ID: entry.actor_id.clone(),
            ENTITY_TYPE: entry.entity_type.clone(),
            ENTITY_ID: entry.entity_id.clone(),
            ACTION: entry.action.clone(),
            BEFORE_JSON: entry.before.as_ref().map(|v| v.to_string()),
            AFTER_JSON: entry.after.as_ref().map(|v| v.to_string()),
            LOG_DTTM: entry.recorded_at,
        }
    }
}

/// A gate event as stored in `TERMINAL_GATE_EVENTS`
#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
pub struct GateEventRow {
    pub EVENT_ID: String,
    pub TERMINAL_ID: String,
    pub TRIP_ID: String,
    /// e.g. `CHECK_IN`
    pub EVENT_TYPE: String,
    pub ACTOR_ID: String,
    /// Weight, photo references and notes captured at the gate
    pub EVIDENCE_JSON: String,
    pub EVENT_DTTM: NaiveDateTime,
}

impl GateEventRow {
    pub fn from_gate_event(terminal_id: &str, event: &GateEvent) -> TerminalResult<Self> {
        Ok(GateEventRow {
            EVENT_ID: event.id.clone(),
            TERMINAL_ID: terminal_id.to_string(),
            TRIP_ID: event.truck_trip_id.clone(),
            EVENT_TYPE: event.event_type.as_str().to_string(),
            ACTOR_ID: event.actor_id.clone(),
            EVIDENCE_JSON: serde_json::to_string(&event.evidence)?,
            EVENT_DTTM: event.recorded_at,
        })
    }
}

/// A custody event as stored in `TERMINAL_TRIP_EVENTS`
#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
pub struct TripEventRow {
    pub EVENT_ID: String,
    pub TERMINAL_ID: String,
    pub TRIP_ID: String,
    /// e.g. `CUSTODY_WEIGH_IN` or `DOC_VERIFIED`
    pub EVENT_TYPE: String,
    /// Custody stage the trip was in when the event was recorded
    pub STAGE: Option<String>,
    pub ACTOR_ID: String,
    pub DETAILS_JSON: String,
    pub EVENT_DTTM: NaiveDateTime,
}

impl TripEventRow {
    pub fn from_trip_event(terminal_id: &str, event: &TripEvent) -> Self {
        TripEventRow {
            EVENT_ID: event.id.clone(),
            TERMINAL_ID: terminal_id.to_string(),
            TRIP_ID: event.truck_trip_id.clone(),
            EVENT_TYPE: event.event_type.clone(),
            STAGE: event.stage.map(|s| s.as_str().to_string()),
            ACTOR_ID: event.actor_id.clone(),
            DETAILS_JSON: event.details.to_string(),
            EVENT_DTTM: event.recorded_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flattens_snapshots_to_json_text() {
        let entry = AuditEntry {
            id: "a-1".to_string(),
            request_id: "req-1".to_string(),
            actor_id: "ctl-1".to_string(),
            entity_type: "Bay".to_string(),
            entity_id: "bay-1".to_string(),
            action: "ASSIGN_BAY".to_string(),
            before: None,
            after: Some(json!({"status": "OCCUPIED"})),
            recorded_at: crate::models::local_now(),
        };

        let row = AuditLogRow::from_audit_entry("TERM-01", &entry);
        assert_eq!(row.TERMINAL_ID, "TERM-01");
        assert_eq!(row.BEFORE_JSON, None);
        assert_eq!(row.AFTER_JSON.as_deref(), Some(r#"{"status":"OCCUPIED"}"#));
    }

    #[test]
    fn trip_event_row_keeps_stage_name_and_details() {
        let event = TripEvent {
            id: "e-1".to_string(),
            truck_trip_id: "trip-1".to_string(),
            event_type: "CUSTODY_WEIGH_IN".to_string(),
            stage: Some(crate::models::CustodyStage::WeighIn),
            actor_id: "gate-1".to_string(),
            details: json!({"from": "GATE_CHECKIN"}),
            recorded_at: crate::models::local_now(),
        };

        let row = TripEventRow::from_trip_event("TERM-01", &event);
        assert_eq!(row.STAGE.as_deref(), Some("WEIGH_IN"));
        assert_eq!(row.DETAILS_JSON, r#"{"from":"GATE_CHECKIN"}"#);
    }

    #[test]
    fn gate_event_row_serializes_evidence() {
        let event = GateEvent {
            id: "g-1".to_string(),
            truck_trip_id: "trip-1".to_string(),
            event_type: crate::models::GateEventType::CheckIn,
            actor_id: "gate-1".to_string(),
            evidence: crate::models::GateEvidence { gross_weight_kg: Some(15000.0), ..Default::default() },
            recorded_at: crate::models::local_now(),
        };

        let row = GateEventRow::from_gate_event("TERM-01", &event).unwrap();
        assert_eq!(row.EVENT_TYPE, "CHECK_IN");
        assert!(row.EVIDENCE_JSON.contains("\"grossWeightKg\":15000.0"));
    }
}
