//! # Truck Trip Representation

//! One physical vehicle movement against a booking. A trip carries two state machines at once: the coarse
//! `TripStatus` shared with the booking and the fine-grained `CustodyStage` that only exists once the truck is through
//! the gate. Queue fields (`priority_class`, `queue_position`, `ready_for_bay_at`) and ETA fields feed the ready queue.

use std::collections::BTreeSet;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use crate::models::istates::{CustodyStage, PriorityClass, TripStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TruckTrip {
    pub id: String,
    pub booking_id: String,
    pub truck_number: String,
    pub status: TripStatus,
    /// `None` until the truck has checked in at the gate.
    pub custody_stage: Option<CustodyStage>,
    pub priority_class: PriorityClass,
    /// Ordinal assigned by the sequencing pass; `None` for newly arrived trips.
    pub queue_position: Option<u32>,
    pub ready_for_bay_at: Option<NaiveDateTime>,
    pub eta_minutes: Option<i64>,
    pub eta_source: Option<String>,
    pub eta_updated_at: Option<NaiveDateTime>,
    pub risk_flags: BTreeSet<String>,
    /// Single-use gate-entry credential.
    pub qr_token: Option<String>,
    pub checked_in_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl TruckTrip {
    pub fn new(id: String, booking_id: String, truck_number: String, now: NaiveDateTime) -> Self {
        TruckTrip {
            id,
            booking_id,
            truck_number,
            status: TripStatus::Pending,
            custody_stage: None,
            priority_class: PriorityClass::Fcfs,
            queue_position: None,
            ready_for_bay_at: None,
            eta_minutes: None,
            eta_source: None,
            eta_updated_at: None,
            risk_flags: BTreeSet::new(),
            qr_token: None,
            checked_in_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Ready means the truck has cleared every pre-loading custody step.
    pub fn is_ready_for_bay(&self) -> bool {
        self.custody_stage == Some(CustodyStage::ReadyForBay)
    }

    pub fn touch(&mut self, now: NaiveDateTime) {
        self.updated_at = now;
    }
}
