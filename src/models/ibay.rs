//! # Loading Bay Representation

//! This module defines the `Bay`, the physical loading position a truck trip is bound to, its owning `Gantry`, and the
//! `BayScheduleBlock` that records each reservation interval on a bay.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use crate::models::istates::{BayStatus, BlockSource, BlockStatus};

/// A structure grouping several bays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gantry {
    pub id: String,
    pub name: String,
}

/// A physical loading position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bay {
    pub id: String,
    pub name: String,
    pub gantry_id: String,
    pub status: BayStatus,
    pub current_product_id: Option<String>,
    pub last_product_id: Option<String>,
    /// Exclusive possession. Non-null exactly when the bay is `OCCUPIED`.
    pub locked_by_trip_id: Option<String>,
    pub updated_at: NaiveDateTime,
}

impl Bay {
    pub fn new(id: String, name: String, gantry_id: String, now: NaiveDateTime) -> Self {
        Bay {
            id,
            name,
            gantry_id,
            status: BayStatus::Available,
            current_product_id: None,
            last_product_id: None,
            locked_by_trip_id: None,
            updated_at: now,
        }
    }

    /// The lock wins over the status field: a locked bay is never assignable.
    pub fn is_assignable(&self) -> bool {
        self.status == BayStatus::Available && self.locked_by_trip_id.is_none()
    }

    pub fn lock_for(&mut self, trip_id: &str, product_id: &str, now: NaiveDateTime) {
        self.status = BayStatus::Occupied;
        self.current_product_id = Some(product_id.to_string());
        self.locked_by_trip_id = Some(trip_id.to_string());
        self.updated_at = now;
    }

    pub fn release(&mut self, now: NaiveDateTime) {
        if let Some(product) = self.current_product_id.take() {
            self.last_product_id = Some(product);
        }
        self.locked_by_trip_id = None;
        self.status = BayStatus::Available;
        self.updated_at = now;
    }
}

/// A reservation interval on a bay for one truck trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BayScheduleBlock {
    pub id: String,
    pub bay_id: String,
    pub truck_trip_id: String,
    pub start_planned_at: NaiveDateTime,
    pub end_planned_at: NaiveDateTime,
    pub start_actual_at: Option<NaiveDateTime>,
    pub end_actual_at: Option<NaiveDateTime>,
    pub status: BlockStatus,
    pub source: BlockSource,
}

impl BayScheduleBlock {
    pub fn is_open(&self) -> bool {
        matches!(self.status, BlockStatus::Planned | BlockStatus::Active)
    }
}
