//! # Booking Representation

//! A booking is a client's request to move a quantity of a product through a terminal. It owns its truck trips and
//! carries its stop-work orders eagerly, so the safety gate can decide from the booking alone.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use crate::models::istates::BookingStatus;

/// A client's request to move product through the terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub status: BookingStatus,
    pub client_id: String,
    pub product_id: String,
    pub terminal_id: String,
    /// Requested quantity, in litres.
    pub quantity_requested: f64,
    /// The agreed slot, if the client booked one.
    pub appointment_at: Option<NaiveDateTime>,
    /// Every stop-work order ever raised against this booking, active or lifted.
    pub stop_work_orders: Vec<StopWorkOrder>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// A safety hold scoped to a booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopWorkOrder {
    pub id: String,
    pub booking_id: String,
    pub active: bool,
    pub reason: String,
    pub issued_by: String,
    pub issued_at: NaiveDateTime,
    pub lifted_at: Option<NaiveDateTime>,
    pub lifted_by: Option<String>,
}

impl Booking {
    pub fn new(
        id: String,
        client_id: String,
        product_id: String,
        terminal_id: String,
        quantity_requested: f64,
        appointment_at: Option<NaiveDateTime>,
        now: NaiveDateTime,
    ) -> Self {
        Booking {
            id,
            status: BookingStatus::Draft,
            client_id,
            product_id,
            terminal_id,
            quantity_requested,
            appointment_at,
            stop_work_orders: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn active_stop_work_orders(&self) -> impl Iterator<Item = &StopWorkOrder> {
        self.stop_work_orders.iter().filter(|order| order.active)
    }

    pub fn has_active_stop_work(&self) -> bool {
        self.active_stop_work_orders().next().is_some()
    }

    pub fn stop_work_mut(&mut self, stop_work_id: &str) -> Option<&mut StopWorkOrder> {
        self.stop_work_orders.iter_mut().find(|order| order.id == stop_work_id)
    }

    pub fn set_status(&mut self, status: BookingStatus, now: NaiveDateTime) {
        self.status = status;
        self.updated_at = now;
    }
}
