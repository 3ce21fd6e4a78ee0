use std::sync::Arc;
use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use crate::errors::{TerminalError, TerminalResult};
use crate::models::{
    ensure_booking_transition, new_id, Booking, BookingStatus, StopWorkOrder, TerminalEvent, TripStatus, TruckTrip,
};
use crate::rules::SafetyAction;
use crate::services::auth::ActorContext;
use crate::state_management::{TerminalStateManager, TerminalTx};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewBooking {
    pub client_id: String,
    pub product_id: String,
    /// Defaults to the configured terminal.
    pub terminal_id: Option<String>,
    pub quantity_requested: f64,
    pub appointment_at: Option<NaiveDateTime>,
}

pub(crate) fn require_text(field: &str, value: &str) -> TerminalResult<()> {
    if value.trim().is_empty() {
        Err(TerminalError::Validation(format!("{} is required", field)))
    } else {
        Ok(())
    }
}

/// Moves a booking along its lifecycle graph inside a transaction, auditing and announcing the change.
pub(crate) fn apply_booking_status(tx: &mut TerminalTx, booking_id: &str, to: BookingStatus) -> TerminalResult<BookingStatus> {
    let now = tx.now();
    let booking = tx.booking_mut(booking_id)?;
    let from = booking.status;
    ensure_booking_transition(from, to)?;
    booking.set_status(to, now);
    tx.audit(
        "Booking",
        booking_id,
        "TRANSITION_BOOKING",
        Some(&json!({ "status": from })),
        Some(&json!({ "status": to })),
    )?;
    tx.emit(TerminalEvent::BookingStatusChanged {
        booking_id: booking_id.to_string(),
        from,
        to,
        timestamp: now,
    });
    Ok(from)
}

/// Administers bookings, their trips, gate credentials and stop-work orders.
pub struct BookingController {
    state: Arc<TerminalStateManager>,
}

impl BookingController {
    pub fn new(state: Arc<TerminalStateManager>) -> Self {
        info!("Initializing Booking Controller");
        Self { state }
    }

    /// Creates a booking in `DRAFT`.
    ///
    /// # Returns
    ///
    /// * `Err(TerminalError::Validation)` when an id is blank or the quantity is not positive
    pub async fn create_booking(&self, actor: &ActorContext, input: NewBooking) -> TerminalResult<Booking> {
        require_text("clientId", &input.client_id)?;
        require_text("productId", &input.product_id)?;
        if !input.quantity_requested.is_finite() || input.quantity_requested <= 0.0 {
            return Err(TerminalError::Validation("quantityRequested must be greater than zero".into()));
        }
        let terminal_id = match input.terminal_id {
            Some(id) => {
                require_text("terminalId", &id)?;
                id
            }
            None => self.state.terminal_settings().terminal_id.clone(),
        };

        self.state.execute("create_booking", actor, |tx| {
            let booking = Booking::new(
                new_id(),
                input.client_id.trim().to_string(),
                input.product_id.trim().to_string(),
                terminal_id,
                input.quantity_requested,
                input.appointment_at,
                tx.now(),
            );
            tx.audit("Booking", &booking.id, "CREATE_BOOKING", None::<&Booking>, Some(&booking))?;
            tx.insert_booking(booking.clone());
            Ok(booking)
        }).await
    }

    /// Moves a booking to `to` along the lifecycle graph.
    ///
    /// Forward physical statuses are gated by stop-work, and so is leaving `STOP_WORK`.
    pub async fn transition_booking(&self, actor: &ActorContext, booking_id: &str, to: BookingStatus) -> TerminalResult<Booking> {
        let gate = self.state.safety_gate();
        self.state.execute("transition_booking", actor, |tx| {
            let booking = tx.state().booking(booking_id)?;
            let from = booking.status;
            if from == BookingStatus::StopWork && to != BookingStatus::Cancelled {
                gate.check(booking, SafetyAction::Resume)?;
            }
            gate.check(booking, SafetyAction::BookingAdvance(to))?;

            apply_booking_status(tx, booking_id, to)?;
            tx.state().booking(booking_id).cloned()
        }).await
    }

    /// Registers a truck against a booking that is waiting for truck details.
    pub async fn register_trip(&self, actor: &ActorContext, booking_id: &str, truck_number: &str) -> TerminalResult<TruckTrip> {
        require_text("truckNumber", truck_number)?;
        let truck_number = truck_number.trim().to_ascii_uppercase();

        self.state.execute("register_trip", actor, |tx| {
            let status = tx.state().booking(booking_id)?.status;
            match status {
                BookingStatus::OpsScheduled => {
                    apply_booking_status(tx, booking_id, BookingStatus::TruckDetailsPending)?;
                }
                BookingStatus::TruckDetailsPending => {}
                other => {
                    return Err(TerminalError::InvalidState(format!(
                        "booking {} is {}; trucks can only be registered in OPS_SCHEDULED or TRUCK_DETAILS_PENDING",
                        booking_id, other
                    )))
                }
            }

            let trip = TruckTrip::new(new_id(), booking_id.to_string(), truck_number, tx.now());
            tx.audit("TruckTrip", &trip.id, "REGISTER_TRIP", None::<&TruckTrip>, Some(&trip))?;
            tx.insert_trip(trip.clone());
            Ok(trip)
        }).await
    }

    /// Issues a fresh single-use gate credential. Re-issuing before check-in replaces the previous token.
    pub async fn issue_qr(&self, actor: &ActorContext, trip_id: &str) -> TerminalResult<TruckTrip> {
        self.state.execute("issue_qr", actor, |tx| {
            let trip = tx.state().trip(trip_id)?;
            let booking_id = trip.booking_id.clone();
            if !matches!(trip.status, TripStatus::Pending | TripStatus::QrIssued) {
                return Err(TerminalError::InvalidState(format!(
                    "trip {} is {}; a QR code can only be issued before check-in",
                    trip_id, trip.status
                )));
            }
            let booking_status = tx.state().booking(&booking_id)?.status;
            match booking_status {
                BookingStatus::TruckDetailsPending => {
                    apply_booking_status(tx, &booking_id, BookingStatus::QrIssued)?;
                }
                BookingStatus::QrIssued => {}
                other => {
                    return Err(TerminalError::InvalidState(format!(
                        "booking {} is {}; QR codes are issued in TRUCK_DETAILS_PENDING or QR_ISSUED",
                        booking_id, other
                    )))
                }
            }

            let now = tx.now();
            let trip = tx.trip_mut(trip_id)?;
            let before = trip.clone();
            trip.qr_token = Some(uuid::Uuid::new_v4().to_string());
            trip.status = TripStatus::QrIssued;
            trip.touch(now);
            let trip = trip.clone();
            tx.audit("TruckTrip", trip_id, "ISSUE_QR", Some(&before), Some(&trip))?;
            Ok(trip)
        }).await
    }

    /// Raises a stop-work order. The booking moves to `STOP_WORK` when its graph allows it.
    pub async fn issue_stop_work(&self, actor: &ActorContext, booking_id: &str, reason: &str) -> TerminalResult<StopWorkOrder> {
        require_text("reason", reason)?;

        self.state.execute("issue_stop_work", actor, |tx| {
            let status = tx.state().booking(booking_id)?.status;
            if status.is_terminal() {
                return Err(TerminalError::InvalidState(format!(
                    "booking {} is {}; stop-work cannot be issued on a finished booking",
                    booking_id, status
                )));
            }

            let order = StopWorkOrder {
                id: new_id(),
                booking_id: booking_id.to_string(),
                active: true,
                reason: reason.trim().to_string(),
                issued_by: tx.actor().actor_id.clone(),
                issued_at: tx.now(),
                lifted_at: None,
                lifted_by: None,
            };
            tx.booking_mut(booking_id)?.stop_work_orders.push(order.clone());
            if status.can_transition_to(BookingStatus::StopWork) {
                apply_booking_status(tx, booking_id, BookingStatus::StopWork)?;
            }

            tx.audit("StopWorkOrder", &order.id, "ISSUE_STOP_WORK", None::<&StopWorkOrder>, Some(&order))?;
            tx.emit(TerminalEvent::StopWorkIssued {
                booking_id: booking_id.to_string(),
                stop_work_id: order.id.clone(),
                reason: order.reason.clone(),
                timestamp: tx.now(),
            });
            Ok(order)
        }).await
    }

    /// Lifts a stop-work order. The booking status is left for an explicit transition.
    pub async fn lift_stop_work(&self, actor: &ActorContext, booking_id: &str, stop_work_id: &str) -> TerminalResult<StopWorkOrder> {
        self.state.execute("lift_stop_work", actor, |tx| {
            let now = tx.now();
            let actor_id = tx.actor().actor_id.clone();
            let order = tx
                .booking_mut(booking_id)?
                .stop_work_mut(stop_work_id)
                .ok_or_else(|| TerminalError::not_found("StopWorkOrder", stop_work_id))?;
            if !order.active {
                return Err(TerminalError::InvalidState(format!("stop-work order {} is already lifted", stop_work_id)));
            }
            let before = order.clone();
            order.active = false;
            order.lifted_at = Some(now);
            order.lifted_by = Some(actor_id);
            let order = order.clone();
            tx.booking_mut(booking_id)?.updated_at = now;

            tx.audit("StopWorkOrder", stop_work_id, "LIFT_STOP_WORK", Some(&before), Some(&order))?;
            tx.emit(TerminalEvent::StopWorkLifted {
                booking_id: booking_id.to_string(),
                stop_work_id: stop_work_id.to_string(),
                timestamp: now,
            });
            Ok(order)
        }).await
    }

    pub async fn get_booking(&self, booking_id: &str) -> TerminalResult<Booking> {
        self.state.read(|s| s.booking(booking_id).cloned()).await
    }
}
