use std::sync::Arc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use crate::controllers::booking_controller::{apply_booking_status, require_text};
use crate::errors::{TerminalError, TerminalResult};
use crate::models::{
    ensure_custody_transition, BlockStatus, BookingStatus, CustodyStage, GateEvent, GateEventType, GateEvidence,
    TerminalEvent, TripEvent, TripStatus, TruckTrip,
};
use crate::rules::SafetyAction;
use crate::services::auth::ActorContext;
use crate::state_management::{TerminalStateManager, TerminalTx};

/// A check-in names the trip directly or presents its QR token.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CheckInRequest {
    pub trip_id: Option<String>,
    pub qr_token: Option<String>,
    #[serde(default)]
    pub evidence: GateEvidence,
}

/// What the gate sees after scanning a QR code.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub trip: TruckTrip,
    pub booking_status: BookingStatus,
    pub stop_work_active: bool,
    pub can_check_in: bool,
}

fn custody_event_type(stage: CustodyStage) -> String {
    format!("CUSTODY_{}", stage)
}

/// Runs the gate and custody workflow of a truck trip.
pub struct GateController {
    state: Arc<TerminalStateManager>,
}

impl GateController {
    pub fn new(state: Arc<TerminalStateManager>) -> Self {
        info!("Initializing Gate Controller");
        Self { state }
    }

    /// Checks a truck in at the gate.
    ///
    /// Resolves the trip, runs the safety gate, requires the booking in `QR_ISSUED`/`ARRIVED_GATE` and the trip in
    /// `QR_ISSUED`, then moves both to `IN_TERMINAL` and records a `CHECK_IN` gate event. A second check-in of the same
    /// trip fails with `InvalidState`.
    ///
    /// # Returns
    ///
    /// * `Ok(GateEvent)` - The recorded gate event
    /// * `Err(TerminalError)` - `NotFound`, `Blocked`, `InvalidState` or `Validation`
    pub async fn check_in(&self, actor: &ActorContext, request: CheckInRequest) -> TerminalResult<GateEvent> {
        let trip_ref = request.trip_id.as_deref().map(str::trim).filter(|id| !id.is_empty());
        let qr_ref = request.qr_token.as_deref().map(str::trim).filter(|t| !t.is_empty());
        if trip_ref.is_none() && qr_ref.is_none() {
            return Err(TerminalError::Validation("tripId or qrToken is required".into()));
        }
        if let Some(weight) = request.evidence.gross_weight_kg {
            if !weight.is_finite() || weight <= 0.0 {
                return Err(TerminalError::Validation("grossWeightKg must be a positive number".into()));
            }
        }

        let gate = self.state.safety_gate();
        let policy = self.state.queue_policy();
        let evidence = request.evidence.clone();

        self.state.execute("check_in", actor, |tx| {
            let trip = match trip_ref {
                Some(id) => {
                    let trip = tx.state().trip(id)?;
                    if let Some(token) = qr_ref {
                        if trip.qr_token.as_deref() != Some(token) {
                            return Err(TerminalError::Validation(format!(
                                "qrToken does not belong to trip {}",
                                id
                            )));
                        }
                    }
                    trip
                }
                None => {
                    let token = qr_ref.unwrap_or_default();
                    tx.state()
                        .trip_by_qr(token)
                        .ok_or_else(|| TerminalError::not_found("TruckTrip", format!("qr:{}", token)))?
                }
            };
            let trip_id = trip.id.clone();
            let trip_status = trip.status;
            let booking = tx.state().booking(&trip.booking_id)?;
            let booking_id = booking.id.clone();
            let appointment_at = booking.appointment_at;

            gate.check(booking, SafetyAction::CheckIn)?;

            if !matches!(booking.status, BookingStatus::QrIssued | BookingStatus::ArrivedGate) {
                return Err(TerminalError::InvalidState(format!(
                    "booking {} is {}; check-in requires QR_ISSUED or ARRIVED_GATE",
                    booking_id, booking.status
                )));
            }
            if trip_status != TripStatus::QrIssued {
                return Err(TerminalError::InvalidState(format!(
                    "trip {} is {}; check-in requires QR_ISSUED",
                    trip_id, trip_status
                )));
            }

            if tx.state().booking(&booking_id)?.status == BookingStatus::QrIssued {
                apply_booking_status(tx, &booking_id, BookingStatus::ArrivedGate)?;
            }
            apply_booking_status(tx, &booking_id, BookingStatus::InTerminal)?;

            let now = tx.now();
            let trip = tx.trip_mut(&trip_id)?;
            let before = trip.clone();
            trip.status = TripStatus::InTerminal;
            trip.custody_stage = Some(CustodyStage::GateCheckin);
            trip.checked_in_at = Some(now);
            trip.priority_class = policy.default_priority(trip.priority_class, appointment_at, now);
            trip.touch(now);
            let trip = trip.clone();

            let event = tx.gate_event(&trip_id, GateEventType::CheckIn, evidence);
            tx.trip_event(
                &trip_id,
                &custody_event_type(CustodyStage::GateCheckin),
                Some(CustodyStage::GateCheckin),
                json!({ "gateEventId": event.id }),
            );
            tx.audit("TruckTrip", &trip_id, "CHECK_IN", Some(&before), Some(&trip))?;
            tx.emit(TerminalEvent::TruckCheckedIn {
                trip_id: trip_id.clone(),
                truck_number: trip.truck_number.clone(),
                booking_id,
                priority_class: trip.priority_class,
                timestamp: now,
            });
            Ok(event)
        }).await
    }

    /// Read-only lookup of the trip behind a QR token.
    pub async fn scan_lookup(&self, qr_token: &str) -> TerminalResult<ScanResult> {
        require_text("qrToken", qr_token)?;
        let gate = self.state.safety_gate();
        self.state.read(|s| {
            let trip = s
                .trip_by_qr(qr_token.trim())
                .ok_or_else(|| TerminalError::not_found("TruckTrip", format!("qr:{}", qr_token)))?;
            let booking = s.booking(&trip.booking_id)?;
            let stop_work_active = booking.has_active_stop_work();
            let can_check_in = trip.status == TripStatus::QrIssued
                && matches!(booking.status, BookingStatus::QrIssued | BookingStatus::ArrivedGate)
                && !gate.evaluate(booking, SafetyAction::CheckIn).is_blocked();
            Ok(ScanResult {
                trip: trip.clone(),
                booking_status: booking.status,
                stop_work_active,
                can_check_in,
            })
        }).await
    }

    /// Advances the trip's custody stage along the custody graph.
    ///
    /// Loading completion closes the schedule block, releases the bay and marks trip and booking `LOADED`; `EXITED`
    /// marks both `EXITED`.
    pub async fn advance_custody(&self, actor: &ActorContext, trip_id: &str, to: CustodyStage) -> TerminalResult<TruckTrip> {
        let gate = self.state.safety_gate();
        self.state.execute("advance_custody", actor, |tx| {
            let trip = tx.state().trip(trip_id)?;
            let from = trip.custody_stage.ok_or_else(|| {
                TerminalError::InvalidState(format!("trip {} has not checked in at the gate", trip_id))
            })?;
            let booking_id = trip.booking_id.clone();
            gate.check(tx.state().booking(&booking_id)?, SafetyAction::CustodyAdvance(to))?;
            ensure_custody_transition(from, to)?;

            let before = tx.state().trip(trip_id)?.clone();
            match to {
                CustodyStage::LoadingStarted => start_loading(tx, trip_id)?,
                CustodyStage::LoadingCompleted => complete_loading(tx, trip_id, &booking_id)?,
                CustodyStage::Exited => {
                    tx.trip_mut(trip_id)?.status = TripStatus::Exited;
                    advance_booking_if_legal(tx, &booking_id, BookingStatus::Exited)?;
                }
                _ => {}
            }

            let now = tx.now();
            let trip = tx.trip_mut(trip_id)?;
            trip.custody_stage = Some(to);
            if to == CustodyStage::ReadyForBay {
                trip.ready_for_bay_at = Some(now);
            }
            trip.touch(now);
            let trip = trip.clone();

            tx.trip_event(trip_id, &custody_event_type(to), Some(to), json!({ "from": from, "to": to }));
            tx.audit("TruckTrip", trip_id, "ADVANCE_CUSTODY", Some(&before), Some(&trip))?;
            tx.emit(TerminalEvent::CustodyAdvanced { trip_id: trip_id.to_string(), from, to, timestamp: now });
            Ok(trip)
        }).await
    }

    /// Records that a document was verified, against the trip's current stage. The stage itself does not move.
    pub async fn record_document_verified(&self, actor: &ActorContext, trip_id: &str, document_ref: &str) -> TerminalResult<TripEvent> {
        require_text("documentRef", document_ref)?;
        self.state.execute("record_document_verified", actor, |tx| {
            let stage = tx.state().trip(trip_id)?.custody_stage.ok_or_else(|| {
                TerminalError::InvalidState(format!("trip {} has not checked in at the gate", trip_id))
            })?;
            let details = json!({ "documentRef": document_ref.trim() });
            let event = tx.trip_event(trip_id, "DOC_VERIFIED", Some(stage), details.clone());
            tx.audit("TruckTrip", trip_id, "DOC_VERIFIED", None::<&TripEvent>, Some(&details))?;
            Ok(event)
        }).await
    }

    pub async fn trip_history(&self, trip_id: &str) -> TerminalResult<(Vec<GateEvent>, Vec<TripEvent>)> {
        self.state.read(|s| s.trip(trip_id).map(|_| ())).await?;
        let repository = self.state.repository();
        Ok((repository.gate_events_for(trip_id).await, repository.trip_events_for(trip_id).await))
    }
}

fn advance_booking_if_legal(tx: &mut TerminalTx, booking_id: &str, to: BookingStatus) -> TerminalResult<()> {
    if tx.state().booking(booking_id)?.status.can_transition_to(to) {
        apply_booking_status(tx, booking_id, to)?;
    }
    Ok(())
}

fn start_loading(tx: &mut TerminalTx, trip_id: &str) -> TerminalResult<()> {
    let now = tx.now();
    let block = tx.open_block_for_trip_mut(trip_id).ok_or_else(|| {
        TerminalError::InvalidState(format!("trip {} has no bay assigned; loading cannot start", trip_id))
    })?;
    let before = block.clone();
    block.status = BlockStatus::Active;
    block.start_actual_at.get_or_insert(now);
    let after = block.clone();
    if after != before {
        tx.audit("BayScheduleBlock", &after.id, "START_BLOCK", Some(&before), Some(&after))?;
    }
    Ok(())
}

fn complete_loading(tx: &mut TerminalTx, trip_id: &str, booking_id: &str) -> TerminalResult<()> {
    let now = tx.now();
    let block = tx.open_block_for_trip_mut(trip_id).ok_or_else(|| {
        TerminalError::InvalidState(format!("trip {} has no open schedule block", trip_id))
    })?;
    let block_before = block.clone();
    block.status = BlockStatus::Completed;
    block.end_actual_at = Some(now);
    let block_after = block.clone();
    let bay_id = block_after.bay_id.clone();
    tx.audit("BayScheduleBlock", &block_after.id, "COMPLETE_BLOCK", Some(&block_before), Some(&block_after))?;

    let bay = tx.bay_mut(&bay_id)?;
    let bay_before = bay.clone();
    bay.release(now);
    let bay_after = bay.clone();
    tx.audit("Bay", &bay_id, "RELEASE_BAY", Some(&bay_before), Some(&bay_after))?;
    tx.trip_mut(trip_id)?.status = TripStatus::Loaded;
    advance_booking_if_legal(tx, booking_id, BookingStatus::Loaded)?;
    tx.emit(TerminalEvent::BayReleased { trip_id: trip_id.to_string(), bay_id, timestamp: now });
    Ok(())
}
