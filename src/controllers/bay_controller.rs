use std::sync::Arc;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use crate::controllers::booking_controller::require_text;
use crate::errors::{TerminalError, TerminalResult};
use crate::models::{
    local_now, new_id, AiRecommendation, Bay, BayScheduleBlock, BlockSource, BlockStatus, Gantry, PriorityClass,
    RecommendationKind, TerminalEvent, TripStatus, TruckTrip,
};
use crate::monitoring::ReadyQueueEntry;
use crate::rules::SafetyAction;
use crate::services::auth::ActorContext;
use crate::state_management::TerminalStateManager;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AssignBayRequest {
    pub trip_id: String,
    pub bay_id: String,
    pub recommendation_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BayAssignment {
    pub bay: Bay,
    pub trip: TruckTrip,
    pub block: BayScheduleBlock,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewRecommendation {
    pub kind: RecommendationKind,
    pub truck_trip_id: Option<String>,
    pub bay_id: Option<String>,
    pub confidence: f64,
    pub rationale: String,
}

/// A bay as shown on the console, with its gantry and open schedule blocks.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BayView {
    #[serde(flatten)]
    pub bay: Bay,
    pub gantry: Option<Gantry>,
    pub schedule_blocks: Vec<BayScheduleBlock>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleState {
    pub bays: Vec<BayView>,
    pub ready_queue: Vec<ReadyQueueEntry>,
    pub recent_recommendations: Vec<AiRecommendation>,
}

/// The bay allocation controller: binds ready trips to bays and maintains queue metadata.
pub struct BayController {
    state: Arc<TerminalStateManager>,
}

impl BayController {
    pub fn new(state: Arc<TerminalStateManager>) -> Self {
        info!("Initializing Bay Controller");
        Self { state }
    }

    /// Atomically assigns a ready trip to an available bay.
    ///
    /// Everything is re-checked against current state inside the transaction: the safety gate first, then the bay
    /// (available and unlocked), then the trip (ready for a bay and not already holding one). A failed re-check is a
    /// `Conflict`; the caller should refresh the console and decide again.
    ///
    /// # Arguments
    ///
    /// * `actor` - The controller making the assignment.
    /// * `request` - Trip, bay and the optional recommendation being acted on.
    ///
    /// # Returns
    ///
    /// * `Ok(BayAssignment)` - The locked bay, the updated trip and the new active schedule block
    /// * `Err(TerminalError)` - `NotFound`, `Blocked` or `Conflict`
    pub async fn assign_bay(&self, actor: &ActorContext, request: AssignBayRequest) -> TerminalResult<BayAssignment> {
        require_text("tripId", &request.trip_id)?;
        require_text("bayId", &request.bay_id)?;
        let gate = self.state.safety_gate();
        let window = Duration::minutes(self.state.terminal_settings().default_window_minutes);
        let trip_id = request.trip_id.trim();
        let bay_id = request.bay_id.trim();
        let recommendation_id = request.recommendation_id.as_deref();

        self.state.execute("assign_bay", actor, |tx| {
            let trip = tx.state().trip(trip_id)?;
            let bay = tx.state().bay(bay_id)?;
            let booking = tx.state().booking(&trip.booking_id)?;
            let product_id = booking.product_id.clone();

            gate.check(booking, SafetyAction::BayAssign)?;

            if !bay.is_assignable() {
                return Err(TerminalError::Conflict(format!(
                    "bay {} is no longer available (status {}, locked by {})",
                    bay_id,
                    bay.status,
                    bay.locked_by_trip_id.as_deref().unwrap_or("nobody")
                )));
            }
            if trip.status != TripStatus::InTerminal || !trip.is_ready_for_bay() {
                return Err(TerminalError::Conflict(format!(
                    "trip {} is not ready for a bay (status {}, custody {})",
                    trip_id,
                    trip.status,
                    trip.custody_stage.map(|s| s.to_string()).unwrap_or_else(|| "none".into())
                )));
            }
            if let Some(held) = tx.state().bay_locked_by(trip_id) {
                return Err(TerminalError::Conflict(format!("trip {} already holds bay {}", trip_id, held.id)));
            }

            let now = tx.now();
            let bay_before = bay.clone();
            let truck_number = trip.truck_number.clone();

            let bay = tx.bay_mut(bay_id)?;
            bay.lock_for(trip_id, &product_id, now);
            let bay = bay.clone();

            let block = BayScheduleBlock {
                id: new_id(),
                bay_id: bay_id.to_string(),
                truck_trip_id: trip_id.to_string(),
                start_planned_at: now,
                end_planned_at: now + window,
                start_actual_at: Some(now),
                end_actual_at: None,
                status: BlockStatus::Active,
                source: BlockSource::ControllerConfirmed,
            };
            tx.insert_block(block.clone());

            let trip = tx.trip_mut(trip_id)?;
            trip.queue_position = None;
            trip.touch(now);
            let trip = trip.clone();

            if let Some(rec_id) = recommendation_id {
                let action = format!("ASSIGN:{}", tx.actor().actor_id);
                match tx.recommendation_mut(rec_id) {
                    Some(rec) => {
                        if !rec.mark_applied(action, now) {
                            info!(recommendation_id = rec_id, "Recommendation was already applied");
                        }
                    }
                    None => warn!(recommendation_id = rec_id, "Recommendation not found; assignment proceeds"),
                }
            }

            tx.audit(
                "Bay",
                bay_id,
                "ASSIGN_BAY",
                Some(&bay_before),
                Some(&json!({ "bay": bay, "block": block, "tripId": trip_id })),
            )?;
            tx.emit(TerminalEvent::BayAssigned {
                trip_id: trip_id.to_string(),
                truck_number,
                bay_id: bay_id.to_string(),
                product_id,
                actor_id: tx.actor().actor_id.clone(),
                timestamp: now,
            });
            Ok(BayAssignment { bay, trip, block })
        }).await
    }

    /// Changes the trip's priority class. The reason only lives in the audit trail.
    pub async fn reclassify(&self, actor: &ActorContext, trip_id: &str, priority_class: &str, reason: &str) -> TerminalResult<TruckTrip> {
        let to: PriorityClass = priority_class.parse()?;
        require_text("reason", reason)?;

        self.state.execute("reclassify", actor, |tx| {
            let now = tx.now();
            let trip = tx.trip_mut(trip_id)?;
            let from = trip.priority_class;
            trip.priority_class = to;
            trip.touch(now);
            let trip = trip.clone();

            tx.audit(
                "TruckTrip",
                trip_id,
                "RECLASSIFY",
                Some(&json!({ "priorityClass": from })),
                Some(&json!({ "priorityClass": to, "reason": reason.trim() })),
            )?;
            tx.emit(TerminalEvent::TripReclassified {
                trip_id: trip_id.to_string(),
                from,
                to,
                reason: reason.trim().to_string(),
                timestamp: now,
            });
            Ok(trip)
        }).await
    }

    /// Records a new ETA. Any integer is accepted; implausible values are flagged, not rejected.
    pub async fn update_eta(
        &self,
        actor: &ActorContext,
        trip_id: &str,
        eta_minutes: Option<i64>,
        eta_source: Option<&str>,
    ) -> TerminalResult<TruckTrip> {
        require_text("tripId", trip_id)?;
        let eta_minutes = eta_minutes.ok_or_else(|| TerminalError::Validation("etaMinutes is required".into()))?;
        let eta_source = eta_source
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| TerminalError::Validation("etaSource is required".into()))?;
        let policy = self.state.queue_policy();

        self.state.execute("update_eta", actor, |tx| {
            let now = tx.now();
            let trip = tx.trip_mut(trip_id)?;
            let before = json!({ "etaMinutes": trip.eta_minutes, "etaSource": trip.eta_source, "riskFlags": trip.risk_flags });
            let was_flagged = trip.risk_flags.contains(crate::monitoring::ETA_IMPLAUSIBLE);
            trip.eta_minutes = Some(eta_minutes);
            trip.eta_source = Some(eta_source.to_string());
            trip.eta_updated_at = Some(now);
            let flagged = policy.refresh_eta_flag(trip);
            trip.touch(now);
            let trip = trip.clone();

            tx.audit(
                "TruckTrip",
                trip_id,
                "UPDATE_ETA",
                Some(&before),
                Some(&json!({ "etaMinutes": trip.eta_minutes, "etaSource": trip.eta_source, "riskFlags": trip.risk_flags })),
            )?;
            if flagged && !was_flagged {
                tx.emit(TerminalEvent::EtaFlagged { trip_id: trip_id.to_string(), eta_minutes, timestamp: now });
            }
            Ok(trip)
        }).await
    }

    /// Stores an advisory recommendation for the console.
    pub async fn record_recommendation(&self, actor: &ActorContext, input: NewRecommendation) -> TerminalResult<AiRecommendation> {
        if !input.confidence.is_finite() || !(0.0..=1.0).contains(&input.confidence) {
            return Err(TerminalError::Validation("confidence must be between 0 and 1".into()));
        }
        require_text("rationale", &input.rationale)?;

        self.state.execute("record_recommendation", actor, |tx| {
            if let Some(trip_id) = &input.truck_trip_id {
                tx.state().trip(trip_id)?;
            }
            if let Some(bay_id) = &input.bay_id {
                tx.state().bay(bay_id)?;
            }
            let recommendation = AiRecommendation {
                id: new_id(),
                kind: input.kind,
                truck_trip_id: input.truck_trip_id.clone(),
                bay_id: input.bay_id.clone(),
                confidence: input.confidence,
                rationale: input.rationale.trim().to_string(),
                created_at: tx.now(),
                applied_at: None,
                applied_by_action: None,
            };
            tx.audit(
                "AiRecommendation",
                &recommendation.id,
                "RECORD_RECOMMENDATION",
                None::<&AiRecommendation>,
                Some(&recommendation),
            )?;
            tx.insert_recommendation(recommendation.clone());
            Ok(recommendation)
        }).await
    }

    /// Read-only projection of bays, the ready queue and the latest recommendations.
    pub async fn console_state(&self) -> ConsoleState {
        let policy = self.state.queue_policy();
        let limit = self.state.terminal_settings().recent_recommendations_limit;
        let now = local_now();

        self.state.read(|s| {
            let bays = s
                .bays
                .values()
                .map(|bay| BayView {
                    bay: bay.clone(),
                    gantry: s.gantries.get(&bay.gantry_id).cloned(),
                    schedule_blocks: s.open_blocks_for_bay(&bay.id).into_iter().cloned().collect(),
                })
                .collect();

            let ready_queue = policy.project(
                s.trips.values().filter(|t| t.status == TripStatus::InTerminal),
                now,
                |trip_id| s.bay_locked_by(trip_id).is_some(),
            );

            let mut recent: Vec<&AiRecommendation> = s.recommendations.values().collect();
            recent.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
            let recent_recommendations = recent.into_iter().take(limit).cloned().collect();

            ConsoleState { bays, ready_queue, recent_recommendations }
        }).await
    }
}
