//! # Terminal State Repository

//! The authoritative in-memory store of bookings, trips, bays, schedule blocks and recommendations, plus the
//! append-only ledger. Every mutation runs through [`TerminalStateRepository::transaction`] under one exclusive lock.
//! The closure mutates the live snapshot through [`TerminalTx`], which journals the prior value of every entity it
//! hands out. An `Ok` result appends the staged ledger rows; an `Err` replays the journal backwards so nothing is
//! observable.

use std::collections::{BTreeMap, HashMap};
use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;
use crate::config::TerminalSettings;
use crate::errors::{TerminalError, TerminalResult};
use crate::models::{
    local_now, new_id, AiRecommendation, AuditEntry, Bay, BayScheduleBlock, Booking, CustodyStage, Gantry, GateEvent,
    GateEventType, GateEvidence, LedgerBatch, TerminalEvent, TripEvent, TruckTrip,
};
use crate::services::auth::ActorContext;

/// Current state of every mutable entity.
#[derive(Debug, Clone, Default)]
pub struct TerminalSnapshot {
    pub bookings: HashMap<String, Booking>,
    pub trips: HashMap<String, TruckTrip>,
    pub gantries: BTreeMap<String, Gantry>,
    pub bays: BTreeMap<String, Bay>,
    pub blocks: BTreeMap<String, BayScheduleBlock>,
    pub recommendations: HashMap<String, AiRecommendation>,
}

impl TerminalSnapshot {
    pub fn booking(&self, id: &str) -> TerminalResult<&Booking> {
        self.bookings.get(id).ok_or_else(|| TerminalError::not_found("Booking", id))
    }

    pub fn trip(&self, id: &str) -> TerminalResult<&TruckTrip> {
        self.trips.get(id).ok_or_else(|| TerminalError::not_found("TruckTrip", id))
    }

    pub fn bay(&self, id: &str) -> TerminalResult<&Bay> {
        self.bays.get(id).ok_or_else(|| TerminalError::not_found("Bay", id))
    }

    pub fn trip_by_qr(&self, qr_token: &str) -> Option<&TruckTrip> {
        self.trips.values().find(|trip| trip.qr_token.as_deref() == Some(qr_token))
    }

    /// The bay currently locked by the trip, if any.
    pub fn bay_locked_by(&self, trip_id: &str) -> Option<&Bay> {
        self.bays.values().find(|bay| bay.locked_by_trip_id.as_deref() == Some(trip_id))
    }

    /// Open (planned or active) blocks on a bay ordered by planned start.
    pub fn open_blocks_for_bay(&self, bay_id: &str) -> Vec<&BayScheduleBlock> {
        let mut blocks: Vec<&BayScheduleBlock> =
            self.blocks.values().filter(|b| b.bay_id == bay_id && b.is_open()).collect();
        blocks.sort_by(|a, b| a.start_planned_at.cmp(&b.start_planned_at).then_with(|| a.id.cmp(&b.id)));
        blocks
    }
}

/// Append-only history. Rows are pushed on commit and never touched again.
#[derive(Debug, Default)]
pub struct Ledger {
    pub gate_events: Vec<GateEvent>,
    pub trip_events: Vec<TripEvent>,
    pub audit_log: Vec<AuditEntry>,
}

#[derive(Debug, Default)]
struct Staged {
    ledger: LedgerBatch,
    events: Vec<TerminalEvent>,
}

/// The value an entity had before the transaction touched it. `None` means it did not exist.
enum Undo {
    Booking(String, Option<Booking>),
    Trip(String, Option<TruckTrip>),
    Bay(String, Option<Bay>),
    Block(String, Option<BayScheduleBlock>),
    Recommendation(String, Option<AiRecommendation>),
}

fn restore_hashed<V>(map: &mut HashMap<String, V>, id: String, prior: Option<V>) {
    match prior {
        Some(value) => {
            map.insert(id, value);
        }
        None => {
            map.remove(&id);
        }
    }
}

fn restore_ordered<V>(map: &mut BTreeMap<String, V>, id: String, prior: Option<V>) {
    match prior {
        Some(value) => {
            map.insert(id, value);
        }
        None => {
            map.remove(&id);
        }
    }
}

impl Undo {
    fn revert(self, state: &mut TerminalSnapshot) {
        match self {
            Undo::Booking(id, prior) => restore_hashed(&mut state.bookings, id, prior),
            Undo::Trip(id, prior) => restore_hashed(&mut state.trips, id, prior),
            Undo::Bay(id, prior) => restore_ordered(&mut state.bays, id, prior),
            Undo::Block(id, prior) => restore_ordered(&mut state.blocks, id, prior),
            Undo::Recommendation(id, prior) => restore_hashed(&mut state.recommendations, id, prior),
        }
    }
}

/// A unit of work against the live snapshot.
///
/// Reads go through [`TerminalTx::state`]; writes go through the `*_mut` and `insert_*` methods so they can be undone.
/// Dropping a transaction that was not committed reverts every write it made.
pub struct TerminalTx<'a> {
    state: &'a mut TerminalSnapshot,
    actor: ActorContext,
    now: NaiveDateTime,
    journal: Vec<Undo>,
    staged: Staged,
}

impl<'a> TerminalTx<'a> {
    fn begin(state: &'a mut TerminalSnapshot, actor: &ActorContext) -> Self {
        Self {
            state,
            actor: actor.clone(),
            now: local_now(),
            journal: Vec::new(),
            staged: Staged::default(),
        }
    }

    fn commit(mut self) -> Staged {
        self.journal.clear();
        std::mem::take(&mut self.staged)
    }

    pub fn state(&self) -> &TerminalSnapshot {
        &*self.state
    }

    pub fn actor(&self) -> &ActorContext {
        &self.actor
    }

    /// The single timestamp used for every change in this transaction.
    pub fn now(&self) -> NaiveDateTime {
        self.now
    }

    pub fn booking_mut(&mut self, id: &str) -> TerminalResult<&mut Booking> {
        let booking = self.state.bookings.get_mut(id).ok_or_else(|| TerminalError::not_found("Booking", id))?;
        self.journal.push(Undo::Booking(id.to_string(), Some(booking.clone())));
        Ok(booking)
    }

    pub fn trip_mut(&mut self, id: &str) -> TerminalResult<&mut TruckTrip> {
        let trip = self.state.trips.get_mut(id).ok_or_else(|| TerminalError::not_found("TruckTrip", id))?;
        self.journal.push(Undo::Trip(id.to_string(), Some(trip.clone())));
        Ok(trip)
    }

    pub fn bay_mut(&mut self, id: &str) -> TerminalResult<&mut Bay> {
        let bay = self.state.bays.get_mut(id).ok_or_else(|| TerminalError::not_found("Bay", id))?;
        self.journal.push(Undo::Bay(id.to_string(), Some(bay.clone())));
        Ok(bay)
    }

    /// The trip's open schedule block, if it has one.
    pub fn open_block_for_trip_mut(&mut self, trip_id: &str) -> Option<&mut BayScheduleBlock> {
        let block = self.state.blocks.values_mut().find(|b| b.truck_trip_id == trip_id && b.is_open())?;
        self.journal.push(Undo::Block(block.id.clone(), Some(block.clone())));
        Some(block)
    }

    pub fn recommendation_mut(&mut self, id: &str) -> Option<&mut AiRecommendation> {
        let recommendation = self.state.recommendations.get_mut(id)?;
        self.journal.push(Undo::Recommendation(id.to_string(), Some(recommendation.clone())));
        Some(recommendation)
    }

    pub fn insert_booking(&mut self, booking: Booking) {
        let prior = self.state.bookings.insert(booking.id.clone(), booking.clone());
        self.journal.push(Undo::Booking(booking.id, prior));
    }

    pub fn insert_trip(&mut self, trip: TruckTrip) {
        let prior = self.state.trips.insert(trip.id.clone(), trip.clone());
        self.journal.push(Undo::Trip(trip.id, prior));
    }

    pub fn insert_block(&mut self, block: BayScheduleBlock) {
        let prior = self.state.blocks.insert(block.id.clone(), block.clone());
        self.journal.push(Undo::Block(block.id, prior));
    }

    pub fn insert_recommendation(&mut self, recommendation: AiRecommendation) {
        let prior = self.state.recommendations.insert(recommendation.id.clone(), recommendation.clone());
        self.journal.push(Undo::Recommendation(recommendation.id, prior));
    }

    /// Stages an audit row with before/after snapshots.
    pub fn audit<B, A>(
        &mut self,
        entity_type: &str,
        entity_id: &str,
        action: &str,
        before: Option<&B>,
        after: Option<&A>,
    ) -> TerminalResult<()>
    where
        B: Serialize + ?Sized,
        A: Serialize + ?Sized,
    {
        let before = before.map(serde_json::to_value).transpose()?;
        let after = after.map(serde_json::to_value).transpose()?;
        self.audit_values(entity_type, entity_id, action, before, after);
        Ok(())
    }

    pub fn audit_values(
        &mut self,
        entity_type: &str,
        entity_id: &str,
        action: &str,
        before: Option<Value>,
        after: Option<Value>,
    ) {
        self.staged.ledger.audit.push(AuditEntry {
            id: new_id(),
            request_id: self.actor.request_id.clone(),
            actor_id: self.actor.actor_id.clone(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            action: action.to_string(),
            before,
            after,
            recorded_at: self.now,
        });
    }

    pub fn gate_event(&mut self, trip_id: &str, event_type: GateEventType, evidence: GateEvidence) -> GateEvent {
        let event = GateEvent {
            id: new_id(),
            truck_trip_id: trip_id.to_string(),
            event_type,
            actor_id: self.actor.actor_id.clone(),
            evidence,
            recorded_at: self.now,
        };
        self.staged.ledger.gate_events.push(event.clone());
        event
    }

    pub fn trip_event(&mut self, trip_id: &str, event_type: &str, stage: Option<CustodyStage>, details: Value) -> TripEvent {
        let event = TripEvent {
            id: new_id(),
            truck_trip_id: trip_id.to_string(),
            event_type: event_type.to_string(),
            stage,
            actor_id: self.actor.actor_id.clone(),
            details,
            recorded_at: self.now,
        };
        self.staged.ledger.trip_events.push(event.clone());
        event
    }

    /// Queues a notification to be dispatched after commit.
    pub fn emit(&mut self, event: TerminalEvent) {
        self.staged.events.push(event);
    }
}

impl Drop for TerminalTx<'_> {
    fn drop(&mut self) {
        if !self.journal.is_empty() {
            debug!("Rolling back {} staged writes", self.journal.len());
        }
        while let Some(undo) = self.journal.pop() {
            undo.revert(&mut *self.state);
        }
    }
}

/// The result of a committed transaction together with what it appended.
#[derive(Debug)]
pub struct Committed<T> {
    pub value: T,
    pub ledger: LedgerBatch,
    pub events: Vec<TerminalEvent>,
}

struct TerminalStore {
    snapshot: TerminalSnapshot,
    ledger: Ledger,
}

/// Serializes all access to terminal state behind a single lock.
pub struct TerminalStateRepository {
    store: Mutex<TerminalStore>,
}

impl Default for TerminalStateRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalStateRepository {
    pub fn new() -> Self {
        Self::with_snapshot(TerminalSnapshot::default())
    }

    pub fn with_snapshot(snapshot: TerminalSnapshot) -> Self {
        Self {
            store: Mutex::new(TerminalStore { snapshot, ledger: Ledger::default() }),
        }
    }

    /// Seeds gantries and bays from the configured terminal layout.
    ///
    /// # Arguments
    ///
    /// * `settings` - The terminal section of the application settings.
    ///
    /// # Returns
    ///
    /// A repository holding one `AVAILABLE` bay per configured bay.
    pub fn from_settings(settings: &TerminalSettings) -> Self {
        let now = local_now();
        let mut snapshot = TerminalSnapshot::default();
        for gantry in &settings.gantries {
            snapshot.gantries.insert(
                gantry.gantry_id.clone(),
                Gantry { id: gantry.gantry_id.clone(), name: gantry.name.clone() },
            );
            for bay in &gantry.bays {
                snapshot.bays.insert(
                    bay.bay_id.clone(),
                    Bay::new(bay.bay_id.clone(), bay.name.clone(), gantry.gantry_id.clone(), now),
                );
            }
        }
        debug!("Seeded {} gantries and {} bays", snapshot.gantries.len(), snapshot.bays.len());
        Self::with_snapshot(snapshot)
    }

    /// Runs `f` as one atomic, serialized unit.
    ///
    /// # Arguments
    ///
    /// * `actor` - The actor the ledger rows are attributed to.
    /// * `f` - The mutation. Returning `Err` rolls back every write it made.
    ///
    /// # Returns
    ///
    /// The closure's value with the ledger rows and notifications it staged.
    pub async fn transaction<T, F>(&self, actor: &ActorContext, f: F) -> TerminalResult<Committed<T>>
    where
        F: FnOnce(&mut TerminalTx<'_>) -> TerminalResult<T> + Send,
    {
        let mut store = self.store.lock().await;
        let TerminalStore { snapshot, ledger } = &mut *store;
        let mut tx = TerminalTx::begin(snapshot, actor);

        let value = f(&mut tx)?;

        let staged = tx.commit();
        ledger.gate_events.extend(staged.ledger.gate_events.iter().cloned());
        ledger.trip_events.extend(staged.ledger.trip_events.iter().cloned());
        ledger.audit_log.extend(staged.ledger.audit.iter().cloned());

        Ok(Committed { value, ledger: staged.ledger, events: staged.events })
    }

    /// Read-only access to the current snapshot.
    pub async fn read<T, F>(&self, f: F) -> T
    where
        F: FnOnce(&TerminalSnapshot) -> T + Send,
    {
        let store = self.store.lock().await;
        f(&store.snapshot)
    }

    pub async fn gate_events_for(&self, trip_id: &str) -> Vec<GateEvent> {
        let store = self.store.lock().await;
        store.ledger.gate_events.iter().filter(|e| e.truck_trip_id == trip_id).cloned().collect()
    }

    pub async fn trip_events_for(&self, trip_id: &str) -> Vec<TripEvent> {
        let store = self.store.lock().await;
        store.ledger.trip_events.iter().filter(|e| e.truck_trip_id == trip_id).cloned().collect()
    }

    pub async fn audit_log(&self) -> Vec<AuditEntry> {
        self.store.lock().await.ledger.audit_log.clone()
    }
}
