//! # Ready Queue

//! Ordering and risk labelling for trips waiting on a bay. Nothing here gates a transition: priority classes and risk
//! flags only shape the order and the labels the console shows.

use std::cmp::Ordering;
use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use crate::config::QueueSettings;
use crate::models::{PriorityClass, TruckTrip};

pub const LONG_WAIT: &str = "LONG_WAIT";
pub const ETA_IMPLAUSIBLE: &str = "ETA_IMPLAUSIBLE";

/// Thresholds applied to queued trips.
#[derive(Debug, Clone)]
pub struct QueuePolicy {
    appointment_grace: Duration,
    long_wait: Duration,
    max_plausible_eta_minutes: i64,
}

impl From<&QueueSettings> for QueuePolicy {
    fn from(settings: &QueueSettings) -> Self {
        Self {
            appointment_grace: Duration::minutes(settings.appointment_grace_minutes),
            long_wait: Duration::minutes(settings.long_wait_minutes),
            max_plausible_eta_minutes: settings.max_plausible_eta_minutes,
        }
    }
}

impl QueuePolicy {
    /// System-assigned priority at check-in.
    ///
    /// Operator overrides are kept. Otherwise a truck arriving within the grace window either side of its booked
    /// appointment gets `APPOINTMENT`, anything else is `FCFS`.
    pub fn default_priority(
        &self,
        current: PriorityClass,
        appointment_at: Option<NaiveDateTime>,
        checked_in_at: NaiveDateTime,
    ) -> PriorityClass {
        if current.is_override() {
            return current;
        }
        match appointment_at {
            Some(slot) if (checked_in_at - slot).abs() <= self.appointment_grace => PriorityClass::Appointment,
            _ => PriorityClass::Fcfs,
        }
    }

    pub fn is_eta_plausible(&self, eta_minutes: i64) -> bool {
        (0..=self.max_plausible_eta_minutes).contains(&eta_minutes)
    }

    /// Sets or clears `ETA_IMPLAUSIBLE` from the trip's current ETA. Returns true when the flag is set.
    pub fn refresh_eta_flag(&self, trip: &mut TruckTrip) -> bool {
        match trip.eta_minutes {
            Some(eta) if !self.is_eta_plausible(eta) => {
                trip.risk_flags.insert(ETA_IMPLAUSIBLE.to_string());
                true
            }
            _ => {
                trip.risk_flags.remove(ETA_IMPLAUSIBLE);
                false
            }
        }
    }

    /// Minutes since the trip became ready for a bay.
    pub fn wait_minutes(&self, trip: &TruckTrip, now: NaiveDateTime) -> Option<i64> {
        trip.ready_for_bay_at.map(|ready| (now - ready).num_minutes().max(0))
    }

    pub fn is_long_wait(&self, trip: &TruckTrip, now: NaiveDateTime) -> bool {
        trip.ready_for_bay_at.map_or(false, |ready| now - ready > self.long_wait)
    }

    /// Orders the trips and attaches the derived labels.
    ///
    /// `holds_bay` tells which trips already hold a bay lock; those are no longer waiting and never get `LONG_WAIT`.
    pub fn project<'a, I, H>(&self, trips: I, now: NaiveDateTime, holds_bay: H) -> Vec<ReadyQueueEntry>
    where
        I: IntoIterator<Item = &'a TruckTrip>,
        H: Fn(&str) -> bool,
    {
        let mut ordered: Vec<&TruckTrip> = trips.into_iter().collect();
        ordered.sort_by(|a, b| queue_order(a, b));
        ordered
            .into_iter()
            .map(|trip| {
                let mut trip = trip.clone();
                if self.is_long_wait(&trip, now) && !holds_bay(&trip.id) {
                    trip.risk_flags.insert(LONG_WAIT.to_string());
                }
                ReadyQueueEntry {
                    wait_minutes: self.wait_minutes(&trip, now),
                    trip,
                }
            })
            .collect()
    }
}

/// One row of the ready queue as shown on the console.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyQueueEntry {
    #[serde(flatten)]
    pub trip: TruckTrip,
    pub wait_minutes: Option<i64>,
}

fn nulls_last<T: Ord>(a: &Option<T>, b: &Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Authoritative ready-queue order: queue position, then ready-for-bay time, both with nulls last, then id.
pub fn queue_order(a: &TruckTrip, b: &TruckTrip) -> Ordering {
    nulls_last(&a.queue_position, &b.queue_position)
        .then_with(|| nulls_last(&a.ready_for_bay_at, &b.ready_for_bay_at))
        .then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::local_now;

    fn policy() -> QueuePolicy {
        QueuePolicy::from(&QueueSettings {
            appointment_grace_minutes: 30,
            long_wait_minutes: 120,
            max_plausible_eta_minutes: 1440,
        })
    }

    fn trip(id: &str, position: Option<u32>, ready: Option<NaiveDateTime>) -> TruckTrip {
        let mut trip = TruckTrip::new(id.into(), "bk".into(), format!("TRK-{}", id), local_now());
        trip.queue_position = position;
        trip.ready_for_bay_at = ready;
        trip
    }

    #[test]
    fn positions_first_then_ready_time_then_nulls() {
        let t0 = local_now();
        let trips = vec![
            trip("a", None, Some(t0)),
            trip("b", Some(2), Some(t0 + Duration::minutes(1))),
            trip("c", Some(1), Some(t0 + Duration::minutes(2))),
            trip("d", None, None),
        ];
        let order: Vec<String> = policy().project(&trips, t0, |_| false).into_iter().map(|e| e.trip.id).collect();
        assert_eq!(order, vec!["c", "b", "a", "d"]);
    }

    #[test]
    fn appointment_priority_only_within_grace() {
        let slot = local_now();
        let p = policy();
        assert_eq!(p.default_priority(PriorityClass::Fcfs, Some(slot), slot + Duration::minutes(20)), PriorityClass::Appointment);
        assert_eq!(p.default_priority(PriorityClass::Fcfs, Some(slot), slot + Duration::minutes(45)), PriorityClass::Fcfs);
        assert_eq!(p.default_priority(PriorityClass::Fcfs, None, slot), PriorityClass::Fcfs);
        assert_eq!(p.default_priority(PriorityClass::Blocked, Some(slot), slot), PriorityClass::Blocked);
    }

    #[test]
    fn implausible_eta_flag_is_set_and_cleared() {
        let p = policy();
        let mut t = trip("a", None, None);
        t.eta_minutes = Some(-5);
        assert!(p.refresh_eta_flag(&mut t));
        assert!(t.risk_flags.contains(ETA_IMPLAUSIBLE));
        t.eta_minutes = Some(40);
        assert!(!p.refresh_eta_flag(&mut t));
        assert!(t.risk_flags.is_empty());
    }

    #[test]
    fn long_wait_is_derived_not_stored() {
        let now = local_now();
        let trips = vec![trip("a", None, Some(now - Duration::minutes(180)))];
        let entries = policy().project(&trips, now, |_| false);
        assert!(entries[0].trip.risk_flags.contains(LONG_WAIT));
        assert_eq!(entries[0].wait_minutes, Some(180));
        assert!(trips[0].risk_flags.is_empty());
    }

    #[test]
    fn trips_holding_a_bay_are_not_long_waits() {
        let now = local_now();
        let trips = vec![
            trip("loading", None, Some(now - Duration::minutes(300))),
            trip("waiting", None, Some(now - Duration::minutes(200))),
        ];
        let entries = policy().project(&trips, now, |id| id == "loading");
        assert!(!entries[0].trip.risk_flags.contains(LONG_WAIT));
        assert!(entries[1].trip.risk_flags.contains(LONG_WAIT));
    }
}
