mod common;

use chrono::Duration;
use iqx_terminal_ops::controllers::gate_controller::CheckInRequest;
use iqx_terminal_ops::errors::TerminalError;
use iqx_terminal_ops::models::{
    local_now, BayStatus, BlockStatus, BookingStatus, CustodyStage, GateEventType, GateEvidence, PriorityClass,
    TerminalEvent, TripStatus,
};
use iqx_terminal_ops::controllers::bay_controller::AssignBayRequest;
use common::Harness;

#[test]
fn booking_transitions_follow_the_lifecycle_graph() {
    for from in BookingStatus::ALL {
        for to in BookingStatus::ALL {
            let allowed = from.next_states().contains(to);
            assert_eq!(from.can_transition_to(*to), allowed, "{} -> {}", from, to);
        }
    }
    assert!(BookingStatus::Closed.is_terminal());
    assert!(!BookingStatus::Draft.can_transition_to(BookingStatus::Loaded));
}

#[tokio::test]
async fn illegal_booking_transition_is_rejected_without_change() {
    let h = Harness::new();
    let booking = h.scheduled_booking(None).await;

    let err = h.bookings.transition_booking(&h.actor, &booking.id, BookingStatus::Loaded).await.unwrap_err();
    assert!(matches!(err, TerminalError::InvalidTransition { .. }));

    let after = h.bookings.get_booking(&booking.id).await.unwrap();
    assert_eq!(after.status, BookingStatus::OpsScheduled);
}

#[tokio::test]
async fn check_in_by_qr_moves_trip_and_booking_in_terminal() {
    let mut h = Harness::new();
    let (booking, trip) = h.trip_with_qr().await;
    assert_eq!(trip.truck_number, "ABC 123");
    assert_eq!(booking.status, BookingStatus::QrIssued);

    let event = h
        .gate
        .check_in(&h.actor, CheckInRequest {
            trip_id: None,
            qr_token: trip.qr_token.clone(),
            evidence: GateEvidence { gross_weight_kg: Some(14_500.0), ..Default::default() },
        })
        .await
        .unwrap();
    assert_eq!(event.event_type, GateEventType::CheckIn);
    assert_eq!(event.truck_trip_id, trip.id);
    assert_eq!(event.actor_id, "ctl-1");

    let trip = h.state.read(|s| s.trip(&trip.id).cloned()).await.unwrap();
    assert_eq!(trip.status, TripStatus::InTerminal);
    assert_eq!(trip.custody_stage, Some(CustodyStage::GateCheckin));
    assert_eq!(trip.priority_class, PriorityClass::Fcfs);
    assert!(trip.checked_in_at.is_some());

    let booking = h.bookings.get_booking(&booking.id).await.unwrap();
    assert_eq!(booking.status, BookingStatus::InTerminal);

    let (gate_events, trip_events) = h.gate.trip_history(&trip.id).await.unwrap();
    assert_eq!(gate_events.len(), 1);
    assert_eq!(trip_events[0].event_type, "CUSTODY_GATE_CHECKIN");

    let events = h.drain_events();
    assert!(events.iter().any(|e| matches!(e, TerminalEvent::TruckCheckedIn { trip_id, .. } if *trip_id == trip.id)));
}

#[tokio::test]
async fn second_check_in_is_invalid_state() {
    let h = Harness::new();
    let (_, trip) = h.trip_with_qr().await;
    h.check_in(&trip).await;

    let err = h
        .gate
        .check_in(&h.actor, CheckInRequest { trip_id: Some(trip.id.clone()), ..Default::default() })
        .await
        .unwrap_err();
    assert!(matches!(err, TerminalError::InvalidState(_)));
}

#[tokio::test]
async fn check_in_requires_a_trip_reference() {
    let h = Harness::new();
    let err = h.gate.check_in(&h.actor, CheckInRequest::default()).await.unwrap_err();
    assert!(matches!(err, TerminalError::Validation(_)));

    let err = h
        .gate
        .check_in(&h.actor, CheckInRequest { qr_token: Some("unknown".into()), ..Default::default() })
        .await
        .unwrap_err();
    assert!(matches!(err, TerminalError::NotFound { .. }));
}

#[tokio::test]
async fn appointment_within_grace_gets_appointment_priority() {
    let h = Harness::new();
    let booking = h.scheduled_booking(Some(local_now() + Duration::minutes(10))).await;
    let trip = h.bookings.register_trip(&h.actor, &booking.id, "XYZ-9").await.unwrap();
    let trip = h.bookings.issue_qr(&h.actor, &trip.id).await.unwrap();
    h.check_in(&trip).await;

    let trip = h.state.read(|s| s.trip(&trip.id).cloned()).await.unwrap();
    assert_eq!(trip.priority_class, PriorityClass::Appointment);
}

#[tokio::test]
async fn active_stop_work_blocks_check_in_and_leaves_state_unchanged() {
    let h = Harness::new();
    let (booking, trip) = h.trip_with_qr().await;
    h.bookings.issue_stop_work(&h.actor, &booking.id, "earthing fault").await.unwrap();
    let audit_before = h.state.repository().audit_log().await.len();

    let err = h
        .gate
        .check_in(&h.actor, CheckInRequest { trip_id: Some(trip.id.clone()), ..Default::default() })
        .await
        .unwrap_err();
    assert!(matches!(err, TerminalError::Blocked(_)));

    let trip_after = h.state.read(|s| s.trip(&trip.id).cloned()).await.unwrap();
    assert_eq!(trip_after.status, TripStatus::QrIssued);
    assert!(h.state.repository().gate_events_for(&trip.id).await.is_empty());
    assert_eq!(h.state.repository().audit_log().await.len(), audit_before);
}

#[tokio::test]
async fn scan_lookup_reports_stop_work() {
    let h = Harness::new();
    let (booking, trip) = h.trip_with_qr().await;
    let token = trip.qr_token.clone().unwrap();

    let scan = h.gate.scan_lookup(&token).await.unwrap();
    assert!(scan.can_check_in);
    assert!(!scan.stop_work_active);

    h.bookings.issue_stop_work(&h.actor, &booking.id, "spill").await.unwrap();
    let scan = h.gate.scan_lookup(&token).await.unwrap();
    assert!(!scan.can_check_in);
    assert!(scan.stop_work_active);
    assert_eq!(scan.booking_status, BookingStatus::StopWork);
}

#[tokio::test]
async fn leaving_stop_work_requires_every_order_lifted() {
    let h = Harness::new();
    let booking = h.scheduled_booking(None).await;
    let order = h.bookings.issue_stop_work(&h.actor, &booking.id, "lightning").await.unwrap();
    assert_eq!(h.bookings.get_booking(&booking.id).await.unwrap().status, BookingStatus::StopWork);

    let err = h.bookings.transition_booking(&h.actor, &booking.id, BookingStatus::OpsScheduled).await.unwrap_err();
    assert!(matches!(err, TerminalError::Blocked(_)));

    let lifted = h.bookings.lift_stop_work(&h.actor, &booking.id, &order.id).await.unwrap();
    assert!(!lifted.active);
    assert!(lifted.lifted_at.is_some());
    assert_eq!(h.bookings.get_booking(&booking.id).await.unwrap().status, BookingStatus::StopWork);

    let err = h.bookings.lift_stop_work(&h.actor, &booking.id, &order.id).await.unwrap_err();
    assert!(matches!(err, TerminalError::InvalidState(_)));

    let resumed = h.bookings.transition_booking(&h.actor, &booking.id, BookingStatus::OpsScheduled).await.unwrap();
    assert_eq!(resumed.status, BookingStatus::OpsScheduled);
}

#[tokio::test]
async fn administrative_custody_stages_pass_under_stop_work() {
    let h = Harness::new();
    let (booking, trip) = h.trip_with_qr().await;
    h.check_in(&trip).await;
    h.bookings.issue_stop_work(&h.actor, &booking.id, "inspection").await.unwrap();

    let advanced = h.gate.advance_custody(&h.actor, &trip.id, CustodyStage::SafetyApproved).await.unwrap();
    assert_eq!(advanced.custody_stage, Some(CustodyStage::SafetyApproved));

    let err = h.gate.advance_custody(&h.actor, &trip.id, CustodyStage::ReadyForBay).await.unwrap_err();
    assert!(matches!(err, TerminalError::Blocked(_)));
}

#[tokio::test]
async fn custody_rejects_skipped_stages() {
    let h = Harness::new();
    let (_, trip) = h.trip_with_qr().await;

    let err = h.gate.advance_custody(&h.actor, &trip.id, CustodyStage::SafetyApproved).await.unwrap_err();
    assert!(matches!(err, TerminalError::InvalidState(_)));

    h.check_in(&trip).await;
    let err = h.gate.advance_custody(&h.actor, &trip.id, CustodyStage::LoadingStarted).await.unwrap_err();
    assert!(matches!(err, TerminalError::InvalidTransition { .. }));
}

#[tokio::test]
async fn document_verification_keeps_the_stage() {
    let h = Harness::new();
    let (_, trip) = h.trip_with_qr().await;
    h.check_in(&trip).await;

    let event = h.gate.record_document_verified(&h.actor, &trip.id, "DN-4411").await.unwrap();
    assert_eq!(event.event_type, "DOC_VERIFIED");
    assert_eq!(event.stage, Some(CustodyStage::GateCheckin));

    let trip = h.state.read(|s| s.trip(&trip.id).cloned()).await.unwrap();
    assert_eq!(trip.custody_stage, Some(CustodyStage::GateCheckin));
}

#[tokio::test]
async fn loading_through_exit_releases_the_bay() {
    let mut h = Harness::new();
    let (booking, trip) = h.ready_trip().await;
    h.bays
        .assign_bay(&h.actor, AssignBayRequest { trip_id: trip.id.clone(), bay_id: "B1".into(), recommendation_id: None })
        .await
        .unwrap();

    for stage in [CustodyStage::LoadingStarted, CustodyStage::LoadingCompleted] {
        h.gate.advance_custody(&h.actor, &trip.id, stage).await.unwrap();
    }

    let (bay, blocks, trip_now) = h
        .state
        .read(|s| {
            let blocks: Vec<_> = s.blocks.values().filter(|b| b.truck_trip_id == trip.id).cloned().collect();
            (s.bay("B1").cloned(), blocks, s.trip(&trip.id).cloned())
        })
        .await;
    let bay = bay.unwrap();
    assert_eq!(bay.status, BayStatus::Available);
    assert_eq!(bay.locked_by_trip_id, None);
    assert_eq!(bay.last_product_id.as_deref(), Some("DIESEL"));
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].status, BlockStatus::Completed);
    assert!(blocks[0].end_actual_at.is_some());
    assert_eq!(trip_now.unwrap().status, TripStatus::Loaded);
    assert_eq!(h.bookings.get_booking(&booking.id).await.unwrap().status, BookingStatus::Loaded);

    for stage in [CustodyStage::WeighOut, CustodyStage::Sealed, CustodyStage::CustodyTransferred, CustodyStage::Exited] {
        h.gate.advance_custody(&h.actor, &trip.id, stage).await.unwrap();
    }
    let trip_now = h.state.read(|s| s.trip(&trip.id).cloned()).await.unwrap();
    assert_eq!(trip_now.status, TripStatus::Exited);
    assert_eq!(h.bookings.get_booking(&booking.id).await.unwrap().status, BookingStatus::Exited);

    let events = h.drain_events();
    assert!(events.iter().any(|e| matches!(e, TerminalEvent::BayReleased { bay_id, .. } if bay_id == "B1")));
}

#[tokio::test]
async fn committed_audit_rows_reach_the_sink_on_flush() {
    let h = Harness::new();
    let (_, trip) = h.trip_with_qr().await;
    h.check_in(&trip).await;
    assert!(h.sink.entries().await.is_empty());

    h.state.flush_ledger().await.unwrap();
    let entries = h.sink.entries().await;
    assert_eq!(entries.len(), h.state.repository().audit_log().await.len());
    assert!(entries.iter().any(|e| e.action == "CHECK_IN" && e.entity_id == trip.id && e.request_id == "req-ctl-1"));
}

#[tokio::test]
async fn check_in_audits_the_booking_moves_it_causes() {
    let h = Harness::new();
    let (booking, trip) = h.trip_with_qr().await;
    h.check_in(&trip).await;

    let moves: Vec<(String, String)> = h
        .state
        .repository()
        .audit_log()
        .await
        .into_iter()
        .filter(|e| e.entity_type == "Booking" && e.entity_id == booking.id && e.action == "TRANSITION_BOOKING")
        .map(|e| (e.before.unwrap()["status"].to_string(), e.after.unwrap()["status"].to_string()))
        .collect();

    let expected = [
        ("DRAFT", "SUBMITTED"),
        ("SUBMITTED", "CLIENT_APPROVED"),
        ("CLIENT_APPROVED", "OPS_SCHEDULED"),
        ("OPS_SCHEDULED", "TRUCK_DETAILS_PENDING"),
        ("TRUCK_DETAILS_PENDING", "QR_ISSUED"),
        ("QR_ISSUED", "ARRIVED_GATE"),
        ("ARRIVED_GATE", "IN_TERMINAL"),
    ];
    let expected: Vec<(String, String)> =
        expected.iter().map(|(from, to)| (format!("\"{}\"", from), format!("\"{}\"", to))).collect();
    assert_eq!(moves, expected);
}

#[tokio::test]
async fn loading_completion_audits_block_and_bay_release() {
    let h = Harness::new();
    let (booking, trip) = h.ready_trip().await;
    h.bays
        .assign_bay(&h.actor, AssignBayRequest { trip_id: trip.id.clone(), bay_id: "B1".into(), recommendation_id: None })
        .await
        .unwrap();
    for stage in [CustodyStage::LoadingStarted, CustodyStage::LoadingCompleted] {
        h.gate.advance_custody(&h.actor, &trip.id, stage).await.unwrap();
    }

    let audit = h.state.repository().audit_log().await;
    let bay_actions: Vec<&str> =
        audit.iter().filter(|e| e.entity_type == "Bay" && e.entity_id == "B1").map(|e| e.action.as_str()).collect();
    assert_eq!(bay_actions, vec!["ASSIGN_BAY", "RELEASE_BAY"]);

    let release = audit.iter().find(|e| e.action == "RELEASE_BAY").unwrap();
    assert_eq!(release.before.as_ref().unwrap()["status"], "OCCUPIED");
    assert_eq!(release.after.as_ref().unwrap()["status"], "AVAILABLE");
    assert!(audit.iter().any(|e| e.entity_type == "BayScheduleBlock" && e.action == "COMPLETE_BLOCK"));
    assert!(audit.iter().any(|e| {
        e.entity_id == booking.id
            && e.action == "TRANSITION_BOOKING"
            && e.after.as_ref().map(|a| a["status"] == "LOADED").unwrap_or(false)
    }));
}

#[tokio::test]
async fn gate_and_custody_events_reach_the_sink_on_flush() {
    let h = Harness::new();
    let (_, trip) = h.ready_trip().await;
    h.gate.record_document_verified(&h.actor, &trip.id, "DOC-77").await.unwrap();
    assert!(h.sink.gate_events().await.is_empty());

    h.state.flush_ledger().await.unwrap();
    let gate_events = h.sink.gate_events().await;
    assert_eq!(gate_events.len(), 1);
    assert_eq!(gate_events[0].truck_trip_id, trip.id);
    assert_eq!(gate_events[0].event_type, GateEventType::CheckIn);

    let trip_events: Vec<String> = h.sink.trip_events().await.into_iter().map(|e| e.event_type).collect();
    assert_eq!(
        trip_events,
        vec!["CUSTODY_GATE_CHECKIN", "CUSTODY_SAFETY_APPROVED", "CUSTODY_READY_FOR_BAY", "DOC_VERIFIED"]
    );
}

#[tokio::test]
async fn check_in_rejects_a_token_from_another_trip() {
    let h = Harness::new();
    let (_, trip) = h.trip_with_qr().await;
    let (_, other) = h.trip_with_qr().await;

    let err = h
        .gate
        .check_in(&h.actor, CheckInRequest {
            trip_id: Some(trip.id.clone()),
            qr_token: other.qr_token.clone(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, TerminalError::Validation(_)));

    let status = h.state.read(|s| s.trip(&trip.id).map(|t| t.status)).await.unwrap();
    assert_eq!(status, TripStatus::QrIssued);

    h.gate
        .check_in(&h.actor, CheckInRequest {
            trip_id: Some(trip.id.clone()),
            qr_token: trip.qr_token.clone(),
            ..Default::default()
        })
        .await
        .unwrap();
}
