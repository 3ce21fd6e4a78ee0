//! Axum router and HTTP handlers.
//!
//! `build_router` is the single entry point; `main.rs` attaches the tracing and CORS layers so tests can drive the
//! bare router. Every handler resolves the actor from headers, is admitted by the authorizer and the rate limiter,
//! and answers `{ "requestId", "data" }`.

use std::sync::Arc;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use crate::api::error::{ApiError, ForRequest};
use crate::api::extractors::json_body;
use crate::api::state::AppState;
use crate::controllers::bay_controller::{AssignBayRequest, NewRecommendation};
use crate::controllers::booking_controller::NewBooking;
use crate::controllers::gate_controller::CheckInRequest;
use crate::models::{BookingStatus, CustodyStage};
use crate::services::auth::{Action, ActorContext};

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/console", get(console))
        .route("/v1/gate/scan/:qr_token", get(scan))
        .route("/v1/gate/check-in", post(check_in))
        .route("/v1/bays/assign", post(assign_bay))
        .route("/v1/trips/:id/history", get(trip_history))
        .route("/v1/trips/:id/reclassify", post(reclassify))
        .route("/v1/trips/:id/eta", post(update_eta))
        .route("/v1/trips/:id/custody", post(advance_custody))
        .route("/v1/trips/:id/documents/verified", post(document_verified))
        .route("/v1/trips/:id/qr", post(issue_qr))
        .route("/v1/bookings", post(create_booking))
        .route("/v1/bookings/:id", get(get_booking))
        .route("/v1/bookings/:id/transition", post(transition_booking))
        .route("/v1/bookings/:id/trips", post(register_trip))
        .route("/v1/bookings/:id/stop-work", post(issue_stop_work))
        .route("/v1/bookings/:id/stop-work/:swo_id/lift", post(lift_stop_work))
        .route("/v1/recommendations", post(record_recommendation))
        .with_state(state)
}

fn respond<T: Serialize>(actor: &ActorContext, status: StatusCode, data: T) -> Response {
    (status, Json(json!({ "requestId": actor.request_id, "data": data }))).into_response()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct ReclassifyBody {
    priority_class: String,
    reason: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct EtaBody {
    eta_minutes: Option<i64>,
    eta_source: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct CustodyBody {
    stage: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct DocumentBody {
    document_ref: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct TransitionBody {
    to: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct RegisterTripBody {
    truck_number: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct StopWorkBody {
    reason: String,
}

// GET /v1/health

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "ok": true, "service": st.service, "version": st.version })))
}

// Reads

pub(crate) async fn console(State(st): State<Arc<AppState>>, actor: ActorContext) -> Result<Response, ApiError> {
    st.admit(&actor, Action::ViewConsole)?;
    let console = st.bays.console_state().await;
    Ok(respond(&actor, StatusCode::OK, console))
}

pub(crate) async fn scan(
    State(st): State<Arc<AppState>>,
    Path(qr_token): Path<String>,
    actor: ActorContext,
) -> Result<Response, ApiError> {
    st.admit(&actor, Action::ScanLookup)?;
    let result = st.gate.scan_lookup(&qr_token).await.for_request(&actor)?;
    Ok(respond(&actor, StatusCode::OK, result))
}

pub(crate) async fn trip_history(
    State(st): State<Arc<AppState>>,
    Path(trip_id): Path<String>,
    actor: ActorContext,
) -> Result<Response, ApiError> {
    st.admit(&actor, Action::ViewConsole)?;
    let (gate_events, trip_events) = st.gate.trip_history(&trip_id).await.for_request(&actor)?;
    Ok(respond(&actor, StatusCode::OK, json!({ "gateEvents": gate_events, "tripEvents": trip_events })))
}

pub(crate) async fn get_booking(
    State(st): State<Arc<AppState>>,
    Path(booking_id): Path<String>,
    actor: ActorContext,
) -> Result<Response, ApiError> {
    st.admit(&actor, Action::ViewConsole)?;
    let booking = st.bookings.get_booking(&booking_id).await.for_request(&actor)?;
    Ok(respond(&actor, StatusCode::OK, booking))
}

// Gate

pub(crate) async fn check_in(
    State(st): State<Arc<AppState>>,
    actor: ActorContext,
    body: Result<Json<CheckInRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    st.admit(&actor, Action::CheckIn)?;
    let request = json_body(body, &actor)?;
    let event = st.gate.check_in(&actor, request).await.for_request(&actor)?;
    Ok(respond(&actor, StatusCode::CREATED, event))
}

pub(crate) async fn advance_custody(
    State(st): State<Arc<AppState>>,
    Path(trip_id): Path<String>,
    actor: ActorContext,
    body: Result<Json<CustodyBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    st.admit(&actor, Action::AdvanceCustody)?;
    let body = json_body(body, &actor)?;
    let stage = body.stage.parse::<CustodyStage>().for_request(&actor)?;
    let trip = st.gate.advance_custody(&actor, &trip_id, stage).await.for_request(&actor)?;
    Ok(respond(&actor, StatusCode::OK, trip))
}

pub(crate) async fn document_verified(
    State(st): State<Arc<AppState>>,
    Path(trip_id): Path<String>,
    actor: ActorContext,
    body: Result<Json<DocumentBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    st.admit(&actor, Action::VerifyDocuments)?;
    let body = json_body(body, &actor)?;
    let event = st.gate.record_document_verified(&actor, &trip_id, &body.document_ref).await.for_request(&actor)?;
    Ok(respond(&actor, StatusCode::CREATED, event))
}

// Bays and queue

pub(crate) async fn assign_bay(
    State(st): State<Arc<AppState>>,
    actor: ActorContext,
    body: Result<Json<AssignBayRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    st.admit(&actor, Action::AssignBay)?;
    let request = json_body(body, &actor)?;
    let assignment = st.bays.assign_bay(&actor, request).await.for_request(&actor)?;
    Ok(respond(&actor, StatusCode::OK, assignment))
}

pub(crate) async fn reclassify(
    State(st): State<Arc<AppState>>,
    Path(trip_id): Path<String>,
    actor: ActorContext,
    body: Result<Json<ReclassifyBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    st.admit(&actor, Action::Reclassify)?;
    let body = json_body(body, &actor)?;
    let trip = st
        .bays
        .reclassify(&actor, &trip_id, &body.priority_class, &body.reason)
        .await
        .for_request(&actor)?;
    Ok(respond(&actor, StatusCode::OK, trip))
}

pub(crate) async fn update_eta(
    State(st): State<Arc<AppState>>,
    Path(trip_id): Path<String>,
    actor: ActorContext,
    body: Result<Json<EtaBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    st.admit(&actor, Action::UpdateEta)?;
    let body = json_body(body, &actor)?;
    let trip = st
        .bays
        .update_eta(&actor, &trip_id, body.eta_minutes, body.eta_source.as_deref())
        .await
        .for_request(&actor)?;
    Ok(respond(&actor, StatusCode::OK, trip))
}

pub(crate) async fn record_recommendation(
    State(st): State<Arc<AppState>>,
    actor: ActorContext,
    body: Result<Json<NewRecommendation>, JsonRejection>,
) -> Result<Response, ApiError> {
    st.admit(&actor, Action::RecordRecommendation)?;
    let input = json_body(body, &actor)?;
    let recommendation = st.bays.record_recommendation(&actor, input).await.for_request(&actor)?;
    Ok(respond(&actor, StatusCode::CREATED, recommendation))
}

// Bookings and trips

pub(crate) async fn create_booking(
    State(st): State<Arc<AppState>>,
    actor: ActorContext,
    body: Result<Json<NewBooking>, JsonRejection>,
) -> Result<Response, ApiError> {
    st.admit(&actor, Action::CreateBooking)?;
    let input = json_body(body, &actor)?;
    let booking = st.bookings.create_booking(&actor, input).await.for_request(&actor)?;
    Ok(respond(&actor, StatusCode::CREATED, booking))
}

pub(crate) async fn transition_booking(
    State(st): State<Arc<AppState>>,
    Path(booking_id): Path<String>,
    actor: ActorContext,
    body: Result<Json<TransitionBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    st.admit(&actor, Action::TransitionBooking)?;
    let body = json_body(body, &actor)?;
    let to = body.to.parse::<BookingStatus>().for_request(&actor)?;
    let booking = st.bookings.transition_booking(&actor, &booking_id, to).await.for_request(&actor)?;
    Ok(respond(&actor, StatusCode::OK, booking))
}

pub(crate) async fn register_trip(
    State(st): State<Arc<AppState>>,
    Path(booking_id): Path<String>,
    actor: ActorContext,
    body: Result<Json<RegisterTripBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    st.admit(&actor, Action::RegisterTrip)?;
    let body = json_body(body, &actor)?;
    let trip = st.bookings.register_trip(&actor, &booking_id, &body.truck_number).await.for_request(&actor)?;
    Ok(respond(&actor, StatusCode::CREATED, trip))
}

pub(crate) async fn issue_qr(
    State(st): State<Arc<AppState>>,
    Path(trip_id): Path<String>,
    actor: ActorContext,
) -> Result<Response, ApiError> {
    st.admit(&actor, Action::IssueQr)?;
    let trip = st.bookings.issue_qr(&actor, &trip_id).await.for_request(&actor)?;
    Ok(respond(&actor, StatusCode::OK, trip))
}

pub(crate) async fn issue_stop_work(
    State(st): State<Arc<AppState>>,
    Path(booking_id): Path<String>,
    actor: ActorContext,
    body: Result<Json<StopWorkBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    st.admit(&actor, Action::IssueStopWork)?;
    let body = json_body(body, &actor)?;
    let order = st.bookings.issue_stop_work(&actor, &booking_id, &body.reason).await.for_request(&actor)?;
    Ok(respond(&actor, StatusCode::CREATED, order))
}

pub(crate) async fn lift_stop_work(
    State(st): State<Arc<AppState>>,
    Path((booking_id, stop_work_id)): Path<(String, String)>,
    actor: ActorContext,
) -> Result<Response, ApiError> {
    st.admit(&actor, Action::LiftStopWork)?;
    let order = st.bookings.lift_stop_work(&actor, &booking_id, &stop_work_id).await.for_request(&actor)?;
    Ok(respond(&actor, StatusCode::OK, order))
}
