//! In-process tests for the HTTP boundary. The router is driven through `tower::ServiceExt::oneshot`; no socket is
//! bound.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use iqx_terminal_ops::api::build_router;
use iqx_terminal_ops::config::Settings;
use iqx_terminal_ops::init::build_context;

async fn make_router_with(settings: Settings) -> axum::Router {
    let context = build_context(settings).await.expect("context builds");
    build_router(context.app_state)
}

async fn make_router() -> axum::Router {
    make_router_with(common::settings()).await
}

async fn call(router: axum::Router, req: Request<Body>) -> (StatusCode, bytes::Bytes) {
    let resp = router.oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let body = resp.into_body().collect().await.expect("body collect failed").to_bytes();
    (status, body)
}

fn parse_json(b: bytes::Bytes) -> Value {
    serde_json::from_slice(&b).expect("body is not valid JSON")
}

fn post(uri: &str, role: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-actor-id", "user-1")
        .header("x-actor-role", role)
        .header("x-request-id", "req-42")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str, role: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("x-actor-id", "user-1")
        .header("x-actor-role", role)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn health_returns_200_ok_true() {
    let router = make_router().await;
    let req = Request::builder().method("GET").uri("/v1/health").body(Body::empty()).unwrap();

    let (status, body) = call(router, req).await;
    assert_eq!(status, StatusCode::OK);
    let json = parse_json(body);
    assert_eq!(json["ok"], true);
    assert_eq!(json["service"], "iqx-terminal-ops");
}

#[tokio::test]
async fn console_without_actor_is_401() {
    let router = make_router().await;
    let req = Request::builder().method("GET").uri("/v1/console").body(Body::empty()).unwrap();

    let (status, body) = call(router, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let json = parse_json(body);
    assert_eq!(json["error"]["code"], "UNAUTHORIZED");
    assert!(json["error"]["requestId"].as_str().is_some_and(|id| !id.is_empty()));
}

#[tokio::test]
async fn console_lists_configured_bays() {
    let router = make_router().await;
    let (status, body) = call(router, get("/v1/console", "viewer")).await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    let bays = json["data"]["bays"].as_array().unwrap();
    assert_eq!(bays.len(), 2);
    assert_eq!(bays[0]["id"], "B1");
    assert_eq!(bays[0]["status"], "AVAILABLE");
    assert_eq!(bays[0]["gantry"]["id"], "G1");
    assert!(json["data"]["readyQueue"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn viewer_cannot_create_bookings() {
    let router = make_router().await;
    let body = json!({ "clientId": "C1", "productId": "DIESEL", "quantityRequested": 1000.0 });

    let (status, body) = call(router, post("/v1/bookings", "viewer", body)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(parse_json(body)["error"]["requestId"], "req-42");
}

#[tokio::test]
async fn create_booking_returns_request_id_and_data() {
    let router = make_router().await;
    let body = json!({ "clientId": "C1", "productId": "DIESEL", "quantityRequested": 1000.0 });

    let (status, body) = call(router, post("/v1/bookings", "controller", body)).await;
    assert_eq!(status, StatusCode::CREATED);
    let json = parse_json(body);
    assert_eq!(json["requestId"], "req-42");
    assert_eq!(json["data"]["status"], "DRAFT");
    assert_eq!(json["data"]["terminalId"], "TERM-01");
}

#[tokio::test]
async fn unknown_fields_are_rejected_as_validation() {
    let router = make_router().await;
    let body = json!({ "clientId": "C1", "productId": "DIESEL", "quantityRequested": 1.0, "colour": "red" });

    let (status, body) = call(router, post("/v1/bookings", "controller", body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(parse_json(body)["error"]["code"], "VALIDATION");
}

#[tokio::test]
async fn assigning_an_unknown_trip_is_404() {
    let router = make_router().await;
    let body = json!({ "tripId": "nope", "bayId": "B1" });

    let (status, body) = call(router, post("/v1/bays/assign", "controller", body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(parse_json(body)["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn invalid_booking_transition_is_409() {
    let router = make_router().await;
    let body = json!({ "clientId": "C1", "productId": "DIESEL", "quantityRequested": 1000.0 });
    let (_, created) = call(router.clone(), post("/v1/bookings", "controller", body)).await;
    let booking_id = parse_json(created)["data"]["id"].as_str().unwrap().to_string();

    let uri = format!("/v1/bookings/{}/transition", booking_id);
    let (status, body) = call(router.clone(), post(&uri, "controller", json!({ "to": "LOADED" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(parse_json(body)["error"]["code"], "INVALID_TRANSITION");

    let (status, body) = call(router, post(&uri, "controller", json!({ "to": "FLYING" }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(parse_json(body)["error"]["code"], "VALIDATION");
}

#[tokio::test]
async fn rate_limit_applies_per_actor_and_operation() {
    let mut settings = common::settings();
    settings.rate_limit.max_requests = 2;
    let router = make_router_with(settings).await;

    for _ in 0..2 {
        let (status, _) = call(router.clone(), get("/v1/console", "viewer")).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = call(router, get("/v1/console", "viewer")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(parse_json(body)["error"]["code"], "RATE_LIMITED");
}
