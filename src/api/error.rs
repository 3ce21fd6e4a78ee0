//! # API Error
//!
//! Maps `TerminalError` to structured HTTP responses. Every error body carries the request id so a caller can find
//! the matching audit and log lines.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;
use crate::errors::{TerminalError, TerminalResult};
use crate::services::auth::ActorContext;

const CONFLICT_HINT: &str = "refresh console state and retry with current data";

#[derive(Debug)]
pub struct ApiError {
    pub error: TerminalError,
    pub request_id: String,
}

impl ApiError {
    pub fn new(error: TerminalError, request_id: impl Into<String>) -> Self {
        Self { error, request_id: request_id.into() }
    }

    pub fn status(&self) -> StatusCode {
        status_for(&self.error)
    }
}

pub fn status_for(error: &TerminalError) -> StatusCode {
    match error {
        TerminalError::NotFound { .. } => StatusCode::NOT_FOUND,
        TerminalError::InvalidState(_)
        | TerminalError::InvalidTransition { .. }
        | TerminalError::Conflict(_) => StatusCode::CONFLICT,
        TerminalError::Blocked(_) => StatusCode::LOCKED,
        TerminalError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        TerminalError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        TerminalError::Forbidden(_) => StatusCode::FORBIDDEN,
        TerminalError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(request_id = %self.request_id, "Internal error: {}", self.error);
            "internal error".to_string()
        } else {
            self.error.to_string()
        };

        let mut body = json!({
            "code": self.error.code(),
            "message": message,
            "requestId": self.request_id,
        });
        if matches!(self.error, TerminalError::Conflict(_)) {
            body["hint"] = json!(CONFLICT_HINT);
        }
        (status, Json(json!({ "error": body }))).into_response()
    }
}

/// Attaches the caller's request id to an engine result.
pub trait ForRequest<T> {
    fn for_request(self, actor: &ActorContext) -> Result<T, ApiError>;
}

impl<T> ForRequest<T> for TerminalResult<T> {
    fn for_request(self, actor: &ActorContext) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::new(e, actor.request_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_status_codes() {
        assert_eq!(status_for(&TerminalError::not_found("Bay", "B9")), StatusCode::NOT_FOUND);
        assert_eq!(status_for(&TerminalError::Blocked("stop work".into())), StatusCode::LOCKED);
        assert_eq!(status_for(&TerminalError::Conflict("taken".into())), StatusCode::CONFLICT);
        assert_eq!(
            status_for(&TerminalError::InvalidTransition { from: "DRAFT".into(), to: "LOADED".into() }),
            StatusCode::CONFLICT
        );
        assert_eq!(status_for(&TerminalError::Validation("x".into())), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status_for(&TerminalError::RateLimited("x".into())), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(status_for(&TerminalError::ConfigError("x".into())), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
