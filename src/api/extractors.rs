use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::Json;
use crate::api::error::ApiError;
use crate::errors::TerminalError;
use crate::models::new_id;
use crate::services::auth::ActorContext;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Reads the actor supplied by the upstream identity service. A request id is generated when none was sent.
pub fn actor_from_headers(headers: &HeaderMap) -> Result<ActorContext, ApiError> {
    let request_id = header(headers, REQUEST_ID_HEADER).unwrap_or_else(new_id);
    match (header(headers, ACTOR_ID_HEADER), header(headers, ACTOR_ROLE_HEADER)) {
        (Some(actor_id), Some(role)) => Ok(ActorContext::new(actor_id, role, request_id)),
        _ => Err(ApiError::new(
            TerminalError::Unauthorized(format!("{} and {} headers are required", ACTOR_ID_HEADER, ACTOR_ROLE_HEADER)),
            request_id,
        )),
    }
}

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for ActorContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        actor_from_headers(&parts.headers)
    }
}

/// Unwraps a JSON body, turning malformed or unknown fields into a validation error.
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>, actor: &ActorContext) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::new(TerminalError::Validation(rejection.body_text()), actor.request_id.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn missing_role_is_unauthorized_but_keeps_request_id() {
        let mut headers = HeaderMap::new();
        headers.insert(ACTOR_ID_HEADER, HeaderValue::from_static("ctl-1"));
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("req-7"));

        let err = actor_from_headers(&headers).unwrap_err();
        assert!(matches!(err.error, TerminalError::Unauthorized(_)));
        assert_eq!(err.request_id, "req-7");
    }

    #[test]
    fn request_id_is_generated_when_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(ACTOR_ID_HEADER, HeaderValue::from_static("ctl-1"));
        headers.insert(ACTOR_ROLE_HEADER, HeaderValue::from_static("controller"));

        let actor = actor_from_headers(&headers).unwrap();
        assert_eq!(actor.actor_id, "ctl-1");
        assert!(!actor.request_id.is_empty());
    }
}
