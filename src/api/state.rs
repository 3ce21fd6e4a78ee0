use std::sync::Arc;
use crate::controllers::{BayController, BookingController, GateController};
use crate::services::auth::{Action, ActorContext, Authorizer};
use crate::services::RateLimiter;
use crate::state_management::TerminalStateManager;
use crate::api::error::ApiError;

/// Shared state behind every handler.
pub struct AppState {
    pub bookings: BookingController,
    pub gate: GateController,
    pub bays: BayController,
    pub authorizer: Arc<dyn Authorizer>,
    pub rate_limiter: RateLimiter,
    pub service: &'static str,
    pub version: &'static str,
}

impl AppState {
    pub fn new(state: Arc<TerminalStateManager>, authorizer: Arc<dyn Authorizer>, rate_limiter: RateLimiter) -> Self {
        Self {
            bookings: BookingController::new(Arc::clone(&state)),
            gate: GateController::new(Arc::clone(&state)),
            bays: BayController::new(state),
            authorizer,
            rate_limiter,
            service: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
        }
    }

    /// Authorization first, then the rate budget, so refused calls do not spend it.
    pub fn admit(&self, actor: &ActorContext, action: Action) -> Result<(), ApiError> {
        self.authorizer
            .authorize(actor, action)
            .and_then(|_| self.rate_limiter.check(&actor.actor_id, action))
            .map_err(|e| ApiError::new(e, actor.request_id.clone()))
    }
}
