//! # Safety Gate

//! Pure rules deciding whether a requested action may proceed on a booking. The gate runs every registered rule and
//! fails closed: the first rule that blocks decides the outcome.

use std::fmt;
use crate::errors::{TerminalError, TerminalResult};
use crate::models::{Booking, BookingStatus, CustodyStage};

/// The class of action being gated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyAction {
    CheckIn,
    BayAssign,
    CustodyAdvance(CustodyStage),
    BookingAdvance(BookingStatus),
    /// Leaving `STOP_WORK` to resume the booking.
    Resume,
}

impl SafetyAction {
    /// Whether an active stop-work order holds this action. Physical movement and resumption are held;
    /// administrative steps are not.
    pub fn is_held_by_stop_work(&self) -> bool {
        match self {
            SafetyAction::CheckIn | SafetyAction::BayAssign | SafetyAction::Resume => true,
            SafetyAction::CustodyAdvance(stage) => stage.is_physical_movement(),
            SafetyAction::BookingAdvance(status) => status.is_physical_movement(),
        }
    }
}

impl fmt::Display for SafetyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SafetyAction::CheckIn => write!(f, "CHECK_IN"),
            SafetyAction::BayAssign => write!(f, "BAY_ASSIGN"),
            SafetyAction::CustodyAdvance(stage) => write!(f, "CUSTODY_ADVANCE({})", stage),
            SafetyAction::BookingAdvance(status) => write!(f, "BOOKING_ADVANCE({})", status),
            SafetyAction::Resume => write!(f, "RESUME"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Permitted,
    Blocked { reason: String },
}

impl GateDecision {
    pub fn is_blocked(&self) -> bool {
        matches!(self, GateDecision::Blocked { .. })
    }

    pub fn into_result(self) -> TerminalResult<()> {
        match self {
            GateDecision::Permitted => Ok(()),
            GateDecision::Blocked { reason } => Err(TerminalError::Blocked(reason)),
        }
    }
}

/// A single safety precondition.
pub trait SafetyRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn evaluate(&self, booking: &Booking, action: SafetyAction) -> GateDecision;
}

/// Any active stop-work order vetoes physical movement on its booking.
pub struct StopWorkRule;

impl SafetyRule for StopWorkRule {
    fn name(&self) -> &'static str {
        "stop_work"
    }

    fn evaluate(&self, booking: &Booking, action: SafetyAction) -> GateDecision {
        if !action.is_held_by_stop_work() {
            return GateDecision::Permitted;
        }
        let reasons: Vec<&str> = booking.active_stop_work_orders().map(|o| o.reason.as_str()).collect();
        if reasons.is_empty() {
            GateDecision::Permitted
        } else {
            GateDecision::Blocked {
                reason: format!(
                    "{} refused on booking {}: active stop-work order ({})",
                    action,
                    booking.id,
                    reasons.join("; ")
                ),
            }
        }
    }
}

/// Runs every registered rule against a booking.
pub struct SafetyGate {
    rules: Vec<Box<dyn SafetyRule>>,
}

impl Default for SafetyGate {
    fn default() -> Self {
        Self { rules: vec![Box::new(StopWorkRule)] }
    }
}

impl SafetyGate {
    pub fn evaluate(&self, booking: &Booking, action: SafetyAction) -> GateDecision {
        for rule in &self.rules {
            let decision = rule.evaluate(booking, action);
            if decision.is_blocked() {
                tracing::warn!(rule = rule.name(), booking_id = %booking.id, %action, "Safety gate vetoed action");
                return decision;
            }
        }
        GateDecision::Permitted
    }

    /// Evaluates and converts a veto into `TerminalError::Blocked`.
    pub fn check(&self, booking: &Booking, action: SafetyAction) -> TerminalResult<()> {
        self.evaluate(booking, action).into_result()
    }
}
