//! # Actors and Authorization

//! Identity is supplied by an upstream service; the engine only consumes the resulting `ActorContext` and asks an
//! `Authorizer` whether the actor may perform an action.

use std::collections::{HashMap, HashSet};
use derive_more::{Constructor, Display};
use serde::{Deserialize, Serialize};
use crate::config::AuthorizationSettings;
use crate::errors::{TerminalError, TerminalResult};

/// Who is acting, in which role, and the request that correlates the change with the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Constructor)]
#[serde(rename_all = "camelCase")]
pub struct ActorContext {
    pub actor_id: String,
    pub role: String,
    pub request_id: String,
}

/// Every operation exposed by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Action {
    #[display("CHECK_IN")]
    CheckIn,
    #[display("SCAN_LOOKUP")]
    ScanLookup,
    #[display("ASSIGN_BAY")]
    AssignBay,
    #[display("RECLASSIFY")]
    Reclassify,
    #[display("UPDATE_ETA")]
    UpdateEta,
    #[display("VIEW_CONSOLE")]
    ViewConsole,
    #[display("ADVANCE_CUSTODY")]
    AdvanceCustody,
    #[display("VERIFY_DOCUMENTS")]
    VerifyDocuments,
    #[display("CREATE_BOOKING")]
    CreateBooking,
    #[display("TRANSITION_BOOKING")]
    TransitionBooking,
    #[display("REGISTER_TRIP")]
    RegisterTrip,
    #[display("ISSUE_QR")]
    IssueQr,
    #[display("ISSUE_STOP_WORK")]
    IssueStopWork,
    #[display("LIFT_STOP_WORK")]
    LiftStopWork,
    #[display("RECORD_RECOMMENDATION")]
    RecordRecommendation,
}

pub trait Authorizer: Send + Sync {
    fn is_authorized(&self, actor: &ActorContext, action: Action) -> bool;

    fn authorize(&self, actor: &ActorContext, action: Action) -> TerminalResult<()> {
        if self.is_authorized(actor, action) {
            Ok(())
        } else {
            Err(TerminalError::Forbidden(format!(
                "actor {} with role {} may not perform {}",
                actor.actor_id, actor.role, action
            )))
        }
    }
}

/// Grants actions per role from configuration. A `*` entry grants every action.
pub struct RoleAuthorizer {
    grants: HashMap<String, HashSet<String>>,
}

impl RoleAuthorizer {
    pub fn from_settings(settings: &AuthorizationSettings) -> Self {
        let grants = settings
            .roles
            .iter()
            .map(|(role, actions)| {
                let actions = actions.iter().map(|a| a.trim().to_ascii_uppercase()).collect();
                (role.trim().to_ascii_lowercase(), actions)
            })
            .collect();
        Self { grants }
    }
}

impl Authorizer for RoleAuthorizer {
    fn is_authorized(&self, actor: &ActorContext, action: Action) -> bool {
        self.grants
            .get(&actor.role.trim().to_ascii_lowercase())
            .map_or(false, |granted| granted.contains("*") || granted.contains(&action.to_string()))
    }
}
