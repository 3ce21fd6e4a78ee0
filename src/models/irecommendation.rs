use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use crate::models::istates::RecommendationKind;

/// An advisory suggestion produced outside the engine. Never authoritative; `applied_at` marks it consumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiRecommendation {
    pub id: String,
    pub kind: RecommendationKind,
    pub truck_trip_id: Option<String>,
    pub bay_id: Option<String>,
    /// Between 0.0 and 1.0.
    pub confidence: f64,
    pub rationale: String,
    pub created_at: NaiveDateTime,
    pub applied_at: Option<NaiveDateTime>,
    pub applied_by_action: Option<String>,
}

impl AiRecommendation {
    /// Stamps the recommendation as consumed. Re-applying keeps the first stamp.
    pub fn mark_applied(&mut self, action: String, now: NaiveDateTime) -> bool {
        if self.applied_at.is_some() {
            return false;
        }
        self.applied_at = Some(now);
        self.applied_by_action = Some(action);
        true
    }
}
