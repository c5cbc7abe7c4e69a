use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domains::workout::WorkoutPlan;

/// Shown in history when a session is logged against a plan that is not loaded.
pub const PLACEHOLDER_WORKOUT_NAME: &str = "Workout";

/// planId -> note text. An absent key and an empty string mean the same thing.
pub type NotesMap = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    #[serde(rename = "_id", alias = "id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(alias = "planId")]
    pub workout_plan_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workout_plan: Option<WorkoutPlan>,
}

impl Bookmark {
    /// Locally installed entry awaiting the server's authoritative copy.
    pub fn synthetic(plan: &WorkoutPlan) -> Self {
        Self {
            id: None,
            workout_plan_id: plan.id.clone(),
            workout_plan: Some(plan.clone()),
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSession {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub workout_plan_id: String,
    pub workout_name: String,
    pub duration: u32,
    pub completed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Body of a create-session write. The store assigns id and completion time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWorkoutSession {
    pub workout_plan_id: String,
    pub workout_name: String,
    pub duration: u32,
    pub notes: String,
}
