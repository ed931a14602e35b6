//! Completion rewards

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use pacestore::{IndexValue, Record};
use serde::{Deserialize, Serialize};

use super::id::generate_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardKind {
    StepCompleted,
    PlanCompleted,
}

impl std::fmt::Display for RewardKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StepCompleted => write!(f, "step_completed"),
            Self::PlanCompleted => write!(f, "plan_completed"),
        }
    }
}

/// A reward granted for one completion transition
///
/// The ID is minted when the transition happens, so re-issuing the write for
/// the same transition overwrites rather than duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    pub id: String,
    pub kind: RewardKind,
    pub plan_id: String,
    pub step_id: Option<String>,
    pub granted_at: DateTime<Utc>,
}

impl Reward {
    pub fn step(plan_id: impl Into<String>, step_id: impl Into<String>) -> Self {
        Self {
            id: generate_id("reward", "step"),
            kind: RewardKind::StepCompleted,
            plan_id: plan_id.into(),
            step_id: Some(step_id.into()),
            granted_at: Utc::now(),
        }
    }

    pub fn plan(plan_id: impl Into<String>) -> Self {
        Self {
            id: generate_id("reward", "plan"),
            kind: RewardKind::PlanCompleted,
            plan_id: plan_id.into(),
            step_id: None,
            granted_at: Utc::now(),
        }
    }
}

impl Record for Reward {
    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> i64 {
        self.granted_at.timestamp_millis()
    }

    fn collection_name() -> &'static str {
        "rewards"
    }

    fn indexed_fields(&self) -> HashMap<String, IndexValue> {
        let mut fields = HashMap::new();
        fields.insert("plan_id".to_string(), IndexValue::String(self.plan_id.clone()));
        fields.insert("kind".to_string(), IndexValue::String(self.kind.to_string()));
        fields
    }
}
