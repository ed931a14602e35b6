//! Activity log entries written through the persistence adapter

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use pacestore::{IndexValue, Record};
use serde::{Deserialize, Serialize};

use super::id::generate_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Stagnation,
    BurstStarted,
    BurstFinished,
    QuickCapture,
    DegradedAdvice,
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stagnation => write!(f, "stagnation"),
            Self::BurstStarted => write!(f, "burst_started"),
            Self::BurstFinished => write!(f, "burst_finished"),
            Self::QuickCapture => write!(f, "quick_capture"),
            Self::DegradedAdvice => write!(f, "degraded_advice"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub id: String,
    pub kind: ActivityKind,
    pub plan_id: Option<String>,
    pub detail: Option<String>,
    pub at: DateTime<Utc>,
}

impl ActivityEvent {
    pub fn new(kind: ActivityKind, plan_id: Option<String>, detail: Option<String>) -> Self {
        Self {
            id: generate_id("event", &kind.to_string()),
            kind,
            plan_id,
            detail,
            at: Utc::now(),
        }
    }
}

impl Record for ActivityEvent {
    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> i64 {
        self.at.timestamp_millis()
    }

    fn collection_name() -> &'static str {
        "activity_events"
    }

    fn indexed_fields(&self) -> HashMap<String, IndexValue> {
        let mut fields = HashMap::new();
        fields.insert("kind".to_string(), IndexValue::String(self.kind.to_string()));
        if let Some(plan_id) = &self.plan_id {
            fields.insert("plan_id".to_string(), IndexValue::String(plan_id.clone()));
        }
        fields
    }
}
