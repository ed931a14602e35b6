//! Goals that can seed the pipeline

use std::collections::HashMap;

use pacestore::{IndexValue, Record, now_ms};
use serde::{Deserialize, Serialize};

use super::id::generate_id;
use super::priority::Priority;

/// A longer-running goal; plans may link back to one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub title: String,
    pub active: bool,
    pub priority: Priority,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Goal {
    pub fn new(title: impl Into<String>, priority: Priority) -> Self {
        let title = title.into();
        let now = now_ms();
        Self {
            id: generate_id("goal", &title),
            title,
            active: true,
            priority,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
        self.updated_at = now_ms();
    }

    /// Highest-priority active goal, oldest first on ties
    pub fn top(goals: &[Goal]) -> Option<&Goal> {
        goals
            .iter()
            .filter(|g| g.active)
            .max_by(|a, b| a.priority.cmp(&b.priority).then(b.created_at.cmp(&a.created_at)))
    }
}

impl Record for Goal {
    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn collection_name() -> &'static str {
        "goals"
    }

    fn indexed_fields(&self) -> HashMap<String, IndexValue> {
        let mut fields = HashMap::new();
        fields.insert("active".to_string(), IndexValue::Bool(self.active));
        fields.insert("priority".to_string(), IndexValue::Int(self.priority.rank()));
        fields
    }
}
