//! Resumable pipeline drafts
//!
//! A `SessionDraft` is the full pipeline state at one stage. The payload is
//! an enum with one variant per stage, so a draft cannot pair a stage with
//! the wrong payload shape. The serialized form still carries `stage` next
//! to the payload tag; a file where the two disagree is rejected on load.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::stage::{PipelineFlags, Stage};
use super::triage::TriageList;
use crate::advice::Degradation;
use crate::domain::{DueDate, EnergyLevel, MicroStep};

/// A task with its context choices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextTask {
    pub id: String,
    pub text: String,
    pub due: DueDate,
    pub energy: EnergyLevel,
    pub related_goal_id: Option<String>,
    pub related_step_id: Option<String>,
    #[serde(default)]
    pub split_further: bool,
}

/// Micro-steps proposed for one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakdown {
    pub task: ContextTask,
    pub steps: Vec<MicroStep>,
    pub degradation: Option<Degradation>,
}

/// Stage-specific pipeline state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DraftPayload {
    BrainDump {
        raw_text: String,
    },
    Triage(TriageList),
    Context {
        tasks: Vec<ContextTask>,
        degradation: Option<Degradation>,
    },
    Breakdown {
        breakdowns: Vec<Breakdown>,
        /// Carried over from the dump parse
        #[serde(default)]
        degradation: Option<Degradation>,
    },
    Dashboard,
}

impl DraftPayload {
    pub fn stage(&self) -> Stage {
        match self {
            Self::BrainDump { .. } => Stage::BrainDump,
            Self::Triage(_) => Stage::Triage,
            Self::Context { .. } => Stage::Context,
            Self::Breakdown { .. } => Stage::Breakdown,
            Self::Dashboard => Stage::Dashboard,
        }
    }

    pub fn empty_dump() -> Self {
        Self::BrainDump { raw_text: String::new() }
    }
}

/// Snapshot of an in-progress pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDraft {
    pub stage: Stage,
    pub payload: DraftPayload,
    pub flags: PipelineFlags,
    pub saved_at: DateTime<Utc>,
}

impl SessionDraft {
    pub fn new(payload: DraftPayload, flags: PipelineFlags) -> Self {
        Self {
            stage: payload.stage(),
            payload,
            flags,
            saved_at: Utc::now(),
        }
    }

    /// A draft still worth resuming
    pub fn is_unfinished(&self) -> bool {
        self.stage != Stage::Dashboard
    }

    pub fn validate(&self) -> Result<(), DraftError> {
        let payload = self.payload.stage();
        if self.stage != payload {
            return Err(DraftError::StageMismatch {
                stage: self.stage,
                payload,
            });
        }
        Ok(())
    }

    fn decode(json: &str) -> Result<Self, DraftError> {
        let draft: Self = serde_json::from_str(json)?;
        draft.validate()?;
        Ok(draft)
    }
}

#[derive(Debug, Error)]
pub enum DraftError {
    #[error("Draft I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Draft is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Draft stage {stage} does not match its {payload} payload")]
    StageMismatch { stage: Stage, payload: Stage },
}

/// Where the single draft lives
pub trait DraftStore: Send + Sync {
    /// The saved draft, if any; invalid drafts are an error
    fn load(&self) -> Result<Option<SessionDraft>, DraftError>;

    fn save(&self, draft: &SessionDraft) -> Result<(), DraftError>;

    fn clear(&self) -> Result<(), DraftError>;
}

/// Draft kept in a JSON file, replaced atomically on every save
pub struct FileDraftStore {
    path: PathBuf,
}

impl FileDraftStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DraftStore for FileDraftStore {
    fn load(&self) -> Result<Option<SessionDraft>, DraftError> {
        debug!(path = %self.path.display(), "FileDraftStore::load: called");
        if !self.path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&self.path)?;
        SessionDraft::decode(&json).map(Some)
    }

    fn save(&self, draft: &SessionDraft) -> Result<(), DraftError> {
        debug!(path = %self.path.display(), stage = %draft.stage, "FileDraftStore::save: called");
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(draft)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), DraftError> {
        debug!(path = %self.path.display(), "FileDraftStore::clear: called");
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Draft kept in memory, still serialized so loads behave like the file store
#[derive(Default)]
pub struct MemoryDraftStore {
    json: Mutex<Option<String>>,
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put raw JSON in place, bypassing validation
    pub fn put_raw(&self, json: impl Into<String>) {
        if let Ok(mut slot) = self.json.lock() {
            *slot = Some(json.into());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.json.lock().map(|slot| slot.is_none()).unwrap_or(true)
    }
}

impl DraftStore for MemoryDraftStore {
    fn load(&self) -> Result<Option<SessionDraft>, DraftError> {
        let slot = self
            .json
            .lock()
            .map_err(|_| DraftError::Io(std::io::Error::other("draft lock poisoned")))?;
        slot.as_deref().map(SessionDraft::decode).transpose()
    }

    fn save(&self, draft: &SessionDraft) -> Result<(), DraftError> {
        let json = serde_json::to_string(draft)?;
        let mut slot = self
            .json
            .lock()
            .map_err(|_| DraftError::Io(std::io::Error::other("draft lock poisoned")))?;
        *slot = Some(json);
        Ok(())
    }

    fn clear(&self) -> Result<(), DraftError> {
        let mut slot = self
            .json
            .lock()
            .map_err(|_| DraftError::Io(std::io::Error::other("draft lock poisoned")))?;
        *slot = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advice::{CandidateTask, FallbackReason};
    use tempfile::tempdir;

    fn triage_draft() -> SessionDraft {
        SessionDraft::new(
            DraftPayload::Triage(TriageList::new(
                vec![CandidateTask::new("buy milk and call mom")],
                Some(Degradation::new(FallbackReason::ApiError, "down")),
            )),
            PipelineFlags::default(),
        )
    }

    #[test]
    fn test_file_store_resumes_exact_payload() {
        let temp = tempdir().unwrap();
        let store = FileDraftStore::new(temp.path().join("draft.json"));
        assert!(store.load().unwrap().is_none());

        let draft = triage_draft();
        store.save(&draft).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded, draft);
        assert_eq!(loaded.stage, Stage::Triage);

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        store.clear().unwrap();
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryDraftStore::new();
        let draft = triage_draft();
        store.save(&draft).unwrap();
        assert_eq!(store.load().unwrap(), Some(draft));
        store.clear().unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_mismatched_stage_is_rejected() {
        let store = MemoryDraftStore::new();
        let mut value = serde_json::to_value(triage_draft()).unwrap();
        value["stage"] = serde_json::json!("breakdown");
        store.put_raw(value.to_string());

        let err = store.load().unwrap_err();
        assert!(matches!(
            err,
            DraftError::StageMismatch {
                stage: Stage::Breakdown,
                payload: Stage::Triage
            }
        ));
    }

    #[test]
    fn test_unknown_stage_is_rejected() {
        let store = MemoryDraftStore::new();
        let mut value = serde_json::to_value(triage_draft()).unwrap();
        value["stage"] = serde_json::json!("victory_lap");
        store.put_raw(value.to_string());
        assert!(matches!(store.load(), Err(DraftError::Json(_))));
    }

    #[test]
    fn test_dashboard_draft_is_finished() {
        let draft = SessionDraft::new(DraftPayload::Dashboard, PipelineFlags::default());
        assert!(!draft.is_unfinished());
        assert!(SessionDraft::new(DraftPayload::empty_dump(), PipelineFlags::default()).is_unfinished());
    }
}
