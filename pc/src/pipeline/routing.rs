//! Entry-point routing

use super::draft::SessionDraft;
use super::stage::PipelineFlags;
use crate::domain::Goal;

/// Everything entry routing looks at
#[derive(Debug, Clone, Default)]
pub struct EntryContext {
    pub draft: Option<SessionDraft>,
    /// Task named by another flow
    pub handoff_task: Option<String>,
    pub flags: PipelineFlags,
    pub has_unresolved_plans: bool,
    pub top_goal: Option<Goal>,
}

/// Where the pipeline starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryRoute {
    /// Continue a saved draft at its stage
    Resume(SessionDraft),
    /// Context stage with a handed-off task
    Handoff(String),
    /// Breakdown stage with one generic low-demand task
    Gentle,
    Dashboard,
    /// Context stage seeded with the top goal
    SeedGoal(Goal),
    BrainDump,
}

/// Pick the entry route; the first matching rule wins
pub fn route_entry(ctx: EntryContext) -> EntryRoute {
    if let Some(draft) = ctx.draft
        && draft.is_unfinished()
    {
        return EntryRoute::Resume(draft);
    }
    if let Some(task) = ctx.handoff_task.map(|t| t.trim().to_string())
        && !task.is_empty()
    {
        return EntryRoute::Handoff(task);
    }
    if ctx.flags.gentle {
        return EntryRoute::Gentle;
    }
    if ctx.has_unresolved_plans {
        return EntryRoute::Dashboard;
    }
    if let Some(goal) = ctx.top_goal {
        return EntryRoute::SeedGoal(goal);
    }
    EntryRoute::BrainDump
}
