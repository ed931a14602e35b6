//! Integration tests for Pacer
//!
//! These tests drive a full session against a real store on disk.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveTime;
use pacer::advice::{
    AdviceError, AdviceService, BreakdownOutcome, BreakdownRequest, CandidateTask, FallbackReason, ParseOutcome,
    UnavailableAdvisor,
};
use pacer::config::Config;
use pacer::domain::{EnergyLevel, MicroStep, Mode, RewardKind};
use pacer::pipeline::{FileDraftStore, Stage, TooBigChoice};
use pacer::session::{Session, SessionHandle, SessionSignal};
use pacer::state::{Persistence, StateManager};
use tempfile::TempDir;
use tokio::sync::broadcast;

/// Advisor that splits the dump on commas and answers every breakdown with two steps
struct CommaAdvisor;

#[async_trait]
impl AdviceService for CommaAdvisor {
    async fn parse(&self, raw_text: &str) -> Result<ParseOutcome, AdviceError> {
        let tasks = raw_text
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(CandidateTask::new)
            .collect();
        Ok(ParseOutcome::from_ai(tasks))
    }

    async fn breakdown(&self, request: &BreakdownRequest) -> Result<BreakdownOutcome, AdviceError> {
        let due_by = request.due.to_string();
        Ok(BreakdownOutcome {
            steps: vec![
                MicroStep::new(format!("get ready for {}", request.task_name), due_by.clone(), 5),
                MicroStep::new(format!("do {}", request.task_name), due_by, 10),
            ],
        })
    }
}

struct Fixture {
    dir: TempDir,
    state: StateManager,
    config: Config,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let state = StateManager::spawn(dir.path().join("store")).expect("Failed to open store");
        Self {
            dir,
            state,
            config: Config::default(),
        }
    }

    fn session(&self, advice: Arc<dyn AdviceService>) -> Session {
        let drafts = Arc::new(FileDraftStore::new(self.dir.path().join("draft.json")));
        Session::new(&self.config, Arc::new(self.state.clone()), advice, drafts)
    }

    fn draft_exists(&self) -> bool {
        self.dir.path().join("draft.json").exists()
    }
}

fn drain(rx: &mut broadcast::Receiver<SessionSignal>) -> Vec<SessionSignal> {
    let mut out = Vec::new();
    while let Ok(signal) = rx.try_recv() {
        out.push(signal);
    }
    out
}

/// Walk a fresh pipeline to the board and return the new plan IDs
async fn plan_from_dump(session: &mut Session, dump: &str) -> Vec<String> {
    session.enter_pipeline(None).await;
    session.submit_dump(dump).await.expect("dump accepted");
    session.confirm_triage(None).expect("triage confirmed");
    session.advance_context().await.expect("context advanced");
    session.confirm_breakdown().await.expect("breakdown confirmed")
}

// =============================================================================
// Mode Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_low_mood_persists_and_survives_restart() {
    let fx = Fixture::new();
    let mut session = fx.session(Arc::new(CommaAdvisor));
    session.start().await;
    let mut rx = session.subscribe();

    let mode = session.log_mood(2, EnergyLevel::Low, Some("bad night".to_string())).await.unwrap();
    assert_eq!(mode, Mode::Recovery);

    tokio::time::advance(Duration::from_secs(15 * 60)).await;
    session.fire_due().await;
    assert!(drain(&mut rx).contains(&SessionSignal::RecoveryCheckIn));

    let moods = fx.state.recent_moods(10).await.unwrap();
    assert_eq!(moods.len(), 1);
    assert_eq!(moods[0].note(), Some("bad night"));

    let mut restarted = fx.session(Arc::new(CommaAdvisor));
    restarted.start().await;
    assert_eq!(restarted.mode(), Mode::Recovery);
}

// =============================================================================
// Pipeline Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_advice_down_still_reaches_the_board() {
    let fx = Fixture::new();
    let mut session = fx.session(Arc::new(UnavailableAdvisor::no_api_key()));
    session.start().await;
    let mut rx = session.subscribe();

    let ids = plan_from_dump(&mut session, "buy milk and call mom").await;
    assert_eq!(ids.len(), 1);

    let reasons: Vec<FallbackReason> = drain(&mut rx)
        .into_iter()
        .filter_map(|s| match s {
            SessionSignal::Degraded(d) => Some(d.reason),
            _ => None,
        })
        .collect();
    assert!(!reasons.is_empty());
    assert!(reasons.iter().all(|r| *r == FallbackReason::NoApiKey));

    let stored = fx.state.get_plan(&ids[0]).await.unwrap().expect("plan stored");
    assert_eq!(stored.task_name, "buy milk and call mom");
    assert_eq!(stored.steps().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_six_tasks_at_nine_pm_are_over_capacity() {
    let fx = Fixture::new();
    let mut session = fx.session(Arc::new(CommaAdvisor));
    session.start().await;
    let mut rx = session.subscribe();

    session.enter_pipeline(None).await;
    session
        .submit_dump("water plants, fold laundry, tidy shoes, sort mail, wipe table, feed cat")
        .await
        .unwrap();

    let at_nine = NaiveTime::from_hms_opt(21, 0, 0).unwrap();
    let report = session.check_capacity(at_nine).unwrap();
    assert_eq!(report.total_mins, 90);
    assert_eq!(report.budget_mins, 60);
    assert_eq!(report.overflow_mins, 30);
    assert!(report.can_defer_last);
    assert!(drain(&mut rx).contains(&SessionSignal::OverCapacity(report)));

    session.edit_pipeline(|p| p.defer_last()).unwrap();
    let report = session.check_capacity(at_nine).unwrap();
    assert_eq!(report.total_mins, 75);
}

#[tokio::test(start_paused = true)]
async fn test_draft_resumes_in_a_new_session_and_clears_on_finish() {
    let fx = Fixture::new();
    {
        let mut session = fx.session(Arc::new(CommaAdvisor));
        session.start().await;
        session.enter_pipeline(None).await;
        session.submit_dump("email landlord, pay phone bill").await.unwrap();
    }
    assert!(fx.draft_exists());

    let mut session = fx.session(Arc::new(CommaAdvisor));
    session.start().await;
    let advance = session.enter_pipeline(None).await;
    assert_eq!(advance.stage, Stage::Triage);
    assert_eq!(session.pipeline().triage().unwrap().tasks.len(), 2);

    session.confirm_triage(None).unwrap();
    session.advance_context().await.unwrap();
    let ids = session.confirm_breakdown().await.unwrap();
    assert_eq!(ids.len(), 2);
    assert!(!fx.draft_exists());
    assert_eq!(fx.state.list_plans(false).await.unwrap().len(), 2);
}

// =============================================================================
// Focus Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_rewards_follow_transitions_not_state() {
    let fx = Fixture::new();
    let mut session = fx.session(Arc::new(CommaAdvisor));
    session.start().await;
    let ids = plan_from_dump(&mut session, "pay phone bill").await;
    let plan_id = ids[0].clone();
    let step_ids: Vec<String> = session.plans()[0].steps().iter().map(|s| s.id.clone()).collect();

    session.toggle_step(&plan_id, &step_ids[0]).await.unwrap();
    session.toggle_step(&plan_id, &step_ids[0]).await.unwrap();
    session.toggle_step(&plan_id, &step_ids[0]).await.unwrap();
    session.toggle_step(&plan_id, &step_ids[1]).await.unwrap();

    let rewards = fx.state.list_rewards(&plan_id).await.unwrap();
    let steps = rewards.iter().filter(|r| r.kind == RewardKind::StepCompleted).count();
    let plans = rewards.iter().filter(|r| r.kind == RewardKind::PlanCompleted).count();
    assert_eq!(steps, 3);
    assert_eq!(plans, 1);

    let stored = fx.state.get_plan(&plan_id).await.unwrap().unwrap();
    assert!(stored.is_complete());
    assert!(fx.state.list_plans(false).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_deletion_undo_and_commit() {
    let fx = Fixture::new();
    let mut session = fx.session(Arc::new(CommaAdvisor));
    session.start().await;
    let ids = plan_from_dump(&mut session, "sort mail, feed cat").await;

    session.delete_plan(&ids[0]).await.unwrap();
    assert_eq!(session.plans().len(), 1);
    session.undo_deletion().await.unwrap();
    assert_eq!(session.plans().len(), 2);

    tokio::time::advance(Duration::from_secs(10)).await;
    session.fire_due().await;
    assert!(fx.state.get_plan(&ids[0]).await.unwrap().is_some());

    session.delete_plan(&ids[1]).await.unwrap();
    tokio::time::advance(Duration::from_secs(5)).await;
    session.fire_due().await;
    assert!(fx.state.get_plan(&ids[1]).await.unwrap().is_none());
    assert_eq!(fx.state.list_plans(false).await.unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_toggle_during_step_undo_window_keeps_stored_step() {
    let fx = Fixture::new();
    let mut session = fx.session(Arc::new(CommaAdvisor));
    session.start().await;
    let plan_id = plan_from_dump(&mut session, "feed cat").await.remove(0);
    let step_ids: Vec<String> = session.plans()[0].steps().iter().map(|s| s.id.clone()).collect();

    session.delete_step(&plan_id, &step_ids[1]).await.unwrap();
    session.toggle_step(&plan_id, &step_ids[0]).await.unwrap();

    let stored = fx.state.get_plan(&plan_id).await.unwrap().unwrap();
    assert_eq!(stored.steps().len(), 2);
    assert!(!stored.is_complete());
    let rewards = fx.state.list_rewards(&plan_id).await.unwrap();
    assert!(rewards.iter().all(|r| r.kind == RewardKind::StepCompleted));

    tokio::time::advance(Duration::from_secs(2)).await;
    session.fire_due().await;
    session.undo_deletion().await.unwrap();

    let stored = fx.state.get_plan(&plan_id).await.unwrap().unwrap();
    assert_eq!(stored.steps().len(), 2);
    assert_eq!(stored.completed_count(), 1);

    session.reconcile().await;
    assert_eq!(session.plans().len(), 1);
    assert_eq!(session.plans()[0].steps().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_quick_capture_lands_in_store() {
    let fx = Fixture::new();
    let mut session = fx.session(Arc::new(CommaAdvisor));
    session.start().await;

    let plan_id = session.quick_capture("renew passport").await.unwrap();
    let stored = fx.state.get_plan(&plan_id).await.unwrap().expect("captured plan stored");
    assert!(stored.steps().is_empty());
    assert_eq!(stored.energy_required, EnergyLevel::Low);
}

// =============================================================================
// Session Actor Tests
// =============================================================================

#[tokio::test]
async fn test_handle_runs_pipeline_with_default_choices() {
    let fx = Fixture::new();
    let handle = SessionHandle::spawn(fx.session(Arc::new(CommaAdvisor))).await;

    let advance = handle.enter_pipeline(None).await.unwrap();
    assert_eq!(advance.stage, Stage::BrainDump);
    handle.submit_dump("call dentist, buy stamps").await.unwrap();
    let advance = handle.confirm_triage(Some(TooBigChoice::ProceedAnyway)).await.unwrap();
    assert_eq!(advance.stage, Stage::Context);
    handle.advance_context().await.unwrap();
    let ids = handle.confirm_breakdown().await.unwrap();

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.stage, Stage::Dashboard);
    assert_eq!(snapshot.plans.len(), ids.len());

    handle.shutdown().await.unwrap();
    fx.state.shutdown().await.unwrap();
}
