//! Session - the explicit session-scoped context
//!
//! One `Session` owns the mode engine, the pipeline controller, the focus
//! monitor and the timer scheduler, and talks to persistence and advice
//! through trait objects. Every user operation is a method here; nothing is
//! kept in process-global state.
//!
//! Local state always changes first. Writes owed to persistence are issued
//! afterwards, and a failed write only raises `PersistenceFailed` and marks
//! the plan stale until the next `reconcile`.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Duration, Local, NaiveTime, Utc};
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::error::SessionError;
use super::signal::SessionSignal;
use crate::advice::{AdviceService, Degradation};
use crate::config::Config;
use crate::domain::{ActivityEvent, ActivityKind, EnergyLevel, Goal, Mode, ModeState, MoodSample, TaskPlan, streak_days};
use crate::focus::{BurstChoice, DriftChoice, FocusCommand, FocusMonitor, FocusOutcome};
use crate::mode::{ModeEngine, ModeEvent, ModeSignal};
use crate::pipeline::{
    Advance, CapacityReport, DraftStore, EntryContext, PipelineController, PipelineError, PipelineFlags, TooBigChoice,
    route_entry,
};
use crate::state::{Persistence, StateError};
use crate::timer::{TimerKey, TimerOwner, TimerPolicy, TimerScheduler};

/// Capacity of the signal channel; slow subscribers lose the oldest signals
const SIGNAL_BUFFER: usize = 256;

pub struct Session {
    mode: ModeEngine,
    pipeline: PipelineController,
    focus: FocusMonitor,
    timers: TimerScheduler,
    timer_policy: TimerPolicy,
    history_window: u32,
    persistence: Arc<dyn Persistence>,
    signals: broadcast::Sender<SessionSignal>,
    /// Plans whose persisted copy may disagree with the board
    stale: BTreeSet<String>,
}

impl Session {
    pub fn new(
        config: &Config,
        persistence: Arc<dyn Persistence>,
        advice: Arc<dyn AdviceService>,
        drafts: Arc<dyn DraftStore>,
    ) -> Self {
        let (signals, _) = broadcast::channel(SIGNAL_BUFFER);
        Self {
            mode: ModeEngine::new(config.mood.clone(), config.timers.clone(), Utc::now()),
            pipeline: PipelineController::new(drafts, advice, config.advice.timeout(), config.capacity.clone()),
            focus: FocusMonitor::new(config.timers.clone()),
            timers: TimerScheduler::new(),
            timer_policy: config.timers.clone(),
            history_window: config.mood.history_window,
            persistence,
            signals,
            stale: BTreeSet::new(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionSignal> {
        self.signals.subscribe()
    }

    pub fn signal_sender(&self) -> broadcast::Sender<SessionSignal> {
        self.signals.clone()
    }

    pub fn mode(&self) -> Mode {
        self.mode.mode()
    }

    pub fn mode_state(&self) -> &ModeState {
        self.mode.state()
    }

    pub fn plans(&self) -> &[TaskPlan] {
        self.focus.plans()
    }

    pub fn focus(&self) -> &FocusMonitor {
        &self.focus
    }

    pub fn pipeline(&self) -> &PipelineController {
        &self.pipeline
    }

    pub fn timers(&self) -> &TimerScheduler {
        &self.timers
    }

    /// Plans with a failed write since the last reconcile
    pub fn stale_plans(&self) -> &BTreeSet<String> {
        &self.stale
    }

    /// Energy of the latest sample, medium when none was logged
    pub fn energy(&self) -> EnergyLevel {
        self.mode.latest_sample().map(|s| s.energy()).unwrap_or_default()
    }

    /// Restore mode and board from persisted history
    pub async fn start(&mut self) {
        debug!("Session::start: called");
        let history = self.mood_history().await;
        let streak = streak_days(&history, Utc::now().date_naive());
        let latest = match history.into_iter().next() {
            Some(sample) => Some(sample),
            None => self.latest_mood().await,
        };
        let mode = self.mode.restore(latest, streak, Utc::now(), &mut self.timers);
        self.reconcile().await;
        self.timers.arm(TimerKey::Idle, self.timer_policy.idle());
        info!(%mode, plans = self.focus.plans().len(), "Session started");
    }

    // === Mode ===

    /// Record a self-reported mood and reclassify
    pub async fn log_mood(&mut self, score: u8, energy: EnergyLevel, note: Option<String>) -> Result<Mode, SessionError> {
        let sample = MoodSample::new(score, energy, note)?;
        debug!(score, %energy, "Session::log_mood: called");

        let mut history = self.mood_history().await;
        history.push(sample.clone());
        let streak = streak_days(&history, Utc::now().date_naive());

        let signal = self.mode.log_mood(sample.clone(), streak, Utc::now(), &mut self.timers);
        self.emit_mode(signal);

        let result = self.persistence.insert_mood(sample).await;
        self.check("insert_mood", None, result);
        Ok(self.mode.mode())
    }

    pub fn override_mode(&mut self, mode: Mode) {
        let signal = self.mode.apply_override(mode, Utc::now(), &mut self.timers);
        self.emit_mode(signal);
    }

    pub fn clear_override(&mut self) {
        let signal = self.mode.clear_override(Utc::now(), &mut self.timers);
        self.emit_mode(signal);
    }

    pub fn snooze(&mut self) {
        let signal = self.mode.snooze(Utc::now(), &mut self.timers);
        self.emit_mode(signal);
    }

    /// Answer to the recovery check-in, or an explicit edge from the surface
    pub fn mode_event(&mut self, event: ModeEvent) {
        let signal = self.mode.transition(event, Utc::now(), &mut self.timers);
        self.emit_mode(signal);
    }

    // === Activity ===

    /// Any user input: restarts idle and dwell windows, may ask about drift
    pub async fn note_activity(&mut self) {
        self.mode.note_activity(&mut self.timers);
        let outcome = self.focus.note_activity(&mut self.timers);
        self.commit(outcome).await;
    }

    // === Pipeline ===

    /// Route into the pipeline and run its entry stage
    pub async fn enter_pipeline(&mut self, handoff_task: Option<String>) -> Advance {
        let flags = PipelineFlags::for_mode(self.mode.mode(), self.energy());
        let top_goal = match self.persistence.list_goals(true).await {
            Ok(goals) => Goal::top(&goals).cloned(),
            Err(e) => {
                self.persistence_failed("list_goals", None, e);
                None
            }
        };
        let ctx = EntryContext {
            draft: self.pipeline.load_draft(),
            handoff_task,
            flags,
            has_unresolved_plans: self.focus.unresolved().next().is_some(),
            top_goal,
        };
        let route = route_entry(ctx);
        debug!(?route, "Session::enter_pipeline: routed");

        let advance = self.pipeline.enter(route, flags).await;
        self.report_degradations(&advance.degradations).await;
        advance
    }

    /// brain_dump -> triage; the capacity check runs on entry at local time
    pub async fn submit_dump(&mut self, text: &str) -> Result<Advance, SessionError> {
        let mut advance = self.pipeline.submit_dump(text).await?;
        self.report_degradations(&advance.degradations).await;
        advance.capacity = Some(self.check_capacity(Local::now().time())?);
        Ok(advance)
    }

    /// Run a within-stage edit and schedule the debounced draft save
    pub fn edit_pipeline<T>(
        &mut self,
        edit: impl FnOnce(&mut PipelineController) -> Result<T, PipelineError>,
    ) -> Result<T, SessionError> {
        let value = edit(&mut self.pipeline)?;
        if self.pipeline.is_dirty() {
            self.timers
                .arm(TimerKey::DraftSave, self.timer_policy.draft_save_debounce());
        }
        Ok(value)
    }

    /// Capacity check of the current triage list at local time `now`
    pub fn check_capacity(&mut self, now: NaiveTime) -> Result<CapacityReport, SessionError> {
        let report = self.pipeline.capacity(now)?;
        if report.over_capacity {
            info!(overflow_mins = report.overflow_mins, "Triage over capacity");
            self.emit(SessionSignal::OverCapacity(report));
        }
        Ok(report)
    }

    pub fn confirm_triage(&mut self, choice: Option<TooBigChoice>) -> Result<Advance, SessionError> {
        Ok(self.pipeline.confirm_triage(choice)?)
    }

    pub async fn advance_context(&mut self) -> Result<Advance, SessionError> {
        let advance = self.pipeline.advance_context().await?;
        self.report_degradations(&advance.degradations).await;
        Ok(advance)
    }

    /// Finish the pipeline and put its plans on the board; returns their IDs
    pub async fn confirm_breakdown(&mut self) -> Result<Vec<String>, SessionError> {
        let plans = self.pipeline.confirm_breakdown()?;
        self.timers.cancel_owned_by(&TimerOwner::Pipeline);
        let ids = plans.iter().map(|p| p.id.clone()).collect();
        let outcome = self.focus.add_plans(plans, &mut self.timers);
        self.commit(outcome).await;
        Ok(ids)
    }

    /// Clear the draft and start over; stagnation detection becomes live again
    pub fn restart_pipeline(&mut self) {
        self.pipeline.restart();
        self.timers.cancel_owned_by(&TimerOwner::Pipeline);
        self.focus.rearm_stagnation(&mut self.timers);
    }

    pub fn skip_to_dashboard(&mut self) {
        self.pipeline.skip_to_dashboard();
        self.timers.cancel_owned_by(&TimerOwner::Pipeline);
    }

    // === Focus ===

    pub async fn toggle_step(&mut self, plan_id: &str, step_id: &str) -> Result<(), SessionError> {
        let outcome = self.focus.toggle_step(plan_id, step_id, &mut self.timers)?;
        self.commit(outcome).await;
        Ok(())
    }

    pub async fn start_burst(&mut self, plan_id: &str) -> Result<(), SessionError> {
        let outcome = self.focus.start_burst(plan_id, &mut self.timers)?;
        self.commit(outcome).await;
        Ok(())
    }

    pub async fn resolve_burst(&mut self, plan_id: &str, choice: BurstChoice) -> Result<(), SessionError> {
        let outcome = self.focus.resolve_burst(plan_id, choice, &mut self.timers)?;
        self.commit(outcome).await;
        Ok(())
    }

    pub fn resolve_drift(&mut self, choice: DriftChoice) -> Result<(), SessionError> {
        Ok(self.focus.resolve_drift(choice, &mut self.timers)?)
    }

    pub async fn delete_plan(&mut self, plan_id: &str) -> Result<(), SessionError> {
        let outcome = self.focus.delete_plan(plan_id, &mut self.timers)?;
        self.commit(outcome).await;
        Ok(())
    }

    pub async fn delete_step(&mut self, plan_id: &str, step_id: &str) -> Result<(), SessionError> {
        let outcome = self.focus.delete_step(plan_id, step_id, &mut self.timers)?;
        self.commit(outcome).await;
        Ok(())
    }

    pub async fn undo_deletion(&mut self) -> Result<(), SessionError> {
        let outcome = self.focus.undo_deletion(&mut self.timers)?;
        self.commit(outcome).await;
        Ok(())
    }

    /// Persist free text as a stepless plan without touching the pipeline
    pub async fn quick_capture(&mut self, text: &str) -> Result<String, SessionError> {
        let outcome = self.focus.quick_capture(text, &mut self.timers)?;
        let plan_id = outcome
            .commands
            .iter()
            .find_map(|c| match c {
                FocusCommand::InsertPlan(plan) => Some(plan.id.clone()),
                _ => None,
            })
            .unwrap_or_default();
        self.commit(outcome).await;
        Ok(plan_id)
    }

    /// Re-read persisted plans and replace the board with them
    pub async fn reconcile(&mut self) {
        debug!(stale = self.stale.len(), "Session::reconcile: called");
        match self.persistence.list_plans(false).await {
            Ok(plans) => {
                self.focus.load(plans, &mut self.timers);
                self.stale.clear();
            }
            Err(e) => self.persistence_failed("list_plans", None, e),
        }
    }

    // === Timers ===

    /// React to one expired timer
    pub async fn handle_timer(&mut self, key: TimerKey) {
        debug!(%key, "Session::handle_timer: called");
        match key.owner() {
            TimerOwner::Mode => {
                let signal = self.mode.handle_timer(&key, Utc::now(), &mut self.timers);
                self.emit_mode(signal);
            }
            TimerOwner::Focus | TimerOwner::Plan(_) => {
                let outcome = self.focus.handle_timer(&key, &mut self.timers);
                self.commit(outcome).await;
            }
            TimerOwner::Pipeline => self.pipeline.save_draft(),
        }
    }

    /// Handle every timer due now; returns how many fired
    pub async fn fire_due(&mut self) -> usize {
        let due = self.timers.take_due(Instant::now());
        let count = due.len();
        for key in due {
            self.handle_timer(key).await;
        }
        count
    }

    /// Flush unsaved pipeline edits, e.g. before shutting down
    pub fn flush(&mut self) {
        self.timers.cancel_owned_by(&TimerOwner::Pipeline);
        self.pipeline.save_draft();
    }

    // === Internals ===

    /// Samples from the last `history_window` days, newest first
    async fn mood_history(&mut self) -> Vec<MoodSample> {
        let since = Utc::now() - Duration::days(i64::from(self.history_window));
        match self.persistence.moods_since(since).await {
            Ok(samples) => samples,
            Err(e) => {
                self.persistence_failed("moods_since", None, e);
                Vec::new()
            }
        }
    }

    /// A sample older than the history window still decides the restored mode
    async fn latest_mood(&mut self) -> Option<MoodSample> {
        match self.persistence.recent_moods(1).await {
            Ok(samples) => samples.into_iter().next(),
            Err(e) => {
                self.persistence_failed("recent_moods", None, e);
                None
            }
        }
    }

    /// Surface the monitor's signals, then issue its writes in order
    async fn commit(&mut self, outcome: FocusOutcome) {
        for signal in outcome.signals {
            self.emit(signal.into());
        }
        for command in outcome.commands {
            self.execute(command).await;
        }
    }

    async fn execute(&mut self, command: FocusCommand) {
        let operation = command.name();
        let plan_id = command.plan_id().map(str::to_string);
        debug!(operation, ?plan_id, "Session::execute: called");
        let result = match command {
            FocusCommand::InsertPlan(plan) => self.persistence.insert_plan(plan).await.map(|_| ()),
            FocusCommand::UpdatePlan(plan) => self.persistence.update_plan(plan).await,
            FocusCommand::DeletePlan(id) => self.persistence.delete_plan(&id).await,
            FocusCommand::RecordReward(reward) => self.persistence.record_reward(reward).await.map(|_| ()),
            FocusCommand::RecordActivity(event) => self.persistence.record_activity(event).await.map(|_| ()),
        };
        self.check(operation, plan_id, result);
    }

    async fn report_degradations(&mut self, degradations: &[Degradation]) {
        for degradation in degradations {
            warn!(%degradation, "Advice degraded, local fallback used");
            self.emit(SessionSignal::Degraded(degradation.clone()));
            let event = ActivityEvent::new(ActivityKind::DegradedAdvice, None, Some(degradation.reason.to_string()));
            let result = self.persistence.record_activity(event).await;
            self.check("record_activity", None, result);
        }
    }

    fn check<T>(&mut self, operation: &'static str, plan_id: Option<String>, result: Result<T, StateError>) {
        if let Err(e) = result {
            self.persistence_failed(operation, plan_id, e);
        }
    }

    fn persistence_failed(&mut self, operation: &'static str, plan_id: Option<String>, error: StateError) {
        warn!(operation, ?plan_id, %error, "Persistence failed; keeping local state");
        if let Some(plan_id) = &plan_id {
            self.stale.insert(plan_id.clone());
        }
        self.emit(SessionSignal::PersistenceFailed {
            operation,
            plan_id,
            error: error.to_string(),
        });
    }

    fn emit_mode(&mut self, signal: Option<ModeSignal>) {
        if let Some(signal) = signal {
            self.emit(signal.into());
        }
    }

    fn emit(&self, signal: SessionSignal) {
        debug!(?signal, "Session::emit: called");
        // No subscriber is fine; the surface may not be attached yet
        let _ = self.signals.send(signal);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::advice::FallbackReason;
    use crate::advice::mock::MockAdvisor;
    use crate::domain::{DueDate, MicroStep, RewardKind};
    use crate::pipeline::{MemoryDraftStore, Stage};
    use crate::state::mock::MockPersistence;

    struct Harness {
        session: Session,
        store: Arc<MockPersistence>,
        drafts: Arc<MemoryDraftStore>,
        rx: broadcast::Receiver<SessionSignal>,
    }

    impl Harness {
        fn new(advice: MockAdvisor) -> Self {
            let store = Arc::new(MockPersistence::new());
            let drafts = Arc::new(MemoryDraftStore::new());
            let session = Session::new(&Config::default(), store.clone(), Arc::new(advice), drafts.clone());
            let rx = session.subscribe();
            Self {
                session,
                store,
                drafts,
                rx,
            }
        }

        fn drain(&mut self) -> Vec<SessionSignal> {
            let mut out = Vec::new();
            while let Ok(signal) = self.rx.try_recv() {
                out.push(signal);
            }
            out
        }
    }

    fn two_step_plan(id: &str) -> TaskPlan {
        let steps = vec![
            MicroStep::with_id("s0", "open the file", "today", 5),
            MicroStep::with_id("s1", "write one line", "today", 5),
        ];
        let mut plan = TaskPlan::new("write report", steps, DueDate::Today, EnergyLevel::Medium);
        plan.id = id.to_string();
        plan
    }

    #[tokio::test(start_paused = true)]
    async fn test_low_mood_enters_recovery_with_one_recheck() {
        let mut h = Harness::new(MockAdvisor::new());
        h.session.start().await;

        let mode = h.session.log_mood(2, EnergyLevel::Low, None).await.unwrap();
        assert_eq!(mode, Mode::Recovery);
        assert_eq!(h.session.timers().armed_for(&TimerOwner::Mode), 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        h.session.log_mood(1, EnergyLevel::Low, None).await.unwrap();
        assert_eq!(h.session.timers().armed_for(&TimerOwner::Mode), 1);
        assert!(h.session.timers().is_armed(&TimerKey::RecoveryRecheck));

        let signals = h.drain();
        assert!(signals.contains(&SessionSignal::ModeChanged {
            from: Mode::Maintenance,
            to: Mode::Recovery
        }));
        assert_eq!(h.store.writes(), vec!["insert_mood", "insert_mood"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_streak_counts_days_not_samples() {
        let mut h = Harness::new(MockAdvisor::new());
        let now = Utc::now();
        // A busy day of check-ins must not hide the two days before it
        for secs_ago in 0..35i64 {
            let at = now - chrono::Duration::seconds(secs_ago);
            let sample = MoodSample::recorded(6, EnergyLevel::Medium, None, at).unwrap();
            h.store.insert_mood(sample).await.unwrap();
        }
        for days_ago in [1i64, 2] {
            let at = now - chrono::Duration::days(days_ago);
            let sample = MoodSample::recorded(6, EnergyLevel::Medium, None, at).unwrap();
            h.store.insert_mood(sample).await.unwrap();
        }

        h.session.start().await;
        let mode = h.session.log_mood(9, EnergyLevel::High, None).await.unwrap();
        assert_eq!(mode, Mode::Growth);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovery_checkin_after_recheck() {
        let mut h = Harness::new(MockAdvisor::new());
        h.session.log_mood(3, EnergyLevel::Medium, None).await.unwrap();
        h.drain();

        tokio::time::advance(Duration::from_secs(15 * 60)).await;
        h.session.fire_due().await;
        assert!(h.drain().contains(&SessionSignal::RecoveryCheckIn));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_mood_write_keeps_local_mode() {
        let mut h = Harness::new(MockAdvisor::new());
        h.store.set_failing(true);

        let mode = h.session.log_mood(2, EnergyLevel::Low, None).await.unwrap();
        assert_eq!(mode, Mode::Recovery);
        assert!(h.drain().iter().any(|s| matches!(
            s,
            SessionSignal::PersistenceFailed {
                operation: "insert_mood",
                ..
            }
        )));
    }

    #[tokio::test]
    async fn test_mood_out_of_range_is_rejected_without_writes() {
        let mut h = Harness::new(MockAdvisor::new());
        let err = h.session.log_mood(11, EnergyLevel::Low, None).await.unwrap_err();
        assert!(matches!(err, SessionError::Validation(_)));
        assert!(h.store.writes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_advice_down_degrades_and_records_activity() {
        let mut h = Harness::new(MockAdvisor::new());
        h.session.start().await;
        let advance = h.session.enter_pipeline(None).await;
        assert_eq!(advance.stage, Stage::BrainDump);

        let advance = h.session.submit_dump("buy milk and call mom").await.unwrap();
        assert_eq!(advance.stage, Stage::Triage);
        let triage = h.session.pipeline().triage().unwrap();
        assert_eq!(triage.tasks.len(), 1);
        assert_eq!(triage.tasks[0].text, "buy milk and call mom");

        let degraded: Vec<_> = h
            .drain()
            .into_iter()
            .filter_map(|s| match s {
                SessionSignal::Degraded(d) => Some(d.reason),
                _ => None,
            })
            .collect();
        assert_eq!(degraded, vec![FallbackReason::ApiError]);
        assert_eq!(h.store.activity()[0].kind, ActivityKind::DegradedAdvice);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_pipeline_puts_plans_on_board() {
        let advice = MockAdvisor::new()
            .with_tasks(&["email landlord", "pay phone bill"])
            .with_steps(&["open mail", "write two lines"])
            .with_steps(&["open banking app"]);
        let mut h = Harness::new(advice);
        h.session.start().await;
        h.session.enter_pipeline(None).await;
        h.session.submit_dump("email landlord, pay phone bill").await.unwrap();
        h.session.confirm_triage(None).unwrap();
        h.session.advance_context().await.unwrap();

        let ids = h.session.confirm_breakdown().await.unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(h.session.pipeline().stage(), Stage::Dashboard);
        assert!(h.drafts.is_empty());
        assert_eq!(h.session.plans().len(), 2);
        assert_eq!(h.store.plans().len(), 2);
        assert!(h.session.timers().is_armed(&TimerKey::Stagnation));
    }

    #[tokio::test(start_paused = true)]
    async fn test_within_stage_edit_saves_after_debounce() {
        let mut h = Harness::new(MockAdvisor::new());
        h.session.enter_pipeline(None).await;
        h.session
            .edit_pipeline(|p| p.set_dump_text("half a thought"))
            .unwrap();
        assert!(h.drafts.is_empty());
        assert!(h.session.timers().is_armed(&TimerKey::DraftSave));

        tokio::time::advance(Duration::from_millis(1_500)).await;
        h.session.fire_due().await;
        assert!(!h.drafts.is_empty());
        assert!(!h.session.pipeline().is_dirty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_draft_on_entry() {
        let mut h = Harness::new(MockAdvisor::new());
        h.session.enter_pipeline(None).await;
        h.session.submit_dump("sort the garage").await.unwrap();

        let store = h.store.clone();
        let config = Config::default();
        let mut resumed = Session::new(&config, store, Arc::new(MockAdvisor::new()), h.drafts.clone());
        let advance = resumed.enter_pipeline(None).await;
        assert_eq!(advance.stage, Stage::Triage);
        assert_eq!(resumed.pipeline().triage().unwrap().tasks[0].text, "sort the garage");
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_rewards_survive_write_failure() {
        let mut h = Harness::new(MockAdvisor::new());
        h.store.insert_plan(two_step_plan("p1")).await.unwrap();
        h.session.start().await;
        h.drain();

        h.store.set_failing(true);
        h.session.toggle_step("p1", "s0").await.unwrap();
        assert_eq!(h.session.plans()[0].completed_count(), 1);
        assert!(h.session.stale_plans().contains("p1"));

        let signals = h.drain();
        assert!(signals.iter().any(|s| matches!(
            s,
            SessionSignal::RewardGranted(r) if r.kind == RewardKind::StepCompleted
        )));
        assert!(signals.iter().any(|s| matches!(s, SessionSignal::PersistenceFailed { .. })));

        h.store.set_failing(false);
        h.session.reconcile().await;
        assert_eq!(h.session.plans()[0].completed_count(), 0);
        assert!(h.session.stale_plans().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deletion_commits_after_undo_window() {
        let mut h = Harness::new(MockAdvisor::new());
        h.store.insert_plan(two_step_plan("p1")).await.unwrap();
        h.session.start().await;

        h.session.delete_plan("p1").await.unwrap();
        assert!(h.session.plans().is_empty());
        assert_eq!(h.store.plans().len(), 1);

        tokio::time::advance(Duration::from_secs(5)).await;
        h.session.fire_due().await;
        assert!(h.store.plans().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_undone_deletion_never_writes() {
        let mut h = Harness::new(MockAdvisor::new());
        h.store.insert_plan(two_step_plan("p1")).await.unwrap();
        h.session.start().await;

        h.session.delete_step("p1", "s1").await.unwrap();
        tokio::time::advance(Duration::from_secs(3)).await;
        h.session.undo_deletion().await.unwrap();
        tokio::time::advance(Duration::from_secs(10)).await;
        h.session.fire_due().await;

        assert_eq!(h.store.plans()[0].steps().len(), 2);
        assert_eq!(h.session.plans()[0].steps().len(), 2);
        assert!(!h.store.writes().contains(&"update_plan".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_quick_capture_mid_pipeline() {
        let mut h = Harness::new(MockAdvisor::new().with_tasks(&["tidy desk"]));
        h.session.enter_pipeline(None).await;
        h.session.submit_dump("tidy desk").await.unwrap();

        let plan_id = h.session.quick_capture("renew passport").await.unwrap();
        assert_eq!(h.session.pipeline().stage(), Stage::Triage);
        assert_eq!(h.store.plans()[0].id, plan_id);
        assert!(h.drain().contains(&SessionSignal::Captured { plan_id }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_low_energy_routes_to_gentle_breakdown() {
        let mut h = Harness::new(MockAdvisor::new().with_steps(&["put on shoes"]));
        h.session.log_mood(5, EnergyLevel::Low, None).await.unwrap();
        let advance = h.session.enter_pipeline(None).await;
        assert_eq!(advance.stage, Stage::Breakdown);
        assert!(advance.degradations.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_over_capacity_signal() {
        let tasks = ["a1 chore", "a2 chore", "a3 chore", "a4 chore", "a5 chore", "a6 chore"];
        let mut h = Harness::new(MockAdvisor::new().with_tasks(&tasks));
        h.session.enter_pipeline(None).await;
        h.session.submit_dump("six chores").await.unwrap();

        let now = NaiveTime::from_hms_opt(21, 0, 0).unwrap();
        let report = h.session.check_capacity(now).unwrap();
        assert_eq!(report.total_mins, 90);
        assert_eq!(report.overflow_mins, 30);
        assert!(h.drain().contains(&SessionSignal::OverCapacity(report)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_entering_triage_checks_capacity() {
        // 45 big tasks outweigh any budget the day can offer
        let texts: Vec<String> = (0..45).map(|i| format!("write chapter {i}")).collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let mut h = Harness::new(MockAdvisor::new().with_tasks(&refs));
        h.session.enter_pipeline(None).await;

        let advance = h.session.submit_dump("the whole book").await.unwrap();
        let report = advance.capacity.unwrap();
        assert_eq!(report.total_mins, 45 * 30);
        assert!(report.over_capacity);
        assert!(h.drain().contains(&SessionSignal::OverCapacity(report)));
    }
}
