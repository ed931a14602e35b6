//! SessionHandle - drive a Session as an actor
//!
//! `run` owns the session and serves commands and timer expiries from one
//! loop, so every operation and every timer callback runs on the same
//! logical thread.

use chrono::NaiveTime;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info};

use super::context::Session;
use super::error::SessionError;
use super::signal::SessionSignal;
use crate::domain::{EnergyLevel, MicroStep, Mode, ModeState, TaskPlan};
use crate::focus::{BurstChoice, DriftChoice};
use crate::mode::ModeEvent;
use crate::pipeline::{Advance, CapacityReport, ContextUpdate, DraftPayload, Stage, TooBigChoice, TriageItem};

type Reply<T> = oneshot::Sender<Result<T, SessionError>>;

/// Read-only view of a session
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub mode: ModeState,
    pub stage: Stage,
    /// Stage state, for surfaces that edit triage items or steps by ID
    pub pipeline: DraftPayload,
    pub plans: Vec<TaskPlan>,
}

/// Commands sent to the session actor
#[derive(Debug)]
pub enum SessionCommand {
    LogMood {
        score: u8,
        energy: EnergyLevel,
        note: Option<String>,
        reply: Reply<Mode>,
    },
    OverrideMode {
        mode: Option<Mode>,
        reply: Reply<()>,
    },
    Snooze {
        reply: Reply<()>,
    },
    ModeEvent {
        event: ModeEvent,
        reply: Reply<()>,
    },
    Activity,
    EnterPipeline {
        handoff_task: Option<String>,
        reply: Reply<Advance>,
    },
    SetDumpText {
        text: String,
        reply: Reply<()>,
    },
    SubmitDump {
        text: String,
        reply: Reply<Advance>,
    },
    AddTask {
        text: String,
        reply: Reply<String>,
    },
    EditTask {
        task_id: String,
        text: String,
        reply: Reply<()>,
    },
    RemoveTask {
        task_id: String,
        reply: Reply<TriageItem>,
    },
    DeferLast {
        reply: Reply<TriageItem>,
    },
    CheckCapacity {
        now: NaiveTime,
        reply: Reply<CapacityReport>,
    },
    ConfirmTriage {
        choice: Option<TooBigChoice>,
        reply: Reply<Advance>,
    },
    SetContext {
        task_id: String,
        update: ContextUpdate,
        reply: Reply<()>,
    },
    AdvanceContext {
        reply: Reply<Advance>,
    },
    AddStep {
        task_id: String,
        text: String,
        time_estimate_mins: u32,
        reply: Reply<String>,
    },
    EditStep {
        task_id: String,
        step_id: String,
        text: String,
        reply: Reply<()>,
    },
    RemoveStep {
        task_id: String,
        step_id: String,
        reply: Reply<MicroStep>,
    },
    ConfirmBreakdown {
        reply: Reply<Vec<String>>,
    },
    RestartPipeline {
        reply: Reply<()>,
    },
    SkipToDashboard {
        reply: Reply<()>,
    },
    ToggleStep {
        plan_id: String,
        step_id: String,
        reply: Reply<()>,
    },
    StartBurst {
        plan_id: String,
        reply: Reply<()>,
    },
    ResolveBurst {
        plan_id: String,
        choice: BurstChoice,
        reply: Reply<()>,
    },
    ResolveDrift {
        choice: DriftChoice,
        reply: Reply<()>,
    },
    DeletePlan {
        plan_id: String,
        reply: Reply<()>,
    },
    DeleteStep {
        plan_id: String,
        step_id: String,
        reply: Reply<()>,
    },
    UndoDeletion {
        reply: Reply<()>,
    },
    QuickCapture {
        text: String,
        reply: Reply<String>,
    },
    Reconcile {
        reply: Reply<()>,
    },
    Snapshot {
        reply: Reply<SessionSnapshot>,
    },
    Shutdown,
}

/// Handle to send commands to a running session
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionCommand>,
    signals: broadcast::Sender<SessionSignal>,
}

impl SessionHandle {
    /// Start the session and spawn its loop
    pub async fn spawn(mut session: Session) -> Self {
        session.start().await;
        let (tx, rx) = mpsc::channel(64);
        let signals = session.signal_sender();
        tokio::spawn(run(session, rx));
        info!("Session spawned");
        Self { tx, signals }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionSignal> {
        self.signals.subscribe()
    }

    async fn request<T>(&self, build: impl FnOnce(Reply<T>) -> SessionCommand) -> Result<T, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx.send(build(reply_tx)).await.map_err(|_| SessionError::Closed)?;
        reply_rx.await.map_err(|_| SessionError::Closed)?
    }

    pub async fn log_mood(&self, score: u8, energy: EnergyLevel, note: Option<String>) -> Result<Mode, SessionError> {
        self.request(|reply| SessionCommand::LogMood {
            score,
            energy,
            note,
            reply,
        })
        .await
    }

    /// Pin a mode, or clear the pin with `None`
    pub async fn override_mode(&self, mode: Option<Mode>) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::OverrideMode { mode, reply }).await
    }

    pub async fn snooze(&self) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::Snooze { reply }).await
    }

    pub async fn mode_event(&self, event: ModeEvent) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::ModeEvent { event, reply }).await
    }

    /// Fire-and-forget input activity
    pub async fn activity(&self) -> Result<(), SessionError> {
        self.tx
            .send(SessionCommand::Activity)
            .await
            .map_err(|_| SessionError::Closed)
    }

    pub async fn enter_pipeline(&self, handoff_task: Option<String>) -> Result<Advance, SessionError> {
        self.request(|reply| SessionCommand::EnterPipeline { handoff_task, reply })
            .await
    }

    pub async fn set_dump_text(&self, text: impl Into<String>) -> Result<(), SessionError> {
        let text = text.into();
        self.request(|reply| SessionCommand::SetDumpText { text, reply }).await
    }

    pub async fn submit_dump(&self, text: impl Into<String>) -> Result<Advance, SessionError> {
        let text = text.into();
        self.request(|reply| SessionCommand::SubmitDump { text, reply }).await
    }

    /// Add a triage item; returns its ID
    pub async fn add_task(&self, text: impl Into<String>) -> Result<String, SessionError> {
        let text = text.into();
        self.request(|reply| SessionCommand::AddTask { text, reply }).await
    }

    pub async fn edit_task(&self, task_id: &str, text: impl Into<String>) -> Result<(), SessionError> {
        let (task_id, text) = (task_id.to_string(), text.into());
        self.request(|reply| SessionCommand::EditTask { task_id, text, reply })
            .await
    }

    pub async fn remove_task(&self, task_id: &str) -> Result<TriageItem, SessionError> {
        let task_id = task_id.to_string();
        self.request(|reply| SessionCommand::RemoveTask { task_id, reply }).await
    }

    /// Drop the last triage item to get back under capacity or the sprint limit
    pub async fn defer_last(&self) -> Result<TriageItem, SessionError> {
        self.request(|reply| SessionCommand::DeferLast { reply }).await
    }

    pub async fn check_capacity(&self, now: NaiveTime) -> Result<CapacityReport, SessionError> {
        self.request(|reply| SessionCommand::CheckCapacity { now, reply }).await
    }

    pub async fn confirm_triage(&self, choice: Option<TooBigChoice>) -> Result<Advance, SessionError> {
        self.request(|reply| SessionCommand::ConfirmTriage { choice, reply }).await
    }

    pub async fn set_context(&self, task_id: &str, update: ContextUpdate) -> Result<(), SessionError> {
        let task_id = task_id.to_string();
        self.request(|reply| SessionCommand::SetContext { task_id, update, reply })
            .await
    }

    pub async fn advance_context(&self) -> Result<Advance, SessionError> {
        self.request(|reply| SessionCommand::AdvanceContext { reply }).await
    }

    pub async fn add_step(
        &self,
        task_id: &str,
        text: impl Into<String>,
        time_estimate_mins: u32,
    ) -> Result<String, SessionError> {
        let (task_id, text) = (task_id.to_string(), text.into());
        self.request(|reply| SessionCommand::AddStep {
            task_id,
            text,
            time_estimate_mins,
            reply,
        })
        .await
    }

    pub async fn edit_step(&self, task_id: &str, step_id: &str, text: impl Into<String>) -> Result<(), SessionError> {
        let (task_id, step_id, text) = (task_id.to_string(), step_id.to_string(), text.into());
        self.request(|reply| SessionCommand::EditStep {
            task_id,
            step_id,
            text,
            reply,
        })
        .await
    }

    pub async fn remove_step(&self, task_id: &str, step_id: &str) -> Result<MicroStep, SessionError> {
        let (task_id, step_id) = (task_id.to_string(), step_id.to_string());
        self.request(|reply| SessionCommand::RemoveStep {
            task_id,
            step_id,
            reply,
        })
        .await
    }

    pub async fn confirm_breakdown(&self) -> Result<Vec<String>, SessionError> {
        self.request(|reply| SessionCommand::ConfirmBreakdown { reply }).await
    }

    pub async fn restart_pipeline(&self) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::RestartPipeline { reply }).await
    }

    pub async fn skip_to_dashboard(&self) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::SkipToDashboard { reply }).await
    }

    pub async fn toggle_step(&self, plan_id: &str, step_id: &str) -> Result<(), SessionError> {
        let (plan_id, step_id) = (plan_id.to_string(), step_id.to_string());
        self.request(|reply| SessionCommand::ToggleStep {
            plan_id,
            step_id,
            reply,
        })
        .await
    }

    pub async fn start_burst(&self, plan_id: &str) -> Result<(), SessionError> {
        let plan_id = plan_id.to_string();
        self.request(|reply| SessionCommand::StartBurst { plan_id, reply }).await
    }

    pub async fn resolve_burst(&self, plan_id: &str, choice: BurstChoice) -> Result<(), SessionError> {
        let plan_id = plan_id.to_string();
        self.request(|reply| SessionCommand::ResolveBurst { plan_id, choice, reply })
            .await
    }

    pub async fn resolve_drift(&self, choice: DriftChoice) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::ResolveDrift { choice, reply }).await
    }

    pub async fn delete_plan(&self, plan_id: &str) -> Result<(), SessionError> {
        let plan_id = plan_id.to_string();
        self.request(|reply| SessionCommand::DeletePlan { plan_id, reply }).await
    }

    pub async fn delete_step(&self, plan_id: &str, step_id: &str) -> Result<(), SessionError> {
        let (plan_id, step_id) = (plan_id.to_string(), step_id.to_string());
        self.request(|reply| SessionCommand::DeleteStep {
            plan_id,
            step_id,
            reply,
        })
        .await
    }

    pub async fn undo_deletion(&self) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::UndoDeletion { reply }).await
    }

    pub async fn quick_capture(&self, text: impl Into<String>) -> Result<String, SessionError> {
        let text = text.into();
        self.request(|reply| SessionCommand::QuickCapture { text, reply }).await
    }

    pub async fn reconcile(&self) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::Reconcile { reply }).await
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(|reply| SessionCommand::Snapshot { reply }).await
    }

    /// Stop the loop; unsaved pipeline edits are flushed first
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.tx
            .send(SessionCommand::Shutdown)
            .await
            .map_err(|_| SessionError::Closed)
    }
}

/// Serve commands and timer expiries until shutdown or every handle is gone
pub async fn run(mut session: Session, mut rx: mpsc::Receiver<SessionCommand>) {
    debug!("Session loop started");
    loop {
        let next = tokio::select! {
            cmd = rx.recv() => Some(cmd),
            _ = session.timers().wait_next() => None,
        };

        match next {
            None => {
                session.fire_due().await;
            }
            Some(None) | Some(Some(SessionCommand::Shutdown)) => break,
            Some(Some(cmd)) => dispatch(&mut session, cmd).await,
        }
    }
    session.flush();
    info!("Session loop stopped");
}

async fn dispatch(session: &mut Session, cmd: SessionCommand) {
    match cmd {
        SessionCommand::LogMood {
            score,
            energy,
            note,
            reply,
        } => {
            let _ = reply.send(session.log_mood(score, energy, note).await);
        }
        SessionCommand::OverrideMode { mode, reply } => {
            match mode {
                Some(mode) => session.override_mode(mode),
                None => session.clear_override(),
            }
            let _ = reply.send(Ok(()));
        }
        SessionCommand::Snooze { reply } => {
            session.snooze();
            let _ = reply.send(Ok(()));
        }
        SessionCommand::ModeEvent { event, reply } => {
            session.mode_event(event);
            let _ = reply.send(Ok(()));
        }
        SessionCommand::Activity => session.note_activity().await,
        SessionCommand::EnterPipeline { handoff_task, reply } => {
            let _ = reply.send(Ok(session.enter_pipeline(handoff_task).await));
        }
        SessionCommand::SetDumpText { text, reply } => {
            let _ = reply.send(session.edit_pipeline(|p| p.set_dump_text(&text)));
        }
        SessionCommand::SubmitDump { text, reply } => {
            let _ = reply.send(session.submit_dump(&text).await);
        }
        SessionCommand::AddTask { text, reply } => {
            let _ = reply.send(session.edit_pipeline(|p| p.add_task(&text)));
        }
        SessionCommand::EditTask { task_id, text, reply } => {
            let _ = reply.send(session.edit_pipeline(|p| p.edit_task(&task_id, &text)));
        }
        SessionCommand::RemoveTask { task_id, reply } => {
            let _ = reply.send(session.edit_pipeline(|p| p.remove_task(&task_id)));
        }
        SessionCommand::DeferLast { reply } => {
            let _ = reply.send(session.edit_pipeline(|p| p.defer_last()));
        }
        SessionCommand::CheckCapacity { now, reply } => {
            let _ = reply.send(session.check_capacity(now));
        }
        SessionCommand::ConfirmTriage { choice, reply } => {
            let _ = reply.send(session.confirm_triage(choice));
        }
        SessionCommand::SetContext { task_id, update, reply } => {
            let _ = reply.send(session.edit_pipeline(|p| p.set_context(&task_id, update)));
        }
        SessionCommand::AdvanceContext { reply } => {
            let _ = reply.send(session.advance_context().await);
        }
        SessionCommand::AddStep {
            task_id,
            text,
            time_estimate_mins,
            reply,
        } => {
            let _ = reply.send(session.edit_pipeline(|p| p.add_step(&task_id, &text, time_estimate_mins)));
        }
        SessionCommand::EditStep {
            task_id,
            step_id,
            text,
            reply,
        } => {
            let _ = reply.send(session.edit_pipeline(|p| p.edit_step(&task_id, &step_id, &text)));
        }
        SessionCommand::RemoveStep {
            task_id,
            step_id,
            reply,
        } => {
            let _ = reply.send(session.edit_pipeline(|p| p.remove_step(&task_id, &step_id)));
        }
        SessionCommand::ConfirmBreakdown { reply } => {
            let _ = reply.send(session.confirm_breakdown().await);
        }
        SessionCommand::RestartPipeline { reply } => {
            session.restart_pipeline();
            let _ = reply.send(Ok(()));
        }
        SessionCommand::SkipToDashboard { reply } => {
            session.skip_to_dashboard();
            let _ = reply.send(Ok(()));
        }
        SessionCommand::ToggleStep {
            plan_id,
            step_id,
            reply,
        } => {
            let _ = reply.send(session.toggle_step(&plan_id, &step_id).await);
        }
        SessionCommand::StartBurst { plan_id, reply } => {
            let _ = reply.send(session.start_burst(&plan_id).await);
        }
        SessionCommand::ResolveBurst { plan_id, choice, reply } => {
            let _ = reply.send(session.resolve_burst(&plan_id, choice).await);
        }
        SessionCommand::ResolveDrift { choice, reply } => {
            let _ = reply.send(session.resolve_drift(choice));
        }
        SessionCommand::DeletePlan { plan_id, reply } => {
            let _ = reply.send(session.delete_plan(&plan_id).await);
        }
        SessionCommand::DeleteStep {
            plan_id,
            step_id,
            reply,
        } => {
            let _ = reply.send(session.delete_step(&plan_id, &step_id).await);
        }
        SessionCommand::UndoDeletion { reply } => {
            let _ = reply.send(session.undo_deletion().await);
        }
        SessionCommand::QuickCapture { text, reply } => {
            let _ = reply.send(session.quick_capture(&text).await);
        }
        SessionCommand::Reconcile { reply } => {
            session.reconcile().await;
            let _ = reply.send(Ok(()));
        }
        SessionCommand::Snapshot { reply } => {
            let _ = reply.send(Ok(SessionSnapshot {
                mode: session.mode_state().clone(),
                stage: session.pipeline().stage(),
                pipeline: session.pipeline().payload().clone(),
                plans: session.plans().to_vec(),
            }));
        }
        SessionCommand::Shutdown => {}
    }
}
