//! Pacer - mood-aware task breakdown and focus sessions
//!
//! CLI entry point. Every invocation opens the store, restores a session
//! from persisted history, runs one command and shuts the session down.

use std::fs;
use std::sync::Arc;

use chrono::Local;
use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result, bail};
use tokio::sync::broadcast;
use tracing::{debug, info};

use pacer::cli::{Cli, Command, GoalCommand, log_dir};
use pacer::config::Config;
use pacer::domain::{EnergyLevel, Goal, Mode, Priority, RewardKind, TaskPlan};
use pacer::pipeline::{ConfirmBlock, FileDraftStore, PipelineError, Stage, TooBigChoice};
use pacer::session::{Session, SessionError, SessionHandle, SessionSignal};
use pacer::state::{Persistence, StateManager};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_dir = log_dir();
    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("pacer.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref()).context("Failed to setup logging")?;

    let store_dir = config.storage.store_path();
    fs::create_dir_all(&store_dir).context("Failed to create store directory")?;
    let state = StateManager::spawn(&store_dir).context("Failed to open store")?;
    info!(store_dir = %store_dir.display(), "Pacer loaded config");

    debug!(command = ?cli.command, "main: dispatching command");
    let result = match cli.command {
        Command::Mood { score, energy, note } => {
            debug!("main: matched Mood command");
            cmd_mood(&config, &state, score, energy, note).await
        }
        Command::Mode { set } => {
            debug!("main: matched Mode command");
            cmd_mode(&config, &state, set).await
        }
        Command::Capture { text } => {
            debug!("main: matched Capture command");
            cmd_capture(&config, &state, &text).await
        }
        Command::Plans { all } => {
            debug!("main: matched Plans command");
            cmd_plans(&state, all).await
        }
        Command::Goal { command } => match command {
            GoalCommand::Add { title, priority } => {
                debug!("main: matched GoalCommand::Add");
                cmd_goal_add(&state, title, priority).await
            }
            GoalCommand::List { all } => {
                debug!("main: matched GoalCommand::List");
                cmd_goal_list(&state, all).await
            }
        },
        Command::Dump { text } => {
            debug!("main: matched Dump command");
            cmd_dump(&config, &state, &text).await
        }
    };

    if let Err(e) = state.shutdown().await {
        debug!(error = %e, "main: state shutdown failed");
    }
    result
}

/// Build and spawn the session actor for one invocation
async fn open_session(config: &Config, state: &StateManager) -> SessionHandle {
    let persistence: Arc<dyn Persistence> = Arc::new(state.clone());
    let advice = pacer::advice::create_service(&config.advice);
    let drafts = Arc::new(FileDraftStore::new(config.storage.draft_path()));
    SessionHandle::spawn(Session::new(config, persistence, advice, drafts)).await
}

async fn cmd_mood(
    config: &Config,
    state: &StateManager,
    score: u8,
    energy: EnergyLevel,
    note: Option<String>,
) -> Result<()> {
    let session = open_session(config, state).await;
    let mut signals = session.subscribe();

    let mode = session.log_mood(score, energy, note).await?;
    println!("Mood {} logged ({} energy)", score.to_string().bold(), energy);
    println!("Mode: {}", paint_mode(mode));
    if mode == Mode::Recovery {
        println!("{}", "Go easy. Pacer will check in again in a little while.".dimmed());
    }

    session.shutdown().await?;
    print_signals(&mut signals);
    Ok(())
}

async fn cmd_mode(config: &Config, state: &StateManager, set: Option<Mode>) -> Result<()> {
    let session = open_session(config, state).await;
    if set.is_some() {
        session.override_mode(set).await?;
    }
    let snapshot = session.snapshot().await?;
    session.shutdown().await?;

    let mode_state = snapshot.mode;
    let pinned = if mode_state.manual_override { " (pinned)" } else { "" };
    println!("Mode: {}{}", paint_mode(mode_state.mode), pinned);
    println!("Since: {}", mode_state.entered_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"));
    Ok(())
}

async fn cmd_capture(config: &Config, state: &StateManager, text: &str) -> Result<()> {
    let session = open_session(config, state).await;
    let mut signals = session.subscribe();

    let plan_id = session.quick_capture(text).await?;
    session.shutdown().await?;

    println!("{} {}", "Captured".green(), plan_id.dimmed());
    print_signals(&mut signals);
    Ok(())
}

async fn cmd_plans(state: &StateManager, all: bool) -> Result<()> {
    let plans = state.list_plans(all).await?;
    if plans.is_empty() {
        println!("{}", "Nothing on the board.".dimmed());
        return Ok(());
    }
    for plan in &plans {
        print_plan(plan);
    }
    Ok(())
}

async fn cmd_goal_add(state: &StateManager, title: String, priority: Priority) -> Result<()> {
    let goal = Goal::new(title, priority);
    let id = state.insert_goal(goal).await?;
    println!("{} {}", "Goal added".green(), id.dimmed());
    Ok(())
}

async fn cmd_goal_list(state: &StateManager, all: bool) -> Result<()> {
    let goals = state.list_goals(!all).await?;
    if goals.is_empty() {
        println!("{}", "No goals yet.".dimmed());
        return Ok(());
    }
    for goal in &goals {
        let marker = if goal.active { "*".green() } else { "-".dimmed() };
        println!("{} {} [{}] {}", marker, goal.title.bold(), goal.priority, goal.id.dimmed());
    }
    Ok(())
}

/// Run the pipeline end to end with default choices at every stage
async fn cmd_dump(config: &Config, state: &StateManager, text: &str) -> Result<()> {
    let session = open_session(config, state).await;
    let mut signals = session.subscribe();

    let mut advance = session.enter_pipeline(None).await?;
    match advance.stage {
        Stage::BrainDump => {}
        Stage::Breakdown => {
            println!(
                "{}",
                "Low energy: starting with one gentle step instead of the dump.".yellow()
            );
        }
        stage => {
            // Restart lands on brain_dump itself; entering again would route away from it
            debug!(%stage, "cmd_dump: discarding unfinished pipeline");
            session.restart_pipeline().await?;
            advance.stage = Stage::BrainDump;
        }
    }
    if advance.stage == Stage::BrainDump {
        advance = session.submit_dump(text).await?;
    }

    let plan_ids = loop {
        match advance.stage {
            Stage::Triage => {
                if let Some(report) = advance.capacity.filter(|r| r.over_capacity) {
                    println!(
                        "{} {} min planned, {} min available",
                        "Over capacity:".yellow(),
                        report.total_mins,
                        report.budget_mins
                    );
                }
                advance = match session.confirm_triage(Some(TooBigChoice::ProceedAnyway)).await {
                    Err(SessionError::Pipeline(PipelineError::Blocked(ConfirmBlock::SprintTooMany { limit, count }))) => {
                        for _ in limit..count {
                            let item = session.defer_last().await?;
                            println!("{} {}", "Deferred past the sprint limit:".yellow(), item.text);
                        }
                        session.confirm_triage(Some(TooBigChoice::ProceedAnyway)).await?
                    }
                    result => result?,
                };
            }
            Stage::Context => advance = session.advance_context().await?,
            Stage::Breakdown => break session.confirm_breakdown().await?,
            stage => {
                session.shutdown().await?;
                bail!("Brain dump was not taken: pipeline stopped at {}", stage);
            }
        }
    };

    let snapshot = session.snapshot().await?;
    session.shutdown().await?;

    for plan in snapshot.plans.iter().filter(|p| plan_ids.contains(&p.id)) {
        print_plan(plan);
    }
    print_signals(&mut signals);
    Ok(())
}

fn paint_mode(mode: Mode) -> colored::ColoredString {
    let label = mode.to_string();
    match mode {
        Mode::Recovery => label.red(),
        Mode::WarmingUp => label.yellow(),
        Mode::Maintenance => label.cyan(),
        Mode::Growth => label.green(),
    }
}

fn print_plan(plan: &TaskPlan) {
    let status = if plan.is_complete() {
        "done".green()
    } else {
        format!("{}%", plan.percent_complete()).yellow()
    };
    println!("{} [{}] {} {}", plan.task_name.bold(), status, plan.due, plan.id.dimmed());
    for step in plan.steps() {
        let check = if step.is_completed() { "x" } else { " " };
        println!("  [{}] {} ({} min)", check, step.text, step.time_estimate_mins);
    }
}

/// Print whatever the session raised that the user should see
fn print_signals(signals: &mut broadcast::Receiver<SessionSignal>) {
    while let Ok(signal) = signals.try_recv() {
        match signal {
            SessionSignal::ModeChanged { from, to } => {
                println!("{} {} -> {}", "Mode changed:".bold(), paint_mode(from), paint_mode(to));
            }
            SessionSignal::Degraded(degradation) => {
                println!("{} {}", "Advice unavailable, used local defaults:".yellow(), degradation);
            }
            SessionSignal::RewardGranted(reward) if reward.kind == RewardKind::PlanCompleted => {
                println!("{}", "Plan complete!".green().bold());
            }
            SessionSignal::PersistenceFailed { operation, error, .. } => {
                eprintln!("{} {}: {}", "Not saved:".red(), operation, error);
            }
            other => debug!(?other, "print_signals: not shown"),
        }
    }
}
