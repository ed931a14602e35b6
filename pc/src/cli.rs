//! CLI command definitions and subcommands

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::{EnergyLevel, Mode, Priority};

/// Pacer - mood-aware task breakdown and focus sessions
#[derive(Parser)]
#[command(name = "pacer", about = "Mood-aware task breakdown and focus sessions", version)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log a mood sample (0-10) and show the resulting mode
    Mood {
        /// Mood score, 0 (worst) to 10 (best)
        score: u8,

        /// Energy level (low, medium, high)
        #[arg(short, long, default_value = "medium")]
        energy: EnergyLevel,

        /// Optional free-text note
        #[arg(short, long)]
        note: Option<String>,
    },

    /// Show the current mode, optionally pinning one for this run
    Mode {
        /// Pin a mode instead of classifying
        #[arg(long = "set", value_name = "MODE")]
        set: Option<Mode>,
    },

    /// Quick-capture a task without going through the pipeline
    Capture {
        /// Task text
        text: String,
    },

    /// List open plans
    Plans {
        /// Include completed plans
        #[arg(short, long)]
        all: bool,
    },

    /// Manage goals
    Goal {
        #[command(subcommand)]
        command: GoalCommand,
    },

    /// Run the whole pipeline on a brain dump with default context choices
    Dump {
        /// Free-text brain dump
        text: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum GoalCommand {
    /// Add a goal
    Add {
        /// Goal title
        title: String,

        /// Priority (low, normal, high, critical)
        #[arg(short, long, default_value = "normal")]
        priority: Priority,
    },

    /// List goals
    List {
        /// Include inactive goals
        #[arg(short, long)]
        all: bool,
    },
}

/// Directory holding the log file
pub fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pacer")
        .join("logs")
}

pub fn get_log_path() -> PathBuf {
    log_dir().join("pacer.log")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_mood() {
        let cli = Cli::parse_from(["pacer", "mood", "3", "--energy", "low", "--note", "rough day"]);
        match cli.command {
            Command::Mood { score, energy, note } => {
                assert_eq!(score, 3);
                assert_eq!(energy, EnergyLevel::Low);
                assert_eq!(note.as_deref(), Some("rough day"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_goal_add_with_global_flags() {
        let cli = Cli::parse_from(["pacer", "goal", "add", "Run a 5k", "-p", "high", "--log-level", "debug"]);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Command::Goal {
                command: GoalCommand::Add { title, priority },
            } => {
                assert_eq!(title, "Run a 5k");
                assert_eq!(priority, Priority::High);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unknown_mode() {
        assert!(Cli::try_parse_from(["pacer", "mode", "--set", "hyperdrive"]).is_err());
    }
}
