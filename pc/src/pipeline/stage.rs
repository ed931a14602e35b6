//! Pipeline stages and entry flags

use serde::{Deserialize, Serialize};

use crate::domain::{EnergyLevel, Mode};

/// The five pipeline stages, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    BrainDump,
    Triage,
    Context,
    Breakdown,
    Dashboard,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BrainDump => write!(f, "brain_dump"),
            Self::Triage => write!(f, "triage"),
            Self::Context => write!(f, "context"),
            Self::Breakdown => write!(f, "breakdown"),
            Self::Dashboard => write!(f, "dashboard"),
        }
    }
}

/// Mode/energy flags the pipeline was entered with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PipelineFlags {
    /// Low-energy handoff: skip straight to a gentle breakdown
    pub gentle: bool,
    /// High energy: triage must be trimmed before confirming
    pub sprint: bool,
    pub energy: EnergyLevel,
}

impl PipelineFlags {
    /// Derive flags from the current mode and energy; gentle wins over sprint
    pub fn for_mode(mode: Mode, energy: EnergyLevel) -> Self {
        let gentle = matches!(mode, Mode::Recovery | Mode::WarmingUp) || energy == EnergyLevel::Low;
        let sprint = !gentle && (mode == Mode::Growth || energy == EnergyLevel::High);
        Self { gentle, sprint, energy }
    }
}
