//! The generic agent envelope shared by all six agent kinds (spec.md §3, §4.3).

use super::ids::{AgentId, SectorId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Mode {
    Idle,
    /// Actively working; the string names the agent-kind-specific sub-mode
    /// (e.g. an ISRU agent's `HE3_EXTRACTION`).
    Active(String),
    Throttled,
    Fault,
    Retired,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Health {
    pub age_steps: u64,
    pub wear: f64,
    pub fault_counter: u32,
}

/// Fields shared by every agent kind. Concrete agent structs in
/// `crate::agents::*` embed one of these as `core`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentCore {
    pub id: AgentId,
    pub sector: SectorId,
    pub mode: Mode,
    pub health: Health,
    pub lifetime_steps: u64,
    /// Remaining steps of a multi-step task (printing, assembly, rocket legs).
    pub timer: Option<u64>,
}

impl AgentCore {
    pub fn new(id: AgentId, sector: SectorId, lifetime_steps: u64) -> Self {
        AgentCore {
            id,
            sector,
            mode: Mode::Idle,
            health: Health::default(),
            lifetime_steps,
            timer: None,
        }
    }

    pub fn is_retired(&self) -> bool {
        matches!(self.mode, Mode::Retired)
    }

    /// Advances age and retires the agent on end-of-life. Call once per
    /// step for every non-retired agent, before kind-specific logic runs.
    pub fn tick_age(&mut self) {
        if self.is_retired() {
            return;
        }
        self.health.age_steps += 1;
        if self.health.age_steps >= self.lifetime_steps {
            self.mode = Mode::Retired;
        }
    }

    pub fn mark_fault(&mut self) {
        self.health.fault_counter += 1;
        self.mode = Mode::Fault;
    }

    pub fn reset_from_fault(&mut self) {
        if matches!(self.mode, Mode::Fault) {
            self.mode = Mode::Idle;
        }
    }
}
