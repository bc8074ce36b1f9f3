//! AssemblyRobot: make-to-order module assembly (spec.md §4.3, §4.4.3).

use crate::models::{AgentCore, Mode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyRobotConfig {
    pub assembly_time_steps: u64,
    pub power_kwh: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyRobot {
    pub core: AgentCore,
    pub config: AssemblyRobotConfig,
    /// Set when a construction request is assigned; consumed on start.
    assigned_module: Option<(String, crate::models::SectorId)>,
}

pub enum AssemblyOutcome {
    Idle,
    InProgress,
    /// `(module_type, requester)`, fires the `module_completed` event.
    Completed(String, crate::models::SectorId),
    StarvedOfPower,
}

impl AssemblyRobot {
    pub fn new(core: AgentCore, config: AssemblyRobotConfig) -> Self {
        AssemblyRobot {
            core,
            config,
            assigned_module: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.core.mode, Mode::Idle) && self.assigned_module.is_none()
    }

    /// Assigns a module to build (1 shell + 1 equipment unit are consumed
    /// by the caller before calling this, since the robot only tracks its
    /// own timer, not sector stock).
    pub fn assign(&mut self, module_type: String, requester: crate::models::SectorId) {
        self.assigned_module = Some((module_type, requester));
        self.core.mode = Mode::Active("ASSEMBLING".to_string());
        self.core.timer = Some(self.config.assembly_time_steps);
    }

    pub fn step(&mut self, power_allocated: f64) -> AssemblyOutcome {
        self.core.tick_age();
        if self.core.is_retired() {
            return AssemblyOutcome::Idle;
        }
        if self.assigned_module.is_none() {
            return AssemblyOutcome::Idle;
        }
        if power_allocated < self.config.power_kwh {
            return AssemblyOutcome::StarvedOfPower;
        }

        let remaining = self.core.timer.unwrap_or(0);
        if remaining == 0 {
            let (module_type, requester) = self.assigned_module.take().unwrap();
            self.core.mode = Mode::Idle;
            return AssemblyOutcome::Completed(module_type, requester);
        }
        self.core.timer = Some(remaining - 1);
        AssemblyOutcome::InProgress
    }
}
