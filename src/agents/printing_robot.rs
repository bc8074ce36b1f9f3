//! PrintingRobot: make-to-stock shell production (spec.md §4.3, §4.4.3).

use crate::models::{AgentCore, Mode, ResourceId, StockFlow};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintingRobotConfig {
    pub processing_time_steps: u64,
    pub power_kwh: f64,
    pub regolith_kg_per_step: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintingRobot {
    pub core: AgentCore,
    pub config: PrintingRobotConfig,
}

pub enum PrintOutcome {
    Idle,
    InProgress,
    Completed(StockFlow),
    StarvedOfPower,
}

impl PrintingRobot {
    /// `power_allocated` and `regolith_available` are this step's budget;
    /// `start` requests a new print task if the robot is idle.
    pub fn step(&mut self, power_allocated: f64, start: bool) -> PrintOutcome {
        self.core.tick_age();
        if self.core.is_retired() {
            return PrintOutcome::Idle;
        }

        if matches!(self.core.mode, Mode::Idle) {
            if !start {
                return PrintOutcome::Idle;
            }
            self.core.mode = Mode::Active("PRINTING".to_string());
            self.core.timer = Some(self.config.processing_time_steps);
        }

        if power_allocated < self.config.power_kwh {
            return PrintOutcome::StarvedOfPower;
        }

        let remaining = self.core.timer.unwrap_or(0);
        if remaining == 0 {
            self.core.mode = Mode::Idle;
            self.core.timer = None;
            return PrintOutcome::Idle;
        }
        let remaining = remaining - 1;
        self.core.timer = Some(remaining);

        if remaining == 0 {
            self.core.mode = Mode::Idle;
            self.core.timer = None;
            PrintOutcome::Completed(StockFlow::produce(
                self.core.sector.clone(),
                ResourceId::new("shells"),
                1.0,
            ))
        } else {
            PrintOutcome::InProgress
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AgentId, SectorId};

    fn robot() -> PrintingRobot {
        PrintingRobot {
            core: AgentCore::new(AgentId::new("print-1"), SectorId::new("construction"), 100_000),
            config: PrintingRobotConfig {
                processing_time_steps: 2,
                power_kwh: 3.0,
                regolith_kg_per_step: 1.0,
            },
        }
    }

    #[test]
    fn idle_without_start_stays_idle() {
        let mut robot = robot();
        assert!(matches!(robot.step(3.0, false), PrintOutcome::Idle));
    }

    #[test]
    fn completes_after_processing_time_and_produces_one_shell() {
        let mut robot = robot();
        assert!(matches!(robot.step(3.0, true), PrintOutcome::InProgress));
        match robot.step(3.0, false) {
            PrintOutcome::Completed(flow) => {
                assert_eq!(flow.resource_id, ResourceId::new("shells"));
                assert_eq!(flow.delta, 1.0);
            }
            _ => panic!("expected completion"),
        }
        assert!(matches!(robot.core.mode, Mode::Idle));
    }

    #[test]
    fn starved_of_power_does_not_advance_timer() {
        let mut robot = robot();
        robot.step(3.0, true);
        assert!(matches!(robot.step(0.0, false), PrintOutcome::StarvedOfPower));
        assert_eq!(robot.core.timer, Some(1));
    }
}
