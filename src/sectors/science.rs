//! Science Sector: rover fleet power allocation, throttle, fleet growth
//! (spec.md §4.4.6).

use crate::agents::{ScienceRover, ScienceRoverConfig};
use crate::models::{AgentCore, AgentId, Event, SectorId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScienceSector {
    pub id: SectorId,
    pub rovers: Vec<ScienceRover>,
    pub rover_template: ScienceRoverConfig,
    pub throttle_factor: f64,
    pub target_rate: f64,
    pub step_science_generated: f64,
    next_rover_seq: u64,
}

pub struct ScienceStepOutput {
    pub flows: Vec<crate::models::StockFlow>,
}

impl ScienceSector {
    pub fn new(id: SectorId, rovers: Vec<ScienceRover>, rover_template: ScienceRoverConfig) -> Self {
        ScienceSector {
            id,
            rovers,
            rover_template,
            throttle_factor: 0.0,
            target_rate: 0.0,
            step_science_generated: 0.0,
            next_rover_seq: 0,
        }
    }

    pub fn set_throttle_factor(&mut self, f: f64) {
        self.throttle_factor = f.clamp(0.0, 1.0);
    }

    pub fn set_target_rate(&mut self, r: f64) {
        self.target_rate = r;
    }

    pub fn active_rover_count(&self) -> usize {
        self.rovers.iter().filter(|r| !r.core.is_retired()).count()
    }

    /// Listens for `module_completed(Science_Rover_EQ)` to grow the fleet
    /// (spec.md §4.4.6).
    pub fn on_events(&mut self, events: &[Event]) {
        for event in events {
            if let Event::ModuleCompleted { module_type, requester } = event {
                if module_type == "Science_Rover_EQ" && *requester == self.id {
                    self.next_rover_seq += 1;
                    let id = AgentId::new(format!("rover-{}", self.next_rover_seq));
                    self.rovers.push(ScienceRover::new(
                        AgentCore::new(id, self.id.clone(), 1_000_000),
                        self.rover_template.clone(),
                    ));
                }
            }
        }
    }

    pub fn step(&mut self, power_allocated: f64, rng: &mut crate::rng::StepRng) -> ScienceStepOutput {
        let mut flows = Vec::new();
        self.step_science_generated = 0.0;
        let per_rover_power = if self.rovers.is_empty() {
            0.0
        } else {
            power_allocated / self.rovers.len() as f64
        };
        for rover in &mut self.rovers {
            let throttled = rng.gen_bool(self.throttle_factor);
            let outcome = rover.step(throttled, per_rover_power);
            self.step_science_generated += outcome.science_generated;
            flows.extend(outcome.flows);
        }
        ScienceStepOutput { flows }
    }
}
