//! ScienceRover: operates (produces science) or charges (spec.md §4.3, §4.4.6).

use crate::models::{AgentCore, Mode, ResourceId, StockFlow};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScienceRoverConfig {
    pub battery_capacity_kwh: f64,
    pub min_battery_to_operate_kwh: f64,
    pub charge_rate_kwh: f64,
    pub operate_power_kwh: f64,
    pub science_generation_per_step: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScienceRover {
    pub core: AgentCore,
    pub config: ScienceRoverConfig,
    pub battery_kwh: f64,
}

pub struct ScienceRoverOutcome {
    pub flows: Vec<StockFlow>,
    pub science_generated: f64,
    pub operated: bool,
}

impl ScienceRover {
    pub fn new(core: AgentCore, config: ScienceRoverConfig) -> Self {
        let battery_kwh = config.battery_capacity_kwh;
        ScienceRover {
            core,
            config,
            battery_kwh,
        }
    }

    /// `throttled` skips the rover entirely for the step (policy-driven
    /// dust throttle, spec.md §4.6). `grid_power_available` caps how much
    /// the rover can draw to charge.
    pub fn step(&mut self, throttled: bool, grid_power_available: f64) -> ScienceRoverOutcome {
        self.core.tick_age();
        if self.core.is_retired() {
            return ScienceRoverOutcome {
                flows: vec![],
                science_generated: 0.0,
                operated: false,
            };
        }
        if throttled {
            self.core.mode = Mode::Throttled;
            return ScienceRoverOutcome {
                flows: vec![],
                science_generated: 0.0,
                operated: false,
            };
        }

        if self.battery_kwh >= self.config.min_battery_to_operate_kwh {
            self.battery_kwh -= self.config.operate_power_kwh;
            self.battery_kwh = self.battery_kwh.max(0.0);
            self.core.mode = Mode::Active("OPERATING".to_string());
            let sector = self.core.sector.clone();
            ScienceRoverOutcome {
                flows: vec![StockFlow::produce(
                    sector,
                    ResourceId::new("science_units"),
                    self.config.science_generation_per_step,
                )],
                science_generated: self.config.science_generation_per_step,
                operated: true,
            }
        } else {
            let draw = grid_power_available
                .min(self.config.charge_rate_kwh)
                .min(self.config.battery_capacity_kwh - self.battery_kwh);
            self.battery_kwh += draw.max(0.0);
            self.core.mode = Mode::Active("CHARGING".to_string());
            ScienceRoverOutcome {
                flows: vec![],
                science_generated: 0.0,
                operated: false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AgentId, SectorId};

    fn rover() -> ScienceRover {
        ScienceRover::new(
            AgentCore::new(AgentId::new("rover-1"), SectorId::new("science"), 100_000),
            ScienceRoverConfig {
                battery_capacity_kwh: 10.0,
                min_battery_to_operate_kwh: 2.0,
                charge_rate_kwh: 1.0,
                operate_power_kwh: 1.0,
                science_generation_per_step: 5.0,
            },
        )
    }

    #[test]
    fn operates_when_battery_sufficient() {
        let mut rover = rover();
        let outcome = rover.step(false, 0.0);
        assert!(outcome.operated);
        assert_eq!(outcome.science_generated, 5.0);
        assert_eq!(rover.battery_kwh, 9.0);
    }

    #[test]
    fn charges_below_minimum_battery() {
        let mut rover = rover();
        rover.battery_kwh = 1.0;
        let outcome = rover.step(false, 5.0);
        assert!(!outcome.operated);
        assert_eq!(rover.battery_kwh, 2.0);
    }

    #[test]
    fn throttle_skips_entirely() {
        let mut rover = rover();
        let outcome = rover.step(true, 5.0);
        assert!(!outcome.operated);
        assert_eq!(outcome.science_generated, 0.0);
        assert_eq!(rover.battery_kwh, 10.0);
    }
}
