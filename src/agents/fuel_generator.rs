//! FuelGenerator: converts He3 into rocket fuel (spec.md §4.3, §4.4.5).

use crate::models::{AgentCore, Mode, ResourceId, StockFlow};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuelGeneratorConfig {
    /// Thermal energy yield per kg of He3 processed, in GWh.
    pub gwh_thermal_per_kg: f64,
    pub efficiency: f64,
    pub kwh_per_kg_prop: f64,
    pub power_kwh: f64,
    pub max_he3_kg_per_step: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuelGenerator {
    pub core: AgentCore,
    pub config: FuelGeneratorConfig,
}

pub struct FuelOutcome {
    pub flows: Vec<StockFlow>,
    pub did_work: bool,
}

impl FuelGenerator {
    /// `he3_available` is the sector's current He3 stock this step; the
    /// generator consumes up to `max_he3_kg_per_step` of it.
    pub fn step(&mut self, he3_available: f64, power_allocated: f64) -> FuelOutcome {
        self.core.tick_age();
        if self.core.is_retired() {
            return FuelOutcome {
                flows: vec![],
                did_work: false,
            };
        }
        if power_allocated < self.config.power_kwh || he3_available <= 0.0 {
            self.core.mode = Mode::Idle;
            return FuelOutcome {
                flows: vec![],
                did_work: false,
            };
        }

        let he3_proc = he3_available.min(self.config.max_he3_kg_per_step);
        let kwh_avail = he3_proc * self.config.gwh_thermal_per_kg * 1e6 * self.config.efficiency;
        let prop_out = kwh_avail / self.config.kwh_per_kg_prop;

        self.core.mode = Mode::Active("CONVERTING".to_string());
        let sector = self.core.sector.clone();
        FuelOutcome {
            flows: vec![
                StockFlow::consume(sector.clone(), ResourceId::new("He3_kg"), he3_proc),
                StockFlow::produce(sector, ResourceId::new("rocket_fuel_kg"), prop_out),
            ],
            did_work: true,
        }
    }
}
