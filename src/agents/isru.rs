//! ISRU agent: ICE_EXTRACTION, REGOLITH_EXTRACTION, HE3_EXTRACTION,
//! ELECTROLYSIS, METAL (spec.md §4.3).

use crate::models::{AgentCore, Mode, ResourceId, StockFlow};
use crate::rng::StepRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IsruMode {
    IceExtraction,
    RegolithExtraction,
    He3Extraction,
    Electrolysis,
    Metal,
}

impl IsruMode {
    pub fn label(self) -> &'static str {
        match self {
            IsruMode::IceExtraction => "ICE_EXTRACTION",
            IsruMode::RegolithExtraction => "REGOLITH_EXTRACTION",
            IsruMode::He3Extraction => "HE3_EXTRACTION",
            IsruMode::Electrolysis => "ELECTROLYSIS",
            IsruMode::Metal => "METAL",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsruModeConfig {
    pub power_kwh: f64,
    pub throughput_tons: f64,
    pub inputs: Vec<(ResourceId, f64)>,
    pub outputs: Vec<(ResourceId, f64)>,
    /// Only used by `HE3_EXTRACTION`'s stochastic yield.
    pub he3_ppb: Option<(f64, f64, f64)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsruConfig {
    pub modes: BTreeMap<IsruMode, IsruModeConfig>,
    pub efficiency: f64,
    /// Wear accrued per step of active production; once accumulated wear
    /// reaches 1.0 the agent faults (spec.md §7 `AgentFault`). `0.0`
    /// (the default for templates that don't set it) disables faulting.
    #[serde(default)]
    pub wear_per_active_step: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsruAgent {
    pub core: AgentCore,
    pub config: IsruConfig,
}

pub struct IsruOutcome {
    pub flows: Vec<StockFlow>,
    pub did_work: bool,
}

impl IsruAgent {
    /// Runs one step. `assigned_mode` is the DRR scheduler's winner for
    /// this agent, if any. Returns the StockFlows produced/consumed and
    /// whether the agent actually did work (`Y_s` in the DRR spend rule).
    pub fn step(
        &mut self,
        assigned_mode: Option<IsruMode>,
        power_allocated: f64,
        throttle_factor: f64,
        rng: &mut StepRng,
    ) -> IsruOutcome {
        self.core.tick_age();
        if self.core.is_retired() {
            return IsruOutcome {
                flows: vec![],
                did_work: false,
            };
        }
        if matches!(self.core.mode, Mode::Fault) {
            return IsruOutcome {
                flows: vec![],
                did_work: false,
            };
        }

        if rng.gen_bool(throttle_factor) {
            self.core.mode = Mode::Throttled;
            return IsruOutcome {
                flows: vec![],
                did_work: false,
            };
        }

        let mode = match assigned_mode {
            Some(m) => m,
            None => {
                self.core.mode = Mode::Idle;
                return IsruOutcome {
                    flows: vec![],
                    did_work: false,
                };
            }
        };
        let mode_config = match self.config.modes.get(&mode) {
            Some(c) => c.clone(),
            None => {
                self.core.mode = Mode::Idle;
                return IsruOutcome {
                    flows: vec![],
                    did_work: false,
                };
            }
        };

        if power_allocated < mode_config.power_kwh {
            self.core.mode = Mode::Idle;
            return IsruOutcome {
                flows: vec![],
                did_work: false,
            };
        }

        self.core.mode = Mode::Active(mode.label().to_string());
        let sector = self.core.sector.clone();

        let mut flows = Vec::new();
        for (resource, qty) in &mode_config.inputs {
            flows.push(StockFlow::consume(sector.clone(), resource.clone(), *qty));
        }

        if let Some((min_ppb, mode_ppb, max_ppb)) = mode_config.he3_ppb {
            let yield_ppb = rng.triangular(min_ppb, mode_ppb, max_ppb);
            let output_tons = mode_config.throughput_tons * 1000.0 * yield_ppb * 1e-9 * self.config.efficiency;
            flows.push(StockFlow::produce(
                sector,
                ResourceId::new("He3_kg"),
                output_tons,
            ));
        } else {
            for (resource, qty) in &mode_config.outputs {
                flows.push(StockFlow::produce(sector.clone(), resource.clone(), *qty));
            }
        }

        if self.config.wear_per_active_step > 0.0 {
            self.core.health.wear += self.config.wear_per_active_step;
            if self.core.health.wear >= 1.0 {
                self.core.health.wear = 0.0;
                self.core.mark_fault();
            }
        }

        IsruOutcome {
            flows,
            did_work: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SectorId;

    fn basic_agent() -> IsruAgent {
        let mut modes = BTreeMap::new();
        modes.insert(
            IsruMode::IceExtraction,
            IsruModeConfig {
                power_kwh: 10.0,
                throughput_tons: 1.0,
                inputs: vec![],
                outputs: vec![(ResourceId::new("H2O_kg"), 5.0)],
                he3_ppb: None,
            },
        );
        IsruAgent {
            core: AgentCore::new(crate::models::AgentId::new("isru-1"), SectorId::new("manufacturing"), 100_000),
            config: IsruConfig {
                modes,
                efficiency: 0.9,
                wear_per_active_step: 0.0,
            },
        }
    }

    #[test]
    fn insufficient_power_idles_the_agent() {
        let mut agent = basic_agent();
        let mut rng = StepRng::new(1);
        let outcome = agent.step(Some(IsruMode::IceExtraction), 1.0, 0.0, &mut rng);
        assert!(!outcome.did_work);
        assert_eq!(agent.core.mode, Mode::Idle);
    }

    #[test]
    fn sufficient_power_produces_output() {
        let mut agent = basic_agent();
        let mut rng = StepRng::new(1);
        let outcome = agent.step(Some(IsruMode::IceExtraction), 10.0, 0.0, &mut rng);
        assert!(outcome.did_work);
        assert_eq!(outcome.flows.len(), 1);
    }

    #[test]
    fn he3_yield_is_stochastic_but_bounded() {
        let mut modes = BTreeMap::new();
        modes.insert(
            IsruMode::He3Extraction,
            IsruModeConfig {
                power_kwh: 10.0,
                throughput_tons: 2.0,
                inputs: vec![],
                outputs: vec![],
                he3_ppb: Some((1.0, 5.0, 10.0)),
            },
        );
        let mut agent = IsruAgent {
            core: AgentCore::new(crate::models::AgentId::new("isru-2"), SectorId::new("manufacturing"), 100_000),
            config: IsruConfig {
                modes,
                efficiency: 1.0,
                wear_per_active_step: 0.0,
            },
        };
        let mut rng = StepRng::new(7);
        let outcome = agent.step(Some(IsruMode::He3Extraction), 10.0, 0.0, &mut rng);
        assert!(outcome.did_work);
        let he3_flow = &outcome.flows[0];
        assert_eq!(he3_flow.resource_id, ResourceId::new("He3_kg"));
        // output = 2 * 1000 * ppb(1..10) * 1e-9 * 1.0, bounded accordingly
        assert!(he3_flow.delta > 0.0 && he3_flow.delta < 2000.0 * 10.0 * 1e-9);
    }

    #[test]
    fn wear_accumulates_and_faults_the_agent() {
        let mut agent = basic_agent();
        agent.config.wear_per_active_step = 0.5;
        let mut rng = StepRng::new(1);
        agent.step(Some(IsruMode::IceExtraction), 10.0, 0.0, &mut rng);
        assert!(matches!(agent.core.mode, Mode::Active(_)));
        agent.step(Some(IsruMode::IceExtraction), 10.0, 0.0, &mut rng);
        assert!(matches!(agent.core.mode, Mode::Fault));
        assert_eq!(agent.core.health.fault_counter, 1);

        let outcome = agent.step(Some(IsruMode::IceExtraction), 10.0, 0.0, &mut rng);
        assert!(!outcome.did_work);
        assert!(matches!(agent.core.mode, Mode::Fault));
    }
}
