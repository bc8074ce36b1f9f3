//! World Orchestrator: builds the system from config, runs the per-step
//! pipeline, computes the goal-weighted combined sector priority vector
//! that feeds power allocation (spec.md §4.7).

use crate::config::CommitMode;
use crate::event_bus::EventBus;
use crate::evaluation::EvaluationEngine;
use crate::ledger::StockFlowLedger;
use crate::models::{Event, EvaluationResult, SectorId, Stock};
use crate::policy::{FleetMaintenancePolicy, PolicyEffects, PolicyEngine, WorldMutator};
use crate::rng::StepRng;
use crate::sectors::{ConstructionSector, EnergySector, EquipmentSector, ManufacturingSector, ScienceSector, TransportationSector};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-step log record (spec.md §6): `{ experiment_id, t, sectors,
/// evaluation, policy_effects, runner_state }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepSnapshot {
    pub experiment_id: String,
    pub t: u64,
    pub sectors: BTreeMap<SectorId, BTreeMap<String, f64>>,
    pub evaluation: EvaluationResult,
    pub policy_effects: Vec<(crate::models::PolicyId, PolicyEffects)>,
    pub runner_state: RunnerState,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunnerState {
    Running,
    Paused,
}

pub struct World {
    pub experiment_id: String,
    pub t: u64,
    pub stocks: BTreeMap<SectorId, Stock>,
    pub event_bus: EventBus,
    pub ledger: StockFlowLedger,
    pub rng: StepRng,
    pub commit_mode: CommitMode,
    pub max_backlog_age_steps: u64,

    pub energy: EnergySector,
    pub manufacturing: ManufacturingSector,
    pub construction: ConstructionSector,
    pub equipment: EquipmentSector,
    pub transportation: TransportationSector,
    pub science: ScienceSector,

    pub evaluation: EvaluationEngine,
    pub policy_engine: PolicyEngine,
    /// Driven directly by `step` rather than through `PolicyEngine::apply_all`
    /// (spec.md §7: resetting a faulted agent needs mutable access to agent
    /// structs the narrowed `WorldMutator` seam deliberately doesn't expose).
    pub maintenance: FleetMaintenancePolicy,

    pub runner_state: RunnerState,
    pending_throttles: BTreeMap<SectorId, f64>,
    pending_target_rates: BTreeMap<SectorId, f64>,
}

impl World {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        experiment_id: String,
        seed: u64,
        commit_mode: CommitMode,
        max_backlog_age_steps: u64,
        energy: EnergySector,
        manufacturing: ManufacturingSector,
        construction: ConstructionSector,
        equipment: EquipmentSector,
        transportation: TransportationSector,
        science: ScienceSector,
        evaluation: EvaluationEngine,
        policy_engine: PolicyEngine,
        maintenance: FleetMaintenancePolicy,
    ) -> Self {
        World {
            experiment_id,
            t: 0,
            stocks: BTreeMap::new(),
            event_bus: EventBus::new(),
            ledger: StockFlowLedger::new(),
            rng: StepRng::new(seed),
            commit_mode,
            max_backlog_age_steps,
            energy,
            manufacturing,
            construction,
            equipment,
            transportation,
            science,
            evaluation,
            policy_engine,
            maintenance,
            runner_state: RunnerState::Running,
            pending_throttles: BTreeMap::new(),
            pending_target_rates: BTreeMap::new(),
        }
    }

    fn stock_of(&self, sector: &SectorId) -> Stock {
        self.stocks.get(sector).cloned().unwrap_or_default()
    }

    /// The combined sector priority vector of spec.md §4.7 step 4:
    /// weight each goal by how urgently it's missed (`1 - score`) and
    /// attribute that urgency to sectors in proportion to their share of
    /// the goal's metric contributions.
    fn combined_sector_priority(&self, evaluation: &EvaluationResult) -> BTreeMap<SectorId, f64> {
        let mut priority: BTreeMap<SectorId, f64> = BTreeMap::new();
        for goal in &self.evaluation.goals {
            let Some(score) = evaluation.scores.get(&goal.id) else { continue };
            let urgency = goal.weight * (1.0 - score.score);
            if urgency <= 0.0 {
                continue;
            }
            let Some(metric) = self.evaluation.metrics.get(&goal.metric_id) else { continue };
            let total: f64 = metric.contributions.values().map(|v| v.abs()).sum();
            if total <= 0.0 {
                continue;
            }
            for (sector, contribution) in &metric.contributions {
                let share = contribution.abs() / total;
                *priority.entry(sector.clone()).or_insert(0.0) += urgency * share;
            }
        }
        priority
    }

    fn power_demands(&self) -> BTreeMap<SectorId, f64> {
        let mut demand = BTreeMap::new();
        let manufacturing_demand: f64 = self
            .manufacturing
            .agents
            .iter()
            .filter(|a| !a.core.is_retired())
            .map(|a| {
                a.config
                    .modes
                    .values()
                    .map(|m| m.power_kwh)
                    .fold(0.0, f64::max)
            })
            .sum();
        demand.insert(self.manufacturing.id.clone(), manufacturing_demand);

        let construction_demand: f64 = self
            .construction
            .printing_robots
            .iter()
            .filter(|r| !r.core.is_retired())
            .map(|r| r.config.power_kwh)
            .sum::<f64>()
            + self
                .construction
                .assembly_robots
                .iter()
                .filter(|r| !r.core.is_retired())
                .map(|r| r.config.power_kwh)
                .sum::<f64>();
        demand.insert(self.construction.id.clone(), construction_demand);

        let transportation_demand: f64 = self
            .transportation
            .fuel_generators
            .iter()
            .filter(|g| !g.core.is_retired())
            .map(|g| g.config.power_kwh)
            .sum();
        demand.insert(self.transportation.id.clone(), transportation_demand);

        let science_demand: f64 = self
            .science
            .rovers
            .iter()
            .filter(|r| !r.core.is_retired())
            .map(|r| r.config.operate_power_kwh)
            .sum();
        demand.insert(self.science.id.clone(), science_demand);

        demand
    }

    /// Runs the full step pipeline of spec.md §4.7 and advances `t`.
    pub fn step(&mut self) -> StepSnapshot {
        self.rng.reseed_for_step(self.t);

        // 1. Deliver events (swap next-step buffer into current-step).
        self.event_bus.advance();

        // 2. Evaluate against last step's aggregated metrics.
        let evaluation = self.evaluation.evaluate(self.t);

        // 3. Apply policies; effects are visible to sectors this step.
        self.pending_throttles.clear();
        self.pending_target_rates.clear();
        let mut mutator = WorldMutatorHandle {
            throttles: &mut self.pending_throttles,
            target_rates: &mut self.pending_target_rates,
            event_bus: &mut self.event_bus,
        };
        // Capability-probe notification (spec.md §9): policies that track
        // in-flight pipeline orders (science growth) observe the prior
        // step's delivered events before they run their own `apply`.
        let current_events: Vec<Event> = self.event_bus.all_current().cloned().collect();
        self.policy_engine.notify_events(&current_events);

        let policy_effects = self.policy_engine.apply_all(&mut mutator, &evaluation);
        for (sector, factor) in self.pending_throttles.clone() {
            self.apply_throttle(&sector, factor);
        }
        for (sector, rate) in self.pending_target_rates.clone() {
            self.apply_target_rate(&sector, rate);
        }

        // 4. Combined sector priority vector.
        let priority = self.combined_sector_priority(&evaluation);

        // 5. Power allocation.
        let demand = self.power_demands();
        let allocation = self.energy.allocate(&demand, &priority);

        // 6. Step each sector. Resource requests targeting manufacturing's
        // stock (He3, water, regolith, ...) are drained into its backlog
        // before it runs its own DRR/backlog pass this step.
        for event in self.event_bus.events(crate::models::Topic::ResourceRequest) {
            if let Event::ResourceRequest { resource_id, requester, qty } = event {
                if *requester != self.manufacturing.id {
                    self.manufacturing
                        .enqueue_resource_request(resource_id.clone(), requester.clone(), *qty, self.t);
                }
            }
        }

        // Construction requests (from policies or other sectors) become
        // one queued `ConstructionRequest` per unit requested (spec.md §3,
        // §4.4.3: a project is assembled from 1 shell + 1 equipment unit
        // at a time).
        for event in self.event_bus.events(crate::models::Topic::ConstructionRequest) {
            if let Event::ConstructionRequest { module_type, requester, qty } = event {
                for i in 0..*qty {
                    self.construction.enqueue_request(crate::models::ConstructionRequest::new(
                        crate::models::RequestId::new(format!("cr-{}-{}-{}-{}", self.t, requester, module_type, i)),
                        module_type.clone(),
                        requester.as_str().to_string(),
                        1,
                        1,
                        self.t,
                    ));
                }
            }
        }

        // Equipment the Equipment Sector allocated in a prior step becomes
        // stock in the requesting sector, under the same resource id
        // construction checks availability against.
        for event in self.event_bus.events(crate::models::Topic::EquipmentAllocated) {
            if let Event::EquipmentAllocated { equipment_id, sector, qty } = event {
                self.ledger.record(crate::models::StockFlow::produce(
                    sector.clone(),
                    crate::sectors::equipment_resource_for(equipment_id),
                    *qty as f64,
                ));
            }
        }

        let manufacturing_stock = self.stock_of(&self.manufacturing.id);
        let manufacturing_power = allocation.get(&self.manufacturing.id).copied().unwrap_or(0.0);
        let manufacturing_out = self.manufacturing.step(
            &manufacturing_stock,
            manufacturing_power,
            self.t,
            self.max_backlog_age_steps,
            &mut self.rng,
        );
        self.ledger.record_all(manufacturing_out.flows);
        for event in &manufacturing_out.events {
            self.event_bus.publish(event.clone());
        }

        // Fleet maintenance (spec.md §7): a sector with a faulted agent
        // ages toward its maintenance window every step it stays faulted;
        // once due, one faulted agent is reset back to IDLE.
        let faulted_sectors: Vec<SectorId> = if self.manufacturing.has_faulted_agent() {
            vec![self.manufacturing.id.clone()]
        } else {
            vec![]
        };
        for sector in self.maintenance.due_for_reset(&faulted_sectors) {
            if sector == self.manufacturing.id {
                self.manufacturing.reset_one_faulted_agent();
            }
        }

        let construction_stock = self.stock_of(&self.construction.id);
        let construction_power_per_robot = {
            let total_robots =
                (self.construction.printing_robots.len() + self.construction.assembly_robots.len()).max(1);
            allocation.get(&self.construction.id).copied().unwrap_or(0.0) / total_robots as f64
        };
        let construction_out = self.construction.step(
            &construction_stock,
            construction_power_per_robot,
            self.t,
            self.max_backlog_age_steps,
        );
        self.ledger.record_all(construction_out.flows);
        for event in &construction_out.events {
            self.event_bus.publish(event.clone());
        }

        let equipment_events: Vec<Event> = self
            .event_bus
            .events(crate::models::Topic::PayloadDelivered)
            .iter()
            .chain(self.event_bus.events(crate::models::Topic::EquipmentRequest).iter())
            .cloned()
            .collect();
        let equipment_out = self.equipment.step(&equipment_events);
        for event in &equipment_out.events {
            self.event_bus.publish(event.clone());
        }

        let transportation_stock = self.stock_of(&self.transportation.id);
        let fuel_generator_power = {
            let n = self.transportation.fuel_generators.len().max(1);
            allocation.get(&self.transportation.id).copied().unwrap_or(0.0) / n as f64
        };
        for event in self.event_bus.events(crate::models::Topic::TransportRequest) {
            if let Event::TransportRequest {
                payload,
                origin,
                destination,
                requester,
            } = event
            {
                self.transportation.enqueue_request(crate::models::TransportRequest {
                    id: crate::models::RequestId::new(format!("tr-{}-{}", self.t, requester)),
                    payload: payload.clone(),
                    origin: *origin,
                    destination: *destination,
                    requester: requester.clone(),
                    entered_at_step: self.t,
                });
            }
        }
        let transportation_out = self.transportation.step(
            &transportation_stock,
            fuel_generator_power,
            self.t,
            self.max_backlog_age_steps,
        );
        self.ledger.record_all(transportation_out.flows);
        for event in &transportation_out.events {
            self.event_bus.publish(event.clone());
        }

        let science_power = allocation.get(&self.science.id).copied().unwrap_or(0.0);
        let module_completed_events: Vec<Event> = self
            .event_bus
            .events(crate::models::Topic::ModuleCompleted)
            .to_vec();
        self.science.on_events(&module_completed_events);
        let science_out = self.science.step(science_power, &mut self.rng);
        self.ledger.record_all(science_out.flows);

        // 7. Commit stock flows atomically.
        let commit_report = self.ledger.commit(&mut self.stocks, self.commit_mode);
        let mut errors = Vec::new();
        if commit_report.aborted {
            let msg = format!("CommitOverdraft: step {} aborted ({} group(s))", self.t, commit_report.overdrafts.len());
            warn!("{msg}");
            errors.push(msg);
        } else if !commit_report.overdrafts.is_empty() {
            let msg = format!(
                "CommitOverdraft: step {} dropped {} group(s) (lenient mode)",
                self.t,
                commit_report.overdrafts.len()
            );
            warn!("{msg}");
            errors.push(msg);
        }

        // 8. Aggregate metrics and snapshot.
        self.evaluation
            .set_contribution(&crate::models::MetricId::new("science_rate"), self.science.id.clone(), self.science.step_science_generated);
        self.evaluation.set_contribution(
            &crate::models::MetricId::new("power_shortage_kw"),
            self.energy.id.clone(),
            self.energy.last_shortage_kw,
        );
        self.evaluation.set_contribution(
            &crate::models::MetricId::new("backlog_expired_count"),
            self.manufacturing.id.clone(),
            self.manufacturing.backlog_expired_count
                + self.construction.backlog_expired_count
                + self.transportation.backlog_expired_count,
        );

        let mut sectors = BTreeMap::new();
        sectors.insert(self.energy.id.clone(), metric_map(&[("shortage_kw", self.energy.last_shortage_kw)]));
        sectors.insert(
            self.science.id.clone(),
            metric_map(&[
                ("step_science_generated", self.science.step_science_generated),
                ("active_rovers", self.science.active_rover_count() as f64),
            ]),
        );

        let snapshot = StepSnapshot {
            experiment_id: self.experiment_id.clone(),
            t: self.t,
            sectors,
            evaluation,
            policy_effects,
            runner_state: self.runner_state,
            errors,
        };

        info!("world: step {} committed", self.t);
        self.t += 1;
        snapshot
    }

    /// Sets a sector's throttle factor directly, outside the normal
    /// policy pipeline (used by `command::apply_command`'s `SetParam`).
    pub fn set_sector_throttle(&mut self, sector: &SectorId, factor: f64) {
        self.apply_throttle(sector, factor);
    }

    fn apply_throttle(&mut self, sector: &SectorId, factor: f64) {
        if *sector == self.manufacturing.id {
            self.manufacturing.set_throttle_factor(factor);
        } else if *sector == self.science.id {
            self.science.set_throttle_factor(factor);
        }
    }

    fn apply_target_rate(&mut self, sector: &SectorId, rate: f64) {
        if *sector == self.science.id {
            self.science.set_target_rate(rate);
        }
    }
}

fn metric_map(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

struct WorldMutatorHandle<'a> {
    throttles: &'a mut BTreeMap<SectorId, f64>,
    target_rates: &'a mut BTreeMap<SectorId, f64>,
    event_bus: &'a mut EventBus,
}

impl<'a> WorldMutator for WorldMutatorHandle<'a> {
    fn set_sector_throttle(&mut self, sector: &SectorId, factor: f64) {
        self.throttles.insert(sector.clone(), factor);
    }

    fn set_sector_target_rate(&mut self, sector: &SectorId, rate: f64) {
        self.target_rates.insert(sector.clone(), rate);
    }

    fn publish(&mut self, event: Event) {
        self.event_bus.publish(event);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::CommitMode;
    use crate::models::{Direction, Goal, GoalKind, MetricId, PerformanceMetric, Polarity};
    use crate::sectors::{ConstructionSector, EnergySector, EquipmentSector, ManufacturingSector, ScienceSector, TransportationSector};

    /// A bare-bones `World` with no agents, used by other modules'
    /// tests that only need a runner to push commands/events through.
    pub(crate) fn minimal_world() -> World {
        let energy = EnergySector::new(SectorId::new("energy"), 100.0, 0.0);
        let manufacturing = ManufacturingSector::new(SectorId::new("manufacturing"), vec![], BTreeMap::new());
        let construction = ConstructionSector::new(SectorId::new("construction"), vec![], vec![], 0);
        let equipment = EquipmentSector::new(SectorId::new("equipment"), BTreeMap::new());
        let transportation = TransportationSector::new(SectorId::new("transportation"), vec![], vec![]);
        let rover_template = crate::agents::ScienceRoverConfig {
            battery_capacity_kwh: 10.0,
            min_battery_to_operate_kwh: 2.0,
            charge_rate_kwh: 1.0,
            operate_power_kwh: 1.0,
            science_generation_per_step: 1.0,
        };
        let science = ScienceSector::new(SectorId::new("science"), vec![], rover_template);

        let metric = PerformanceMetric::new(MetricId::new("science_rate"), "Science Rate", Polarity::Positive, "units");
        let goal = Goal {
            id: crate::models::GoalId::new("g-science"),
            metric_id: MetricId::new("science_rate"),
            direction: Direction::Maximize,
            kind: GoalKind::Target { target: 100.0 },
            weight: 1.0,
            horizon: 10,
        };
        let evaluation = EvaluationEngine::new(vec![metric], vec![goal]);

        World::new(
            "exp-test".to_string(),
            1,
            CommitMode::Strict,
            720,
            energy,
            manufacturing,
            construction,
            equipment,
            transportation,
            science,
            evaluation,
            PolicyEngine::new(),
            FleetMaintenancePolicy::new(24),
        )
    }
}
