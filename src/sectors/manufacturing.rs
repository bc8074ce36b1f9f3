//! Manufacturing Sector (ISRU): deficiency-driven task prioritization
//! plus the Priority-as-Token Deficit Round Robin scheduler (spec.md
//! §4.4.2, §8 invariant 5, scenario S2).

use crate::agents::{IsruAgent, IsruMode};
use crate::models::{AgentId, BufferTarget, Event, ResourceId, SectorId, Stock, StockFlow};
use crate::rng::StepRng;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Deficit Round Robin token bank over ISRU task modes (spec.md §4.4.2).
/// `tau` is not a fixed constant: with a single fixed spend per turn the
/// highest-priority task's bank grows strictly faster than the others'
/// (it nets `p_i - tau` on every win while the rest just accumulate),
/// so it wins every turn and the long-run share collapses to 1.0 instead
/// of `p_i / sum(p)`. Spending the full round's priority total instead
/// (`tau = sum(p_j)` over the tasks that topped up this round) is what
/// actually converges turn share to `p_i / sum(p)` (scenario S2).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DrrScheduler {
    banks: BTreeMap<IsruMode, f64>,
    rotation_pointer: usize,
    /// Quantum spent by the winner of the round just selected, computed
    /// fresh in `select` as the sum of this round's top-up priorities.
    last_quantum: f64,
}

impl DrrScheduler {
    pub fn new() -> Self {
        DrrScheduler {
            banks: BTreeMap::new(),
            rotation_pointer: 0,
            last_quantum: 0.0,
        }
    }

    /// Top-up then select a winner. `availability` gates both the top-up
    /// and the candidate set: `A_i(t)`. Returns the winning task, if any
    /// task is both available and holds a positive token balance.
    pub fn select(
        &mut self,
        priorities: &BTreeMap<IsruMode, f64>,
        availability: &BTreeMap<IsruMode, bool>,
    ) -> Option<IsruMode> {
        let mut topped: BTreeMap<IsruMode, f64> = BTreeMap::new();
        let mut quantum = 0.0;
        for (&task, &p) in priorities {
            let avail = availability.get(&task).copied().unwrap_or(false);
            let prior = self.banks.get(&task).copied().unwrap_or(0.0);
            let new_val = if avail && p > 0.0 { prior + p } else { 0.0 };
            if avail && p > 0.0 {
                quantum += p;
            }
            topped.insert(task, new_val);
        }
        self.banks = topped.clone();
        self.last_quantum = quantum;

        let candidates: Vec<IsruMode> = topped
            .iter()
            .filter(|(t, &v)| v > 0.0 && availability.get(t).copied().unwrap_or(false))
            .map(|(&t, _)| t)
            .collect();
        if candidates.is_empty() {
            return None;
        }

        let max_val = candidates
            .iter()
            .map(|t| topped[t])
            .fold(f64::MIN, f64::max);
        let mut tied: Vec<IsruMode> = candidates
            .into_iter()
            .filter(|t| (topped[t] - max_val).abs() < 1e-9)
            .collect();
        tied.sort();

        let winner = if tied.len() == 1 {
            tied[0]
        } else {
            let idx = self.rotation_pointer % tied.len();
            self.rotation_pointer = self.rotation_pointer.wrapping_add(1);
            tied[idx]
        };
        Some(winner)
    }

    /// `DC_s <- max(0, DC_s+ - tau * Y_s)`; called after the winner's
    /// agent actually ran (`did_work`). `tau` is this round's quantum,
    /// the sum of priorities that topped up (see struct docs above).
    pub fn spend(&mut self, task: IsruMode, did_work: bool) {
        if !did_work {
            return;
        }
        if let Some(bank) = self.banks.get_mut(&task) {
            *bank = (*bank - self.last_quantum).max(0.0);
        }
    }

    pub fn bank(&self, task: IsruMode) -> f64 {
        self.banks.get(&task).copied().unwrap_or(0.0)
    }
}

/// A backlogged resource request, LIFO-fulfilled (spec.md §4.4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRequest {
    pub resource_id: ResourceId,
    pub requester: SectorId,
    pub qty: f64,
    pub entered_at_step: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManufacturingSector {
    pub id: SectorId,
    pub agents: Vec<IsruAgent>,
    pub buffer_targets: BTreeMap<ResourceId, BufferTarget>,
    pub scheduler: DrrScheduler,
    /// LIFO backlog of incoming resource requests from other sectors.
    pub backlog: VecDeque<ResourceRequest>,
    /// Idempotence guard for the proactive He3/fuel request (spec.md
    /// §4.4.2): one request per step per resource while still pending.
    pending_proactive_request: BTreeMap<ResourceId, bool>,
    pub throttle_factor: f64,
    pub he3_low_threshold: f64,
    pub fuel_low_threshold: f64,
    pub backlog_expired_count: f64,
}

pub struct ManufacturingStepOutput {
    pub flows: Vec<StockFlow>,
    pub events: Vec<Event>,
}

impl ManufacturingSector {
    pub fn new(id: SectorId, agents: Vec<IsruAgent>, buffer_targets: BTreeMap<ResourceId, BufferTarget>) -> Self {
        ManufacturingSector {
            id,
            agents,
            buffer_targets,
            scheduler: DrrScheduler::new(),
            backlog: VecDeque::new(),
            pending_proactive_request: BTreeMap::new(),
            throttle_factor: 0.0,
            he3_low_threshold: 0.0,
            fuel_low_threshold: 0.0,
            backlog_expired_count: 0.0,
        }
    }

    pub fn set_throttle_factor(&mut self, f: f64) {
        self.throttle_factor = f.clamp(0.0, 1.0);
    }

    fn task_priority(&self, mode: IsruMode, stock: &Stock) -> f64 {
        let output_resource = match mode {
            IsruMode::IceExtraction => ResourceId::new("H2O_kg"),
            IsruMode::RegolithExtraction => ResourceId::new("regolith_kg"),
            IsruMode::He3Extraction => ResourceId::new("He3_kg"),
            IsruMode::Electrolysis => ResourceId::new("H2_kg"),
            IsruMode::Metal => ResourceId::new("metal_kg"),
        };
        self.buffer_targets
            .get(&output_resource)
            .map(|bt| bt.deficiency(stock.get(&output_resource)))
            .unwrap_or(0.0)
    }

    fn availability(&self, mode: IsruMode, stock: &Stock, power_budget: f64) -> bool {
        let has_idle_agent = self
            .agents
            .iter()
            .any(|a| !a.core.is_retired() && matches!(a.core.mode, crate::models::Mode::Idle));
        let has_inputs = self
            .agents
            .iter()
            .find_map(|a| a.config.modes.get(&mode))
            .map(|cfg| cfg.inputs.iter().all(|(r, q)| stock.get(r) >= *q))
            .unwrap_or(false);
        has_idle_agent && has_inputs && power_budget > 0.0
    }

    /// Runs one step: DRR select, assign an idle agent, run it, fulfill
    /// the resource backlog LIFO, and issue the proactive He3 request.
    pub fn step(
        &mut self,
        stock: &Stock,
        power_allocated: f64,
        current_step: u64,
        max_backlog_age_steps: u64,
        rng: &mut StepRng,
    ) -> ManufacturingStepOutput {
        let mut flows = Vec::new();
        let mut events = Vec::new();

        let modes: Vec<IsruMode> = self
            .agents
            .iter()
            .flat_map(|a| a.config.modes.keys().copied())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        let priorities: BTreeMap<IsruMode, f64> =
            modes.iter().map(|&m| (m, self.task_priority(m, stock))).collect();
        let availability: BTreeMap<IsruMode, bool> = modes
            .iter()
            .map(|&m| (m, self.availability(m, stock, power_allocated)))
            .collect();

        let winner = self.scheduler.select(&priorities, &availability);

        let mut did_work = false;
        if let Some(mode) = winner {
            if let Some(agent) = self
                .agents
                .iter_mut()
                .find(|a| !a.core.is_retired() && matches!(a.core.mode, crate::models::Mode::Idle))
            {
                let outcome = agent.step(Some(mode), power_allocated, self.throttle_factor, rng);
                did_work = outcome.did_work;
                flows.extend(outcome.flows);
            }
        }
        if let Some(mode) = winner {
            self.scheduler.spend(mode, did_work);
        }

        // LIFO backlog fulfillment, re-reading stock as flows accumulate
        // would require re-querying the ledger; we approximate against
        // the step-start snapshot, which is consistent since all flows
        // commit atomically at end of step regardless of this order.
        let mut still_backlogged = VecDeque::new();
        while let Some(req) = self.backlog.pop_back() {
            if current_step.saturating_sub(req.entered_at_step) > max_backlog_age_steps {
                self.backlog_expired_count += 1.0;
                debug!("manufacturing: backlog request {} expired", req.resource_id);
                continue;
            }
            if stock.get(&req.resource_id) >= req.qty {
                flows.push(StockFlow::transfer(
                    self.id.clone(),
                    req.requester.clone(),
                    req.resource_id.clone(),
                    req.qty,
                ));
                events.push(Event::ResourceAllocated {
                    resource_id: req.resource_id.clone(),
                    sector: req.requester.clone(),
                    qty: req.qty,
                });
            } else {
                still_backlogged.push_front(req);
            }
        }
        self.backlog = still_backlogged;

        for (resource, threshold) in [
            (ResourceId::new("He3_kg"), self.he3_low_threshold),
            (ResourceId::new("rocket_fuel_kg"), self.fuel_low_threshold),
        ] {
            let already_pending = self.pending_proactive_request.get(&resource).copied().unwrap_or(false);
            if stock.get(&resource) < threshold && !already_pending {
                events.push(Event::ResourceRequest {
                    resource_id: resource.clone(),
                    requester: self.id.clone(),
                    qty: threshold - stock.get(&resource),
                });
                self.pending_proactive_request.insert(resource, true);
            } else if stock.get(&resource) >= threshold {
                self.pending_proactive_request.insert(resource, false);
            }
        }

        ManufacturingStepOutput { flows, events }
    }

    pub fn enqueue_resource_request(&mut self, resource_id: ResourceId, requester: SectorId, qty: f64, at_step: u64) {
        self.backlog.push_back(ResourceRequest {
            resource_id,
            requester,
            qty,
            entered_at_step: at_step,
        });
    }

    pub fn idle_agent_id(&self) -> Option<AgentId> {
        self.agents
            .iter()
            .find(|a| !a.core.is_retired() && matches!(a.core.mode, crate::models::Mode::Idle))
            .map(|a| a.core.id.clone())
    }

    pub fn has_faulted_agent(&self) -> bool {
        self.agents.iter().any(|a| matches!(a.core.mode, crate::models::Mode::Fault))
    }

    /// Resets the oldest-faulted agent back to `IDLE` (fleet maintenance;
    /// spec.md §7).
    pub fn reset_one_faulted_agent(&mut self) {
        if let Some(agent) = self.agents.iter_mut().find(|a| matches!(a.core.mode, crate::models::Mode::Fault)) {
            agent.core.reset_from_fault();
        }
    }
}
