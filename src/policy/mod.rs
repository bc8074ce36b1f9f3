//! Policy Engine: a registry of policies conforming to a uniform
//! contract, iterated in insertion order each step (spec.md §4.6, §9).
//!
//! Policies never read stocks directly; they act through a narrowed
//! `WorldMutator` handle, matching the design note in spec.md §9 that
//! resolves the "shared mutable world passed to policies" smell.

pub mod dust_throttle;
pub mod maintenance;
pub mod science_growth;

pub use dust_throttle::DustThrottlePolicy;
pub use maintenance::FleetMaintenancePolicy;
pub use science_growth::ScienceGrowthPolicy;

use crate::models::{Event, EvaluationResult, PolicyId, SectorId};

/// A narrowed mutator handle: policies can throttle/retarget sectors and
/// publish events, but cannot read sector stocks directly (spec.md §9).
pub trait WorldMutator {
    fn set_sector_throttle(&mut self, sector: &SectorId, factor: f64);
    fn set_sector_target_rate(&mut self, sector: &SectorId, rate: f64);
    fn publish(&mut self, event: Event);
}

/// Effects a policy produced this step, recorded in the log snapshot's
/// `policy_effects`.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct PolicyEffects {
    pub throttles_set: Vec<(SectorId, f64)>,
    pub target_rates_set: Vec<(SectorId, f64)>,
    pub events_published: u64,
}

pub trait Policy {
    fn id(&self) -> &PolicyId;
    fn name(&self) -> &str;
    fn enabled(&self) -> bool;
    fn set_enabled(&mut self, enabled: bool);
    fn apply(&mut self, world: &mut dyn WorldMutator, evaluation: &EvaluationResult) -> PolicyEffects;

    /// Capability probe (spec.md §9): most policies only act on the
    /// evaluation result, but a few (science growth's pipeline tracking)
    /// need to observe raw events as they're delivered. Default no-op.
    fn on_event(&mut self, _event: &Event) {}
}

/// The uniform policy registry, iterated in insertion order per step
/// (spec.md §4.6).
#[derive(Default)]
pub struct PolicyEngine {
    policies: Vec<Box<dyn Policy>>,
}

impl PolicyEngine {
    pub fn new() -> Self {
        PolicyEngine::default()
    }

    pub fn register(&mut self, policy: Box<dyn Policy>) {
        self.policies.push(policy);
    }

    pub fn policy_mut(&mut self, id: &PolicyId) -> Option<&mut Box<dyn Policy>> {
        self.policies.iter_mut().find(|p| p.id() == id)
    }

    /// Forwards every event delivered this step to every registered
    /// policy's `on_event` probe, regardless of `enabled` (pipeline
    /// bookkeeping should stay accurate even while a policy is paused).
    pub fn notify_events(&mut self, events: &[Event]) {
        for policy in &mut self.policies {
            for event in events {
                policy.on_event(event);
            }
        }
    }

    pub fn apply_all(&mut self, world: &mut dyn WorldMutator, evaluation: &EvaluationResult) -> Vec<(PolicyId, PolicyEffects)> {
        let mut all_effects = Vec::new();
        for policy in &mut self.policies {
            if !policy.enabled() {
                continue;
            }
            let effects = policy.apply(world, evaluation);
            all_effects.push((policy.id().clone(), effects));
        }
        all_effects
    }
}
