//! Fleet Maintenance policy (`PLCY-FLEET-MAINTENANCE`): resets one
//! faulted agent per sector back to `IDLE` after a configurable number
//! of steps (spec.md §7: "AgentFault ... unavailable until maintenance
//! policy resets it"; no built-in policy was named for this in §4.6, so
//! this fills that gap, shaped after an explicit-policy lifecycle
//! pattern that drives permanent agent-availability transitions through
//! a visible state change rather than a silent one).

use super::{Policy, PolicyEffects, WorldMutator};
use crate::models::{EvaluationResult, PolicyId, SectorId};
use std::collections::BTreeMap;

pub struct FleetMaintenancePolicy {
    id: PolicyId,
    enabled: bool,
    pub maintenance_window_steps: u64,
    /// Per-sector count of steps a fault has been outstanding, keyed by
    /// sector id; reset when the sector reports zero faulted agents.
    fault_age: BTreeMap<SectorId, u64>,
}

impl FleetMaintenancePolicy {
    pub fn new(maintenance_window_steps: u64) -> Self {
        FleetMaintenancePolicy {
            id: PolicyId::new("PLCY-FLEET-MAINTENANCE"),
            enabled: true,
            maintenance_window_steps,
            fault_age: BTreeMap::new(),
        }
    }

    /// Called by the World after it tallies faulted agents per sector;
    /// returns the sectors whose oldest fault has crossed the
    /// maintenance window and should have one agent reset this step.
    pub fn due_for_reset(&mut self, faulted_sectors: &[SectorId]) -> Vec<SectorId> {
        let mut due = Vec::new();
        let faulted: std::collections::BTreeSet<_> = faulted_sectors.iter().cloned().collect();
        for sector in faulted_sectors {
            let age = self.fault_age.entry(sector.clone()).or_insert(0);
            *age += 1;
            if *age >= self.maintenance_window_steps {
                due.push(sector.clone());
                *age = 0;
            }
        }
        self.fault_age.retain(|sector, _| faulted.contains(sector));
        due
    }
}

impl Policy for FleetMaintenancePolicy {
    fn id(&self) -> &PolicyId {
        &self.id
    }

    fn name(&self) -> &str {
        "Fleet Maintenance"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn apply(&mut self, _world: &mut dyn WorldMutator, _evaluation: &EvaluationResult) -> PolicyEffects {
        // The actual agent reset happens in `World::step` (it needs
        // mutable access to agent structs the `WorldMutator` seam
        // deliberately doesn't expose); this policy only tracks fault
        // age and exposes `due_for_reset` for the World to call.
        PolicyEffects::default()
    }
}
