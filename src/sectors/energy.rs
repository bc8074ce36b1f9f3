//! Energy Sector: power allocation (spec.md §4.4.1).

use crate::models::SectorId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergySector {
    pub id: SectorId,
    /// Total generation this step, `G(t)`. A constant base load plus an
    /// environmental input in a fuller build; kept as a single scalar here
    /// since the kernel's `World` owns the environment document.
    pub generation_kwh: f64,
    pub battery_capacity_kwh: f64,
    pub battery_soc_kwh: f64,
    pub battery_charge_rate_kwh: f64,
    pub battery_discharge_rate_kwh: f64,
    /// `PWR-SHORTAGE-KW` metric contribution from the last allocation.
    pub last_shortage_kw: f64,
}

impl EnergySector {
    pub fn new(id: SectorId, generation_kwh: f64, battery_capacity_kwh: f64) -> Self {
        EnergySector {
            id,
            generation_kwh,
            battery_capacity_kwh,
            battery_soc_kwh: battery_capacity_kwh * 0.5,
            battery_charge_rate_kwh: battery_capacity_kwh * 0.1,
            battery_discharge_rate_kwh: battery_capacity_kwh * 0.1,
            last_shortage_kw: 0.0,
        }
    }

    fn battery_discharge_available(&self) -> f64 {
        self.battery_soc_kwh.min(self.battery_discharge_rate_kwh)
    }

    /// Weighted-proportional allocation against `demand`, using `priority`
    /// as the combined sector priority vector from the World Orchestrator
    /// (spec.md §4.7 step 4). Unallocated generation charges the battery;
    /// unmet demand is recorded as `last_shortage_kw`.
    pub fn allocate(
        &mut self,
        demand: &BTreeMap<SectorId, f64>,
        priority: &BTreeMap<SectorId, f64>,
    ) -> BTreeMap<SectorId, f64> {
        let total_demand: f64 = demand.values().sum();
        let available = self.generation_kwh + self.battery_discharge_available();

        let allocation = if total_demand <= available {
            demand.clone()
        } else {
            water_fill(demand, priority, available)
        };

        let allocated_total: f64 = allocation.values().sum();
        if allocated_total <= self.generation_kwh {
            let leftover = self.generation_kwh - allocated_total;
            self.battery_soc_kwh =
                (self.battery_soc_kwh + leftover.min(self.battery_charge_rate_kwh)).min(self.battery_capacity_kwh);
        } else {
            let drawn_from_battery = allocated_total - self.generation_kwh;
            self.battery_soc_kwh = (self.battery_soc_kwh - drawn_from_battery).max(0.0);
        }

        self.last_shortage_kw = (total_demand - available).max(0.0);
        allocation
    }
}

/// Water-filling allocation: weight by `priority` (falling back to
/// `demand` itself when all priorities are zero), cap each share at the
/// requester's own demand, then redistribute any capacity freed by
/// capping across the remaining uncapped requesters. Deterministic:
/// iteration is always over a `BTreeMap`.
fn water_fill(
    demand: &BTreeMap<SectorId, f64>,
    priority: &BTreeMap<SectorId, f64>,
    available: f64,
) -> BTreeMap<SectorId, f64> {
    let weight_of = |id: &SectorId| -> f64 {
        let p = priority.get(id).copied().unwrap_or(0.0);
        if p > 0.0 {
            p
        } else {
            demand.get(id).copied().unwrap_or(0.0)
        }
    };

    let mut remaining: BTreeMap<SectorId, f64> = demand.clone();
    let mut allocation: BTreeMap<SectorId, f64> = demand.keys().map(|k| (k.clone(), 0.0)).collect();
    let mut pool = available;

    loop {
        let weight_sum: f64 = remaining.keys().map(weight_of).sum();
        if weight_sum <= 0.0 || pool <= 1e-12 || remaining.is_empty() {
            break;
        }
        let mut any_capped = false;
        let mut next_remaining = BTreeMap::new();
        let mut spent = 0.0;
        for (id, want) in &remaining {
            let share = pool * weight_of(id) / weight_sum;
            if share >= *want {
                *allocation.get_mut(id).unwrap() += want;
                spent += want;
                any_capped = true;
            } else {
                *allocation.get_mut(id).unwrap() += share;
                spent += share;
                next_remaining.insert(id.clone(), want - share);
            }
        }
        pool -= spent;
        remaining = next_remaining;
        if !any_capped {
            break;
        }
    }
    allocation
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_demand_met_when_generation_suffices() {
        let mut energy = EnergySector::new(SectorId::new("energy"), 100.0, 50.0);
        let mut demand = BTreeMap::new();
        demand.insert(SectorId::new("manufacturing"), 40.0);
        let allocation = energy.allocate(&demand, &BTreeMap::new());
        assert_eq!(allocation[&SectorId::new("manufacturing")], 40.0);
        assert_eq!(energy.last_shortage_kw, 0.0);
    }

    #[test]
    fn scarce_generation_splits_by_priority() {
        let mut energy = EnergySector::new(SectorId::new("energy"), 30.0, 0.0);
        let mut demand = BTreeMap::new();
        demand.insert(SectorId::new("a"), 20.0);
        demand.insert(SectorId::new("b"), 20.0);
        let mut priority = BTreeMap::new();
        priority.insert(SectorId::new("a"), 3.0);
        priority.insert(SectorId::new("b"), 1.0);
        let allocation = energy.allocate(&demand, &priority);
        // a's proportional share (22.5) exceeds its own demand (20), so it
        // is capped at 20 and the freed capacity flows to b.
        assert!((allocation[&SectorId::new("a")] - 20.0).abs() < 1e-6);
        assert!((allocation[&SectorId::new("b")] - 10.0).abs() < 1e-6);
        assert!(energy.last_shortage_kw > 0.0);
    }
}
