//! Dust-Coverage Throttle policy (`PLCY-DUST-THROTTLE`, spec.md §4.6, §8
//! scenario S1).

use super::{Policy, PolicyEffects, WorldMutator};
use crate::models::{EvaluationResult, MetricId, PolicyId, SectorId};

pub struct DustThrottlePolicy {
    id: PolicyId,
    enabled: bool,
    pub dust_metric_id: MetricId,
    pub dust_target: f64,
    pub start_ratio: f64,
    pub max_throttle: f64,
    pub sectors: Vec<SectorId>,
}

impl DustThrottlePolicy {
    pub fn new(dust_metric_id: MetricId, dust_target: f64, sectors: Vec<SectorId>) -> Self {
        DustThrottlePolicy {
            id: PolicyId::new("PLCY-DUST-THROTTLE"),
            enabled: true,
            dust_metric_id,
            dust_target,
            start_ratio: 0.7,
            max_throttle: 0.8,
            sectors,
        }
    }

    /// The throttle curve itself, independent of any `World`/`Policy`
    /// plumbing, so it's directly testable against spec.md §8's boundary
    /// behaviors and scenario S1.
    pub fn throttle_for(&self, dust: f64) -> f64 {
        let start = self.dust_target * self.start_ratio;
        if dust <= start {
            0.0
        } else if dust >= self.dust_target {
            self.max_throttle
        } else {
            self.max_throttle * (dust - start) / (self.dust_target - start)
        }
    }
}

impl Policy for DustThrottlePolicy {
    fn id(&self) -> &PolicyId {
        &self.id
    }

    fn name(&self) -> &str {
        "Dust-Coverage Throttle"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn apply(&mut self, world: &mut dyn WorldMutator, evaluation: &EvaluationResult) -> PolicyEffects {
        let dust = evaluation.metric(&self.dust_metric_id);
        let theta = self.throttle_for(dust);
        let mut effects = PolicyEffects::default();
        for sector in &self.sectors {
            world.set_sector_throttle(sector, theta);
            effects.throttles_set.push((sector.clone(), theta));
        }
        effects
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_s1_dust_throttle_engages_at_0_4() {
        let policy = DustThrottlePolicy::new(MetricId::new("dust"), 1.0, vec![]);
        let theta = policy.throttle_for(0.85);
        assert!((theta - 0.4).abs() < 1e-9);
    }

    #[test]
    fn boundary_at_target_is_max_throttle() {
        let policy = DustThrottlePolicy::new(MetricId::new("dust"), 1.0, vec![]);
        assert_eq!(policy.throttle_for(1.0), 0.8);
    }

    #[test]
    fn boundary_at_start_is_zero() {
        let policy = DustThrottlePolicy::new(MetricId::new("dust"), 1.0, vec![]);
        assert_eq!(policy.throttle_for(0.7), 0.0);
    }

    #[test]
    fn idempotent_on_stable_metric_and_resets_below_start() {
        let policy = DustThrottlePolicy::new(MetricId::new("dust"), 1.0, vec![]);
        assert_eq!(policy.throttle_for(0.85), policy.throttle_for(0.85));
        assert_eq!(policy.throttle_for(0.5), 0.0);
    }
}
