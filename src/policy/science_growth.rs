//! Science Growth (Doubling) policy (spec.md §4.6, §8 scenario S3).
//!
//! Tracks in-flight rover orders as `(month_of_arrival, qty)` pipeline
//! entries so the policy never double-orders while a request is still
//! in flight (spec.md §3 "Pipeline order").

use super::{Policy, PolicyEffects, WorldMutator};
use crate::clock::STEPS_PER_MONTH;
use crate::models::{Event, EvaluationResult, MetricId, PolicyId, SectorId};

#[derive(Debug, Clone)]
pub struct PipelineOrder {
    pub arrival_step: u64,
    pub qty: u64,
}

pub struct ScienceGrowthPolicy {
    id: PolicyId,
    enabled: bool,
    pub active_rovers_metric_id: MetricId,
    pub base_rate: f64,
    pub doubling_period_months: f64,
    pub lead_time_steps: u64,
    pub safety_margin: f64,
    pub productivity_per_rover: f64,
    pub expected_losses: f64,
    pub requester: SectorId,
    pub pipeline: Vec<PipelineOrder>,
}

impl ScienceGrowthPolicy {
    pub fn new(active_rovers_metric_id: MetricId, requester: SectorId) -> Self {
        ScienceGrowthPolicy {
            id: PolicyId::new("PLCY-SCIENCE-GROWTH"),
            enabled: true,
            active_rovers_metric_id,
            base_rate: 100.0,
            doubling_period_months: 6.0,
            lead_time_steps: STEPS_PER_MONTH,
            safety_margin: 0.1,
            productivity_per_rover: 10.0,
            expected_losses: 0.0,
            requester,
            pipeline: Vec::new(),
        }
    }

    /// Removes a pipeline entry when its arrival is observed, via a
    /// `module_completed` or `payload_delivered` event (spec.md §4.6).
    pub fn observe_arrival(&mut self, arrived_qty: u64) {
        let mut remaining = arrived_qty;
        self.pipeline.retain_mut(|order| {
            if remaining == 0 {
                return true;
            }
            if order.qty as u64 <= remaining {
                remaining -= order.qty;
                false
            } else {
                order.qty -= remaining;
                remaining = 0;
                true
            }
        });
    }

    fn forecast(&self, t: u64, active_rovers: f64) -> (f64, u64, f64, u64) {
        let lead_steps = t + self.lead_time_steps;
        let lead_months = lead_steps as f64 / STEPS_PER_MONTH as f64;
        let s_target = self.base_rate * 2f64.powf(lead_months / self.doubling_period_months);
        let r_req = s_target / self.productivity_per_rover;
        let r_req_ceil = r_req.ceil() as u64;

        let in_flight: u64 = self
            .pipeline
            .iter()
            .filter(|o| o.arrival_step <= lead_steps)
            .map(|o| o.qty)
            .sum();
        let r_fore = active_rovers - self.expected_losses + in_flight as f64;

        let required = ((1.0 + self.safety_margin) * r_req_ceil as f64).ceil();
        let q = (required - r_fore).max(0.0).ceil() as u64;
        (s_target, r_req_ceil, r_fore, q)
    }
}

impl Policy for ScienceGrowthPolicy {
    fn id(&self) -> &PolicyId {
        &self.id
    }

    fn name(&self) -> &str {
        "Science Growth (Doubling)"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Removes arrived rovers from the pipeline as they land (spec.md
    /// §4.6: "removed when their arrival is observed via `module_completed`
    /// or `payload_delivered`"). Each completed assembly or delivered
    /// payload unit counts as one rover.
    fn on_event(&mut self, event: &Event) {
        match event {
            Event::ModuleCompleted { module_type, requester } if module_type == "Science_Rover_EQ" && *requester == self.requester => {
                self.observe_arrival(1);
            }
            Event::PayloadDelivered {
                payload,
                destination_sector: Some(sector),
                ..
            } if *sector == self.requester => {
                if let Some(qty) = payload.get(&crate::models::ResourceId::new("Science_Rover_EQ")) {
                    self.observe_arrival(*qty as u64);
                }
            }
            _ => {}
        }
    }

    fn apply(&mut self, world: &mut dyn WorldMutator, evaluation: &EvaluationResult) -> PolicyEffects {
        let active_rovers = evaluation.metric(&self.active_rovers_metric_id);
        let t = evaluation.t;
        let (_, _, _, q) = self.forecast(t, active_rovers);
        let mut effects = PolicyEffects::default();
        if q > 0 {
            world.publish(Event::ConstructionRequest {
                module_type: "Science_Rover_EQ".to_string(),
                requester: self.requester.clone(),
                qty: q,
            });
            effects.events_published += 1;
            self.pipeline.push(PipelineOrder {
                arrival_step: t + self.lead_time_steps,
                qty: q,
            });
        }
        effects
    }
}
