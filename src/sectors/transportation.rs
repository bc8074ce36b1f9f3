//! Transportation Sector: rocket fleet, fuel pipeline, transport request
//! processing (spec.md §4.4.5).

use crate::agents::{FuelGenerator, Rocket, RocketOutcome};
use crate::models::{Event, Locale, ResourceId, SectorId, Stock, StockFlow, TransportRequest};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportationSector {
    pub id: SectorId,
    pub rockets: Vec<Rocket>,
    pub fuel_generators: Vec<FuelGenerator>,
    pub requests: VecDeque<TransportRequest>,
    pub he3_low_threshold: f64,
    he3_request_pending: bool,
    pub backlog_expired_count: f64,
}

pub struct TransportationStepOutput {
    pub flows: Vec<StockFlow>,
    pub events: Vec<Event>,
}

impl TransportationSector {
    pub fn new(id: SectorId, rockets: Vec<Rocket>, fuel_generators: Vec<FuelGenerator>) -> Self {
        TransportationSector {
            id,
            rockets,
            fuel_generators,
            requests: VecDeque::new(),
            he3_low_threshold: 0.0,
            he3_request_pending: false,
            backlog_expired_count: 0.0,
        }
    }

    pub fn enqueue_request(&mut self, request: TransportRequest) {
        self.requests.push_back(request);
    }

    pub fn step(
        &mut self,
        stock: &Stock,
        fuel_generator_power_kwh: f64,
        current_step: u64,
        max_backlog_age_steps: u64,
    ) -> TransportationStepOutput {
        let mut flows = Vec::new();
        let mut events = Vec::new();

        // Fuel pipeline: request He3 if low (idempotent while pending),
        // then convert available He3 into rocket fuel.
        let he3_stock = stock.get(&ResourceId::new("He3_kg"));
        if he3_stock < self.he3_low_threshold && !self.he3_request_pending {
            events.push(Event::ResourceRequest {
                resource_id: ResourceId::new("He3_kg"),
                requester: self.id.clone(),
                qty: self.he3_low_threshold - he3_stock,
            });
            self.he3_request_pending = true;
        } else if he3_stock >= self.he3_low_threshold {
            self.he3_request_pending = false;
        }

        let mut he3_remaining = he3_stock;
        for generator in &mut self.fuel_generators {
            let outcome = generator.step(he3_remaining, fuel_generator_power_kwh);
            for flow in &outcome.flows {
                if flow.resource_id == ResourceId::new("He3_kg") {
                    he3_remaining = (he3_remaining - flow.delta).max(0.0);
                }
            }
            flows.extend(outcome.flows);
        }

        // Transport requests, LIFO: find an idle rocket with enough fuel.
        let rocket_fuel = stock.get(&ResourceId::new("rocket_fuel_kg"));
        let mut fuel_budget = rocket_fuel;
        let mut still_queued = VecDeque::new();
        while let Some(request) = self.requests.pop_back() {
            if current_step.saturating_sub(request.entered_at_step) > max_backlog_age_steps {
                self.backlog_expired_count += 1.0;
                continue;
            }
            let idle_rocket = self.rockets.iter().position(|r| r.is_idle());
            let idle_rocket = match idle_rocket {
                Some(idx) => idx,
                None => {
                    still_queued.push_front(request);
                    continue;
                }
            };
            let mission =
                crate::models::RocketMission::one_way(request.payload.clone(), request.destination, request.requester.clone());
            let prop_total = self.rockets[idle_rocket].prop_total(&mission);
            if fuel_budget >= prop_total {
                fuel_budget -= prop_total;
                flows.push(StockFlow::consume(self.id.clone(), ResourceId::new("rocket_fuel_kg"), prop_total));
                self.rockets[idle_rocket].commit_round_trip(mission);
            } else {
                still_queued.push_front(request);
            }
        }
        self.requests = still_queued;

        // Step all rockets; publish payload_delivered on arrival, addressed
        // to the sector that requested the mission so it actually reaches
        // its intended recipient instead of this sector's own id.
        for rocket in &mut self.rockets {
            if let RocketOutcome::ArrivedAt { payload, locale, requester, .. } = rocket.step() {
                if !payload.is_empty() {
                    events.push(Event::PayloadDelivered {
                        payload,
                        destination: locale,
                        destination_sector: match locale {
                            Locale::Moon => Some(requester),
                            Locale::Earth => None,
                        },
                    });
                }
            }
        }

        TransportationStepOutput { flows, events }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::RocketConfig;
    use crate::models::{AgentCore, AgentId, RequestId};

    fn sector() -> TransportationSector {
        let rocket = Rocket::new(
            AgentCore::new(AgentId::new("rocket-1"), SectorId::new("transportation"), 100_000),
            RocketConfig {
                distance_km: 10.0,
                cruise_speed_kmh: 10.0,
                loading_steps: 1,
                prop_per_kg: 1.0,
            },
            Locale::Earth,
        );
        TransportationSector::new(SectorId::new("transportation"), vec![rocket], vec![])
    }

    #[test]
    fn launches_when_fuel_sufficient_defers_when_not() {
        let mut sector = sector();
        let mut payload = std::collections::BTreeMap::new();
        payload.insert(ResourceId::new("shells"), 5.0);
        sector.enqueue_request(TransportRequest {
            id: RequestId::new("tr-1"),
            payload,
            origin: Locale::Earth,
            destination: Locale::Moon,
            requester: SectorId::new("construction"),
            entered_at_step: 0,
        });

        let mut stock = Stock::default();
        stock.set(ResourceId::new("rocket_fuel_kg"), 4.0);
        let output = sector.step(&stock, 0.0, 0, 500);
        assert!(output.flows.is_empty());
        assert_eq!(sector.requests.len(), 1, "deferred: one less than required fuel");

        stock.set(ResourceId::new("rocket_fuel_kg"), 5.0);
        let output = sector.step(&stock, 0.0, 1, 500);
        assert_eq!(output.flows.len(), 1);
        assert!(sector.requests.is_empty());
        assert!(!sector.rockets[0].is_idle());
    }
}
