//! Construction Sector: make-to-stock shells, make-to-order modules
//! (spec.md §4.4.3).

use crate::agents::{AssemblyOutcome, AssemblyRobot, PrintOutcome, PrintingRobot};
use crate::models::{ConstructionRequest, ConstructionStatus, Event, ResourceId, SectorId, Stock, StockFlow};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructionSector {
    pub id: SectorId,
    pub printing_robots: Vec<PrintingRobot>,
    pub assembly_robots: Vec<AssemblyRobot>,
    pub shell_storage_capacity: u64,
    pub requests: VecDeque<ConstructionRequest>,
    pub backlog_expired_count: f64,
}

pub struct ConstructionStepOutput {
    pub flows: Vec<StockFlow>,
    pub events: Vec<Event>,
}

impl ConstructionSector {
    pub fn new(id: SectorId, printing_robots: Vec<PrintingRobot>, assembly_robots: Vec<AssemblyRobot>, shell_storage_capacity: u64) -> Self {
        ConstructionSector {
            id,
            printing_robots,
            assembly_robots,
            shell_storage_capacity,
            requests: VecDeque::new(),
            backlog_expired_count: 0.0,
        }
    }

    pub fn enqueue_request(&mut self, request: ConstructionRequest) {
        self.requests.push_back(request);
    }

    pub fn step(
        &mut self,
        stock: &Stock,
        power_allocated_per_robot: f64,
        current_step: u64,
        max_backlog_age_steps: u64,
    ) -> ConstructionStepOutput {
        let mut flows = Vec::new();
        let mut events = Vec::new();
        let shells_on_hand = stock.get(&ResourceId::new("shells"));

        // Make-to-stock: any idle printing robot starts printing while
        // shells are below the storage cap.
        let start_print = shells_on_hand < self.shell_storage_capacity as f64;
        for robot in &mut self.printing_robots {
            match robot.step(power_allocated_per_robot, start_print) {
                PrintOutcome::Completed(flow) => flows.push(flow),
                PrintOutcome::Idle | PrintOutcome::InProgress | PrintOutcome::StarvedOfPower => {}
            }
        }

        // Make-to-order: advance queued/in-progress requests.
        for request in self.requests.iter_mut() {
            match request.status {
                ConstructionStatus::Queued => {
                    if current_step.saturating_sub(request.entered_at_step) > max_backlog_age_steps {
                        request.status = ConstructionStatus::Failed;
                        self.backlog_expired_count += 1.0;
                        debug!("construction: request {} expired in backlog", request.id);
                        continue;
                    }
                    let have_shells = shells_on_hand >= request.shells_needed as f64;
                    // Specialized equipment availability is tracked as a
                    // stock keyed by the module type's equipment resource.
                    let equipment_resource = equipment_resource_for(&request.module_type);
                    let have_equipment = stock.get(&equipment_resource) >= request.equipment_needed as f64;
                    if have_shells && have_equipment {
                        request.status = ConstructionStatus::InProgress;
                        request.steps_remaining = Some(0);
                        flows.push(StockFlow::consume(
                            self.id.clone(),
                            ResourceId::new("shells"),
                            request.shells_needed as f64,
                        ));
                        flows.push(StockFlow::consume(
                            self.id.clone(),
                            equipment_resource,
                            request.equipment_needed as f64,
                        ));
                        if let Some(robot) = self.assembly_robots.iter_mut().find(|r| r.is_idle()) {
                            robot.assign(request.module_type.clone(), SectorId::new(request.requester.clone()));
                            request.assigned_robot_id = Some(robot.core.id.clone());
                        }
                    } else if !request.equipment_requested {
                        events.push(Event::EquipmentRequest {
                            equipment_id: request.module_type.clone(),
                            requester: self.id.clone(),
                            qty: request.equipment_needed,
                        });
                        request.equipment_requested = true;
                    }
                }
                ConstructionStatus::InProgress => {}
                ConstructionStatus::Completed | ConstructionStatus::Failed => {}
            }
        }

        for robot in &mut self.assembly_robots {
            if let AssemblyOutcome::Completed(module_type, requester) = robot.step(power_allocated_per_robot) {
                if let Some(request) = self
                    .requests
                    .iter_mut()
                    .find(|r| r.module_type == module_type && r.status == ConstructionStatus::InProgress)
                {
                    request.status = ConstructionStatus::Completed;
                    info!("construction: module {} completed for {}", module_type, requester);
                }
                events.push(Event::ModuleCompleted {
                    module_type,
                    requester,
                });
            }
        }

        self.requests.retain(|r| !matches!(r.status, ConstructionStatus::Completed | ConstructionStatus::Failed));

        ConstructionStepOutput { flows, events }
    }
}

/// The stock resource a construction request's specialized equipment is
/// tracked under, shared with `world.rs`'s `EquipmentAllocated` ->
/// `StockFlow` conversion so both sides agree on the resource id.
pub fn equipment_resource_for(module_type: &str) -> ResourceId {
    ResourceId::new(format!("{module_type}_equipment"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::PrintingRobotConfig;
    use crate::models::{AgentCore, AgentId};

    fn sector() -> ConstructionSector {
        let robot = PrintingRobot {
            core: AgentCore::new(AgentId::new("print-1"), SectorId::new("construction"), 100_000),
            config: PrintingRobotConfig {
                processing_time_steps: 2,
                power_kwh: 5.0,
                regolith_kg_per_step: 1.0,
            },
        };
        ConstructionSector::new(SectorId::new("construction"), vec![robot], vec![], 10)
    }

    #[test]
    fn printing_robot_produces_a_shell() {
        let mut sector = sector();
        let stock = Stock::default();
        sector.step(&stock, 5.0, 0, 500);
        let output = sector.step(&stock, 5.0, 1, 500);
        assert_eq!(output.flows.len(), 1);
        assert_eq!(output.flows[0].resource_id, ResourceId::new("shells"));
    }

    #[test]
    fn queued_request_waits_for_equipment_and_asks_once() {
        let mut sector = sector();
        sector.requests.push_back(ConstructionRequest::new(
            crate::models::RequestId::new("req-1"),
            "Science_Rover_EQ",
            "science",
            1,
            1,
            0,
        ));
        let stock = Stock::default();
        let output = sector.step(&stock, 5.0, 0, 500);
        assert_eq!(output.events.len(), 1);
        let output = sector.step(&stock, 5.0, 1, 500);
        assert!(output.events.is_empty());
        assert!(sector.requests[0].equipment_requested);
    }
}
