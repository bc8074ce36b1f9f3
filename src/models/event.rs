//! The closed set of event-bus topics and their payloads (spec.md §4.1).

use super::ids::{ResourceId, SectorId};
use super::transport::Locale;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Topic {
    ConstructionRequest,
    EquipmentRequest,
    TransportRequest,
    ResourceRequest,
    PayloadDelivered,
    ModuleCompleted,
    EquipmentAllocated,
    ResourceAllocated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    ConstructionRequest {
        module_type: String,
        requester: SectorId,
        qty: u64,
    },
    EquipmentRequest {
        equipment_id: String,
        requester: SectorId,
        qty: u64,
    },
    TransportRequest {
        payload: BTreeMap<ResourceId, f64>,
        origin: Locale,
        destination: Locale,
        requester: SectorId,
    },
    ResourceRequest {
        resource_id: ResourceId,
        requester: SectorId,
        qty: f64,
    },
    PayloadDelivered {
        payload: BTreeMap<ResourceId, f64>,
        destination: Locale,
        destination_sector: Option<SectorId>,
    },
    ModuleCompleted {
        module_type: String,
        requester: SectorId,
    },
    EquipmentAllocated {
        equipment_id: String,
        sector: SectorId,
        qty: u64,
    },
    ResourceAllocated {
        resource_id: ResourceId,
        sector: SectorId,
        qty: f64,
    },
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::ConstructionRequest { .. } => Topic::ConstructionRequest,
            Event::EquipmentRequest { .. } => Topic::EquipmentRequest,
            Event::TransportRequest { .. } => Topic::TransportRequest,
            Event::ResourceRequest { .. } => Topic::ResourceRequest,
            Event::ModuleCompleted { .. } => Topic::ModuleCompleted,
            Event::PayloadDelivered { .. } => Topic::PayloadDelivered,
            Event::EquipmentAllocated { .. } => Topic::EquipmentAllocated,
            Event::ResourceAllocated { .. } => Topic::ResourceAllocated,
        }
    }
}
