//! Equipment Manufacturing Sector: pure logistics hub (spec.md §4.4.4,
//! scenario S4).

use crate::models::{Event, Locale, SectorId};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EquipmentInventory {
    pub physical_stock: u64,
    pub pending_orders: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BacklogEntry {
    equipment_id: String,
    requester: SectorId,
    qty: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquipmentSector {
    pub id: SectorId,
    pub inventory: BTreeMap<String, EquipmentInventory>,
    pub minimum_levels: BTreeMap<String, u64>,
    backlog: VecDeque<BacklogEntry>,
}

pub struct EquipmentStepOutput {
    pub events: Vec<Event>,
}

impl EquipmentSector {
    pub fn new(id: SectorId, minimum_levels: BTreeMap<String, u64>) -> Self {
        EquipmentSector {
            id,
            inventory: BTreeMap::new(),
            minimum_levels,
            backlog: VecDeque::new(),
        }
    }

    /// Drains the bus events this sector subscribes to, fulfills the
    /// backlog from physical stock FIFO, then checks the resupply
    /// trigger per equipment type.
    pub fn step(&mut self, incoming: &[Event]) -> EquipmentStepOutput {
        let mut events = Vec::new();

        for event in incoming {
            match event {
                Event::PayloadDelivered { payload, .. } => {
                    for (resource_id, qty) in payload {
                        let entry = self.inventory.entry(resource_id.as_str().to_string()).or_default();
                        entry.physical_stock += *qty as u64;
                        entry.pending_orders = entry.pending_orders.saturating_sub(*qty as u64);
                    }
                }
                Event::EquipmentRequest {
                    equipment_id,
                    requester,
                    qty,
                } => {
                    self.backlog.push_back(BacklogEntry {
                        equipment_id: equipment_id.clone(),
                        requester: requester.clone(),
                        qty: *qty,
                    });
                }
                _ => {}
            }
        }

        let mut still_backlogged = VecDeque::new();
        while let Some(entry) = self.backlog.pop_front() {
            let inv = self.inventory.entry(entry.equipment_id.clone()).or_default();
            if inv.physical_stock >= entry.qty {
                inv.physical_stock -= entry.qty;
                events.push(Event::EquipmentAllocated {
                    equipment_id: entry.equipment_id,
                    sector: entry.requester,
                    qty: entry.qty,
                });
            } else {
                still_backlogged.push_back(entry);
            }
        }
        self.backlog = still_backlogged;

        for (equipment_id, minimum_level) in &self.minimum_levels {
            let inv = self.inventory.entry(equipment_id.clone()).or_default();
            let effective_stock = inv.physical_stock + inv.pending_orders;
            if effective_stock < *minimum_level {
                let qty = minimum_level - effective_stock;
                debug!("equipment: resupply trigger for {equipment_id}, qty={qty}");
                events.push(Event::TransportRequest {
                    payload: std::iter::once((crate::models::ResourceId::new(equipment_id.clone()), qty as f64))
                        .collect(),
                    origin: Locale::Earth,
                    destination: Locale::Moon,
                    requester: self.id.clone(),
                });
                inv.pending_orders += qty;
            }
        }

        EquipmentStepOutput { events }
    }
}
