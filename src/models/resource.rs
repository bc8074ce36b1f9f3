//! Resource stocks, buffer targets, and the stock-flow record (spec.md §3).

use super::ids::{ResourceId, SectorId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A sector's resource inventory. Never negative; all mutation goes
/// through the `StockFlowLedger` commit phase.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Stock(pub BTreeMap<ResourceId, f64>);

impl Stock {
    pub fn get(&self, resource: &ResourceId) -> f64 {
        self.0.get(resource).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, resource: ResourceId, qty: f64) {
        self.0.insert(resource, qty);
    }

    pub fn apply_delta(&mut self, resource: &ResourceId, delta: f64) {
        let entry = self.0.entry(resource.clone()).or_insert(0.0);
        *entry += delta;
    }
}

/// Min/max inventory thresholds driving deficiency-based prioritization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferTarget {
    pub min: f64,
    pub max: f64,
}

impl BufferTarget {
    pub fn deficiency(&self, current_stock: f64) -> f64 {
        (self.min - current_stock).max(0.0)
    }
}

/// A destination for a `StockFlow`: another sector, or outside the system
/// entirely (e.g. rocket fuel burned, or goods exported to Earth).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowEndpoint {
    Sector(SectorId),
    External,
}

/// An atomic resource-transfer record, collected during a step and
/// committed all together at the step's commit phase (spec.md §4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockFlow {
    pub source: FlowEndpoint,
    pub dest: FlowEndpoint,
    pub resource_id: ResourceId,
    /// Positive: added to `dest` and subtracted from `source`.
    pub delta: f64,
}

impl StockFlow {
    /// A resource produced locally by an agent: credits `sector`, debits nothing.
    pub fn produce(sector: SectorId, resource_id: ResourceId, qty: f64) -> Self {
        StockFlow {
            source: FlowEndpoint::External,
            dest: FlowEndpoint::Sector(sector),
            resource_id,
            delta: qty,
        }
    }

    /// A resource consumed locally by an agent: debits `sector`, credits nothing.
    pub fn consume(sector: SectorId, resource_id: ResourceId, qty: f64) -> Self {
        StockFlow {
            source: FlowEndpoint::Sector(sector),
            dest: FlowEndpoint::External,
            resource_id,
            delta: qty,
        }
    }

    /// A transfer between two sectors (e.g. a rocket moving cargo).
    pub fn transfer(from: SectorId, to: SectorId, resource_id: ResourceId, qty: f64) -> Self {
        StockFlow {
            source: FlowEndpoint::Sector(from),
            dest: FlowEndpoint::Sector(to),
            resource_id,
            delta: qty,
        }
    }
}
