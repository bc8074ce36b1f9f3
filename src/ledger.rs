//! Stock Flow Ledger: atomic end-of-step application of resource deltas
//! (spec.md §3, §4.2, §8 invariant 1-2, scenario S5).
//!
//! Collects `StockFlow` records emitted by agents and sectors during a
//! step and commits them all together, so a producer and a consumer of
//! the same resource in the same step never race each other. Shaped
//! after a single-owner pending-balance ledger (one owner tracking
//! credits/reservations), generalized from one resource (credits) to
//! every `(sector, resource)` pair.

use crate::config::CommitMode;
use crate::models::{FlowEndpoint, ResourceId, SectorId, Stock, StockFlow};
use log::{info, warn};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct CommitOverdraft {
    pub sector: SectorId,
    pub resource: ResourceId,
    pub would_be: f64,
}

#[derive(Debug, Default)]
pub struct CommitReport {
    /// Overdrafts observed. In strict mode this is non-empty only when the
    /// whole commit was aborted; in lenient mode these groups were dropped
    /// but the rest of the batch applied.
    pub overdrafts: Vec<CommitOverdraft>,
    pub aborted: bool,
}

#[derive(Default)]
pub struct StockFlowLedger {
    pending: Vec<StockFlow>,
}

impl StockFlowLedger {
    pub fn new() -> Self {
        StockFlowLedger::default()
    }

    pub fn record(&mut self, flow: StockFlow) {
        self.pending.push(flow);
    }

    pub fn record_all(&mut self, flows: impl IntoIterator<Item = StockFlow>) {
        self.pending.extend(flows);
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Commits all pending flows against `stocks`, then clears the
    /// pending batch regardless of outcome (a step's flows are never
    /// carried over).
    pub fn commit(
        &mut self,
        stocks: &mut BTreeMap<SectorId, Stock>,
        mode: CommitMode,
    ) -> CommitReport {
        let flows = std::mem::take(&mut self.pending);

        // Group by (sector, resource_id); sum the net delta per group.
        let mut net: BTreeMap<(SectorId, ResourceId), f64> = BTreeMap::new();
        for flow in &flows {
            if let FlowEndpoint::Sector(s) = &flow.source {
                *net.entry((s.clone(), flow.resource_id.clone())).or_insert(0.0) -= flow.delta;
            }
            if let FlowEndpoint::Sector(s) = &flow.dest {
                *net.entry((s.clone(), flow.resource_id.clone())).or_insert(0.0) += flow.delta;
            }
        }

        let mut overdrafts = Vec::new();
        for ((sector, resource), delta) in &net {
            let current = stocks
                .get(sector)
                .map(|s| s.get(resource))
                .unwrap_or(0.0);
            let would_be = current + delta;
            if would_be < 0.0 {
                overdrafts.push(CommitOverdraft {
                    sector: sector.clone(),
                    resource: resource.clone(),
                    would_be,
                });
            }
        }

        if !overdrafts.is_empty() && mode == CommitMode::Strict {
            warn!(
                "commit aborted (strict mode): {} overdraft group(s)",
                overdrafts.len()
            );
            return CommitReport {
                overdrafts,
                aborted: true,
            };
        }

        let overdraft_keys: std::collections::BTreeSet<(SectorId, ResourceId)> = overdrafts
            .iter()
            .map(|o| (o.sector.clone(), o.resource.clone()))
            .collect();

        for ((sector, resource), delta) in net {
            if overdraft_keys.contains(&(sector.clone(), resource.clone())) {
                warn!(
                    "commit dropped group (lenient mode): sector={} resource={}",
                    sector, resource
                );
                continue;
            }
            let entry = stocks.entry(sector).or_default();
            entry.apply_delta(&resource, delta);
        }

        if !overdrafts.is_empty() {
            info!("commit applied with {} dropped group(s)", overdrafts.len());
        }

        CommitReport {
            overdrafts,
            aborted: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResourceId as Res;

    fn sector_stocks(he3: f64) -> BTreeMap<SectorId, Stock> {
        let mut stocks = BTreeMap::new();
        let mut s = Stock::default();
        s.set(Res::new("He3_kg"), he3);
        stocks.insert(SectorId::new("a"), s);
        stocks
    }

    #[test]
    fn strict_mode_aborts_whole_batch_on_overdraft() {
        let mut ledger = StockFlowLedger::new();
        let sector = SectorId::new("a");
        ledger.record(StockFlow::produce(sector.clone(), Res::new("He3_kg"), 5.0));
        ledger.record(StockFlow::consume(sector.clone(), Res::new("He3_kg"), 6.0));
        let mut stocks = sector_stocks(2.0);
        let report = ledger.commit(&mut stocks, CommitMode::Strict);
        assert!(report.aborted);
        assert_eq!(stocks[&sector].get(&Res::new("He3_kg")), 2.0);
    }

    #[test]
    fn lenient_mode_drops_only_the_offending_group() {
        let mut ledger = StockFlowLedger::new();
        let sector_a = SectorId::new("a");
        let sector_b = SectorId::new("b");
        ledger.record(StockFlow::produce(sector_a.clone(), Res::new("He3_kg"), 5.0));
        ledger.record(StockFlow::consume(sector_b.clone(), Res::new("He3_kg"), 6.0));
        let mut stocks = sector_stocks(2.0);
        stocks.insert(sector_b.clone(), {
            let mut s = Stock::default();
            s.set(Res::new("He3_kg"), 2.0);
            s
        });
        let report = ledger.commit(&mut stocks, CommitMode::Lenient);
        assert!(!report.aborted);
        assert_eq!(report.overdrafts.len(), 1);
        assert_eq!(stocks[&sector_a].get(&Res::new("He3_kg")), 7.0);
        assert_eq!(stocks[&sector_b].get(&Res::new("He3_kg")), 2.0);
    }

    #[test]
    fn pending_cleared_after_commit() {
        let mut ledger = StockFlowLedger::new();
        ledger.record(StockFlow::produce(SectorId::new("a"), Res::new("He3_kg"), 1.0));
        let mut stocks = sector_stocks(0.0);
        ledger.commit(&mut stocks, CommitMode::Strict);
        assert_eq!(ledger.pending_count(), 0);
    }
}
