//! Goals, metrics, and the per-step evaluation snapshot (spec.md §3, §4.5).

use super::ids::{GoalId, MetricId, SectorId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Maximize,
    Minimize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Polarity {
    Positive,
    Negative,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GoalKind {
    Target { target: f64 },
    Bounds { lo: f64, hi: f64 },
    GrowthRate { base: f64, factor: f64, period_steps: u64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub id: GoalId,
    pub metric_id: MetricId,
    pub direction: Direction,
    pub kind: GoalKind,
    pub weight: f64,
    pub horizon: u64,
}

impl Goal {
    /// `target(t) = base * factor^(t/period)` for growth-rate goals.
    pub fn growth_curve_at(&self, t: u64) -> Option<f64> {
        match &self.kind {
            GoalKind::GrowthRate {
                base,
                factor,
                period_steps,
            } => {
                let exponent = t as f64 / *period_steps as f64;
                Some(base * factor.powf(exponent))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetric {
    pub id: MetricId,
    pub name: String,
    pub polarity: Polarity,
    pub unit: String,
    pub current_value: f64,
    pub contributions: BTreeMap<SectorId, f64>,
}

impl PerformanceMetric {
    pub fn new(id: MetricId, name: impl Into<String>, polarity: Polarity, unit: impl Into<String>) -> Self {
        PerformanceMetric {
            id,
            name: name.into(),
            polarity,
            unit: unit.into(),
            current_value: 0.0,
            contributions: BTreeMap::new(),
        }
    }

    pub fn recompute(&mut self) {
        self.current_value = self.contributions.values().sum();
    }

    pub fn set_contribution(&mut self, sector: SectorId, value: f64) {
        self.contributions.insert(sector, value);
        self.recompute();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoalStatus {
    Within,
    Approaching,
    Outside,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalScore {
    pub value: f64,
    pub score: f64,
    pub status: GoalStatus,
}

impl GoalScore {
    pub fn from_score(value: f64, score: f64) -> Self {
        let score = score.clamp(0.0, 1.0);
        let status = if score >= 0.9 {
            GoalStatus::Within
        } else if score >= 0.5 {
            GoalStatus::Approaching
        } else {
            GoalStatus::Outside
        };
        GoalScore { value, score, status }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub t: u64,
    pub metrics: BTreeMap<MetricId, f64>,
    pub scores: BTreeMap<GoalId, GoalScore>,
}

impl EvaluationResult {
    pub fn metric(&self, id: &MetricId) -> f64 {
        self.metrics.get(id).copied().unwrap_or(0.0)
    }
}
