//! Evaluation Engine: aggregates metric contributions, scores each goal
//! (spec.md §4.5).

use crate::models::{Direction, EvaluationResult, Goal, GoalKind, GoalScore, PerformanceMetric, Polarity};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct EvaluationEngine {
    pub metrics: BTreeMap<crate::models::MetricId, PerformanceMetric>,
    pub goals: Vec<Goal>,
}

impl EvaluationEngine {
    pub fn new(metrics: Vec<PerformanceMetric>, goals: Vec<Goal>) -> Self {
        EvaluationEngine {
            metrics: metrics.into_iter().map(|m| (m.id.clone(), m)).collect(),
            goals,
        }
    }

    pub fn set_contribution(&mut self, metric_id: &crate::models::MetricId, sector: crate::models::SectorId, value: f64) {
        if let Some(metric) = self.metrics.get_mut(metric_id) {
            metric.set_contribution(sector, value);
        }
    }

    /// Recomputes every metric's `current_value`, then scores each goal
    /// against it, per spec.md §4.5.
    pub fn evaluate(&mut self, t: u64) -> EvaluationResult {
        for metric in self.metrics.values_mut() {
            metric.recompute();
        }

        let mut metrics = BTreeMap::new();
        for (id, metric) in &self.metrics {
            metrics.insert(id.clone(), metric.current_value);
        }

        let mut scores = BTreeMap::new();
        for goal in &self.goals {
            let metric = match self.metrics.get(&goal.metric_id) {
                Some(m) => m,
                None => continue,
            };
            let current = metric.current_value;
            let score = score_goal(goal, metric.polarity, current, t);
            scores.insert(goal.id.clone(), score);
        }

        EvaluationResult { t, metrics, scores }
    }
}

fn score_goal(goal: &Goal, _polarity: Polarity, current: f64, t: u64) -> GoalScore {
    match &goal.kind {
        GoalKind::Target { target } => {
            let score = if *target == 0.0 {
                if current == 0.0 { 1.0 } else { 0.0 }
            } else {
                1.0 - ((current - target).abs() / target.abs()).clamp(0.0, 1.0)
            };
            GoalScore::from_score(current, score)
        }
        GoalKind::Bounds { lo, hi } => {
            let score = if current >= *lo && current <= *hi {
                1.0
            } else if current < *lo {
                let span = (*hi - *lo).abs().max(1e-9);
                1.0 - ((*lo - current) / span).min(1.0)
            } else {
                let span = (*hi - *lo).abs().max(1e-9);
                1.0 - ((current - *hi) / span).min(1.0)
            };
            GoalScore::from_score(current, score.max(0.0))
        }
        GoalKind::GrowthRate { .. } => {
            let curve = goal.growth_curve_at(t).unwrap_or(1.0).max(1e-9);
            let score = match goal.direction {
                Direction::Maximize => (current / curve).min(1.0),
                Direction::Minimize => (curve / current.max(1e-9)).min(1.0),
            };
            GoalScore::from_score(current, score)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GoalId, MetricId, SectorId};

    #[test]
    fn target_goal_scores_perfectly_on_hit() {
        let mut metric = PerformanceMetric::new(MetricId::new("science_rate"), "Science Rate", Polarity::Positive, "units");
        metric.set_contribution(SectorId::new("science"), 100.0);
        let goal = Goal {
            id: GoalId::new("g1"),
            metric_id: MetricId::new("science_rate"),
            direction: Direction::Maximize,
            kind: GoalKind::Target { target: 100.0 },
            weight: 1.0,
            horizon: 10,
        };
        let mut engine = EvaluationEngine::new(vec![metric], vec![goal]);
        let result = engine.evaluate(0);
        let score = &result.scores[&GoalId::new("g1")];
        assert!((score.score - 1.0).abs() < 1e-9);
        assert_eq!(score.status, crate::models::GoalStatus::Within);
    }

    #[test]
    fn bounds_goal_falls_off_linearly_outside() {
        let mut metric = PerformanceMetric::new(MetricId::new("dust"), "Dust", Polarity::Negative, "ratio");
        metric.set_contribution(SectorId::new("environment"), 1.2);
        let goal = Goal {
            id: GoalId::new("g2"),
            metric_id: MetricId::new("dust"),
            direction: Direction::Minimize,
            kind: GoalKind::Bounds { lo: 0.0, hi: 1.0 },
            weight: 1.0,
            horizon: 10,
        };
        let mut engine = EvaluationEngine::new(vec![metric], vec![goal]);
        let result = engine.evaluate(0);
        let score = &result.scores[&GoalId::new("g2")];
        assert!(score.score < 1.0);
    }
}
