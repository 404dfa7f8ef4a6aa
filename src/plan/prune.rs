//! Pruning and selection of costed candidates.

use crate::graph::QueryGraph;

use super::cost::PlanWithCost;

/// Reduces a round's candidates before selection.
pub trait PruneStrategy: Send + Sync {
    /// Returns the surviving candidates, preserving their relative order.
    fn prune(&self, plans: Vec<PlanWithCost>) -> Vec<PlanWithCost>;
}

/// Keeps every candidate.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoPruningPruneStrategy;

impl PruneStrategy for NoPruningPruneStrategy {
    fn prune(&self, plans: Vec<PlanWithCost>) -> Vec<PlanWithCost> {
        plans
    }
}

/// Keeps every candidate sharing the minimum cost.
#[derive(Clone, Copy, Debug, Default)]
pub struct CheapestPlanPruneStrategy;

impl PruneStrategy for CheapestPlanPruneStrategy {
    fn prune(&self, plans: Vec<PlanWithCost>) -> Vec<PlanWithCost> {
        let Some(min) = plans.iter().map(|p| p.cost).min() else {
            return plans;
        };
        plans.into_iter().filter(|p| p.cost == min).collect()
    }
}

/// Candidates split into finished and still-growing plans.
#[derive(Debug, Default)]
pub struct Selection {
    /// Terminal candidates.
    pub complete: Vec<PlanWithCost>,
    /// Candidates to extend in the next round.
    pub pending: Vec<PlanWithCost>,
}

/// Decides which candidates are terminal.
pub trait PlanSelector: Send + Sync {
    /// Splits candidates into terminal and pending.
    fn select(&self, query: &QueryGraph, plans: Vec<PlanWithCost>) -> Selection;
}

/// Treats every complete plan as terminal.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllCompletePlanSelector;

impl PlanSelector for AllCompletePlanSelector {
    fn select(&self, query: &QueryGraph, plans: Vec<PlanWithCost>) -> Selection {
        let (complete, pending) = plans
            .into_iter()
            .partition(|candidate| candidate.plan.is_complete(query));
        Selection { complete, pending }
    }
}
