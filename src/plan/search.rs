//! Bottom-up plan search.
//!
//! The searcher runs a worklist over candidate plans. Seeds come from the extension strategy
//! called without a plan; every round then expands the pending candidates, validates and costs
//! the successors, prunes them and moves complete ones to the terminal set.
//!
//! ```text
//!   seeds ──► validate ──► cost ──► prune ──► select ─┬─► terminal
//!     ▲                                               │
//!     └──────────────── expand ◄── pending ◄──────────┘
//! ```

use std::cmp::Ordering;

use tracing::{debug, trace, warn};

use crate::config::{EstimatorKind, PlannerConfig, PruneKind};
use crate::error::{PlannerError, Result};
use crate::graph::QueryGraph;

use super::cost::{
    Cost, CostContext, CostEstimator, DummyCostEstimator, PlanWithCost, PredicateCostEstimator,
    RuleBasedCostEstimator,
};
use super::extend::{CompositeExtensionStrategy, ExtensionStrategy};
use super::op::Plan;
use super::prune::{
    AllCompletePlanSelector, CheapestPlanPruneStrategy, NoPruningPruneStrategy, PlanSelector,
    PruneStrategy,
};
use super::validate::{default_validator, PlanValidator};

/// Everything a search produced.
#[derive(Clone, Debug, Default)]
pub struct SearchOutcome {
    /// Terminal candidates in discovery order.
    pub terminal: Vec<PlanWithCost>,
    /// Rounds run, the seed round included.
    pub iterations: usize,
    /// True when the iteration budget stopped the search early.
    pub exhausted: bool,
}

impl SearchOutcome {
    /// Best terminal candidate: cheapest, then fewest flattened ops, then smallest starting
    /// entity, then first discovered.
    pub fn best(&self) -> Option<&PlanWithCost> {
        self.terminal.iter().min_by(|a, b| compare_candidates(a, b))
    }
}

fn compare_candidates(a: &PlanWithCost, b: &PlanWithCost) -> Ordering {
    a.cost
        .cmp(&b.cost)
        .then_with(|| a.plan.flat_len().cmp(&b.plan.flat_len()))
        .then_with(|| a.plan.first_entity().cmp(&b.plan.first_entity()))
}

/// Worklist plan searcher.
pub struct BottomUpPlanSearcher {
    extension: Box<dyn ExtensionStrategy>,
    validator: Box<dyn PlanValidator>,
    estimator: Box<dyn CostEstimator>,
    seed_prune: Box<dyn PruneStrategy>,
    prune: Box<dyn PruneStrategy>,
    selector: Box<dyn PlanSelector>,
    max_iterations: Option<usize>,
}

impl BottomUpPlanSearcher {
    /// Searcher over the given strategies; seeds are kept unpruned, later rounds keep the
    /// cheapest candidates, complete plans are terminal.
    pub fn new(
        extension: impl ExtensionStrategy + 'static,
        validator: impl PlanValidator + 'static,
        estimator: impl CostEstimator + 'static,
    ) -> Self {
        Self {
            extension: Box::new(extension),
            validator: Box::new(validator),
            estimator: Box::new(estimator),
            seed_prune: Box::new(NoPruningPruneStrategy),
            prune: Box::new(CheapestPlanPruneStrategy),
            selector: Box::new(AllCompletePlanSelector),
            max_iterations: None,
        }
    }

    /// Wires a searcher from configuration.
    pub fn from_config(config: &PlannerConfig) -> Self {
        let extension = CompositeExtensionStrategy::standard(config.enable_joins);
        let validator = default_validator(config.validation_depth);
        let estimator: Box<dyn CostEstimator> = match config.estimator {
            EstimatorKind::Dummy => Box::new(DummyCostEstimator::new(config.dummy_cost)),
            EstimatorKind::RuleBased => {
                Box::new(RuleBasedCostEstimator::new(config.costs.clone()))
            }
            EstimatorKind::Predicate => Box::new(PredicateCostEstimator::short_plans_by_rules(
                config.short_plan_ops,
                config.costs.clone(),
            )),
        };
        Self {
            extension: Box::new(extension),
            validator: Box::new(validator),
            estimator,
            seed_prune: prune_strategy(config.seed_prune),
            prune: prune_strategy(config.prune),
            selector: Box::new(AllCompletePlanSelector),
            max_iterations: config.max_iterations,
        }
    }

    /// Replaces the seed-round pruning strategy.
    pub fn with_seed_prune(mut self, prune: impl PruneStrategy + 'static) -> Self {
        self.seed_prune = Box::new(prune);
        self
    }

    /// Replaces the pruning strategy of later rounds.
    pub fn with_prune(mut self, prune: impl PruneStrategy + 'static) -> Self {
        self.prune = Box::new(prune);
        self
    }

    /// Replaces the selector.
    pub fn with_selector(mut self, selector: impl PlanSelector + 'static) -> Self {
        self.selector = Box::new(selector);
        self
    }

    /// Bounds the number of rounds.
    pub fn with_max_iterations(mut self, max_iterations: Option<usize>) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Searches for the best complete plan.
    pub fn search(&self, query: &QueryGraph) -> Result<PlanWithCost> {
        let outcome = self.search_all(query);
        let best = outcome
            .best()
            .cloned()
            .ok_or_else(|| PlannerError::NoPlanFound {
                query: query.name().to_owned(),
            })?;
        debug!(
            query = query.name(),
            plan = %best.plan,
            cost = %best.cost,
            terminal = outcome.terminal.len(),
            iterations = outcome.iterations,
            "plan selected"
        );
        Ok(best)
    }

    /// Runs the search to exhaustion, or until the iteration budget, and returns every
    /// terminal candidate.
    pub fn search_all(&self, query: &QueryGraph) -> SearchOutcome {
        let mut outcome = SearchOutcome::default();
        let seeds: Vec<(Plan, Option<_>)> = self
            .extension
            .extend(None, query)
            .into_iter()
            .map(|plan| (plan, None))
            .collect();
        let mut pending = self.round(query, seeds, self.seed_prune.as_ref(), &mut outcome);

        while !pending.is_empty() {
            if self
                .max_iterations
                .is_some_and(|max| outcome.iterations >= max)
            {
                warn!(
                    query = query.name(),
                    max_iterations = outcome.iterations,
                    pending = pending.len(),
                    "plan search stopped by iteration budget"
                );
                outcome.exhausted = true;
                break;
            }
            let successors: Vec<(Plan, Option<_>)> = pending
                .iter()
                .flat_map(|candidate| {
                    self.extension
                        .extend(Some(&candidate.plan), query)
                        .into_iter()
                        .map(|plan| (plan, Some(candidate.cost)))
                })
                .collect();
            pending = self.round(query, successors, self.prune.as_ref(), &mut outcome);
        }
        outcome
    }

    fn round(
        &self,
        query: &QueryGraph,
        candidates: Vec<(Plan, Option<Cost>)>,
        prune: &dyn PruneStrategy,
        outcome: &mut SearchOutcome,
    ) -> Vec<PlanWithCost> {
        outcome.iterations += 1;
        let generated = candidates.len();
        let costed: Vec<PlanWithCost> = candidates
            .into_iter()
            .filter(|(plan, _)| {
                let result = self.validator.validate(plan, query);
                if !result.is_valid() {
                    trace!(plan = %plan, errors = ?result.errors(), "candidate rejected");
                }
                result.is_valid()
            })
            .map(|(plan, previous)| {
                self.estimator
                    .estimate(plan, &CostContext { query, previous })
            })
            .collect();
        let valid = costed.len();
        let selection = self.selector.select(query, prune.prune(costed));
        debug!(
            iteration = outcome.iterations,
            generated,
            valid,
            frontier = selection.pending.len(),
            terminal = outcome.terminal.len() + selection.complete.len(),
            "plan search round"
        );
        outcome.terminal.extend(selection.complete);
        selection.pending
    }
}

fn prune_strategy(kind: PruneKind) -> Box<dyn PruneStrategy> {
    match kind {
        PruneKind::None => Box::new(NoPruningPruneStrategy),
        PruneKind::Cheapest => Box::new(CheapestPlanPruneStrategy),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    use crate::plan::op::PlanOp;

    fn dummy_searcher() -> BottomUpPlanSearcher {
        BottomUpPlanSearcher::new(
            CompositeExtensionStrategy::standard(false),
            default_validator(10),
            DummyCostEstimator::default(),
        )
    }

    #[test]
    fn simple_chain_prefers_smallest_start() {
        let g = fixtures::simple_query1();
        let best = dummy_searcher().search(&g).expect("plan");
        assert_eq!(
            best.plan.to_string(),
            "Plan[[EntityOp(ETyped(1)):RelationOp(Rel(2)):EntityOp(ETyped(3))]]"
        );
        assert_eq!(best.cost, Cost(1.0));
    }

    #[test]
    fn start_only_graph_has_no_plan() {
        let g = crate::graph::QueryGraphBuilder::new("empty")
            .build()
            .expect("valid graph");
        let err = dummy_searcher().search(&g).unwrap_err();
        assert!(matches!(err, PlannerError::NoPlanFound { .. }));
    }

    #[test]
    fn iteration_budget_stops_search() {
        let g = fixtures::quant_query1();
        let outcome = dummy_searcher()
            .with_max_iterations(Some(2))
            .search_all(&g);
        assert!(outcome.exhausted);
        assert_eq!(outcome.iterations, 2);
        assert!(outcome.terminal.is_empty());
    }

    #[test]
    fn tie_break_order() {
        let g = fixtures::simple_query1();
        let long = PlanWithCost {
            plan: Plan::new(vec![
                PlanOp::entity(&g, 1),
                PlanOp::relation(&g, 2),
                PlanOp::entity(&g, 3),
                PlanOp::goto(&g, 1),
            ]),
            cost: Cost(1.0),
        };
        let from_three = PlanWithCost {
            plan: Plan::new(vec![
                PlanOp::entity(&g, 3),
                PlanOp::relation_reversed(&g, 2),
                PlanOp::entity(&g, 1),
            ]),
            cost: Cost(1.0),
        };
        let from_one = PlanWithCost {
            plan: Plan::new(vec![
                PlanOp::entity(&g, 1),
                PlanOp::relation(&g, 2),
                PlanOp::entity(&g, 3),
            ]),
            cost: Cost(1.0),
        };
        let outcome = SearchOutcome {
            terminal: vec![long, from_three, from_one.clone()],
            iterations: 1,
            exhausted: false,
        };
        assert_eq!(outcome.best(), Some(&from_one));
    }
}
