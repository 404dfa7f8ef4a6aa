//! Cost estimation for candidate plans.
//!
//! Costs only rank candidates against each other; they carry no unit.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::graph::{ElementTag, QueryGraph};

use super::op::{Plan, PlanOp};

/// Totally ordered plan cost.
#[derive(Clone, Copy, Debug, Default)]
pub struct Cost(pub f64);

impl PartialEq for Cost {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Cost {}

impl PartialOrd for Cost {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cost {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// A candidate plan with its estimated cost.
#[derive(Clone, Debug, PartialEq)]
pub struct PlanWithCost {
    /// The plan.
    pub plan: Plan,
    /// Its cost.
    pub cost: Cost,
}

/// Inputs available to an estimator besides the plan itself.
#[derive(Clone, Copy)]
pub struct CostContext<'a> {
    /// Query the plan realizes.
    pub query: &'a QueryGraph,
    /// Cost of the candidate this plan was extended from; `None` for seeds.
    pub previous: Option<Cost>,
}

/// Attaches a cost to a plan.
pub trait CostEstimator: Send + Sync {
    /// Estimates the cost of `plan`.
    fn estimate(&self, plan: Plan, ctx: &CostContext<'_>) -> PlanWithCost;
}

/// Gives every plan the same cost.
#[derive(Clone, Copy, Debug)]
pub struct DummyCostEstimator {
    cost: Cost,
}

impl DummyCostEstimator {
    /// Estimator returning `cost` for every plan.
    pub fn new(cost: f64) -> Self {
        Self { cost: Cost(cost) }
    }
}

impl Default for DummyCostEstimator {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl CostEstimator for DummyCostEstimator {
    fn estimate(&self, plan: Plan, _ctx: &CostContext<'_>) -> PlanWithCost {
        PlanWithCost {
            plan,
            cost: self.cost,
        }
    }
}

/// Per-op costs used by [`RuleBasedCostEstimator`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostTable {
    /// Scanning a concrete entity.
    pub concrete_scan: f64,
    /// Scanning a typed entity.
    pub typed_scan: f64,
    /// Scanning an untyped entity.
    pub untyped_scan: f64,
    /// Traversing a relation in its query direction.
    pub relation: f64,
    /// Traversing a relation against its query direction.
    pub reversed_relation: f64,
    /// Applying an entity or relation filter.
    pub filter: f64,
    /// Jumping back to a visited entity.
    pub goto: f64,
    /// Joining two branches.
    pub join: f64,
    /// Flattened op count above which plans are penalized; `None` disables the penalty.
    pub max_ops: Option<usize>,
    /// Penalty per op above `max_ops`.
    pub penalty_per_op: f64,
}

impl Default for CostTable {
    fn default() -> Self {
        Self {
            concrete_scan: 1.0,
            typed_scan: 10.0,
            untyped_scan: 100.0,
            relation: 1.0,
            reversed_relation: 1.0,
            filter: 0.0,
            goto: 0.0,
            join: 5.0,
            max_ops: None,
            penalty_per_op: 10.0,
        }
    }
}

/// Sums per-op costs from a [`CostTable`].
#[derive(Clone, Debug, Default)]
pub struct RuleBasedCostEstimator {
    table: CostTable,
}

impl RuleBasedCostEstimator {
    /// Estimator over `table`.
    pub fn new(table: CostTable) -> Self {
        Self { table }
    }

    fn op_cost(&self, op: &PlanOp) -> f64 {
        let t = &self.table;
        match op {
            PlanOp::Entity { origin } => match origin.tag {
                ElementTag::EConcrete => t.concrete_scan,
                ElementTag::ETyped => t.typed_scan,
                _ => t.untyped_scan,
            },
            PlanOp::Relation { reversed: false, .. } => t.relation,
            PlanOp::Relation { reversed: true, .. } => t.reversed_relation,
            PlanOp::EntityFilter { .. } | PlanOp::RelationFilter { .. } => t.filter,
            PlanOp::GoToEntity { .. } => t.goto,
            PlanOp::EntityJoin(join) => {
                t.join + self.plan_cost(&join.left) + self.plan_cost(&join.right)
            }
        }
    }

    fn plan_cost(&self, plan: &Plan) -> f64 {
        plan.ops().iter().map(|op| self.op_cost(op)).sum()
    }
}

impl CostEstimator for RuleBasedCostEstimator {
    fn estimate(&self, plan: Plan, _ctx: &CostContext<'_>) -> PlanWithCost {
        let mut cost = self.plan_cost(&plan);
        if let Some(max_ops) = self.table.max_ops {
            let len = plan.flat_len();
            if len > max_ops {
                cost += (len - max_ops) as f64 * self.table.penalty_per_op;
            }
        }
        PlanWithCost {
            plan,
            cost: Cost(cost),
        }
    }
}

/// Plan predicate used to route candidates.
pub type PlanPredicate = Box<dyn Fn(&Plan) -> bool + Send + Sync>;

/// Routes each plan to one of two estimators.
pub struct PredicateCostEstimator {
    predicate: PlanPredicate,
    when_true: Box<dyn CostEstimator>,
    when_false: Box<dyn CostEstimator>,
}

impl PredicateCostEstimator {
    /// Uses `when_true` for plans matching `predicate`, `when_false` otherwise.
    pub fn new(
        predicate: impl Fn(&Plan) -> bool + Send + Sync + 'static,
        when_true: impl CostEstimator + 'static,
        when_false: impl CostEstimator + 'static,
    ) -> Self {
        Self {
            predicate: Box::new(predicate),
            when_true: Box::new(when_true),
            when_false: Box::new(when_false),
        }
    }

    /// Short plans (at most `max_ops` flattened ops) are costed by rules; longer plans keep the
    /// cost of the candidate they grew from.
    pub fn short_plans_by_rules(max_ops: usize, table: CostTable) -> Self {
        Self::new(
            move |plan: &Plan| plan.flat_len() <= max_ops,
            RuleBasedCostEstimator::new(table.clone()),
            CarryCostEstimator::new(RuleBasedCostEstimator::new(table)),
        )
    }
}

impl CostEstimator for PredicateCostEstimator {
    fn estimate(&self, plan: Plan, ctx: &CostContext<'_>) -> PlanWithCost {
        if (self.predicate)(&plan) {
            self.when_true.estimate(plan, ctx)
        } else {
            self.when_false.estimate(plan, ctx)
        }
    }
}

/// Reuses the parent candidate's cost, estimating afresh only for seeds.
pub struct CarryCostEstimator {
    fallback: Box<dyn CostEstimator>,
}

impl CarryCostEstimator {
    /// Carries previous costs, using `fallback` when there is none.
    pub fn new(fallback: impl CostEstimator + 'static) -> Self {
        Self {
            fallback: Box::new(fallback),
        }
    }
}

impl CostEstimator for CarryCostEstimator {
    fn estimate(&self, plan: Plan, ctx: &CostContext<'_>) -> PlanWithCost {
        match ctx.previous {
            Some(cost) => PlanWithCost { plan, cost },
            None => self.fallback.estimate(plan, ctx),
        }
    }
}
