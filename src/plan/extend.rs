//! Extension strategies: given a partial plan, produce its legal successors.
//!
//! The bottom-up searcher asks the configured strategy for successors of every pending
//! candidate. Seeds come from [`InitialExtensionStrategy`]; partial plans grow one relation at
//! a time through [`DfsRedundantExtensionStrategy`], or by joining an independently planned
//! branch through [`JoinExtensionStrategy`].

use rustc_hash::FxHashSet;
use tracing::trace;

use crate::graph::{ENum, QueryGraph, QueryNode};

use super::op::{Plan, PlanOp};

/// Produces successors of a partial plan. `None` asks for seed plans.
pub trait ExtensionStrategy: Send + Sync {
    /// Legal successors; an empty vector marks a dead end.
    fn extend(&self, plan: Option<&Plan>, query: &QueryGraph) -> Vec<Plan>;
}

/// Seeds one plan per entity: the entity scan followed by its property groups.
#[derive(Clone, Copy, Debug, Default)]
pub struct InitialExtensionStrategy;

impl ExtensionStrategy for InitialExtensionStrategy {
    fn extend(&self, plan: Option<&Plan>, query: &QueryGraph) -> Vec<Plan> {
        if plan.is_some_and(|plan| !plan.is_empty()) {
            return Vec::new();
        }
        query
            .entities()
            .into_iter()
            .map(|entity| seed(query, entity, &FxHashSet::default()))
            .collect()
    }
}

fn seed(query: &QueryGraph, entity: ENum, marked: &FxHashSet<ENum>) -> Plan {
    let mut ops = vec![PlanOp::entity(query, entity)];
    ops.extend(
        query
            .entity_filters(entity)
            .into_iter()
            .filter(|group| !marked.contains(group))
            .map(|group| PlanOp::entity_filter(query, group)),
    );
    Plan::new(ops)
}

/// Extends a plan with the nearest relation not yet realized, walking the query graph depth
/// first from the last scanned entity.
#[derive(Clone, Copy, Debug, Default)]
pub struct DfsRedundantExtensionStrategy;

impl ExtensionStrategy for DfsRedundantExtensionStrategy {
    fn extend(&self, plan: Option<&Plan>, query: &QueryGraph) -> Vec<Plan> {
        let Some(plan) = plan.filter(|plan| !plan.is_empty()) else {
            return Vec::new();
        };
        let marked = plan.handled();
        let visited = plan.visited_entities();
        match next_step(plan, query, &marked, &visited) {
            Some(ops) => vec![plan.extended(ops)],
            None => Vec::new(),
        }
    }
}

/// Ops realizing the next relation, or `None` at a dead end.
///
/// `marked` holds elements that must not be realized again, `visited` the entities the plan
/// may anchor on.
fn next_step(
    plan: &Plan,
    query: &QueryGraph,
    marked: &FxHashSet<ENum>,
    visited: &FxHashSet<ENum>,
) -> Option<Vec<PlanOp>> {
    let last = plan.last_entity()?;
    let rel = next_relation(query, last, marked)?;
    let source = query.rel_source(rel)?;
    let target = query.rel_target(rel)?;
    let (anchor, far, reversed) = if visited.contains(&source) {
        (source, target, false)
    } else if visited.contains(&target) {
        (target, source, true)
    } else {
        return None;
    };

    let mut ops = Vec::new();
    if plan.position() != Some(anchor) {
        ops.push(PlanOp::goto(query, anchor));
    }
    ops.push(if reversed {
        PlanOp::relation_reversed(query, rel)
    } else {
        PlanOp::relation(query, rel)
    });
    ops.extend(
        query
            .rel_filters(rel)
            .into_iter()
            .filter(|group| !marked.contains(group))
            .map(|group| PlanOp::relation_filter(query, group)),
    );
    if visited.contains(&far) {
        ops.push(PlanOp::goto(query, far));
    } else {
        ops.push(PlanOp::entity(query, far));
        ops.extend(
            query
                .entity_filters(far)
                .into_iter()
                .filter(|group| !marked.contains(group))
                .map(|group| PlanOp::entity_filter(query, group)),
        );
    }
    trace!(rel = %rel, anchor = %anchor, reversed, "extending plan");
    Some(ops)
}

/// Nearest unmarked relation reachable from `last`: below it first, then through its ancestor
/// entities, nearest first.
fn next_relation(query: &QueryGraph, last: ENum, marked: &FxHashSet<ENum>) -> Option<ENum> {
    let unmarked = |node: &QueryNode| node.element.is_rel() && !marked.contains(&node.num);
    let is_entity = |node: &QueryNode| node.element.is_entity();

    if let Some(rel) = query.next_descendant(last, unmarked) {
        return Some(rel);
    }
    let mut ancestor = query.ancestor(last, is_entity);
    while let Some(entity) = ancestor {
        if let Some(rel) = query.first_in_path(last, entity, unmarked) {
            return Some(rel);
        }
        if let Some(rel) = query.next_descendant(entity, unmarked) {
            return Some(rel);
        }
        ancestor = query.ancestor(entity, is_entity);
    }
    None
}

/// Joins an incomplete plan with a branch planned from an entity it has not reached.
///
/// The branch is grown depth first from its seed, never re-realizing what the left plan
/// already covers, until it scans an entity the left plan visited: the pivot.
#[derive(Clone, Copy, Debug, Default)]
pub struct JoinExtensionStrategy;

impl ExtensionStrategy for JoinExtensionStrategy {
    fn extend(&self, plan: Option<&Plan>, query: &QueryGraph) -> Vec<Plan> {
        let Some(left) = plan.filter(|plan| !plan.is_empty()) else {
            return Vec::new();
        };
        if left.is_complete(query) {
            return Vec::new();
        }
        let left_handled = left.handled();
        let left_visited = left.visited_entities();
        query
            .entities()
            .into_iter()
            .filter(|entity| !left_handled.contains(entity))
            .filter_map(|entity| {
                let right = join_branch(query, entity, &left_handled, &left_visited)?;
                Some(Plan::new(vec![PlanOp::join(left.clone(), right, true)]))
            })
            .collect()
    }
}

fn join_branch(
    query: &QueryGraph,
    seed_entity: ENum,
    left_handled: &FxHashSet<ENum>,
    left_visited: &FxHashSet<ENum>,
) -> Option<Plan> {
    let mut branch = seed(query, seed_entity, left_handled);
    // each step realizes at least one relation, so the graph size bounds the walk
    for _ in 0..query.len() {
        if branch
            .last_entity()
            .is_some_and(|last| left_visited.contains(&last))
        {
            return Some(branch);
        }
        let mut marked = left_handled.clone();
        marked.extend(branch.handled());
        let visited = branch.visited_entities();
        let step = next_step(&branch, query, &marked, &visited)?;
        branch = branch.extended(step);
    }
    None
}

/// Concatenates the successors of several strategies.
#[derive(Default)]
pub struct CompositeExtensionStrategy {
    strategies: Vec<Box<dyn ExtensionStrategy>>,
}

impl CompositeExtensionStrategy {
    /// Creates an empty composite.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a strategy.
    pub fn with(mut self, strategy: impl ExtensionStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// Seeds plus depth-first growth, with joins when `enable_joins` is set.
    pub fn standard(enable_joins: bool) -> Self {
        let composite = Self::new()
            .with(InitialExtensionStrategy)
            .with(DfsRedundantExtensionStrategy);
        if enable_joins {
            composite.with(JoinExtensionStrategy)
        } else {
            composite
        }
    }
}

impl ExtensionStrategy for CompositeExtensionStrategy {
    fn extend(&self, plan: Option<&Plan>, query: &QueryGraph) -> Vec<Plan> {
        self.strategies
            .iter()
            .flat_map(|strategy| strategy.extend(plan, query))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn grow(query: &QueryGraph, mut plan: Plan) -> Plan {
        loop {
            let mut next = DfsRedundantExtensionStrategy.extend(Some(&plan), query);
            match next.pop() {
                Some(successor) => plan = successor,
                None => return plan,
            }
        }
    }

    #[test]
    fn seeds_one_plan_per_entity() {
        let g = fixtures::quant_query1();
        let seeds = InitialExtensionStrategy.extend(None, &g);
        let described: Vec<String> = seeds.iter().map(ToString::to_string).collect();
        assert_eq!(
            described,
            vec![
                "Plan[[EntityOp(ETyped(1)):EntityFilterOp(EPropGroup(101))]]",
                "Plan[[EntityOp(ETyped(3)):EntityFilterOp(EPropGroup(301))]]",
                "Plan[[EntityOp(EUntyped(6)):EntityFilterOp(EPropGroup(601))]]",
                "Plan[[EntityOp(ETyped(8)):EntityFilterOp(EPropGroup(801))]]",
            ]
        );
        assert!(InitialExtensionStrategy
            .extend(Some(&seeds[0]), &g)
            .is_empty());
    }

    #[test]
    fn dfs_from_first_entity_goes_back_to_shared_entity() {
        let g = fixtures::quant_query1();
        let plan = grow(&g, seed(&g, ENum(1), &FxHashSet::default()));
        assert_eq!(
            plan.to_string(),
            "Plan[[EntityOp(ETyped(1)):EntityFilterOp(EPropGroup(101)):\
             RelationOp(Rel(2)):RelationFilterOp(RelPropGroup(201)):\
             EntityOp(ETyped(3)):EntityFilterOp(EPropGroup(301)):\
             RelationOp(Rel(5)):RelationFilterOp(RelPropGroup(501)):\
             EntityOp(EUntyped(6)):EntityFilterOp(EPropGroup(601)):\
             GoToEntityOp(ETyped(3)):\
             RelationOp(Rel(7)):RelationFilterOp(RelPropGroup(701)):\
             EntityOp(ETyped(8)):EntityFilterOp(EPropGroup(801))]]"
        );
        assert!(plan.is_complete(&g));
    }

    #[test]
    fn dfs_from_leaf_climbs_and_reverses() {
        let g = fixtures::quant_query1();
        let plan = grow(&g, seed(&g, ENum(8), &FxHashSet::default()));
        assert_eq!(
            plan.to_string(),
            "Plan[[EntityOp(ETyped(8)):EntityFilterOp(EPropGroup(801)):\
             RelationOp(Rel(7),reversed):RelationFilterOp(RelPropGroup(701)):\
             EntityOp(ETyped(3)):EntityFilterOp(EPropGroup(301)):\
             RelationOp(Rel(5)):RelationFilterOp(RelPropGroup(501)):\
             EntityOp(EUntyped(6)):EntityFilterOp(EPropGroup(601)):\
             GoToEntityOp(ETyped(3)):\
             RelationOp(Rel(2),reversed):RelationFilterOp(RelPropGroup(201)):\
             EntityOp(ETyped(1)):EntityFilterOp(EPropGroup(101))]]"
        );
        assert!(plan.is_complete(&g));
    }

    #[test]
    fn complete_plan_is_a_dead_end() {
        let g = fixtures::simple_query1();
        let plan = grow(&g, seed(&g, ENum(1), &FxHashSet::default()));
        assert!(plan.is_complete(&g));
        assert!(DfsRedundantExtensionStrategy
            .extend(Some(&plan), &g)
            .is_empty());
        assert!(DfsRedundantExtensionStrategy.extend(None, &g).is_empty());
    }

    #[test]
    fn join_branch_stops_at_pivot() {
        let g = fixtures::quant_query1();
        let left = grow(&g, seed(&g, ENum(1), &FxHashSet::default()));
        assert!(JoinExtensionStrategy.extend(Some(&left), &g).is_empty());

        // left covers 1 -> 2 -> 3 only
        let left = DfsRedundantExtensionStrategy
            .extend(Some(&seed(&g, ENum(1), &FxHashSet::default())), &g)
            .remove(0);
        let joins = JoinExtensionStrategy.extend(Some(&left), &g);
        let described: Vec<String> = joins.iter().map(ToString::to_string).collect();
        assert_eq!(described.len(), 2);
        assert_eq!(
            described[0],
            "Plan[[EntityJoinOp(Plan[[EntityOp(ETyped(1)):EntityFilterOp(EPropGroup(101)):\
             RelationOp(Rel(2)):RelationFilterOp(RelPropGroup(201)):\
             EntityOp(ETyped(3)):EntityFilterOp(EPropGroup(301))]],\
             Plan[[EntityOp(EUntyped(6)):EntityFilterOp(EPropGroup(601)):\
             RelationOp(Rel(5),reversed):RelationFilterOp(RelPropGroup(501)):\
             EntityOp(ETyped(3))]])]]"
        );
    }

    #[test]
    fn composite_concatenates() {
        let g = fixtures::simple_query1();
        let composite = CompositeExtensionStrategy::standard(false);
        assert_eq!(composite.extend(None, &g).len(), 2);
        let seeds = composite.extend(None, &g);
        let successors = composite.extend(Some(&seeds[0]), &g);
        assert_eq!(successors.len(), 1);
        assert_eq!(
            successors[0].to_string(),
            "Plan[[EntityOp(ETyped(1)):RelationOp(Rel(2)):EntityOp(ETyped(3))]]"
        );
    }
}
