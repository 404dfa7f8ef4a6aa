//! Structural plan rules.

use rustc_hash::FxHashSet;

use crate::graph::{ENum, QueryGraph};
use crate::plan::op::{Plan, PlanOp};
use crate::validation::ValidationResult;

use super::PlanValidator;

fn is_entity_like(op: &PlanOp) -> bool {
    matches!(
        op,
        PlanOp::Entity { .. } | PlanOp::GoToEntity { .. } | PlanOp::EntityFilter { .. }
    )
}

fn is_relation_like(op: &PlanOp) -> bool {
    matches!(op, PlanOp::Relation { .. } | PlanOp::RelationFilter { .. })
}

/// Element an op leaves the plan positioned on: an entity or a relation.
fn anchor(op: &PlanOp, query: &QueryGraph) -> Option<ENum> {
    match op {
        PlanOp::Entity { origin }
        | PlanOp::GoToEntity { origin }
        | PlanOp::Relation { origin, .. } => Some(origin.num),
        PlanOp::EntityFilter { origin } | PlanOp::RelationFilter { origin } => {
            query.group_owner(origin.num)
        }
        PlanOp::EntityJoin(_) => None,
    }
}

/// Consecutive ops must be directly connected in the query graph.
#[derive(Clone, Copy, Debug, Default)]
pub struct AdjacencyValidator;

impl PlanValidator for AdjacencyValidator {
    fn name(&self) -> &'static str {
        "AdjacencyValidator"
    }

    fn validate(&self, plan: &Plan, query: &QueryGraph) -> ValidationResult {
        let mut errors = Vec::new();
        for (idx, pair) in plan.ops().windows(2).enumerate() {
            let (prev, cur) = (&pair[0], &pair[1]);
            let prev_anchor = anchor(prev, query);
            let connected = match cur {
                PlanOp::EntityJoin(_) | PlanOp::GoToEntity { .. } => true,
                _ if prev.as_join().is_some() => true,
                PlanOp::EntityFilter { origin } => {
                    is_entity_like(prev)
                        && prev_anchor.is_some()
                        && query.group_owner(origin.num) == prev_anchor
                }
                PlanOp::RelationFilter { origin } => {
                    is_relation_like(prev)
                        && prev_anchor.is_some()
                        && query.group_owner(origin.num) == prev_anchor
                }
                PlanOp::Relation { origin, .. } => {
                    is_entity_like(prev)
                        && prev_anchor
                            .is_some_and(|entity| query.is_rel_endpoint(origin.num, entity))
                }
                PlanOp::Entity { origin } => {
                    is_relation_like(prev)
                        && prev_anchor.is_some_and(|rel| query.is_rel_endpoint(rel, origin.num))
                }
            };
            if !connected {
                errors.push(format!(
                    "{cur} at position {} does not follow {prev}",
                    idx + 1
                ));
            }
        }
        ValidationResult::from_errors(self.name(), errors)
    }
}

/// A relation is realized at most once per run, joins included.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRedundantRelationValidator;

impl PlanValidator for NoRedundantRelationValidator {
    fn name(&self) -> &'static str {
        "NoRedundantRelationValidator"
    }

    fn validate(&self, plan: &Plan, _query: &QueryGraph) -> ValidationResult {
        let mut errors = Vec::new();
        let mut seen = FxHashSet::default();
        let mut record = |op: &PlanOp, errors: &mut Vec<String>| {
            if let PlanOp::Relation { origin, .. } = op {
                if !seen.insert(origin.num) {
                    errors.push(format!("{origin} is realized more than once"));
                }
            }
        };
        for op in plan.ops() {
            match op.as_join() {
                Some(join) => {
                    for inner in join.left.flat_ops().into_iter().chain(join.right.flat_ops()) {
                        record(inner, &mut errors);
                    }
                }
                None => record(op, &mut errors),
            }
        }
        ValidationResult::from_errors(self.name(), errors)
    }
}

/// `GoToEntity` may only target an entity scanned earlier in the run.
#[derive(Clone, Copy, Debug, Default)]
pub struct RedundantGoToValidator;

impl PlanValidator for RedundantGoToValidator {
    fn name(&self) -> &'static str {
        "RedundantGoToValidator"
    }

    fn validate(&self, plan: &Plan, _query: &QueryGraph) -> ValidationResult {
        let mut errors = Vec::new();
        let mut visited = FxHashSet::default();
        for (idx, op) in plan.ops().iter().enumerate() {
            match op {
                PlanOp::Entity { origin } => {
                    visited.insert(origin.num);
                }
                PlanOp::GoToEntity { origin } if !visited.contains(&origin.num) => {
                    errors.push(format!(
                        "{op} at position {idx} targets an entity not visited before"
                    ));
                }
                PlanOp::EntityJoin(join) => {
                    visited.extend(join.left.visited_entities());
                    visited.extend(join.right.visited_entities());
                }
                _ => {}
            }
        }
        ValidationResult::from_errors(self.name(), errors)
    }
}

/// A relation is traversed reversed exactly when the plan stands on its target.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReverseRelationValidator;

impl PlanValidator for ReverseRelationValidator {
    fn name(&self) -> &'static str {
        "ReverseRelationValidator"
    }

    fn validate(&self, plan: &Plan, query: &QueryGraph) -> ValidationResult {
        let mut errors = Vec::new();
        let mut position: Option<ENum> = None;
        for op in plan.ops() {
            match op {
                PlanOp::Entity { origin } | PlanOp::GoToEntity { origin } => {
                    position = Some(origin.num)
                }
                PlanOp::EntityFilter { .. } => {}
                PlanOp::Relation { origin, reversed } => {
                    if let Some(entity) = position {
                        let from_target = query.rel_target(origin.num) == Some(entity);
                        let from_source = query.rel_source(origin.num) == Some(entity);
                        if from_target && !reversed {
                            errors.push(format!("{op} must be reversed when leaving {entity}"));
                        } else if from_source && *reversed {
                            errors.push(format!(
                                "{op} must not be reversed when leaving {entity}"
                            ));
                        }
                    }
                    position = None;
                }
                PlanOp::RelationFilter { .. } | PlanOp::EntityJoin(_) => position = None,
            }
        }
        ValidationResult::from_errors(self.name(), errors)
    }
}

/// Ops realizing elements under an optional marker form one contiguous segment, entered from
/// outside the optional branch. Jumps do not realize anything and are ignored.
#[derive(Clone, Copy, Debug, Default)]
pub struct OptionalCompletenessValidator;

impl PlanValidator for OptionalCompletenessValidator {
    fn name(&self) -> &'static str {
        "OptionalCompletenessValidator"
    }

    fn validate(&self, plan: &Plan, query: &QueryGraph) -> ValidationResult {
        let mut errors = Vec::new();
        let mut current: Option<ENum> = None;
        let mut closed = FxHashSet::default();
        let mut first = true;
        for op in plan.ops() {
            if matches!(op, PlanOp::GoToEntity { .. }) {
                continue;
            }
            let scope = op.num().and_then(|num| query.optional_scope(num));
            if first {
                first = false;
                if let Some(scope) = scope {
                    errors.push(format!("plan starts inside optional branch {scope}"));
                }
            }
            if scope != current {
                if let Some(prev) = current {
                    closed.insert(prev);
                }
                if let Some(scope) = scope {
                    if closed.contains(&scope) {
                        errors.push(format!("{op} re-enters optional branch {scope}"));
                    }
                }
                current = scope;
            }
        }
        ValidationResult::from_errors(self.name(), errors)
    }
}

/// Joins meet at exactly one pivot entity and each branch moves away from it. A complete join
/// also covers the query path between its branch seeds.
#[derive(Clone, Copy, Debug, Default)]
pub struct JoinValidator;

impl PlanValidator for JoinValidator {
    fn name(&self) -> &'static str {
        "JoinValidator"
    }

    fn validate(&self, plan: &Plan, query: &QueryGraph) -> ValidationResult {
        let mut errors = Vec::new();
        for join in plan.joins() {
            if join.left.is_empty() || join.right.is_empty() {
                errors.push("join branch is empty".to_string());
                continue;
            }
            let left = join.left.visited_entities();
            let right = join.right.visited_entities();
            let shared = left.intersection(&right).count();
            if shared != 1 {
                errors.push(format!("join shares {shared} entities, expected one"));
                continue;
            }
            for (side, branch) in [("left", &join.left), ("right", &join.right)] {
                let realizes_relation = branch
                    .flat_ops()
                    .into_iter()
                    .any(|op| matches!(op, PlanOp::Relation { .. }));
                if !realizes_relation {
                    errors.push(format!("{side} branch {branch} holds only the pivot"));
                }
            }
            if !join.complete {
                continue;
            }
            let (Some(from), Some(to)) = (join.left.first_entity(), join.right.first_entity())
            else {
                continue;
            };
            let mut handled = join.left.handled();
            handled.extend(join.right.handled());
            for num in query.path(from, to) {
                let control = query
                    .element(num)
                    .map_or(true, |element| element.is_control());
                if !control && !handled.contains(&num) {
                    errors.push(format!("join leaves {}({num}) uncovered", query.tag_of(num)));
                }
            }
        }
        ValidationResult::from_errors(self.name(), errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::graph::QueryGraph;

    fn plan(ops: Vec<PlanOp>) -> Plan {
        Plan::new(ops)
    }

    fn valid(validator: &dyn PlanValidator, plan: &Plan, g: &QueryGraph) -> bool {
        validator.validate(plan, g).is_valid()
    }

    #[test]
    fn adjacency_accepts_connected_steps() {
        let g = fixtures::quant_query1();
        let p = plan(vec![
            PlanOp::entity(&g, 3),
            PlanOp::entity_filter(&g, 301),
            PlanOp::relation(&g, 5),
            PlanOp::relation_filter(&g, 501),
            PlanOp::entity(&g, 6),
            PlanOp::goto(&g, 3),
            PlanOp::relation(&g, 7),
            PlanOp::entity(&g, 8),
        ]);
        assert!(valid(&AdjacencyValidator, &p, &g));
    }

    #[test]
    fn adjacency_rejects_disconnected_steps() {
        let g = fixtures::quant_query1();
        let jumps = plan(vec![PlanOp::entity(&g, 1), PlanOp::relation(&g, 5)]);
        let result = AdjacencyValidator.validate(&jumps, &g);
        assert_eq!(
            result.errors(),
            &["AdjacencyValidator: RelationOp(Rel(5)) at position 1 does not follow EntityOp(ETyped(1))"]
        );

        let wrong_filter = plan(vec![PlanOp::entity(&g, 1), PlanOp::entity_filter(&g, 301)]);
        assert!(!valid(&AdjacencyValidator, &wrong_filter, &g));

        let entity_after_entity = plan(vec![PlanOp::entity(&g, 1), PlanOp::entity(&g, 3)]);
        assert!(!valid(&AdjacencyValidator, &entity_after_entity, &g));
    }

    #[test]
    fn relation_realized_twice_is_rejected() {
        let g = fixtures::simple_query1();
        let p = plan(vec![
            PlanOp::entity(&g, 1),
            PlanOp::relation(&g, 2),
            PlanOp::entity(&g, 3),
            PlanOp::relation_reversed(&g, 2),
            PlanOp::goto(&g, 1),
        ]);
        assert!(!valid(&NoRedundantRelationValidator, &p, &g));

        let join = plan(vec![
            PlanOp::join(
                plan(vec![PlanOp::entity(&g, 1), PlanOp::relation(&g, 2)]),
                plan(vec![PlanOp::entity(&g, 3)]),
                true,
            ),
            PlanOp::relation(&g, 2),
        ]);
        assert!(!valid(&NoRedundantRelationValidator, &join, &g));
    }

    #[test]
    fn goto_requires_visited_entity() {
        let g = fixtures::quant_query1();
        let ok = plan(vec![
            PlanOp::entity(&g, 1),
            PlanOp::relation(&g, 2),
            PlanOp::entity(&g, 3),
            PlanOp::goto(&g, 1),
        ]);
        assert!(valid(&RedundantGoToValidator, &ok, &g));

        let not_visited = plan(vec![
            PlanOp::entity(&g, 1),
            PlanOp::relation(&g, 2),
            PlanOp::entity(&g, 3),
            PlanOp::goto(&g, 6),
        ]);
        assert!(!valid(&RedundantGoToValidator, &not_visited, &g));

        let visited_in_join = plan(vec![
            PlanOp::join(
                plan(vec![
                    PlanOp::entity(&g, 1),
                    PlanOp::relation(&g, 2),
                    PlanOp::entity(&g, 3),
                ]),
                plan(vec![
                    PlanOp::entity(&g, 6),
                    PlanOp::relation_reversed(&g, 5),
                    PlanOp::entity(&g, 3),
                ]),
                true,
            ),
            PlanOp::goto(&g, 6),
        ]);
        assert!(valid(&RedundantGoToValidator, &visited_in_join, &g));
    }

    #[test]
    fn reversal_follows_standing_entity() {
        let g = fixtures::simple_query1();
        let forward = plan(vec![PlanOp::entity(&g, 1), PlanOp::relation(&g, 2)]);
        assert!(valid(&ReverseRelationValidator, &forward, &g));

        let reversed_from_source =
            plan(vec![PlanOp::entity(&g, 1), PlanOp::relation_reversed(&g, 2)]);
        assert!(!valid(&ReverseRelationValidator, &reversed_from_source, &g));

        let from_target = plan(vec![PlanOp::entity(&g, 3), PlanOp::relation(&g, 2)]);
        let result = ReverseRelationValidator.validate(&from_target, &g);
        assert_eq!(
            result.errors(),
            &["ReverseRelationValidator: RelationOp(Rel(2)) must be reversed when leaving 3"]
        );

        let reversed_from_target =
            plan(vec![PlanOp::entity(&g, 3), PlanOp::relation_reversed(&g, 2)]);
        assert!(valid(&ReverseRelationValidator, &reversed_from_target, &g));
    }

    #[test]
    fn optional_segment_must_be_contiguous() {
        let g = fixtures::optional_query();
        // 1 -r2-> 3, optional { 1 -r4-> 5 -r6-> 7 }
        let ok = plan(vec![
            PlanOp::entity(&g, 1),
            PlanOp::relation(&g, 2),
            PlanOp::entity(&g, 3),
            PlanOp::goto(&g, 1),
            PlanOp::relation(&g, 4),
            PlanOp::entity(&g, 5),
            PlanOp::relation(&g, 6),
            PlanOp::entity(&g, 7),
        ]);
        assert!(valid(&OptionalCompletenessValidator, &ok, &g));

        let starts_inside = plan(vec![
            PlanOp::entity(&g, 5),
            PlanOp::relation_reversed(&g, 4),
            PlanOp::entity(&g, 1),
        ]);
        assert!(!valid(&OptionalCompletenessValidator, &starts_inside, &g));

        let re_enters = plan(vec![
            PlanOp::entity(&g, 1),
            PlanOp::relation(&g, 4),
            PlanOp::entity(&g, 5),
            PlanOp::goto(&g, 1),
            PlanOp::relation(&g, 2),
            PlanOp::entity(&g, 3),
            PlanOp::goto(&g, 5),
            PlanOp::relation(&g, 6),
            PlanOp::entity(&g, 7),
        ]);
        let result = OptionalCompletenessValidator.validate(&re_enters, &g);
        assert!(!result.is_valid());
        assert!(result.errors()[0].contains("re-enters optional branch"));
    }

    #[test]
    fn join_needs_a_single_pivot_and_real_branches() {
        let g = fixtures::quant_query1();
        let single_entity_left = plan(vec![PlanOp::join(
            plan(vec![PlanOp::entity(&g, 1)]),
            plan(vec![
                PlanOp::entity(&g, 3),
                PlanOp::relation_reversed(&g, 2),
                PlanOp::entity(&g, 1),
            ]),
            true,
        )]);
        assert!(!valid(&JoinValidator, &single_entity_left, &g));

        let pivot_three = plan(vec![PlanOp::join(
            plan(vec![
                    PlanOp::entity(&g, 1),
                    PlanOp::relation(&g, 2),
                    PlanOp::entity(&g, 3),
                ]),
            plan(vec![
                PlanOp::entity(&g, 8),
                PlanOp::relation_reversed(&g, 7),
                PlanOp::entity(&g, 3),
            ]),
            true,
        )]);
        assert!(valid(&JoinValidator, &pivot_three, &g));

        let two_shared = plan(vec![PlanOp::join(
            plan(vec![
                    PlanOp::entity(&g, 1),
                    PlanOp::relation(&g, 2),
                    PlanOp::entity(&g, 3),
                ]),
            plan(vec![
                PlanOp::entity(&g, 3),
                PlanOp::relation_reversed(&g, 2),
                PlanOp::entity(&g, 1),
            ]),
            false,
        )]);
        assert!(!valid(&JoinValidator, &two_shared, &g));

        let disconnected = plan(vec![PlanOp::join(
            plan(vec![
                    PlanOp::entity(&g, 1),
                    PlanOp::relation(&g, 2),
                    PlanOp::entity(&g, 3),
                ]),
            plan(vec![PlanOp::entity(&g, 8), PlanOp::relation_reversed(&g, 7)]),
            true,
        )]);
        assert!(!valid(&JoinValidator, &disconnected, &g));
    }

    #[test]
    fn partial_joins_still_need_one_pivot_and_real_branches() {
        let g = fixtures::simple_query1();
        let validator = crate::plan::validate::default_validator(10);

        let disconnected = plan(vec![PlanOp::join(
            plan(vec![PlanOp::entity(&g, 1)]),
            plan(vec![PlanOp::entity(&g, 3)]),
            false,
        )]);
        let result = validator.validate(&disconnected, &g);
        assert!(!result.is_valid());
        assert!(result
            .errors()
            .contains(&"JoinValidator: join shares 0 entities, expected one".to_string()));

        let reversed_onto_lone_entity = plan(vec![PlanOp::join(
            plan(vec![PlanOp::entity(&g, 1)]),
            plan(vec![
                PlanOp::entity(&g, 3),
                PlanOp::relation_reversed(&g, 2),
                PlanOp::entity(&g, 1),
            ]),
            false,
        )]);
        assert!(!validator.validate(&reversed_onto_lone_entity, &g).is_valid());

        let forward_from_lone_entity = plan(vec![PlanOp::join(
            plan(vec![PlanOp::entity(&g, 1)]),
            plan(vec![
                PlanOp::entity(&g, 1),
                PlanOp::relation(&g, 2),
                PlanOp::entity(&g, 3),
            ]),
            false,
        )]);
        let result = JoinValidator.validate(&forward_from_lone_entity, &g);
        assert_eq!(
            result.errors(),
            &["JoinValidator: left branch Plan[[EntityOp(ETyped(1))]] holds only the pivot"]
        );
    }

    #[test]
    fn nested_complete_joins_are_valid() {
        // 1 -r2-> 3, with 3 -r5-> 6 and 3 -r7-> 8 under one quantifier
        let g = fixtures::shared_entity_query();
        let inner = PlanOp::join(
            plan(vec![
                PlanOp::entity(&g, 1),
                PlanOp::relation(&g, 2),
                PlanOp::entity(&g, 3),
            ]),
            plan(vec![
                PlanOp::entity(&g, 6),
                PlanOp::relation_reversed(&g, 5),
                PlanOp::entity(&g, 3),
            ]),
            true,
        );
        let outer = plan(vec![PlanOp::join(
            plan(vec![inner]),
            plan(vec![
                PlanOp::entity(&g, 8),
                PlanOp::relation_reversed(&g, 7),
                PlanOp::entity(&g, 3),
            ]),
            true,
        )]);
        let result = crate::plan::validate::default_validator(10).validate(&outer, &g);
        assert!(result.is_valid(), "{result}");
        assert!(outer.is_complete(&g));
    }
}
