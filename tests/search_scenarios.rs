use std::sync::Arc;

use qgplan::config::EstimatorKind;
use qgplan::fixtures;
use qgplan::graph::{ElementTag, QueryGraphBuilder};
use qgplan::plan::cost::{Cost, DummyCostEstimator};
use qgplan::plan::extend::{ExtensionStrategy, InitialExtensionStrategy};
use qgplan::plan::{default_validator, BottomUpPlanSearcher, CompositeExtensionStrategy, PlanOp};
use qgplan::plan::validate::PlanValidator;
use qgplan::{Planner, PlannerConfig, PlannerError};

fn dummy_config() -> PlannerConfig {
    PlannerConfig {
        estimator: EstimatorKind::Dummy,
        ..PlannerConfig::default()
    }
}

fn dragons_planner(config: PlannerConfig) -> Planner {
    Planner::new(config, Arc::new(fixtures::dragons_ontology()))
}

#[test]
fn person_owns_dragon_plans_from_person() {
    let output = dragons_planner(dummy_config())
        .plan(fixtures::simple_query1())
        .expect("plan");
    assert_eq!(
        output.description,
        "Plan[[EntityOp(ETyped(1)):RelationOp(Rel(2)):EntityOp(ETyped(3))]]"
    );
    assert_eq!(output.cost, Cost(1.0));
}

#[test]
fn shared_entity_is_revisited_once() {
    let query = fixtures::shared_entity_query();
    let output = dragons_planner(dummy_config())
        .plan(query.clone())
        .expect("plan");
    assert_eq!(
        output.description,
        "Plan[[EntityOp(ETyped(1)):RelationOp(Rel(2)):EntityOp(ETyped(3)):\
         RelationOp(Rel(5)):EntityOp(ETyped(6)):GoToEntityOp(ETyped(3)):\
         RelationOp(Rel(7)):EntityOp(ETyped(8))]]"
    );

    let ops = output.plan.ops();
    let gotos = ops
        .iter()
        .filter(|op| matches!(op, PlanOp::GoToEntity { .. }))
        .count();
    assert_eq!(gotos, 1);
    // entities + relations + filters + the single jump back
    let plannable = query.plannable().len();
    assert_eq!(ops.len(), plannable + 1);
}

#[test]
fn concrete_entity_anchors_the_plan() {
    let expected = [
        (
            1,
            "Plan[[EntityOp(EConcrete(1)):EntityFilterOp(EPropGroup(101)):\
             RelationOp(Rel(2)):RelationFilterOp(RelPropGroup(201)):\
             EntityOp(ETyped(3)):EntityFilterOp(EPropGroup(301)):\
             RelationOp(Rel(5)):RelationFilterOp(RelPropGroup(501)):\
             EntityOp(EUntyped(6)):EntityFilterOp(EPropGroup(601)):\
             GoToEntityOp(ETyped(3)):\
             RelationOp(Rel(7)):RelationFilterOp(RelPropGroup(701)):\
             EntityOp(ETyped(8)):EntityFilterOp(EPropGroup(801))]]",
        ),
        (
            3,
            "Plan[[EntityOp(EConcrete(3)):EntityFilterOp(EPropGroup(301)):\
             RelationOp(Rel(5)):RelationFilterOp(RelPropGroup(501)):\
             EntityOp(EUntyped(6)):EntityFilterOp(EPropGroup(601)):\
             GoToEntityOp(EConcrete(3)):\
             RelationOp(Rel(7)):RelationFilterOp(RelPropGroup(701)):\
             EntityOp(ETyped(8)):EntityFilterOp(EPropGroup(801)):\
             GoToEntityOp(EConcrete(3)):\
             RelationOp(Rel(2),reversed):RelationFilterOp(RelPropGroup(201)):\
             EntityOp(ETyped(1)):EntityFilterOp(EPropGroup(101))]]",
        ),
        (
            6,
            "Plan[[EntityOp(EConcrete(6)):EntityFilterOp(EPropGroup(601)):\
             RelationOp(Rel(5),reversed):RelationFilterOp(RelPropGroup(501)):\
             EntityOp(ETyped(3)):EntityFilterOp(EPropGroup(301)):\
             RelationOp(Rel(7)):RelationFilterOp(RelPropGroup(701)):\
             EntityOp(ETyped(8)):EntityFilterOp(EPropGroup(801)):\
             GoToEntityOp(ETyped(3)):\
             RelationOp(Rel(2),reversed):RelationFilterOp(RelPropGroup(201)):\
             EntityOp(ETyped(1)):EntityFilterOp(EPropGroup(101))]]",
        ),
        (
            8,
            "Plan[[EntityOp(EConcrete(8)):EntityFilterOp(EPropGroup(801)):\
             RelationOp(Rel(7),reversed):RelationFilterOp(RelPropGroup(701)):\
             EntityOp(ETyped(3)):EntityFilterOp(EPropGroup(301)):\
             RelationOp(Rel(5)):RelationFilterOp(RelPropGroup(501)):\
             EntityOp(EUntyped(6)):EntityFilterOp(EPropGroup(601)):\
             GoToEntityOp(ETyped(3)):\
             RelationOp(Rel(2),reversed):RelationFilterOp(RelPropGroup(201)):\
             EntityOp(ETyped(1)):EntityFilterOp(EPropGroup(101))]]",
        ),
    ];
    let planner = dragons_planner(PlannerConfig::default());
    for (concrete_at, description) in expected {
        let query = fixtures::dragons_quant_query(Some(concrete_at));
        let output = planner.plan(query).expect("plan");
        assert_eq!(output.description, description, "concrete entity {concrete_at}");
        assert_eq!(output.cost, Cost(1.0), "concrete entity {concrete_at}");
        assert_eq!(
            output.plan.ops()[0].origin().map(|origin| origin.tag),
            Some(ElementTag::EConcrete)
        );
    }
}

#[test]
fn optional_branch_is_entered_from_its_owner() {
    let query = fixtures::optional_query();
    let output = dragons_planner(PlannerConfig::default())
        .plan(query.clone())
        .expect("plan");
    assert_eq!(
        output.description,
        "Plan[[EntityOp(ETyped(3)):RelationOp(Rel(2),reversed):EntityOp(ETyped(1)):\
         RelationOp(Rel(4)):EntityOp(ETyped(5)):RelationOp(Rel(6)):EntityOp(ETyped(7))]]"
    );
    assert_eq!(output.cost, Cost(10.0));

    let validator = default_validator(10);
    for seed in InitialExtensionStrategy.extend(None, &query) {
        let first = seed.first_entity().map(|num| num.0);
        let result = validator.validate(&seed, &query);
        match first {
            Some(5) | Some(7) => {
                assert!(!result.is_valid(), "seed at {first:?} inside the optional");
                assert!(result.to_string().contains("plan starts inside optional branch 11"));
            }
            _ => assert!(result.is_valid(), "seed at {first:?}: {result}"),
        }
    }
}

#[test]
fn start_only_query_is_rejected_before_search() {
    let query = QueryGraphBuilder::new("nothing").build().expect("graph");
    let err = dragons_planner(dummy_config()).plan(query).unwrap_err();
    assert!(matches!(err, PlannerError::Invalid(_)));
    assert_eq!(err.code(), "InvalidQuery");
    assert!(err.to_string().contains("holds only the start element"));
}

#[test]
fn joins_enabled_search_still_finds_a_valid_plan() {
    let query = fixtures::quant_query1();
    let searcher = BottomUpPlanSearcher::new(
        CompositeExtensionStrategy::standard(true),
        default_validator(10),
        DummyCostEstimator::default(),
    );
    let outcome = searcher.search_all(&query);
    assert!(!outcome.exhausted);
    assert!(outcome
        .terminal
        .iter()
        .any(|candidate| candidate.plan.joins().next().is_some()));

    let best = searcher.search(&query).expect("plan");
    assert!(best.plan.is_complete(&query));
    assert!(default_validator(10).validate(&best.plan, &query).is_valid());
    assert_eq!(best.plan.flat_len(), 15);
    assert_eq!(best.plan.first_entity().map(|num| num.0), Some(1));
}

#[test]
fn searching_twice_gives_the_same_plan() {
    let planner = dragons_planner(PlannerConfig::default());
    let first = planner.plan(fixtures::quant_query1()).expect("plan");
    let second = planner.plan(fixtures::quant_query1()).expect("plan");
    assert_eq!(first.description, second.description);
    assert_eq!(first.fingerprint, second.fingerprint);
}

#[test]
fn iteration_budget_reports_no_plan() {
    let config = PlannerConfig {
        max_iterations: Some(1),
        ..dummy_config()
    };
    let err = dragons_planner(config)
        .plan(fixtures::quant_query1())
        .unwrap_err();
    assert_eq!(err.code(), "NoPlanFound");
}
