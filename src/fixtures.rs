//! Shared query graphs and ontology for tests, documentation and the CLI demos.
//!
//! Numbering follows one convention throughout: entities and relations use small numbers,
//! the property group hanging below element `n` is numbered `n * 100 + 1`.
//!
//! The graphs are hand-built and known to be well formed; a builder error here panics.

use crate::graph::{
    concrete, optional, prop_group, quant, rel, rel_prop_group, typed, untyped, Constraint,
    ConstraintOp, Direction, Fragment, InMemoryOntology, Prop, PropId, QuantType, QueryGraph,
    QueryGraphBuilder, TypeId,
};

const ENTITY_TYPES: &[&str] = &["Person", "Dragon", "Horse", "Guild", "Kingdom"];
const RELATION_TYPES: &[&str] = &["own", "freeze", "fire", "memberOf", "know", "subjectOf"];
const PROPERTIES: &[&str] = &[
    "name",
    "firstName",
    "lastName",
    "gender",
    "age",
    "color",
    "power",
    "startDate",
    "endDate",
    "temperature",
    "timestamp",
    "title",
];
const ENTITY_PROPERTIES: &[(&str, &[&str])] = &[
    ("Person", &["firstName", "lastName", "gender", "age", "name"]),
    ("Dragon", &["name", "color", "power", "age"]),
    ("Horse", &["name", "color", "age"]),
    ("Guild", &["name", "startDate", "endDate"]),
    ("Kingdom", &["name", "title"]),
];

/// The dragons ontology: people, dragons, horses, guilds and kingdoms.
pub fn dragons_ontology() -> InMemoryOntology {
    let mut ontology = InMemoryOntology::new("Dragons");
    for (id, name) in ENTITY_TYPES.iter().enumerate() {
        ontology = ontology.with_entity_type(*name, TypeId(id as u32 + 1));
    }
    for (id, name) in RELATION_TYPES.iter().enumerate() {
        ontology = ontology.with_relation_type(*name, TypeId(id as u32 + 101));
    }
    for (id, name) in PROPERTIES.iter().enumerate() {
        ontology = ontology.with_property(*name, PropId(id as u32 + 1));
    }
    for (etype, props) in ENTITY_PROPERTIES {
        ontology = ontology.with_entity_properties(*etype, props.iter().copied());
    }
    ontology
}

/// `Start → Person(1) -own(2)→ Dragon(3)` without filters.
pub fn simple_query1() -> QueryGraph {
    build(
        QueryGraphBuilder::new("simple_query1")
            .next(typed(1, "Person"))
            .next(rel(2, "own", Direction::R))
            .next(typed(3, "Dragon")),
    )
}

/// Person owning a dragon that both froze an untyped entity and fired at another dragon,
/// every element filtered.
pub fn quant_query1() -> QueryGraph {
    dragons_quant_query(None)
}

/// Same shape as [`quant_query1`], with entity `concrete_at` (1, 3, 6 or 8) turned into a
/// concrete entity.
///
/// ```text
/// Person(1) [101] -own(2)[201]→ Dragon(3) ─ all(4) ┬ [301]
///                                                   ├ -freeze(5)[501]→ ?(6) [601]
///                                                   └ -fire(7)[701]→ Dragon(8) [801]
/// ```
pub fn dragons_quant_query(concrete_at: Option<u32>) -> QueryGraph {
    let entity = |num: u32, etype: &str| match concrete_at {
        Some(at) if at == num => concrete(num, etype, &format!("{etype}_{num}")),
        _ => typed(num, etype),
    };
    let unknown = match concrete_at {
        Some(6) => concrete(6, "Horse", "Horse_6"),
        _ => untyped(6, &[]),
    };
    let name = match concrete_at {
        Some(at) => format!("dragons_quant_query_concrete_{at}"),
        None => "quant_query1".to_owned(),
    };

    build(
        QueryGraphBuilder::new(name)
            .next(entity(1, "Person").below(prop_group(
                101,
                QuantType::All,
                vec![Prop::filter("name", Constraint::of(ConstraintOp::Eq, "Brandon"))],
            )))
            .next(rel(2, "own", Direction::R).below(rel_prop_group(
                201,
                QuantType::All,
                vec![Prop::filter(
                    "startDate",
                    Constraint::of(ConstraintOp::Ge, 1_000_i64),
                )],
            )))
            .next(entity(3, "Dragon"))
            .next(quant(4, QuantType::All))
            .legs([
                prop_group(
                    301,
                    QuantType::All,
                    vec![Prop::filter(
                        "color",
                        Constraint::of(ConstraintOp::InSet, vec!["red", "gold"]),
                    )],
                ),
                rel(5, "freeze", Direction::R)
                    .below(rel_prop_group(
                        501,
                        QuantType::All,
                        vec![Prop::filter(
                            "temperature",
                            Constraint::of(ConstraintOp::Lt, -10_i64),
                        )],
                    ))
                    .next(unknown.below(prop_group(
                        601,
                        QuantType::All,
                        vec![Prop::filter("name", Constraint::of(ConstraintOp::Like, "B*"))],
                    ))),
                rel(7, "fire", Direction::R)
                    .below(rel_prop_group(
                        701,
                        QuantType::All,
                        vec![Prop::filter(
                            "timestamp",
                            Constraint::of(ConstraintOp::Gt, 100_i64),
                        )],
                    ))
                    .next(entity(8, "Dragon").below(prop_group(
                        801,
                        QuantType::Some,
                        vec![
                            Prop::filter("power", Constraint::of(ConstraintOp::Ge, 50_i64)),
                            Prop::filter("age", Constraint::of(ConstraintOp::Lt, 20_i64)),
                        ],
                    ))),
            ]),
    )
}

/// Dragon `3` shared by two relation legs under an `all` quantifier, no filters.
///
/// ```text
/// Person(1) -own(2)→ Dragon(3) ─ all(4) ┬ -fire(5)→ Dragon(6)
///                                       └ -freeze(7)→ Dragon(8)
/// ```
pub fn shared_entity_query() -> QueryGraph {
    build(
        QueryGraphBuilder::new("shared_entity_query")
            .next(typed(1, "Person"))
            .next(rel(2, "own", Direction::R))
            .next(typed(3, "Dragon"))
            .next(quant(4, QuantType::All))
            .legs([
                rel(5, "fire", Direction::R).next(typed(6, "Dragon")),
                rel(7, "freeze", Direction::R).next(typed(8, "Dragon")),
            ]),
    )
}

/// Three levels of `all` quantifiers; normalization collapses quantifiers 5 and 9 into 2.
pub fn nested_quant_query() -> QueryGraph {
    build(
        QueryGraphBuilder::new("nested_quant_query")
            .next(typed(1, "Person"))
            .next(quant(2, QuantType::All))
            .legs([
                leg(3, "own", 4, "Dragon"),
                quant(5, QuantType::All).legs([
                    leg(6, "know", 7, "Person"),
                    quant(9, QuantType::All).legs([
                        leg(10, "memberOf", 11, "Guild"),
                        leg(12, "subjectOf", 13, "Kingdom"),
                    ]),
                ]),
                leg(8, "own", 14, "Horse"),
            ]),
    )
}

/// Quantifiers alternating between `all` and `some`; none of them may collapse.
pub fn mixed_quant_query() -> QueryGraph {
    build(
        QueryGraphBuilder::new("mixed_quant_query")
            .next(typed(1, "Person"))
            .next(quant(2, QuantType::All))
            .legs([
                leg(3, "own", 4, "Dragon"),
                quant(5, QuantType::Some).legs([
                    leg(6, "know", 7, "Person"),
                    quant(8, QuantType::All).legs([leg(9, "memberOf", 10, "Guild")]),
                ]),
            ]),
    )
}

/// Person owning a dragon, optionally member of a guild that is subject of a kingdom.
///
/// ```text
/// Person(1) ─ all(10) ┬ -own(2)→ Dragon(3)
///                     └ optional(11) -memberOf(4)→ Guild(5) -subjectOf(6)→ Kingdom(7)
/// ```
pub fn optional_query() -> QueryGraph {
    build(
        QueryGraphBuilder::new("optional_query")
            .next(typed(1, "Person"))
            .next(quant(10, QuantType::All))
            .legs([
                leg(2, "own", 3, "Dragon"),
                optional(11)
                    .next(rel(4, "memberOf", Direction::R))
                    .next(typed(5, "Guild"))
                    .next(rel(6, "subjectOf", Direction::R))
                    .next(typed(7, "Kingdom")),
            ]),
    )
}

fn leg(rel_num: u32, rtype: &str, entity_num: u32, etype: &str) -> Fragment {
    rel(rel_num, rtype, Direction::R).next(typed(entity_num, etype))
}

fn build(builder: QueryGraphBuilder) -> QueryGraph {
    match builder.build() {
        Ok(graph) => graph,
        Err(err) => panic!("malformed fixture graph: {err}"),
    }
}
