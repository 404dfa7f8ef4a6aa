use qgplan::fixtures;
use qgplan::graph::{
    prop_group, typed, ConstraintOp, ENum, Element, InMemoryOntology, Literal, Ontology,
    Projection, QueryGraph, QueryGraphDoc, QueryGraphBuilder, QuantType,
};
use qgplan::normalize::{
    NormalizationPipeline, NormalizationStrategy, NormalizeContext, QuantAllGroupingStrategy,
};

fn nums(raw: &[u32]) -> Vec<ENum> {
    raw.iter().copied().map(ENum).collect()
}

#[test]
fn nested_all_quantifiers_collapse_into_the_outer_one() {
    let ontology = fixtures::dragons_ontology();
    let ctx = NormalizeContext::new(&ontology);
    let mut graph = fixtures::nested_quant_query();
    NormalizationPipeline::standard(8).run(&mut graph, &ctx);

    assert!(graph.node(5).is_none());
    assert!(graph.node(9).is_none());
    let outer = graph.node(2).expect("outer quantifier");
    assert_eq!(outer.branches.to_vec(), nums(&[3, 6, 10, 12, 8]));
    for leg in [6, 10, 12] {
        let node = graph.node(leg).expect("leg");
        assert_eq!(node.parents.to_vec(), nums(&[2]));
    }
    // every entity and relation survives
    assert_eq!(graph.plannable().len(), 11);
}

#[test]
fn quantifier_flattening_is_idempotent() {
    let ontology = InMemoryOntology::new("empty");
    let ctx = NormalizeContext::new(&ontology);
    for fixture in [
        fixtures::nested_quant_query(),
        fixtures::mixed_quant_query(),
        fixtures::quant_query1(),
    ] {
        let mut once = fixture.clone();
        QuantAllGroupingStrategy.apply(&mut once, &ctx);
        let mut twice = once.clone();
        QuantAllGroupingStrategy.apply(&mut twice, &ctx);
        assert_eq!(once, twice, "{}", fixture.name());
    }
}

#[test]
fn pipeline_reaches_a_fixed_point() {
    let ontology = fixtures::dragons_ontology();
    let ctx = NormalizeContext::new(&ontology);
    let pipeline = NormalizationPipeline::standard(8);
    let mut graph = fixtures::quant_query1();
    let rounds = pipeline.run(&mut graph, &ctx);
    assert!(rounds >= 2);
    let settled = graph.clone();
    assert_eq!(pipeline.run(&mut graph, &ctx), 1);
    assert_eq!(graph, settled);
}

#[test]
fn wildcard_like_filters_are_dropped() {
    let doc = r#"{"name": "wildcards", "elements": [
        {"num": 0, "kind": "start", "next": [1]},
        {"num": 1, "kind": "typed", "etype": "Person", "branches": [101]},
        {"num": 101, "kind": "prop_group", "quant": "all", "props": [
            {"ptype": "name", "con": {"op": "like", "expr": {"t": "String", "v": "**"}}},
            {"ptype": "age", "con": {"op": "gt", "expr": {"t": "Int", "v": 18}}}
        ], "groups": [
            {"quant": "some", "props": [
                {"ptype": "color", "con": {"op": "eq", "expr": {"t": "String", "v": "red"}}},
                {"ptype": "title", "con": {"op": "likeAny",
                    "expr": {"t": "List", "v": [{"t": "String", "v": "Sir*"}, {"t": "String", "v": "*"}]}}}
            ]}
        ]}
    ]}"#;
    let doc: QueryGraphDoc = serde_json::from_str(doc).expect("json");
    let mut graph = QueryGraph::from_doc(doc).expect("graph");
    let ontology = fixtures::dragons_ontology();
    NormalizationPipeline::standard(4).run(&mut graph, &NormalizeContext::new(&ontology));

    let group = graph
        .element(101)
        .and_then(Element::prop_group)
        .expect("group");
    assert_eq!(group.props[0].ptype, "age");
    let con = group.props[0].con.as_ref().expect("constraint");
    assert_eq!(con.op, ConstraintOp::Gt);
    assert_eq!(con.expr, Literal::Int(18));
    assert_eq!(group.props[0].proj, None);

    // nothing was selected, so every Person property is projected
    let selected: Vec<&str> = group.props[1..]
        .iter()
        .filter(|prop| prop.con.is_none() && prop.proj == Some(Projection::Identity))
        .map(|prop| prop.ptype.as_str())
        .collect();
    assert_eq!(selected, ontology.entity_properties("Person"));
    assert_eq!(group.props.len(), 1 + selected.len());

    // the nested `some` group is trivially true, so the `all` parent drops it
    assert!(group.groups.is_empty());
}

#[test]
fn builder_graph_survives_json() {
    let graph = QueryGraphBuilder::new("roundtrip")
        .next(typed(1, "Dragon").below(prop_group(101, QuantType::All, vec![])))
        .build()
        .expect("graph");
    let json = serde_json::to_string(&graph.to_doc()).expect("serialize");
    let doc: QueryGraphDoc = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(QueryGraph::from_doc(doc).expect("graph"), graph);
}
