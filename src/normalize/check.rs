//! Structural and ontology checks run on a normalized query graph before planning.

use crate::graph::{ENum, Element, Ontology, QueryGraph};
use crate::validation::ValidationResult;

/// Validates a whole query graph.
pub trait QueryGraphValidator: Send + Sync {
    /// Rule name, prefixed to every error.
    fn name(&self) -> &'static str;

    /// Checks the graph.
    fn validate(&self, graph: &QueryGraph, ontology: &dyn Ontology) -> ValidationResult;
}

/// The start element leads into the query through a single entity or quantifier. A query
/// holding nothing but its start element is rejected.
#[derive(Clone, Copy, Debug, Default)]
pub struct StartElementValidator;

impl QueryGraphValidator for StartElementValidator {
    fn name(&self) -> &'static str {
        "StartElementValidator"
    }

    fn validate(&self, graph: &QueryGraph, _ontology: &dyn Ontology) -> ValidationResult {
        let mut errors = Vec::new();
        let Some(start) = graph.node(graph.start()) else {
            return ValidationResult::invalid(self.name(), ["start element missing".to_string()]);
        };
        if start.next.is_empty() && start.branches.is_empty() {
            return ValidationResult::invalid(
                self.name(),
                [format!("query holds only the start element {}", start.num)],
            );
        }
        if !start.branches.is_empty() {
            errors.push(format!("start element {} has branches", start.num));
        }
        if start.next.len() > 1 {
            errors.push(format!(
                "start element {} has {} successors, expected one",
                start.num,
                start.next.len()
            ));
        }
        for child in &start.next {
            match graph.element(*child) {
                Some(element) if element.is_entity() || element.is_quant() => {}
                Some(element) => errors.push(format!(
                    "start element is followed by {}({child}), expected an entity",
                    element.tag()
                )),
                None => errors.push(format!("start element is followed by missing {child}")),
            }
        }
        ValidationResult::from_errors(self.name(), errors)
    }
}

/// Every type and property name the graph uses is known to the ontology.
#[derive(Clone, Copy, Debug, Default)]
pub struct OntologyTypeValidator;

impl QueryGraphValidator for OntologyTypeValidator {
    fn name(&self) -> &'static str {
        "OntologyTypeValidator"
    }

    fn validate(&self, graph: &QueryGraph, ontology: &dyn Ontology) -> ValidationResult {
        let mut errors = Vec::new();
        let mut entity_type = |num: ENum, name: &str| {
            if ontology.resolve_entity_type(name).is_none() {
                errors.push(format!("unknown entity type '{name}' at element {num}"));
            }
        };
        for node in graph.nodes() {
            match &node.element {
                Element::Typed(entity) => entity_type(node.num, &entity.etype),
                Element::Concrete(entity) => entity_type(node.num, &entity.etype),
                Element::Untyped(entity) => {
                    for vtype in &entity.vtypes {
                        entity_type(node.num, vtype);
                    }
                }
                _ => {}
            }
        }
        for node in graph.nodes() {
            match &node.element {
                Element::Rel(rel) if ontology.resolve_relation_type(&rel.rtype).is_none() => {
                    errors.push(format!(
                        "unknown relation type '{}' at element {}",
                        rel.rtype, node.num
                    ));
                }
                Element::PropGroup(group) | Element::RelPropGroup(group) => {
                    group.for_each_prop(&mut |prop| {
                        if ontology.resolve_property(&prop.ptype).is_none() {
                            errors.push(format!(
                                "unknown property '{}' at element {}",
                                prop.ptype, node.num
                            ));
                        }
                    });
                }
                _ => {}
            }
        }
        ValidationResult::from_errors(self.name(), errors)
    }
}

/// Runs every pre-planning check and merges their results.
pub fn check(graph: &QueryGraph, ontology: &dyn Ontology) -> ValidationResult {
    let validators: [&dyn QueryGraphValidator; 2] =
        [&StartElementValidator, &OntologyTypeValidator];
    let mut result = ValidationResult::ok();
    for validator in validators {
        result.merge(validator.validate(graph, ontology));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::graph::{rel, typed, Direction, QueryGraphBuilder};

    #[test]
    fn fixture_queries_pass_against_dragons() {
        let ontology = fixtures::dragons_ontology();
        for graph in [fixtures::simple_query1(), fixtures::quant_query1()] {
            let result = check(&graph, &ontology);
            assert!(result.is_valid(), "{result}");
        }
    }

    #[test]
    fn unknown_types_are_reported() {
        let graph = QueryGraphBuilder::new("bad")
            .next(typed(1, "Unicorn"))
            .next(rel(2, "ride", Direction::R))
            .next(typed(3, "Dragon"))
            .build()
            .expect("valid graph");
        let result = check(&graph, &fixtures::dragons_ontology());
        assert!(!result.is_valid());
        assert_eq!(
            result.errors(),
            &[
                "OntologyTypeValidator: unknown entity type 'Unicorn' at element 1",
                "OntologyTypeValidator: unknown relation type 'ride' at element 2",
            ]
        );
    }

    #[test]
    fn start_must_lead_to_an_entity() {
        let graph = QueryGraphBuilder::new("rel first")
            .next(rel(1, "own", Direction::R))
            .next(typed(2, "Dragon"))
            .build()
            .expect("valid graph");
        let result = StartElementValidator.validate(&graph, &fixtures::dragons_ontology());
        assert!(!result.is_valid());
        assert!(result.errors()[0]
            .starts_with("StartElementValidator: start element is followed by Rel(1)"));
    }

    #[test]
    fn start_only_query_is_rejected() {
        let graph = QueryGraphBuilder::new("nothing").build().expect("valid graph");
        let result = check(&graph, &fixtures::dragons_ontology());
        assert!(!result.is_valid());
        assert_eq!(
            result.errors(),
            &["StartElementValidator: query holds only the start element 0"]
        );
    }
}
