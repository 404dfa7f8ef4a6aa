//! Ontology lookups used by normalization and query checks.
//!
//! The planner never needs the ontology to order operations, but normalization strategies and
//! the pre-planning checks resolve entity, relation and property type names through it.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::element::Element;
use super::{ENum, QueryGraph};

/// Identifier of an entity or relation type.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeId(pub u32);

/// Identifier of a property type.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropId(pub u32);

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PropId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Provides name-to-identifier resolution for the ontology a query is written against.
pub trait Ontology: Send + Sync {
    /// Ontology name.
    fn name(&self) -> &str;
    /// Resolves an entity type name.
    fn resolve_entity_type(&self, name: &str) -> Option<TypeId>;
    /// Resolves a relation type name.
    fn resolve_relation_type(&self, name: &str) -> Option<TypeId>;
    /// Resolves a property type name.
    fn resolve_property(&self, name: &str) -> Option<PropId>;
    /// Property names declared for an entity type, in declaration order. Empty when the type
    /// is unknown or declares nothing.
    fn entity_properties(&self, etype: &str) -> &[String];
}

/// Simple in-memory ontology used for tests, fixtures and the CLI.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InMemoryOntology {
    name: String,
    entity_types: BTreeMap<String, TypeId>,
    relation_types: BTreeMap<String, TypeId>,
    properties: BTreeMap<String, PropId>,
    entity_properties: BTreeMap<String, Vec<String>>,
}

impl InMemoryOntology {
    /// Creates an empty ontology.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Registers an entity type name with its identifier.
    pub fn with_entity_type(mut self, name: impl Into<String>, id: TypeId) -> Self {
        self.entity_types.insert(name.into(), id);
        self
    }

    /// Registers a relation type name with its identifier.
    pub fn with_relation_type(mut self, name: impl Into<String>, id: TypeId) -> Self {
        self.relation_types.insert(name.into(), id);
        self
    }

    /// Registers a property name with its identifier.
    pub fn with_property(mut self, name: impl Into<String>, id: PropId) -> Self {
        self.properties.insert(name.into(), id);
        self
    }

    /// Declares the properties of an entity type. Properties are registered too when missing.
    pub fn with_entity_properties<I, S>(mut self, etype: impl Into<String>, props: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let props: Vec<String> = props.into_iter().map(Into::into).collect();
        for prop in &props {
            self.learn_property(prop);
        }
        self.entity_properties.insert(etype.into(), props);
        self
    }

    /// Derives an ontology that knows exactly the type names used by `graph`.
    ///
    /// Identifiers are assigned in order of first appearance per category. An entity type
    /// declares the properties its filters mention.
    pub fn from_graph(graph: &QueryGraph) -> Self {
        let mut ontology = Self::new(graph.name());
        for node in graph.nodes() {
            match &node.element {
                Element::Typed(entity) => {
                    ontology.learn_entity(&entity.etype);
                    ontology.learn_entity_properties(graph, node.num, &entity.etype);
                }
                Element::Concrete(entity) => {
                    ontology.learn_entity(&entity.etype);
                    ontology.learn_entity_properties(graph, node.num, &entity.etype);
                }
                Element::Untyped(entity) => {
                    for vtype in &entity.vtypes {
                        ontology.learn_entity(vtype);
                    }
                }
                Element::Rel(rel) => {
                    let next = TypeId(ontology.relation_types.len() as u32);
                    ontology
                        .relation_types
                        .entry(rel.rtype.clone())
                        .or_insert(next);
                }
                Element::PropGroup(group) | Element::RelPropGroup(group) => {
                    group.for_each_prop(&mut |prop| ontology.learn_property(&prop.ptype));
                }
                Element::Start | Element::Quant(_) | Element::Optional | Element::Count => {}
            }
        }
        ontology
    }

    fn learn_entity(&mut self, name: &str) {
        let next = TypeId(self.entity_types.len() as u32);
        self.entity_types.entry(name.to_owned()).or_insert(next);
    }

    fn learn_property(&mut self, name: &str) {
        let next = PropId(self.properties.len() as u32);
        self.properties.entry(name.to_owned()).or_insert(next);
    }

    fn learn_entity_properties(&mut self, graph: &QueryGraph, entity: ENum, etype: &str) {
        let declared = self.entity_properties.entry(etype.to_owned()).or_default();
        for group in graph.entity_filters(entity) {
            if let Some(group) = graph.element(group).and_then(Element::prop_group) {
                group.for_each_prop(&mut |prop| {
                    if !declared.contains(&prop.ptype) {
                        declared.push(prop.ptype.clone());
                    }
                });
            }
        }
    }
}

impl Ontology for InMemoryOntology {
    fn name(&self) -> &str {
        &self.name
    }

    fn resolve_entity_type(&self, name: &str) -> Option<TypeId> {
        self.entity_types.get(name).copied()
    }

    fn resolve_relation_type(&self, name: &str) -> Option<TypeId> {
        self.relation_types.get(name).copied()
    }

    fn resolve_property(&self, name: &str) -> Option<PropId> {
        self.properties.get(name).copied()
    }

    fn entity_properties(&self, etype: &str) -> &[String] {
        self.entity_properties
            .get(etype)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}
