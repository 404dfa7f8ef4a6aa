#![forbid(unsafe_code)]

//! Query graph model.
//!
//! A query graph is a rooted DAG of numbered elements. Each node keeps two ordered child lists:
//! `next` (the main chain) and `branches` (property groups hung below an element and the legs
//! of a quantifier), plus a back-reference list of parents. Nodes live in an arena keyed by their
//! [`ENum`], so navigation never chases pointers.

mod builder;
mod element;
mod ontology;
mod serial;
mod traversal;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

pub use builder::{
    concrete, count, optional, prop_group, quant, rel, rel_prop_group, typed, untyped, Fragment,
    QueryGraphBuilder,
};
pub use element::{
    ConcreteEntity, Constraint, ConstraintOp, Direction, Element, ElementTag, Literal, Projection,
    Prop, PropGroup, Quant, QuantType, Rel, TypedEntity, UntypedEntity,
};
pub use ontology::{InMemoryOntology, Ontology, PropId, TypeId};
pub use serial::{ElementRecord, QueryGraphDoc};

/// Identifier of a query graph element, unique within its graph.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ENum(pub u32);

impl fmt::Display for ENum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ENum {
    fn from(value: u32) -> Self {
        ENum(value)
    }
}

/// Child list of a node.
pub type Children = SmallVec<[ENum; 4]>;

/// Which child list of a node an edge belongs to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Link {
    /// Main chain.
    Next,
    /// Property groups and quantifier legs.
    Branch,
}

/// Arena node.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryNode {
    /// Element identifier.
    pub num: ENum,
    /// Element payload.
    pub element: Element,
    /// Ordered main-chain children.
    pub next: Children,
    /// Ordered below/leg children.
    pub branches: Children,
    /// Parents, first parent first.
    pub parents: SmallVec<[ENum; 2]>,
}

impl QueryNode {
    fn new(num: ENum, element: Element) -> Self {
        Self {
            num,
            element,
            next: Children::new(),
            branches: Children::new(),
            parents: SmallVec::new(),
        }
    }

    /// Children in document order: `next` first, then `branches`.
    pub fn children(&self) -> impl Iterator<Item = ENum> + '_ {
        self.next.iter().chain(self.branches.iter()).copied()
    }
}

/// Errors raised while constructing a query graph.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Two elements share the same number.
    #[error("element number {num} is used more than once")]
    DuplicateNum {
        /// Offending number.
        num: ENum,
    },
    /// An element refers to a child that does not exist.
    #[error("element {from} references missing element {to}")]
    DanglingReference {
        /// Referencing element.
        from: ENum,
        /// Missing child.
        to: ENum,
    },
    /// No `start` element was supplied.
    #[error("query graph has no start element")]
    MissingStart,
    /// More than one `start` element was supplied.
    #[error("query graph has more than one start element ({first} and {second})")]
    MultipleStarts {
        /// First start seen.
        first: ENum,
        /// Second start seen.
        second: ENum,
    },
    /// The start element has a parent.
    #[error("start element {num} must not have a parent")]
    StartHasParent {
        /// Start number.
        num: ENum,
    },
    /// A cycle passes through the element.
    #[error("query graph contains a cycle through element {num}")]
    Cycle {
        /// Element on the cycle.
        num: ENum,
    },
    /// The element cannot be reached from start.
    #[error("element {num} is not reachable from start")]
    Unreachable {
        /// Unreachable element.
        num: ENum,
    },
    /// A mutation targeted an element that does not exist.
    #[error("unknown element {num}")]
    UnknownElement {
        /// Requested number.
        num: ENum,
    },
}

impl GraphError {
    /// Returns a machine-readable code for the error variant.
    pub fn code(&self) -> &'static str {
        match self {
            GraphError::DuplicateNum { .. } => "DuplicateNum",
            GraphError::DanglingReference { .. } => "DanglingReference",
            GraphError::MissingStart => "MissingStart",
            GraphError::MultipleStarts { .. } => "MultipleStarts",
            GraphError::StartHasParent { .. } => "StartHasParent",
            GraphError::Cycle { .. } => "Cycle",
            GraphError::Unreachable { .. } => "Unreachable",
            GraphError::UnknownElement { .. } => "UnknownElement",
        }
    }
}

/// Rooted query graph.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryGraph {
    name: String,
    start: ENum,
    nodes: BTreeMap<ENum, QueryNode>,
}

/// Edge description used while assembling a graph: `(from, link, to)`.
pub(crate) type Edge = (ENum, Link, ENum);

impl QueryGraph {
    /// Assembles and validates a graph from elements and ordered edges.
    ///
    /// Edges are applied in the order given, which fixes the order of child lists.
    pub(crate) fn assemble(
        name: String,
        elements: Vec<(ENum, Element)>,
        edges: Vec<Edge>,
    ) -> Result<Self, GraphError> {
        let mut nodes = BTreeMap::new();
        let mut start: Option<ENum> = None;
        for (num, element) in elements {
            if matches!(element, Element::Start) {
                if let Some(first) = start {
                    return Err(GraphError::MultipleStarts { first, second: num });
                }
                start = Some(num);
            }
            if nodes.insert(num, QueryNode::new(num, element)).is_some() {
                return Err(GraphError::DuplicateNum { num });
            }
        }
        let start = start.ok_or(GraphError::MissingStart)?;
        for (from, link, to) in edges {
            if !nodes.contains_key(&to) {
                return Err(GraphError::DanglingReference { from, to });
            }
            let parent = nodes
                .get_mut(&from)
                .ok_or(GraphError::UnknownElement { num: from })?;
            match link {
                Link::Next => parent.next.push(to),
                Link::Branch => parent.branches.push(to),
            }
            if let Some(child) = nodes.get_mut(&to) {
                if !child.parents.contains(&from) {
                    child.parents.push(from);
                }
            }
        }
        let graph = Self { name, start, nodes };
        graph.check_shape()?;
        Ok(graph)
    }

    fn check_shape(&self) -> Result<(), GraphError> {
        if let Some(node) = self.nodes.get(&self.start) {
            if !node.parents.is_empty() {
                return Err(GraphError::StartHasParent { num: self.start });
            }
        }
        // 0 = unvisited, 1 = on the current DFS stack, 2 = done
        let mut state: BTreeMap<ENum, u8> = BTreeMap::new();
        let mut stack: Vec<(ENum, usize)> = vec![(self.start, 0)];
        state.insert(self.start, 1);
        while let Some((num, idx)) = stack.pop() {
            let Some(node) = self.nodes.get(&num) else {
                continue;
            };
            let child = node.next.iter().chain(node.branches.iter()).nth(idx);
            match child {
                Some(&child) => {
                    stack.push((num, idx + 1));
                    match state.get(&child).copied().unwrap_or(0) {
                        0 => {
                            state.insert(child, 1);
                            stack.push((child, 0));
                        }
                        1 => return Err(GraphError::Cycle { num: child }),
                        _ => {}
                    }
                }
                None => {
                    state.insert(num, 2);
                }
            }
        }
        if let Some(num) = self.nodes.keys().find(|num| !state.contains_key(num)) {
            return Err(GraphError::Unreachable { num: *num });
        }
        Ok(())
    }

    /// Query name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of the start element.
    pub fn start(&self) -> ENum {
        self.start
    }

    /// Number of elements, control markers included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the graph holds nothing but the start element.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Looks up a node.
    pub fn node(&self, num: impl Into<ENum>) -> Option<&QueryNode> {
        self.nodes.get(&num.into())
    }

    /// Looks up the element of a node.
    pub fn element(&self, num: impl Into<ENum>) -> Option<&Element> {
        self.node(num).map(|node| &node.element)
    }

    /// Mutable access to an element payload. Structure is only changed through dedicated
    /// methods such as [`QueryGraph::splice_out`].
    pub fn element_mut(&mut self, num: impl Into<ENum>) -> Option<&mut Element> {
        self.nodes.get_mut(&num.into()).map(|node| &mut node.element)
    }

    /// All nodes in ascending number order.
    pub fn nodes(&self) -> impl Iterator<Item = &QueryNode> + '_ {
        self.nodes.values()
    }

    /// Tag of an element, [`ElementTag::Unknown`] if absent.
    pub fn tag_of(&self, num: impl Into<ENum>) -> ElementTag {
        self.element(num)
            .map(Element::tag)
            .unwrap_or(ElementTag::Unknown)
    }

    /// Removes `num` from the graph, moving its children into the slot it occupied in each
    /// parent's child list. The start element cannot be removed.
    pub fn splice_out(&mut self, num: ENum) -> Result<(), GraphError> {
        if num == self.start {
            return Err(GraphError::UnknownElement { num });
        }
        let node = self
            .nodes
            .remove(&num)
            .ok_or(GraphError::UnknownElement { num })?;
        let moved: Children = node.children().collect();
        for parent in &node.parents {
            let Some(parent_node) = self.nodes.get_mut(parent) else {
                continue;
            };
            for list in [&mut parent_node.next, &mut parent_node.branches] {
                if let Some(pos) = list.iter().position(|n| *n == num) {
                    list.remove(pos);
                    for (offset, child) in moved.iter().enumerate() {
                        list.insert(pos + offset, *child);
                    }
                }
            }
        }
        for child in &moved {
            if let Some(child_node) = self.nodes.get_mut(child) {
                child_node.parents.retain(|p| *p != num);
                for parent in &node.parents {
                    if !child_node.parents.contains(parent) {
                        child_node.parents.push(*parent);
                    }
                }
            }
        }
        Ok(())
    }
}
