//! Flat serialized form of a query graph.
//!
//! A document is an ordered list of element records, each carrying its number, its payload and
//! the numbers of its `next` and `branches` children:
//!
//! ```json
//! {"name": "q1", "elements": [
//!   {"num": 0, "kind": "start", "next": [1]},
//!   {"num": 1, "kind": "typed", "etype": "Person", "next": [2]},
//!   {"num": 2, "kind": "rel", "rtype": "own", "dir": "R", "next": [3]},
//!   {"num": 3, "kind": "typed", "etype": "Dragon"}
//! ]}
//! ```

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use super::element::Element;
use super::{ENum, GraphError, Link, QueryGraph};

/// One serialized element.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElementRecord {
    /// Element number.
    pub num: ENum,
    /// Element payload, flattened into the record.
    #[serde(flatten)]
    pub element: Element,
    /// Main-chain children.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub next: Vec<ENum>,
    /// Below/leg children.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub branches: Vec<ENum>,
}

/// Serialized query graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryGraphDoc {
    /// Query name.
    #[serde(default)]
    pub name: String,
    /// Element records.
    pub elements: Vec<ElementRecord>,
}

impl QueryGraph {
    /// Rebuilds a graph from its serialized form, validating its shape.
    pub fn from_doc(doc: QueryGraphDoc) -> Result<Self, GraphError> {
        let mut elements = Vec::with_capacity(doc.elements.len());
        let mut edges = Vec::new();
        for record in doc.elements {
            for child in &record.next {
                edges.push((record.num, Link::Next, *child));
            }
            for child in &record.branches {
                edges.push((record.num, Link::Branch, *child));
            }
            elements.push((record.num, record.element));
        }
        QueryGraph::assemble(doc.name, elements, edges)
    }

    /// Parses a JSON document and rebuilds the graph from it.
    pub fn from_json(raw: &str) -> crate::Result<Self> {
        let doc: QueryGraphDoc = serde_json::from_str(raw)?;
        Ok(Self::from_doc(doc)?)
    }

    /// Serializes the graph; records are emitted in traversal order from start.
    pub fn to_doc(&self) -> QueryGraphDoc {
        let mut elements = Vec::with_capacity(self.len());
        let mut seen = FxHashSet::default();
        let mut stack = vec![self.start()];
        while let Some(num) = stack.pop() {
            if !seen.insert(num) {
                continue;
            }
            let Some(node) = self.node(num) else {
                continue;
            };
            elements.push(ElementRecord {
                num,
                element: node.element.clone(),
                next: node.next.to_vec(),
                branches: node.branches.to_vec(),
            });
            let children: Vec<ENum> = node.children().collect();
            stack.extend(children.into_iter().rev());
        }
        QueryGraphDoc {
            name: self.name().to_owned(),
            elements,
        }
    }
}
