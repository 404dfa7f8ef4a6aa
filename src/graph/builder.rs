//! Fluent construction of query graphs.
//!
//! ```
//! use qgplan::graph::{rel, typed, Direction, QueryGraphBuilder};
//!
//! let graph = QueryGraphBuilder::new("people owning dragons")
//!     .next(typed(1, "Person"))
//!     .next(rel(2, "own", Direction::R))
//!     .next(typed(3, "Dragon"))
//!     .build()
//!     .unwrap();
//! assert_eq!(graph.len(), 4);
//! ```

use super::element::{
    ConcreteEntity, Direction, Element, Prop, PropGroup, Quant, QuantType, Rel, TypedEntity,
    UntypedEntity,
};
use super::{ENum, Edge, GraphError, Link, QueryGraph};

/// Subtree under construction.
#[derive(Clone, Debug)]
pub struct Fragment {
    num: ENum,
    element: Element,
    next: Vec<Fragment>,
    branches: Vec<Fragment>,
}

impl Fragment {
    /// Wraps an arbitrary element.
    pub fn new(num: u32, element: Element) -> Self {
        Self {
            num: ENum(num),
            element,
            next: Vec::new(),
            branches: Vec::new(),
        }
    }

    /// Appends `fragment` to the end of this fragment's main chain.
    pub fn next(mut self, fragment: Fragment) -> Self {
        self.tail_mut().next.push(fragment);
        self
    }

    /// Hangs `fragment` below this element (property groups).
    pub fn below(mut self, fragment: Fragment) -> Self {
        self.branches.push(fragment);
        self
    }

    /// Adds quantifier legs to the end of this fragment's main chain.
    pub fn legs(mut self, legs: impl IntoIterator<Item = Fragment>) -> Self {
        self.tail_mut().branches.extend(legs);
        self
    }

    /// Sets the user-facing tag of an entity or relation; other elements are left untouched.
    pub fn tag(mut self, value: &str) -> Self {
        match &mut self.element {
            Element::Typed(TypedEntity { tag, .. })
            | Element::Untyped(UntypedEntity { tag, .. })
            | Element::Concrete(ConcreteEntity { tag, .. })
            | Element::Rel(Rel { tag, .. }) => *tag = Some(value.to_owned()),
            _ => {}
        }
        self
    }

    fn tail_mut(&mut self) -> &mut Fragment {
        let mut current = self;
        while !current.next.is_empty() {
            let last = current.next.len() - 1;
            current = &mut current.next[last];
        }
        current
    }

    fn flatten(self, elements: &mut Vec<(ENum, Element)>, edges: &mut Vec<Edge>) {
        let num = self.num;
        elements.push((num, self.element));
        for child in self.next {
            edges.push((num, Link::Next, child.num));
            child.flatten(elements, edges);
        }
        for child in self.branches {
            edges.push((num, Link::Branch, child.num));
            child.flatten(elements, edges);
        }
    }
}

/// Typed entity fragment.
pub fn typed(num: u32, etype: &str) -> Fragment {
    Fragment::new(
        num,
        Element::Typed(TypedEntity {
            etype: etype.to_owned(),
            tag: None,
        }),
    )
}

/// Untyped entity fragment; an empty type list admits any type.
pub fn untyped(num: u32, vtypes: &[&str]) -> Fragment {
    Fragment::new(
        num,
        Element::Untyped(UntypedEntity {
            vtypes: vtypes.iter().map(|t| (*t).to_owned()).collect(),
            tag: None,
        }),
    )
}

/// Concrete entity fragment.
pub fn concrete(num: u32, etype: &str, id: &str) -> Fragment {
    Fragment::new(
        num,
        Element::Concrete(ConcreteEntity {
            etype: etype.to_owned(),
            id: id.to_owned(),
            name: None,
            tag: None,
        }),
    )
}

/// Relation fragment.
pub fn rel(num: u32, rtype: &str, dir: Direction) -> Fragment {
    Fragment::new(
        num,
        Element::Rel(Rel {
            rtype: rtype.to_owned(),
            dir,
            tag: None,
        }),
    )
}

/// Quantifier fragment; add its legs with [`Fragment::legs`].
pub fn quant(num: u32, qtype: QuantType) -> Fragment {
    Fragment::new(num, Element::Quant(Quant { qtype }))
}

/// Optional marker fragment.
pub fn optional(num: u32) -> Fragment {
    Fragment::new(num, Element::Optional)
}

/// Aggregation marker fragment.
pub fn count(num: u32) -> Fragment {
    Fragment::new(num, Element::Count)
}

/// Entity property group fragment.
pub fn prop_group(num: u32, quant: QuantType, props: Vec<Prop>) -> Fragment {
    Fragment::new(num, Element::PropGroup(PropGroup::new(quant, props)))
}

/// Relation property group fragment.
pub fn rel_prop_group(num: u32, quant: QuantType, props: Vec<Prop>) -> Fragment {
    Fragment::new(num, Element::RelPropGroup(PropGroup::new(quant, props)))
}

/// Builds a [`QueryGraph`] from a chain of fragments hung below an implicit start element
/// numbered `0`.
#[derive(Clone, Debug)]
pub struct QueryGraphBuilder {
    name: String,
    root: Fragment,
}

impl QueryGraphBuilder {
    /// Starts a new graph.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            root: Fragment::new(0, Element::Start),
        }
    }

    /// Appends a fragment to the end of the main chain.
    pub fn next(mut self, fragment: Fragment) -> Self {
        self.root = self.root.next(fragment);
        self
    }

    /// Adds legs to the last fragment of the main chain, usually a quantifier.
    pub fn legs(mut self, legs: impl IntoIterator<Item = Fragment>) -> Self {
        self.root = self.root.legs(legs);
        self
    }

    /// Hangs a fragment below the last fragment of the main chain.
    pub fn below(mut self, fragment: Fragment) -> Self {
        self.root.tail_mut().branches.push(fragment);
        self
    }

    /// Validates and returns the graph.
    pub fn build(self) -> Result<QueryGraph, GraphError> {
        let mut elements = Vec::new();
        let mut edges = Vec::new();
        self.root.flatten(&mut elements, &mut edges);
        QueryGraph::assemble(self.name, elements, edges)
    }
}
