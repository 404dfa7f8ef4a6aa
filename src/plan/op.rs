//! Plan operations and plans.
//!
//! A [`Plan`] is an ordered sequence of [`PlanOp`]s. Every op except a join references exactly
//! one query graph element, its [`Origin`]. A join embeds two complete sub-plans.

use std::fmt;

use rustc_hash::FxHashSet;
use xxhash_rust::xxh64::Xxh64;

use crate::graph::{ENum, ElementTag, QueryGraph};

/// Query graph element an op realizes, with its tag captured for descriptions.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Origin {
    /// Element number.
    pub num: ENum,
    /// Element classification.
    pub tag: ElementTag,
}

impl Origin {
    /// Builds an origin for `num`, looking its tag up in `graph`.
    pub fn of(graph: &QueryGraph, num: impl Into<ENum>) -> Self {
        let num = num.into();
        Self {
            num,
            tag: graph.tag_of(num),
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.tag, self.num)
    }
}

/// Two sub-plans meeting at a shared pivot entity.
#[derive(Clone, Debug, PartialEq)]
pub struct EntityJoin {
    /// Left branch.
    pub left: Plan,
    /// Right branch.
    pub right: Plan,
    /// Whether the right branch has reached the pivot.
    pub complete: bool,
}

/// One step of a plan.
#[derive(Clone, Debug, PartialEq)]
pub enum PlanOp {
    /// Scan an entity.
    Entity {
        /// Entity element.
        origin: Origin,
    },
    /// Traverse a relation, against its query direction when `reversed`.
    Relation {
        /// Relation element.
        origin: Origin,
        /// True when traversed from the relation's target to its source.
        reversed: bool,
    },
    /// Apply an entity property group.
    EntityFilter {
        /// Property group element.
        origin: Origin,
    },
    /// Apply a relation property group.
    RelationFilter {
        /// Property group element.
        origin: Origin,
    },
    /// Jump back to an entity visited earlier.
    GoToEntity {
        /// Entity element.
        origin: Origin,
    },
    /// Join two sub-plans.
    EntityJoin(Box<EntityJoin>),
}

impl PlanOp {
    /// `Entity` op for `num`.
    pub fn entity(graph: &QueryGraph, num: impl Into<ENum>) -> Self {
        PlanOp::Entity {
            origin: Origin::of(graph, num),
        }
    }

    /// Forward `Relation` op for `num`.
    pub fn relation(graph: &QueryGraph, num: impl Into<ENum>) -> Self {
        PlanOp::Relation {
            origin: Origin::of(graph, num),
            reversed: false,
        }
    }

    /// Reversed `Relation` op for `num`.
    pub fn relation_reversed(graph: &QueryGraph, num: impl Into<ENum>) -> Self {
        PlanOp::Relation {
            origin: Origin::of(graph, num),
            reversed: true,
        }
    }

    /// `EntityFilter` op for `num`.
    pub fn entity_filter(graph: &QueryGraph, num: impl Into<ENum>) -> Self {
        PlanOp::EntityFilter {
            origin: Origin::of(graph, num),
        }
    }

    /// `RelationFilter` op for `num`.
    pub fn relation_filter(graph: &QueryGraph, num: impl Into<ENum>) -> Self {
        PlanOp::RelationFilter {
            origin: Origin::of(graph, num),
        }
    }

    /// `GoToEntity` op for `num`.
    pub fn goto(graph: &QueryGraph, num: impl Into<ENum>) -> Self {
        PlanOp::GoToEntity {
            origin: Origin::of(graph, num),
        }
    }

    /// Join of two sub-plans.
    pub fn join(left: Plan, right: Plan, complete: bool) -> Self {
        PlanOp::EntityJoin(Box::new(EntityJoin {
            left,
            right,
            complete,
        }))
    }

    /// Origin of a non-join op.
    pub fn origin(&self) -> Option<Origin> {
        match self {
            PlanOp::Entity { origin }
            | PlanOp::Relation { origin, .. }
            | PlanOp::EntityFilter { origin }
            | PlanOp::RelationFilter { origin }
            | PlanOp::GoToEntity { origin } => Some(*origin),
            PlanOp::EntityJoin(_) => None,
        }
    }

    /// Origin number of a non-join op.
    pub fn num(&self) -> Option<ENum> {
        self.origin().map(|origin| origin.num)
    }

    /// Join payload, if this op is a join.
    pub fn as_join(&self) -> Option<&EntityJoin> {
        match self {
            PlanOp::EntityJoin(join) => Some(&**join),
            _ => None,
        }
    }

    /// Op kind name used in descriptions.
    pub fn kind(&self) -> &'static str {
        match self {
            PlanOp::Entity { .. } => "EntityOp",
            PlanOp::Relation { .. } => "RelationOp",
            PlanOp::EntityFilter { .. } => "EntityFilterOp",
            PlanOp::RelationFilter { .. } => "RelationFilterOp",
            PlanOp::GoToEntity { .. } => "GoToEntityOp",
            PlanOp::EntityJoin(_) => "EntityJoinOp",
        }
    }
}

impl fmt::Display for PlanOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanOp::Relation {
                origin,
                reversed: true,
            } => write!(f, "{}({origin},reversed)", self.kind()),
            PlanOp::EntityJoin(join) => write!(f, "{}({},{})", self.kind(), join.left, join.right),
            other => match other.origin() {
                Some(origin) => write!(f, "{}({origin})", other.kind()),
                None => f.write_str(other.kind()),
            },
        }
    }
}

/// Ordered sequence of plan operations.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Plan {
    ops: Vec<PlanOp>,
}

impl Plan {
    /// Wraps a list of ops.
    pub fn new(ops: Vec<PlanOp>) -> Self {
        Self { ops }
    }

    /// Top-level ops.
    pub fn ops(&self) -> &[PlanOp] {
        &self.ops
    }

    /// Number of top-level ops.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// True when the plan has no op.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// A copy of this plan with `ops` appended.
    pub fn extended(&self, ops: impl IntoIterator<Item = PlanOp>) -> Plan {
        let mut next = self.clone();
        next.ops.extend(ops);
        next
    }

    /// Non-join ops in execution order, descending into join branches left first.
    pub fn flat_ops(&self) -> Vec<&PlanOp> {
        let mut out = Vec::with_capacity(self.ops.len());
        self.collect_flat(&mut out);
        out
    }

    fn collect_flat<'a>(&'a self, out: &mut Vec<&'a PlanOp>) {
        for op in &self.ops {
            match op {
                PlanOp::EntityJoin(join) => {
                    join.left.collect_flat(out);
                    join.right.collect_flat(out);
                }
                other => out.push(other),
            }
        }
    }

    /// Number of flattened ops.
    pub fn flat_len(&self) -> usize {
        self.flat_ops().len()
    }

    /// Origins of every flattened op: the elements this plan already realizes.
    pub fn handled(&self) -> FxHashSet<ENum> {
        self.flat_ops().into_iter().filter_map(PlanOp::num).collect()
    }

    /// Entities scanned by the plan, joins included.
    pub fn visited_entities(&self) -> FxHashSet<ENum> {
        self.flat_ops()
            .into_iter()
            .filter_map(|op| match op {
                PlanOp::Entity { origin } => Some(origin.num),
                _ => None,
            })
            .collect()
    }

    /// First scanned entity, the plan's starting point.
    pub fn first_entity(&self) -> Option<ENum> {
        self.flat_ops().into_iter().find_map(|op| match op {
            PlanOp::Entity { origin } => Some(origin.num),
            _ => None,
        })
    }

    /// Last scanned entity.
    pub fn last_entity(&self) -> Option<ENum> {
        self.flat_ops().into_iter().rev().find_map(|op| match op {
            PlanOp::Entity { origin } => Some(origin.num),
            _ => None,
        })
    }

    /// Entity the plan currently stands on: the target of the last top-level `Entity` or
    /// `GoToEntity`, provided only entity filters follow it.
    pub fn position(&self) -> Option<ENum> {
        for op in self.ops.iter().rev() {
            match op {
                PlanOp::EntityFilter { .. } => continue,
                PlanOp::Entity { origin } | PlanOp::GoToEntity { origin } => {
                    return Some(origin.num)
                }
                _ => return None,
            }
        }
        None
    }

    /// Top-level joins.
    pub fn joins(&self) -> impl Iterator<Item = &EntityJoin> + '_ {
        self.ops.iter().filter_map(PlanOp::as_join)
    }

    /// True when every plannable element is realized and every join, at any depth, is
    /// complete.
    pub fn is_complete(&self, graph: &QueryGraph) -> bool {
        let handled = self.handled();
        self.joins_complete() && graph.plannable().iter().all(|num| handled.contains(num))
    }

    fn joins_complete(&self) -> bool {
        self.joins()
            .all(|join| join.complete && join.left.joins_complete() && join.right.joins_complete())
    }

    /// Stable 64-bit hash of the plan description.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = Xxh64::new(0);
        hasher.update(self.to_string().as_bytes());
        hasher.digest()
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Plan[[")?;
        for (idx, op) in self.ops.iter().enumerate() {
            if idx > 0 {
                f.write_str(":")?;
            }
            write!(f, "{op}")?;
        }
        f.write_str("]]")
    }
}

impl From<Vec<PlanOp>> for Plan {
    fn from(ops: Vec<PlanOp>) -> Self {
        Plan::new(ops)
    }
}
