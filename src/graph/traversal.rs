//! Read-only navigation over a [`QueryGraph`].
//!
//! All helpers take element numbers and return numbers; absent numbers simply yield empty
//! results. Child order is always `next` before `branches`.

use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use super::element::Element;
use super::{ENum, QueryGraph, QueryNode};

impl QueryGraph {
    /// Children of `num` in document order.
    pub fn children(&self, num: ENum) -> SmallVec<[ENum; 4]> {
        self.node(num)
            .map(|node| node.children().collect())
            .unwrap_or_default()
    }

    /// Elements matching `pred`, in pre-order from start.
    pub fn elements(&self, pred: impl Fn(&QueryNode) -> bool) -> Vec<ENum> {
        let mut out = Vec::new();
        let mut seen = FxHashSet::default();
        let mut stack = vec![self.start()];
        while let Some(num) = stack.pop() {
            if !seen.insert(num) {
                continue;
            }
            let Some(node) = self.node(num) else {
                continue;
            };
            if pred(node) {
                out.push(num);
            }
            let children: SmallVec<[ENum; 4]> = node.children().collect();
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// Entity numbers in pre-order.
    pub fn entities(&self) -> Vec<ENum> {
        self.elements(|node| node.element.is_entity())
    }

    /// Numbers of every element a complete plan must realize.
    pub fn plannable(&self) -> Vec<ENum> {
        self.elements(|node| !node.element.is_control())
    }

    /// Nearest descendant matching `pred`. Direct children are tested before any of them is
    /// descended into.
    pub fn next_descendant(
        &self,
        num: ENum,
        pred: impl Fn(&QueryNode) -> bool,
    ) -> Option<ENum> {
        self.next_descendant_dyn(num, &pred)
    }

    fn next_descendant_dyn(
        &self,
        num: ENum,
        pred: &dyn Fn(&QueryNode) -> bool,
    ) -> Option<ENum> {
        let node = self.node(num)?;
        for child in node.children() {
            if self.node(child).is_some_and(pred) {
                return Some(child);
            }
        }
        node.children()
            .find_map(|child| self.next_descendant_dyn(child, pred))
    }

    /// Every descendant matching `pred`, in pre-order.
    pub fn next_descendants(&self, num: ENum, pred: impl Fn(&QueryNode) -> bool) -> Vec<ENum> {
        let mut out = Vec::new();
        let mut seen = FxHashSet::default();
        let mut stack: Vec<ENum> = self.children(num).into_iter().rev().collect();
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            let Some(node) = self.node(current) else {
                continue;
            };
            if pred(node) {
                out.push(current);
            }
            let children: SmallVec<[ENum; 4]> = node.children().collect();
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// Nearest ancestor matching `pred`, following first parents.
    pub fn ancestor(&self, num: ENum, pred: impl Fn(&QueryNode) -> bool) -> Option<ENum> {
        let mut current = self.node(num)?.parents.first().copied();
        while let Some(parent) = current {
            let node = self.node(parent)?;
            if pred(node) {
                return Some(parent);
            }
            current = node.parents.first().copied();
        }
        None
    }

    /// True when the element has no main-chain continuation and is not a branch container.
    pub fn is_leaf(&self, num: ENum) -> bool {
        self.node(num)
            .is_some_and(|node| node.next.is_empty() && !node.element.is_container())
    }

    /// Simple path between two elements, walking the graph in either direction.
    ///
    /// Returns `[from, .., to]`, `[from]` when both are equal, and an empty vector when either
    /// element is absent.
    pub fn path(&self, from: ENum, to: ENum) -> Vec<ENum> {
        if self.node(from).is_none() || self.node(to).is_none() {
            return Vec::new();
        }
        let mut path = vec![from];
        let mut seen = FxHashSet::default();
        seen.insert(from);
        if self.path_dfs(to, &mut path, &mut seen) {
            path
        } else {
            Vec::new()
        }
    }

    fn path_dfs(&self, to: ENum, path: &mut Vec<ENum>, seen: &mut FxHashSet<ENum>) -> bool {
        let Some(&current) = path.last() else {
            return false;
        };
        if current == to {
            return true;
        }
        let Some(node) = self.node(current) else {
            return false;
        };
        let neighbours: SmallVec<[ENum; 6]> =
            node.children().chain(node.parents.iter().copied()).collect();
        for next in neighbours {
            if !seen.insert(next) {
                continue;
            }
            path.push(next);
            if self.path_dfs(to, path, seen) {
                return true;
            }
            path.pop();
        }
        false
    }

    /// First interior element of `path(from, to)` matching `pred`.
    pub fn first_in_path(
        &self,
        from: ENum,
        to: ENum,
        pred: impl Fn(&QueryNode) -> bool,
    ) -> Option<ENum> {
        let path = self.path(from, to);
        if path.len() < 3 {
            return None;
        }
        path[1..path.len() - 1]
            .iter()
            .copied()
            .find(|num| self.node(*num).is_some_and(&pred))
    }

    /// True when `a` and `b` are connected through control elements only.
    pub fn is_adjacent(&self, a: ENum, b: ENum) -> bool {
        let path = self.path(a, b);
        path.len() >= 2
            && path[1..path.len() - 1]
                .iter()
                .all(|num| self.node(*num).is_some_and(|n| n.element.is_control()))
    }

    /// Entity the relation hangs from.
    pub fn rel_source(&self, rel: ENum) -> Option<ENum> {
        self.ancestor(rel, |node| node.element.is_entity())
    }

    /// Entity the relation leads to.
    pub fn rel_target(&self, rel: ENum) -> Option<ENum> {
        self.next_descendant(rel, |node| node.element.is_entity())
    }

    /// True when `entity` is one of the relation's endpoints.
    pub fn is_rel_endpoint(&self, rel: ENum, entity: ENum) -> bool {
        self.rel_source(rel) == Some(entity) || self.rel_target(rel) == Some(entity)
    }

    /// Entity or relation a property group filters.
    pub fn group_owner(&self, group: ENum) -> Option<ENum> {
        self.ancestor(group, |node| node.element.is_entity() || node.element.is_rel())
    }

    /// Entity property groups of `entity`, reached directly or through quantifiers only.
    pub fn entity_filters(&self, entity: ENum) -> SmallVec<[ENum; 2]> {
        let mut out = SmallVec::new();
        self.collect_entity_filters(entity, &mut out);
        out
    }

    fn collect_entity_filters(&self, num: ENum, out: &mut SmallVec<[ENum; 2]>) {
        for child in self.children(num) {
            match self.element(child) {
                Some(Element::PropGroup(_)) => out.push(child),
                Some(Element::Quant(_)) => self.collect_entity_filters(child, out),
                _ => {}
            }
        }
    }

    /// Relation property groups hung below `rel`.
    pub fn rel_filters(&self, rel: ENum) -> SmallVec<[ENum; 2]> {
        self.children(rel)
            .into_iter()
            .filter(|child| matches!(self.element(*child), Some(Element::RelPropGroup(_))))
            .collect()
    }

    /// Outermost optional marker above `num`, if any.
    pub fn optional_scope(&self, num: ENum) -> Option<ENum> {
        let mut scope = None;
        let mut current = self.node(num)?.parents.first().copied();
        while let Some(parent) = current {
            let node = self.node(parent)?;
            if matches!(node.element, Element::Optional) {
                scope = Some(parent);
            }
            current = node.parents.first().copied();
        }
        scope
    }
}
