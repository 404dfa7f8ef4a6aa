use crate::graph::QueryGraph;

use super::{NormalizationStrategy, NormalizeContext};

/// Merges `all` quantifiers that directly descend from another `all` quantifier.
///
/// The child's branches take its place in the parent's child list, so
/// `Q(all){a, Q(all){b, c}, d}` becomes `Q(all){a, b, c, d}`.
#[derive(Clone, Copy, Debug, Default)]
pub struct QuantAllGroupingStrategy;

impl NormalizationStrategy for QuantAllGroupingStrategy {
    fn name(&self) -> &'static str {
        "QuantAllGroupingStrategy"
    }

    fn apply(&self, graph: &mut QueryGraph, _ctx: &NormalizeContext<'_>) {
        loop {
            let merge = graph
                .elements(|node| node.element.is_quant_all())
                .into_iter()
                .find_map(|parent| {
                    graph.children(parent).into_iter().find(|child| {
                        graph
                            .element(*child)
                            .is_some_and(|element| element.is_quant_all())
                    })
                });
            let Some(child) = merge else {
                break;
            };
            if graph.splice_out(child).is_err() {
                break;
            }
        }
    }
}
