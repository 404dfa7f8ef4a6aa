use crate::graph::{ConstraintOp, Element, Literal, Prop, PropGroup, QuantType, QueryGraph};

use super::{NormalizationStrategy, NormalizeContext};

/// Removes `like` constraints that match every value.
///
/// A pattern made only of `*` is always true, as is a `likeAny` list containing one. Inside an
/// `all` group such properties are dropped; inside a `some` group the whole group is trivially
/// true, so the first redundant property replaces its siblings and nested groups.
#[derive(Clone, Copy, Debug, Default)]
pub struct RedundantLikeConstraintStrategy;

impl NormalizationStrategy for RedundantLikeConstraintStrategy {
    fn name(&self) -> &'static str {
        "RedundantLikeConstraintStrategy"
    }

    fn apply(&self, graph: &mut QueryGraph, _ctx: &NormalizeContext<'_>) {
        let groups = graph.elements(|node| node.element.prop_group().is_some());
        for num in groups {
            let Some(group) = graph.element_mut(num).and_then(Element::prop_group_mut) else {
                continue;
            };
            clean_group(group);
            if group.quant == QuantType::Some && !redundant_props(group).is_empty() {
                group.props.clear();
                group.groups.clear();
            }
        }
    }
}

fn is_wildcard(pattern: &str) -> bool {
    !pattern.is_empty() && pattern.chars().all(|c| c == '*')
}

fn is_redundant(prop: &Prop) -> bool {
    let Some(con) = &prop.con else {
        return false;
    };
    match (con.op, &con.expr) {
        (ConstraintOp::Like, Literal::String(pattern)) => is_wildcard(pattern),
        (ConstraintOp::LikeAny, Literal::List(patterns)) => patterns
            .iter()
            .any(|p| matches!(p, Literal::String(s) if is_wildcard(s))),
        _ => false,
    }
}

fn redundant_props(group: &PropGroup) -> Vec<usize> {
    group
        .props
        .iter()
        .enumerate()
        .filter(|(_, prop)| is_redundant(prop))
        .map(|(idx, _)| idx)
        .collect()
}

fn clean_group(group: &mut PropGroup) {
    let redundant = redundant_props(group);
    if let Some(&first) = redundant.first() {
        match group.quant {
            QuantType::All => {
                let mut idx = 0;
                group.props.retain(|_| {
                    let keep = !redundant.contains(&idx);
                    idx += 1;
                    keep
                });
            }
            QuantType::Some => {
                let kept = group.props.swap_remove(first);
                group.props = vec![kept];
                group.groups.clear();
            }
        }
    }

    for nested in &mut group.groups {
        clean_group(nested);
    }

    let trivially_true = |g: &PropGroup| g.quant == QuantType::Some && !redundant_props(g).is_empty();
    let Some(absorbing) = group.groups.iter().position(trivially_true) else {
        return;
    };
    match group.quant {
        QuantType::All => group.groups.retain(|g| !trivially_true(g)),
        QuantType::Some => {
            let nested = group.groups.swap_remove(absorbing);
            let first = redundant_props(&nested).first().copied().unwrap_or_default();
            group.props = nested.props.into_iter().skip(first).take(1).collect();
            group.groups.clear();
        }
    }
}
