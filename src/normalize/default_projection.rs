use crate::graph::{ENum, Element, Projection, Prop, QueryGraph};

use super::{NormalizationStrategy, NormalizeContext};

/// Selects every ontology property of a typed or concrete entity when its property groups
/// select nothing.
///
/// The identity projections are appended to the entity's first property group. Filters are
/// left as they are, and entities without a property group are skipped.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultProjectionStrategy;

impl NormalizationStrategy for DefaultProjectionStrategy {
    fn name(&self) -> &'static str {
        "DefaultProjectionStrategy"
    }

    fn apply(&self, graph: &mut QueryGraph, ctx: &NormalizeContext<'_>) {
        let entities = graph.elements(|node| {
            matches!(node.element, Element::Typed(_) | Element::Concrete(_))
        });
        for entity in entities {
            let etype = match graph.element(entity) {
                Some(Element::Typed(typed)) => typed.etype.as_str(),
                Some(Element::Concrete(concrete)) => concrete.etype.as_str(),
                _ => continue,
            };
            let props = ctx.ontology().entity_properties(etype);
            let groups = graph.entity_filters(entity);
            let Some(&target) = groups.first() else {
                continue;
            };
            if props.is_empty() || groups.iter().any(|&group| selects(graph, group)) {
                continue;
            }
            let additions: Vec<Prop> = props
                .iter()
                .map(|ptype| Prop::projected(ptype.as_str(), Projection::Identity))
                .collect();
            if let Some(group) = graph.element_mut(target).and_then(Element::prop_group_mut) {
                group.props.extend(additions);
            }
        }
    }
}

fn selects(graph: &QueryGraph, group: ENum) -> bool {
    let mut projected = false;
    if let Some(group) = graph.element(group).and_then(Element::prop_group) {
        group.for_each_prop(&mut |prop| projected |= prop.proj.is_some());
    }
    projected
}
