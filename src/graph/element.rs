//! Element payloads carried by query graph nodes.
//!
//! Every node in a [`QueryGraph`](super::QueryGraph) wraps exactly one [`Element`]. Entities,
//! relations and property groups are the parts a plan has to realize; the remaining variants
//! are control markers that only shape the graph.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a relation as written in the query graph.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// From the ancestor entity towards the descendant entity.
    #[default]
    R,
    /// From the descendant entity towards the ancestor entity.
    L,
    /// Either direction.
    RL,
}

/// Quantifier semantics for quantifier nodes and property groups.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantType {
    /// Every branch must hold (AND).
    #[default]
    All,
    /// At least one branch must hold (OR).
    Some,
}

/// Entity constrained to a single ontology type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TypedEntity {
    /// Entity type name.
    pub etype: String,
    /// Optional user-facing tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

/// Entity with no type constraint, or a set of admissible types.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UntypedEntity {
    /// Admissible entity types; empty means any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vtypes: Vec<String>,
    /// Optional user-facing tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

/// Entity pinned to a known identifier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConcreteEntity {
    /// Entity type name.
    pub etype: String,
    /// Store identifier of the entity.
    pub id: String,
    /// Optional display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Optional user-facing tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

/// Relation between the nearest ancestor entity and the next descendant entity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rel {
    /// Relation type name.
    pub rtype: String,
    /// Direction relative to the query graph layout.
    #[serde(default)]
    pub dir: Direction,
    /// Optional user-facing tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

/// Quantifier node joining several branches.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quant {
    /// Quantifier semantics.
    pub qtype: QuantType,
}

/// Literal values appearing in property constraints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum Literal {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed 64-bit integer value.
    Int(i64),
    /// 64-bit floating point value.
    Float(f64),
    /// String value.
    String(String),
    /// List of literals, used by set and `likeAny` operators.
    List(Vec<Literal>),
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl<T: Into<Literal>> From<Vec<T>> for Literal {
    fn from(value: Vec<T>) -> Self {
        Self::List(value.into_iter().map(Into::into).collect())
    }
}

/// Constraint operators understood by the translation layer.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConstraintOp {
    /// Equality.
    Eq,
    /// Inequality.
    Ne,
    /// Strictly greater.
    Gt,
    /// Greater or equal.
    Ge,
    /// Strictly smaller.
    Lt,
    /// Smaller or equal.
    Le,
    /// Membership in a literal list.
    InSet,
    /// Absence from a literal list.
    NotInSet,
    /// Wildcard pattern match.
    Like,
    /// Match against any pattern in a literal list.
    LikeAny,
    /// Property is missing.
    Empty,
    /// Property is present.
    NotEmpty,
}

/// Single property constraint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    /// Operator applied to the property value.
    pub op: ConstraintOp,
    /// Right-hand operand.
    pub expr: Literal,
}

impl Constraint {
    /// Creates a constraint from an operator and operand.
    pub fn of(op: ConstraintOp, expr: impl Into<Literal>) -> Self {
        Self {
            op,
            expr: expr.into(),
        }
    }
}

/// Projection requested for a property.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    /// Return the stored value unchanged.
    Identity,
}

/// Property reference inside a property group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prop {
    /// Property type name.
    pub ptype: String,
    /// Optional filter constraint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub con: Option<Constraint>,
    /// Optional projection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proj: Option<Projection>,
}

impl Prop {
    /// Creates a filtering property.
    pub fn filter(ptype: impl Into<String>, con: Constraint) -> Self {
        Self {
            ptype: ptype.into(),
            con: Some(con),
            proj: None,
        }
    }

    /// Creates a projected property without constraint.
    pub fn projected(ptype: impl Into<String>, proj: Projection) -> Self {
        Self {
            ptype: ptype.into(),
            con: None,
            proj: Some(proj),
        }
    }
}

/// Quantified group of property constraints, possibly nested.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PropGroup {
    /// Combination semantics of `props` and `groups`.
    #[serde(default)]
    pub quant: QuantType,
    /// Direct properties.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub props: Vec<Prop>,
    /// Nested groups.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<PropGroup>,
}

impl PropGroup {
    /// Creates a group with the given quantifier and properties.
    pub fn new(quant: QuantType, props: Vec<Prop>) -> Self {
        Self {
            quant,
            props,
            groups: Vec::new(),
        }
    }

    /// Adds a nested group.
    pub fn with_group(mut self, group: PropGroup) -> Self {
        self.groups.push(group);
        self
    }

    /// Visits every property in this group and its nested groups.
    pub fn for_each_prop(&self, f: &mut impl FnMut(&Prop)) {
        for prop in &self.props {
            f(prop);
        }
        for group in &self.groups {
            group.for_each_prop(f);
        }
    }
}

/// Payload of a query graph node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Element {
    /// Root marker; exactly one per graph.
    Start,
    /// Typed entity.
    Typed(TypedEntity),
    /// Untyped entity.
    Untyped(UntypedEntity),
    /// Concrete entity.
    Concrete(ConcreteEntity),
    /// Relation.
    Rel(Rel),
    /// Property group filtering an entity.
    PropGroup(PropGroup),
    /// Property group filtering a relation.
    RelPropGroup(PropGroup),
    /// Quantifier over branches.
    Quant(Quant),
    /// Marks the subgraph below as optional.
    Optional,
    /// Aggregation marker.
    Count,
}

impl Element {
    /// Returns the compact tag used in plan descriptions.
    pub fn tag(&self) -> ElementTag {
        match self {
            Element::Start => ElementTag::Start,
            Element::Typed(_) => ElementTag::ETyped,
            Element::Untyped(_) => ElementTag::EUntyped,
            Element::Concrete(_) => ElementTag::EConcrete,
            Element::Rel(_) => ElementTag::Rel,
            Element::PropGroup(_) => ElementTag::EPropGroup,
            Element::RelPropGroup(_) => ElementTag::RelPropGroup,
            Element::Quant(_) => ElementTag::Quant,
            Element::Optional => ElementTag::Optional,
            Element::Count => ElementTag::Count,
        }
    }

    /// Whether this element is an entity of any kind.
    pub fn is_entity(&self) -> bool {
        matches!(
            self,
            Element::Typed(_) | Element::Untyped(_) | Element::Concrete(_)
        )
    }

    /// Whether this element is a relation.
    pub fn is_rel(&self) -> bool {
        matches!(self, Element::Rel(_))
    }

    /// Whether this element is a quantifier.
    pub fn is_quant(&self) -> bool {
        matches!(self, Element::Quant(_))
    }

    /// Whether this element groups branches below it: a quantifier or an optional marker.
    pub fn is_container(&self) -> bool {
        matches!(self, Element::Quant(_) | Element::Optional)
    }

    /// Whether this element is a quantifier of type `all`.
    pub fn is_quant_all(&self) -> bool {
        matches!(
            self,
            Element::Quant(Quant {
                qtype: QuantType::All
            })
        )
    }

    /// Control elements shape the graph but are never realized by a plan operation.
    pub fn is_control(&self) -> bool {
        matches!(
            self,
            Element::Start | Element::Quant(_) | Element::Optional | Element::Count
        )
    }

    /// Returns the property group payload of entity and relation groups.
    pub fn prop_group(&self) -> Option<&PropGroup> {
        match self {
            Element::PropGroup(group) | Element::RelPropGroup(group) => Some(group),
            _ => None,
        }
    }

    /// Mutable variant of [`Element::prop_group`].
    pub fn prop_group_mut(&mut self) -> Option<&mut PropGroup> {
        match self {
            Element::PropGroup(group) | Element::RelPropGroup(group) => Some(group),
            _ => None,
        }
    }
}

/// Compact element classification used for plan origins and descriptions.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ElementTag {
    /// Start marker.
    Start,
    /// Typed entity.
    ETyped,
    /// Untyped entity.
    EUntyped,
    /// Concrete entity.
    EConcrete,
    /// Relation.
    Rel,
    /// Entity property group.
    EPropGroup,
    /// Relation property group.
    RelPropGroup,
    /// Quantifier.
    Quant,
    /// Optional marker.
    Optional,
    /// Aggregation marker.
    Count,
    /// Referenced number is not part of the graph.
    Unknown,
}

impl ElementTag {
    /// Whether the tag denotes an entity.
    pub fn is_entity(self) -> bool {
        matches!(
            self,
            ElementTag::ETyped | ElementTag::EUntyped | ElementTag::EConcrete
        )
    }

    /// Name used in plan descriptions.
    pub fn as_str(self) -> &'static str {
        match self {
            ElementTag::Start => "Start",
            ElementTag::ETyped => "ETyped",
            ElementTag::EUntyped => "EUntyped",
            ElementTag::EConcrete => "EConcrete",
            ElementTag::Rel => "Rel",
            ElementTag::EPropGroup => "EPropGroup",
            ElementTag::RelPropGroup => "RelPropGroup",
            ElementTag::Quant => "Quant",
            ElementTag::Optional => "Optional",
            ElementTag::Count => "Count",
            ElementTag::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ElementTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_serializes_with_kind_tag() {
        let element = Element::Rel(Rel {
            rtype: "own".into(),
            dir: Direction::R,
            tag: None,
        });
        let json = serde_json::to_value(&element).expect("serialize");
        assert_eq!(json["kind"], "rel");
        assert_eq!(json["rtype"], "own");
        let back: Element = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, element);
    }

    #[test]
    fn control_classification() {
        assert!(Element::Start.is_control());
        assert!(Element::Optional.is_control());
        assert!(Element::Quant(Quant {
            qtype: QuantType::Some
        })
        .is_control());
        assert!(!Element::PropGroup(PropGroup::default()).is_control());
        assert!(Element::Untyped(UntypedEntity::default()).is_entity());
        assert!(Element::Optional.is_container());
        assert!(!Element::Start.is_container());
        assert!(!Element::Count.is_container());
    }
}
