//! Execution plans and the search that produces them.
//!
//! A [`Plan`] is an ordered run of [`PlanOp`]s that visits every plannable element of a query
//! graph. [`BottomUpPlanSearcher`] grows plans from single-entity seeds through the
//! [`extend`] strategies, filters them with [`validate`], ranks them with [`cost`] and keeps the
//! survivors chosen by [`prune`].

pub mod cost;
pub mod extend;
pub mod op;
pub mod prune;
pub mod search;
pub mod validate;

pub use cost::{Cost, CostEstimator, CostTable, PlanWithCost};
pub use extend::{CompositeExtensionStrategy, ExtensionStrategy};
pub use op::{EntityJoin, Origin, Plan, PlanOp};
pub use search::{BottomUpPlanSearcher, SearchOutcome};
pub use validate::{default_validator, PlanValidator};
