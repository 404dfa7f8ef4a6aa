//! Query-graph to execution-plan search.
//!
//! A [`graph::QueryGraph`] describes what to retrieve: typed entities connected by relations,
//! filtered by property groups and combined by quantifiers. The [`Planner`] normalizes the graph,
//! checks it against an [`graph::Ontology`] and searches for the cheapest valid
//! [`plan::Plan`] that realizes every element of it.
//!
//! ```
//! use std::sync::Arc;
//! use qgplan::{fixtures, Planner, PlannerConfig};
//!
//! let planner = Planner::new(PlannerConfig::default(), Arc::new(fixtures::dragons_ontology()));
//! let output = planner.plan(fixtures::simple_query1()).unwrap();
//! assert!(output.description.starts_with("Plan[[EntityOp(ETyped(1))"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod fixtures;
pub mod graph;
pub mod normalize;
pub mod plan;
pub mod planner;
pub mod validation;

pub use config::{ConfigError, PlannerConfig};
pub use error::{PlannerError, Result};
pub use graph::{QueryGraph, QueryGraphBuilder};
pub use plan::{Plan, PlanOp};
pub use planner::{Planner, PlannerOutput};
pub use validation::ValidationResult;
