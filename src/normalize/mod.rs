#![forbid(unsafe_code)]

//! Query graph normalization.
//!
//! Normalization rewrites a query graph into an equivalent, simpler one before planning. Each
//! [`NormalizationStrategy`] performs one rewrite; a [`NormalizationPipeline`] applies its
//! strategies in order and repeats the whole sequence until the graph stops changing.

pub mod check;
mod default_projection;
mod quant_grouping;
mod redundant_like;

use tracing::{debug, trace, warn};

use crate::graph::{Ontology, QueryGraph};

pub use default_projection::DefaultProjectionStrategy;
pub use quant_grouping::QuantAllGroupingStrategy;
pub use redundant_like::RedundantLikeConstraintStrategy;

/// Read-only services available to strategies.
#[derive(Clone, Copy)]
pub struct NormalizeContext<'a> {
    ontology: &'a dyn Ontology,
}

impl<'a> NormalizeContext<'a> {
    /// Creates a context over the given ontology.
    pub fn new(ontology: &'a dyn Ontology) -> Self {
        Self { ontology }
    }

    /// Ontology the query is written against.
    pub fn ontology(&self) -> &'a dyn Ontology {
        self.ontology
    }
}

/// A single rewrite applied to a query graph in place.
pub trait NormalizationStrategy: Send + Sync {
    /// Strategy name, used in logs.
    fn name(&self) -> &'static str;

    /// Applies the rewrite.
    fn apply(&self, graph: &mut QueryGraph, ctx: &NormalizeContext<'_>);
}

/// Ordered strategies applied until a fixed point.
pub struct NormalizationPipeline {
    strategies: Vec<Box<dyn NormalizationStrategy>>,
    max_rounds: usize,
}

impl NormalizationPipeline {
    /// Empty pipeline running at most `max_rounds` rounds.
    pub fn new(max_rounds: usize) -> Self {
        Self {
            strategies: Vec::new(),
            max_rounds: max_rounds.max(1),
        }
    }

    /// Quantifier flattening, wildcard pruning and default projections, in that order.
    pub fn standard(max_rounds: usize) -> Self {
        Self::new(max_rounds)
            .with(QuantAllGroupingStrategy)
            .with(RedundantLikeConstraintStrategy)
            .with(DefaultProjectionStrategy)
    }

    /// Appends a strategy.
    pub fn with(mut self, strategy: impl NormalizationStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// Names of the configured strategies, in application order.
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Runs the pipeline and returns the number of rounds applied.
    pub fn run(&self, graph: &mut QueryGraph, ctx: &NormalizeContext<'_>) -> usize {
        for round in 1..=self.max_rounds {
            let before = graph.clone();
            for strategy in &self.strategies {
                strategy.apply(graph, ctx);
                trace!(strategy = strategy.name(), round, "normalization strategy applied");
            }
            if *graph == before {
                debug!(query = graph.name(), rounds = round, "normalization reached fixed point");
                return round;
            }
        }
        warn!(
            query = graph.name(),
            max_rounds = self.max_rounds,
            "normalization stopped before reaching a fixed point"
        );
        self.max_rounds
    }
}
