//! Planner error types.

use thiserror::Error;

use crate::config::ConfigError;
use crate::graph::GraphError;

/// Result alias used across the planner.
pub type Result<T> = std::result::Result<T, PlannerError>;

/// Errors surfaced to planner callers.
#[derive(Debug, Error)]
pub enum PlannerError {
    /// The query graph is structurally malformed.
    #[error("malformed query graph: {0}")]
    Graph(#[from] GraphError),
    /// The query failed the pre-planning checks.
    #[error("invalid query: {0}")]
    Invalid(String),
    /// The search ended without a complete plan.
    #[error("no complete plan found for query '{query}'")]
    NoPlanFound {
        /// Name of the query.
        query: String,
    },
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A query document is not valid JSON for a query graph.
    #[error("malformed query document: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PlannerError {
    /// Stable identifier for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            PlannerError::Graph(err) => err.code(),
            PlannerError::Invalid(_) => "InvalidQuery",
            PlannerError::NoPlanFound { .. } => "NoPlanFound",
            PlannerError::Config(_) => "Config",
            PlannerError::Serialization(_) => "Serialization",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ENum;

    #[test]
    fn codes_follow_the_source() {
        let err: PlannerError = GraphError::Cycle { num: ENum(3) }.into();
        assert_eq!(err.code(), "Cycle");
        let err = PlannerError::NoPlanFound {
            query: "q".into(),
        };
        assert_eq!(err.code(), "NoPlanFound");
        assert_eq!(err.to_string(), "no complete plan found for query 'q'");
    }
}
