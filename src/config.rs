//! Planner configuration.
//!
//! Every field has a default, so a TOML file only needs the keys it changes:
//!
//! ```toml
//! enable_joins = true
//! estimator = "dummy"
//! max_iterations = 64
//!
//! [costs]
//! typed_scan = 5.0
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::plan::cost::CostTable;

/// Which cost estimator the searcher uses.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimatorKind {
    /// Constant cost, `dummy_cost`.
    Dummy,
    /// Sum of per-op costs from `costs`.
    RuleBased,
    /// Rule-based for plans of at most `short_plan_ops` ops, carried from the parent otherwise.
    #[default]
    Predicate,
}

/// Which pruning strategy a search round uses.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PruneKind {
    /// Keep every candidate.
    None,
    /// Keep the candidates sharing the minimum cost.
    #[default]
    Cheapest,
}

/// Configuration for normalization and plan search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Whether join extensions are generated.
    pub enable_joins: bool,
    /// Join nesting depth the validator descends into.
    pub validation_depth: usize,
    /// Upper bound on search rounds; unbounded when absent.
    pub max_iterations: Option<usize>,
    /// Upper bound on normalization rounds.
    pub normalize_max_rounds: usize,
    /// Cost estimator.
    pub estimator: EstimatorKind,
    /// Cost returned by the dummy estimator.
    pub dummy_cost: f64,
    /// Longest plan, in flattened ops, the predicate estimator costs by rules.
    pub short_plan_ops: usize,
    /// Pruning applied to seed plans.
    pub seed_prune: PruneKind,
    /// Pruning applied in later rounds.
    pub prune: PruneKind,
    /// Per-op cost table for rule-based estimation.
    pub costs: CostTable,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            enable_joins: false,
            validation_depth: 10,
            max_iterations: None,
            normalize_max_rounds: 16,
            estimator: EstimatorKind::Predicate,
            dummy_cost: 1.0,
            short_plan_ops: 2,
            seed_prune: PruneKind::None,
            prune: PruneKind::Cheapest,
            costs: CostTable::default(),
        }
    }
}

/// Errors raised while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read planner config {path}: {source}")]
    Read {
        /// Offending path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The file is not valid TOML for [`PlannerConfig`].
    #[error("failed to parse planner config {path}: {source}")]
    Parse {
        /// Offending path.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },
    /// A value is out of range.
    #[error("planner config field '{field}' is invalid: {reason}")]
    Invalid {
        /// Field name.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl PlannerConfig {
    /// Reads and validates a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.normalize_max_rounds == 0 {
            return Err(ConfigError::Invalid {
                field: "normalize_max_rounds",
                reason: "must be at least 1".into(),
            });
        }
        if self.max_iterations == Some(0) {
            return Err(ConfigError::Invalid {
                field: "max_iterations",
                reason: "must be at least 1 when set".into(),
            });
        }
        if !self.dummy_cost.is_finite() {
            return Err(ConfigError::Invalid {
                field: "dummy_cost",
                reason: format!("{} is not finite", self.dummy_cost),
            });
        }
        Ok(())
    }
}
