//! Planner facade: normalize, check, search.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::PlannerConfig;
use crate::error::{PlannerError, Result};
use crate::graph::{Ontology, QueryGraph};
use crate::normalize::{check::check, NormalizationPipeline, NormalizeContext};
use crate::plan::{BottomUpPlanSearcher, Cost, Plan, PlanOp};

/// Planner output containing the chosen plan and its explain tree.
#[derive(Clone, Debug)]
pub struct PlannerOutput {
    /// The normalized query graph the plan realizes.
    pub query: QueryGraph,
    /// The selected plan.
    pub plan: Plan,
    /// Its estimated cost.
    pub cost: Cost,
    /// Linear description, `Plan[[...]]`.
    pub description: String,
    /// Deterministic plan hash.
    pub fingerprint: u64,
    /// Human-readable explain tree
    pub explain: PlanExplain,
}

/// Serializable view of a plan.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlanExplain {
    /// Query name.
    pub query: String,
    /// Linear description.
    pub description: String,
    /// Estimated cost.
    pub cost: f64,
    /// Deterministic plan hash.
    pub fingerprint: u64,
    /// Top-level ops.
    pub ops: Vec<ExplainNode>,
}

/// One op of an explain tree; joins carry their two branches as inputs.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExplainNode {
    /// Op kind name.
    pub op: &'static str,
    /// Originating element, e.g. `ETyped(1)`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    /// Set for relations traversed against their query direction.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub reversed: bool,
    /// Join branches, left then right.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<Vec<ExplainNode>>,
}

impl ExplainNode {
    fn of(op: &PlanOp) -> Self {
        Self {
            op: op.kind(),
            origin: op.origin().map(|origin| origin.to_string()),
            reversed: matches!(op, PlanOp::Relation { reversed: true, .. }),
            inputs: op
                .as_join()
                .map(|join| vec![explain_ops(&join.left), explain_ops(&join.right)])
                .unwrap_or_default(),
        }
    }
}

fn explain_ops(plan: &Plan) -> Vec<ExplainNode> {
    plan.ops().iter().map(ExplainNode::of).collect()
}

/// Turns query graphs into execution plans.
pub struct Planner {
    config: PlannerConfig,
    ontology: Arc<dyn Ontology>,
    pipeline: NormalizationPipeline,
    searcher: BottomUpPlanSearcher,
}

impl Planner {
    /// Creates a planner; the searcher and normalization pipeline are wired from `config`.
    pub fn new(config: PlannerConfig, ontology: Arc<dyn Ontology>) -> Self {
        let pipeline = NormalizationPipeline::standard(config.normalize_max_rounds);
        let searcher = BottomUpPlanSearcher::from_config(&config);
        Self {
            config,
            ontology,
            pipeline,
            searcher,
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Runs the normalization pipeline in place and returns the number of rounds.
    pub fn normalize(&self, query: &mut QueryGraph) -> usize {
        let ctx = NormalizeContext::new(self.ontology.as_ref());
        self.pipeline.run(query, &ctx)
    }

    /// Normalizes, checks and plans `query`.
    pub fn plan(&self, mut query: QueryGraph) -> Result<PlannerOutput> {
        let rounds = self.normalize(&mut query);
        let checked = check(&query, self.ontology.as_ref());
        if !checked.is_valid() {
            debug!(query = query.name(), errors = ?checked.errors(), "query rejected");
            return Err(PlannerError::Invalid(checked.to_string()));
        }

        let best = self.searcher.search(&query)?;
        let description = best.plan.to_string();
        let fingerprint = best.plan.fingerprint();
        info!(
            query = query.name(),
            normalize_rounds = rounds,
            cost = %best.cost,
            fingerprint,
            "query planned"
        );
        let explain = PlanExplain {
            query: query.name().to_owned(),
            description: description.clone(),
            cost: best.cost.0,
            fingerprint,
            ops: explain_ops(&best.plan),
        };
        Ok(PlannerOutput {
            query,
            plan: best.plan,
            cost: best.cost,
            description,
            fingerprint,
            explain,
        })
    }
}
