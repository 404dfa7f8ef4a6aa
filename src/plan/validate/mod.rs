//! Plan validation.
//!
//! A [`PlanValidator`] inspects the top-level run of a plan. Rules are combined with
//! [`CompositePlanValidator`] and applied to nested join branches by
//! [`ChainedPlanValidator`].

mod rules;

use crate::graph::QueryGraph;
use crate::validation::ValidationResult;

use super::op::Plan;

pub use rules::{
    AdjacencyValidator, JoinValidator, NoRedundantRelationValidator,
    OptionalCompletenessValidator, RedundantGoToValidator, ReverseRelationValidator,
};

/// Checks a plan against a query graph.
pub trait PlanValidator: Send + Sync {
    /// Rule name, prefixed to every error.
    fn name(&self) -> &'static str;

    /// Validates the plan's top-level run.
    fn validate(&self, plan: &Plan, query: &QueryGraph) -> ValidationResult;
}

/// How a composite combines its children.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompositeMode {
    /// Every child must pass.
    All,
    /// At least one child must pass.
    OneOf,
}

/// Combines several validators.
pub struct CompositePlanValidator {
    mode: CompositeMode,
    validators: Vec<Box<dyn PlanValidator>>,
}

impl CompositePlanValidator {
    /// Empty composite with the given mode.
    pub fn new(mode: CompositeMode) -> Self {
        Self {
            mode,
            validators: Vec::new(),
        }
    }

    /// Appends a validator.
    pub fn with(mut self, validator: impl PlanValidator + 'static) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    /// Every structural rule, all required.
    pub fn structural() -> Self {
        Self::new(CompositeMode::All)
            .with(AdjacencyValidator)
            .with(NoRedundantRelationValidator)
            .with(RedundantGoToValidator)
            .with(ReverseRelationValidator)
            .with(OptionalCompletenessValidator)
            .with(JoinValidator)
    }
}

impl PlanValidator for CompositePlanValidator {
    fn name(&self) -> &'static str {
        "CompositePlanValidator"
    }

    fn validate(&self, plan: &Plan, query: &QueryGraph) -> ValidationResult {
        match self.mode {
            CompositeMode::All => {
                let mut result = ValidationResult::ok();
                for validator in &self.validators {
                    result.merge(validator.validate(plan, query));
                }
                result
            }
            CompositeMode::OneOf => {
                let mut failures = ValidationResult::ok();
                for validator in &self.validators {
                    let result = validator.validate(plan, query);
                    if result.is_valid() {
                        return result;
                    }
                    failures.merge(result);
                }
                if self.validators.is_empty() {
                    return ValidationResult::invalid(
                        self.name(),
                        ["no validator to satisfy".to_string()],
                    );
                }
                failures
            }
        }
    }
}

/// Applies an inner validator to a plan and to every join branch below it.
pub struct ChainedPlanValidator {
    inner: Box<dyn PlanValidator>,
    max_depth: usize,
}

impl ChainedPlanValidator {
    /// Wraps `inner`, descending at most `max_depth` join levels.
    pub fn new(inner: impl PlanValidator + 'static, max_depth: usize) -> Self {
        Self {
            inner: Box::new(inner),
            max_depth,
        }
    }

    fn validate_at(&self, plan: &Plan, query: &QueryGraph, remaining: usize) -> ValidationResult {
        let mut result = self.inner.validate(plan, query);
        for join in plan.joins() {
            if remaining == 0 {
                result.merge(ValidationResult::invalid(
                    self.name(),
                    [format!("join nesting exceeds depth {}", self.max_depth)],
                ));
                continue;
            }
            result.merge(self.validate_at(&join.left, query, remaining - 1));
            result.merge(self.validate_at(&join.right, query, remaining - 1));
        }
        result
    }
}

impl PlanValidator for ChainedPlanValidator {
    fn name(&self) -> &'static str {
        "ChainedPlanValidator"
    }

    fn validate(&self, plan: &Plan, query: &QueryGraph) -> ValidationResult {
        self.validate_at(plan, query, self.max_depth)
    }
}

/// The structural rule set applied through joins down to `max_depth` levels.
pub fn default_validator(max_depth: usize) -> ChainedPlanValidator {
    ChainedPlanValidator::new(CompositePlanValidator::structural(), max_depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::plan::op::PlanOp;

    struct Reject;

    impl PlanValidator for Reject {
        fn name(&self) -> &'static str {
            "Reject"
        }

        fn validate(&self, _plan: &Plan, _query: &QueryGraph) -> ValidationResult {
            ValidationResult::invalid(self.name(), ["always".to_string()])
        }
    }

    #[test]
    fn composite_modes() {
        let g = fixtures::simple_query1();
        let plan = Plan::new(vec![PlanOp::entity(&g, 1)]);

        let all = CompositePlanValidator::new(CompositeMode::All)
            .with(AdjacencyValidator)
            .with(Reject)
            .with(Reject);
        let result = all.validate(&plan, &g);
        assert!(!result.is_valid());
        assert_eq!(result.errors().len(), 2);

        let one_of = CompositePlanValidator::new(CompositeMode::OneOf)
            .with(Reject)
            .with(AdjacencyValidator);
        assert!(one_of.validate(&plan, &g).is_valid());

        let none = CompositePlanValidator::new(CompositeMode::OneOf).with(Reject);
        assert_eq!(none.validate(&plan, &g).errors(), &["Reject: always"]);
    }

    #[test]
    fn chained_descends_into_join_branches() {
        let g = fixtures::simple_query1();
        // the right branch jumps to an entity it never scanned
        let left = Plan::new(vec![PlanOp::entity(&g, 1), PlanOp::relation(&g, 2)]);
        let right = Plan::new(vec![PlanOp::goto(&g, 1), PlanOp::entity(&g, 3)]);
        let plan = Plan::new(vec![PlanOp::join(left, right, false)]);

        assert!(RedundantGoToValidator.validate(&plan, &g).is_valid());
        let chained = ChainedPlanValidator::new(RedundantGoToValidator, 10);
        let result = chained.validate(&plan, &g);
        assert!(!result.is_valid());
        assert!(result.errors()[0].starts_with("RedundantGoToValidator"));
    }

    #[test]
    fn chained_enforces_depth() {
        let g = fixtures::simple_query1();
        let inner = Plan::new(vec![PlanOp::join(
            Plan::new(vec![PlanOp::entity(&g, 1)]),
            Plan::new(vec![PlanOp::entity(&g, 3)]),
            false,
        )]);
        let outer = Plan::new(vec![PlanOp::join(
            inner,
            Plan::new(vec![PlanOp::relation(&g, 2)]),
            false,
        )]);
        let accept_all = CompositePlanValidator::new(CompositeMode::All);
        assert!(ChainedPlanValidator::new(accept_all, 2)
            .validate(&outer, &g)
            .is_valid());
        let accept_all = CompositePlanValidator::new(CompositeMode::All);
        let result = ChainedPlanValidator::new(accept_all, 1).validate(&outer, &g);
        assert_eq!(
            result.errors(),
            &["ChainedPlanValidator: join nesting exceeds depth 1"]
        );
    }
}
