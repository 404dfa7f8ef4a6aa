//! Validation outcome shared by plan validators and query graph checks.

use std::fmt;

/// Outcome of a validation: validity plus the errors that explain a failure.
///
/// Every error string is prefixed with the name of the rule that produced it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationResult {
    valid: bool,
    errors: Vec<String>,
}

impl ValidationResult {
    /// A passing result.
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    /// A failing result with errors attributed to `rule`.
    pub fn invalid(rule: &str, errors: impl IntoIterator<Item = String>) -> Self {
        let mut errors: Vec<String> = errors
            .into_iter()
            .map(|msg| format!("{rule}: {msg}"))
            .collect();
        if errors.is_empty() {
            errors.push(format!("{rule}: invalid"));
        }
        Self {
            valid: false,
            errors,
        }
    }

    /// Builds a result from collected errors; no errors means valid.
    pub fn from_errors(rule: &str, errors: Vec<String>) -> Self {
        if errors.is_empty() {
            Self::ok()
        } else {
            Self::invalid(rule, errors)
        }
    }

    /// Whether the subject passed.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Errors in the order they were found.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Combines two results: valid only if both are.
    pub fn merge(&mut self, other: ValidationResult) {
        self.valid &= other.valid;
        self.errors.extend(other.errors);
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.valid {
            f.write_str("valid")
        } else {
            write!(f, "invalid: {}", self.errors.join("; "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_accumulates_errors() {
        let mut result = ValidationResult::ok();
        result.merge(ValidationResult::ok());
        assert!(result.is_valid());
        result.merge(ValidationResult::invalid("RuleA", ["broken".to_string()]));
        result.merge(ValidationResult::from_errors("RuleB", vec!["also".into()]));
        assert!(!result.is_valid());
        assert_eq!(result.errors(), &["RuleA: broken", "RuleB: also"]);
        assert_eq!(result.to_string(), "invalid: RuleA: broken; RuleB: also");
    }
}
