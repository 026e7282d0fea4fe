//! Session configuration
//!
//! The config is captured once at `start-session` and never mutated
//! afterwards. [`SessionConfig::validate`] rejects malformed requirement
//! and constraint lists before a session is created.

use crate::constraint::{BuiltinRule, Constraint, ConstraintSpec, ThresholdRule};
use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Immutable snapshot of what the session is about
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionConfig {
    /// Free-text context
    pub context: String,
    /// Free-text goal
    pub goal: String,
    /// Ordered requirements
    pub requirements: Vec<RequirementSpec>,
    /// Configured threshold constraints
    pub constraints: Vec<ConstraintSpec>,
}

impl SessionConfig {
    /// Create empty configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With context
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    /// With goal
    #[must_use]
    pub fn with_goal(mut self, goal: impl Into<String>) -> Self {
        self.goal = goal.into();
        self
    }

    /// Append one requirement
    #[must_use]
    pub fn with_requirement(mut self, requirement: impl Into<RequirementSpec>) -> Self {
        self.requirements.push(requirement.into());
        self
    }

    /// Append several requirements
    #[must_use]
    pub fn with_requirements<I, R>(mut self, requirements: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<RequirementSpec>,
    {
        self.requirements
            .extend(requirements.into_iter().map(Into::into));
        self
    }

    /// Append a constraint
    #[must_use]
    pub fn with_constraint(mut self, constraint: ConstraintSpec) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Resolve requirement ids
    ///
    /// # Errors
    /// - `ModelError::EmptyRequirementId` for blank ids
    /// - `ModelError::DuplicateRequirement` when two entries share an id
    pub fn resolve_requirements(&self) -> Result<Vec<Requirement>, ModelError> {
        let mut seen = HashSet::new();
        let mut resolved = Vec::with_capacity(self.requirements.len());

        for (index, spec) in self.requirements.iter().enumerate() {
            let requirement = spec.resolve(index);
            if requirement.id.is_empty() {
                return Err(ModelError::EmptyRequirementId { index });
            }
            if !seen.insert(requirement.id.clone()) {
                return Err(ModelError::DuplicateRequirement(requirement.id));
            }
            resolved.push(requirement);
        }

        Ok(resolved)
    }

    /// Resolve the full constraint list: built-ins first, then configured ones
    ///
    /// # Errors
    /// - `ModelError::EmptyConstraintId` / `ModelError::DuplicateConstraint`
    /// - `ModelError::InvalidThreshold` for coverage outside 0..=100
    pub fn resolve_constraints(&self) -> Result<Vec<Constraint>, ModelError> {
        let mut seen: HashSet<&str> = BuiltinRule::ALL.iter().map(|r| r.id()).collect();
        let mut resolved = Constraint::builtins();

        for (index, spec) in self.constraints.iter().enumerate() {
            let id = spec.id.trim();
            if id.is_empty() {
                return Err(ModelError::EmptyConstraintId { index });
            }
            if !seen.insert(id) {
                return Err(ModelError::DuplicateConstraint(id.to_string()));
            }
            if let ThresholdRule::MinCoverage { percent } = spec.rule {
                if !percent.is_finite() {
                    return Err(ModelError::InvalidThreshold {
                        id: id.to_string(),
                        value: percent,
                        reason: "must be a finite number",
                    });
                }
                if !(0.0..=100.0).contains(&percent) {
                    return Err(ModelError::InvalidThreshold {
                        id: id.to_string(),
                        value: percent,
                        reason: "must be within 0..=100",
                    });
                }
            }
            resolved.push(Constraint::from_spec(spec));
        }

        Ok(resolved)
    }

    /// Validate without keeping the resolved lists
    ///
    /// # Errors
    /// Any error from [`Self::resolve_requirements`] or [`Self::resolve_constraints`]
    pub fn validate(&self) -> Result<(), ModelError> {
        self.resolve_requirements()?;
        self.resolve_constraints()?;
        Ok(())
    }
}

/// Requirement as written in configuration
///
/// Either a bare string or an explicit `{id, description}` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequirementSpec {
    /// Bare string: an id when it has no whitespace, otherwise a description
    Text(String),
    /// Explicit id and description
    Detailed {
        /// Requirement id
        id: String,
        /// Description
        #[serde(default)]
        description: String,
    },
}

impl RequirementSpec {
    /// Resolve to an identified requirement; `index` is the 0-based position
    #[must_use]
    pub fn resolve(&self, index: usize) -> Requirement {
        match self {
            RequirementSpec::Text(text) => {
                let text = text.trim();
                if !text.is_empty() && !text.contains(char::is_whitespace) {
                    Requirement {
                        id: text.to_string(),
                        description: text.to_string(),
                    }
                } else if text.is_empty() {
                    Requirement {
                        id: String::new(),
                        description: String::new(),
                    }
                } else {
                    Requirement {
                        id: format!("REQ-{}", index + 1),
                        description: text.to_string(),
                    }
                }
            }
            RequirementSpec::Detailed { id, description } => Requirement {
                id: id.trim().to_string(),
                description: if description.is_empty() {
                    id.trim().to_string()
                } else {
                    description.clone()
                },
            },
        }
    }
}

impl From<&str> for RequirementSpec {
    fn from(value: &str) -> Self {
        RequirementSpec::Text(value.to_string())
    }
}

impl From<String> for RequirementSpec {
    fn from(value: String) -> Self {
        RequirementSpec::Text(value)
    }
}

/// Requirement with its resolved id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    /// Stable id used by coverage and consistency tracking
    pub id: String,
    /// Description
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::Phase;
    use pretty_assertions::assert_eq;

    #[test]
    fn bare_ids_resolve_to_themselves() {
        let config = SessionConfig::new().with_requirements(["R1", "R2"]);
        let ids: Vec<_> = config
            .resolve_requirements()
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["R1", "R2"]);
    }

    #[test]
    fn sentences_get_positional_ids() {
        let config = SessionConfig::new()
            .with_requirement("R1")
            .with_requirement("Users can export reports");
        let reqs = config.resolve_requirements().unwrap();
        assert_eq!(reqs[1].id, "REQ-2");
        assert_eq!(reqs[1].description, "Users can export reports");
    }

    #[test]
    fn duplicate_requirement_is_rejected() {
        let config = SessionConfig::new().with_requirements(["R1", "R1"]);
        assert_eq!(
            config.resolve_requirements().unwrap_err(),
            ModelError::DuplicateRequirement("R1".to_string())
        );
    }

    #[test]
    fn blank_requirement_is_rejected() {
        let config = SessionConfig::new().with_requirements(["R1", "  "]);
        assert_eq!(
            config.validate().unwrap_err(),
            ModelError::EmptyRequirementId { index: 1 }
        );
    }

    #[test]
    fn builtins_precede_configured_constraints() {
        let config = SessionConfig::new()
            .with_constraint(ConstraintSpec::min_coverage("cov", 100.0).for_phase(Phase::Discovery));
        let constraints = config.resolve_constraints().unwrap();
        assert_eq!(constraints.len(), BuiltinRule::ALL.len() + 1);
        assert_eq!(constraints.last().unwrap().id, "cov");
    }

    #[test]
    fn builtin_ids_are_reserved() {
        let config = SessionConfig::new()
            .with_constraint(ConstraintSpec::min_decisions("builtin.phase-content", 1));
        assert!(matches!(
            config.validate(),
            Err(ModelError::DuplicateConstraint(_))
        ));
    }

    #[test]
    fn coverage_outside_range_is_rejected() {
        for percent in [-1.0, 100.5, f64::NAN] {
            let config =
                SessionConfig::new().with_constraint(ConstraintSpec::min_coverage("cov", percent));
            assert!(matches!(
                config.validate(),
                Err(ModelError::InvalidThreshold { .. })
            ));
        }
    }

    #[test]
    fn config_deserializes_mixed_requirements() {
        let yaml = r#"
goal: Choose a queue
requirements:
  - R1
  - id: R2
    description: At-least-once delivery
constraints:
  - id: full-coverage
    phase: Discovery
    rule:
      type: min_coverage
      percent: 100
"#;
        let config: SessionConfig = serde_yaml::from_str(yaml).unwrap();
        let reqs = config.resolve_requirements().unwrap();
        assert_eq!(reqs[1].id, "R2");
        assert_eq!(reqs[1].description, "At-least-once delivery");
        assert_eq!(config.constraints[0].phase, Some(Phase::Discovery));
    }
}
