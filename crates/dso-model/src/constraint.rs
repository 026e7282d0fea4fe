//! Constraints and violations
//!
//! A session carries a resolved list of [`Constraint`]s: the fixed built-in
//! set first, then whatever the caller configured through
//! [`ConstraintSpec`]s. Validators turn failed constraints into
//! [`Violation`]s, which are data, not errors.

use crate::phase::Phase;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a failed constraint affects phase transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Prevents `advance-phase` from transitioning
    #[default]
    Blocking,
    /// Recorded but never blocks
    Warning,
}

impl Severity {
    /// Check if severity blocks transitions
    #[inline]
    #[must_use]
    pub const fn is_blocking(self) -> bool {
        matches!(self, Severity::Blocking)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Blocking => f.write_str("blocking"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

/// Numeric threshold rules available to session configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ThresholdRule {
    /// Minimum requirement coverage percentage (0..=100)
    MinCoverage { percent: f64 },
    /// Minimum number of decisions recorded across the history
    MinDecisions { count: usize },
    /// Maximum number of flagged-but-unresolved risks
    MaxOpenRisks { count: usize },
    /// Minimum number of content refs attached to the exiting phase
    MinContentRefs { count: usize },
}

/// Caller-supplied constraint, part of `config.constraints`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintSpec {
    /// Unique constraint id
    pub id: String,
    /// Phase whose exit the constraint guards; `None` guards every exit
    #[serde(default)]
    pub phase: Option<Phase>,
    /// Threshold rule
    pub rule: ThresholdRule,
    /// Blocking unless stated otherwise
    #[serde(default)]
    pub severity: Severity,
    /// Optional human-readable description
    #[serde(default)]
    pub description: Option<String>,
}

impl ConstraintSpec {
    /// Create constraint spec for a rule, blocking on every phase exit
    #[must_use]
    pub fn new(id: impl Into<String>, rule: ThresholdRule) -> Self {
        Self {
            id: id.into(),
            phase: None,
            rule,
            severity: Severity::Blocking,
            description: None,
        }
    }

    /// Minimum requirement coverage percentage
    #[must_use]
    pub fn min_coverage(id: impl Into<String>, percent: f64) -> Self {
        Self::new(id, ThresholdRule::MinCoverage { percent })
    }

    /// Minimum decision count
    #[must_use]
    pub fn min_decisions(id: impl Into<String>, count: usize) -> Self {
        Self::new(id, ThresholdRule::MinDecisions { count })
    }

    /// Maximum open risks
    #[must_use]
    pub fn max_open_risks(id: impl Into<String>, count: usize) -> Self {
        Self::new(id, ThresholdRule::MaxOpenRisks { count })
    }

    /// Minimum content refs on the exiting phase
    #[must_use]
    pub fn min_content_refs(id: impl Into<String>, count: usize) -> Self {
        Self::new(id, ThresholdRule::MinContentRefs { count })
    }

    /// Bind to a single phase
    #[must_use]
    pub fn for_phase(mut self, phase: Phase) -> Self {
        self.phase = Some(phase);
        self
    }

    /// Downgrade to a warning
    #[must_use]
    pub fn as_warning(mut self) -> Self {
        self.severity = Severity::Warning;
        self
    }

    /// Attach description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Validation order bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleClass {
    /// Required fields for the phase (checked first)
    RequiredField,
    /// Explicit numeric thresholds from configuration
    Threshold,
    /// Built-in structural rules
    Structural,
}

/// Fixed built-in rules present on every session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinRule {
    /// Exiting phase has at least one content entry
    PhaseContent,
    /// Session declares at least one requirement
    DiscoveryRequirements,
    /// Every requirement has a Design-phase decision
    DesignDecisions,
    /// Every requirement is referenced by at least one phase
    RequirementReferenced,
    /// Every decision has a rationale
    DecisionRationale,
    /// Content references only known requirement or risk ids
    KnownReferences,
}

impl BuiltinRule {
    /// Every built-in rule, in validation order
    pub const ALL: [BuiltinRule; 6] = [
        BuiltinRule::PhaseContent,
        BuiltinRule::DiscoveryRequirements,
        BuiltinRule::DesignDecisions,
        BuiltinRule::RequirementReferenced,
        BuiltinRule::DecisionRationale,
        BuiltinRule::KnownReferences,
    ];

    /// Reserved constraint id
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            BuiltinRule::PhaseContent => "builtin.phase-content",
            BuiltinRule::DiscoveryRequirements => "builtin.discovery-requirements",
            BuiltinRule::DesignDecisions => "builtin.design-decisions",
            BuiltinRule::RequirementReferenced => "builtin.requirement-referenced",
            BuiltinRule::DecisionRationale => "builtin.decision-rationale",
            BuiltinRule::KnownReferences => "builtin.known-references",
        }
    }

    /// Validation bucket
    #[must_use]
    pub const fn class(self) -> RuleClass {
        match self {
            BuiltinRule::PhaseContent
            | BuiltinRule::DiscoveryRequirements
            | BuiltinRule::DesignDecisions => RuleClass::RequiredField,
            BuiltinRule::RequirementReferenced
            | BuiltinRule::DecisionRationale
            | BuiltinRule::KnownReferences => RuleClass::Structural,
        }
    }

    /// Phase the rule is bound to, `None` for every phase
    #[must_use]
    pub const fn applies_to(self) -> Option<Phase> {
        match self {
            BuiltinRule::DiscoveryRequirements => Some(Phase::Discovery),
            BuiltinRule::DesignDecisions => Some(Phase::Design),
            _ => None,
        }
    }

    /// Nominal severity (`RequirementReferenced` only blocks on the final phase)
    #[must_use]
    pub const fn severity(self) -> Severity {
        match self {
            BuiltinRule::DecisionRationale | BuiltinRule::KnownReferences => Severity::Warning,
            _ => Severity::Blocking,
        }
    }

    /// Predicate description
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            BuiltinRule::PhaseContent => "the exiting phase must carry at least one content entry",
            BuiltinRule::DiscoveryRequirements => "discovery must record at least one requirement",
            BuiltinRule::DesignDecisions => {
                "design must record at least one decision per requirement"
            }
            BuiltinRule::RequirementReferenced => {
                "every requirement must be referenced by at least one phase"
            }
            BuiltinRule::DecisionRationale => "every decision must state its rationale",
            BuiltinRule::KnownReferences => {
                "content may only reference declared requirements or flagged risks"
            }
        }
    }
}

/// What a constraint checks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintRule {
    /// Fixed built-in rule
    Builtin(BuiltinRule),
    /// Configured numeric threshold
    Threshold(ThresholdRule),
}

/// Resolved constraint bound to a phase or the whole session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraint {
    /// Unique id
    pub id: String,
    /// Phase guarded, `None` for every phase
    pub applies_to: Option<Phase>,
    /// Predicate description
    pub description: String,
    /// Severity when violated
    pub severity: Severity,
    /// Rule evaluated
    pub rule: ConstraintRule,
}

impl Constraint {
    /// Resolve a built-in rule
    #[must_use]
    pub fn builtin(rule: BuiltinRule) -> Self {
        Self {
            id: rule.id().to_string(),
            applies_to: rule.applies_to(),
            description: rule.description().to_string(),
            severity: rule.severity(),
            rule: ConstraintRule::Builtin(rule),
        }
    }

    /// The full built-in set
    #[must_use]
    pub fn builtins() -> Vec<Self> {
        BuiltinRule::ALL.into_iter().map(Self::builtin).collect()
    }

    /// Resolve a configured constraint
    #[must_use]
    pub fn from_spec(spec: &ConstraintSpec) -> Self {
        let description = spec.description.clone().unwrap_or_else(|| match spec.rule {
            ThresholdRule::MinCoverage { percent } => {
                format!("requirement coverage must be at least {percent}%")
            }
            ThresholdRule::MinDecisions { count } => {
                format!("at least {count} decision(s) must be recorded")
            }
            ThresholdRule::MaxOpenRisks { count } => {
                format!("at most {count} risk(s) may remain open")
            }
            ThresholdRule::MinContentRefs { count } => {
                format!("the exiting phase must attach at least {count} content ref(s)")
            }
        });

        Self {
            id: spec.id.clone(),
            applies_to: spec.phase,
            description,
            severity: spec.severity,
            rule: ConstraintRule::Threshold(spec.rule),
        }
    }

    /// Check if the constraint guards the exit of `phase`
    #[inline]
    #[must_use]
    pub fn applies(&self, phase: Phase) -> bool {
        self.applies_to.map_or(true, |p| p == phase)
    }

    /// Validation bucket
    #[must_use]
    pub const fn class(&self) -> RuleClass {
        match self.rule {
            ConstraintRule::Builtin(rule) => rule.class(),
            ConstraintRule::Threshold(_) => RuleClass::Threshold,
        }
    }
}

/// Which checker produced a violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViolationSource {
    /// Constraint validator
    #[default]
    Constraint,
    /// Cross-phase consistency enforcer
    Consistency,
    /// Coverage enforcement
    Coverage,
}

/// A failed check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    /// Constraint or check id
    pub constraint_id: String,
    /// Human-readable explanation
    pub message: String,
    /// Effect on transitions
    pub severity: Severity,
    /// Phase being checked
    pub phase: Phase,
    /// Producing checker
    #[serde(default)]
    pub source: ViolationSource,
}

impl Violation {
    /// Create violation from the constraint validator
    #[must_use]
    pub fn new(
        constraint_id: impl Into<String>,
        phase: Phase,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            constraint_id: constraint_id.into(),
            message: message.into(),
            severity,
            phase,
            source: ViolationSource::Constraint,
        }
    }

    /// Create blocking violation
    #[must_use]
    pub fn blocking(constraint_id: impl Into<String>, phase: Phase, message: impl Into<String>) -> Self {
        Self::new(constraint_id, phase, Severity::Blocking, message)
    }

    /// Create warning violation
    #[must_use]
    pub fn warning(constraint_id: impl Into<String>, phase: Phase, message: impl Into<String>) -> Self {
        Self::new(constraint_id, phase, Severity::Warning, message)
    }

    /// Tag the producing checker
    #[must_use]
    pub fn from_source(mut self, source: ViolationSource) -> Self {
        self.source = source;
        self
    }

    /// Check if violation blocks transitions
    #[inline]
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        self.severity.is_blocking()
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({}): {}",
            self.severity, self.constraint_id, self.phase, self.message
        )
    }
}
