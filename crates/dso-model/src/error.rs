//! Error types for the data model
//!
//! Everything here is a configuration problem: the caller handed over a
//! session config, phase name or artifact kind that cannot be used.

/// Malformed configuration or identifier
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    /// Requirement with an empty id
    #[error("requirement #{index} has an empty id")]
    EmptyRequirementId { index: usize },

    /// Two requirements resolve to the same id
    #[error("duplicate requirement id: '{0}'")]
    DuplicateRequirement(String),

    /// Constraint with an empty id
    #[error("constraint #{index} has an empty id")]
    EmptyConstraintId { index: usize },

    /// Two constraints share an id (built-in ids are reserved)
    #[error("duplicate constraint id: '{0}'")]
    DuplicateConstraint(String),

    /// Threshold outside its valid range
    #[error("constraint '{id}' has invalid threshold {value}: {reason}")]
    InvalidThreshold {
        id: String,
        value: f64,
        reason: &'static str,
    },

    /// Unknown phase name
    #[error("unknown phase: '{0}'")]
    UnknownPhase(String),

    /// Unknown artifact kind name
    #[error("unknown artifact kind: '{0}'")]
    UnknownArtifactKind(String),
}
