//! Design phases and session status
//!
//! Phases form the fixed sequence `Discovery → Analysis → Design →
//! Validation → Documentation`. The ordering is encoded in the enum
//! discriminants so `Ord` follows the workflow.

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One stage of the design workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Capture context, goal and requirements
    Discovery,
    /// Explore options, risks and trade-offs
    Analysis,
    /// Record decisions against each requirement
    Design,
    /// Check decisions against requirements and risks
    Validation,
    /// Consolidate the session into documents
    Documentation,
}

impl Phase {
    /// All phases in workflow order
    pub const ALL: [Phase; 5] = [
        Phase::Discovery,
        Phase::Analysis,
        Phase::Design,
        Phase::Validation,
        Phase::Documentation,
    ];

    /// Position in the fixed ordering (0-based)
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Immediate successor, `None` for the final phase
    #[inline]
    #[must_use]
    pub const fn next(self) -> Option<Phase> {
        match self {
            Phase::Discovery => Some(Phase::Analysis),
            Phase::Analysis => Some(Phase::Design),
            Phase::Design => Some(Phase::Validation),
            Phase::Validation => Some(Phase::Documentation),
            Phase::Documentation => None,
        }
    }

    /// Whether exiting this phase completes the session
    #[inline]
    #[must_use]
    pub const fn is_final(self) -> bool {
        matches!(self, Phase::Documentation)
    }

    /// Stable name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Phase::Discovery => "Discovery",
            Phase::Analysis => "Analysis",
            Phase::Design => "Design",
            Phase::Validation => "Validation",
            Phase::Documentation => "Documentation",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Phase::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ModelError::UnknownPhase(s.to_string()))
    }
}

/// Lifecycle status of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Accepting content and advances
    #[default]
    Active,
    /// Documentation exited cleanly (terminal)
    Completed,
    /// Too many blocked advances; still accepts remediation
    Blocked,
    /// Explicitly abandoned by the caller (terminal)
    Aborted,
}

impl SessionStatus {
    /// Terminal states never change again
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Aborted)
    }

    /// Stable lowercase name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
            SessionStatus::Blocked => "blocked",
            SessionStatus::Aborted => "aborted",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
