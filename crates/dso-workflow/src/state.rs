//! Workflow states and the legal transition table

use crate::error::WorkflowError;
use dso_model::{Phase, Session, SessionStatus};
use serde::{Deserialize, Serialize};
use std::fmt;

/// State of the phase state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkflowState {
    /// In Discovery
    Discovery,
    /// In Analysis
    Analysis,
    /// In Design
    Design,
    /// In Validation
    Validation,
    /// In Documentation
    Documentation,
    /// Documentation exited (terminal)
    Completed,
    /// Held after repeated blocked advances (non-terminal)
    Blocked,
    /// Abandoned by the caller (terminal)
    Aborted,
}

impl WorkflowState {
    /// Every state
    pub const ALL: [WorkflowState; 8] = [
        WorkflowState::Discovery,
        WorkflowState::Analysis,
        WorkflowState::Design,
        WorkflowState::Validation,
        WorkflowState::Documentation,
        WorkflowState::Completed,
        WorkflowState::Blocked,
        WorkflowState::Aborted,
    ];

    /// State for an open phase
    #[must_use]
    pub const fn from_phase(phase: Phase) -> Self {
        match phase {
            Phase::Discovery => WorkflowState::Discovery,
            Phase::Analysis => WorkflowState::Analysis,
            Phase::Design => WorkflowState::Design,
            Phase::Validation => WorkflowState::Validation,
            Phase::Documentation => WorkflowState::Documentation,
        }
    }

    /// State of a session snapshot
    #[must_use]
    pub fn of(session: &Session) -> Self {
        match session.status {
            SessionStatus::Active => Self::from_phase(session.current_phase),
            SessionStatus::Completed => WorkflowState::Completed,
            SessionStatus::Blocked => WorkflowState::Blocked,
            SessionStatus::Aborted => WorkflowState::Aborted,
        }
    }

    /// Phase for phase states
    #[must_use]
    pub const fn phase(self) -> Option<Phase> {
        match self {
            WorkflowState::Discovery => Some(Phase::Discovery),
            WorkflowState::Analysis => Some(Phase::Analysis),
            WorkflowState::Design => Some(Phase::Design),
            WorkflowState::Validation => Some(Phase::Validation),
            WorkflowState::Documentation => Some(Phase::Documentation),
            _ => None,
        }
    }

    /// Terminal states accept no transitions
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, WorkflowState::Completed | WorkflowState::Aborted)
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.phase() {
            Some(phase) => write!(f, "{phase}"),
            None => f.write_str(match self {
                WorkflowState::Completed => "Completed",
                WorkflowState::Blocked => "Blocked",
                _ => "Aborted",
            }),
        }
    }
}

/// Validates a state transition.
pub fn validate_transition(from: WorkflowState, to: WorkflowState) -> Result<(), WorkflowError> {
    if allowed(from, to) {
        Ok(())
    } else {
        Err(WorkflowError::IllegalTransition { from, to })
    }
}

/// States reachable from `from` in one step
#[must_use]
pub fn allowed_transitions(from: WorkflowState) -> Vec<WorkflowState> {
    use WorkflowState::*;
    match from {
        Discovery => vec![Analysis, Blocked, Aborted],
        Analysis => vec![Design, Blocked, Aborted],
        Design => vec![Validation, Blocked, Aborted],
        Validation => vec![Documentation, Blocked, Aborted],
        Documentation => vec![Completed, Blocked, Aborted],
        // re-entry of the phase the session was blocked in
        Blocked => vec![Discovery, Analysis, Design, Validation, Documentation, Aborted],
        Completed => vec![],
        Aborted => vec![],
    }
}

fn allowed(from: WorkflowState, to: WorkflowState) -> bool {
    allowed_transitions(from).into_iter().any(|s| s == to)
}
