//! Error types for the phase workflow

use crate::state::WorkflowState;
use dso_model::{Phase, SessionStatus};

/// Workflow rejection
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    /// Transition not in the legal phase graph
    #[error("illegal transition: {from} -> {to}")]
    IllegalTransition {
        from: WorkflowState,
        to: WorkflowState,
    },

    /// Revisit of a phase that has not been exited yet
    #[error("cannot revisit {requested}: session is in {current}")]
    InvalidRevisit { requested: Phase, current: Phase },

    /// Operation requires a non-terminal session
    #[error("session is {status}")]
    SessionClosed { status: SessionStatus },

    /// History lost its primary record for the current phase
    #[error("corrupt phase history: {0}")]
    CorruptHistory(String),
}
