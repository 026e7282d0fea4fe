//! Phase workflow
//!
//! Turns a session snapshot plus a request into the next snapshot. The
//! gate for leaving a phase is the union of constraint violations and
//! consistency violations; any blocking entry holds the session in place.

use crate::error::WorkflowError;
use crate::state::{validate_transition, WorkflowState};
use chrono::{DateTime, Utc};
use dso_model::{Phase, PhaseContent, PhaseRecord, Session, SessionStatus, Violation};
use dso_validation::{compute_coverage, ConsistencyEnforcer, ConstraintValidator, ReferenceIndex};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Blocked advances tolerated before a session is marked blocked
pub const DEFAULT_MAX_BLOCKED_ATTEMPTS: u32 = 3;

/// Result of evaluating the gate of the current phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateReport {
    /// Phase being evaluated
    pub phase: Phase,
    /// Constraint violations, in validator order
    pub constraint_violations: Vec<Violation>,
    /// Consistency violations
    pub consistency_violations: Vec<Violation>,
}

impl GateReport {
    /// Check if any violation blocks the exit
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        self.iter().any(Violation::is_blocking)
    }

    /// All violations, constraints first
    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.constraint_violations
            .iter()
            .chain(self.consistency_violations.iter())
    }

    /// Owned list of all violations, constraints first
    #[must_use]
    pub fn all(&self) -> Vec<Violation> {
        self.iter().cloned().collect()
    }

    /// Non-blocking violations
    #[must_use]
    pub fn warnings(&self) -> Vec<Violation> {
        self.iter().filter(|v| !v.is_blocking()).cloned().collect()
    }
}

/// What an advance request did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Transition {
    /// Moved to the next phase
    Advanced {
        /// Phase that was closed
        from: Phase,
        /// Phase now open
        to: Phase,
    },
    /// Closed the final phase
    Completed {
        /// Phase that was closed
        from: Phase,
    },
    /// Blocked, still below the attempt limit
    Held {
        /// Phase the session stays in
        phase: Phase,
        /// Consecutive blocked attempts
        attempts: u32,
    },
    /// Blocked, session status is now `blocked`
    Blocked {
        /// Phase the session stays in
        phase: Phase,
        /// Consecutive blocked attempts
        attempts: u32,
    },
    /// Terminal session, nothing happened
    Unchanged {
        /// Status of the session
        status: SessionStatus,
    },
}

impl Transition {
    /// Check if the request produced a new snapshot
    #[inline]
    #[must_use]
    pub fn is_change(&self) -> bool {
        !matches!(self, Transition::Unchanged { .. })
    }

    /// Check if the phase gate rejected the request
    #[inline]
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        matches!(self, Transition::Held { .. } | Transition::Blocked { .. })
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Advanced { from, to } => write!(f, "{from} -> {to}"),
            Transition::Completed { from } => write!(f, "{from} -> Completed"),
            Transition::Held { phase, attempts } => {
                write!(f, "held in {phase} (attempt {attempts})")
            }
            Transition::Blocked { phase, attempts } => {
                write!(f, "blocked in {phase} (attempt {attempts})")
            }
            Transition::Unchanged { status } => write!(f, "unchanged ({status})"),
        }
    }
}

/// Outcome of [`PhaseWorkflow::advance`]
#[derive(Debug, Clone)]
pub struct AdvanceOutcome {
    /// Snapshot to commit
    pub session: Session,
    /// What happened
    pub transition: Transition,
    /// Every violation found at the gate (warnings included)
    pub violations: Vec<Violation>,
}

impl AdvanceOutcome {
    /// Blocking violations only
    pub fn blocking(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(|v| v.is_blocking())
    }
}

/// Outcome of [`PhaseWorkflow::abort`]
#[derive(Debug, Clone)]
pub struct AbortOutcome {
    /// Snapshot to commit
    pub session: Session,
    /// False when the session was already terminal
    pub changed: bool,
}

/// Phase-gated workflow engine
#[derive(Debug, Clone)]
pub struct PhaseWorkflow {
    validator: ConstraintValidator,
    enforcer: ConsistencyEnforcer,
    max_blocked_attempts: u32,
}

impl Default for PhaseWorkflow {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseWorkflow {
    /// Create new workflow with default limits
    #[must_use]
    pub fn new() -> Self {
        Self {
            validator: ConstraintValidator::new(),
            enforcer: ConsistencyEnforcer::new(),
            max_blocked_attempts: DEFAULT_MAX_BLOCKED_ATTEMPTS,
        }
    }

    /// Set blocked-attempt limit (minimum 1)
    #[inline]
    #[must_use]
    pub fn with_max_blocked_attempts(mut self, attempts: u32) -> Self {
        self.max_blocked_attempts = attempts.max(1);
        self
    }

    /// Blocked-attempt limit
    #[inline]
    #[must_use]
    pub fn max_blocked_attempts(&self) -> u32 {
        self.max_blocked_attempts
    }

    /// Evaluate the gate of the current phase without changing anything
    #[must_use]
    pub fn evaluate(&self, session: &Session) -> GateReport {
        let refs = ReferenceIndex::build(session);
        self.evaluate_with(session, &refs)
    }

    fn evaluate_with(&self, session: &Session, refs: &ReferenceIndex) -> GateReport {
        let phase = session.current_phase;
        GateReport {
            phase,
            constraint_violations: self.validator.validate_with(session, phase, refs),
            consistency_violations: self.enforcer.check_with(session, refs),
        }
    }

    /// Attach `content` to the current phase and try to close it.
    ///
    /// Terminal sessions come back untouched with
    /// [`Transition::Unchanged`]. Content is kept even when the gate
    /// rejects the request.
    ///
    /// # Errors
    /// Returns `WorkflowError` if the history has no open record for the
    /// current phase or the resulting transition is illegal.
    pub fn advance(
        &self,
        session: &Session,
        content: Option<PhaseContent>,
        now: DateTime<Utc>,
    ) -> Result<AdvanceOutcome, WorkflowError> {
        let state = WorkflowState::of(session);
        if state.is_terminal() {
            return Ok(AdvanceOutcome {
                session: session.clone(),
                transition: Transition::Unchanged {
                    status: session.status,
                },
                violations: Vec::new(),
            });
        }

        let mut next = session.clone();
        let phase = next.current_phase;
        let record = next
            .current_record_mut()
            .ok_or_else(|| missing_record(phase))?;
        if let Some(content) = content.filter(|c| !c.is_empty()) {
            record.content.push(content);
        }

        let refs = ReferenceIndex::build(&next);
        let report = self.evaluate_with(&next, &refs);
        next.coverage = compute_coverage(&next, &refs);

        let transition = if report.is_blocking() {
            next.failed_attempts += 1;
            let attempts = next.failed_attempts;
            if state == WorkflowState::Blocked {
                Transition::Blocked { phase, attempts }
            } else if attempts >= self.max_blocked_attempts {
                validate_transition(state, WorkflowState::Blocked)?;
                next.status = SessionStatus::Blocked;
                tracing::warn!(session_id = %next.id, %phase, attempts, "session blocked");
                Transition::Blocked { phase, attempts }
            } else {
                Transition::Held { phase, attempts }
            }
        } else {
            let reentered = WorkflowState::from_phase(phase);
            if state == WorkflowState::Blocked {
                validate_transition(state, reentered)?;
            }
            let record = next
                .current_record_mut()
                .ok_or_else(|| missing_record(phase))?;
            record.exited_at = Some(now);
            record.violations_at_exit = report.warnings();
            next.failed_attempts = 0;

            match phase.next() {
                Some(to) => {
                    validate_transition(reentered, WorkflowState::from_phase(to))?;
                    next.phase_history.push(PhaseRecord::primary(to, now));
                    next.current_phase = to;
                    next.status = SessionStatus::Active;
                    Transition::Advanced { from: phase, to }
                }
                None => {
                    validate_transition(reentered, WorkflowState::Completed)?;
                    next.status = SessionStatus::Completed;
                    Transition::Completed { from: phase }
                }
            }
        };

        next.touch(now);
        tracing::debug!(session_id = %next.id, %transition, "advance evaluated");

        Ok(AdvanceOutcome {
            session: next,
            transition,
            violations: report.all(),
        })
    }

    /// Append content to an already exited phase.
    ///
    /// The current phase does not move.
    ///
    /// # Errors
    /// Returns `WorkflowError::SessionClosed` for terminal sessions and
    /// `WorkflowError::InvalidRevisit` unless `phase` precedes the current
    /// phase.
    pub fn revisit(
        &self,
        session: &Session,
        phase: Phase,
        content: PhaseContent,
        now: DateTime<Utc>,
    ) -> Result<Session, WorkflowError> {
        if session.status.is_terminal() {
            return Err(WorkflowError::SessionClosed {
                status: session.status,
            });
        }
        if phase >= session.current_phase {
            return Err(WorkflowError::InvalidRevisit {
                requested: phase,
                current: session.current_phase,
            });
        }

        let mut next = session.clone();
        next.phase_history
            .push(PhaseRecord::revisited(phase, content, now));
        let refs = ReferenceIndex::build(&next);
        next.coverage = compute_coverage(&next, &refs);
        next.touch(now);
        Ok(next)
    }

    /// Abandon the session. Already terminal sessions are left as is.
    ///
    /// # Errors
    /// Returns `WorkflowError` if the abort transition is illegal.
    pub fn abort(
        &self,
        session: &Session,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<AbortOutcome, WorkflowError> {
        let state = WorkflowState::of(session);
        if state.is_terminal() {
            return Ok(AbortOutcome {
                session: session.clone(),
                changed: false,
            });
        }
        validate_transition(state, WorkflowState::Aborted)?;

        let mut next = session.clone();
        if let Some(record) = next.current_record_mut().filter(|r| r.is_open()) {
            record.exited_at = Some(now);
        }
        next.status = SessionStatus::Aborted;
        next.abort_reason = reason;
        next.touch(now);
        Ok(AbortOutcome {
            session: next,
            changed: true,
        })
    }
}

fn missing_record(phase: Phase) -> WorkflowError {
    WorkflowError::CorruptHistory(format!("no primary record for {phase}"))
}
