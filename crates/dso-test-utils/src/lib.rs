//! Testing utilities for DSO workspace
//!
//! Shared fixtures and session-driving helpers.

#![allow(missing_docs)]

use dso_core::{AdvanceOutcome, SessionManager, Transition};
use dso_model::{Decision, Phase, PhaseContent, SessionConfig, SessionStatus};

/// Requirements used by most fixtures
pub const REQUIREMENTS: [&str; 2] = ["R1", "R2"];

pub fn two_requirement_config() -> SessionConfig {
    SessionConfig::new()
        .with_goal("order service redesign")
        .with_context("monolith split into services")
        .with_requirements(REQUIREMENTS)
}

/// Content that satisfies every built-in rule when leaving `phase`
///
/// Mentions each requirement; in Design it also adds a decision that
/// addresses all of them.
pub fn passing_content(phase: Phase, requirements: &[&str]) -> PhaseContent {
    let content = PhaseContent::new()
        .with_ref(format!("{phase} notes covering {}", requirements.join(" and ")))
        .referencing(requirements.iter().copied());
    if phase == Phase::Design {
        content.with_decision(
            Decision::new("D1", "event-driven saga")
                .with_rationale("keeps cross-service writes consistent")
                .addressing(requirements.iter().copied()),
        )
    } else {
        content
    }
}

pub fn test_manager() -> SessionManager {
    SessionManager::in_memory()
}

pub fn start(manager: &SessionManager, id: &str) {
    manager
        .start_session(Some(id.to_string()), two_requirement_config())
        .unwrap();
}

/// Advance with passing content until `target` is the current phase
pub fn walk_to(manager: &SessionManager, id: &str, target: Phase) {
    loop {
        let session = manager.get_status(id).unwrap();
        if session.current_phase >= target || session.status != SessionStatus::Active {
            return;
        }
        let outcome = advance_passing(manager, id, session.current_phase);
        assert!(
            !outcome.transition.is_rejected(),
            "advance out of {} rejected: {:?}",
            session.current_phase,
            outcome.violations
        );
    }
}

/// Drive a session through every phase to `Completed`
pub fn complete_session(manager: &SessionManager, id: &str) {
    walk_to(manager, id, Phase::Documentation);
    let outcome = advance_passing(manager, id, Phase::Documentation);
    assert_eq!(
        outcome.transition,
        Transition::Completed {
            from: Phase::Documentation
        }
    );
}

pub fn advance_passing(manager: &SessionManager, id: &str, phase: Phase) -> AdvanceOutcome {
    manager
        .advance_phase(id, Some(passing_content(phase, &REQUIREMENTS)))
        .unwrap()
}
