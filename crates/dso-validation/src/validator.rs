//! Constraint validator
//!
//! Checks, in order: required fields for the exiting phase, configured
//! numeric thresholds, then built-in structural rules. The returned list is
//! ordered the same way; an empty list means the phase may close.

use crate::coverage::{percentage, uncovered, compute_coverage};
use crate::references::ReferenceIndex;
use dso_model::{
    BuiltinRule, Constraint, ConstraintRule, Phase, RuleClass, Session, Severity, ThresholdRule,
    Violation,
};
use std::collections::HashSet;

/// Side-effect-free constraint checker
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstraintValidator;

impl ConstraintValidator {
    /// Create new validator instance
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Validate the exit of `phase`
    #[must_use]
    pub fn validate(&self, session: &Session, phase: Phase) -> Vec<Violation> {
        let refs = ReferenceIndex::build(session);
        self.validate_with(session, phase, &refs)
    }

    /// Validate the exit of `phase` against a prebuilt reference index
    #[must_use]
    pub fn validate_with(
        &self,
        session: &Session,
        phase: Phase,
        refs: &ReferenceIndex,
    ) -> Vec<Violation> {
        let mut violations = Vec::new();

        for class in [RuleClass::RequiredField, RuleClass::Threshold, RuleClass::Structural] {
            for constraint in session
                .constraints
                .iter()
                .filter(|c| c.class() == class && c.applies(phase))
            {
                check(constraint, session, phase, refs, &mut violations);
            }
        }

        tracing::debug!(
            session_id = %session.id,
            %phase,
            count = violations.len(),
            "constraint validation finished"
        );
        violations
    }
}

fn check(
    constraint: &Constraint,
    session: &Session,
    phase: Phase,
    refs: &ReferenceIndex,
    out: &mut Vec<Violation>,
) {
    let id = constraint.id.as_str();
    let severity = constraint.severity;

    match constraint.rule {
        ConstraintRule::Builtin(BuiltinRule::PhaseContent) => {
            let entries = session
                .records_for(phase)
                .flat_map(|r| r.content.iter())
                .filter(|c| !c.is_empty())
                .count();
            if entries == 0 {
                out.push(Violation::new(
                    id,
                    phase,
                    severity,
                    format!("{phase} has no content attached"),
                ));
            }
        }
        ConstraintRule::Builtin(BuiltinRule::DiscoveryRequirements) => {
            if session.requirements.is_empty() {
                out.push(Violation::new(
                    id,
                    phase,
                    severity,
                    "no requirements were recorded",
                ));
            }
        }
        ConstraintRule::Builtin(BuiltinRule::DesignDecisions) => {
            let addressed: HashSet<&str> = session
                .records_for(Phase::Design)
                .flat_map(|r| r.content.iter())
                .flat_map(|c| c.decisions.iter())
                .flat_map(|d| d.requirements.iter().map(String::as_str))
                .collect();
            for requirement in session.requirement_ids().filter(|r| !addressed.contains(r)) {
                out.push(Violation::new(
                    id,
                    phase,
                    severity,
                    format!("requirement {requirement} has no design decision"),
                ));
            }
        }
        ConstraintRule::Builtin(BuiltinRule::RequirementReferenced) => {
            let missing: Vec<&str> = session
                .requirement_ids()
                .filter(|r| !refs.is_referenced(r))
                .collect();
            if !missing.is_empty() {
                let severity = if phase.is_final() {
                    Severity::Blocking
                } else {
                    Severity::Warning
                };
                out.push(Violation::new(
                    id,
                    phase,
                    severity,
                    format!("requirements never referenced: {}", missing.join(", ")),
                ));
            }
        }
        ConstraintRule::Builtin(BuiltinRule::DecisionRationale) => {
            for decision in session
                .records_for(phase)
                .flat_map(|r| r.content.iter())
                .flat_map(|c| c.decisions.iter())
                .filter(|d| d.rationale.trim().is_empty())
            {
                out.push(Violation::new(
                    id,
                    phase,
                    severity,
                    format!("decision {} has no rationale", decision.id),
                ));
            }
        }
        ConstraintRule::Builtin(BuiltinRule::KnownReferences) => {
            let known: HashSet<&str> = session.requirement_ids().collect();
            let mut reported = HashSet::new();
            for hinted in session
                .records_for(phase)
                .flat_map(|r| r.content.iter())
                .flat_map(|c| c.hinted_ids())
            {
                if !known.contains(hinted) && !refs.is_risk(hinted) && reported.insert(hinted) {
                    out.push(Violation::new(
                        id,
                        phase,
                        severity,
                        format!("reference to unknown item {hinted}"),
                    ));
                }
            }
        }
        ConstraintRule::Threshold(ThresholdRule::MinCoverage { percent }) => {
            let coverage = compute_coverage(session, refs);
            let covered = coverage.values().filter(|c| **c).count();
            let actual = percentage(covered, coverage.len());
            if actual < percent {
                out.push(Violation::new(
                    id,
                    phase,
                    severity,
                    format!(
                        "requirement coverage {actual:.1}% is below the required {percent:.1}%; unaddressed: {}",
                        uncovered(&coverage).join(", ")
                    ),
                ));
            }
        }
        ConstraintRule::Threshold(ThresholdRule::MinDecisions { count }) => {
            let actual = session.decisions().count();
            if actual < count {
                out.push(Violation::new(
                    id,
                    phase,
                    severity,
                    format!("{actual} decision(s) recorded, at least {count} required"),
                ));
            }
        }
        ConstraintRule::Threshold(ThresholdRule::MaxOpenRisks { count }) => {
            let open = refs.open_risks();
            if open.len() > count {
                out.push(Violation::new(
                    id,
                    phase,
                    severity,
                    format!(
                        "{} open risk(s) exceed the limit of {count}: {}",
                        open.len(),
                        open.join(", ")
                    ),
                ));
            }
        }
        ConstraintRule::Threshold(ThresholdRule::MinContentRefs { count }) => {
            let actual: usize = session.records_for(phase).map(|r| r.ref_count()).sum();
            if actual < count {
                out.push(Violation::new(
                    id,
                    phase,
                    severity,
                    format!("{phase} has {actual} content ref(s), at least {count} required"),
                ));
            }
        }
    }
}
