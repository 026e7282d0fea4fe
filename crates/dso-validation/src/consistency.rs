//! Cross-phase consistency enforcement
//!
//! Tracked items (requirements and flagged risks) must not silently
//! disappear. An open item is alive in the phase being closed when it is
//! mentioned by the current primary record or by any revisit appended after
//! it. Only the latest mention counts, so later content heals earlier gaps.

use crate::references::ReferenceIndex;
use dso_model::{Phase, Session, Severity, Violation, ViolationSource};

/// Violation id for a requirement that dropped out of the history
pub const DROPPED_REQUIREMENT: &str = "consistency.dropped-requirement";

/// Violation id for a risk that dropped out of the history
pub const DROPPED_RISK: &str = "consistency.dropped-risk";

/// Detects information loss across phases
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsistencyEnforcer;

impl ConsistencyEnforcer {
    /// Create new enforcer instance
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Check the full history of `session`
    #[must_use]
    pub fn check(&self, session: &Session) -> Vec<Violation> {
        let refs = ReferenceIndex::build(session);
        self.check_with(session, &refs)
    }

    /// Check the full history against a prebuilt reference index
    #[must_use]
    pub fn check_with(&self, session: &Session, refs: &ReferenceIndex) -> Vec<Violation> {
        let Some(closing) = session.current_record_index() else {
            return Vec::new();
        };
        let closing_phase = session.phase_history[closing].phase;
        let mut violations = Vec::new();

        let introduced = session
            .phase_history
            .iter()
            .position(|r| r.is_primary() && r.phase == Phase::Discovery)
            .unwrap_or(0);

        if closing > introduced {
            let severity = if closing_phase.is_final() {
                Severity::Blocking
            } else {
                Severity::Warning
            };
            for id in session.requirement_ids() {
                if let Some(last_seen) = dropped(id, introduced, closing, refs) {
                    violations.push(
                        Violation::new(
                            DROPPED_REQUIREMENT,
                            closing_phase,
                            severity,
                            format!(
                                "requirement {id} last seen in {} is neither addressed nor carried forward in {closing_phase}",
                                session.phase_history[last_seen].phase
                            ),
                        )
                        .from_source(ViolationSource::Consistency),
                    );
                }
            }
        }

        let risk_severity = if closing_phase >= Phase::Validation {
            Severity::Blocking
        } else {
            Severity::Warning
        };
        for (id, introduced) in refs.risks().filter(|(_, at)| *at < closing) {
            if let Some(last_seen) = dropped(id, introduced, closing, refs) {
                violations.push(
                    Violation::new(
                        DROPPED_RISK,
                        closing_phase,
                        risk_severity,
                        format!(
                            "risk {id} flagged in {} and last seen in {} is neither resolved nor carried forward in {closing_phase}",
                            session.phase_history[introduced].phase,
                            session.phase_history[last_seen].phase
                        ),
                    )
                    .from_source(ViolationSource::Consistency),
                );
            }
        }

        tracing::debug!(
            session_id = %session.id,
            phase = %closing_phase,
            count = violations.len(),
            "consistency check finished"
        );
        violations
    }
}

/// Index of the last sighting when `id` silently disappeared before `closing`
fn dropped(id: &str, introduced: usize, closing: usize, refs: &ReferenceIndex) -> Option<usize> {
    if refs.resolved_at(id).is_some() {
        return None;
    }
    let last_seen = refs.last_mention(id).unwrap_or(introduced).max(introduced);
    (last_seen < closing).then_some(last_seen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dso_model::{PhaseContent, PhaseRecord, SessionConfig};
    use pretty_assertions::assert_eq;

    /// Build a session whose primary records walk `phases`, each with `content`
    fn walked(requirements: &[&str], steps: Vec<(Phase, PhaseContent)>) -> Session {
        let config = SessionConfig::new().with_requirements(requirements.iter().copied());
        let mut session = Session::new("s", config, Utc::now()).unwrap();
        session.phase_history.clear();
        for (phase, content) in steps {
            if let Some(last) = session.phase_history.last_mut() {
                last.exited_at = Some(Utc::now());
            }
            let mut record = PhaseRecord::primary(phase, Utc::now());
            record.content.push(content);
            session.phase_history.push(record);
            session.current_phase = phase;
        }
        session
    }

    fn mention(ids: &[&str]) -> PhaseContent {
        PhaseContent::new().referencing(ids.iter().copied())
    }

    #[test]
    fn closing_discovery_never_drops_requirements() {
        let s = walked(&["R1"], vec![(Phase::Discovery, PhaseContent::new().with_ref("x"))]);
        assert!(ConsistencyEnforcer::new().check(&s).is_empty());
    }

    #[test]
    fn gap_in_middle_phase_is_a_warning() {
        let s = walked(
            &["R1", "R2"],
            vec![
                (Phase::Discovery, mention(&["R1", "R2"])),
                (Phase::Analysis, mention(&["R1"])),
            ],
        );
        let violations = ConsistencyEnforcer::new().check(&s);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].constraint_id, DROPPED_REQUIREMENT);
        assert_eq!(violations[0].severity, Severity::Warning);
        assert_eq!(violations[0].source, ViolationSource::Consistency);
        assert!(violations[0].message.contains("R2"));
    }

    #[test]
    fn later_mention_heals_earlier_gap() {
        let s = walked(
            &["R1", "R2"],
            vec![
                (Phase::Discovery, mention(&["R1", "R2"])),
                (Phase::Analysis, mention(&["R1"])),
                (Phase::Design, PhaseContent::new().carrying(["R1", "R2"])),
            ],
        );
        assert!(ConsistencyEnforcer::new().check(&s).is_empty());
    }

    #[test]
    fn requirement_never_referenced_again_blocks_documentation() {
        let s = walked(
            &["R1", "R2"],
            vec![
                (Phase::Discovery, mention(&["R1", "R2"])),
                (Phase::Analysis, mention(&["R1"])),
                (Phase::Design, mention(&["R1"])),
                (Phase::Validation, mention(&["R1"])),
                (Phase::Documentation, mention(&["R1"])),
            ],
        );
        let violations = ConsistencyEnforcer::new().check(&s);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].is_blocking());
        assert!(violations[0].message.contains("R2"));
        assert!(violations[0].message.contains("Discovery"));
    }

    #[test]
    fn resolved_items_stop_being_tracked() {
        let s = walked(
            &["R1"],
            vec![
                (Phase::Discovery, mention(&["R1"])),
                (Phase::Analysis, PhaseContent::new().resolving(["R1"])),
                (Phase::Design, PhaseContent::new().with_ref("unrelated")),
            ],
        );
        assert!(ConsistencyEnforcer::new().check(&s).is_empty());
    }

    #[test]
    fn risk_must_resurface_by_validation() {
        let s = walked(
            &["R1"],
            vec![
                (Phase::Discovery, mention(&["R1"])),
                (Phase::Analysis, mention(&["R1"]).with_risk("K1", "data loss")),
                (Phase::Design, mention(&["R1"]).carrying(["K1"])),
                (Phase::Validation, mention(&["R1"])),
            ],
        );
        let violations = ConsistencyEnforcer::new().check(&s);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].constraint_id, DROPPED_RISK);
        assert!(violations[0].is_blocking());
        assert!(violations[0].message.contains("Analysis"));
        assert!(violations[0].message.contains("Design"));
    }

    #[test]
    fn risk_flagged_in_closing_phase_is_not_checked() {
        let s = walked(
            &["R1"],
            vec![
                (Phase::Discovery, mention(&["R1"])),
                (Phase::Analysis, mention(&["R1"]).with_risk("K1", "data loss")),
            ],
        );
        assert!(ConsistencyEnforcer::new().check(&s).is_empty());
    }

    #[test]
    fn revisit_after_current_record_counts_as_alive() {
        let mut s = walked(
            &["R1", "R2"],
            vec![
                (Phase::Discovery, mention(&["R1", "R2"])),
                (Phase::Analysis, mention(&["R1"])),
            ],
        );
        s.phase_history.push(PhaseRecord::revisited(
            Phase::Discovery,
            PhaseContent::new().carrying(["R2"]),
            Utc::now(),
        ));
        assert!(ConsistencyEnforcer::new().check(&s).is_empty());
    }
}
