use chrono::Utc;
use dso_model::{Phase, PhaseContent, PhaseRecord, Session, SessionConfig};
use dso_validation::{
    compute_coverage, ConsistencyEnforcer, CoverageReport, ReferenceIndex, DROPPED_REQUIREMENT,
};
use proptest::prelude::*;

const REQUIREMENTS: [&str; 4] = ["R1", "R2", "R3", "R4"];

/// One primary record per step; each step says which requirements it
/// mentions and whether it does so in free text or as structured hints
fn walked(steps: &[(Vec<bool>, bool)]) -> Session {
    let config = SessionConfig::new().with_requirements(REQUIREMENTS);
    let mut session = Session::new("p", config, Utc::now()).unwrap();
    session.phase_history.clear();
    for (phase, (mask, in_text)) in Phase::ALL.iter().copied().zip(steps) {
        if let Some(last) = session.phase_history.last_mut() {
            last.exited_at = Some(Utc::now());
        }
        let ids: Vec<&str> = mentioned(mask).collect();
        let content = if *in_text {
            PhaseContent::new().with_ref(format!("{phase} notes on {}", ids.join(", ")))
        } else {
            PhaseContent::new().referencing(ids)
        };
        let mut record = PhaseRecord::primary(phase, Utc::now());
        record.content.push(content);
        session.phase_history.push(record);
        session.current_phase = phase;
    }
    session
}

fn mentioned(mask: &[bool]) -> impl Iterator<Item = &'static str> + '_ {
    REQUIREMENTS
        .iter()
        .zip(mask)
        .filter(|(_, on)| **on)
        .map(|(id, _)| *id)
}

fn steps_strategy() -> impl Strategy<Value = Vec<(Vec<bool>, bool)>> {
    proptest::collection::vec(
        (
            proptest::collection::vec(any::<bool>(), REQUIREMENTS.len()),
            any::<bool>(),
        ),
        1..=Phase::ALL.len(),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_coverage_matches_any_mention(steps in steps_strategy()) {
        let session = walked(&steps);
        let coverage = compute_coverage(&session, &ReferenceIndex::build(&session));

        let ids: Vec<&str> = coverage.keys().map(String::as_str).collect();
        prop_assert_eq!(&ids[..], &REQUIREMENTS[..]);
        for (i, id) in REQUIREMENTS.iter().enumerate() {
            let expected = steps.iter().any(|(mask, _)| mask[i]);
            prop_assert_eq!(coverage[*id], expected, "{}", id);
        }
    }

    #[test]
    fn prop_report_agrees_with_threshold(steps in steps_strategy(), threshold in 0.0f64..=100.0) {
        let session = walked(&steps);
        let refs = ReferenceIndex::build(&session);
        let report = CoverageReport::evaluate(&session, &refs, threshold);

        prop_assert_eq!(report.total, REQUIREMENTS.len());
        prop_assert_eq!(report.covered, report.requirements.values().filter(|c| **c).count());
        prop_assert_eq!(report.meets_threshold(), report.percentage >= threshold);
        prop_assert_eq!(report.uncovered().len(), report.total - report.covered);
    }

    #[test]
    fn prop_dropped_requirements_are_those_missing_from_the_closing_phase(
        steps in steps_strategy(),
    ) {
        let session = walked(&steps);
        let violations = ConsistencyEnforcer::new().check(&session);
        prop_assert!(violations.iter().all(|v| v.constraint_id == DROPPED_REQUIREMENT));

        let expected = if steps.len() < 2 {
            0
        } else {
            let (closing, _) = &steps[steps.len() - 1];
            closing.iter().filter(|on| !**on).count()
        };
        prop_assert_eq!(violations.len(), expected);
    }

    #[test]
    fn prop_carrying_everything_forward_heals_gaps(steps in steps_strategy()) {
        let mut session = walked(&steps);
        let phase = session.current_phase;
        if let Some(last) = session.phase_history.last_mut() {
            last.content.push(PhaseContent::new().carrying(REQUIREMENTS));
        }
        prop_assert!(ConsistencyEnforcer::new().check(&session).is_empty(), "{}", phase);
    }
}
