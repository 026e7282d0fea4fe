//! Requirement coverage
//!
//! Coverage is always recomputed from the full history, never patched
//! incrementally.

use crate::references::ReferenceIndex;
use dso_model::{Phase, Session, Violation, ViolationSource};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Violation id for coverage enforcement
pub const COVERAGE_THRESHOLD: &str = "coverage.threshold";

/// Requirement id → covered, in declaration order
#[must_use]
pub fn compute_coverage(session: &Session, refs: &ReferenceIndex) -> IndexMap<String, bool> {
    session
        .requirement_ids()
        .map(|id| (id.to_string(), refs.is_referenced(id)))
        .collect()
}

/// Coverage evaluated against a threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageReport {
    /// Phase current at evaluation time
    pub phase: Phase,
    /// Requirement id → covered
    pub requirements: IndexMap<String, bool>,
    /// Covered requirement count
    pub covered: usize,
    /// Declared requirement count
    pub total: usize,
    /// Covered percentage (100 when nothing is declared)
    pub percentage: f64,
    /// Threshold in force
    pub threshold: f64,
    /// Blocking violation when below threshold
    pub violations: Vec<Violation>,
}

impl CoverageReport {
    /// Evaluate `session` against `threshold` (percent)
    #[must_use]
    pub fn evaluate(session: &Session, refs: &ReferenceIndex, threshold: f64) -> Self {
        let requirements = compute_coverage(session, refs);
        let total = requirements.len();
        let covered = requirements.values().filter(|c| **c).count();
        let percentage = percentage(covered, total);

        let mut violations = Vec::new();
        if percentage < threshold {
            violations.push(
                Violation::blocking(
                    COVERAGE_THRESHOLD,
                    session.current_phase,
                    format!(
                        "requirement coverage {percentage:.1}% is below the required {threshold:.1}%; unaddressed: {}",
                        uncovered(&requirements).join(", ")
                    ),
                )
                .from_source(ViolationSource::Coverage),
            );
        }

        Self {
            phase: session.current_phase,
            requirements,
            covered,
            total,
            percentage,
            threshold,
            violations,
        }
    }

    /// Check if coverage meets the threshold
    #[inline]
    #[must_use]
    pub fn meets_threshold(&self) -> bool {
        self.violations.is_empty()
    }

    /// Requirement ids not yet covered
    #[must_use]
    pub fn uncovered(&self) -> Vec<&str> {
        uncovered(&self.requirements)
    }
}

/// Covered share in percent
#[allow(clippy::cast_precision_loss)]
pub(crate) fn percentage(covered: usize, total: usize) -> f64 {
    if total == 0 {
        100.0
    } else {
        covered as f64 * 100.0 / total as f64
    }
}

pub(crate) fn uncovered(requirements: &IndexMap<String, bool>) -> Vec<&str> {
    requirements
        .iter()
        .filter(|(_, covered)| !**covered)
        .map(|(id, _)| id.as_str())
        .collect()
}
