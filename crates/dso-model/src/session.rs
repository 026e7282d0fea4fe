//! Session state
//!
//! [`Session`] is the unit of work. Its `phase_history` is append-only: one
//! primary record per entered phase plus `revisited` records for phases
//! reopened after they were exited.

use crate::artifact_kind::ArtifactKind;
use crate::config::{Requirement, SessionConfig};
use crate::constraint::{Constraint, Violation};
use crate::content::{Decision, PhaseContent};
use crate::error::ModelError;
use crate::phase::{Phase, SessionStatus};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// How a history record was created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// Entered through the normal forward sequence
    Primary,
    /// Reopened after the phase was exited
    Revisited,
}

/// One entry of the phase history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseRecord {
    /// Phase this record belongs to
    pub phase: Phase,
    /// Primary or revisited
    pub kind: RecordKind,
    /// When the record was opened
    pub entered_at: DateTime<Utc>,
    /// When the record was closed
    pub exited_at: Option<DateTime<Utc>>,
    /// Content attached while open
    pub content: Vec<PhaseContent>,
    /// Non-blocking violations frozen at exit
    pub violations_at_exit: Vec<Violation>,
}

impl PhaseRecord {
    /// Open a primary record
    #[must_use]
    pub fn primary(phase: Phase, now: DateTime<Utc>) -> Self {
        Self {
            phase,
            kind: RecordKind::Primary,
            entered_at: now,
            exited_at: None,
            content: Vec::new(),
            violations_at_exit: Vec::new(),
        }
    }

    /// Create a closed revisit record carrying `content`
    #[must_use]
    pub fn revisited(phase: Phase, content: PhaseContent, now: DateTime<Utc>) -> Self {
        Self {
            phase,
            kind: RecordKind::Revisited,
            entered_at: now,
            exited_at: Some(now),
            content: vec![content],
            violations_at_exit: Vec::new(),
        }
    }

    /// Check if the record is a primary entry
    #[inline]
    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.kind == RecordKind::Primary
    }

    /// Check if the record is still open
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.exited_at.is_none()
    }

    /// Total opaque refs attached
    #[must_use]
    pub fn ref_count(&self) -> usize {
        self.content.iter().map(|c| c.refs.len()).sum()
    }
}

/// Metadata of an artifact generated from the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactRecord {
    /// Document family
    pub kind: ArtifactKind,
    /// Phase current at generation time
    pub generated_from_phase: Phase,
    /// Whether the session was completed at generation time
    pub session_complete: bool,
    /// Digest of the rendered payload
    pub digest: String,
    /// Generation timestamp
    pub generated_at: DateTime<Utc>,
}

/// A design effort tracked through phases to completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Unique key into the store
    pub id: String,
    /// Immutable configuration snapshot
    pub config: SessionConfig,
    /// Requirements with resolved ids
    pub requirements: Vec<Requirement>,
    /// Built-in and configured constraints
    pub constraints: Vec<Constraint>,
    /// Phase currently open
    pub current_phase: Phase,
    /// Lifecycle status
    pub status: SessionStatus,
    /// Append-only history
    pub phase_history: Vec<PhaseRecord>,
    /// Requirement id → covered, recomputed on every committed validation pass
    pub coverage: IndexMap<String, bool>,
    /// Blocked advance attempts in the current phase
    pub failed_attempts: u32,
    /// Artifacts generated so far
    pub artifacts: Vec<ArtifactRecord>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last committed mutation
    pub updated_at: DateTime<Utc>,
    /// Reason given on abort
    pub abort_reason: Option<String>,
    /// Bumped by every committed mutation
    pub revision: u64,
}

impl Session {
    /// Create a session in `Discovery`
    ///
    /// # Errors
    /// Returns `ModelError` if the configuration is malformed
    pub fn new(
        id: impl Into<String>,
        config: SessionConfig,
        now: DateTime<Utc>,
    ) -> Result<Self, ModelError> {
        let requirements = config.resolve_requirements()?;
        let constraints = config.resolve_constraints()?;

        Ok(Self {
            id: id.into(),
            config,
            requirements,
            constraints,
            current_phase: Phase::Discovery,
            status: SessionStatus::Active,
            phase_history: vec![PhaseRecord::primary(Phase::Discovery, now)],
            coverage: IndexMap::new(),
            failed_attempts: 0,
            artifacts: Vec::new(),
            created_at: now,
            updated_at: now,
            abort_reason: None,
            revision: 0,
        })
    }

    /// Index of the primary record of the current phase
    #[must_use]
    pub fn current_record_index(&self) -> Option<usize> {
        self.phase_history
            .iter()
            .rposition(|r| r.is_primary() && r.phase == self.current_phase)
    }

    /// Primary record of the current phase
    #[must_use]
    pub fn current_record(&self) -> Option<&PhaseRecord> {
        self.current_record_index().map(|i| &self.phase_history[i])
    }

    /// Mutable primary record of the current phase
    pub fn current_record_mut(&mut self) -> Option<&mut PhaseRecord> {
        self.current_record_index()
            .map(move |i| &mut self.phase_history[i])
    }

    /// All records (primary and revisited) for `phase`
    pub fn records_for(&self, phase: Phase) -> impl Iterator<Item = &PhaseRecord> {
        self.phase_history.iter().filter(move |r| r.phase == phase)
    }

    /// Every decision with the phase it was recorded in
    pub fn decisions(&self) -> impl Iterator<Item = (Phase, &Decision)> {
        self.phase_history.iter().flat_map(|r| {
            r.content
                .iter()
                .flat_map(move |c| c.decisions.iter().map(move |d| (r.phase, d)))
        })
    }

    /// Phases of primary records in history order
    #[must_use]
    pub fn primary_phases(&self) -> Vec<Phase> {
        self.phase_history
            .iter()
            .filter(|r| r.is_primary())
            .map(|r| r.phase)
            .collect()
    }

    /// Declared requirement ids
    pub fn requirement_ids(&self) -> impl Iterator<Item = &str> {
        self.requirements.iter().map(|r| r.id.as_str())
    }

    /// Check if the session reached `Completed`
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status == SessionStatus::Completed
    }

    /// Lightweight listing entry
    #[must_use]
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            current_phase: self.current_phase,
            status: self.status,
            revision: self.revision,
            updated_at: self.updated_at,
        }
    }

    /// Stamp a committed mutation
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
        self.revision += 1;
    }
}

/// Listing entry for `list-sessions`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    /// Session id
    pub id: String,
    /// Phase currently open
    pub current_phase: Phase,
    /// Lifecycle status
    pub status: SessionStatus,
    /// Committed mutation count
    pub revision: u64,
    /// Last committed mutation
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Decision;

    fn session() -> Session {
        let config = SessionConfig::new().with_requirements(["R1", "R2"]);
        Session::new("s1", config, Utc::now()).unwrap()
    }

    #[test]
    fn new_session_starts_in_discovery() {
        let s = session();
        assert_eq!(s.current_phase, Phase::Discovery);
        assert_eq!(s.status, SessionStatus::Active);
        assert!(s.coverage.is_empty());
        assert_eq!(s.primary_phases(), vec![Phase::Discovery]);
        assert_eq!(s.current_record_index(), Some(0));
    }

    #[test]
    fn malformed_config_fails_creation() {
        let config = SessionConfig::new().with_requirements(["R1", "R1"]);
        assert!(Session::new("s1", config, Utc::now()).is_err());
    }

    #[test]
    fn current_record_skips_revisits() {
        let mut s = session();
        let now = Utc::now();
        s.phase_history[0].exited_at = Some(now);
        s.phase_history.push(PhaseRecord::primary(Phase::Analysis, now));
        s.current_phase = Phase::Analysis;
        s.phase_history
            .push(PhaseRecord::revisited(Phase::Discovery, PhaseContent::new(), now));

        assert_eq!(s.current_record_index(), Some(1));
        assert_eq!(s.records_for(Phase::Discovery).count(), 2);
    }

    #[test]
    fn decisions_carry_their_phase() {
        let mut s = session();
        s.current_record_mut().unwrap().content.push(
            PhaseContent::new().with_decision(Decision::new("D1", "Use a queue")),
        );
        let decisions: Vec<_> = s.decisions().collect();
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].0, Phase::Discovery);
    }

    #[test]
    fn touch_bumps_revision() {
        let mut s = session();
        s.touch(Utc::now());
        s.touch(Utc::now());
        assert_eq!(s.revision, 2);
    }

    #[test]
    fn session_round_trips_through_json() {
        let s = session();
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("\"currentPhase\":\"Discovery\""));
        let back: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }
}
