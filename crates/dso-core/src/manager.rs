//! Session Manager
//!
//! Public entry point of the orchestrator. Every mutation follows the same
//! path: take the session's write lock, compute the next snapshot purely,
//! persist it, then swap it in. Anything that fails before the swap
//! leaves the stored session exactly as it was.

use crate::config::{validate_threshold, OrchestratorConfig};
use crate::error::DsoError;
use crate::persistence::{self, InMemoryPersistence, SessionPersistence};
use crate::store::SessionStore;
use chrono::Utc;
use dso_artifacts::{Artifact, ArtifactRegistry};
use dso_model::{
    ArtifactKind, ConstraintRule, Phase, PhaseContent, Session, SessionConfig, SessionSummary,
    ThresholdRule, Violation,
};
use dso_validation::{CoverageReport, ReferenceIndex};
use dso_workflow::{AdvanceOutcome, PhaseWorkflow, Transition};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use ulid::Ulid;

/// Orchestrates design sessions
pub struct SessionManager {
    config: OrchestratorConfig,
    store: SessionStore,
    persistence: Arc<dyn SessionPersistence>,
    workflow: PhaseWorkflow,
    registry: ArtifactRegistry,
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("config", &self.config)
            .field("sessions", &self.store.len())
            .field("workflow", &self.workflow)
            .field("registry", &self.registry.kinds())
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Create manager with the persistence backend named in `config`
    ///
    /// Sessions already stored by the backend are restored.
    ///
    /// # Errors
    /// Returns `DsoError` if the config is invalid or the backend cannot be
    /// opened or read
    pub fn new(config: OrchestratorConfig) -> Result<Self, DsoError> {
        config.validate()?;
        let persistence = persistence::from_config(&config.persistence)?;
        Self::with_persistence(config, persistence)
    }

    /// Create manager over an explicit backend, restoring stored sessions
    ///
    /// # Errors
    /// Returns `DsoError` if the config is invalid or restoring fails
    pub fn with_persistence(
        config: OrchestratorConfig,
        persistence: Arc<dyn SessionPersistence>,
    ) -> Result<Self, DsoError> {
        config.validate()?;
        let manager = Self::build(config, persistence);
        manager.restore()?;
        Ok(manager)
    }

    /// Create manager with default settings and in-memory storage
    #[must_use]
    pub fn in_memory() -> Self {
        Self::build(
            OrchestratorConfig::default(),
            Arc::new(InMemoryPersistence::new()),
        )
    }

    fn build(config: OrchestratorConfig, persistence: Arc<dyn SessionPersistence>) -> Self {
        Self {
            store: SessionStore::new(config.lock_timeout()),
            workflow: PhaseWorkflow::new().with_max_blocked_attempts(config.max_blocked_attempts),
            registry: ArtifactRegistry::with_defaults(),
            persistence,
            config,
        }
    }

    /// Replace the artifact strategy registry
    #[inline]
    #[must_use]
    pub fn with_registry(mut self, registry: ArtifactRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Artifact strategies in use
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &ArtifactRegistry {
        &self.registry
    }

    /// Get number of live sessions
    #[inline]
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.store.len()
    }

    /// Load every stored snapshot into the store
    ///
    /// Undecodable snapshots and snapshots stored under another session's id
    /// are logged and skipped; only an unreadable backend fails.
    fn restore(&self) -> Result<usize, DsoError> {
        let mut restored = 0;
        let mut skipped = 0;
        for id in self.persistence.list_ids()? {
            let session = match self.persistence.load(&id) {
                Ok(Some(session)) => session,
                Ok(None) => {
                    tracing::warn!(session_id = %id, "listed session vanished before restore");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(session_id = %id, error = %e, "skipping unreadable session snapshot");
                    skipped += 1;
                    continue;
                }
            };
            if session.id != id {
                tracing::warn!(
                    session_id = %id,
                    stored_id = %session.id,
                    "skipping session snapshot stored under a different id"
                );
                skipped += 1;
                continue;
            }
            match self.store.insert_new(session) {
                Ok(_) => restored += 1,
                Err(e) => {
                    tracing::warn!(session_id = %id, error = %e, "skipping session snapshot");
                    skipped += 1;
                }
            }
        }
        if restored > 0 || skipped > 0 {
            tracing::info!(restored, skipped, "sessions restored");
        }
        Ok(restored)
    }

    /// Create a session in `Discovery`; a ULID is generated when `id` is absent
    ///
    /// # Errors
    /// - `DsoError::DuplicateSession` if the id is taken
    /// - `DsoError::InvalidConfig` / `Configuration` for malformed input
    /// - `DsoError::Persistence` if the snapshot cannot be stored (nothing is
    ///   left behind)
    pub fn start_session(
        &self,
        id: Option<String>,
        config: SessionConfig,
    ) -> Result<Session, DsoError> {
        let id = match id {
            Some(id) if id.trim().is_empty() => {
                return Err(DsoError::Configuration(
                    "session id must not be empty".to_string(),
                ))
            }
            Some(id) => id,
            None => Ulid::new().to_string(),
        };
        let session = Session::new(id.clone(), config, Utc::now())?;

        // lock before publishing so nobody observes an unpersisted session
        let handle = Arc::new(RwLock::new(session));
        let guard = handle.write();
        self.store.insert(&id, &handle)?;
        if let Err(e) = self.persistence.save(&guard) {
            self.store.remove_if_current(&id, &handle);
            return Err(e.into());
        }

        tracing::info!(
            session_id = %id,
            requirements = guard.requirements.len(),
            constraints = guard.constraints.len(),
            "session started"
        );
        Ok(guard.clone())
    }

    /// Attach content to the current phase and try to close it
    ///
    /// A rejected advance is not an error: the outcome carries the blocking
    /// violations and a [`Transition::Held`] or [`Transition::Blocked`].
    ///
    /// # Errors
    /// `NotFound`, `ConcurrencyTimeout`, `InvalidTransition` or `Persistence`
    pub fn advance_phase(
        &self,
        id: &str,
        content: Option<PhaseContent>,
    ) -> Result<AdvanceOutcome, DsoError> {
        let outcome = self.mutate(id, |session| {
            let outcome = self.workflow.advance(session, content, Utc::now())?;
            let next = outcome
                .transition
                .is_change()
                .then(|| outcome.session.clone());
            Ok((next, outcome))
        })?;

        match outcome.transition {
            Transition::Advanced { from, to } => {
                tracing::info!(session_id = id, %from, %to, "phase advanced");
            }
            Transition::Completed { from } => {
                tracing::info!(session_id = id, %from, "session completed");
            }
            Transition::Held { phase, attempts } | Transition::Blocked { phase, attempts } => {
                tracing::warn!(
                    session_id = id,
                    %phase,
                    attempts,
                    blocking = outcome.blocking().count(),
                    "advance blocked"
                );
            }
            Transition::Unchanged { status } => {
                tracing::debug!(session_id = id, %status, "advance on terminal session ignored");
            }
        }
        Ok(outcome)
    }

    /// Violations that would block leaving the current phase right now
    ///
    /// Read-only: takes the shared lock and changes nothing.
    ///
    /// # Errors
    /// `NotFound` or `ConcurrencyTimeout`
    pub fn validate_phase(&self, id: &str) -> Result<Vec<Violation>, DsoError> {
        self.inspect(id, |session| self.workflow.evaluate(session).all())
    }

    /// Recompute coverage and check it against a threshold
    ///
    /// The threshold in force is `threshold`, else the strictest coverage
    /// constraint applying to the current phase, else the configured default.
    ///
    /// # Errors
    /// `Configuration` for an out-of-range threshold, `NotFound`,
    /// `ConcurrencyTimeout` or `Persistence`
    pub fn enforce_coverage(
        &self,
        id: &str,
        threshold: Option<f64>,
    ) -> Result<CoverageReport, DsoError> {
        if let Some(threshold) = threshold {
            validate_threshold(threshold)?;
        }
        let report = self.mutate(id, |session| {
            let threshold = threshold.unwrap_or_else(|| self.threshold_for(session));
            let refs = ReferenceIndex::build(session);
            let report = CoverageReport::evaluate(session, &refs, threshold);
            let next = (report.requirements != session.coverage).then(|| {
                let mut next = session.clone();
                next.coverage = report.requirements.clone();
                next.touch(Utc::now());
                next
            });
            Ok((next, report))
        })?;

        tracing::info!(
            session_id = id,
            percentage = report.percentage,
            threshold = report.threshold,
            passed = report.meets_threshold(),
            "coverage enforced"
        );
        Ok(report)
    }

    fn threshold_for(&self, session: &Session) -> f64 {
        session
            .constraints
            .iter()
            .filter(|c| c.applies(session.current_phase))
            .filter_map(|c| match c.rule {
                ConstraintRule::Threshold(ThresholdRule::MinCoverage { percent }) => Some(percent),
                _ => None,
            })
            .reduce(f64::max)
            .unwrap_or(self.config.default_coverage_threshold)
    }

    /// Render artifacts and record them on the session
    ///
    /// An empty `kinds` renders every registered kind. Phase, status and
    /// coverage are never touched.
    ///
    /// # Errors
    /// `Artifact` (configuration class) for unregistered kinds, checked
    /// before anything renders; `NotFound`, `ConcurrencyTimeout` or
    /// `Persistence`
    pub fn generate_artifacts(
        &self,
        id: &str,
        kinds: &[ArtifactKind],
    ) -> Result<Vec<Artifact>, DsoError> {
        self.registry.resolve_kinds(kinds)?;
        let artifacts = self.mutate(id, |session| {
            let now = Utc::now();
            let artifacts = self.registry.generate(session, kinds, now)?;
            if artifacts.is_empty() {
                return Ok((None, artifacts));
            }
            let mut next = session.clone();
            next.artifacts.extend(artifacts.iter().map(Artifact::record));
            next.touch(now);
            Ok((Some(next), artifacts))
        })?;

        tracing::info!(
            session_id = id,
            count = artifacts.len(),
            kinds = ?artifacts.iter().map(|a| a.kind).collect::<Vec<_>>(),
            "artifacts generated"
        );
        Ok(artifacts)
    }

    /// Current snapshot
    ///
    /// # Errors
    /// `NotFound` or `ConcurrencyTimeout`
    pub fn get_status(&self, id: &str) -> Result<Session, DsoError> {
        self.inspect(id, Session::clone)
    }

    /// Abandon a session; terminal sessions are returned unchanged
    ///
    /// # Errors
    /// `NotFound`, `ConcurrencyTimeout` or `Persistence`
    pub fn abort_session(&self, id: &str, reason: Option<String>) -> Result<Session, DsoError> {
        self.mutate(id, |session| {
            let outcome = self.workflow.abort(session, reason, Utc::now())?;
            if outcome.changed {
                tracing::info!(
                    session_id = id,
                    reason = outcome.session.abort_reason.as_deref().unwrap_or(""),
                    "session aborted"
                );
            }
            let snapshot = outcome.session.clone();
            Ok((outcome.changed.then_some(outcome.session), snapshot))
        })
    }

    /// Append content to a phase that was already exited
    ///
    /// # Errors
    /// `InvalidTransition` unless `phase` precedes the current phase of a
    /// live session; `NotFound`, `ConcurrencyTimeout` or `Persistence`
    pub fn revisit_phase(
        &self,
        id: &str,
        phase: Phase,
        content: PhaseContent,
    ) -> Result<Session, DsoError> {
        let session = self.mutate(id, |session| {
            let next = self.workflow.revisit(session, phase, content, Utc::now())?;
            Ok((Some(next.clone()), next))
        })?;
        tracing::info!(session_id = id, %phase, "phase revisited");
        Ok(session)
    }

    /// Summaries of every live session, sorted by id
    ///
    /// Sessions evicted while listing are left out. Sessions whose lock
    /// cannot be taken in time are left out with a warning.
    #[must_use]
    pub fn list_sessions(&self) -> Vec<SessionSummary> {
        self.store
            .ids()
            .into_iter()
            .filter_map(|id| match self.inspect(&id, Session::summary) {
                Ok(summary) => Some(summary),
                Err(DsoError::NotFound(_)) => {
                    tracing::debug!(session_id = %id, "session evicted while listing");
                    None
                }
                Err(e) => {
                    tracing::warn!(session_id = %id, error = %e, "session left out of listing");
                    None
                }
            })
            .collect()
    }

    /// Remove a session from the store and from persistence
    ///
    /// # Errors
    /// `NotFound`, `ConcurrencyTimeout` or `Persistence` (the session then
    /// stays live)
    pub fn evict_session(&self, id: &str) -> Result<Session, DsoError> {
        let handle = self.store.handle(id)?;
        let guard = self.store.write(id, &handle)?;
        self.store.ensure_current(id, &handle)?;
        self.persistence.delete(id)?;
        self.store.remove_if_current(id, &handle);
        tracing::info!(session_id = id, "session evicted");
        Ok(guard.clone())
    }

    /// Run `f` under the shared lock
    fn inspect<T>(&self, id: &str, f: impl FnOnce(&Session) -> T) -> Result<T, DsoError> {
        let handle = self.store.handle(id)?;
        let guard = self.store.read(id, &handle)?;
        self.store.ensure_current(id, &handle)?;
        Ok(f(&guard))
    }

    /// Run `f` under the exclusive lock; a returned snapshot is persisted
    /// and then swapped in
    fn mutate<T>(
        &self,
        id: &str,
        f: impl FnOnce(&Session) -> Result<(Option<Session>, T), DsoError>,
    ) -> Result<T, DsoError> {
        let handle = self.store.handle(id)?;
        let mut guard = self.store.write(id, &handle)?;
        self.store.ensure_current(id, &handle)?;

        let (next, value) = f(&guard)?;
        if let Some(next) = next {
            self.persistence.save(&next)?;
            *guard = next;
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PersistenceError;
    use crate::persistence::MockSessionPersistence;
    use dso_model::{Decision, SessionStatus};
    use mockall::Sequence;
    use pretty_assertions::assert_eq;

    fn config() -> SessionConfig {
        SessionConfig::new()
            .with_goal("order service")
            .with_requirements(["R1", "R2"])
    }

    fn passing(phase: Phase) -> PhaseContent {
        let content = PhaseContent::new()
            .with_ref(format!("{phase} notes"))
            .referencing(["R1", "R2"]);
        if phase == Phase::Design {
            content.with_decision(
                Decision::new("D1", "saga")
                    .with_rationale("cross-service consistency")
                    .addressing(["R1", "R2"]),
            )
        } else {
            content
        }
    }

    #[test]
    fn start_generates_ulid_and_rejects_duplicates() {
        let manager = SessionManager::in_memory();
        let generated = manager.start_session(None, config()).unwrap();
        assert_eq!(generated.id.len(), 26);

        manager.start_session(Some("s1".into()), config()).unwrap();
        let err = manager
            .start_session(Some("s1".into()), config())
            .unwrap_err();
        assert_eq!(err.code(), "duplicate_session");
        assert_eq!(manager.session_count(), 2);
    }

    #[test]
    fn malformed_config_is_rejected_at_start() {
        let manager = SessionManager::in_memory();
        let err = manager
            .start_session(Some("s".into()), SessionConfig::new().with_requirements(["R1", "R1"]))
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(matches!(manager.get_status("s"), Err(DsoError::NotFound(_))));
    }

    #[test]
    fn coverage_threshold_prefers_override_then_constraint() {
        let manager = SessionManager::in_memory();
        let cfg = config().with_constraint(dso_model::ConstraintSpec::min_coverage("half", 50.0));
        manager.start_session(Some("s".into()), cfg).unwrap();
        manager
            .advance_phase("s", Some(PhaseContent::new().with_ref("R1 only")))
            .unwrap();

        let report = manager.enforce_coverage("s", None).unwrap();
        assert_eq!(report.threshold, 50.0);
        assert!(report.meets_threshold());

        let report = manager.enforce_coverage("s", Some(100.0)).unwrap();
        assert!(!report.meets_threshold());
        assert!(report.violations[0].message.contains("R2"));

        assert!(manager.enforce_coverage("s", Some(101.0)).unwrap_err().is_configuration());
    }

    #[test]
    fn artifacts_leave_phase_and_status_alone() {
        let manager = SessionManager::in_memory();
        manager.start_session(Some("s".into()), config()).unwrap();
        manager.advance_phase("s", Some(passing(Phase::Discovery))).unwrap();
        let before = manager.get_status("s").unwrap();

        let artifacts = manager
            .generate_artifacts("s", &[ArtifactKind::Roadmap])
            .unwrap();
        assert_eq!(artifacts.len(), 1);
        assert!(artifacts[0].is_partial());

        let after = manager.get_status("s").unwrap();
        assert_eq!(after.current_phase, before.current_phase);
        assert_eq!(after.status, before.status);
        assert_eq!(after.coverage, before.coverage);
        assert_eq!(after.artifacts.len(), 1);
        assert_eq!(after.artifacts[0].digest, artifacts[0].digest);
    }

    #[test]
    fn evicted_sessions_are_gone() {
        let manager = SessionManager::in_memory();
        manager.start_session(Some("s".into()), config()).unwrap();
        let last = manager.evict_session("s").unwrap();
        assert_eq!(last.id, "s");
        assert!(manager.list_sessions().is_empty());
        assert!(matches!(manager.evict_session("s"), Err(DsoError::NotFound(_))));
    }

    #[test]
    fn failed_persist_rolls_back_advance() {
        let mut mock = MockSessionPersistence::new();
        mock.expect_list_ids().returning(|| Ok(Vec::new()));
        let mut seq = Sequence::new();
        mock.expect_save()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        mock.expect_save()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(PersistenceError::Backend("disk full".into())));

        let manager =
            SessionManager::with_persistence(OrchestratorConfig::default(), Arc::new(mock))
                .unwrap();
        let started = manager.start_session(Some("s".into()), config()).unwrap();

        let err = manager
            .advance_phase("s", Some(passing(Phase::Discovery)))
            .unwrap_err();
        assert_eq!(err.code(), "persistence");

        let current = manager.get_status("s").unwrap();
        assert_eq!(current, started);
        assert_eq!(current.current_phase, Phase::Discovery);
        assert!(current.phase_history[0].content.is_empty());
    }

    #[test]
    fn failed_persist_rolls_back_start() {
        let mut mock = MockSessionPersistence::new();
        mock.expect_list_ids().returning(|| Ok(Vec::new()));
        mock.expect_save()
            .returning(|_| Err(PersistenceError::Backend("read-only".into())));

        let manager =
            SessionManager::with_persistence(OrchestratorConfig::default(), Arc::new(mock))
                .unwrap();
        assert!(manager.start_session(Some("s".into()), config()).is_err());
        assert!(manager.list_sessions().is_empty());
    }

    #[test]
    fn restore_skips_unloadable_snapshots() {
        let good = Session::new("good", config(), Utc::now()).unwrap();
        let mut mock = MockSessionPersistence::new();
        mock.expect_list_ids()
            .returning(|| Ok(vec!["broken".into(), "good".into(), "renamed".into()]));
        mock.expect_load().returning(move |id| match id {
            "broken" => Err(PersistenceError::Backend("truncated".into())),
            _ => Ok(Some(good.clone())),
        });

        let manager =
            SessionManager::with_persistence(OrchestratorConfig::default(), Arc::new(mock))
                .unwrap();
        assert_eq!(manager.session_count(), 1);
        assert!(manager.get_status("good").is_ok());
        assert_eq!(manager.get_status("renamed").unwrap_err().code(), "not_found");
    }

    #[test]
    fn listing_leaves_out_locked_sessions() {
        let manager = SessionManager::with_persistence(
            OrchestratorConfig::new().with_lock_timeout_ms(1),
            Arc::new(InMemoryPersistence::new()),
        )
        .unwrap();
        manager.start_session(Some("busy".into()), config()).unwrap();
        manager.start_session(Some("idle".into()), config()).unwrap();

        let handle = manager.store.handle("busy").unwrap();
        let guard = handle.write();
        let listed: Vec<_> = manager.list_sessions().into_iter().map(|s| s.id).collect();
        assert_eq!(listed, vec!["idle".to_string()]);

        drop(guard);
        assert_eq!(manager.list_sessions().len(), 2);
    }

    #[test]
    fn restores_sessions_from_backend() {
        let backend = Arc::new(InMemoryPersistence::new());
        {
            let manager = SessionManager::with_persistence(
                OrchestratorConfig::default(),
                Arc::clone(&backend) as Arc<dyn SessionPersistence>,
            )
            .unwrap();
            manager.start_session(Some("kept".into()), config()).unwrap();
            manager.abort_session("kept", None).unwrap();
        }

        let manager =
            SessionManager::with_persistence(OrchestratorConfig::default(), backend).unwrap();
        let restored = manager.get_status("kept").unwrap();
        assert_eq!(restored.status, SessionStatus::Aborted);
    }
}
