//! Strategy registry
//!
//! Maps each [`ArtifactKind`] to the strategy that renders it. Unknown
//! kinds are rejected explicitly, and every requested kind is checked
//! before anything is rendered.

use crate::artifact::{Artifact, DOCUMENT_FORMAT};
use crate::error::ArtifactError;
use crate::strategies::{
    AdrStrategy, EnterpriseArchitectureStrategy, RoadmapStrategy, SpecificationStrategy,
};
use crate::strategy::ArtifactStrategy;
use chrono::{DateTime, Utc};
use dso_model::{ArtifactKind, Session};
use indexmap::IndexMap;
use std::sync::Arc;

/// Registry of artifact strategies keyed by kind
#[derive(Debug, Default, Clone)]
pub struct ArtifactRegistry {
    strategies: IndexMap<ArtifactKind, Arc<dyn ArtifactStrategy>>,
}

impl ArtifactRegistry {
    /// Create new empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            strategies: IndexMap::new(),
        }
    }

    /// Create registry with the built-in strategies
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(AdrStrategy);
        registry.register(SpecificationStrategy);
        registry.register(RoadmapStrategy);
        registry.register(EnterpriseArchitectureStrategy);
        registry
    }

    /// Register a strategy, replacing any previous one for the same kind
    pub fn register<S>(&mut self, strategy: S) -> Option<Arc<dyn ArtifactStrategy>>
    where
        S: ArtifactStrategy + 'static,
    {
        self.strategies.insert(strategy.kind(), Arc::new(strategy))
    }

    /// Check if a strategy exists for `kind`
    #[inline]
    #[must_use]
    pub fn contains(&self, kind: ArtifactKind) -> bool {
        self.strategies.contains_key(&kind)
    }

    /// Strategy for `kind`
    #[must_use]
    pub fn get(&self, kind: ArtifactKind) -> Option<&Arc<dyn ArtifactStrategy>> {
        self.strategies.get(&kind)
    }

    /// Registered kinds in registration order
    #[must_use]
    pub fn kinds(&self) -> Vec<ArtifactKind> {
        self.strategies.keys().copied().collect()
    }

    /// Get number of registered strategies
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Deduplicated kinds to render; empty input selects every registered kind
    ///
    /// # Errors
    /// Returns `ArtifactError::UnregisteredKind` for the first unknown kind
    pub fn resolve_kinds(&self, kinds: &[ArtifactKind]) -> Result<Vec<ArtifactKind>, ArtifactError> {
        if kinds.is_empty() {
            return Ok(self.kinds());
        }
        let mut resolved = Vec::with_capacity(kinds.len());
        for kind in kinds {
            if !self.contains(*kind) {
                return Err(ArtifactError::UnregisteredKind(*kind));
            }
            if !resolved.contains(kind) {
                resolved.push(*kind);
            }
        }
        Ok(resolved)
    }

    /// Render `kinds` from `session`
    ///
    /// # Errors
    /// Returns `ArtifactError` if a kind is unregistered (nothing is
    /// rendered then) or a strategy fails
    pub fn generate(
        &self,
        session: &Session,
        kinds: &[ArtifactKind],
        now: DateTime<Utc>,
    ) -> Result<Vec<Artifact>, ArtifactError> {
        let kinds = self.resolve_kinds(kinds)?;
        let mut artifacts = Vec::with_capacity(kinds.len());

        for kind in kinds {
            let strategy = self
                .get(kind)
                .ok_or(ArtifactError::UnregisteredKind(kind))?;
            let content = strategy.render(session)?;
            let digest = content.digest()?;
            tracing::debug!(
                session_id = %session.id,
                %kind,
                strategy = strategy.name(),
                sections = content.sections.len(),
                "artifact rendered"
            );
            artifacts.push(Artifact {
                kind,
                format: DOCUMENT_FORMAT.to_string(),
                content,
                generated_from_phase: session.current_phase,
                session_complete: session.is_complete(),
                generated_at: now,
                digest,
            });
        }

        Ok(artifacts)
    }
}
