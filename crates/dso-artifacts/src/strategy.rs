//! Artifact strategy trait

use crate::document::DocumentPayload;
use crate::error::ArtifactError;
use dso_model::{ArtifactKind, Session};

/// Renders one document family from a session snapshot
///
/// Strategies are stateless projections: the same snapshot must always
/// produce the same payload, and rendering must not depend on anything
/// but the snapshot.
///
/// # Example
/// ```rust,ignore
/// #[derive(Debug)]
/// struct GlossaryStrategy;
///
/// impl ArtifactStrategy for GlossaryStrategy {
///     fn kind(&self) -> ArtifactKind { ArtifactKind::Specification }
///     fn name(&self) -> &'static str { "glossary" }
///     fn render(&self, session: &Session) -> Result<DocumentPayload, ArtifactError> {
///         Ok(DocumentPayload::new(format!("Glossary for {}", session.id)))
///     }
/// }
/// ```
pub trait ArtifactStrategy: Send + Sync + std::fmt::Debug {
    /// Kind this strategy renders
    fn kind(&self) -> ArtifactKind;

    /// Human-readable strategy name
    fn name(&self) -> &'static str;

    /// Project `session` into a document
    ///
    /// # Errors
    /// Returns `ArtifactError::Render` if the snapshot cannot be projected
    fn render(&self, session: &Session) -> Result<DocumentPayload, ArtifactError>;
}
