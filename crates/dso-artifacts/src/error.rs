//! Artifact generation errors

use dso_model::ArtifactKind;

/// Errors raised while generating artifacts
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    /// No strategy registered for the requested kind
    #[error("no strategy registered for artifact kind '{0}'")]
    UnregisteredKind(ArtifactKind),

    /// Strategy could not project the session
    #[error("failed to render {kind}: {reason}")]
    Render { kind: ArtifactKind, reason: String },

    /// Payload could not be encoded for digesting
    #[error("failed to encode artifact payload: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl ArtifactError {
    /// Check if the caller asked for something that cannot exist
    #[inline]
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::UnregisteredKind(_))
    }
}
