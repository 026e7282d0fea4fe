//! Error types for DSO Core
//!
//! Every Session Manager operation fails with [`DsoError`]. Lower layers
//! convert in through `#[from]`, and each variant maps to a stable wire code
//! used by the dispatcher.

use dso_artifacts::ArtifactError;
use dso_model::ModelError;
use dso_workflow::WorkflowError;
use std::path::PathBuf;

/// Main orchestrator error type
#[derive(Debug, thiserror::Error)]
pub enum DsoError {
    /// Unknown session id
    #[error("session not found: {0}")]
    NotFound(String),

    /// `start-session` with an id already in the store
    #[error("session already exists: {0}")]
    DuplicateSession(String),

    /// Malformed request or orchestrator configuration
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Malformed session configuration
    #[error("invalid session config: {0}")]
    InvalidConfig(#[from] ModelError),

    /// Artifact generation failed
    #[error("artifact generation failed: {0}")]
    Artifact(#[from] ArtifactError),

    /// Request is not legal in the current session state
    #[error("invalid transition: {0}")]
    InvalidTransition(#[from] WorkflowError),

    /// Per-session lock not acquired in time
    #[error("timed out after {waited_ms}ms waiting for session {session_id}")]
    ConcurrencyTimeout {
        /// Contended session
        session_id: String,
        /// How long the caller waited
        waited_ms: u64,
    },

    /// Persistence backend failed; in-memory state is unchanged
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

impl DsoError {
    /// Stable wire code
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::DuplicateSession(_) => "duplicate_session",
            Self::Configuration(_) | Self::InvalidConfig(_) => "configuration",
            Self::Artifact(e) if e.is_configuration() => "configuration",
            Self::Artifact(_) => "internal",
            Self::InvalidTransition(_) => "invalid_transition",
            Self::ConcurrencyTimeout { .. } => "concurrency_timeout",
            Self::Persistence(_) => "persistence",
        }
    }

    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConcurrencyTimeout { .. } | Self::Persistence(PersistenceError::Io { .. })
        )
    }

    /// Check if the caller sent something that can never succeed
    #[inline]
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        self.code() == "configuration"
    }
}

/// Session persistence errors
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// Filesystem failure
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Session could not be encoded
    #[error("failed to encode session {id}: {source}")]
    Encode {
        /// Session id
        id: String,
        /// Underlying error
        source: serde_json::Error,
    },

    /// Stored document could not be decoded
    #[error("failed to decode {}: {source}", .path.display())]
    Decode {
        /// Document path
        path: PathBuf,
        /// Underlying error
        source: serde_json::Error,
    },

    /// Id cannot be used as a storage key
    #[error("session id cannot be stored: '{0}'")]
    InvalidId(String),

    /// Backend-specific failure
    #[error("{0}")]
    Backend(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use dso_model::ArtifactKind;

    #[test]
    fn codes_are_stable() {
        assert_eq!(DsoError::NotFound("s".into()).code(), "not_found");
        assert_eq!(
            DsoError::from(ArtifactError::UnregisteredKind(ArtifactKind::Roadmap)).code(),
            "configuration"
        );
        assert_eq!(
            DsoError::from(ModelError::DuplicateRequirement("R1".into())).code(),
            "configuration"
        );
        assert_eq!(
            DsoError::ConcurrencyTimeout {
                session_id: "s".into(),
                waited_ms: 10
            }
            .code(),
            "concurrency_timeout"
        );
    }

    #[test]
    fn only_transient_errors_retry() {
        assert!(DsoError::ConcurrencyTimeout {
            session_id: "s".into(),
            waited_ms: 10
        }
        .is_retryable());
        assert!(!DsoError::NotFound("s".into()).is_retryable());
        assert!(!DsoError::from(PersistenceError::InvalidId("../x".into())).is_retryable());
    }
}
