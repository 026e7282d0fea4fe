//! Generated artifact

use crate::document::DocumentPayload;
use chrono::{DateTime, Utc};
use dso_model::{ArtifactKind, ArtifactRecord, Phase};
use serde::{Deserialize, Serialize};

/// Format tag carried by every payload this crate produces
pub const DOCUMENT_FORMAT: &str = "dso.document.v1";

/// Document derived from a session snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// Document family
    pub kind: ArtifactKind,
    /// Payload format tag
    pub format: String,
    /// Structured payload
    pub content: DocumentPayload,
    /// Phase current when the snapshot was taken
    pub generated_from_phase: Phase,
    /// Whether the session was completed at generation time
    pub session_complete: bool,
    /// Generation timestamp
    pub generated_at: DateTime<Utc>,
    /// Blake3 digest (hex) of the payload
    pub digest: String,
}

impl Artifact {
    /// Log entry to append to the session
    #[must_use]
    pub fn record(&self) -> ArtifactRecord {
        ArtifactRecord {
            kind: self.kind,
            generated_from_phase: self.generated_from_phase,
            session_complete: self.session_complete,
            digest: self.digest.clone(),
            generated_at: self.generated_at,
        }
    }

    /// Check if this is a partial artifact
    #[inline]
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.session_complete
    }
}
