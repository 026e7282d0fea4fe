//! Artifact document families

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Document family an artifact strategy renders
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    /// Architecture decision record
    Adr,
    /// Requirements/design specification
    Specification,
    /// Time-ordered milestones
    Roadmap,
    /// Enterprise architecture overview
    EnterpriseArchitecture,
}

impl ArtifactKind {
    /// All kinds, in rendering order
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::Adr,
        ArtifactKind::Specification,
        ArtifactKind::Roadmap,
        ArtifactKind::EnterpriseArchitecture,
    ];

    /// Canonical wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::Adr => "adr",
            ArtifactKind::Specification => "specification",
            ArtifactKind::Roadmap => "roadmap",
            ArtifactKind::EnterpriseArchitecture => "enterprise-architecture",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "adr" | "decision-record" => Ok(ArtifactKind::Adr),
            "spec" | "specification" => Ok(ArtifactKind::Specification),
            "roadmap" => Ok(ArtifactKind::Roadmap),
            "enterprise-architecture" | "enterprise_architecture" | "ea" => {
                Ok(ArtifactKind::EnterpriseArchitecture)
            }
            _ => Err(ModelError::UnknownArtifactKind(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_aliases() {
        assert_eq!("ADR".parse::<ArtifactKind>().unwrap(), ArtifactKind::Adr);
        assert_eq!(
            "spec".parse::<ArtifactKind>().unwrap(),
            ArtifactKind::Specification
        );
        assert_eq!(
            "ea".parse::<ArtifactKind>().unwrap(),
            ArtifactKind::EnterpriseArchitecture
        );
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = "gantt".parse::<ArtifactKind>().unwrap_err();
        assert_eq!(err, ModelError::UnknownArtifactKind("gantt".to_string()));
    }

    #[test]
    fn wire_name_round_trips_through_display() {
        for kind in ArtifactKind::ALL {
            assert_eq!(kind.to_string().parse::<ArtifactKind>().unwrap(), kind);
        }
    }
}
