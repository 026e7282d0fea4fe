//! Enterprise architecture overview

use super::{document, flagged_risks, resolved_ids};
use crate::document::{DocumentPayload, Section};
use crate::error::ArtifactError;
use crate::strategy::ArtifactStrategy;
use dso_model::{ArtifactKind, Session};

/// Renders [`ArtifactKind::EnterpriseArchitecture`]
#[derive(Debug, Clone, Copy, Default)]
pub struct EnterpriseArchitectureStrategy;

impl ArtifactStrategy for EnterpriseArchitectureStrategy {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::EnterpriseArchitecture
    }

    fn name(&self) -> &'static str {
        "enterprise architecture"
    }

    fn render(&self, session: &Session) -> Result<DocumentPayload, ArtifactError> {
        let context = if session.config.context.trim().is_empty() {
            "No business context recorded."
        } else {
            session.config.context.trim()
        };

        let capabilities = session.requirements.iter().map(|r| {
            if r.description.is_empty() || r.description == r.id {
                r.id.clone()
            } else {
                format!("{}: {}", r.id, r.description)
            }
        });

        let decisions = session
            .decisions()
            .map(|(phase, d)| format!("{} ({phase}): {}", d.id, d.title));

        let resolved = resolved_ids(session);
        let risks = flagged_risks(session);
        let open = risks.keys().filter(|id| !resolved.contains(*id)).count();
        let covered = session.coverage.values().filter(|c| **c).count();

        Ok(document("Enterprise Architecture", session)
            .with_section(Section::new("Business context").paragraph(context))
            .with_section(Section::new("Capabilities").bullets(capabilities))
            .with_section(Section::new("Architecture decisions").bullets(decisions))
            .with_section(Section::new("Governance").key_values([
                ("current phase", session.current_phase.to_string()),
                ("status", session.status.to_string()),
                ("constraints", session.constraints.len().to_string()),
                (
                    "requirement coverage",
                    format!("{covered}/{}", session.requirements.len()),
                ),
                ("open risks", format!("{open}/{}", risks.len())),
                ("artifacts generated", session.artifacts.len().to_string()),
            ])))
    }
}
