//! Architecture decision records
//!
//! Surfaces only Design-phase decisions and their rationale, one section
//! per decision, in the order they were recorded.

use super::document;
use crate::document::{DocumentPayload, Section};
use crate::error::ArtifactError;
use crate::strategy::ArtifactStrategy;
use dso_model::{ArtifactKind, Phase, Session};

/// Renders [`ArtifactKind::Adr`]
#[derive(Debug, Clone, Copy, Default)]
pub struct AdrStrategy;

impl ArtifactStrategy for AdrStrategy {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Adr
    }

    fn name(&self) -> &'static str {
        "architecture decision records"
    }

    fn render(&self, session: &Session) -> Result<DocumentPayload, ArtifactError> {
        let design_closed = session
            .records_for(Phase::Design)
            .any(|r| r.is_primary() && !r.is_open());
        let status = if design_closed { "accepted" } else { "proposed" };

        let mut doc = document("Architecture Decision Records", session);
        if !session.config.context.trim().is_empty() {
            doc = doc.with_section(Section::new("Context").paragraph(session.config.context.trim()));
        }

        let decisions: Vec<_> = session
            .decisions()
            .filter(|(phase, _)| *phase == Phase::Design)
            .map(|(_, d)| d)
            .collect();

        if decisions.is_empty() {
            return Ok(doc.with_section(
                Section::new("Decisions").paragraph("No design decisions have been recorded."),
            ));
        }

        for decision in decisions {
            let addresses = if decision.requirements.is_empty() {
                "-".to_string()
            } else {
                decision.requirements.join(", ")
            };
            let rationale = if decision.rationale.trim().is_empty() {
                "No rationale recorded."
            } else {
                decision.rationale.trim()
            };
            doc = doc.with_section(
                Section::new(format!("{}: {}", decision.id, decision.title))
                    .key_values([("status", status.to_string()), ("addresses", addresses)])
                    .paragraph(rationale),
            );
        }
        Ok(doc)
    }
}
