//! Specification document
//!
//! Requirements with their coverage and addressing decisions, the full
//! decision log, the risk register and the constraints in force.

use super::{document, flagged_risks, resolved_ids, yes_no};
use crate::document::{DocumentPayload, Section};
use crate::error::ArtifactError;
use crate::strategy::ArtifactStrategy;
use dso_model::{ArtifactKind, Session};

/// Renders [`ArtifactKind::Specification`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SpecificationStrategy;

impl ArtifactStrategy for SpecificationStrategy {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Specification
    }

    fn name(&self) -> &'static str {
        "specification"
    }

    fn render(&self, session: &Session) -> Result<DocumentPayload, ArtifactError> {
        let mut overview = Section::new("Overview");
        if !session.config.goal.trim().is_empty() {
            overview = overview.paragraph(session.config.goal.trim());
        }
        if !session.config.context.trim().is_empty() {
            overview = overview.paragraph(session.config.context.trim());
        }

        let requirement_rows = session
            .requirements
            .iter()
            .map(|r| {
                let addressed_by: Vec<&str> = session
                    .decisions()
                    .filter(|(_, d)| d.requirements.iter().any(|id| *id == r.id))
                    .map(|(_, d)| d.id.as_str())
                    .collect();
                vec![
                    r.id.clone(),
                    r.description.clone(),
                    yes_no(session.coverage.get(&r.id).copied().unwrap_or(false)).to_string(),
                    addressed_by.join(", "),
                ]
            })
            .collect();

        let decision_rows = session
            .decisions()
            .map(|(phase, d)| {
                vec![
                    d.id.clone(),
                    d.title.clone(),
                    phase.to_string(),
                    d.requirements.join(", "),
                    d.rationale.clone(),
                ]
            })
            .collect();

        let resolved = resolved_ids(session);
        let risk_rows = flagged_risks(session)
            .into_iter()
            .map(|(id, (phase, risk))| {
                let state = if resolved.contains(id) { "resolved" } else { "open" };
                vec![
                    id.to_string(),
                    risk.description.clone(),
                    phase.to_string(),
                    state.to_string(),
                ]
            })
            .collect();

        let constraint_rows = session
            .constraints
            .iter()
            .map(|c| {
                vec![
                    c.id.clone(),
                    c.severity.to_string(),
                    c.applies_to
                        .map_or_else(|| "all phases".to_string(), |p| p.to_string()),
                    c.description.clone(),
                ]
            })
            .collect();

        Ok(document("Specification", session)
            .with_section(overview)
            .with_section(Section::new("Requirements").table(
                &["id", "description", "covered", "addressed by"],
                requirement_rows,
            ))
            .with_section(Section::new("Decisions").table(
                &["id", "title", "phase", "requirements", "rationale"],
                decision_rows,
            ))
            .with_section(
                Section::new("Risks").table(&["id", "description", "flagged in", "state"], risk_rows),
            )
            .with_section(Section::new("Constraints").table(
                &["id", "severity", "applies to", "description"],
                constraint_rows,
            )))
    }
}
