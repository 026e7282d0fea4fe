//! Built-in artifact strategies

mod adr;
mod enterprise;
mod roadmap;
mod specification;

pub use adr::AdrStrategy;
pub use enterprise::EnterpriseArchitectureStrategy;
pub use roadmap::RoadmapStrategy;
pub use specification::SpecificationStrategy;

use crate::document::DocumentPayload;
use chrono::{DateTime, SecondsFormat, Utc};
use dso_model::{Phase, Risk, Session};
use indexmap::IndexMap;
use std::collections::HashSet;

/// Document titled after the session goal (or id) with standard front matter
fn document(prefix: &str, session: &Session) -> DocumentPayload {
    let subject = if session.config.goal.trim().is_empty() {
        session.id.as_str()
    } else {
        session.config.goal.trim()
    };
    DocumentPayload::new(format!("{prefix}: {subject}"))
        .with_metadata("session", session.id.clone())
        .with_metadata("phase", session.current_phase.to_string())
        .with_metadata("status", session.status.to_string())
        .with_metadata("revision", session.revision.to_string())
}

/// Ids closed by any record
fn resolved_ids(session: &Session) -> HashSet<&str> {
    session
        .phase_history
        .iter()
        .flat_map(|r| r.content.iter())
        .flat_map(|c| c.resolved.iter().map(String::as_str))
        .collect()
}

/// Risks keyed by id with the phase that first flagged them
fn flagged_risks(session: &Session) -> IndexMap<&str, (Phase, &Risk)> {
    let mut risks = IndexMap::new();
    for record in &session.phase_history {
        for risk in record.content.iter().flat_map(|c| c.risks.iter()) {
            risks
                .entry(risk.id.as_str())
                .or_insert((record.phase, risk));
        }
    }
    risks
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}
