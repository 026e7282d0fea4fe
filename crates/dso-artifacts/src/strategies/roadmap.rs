//! Roadmap
//!
//! Time-ordered view across every phase: the phase timeline, milestones
//! in the order they were recorded, and the phases still ahead.

use super::{document, timestamp};
use crate::document::{DocumentPayload, Section};
use crate::error::ArtifactError;
use crate::strategy::ArtifactStrategy;
use dso_model::{ArtifactKind, Phase, RecordKind, Session};

/// Renders [`ArtifactKind::Roadmap`]
#[derive(Debug, Clone, Copy, Default)]
pub struct RoadmapStrategy;

impl ArtifactStrategy for RoadmapStrategy {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Roadmap
    }

    fn name(&self) -> &'static str {
        "roadmap"
    }

    fn render(&self, session: &Session) -> Result<DocumentPayload, ArtifactError> {
        // stable sort keeps history order for equal timestamps
        let mut records: Vec<_> = session.phase_history.iter().collect();
        records.sort_by_key(|r| r.entered_at);

        let timeline = records
            .iter()
            .map(|r| {
                vec![
                    r.phase.to_string(),
                    match r.kind {
                        RecordKind::Primary => "primary".to_string(),
                        RecordKind::Revisited => "revisited".to_string(),
                    },
                    timestamp(r.entered_at),
                    r.exited_at.map_or_else(|| "open".to_string(), timestamp),
                ]
            })
            .collect();

        let milestones = records
            .iter()
            .flat_map(|r| {
                r.content
                    .iter()
                    .flat_map(|c| c.milestones.iter())
                    .map(move |m| {
                        vec![
                            m.title.clone(),
                            r.phase.to_string(),
                            m.due.clone().unwrap_or_else(|| "-".to_string()),
                            timestamp(r.entered_at),
                        ]
                    })
            })
            .collect();

        let remaining: Vec<String> = if session.status.is_terminal() {
            Vec::new()
        } else {
            Phase::ALL
                .into_iter()
                .filter(|p| *p > session.current_phase)
                .map(|p| p.to_string())
                .collect()
        };
        let mut ahead = Section::new("Remaining phases");
        ahead = if remaining.is_empty() {
            ahead.paragraph("No phases remaining.")
        } else {
            ahead.bullets(remaining)
        };

        Ok(document("Roadmap", session)
            .with_section(
                Section::new("Timeline").table(&["phase", "record", "entered", "exited"], timeline),
            )
            .with_section(
                Section::new("Milestones").table(&["milestone", "phase", "due", "recorded"], milestones),
            )
            .with_section(ahead))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use dso_model::{PhaseContent, PhaseRecord, SessionConfig};

    #[test]
    fn milestones_follow_time_order() {
        let t0 = Utc::now();
        let mut s = Session::new("s", SessionConfig::new().with_requirements(["R1"]), t0).unwrap();
        s.phase_history[0].content.push(
            PhaseContent::new().with_milestone("kickoff", Some("2026-01-10".into())),
        );
        s.phase_history[0].exited_at = Some(t0 + Duration::minutes(1));
        let mut analysis = PhaseRecord::primary(Phase::Analysis, t0 + Duration::minutes(1));
        analysis
            .content
            .push(PhaseContent::new().with_milestone("load test", None));
        s.phase_history.push(analysis);
        s.current_phase = Phase::Analysis;
        // a revisit of Discovery recorded later still sorts after Analysis
        s.phase_history.push(PhaseRecord::revisited(
            Phase::Discovery,
            PhaseContent::new().with_milestone("stakeholder sign-off", None),
            t0 + Duration::minutes(2),
        ));

        let doc = RoadmapStrategy.render(&s).unwrap();
        let titles: Vec<&str> = doc.section("Milestones").unwrap().blocks[0]
            .rows()
            .iter()
            .map(|row| row[0].as_str())
            .collect();
        assert_eq!(titles, vec!["kickoff", "load test", "stakeholder sign-off"]);

        let remaining = doc.section("Remaining phases").unwrap();
        assert_eq!(
            remaining.blocks[0],
            crate::document::Block::Bullets {
                items: vec!["Design".into(), "Validation".into(), "Documentation".into()]
            }
        );
    }
}
