//! Phase content supplied by the prompt-building collaborators
//!
//! The orchestrator never parses prose. A [`PhaseContent`] is an opaque list
//! of content refs plus a small set of structured hints (requirements
//! referenced, decisions made, risks flagged, items closed or carried).

use serde::{Deserialize, Serialize};

/// Content attached to a phase by one `advance-phase` or `revisit-phase` call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PhaseContent {
    /// Opaque content blobs (prompt output, links, notes)
    pub refs: Vec<String>,
    /// Requirement ids this content addresses
    pub requirements: Vec<String>,
    /// Decisions made in this content
    pub decisions: Vec<Decision>,
    /// Risks flagged in this content
    pub risks: Vec<Risk>,
    /// Tracked items (requirements or risks) explicitly closed
    pub resolved: Vec<String>,
    /// Tracked items explicitly carried forward while still open
    pub carried_forward: Vec<String>,
    /// Milestones proposed in this content
    pub milestones: Vec<Milestone>,
}

impl PhaseContent {
    /// Create empty content
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an opaque content ref
    #[must_use]
    pub fn with_ref(mut self, content: impl Into<String>) -> Self {
        self.refs.push(content.into());
        self
    }

    /// Mark requirement ids as addressed
    #[must_use]
    pub fn referencing<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requirements.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Record a decision
    #[must_use]
    pub fn with_decision(mut self, decision: Decision) -> Self {
        self.decisions.push(decision);
        self
    }

    /// Flag a risk
    #[must_use]
    pub fn with_risk(mut self, id: impl Into<String>, description: impl Into<String>) -> Self {
        self.risks.push(Risk {
            id: id.into(),
            description: description.into(),
        });
        self
    }

    /// Close tracked items
    #[must_use]
    pub fn resolving<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resolved.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Carry tracked items forward
    #[must_use]
    pub fn carrying<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.carried_forward.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Propose a milestone
    #[must_use]
    pub fn with_milestone(mut self, title: impl Into<String>, due: Option<String>) -> Self {
        self.milestones.push(Milestone {
            title: title.into(),
            due,
        });
        self
    }

    /// True when neither refs nor hints carry anything
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
            && self.requirements.is_empty()
            && self.decisions.is_empty()
            && self.risks.is_empty()
            && self.resolved.is_empty()
            && self.carried_forward.is_empty()
            && self.milestones.is_empty()
    }

    /// Every id named explicitly by the structured hints
    ///
    /// Text inside `refs` is not inspected here.
    pub fn hinted_ids(&self) -> impl Iterator<Item = &str> {
        self.requirements
            .iter()
            .map(String::as_str)
            .chain(
                self.decisions
                    .iter()
                    .flat_map(|d| d.requirements.iter().map(String::as_str)),
            )
            .chain(self.risks.iter().map(|r| r.id.as_str()))
            .chain(self.resolved.iter().map(String::as_str))
            .chain(self.carried_forward.iter().map(String::as_str))
    }
}

/// A design decision and the requirements it addresses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    /// Decision identifier (e.g. `D1`)
    pub id: String,
    /// Short title
    pub title: String,
    /// Why this option was chosen
    #[serde(default)]
    pub rationale: String,
    /// Requirement ids addressed
    #[serde(default)]
    pub requirements: Vec<String>,
}

impl Decision {
    /// Create decision without rationale
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            rationale: String::new(),
            requirements: Vec::new(),
        }
    }

    /// Set rationale
    #[must_use]
    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = rationale.into();
        self
    }

    /// Link addressed requirements
    #[must_use]
    pub fn addressing<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requirements.extend(ids.into_iter().map(Into::into));
        self
    }
}

/// A flagged risk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Risk {
    /// Risk identifier
    pub id: String,
    /// What could go wrong
    #[serde(default)]
    pub description: String,
}

/// A proposed milestone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    /// Milestone title
    pub title: String,
    /// Free-form due marker (date, sprint, quarter)
    #[serde(default)]
    pub due: Option<String>,
}
