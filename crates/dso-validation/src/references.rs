//! Reference tracking across the phase history
//!
//! Content is opaque, so "is requirement R2 referenced?" is answered from the
//! structured hints plus whole-word mentions of known ids inside content refs.

use dso_model::{PhaseContent, Session};
use indexmap::IndexMap;
use regex::Regex;
use std::collections::{HashMap, HashSet};

/// Whole-word matcher for a fixed set of ids
#[derive(Debug, Clone)]
pub struct MentionMatcher {
    patterns: Vec<(String, Regex)>,
}

impl MentionMatcher {
    /// Compile one pattern per id
    ///
    /// Ids are escaped, so any string is accepted. A match must not be
    /// preceded or followed by a word character.
    pub fn new<'a, I>(ids: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let patterns = ids
            .into_iter()
            .filter(|id| !id.is_empty())
            .filter_map(|id| {
                let pattern = format!(r"(?:^|\W){}(?:$|\W)", regex::escape(id));
                match Regex::new(&pattern) {
                    Ok(re) => Some((id.to_string(), re)),
                    Err(e) => {
                        tracing::warn!(id, error = %e, "skipping unmatchable id");
                        None
                    }
                }
            })
            .collect();

        Self { patterns }
    }

    /// Ids mentioned in `text`
    pub fn mentioned_in<'a>(&'a self, text: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.patterns
            .iter()
            .filter(move |(_, re)| re.is_match(text))
            .map(|(id, _)| id.as_str())
    }

    /// Number of ids tracked
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Check if no ids are tracked
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Per-record mention sets for a session snapshot
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    /// Ids mentioned by each history record (same indexing as `phase_history`)
    mentions: Vec<HashSet<String>>,
    /// First record closing each id
    resolved_at: HashMap<String, usize>,
    /// Risk id → first record flagging it, in flagging order
    risks: IndexMap<String, usize>,
}

impl ReferenceIndex {
    /// Index every record of `session`
    #[must_use]
    pub fn build(session: &Session) -> Self {
        let mut risks = IndexMap::new();
        for (index, record) in session.phase_history.iter().enumerate() {
            for risk in record.content.iter().flat_map(|c| c.risks.iter()) {
                risks.entry(risk.id.clone()).or_insert(index);
            }
        }

        let tracked = session
            .requirement_ids()
            .chain(risks.keys().map(String::as_str));
        let matcher = MentionMatcher::new(tracked);

        let mut mentions = Vec::with_capacity(session.phase_history.len());
        let mut resolved_at = HashMap::new();

        for (index, record) in session.phase_history.iter().enumerate() {
            let mut seen = HashSet::new();
            for content in &record.content {
                collect_mentions(content, &matcher, &mut seen);
                for id in &content.resolved {
                    resolved_at.entry(id.clone()).or_insert(index);
                }
            }
            mentions.push(seen);
        }

        Self {
            mentions,
            resolved_at,
            risks,
        }
    }

    /// Ids mentioned by record `index`
    #[must_use]
    pub fn mentions(&self, index: usize) -> Option<&HashSet<String>> {
        self.mentions.get(index)
    }

    /// Check if any record mentions `id`
    #[must_use]
    pub fn is_referenced(&self, id: &str) -> bool {
        self.mentions.iter().any(|m| m.contains(id))
    }

    /// Index of the last record mentioning `id`
    #[must_use]
    pub fn last_mention(&self, id: &str) -> Option<usize> {
        self.mentions.iter().rposition(|m| m.contains(id))
    }

    /// Index of the first record closing `id`
    #[must_use]
    pub fn resolved_at(&self, id: &str) -> Option<usize> {
        self.resolved_at.get(id).copied()
    }

    /// Flagged risks with the index of the record introducing them
    pub fn risks(&self) -> impl Iterator<Item = (&str, usize)> {
        self.risks.iter().map(|(id, index)| (id.as_str(), *index))
    }

    /// Check if `id` names a flagged risk
    #[must_use]
    pub fn is_risk(&self, id: &str) -> bool {
        self.risks.contains_key(id)
    }

    /// Flagged risks never resolved
    #[must_use]
    pub fn open_risks(&self) -> Vec<&str> {
        self.risks
            .keys()
            .filter(|id| !self.resolved_at.contains_key(*id))
            .map(String::as_str)
            .collect()
    }
}

fn collect_mentions(content: &PhaseContent, matcher: &MentionMatcher, out: &mut HashSet<String>) {
    out.extend(content.hinted_ids().map(str::to_string));
    for text in &content.refs {
        out.extend(matcher.mentioned_in(text).map(str::to_string));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dso_model::{PhaseRecord, Phase, SessionConfig};

    #[test]
    fn matcher_requires_whole_words() {
        let matcher = MentionMatcher::new(["R1", "REQ-2"]);
        let hits: Vec<_> = matcher.mentioned_in("covers R1 and REQ-2.").collect();
        assert_eq!(hits, vec!["R1", "REQ-2"]);
        assert_eq!(matcher.mentioned_in("R10 and XREQ-2").count(), 0);
    }

    #[test]
    fn matcher_escapes_ids() {
        let matcher = MentionMatcher::new(["a.b"]);
        assert_eq!(matcher.mentioned_in("axb").count(), 0);
        assert_eq!(matcher.mentioned_in("see a.b").count(), 1);
    }

    #[test]
    fn index_tracks_text_and_hints() {
        let config = SessionConfig::new().with_requirements(["R1", "R2", "R3"]);
        let mut session = Session::new("s", config, Utc::now()).unwrap();
        session.phase_history[0].content.push(
            PhaseContent::new()
                .with_ref("R1 is about latency")
                .referencing(["R2"])
                .with_risk("K1", "cold cache"),
        );
        session
            .phase_history
            .push(PhaseRecord::primary(Phase::Analysis, Utc::now()));
        session.phase_history[1]
            .content
            .push(PhaseContent::new().with_ref("K1 mitigated by warmup").resolving(["K1"]));

        let index = ReferenceIndex::build(&session);
        assert!(index.is_referenced("R1"));
        assert!(index.is_referenced("R2"));
        assert!(!index.is_referenced("R3"));
        assert_eq!(index.last_mention("K1"), Some(1));
        assert_eq!(index.resolved_at("K1"), Some(1));
        assert!(index.open_risks().is_empty());
        assert!(index.is_risk("K1"));
    }
}
