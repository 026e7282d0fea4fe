//! Format-agnostic document payload
//!
//! Downstream formatters turn this into markdown, LaTeX, CSV or JSON. The
//! payload only carries structure: titled sections holding paragraphs,
//! bullet lists, tables and key/value blocks.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Structured document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentPayload {
    /// Document title
    pub title: String,
    /// Front matter (session id, phase, ...)
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub metadata: IndexMap<String, String>,
    /// Sections in reading order
    pub sections: Vec<Section>,
}

impl DocumentPayload {
    /// Create empty document
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Add front matter entry
    #[inline]
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Append section
    #[inline]
    #[must_use]
    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    /// First section with `heading`
    #[must_use]
    pub fn section(&self, heading: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.heading == heading)
    }

    /// Blake3 digest (hex) of the JSON encoding
    ///
    /// # Errors
    /// Returns error if the payload cannot be encoded
    pub fn digest(&self) -> Result<String, serde_json::Error> {
        let bytes = serde_json::to_vec(self)?;
        Ok(blake3::hash(&bytes).to_hex().to_string())
    }
}

/// Titled group of blocks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Section heading
    pub heading: String,
    /// Content blocks
    pub blocks: Vec<Block>,
}

impl Section {
    /// Create empty section
    #[must_use]
    pub fn new(heading: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            blocks: Vec::new(),
        }
    }

    /// Append paragraph
    #[must_use]
    pub fn paragraph(mut self, text: impl Into<String>) -> Self {
        self.blocks.push(Block::Paragraph { text: text.into() });
        self
    }

    /// Append bullet list
    #[must_use]
    pub fn bullets<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blocks.push(Block::Bullets {
            items: items.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Append table
    #[must_use]
    pub fn table(mut self, headers: &[&str], rows: Vec<Vec<String>>) -> Self {
        self.blocks.push(Block::Table {
            headers: headers.iter().map(|h| (*h).to_string()).collect(),
            rows,
        });
        self
    }

    /// Append key/value block
    #[must_use]
    pub fn key_values<I, K, V>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.blocks.push(Block::KeyValue {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        });
        self
    }
}

/// Content block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    /// Free text
    Paragraph {
        /// Text
        text: String,
    },
    /// Unordered list
    Bullets {
        /// Items
        items: Vec<String>,
    },
    /// Table with a header row
    Table {
        /// Column headers
        headers: Vec<String>,
        /// Rows, one cell per header
        rows: Vec<Vec<String>>,
    },
    /// Ordered key/value pairs
    KeyValue {
        /// Entries
        entries: IndexMap<String, String>,
    },
}

impl Block {
    /// Table rows, empty for other blocks
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        match self {
            Block::Table { rows, .. } => rows,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_stable_and_content_sensitive() {
        let doc = DocumentPayload::new("ADR")
            .with_section(Section::new("D1").paragraph("use postgres"));
        let same = doc.clone();
        assert_eq!(doc.digest().unwrap(), same.digest().unwrap());
        assert_eq!(doc.digest().unwrap().len(), 64);

        let other = DocumentPayload::new("ADR")
            .with_section(Section::new("D1").paragraph("use sqlite"));
        assert_ne!(doc.digest().unwrap(), other.digest().unwrap());
    }

    #[test]
    fn blocks_serialize_tagged() {
        let block = Block::Bullets {
            items: vec!["a".into()],
        };
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "bullets");
    }
}
