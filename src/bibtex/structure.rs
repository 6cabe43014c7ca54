//! BibTeX intermediate data structures.
//!
//! A [`RawBibEntry`] holds what was read from one `@type{...}` block before it
//! is validated into a [`BibEntry`]. Validation can only fail on a missing
//! citation key; everything else about an entry is recoverable.

use crate::bibtex::parse::split_authors;
use crate::error::MalformedReason;
use crate::{AuthorList, BibEntry, Fields};

/// Structured raw data from one BibTeX entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawBibEntry {
    pub(crate) entry_type: String,
    /// Citation key; empty when the first segment was missing or was a field.
    pub(crate) key: String,
    /// `(name, value)` pairs in source order, duplicates included.
    pub(crate) fields: Vec<(String, String)>,
    /// Segments that are not `name = value` pairs.
    pub(crate) ignored_segments: Vec<String>,
    pub(crate) offset: usize,
    pub(crate) line: usize,
}

impl RawBibEntry {
    pub(crate) fn new(entry_type: &str, key: &str, offset: usize, line: usize) -> Self {
        Self {
            entry_type: entry_type.to_string(),
            key: key.to_string(),
            fields: Vec::new(),
            ignored_segments: Vec::new(),
            offset,
            line,
        }
    }

    pub(crate) fn add_field(&mut self, name: String, value: &str) {
        self.fields.push((name, value.to_string()));
    }

    pub(crate) fn add_ignored_segment(&mut self, segment: &str) {
        self.ignored_segments.push(segment.to_string());
    }
}

impl TryFrom<RawBibEntry> for BibEntry {
    type Error = MalformedReason;

    fn try_from(raw: RawBibEntry) -> Result<Self, Self::Error> {
        if raw.key.is_empty() {
            return Err(MalformedReason::MissingKey);
        }

        // Duplicates collapse here, the last value winning.
        let mut fields: Fields = raw.fields.into_iter().collect();
        let authors = fields
            .remove("author")
            .map(|value| split_authors(&value))
            .unwrap_or_default();

        Ok(BibEntry {
            entry_type: raw.entry_type,
            citation_key: raw.key,
            fields,
            authors: AuthorList::Raw(authors),
            offset: raw.offset,
            line: raw.line,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_author_field_moves_to_authors() {
        let mut raw = RawBibEntry::new("article", "key1", 0, 1);
        raw.add_field("title".to_string(), "T");
        raw.add_field("author".to_string(), "Doe, Jane and John Smith");

        let entry = BibEntry::try_from(raw).unwrap();
        assert_eq!(entry.fields.get("author"), None);
        assert_eq!(
            entry.authors,
            AuthorList::Raw(vec!["Doe, Jane".to_string(), "John Smith".to_string()])
        );
    }

    #[test]
    fn test_duplicate_fields_last_wins() {
        let mut raw = RawBibEntry::new("book", "key1", 0, 1);
        raw.add_field("year".to_string(), "1999");
        raw.add_field("title".to_string(), "T");
        raw.add_field("year".to_string(), "2001");

        let entry = BibEntry::try_from(raw).unwrap();
        assert_eq!(entry.fields.get("year"), Some("2001"));
        assert_eq!(entry.fields.len(), 2);
    }

    #[test]
    fn test_missing_key_is_rejected() {
        let raw = RawBibEntry::new("misc", "", 10, 2);
        assert_eq!(BibEntry::try_from(raw), Err(MalformedReason::MissingKey));
    }
}
