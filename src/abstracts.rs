//! Abstract table extraction.
//!
//! Projects every entry that has a non-blank `abstract` field into an
//! [`AbstractRecord`]. Entries without an abstract produce no row.

use crate::utils::format_doi;
use crate::{AbstractRecord, BibEntry};
use itertools::Itertools;

/// Separator between author display forms in the `authors` column.
pub const AUTHOR_SEPARATOR: &str = "; ";

/// Reads entries and builds the abstract table. Never mutates its input.
#[derive(Debug, Clone, Default)]
pub struct AbstractExtractor;

impl AbstractExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// One record per entry with a non-blank abstract, in entry order.
    pub fn extract(&self, entries: &[BibEntry]) -> Vec<AbstractRecord> {
        entries.iter().filter_map(Self::record_for).collect()
    }

    fn record_for(entry: &BibEntry) -> Option<AbstractRecord> {
        let abstract_text = entry.fields.get("abstract")?.trim();
        if abstract_text.is_empty() {
            return None;
        }
        Some(AbstractRecord {
            citation_key: entry.citation_key.clone(),
            authors: entry.authors.display_forms().join(AUTHOR_SEPARATOR),
            abstract_text: abstract_text.to_string(),
            doi: entry.fields.get("doi").and_then(format_doi),
        })
    }
}
