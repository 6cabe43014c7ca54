//! BibTeX/BibLaTeX parser implementation.
//!
//! Provides functionality to parse `@type{key, name = value, ...}` entries.
//! Malformed entries never abort parsing: they are dropped and reported as
//! [`Diagnostic`]s, and parsing continues with the next `@`.
//!
//! # Example
//!
//! ```
//! use bibcure::BibtexParser;
//!
//! let input = r#"@article{smith2020,
//!   author = {Smith, John and Jane Doe},
//!   title = {An {RNA} Study},
//!   year = 2020
//! }"#;
//!
//! let outcome = BibtexParser::new().parse(input);
//! assert_eq!(outcome.entries[0].citation_key, "smith2020");
//! assert_eq!(outcome.entries[0].title(), Some("An {RNA} Study"));
//! assert_eq!(outcome.entries[0].authors.len(), 2);
//! ```

mod parse;
mod scan;
mod structure;

use crate::error::Diagnostic;
use crate::BibEntry;
use parse::bibtex_parse;
use tracing::{debug, warn};

/// Entries read from a bibliography, in input order, plus what was dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOutcome {
    pub entries: Vec<BibEntry>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parser for BibTeX and BibLaTeX bibliographies.
#[derive(Debug, Clone, Default)]
pub struct BibtexParser;

impl BibtexParser {
    /// Creates a new BibTeX parser instance.
    ///
    /// # Examples
    ///
    /// ```
    /// use bibcure::BibtexParser;
    /// let parser = BibtexParser::new();
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Parses a string containing zero or more entries.
    ///
    /// # Arguments
    ///
    /// * `input` - The bibliography text
    ///
    /// # Returns
    ///
    /// The well-formed entries in input order and one diagnostic per dropped
    /// entry or skipped field. Empty input yields an empty outcome.
    pub fn parse(&self, input: &str) -> ParseOutcome {
        let (mut diagnostics, raw_entries) = bibtex_parse(input);

        let mut entries = Vec::with_capacity(raw_entries.len());
        for mut raw in raw_entries {
            let (offset, line) = (raw.offset, raw.line);
            let ignored = std::mem::take(&mut raw.ignored_segments);
            let key = raw.key.clone();

            match BibEntry::try_from(raw) {
                Ok(entry) => {
                    diagnostics.extend(ignored.into_iter().map(|segment| {
                        Diagnostic::MalformedField {
                            key: key.clone(),
                            segment,
                        }
                    }));
                    entries.push(entry);
                }
                Err(reason) => diagnostics.push(Diagnostic::MalformedEntry {
                    offset,
                    line,
                    reason,
                }),
            }
        }

        for diagnostic in &diagnostics {
            warn!("{diagnostic}");
        }
        debug!(
            entries = entries.len(),
            dropped = diagnostics.iter().filter(|d| d.is_entry_dropped()).count(),
            "parsed bibliography"
        );

        ParseOutcome {
            entries,
            diagnostics,
        }
    }
}
