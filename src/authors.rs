//! Author name normalization.
//!
//! Each raw author string is split into surname and given names, accepting
//! both "Surname, Given" and "Given Surname". Within one entry, authors that
//! compare equal after transliteration and case folding are listed once; the
//! first spelling encountered is the one kept.
//!
//! ```
//! use bibcure::{AuthorList, AuthorNormalizer, BibEntry};
//!
//! let mut entry = BibEntry::new("article", "k");
//! entry.authors = AuthorList::Raw(vec![
//!     "Juan Pérez".to_string(),
//!     "Pérez, Juan".to_string(),
//!     "María López".to_string(),
//! ]);
//! let mut entries = vec![entry];
//! AuthorNormalizer::new().normalize(&mut entries);
//!
//! let forms: Vec<_> = entries[0].authors.display_forms().collect();
//! assert_eq!(forms, vec!["Pérez, Juan", "López, María"]);
//! ```

use crate::error::Diagnostic;
use crate::translit::fold_for_comparison;
use crate::utils::split_author_name;
use crate::{AuthorList, BibEntry, NormalizedAuthor};
use itertools::Itertools;
use tracing::{debug, warn};

/// Canonicalizes and deduplicates the author list of every entry.
#[derive(Debug, Clone, Default)]
pub struct AuthorNormalizer;

impl AuthorNormalizer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Replaces each entry's author list with its normalized form.
    ///
    /// Authors without a surname are skipped and reported; the entry itself
    /// is always kept. Running this twice gives the same result as once.
    pub fn normalize(&self, entries: &mut [BibEntry]) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        for entry in entries.iter_mut() {
            let raw: Vec<String> = entry.authors.display_forms().map(String::from).collect();
            let before = raw.len();

            let mut parsed = Vec::with_capacity(raw.len());
            for author in raw {
                match parse_author(&author) {
                    Some(normalized) => parsed.push(normalized),
                    None => {
                        let diagnostic = Diagnostic::InvalidAuthor {
                            key: entry.citation_key.clone(),
                            author,
                        };
                        warn!("{diagnostic}");
                        diagnostics.push(diagnostic);
                    }
                }
            }

            let normalized: Vec<NormalizedAuthor> =
                parsed.into_iter().unique_by(dedup_key).collect();
            if normalized.len() < before {
                debug!(
                    key = %entry.citation_key,
                    before,
                    after = normalized.len(),
                    "reduced author list"
                );
            }
            entry.authors = AuthorList::Normalized(normalized);
        }

        diagnostics
    }
}

/// Parses one raw author string, keeping its original spelling.
///
/// The display form is `"Surname, Given Names"`, or the bare surname when
/// the name has no given names (`"Brandon"`, never `"Brandon, "`). Returns
/// `None` when the string has no surname.
pub fn parse_author(raw: &str) -> Option<NormalizedAuthor> {
    let (surname, given_names) = split_author_name(raw)?;
    let display_form = if given_names.is_empty() {
        surname.to_string()
    } else {
        format!("{surname}, {given_names}")
    };
    Some(NormalizedAuthor {
        surname: surname.to_string(),
        given_names: given_names.to_string(),
        display_form,
    })
}

/// Key under which two authors count as the same person:
/// `"surname|given_names"`, transliterated and lower-cased.
pub fn dedup_key(author: &NormalizedAuthor) -> String {
    format!(
        "{}|{}",
        fold_for_comparison(&author.surname),
        fold_for_comparison(&author.given_names)
    )
}
