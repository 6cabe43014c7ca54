//! A library for cleaning BibLaTeX bibliographies.
//!
//! `bibcure` parses a bibliography into structured entries, normalizes citation
//! keys and author names, resolves key collisions and duplicated authors, and
//! exports a canonical bibliography together with a table of abstracts.
//!
//! # Pipeline
//!
//! Data flows strictly forward:
//!
//! 1. [`BibtexParser`] turns raw text into [`BibEntry`] values.
//! 2. [`KeyNormalizer`] rewrites citation keys to unique ASCII keys.
//! 3. [`AuthorNormalizer`] canonicalizes and deduplicates author lists.
//! 4. [`AbstractExtractor`] projects entries with abstracts into [`AbstractRecord`]s.
//! 5. [`BibWriter`] and [`export::write_abstracts_csv`] serialize the results.
//!
//! # Basic Usage
//!
//! ```rust
//! use bibcure::{AbstractExtractor, AuthorNormalizer, BibtexParser, KeyNormalizer};
//!
//! let input = r#"@article{Gómez2020,
//!   author = {Juan Pérez and Pérez, Juan},
//!   title = {A {Study}},
//!   abstract = {Short abstract.}
//! }"#;
//!
//! let mut outcome = BibtexParser::new().parse(input);
//! KeyNormalizer::new().normalize(&mut outcome.entries);
//! AuthorNormalizer::new().normalize(&mut outcome.entries);
//! let abstracts = AbstractExtractor::new().extract(&outcome.entries);
//!
//! assert_eq!(outcome.entries[0].citation_key, "Gomez2020");
//! assert_eq!(abstracts[0].authors, "Pérez, Juan");
//! ```
//!
//! # Whole files
//!
//! ```no_run
//! use bibcure::{CureConfig, Curator};
//!
//! let curator = Curator::new(CureConfig::default());
//! let report = curator.cure_file("ResearchRabbit_Export.bib").unwrap();
//! println!("{report}");
//! ```
//!
//! # Error Handling
//!
//! Fatal problems (missing file, undecodable bytes, converter failure) are
//! returned as [`CureError`]. Recoverable problems (a malformed entry, an author
//! without surname) never abort a run; they are collected as [`Diagnostic`]s.

use either::Either;
use serde::{Deserialize, Serialize};

pub mod abstracts;
pub mod authors;
pub mod bibtex;
pub mod config;
pub mod convert;
pub mod error;
pub mod export;
pub mod isbn;
pub mod keys;
pub mod pipeline;
mod regex;
pub mod translit;
mod utils;

// Reexports
pub use abstracts::AbstractExtractor;
pub use authors::AuthorNormalizer;
pub use bibtex::{BibtexParser, ParseOutcome};
pub use config::CureConfig;
pub use convert::{Converter, PandocConverter};
pub use error::{ConverterError, CureError, Diagnostic, MalformedReason, Result};
pub use export::BibWriter;
pub use keys::{KeyNormalizer, KeyRegistry};
pub use pipeline::{CureReport, Curator};

/// Field map of an entry.
///
/// Names are stored lower-cased. Insertion order is kept, so an entry written
/// back out lists its fields in the order they were read. Re-inserting an
/// existing name replaces the value in place (last occurrence wins).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fields(Vec<(String, String)>);

impl Fields {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value of `name`, compared case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        let name = name.to_lowercase();
        self.0
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Inserts or replaces a field, returning the previous value.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) -> Option<String> {
        let name = name.to_lowercase();
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.0.push((name, value));
                None
            }
        }
    }

    /// Removes a field, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let name = name.to_lowercase();
        let index = self.0.iter().position(|(n, _)| *n == name)?;
        Some(self.0.remove(index).1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterates over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<N: AsRef<str>, V: Into<String>> FromIterator<(N, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (name, value) in iter {
            fields.insert(name.as_ref(), value);
        }
        fields
    }
}

/// An author after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedAuthor {
    /// The author's surname, as written in the source
    pub surname: String,
    /// The author's given names, as written in the source (may be empty)
    pub given_names: String,
    /// Canonical `"Surname, Given"` rendering
    pub display_form: String,
}

/// The author list of an entry: raw strings as parsed, replaced by
/// [`NormalizedAuthor`] values once [`AuthorNormalizer`] has run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthorList {
    Raw(Vec<String>),
    Normalized(Vec<NormalizedAuthor>),
}

impl Default for AuthorList {
    fn default() -> Self {
        AuthorList::Raw(Vec::new())
    }
}

impl AuthorList {
    pub fn len(&self) -> usize {
        match self {
            AuthorList::Raw(raw) => raw.len(),
            AuthorList::Normalized(normalized) => normalized.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_normalized(&self) -> bool {
        matches!(self, AuthorList::Normalized(_))
    }

    /// The text used when writing the list out: display forms once
    /// normalized, the raw strings before.
    pub fn display_forms(&self) -> impl Iterator<Item = &str> {
        match self {
            AuthorList::Raw(raw) => Either::Left(raw.iter().map(String::as_str)),
            AuthorList::Normalized(normalized) => {
                Either::Right(normalized.iter().map(|a| a.display_form.as_str()))
            }
        }
    }
}

/// A single bibliography entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BibEntry {
    /// Entry type tag (`article`, `book`, ...), case preserved
    pub entry_type: String,
    /// Citation key; rewritten only by [`KeyNormalizer`]
    pub citation_key: String,
    /// All fields except `author`
    pub fields: Fields,
    /// Authors split out of the `author` field
    pub authors: AuthorList,
    /// Byte offset of the entry's `@` in the source text
    pub offset: usize,
    /// 1-based line of the entry's `@` in the source text
    pub line: usize,
}

impl BibEntry {
    /// Creates an entry with no fields or authors.
    pub fn new(entry_type: impl Into<String>, citation_key: impl Into<String>) -> Self {
        Self {
            entry_type: entry_type.into(),
            citation_key: citation_key.into(),
            ..Default::default()
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.fields.get("title")
    }
}

/// One row of the abstract table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbstractRecord {
    pub citation_key: String,
    /// Display forms joined with `"; "`
    pub authors: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    /// Normalized DOI, if the entry has one
    pub doi: Option<String>,
}
