//! Citation key normalization.
//!
//! Every key is transliterated to `[A-Za-z0-9_-]` and made unique against the
//! keys assigned to earlier entries. Entries are processed in input order, so
//! when two keys collide the first entry keeps the bare form and later ones
//! receive `_2`, `_3`, ...
//!
//! ```
//! use bibcure::{BibEntry, KeyNormalizer};
//!
//! let mut entries = vec![
//!     BibEntry::new("article", "Gómez2020"),
//!     BibEntry::new("article", "Gomez2020"),
//! ];
//! KeyNormalizer::new().normalize(&mut entries);
//!
//! assert_eq!(entries[0].citation_key, "Gomez2020");
//! assert_eq!(entries[1].citation_key, "Gomez2020_2");
//! ```

use crate::error::Diagnostic;
use crate::translit::{EMPTY_KEY_FALLBACK, ascii_key};
use crate::BibEntry;
use std::collections::HashSet;
use tracing::{debug, warn};

/// The set of keys already assigned during one normalization pass.
///
/// A registry belongs to a single pass over a single bibliography; separate
/// bibliographies use separate registries.
#[derive(Debug, Clone, Default)]
pub struct KeyRegistry {
    assigned: HashSet<String>,
}

impl KeyRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.assigned.contains(key)
    }

    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }

    /// Reserves `base` if it is free, otherwise the smallest free `base_N`
    /// with `N >= 2`, and returns the reserved key.
    pub fn assign(&mut self, base: &str) -> String {
        let key = if self.assigned.contains(base) {
            (2..)
                .map(|n| format!("{base}_{n}"))
                .find(|candidate| !self.assigned.contains(candidate))
                .unwrap_or_else(|| base.to_string())
        } else {
            base.to_string()
        };
        self.assigned.insert(key.clone());
        key
    }
}

/// Rewrites citation keys to unique ASCII keys.
#[derive(Debug, Clone, Default)]
pub struct KeyNormalizer;

impl KeyNormalizer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Normalizes all keys against a fresh [`KeyRegistry`].
    pub fn normalize(&self, entries: &mut [BibEntry]) -> Vec<Diagnostic> {
        let mut registry = KeyRegistry::new();
        self.normalize_with(entries, &mut registry)
    }

    /// Normalizes all keys against `registry`, in slice order.
    ///
    /// A key that has no ASCII characters at all is based on `entry` instead
    /// and reported.
    pub fn normalize_with(
        &self,
        entries: &mut [BibEntry],
        registry: &mut KeyRegistry,
    ) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        for entry in entries.iter_mut() {
            let transliterated = ascii_key(&entry.citation_key);
            let no_ascii_form = transliterated.is_empty();
            let base = if no_ascii_form {
                EMPTY_KEY_FALLBACK
            } else {
                transliterated.as_str()
            };

            let key = registry.assign(base);
            if key == entry.citation_key {
                continue;
            }

            if no_ascii_form {
                let diagnostic = Diagnostic::EmptyKey {
                    original: entry.citation_key.clone(),
                    assigned: key.clone(),
                };
                warn!("{diagnostic}");
                diagnostics.push(diagnostic);
            } else {
                debug!(from = %entry.citation_key, to = %key, "renamed citation key");
            }
            entry.citation_key = key;
        }

        diagnostics
    }
}
