//! ISBN metadata contract.
//!
//! Book metadata comes from an external lookup service. This module fixes the
//! shape of what such a service hands back ([`IsbnRecord`]) and how ISBNs are
//! keyed ([`normalize_isbn`]); the lookup itself is the [`IsbnSource`]
//! capability. A book the service does not know yields a placeholder record
//! titled [`NOT_FOUND_TITLE`] instead of an error.
//!
//! ```
//! use bibcure::isbn::{IsbnRecord, normalize_isbn};
//!
//! assert_eq!(normalize_isbn("0-201-61622-x"), "020161622X");
//! assert!(IsbnRecord::not_found("020161622X").is_not_found());
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Title of the record returned for an unknown ISBN.
pub const NOT_FOUND_TITLE: &str = "Book not found";

/// Metadata for one book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsbnRecord {
    /// Normalized ISBN
    #[serde(rename = "ISBN")]
    pub isbn: String,
    pub title: String,
    /// Author names joined with `", "`
    pub authors: Option<String>,
    pub publisher: Option<String>,
    #[serde(rename = "publishedDate")]
    pub published_date: Option<String>,
}

impl IsbnRecord {
    /// The record used when a lookup finds nothing.
    pub fn not_found(isbn: &str) -> Self {
        Self {
            isbn: isbn.to_string(),
            title: NOT_FOUND_TITLE.to_string(),
            authors: None,
            publisher: None,
            published_date: None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.title == NOT_FOUND_TITLE
            && self.authors.is_none()
            && self.publisher.is_none()
            && self.published_date.is_none()
    }
}

/// A metadata service keyed by normalized ISBN.
pub trait IsbnSource {
    type Error;

    /// Returns `Ok(None)` when the service has no record for `isbn`.
    fn lookup(&self, isbn: &str) -> Result<Option<IsbnRecord>, Self::Error>;
}

/// Strips hyphens and whitespace and upper-cases a trailing check digit `x`.
pub fn normalize_isbn(isbn: &str) -> String {
    let mut normalized: String = isbn
        .chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .collect();
    if normalized.ends_with('x') {
        normalized.pop();
        normalized.push('X');
    }
    normalized
}

/// Looks up one ISBN, turning "not found" into a placeholder record.
pub fn lookup_or_placeholder<S: IsbnSource + ?Sized>(
    source: &S,
    isbn: &str,
) -> Result<IsbnRecord, S::Error> {
    let isbn = normalize_isbn(isbn);
    match source.lookup(&isbn)? {
        Some(record) => Ok(record),
        None => {
            debug!(%isbn, "no metadata found");
            Ok(IsbnRecord::not_found(&isbn))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use std::collections::HashMap;

    struct MapSource(HashMap<String, IsbnRecord>);

    impl IsbnSource for MapSource {
        type Error = String;

        fn lookup(&self, isbn: &str) -> Result<Option<IsbnRecord>, String> {
            if isbn == "0000000000" {
                return Err("service unavailable".to_string());
            }
            Ok(self.0.get(isbn).cloned())
        }
    }

    fn source() -> MapSource {
        let record = IsbnRecord {
            isbn: "9780134685991".to_string(),
            title: "Effective Java".to_string(),
            authors: Some("Joshua Bloch".to_string()),
            publisher: Some("Addison-Wesley".to_string()),
            published_date: Some("2018".to_string()),
        };
        MapSource(HashMap::from([(record.isbn.clone(), record)]))
    }

    #[rstest]
    #[case("978-0-13-468599-1", "9780134685991")]
    #[case("0-201-61622-x", "020161622X")]
    #[case(" 0 201 61622 X ", "020161622X")]
    #[case("9780134685991", "9780134685991")]
    fn test_normalize_isbn(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_isbn(input), expected);
    }

    #[test]
    fn test_found_record_is_returned() {
        let record = lookup_or_placeholder(&source(), "978-0-13-468599-1").unwrap();
        assert_eq!(record.title, "Effective Java");
        assert!(!record.is_not_found());
    }

    #[test]
    fn test_unknown_isbn_yields_placeholder() {
        let record = lookup_or_placeholder(&source(), "0-201-61622-X").unwrap();
        assert_eq!(record, IsbnRecord::not_found("020161622X"));
        assert_eq!(record.title, "Book not found");
        assert!(record.is_not_found());
    }

    #[test]
    fn test_service_error_is_propagated() {
        let result = lookup_or_placeholder(&source(), "000-000-000-0");
        assert_eq!(result, Err("service unavailable".to_string()));
    }

    #[test]
    fn test_record_serializes_with_service_names() {
        let json = serde_json::to_value(IsbnRecord::not_found("123")).unwrap();
        assert_eq!(json["ISBN"], "123");
        assert_eq!(json["title"], "Book not found");
        assert!(json["publishedDate"].is_null());
    }
}
