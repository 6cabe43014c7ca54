//! Bibliography and abstract table serialization.
//!
//! [`BibWriter`] renders entries back to BibLaTeX text. The `author` field is
//! rebuilt from the author list and written first; every other field follows
//! in the order it was read. Values are wrapped in braces, except plain
//! numbers which are written bare.
//!
//! ```
//! use bibcure::{BibEntry, BibWriter};
//!
//! let mut entry = BibEntry::new("article", "Gomez2020");
//! entry.fields.insert("title", "A {Study}");
//! entry.fields.insert("year", "2020");
//!
//! let text = BibWriter::new().write_entries(&[entry]);
//! assert_eq!(text, "@article{Gomez2020,\n  title = {A {Study}},\n  year = 2020,\n}\n");
//! ```

use crate::error::{CureError, Result};
use crate::{AbstractRecord, BibEntry};
use itertools::Itertools;
use std::fmt::Write;

/// Separator between authors in the exported `author` field.
pub const AUTHOR_SEPARATOR: &str = " and ";

/// Header row of the abstract table.
pub const ABSTRACT_HEADER: [&str; 4] = ["citation_key", "authors", "abstract", "doi"];

/// Text substitutions applied by [`apply_latex_cleanup`], in order.
const LATEX_CLEANUP: &[(&str, &str)] = &[("\\&amp", "\\&"), ("~", ""), ("\u{2010}", "-")];

/// Writes entries as BibLaTeX text.
#[derive(Debug, Clone)]
pub struct BibWriter {
    indent: String,
    latex_cleanup: bool,
}

impl Default for BibWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl BibWriter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            indent: "  ".to_string(),
            latex_cleanup: false,
        }
    }

    /// Sets the indentation placed before each field.
    #[must_use]
    pub fn with_indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = indent.into();
        self
    }

    /// Enables the post-export substitutions of [`apply_latex_cleanup`].
    ///
    /// Values containing `~`, `\&amp` or U+2010 no longer read back
    /// unchanged when this is on.
    #[must_use]
    pub fn with_latex_cleanup(mut self, enabled: bool) -> Self {
        self.latex_cleanup = enabled;
        self
    }

    /// Renders all entries, separated by blank lines.
    pub fn write_entries(&self, entries: &[BibEntry]) -> String {
        let text = entries.iter().map(|entry| self.write_entry(entry)).join("\n");
        if self.latex_cleanup {
            apply_latex_cleanup(&text)
        } else {
            text
        }
    }

    /// Renders a single entry, terminated by a newline.
    pub fn write_entry(&self, entry: &BibEntry) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = writeln!(out, "@{}{{{},", entry.entry_type, entry.citation_key);

        if !entry.authors.is_empty() {
            let authors = entry.authors.display_forms().join(AUTHOR_SEPARATOR);
            self.write_field(&mut out, "author", &authors);
        }
        for (name, value) in entry.fields.iter() {
            self.write_field(&mut out, name, value);
        }

        out.push_str("}\n");
        out
    }

    fn write_field(&self, out: &mut String, name: &str, value: &str) {
        if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
            let _ = writeln!(out, "{}{name} = {value},", self.indent);
        } else {
            let _ = writeln!(out, "{}{name} = {{{value}}},", self.indent);
        }
    }
}

/// Replaces `\&amp` with `\&`, drops `~` and turns U+2010 into `-`.
pub fn apply_latex_cleanup(text: &str) -> String {
    LATEX_CLEANUP
        .iter()
        .fold(text.to_string(), |acc, (from, to)| acc.replace(from, to))
}

/// Serializes the abstract table with a header row.
///
/// A missing DOI becomes an empty cell. The header is written even when
/// there are no records.
pub fn write_abstracts_csv(records: &[AbstractRecord], delimiter: u8) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(ABSTRACT_HEADER)?;
    for record in records {
        writer.serialize(record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| CureError::Csv(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| CureError::Csv(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AuthorList, BibtexParser, NormalizedAuthor};
    use pretty_assertions::assert_eq;
    use rstest::*;

    fn normalized(display: &[(&str, &str)]) -> AuthorList {
        AuthorList::Normalized(
            display
                .iter()
                .map(|(surname, given)| NormalizedAuthor {
                    surname: surname.to_string(),
                    given_names: given.to_string(),
                    display_form: format!("{surname}, {given}"),
                })
                .collect(),
        )
    }

    #[test]
    fn test_write_entry_layout() {
        let mut entry = BibEntry::new("Article", "Gomez2020");
        entry.authors = normalized(&[("Pérez", "Juan"), ("López", "María")]);
        entry.fields.insert("title", "The {RNA} World");
        entry.fields.insert("year", "2020");
        entry.fields.insert("pages", "1--10");

        let expected = "@Article{Gomez2020,
  author = {Pérez, Juan and López, María},
  title = {The {RNA} World},
  year = 2020,
  pages = {1--10},
}
";
        assert_eq!(BibWriter::new().write_entry(&entry), expected);
    }

    #[test]
    fn test_write_entries_blank_line_between() {
        let entries = vec![BibEntry::new("misc", "a"), BibEntry::new("misc", "b")];
        assert_eq!(
            BibWriter::new().write_entries(&entries),
            "@misc{a,\n}\n\n@misc{b,\n}\n"
        );
        assert_eq!(BibWriter::new().write_entries(&[]), "");
    }

    #[test]
    fn test_custom_indent() {
        let mut entry = BibEntry::new("misc", "k");
        entry.fields.insert("note", "n");
        let text = BibWriter::new().with_indent("\t").write_entry(&entry);
        assert_eq!(text, "@misc{k,\n\tnote = {n},\n}\n");
    }

    #[test]
    fn test_round_trip_through_parser() {
        let input = r#"@article{Gomez2020,
  author = {Pérez, Juan and {World Health Organization}},
  title = "A {Study}, with commas",
  year = 2020,
  month = jan,
  note = {},
  abstract = {Line one.
Line two with {braces} and "quotes".}
}

@book{Gomez2020_2,
  title = {{Braced} start and {braced} end},
  isbn = {978-3-16-148410-0}
}"#;
        let parser = BibtexParser::new();
        let first = parser.parse(input);
        assert!(first.diagnostics.is_empty());

        let written = BibWriter::new().write_entries(&first.entries);
        let second = parser.parse(&written);
        assert!(second.diagnostics.is_empty());

        let view = |entries: &[BibEntry]| {
            entries
                .iter()
                .map(|e| {
                    (
                        e.entry_type.clone(),
                        e.citation_key.clone(),
                        e.fields.clone(),
                        e.authors.display_forms().map(String::from).collect::<Vec<_>>(),
                    )
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(view(&second.entries), view(&first.entries));
    }

    #[rstest]
    #[case("Smith \\&amp Sons", "Smith \\& Sons")]
    #[case("J.~Smith", "J.Smith")]
    #[case("self\u{2010}test", "self-test")]
    #[case("plain", "plain")]
    fn test_apply_latex_cleanup(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(apply_latex_cleanup(input), expected);
    }

    #[test]
    fn test_latex_cleanup_is_opt_in() {
        let mut entry = BibEntry::new("misc", "k");
        entry.fields.insert("note", "a~b");
        assert!(BibWriter::new().write_entries(&[entry.clone()]).contains("a~b"));
        assert!(
            BibWriter::new()
                .with_latex_cleanup(true)
                .write_entries(&[entry])
                .contains("{ab}")
        );
    }

    #[test]
    fn test_write_abstracts_csv() {
        let records = vec![
            AbstractRecord {
                citation_key: "Gomez2020".to_string(),
                authors: "Pérez, Juan; López, María".to_string(),
                abstract_text: "First, with a comma.".to_string(),
                doi: Some("10.1000/abc".to_string()),
            },
            AbstractRecord {
                citation_key: "Doe2021".to_string(),
                authors: "Doe, Jane".to_string(),
                abstract_text: "Second.".to_string(),
                doi: None,
            },
        ];
        let csv = write_abstracts_csv(&records, b',').unwrap();
        assert_eq!(
            csv,
            "citation_key,authors,abstract,doi\n\
             Gomez2020,\"Pérez, Juan; López, María\",\"First, with a comma.\",10.1000/abc\n\
             Doe2021,\"Doe, Jane\",Second.,\n"
        );
    }

    #[test]
    fn test_write_abstracts_csv_empty_and_delimiter() {
        assert_eq!(
            write_abstracts_csv(&[], b';').unwrap(),
            "citation_key;authors;abstract;doi\n"
        );
    }
}
