//! Conversion of normalized bibliographies to CSL-JSON.
//!
//! The core only depends on the [`Converter`] capability: hand over
//! bibliography text, get back a [`CslDocument`]. [`PandocConverter`] is the
//! production implementation; tests substitute a deterministic fake.
//!
//! [`convert_entries`] checks the converter's answer against what was sent.
//! Every citation key without a matching item in the returned document is
//! reported, never dropped silently.

use crate::error::{ConverterError, Diagnostic};
use crate::export::BibWriter;
use crate::BibEntry;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use tracing::{debug, info, warn};

/// One CSL-JSON item. `id` carries the citation key; all other CSL
/// variables are kept as returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CslItem {
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// A CSL-JSON document: a top-level array of items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CslDocument {
    pub items: Vec<CslItem>,
}

impl CslDocument {
    /// Parses a CSL-JSON array.
    pub fn from_json(json: &str) -> Result<Self, ConverterError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, ConverterError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn get(&self, id: &str) -> Option<&CslItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Converts bibliography text into a structured interchange document.
pub trait Converter {
    fn convert(&self, bibliography: &str) -> Result<CslDocument, ConverterError>;
}

impl<C: Converter + ?Sized> Converter for &C {
    fn convert(&self, bibliography: &str) -> Result<CslDocument, ConverterError> {
        (**self).convert(bibliography)
    }
}

/// Runs `pandoc -f biblatex -t csljson` as a child process.
#[derive(Debug, Clone)]
pub struct PandocConverter {
    program: PathBuf,
}

impl Default for PandocConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl PandocConverter {
    /// Uses `pandoc` from `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("pandoc"),
        }
    }

    /// Uses the given executable instead.
    #[must_use]
    pub fn with_program<P: AsRef<Path>>(mut self, program: P) -> Self {
        self.program = program.as_ref().to_path_buf();
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }
}

impl Converter for PandocConverter {
    fn convert(&self, bibliography: &str) -> Result<CslDocument, ConverterError> {
        debug!(program = %self.program.display(), "starting converter");

        let mut child = Command::new(&self.program)
            .args(["-f", "biblatex", "-t", "csljson"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ConverterError::Spawn {
                program: self.program_name(),
                source,
            })?;

        let mut stdin = child.stdin.take().ok_or_else(|| ConverterError::Pipe {
            program: self.program_name(),
            source: std::io::Error::other("stdin was not captured"),
        })?;

        // Feed stdin from a separate thread so a full stdout pipe cannot block us.
        let (written, output) = thread::scope(|scope| {
            let writer = scope.spawn(move || stdin.write_all(bibliography.as_bytes()));
            let output = child.wait_with_output();
            let written = writer
                .join()
                .unwrap_or_else(|_| Err(std::io::Error::other("stdin writer panicked")));
            (written, output)
        });

        let output = output.map_err(|source| ConverterError::Pipe {
            program: self.program_name(),
            source,
        })?;

        if !output.status.success() {
            return Err(ConverterError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        written.map_err(|source| ConverterError::Pipe {
            program: self.program_name(),
            source,
        })?;

        let stdout = String::from_utf8(output.stdout)
            .map_err(|e| ConverterError::InvalidOutput(e.to_string()))?;
        CslDocument::from_json(&stdout)
    }
}

/// The converter's document plus the keys it did not return.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionReport {
    pub document: CslDocument,
    /// Sent citation keys with no item in `document`, in entry order.
    pub rejected: Vec<String>,
}

impl ConversionReport {
    pub fn is_complete(&self) -> bool {
        self.rejected.is_empty()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.rejected
            .iter()
            .map(|key| Diagnostic::ConversionRejected { key: key.clone() })
            .collect()
    }
}

/// Serializes `entries`, converts them, and lists every entry the converter
/// dropped.
///
/// A converter failure is returned as is; the document is never repaired.
pub fn convert_entries<C: Converter + ?Sized>(
    converter: &C,
    entries: &[BibEntry],
) -> Result<ConversionReport, ConverterError> {
    let bibliography = BibWriter::new().write_entries(entries);
    let document = converter.convert(&bibliography)?;

    let returned: HashSet<&str> = document.items.iter().map(|item| item.id.as_str()).collect();
    let rejected: Vec<String> = entries
        .iter()
        .map(|entry| entry.citation_key.as_str())
        .filter(|key| !returned.contains(key))
        .map(String::from)
        .collect();

    for key in &rejected {
        warn!("{}", Diagnostic::ConversionRejected { key: key.clone() });
    }
    info!(
        sent = entries.len(),
        returned = document.len(),
        rejected = rejected.len(),
        "converted bibliography"
    );

    Ok(ConversionReport { document, rejected })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    /// Returns one item per `@` line it recognises, skipping keys in `reject`.
    struct FakeConverter {
        reject: Vec<&'static str>,
    }

    impl Converter for FakeConverter {
        fn convert(&self, bibliography: &str) -> Result<CslDocument, ConverterError> {
            let items = bibliography
                .lines()
                .filter_map(|line| line.strip_prefix('@'))
                .filter_map(|line| line.split_once('{'))
                .map(|(_, rest)| rest.trim_end_matches(','))
                .filter(|key| !self.reject.iter().any(|r| r == key))
                .map(|key| CslItem {
                    id: key.to_string(),
                    fields: Map::new(),
                })
                .collect();
            Ok(CslDocument { items })
        }
    }

    struct FailingConverter;

    impl Converter for FailingConverter {
        fn convert(&self, _: &str) -> Result<CslDocument, ConverterError> {
            Err(ConverterError::Failed {
                status: "exit status: 64".to_string(),
                stderr: "Error at line 3".to_string(),
            })
        }
    }

    #[test]
    fn test_parse_csl_document() {
        let json = r#"[
  {"id": "Gomez2020", "type": "article-journal", "title": "A study",
   "author": [{"family": "Pérez", "given": "Juan"}], "issued": {"date-parts": [[2020]]}},
  {"id": "Doe2021", "type": "book"}
]"#;
        let document = CslDocument::from_json(json).unwrap();
        assert_eq!(document.len(), 2);

        let item = document.get("Gomez2020").unwrap();
        assert_eq!(item.fields["title"], json!("A study"));
        assert_eq!(item.fields["author"][0]["family"], json!("Pérez"));
        assert!(!item.fields.contains_key("id"));
    }

    #[test]
    fn test_invalid_document() {
        assert!(matches!(
            CslDocument::from_json(r#"{"id": "x"}"#),
            Err(ConverterError::InvalidOutput(_))
        ));
        assert!(matches!(
            CslDocument::from_json("not json"),
            Err(ConverterError::InvalidOutput(_))
        ));
    }

    #[test]
    fn test_convert_entries_reports_rejected_keys() {
        let entries = vec![
            BibEntry::new("article", "a"),
            BibEntry::new("book", "b"),
            BibEntry::new("misc", "c"),
        ];
        let converter = FakeConverter { reject: vec!["b"] };
        let report = convert_entries(&converter, &entries).unwrap();

        assert_eq!(report.document.len(), 2);
        assert_eq!(report.rejected, vec!["b".to_string()]);
        assert!(!report.is_complete());
        assert_eq!(
            report.diagnostics(),
            vec![Diagnostic::ConversionRejected {
                key: "b".to_string()
            }]
        );
    }

    #[test]
    fn test_convert_entries_complete() {
        let entries = vec![BibEntry::new("article", "a")];
        let report = convert_entries(&FakeConverter { reject: vec![] }, &entries).unwrap();
        assert!(report.is_complete());
    }

    #[test]
    fn test_converter_failure_is_surfaced() {
        let err = convert_entries(&FailingConverter, &[BibEntry::new("misc", "a")]).unwrap_err();
        assert_eq!(err.to_string(), "converter exited with exit status: 64: Error at line 3");
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let converter = PandocConverter::new().with_program("/nonexistent/bibcure-pandoc");
        assert!(matches!(
            converter.convert("@misc{a,\n}\n"),
            Err(ConverterError::Spawn { .. })
        ));
    }

    #[test]
    fn test_document_json_round_trip() {
        let document = CslDocument {
            items: vec![CslItem {
                id: "k".to_string(),
                fields: [("title".to_string(), json!("T"))].into_iter().collect(),
            }],
        };
        let json = document.to_json_pretty().unwrap();
        assert_eq!(CslDocument::from_json(&json).unwrap(), document);
    }
}
