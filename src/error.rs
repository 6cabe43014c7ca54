//! Error and diagnostic types.
//!
//! Two kinds of problems are kept apart:
//!
//! - [`CureError`] is fatal. It is returned as `Err` and aborts the run before
//!   any output is written (missing file, undecodable bytes, converter failure).
//! - [`Diagnostic`] is recoverable. It is collected alongside the results and
//!   describes what was dropped or skipped (malformed entries, unparseable authors).

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A specialized Result type for bibliography operations.
pub type Result<T> = std::result::Result<T, CureError>;

/// Fatal errors that abort a run.
#[derive(Error, Debug)]
pub enum CureError {
    #[error("IO error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not decode '{}' as UTF-8 (invalid byte at offset {valid_up_to})", path.display())]
    Decode { path: PathBuf, valid_up_to: usize },

    #[error("Converter error: {0}")]
    Converter(#[from] ConverterError),

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl CureError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CureError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<csv::Error> for CureError {
    fn from(err: csv::Error) -> Self {
        CureError::Csv(err.to_string())
    }
}

impl From<toml::de::Error> for CureError {
    fn from(err: toml::de::Error) -> Self {
        CureError::Config(err.to_string())
    }
}

/// Failures reported by an external format converter.
#[derive(Error, Debug)]
pub enum ConverterError {
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to exchange data with '{program}': {source}")]
    Pipe {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("converter exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("converter produced invalid output: {0}")]
    InvalidOutput(String),
}

impl From<serde_json::Error> for ConverterError {
    fn from(err: serde_json::Error) -> Self {
        ConverterError::InvalidOutput(err.to_string())
    }
}

/// Why an entry could not be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedReason {
    /// The opening brace is never balanced before the end of input.
    UnbalancedBraces,
    /// The first segment inside the braces is empty or is a field assignment.
    MissingKey,
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedReason::UnbalancedBraces => f.write_str("unbalanced braces"),
            MalformedReason::MissingKey => f.write_str("missing citation key"),
        }
    }
}

/// A recoverable problem found while processing a bibliography.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// The entry starting at `offset` was dropped.
    MalformedEntry {
        offset: usize,
        line: usize,
        reason: MalformedReason,
    },
    /// A `name = value` segment without `=` was skipped; the entry is kept.
    MalformedField { key: String, segment: String },
    /// An author without a usable surname was skipped; the entry is kept.
    InvalidAuthor { key: String, author: String },
    /// A citation key had no ASCII representation and received a fallback.
    EmptyKey { original: String, assigned: String },
    /// The external converter returned nothing for this entry.
    ConversionRejected { key: String },
}

impl Diagnostic {
    /// Whether this diagnostic means an entry is missing from the output.
    pub fn is_entry_dropped(&self) -> bool {
        matches!(self, Diagnostic::MalformedEntry { .. })
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MalformedEntry {
                offset,
                line,
                reason,
            } => write!(
                f,
                "dropped malformed entry at offset {offset} (line {line}): {reason}"
            ),
            Diagnostic::MalformedField { key, segment } => {
                write!(f, "entry '{key}': skipped field without '=': '{segment}'")
            }
            Diagnostic::InvalidAuthor { key, author } => {
                write!(f, "entry '{key}': skipped author without surname: '{author}'")
            }
            Diagnostic::EmptyKey { original, assigned } => write!(
                f,
                "key '{original}' has no ASCII form, assigned '{assigned}'"
            ),
            Diagnostic::ConversionRejected { key } => {
                write!(f, "entry '{key}' was rejected by the converter")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cure_error_display() {
        let error = CureError::Decode {
            path: PathBuf::from("data/refs.bib"),
            valid_up_to: 12,
        };
        assert_eq!(
            error.to_string(),
            "Could not decode 'data/refs.bib' as UTF-8 (invalid byte at offset 12)"
        );
    }

    #[test]
    fn test_malformed_entry_display() {
        let diagnostic = Diagnostic::MalformedEntry {
            offset: 0,
            line: 1,
            reason: MalformedReason::UnbalancedBraces,
        };
        assert_eq!(
            diagnostic.to_string(),
            "dropped malformed entry at offset 0 (line 1): unbalanced braces"
        );
        assert!(diagnostic.is_entry_dropped());
    }

    #[test]
    fn test_author_diagnostic_keeps_entry() {
        let diagnostic = Diagnostic::InvalidAuthor {
            key: "Smith2020".to_string(),
            author: ", John".to_string(),
        };
        assert!(!diagnostic.is_entry_dropped());
    }
}
