//! Run configuration.
//!
//! A [`CureConfig`] can be built in code with the `set_*` methods or read from
//! a TOML file where every key is optional:
//!
//! ```toml
//! data_dir = "data"
//! output_bib = "output.bib"
//! output_abstracts = "abstracts.csv"
//! delimiter = ";"
//! latex_cleanup = true
//! csl_check = false
//! pandoc = "/usr/local/bin/pandoc"
//! indent = "    "
//! ```

use crate::error::{CureError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Settings for one curation run.
///
/// # Examples
///
/// ```
/// use bibcure::CureConfig;
///
/// let mut config = CureConfig::new();
/// config.set_data_dir("refs").set_delimiter(';').set_latex_cleanup(true);
/// assert_eq!(config.bib_path(), std::path::Path::new("refs/output.bib"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CureConfig {
    /// Directory the output files are written to
    data_dir: PathBuf,
    /// File name of the normalized bibliography
    output_bib: PathBuf,
    /// File name of the abstract table
    output_abstracts: PathBuf,
    /// Field delimiter of the abstract table
    delimiter: char,
    /// Apply the post-export LaTeX substitutions
    latex_cleanup: bool,
    /// Run the external converter over the result
    csl_check: bool,
    /// Converter executable
    pandoc: PathBuf,
    /// Indentation of exported fields
    indent: String,
}

impl Default for CureConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_bib: PathBuf::from("output.bib"),
            output_abstracts: PathBuf::from("abstracts.csv"),
            delimiter: ',',
            latex_cleanup: false,
            csl_check: false,
            pandoc: PathBuf::from("pandoc"),
            indent: "  ".to_string(),
        }
    }
}

impl CureConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a TOML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| CureError::io(path, e))?;
        let config = Self::from_toml_str(&text)?;
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Parses TOML text; missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the delimiter fits in one byte and is not a quote or
    /// line break.
    pub fn validate(&self) -> Result<()> {
        self.delimiter_byte().map(|_| ())
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Full path of the normalized bibliography.
    pub fn bib_path(&self) -> PathBuf {
        self.data_dir.join(&self.output_bib)
    }

    /// Full path of the abstract table.
    pub fn abstracts_path(&self) -> PathBuf {
        self.data_dir.join(&self.output_abstracts)
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// The delimiter as the single byte the CSV writer needs.
    pub fn delimiter_byte(&self) -> Result<u8> {
        match self.delimiter {
            '"' | '\n' | '\r' => Err(CureError::Config(format!(
                "delimiter {:?} is not allowed",
                self.delimiter
            ))),
            c if c.is_ascii() => Ok(c as u8),
            c => Err(CureError::Config(format!(
                "delimiter {c:?} must be a single ASCII character"
            ))),
        }
    }

    pub fn latex_cleanup(&self) -> bool {
        self.latex_cleanup
    }

    pub fn csl_check(&self) -> bool {
        self.csl_check
    }

    pub fn pandoc(&self) -> &Path {
        &self.pandoc
    }

    pub fn indent(&self) -> &str {
        &self.indent
    }

    pub fn set_data_dir<P: Into<PathBuf>>(&mut self, dir: P) -> &mut Self {
        self.data_dir = dir.into();
        self
    }

    pub fn set_output_bib<P: Into<PathBuf>>(&mut self, name: P) -> &mut Self {
        self.output_bib = name.into();
        self
    }

    pub fn set_output_abstracts<P: Into<PathBuf>>(&mut self, name: P) -> &mut Self {
        self.output_abstracts = name.into();
        self
    }

    pub fn set_delimiter(&mut self, delimiter: char) -> &mut Self {
        self.delimiter = delimiter;
        self
    }

    pub fn set_latex_cleanup(&mut self, enabled: bool) -> &mut Self {
        self.latex_cleanup = enabled;
        self
    }

    pub fn set_csl_check(&mut self, enabled: bool) -> &mut Self {
        self.csl_check = enabled;
        self
    }

    pub fn set_pandoc<P: Into<PathBuf>>(&mut self, program: P) -> &mut Self {
        self.pandoc = program.into();
        self
    }

    pub fn set_indent(&mut self, indent: impl Into<String>) -> &mut Self {
        self.indent = indent.into();
        self
    }
}
