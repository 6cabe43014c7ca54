//! End-to-end curation of one bibliography file.
//!
//! [`Curator`] reads a file, runs every stage in order (parse, keys,
//! authors, abstracts) and writes the normalized bibliography and the
//! abstract table. Fatal errors stop the run before anything is written;
//! recoverable problems end up in [`CureReport::diagnostics`].

use crate::abstracts::AbstractExtractor;
use crate::authors::AuthorNormalizer;
use crate::bibtex::{BibtexParser, ParseOutcome};
use crate::config::CureConfig;
use crate::convert::{ConversionReport, Converter, PandocConverter, convert_entries};
use crate::error::{CureError, Diagnostic, Result};
use crate::export::{BibWriter, write_abstracts_csv};
use crate::keys::KeyNormalizer;
use crate::{AbstractRecord, BibEntry};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const BOM: char = '\u{feff}';
const TEMP_SUFFIX: &str = ".tmp";
const BACKUP_SUFFIX: &str = ".bak";

/// Result of a curation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CureReport {
    /// Normalized entries in input order
    pub entries: Vec<BibEntry>,
    pub abstracts: Vec<AbstractRecord>,
    /// Everything that was dropped, skipped or renamed with a fallback
    pub diagnostics: Vec<Diagnostic>,
}

impl CureReport {
    /// Number of input entries that are missing from the output.
    pub fn dropped(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.is_entry_dropped())
            .count()
    }

    /// Whether the run produced no diagnostics at all.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

impl fmt::Display for CureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "kept {} entries, dropped {}, extracted {} abstracts",
            self.entries.len(),
            self.dropped(),
            self.abstracts.len()
        )?;
        for diagnostic in &self.diagnostics {
            write!(f, "\n  - {diagnostic}")?;
        }
        Ok(())
    }
}

/// Runs the curation pipeline with one configuration.
#[derive(Debug, Clone, Default)]
pub struct Curator {
    config: CureConfig,
}

impl Curator {
    #[must_use]
    pub fn new(config: CureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CureConfig {
        &self.config
    }

    /// Runs every stage over bibliography text. Never fails: problems with
    /// single entries or authors are reported in the returned diagnostics.
    pub fn run(&self, input: &str) -> CureReport {
        let ParseOutcome {
            mut entries,
            mut diagnostics,
        } = BibtexParser::new().parse(input);

        diagnostics.extend(KeyNormalizer::new().normalize(&mut entries));
        diagnostics.extend(AuthorNormalizer::new().normalize(&mut entries));
        let abstracts = AbstractExtractor::new().extract(&entries);

        let report = CureReport {
            entries,
            abstracts,
            diagnostics,
        };
        info!(
            entries = report.entries.len(),
            dropped = report.dropped(),
            abstracts = report.abstracts.len(),
            "curated bibliography"
        );
        report
    }

    /// Reads a bibliography file as UTF-8, dropping a leading byte order mark.
    pub fn load_bibliography<P: AsRef<Path>>(path: P) -> Result<String> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| CureError::io(path, e))?;
        let mut text = String::from_utf8(bytes).map_err(|e| CureError::Decode {
            path: path.to_path_buf(),
            valid_up_to: e.utf8_error().valid_up_to(),
        })?;
        if text.starts_with(BOM) {
            text.drain(..BOM.len_utf8());
        }
        debug!(path = %path.display(), bytes = text.len(), "read bibliography");
        Ok(text)
    }

    /// Reads and curates a file without writing anything.
    pub fn run_file<P: AsRef<Path>>(&self, path: P) -> Result<CureReport> {
        let text = Self::load_bibliography(path)?;
        Ok(self.run(&text))
    }

    /// Converts the report's entries and records every rejected key as a
    /// diagnostic. A converter failure is returned unchanged.
    pub fn check_conversion<C: Converter + ?Sized>(
        &self,
        converter: &C,
        report: &mut CureReport,
    ) -> Result<ConversionReport> {
        let conversion = convert_entries(converter, &report.entries)?;
        report.diagnostics.extend(conversion.diagnostics());
        Ok(conversion)
    }

    /// Renders the bibliography text with the configured writer settings.
    pub fn render_bibliography(&self, entries: &[BibEntry]) -> String {
        BibWriter::new()
            .with_indent(self.config.indent())
            .with_latex_cleanup(self.config.latex_cleanup())
            .write_entries(entries)
    }

    /// Writes both output files.
    ///
    /// Both outputs are rendered before the filesystem is touched. Each is
    /// written to a temporary sibling and the two are moved into place only
    /// once both writes have succeeded. If moving either one fails, files
    /// that existed before the call are restored and no new output is left
    /// behind.
    pub fn write_outputs(&self, report: &CureReport) -> Result<()> {
        let bibliography = self.render_bibliography(&report.entries);
        let table = write_abstracts_csv(&report.abstracts, self.config.delimiter_byte()?)?;

        let outputs = [
            (self.config.bib_path(), bibliography),
            (self.config.abstracts_path(), table),
        ];
        for (path, _) in &outputs {
            if path.is_dir() {
                return Err(CureError::io(
                    path,
                    io::Error::new(io::ErrorKind::IsADirectory, "output path is a directory"),
                ));
            }
        }

        let data_dir = self.config.data_dir();
        fs::create_dir_all(data_dir).map_err(|e| CureError::io(data_dir, e))?;

        let staged: Vec<(PathBuf, &Path)> = outputs
            .iter()
            .map(|(path, _)| (sibling(path, TEMP_SUFFIX), path.as_path()))
            .collect();

        let written = outputs
            .iter()
            .zip(&staged)
            .try_for_each(|((_, contents), (temp, _))| {
                fs::write(temp, contents).map_err(|e| CureError::io(temp, e))
            })
            .and_then(|()| commit(&staged));
        if let Err(err) = written {
            discard(&staged);
            return Err(err);
        }

        info!(
            bibliography = %self.config.bib_path().display(),
            abstracts = %self.config.abstracts_path().display(),
            "wrote outputs"
        );
        Ok(())
    }

    /// Curates a file end to end, using `pandoc` for the conversion check
    /// when it is enabled.
    pub fn cure_file<P: AsRef<Path>>(&self, path: P) -> Result<CureReport> {
        let converter = PandocConverter::new().with_program(self.config.pandoc());
        self.cure_file_with(path, &converter)
    }

    /// Like [`Curator::cure_file`] with a caller-supplied converter.
    pub fn cure_file_with<P: AsRef<Path>, C: Converter + ?Sized>(
        &self,
        path: P,
        converter: &C,
    ) -> Result<CureReport> {
        let mut report = self.run_file(path)?;
        if self.config.csl_check() {
            self.check_conversion(converter, &mut report)?;
        }
        self.write_outputs(&report)?;
        Ok(report)
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(suffix);
    path.with_file_name(name)
}

/// Moves every staged file onto its target. Existing targets are set aside
/// first and put back if any move fails.
fn commit(staged: &[(PathBuf, &Path)]) -> Result<()> {
    let mut backups: Vec<(PathBuf, &Path)> = Vec::new();
    for (_, target) in staged {
        if target.exists() {
            let backup = sibling(target, BACKUP_SUFFIX);
            if let Err(e) = fs::rename(target, &backup) {
                restore(&backups);
                return Err(CureError::io(*target, e));
            }
            backups.push((backup, *target));
        }
    }

    for (placed, (temp, target)) in staged.iter().enumerate() {
        if let Err(e) = fs::rename(temp, target) {
            for (_, done) in &staged[..placed] {
                let _ = fs::remove_file(done);
            }
            restore(&backups);
            return Err(CureError::io(*target, e));
        }
    }

    for (backup, _) in &backups {
        let _ = fs::remove_file(backup);
    }
    Ok(())
}

fn restore(backups: &[(PathBuf, &Path)]) {
    for (backup, target) in backups {
        if let Err(e) = fs::rename(backup, target) {
            warn!(backup = %backup.display(), error = %e, "could not restore previous output");
        }
    }
}

fn discard(staged: &[(PathBuf, &Path)]) {
    for (temp, _) in staged {
        let _ = fs::remove_file(temp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MalformedReason;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_run_all_stages() {
        let input = r#"@article{Gómez2020,
  author = {Juan Pérez and Pérez, Juan and María López},
  abstract = {About RNA.},
}
@article{Gomez2020,
  author = {Doe, Jane},
  abstract = {   },
}"#;
        let report = Curator::default().run(input);

        let keys: Vec<_> = report.entries.iter().map(|e| e.citation_key.as_str()).collect();
        assert_eq!(keys, vec!["Gomez2020", "Gomez2020_2"]);
        assert_eq!(report.abstracts.len(), 1);
        assert_eq!(report.abstracts[0].authors, "Pérez, Juan; López, María");
        assert!(report.is_clean());
    }

    #[test]
    fn test_report_display_lists_diagnostics() {
        let report = Curator::default().run("@article{broken, title = {x}\n@misc{ok, title={y}}");
        assert_eq!(report.dropped(), 1);
        assert_eq!(
            report.diagnostics,
            vec![Diagnostic::MalformedEntry {
                offset: 0,
                line: 1,
                reason: MalformedReason::UnbalancedBraces,
            }]
        );
        assert_eq!(
            report.to_string(),
            "kept 1 entries, dropped 1, extracted 0 abstracts\n  \
             - dropped malformed entry at offset 0 (line 1): unbalanced braces"
        );
    }

    #[test]
    fn test_load_strips_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refs.bib");
        fs::write(&path, "\u{feff}@misc{a, title={T}}").unwrap();
        let text = Curator::load_bibliography(&path).unwrap();
        assert!(text.starts_with("@misc"));
    }

    #[test]
    fn test_load_rejects_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin1.bib");
        fs::write(&path, b"@misc{a, title={G\xf3mez}}").unwrap();
        match Curator::load_bibliography(&path) {
            Err(CureError::Decode { valid_up_to, .. }) => assert_eq!(valid_up_to, 17),
            other => panic!("expected a decode error, got {other:?}"),
        }
    }

    #[test]
    fn test_sibling() {
        assert_eq!(
            sibling(Path::new("data/output.bib"), TEMP_SUFFIX),
            PathBuf::from("data/output.bib.tmp")
        );
    }

    #[test]
    fn test_write_outputs_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = CureConfig::new();
        config.set_data_dir(dir.path().join("out"));
        let curator = Curator::new(config);

        let report = curator.run("@misc{a, abstract={Text}}");
        curator.write_outputs(&report).unwrap();

        let mut names: Vec<_> = fs::read_dir(dir.path().join("out"))
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, vec!["abstracts.csv", "output.bib"]);
    }

    fn dir_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_blocked_output_keeps_previous_bibliography() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        fs::create_dir_all(out.join("abstracts.csv/blocker")).unwrap();
        fs::write(out.join("output.bib"), "previous run").unwrap();

        let mut config = CureConfig::new();
        config.set_data_dir(&out);
        let curator = Curator::new(config);
        let report = curator.run("@misc{a, abstract={Text}}");

        let err = curator.write_outputs(&report).unwrap_err();
        assert!(matches!(err, CureError::Io { .. }));
        assert_eq!(fs::read_to_string(out.join("output.bib")).unwrap(), "previous run");
        assert_eq!(dir_names(&out), vec!["abstracts.csv", "output.bib"]);
    }

    #[test]
    fn test_blocked_output_writes_no_bibliography() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        fs::create_dir_all(out.join("abstracts.csv/blocker")).unwrap();

        let mut config = CureConfig::new();
        config.set_data_dir(&out);
        let curator = Curator::new(config);

        assert!(curator.write_outputs(&curator.run("@misc{a, title={T}}")).is_err());
        assert!(!out.join("output.bib").exists());
        assert_eq!(dir_names(&out), vec!["abstracts.csv"]);
    }

    #[test]
    fn test_failed_commit_restores_replaced_files() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.txt");
        let second = dir.path().join("second.txt");
        fs::write(&first, "old first").unwrap();
        fs::write(&second, "old second").unwrap();
        fs::write(sibling(&first, TEMP_SUFFIX), "new first").unwrap();
        // The second temporary file is missing, so its move fails.
        let staged = vec![
            (sibling(&first, TEMP_SUFFIX), first.as_path()),
            (sibling(&second, TEMP_SUFFIX), second.as_path()),
        ];

        assert!(commit(&staged).is_err());
        assert_eq!(fs::read_to_string(&first).unwrap(), "old first");
        assert_eq!(fs::read_to_string(&second).unwrap(), "old second");
        assert_eq!(dir_names(dir.path()), vec!["first.txt", "second.txt"]);
    }
}
