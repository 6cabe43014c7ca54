//! CLI for bibcure - normalize a BibLaTeX file and extract its abstracts.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use bibcure::{CureConfig, CureError, Curator};

/// Normalize citation keys and authors of a BibLaTeX file
#[derive(Parser)]
#[command(name = "bibcure")]
#[command(version)]
#[command(after_help = "\
Examples:
  bibcure ResearchRabbit_Export.bib
  bibcure refs.bib --data-dir out --delimiter ';' --latex-cleanup
  bibcure refs.bib --csl-check --pandoc /usr/local/bin/pandoc")]
struct Cli {
    /// Input bibliography file
    input: PathBuf,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory the outputs are written to
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// File name of the normalized bibliography
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// File name of the abstract table
    #[arg(short, long)]
    abstracts: Option<PathBuf>,

    /// Field delimiter of the abstract table
    #[arg(long)]
    delimiter: Option<char>,

    /// Replace `\&amp`, `~` and U+2010 in the written bibliography
    #[arg(long)]
    latex_cleanup: bool,

    /// Convert the result to CSL-JSON and report entries the converter rejects
    #[arg(long)]
    csl_check: bool,

    /// Converter executable
    #[arg(long)]
    pandoc: Option<PathBuf>,

    /// Log every stage
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> Result<(PathBuf, CureConfig), CureError> {
        let mut config = match &self.config {
            Some(path) => CureConfig::load(path)?,
            None => CureConfig::default(),
        };

        if let Some(dir) = self.data_dir {
            config.set_data_dir(dir);
        }
        if let Some(name) = self.output {
            config.set_output_bib(name);
        }
        if let Some(name) = self.abstracts {
            config.set_output_abstracts(name);
        }
        if let Some(delimiter) = self.delimiter {
            config.set_delimiter(delimiter);
        }
        if self.latex_cleanup {
            config.set_latex_cleanup(true);
        }
        if self.csl_check {
            config.set_csl_check(true);
        }
        if let Some(program) = self.pandoc {
            config.set_pandoc(program);
        }
        config.validate()?;

        Ok((self.input, config))
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "bibcure=debug" } else { "bibcure=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), CureError> {
    let (input, config) = cli.into_config()?;
    let curator = Curator::new(config);

    let report = curator.cure_file(&input)?;
    eprintln!("{report}");
    Ok(())
}
