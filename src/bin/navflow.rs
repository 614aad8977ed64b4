//! Navflow CLI - Command-line interface for Navflow
//!
//! Commands:
//! - clean: Clean a raw extraction into the event log
//! - chord: Lay out the transition chord diagram of a cleaned log
//! - hierarchy: Aggregate a cleaned log into the cohort hierarchy
//! - summary: Dashboard metrics of a cleaned log
//! - run: Full batch from raw extraction to artifacts
//! - config: Print the effective configuration

use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use navflow::encoder::ArtifactEncoder;
use navflow::summary::DEFAULT_TOP_CATEGORIES;
use navflow::{loader, AnalysisConfig, AnalysisError, Analyzer, NAVFLOW_VERSION};

/// Navflow - navigation analytics over page-view event logs
#[derive(Parser)]
#[command(name = "navflow")]
#[command(version = NAVFLOW_VERSION)]
#[command(about = "Clean page-view logs and map transitions between sections", long_about = None)]
struct Cli {
    /// Configuration file (JSON); built-in tables when absent
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean a raw extraction into the event log
    Clean {
        /// Raw extraction CSV
        #[arg(short, long)]
        input: PathBuf,

        /// Cleaned CSV output path
        #[arg(short, long)]
        output: PathBuf,

        /// Print the per-stage identity audit as JSON
        #[arg(long)]
        audit: bool,
    },

    /// Lay out the transition chord diagram of a cleaned log
    Chord {
        /// Cleaned CSV
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Hide transitions observed fewer times
        #[arg(long, default_value = "1")]
        min_count: u64,
    },

    /// Aggregate a cleaned log into the cohort hierarchy
    Hierarchy {
        /// Cleaned CSV
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },

    /// Dashboard metrics of a cleaned log
    Summary {
        /// Cleaned CSV
        #[arg(short, long)]
        input: PathBuf,

        /// Number of categories listed
        #[arg(long, default_value_t = DEFAULT_TOP_CATEGORIES)]
        top: usize,
    },

    /// Full batch from raw extraction to artifacts
    Run {
        /// Raw extraction CSV
        #[arg(short, long)]
        input: PathBuf,

        /// Directory receiving the cleaned log and artifacts
        #[arg(short, long, default_value = "output")]
        output_dir: PathBuf,

        /// Hide transitions observed fewer times
        #[arg(long, default_value = "1")]
        min_count: u64,
    },

    /// Print the effective configuration as JSON
    Config,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let error = CliError::from(e);
            eprintln!(
                "{}",
                serde_json::to_string(&error).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), NavflowCliError> {
    let config = match &cli.config {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::default(),
    };

    let analyzer = Analyzer::new(config)?;

    match cli.command {
        Commands::Clean {
            input,
            output,
            audit,
        } => cmd_clean(&analyzer, &input, &output, audit),

        Commands::Chord {
            input,
            output,
            min_count,
        } => match analyzer.try_load_for_diagrams(&input)? {
            Some(dataset) => {
                let layout = analyzer.chord_layout(&dataset, min_count);
                write_artifact("chord_layout", &input, &layout, &output)
            }
            None => Ok(()),
        },

        Commands::Hierarchy { input, output } => match analyzer.try_load_for_diagrams(&input)? {
            Some(dataset) => {
                let hierarchy = analyzer.hierarchy(&dataset);
                write_artifact("hierarchy", &input, &hierarchy, &output)
            }
            None => Ok(()),
        },

        Commands::Summary { input, top } => {
            let dataset = loader::read_cleaned(&input)?;
            println!("{}", serde_json::to_string_pretty(&analyzer.summary(&dataset, top))?);
            Ok(())
        }

        Commands::Run {
            input,
            output_dir,
            min_count,
        } => {
            let report = analyzer.try_run(&input, &output_dir, min_count)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }

        Commands::Config => {
            println!("{}", analyzer.config().to_json()?);
            Ok(())
        }
    }
}

fn cmd_clean(
    analyzer: &Analyzer,
    input: &Path,
    output: &Path,
    audit: bool,
) -> Result<(), NavflowCliError> {
    let outcome = analyzer.try_clean_file(input)?;
    loader::write_cleaned(output, &outcome.dataset)?;

    if audit {
        println!("{}", serde_json::to_string_pretty(&outcome.audit)?);
    } else {
        println!(
            "{}",
            serde_json::json!({
                "rows": outcome.dataset.len(),
                "identities": outcome.audit.final_count(),
                "excluded_identities": outcome.audit.total_excluded(),
                "output": output.display().to_string(),
            })
        );
    }
    Ok(())
}

fn write_artifact<T: serde::Serialize>(
    kind: &str,
    source: &Path,
    data: &T,
    output: &Path,
) -> Result<(), NavflowCliError> {
    let json = ArtifactEncoder::new().encode_to_json(kind, &source.display().to_string(), data)?;
    if output.as_os_str() == "-" {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{}", json)?;
    } else {
        fs::write(output, json)?;
    }
    Ok(())
}

// Error types

#[derive(Debug)]
enum NavflowCliError {
    Io(io::Error),
    Analysis(AnalysisError),
    Json(serde_json::Error),
}

impl From<io::Error> for NavflowCliError {
    fn from(e: io::Error) -> Self {
        NavflowCliError::Io(e)
    }
}

impl From<AnalysisError> for NavflowCliError {
    fn from(e: AnalysisError) -> Self {
        NavflowCliError::Analysis(e)
    }
}

impl From<serde_json::Error> for NavflowCliError {
    fn from(e: serde_json::Error) -> Self {
        NavflowCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<NavflowCliError> for CliError {
    fn from(e: NavflowCliError) -> Self {
        match e {
            NavflowCliError::Io(e) | NavflowCliError::Analysis(AnalysisError::Io(e)) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            NavflowCliError::Json(e) | NavflowCliError::Analysis(AnalysisError::Json(e)) => {
                CliError {
                    code: "JSON_ERROR".to_string(),
                    message: e.to_string(),
                    hint: Some("Check JSON syntax".to_string()),
                }
            }
            NavflowCliError::Analysis(e) => {
                let (code, hint) = match &e {
                    AnalysisError::Csv(_) => {
                        ("CSV_ERROR", "Check that the input is a CSV file with a header row")
                    }
                    AnalysisError::MissingColumn(_) => {
                        ("MISSING_COLUMN", "Set the input column names in the configuration")
                    }
                    AnalysisError::InvalidConfig(_) | AnalysisError::InvalidPattern(_) => {
                        ("CONFIG_ERROR", "Run 'navflow config' to print a valid configuration")
                    }
                    _ => ("ANALYSIS_ERROR", "Check input format"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
        }
    }
}
