// ledgerscan CLI - fraud and data-quality screening for tabular ledgers

mod analyze;
mod columns;
mod exit_codes;
mod narrative;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exit_codes::{EXIT_CONFIG, EXIT_INPUT, EXIT_OUTPUT, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "ledgerscan")]
#[command(about = "Screen ledgers for fraud signals and data-quality problems")]
#[command(version)]
struct Cli {
    /// Log engine stages to stderr (same as RUST_LOG=debug)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify the columns of a file and show the auto-selected roles
    #[command(after_help = "\
Examples:
  ledgerscan columns expenses.csv
  ledgerscan columns q3.xlsx --sheet Ledger --json")]
    Columns {
        /// Input file (csv, tsv, xlsx, xls, ods, json)
        file: PathBuf,

        /// Worksheet to read from a spreadsheet (default: first sheet)
        #[arg(long)]
        sheet: Option<String>,

        /// Print the classification as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Run the full screening and report the risk score
    #[command(after_help = "\
Examples:
  ledgerscan analyze expenses.csv
  ledgerscan analyze expenses.csv --amount 'Net Amount' --category Vendor
  ledgerscan analyze q3.xlsx --config scan.toml --json > result.json
  ledgerscan analyze expenses.csv --export report.xlsx --export-csv out/
  ledgerscan analyze expenses.csv --fail-on high || echo 'needs review'

Column roles resolve flags first, then --config, then auto-selection.")]
    Analyze(analyze::AnalyzeArgs),
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn input(msg: impl Into<String>) -> Self {
        Self { code: EXIT_INPUT, message: msg.into(), hint: None }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self { code: EXIT_CONFIG, message: msg.into(), hint: None }
    }

    pub fn output(msg: impl Into<String>) -> Self {
        Self { code: EXIT_OUTPUT, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Load the input file, mapping every failure to the input exit code.
pub(crate) fn load_input(
    file: &Path,
    sheet: Option<String>,
) -> Result<ledgerscan_analysis::Dataset, CliError> {
    let options = ledgerscan_io::LoadOptions { sheet };
    ledgerscan_io::load(file, &options).map_err(|e| {
        let err = CliError::input(e);
        if ledgerscan_io::FileFormat::from_path(file).is_none() {
            err.with_hint("supported inputs: .csv .txt .tsv .xlsx .xlsm .xls .xlsb .ods .json")
        } else {
            err
        }
    })
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Columns { file, sheet, json } => columns::cmd_columns(file, sheet, json),
        Commands::Analyze(args) => analyze::cmd_analyze(args),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("error: {}", e.message);
            }
            if let Some(hint) = &e.hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(e.code)
        }
    }
}
