//! `ledgerscan analyze`: load a file, resolve column roles, run the engine,
//! and write whatever outputs were asked for.

use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};

use ledgerscan_analysis::{
    analyze, auto_select, classify_columns, narrate, AnalysisConfig, AnalysisResult, Dataset,
    NarrativeSummary, RiskLevel, ScanConfig, ScanError, PLACEHOLDER_NARRATIVE,
};

use crate::exit_codes::{EXIT_ERROR, EXIT_RISK_THRESHOLD};
use crate::narrative::HttpNarrator;
use crate::{load_input, CliError};

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Input file (csv, tsv, xlsx, xls, ods, json)
    pub file: PathBuf,

    /// Worksheet to read from a spreadsheet (default: first sheet)
    #[arg(long)]
    pub sheet: Option<String>,

    /// Scan config (TOML) naming the role columns
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Amount column
    #[arg(long, value_name = "COLUMN")]
    pub amount: Option<String>,

    /// Date column (enables the time series and heatmap)
    #[arg(long, value_name = "COLUMN")]
    pub date: Option<String>,

    /// Category column, e.g. vendor (enables entity clustering)
    #[arg(long, value_name = "COLUMN")]
    pub category: Option<String>,

    /// Source column, e.g. employee (enables the flow graph with --category)
    #[arg(long, value_name = "COLUMN")]
    pub source: Option<String>,

    /// Invoice number column (feeds Benford and duplicate-invoice checks)
    #[arg(long, value_name = "COLUMN")]
    pub invoice: Option<String>,

    /// Print the full result as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Write the full result as JSON to a file
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Write an xlsx workbook with summary, anomaly, entity, time series and Benford sheets
    #[arg(long, value_name = "FILE")]
    pub export: Option<PathBuf>,

    /// Write the same tables as CSV files into a directory
    #[arg(long, value_name = "DIR")]
    pub export_csv: Option<PathBuf>,

    /// POST the run summary here and print the returned narrative
    #[arg(long, value_name = "URL", env = "LEDGERSCAN_NARRATIVE_ENDPOINT")]
    pub narrative_endpoint: Option<String>,

    /// Exit with code 6 when the risk level reaches this threshold
    #[arg(long, value_name = "LEVEL")]
    pub fail_on: Option<FailOn>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FailOn {
    Low,
    Medium,
    High,
    Critical,
}

impl From<FailOn> for RiskLevel {
    fn from(level: FailOn) -> Self {
        match level {
            FailOn::Low => RiskLevel::Low,
            FailOn::Medium => RiskLevel::Medium,
            FailOn::High => RiskLevel::High,
            FailOn::Critical => RiskLevel::Critical,
        }
    }
}

pub fn cmd_analyze(args: AnalyzeArgs) -> Result<(), CliError> {
    let dataset = load_input(&args.file, args.sheet.clone())?;
    let (config, scan_name) = resolve_config(&args, &dataset)?;

    let result = analyze(&dataset, &config).map_err(|e| scan_error(e, &dataset))?;

    if args.json || args.output.is_some() {
        let json_str = serde_json::to_string_pretty(&result).map_err(|e| CliError {
            code: EXIT_ERROR,
            message: format!("JSON serialization error: {e}"),
            hint: None,
        })?;

        if let Some(ref path) = args.output {
            std::fs::write(path, &json_str)
                .map_err(|e| CliError::output(format!("cannot write {}: {e}", path.display())))?;
            eprintln!("wrote {}", path.display());
        }
        if args.json {
            println!("{json_str}");
        }
    }

    if let Some(ref path) = args.export {
        ledgerscan_io::export::export_xlsx(&result, path).map_err(CliError::output)?;
        eprintln!("wrote {}", path.display());
    }

    if let Some(ref dir) = args.export_csv {
        let files = ledgerscan_io::export::export_csv_dir(&result, dir).map_err(CliError::output)?;
        eprintln!("wrote {} files to {}", files.len(), dir.display());
    }

    print_summary(&result, scan_name.as_deref());

    if let Some(ref endpoint) = args.narrative_endpoint {
        let summary = NarrativeSummary::from_result(&result);
        let text = match HttpNarrator::new(endpoint.as_str()) {
            Ok(narrator) => narrate(&narrator, &summary),
            Err(e) => {
                log::warn!("{e}");
                PLACEHOLDER_NARRATIVE.to_string()
            }
        };
        eprintln!();
        eprintln!("{text}");
    }

    if let Some(threshold) = args.fail_on {
        let threshold = RiskLevel::from(threshold);
        if result.risk_level >= threshold {
            return Err(CliError {
                code: EXIT_RISK_THRESHOLD,
                message: format!(
                    "risk level {} is at or above --fail-on {}",
                    result.risk_level, threshold
                ),
                hint: None,
            });
        }
    }

    Ok(())
}

/// Role columns: explicit flags win over the config file, which wins over
/// auto-selection. Returns the config and the scan name from the file, if any.
fn resolve_config(
    args: &AnalyzeArgs,
    dataset: &Dataset,
) -> Result<(AnalysisConfig, Option<String>), CliError> {
    let (base, name) = match &args.config {
        Some(path) => {
            let scan = read_scan_config(path)?;
            (Some(scan.columns), scan.name)
        }
        None => {
            let selected = auto_select(&classify_columns(dataset));
            if let Some(ref config) = selected {
                log::debug!("auto-selected roles: {:?}", config.roles());
            }
            (selected, None)
        }
    };

    let mut config = match (base, &args.amount) {
        (Some(mut config), Some(amount)) => {
            config.amount_column = amount.clone();
            if args.config.is_none() {
                release_column(&mut config, amount);
            }
            config
        }
        (None, Some(amount)) => AnalysisConfig::new(amount.as_str()),
        (Some(config), None) => config,
        (None, None) => {
            return Err(CliError::args("no numeric column found to use as the amount")
                .with_hint("pass --amount <COLUMN>; `ledgerscan columns` lists the candidates"));
        }
    };

    if let Some(ref c) = args.date {
        config.date_column = Some(c.clone());
    }
    if let Some(ref c) = args.category {
        config.category_column = Some(c.clone());
    }
    if let Some(ref c) = args.source {
        config.source_column = Some(c.clone());
    }
    if let Some(ref c) = args.invoice {
        config.invoice_column = Some(c.clone());
    }

    Ok((config, name))
}

/// Clear every optional role that names `column`.
fn release_column(config: &mut AnalysisConfig, column: &str) {
    for role in [
        &mut config.date_column,
        &mut config.category_column,
        &mut config.source_column,
        &mut config.invoice_column,
    ] {
        if role.as_deref() == Some(column) {
            log::debug!("dropping auto-selected role on amount column '{column}'");
            *role = None;
        }
    }
}

fn read_scan_config(path: &Path) -> Result<ScanConfig, CliError> {
    let input = std::fs::read_to_string(path)
        .map_err(|e| CliError::config(format!("cannot read config {}: {e}", path.display())))?;
    ScanConfig::from_toml(&input).map_err(|e| CliError::config(e.to_string()))
}

fn scan_error(err: ScanError, dataset: &Dataset) -> CliError {
    match err {
        ScanError::MissingColumn { .. } => CliError::config(err.to_string())
            .with_hint(format!("available columns: {}", dataset.headers.join(", "))),
        other => CliError::config(other.to_string()),
    }
}

fn print_summary(result: &AnalysisResult, scan_name: Option<&str>) {
    let s = &result.stats;
    let name = scan_name.map(|n| format!("'{n}': ")).unwrap_or_default();
    eprintln!(
        "{}{} rows, {} with a usable amount in '{}'",
        name, s.total_rows, s.valid_rows, result.meta.config.amount_column,
    );
    eprintln!(
        "benford: MAD {:.4} ({}), 2-digit MAD {:.4} ({})",
        result.mad, result.conformity, result.mad_2_digit, result.conformity_2_digit,
    );
    eprintln!(
        "anomalies: {} outliers, {} duplicates, {} negative, {} missing, {} round amounts",
        s.outlier_count, s.duplicate_count, s.negative_count, s.missing_count, s.round_number_count,
    );
    eprintln!(
        "risk: {}/100 ({}), {:.2} at risk, forecast loss {:.2}",
        result.risk_score, result.risk_level, s.total_at_risk, s.forecast_loss,
    );
}
