//! `ledgerscan columns`: show how each column was classified and which
//! roles auto-selection would assign.

use std::path::PathBuf;

use serde::Serialize;

use ledgerscan_analysis::{auto_select, classify_columns, AnalysisConfig, ColumnProfile};

use crate::{load_input, CliError};

#[derive(Debug, Serialize)]
struct ColumnsReport {
    headers: Vec<String>,
    rows: usize,
    profile: ColumnProfile,
    selected: Option<AnalysisConfig>,
}

pub fn cmd_columns(file: PathBuf, sheet: Option<String>, json: bool) -> Result<(), CliError> {
    let dataset = load_input(&file, sheet)?;
    let profile = classify_columns(&dataset);
    let selected = auto_select(&profile);

    let report = ColumnsReport {
        headers: dataset.headers.clone(),
        rows: dataset.len(),
        profile,
        selected,
    };

    if json {
        let json_str = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::output(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
        return Ok(());
    }

    println!("{} rows, {} columns", report.rows, report.headers.len());
    println!();
    print_class("numeric", &report.profile.numeric);
    print_class("date", &report.profile.date);
    print_class("category", &report.profile.category);
    print_class("identifier", &report.profile.identifier);
    println!();

    match &report.selected {
        Some(config) => {
            println!("auto-selected roles:");
            for (role, column) in config.roles() {
                println!("  {:<10} {}", role, column);
            }
        }
        None => {
            println!("no numeric column found; pass --amount to `ledgerscan analyze`");
        }
    }
    Ok(())
}

fn print_class(label: &str, columns: &[String]) {
    if columns.is_empty() {
        println!("  {:<12} -", label);
    } else {
        println!("  {:<12} {}", label, columns.join(", "));
    }
}
