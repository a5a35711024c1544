// Excel / ODS import (xlsx, xlsm, xls, xlsb, ods)

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};

use ledgerscan_analysis::{Dataset, Value};

use crate::build_dataset;

/// Maximum number of rows read from one sheet (prevents DoS from huge files)
const MAX_ROWS: usize = 1_048_576;

/// Read one worksheet. The first row of the used range is the header row.
pub fn import(path: &Path, sheet: Option<&str>) -> Result<Dataset, String> {
    let mut workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| format!("Failed to open Excel file: {}", e))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let sheet_name = match sheet {
        Some(name) => sheet_names
            .iter()
            .find(|s| s.as_str() == name)
            .cloned()
            .ok_or_else(|| {
                format!(
                    "Sheet '{}' not found (available: {})",
                    name,
                    sheet_names.join(", ")
                )
            })?,
        None => sheet_names
            .first()
            .cloned()
            .ok_or_else(|| "Excel file contains no sheets".to_string())?,
    };
    log::debug!("reading sheet '{}' from {}", sheet_name, path.display());

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| format!("Failed to read sheet '{}': {}", sheet_name, e))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header_row) => header_row.iter().map(header_text).collect(),
        None => return Ok(Dataset::default()),
    };

    let (height, _) = range.get_size();
    if height > MAX_ROWS {
        log::warn!("sheet '{}' truncated from {} to {} rows", sheet_name, height, MAX_ROWS);
    }

    let records: Vec<Vec<Value>> = rows
        .take(MAX_ROWS)
        .map(|row| row.iter().map(cell_value).collect())
        .collect();

    Ok(build_dataset(headers, records))
}

fn header_text(cell: &Data) -> String {
    match cell_value(cell) {
        Value::Absent => String::new(),
        v => v.display(),
    }
}

/// Numbers and dates (as 1900-system serials) stay numeric; everything else is text.
fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Absent,
        Data::String(s) => {
            if s.is_empty() {
                Value::Absent
            } else {
                Value::Text(s.clone())
            }
        }
        Data::Float(n) => Value::Number(*n),
        Data::Int(n) => Value::Number(*n as f64),
        Data::Bool(b) => Value::from(if *b { "TRUE" } else { "FALSE" }),
        // Error cells carry no usable value
        Data::Error(_) => Value::Absent,
        Data::DateTime(dt) => Value::Number(dt.as_f64()),
        Data::DateTimeIso(s) => Value::Text(s.clone()),
        Data::DurationIso(s) => Value::Text(s.clone()),
    }
}
