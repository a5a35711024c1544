// File I/O operations

pub mod csv;
pub mod export;
pub mod json;
pub mod xlsx;

use std::path::Path;

use ledgerscan_analysis::{Dataset, Value};

/// Options for [`load`].
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Worksheet to read from a spreadsheet; the first sheet when `None`.
    pub sheet: Option<String>,
}

/// Input formats recognised by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Tsv,
    Spreadsheet,
    Json,
}

impl FileFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" | "txt" => Some(Self::Csv),
            "tsv" | "tab" => Some(Self::Tsv),
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Some(Self::Spreadsheet),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Read a file into rows, choosing the parser by extension.
pub fn load(path: &Path, options: &LoadOptions) -> Result<Dataset, String> {
    let format = FileFormat::from_path(path).ok_or_else(|| {
        format!(
            "Unsupported file type: {} (expected csv, tsv, xlsx, xls, ods or json)",
            path.display()
        )
    })?;
    if options.sheet.is_some() && format != FileFormat::Spreadsheet {
        log::warn!("--sheet ignored for non-spreadsheet input {}", path.display());
    }

    let dataset = match format {
        FileFormat::Csv => csv::import(path)?,
        FileFormat::Tsv => csv::import_tsv(path)?,
        FileFormat::Spreadsheet => xlsx::import(path, options.sheet.as_deref())?,
        FileFormat::Json => json::import(path)?,
    };
    log::debug!(
        "loaded {} rows x {} columns from {}",
        dataset.rows.len(),
        dataset.headers.len(),
        path.display()
    );
    Ok(dataset)
}

/// Turn a header record plus positional records into a dataset.
///
/// Headers are made unique: blank names become `Column N` (1-based position)
/// and repeats get `_2`, `_3` suffixes. Records wider than the header row
/// extend it with `Column N` names. Records with no non-blank cell are dropped.
pub(crate) fn build_dataset(header_cells: Vec<String>, records: Vec<Vec<Value>>) -> Dataset {
    let width = records
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(header_cells.len()))
        .max()
        .unwrap_or(0);

    let mut headers: Vec<String> = Vec::with_capacity(width);
    for idx in 0..width {
        let raw = header_cells.get(idx).map(|h| h.trim()).unwrap_or("");
        let base = if raw.is_empty() {
            format!("Column {}", idx + 1)
        } else {
            raw.to_string()
        };
        let mut name = base.clone();
        let mut n = 2;
        while headers.contains(&name) {
            name = format!("{base}_{n}");
            n += 1;
        }
        headers.push(name);
    }

    let records: Vec<Vec<Value>> = records
        .into_iter()
        .filter(|r| r.iter().any(|v| !v.is_blank()))
        .collect();
    Dataset::from_records(&headers, records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_headers_are_made_unique() {
        let ds = build_dataset(headers(&["Amount", "", "Amount", "Amount", " Vendor "]), vec![]);
        assert_eq!(ds.headers, vec!["Amount", "Column 2", "Amount_2", "Amount_3", "Vendor"]);
    }

    #[test]
    fn test_wide_records_extend_headers() {
        let ds = build_dataset(
            headers(&["a"]),
            vec![vec![Value::from("1"), Value::from("x"), Value::from("y")]],
        );
        assert_eq!(ds.headers, vec!["a", "Column 2", "Column 3"]);
        assert_eq!(ds.rows[0]["Column 3"], Value::from("y"));
    }

    #[test]
    fn test_blank_records_are_dropped() {
        let ds = build_dataset(
            headers(&["a", "b"]),
            vec![
                vec![Value::from("1"), Value::Absent],
                vec![Value::Absent, Value::from("  ")],
                vec![Value::Absent, Value::from(2.0)],
            ],
        );
        assert_eq!(ds.rows.len(), 2);
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(FileFormat::from_path(Path::new("a.CSV")), Some(FileFormat::Csv));
        assert_eq!(FileFormat::from_path(Path::new("a.tsv")), Some(FileFormat::Tsv));
        assert_eq!(FileFormat::from_path(Path::new("a.xlsm")), Some(FileFormat::Spreadsheet));
        assert_eq!(FileFormat::from_path(Path::new("a.json")), Some(FileFormat::Json));
        assert_eq!(FileFormat::from_path(Path::new("a.pdf")), None);
        assert_eq!(FileFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_load_dispatches_by_extension() {
        let dir = tempdir().unwrap();
        let csv_path = dir.path().join("ledger.csv");
        fs::write(&csv_path, "Amount;Vendor\n10;Acme\n20;Globex\n").unwrap();
        let ds = load(&csv_path, &LoadOptions::default()).unwrap();
        assert_eq!(ds.headers, vec!["Amount", "Vendor"]);
        assert_eq!(ds.rows.len(), 2);

        let json_path = dir.path().join("ledger.json");
        fs::write(&json_path, r#"[{"Amount": 10, "Vendor": "Acme"}]"#).unwrap();
        let ds = load(&json_path, &LoadOptions::default()).unwrap();
        assert_eq!(ds.rows[0]["Amount"], Value::from(10.0));

        let err = load(&dir.path().join("ledger.pdf"), &LoadOptions::default()).unwrap_err();
        assert!(err.contains("Unsupported file type"));
    }
}
