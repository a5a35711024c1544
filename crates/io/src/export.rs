// Report export: flattened result tables as an XLSX workbook or a CSV directory

use std::path::Path;

use rust_xlsxwriter::{Format, Workbook};

use ledgerscan_analysis::model::BenfordDataPoint;
use ledgerscan_analysis::{AnalysisResult, Value};

/// A typed cell in an exported table.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    fn display(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => n.to_string(),
        }
    }
}

impl From<&Value> for Cell {
    fn from(v: &Value) -> Self {
        match v {
            Value::Absent => Cell::Empty,
            Value::Text(s) => Cell::Text(s.clone()),
            Value::Number(n) => Cell::Number(*n),
        }
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

impl From<usize> for Cell {
    fn from(n: usize) -> Self {
        Cell::Number(n as f64)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Cell::Empty)
    }
}

/// One exported sheet / CSV file.
#[derive(Debug, Clone)]
pub struct Table {
    pub sheet_name: &'static str,
    pub file_name: &'static str,
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<Cell>>,
}

pub fn summary_table(result: &AnalysisResult) -> Table {
    let s = &result.stats;
    let mut rows: Vec<Vec<Cell>> = Vec::new();
    for (role, column) in result.meta.config.roles() {
        rows.push(vec![format!("{} column", role).into(), column.into()]);
    }
    let metrics: Vec<(&str, Cell)> = vec![
        ("Total rows", s.total_rows.into()),
        ("Valid rows", s.valid_rows.into()),
        ("Total amount", s.total_amount.into()),
        ("Average amount", s.average_amount.into()),
        ("Benford values", s.benford_valid_count.into()),
        ("MAD (1-digit)", result.mad.into()),
        ("Conformity (1-digit)", result.conformity.to_string().into()),
        ("MAD (2-digit)", result.mad_2_digit.into()),
        ("Conformity (2-digit)", result.conformity_2_digit.to_string().into()),
        ("Statistical outliers", s.outlier_count.into()),
        ("Duplicates", s.duplicate_count.into()),
        ("Negative amounts", s.negative_count.into()),
        ("Missing values", s.missing_count.into()),
        ("Round numbers", s.round_number_count.into()),
        ("Total at risk", s.total_at_risk.into()),
        ("At risk: outliers", s.risk_breakdown.outliers.into()),
        ("At risk: duplicates", s.risk_breakdown.duplicates.into()),
        ("At risk: negatives", s.risk_breakdown.negatives.into()),
        ("Forecast annual loss", s.forecast_loss.into()),
        ("Risk score", f64::from(result.risk_score).into()),
        ("Risk level", result.risk_level.to_string().into()),
    ];
    for (label, value) in metrics {
        rows.push(vec![label.into(), value]);
    }
    Table {
        sheet_name: "Summary",
        file_name: "summary.csv",
        headers: vec!["Metric", "Value"],
        rows,
    }
}

pub fn anomalies_table(result: &AnalysisResult) -> Table {
    Table {
        sheet_name: "Anomalies",
        file_name: "anomalies.csv",
        headers: vec!["Row", "Type", "Column", "Value", "Amount"],
        rows: result
            .anomalies
            .iter()
            .map(|a| {
                vec![
                    a.row_index.into(),
                    a.kind.as_str().into(),
                    a.column.as_str().into(),
                    (&a.value).into(),
                    a.amount.into(),
                ]
            })
            .collect(),
    }
}

pub fn entities_table(result: &AnalysisResult) -> Table {
    Table {
        sheet_name: "Entities",
        file_name: "entities.csv",
        headers: vec!["Entity", "Count", "Total Amount", "Average Amount", "Outlier"],
        rows: result
            .entity_data
            .iter()
            .map(|e| {
                vec![
                    e.id.as_str().into(),
                    e.count.into(),
                    e.total_amount.into(),
                    e.average_amount.into(),
                    if e.is_outlier { "Yes" } else { "No" }.into(),
                ]
            })
            .collect(),
    }
}

pub fn time_series_table(result: &AnalysisResult) -> Table {
    Table {
        sheet_name: "Time Series",
        file_name: "time_series.csv",
        headers: vec!["Date", "Amount", "Count"],
        rows: result
            .time_series_data
            .iter()
            .map(|p| vec![p.date.as_str().into(), p.amount.into(), p.count.into()])
            .collect(),
    }
}

fn benford_table(
    points: &[BenfordDataPoint],
    sheet_name: &'static str,
    file_name: &'static str,
) -> Table {
    Table {
        sheet_name,
        file_name,
        headers: vec!["Digit", "Count", "Actual %", "Expected %"],
        rows: points
            .iter()
            .map(|p| {
                vec![
                    f64::from(p.digit).into(),
                    p.count.into(),
                    p.actual.into(),
                    p.expected.into(),
                ]
            })
            .collect(),
    }
}

/// Every table, Summary first.
pub fn tables(result: &AnalysisResult) -> Vec<Table> {
    vec![
        summary_table(result),
        anomalies_table(result),
        entities_table(result),
        time_series_table(result),
        benford_table(&result.chart_data, "Benford 1-Digit", "benford_1_digit.csv"),
        benford_table(&result.chart_data_2_digit, "Benford 2-Digit", "benford_2_digit.csv"),
    ]
}

/// Write all tables as sheets of one workbook.
pub fn export_xlsx(result: &AnalysisResult, path: &Path) -> Result<(), String> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    for table in tables(result) {
        let worksheet = workbook
            .add_worksheet()
            .set_name(table.sheet_name)
            .map_err(|e| format!("Failed to create sheet '{}': {}", table.sheet_name, e))?;

        for (col, header) in table.headers.iter().enumerate() {
            worksheet
                .write_string_with_format(0, col as u16, *header, &header_format)
                .map_err(|e| format!("Failed to write header '{}': {}", header, e))?;
        }

        for (row_idx, row) in table.rows.iter().enumerate() {
            let row32 = (row_idx + 1) as u32;
            for (col, cell) in row.iter().enumerate() {
                let col16 = col as u16;
                let written = match cell {
                    Cell::Empty => continue,
                    Cell::Text(s) => worksheet.write_string(row32, col16, s),
                    Cell::Number(n) => worksheet.write_number(row32, col16, *n),
                };
                written.map_err(|e| {
                    format!(
                        "Failed to write cell ({}, {}) on '{}': {}",
                        row32, col, table.sheet_name, e
                    )
                })?;
            }
        }

        worksheet
            .set_freeze_panes(1, 0)
            .map_err(|e| format!("Failed to freeze header row: {}", e))?;
    }

    workbook
        .save(path)
        .map_err(|e| format!("Failed to save XLSX file: {}", e))?;
    log::debug!("wrote report workbook {}", path.display());
    Ok(())
}

/// Write every table as a CSV file inside `dir`. Returns the file names written.
pub fn export_csv_dir(result: &AnalysisResult, dir: &Path) -> Result<Vec<String>, String> {
    std::fs::create_dir_all(dir)
        .map_err(|e| format!("Failed to create {}: {}", dir.display(), e))?;

    let mut written = Vec::new();
    for table in tables(result) {
        let path = dir.join(table.file_name);
        let mut writer = csv::WriterBuilder::new()
            .from_path(&path)
            .map_err(|e| format!("Failed to create {}: {}", path.display(), e))?;
        writer
            .write_record(&table.headers)
            .map_err(|e| e.to_string())?;
        for row in &table.rows {
            writer
                .write_record(row.iter().map(Cell::display))
                .map_err(|e| e.to_string())?;
        }
        writer.flush().map_err(|e| e.to_string())?;
        written.push(table.file_name.to_string());
    }
    log::debug!("wrote {} report files to {}", written.len(), dir.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook_auto, Data, Reader};
    use ledgerscan_analysis::{analyze, AnalysisConfig, Dataset};
    use std::fs;
    use tempfile::tempdir;

    fn result() -> AnalysisResult {
        let ds = Dataset::from_records(
            &["amt", "vendor", "date"],
            vec![
                vec![Value::from(100.0), Value::from("Acme"), Value::from("2024-01-02")],
                vec![Value::from(100.0), Value::from("Acme"), Value::from("2024-01-02")],
                vec![Value::from(-50.0), Value::from("Globex"), Value::from("2024-01-05")],
                vec![Value::Absent, Value::from("Globex"), Value::from("2024-01-06")],
            ],
        );
        let config = AnalysisConfig {
            amount_column: "amt".into(),
            date_column: Some("date".into()),
            category_column: Some("vendor".into()),
            source_column: None,
            invoice_column: None,
        };
        analyze(&ds, &config).unwrap()
    }

    #[test]
    fn test_tables_flatten_result() {
        let r = result();
        let all = tables(&r);
        let names: Vec<&str> = all.iter().map(|t| t.sheet_name).collect();
        assert_eq!(
            names,
            vec!["Summary", "Anomalies", "Entities", "Time Series", "Benford 1-Digit", "Benford 2-Digit"]
        );

        let anomalies = &all[1];
        assert_eq!(anomalies.rows.len(), r.anomalies.len());
        let missing = anomalies
            .rows
            .iter()
            .find(|row| row[1] == Cell::from("Missing Value"))
            .unwrap();
        assert_eq!(missing[0], Cell::Number(4.0));
        assert_eq!(missing[3], Cell::Empty);
        assert_eq!(missing[4], Cell::Empty);

        assert_eq!(all[2].rows.len(), 2);
        assert_eq!(all[3].rows.len(), 2);
        assert_eq!(all[4].rows.len(), 9);
        assert_eq!(all[5].rows.len(), 90);
    }

    #[test]
    fn test_export_xlsx() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.xlsx");
        let r = result();
        export_xlsx(&r, &path).unwrap();

        let mut wb = open_workbook_auto(&path).unwrap();
        assert_eq!(
            wb.sheet_names(),
            vec!["Summary", "Anomalies", "Entities", "Time Series", "Benford 1-Digit", "Benford 2-Digit"]
        );

        let anomalies = wb.worksheet_range("Anomalies").unwrap();
        assert_eq!(anomalies.get((0, 0)), Some(&Data::String("Row".to_string())));
        assert_eq!(anomalies.get_size().0, r.anomalies.len() + 1);
        // row index is written as a number
        assert!(matches!(anomalies.get((1, 0)), Some(Data::Float(_))));

        let benford = wb.worksheet_range("Benford 1-Digit").unwrap();
        assert_eq!(benford.get_size().0, 10);
    }

    #[test]
    fn test_export_csv_dir() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("report");
        let written = export_csv_dir(&result(), &out).unwrap();
        assert_eq!(
            written,
            vec![
                "summary.csv",
                "anomalies.csv",
                "entities.csv",
                "time_series.csv",
                "benford_1_digit.csv",
                "benford_2_digit.csv"
            ]
        );

        let anomalies = fs::read_to_string(out.join("anomalies.csv")).unwrap();
        assert!(anomalies.starts_with("Row,Type,Column,Value,Amount\n"));
        assert!(anomalies.contains("3,Negative Amount,amt,-50,-50"));

        let entities = fs::read_to_string(out.join("entities.csv")).unwrap();
        assert!(entities.contains("Acme,2,200,100,No"));

        let benford = fs::read_to_string(out.join("benford_2_digit.csv")).unwrap();
        assert_eq!(benford.lines().count(), 91);
    }
}
