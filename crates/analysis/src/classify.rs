use std::collections::HashSet;

use serde::Serialize;

use crate::model::{parse_number_text, Dataset, Row, Value};
use crate::temporal::parse_date_text;

/// Rows sampled for numeric / date / identifier detection.
pub const TYPE_SAMPLE_ROWS: usize = 10;
/// Rows sampled for category detection.
pub const CATEGORY_SAMPLE_ROWS: usize = 50;

/// Spreadsheet date serials considered plausible (1982 - 2064).
pub const DATE_SERIAL_RANGE: std::ops::RangeInclusive<f64> = 30000.0..=60000.0;

/// A category column's distinct values must stay below this share of the sample.
pub const CATEGORY_DISTINCT_SHARE: f64 = 0.9;

/// Column names per detected class, each list in header order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnProfile {
    pub numeric: Vec<String>,
    pub date: Vec<String>,
    pub category: Vec<String>,
    pub identifier: Vec<String>,
}

pub fn is_numeric_value(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        Value::Text(s) => parse_number_text(s).is_some(),
        Value::Absent => false,
    }
}

pub fn is_date_value(value: &Value) -> bool {
    match value {
        Value::Number(n) => DATE_SERIAL_RANGE.contains(n),
        Value::Text(s) => parse_date_text(s).is_some(),
        Value::Absent => false,
    }
}

pub fn is_identifier_value(value: &Value) -> bool {
    value.display().bytes().any(|b| (b'1'..=b'9').contains(&b))
}

/// More than half of the sampled rows satisfy `pred`.
fn majority(sample: &[Row], column: &str, pred: impl Fn(&Value) -> bool) -> bool {
    if sample.is_empty() {
        return false;
    }
    let hits = sample
        .iter()
        .filter(|row| row.get(column).is_some_and(&pred))
        .count();
    hits * 2 > sample.len()
}

fn is_category_column(sample: &[Row], column: &str) -> bool {
    let mut distinct: HashSet<String> = HashSet::new();
    let mut seen_any = false;
    for row in sample {
        match row.get(column) {
            Some(v @ (Value::Text(_) | Value::Number(_))) => {
                seen_any = true;
                distinct.insert(v.display());
            }
            _ => {}
        }
    }
    seen_any && (distinct.len() as f64) < sample.len() as f64 * CATEGORY_DISTINCT_SHARE
}

/// Tag every header by sampling the leading rows. No rows, no classes.
pub fn classify_columns(dataset: &Dataset) -> ColumnProfile {
    let type_sample = &dataset.rows[..dataset.rows.len().min(TYPE_SAMPLE_ROWS)];
    let category_sample = &dataset.rows[..dataset.rows.len().min(CATEGORY_SAMPLE_ROWS)];

    let mut profile = ColumnProfile::default();
    for header in &dataset.headers {
        if majority(type_sample, header, is_numeric_value) {
            profile.numeric.push(header.clone());
        }
        if majority(type_sample, header, is_date_value) {
            profile.date.push(header.clone());
        }
        if majority(type_sample, header, is_identifier_value) {
            profile.identifier.push(header.clone());
        }
        if is_category_column(category_sample, header) {
            profile.category.push(header.clone());
        }
    }
    profile
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> Dataset {
        let vendors = ["Acme", "Globex", "Initech"];
        let records = (0..12)
            .map(|i| {
                vec![
                    Value::from(format!("2024-01-{:02}", i + 1)),
                    Value::from(format!("{},{:03}.50", i + 1, i * 7)),
                    Value::from(vendors[i % 3]),
                    Value::from(format!("INV-{}", 1000 + i)),
                    Value::from(45000.0 + i as f64),
                ]
            })
            .collect();
        Dataset::from_records(&["Date", "Amount", "Vendor", "Invoice", "Posted"], records)
    }

    #[test]
    fn ledger_columns() {
        let p = classify_columns(&ledger());
        assert_eq!(p.numeric, vec!["Amount", "Posted"]);
        assert_eq!(p.date, vec!["Date", "Posted"]);
        assert_eq!(p.category, vec!["Vendor"]);
        // Every column here carries a nonzero digit except the vendor names.
        assert_eq!(p.identifier, vec!["Date", "Amount", "Invoice", "Posted"]);
    }

    #[test]
    fn empty_dataset_has_no_classes() {
        let ds = Dataset::new(vec!["a".into()], vec![]);
        assert_eq!(classify_columns(&ds), ColumnProfile::default());
    }

    #[test]
    fn exactly_half_is_not_a_majority() {
        let ds = Dataset::from_records(
            &["x"],
            vec![vec!["1".into()], vec!["2".into()], vec!["a".into()], vec!["b".into()]],
        );
        assert!(classify_columns(&ds).numeric.is_empty());
    }

    #[test]
    fn value_predicates() {
        assert!(is_numeric_value(&Value::from("12,500")));
        assert!(!is_numeric_value(&Value::from("12 apples")));
        assert!(is_date_value(&Value::from(30000.0)));
        assert!(is_date_value(&Value::from(60000.0)));
        assert!(!is_date_value(&Value::from(29999.0)));
        assert!(!is_date_value(&Value::from(1500.0)));
        assert!(is_identifier_value(&Value::from("A-0009")));
        assert!(!is_identifier_value(&Value::from("A-000")));
        assert!(!is_identifier_value(&Value::Absent));
    }

    #[test]
    fn unique_columns_are_not_categories() {
        let records = (0..20).map(|i| vec![Value::from(format!("row-{i}"))]).collect();
        let ds = Dataset::from_records(&["id"], records);
        assert!(classify_columns(&ds).category.is_empty());
    }

    #[test]
    fn absent_only_column_is_not_a_category() {
        let ds = Dataset::from_records(&["x"], vec![vec![Value::Absent]; 5]);
        assert!(classify_columns(&ds).category.is_empty());
    }

    #[test]
    fn category_sample_is_wider_than_type_sample() {
        // First 10 rows unique, but over 50 rows the values repeat heavily.
        let records = (0..50)
            .map(|i| vec![Value::from(format!("v{}", i % 20))])
            .collect();
        let ds = Dataset::from_records(&["kind"], records);
        assert_eq!(classify_columns(&ds).category, vec!["kind"]);
    }
}
