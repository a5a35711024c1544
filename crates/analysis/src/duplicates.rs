use std::collections::{BTreeMap, BTreeSet};

use crate::model::{Anomaly, AnomalyKind, Dataset, RiskBucket, Row, Value};
use crate::risk::RiskMap;

/// Canonical serialization of a whole row. Rows are key-sorted maps, so equal
/// rows always produce equal keys.
pub fn row_key(row: &Row) -> String {
    serde_json::to_string(row).unwrap_or_else(|_| format!("{row:?}"))
}

/// Groups row positions by full-row key and by invoice ID during the row pass.
#[derive(Debug, Default)]
pub struct DuplicateDetector {
    by_row: BTreeMap<String, Vec<usize>>,
    by_invoice: BTreeMap<String, Vec<usize>>,
}

impl DuplicateDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// `position` is 0-based.
    pub fn observe_row(&mut self, position: usize, row: &Row) {
        self.by_row.entry(row_key(row)).or_default().push(position);
    }

    /// Blank invoice IDs are never grouped.
    pub fn observe_invoice(&mut self, position: usize, invoice: &Value) {
        let id = invoice.display().trim().to_string();
        if id.is_empty() {
            return;
        }
        self.by_invoice.entry(id).or_default().push(position);
    }

    /// Emit anomalies and charge the risk map.
    ///
    /// Exact copies: every member is flagged; each member after the first is
    /// charged the first member's absolute amount. Invoice groups: members not
    /// already flagged as exact copies are flagged; members after the first
    /// are charged their own absolute amount.
    pub fn finish(
        self,
        dataset: &Dataset,
        amounts: &[Option<f64>],
        amount_column: &str,
        invoice_column: Option<&str>,
        risk: &mut RiskMap,
    ) -> Vec<Anomaly> {
        let mut anomalies = Vec::new();
        let mut exact_members: BTreeSet<usize> = BTreeSet::new();

        for positions in self.by_row.values().filter(|p| p.len() > 1) {
            let first_amount = amounts[positions[0]].map(f64::abs);
            for (nth, &pos) in positions.iter().enumerate() {
                exact_members.insert(pos);
                anomalies.push(anomaly(
                    dataset,
                    pos,
                    AnomalyKind::DuplicateRecord,
                    amount_column,
                    amounts[pos],
                ));
                if nth > 0 {
                    if let Some(charge) = first_amount {
                        risk.charge(pos + 1, charge, RiskBucket::Duplicate);
                    }
                }
            }
        }

        if let Some(invoice_column) = invoice_column {
            for positions in self.by_invoice.values().filter(|p| p.len() > 1) {
                for (nth, &pos) in positions.iter().enumerate() {
                    if !exact_members.contains(&pos) {
                        anomalies.push(anomaly(
                            dataset,
                            pos,
                            AnomalyKind::DuplicateInvoiceId,
                            invoice_column,
                            amounts[pos],
                        ));
                    }
                    if nth > 0 {
                        if let Some(own) = amounts[pos] {
                            risk.charge(pos + 1, own.abs(), RiskBucket::Duplicate);
                        }
                    }
                }
            }
        }

        anomalies
    }
}

fn anomaly(
    dataset: &Dataset,
    position: usize,
    kind: AnomalyKind,
    column: &str,
    amount: Option<f64>,
) -> Anomaly {
    let row = dataset.rows[position].clone();
    Anomaly {
        row_index: position + 1,
        kind,
        column: column.to_string(),
        value: row.get(column).cloned().unwrap_or_default(),
        amount,
        row,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(dataset: &Dataset, invoice: Option<&str>) -> (Vec<Anomaly>, RiskMap) {
        let amounts: Vec<Option<f64>> = dataset
            .rows
            .iter()
            .map(|r| r.get("amt").and_then(Value::as_amount))
            .collect();
        let mut detector = DuplicateDetector::new();
        for (pos, row) in dataset.rows.iter().enumerate() {
            detector.observe_row(pos, row);
            if let Some(col) = invoice {
                detector.observe_invoice(pos, row.get(col).unwrap_or(&Value::Absent));
            }
        }
        let mut risk = RiskMap::new();
        let anomalies = detector.finish(dataset, &amounts, "amt", invoice, &mut risk);
        (anomalies, risk)
    }

    #[test]
    fn row_key_is_order_independent() {
        let a: Row = [("x".to_string(), Value::from(1.0)), ("y".to_string(), Value::from("z"))]
            .into_iter()
            .collect();
        let b: Row = [("y".to_string(), Value::from("z")), ("x".to_string(), Value::from(1.0))]
            .into_iter()
            .collect();
        assert_eq!(row_key(&a), row_key(&b));
    }

    #[test]
    fn exact_copies_flag_every_member() {
        let ds = Dataset::from_records(
            &["amt", "vendor"],
            vec![
                vec![100.0.into(), "acme".into()],
                vec![100.0.into(), "acme".into()],
                vec![100.0.into(), "acme".into()],
                vec![100.0.into(), "globex".into()],
            ],
        );
        let (anomalies, risk) = run(&ds, None);
        let rows: Vec<usize> = anomalies.iter().map(|a| a.row_index).collect();
        assert_eq!(rows, vec![1, 2, 3]);
        assert!(anomalies.iter().all(|a| a.kind == AnomalyKind::DuplicateRecord));
        assert_eq!(risk.get(1), None);
        assert_eq!(risk.get(2), Some((100.0, RiskBucket::Duplicate)));
        assert_eq!(risk.total(), 200.0);
    }

    #[test]
    fn invoice_duplicates_charge_own_amount_after_first() {
        let ds = Dataset::from_records(
            &["amt", "inv"],
            vec![
                vec![100.0.into(), "INV-1".into()],
                vec![250.0.into(), "INV-1".into()],
                vec![75.0.into(), "INV-2".into()],
            ],
        );
        let (anomalies, risk) = run(&ds, Some("inv"));
        assert_eq!(anomalies.len(), 2);
        assert!(anomalies.iter().all(|a| a.kind == AnomalyKind::DuplicateInvoiceId));
        assert_eq!(anomalies[0].column, "inv");
        assert_eq!(anomalies[0].value, Value::from("INV-1"));
        assert_eq!(risk.len(), 1);
        assert_eq!(risk.get(2), Some((250.0, RiskBucket::Duplicate)));
    }

    #[test]
    fn exact_copies_are_not_double_flagged_by_invoice() {
        let ds = Dataset::from_records(
            &["amt", "inv"],
            vec![
                vec![100.0.into(), "INV-1".into()],
                vec![100.0.into(), "INV-1".into()],
                vec![300.0.into(), "INV-1".into()],
            ],
        );
        let (anomalies, risk) = run(&ds, Some("inv"));
        let record = anomalies
            .iter()
            .filter(|a| a.kind == AnomalyKind::DuplicateRecord)
            .count();
        let invoice: Vec<usize> = anomalies
            .iter()
            .filter(|a| a.kind == AnomalyKind::DuplicateInvoiceId)
            .map(|a| a.row_index)
            .collect();
        assert_eq!(record, 2);
        assert_eq!(invoice, vec![3]);
        assert_eq!(risk.get(2), Some((100.0, RiskBucket::Duplicate)));
        assert_eq!(risk.get(3), Some((300.0, RiskBucket::Duplicate)));
    }

    #[test]
    fn blank_invoice_ids_are_ignored() {
        let ds = Dataset::from_records(
            &["amt", "inv"],
            vec![
                vec![1.0.into(), "  ".into()],
                vec![2.0.into(), "  ".into()],
                vec![3.0.into(), Value::Absent],
                vec![4.0.into(), Value::Absent],
            ],
        );
        let (anomalies, _) = run(&ds, Some("inv"));
        assert!(anomalies.is_empty());
    }

    #[test]
    fn copies_without_amounts_are_flagged_but_not_charged() {
        let ds = Dataset::from_records(&["amt"], vec![vec![Value::Absent], vec![Value::Absent]]);
        let (anomalies, risk) = run(&ds, None);
        assert_eq!(anomalies.len(), 2);
        assert!(risk.is_empty());
    }
}
