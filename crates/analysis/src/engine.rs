use crate::aggregate::{entity_key, pareto, EntityClusterer};
use crate::benford::BenfordCounter;
use crate::config::AnalysisConfig;
use crate::duplicates::DuplicateDetector;
use crate::error::ScanError;
use crate::flow::FlowGraphBuilder;
use crate::model::{
    AnalysisMeta, AnalysisResult, AnalysisStats, Anomaly, AnomalyKind, BenfordSource, Dataset,
    RiskBucket, Row, ScatterPoint, Value,
};
use crate::outliers::{iqr_bounds, ZScorer};
use crate::risk::{forecast_loss, is_round_number, risk_level, risk_score, RiskMap, RiskSignals};
use crate::temporal::{parse_timestamp, TemporalAggregator};

/// Anomalies surfaced separately for the narrative report.
pub const TOP_ANOMALIES: usize = 5;

/// Screen a dataset. The only failure is a config naming a column the data
/// does not have; everything found in the rows is reported as data.
pub fn analyze(dataset: &Dataset, config: &AnalysisConfig) -> Result<AnalysisResult, ScanError> {
    config.validate(&dataset.headers)?;

    // Pass 1: parse amounts, per-row anomalies, and every accumulator that
    // does not need global bounds.
    let mut pass = RowPass::new(config);
    for (position, row) in dataset.rows.iter().enumerate() {
        pass.observe(position, row);
    }
    let RowPass {
        amounts,
        mut anomalies,
        mut risk,
        duplicates,
        benford,
        entities,
        flow,
        temporal,
        total_amount,
        round_number_count,
        ..
    } = pass;

    let valid: Vec<(usize, f64)> = amounts
        .iter()
        .enumerate()
        .filter_map(|(position, amount)| amount.map(|a| (position, a)))
        .collect();
    let values: Vec<f64> = valid.iter().map(|(_, a)| *a).collect();
    let valid_rows = values.len();
    log::debug!(
        "pass 1: {} rows, {} with a parsed amount, total {}",
        dataset.len(),
        valid_rows,
        total_amount
    );

    anomalies.extend(duplicates.finish(
        dataset,
        &amounts,
        &config.amount_column,
        config.invoice_column.as_deref(),
        &mut risk,
    ));

    let bounds = iqr_bounds(&values);
    let scorer = ZScorer::from_values(&values);
    if let Some(b) = &bounds {
        log::debug!("iqr: q1={} q3={} fences=[{}, {}]", b.q1, b.q3, b.lower, b.upper);
    }

    // Pass 2: outlier classification against the global fences.
    let mut scatter_data = Vec::with_capacity(valid_rows);
    let mut outlier_count = 0;
    for &(position, amount) in &valid {
        let is_outlier = bounds.is_some_and(|b| b.is_outlier(amount));
        if is_outlier {
            outlier_count += 1;
            anomalies.push(anomaly_at(
                dataset,
                position,
                AnomalyKind::StatisticalOutlier,
                &config.amount_column,
                Some(amount),
            ));
            risk.charge(position + 1, amount.abs(), RiskBucket::Outlier);
        }
        scatter_data.push(ScatterPoint {
            row_index: position + 1,
            amount,
            is_outlier,
            z_score: scorer.score(amount),
        });
    }

    let entity_data = entities
        .map(|e| e.finish(bounds.as_ref(), valid_rows))
        .unwrap_or_default();
    let pareto_data = pareto(&entity_data);
    let graph_data = flow.map(FlowGraphBuilder::finish).unwrap_or_default();
    let temporal = temporal.map(TemporalAggregator::finish);

    let benford_report = benford.finish();
    log::debug!(
        "benford: {} values, mad={:.4} ({}), mad_2_digit={:.4} ({})",
        benford_report.valid_count,
        benford_report.mad,
        benford_report.conformity,
        benford_report.mad_two_digit,
        benford_report.conformity_two_digit
    );

    anomalies.sort_by_key(|a| a.row_index);
    risk.assign_buckets(&anomalies);
    let top_anomalies = top_by_amount(&anomalies, TOP_ANOMALIES);

    let duplicate_count = anomalies
        .iter()
        .filter(|a| {
            matches!(
                a.kind,
                AnomalyKind::DuplicateRecord | AnomalyKind::DuplicateInvoiceId
            )
        })
        .count();
    let negative_count = count_kind(&anomalies, AnomalyKind::NegativeAmount);
    let missing_count = count_kind(&anomalies, AnomalyKind::MissingValue);

    let risk_score = risk_score(&RiskSignals {
        conformity: benford_report.conformity,
        conformity_two_digit: benford_report.conformity_two_digit,
        valid_rows,
        outlier_count,
        duplicate_count,
        round_number_count,
    });
    let risk_level = risk_level(risk_score);
    let total_at_risk = risk.total();
    let span_days = temporal.as_ref().and_then(|t| t.span_days);
    let forecast = forecast_loss(total_at_risk, span_days);
    log::debug!("risk: score={risk_score} at_risk={total_at_risk} forecast={forecast}");

    let (time_series_data, heatmap_data) = temporal
        .map(|t| (t.time_series, t.heatmap))
        .unwrap_or_default();

    let average_amount = if valid_rows > 0 {
        total_amount / valid_rows as f64
    } else {
        0.0
    };

    log::info!(
        "analyzed {} rows: {} anomalies, risk {} ({})",
        dataset.len(),
        anomalies.len(),
        risk_score,
        risk_level
    );

    Ok(AnalysisResult {
        meta: AnalysisMeta {
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            benford_source: if config.invoice_column.is_some() {
                BenfordSource::Invoice
            } else {
                BenfordSource::Amount
            },
            config: config.clone(),
        },
        stats: AnalysisStats {
            total_rows: dataset.len(),
            valid_rows,
            benford_valid_count: benford_report.valid_count,
            total_amount,
            average_amount,
            outlier_count,
            duplicate_count,
            negative_count,
            missing_count,
            round_number_count,
            total_at_risk,
            forecast_loss: forecast,
            risk_breakdown: risk.breakdown(),
            iqr: bounds,
        },
        chart_data: benford_report.first_digit,
        chart_data_2_digit: benford_report.two_digit,
        mad: benford_report.mad,
        mad_2_digit: benford_report.mad_two_digit,
        conformity: benford_report.conformity,
        conformity_2_digit: benford_report.conformity_two_digit,
        anomalies,
        top_anomalies,
        scatter_data,
        entity_data,
        pareto_data,
        graph_data,
        time_series_data,
        heatmap_data,
        risk_score,
        risk_level,
        at_risk_rows: risk.rows(),
    })
}

/// Accumulators for the first pass. Optional analyses are `None` when their
/// role column is not configured.
struct RowPass<'a> {
    config: &'a AnalysisConfig,
    amounts: Vec<Option<f64>>,
    anomalies: Vec<Anomaly>,
    risk: RiskMap,
    duplicates: DuplicateDetector,
    benford: BenfordCounter,
    entities: Option<EntityClusterer>,
    flow: Option<FlowGraphBuilder>,
    temporal: Option<TemporalAggregator>,
    total_amount: f64,
    round_number_count: usize,
}

impl<'a> RowPass<'a> {
    fn new(config: &'a AnalysisConfig) -> Self {
        Self {
            config,
            amounts: Vec::new(),
            anomalies: Vec::new(),
            risk: RiskMap::new(),
            duplicates: DuplicateDetector::new(),
            benford: BenfordCounter::new(),
            entities: config.category_column.as_ref().map(|_| EntityClusterer::new()),
            flow: (config.category_column.is_some() && config.source_column.is_some())
                .then(FlowGraphBuilder::new),
            temporal: config.date_column.as_ref().map(|_| TemporalAggregator::new()),
            total_amount: 0.0,
            round_number_count: 0,
        }
    }

    fn observe(&mut self, position: usize, row: &Row) {
        let config = self.config;
        let row_index = position + 1;

        // Rows without an amount still take part in duplicate grouping.
        self.duplicates.observe_row(position, row);
        let invoice = config.invoice_column.as_deref().map(|c| cell(row, c));
        if let Some(id) = invoice {
            self.duplicates.observe_invoice(position, id);
        }

        let raw = cell(row, &config.amount_column);
        let Some(amount) = raw.as_amount() else {
            self.amounts.push(None);
            self.anomalies.push(Anomaly {
                row_index,
                kind: AnomalyKind::MissingValue,
                column: config.amount_column.clone(),
                value: raw.clone(),
                amount: None,
                row: row.clone(),
            });
            return;
        };
        self.amounts.push(Some(amount));
        self.total_amount += amount;

        if amount < 0.0 {
            self.anomalies.push(Anomaly {
                row_index,
                kind: AnomalyKind::NegativeAmount,
                column: config.amount_column.clone(),
                value: raw.clone(),
                amount: Some(amount),
                row: row.clone(),
            });
            self.risk.charge(row_index, amount.abs(), RiskBucket::Negative);
        }
        if is_round_number(amount) {
            self.round_number_count += 1;
        }

        match invoice {
            Some(id) => self.benford.record(id),
            None => self.benford.record(&Value::Number(amount)),
        };

        let category = config.category_column.as_deref().map(|c| entity_key(row.get(c)));
        if let (Some(entities), Some(category)) = (self.entities.as_mut(), category.as_ref()) {
            entities.observe(category.clone(), amount);
        }
        if let (Some(flow), Some(category), Some(source_column)) =
            (self.flow.as_mut(), category, config.source_column.as_deref())
        {
            flow.observe(entity_key(row.get(source_column)), category, amount);
        }

        if let (Some(temporal), Some(date_column)) =
            (self.temporal.as_mut(), config.date_column.as_deref())
        {
            if let Some(at) = parse_timestamp(cell(row, date_column)) {
                temporal.observe(at, amount);
            }
        }
    }
}

static ABSENT: Value = Value::Absent;

fn cell<'r>(row: &'r Row, column: &str) -> &'r Value {
    row.get(column).unwrap_or(&ABSENT)
}

fn anomaly_at(
    dataset: &Dataset,
    position: usize,
    kind: AnomalyKind,
    column: &str,
    amount: Option<f64>,
) -> Anomaly {
    let row = &dataset.rows[position];
    Anomaly {
        row_index: position + 1,
        kind,
        column: column.to_string(),
        value: cell(row, column).clone(),
        amount,
        row: row.clone(),
    }
}

fn count_kind(anomalies: &[Anomaly], kind: AnomalyKind) -> usize {
    anomalies.iter().filter(|a| a.kind == kind).count()
}

/// Largest absolute amounts first; anomalies without an amount rank as 0.
/// Ties keep row order.
fn top_by_amount(anomalies: &[Anomaly], n: usize) -> Vec<Anomaly> {
    let mut ranked: Vec<&Anomaly> = anomalies.iter().collect();
    ranked.sort_by(|a, b| {
        let a = a.amount.map_or(0.0, f64::abs);
        let b = b.amount.map_or(0.0, f64::abs);
        b.total_cmp(&a)
    });
    ranked.into_iter().take(n).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Conformity, NodeKind, RiskLevel};

    fn amounts_only(values: Vec<Value>) -> Dataset {
        Dataset::from_records(&["amt"], values.into_iter().map(|v| vec![v]).collect())
    }

    fn kinds_at(result: &AnalysisResult, row_index: usize) -> Vec<AnomalyKind> {
        result
            .anomalies
            .iter()
            .filter(|a| a.row_index == row_index)
            .map(|a| a.kind)
            .collect()
    }

    #[test]
    fn missing_negative_and_duplicate_rows() {
        let ds = amounts_only(vec![
            Value::from(100.0),
            Value::from(100.0),
            Value::from(-50.0),
            Value::Absent,
        ]);
        let result = analyze(&ds, &AnalysisConfig::new("amt")).unwrap();

        assert_eq!(result.stats.total_rows, 4);
        assert_eq!(result.stats.valid_rows, 3);
        assert_eq!(result.count_of(AnomalyKind::MissingValue), 1);
        assert_eq!(result.count_of(AnomalyKind::NegativeAmount), 1);
        assert_eq!(result.count_of(AnomalyKind::DuplicateRecord), 2);

        assert_eq!(kinds_at(&result, 4), vec![AnomalyKind::MissingValue]);
        let negative = result
            .anomalies
            .iter()
            .find(|a| a.kind == AnomalyKind::NegativeAmount)
            .unwrap();
        assert_eq!(negative.row_index, 3);
        assert_eq!(negative.value, Value::from(-50.0));
        assert_eq!(kinds_at(&result, 1), vec![AnomalyKind::DuplicateRecord]);
        assert_eq!(kinds_at(&result, 2), vec![AnomalyKind::DuplicateRecord]);
    }

    #[test]
    fn anomalies_are_sorted_by_row() {
        let ds = amounts_only(vec![
            Value::from(5.0),
            Value::Absent,
            Value::from(5.0),
            Value::from(-1.0),
        ]);
        let result = analyze(&ds, &AnalysisConfig::new("amt")).unwrap();
        let rows: Vec<usize> = result.anomalies.iter().map(|a| a.row_index).collect();
        let mut sorted = rows.clone();
        sorted.sort();
        assert_eq!(rows, sorted);
    }

    #[test]
    fn benford_counts_from_amounts() {
        let ds = amounts_only([111.0, 123.0, 199.0, 211.0, 234.0].map(Value::from).to_vec());
        let result = analyze(&ds, &AnalysisConfig::new("amt")).unwrap();

        assert_eq!(result.stats.benford_valid_count, 5);
        assert_eq!(result.chart_data[0].count, 3);
        assert_eq!(result.chart_data[1].count, 2);
        assert!((result.chart_data[0].actual - 60.0).abs() < 1e-9);
        assert!((result.chart_data[1].actual - 40.0).abs() < 1e-9);
        assert!(result.chart_data[2..].iter().all(|p| p.actual == 0.0));
        assert_eq!(result.meta.benford_source, BenfordSource::Amount);
    }

    #[test]
    fn invoice_column_feeds_benford_and_duplicates() {
        let ds = Dataset::from_records(
            &["amt", "inv"],
            vec![
                vec![Value::from(100.0), Value::from("INV-7001")],
                vec![Value::from(250.0), Value::from("INV-7001")],
                vec![Value::from(40.0), Value::from("INV-9002")],
            ],
        );
        let mut config = AnalysisConfig::new("amt");
        config.invoice_column = Some("inv".into());
        let result = analyze(&ds, &config).unwrap();

        assert_eq!(result.meta.benford_source, BenfordSource::Invoice);
        assert_eq!(result.chart_data[6].count, 2);
        assert_eq!(result.chart_data[8].count, 1);

        assert_eq!(result.count_of(AnomalyKind::DuplicateRecord), 0);
        assert_eq!(result.count_of(AnomalyKind::DuplicateInvoiceId), 2);
        let dup = &result.anomalies[0];
        assert_eq!(dup.column, "inv");
        assert_eq!(dup.value, Value::from("INV-7001"));

        assert_eq!(result.at_risk_rows.len(), 1);
        assert_eq!(result.at_risk_rows[0].row_index, 2);
        assert_eq!(result.stats.total_at_risk, 250.0);
    }

    #[test]
    fn outliers_become_anomalies_and_risk() {
        let mut values: Vec<Value> = (0..19).map(|i| Value::from(100.0 + f64::from(i))).collect();
        values.push(Value::from(10_000.0));
        let result = analyze(&amounts_only(values), &AnalysisConfig::new("amt")).unwrap();

        assert_eq!(result.stats.outlier_count, 1);
        assert_eq!(kinds_at(&result, 20), vec![AnomalyKind::StatisticalOutlier]);
        assert_eq!(result.scatter_data.len(), 20);
        assert!(result.scatter_data[19].is_outlier);
        assert!(result.scatter_data[19].z_score > 4.0);
        assert_eq!(result.stats.risk_breakdown.outliers, 10_000.0);
        assert_eq!(result.top_anomalies[0].row_index, 20);
    }

    #[test]
    fn outlier_takes_precedence_in_breakdown() {
        let mut values: Vec<Value> = (0..19).map(|i| Value::from(10.0 + f64::from(i))).collect();
        values.push(Value::from(-5_000.0));
        let result = analyze(&amounts_only(values), &AnalysisConfig::new("amt")).unwrap();

        assert_eq!(kinds_at(&result, 20).len(), 2);
        assert_eq!(result.stats.risk_breakdown.outliers, 5_000.0);
        assert_eq!(result.stats.risk_breakdown.negatives, 0.0);
        assert_eq!(result.stats.total_at_risk, 5_000.0);
    }

    #[test]
    fn repeated_refund_is_filed_as_duplicate() {
        let result = analyze(
            &amounts_only(vec![Value::from(-100.0), Value::from(-100.0)]),
            &AnalysisConfig::new("amt"),
        )
        .unwrap();

        for row in [1, 2] {
            assert_eq!(
                kinds_at(&result, row),
                vec![AnomalyKind::NegativeAmount, AnomalyKind::DuplicateRecord]
            );
        }
        assert_eq!(result.at_risk_rows.len(), 2);
        assert!(result.at_risk_rows.iter().all(|r| r.bucket == RiskBucket::Duplicate));

        let b = result.stats.risk_breakdown;
        assert_eq!(b.duplicates, 200.0);
        assert_eq!(b.negatives, 0.0);
        assert_eq!(b.outliers, 0.0);
        assert_eq!(result.stats.total_at_risk, 200.0);
    }

    #[test]
    fn negative_original_of_reused_invoice_is_filed_as_duplicate() {
        let ds = Dataset::from_records(
            &["amt", "inv"],
            vec![
                vec![Value::from(-40.0), Value::from("INV-7001")],
                vec![Value::from(250.0), Value::from("INV-7001")],
                vec![Value::from(-15.0), Value::from("INV-7002")],
            ],
        );
        let mut config = AnalysisConfig::new("amt");
        config.invoice_column = Some("inv".into());
        let result = analyze(&ds, &config).unwrap();

        let bucket_of = |row: usize| {
            result
                .at_risk_rows
                .iter()
                .find(|r| r.row_index == row)
                .map(|r| (r.amount, r.bucket))
        };
        assert_eq!(bucket_of(1), Some((40.0, RiskBucket::Duplicate)));
        assert_eq!(bucket_of(2), Some((250.0, RiskBucket::Duplicate)));
        assert_eq!(bucket_of(3), Some((15.0, RiskBucket::Negative)));

        let b = result.stats.risk_breakdown;
        assert_eq!(b.duplicates, 290.0);
        assert_eq!(b.negatives, 15.0);
    }

    #[test]
    fn forecast_uses_exact_timestamp_span() {
        let ds = Dataset::from_records(
            &["amt", "date"],
            vec![
                vec![Value::from(-10.0), Value::from("2024-01-01 00:00:00")],
                vec![Value::from(-20.0), Value::from("2024-01-02 06:00:00")],
            ],
        );
        let mut config = AnalysisConfig::new("amt");
        config.date_column = Some("date".into());
        let result = analyze(&ds, &config).unwrap();

        // one calendar day apart in the series, but 1.25 days between rows
        assert_eq!(result.time_series_data.len(), 2);
        assert_eq!(result.stats.total_at_risk, 30.0);
        assert_eq!(result.stats.forecast_loss, 30.0 / 1.25 * 365.0);
    }

    #[test]
    fn optional_analyses_follow_config() {
        let ds = Dataset::from_records(
            &["amt", "vendor", "employee", "date"],
            vec![
                vec![
                    Value::from(120.0),
                    Value::from("Acme"),
                    Value::from("ann"),
                    Value::from("2024-01-01 09:00:00"),
                ],
                vec![
                    Value::from(80.0),
                    Value::from("Globex"),
                    Value::from("ann"),
                    Value::from("2024-01-03 14:00:00"),
                ],
                vec![Value::from(60.0), Value::Absent, Value::from("bo"), Value::from("garbage")],
            ],
        );

        let bare = analyze(&ds, &AnalysisConfig::new("amt")).unwrap();
        assert!(bare.entity_data.is_empty());
        assert!(bare.pareto_data.is_empty());
        assert!(bare.graph_data.links.is_empty());
        assert!(bare.time_series_data.is_empty());
        assert!(bare.heatmap_data.is_empty());

        let config = AnalysisConfig {
            amount_column: "amt".into(),
            date_column: Some("date".into()),
            category_column: Some("vendor".into()),
            source_column: Some("employee".into()),
            invoice_column: None,
        };
        let full = analyze(&ds, &config).unwrap();
        let ids: Vec<&str> = full.entity_data.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["Acme", "Globex", "Unknown"]);
        assert_eq!(full.pareto_data[0].name, "Acme");
        assert_eq!(full.graph_data.links.len(), 3);
        assert!(full
            .graph_data
            .nodes
            .iter()
            .any(|n| n.id == "ann" && n.kind == NodeKind::Source && n.value == 200.0));
        // The unparseable date only drops out of the temporal view.
        assert_eq!(full.time_series_data.len(), 2);
        assert_eq!(full.stats.valid_rows, 3);
        assert_eq!(full.heatmap_data.len(), 7 * 24);
    }

    #[test]
    fn forecast_uses_date_span() {
        let ds = Dataset::from_records(
            &["amt", "date"],
            vec![
                vec![Value::from(-73.0), Value::from("2024-01-01")],
                vec![Value::from(10.0), Value::from("2024-01-11")],
            ],
        );
        let mut config = AnalysisConfig::new("amt");
        config.date_column = Some("date".into());
        let result = analyze(&ds, &config).unwrap();
        assert_eq!(result.stats.total_at_risk, 73.0);
        assert!((result.stats.forecast_loss - 73.0 / 10.0 * 365.0).abs() < 1e-9);

        let undated = analyze(&ds, &AnalysisConfig::new("amt")).unwrap();
        assert_eq!(undated.stats.forecast_loss, 73.0 * 12.0);
    }

    #[test]
    fn unknown_column_is_rejected() {
        let ds = amounts_only(vec![Value::from(1.0)]);
        let mut config = AnalysisConfig::new("amt");
        config.date_column = Some("when".into());
        let err = analyze(&ds, &config).unwrap_err();
        assert_eq!(
            err,
            ScanError::MissingColumn {
                role: "date".into(),
                column: "when".into()
            }
        );
    }

    #[test]
    fn empty_dataset() {
        let ds = Dataset::new(vec!["amt".into()], vec![]);
        let result = analyze(&ds, &AnalysisConfig::new("amt")).unwrap();
        assert_eq!(result.stats.valid_rows, 0);
        assert_eq!(result.stats.average_amount, 0.0);
        assert!(result.stats.iqr.is_none());
        assert!(result.anomalies.is_empty());
        assert_eq!(result.conformity, Conformity::Nonconformity);
        assert!(result.chart_data.iter().all(|p| p.actual == 0.0));
        assert_eq!(result.risk_score, 35);
        assert_eq!(result.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn top_anomalies_rank_by_absolute_amount() {
        let ds = amounts_only(
            [-10.0, -300.0, -20.0, -4000.0, -50.0, -60.0, -1.0]
                .map(Value::from)
                .to_vec(),
        );
        let result = analyze(&ds, &AnalysisConfig::new("amt")).unwrap();
        let rows: Vec<usize> = result.top_anomalies.iter().map(|a| a.row_index).collect();
        // Row 4 is both negative and an outlier, so it appears twice.
        assert_eq!(rows, vec![4, 4, 2, 6, 5]);
    }
}
