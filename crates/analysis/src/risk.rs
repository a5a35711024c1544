use std::collections::BTreeMap;

use crate::model::{Anomaly, AnomalyKind, AtRiskRow, Conformity, RiskBreakdown, RiskBucket, RiskLevel};

/// Score ceiling.
pub const MAX_RISK_SCORE: u32 = 100;

/// Annualization factor when the data carries no usable dates.
pub const MONTHS_PER_YEAR: f64 = 12.0;

/// Counts the composite score is computed from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskSignals {
    pub conformity: Conformity,
    pub conformity_two_digit: Conformity,
    pub valid_rows: usize,
    pub outlier_count: usize,
    pub duplicate_count: usize,
    pub round_number_count: usize,
}

fn rate(count: usize, valid_rows: usize) -> f64 {
    if valid_rows == 0 {
        0.0
    } else {
        count as f64 / valid_rows as f64
    }
}

/// Additive score from Benford conformity, outlier, duplicate and round-number
/// rates, capped at 100.
pub fn risk_score(signals: &RiskSignals) -> u32 {
    let mut score = 0u32;

    match signals.conformity {
        Conformity::Nonconformity => score += 25,
        Conformity::MarginallyAcceptable => score += 15,
        Conformity::Close | Conformity::Acceptable => {}
    }
    if signals.conformity_two_digit == Conformity::Nonconformity {
        score += 10;
    }

    let outlier_rate = rate(signals.outlier_count, signals.valid_rows);
    if outlier_rate > 0.05 {
        score += 25;
    } else if outlier_rate > 0.01 {
        score += 15;
    } else if outlier_rate > 0.0 {
        score += 5;
    }

    let duplicate_rate = rate(signals.duplicate_count, signals.valid_rows);
    if duplicate_rate > 0.05 {
        score += 20;
    } else if duplicate_rate > 0.0 {
        score += 10;
    }

    let round_rate = rate(signals.round_number_count, signals.valid_rows);
    if round_rate > 0.10 {
        score += 20;
    } else if round_rate > 0.05 {
        score += 10;
    }

    score.min(MAX_RISK_SCORE)
}

pub fn risk_level(score: u32) -> RiskLevel {
    match score {
        75.. => RiskLevel::Critical,
        50..=74 => RiskLevel::High,
        25..=49 => RiskLevel::Medium,
        _ => RiskLevel::Low,
    }
}

/// Nonzero multiple of 1000.
pub fn is_round_number(amount: f64) -> bool {
    amount != 0.0 && amount % 1000.0 == 0.0
}

/// Bucket an anomaly kind counts toward. Missing values carry no money.
pub fn bucket_for(kind: AnomalyKind) -> Option<RiskBucket> {
    match kind {
        AnomalyKind::StatisticalOutlier => Some(RiskBucket::Outlier),
        AnomalyKind::DuplicateRecord | AnomalyKind::DuplicateInvoiceId => {
            Some(RiskBucket::Duplicate)
        }
        AnomalyKind::NegativeAmount => Some(RiskBucket::Negative),
        AnomalyKind::MissingValue => None,
    }
}

/// Money at risk, at most one amount per row.
///
/// A row charged more than once keeps the charge from the highest-precedence
/// bucket (outlier > duplicate > negative); equal precedence overwrites.
/// Once every anomaly is known, [`RiskMap::assign_buckets`] files each row
/// under the highest-precedence kind it carries.
#[derive(Debug, Clone, Default)]
pub struct RiskMap {
    rows: BTreeMap<usize, (f64, RiskBucket)>,
}

impl RiskMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn charge(&mut self, row_index: usize, amount: f64, bucket: RiskBucket) {
        match self.rows.get(&row_index) {
            Some((_, existing)) if *existing > bucket => {}
            _ => {
                self.rows.insert(row_index, (amount, bucket));
            }
        }
    }

    /// Re-file every charged row under the highest-precedence bucket among
    /// its anomalies. Amounts are left as charged.
    pub fn assign_buckets(&mut self, anomalies: &[Anomaly]) {
        for anomaly in anomalies {
            let Some(bucket) = bucket_for(anomaly.kind) else {
                continue;
            };
            if let Some((_, current)) = self.rows.get_mut(&anomaly.row_index) {
                if bucket > *current {
                    *current = bucket;
                }
            }
        }
    }

    pub fn get(&self, row_index: usize) -> Option<(f64, RiskBucket)> {
        self.rows.get(&row_index).copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.rows.values().map(|(amount, _)| amount).sum()
    }

    pub fn breakdown(&self) -> RiskBreakdown {
        let mut breakdown = RiskBreakdown::default();
        for (amount, bucket) in self.rows.values() {
            match bucket {
                RiskBucket::Outlier => breakdown.outliers += amount,
                RiskBucket::Duplicate => breakdown.duplicates += amount,
                RiskBucket::Negative => breakdown.negatives += amount,
            }
        }
        breakdown
    }

    pub fn rows(&self) -> Vec<AtRiskRow> {
        self.rows
            .iter()
            .map(|(row_index, (amount, bucket))| AtRiskRow {
                row_index: *row_index,
                amount: *amount,
                bucket: *bucket,
            })
            .collect()
    }
}

/// Annualized loss. `span_days` is the date range covered by temporal data,
/// `None` when no dates were usable.
pub fn forecast_loss(total_at_risk: f64, span_days: Option<f64>) -> f64 {
    match span_days {
        Some(span) if span > 1.0 => total_at_risk / span * 365.0,
        Some(_) => total_at_risk,
        None => total_at_risk * MONTHS_PER_YEAR,
    }
}
