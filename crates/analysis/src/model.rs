use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A single cell as delivered by the file parser.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Absent,
    Text(String),
    Number(f64),
}

impl Value {
    /// Stringified form, as used for digit extraction and entity keys.
    pub fn display(&self) -> String {
        match self {
            Self::Absent => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(n) => n.to_string(),
        }
    }

    /// Parse as a monetary amount. Thousands separators are ignored.
    /// Returns `None` for absent, blank, or non-numeric cells.
    pub fn as_amount(&self) -> Option<f64> {
        match self {
            Self::Absent => None,
            Self::Number(n) => n.is_finite().then_some(*n),
            Self::Text(s) => parse_number_text(s),
        }
    }

    /// Absent, or text that is empty after trimming.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Absent => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(_) => false,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Absent)
    }
}

/// Strip thousands separators and surrounding whitespace, then parse.
pub(crate) fn parse_number_text(s: &str) -> Option<f64> {
    let cleaned = s.trim().replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// One record. Keys are sorted, so serializing a row is canonical.
pub type Row = BTreeMap<String, Value>;

/// Ordered rows plus the header order of the source file.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl Dataset {
    pub fn new(headers: Vec<String>, rows: Vec<Row>) -> Self {
        Self { headers, rows }
    }

    /// Build from positional records; missing trailing cells become `Absent`.
    pub fn from_records<H: AsRef<str>>(headers: &[H], records: Vec<Vec<Value>>) -> Self {
        let headers: Vec<String> = headers.iter().map(|h| h.as_ref().to_string()).collect();
        let rows = records
            .into_iter()
            .map(|record| {
                let mut values = record.into_iter();
                headers
                    .iter()
                    .map(|h| (h.clone(), values.next().unwrap_or_default()))
                    .collect()
            })
            .collect();
        Self { headers, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Anomalies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AnomalyKind {
    #[serde(rename = "Duplicate Record")]
    DuplicateRecord,
    #[serde(rename = "Duplicate Invoice ID")]
    DuplicateInvoiceId,
    #[serde(rename = "Negative Amount")]
    NegativeAmount,
    #[serde(rename = "Missing Value")]
    MissingValue,
    #[serde(rename = "Statistical Outlier")]
    StatisticalOutlier,
}

impl AnomalyKind {
    pub const ALL: [AnomalyKind; 5] = [
        Self::DuplicateRecord,
        Self::DuplicateInvoiceId,
        Self::NegativeAmount,
        Self::MissingValue,
        Self::StatisticalOutlier,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DuplicateRecord => "Duplicate Record",
            Self::DuplicateInvoiceId => "Duplicate Invoice ID",
            Self::NegativeAmount => "Negative Amount",
            Self::MissingValue => "Missing Value",
            Self::StatisticalOutlier => "Statistical Outlier",
        }
    }
}

impl std::fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Anomaly {
    /// 1-based position of the row in the input.
    pub row_index: usize,
    #[serde(rename = "type")]
    pub kind: AnomalyKind,
    pub column: String,
    pub value: Value,
    /// The row's parsed amount, if it had one.
    pub amount: Option<f64>,
    pub row: Row,
}

// ---------------------------------------------------------------------------
// Benford
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenfordDataPoint {
    pub digit: u8,
    pub count: usize,
    pub actual: f64,
    pub expected: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Conformity {
    #[serde(rename = "Close Conformity")]
    Close,
    #[serde(rename = "Acceptable Conformity")]
    Acceptable,
    #[serde(rename = "Marginally Acceptable Conformity")]
    MarginallyAcceptable,
    #[serde(rename = "Nonconformity")]
    Nonconformity,
}

impl std::fmt::Display for Conformity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Close => write!(f, "Close Conformity"),
            Self::Acceptable => write!(f, "Acceptable Conformity"),
            Self::MarginallyAcceptable => write!(f, "Marginally Acceptable Conformity"),
            Self::Nonconformity => write!(f, "Nonconformity"),
        }
    }
}

/// Which column fed the digit extractor for this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BenfordSource {
    Amount,
    Invoice,
}

// ---------------------------------------------------------------------------
// Outliers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IqrBounds {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower: f64,
    pub upper: f64,
}

impl IqrBounds {
    /// Strictly outside the fences. Boundary values are not outliers.
    pub fn is_outlier(&self, value: f64) -> bool {
        value < self.lower || value > self.upper
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub row_index: usize,
    pub amount: f64,
    pub is_outlier: bool,
    pub z_score: f64,
}

// ---------------------------------------------------------------------------
// Entities + flow graph
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityDataPoint {
    pub id: String,
    pub count: usize,
    pub total_amount: f64,
    pub average_amount: f64,
    pub is_outlier: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParetoPoint {
    pub name: String,
    pub value: f64,
    pub cumulative_percentage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Source,
    Target,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphLink {
    pub source: String,
    pub target: String,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlowGraph {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
}

// ---------------------------------------------------------------------------
// Temporal
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesPoint {
    /// Calendar day, `YYYY-MM-DD`.
    pub date: String,
    pub amount: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapCell {
    /// 0 = Sunday.
    pub day: u8,
    pub hour: u8,
    pub count: usize,
    pub intensity: f64,
}

// ---------------------------------------------------------------------------
// Risk
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
            Self::Critical => write!(f, "Critical"),
        }
    }
}

/// Ordered by precedence: a row charged under several buckets lands in the highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskBucket {
    Negative,
    Duplicate,
    Outlier,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RiskBreakdown {
    pub outliers: f64,
    pub duplicates: f64,
    pub negatives: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AtRiskRow {
    pub row_index: usize,
    pub amount: f64,
    pub bucket: RiskBucket,
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisStats {
    pub total_rows: usize,
    pub valid_rows: usize,
    pub benford_valid_count: usize,
    pub total_amount: f64,
    pub average_amount: f64,
    pub outlier_count: usize,
    pub duplicate_count: usize,
    pub negative_count: usize,
    pub missing_count: usize,
    pub round_number_count: usize,
    pub total_at_risk: f64,
    pub forecast_loss: f64,
    pub risk_breakdown: RiskBreakdown,
    pub iqr: Option<IqrBounds>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisMeta {
    pub engine_version: String,
    pub benford_source: BenfordSource,
    pub config: AnalysisConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub meta: AnalysisMeta,
    pub stats: AnalysisStats,
    pub chart_data: Vec<BenfordDataPoint>,
    pub chart_data_2_digit: Vec<BenfordDataPoint>,
    pub mad: f64,
    pub mad_2_digit: f64,
    pub conformity: Conformity,
    pub conformity_2_digit: Conformity,
    pub anomalies: Vec<Anomaly>,
    pub top_anomalies: Vec<Anomaly>,
    pub scatter_data: Vec<ScatterPoint>,
    pub entity_data: Vec<EntityDataPoint>,
    pub pareto_data: Vec<ParetoPoint>,
    pub graph_data: FlowGraph,
    pub time_series_data: Vec<TimeSeriesPoint>,
    pub heatmap_data: Vec<HeatmapCell>,
    pub risk_score: u32,
    pub risk_level: RiskLevel,
    pub at_risk_rows: Vec<AtRiskRow>,
}

impl AnalysisResult {
    pub fn count_of(&self, kind: AnomalyKind) -> usize {
        self.anomalies.iter().filter(|a| a.kind == kind).count()
    }
}
