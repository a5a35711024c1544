//! Summary handed to an external report writer, and the fallback when that
//! writer cannot be reached.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{AnalysisResult, Anomaly, AnomalyKind, Conformity, RiskLevel};

/// Returned by [`narrate`] whenever the provider fails.
pub const PLACEHOLDER_NARRATIVE: &str =
    "Narrative report unavailable. Review the risk score, anomaly counts and Benford results directly.";

#[derive(Debug, Clone, Serialize)]
pub struct NarrativeAnomaly {
    pub row_index: usize,
    #[serde(rename = "type")]
    pub kind: AnomalyKind,
    pub column: String,
    pub value: String,
    pub amount: Option<f64>,
}

impl From<&Anomaly> for NarrativeAnomaly {
    fn from(a: &Anomaly) -> Self {
        Self {
            row_index: a.row_index,
            kind: a.kind,
            column: a.column.clone(),
            value: a.value.display(),
            amount: a.amount,
        }
    }
}

/// Everything the report writer sees. Row contents beyond the top anomalies
/// are never included.
#[derive(Debug, Clone, Serialize)]
pub struct NarrativeSummary {
    pub columns: BTreeMap<String, String>,
    pub total_rows: usize,
    pub valid_rows: usize,
    pub anomaly_counts: BTreeMap<String, usize>,
    pub mad: f64,
    pub mad_2_digit: f64,
    pub conformity: Conformity,
    pub conformity_2_digit: Conformity,
    pub risk_score: u32,
    pub risk_level: RiskLevel,
    pub total_at_risk: f64,
    pub forecast_loss: f64,
    pub top_anomalies: Vec<NarrativeAnomaly>,
}

impl NarrativeSummary {
    pub fn from_result(result: &AnalysisResult) -> Self {
        let columns = result
            .meta
            .config
            .roles()
            .into_iter()
            .map(|(role, column)| (role.to_string(), column.to_string()))
            .collect();
        let anomaly_counts = AnomalyKind::ALL
            .iter()
            .map(|kind| (kind.as_str().to_string(), result.count_of(*kind)))
            .collect();

        Self {
            columns,
            total_rows: result.stats.total_rows,
            valid_rows: result.stats.valid_rows,
            anomaly_counts,
            mad: result.mad,
            mad_2_digit: result.mad_2_digit,
            conformity: result.conformity,
            conformity_2_digit: result.conformity_2_digit,
            risk_score: result.risk_score,
            risk_level: result.risk_level,
            total_at_risk: result.stats.total_at_risk,
            forecast_loss: result.stats.forecast_loss,
            top_anomalies: result.top_anomalies.iter().map(NarrativeAnomaly::from).collect(),
        }
    }
}

/// Something that turns a summary into prose.
pub trait NarrativeProvider {
    fn generate(&self, summary: &NarrativeSummary) -> Result<String, String>;
}

/// Provider text, or [`PLACEHOLDER_NARRATIVE`] on failure or empty output.
pub fn narrate(provider: &dyn NarrativeProvider, summary: &NarrativeSummary) -> String {
    match provider.generate(summary) {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => {
            log::warn!("narrative provider returned no text");
            PLACEHOLDER_NARRATIVE.to_string()
        }
        Err(e) => {
            log::warn!("narrative provider failed: {e}");
            PLACEHOLDER_NARRATIVE.to_string()
        }
    }
}
