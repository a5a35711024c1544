use serde::{Deserialize, Serialize};

use crate::error::ScanError;

// ---------------------------------------------------------------------------
// Column roles
// ---------------------------------------------------------------------------

/// Which column plays which role. Only `amount` is required; every optional
/// role enables the analyses that depend on it (temporal, clustering, flow).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(rename = "amount")]
    pub amount_column: String,
    #[serde(rename = "date", default, skip_serializing_if = "Option::is_none")]
    pub date_column: Option<String>,
    #[serde(rename = "category", default, skip_serializing_if = "Option::is_none")]
    pub category_column: Option<String>,
    #[serde(rename = "source", default, skip_serializing_if = "Option::is_none")]
    pub source_column: Option<String>,
    #[serde(rename = "invoice", default, skip_serializing_if = "Option::is_none")]
    pub invoice_column: Option<String>,
}

impl AnalysisConfig {
    pub fn new(amount_column: impl Into<String>) -> Self {
        Self {
            amount_column: amount_column.into(),
            date_column: None,
            category_column: None,
            source_column: None,
            invoice_column: None,
        }
    }

    /// (role, column) for every configured role, amount first.
    pub fn roles(&self) -> Vec<(&'static str, &str)> {
        let mut roles = vec![("amount", self.amount_column.as_str())];
        let optional = [
            ("date", &self.date_column),
            ("category", &self.category_column),
            ("source", &self.source_column),
            ("invoice", &self.invoice_column),
        ];
        for (role, column) in optional {
            if let Some(c) = column {
                roles.push((role, c.as_str()));
            }
        }
        roles
    }

    /// Every named column must exist in the dataset's headers.
    pub fn validate(&self, headers: &[String]) -> Result<(), ScanError> {
        for (role, column) in self.roles() {
            if column.trim().is_empty() {
                return Err(ScanError::ConfigValidation(format!(
                    "{role} column name is empty"
                )));
            }
            if !headers.iter().any(|h| h == column) {
                return Err(ScanError::MissingColumn {
                    role: role.into(),
                    column: column.into(),
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Scan file (TOML)
// ---------------------------------------------------------------------------

/// A saved scan definition:
///
/// ```toml
/// name = "Q3 expenses"
/// [columns]
/// amount = "Amount"
/// date = "Posted"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    #[serde(default)]
    pub name: Option<String>,
    pub columns: AnalysisConfig,
}

impl ScanConfig {
    pub fn from_toml(input: &str) -> Result<Self, ScanError> {
        let config: ScanConfig =
            toml::from_str(input).map_err(|e| ScanError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Shape checks that don't need the data.
    pub fn validate(&self) -> Result<(), ScanError> {
        for (role, column) in self.columns.roles() {
            if column.trim().is_empty() {
                return Err(ScanError::ConfigValidation(format!(
                    "{role} column name is empty"
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
