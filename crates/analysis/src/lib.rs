//! `ledgerscan-analysis`: Fraud and data-quality screening engine.
//!
//! Pure engine crate: receives pre-loaded rows, returns a risk report.
//! No CLI or IO dependencies.

pub mod aggregate;
pub mod benford;
pub mod classify;
pub mod config;
pub mod digits;
pub mod duplicates;
pub mod engine;
pub mod error;
pub mod flow;
pub mod model;
pub mod narrative;
pub mod outliers;
pub mod risk;
pub mod select;
pub mod temporal;

pub use classify::{classify_columns, ColumnProfile};
pub use config::{AnalysisConfig, ScanConfig};
pub use engine::analyze;
pub use error::ScanError;
pub use model::{AnalysisResult, Anomaly, AnomalyKind, Dataset, RiskLevel, Row, Value};
pub use narrative::{narrate, NarrativeProvider, NarrativeSummary, PLACEHOLDER_NARRATIVE};
pub use select::auto_select;
