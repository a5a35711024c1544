//! Narrative report client.
//!
//! POSTs `{"summary": …}` to a report endpoint and expects either a JSON
//! object with a `narrative` string or a plain-text body. Failures are
//! returned as `Err` so the engine's `narrate` can fall back to the
//! placeholder text.

use std::time::Duration;

use ledgerscan_analysis::{NarrativeProvider, NarrativeSummary};

const TIMEOUT_SECS: u64 = 30;
const USER_AGENT: &str = concat!("ledgerscan/", env!("CARGO_PKG_VERSION"));

pub struct HttpNarrator {
    endpoint: String,
    http: reqwest::blocking::Client,
}

impl HttpNarrator {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, String> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        Ok(Self { endpoint: endpoint.into(), http })
    }
}

impl NarrativeProvider for HttpNarrator {
    fn generate(&self, summary: &NarrativeSummary) -> Result<String, String> {
        let body = serde_json::json!({ "summary": summary });
        log::debug!("requesting narrative from {}", self.endpoint);

        let resp = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .map_err(|e| format!("request to {} failed: {e}", self.endpoint))?;

        let status = resp.status();
        let text = resp
            .text()
            .map_err(|e| format!("failed to read response: {e}"))?;
        if !status.is_success() {
            return Err(format!("endpoint returned HTTP {}", status.as_u16()));
        }

        Ok(extract_narrative(&text))
    }
}

fn extract_narrative(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(obj)) => obj
            .get("narrative")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        Ok(serde_json::Value::String(s)) => s,
        _ => body.to_string(),
    }
}
