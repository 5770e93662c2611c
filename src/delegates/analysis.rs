//! HTTP implementation of the result-analysis delegate.
//!
//! Sends the question, a bounded slice of the result rows and the chart spec
//! to an external webhook and gets back a prose narrative. Replies carry a
//! `summary`, a longer `text`, or both; the summary sometimes arrives
//! JSON-encoded inside itself and that extra layer is unwrapped here.

use crate::chart_spec::ChartSpec;
use crate::delegates::{unwrap_payload, AnalysisDelegate, DelegateConfig};
use crate::error::{InsightError, Result};
use crate::execution::result::Record;
use async_trait::async_trait;
use serde_json::json;
use tracing::info;

/// Rows beyond this are dropped from the payload to keep requests small.
pub const MAX_ANALYSIS_ROWS: usize = 200;

pub struct HttpAnalysisDelegate {
    client: reqwest::Client,
    config: DelegateConfig,
}

impl HttpAnalysisDelegate {
    pub fn new(config: DelegateConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()
            .map_err(|e| InsightError::DelegateUnavailable(e.to_string()))?;
        Ok(Self { client, config })
    }
}

fn build_payload(
    question: &str,
    rows: &[Record],
    chart_spec: Option<&ChartSpec>,
) -> serde_json::Value {
    let capped = &rows[..rows.len().min(MAX_ANALYSIS_ROWS)];
    json!({
        "question": question,
        "rows": capped,
        "chart_spec": chart_spec,
    })
}

fn non_empty_field(value: &serde_json::Value, key: &str) -> Option<String> {
    value
        .get(key)?
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Extracts the narrative: `summary` falling back to `text`, with `text`
/// appended when it says something the summary does not. A nested JSON
/// encoding of the summary is unwrapped first.
fn extract_narrative(value: serde_json::Value) -> Option<String> {
    let value = unwrap_payload(value);

    let summary = non_empty_field(&value, "summary").map(|s| {
        if let Ok(inner) = serde_json::from_str::<serde_json::Value>(&s) {
            if let Some(nested) = non_empty_field(&inner, "summary") {
                return nested;
            }
        }
        s
    });
    let text = non_empty_field(&value, "text");

    match (summary, text) {
        (Some(s), Some(t)) if s != t => Some(format!("{s}\n\n{t}")),
        (Some(s), _) => Some(s),
        (None, Some(t)) => Some(t),
        (None, None) => None,
    }
}

#[async_trait]
impl AnalysisDelegate for HttpAnalysisDelegate {
    async fn analyze(
        &self,
        question: &str,
        rows: &[Record],
        chart_spec: Option<&ChartSpec>,
    ) -> Result<String> {
        let body = build_payload(question, rows, chart_spec);

        let mut request = self.client.post(&self.config.url).json(&body);
        if let Some((user, pass)) = &self.config.basic_auth {
            request = request.basic_auth(user, Some(pass));
        }

        info!(
            "Calling analysis delegate ({} of {} rows sent)",
            rows.len().min(MAX_ANALYSIS_ROWS),
            rows.len()
        );
        let response = request
            .send()
            .await
            .map_err(|e| InsightError::DelegateUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(InsightError::DelegateUnavailable(format!(
                "delegate returned HTTP {status}"
            )));
        }

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| InsightError::DelegateInvalidResponse(e.to_string()))?;

        extract_narrative(value).ok_or_else(|| {
            InsightError::DelegateInvalidResponse("reply carries neither summary nor text".to_string())
        })
    }
}
