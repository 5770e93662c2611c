//! HTTP implementation of the NL->SQL delegate.

use crate::delegates::{
    unwrap_payload, DelegateConfig, ExtraParams, NlSqlDelegate, NlSqlReply, RawNlSqlReply,
};
use crate::error::{InsightError, Result};
use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info};

pub struct HttpNlSqlDelegate {
    client: reqwest::Client,
    config: DelegateConfig,
}

impl HttpNlSqlDelegate {
    pub fn new(config: DelegateConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()
            .map_err(|e| InsightError::DelegateUnavailable(e.to_string()))?;
        Ok(Self { client, config })
    }
}

/// Request body: caller extras first, then the reserved fields, so an extra
/// can never shadow the question, dataset or schema.
fn build_request_body(
    question: &str,
    dataset: &str,
    schema: &str,
    extra: &ExtraParams,
) -> serde_json::Value {
    let mut body = extra.clone();
    body.insert("question".to_string(), json!(question));
    body.insert("dataset".to_string(), json!(dataset));
    body.insert("schema".to_string(), json!(schema));
    serde_json::Value::Object(body)
}

#[async_trait]
impl NlSqlDelegate for HttpNlSqlDelegate {
    async fn translate(
        &self,
        question: &str,
        dataset: &str,
        schema: &str,
        extra: &ExtraParams,
    ) -> Result<NlSqlReply> {
        let body = build_request_body(question, dataset, schema, extra);

        let mut request = self.client.post(&self.config.url).json(&body);
        if let Some((user, pass)) = &self.config.basic_auth {
            request = request.basic_auth(user, Some(pass));
        }

        info!("Calling NL->SQL delegate for dataset '{}'", dataset);
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
        debug!("Delegate reply: {}", value);

        let raw: RawNlSqlReply = serde_json::from_value(unwrap_payload(value))
            .map_err(|e| InsightError::DelegateInvalidResponse(e.to_string()))?;
        raw.into_reply()
    }
}
