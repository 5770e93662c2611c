//! External delegates
//!
//! Question understanding and result narration are delegated to external
//! webhook services; this crate never generates SQL from free text on its
//! own. The traits keep the assistant testable with in-process fakes, and
//! the reply parser normalizes the loosely-shaped webhook payloads into one
//! sum type before any of it reaches the execution path.

pub mod analysis;
pub mod nl_sql;

use crate::chart_spec::ChartSpec;
use crate::error::{InsightError, Result};
use crate::execution::result::Record;
use crate::plan_compiler::Plan;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

pub use analysis::HttpAnalysisDelegate;
pub use nl_sql::HttpNlSqlDelegate;

/// Connection settings shared by the HTTP delegate implementations.
#[derive(Debug, Clone)]
pub struct DelegateConfig {
    pub url: String,
    pub basic_auth: Option<(String, String)>,
    pub timeout: Duration,
    pub verify_ssl: bool,
}

impl DelegateConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            basic_auth: None,
            timeout: Duration::from_secs(30),
            verify_ssl: true,
        }
    }
}

/// What the NL->SQL delegate decided to answer with.
#[derive(Debug, Clone, PartialEq)]
pub enum NlSqlOutcome {
    /// Ready-to-run SQL. Still subject to the guard.
    Sql(String),
    /// A structured plan for the local compiler.
    Plan(Plan),
    /// Arbitrary analysis code. Never executed here; the caller degrades to
    /// local planning.
    Code(String),
    /// Only a chart spec: the caller synthesizes the SQL.
    ChartOnly,
}

/// Parsed, validated delegate reply.
#[derive(Debug, Clone)]
pub struct NlSqlReply {
    pub outcome: NlSqlOutcome,
    pub chart_spec: Option<ChartSpec>,
    pub summary: Option<String>,
}

/// Caller-supplied passthrough fields forwarded to the NL->SQL webhook.
pub type ExtraParams = serde_json::Map<String, serde_json::Value>;

#[async_trait]
pub trait NlSqlDelegate: Send + Sync {
    /// Translates a question into SQL, a plan, or a chart request.
    /// `schema` is the one-line column summary for the target dataset;
    /// `extra` fields are forwarded to the webhook as-is.
    async fn translate(
        &self,
        question: &str,
        dataset: &str,
        schema: &str,
        extra: &ExtraParams,
    ) -> Result<NlSqlReply>;
}

#[async_trait]
pub trait AnalysisDelegate: Send + Sync {
    /// Produces a prose narrative for the result rows and their chart.
    async fn analyze(
        &self,
        question: &str,
        rows: &[Record],
        chart_spec: Option<&ChartSpec>,
    ) -> Result<String>;
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawNlSqlReply {
    #[serde(default)]
    sql: Option<String>,
    #[serde(default)]
    plan: Option<Plan>,
    #[serde(default, alias = "code_python")]
    code: Option<String>,
    #[serde(default)]
    chart_spec: Option<ChartSpec>,
    #[serde(default)]
    summary: Option<String>,
}

impl RawNlSqlReply {
    /// Applies the outcome precedence: code, then sql, then plan, then a
    /// bare chart spec. A reply carrying none of them is invalid.
    pub(crate) fn into_reply(self) -> Result<NlSqlReply> {
        let code = non_empty(self.code);
        let sql = non_empty(self.sql);
        let summary = non_empty(self.summary);

        let outcome = if let Some(code) = code {
            NlSqlOutcome::Code(code)
        } else if let Some(sql) = sql {
            NlSqlOutcome::Sql(sql)
        } else if let Some(plan) = self.plan {
            NlSqlOutcome::Plan(plan)
        } else if self.chart_spec.is_some() {
            NlSqlOutcome::ChartOnly
        } else {
            return Err(InsightError::DelegateInvalidResponse(
                "reply carries neither sql, plan, code nor chart_spec".to_string(),
            ));
        };

        Ok(NlSqlReply {
            outcome,
            chart_spec: self.chart_spec,
            summary,
        })
    }
}

/// Webhook payloads arrive in several wrappers: a bare object, a one-element
/// array, or an object whose `output` field holds a JSON string. This peels
/// them down to the inner object.
pub(crate) fn unwrap_payload(value: serde_json::Value) -> serde_json::Value {
    let value = match value {
        serde_json::Value::Array(mut items) if !items.is_empty() => items.remove(0),
        other => other,
    };
    if let Some(output) = value.get("output").and_then(|v| v.as_str()) {
        if let Ok(inner) = serde_json::from_str::<serde_json::Value>(output) {
            return inner;
        }
    }
    value
}
