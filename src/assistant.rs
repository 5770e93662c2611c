//! Data assistant orchestration
//!
//! Ties the pieces together: a question comes in, the NL->SQL delegate (when
//! configured) proposes SQL, a plan or a chart request, the guard and runner
//! execute it, and the presentation layer decides between a chart and a
//! plain-text answer. Without delegates the assistant still works, planning
//! locally from inferred column roles. Delegate failures degrade rather than
//! abort: the local plan is the floor, never an error page.

use crate::chart_spec::{ChartSpec, ChartSqlSynthesizer, ChartType};
use crate::delegates::{AnalysisDelegate, ExtraParams, NlSqlDelegate, NlSqlOutcome};
use crate::error::Result;
use crate::execution::result::Record;
use crate::execution::runner::{QueryRunner, DEFAULT_QUERY_LIMIT};
use crate::execution::store::DuckStore;
use crate::plan_compiler::{build_sql_from_plan, Intent, Plan};
use crate::presentation::{auto_fix_chart_spec, format_text_response};
use crate::quoting::normalize_dataset_name;
use crate::schema_probe::SchemaProber;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Question keywords that steer the local fallback toward a time series.
const TREND_HINTS: &[&str] = &["évolution", "evolution", "temps", "mois", "jour", "semaine", "trend", "tendance"];

#[derive(Debug, Clone, Default)]
pub struct AskOptions {
    /// Forces the local fallback intent instead of inferring one.
    pub intent: Option<Intent>,
    /// Row cap for the answer; the hard ceiling still applies when absent.
    pub limit: Option<usize>,
    /// Passthrough fields forwarded to the NL->SQL delegate.
    pub extra: ExtraParams,
}

/// Complete answer to one question.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub rows: Vec<Record>,
    pub sql: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_spec: Option<ChartSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
    pub schema: String,
}

pub struct DataAssistant {
    runner: QueryRunner,
    prober: Arc<SchemaProber>,
    synthesizer: ChartSqlSynthesizer,
    nl_sql: Option<Arc<dyn NlSqlDelegate>>,
    analysis: Option<Arc<dyn AnalysisDelegate>>,
}

impl DataAssistant {
    pub fn new(store: Arc<DuckStore>) -> Self {
        let prober = Arc::new(SchemaProber::new(store.clone()));
        Self {
            runner: QueryRunner::new(store),
            synthesizer: ChartSqlSynthesizer::new(prober.clone()),
            prober,
            nl_sql: None,
            analysis: None,
        }
    }

    pub fn with_nl_sql_delegate(mut self, delegate: Arc<dyn NlSqlDelegate>) -> Self {
        self.nl_sql = Some(delegate);
        self
    }

    pub fn with_analysis_delegate(mut self, delegate: Arc<dyn AnalysisDelegate>) -> Self {
        self.analysis = Some(delegate);
        self
    }

    /// Plans from inferred roles when no delegate answer is usable.
    fn local_plan(&self, question: &str, dataset: &str, opts: &AskOptions) -> Result<Plan> {
        let roles = self.prober.infer_columns(dataset)?;
        let q = question.to_lowercase();

        let intent = opts.intent.unwrap_or_else(|| {
            if roles.date.is_some() && TREND_HINTS.iter().any(|k| q.contains(k)) {
                Intent::TimeseriesTotal
            } else if roles.categorical.is_some() {
                Intent::TopTotal
            } else {
                Intent::Preview
            }
        });

        Ok(Plan {
            intent: Some(intent),
            dataset: Some(dataset.to_string()),
            date_col: roles.date,
            amount_col: roles.numeric,
            category_col: roles.categorical,
            limit: opts.limit.map(|l| l as u32),
            ..Default::default()
        })
    }

    /// Answers a natural-language question over one dataset.
    pub async fn ask(&self, question: &str, dataset: &str, opts: &AskOptions) -> Result<Answer> {
        let dataset = normalize_dataset_name(dataset);
        let schema = self.prober.schema_context(&dataset)?;

        let mut delegate_spec: Option<ChartSpec> = None;
        let mut summary: Option<String> = None;

        let sql = match &self.nl_sql {
            Some(delegate) => match delegate
                .translate(question, &dataset, &schema, &opts.extra)
                .await
            {
                Ok(reply) => {
                    delegate_spec = reply.chart_spec.clone();
                    summary = reply.summary.clone();
                    match reply.outcome {
                        NlSqlOutcome::Sql(sql) => sql,
                        NlSqlOutcome::Plan(mut plan) => {
                            if plan.dataset.is_none() {
                                plan.dataset = Some(dataset.clone());
                            }
                            build_sql_from_plan(&plan)?
                        }
                        NlSqlOutcome::ChartOnly => {
                            let spec = delegate_spec.clone().unwrap_or_default();
                            match self.synthesizer.synthesize(&dataset, &spec)? {
                                (Some(sql), norm) => {
                                    delegate_spec = Some(norm);
                                    sql
                                }
                                (None, norm) => {
                                    delegate_spec = Some(norm);
                                    build_sql_from_plan(&self.local_plan(question, &dataset, opts)?)?
                                }
                            }
                        }
                        NlSqlOutcome::Code(_) => {
                            warn!("Delegate answered with analysis code; planning locally");
                            build_sql_from_plan(&self.local_plan(question, &dataset, opts)?)?
                        }
                    }
                }
                Err(e) => {
                    warn!("NL->SQL delegate failed ({}); planning locally", e);
                    build_sql_from_plan(&self.local_plan(question, &dataset, opts)?)?
                }
            },
            None => build_sql_from_plan(&self.local_plan(question, &dataset, opts)?)?,
        };

        let rows = self
            .runner
            .run_sql_safe(&sql, Some(opts.limit.unwrap_or(DEFAULT_QUERY_LIMIT)), None)?;
        info!("Answered '{}' with {} rows", question, rows.len());

        let spec = delegate_spec.unwrap_or_else(|| ChartSpec::of_type(ChartType::Table));
        let chart_spec = auto_fix_chart_spec(question, &spec, &rows);
        let text_response = match chart_spec {
            Some(_) => None,
            None => Some(format_text_response(question, &rows)),
        };

        let analysis = match &self.analysis {
            Some(delegate) if !rows.is_empty() => {
                match delegate.analyze(question, &rows, chart_spec.as_ref()).await {
                    Ok(text) => Some(text),
                    Err(e) => {
                        warn!("Analysis delegate failed ({}); answering without it", e);
                        None
                    }
                }
            }
            _ => None,
        };

        Ok(Answer {
            rows,
            sql,
            chart_spec,
            text_response,
            summary,
            analysis,
            schema,
        })
    }
}
