//! End-to-end tests over an in-memory store: CSV import, plan compilation,
//! guarded execution, and the assistant's delegate-free fallback path.

use async_trait::async_trait;
use insight_engine::assistant::{AskOptions, DataAssistant};
use insight_engine::chart_spec::ChartType;
use insight_engine::chart_spec::ChartSpec;
use insight_engine::delegates::{
    AnalysisDelegate, ExtraParams, NlSqlDelegate, NlSqlOutcome, NlSqlReply,
};
use insight_engine::execution::result::Record;
use insight_engine::error::{InsightError, Result};
use insight_engine::execution::runner::QueryRunner;
use insight_engine::execution::store::DuckStore;
use insight_engine::plan_compiler::{build_sql_from_plan, Intent, Plan};
use regex::Regex;
use std::io::Write;
use std::sync::Arc;

/// Ten days of sales across three categories. Totals per category:
/// a = 22, c = 18, b = 15.
fn seeded_store() -> Arc<DuckStore> {
    let mut file = tempfile::NamedTempFile::with_suffix(".csv").unwrap();
    writeln!(file, "date,category,amount").unwrap();
    for i in 0..10 {
        let cat = ["a", "b", "c"][i % 3];
        writeln!(file, "2024-01-{:02},{},{}.0", i + 1, cat, i + 1).unwrap();
    }
    file.flush().unwrap();

    let store = Arc::new(DuckStore::open_in_memory().unwrap());
    let report = store.load_csv(file.path(), "sales").unwrap();
    assert_eq!(report.rows, 10);
    store
}

fn plan(intent: Intent, limit: u32) -> Plan {
    Plan {
        intent: Some(intent),
        dataset: Some("sales".to_string()),
        amount_col: Some("amount".to_string()),
        limit: Some(limit),
        ..Default::default()
    }
}

#[test]
fn top_total_end_to_end() {
    let runner = QueryRunner::new(seeded_store());
    let sql = build_sql_from_plan(&plan(Intent::TopTotal, 2)).unwrap();
    let rows = runner.run_sql_safe(&sql, None, None).unwrap();

    assert_eq!(rows.len(), 2);
    for row in &rows {
        let keys: Vec<&String> = row.keys().collect();
        assert_eq!(keys, vec!["category", "total"]);
    }
    assert_eq!(rows[0]["category"], serde_json::json!("a"));
    assert_eq!(rows[0]["total"], serde_json::json!(22.0));
    assert_eq!(rows[1]["category"], serde_json::json!("c"));
}

#[test]
fn timeseries_is_ascending_and_formatted() {
    let runner = QueryRunner::new(seeded_store());
    let sql = build_sql_from_plan(&plan(Intent::TimeseriesTotal, 5)).unwrap();
    let rows = runner.run_sql_safe(&sql, None, None).unwrap();

    assert_eq!(rows.len(), 5);
    let fmt = Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}$").unwrap();
    let mut previous = String::new();
    for row in &rows {
        let ts = row["ts"].as_str().unwrap();
        assert!(fmt.is_match(ts), "unexpected timestamp rendering: {ts}");
        assert!(ts > previous.as_str());
        previous = ts.to_string();
    }
}

#[test]
fn rerunning_a_query_is_deterministic() {
    let runner = QueryRunner::new(seeded_store());
    let sql = build_sql_from_plan(&plan(Intent::TopTotal, 10)).unwrap();
    let first = runner.run_sql_safe(&sql, None, None).unwrap();
    let second = runner.run_sql_safe(&sql, None, None).unwrap();
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn mutating_sql_never_reaches_the_store() {
    let store = seeded_store();
    let runner = QueryRunner::new(store.clone());
    let err = runner
        .run_sql_safe("SELECT 1; DROP TABLE sales", None, None)
        .unwrap_err();
    assert!(matches!(err, InsightError::UnsafeQuery));
    assert_eq!(store.list_tables().unwrap(), vec!["sales"]);
}

#[tokio::test]
async fn assistant_answers_trend_questions_without_delegates() {
    let assistant = DataAssistant::new(seeded_store());
    let answer = assistant
        .ask("Montre l'évolution des ventes", "sales", &AskOptions::default())
        .await
        .unwrap();

    assert!(!answer.rows.is_empty());
    let spec = answer.chart_spec.expect("trend question deserves a chart");
    assert_eq!(spec.chart_type, Some(ChartType::Line));
    assert_eq!(spec.x.as_deref(), Some("ts"));
    assert_eq!(spec.y.as_deref(), Some("total"));
    assert!(answer.text_response.is_none());
    assert!(answer.schema.contains("amount"));
}

#[tokio::test]
async fn assistant_answers_counting_questions_in_prose() {
    let assistant = DataAssistant::new(seeded_store());
    let answer = assistant
        .ask("Combien de ventes par catégorie ?", "sales", &AskOptions::default())
        .await
        .unwrap();

    assert!(answer.chart_spec.is_none());
    let text = answer.text_response.expect("counting questions get prose");
    assert!(text.contains("3"));
}

struct FixedPlanDelegate;

#[async_trait]
impl NlSqlDelegate for FixedPlanDelegate {
    async fn translate(
        &self,
        _question: &str,
        dataset: &str,
        _schema: &str,
        _extra: &ExtraParams,
    ) -> Result<NlSqlReply> {
        Ok(NlSqlReply {
            outcome: NlSqlOutcome::Plan(Plan {
                intent: Some(Intent::TopTotal),
                dataset: Some(dataset.to_string()),
                amount_col: Some("amount".to_string()),
                limit: Some(3),
                ..Default::default()
            }),
            chart_spec: None,
            summary: Some("Ventilation par catégorie.".to_string()),
        })
    }
}

#[tokio::test]
async fn assistant_compiles_delegate_plans() {
    let assistant =
        DataAssistant::new(seeded_store()).with_nl_sql_delegate(Arc::new(FixedPlanDelegate));
    let answer = assistant
        .ask("Top des catégories", "sales", &AskOptions::default())
        .await
        .unwrap();

    assert!(answer.sql.contains("GROUP BY"));
    assert_eq!(answer.rows.len(), 3);
    assert_eq!(answer.summary.as_deref(), Some("Ventilation par catégorie."));
    let spec = answer.chart_spec.expect("top question deserves a chart");
    assert_eq!(spec.chart_type, Some(ChartType::Bar));
}

struct EchoAnalysisDelegate;

#[async_trait]
impl AnalysisDelegate for EchoAnalysisDelegate {
    async fn analyze(
        &self,
        _question: &str,
        rows: &[Record],
        chart_spec: Option<&ChartSpec>,
    ) -> Result<String> {
        let chart = chart_spec
            .and_then(|s| s.chart_type)
            .map(|t| format!("{t:?}"))
            .unwrap_or_else(|| "aucun".to_string());
        Ok(format!("{} lignes, graphique {}", rows.len(), chart))
    }
}

#[tokio::test]
async fn analysis_delegate_receives_rows_and_chart_spec() {
    let assistant =
        DataAssistant::new(seeded_store()).with_analysis_delegate(Arc::new(EchoAnalysisDelegate));
    let answer = assistant
        .ask("Top des catégories", "sales", &AskOptions::default())
        .await
        .unwrap();

    assert_eq!(answer.analysis.as_deref(), Some("3 lignes, graphique Bar"));
}
