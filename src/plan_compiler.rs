//! Plan Compiler - deterministic SQL generation from a structured intent
//!
//! A plan is the pre-SQL description of an aggregation query, produced either
//! by the NL->SQL delegate or synthesized locally from inferred column roles.
//! Compilation is dataset-agnostic: every interpolated identifier passes
//! through quoting, and the resulting SQL still has to clear the guard before
//! execution - the compiler gets no special trust.

use crate::error::{InsightError, Result};
use crate::quoting::quote_identifier;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PLAN_LIMIT: u32 = 100;

/// Supported aggregation intents. Anything the delegate emits that we do not
/// recognize deserializes to `Preview` and compiles to an unfiltered preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    TimeseriesTotal,
    TopTotal,
    TopGrowth,
    AnomalyZscore,
    #[serde(other)]
    Preview,
}

/// Structured descriptor of an aggregation query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub intent: Option<Intent>,
    #[serde(default)]
    pub dataset: Option<String>,
    #[serde(default)]
    pub date_col: Option<String>,
    #[serde(default)]
    pub amount_col: Option<String>,
    #[serde(default)]
    pub category_col: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

impl Plan {
    pub fn preview(dataset: impl Into<String>, limit: u32) -> Self {
        Plan {
            intent: Some(Intent::Preview),
            dataset: Some(dataset.into()),
            limit: Some(limit),
            ..Default::default()
        }
    }
}

/// Compiles a plan into executable SQL.
///
/// Fails with `InvalidPlan` when `dataset` is missing, or when the intent is
/// `top_growth` without a `year`. The aggregation expression is
/// `SUM(amount_col)` when an amount column is given, `COUNT(*)` otherwise.
pub fn build_sql_from_plan(plan: &Plan) -> Result<String> {
    let dataset = plan
        .dataset
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .ok_or_else(|| InsightError::InvalidPlan("'dataset' is required".to_string()))?;

    let table = quote_identifier(dataset)?;
    let date_col = quote_identifier(plan.date_col.as_deref().unwrap_or("date"))?;
    let category_col = quote_identifier(plan.category_col.as_deref().unwrap_or("category"))?;
    let amount_col = plan
        .amount_col
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(quote_identifier)
        .transpose()?;
    let limit = plan.limit.unwrap_or(DEFAULT_PLAN_LIMIT);

    let agg = match &amount_col {
        Some(col) => format!("SUM({})", col),
        None => "COUNT(*)".to_string(),
    };

    let sql = match plan.intent {
        Some(Intent::TimeseriesTotal) => format!(
            "SELECT date_trunc('day', {date_col}) AS ts, {agg} AS total\n\
             FROM {table}\n\
             GROUP BY 1\n\
             ORDER BY 1\n\
             LIMIT {limit};"
        ),
        Some(Intent::TopTotal) => format!(
            "SELECT {category_col} AS category, {agg} AS total\n\
             FROM {table}\n\
             GROUP BY 1\n\
             ORDER BY total DESC\n\
             LIMIT {limit};"
        ),
        Some(Intent::TopGrowth) => {
            let year = plan.year.ok_or_else(|| {
                InsightError::InvalidPlan("'year' is required for top_growth".to_string())
            })?;
            let prev = year - 1;
            // Without an amount column, growth is computed over row counts.
            let val = amount_col.as_deref().unwrap_or("1");
            // Nested SELECT rather than a CTE: the guard only accepts
            // statements that start with SELECT.
            format!(
                "SELECT category,\n\
                 \x20      total_prev,\n\
                 \x20      total_curr,\n\
                 \x20      CASE WHEN total_prev = 0 THEN NULL ELSE (total_curr - total_prev) * 1.0 / total_prev END AS growth_ratio\n\
                 FROM (\n\
                 \x20 SELECT {category_col} AS category,\n\
                 \x20        SUM(CASE WHEN EXTRACT(YEAR FROM {date_col}) = {prev} THEN {val} ELSE 0 END) AS total_prev,\n\
                 \x20        SUM(CASE WHEN EXTRACT(YEAR FROM {date_col}) = {year} THEN {val} ELSE 0 END) AS total_curr\n\
                 \x20 FROM {table}\n\
                 \x20 GROUP BY 1\n\
                 ) agg\n\
                 ORDER BY growth_ratio DESC NULLS LAST\n\
                 LIMIT {limit};"
            )
        }
        Some(Intent::AnomalyZscore) => {
            // No amount column -> z-score over per-timestamp row counts.
            // Population mean/stddev over the whole series via window
            // aggregates, so the statement stays a single guard-clean SELECT.
            let val = amount_col.as_deref().unwrap_or("1");
            format!(
                "SELECT ts, val,\n\
                 \x20      CASE WHEN STDDEV_POP(val) OVER () IS NULL OR STDDEV_POP(val) OVER () = 0 THEN 0\n\
                 \x20           ELSE (val - AVG(val) OVER ()) / STDDEV_POP(val) OVER () END AS zscore\n\
                 FROM (\n\
                 \x20 SELECT CAST({date_col} AS TIMESTAMP) AS ts, CAST(SUM({val}) AS DOUBLE) AS val\n\
                 \x20 FROM {table}\n\
                 \x20 GROUP BY 1\n\
                 ) s\n\
                 ORDER BY ts\n\
                 LIMIT {limit};"
            )
        }
        // Unrecognized or absent intent: unfiltered preview.
        _ => format!("SELECT * FROM {table} LIMIT {limit};"),
    };

    Ok(sql)
}
