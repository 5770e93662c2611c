//! Chart specs and the Chart-Spec Synthesizer
//!
//! A `ChartSpec` describes the visualization a caller (usually the NL->SQL
//! delegate) wants. The synthesizer turns a chart type plus inferred column
//! roles into the exact SQL that produces the rows such a chart needs, and
//! fills in the spec's missing fields from the data itself. When the
//! required roles cannot be resolved it returns no SQL and the caller falls
//! back to a generic plan.

use crate::error::Result;
use crate::quoting::quote_identifier;
use crate::schema_probe::{ColumnRoles, SchemaProber};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DEFAULT_HISTOGRAM_BINS: u32 = 20;
pub const TABLE_PREVIEW_LIMIT: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartType {
    Bar,
    BarHorizontal,
    Line,
    Timeseries,
    Pie,
    Histogram,
    Table,
    Scatter,
    Area,
    Funnel,
    RadialBar,
    Treemap,
    Radar,
    StackedBar,
    #[serde(other)]
    Custom,
}

/// Desired visualization shape and the columns feeding it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub chart_type: Option<ChartType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bins: Option<u32>,
    /// Residual SQL the delegate may have attached; only inspected, never
    /// executed from here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
}

impl ChartSpec {
    pub fn of_type(chart_type: ChartType) -> Self {
        ChartSpec {
            chart_type: Some(chart_type),
            ..Default::default()
        }
    }

    /// True when the spec explicitly asks for a concrete chart (not a table).
    pub fn is_concrete_chart(&self) -> bool {
        matches!(self.chart_type, Some(t) if t != ChartType::Table)
    }
}

/// Builds chart-type-specific SQL from a spec and inferred roles.
/// Pure: probing is the caller's job.
pub fn build_chart_sql(
    dataset: &str,
    spec: &ChartSpec,
    roles: &ColumnRoles,
) -> Result<(Option<String>, ChartSpec)> {
    let mut norm = spec.clone();
    let table = quote_identifier(dataset)?;

    match spec.chart_type {
        Some(ChartType::Histogram) => {
            let x = match spec.x.clone().or_else(|| roles.numeric.clone()) {
                Some(x) => x,
                None => return Ok((None, norm)),
            };
            let xq = quote_identifier(&x)?;
            norm.x = Some(x);
            norm.bins.get_or_insert(DEFAULT_HISTOGRAM_BINS);
            Ok((
                Some(format!("SELECT {xq} FROM {table} WHERE {xq} IS NOT NULL")),
                norm,
            ))
        }
        Some(ChartType::Bar) | Some(ChartType::BarHorizontal) => {
            let x = spec.x.clone().or_else(|| roles.categorical.clone());
            let y = spec.y.clone().or_else(|| roles.numeric.clone());
            let (x, y) = match (x, y) {
                (Some(x), Some(y)) => (x, y),
                _ => return Ok((None, norm)),
            };
            let (xq, yq) = (quote_identifier(&x)?, quote_identifier(&y)?);
            norm.x = Some(x);
            norm.y = Some(y);
            let sql = format!(
                "SELECT {xq} AS label, SUM(CAST({yq} AS DOUBLE)) AS value\n\
                 FROM {table}\n\
                 WHERE {xq} IS NOT NULL AND {yq} IS NOT NULL\n\
                 GROUP BY 1\n\
                 ORDER BY 2 DESC;"
            );
            Ok((Some(sql), norm))
        }
        Some(ChartType::Line) | Some(ChartType::Timeseries) => {
            let x = spec.x.clone().or_else(|| roles.date.clone());
            let y = spec.y.clone().or_else(|| roles.numeric.clone());
            let (x, y) = match (x, y) {
                (Some(x), Some(y)) => (x, y),
                _ => return Ok((None, norm)),
            };
            let (xq, yq) = (quote_identifier(&x)?, quote_identifier(&y)?);
            norm.x = Some(x);
            norm.y = Some(y);
            let sql = format!(
                "SELECT CAST({xq} AS TIMESTAMP) AS dt, SUM(CAST({yq} AS DOUBLE)) AS value\n\
                 FROM {table}\n\
                 WHERE {xq} IS NOT NULL AND {yq} IS NOT NULL\n\
                 GROUP BY 1\n\
                 ORDER BY 1;"
            );
            Ok((Some(sql), norm))
        }
        Some(ChartType::Pie) => {
            let label = spec.label.clone().or_else(|| roles.categorical.clone());
            let value = spec.value.clone().or_else(|| roles.numeric.clone());
            let (label, value) = match (label, value) {
                (Some(l), Some(v)) => (l, v),
                _ => return Ok((None, norm)),
            };
            let (lq, vq) = (quote_identifier(&label)?, quote_identifier(&value)?);
            norm.label = Some(label);
            norm.value = Some(value);
            let sql = format!(
                "SELECT {lq} AS name, SUM(CAST({vq} AS DOUBLE)) AS value\n\
                 FROM {table}\n\
                 WHERE {lq} IS NOT NULL AND {vq} IS NOT NULL\n\
                 GROUP BY 1\n\
                 ORDER BY 2 DESC;"
            );
            Ok((Some(sql), norm))
        }
        Some(ChartType::Table) => Ok((
            Some(format!("SELECT * FROM {table} LIMIT {TABLE_PREVIEW_LIMIT};")),
            norm,
        )),
        _ => {
            // No SQL for exotic/unspecified types, but residual delegate SQL
            // that groups or counts suggests a histogram was intended.
            let residual = spec.sql.as_deref().unwrap_or("").to_uppercase();
            if residual.contains("GROUP BY") || residual.contains("COUNT(") {
                norm.chart_type.get_or_insert(ChartType::Histogram);
                if norm.x.is_none() {
                    norm.x = roles
                        .categorical
                        .clone()
                        .or_else(|| roles.numeric.clone())
                        .or_else(|| Some("x".to_string()));
                }
                norm.y.get_or_insert_with(|| "count".to_string());
            }
            Ok((None, norm))
        }
    }
}

/// Chart-Spec Synthesizer bound to a store prober.
pub struct ChartSqlSynthesizer {
    prober: Arc<SchemaProber>,
}

impl ChartSqlSynthesizer {
    pub fn new(prober: Arc<SchemaProber>) -> Self {
        Self { prober }
    }

    /// Returns `(sql, normalized_spec)`; `sql` is None when the spec cannot
    /// be satisfied from the dataset's inferred roles.
    pub fn synthesize(&self, dataset: &str, spec: &ChartSpec) -> Result<(Option<String>, ChartSpec)> {
        let roles = self.prober.infer_columns(dataset)?;
        build_chart_sql(dataset, spec, &roles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::is_safe;

    fn roles() -> ColumnRoles {
        ColumnRoles {
            date: Some("order_date".to_string()),
            numeric: Some("amount".to_string()),
            categorical: Some("country".to_string()),
        }
    }

    #[test]
    fn bar_fills_columns_from_roles() {
        let (sql, norm) =
            build_chart_sql("sales", &ChartSpec::of_type(ChartType::Bar), &roles()).unwrap();
        let sql = sql.unwrap();
        assert!(sql.contains("country AS label"));
        assert!(sql.contains("SUM(CAST(amount AS DOUBLE)) AS value"));
        assert!(sql.contains("ORDER BY 2 DESC"));
        assert_eq!(norm.x.as_deref(), Some("country"));
        assert_eq!(norm.y.as_deref(), Some("amount"));
        assert!(is_safe(&sql));
    }

    #[test]
    fn line_casts_to_timestamp() {
        let (sql, _) =
            build_chart_sql("sales", &ChartSpec::of_type(ChartType::Timeseries), &roles()).unwrap();
        let sql = sql.unwrap();
        assert!(sql.contains("CAST(order_date AS TIMESTAMP) AS dt"));
        assert!(sql.contains("ORDER BY 1"));
    }

    #[test]
    fn histogram_defaults_bins() {
        let (sql, norm) =
            build_chart_sql("sales", &ChartSpec::of_type(ChartType::Histogram), &roles()).unwrap();
        assert_eq!(sql.unwrap(), "SELECT amount FROM sales WHERE amount IS NOT NULL");
        assert_eq!(norm.bins, Some(DEFAULT_HISTOGRAM_BINS));
    }

    #[test]
    fn missing_role_yields_no_sql() {
        let mut r = roles();
        r.categorical = None;
        let (sql, _) = build_chart_sql("sales", &ChartSpec::of_type(ChartType::Bar), &r).unwrap();
        assert!(sql.is_none());
    }

    #[test]
    fn table_is_a_capped_preview() {
        let (sql, _) =
            build_chart_sql("sales", &ChartSpec::of_type(ChartType::Table), &roles()).unwrap();
        assert_eq!(sql.unwrap(), "SELECT * FROM sales LIMIT 1000;");
    }

    #[test]
    fn residual_grouping_sql_suggests_histogram() {
        let spec = ChartSpec {
            sql: Some("SELECT country, COUNT(*) FROM sales GROUP BY country".to_string()),
            ..Default::default()
        };
        let (sql, norm) = build_chart_sql("sales", &spec, &roles()).unwrap();
        assert!(sql.is_none());
        assert_eq!(norm.chart_type, Some(ChartType::Histogram));
        assert_eq!(norm.x.as_deref(), Some("country"));
        assert_eq!(norm.y.as_deref(), Some("count"));
    }

    #[test]
    fn unknown_types_deserialize_to_custom() {
        let spec: ChartSpec = serde_json::from_str(r#"{"type": "sankey"}"#).unwrap();
        assert_eq!(spec.chart_type, Some(ChartType::Custom));
    }
}
