//! Schema Prober - column metadata and role inference
//!
//! Fetches a dataset's declared schema plus a bounded sample, then classifies
//! columns into date/numeric/categorical roles. The NL->SQL delegate may omit
//! explicit column names, so the system still needs sensible defaults for a
//! visualization; this trades precision for robustness and is best-effort,
//! not a type-inference guarantee.

use crate::error::Result;
use crate::execution::result::Record;
use crate::execution::store::DuckStore;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

const SAMPLE_ROWS: usize = 50;

/// Name substrings that suggest a date column, scanned in priority order.
const DATE_SYNONYMS: &[&str] = &[
    "date", "jour", "day", "time", "timestamp", "datetime", "created", "due",
];

/// Name substrings that suggest a measure column, scanned in priority order.
const NUM_SYNONYMS: &[&str] = &[
    "cases", "cas", "total_cases", "value", "amount", "sum", "count", "nb", "y",
];

/// Identifier-like numeric columns that make poor measures.
const ID_LIKE: &[&str] = &["id", "task id", "task_id"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub dtype: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableProfile {
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<Record>,
}

/// Inferred primary role per column, at most one column per role.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnRoles {
    pub date: Option<String>,
    pub numeric: Option<String>,
    pub categorical: Option<String>,
}

pub fn is_date_dtype(dtype: &str) -> bool {
    let s = dtype.to_lowercase();
    ["date", "time", "timestamp", "datetime"].iter().any(|k| s.contains(k))
}

pub fn is_numeric_dtype(dtype: &str) -> bool {
    let s = dtype.to_lowercase();
    ["int", "float", "double", "decimal", "numeric"].iter().any(|k| s.contains(k))
}

fn norm_name(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

fn synonym_pick<'a>(
    columns: &'a [ColumnInfo],
    synonyms: &[&str],
    exclude: Option<&str>,
) -> Option<&'a ColumnInfo> {
    for syn in synonyms {
        for c in columns {
            if Some(c.name.as_str()) == exclude {
                continue;
            }
            if norm_name(&c.name).contains(syn) {
                return Some(c);
            }
        }
    }
    None
}

/// Classifies columns into date/numeric/categorical roles.
///
/// Declared types win; name synonyms are the fallback. The date and numeric
/// picks always refer to distinct columns, and the categorical pick excludes
/// anything already classified.
pub fn infer_roles(columns: &[ColumnInfo]) -> ColumnRoles {
    let date = columns
        .iter()
        .find(|c| is_date_dtype(&c.dtype))
        .or_else(|| synonym_pick(columns, DATE_SYNONYMS, None))
        .map(|c| c.name.clone());

    let numeric = columns
        .iter()
        .find(|c| {
            is_numeric_dtype(&c.dtype)
                && !ID_LIKE.contains(&c.name.to_lowercase().as_str())
                && Some(c.name.as_str()) != date.as_deref()
        })
        .or_else(|| synonym_pick(columns, NUM_SYNONYMS, date.as_deref()))
        .map(|c| c.name.clone());

    let categorical = columns
        .iter()
        .find(|c| {
            !is_numeric_dtype(&c.dtype)
                && !is_date_dtype(&c.dtype)
                && Some(c.name.as_str()) != date.as_deref()
                && Some(c.name.as_str()) != numeric.as_deref()
        })
        .map(|c| c.name.clone());

    ColumnRoles {
        date,
        numeric,
        categorical,
    }
}

/// Probes the analytical store for schema and sample data.
pub struct SchemaProber {
    store: Arc<DuckStore>,
}

impl SchemaProber {
    pub fn new(store: Arc<DuckStore>) -> Self {
        Self { store }
    }

    /// Declared schema plus up to 50 sample rows.
    pub fn profile(&self, dataset: &str) -> Result<TableProfile> {
        let columns = self.store.describe(dataset)?;
        let rows = self.store.sample(dataset, SAMPLE_ROWS)?;
        Ok(TableProfile { columns, rows })
    }

    /// Infers (date, numeric, categorical) roles for a dataset.
    pub fn infer_columns(&self, dataset: &str) -> Result<ColumnRoles> {
        let columns = self.store.describe(dataset)?;
        let roles = infer_roles(&columns);
        debug!(
            "Inferred roles for {}: date={:?} numeric={:?} categorical={:?}",
            dataset, roles.date, roles.numeric, roles.categorical
        );
        Ok(roles)
    }

    /// One-line schema summary used to contextualize the NL->SQL delegate,
    /// e.g. `order_date (DATE), amount (DOUBLE), country (VARCHAR)`.
    pub fn schema_context(&self, dataset: &str) -> Result<String> {
        let columns = self.store.describe(dataset)?;
        Ok(columns
            .iter()
            .map(|c| format!("{} ({})", c.name, c.dtype))
            .join(", "))
    }
}
