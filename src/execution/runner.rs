//! Query Executor
//!
//! The only sanctioned path from generated SQL to the store. Every statement
//! clears the guard first, then picks up a sampling wrapper and a row cap
//! before execution. Callers that disable the explicit limit still get the
//! hard ceiling; unbounded result sets never leave this module.

use crate::error::{InsightError, Result};
use crate::execution::result::Record;
use crate::execution::store::DuckStore;
use crate::guard::{add_limit_if_missing, is_safe, wrap_sample};
use std::sync::Arc;
use tracing::{info, warn};

/// Hard ceiling applied when the caller does not set a limit.
pub const MAX_RESULT_ROWS: usize = 100_000;

/// Default row cap for assistant-driven queries.
pub const DEFAULT_QUERY_LIMIT: usize = 1_000;

/// Default cap for sampled exploration queries.
pub const SAMPLE_DEFAULT_LIMIT: usize = 5_000;

pub struct QueryRunner {
    store: Arc<DuckStore>,
}

impl QueryRunner {
    pub fn new(store: Arc<DuckStore>) -> Self {
        Self { store }
    }

    /// Guards, caps, optionally samples, then executes.
    ///
    /// `add_limit` of None means no caller-chosen limit; the hard ceiling
    /// still applies. `sample_perc` wraps the query in a percentage sample
    /// and tightens the default cap for interactive exploration.
    pub fn run_sql_safe(
        &self,
        sql: &str,
        add_limit: Option<usize>,
        sample_perc: Option<f64>,
    ) -> Result<Vec<Record>> {
        if !is_safe(sql) {
            warn!("Guard rejected query: {}", sql.chars().take(120).collect::<String>());
            return Err(InsightError::UnsafeQuery);
        }

        let effective = if sample_perc.is_some() {
            let sampled = wrap_sample(sql, sample_perc);
            add_limit_if_missing(&sampled, Some(add_limit.unwrap_or(SAMPLE_DEFAULT_LIMIT)))
        } else {
            add_limit_if_missing(sql, Some(add_limit.unwrap_or(MAX_RESULT_ROWS)))
        };

        let rows = self.store.execute(&effective)?;
        info!("Executed query, {} rows", rows.len());
        Ok(rows)
    }
}
