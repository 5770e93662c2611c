//! DuckDB-backed analytical store
//!
//! One embedded database file holds every imported dataset as a table. The
//! connection sits behind a mutex; DuckDB connections are not Sync and the
//! store is shared across the assistant's components. All user-facing SQL
//! goes through `execute`, which first applies the same textual fixups the
//! ingestion path relies on and translates engine errors into categorized
//! ones.

use crate::error::{InsightError, Result};
use crate::error_explain::explain_sql_error;
use crate::execution::result::{batches_to_records, Record};
use crate::quoting::quote_identifier;
use crate::schema_probe::ColumnInfo;
use duckdb::arrow::record_batch::RecordBatch;
use duckdb::Connection;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::Serialize;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::info;

const LOAD_PREVIEW_ROWS: usize = 5;

lazy_static! {
    // date_trunc over a bare identifier; generated SQL often truncates text
    // columns that merely look like dates.
    static ref DATE_TRUNC_BARE: Regex = Regex::new(
        r"(?i)date_trunc\(\s*'(\w+)'\s*,\s*([A-Za-z_][A-Za-z0-9_]*)\s*\)"
    )
    .unwrap();
    static ref REPEATED_SEMICOLONS: Regex = Regex::new(r";{2,}").unwrap();
}

/// Normalizes SQL before execution: strips stray backslashes that LLM
/// responses sometimes carry, collapses duplicated semicolons, and wraps bare
/// `date_trunc` arguments in `try_cast(.. AS DATE)` so text-typed date
/// columns do not fail the whole query.
pub fn prepare_sql(sql: &str) -> String {
    let sql = sql.replace('\\', "");
    let sql = REPEATED_SEMICOLONS.replace_all(&sql, ";");
    DATE_TRUNC_BARE
        .replace_all(sql.trim(), |caps: &Captures| {
            format!("date_trunc('{}', try_cast({} AS DATE))", &caps[1], &caps[2])
        })
        .into_owned()
}

/// Summary of a completed dataset import.
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub table: String,
    pub rows: u64,
    pub columns: Vec<ColumnInfo>,
    pub preview: Vec<Record>,
}

pub struct DuckStore {
    conn: Mutex<Connection>,
}

impl DuckStore {
    /// Opens (or creates) the database file, creating parent directories.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)
            .map_err(|e| InsightError::Store(format!("cannot open database: {e}")))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| InsightError::Store(format!("cannot open in-memory database: {e}")))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| InsightError::Store("store lock poisoned".to_string()))
    }

    fn query_error(&self, err: duckdb::Error, sql: &str) -> InsightError {
        let (kind, message) = explain_sql_error(&err.to_string(), sql);
        InsightError::Query { kind, message }
    }

    /// Runs a query and returns normalized JSON rows. Errors are classified
    /// and rewritten; the raw engine message never reaches the caller.
    pub fn execute(&self, sql: &str) -> Result<Vec<Record>> {
        let sql = prepare_sql(sql);
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql).map_err(|e| self.query_error(e, &sql))?;
        let batches: Vec<RecordBatch> = stmt
            .query_arrow([])
            .map_err(|e| self.query_error(e, &sql))?
            .collect();
        Ok(batches_to_records(&batches))
    }

    fn exec_ddl(&self, sql: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(sql)
            .map_err(|e| InsightError::Store(e.to_string()))
    }

    /// Declared column names and types, via `DESCRIBE`.
    pub fn describe(&self, dataset: &str) -> Result<Vec<ColumnInfo>> {
        let rows = self.execute(&format!("DESCRIBE {}", quote_identifier(dataset)?))?;
        Ok(rows
            .iter()
            .filter_map(|r| {
                let name = r.get("column_name")?.as_str()?.to_string();
                let dtype = r.get("column_type")?.as_str()?.to_string();
                Some(ColumnInfo { name, dtype })
            })
            .collect())
    }

    pub fn sample(&self, dataset: &str, n: usize) -> Result<Vec<Record>> {
        self.execute(&format!(
            "SELECT * FROM {} LIMIT {}",
            quote_identifier(dataset)?,
            n
        ))
    }

    pub fn list_tables(&self) -> Result<Vec<String>> {
        let rows = self.execute(
            "SELECT table_name AS name FROM information_schema.tables ORDER BY 1",
        )?;
        Ok(rows
            .iter()
            .filter_map(|r| r.get("name").and_then(|v| v.as_str()).map(String::from))
            .collect())
    }

    fn row_count(&self, table: &str) -> Result<u64> {
        let rows = self.execute(&format!(
            "SELECT COUNT(*) AS n FROM {}",
            quote_identifier(table)?
        ));
        Ok(rows?
            .first()
            .and_then(|r| r.get("n"))
            .and_then(|v| v.as_u64())
            .unwrap_or(0))
    }

    fn load_with_reader(&self, table: &str, reader_call: &str) -> Result<LoadReport> {
        let tq = quote_identifier(table)?;
        self.exec_ddl(&format!(
            "CREATE OR REPLACE TABLE {tq} AS SELECT * FROM {reader_call};"
        ))?;
        let rows = self.row_count(table)?;
        let columns = self.describe(table)?;
        let preview = self.sample(table, LOAD_PREVIEW_ROWS)?;
        info!("Loaded dataset '{}': {} rows, {} columns", table, rows, columns.len());
        Ok(LoadReport {
            table: table.to_string(),
            rows,
            columns,
            preview,
        })
    }

    fn quote_path(path: &Path) -> String {
        path.to_string_lossy().replace('\'', "''")
    }

    pub fn load_csv(&self, path: &Path, table: &str) -> Result<LoadReport> {
        let p = Self::quote_path(path);
        self.load_with_reader(table, &format!("read_csv_auto('{p}', header=true)"))
    }

    pub fn load_parquet(&self, path: &Path, table: &str) -> Result<LoadReport> {
        let p = Self::quote_path(path);
        self.load_with_reader(table, &format!("read_parquet('{p}')"))
    }

    pub fn load_json(&self, path: &Path, table: &str) -> Result<LoadReport> {
        let p = Self::quote_path(path);
        self.load_with_reader(table, &format!("read_json_auto('{p}')"))
    }

    /// Imports a file into a table, picking the reader from the extension.
    pub fn load_file(&self, path: &Path, table: &str) -> Result<LoadReport> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "csv" | "tsv" => self.load_csv(path, table),
            "parquet" => self.load_parquet(path, table),
            "json" | "ndjson" | "jsonl" => self.load_json(path, table),
            "xlsx" | "xls" => Err(InsightError::Store(
                "Excel files are not supported; export to CSV first".to_string(),
            )),
            other => Err(InsightError::Store(format!(
                "unsupported file extension '{other}'"
            ))),
        }
    }

    pub fn drop_table(&self, table: &str) -> Result<()> {
        self.exec_ddl(&format!("DROP TABLE IF EXISTS {};", quote_identifier(table)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_explain::SqlErrorKind;
    use std::io::Write;

    #[test]
    fn prepare_sql_fixups() {
        assert_eq!(prepare_sql("SELECT 1;;;"), "SELECT 1;");
        assert_eq!(prepare_sql("SELECT \\\"a\\\" FROM t"), "SELECT \"a\" FROM t");
        assert_eq!(
            prepare_sql("SELECT date_trunc('month', created) FROM t"),
            "SELECT date_trunc('month', try_cast(created AS DATE)) FROM t"
        );
        // Already-cast arguments are left alone.
        let cast = "SELECT date_trunc('month', try_cast(created AS DATE)) FROM t";
        assert_eq!(prepare_sql(cast), cast);
    }

    #[test]
    fn execute_returns_json_rows() {
        let store = DuckStore::open_in_memory().unwrap();
        let rows = store.execute("SELECT 1 AS one, 'x' AS s").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["one"], serde_json::json!(1));
        assert_eq!(rows[0]["s"], serde_json::json!("x"));
    }

    #[test]
    fn errors_are_classified() {
        let store = DuckStore::open_in_memory().unwrap();
        let err = store.execute("SELECT * FROM nope_not_here").unwrap_err();
        match err {
            InsightError::Query { kind, message } => {
                assert_eq!(kind, SqlErrorKind::UnknownTable);
                assert!(message.starts_with("❌"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn csv_round_trip_reports_schema() {
        let mut file = tempfile::NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(file, "date,category,amount").unwrap();
        writeln!(file, "2024-01-01,a,10.5").unwrap();
        writeln!(file, "2024-01-02,b,2.0").unwrap();
        file.flush().unwrap();

        let store = DuckStore::open_in_memory().unwrap();
        let report = store.load_csv(file.path(), "sales").unwrap();
        assert_eq!(report.rows, 2);
        let names: Vec<&str> = report.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["date", "category", "amount"]);
        assert_eq!(report.preview.len(), 2);
        assert_eq!(store.list_tables().unwrap(), vec!["sales"]);
    }

    #[test]
    fn unsupported_extensions_are_refused() {
        let store = DuckStore::open_in_memory().unwrap();
        let err = store.load_file(Path::new("data.xlsx"), "t").unwrap_err();
        assert!(matches!(err, InsightError::Store(_)));
    }
}
