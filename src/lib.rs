pub mod assistant;
pub mod chart_spec;
pub mod config;
pub mod delegates;
pub mod error;
pub mod error_explain;
pub mod execution;
pub mod guard;
pub mod plan_compiler;
pub mod presentation;
pub mod quoting;
pub mod schema_probe;

pub use assistant::{Answer, AskOptions, DataAssistant};
pub use chart_spec::{ChartSpec, ChartType};
pub use error::{ErrorPayload, InsightError, Result};
pub use execution::result::Record;
pub use execution::runner::QueryRunner;
pub use execution::store::DuckStore;
pub use plan_compiler::{build_sql_from_plan, Intent, Plan};
pub use schema_probe::{ColumnRoles, SchemaProber};
