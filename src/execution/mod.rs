//! Storage and query execution: the DuckDB store, the guarded runner, and
//! Arrow-to-JSON result normalization.

pub mod result;
pub mod runner;
pub mod store;

pub use result::Record;
pub use runner::{QueryRunner, MAX_RESULT_ROWS};
pub use store::{DuckStore, LoadReport};
