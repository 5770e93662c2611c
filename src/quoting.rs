//! Identifier hygiene for generated SQL
//!
//! Every table or column name interpolated into SQL goes through
//! [`quote_identifier`], which prevents syntax corruption and blocks trivial
//! injection through malicious dataset/column names.

use crate::error::{InsightError, Result};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NON_IDENT: Regex = Regex::new(r"[^0-9a-zA-Z_]").unwrap();
    static ref NON_ALNUM_RUN: Regex = Regex::new(r"[^A-Za-z0-9]+").unwrap();
}

/// Quotes a SQL identifier when it carries anything beyond `[0-9a-zA-Z_]`,
/// doubling internal double quotes. Plain names pass through unquoted.
pub fn quote_identifier(name: &str) -> Result<String> {
    if name.is_empty() {
        return Err(InsightError::InvalidIdentifier);
    }
    if NON_IDENT.is_match(name) {
        Ok(format!("\"{}\"", name.replace('"', "\"\"")))
    } else {
        Ok(name.to_string())
    }
}

/// Normalizes a user-supplied dataset name into a store-friendly identifier:
/// lowercase, alnum and underscore only.
pub fn normalize_dataset_name(raw: &str) -> String {
    NON_ALNUM_RUN
        .replace_all(raw.trim(), "_")
        .trim_matches('_')
        .to_lowercase()
}
