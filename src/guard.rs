//! SQL Guard - static safety checks applied before any query executes
//!
//! This is a deny-list token scanner, not a SQL parser. It is deliberately
//! conservative: a statement that starts with SELECT and carries none of the
//! banned tokens or comment markers is accepted as-is. Known limitation: a
//! banned verb inside a quoted string literal is still rejected, and a
//! legitimate identifier that IS a banned word as a standalone token would be
//! too. Callers depend on these exact boundaries.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref LIMIT_RE: Regex = Regex::new(r"(?i)\blimit\s+\d+\b").unwrap();
}

/// DDL/DML/DCL/IO verbs banned as standalone, space-delimited tokens.
const BANNED_TOKENS: &[&str] = &[
    " drop ", " delete ", " update ", " insert ", " alter ", " create ", " attach ", " pragma ",
    " call ", " replace ", " vacuum ", " copy ", " load ", " import ",
];

/// Returns true when the query is a harmless read-only SELECT. Never panics.
pub fn is_safe(sql: &str) -> bool {
    let s = sql.trim().to_lowercase();
    if s.is_empty() {
        return false;
    }
    if !s.starts_with("select") {
        return false;
    }

    // Comments are a common injection/obfuscation vector: banned outright.
    if s.contains("--") || s.contains("/*") {
        return false;
    }

    let padded = format!(" {} ", s);
    for tok in BANNED_TOKENS {
        if padded.contains(tok) {
            return false;
        }
    }

    true
}

/// Appends ` LIMIT n` when no LIMIT clause is present anywhere. Best-effort
/// safety net, not a SQL rewriter: no attempt to place the clause correctly
/// for every dialect corner (UNION tails etc).
pub fn add_limit_if_missing(sql: &str, n: Option<usize>) -> String {
    let n = match n {
        Some(n) if n > 0 => n,
        _ => return sql.to_string(),
    };
    if sql.trim().is_empty() {
        return sql.to_string();
    }

    let s = sql.trim().trim_end_matches(';');
    if LIMIT_RE.is_match(s) {
        s.to_string()
    } else {
        format!("{} LIMIT {}", s, n)
    }
}

/// Wraps the statement in a sampling subquery, preserving its semantics:
/// `SELECT * FROM (<sql>) t USING SAMPLE <perc> PERCENT`.
/// The percentage is clamped into [0.01, 100.0]; a falsy percent is a no-op.
pub fn wrap_sample(sql: &str, perc: Option<f64>) -> String {
    let perc = match perc {
        Some(p) if p != 0.0 => p.clamp(0.01, 100.0),
        _ => return sql.to_string(),
    };
    if sql.trim().is_empty() {
        return sql.to_string();
    }

    let inner = sql.trim().trim_end_matches(';');
    format!("SELECT * FROM ({}) t USING SAMPLE {} PERCENT", inner, perc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_and_non_select() {
        assert!(!is_safe(""));
        assert!(!is_safe("   "));
        assert!(!is_safe("UPDATE t SET x = 1"));
        assert!(!is_safe("DROP TABLE t"));
        assert!(is_safe("  SELECT 1  "));
        assert!(is_safe("select * from sales"));
    }

    #[test]
    fn rejects_comment_markers_anywhere() {
        assert!(!is_safe("SELECT 1 -- sneaky"));
        assert!(!is_safe("SELECT /* hidden */ 1"));
    }

    #[test]
    fn banned_token_boundary_semantics() {
        // True positive: stacked statement with a standalone banned token.
        assert!(!is_safe("SELECT * FROM t; DROP TABLE t"));
        // False-positive avoidance: banned word embedded in an identifier.
        assert!(is_safe("select x, delete_flag from t"));
        assert!(is_safe("select update_count from audit"));
    }

    #[test]
    fn add_limit_respects_existing_clause() {
        assert_eq!(
            add_limit_if_missing("SELECT * FROM t LIMIT 10", Some(50)),
            "SELECT * FROM t LIMIT 10"
        );
        assert_eq!(
            add_limit_if_missing("SELECT * FROM t limit 10;", Some(50)),
            "SELECT * FROM t limit 10"
        );
        assert_eq!(
            add_limit_if_missing("SELECT * FROM t;", Some(50)),
            "SELECT * FROM t LIMIT 50"
        );
        assert_eq!(add_limit_if_missing("SELECT * FROM t", None), "SELECT * FROM t");
        assert_eq!(add_limit_if_missing("SELECT * FROM t", Some(0)), "SELECT * FROM t");
    }

    #[test]
    fn wrap_sample_clamps_and_skips_falsy() {
        let wrapped = wrap_sample("SELECT * FROM t;", Some(150.0));
        assert_eq!(wrapped, "SELECT * FROM (SELECT * FROM t) t USING SAMPLE 100 PERCENT");
        assert_eq!(wrap_sample("SELECT * FROM t", Some(0.0)), "SELECT * FROM t");
        assert_eq!(wrap_sample("SELECT * FROM t", None), "SELECT * FROM t");
        assert!(wrap_sample("SELECT * FROM t", Some(0.001)).contains("0.01 PERCENT"));
    }
}
