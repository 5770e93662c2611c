//! Execution-error translation
//!
//! The store's error strings are technical (binder errors, cast failures).
//! Before surfacing them we classify each one into a fixed category and build
//! an actionable, human-readable message. Classification is pattern matching
//! on the engine's error text; nothing here retries, since re-running the
//! same SQL against an unchanged schema cannot succeed.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref QUOTED_COLUMN_MUST_APPEAR: Regex =
        Regex::new(r#"(?i)column\s+"([^"]+)"\s+must appear"#).unwrap();
    static ref BARE_COLUMN_MUST_APPEAR: Regex =
        Regex::new(r"(?i)column\s+([a-zA-Z_][a-zA-Z0-9_]*)\s+must appear").unwrap();
    static ref COLUMN_NOT_FOUND: Regex =
        Regex::new(r#"(?i)column\s+"?([^"\s]+)"?\s+(?:does not exist|not found)"#).unwrap();
    static ref TABLE_NOT_FOUND: Regex =
        Regex::new(r#"(?i)table\s+(?:with name\s+)?"?([^"\s]+)"?\s+(?:does not exist|not found)"#).unwrap();
    static ref FUNCTION_NOT_FOUND: Regex =
        Regex::new(r#"(?i)function\s+"?([^"\s]+)"?\s+(?:does not exist|not found)"#).unwrap();
}

/// Fixed categories for execution failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlErrorKind {
    GroupByViolation,
    UnknownColumn,
    UnknownTable,
    Syntax,
    TypeMismatch,
    UnknownFunction,
    DivisionByZero,
    LimitOutOfRange,
    JoinAmbiguity,
    Other,
}

impl SqlErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SqlErrorKind::GroupByViolation => "group_by_violation",
            SqlErrorKind::UnknownColumn => "unknown_column",
            SqlErrorKind::UnknownTable => "unknown_table",
            SqlErrorKind::Syntax => "syntax",
            SqlErrorKind::TypeMismatch => "type_mismatch",
            SqlErrorKind::UnknownFunction => "unknown_function",
            SqlErrorKind::DivisionByZero => "division_by_zero",
            SqlErrorKind::LimitOutOfRange => "limit_out_of_range",
            SqlErrorKind::JoinAmbiguity => "join_ambiguity",
            SqlErrorKind::Other => "query_execution",
        }
    }
}

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Classifies a raw engine error into a category plus a clear message.
pub fn explain_sql_error(error_msg: &str, _sql: &str) -> (SqlErrorKind, String) {
    let lower = error_msg.to_lowercase();

    if lower.contains("group by") || lower.contains("must appear in the group by") {
        let col = first_capture(&QUOTED_COLUMN_MUST_APPEAR, error_msg)
            .or_else(|| first_capture(&BARE_COLUMN_MUST_APPEAR, error_msg))
            .unwrap_or_else(|| "une colonne".to_string());
        return (
            SqlErrorKind::GroupByViolation,
            format!(
                "❌ Erreur dans la requête : la colonne '{}' doit être incluse dans le GROUP BY \
                 ou utilisée dans une fonction d'agrégation (MAX, MIN, SUM, etc.).\n\n\
                 💡 Conseil : reformulez votre question, ou ajoutez '{}' au GROUP BY.",
                col, col
            ),
        );
    }

    if lower.contains("table") && (lower.contains("does not exist") || lower.contains("not found")) {
        let table = first_capture(&TABLE_NOT_FOUND, error_msg)
            .unwrap_or_else(|| "cette table".to_string());
        return (
            SqlErrorKind::UnknownTable,
            format!(
                "❌ La table '{}' n'existe pas.\n\n\
                 💡 Conseil : vérifiez le nom du dataset ou importez-le d'abord.",
                table
            ),
        );
    }

    if lower.contains("function") && (lower.contains("does not exist") || lower.contains("not found"))
    {
        let func = first_capture(&FUNCTION_NOT_FOUND, error_msg)
            .unwrap_or_else(|| "cette fonction".to_string());
        return (
            SqlErrorKind::UnknownFunction,
            format!(
                "❌ La fonction '{}' n'est pas disponible.\n\n\
                 💡 Conseil : utilisez une fonction SQL standard (SUM, COUNT, AVG, MAX, MIN, etc.).",
                func
            ),
        );
    }

    if lower.contains("does not exist") || (lower.contains("column") && lower.contains("not found"))
    {
        let col =
            first_capture(&COLUMN_NOT_FOUND, error_msg).unwrap_or_else(|| "cette colonne".to_string());
        return (
            SqlErrorKind::UnknownColumn,
            format!(
                "❌ La colonne '{}' n'existe pas dans ce dataset.\n\n\
                 💡 Conseil : vérifiez le nom de la colonne ou consultez le schéma du dataset.",
                col
            ),
        );
    }

    if lower.contains("syntax error") || lower.contains("invalid syntax") {
        return (
            SqlErrorKind::Syntax,
            "❌ Erreur de syntaxe dans la requête SQL générée.\n\n\
             💡 Conseil : reformulez votre question de manière plus claire."
                .to_string(),
        );
    }

    if lower.contains("type mismatch") || lower.contains("cannot cast") || lower.contains("invalid type")
    {
        return (
            SqlErrorKind::TypeMismatch,
            "❌ Erreur de type de données : les types de colonnes ne correspondent pas à \
             l'opération demandée.\n\n\
             💡 Conseil : vérifiez que vous utilisez les bonnes colonnes pour votre analyse."
                .to_string(),
        );
    }

    if lower.contains("division by zero") || lower.contains("divide by zero") {
        return (
            SqlErrorKind::DivisionByZero,
            "❌ Division par zéro : impossible de diviser par zéro.\n\n\
             💡 Conseil : vérifiez que les valeurs utilisées dans la division ne sont pas nulles."
                .to_string(),
        );
    }

    if lower.contains("limit") && (lower.contains("invalid") || lower.contains("out of range")) {
        return (
            SqlErrorKind::LimitOutOfRange,
            "❌ La limite spécifiée est invalide.\n\n\
             💡 Conseil : utilisez une valeur positive pour la limite."
                .to_string(),
        );
    }

    if lower.contains("join") && (lower.contains("ambiguous") || lower.contains("not found")) {
        return (
            SqlErrorKind::JoinAmbiguity,
            "❌ Erreur dans la jointure de tables : colonne ambiguë ou introuvable.\n\n\
             💡 Conseil : spécifiez explicitement les tables pour chaque colonne (ex: table.colonne)."
                .to_string(),
        );
    }

    if lower.contains("binder error") {
        return (
            SqlErrorKind::Other,
            "❌ Erreur dans la requête SQL générée.\n\n\
             💡 Conseil : reformulez votre question de manière plus claire et précise."
                .to_string(),
        );
    }

    if error_msg.len() < 200 {
        return (
            SqlErrorKind::Other,
            format!(
                "❌ Erreur SQL : {}\n\n💡 Conseil : reformulez votre question de manière plus claire.",
                error_msg
            ),
        );
    }

    (
        SqlErrorKind::Other,
        "❌ Erreur lors de l'exécution de la requête SQL.\n\n\
         💡 Conseil : reformulez votre question de manière plus claire et précise. \
         Si le problème persiste, vérifiez que les noms de colonnes et de tables sont corrects."
            .to_string(),
    )
}
