//! Chart Necessity Classifier
//!
//! Decides whether a question deserves a chart at all, fixes up incomplete
//! chart specs from question phrasing, and renders a plain-text answer when a
//! chart would not serve the question. Keyword lists carry the product's
//! French-first vocabulary with the common English synonyms mixed in.

use crate::chart_spec::{ChartSpec, ChartType};
use crate::execution::result::Record;

/// Phrasings that make a chart appropriate.
const CHART_KEYWORDS: &[&str] = &[
    "évolution", "courbe", "graphique", "visualiser", "afficher", "temps", "mois", "jour",
    "chronologique", "timeline", "par semaine", "par mois", "répartition", "proportion",
    "distribution", "part", "pourcentage", "classement", "top", "meilleur", "pire", "comparaison",
    "plus", "moins", "corrélation", "relation", "vs", "entre", "zone", "aire", "cumul",
    "progression", "tendance", "trend", "augmente", "diminue", "croissance", "baisse",
];

/// Phrasings that call for a textual answer instead.
const NO_CHART_KEYWORDS: &[&str] = &[
    "liste", "lister", "afficher la liste", "donne la liste", "renvoie la liste", "combien",
    "nombre", "count", "total de", "nombre de", "quel est", "quelle est", "quelle valeur",
    "quelle est la valeur", "décris", "explique", "définis", "qu'est-ce que", "existe", "présent",
    "contient", "unique", "distinct", "différent",
];

/// A list of a trend is still charted: these override the no-chart set.
const OVERRIDE_KEYWORDS: &[&str] = &["évolution", "comparaison", "répartition", "classement"];

const SIMPLE_KEYWORDS: &[&str] = &["liste", "combien", "quel est", "quelle est"];

/// Ordered keyword buckets for chart-type inference; first match wins, so
/// this stays an ordered list rather than a map.
const TYPE_BUCKETS: &[(&[&str], ChartType)] = &[
    (
        &["répartition", "proportion", "distribution", "part", "pourcentage", "par nationalité", "par pays"],
        ChartType::Pie,
    ),
    (
        &["évolution", "temps", "mois", "jour", "chronologique", "par semaine", "timeline"],
        ChartType::Line,
    ),
    (
        &["classement", "top", "meilleur", "pire", "comparaison", "plus", "moins"],
        ChartType::Bar,
    ),
    (&["corrélation", "relation", "vs", "entre"], ChartType::Scatter),
    (&["zone", "aire", "cumul", "progression"], ChartType::Area),
    (&["entonnoir", "funnel"], ChartType::Funnel),
    (
        &["radial", "cercle concentrique", "progression circulaire"],
        ChartType::RadialBar,
    ),
    (&["treemap", "hiérarchie", "structure"], ChartType::Treemap),
    (&["radar", "compétences", "profil", "polygone"], ChartType::Radar),
    (&["empilé", "stacked"], ChartType::StackedBar),
];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

fn numeric_column_count(row: &Record) -> usize {
    row.values().filter(|v| v.is_number()).count()
}

/// Decides whether the question deserves a chart or a plain-text answer.
pub fn should_show_chart(question: &str, chart_spec: &ChartSpec, rows: &[Record]) -> bool {
    let q = question.to_lowercase();
    let q = q.trim();

    // An explicit concrete chart type wins over everything.
    if chart_spec.is_concrete_chart() {
        return true;
    }

    if contains_any(q, NO_CHART_KEYWORDS) && !contains_any(q, OVERRIDE_KEYWORDS) {
        return false;
    }

    if contains_any(q, CHART_KEYWORDS) {
        return true;
    }

    // Few rows and simple phrasing: a table or sentence reads better.
    if !rows.is_empty() && rows.len() <= 5 && contains_any(q, SIMPLE_KEYWORDS) {
        return false;
    }

    match rows.first() {
        Some(first) => rows.len() > 1 && numeric_column_count(first) >= 1,
        None => false,
    }
}

/// Repairs or infers the chart spec from question phrasing and the result
/// shape. Returns None when the question does not deserve a chart.
pub fn auto_fix_chart_spec(
    question: &str,
    chart_spec: &ChartSpec,
    rows: &[Record],
) -> Option<ChartSpec> {
    if !should_show_chart(question, chart_spec, rows) {
        return None;
    }

    let q = question.to_lowercase();
    let q = q.trim();
    let mut spec = chart_spec.clone();

    if spec.chart_type.is_none() || spec.chart_type == Some(ChartType::Table) {
        let inferred = TYPE_BUCKETS
            .iter()
            .find(|(keywords, _)| contains_any(q, keywords))
            .map(|(_, t)| *t)
            .unwrap_or(ChartType::Bar);
        spec.chart_type = Some(inferred);
    }

    if let Some(first) = rows.first() {
        let keys: Vec<&String> = first.keys().collect();
        if spec.x.is_none() {
            spec.x = keys.first().map(|k| (*k).clone());
        }
        if spec.y.is_none() {
            spec.y = keys
                .get(1)
                .or_else(|| keys.first())
                .map(|k| (*k).clone());
        }
    }

    Some(spec)
}

/// Plain-text answer for questions that do not deserve a chart.
pub fn format_text_response(question: &str, rows: &[Record]) -> String {
    if rows.is_empty() {
        return "Aucun résultat trouvé.".to_string();
    }

    let q = question.to_lowercase();
    let q = q.trim();
    let first = &rows[0];

    let fmt_value = |v: &serde_json::Value| match v {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    if contains_any(q, &["combien", "nombre", "count", "total de", "nombre de"]) {
        if rows.len() == 1 {
            if let Some((k, v)) = first.iter().find(|(_, v)| v.is_number()) {
                return format!("**{}** : {}", k, fmt_value(v));
            }
        }
        return format!("**Nombre de résultats** : {}", rows.len());
    }

    if contains_any(q, &["liste", "lister", "afficher la liste", "donne la liste", "renvoie la liste"]) {
        if rows.len() <= 10 {
            let lines: Vec<String> = rows
                .iter()
                .enumerate()
                .map(|(i, row)| {
                    let cols: Vec<String> = row
                        .iter()
                        .take(3)
                        .map(|(k, v)| format!("{}: {}", k, fmt_value(v)))
                        .collect();
                    format!("{}. {}", i + 1, cols.join(", "))
                })
                .collect();
            return lines.join("\n");
        }
        return format!(
            "**{} résultats trouvés.**\n\nAffichage des 10 premiers résultats dans le tableau ci-dessous.",
            rows.len()
        );
    }

    if contains_any(q, &["quel est", "quelle est", "quelle valeur", "quelle est la valeur"]) {
        if rows.len() == 1 {
            let lines: Vec<String> = first
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| format!("**{}** : {}", k, fmt_value(v)))
                .collect();
            if lines.is_empty() {
                return "Aucune valeur trouvée.".to_string();
            }
            return lines.join("\n");
        }
        return format!(
            "**{} résultats trouvés.**\n\nVoir le tableau ci-dessous pour les détails.",
            rows.len()
        );
    }

    if rows.len() == 1 {
        let lines: Vec<String> = first
            .iter()
            .take(5)
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| format!("**{}** : {}", k, fmt_value(v)))
            .collect();
        if lines.is_empty() {
            return "Résultat trouvé.".to_string();
        }
        return lines.join("\n");
    }

    format!(
        "**{} résultats trouvés.**\n\nVoir le tableau ci-dessous pour les détails.",
        rows.len()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(values: &[(&str, serde_json::Value)]) -> Vec<Record> {
        let mut row = Record::new();
        for (k, v) in values {
            row.insert(k.to_string(), v.clone());
        }
        vec![row]
    }

    fn many_rows(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| {
                let mut row = Record::new();
                row.insert("category".to_string(), json!(format!("c{}", i)));
                row.insert("total".to_string(), json!(i as f64));
                row
            })
            .collect()
    }

    #[test]
    fn counting_questions_get_no_chart() {
        let spec = ChartSpec::default();
        assert!(!should_show_chart("Combien de clients existent ?", &spec, &many_rows(10)));
        assert!(!should_show_chart("Combien de clients existent ?", &spec, &[]));
    }

    #[test]
    fn trend_questions_get_a_chart() {
        let spec = ChartSpec::default();
        assert!(should_show_chart("Montre l'évolution des ventes par mois", &spec, &[]));
    }

    #[test]
    fn explicit_type_always_wins() {
        let spec = ChartSpec::of_type(ChartType::Pie);
        assert!(should_show_chart("Combien de clients ?", &spec, &[]));
        let table = ChartSpec::of_type(ChartType::Table);
        assert!(!should_show_chart("Combien de clients ?", &table, &[]));
    }

    #[test]
    fn list_of_a_trend_is_still_charted() {
        let spec = ChartSpec::default();
        assert!(should_show_chart("Donne la liste de l'évolution mensuelle", &spec, &many_rows(12)));
    }

    #[test]
    fn small_simple_results_stay_textual() {
        let spec = ChartSpec::default();
        // No chart or no-chart keywords; >=2 rows + a numeric column charts.
        assert!(should_show_chart("ventes réalisées en 2024", &spec, &many_rows(3)));
        // Single row never charts by default.
        assert!(!should_show_chart("ventes réalisées en 2024", &spec, &many_rows(1)));
    }

    #[test]
    fn auto_fix_infers_pie_from_repartition() {
        let fixed = auto_fix_chart_spec(
            "Quelle est la répartition des ventes par pays ?",
            &ChartSpec::default(),
            &many_rows(4),
        )
        .unwrap();
        assert_eq!(fixed.chart_type, Some(ChartType::Pie));
    }

    #[test]
    fn auto_fix_returns_none_for_textual_questions() {
        assert!(auto_fix_chart_spec("Combien de clients ?", &ChartSpec::default(), &many_rows(3)).is_none());
    }

    #[test]
    fn auto_fix_fills_axes_from_first_row() {
        let fixed = auto_fix_chart_spec(
            "Top des catégories",
            &ChartSpec::default(),
            &many_rows(4),
        )
        .unwrap();
        assert_eq!(fixed.chart_type, Some(ChartType::Bar));
        assert_eq!(fixed.x.as_deref(), Some("category"));
        assert_eq!(fixed.y.as_deref(), Some("total"));
    }

    #[test]
    fn auto_fix_single_column_reuses_it_for_y() {
        let r = rows(&[("n", json!(42))]);
        let fixed =
            auto_fix_chart_spec("évolution du nombre", &ChartSpec::default(), &r).unwrap();
        assert_eq!(fixed.x.as_deref(), Some("n"));
        assert_eq!(fixed.y.as_deref(), Some("n"));
    }

    #[test]
    fn bucket_order_breaks_ties() {
        // "répartition" (pie) appears before "top" (bar) in the cascade.
        let fixed = auto_fix_chart_spec(
            "répartition du top des ventes",
            &ChartSpec::default(),
            &many_rows(4),
        )
        .unwrap();
        assert_eq!(fixed.chart_type, Some(ChartType::Pie));
    }

    #[test]
    fn count_answers_surface_the_single_number() {
        let r = rows(&[("total", json!(128))]);
        assert_eq!(format_text_response("Combien de clients ?", &r), "**total** : 128");
        assert_eq!(format_text_response("Combien ?", &[]), "Aucun résultat trouvé.");
    }

    #[test]
    fn short_lists_are_enumerated() {
        let text = format_text_response("Donne la liste des pays", &many_rows(2));
        assert!(text.starts_with("1. category: c0"));
        assert!(text.contains("\n2. "));
    }
}
