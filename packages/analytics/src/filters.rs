//! SQL fragment builders with numbered parameters.
//!
//! Fragments reference parameters as `$n`, so one fragment (a class
//! predicate, say) can appear in both the select list and the `WHERE`
//! clause while binding its values once.

use incident_watch_analytics_models::TimeWindow;
use incident_watch_database::duckdb::types::Value;
use incident_watch_incident_models::{Classifier, IncidentClass};

/// Accumulates parameter values and hands out their placeholders.
#[derive(Debug, Default)]
pub struct SqlParams {
    values: Vec<Value>,
}

impl SqlParams {
    /// Binds `value` and returns its `$n` placeholder.
    pub fn bind(&mut self, value: impl Into<Value>) -> String {
        self.values.push(value.into());
        format!("${}", self.values.len())
    }

    /// The bound values, in placeholder order.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

/// `received_at` within the half-open window.
pub fn window_filter(params: &mut SqlParams, window: &TimeWindow) -> String {
    let start = params.bind(window.start.timestamp());
    let end = params.bind(window.end.timestamp());
    format!("received_at >= {start} AND received_at < {end}")
}

/// A predicate true exactly for rows the classifier assigns to `class`.
///
/// Mirrors first-match-wins: a row belongs to `class` when its type name
/// contains one of the class's keywords and none of the keywords of an
/// earlier rule of another class. A class with no rule matches nothing.
pub fn class_predicate(
    params: &mut SqlParams,
    classifier: &Classifier,
    class: IncidentClass,
) -> String {
    let mut branches = Vec::new();

    for (own, excluded) in classifier.precedence_terms(class) {
        if own.is_empty() {
            continue;
        }
        let matched = any_keyword(params, &own);
        if excluded.is_empty() {
            branches.push(matched);
        } else {
            let blocked = any_keyword(params, &excluded);
            branches.push(format!("({matched} AND NOT {blocked})"));
        }
    }

    if branches.is_empty() {
        "FALSE".to_string()
    } else {
        format!("({})", branches.join(" OR "))
    }
}

fn any_keyword(params: &mut SqlParams, keywords: &[&str]) -> String {
    let terms: Vec<String> = keywords
        .iter()
        .map(|keyword| {
            let placeholder = params.bind(keyword.to_lowercase());
            format!("contains(lower(type_name), {placeholder})")
        })
        .collect();
    format!("({})", terms.join(" OR "))
}

/// Joins fragments into a `WHERE` clause.
pub fn where_clause(frags: &[String]) -> String {
    if frags.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", frags.join(" AND "))
    }
}

#[cfg(test)]
mod tests {
    use incident_watch_incident_models::ClassRule;

    use super::*;

    #[test]
    fn placeholders_are_numbered_in_bind_order() {
        let mut params = SqlParams::default();
        assert_eq!(params.bind(1i64), "$1");
        assert_eq!(params.bind("a".to_string()), "$2");
        assert_eq!(params.values().len(), 2);
    }

    #[test]
    fn first_class_has_no_exclusions() {
        let mut params = SqlParams::default();
        let classifier = Classifier {
            rules: vec![ClassRule::new(IncidentClass::Violent, &["fight", "shooting"])],
        };
        let sql = class_predicate(&mut params, &classifier, IncidentClass::Violent);
        assert_eq!(
            sql,
            "((contains(lower(type_name), $1) OR contains(lower(type_name), $2)))"
        );
        assert!(!sql.contains("NOT"));
    }

    #[test]
    fn later_class_excludes_earlier_keywords() {
        let mut params = SqlParams::default();
        let sql = class_predicate(&mut params, &Classifier::default(), IncidentClass::Noise);
        assert!(sql.contains("AND NOT"));
        assert_eq!(
            params.values().len(),
            incident_watch_incident_models::NOISE_KEYWORDS.len()
                + incident_watch_incident_models::VIOLENT_KEYWORDS.len()
        );
    }

    #[test]
    fn missing_class_matches_nothing() {
        let mut params = SqlParams::default();
        let classifier = Classifier { rules: vec![] };
        assert_eq!(
            class_predicate(&mut params, &classifier, IncidentClass::Noise),
            "FALSE"
        );
        assert!(params.values().is_empty());
    }
}
