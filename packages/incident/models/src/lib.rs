#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Feed-observed incident type and the keyword classification table.
//!
//! Every feed record is normalized into an [`Incident`]. Classification of
//! incident type names into coarse [`IncidentClass`]es is driven by a single
//! declarative [`Classifier`] table so that every consumer (store queries,
//! reports, notifications) agrees on what counts as "violent".
//!
//! Keyword classification is a heuristic. It matches substrings of the
//! upstream type name and will produce false positives and negatives; it is
//! not an authoritative offense taxonomy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A single incident as reported by one poll of the feed.
///
/// `id` is unique within one poll but may be recycled upstream, so the
/// `(id, received_at)` pair is what identifies an occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    /// Upstream identifier, normalized to a string.
    pub id: String,
    /// Short type code. May be empty.
    pub type_code: String,
    /// Human-readable type name (e.g. `"FIGHT/ASSAULT"`).
    pub type_name: String,
    /// Free-text location (usually a block address or intersection).
    pub location: Option<String>,
    /// Free-text location description (business name, landmark).
    pub location_description: Option<String>,
    /// City name.
    pub city: Option<String>,
    /// When the incident was logged upstream.
    pub received_at: DateTime<Utc>,
}

impl Incident {
    /// Returns the `(id, received_at)` dedup key for this occurrence.
    #[must_use]
    pub fn occurrence_key(&self) -> (&str, i64) {
        (&self.id, self.received_at.timestamp())
    }
}

/// Coarse classification buckets derived from type names.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum IncidentClass {
    /// Crimes against persons (shootings, assaults, robberies, ...).
    Violent,
    /// Weather and utility hazards that would otherwise dominate crime
    /// reports (downed wires, storm damage, ...).
    Noise,
}

/// One row of the classification table: every type name containing any of
/// `keywords` (case-insensitive) belongs to `class`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRule {
    /// Class assigned on a match.
    pub class: IncidentClass,
    /// Lowercase substrings to look for in the type name.
    pub keywords: Vec<String>,
}

impl ClassRule {
    /// Creates a rule, lowercasing the keywords.
    #[must_use]
    pub fn new(class: IncidentClass, keywords: &[&str]) -> Self {
        Self {
            class,
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    /// Returns `true` if `type_name` contains any keyword of this rule.
    #[must_use]
    pub fn matches(&self, type_name: &str) -> bool {
        let lower = type_name.to_lowercase();
        contains_any(&lower, &self.keywords)
    }
}

/// Keywords that mark a type name as violent.
pub const VIOLENT_KEYWORDS: &[&str] = &[
    "shooting",
    "stabbing",
    "assault",
    "fight",
    "robbery",
    "homicide",
    "carjacking",
];

/// Keywords that mark a type name as a weather or utility hazard.
pub const NOISE_KEYWORDS: &[&str] = &[
    "wires down",
    "wire down",
    "tree down",
    "storm",
    "flood",
    "power line",
    "utility",
    "hazard",
];

/// Declarative `(class, keyword-set)` classification table.
///
/// Rules are evaluated in order and the first match wins, so a type name
/// matching both a violent and a noise keyword is classified by whichever
/// rule comes first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classifier {
    /// Ordered classification rules.
    pub rules: Vec<ClassRule>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            rules: vec![
                ClassRule::new(IncidentClass::Violent, VIOLENT_KEYWORDS),
                ClassRule::new(IncidentClass::Noise, NOISE_KEYWORDS),
            ],
        }
    }
}

impl Classifier {
    /// Returns the class of `type_name`, or `None` if no rule matches.
    #[must_use]
    pub fn classify(&self, type_name: &str) -> Option<IncidentClass> {
        let lower = type_name.to_lowercase();
        self.rules
            .iter()
            .find(|rule| contains_any(&lower, &rule.keywords))
            .map(|rule| rule.class)
    }

    /// Returns `true` if `type_name` classifies as [`IncidentClass::Violent`].
    #[must_use]
    pub fn is_violent(&self, type_name: &str) -> bool {
        self.classify(type_name) == Some(IncidentClass::Violent)
    }

    /// Returns `true` if `type_name` classifies as [`IncidentClass::Noise`].
    #[must_use]
    pub fn is_noise(&self, type_name: &str) -> bool {
        self.classify(type_name) == Some(IncidentClass::Noise)
    }

    /// Returns one `(own, excluded)` term per rule of `class`, where `own`
    /// are that rule's keywords and `excluded` are the keywords of every
    /// other-class rule ordered before it.
    ///
    /// A type name belongs to `class` iff some term has an `own` keyword
    /// match and no `excluded` keyword match. SQL predicates are built from
    /// these terms so queries honor first-match-wins exactly like
    /// [`Self::classify`].
    #[must_use]
    pub fn precedence_terms(&self, class: IncidentClass) -> Vec<(Vec<&str>, Vec<&str>)> {
        let mut terms = Vec::new();
        let mut excluded: Vec<&str> = Vec::new();

        for rule in &self.rules {
            let keywords = rule.keywords.iter().map(String::as_str);
            if rule.class == class {
                terms.push((keywords.collect(), excluded.clone()));
            } else {
                excluded.extend(keywords);
            }
        }

        terms
    }
}

/// Checks if `haystack` contains any of the given `needles`.
fn contains_any<S: AsRef<str>>(haystack: &str, needles: &[S]) -> bool {
    needles
        .iter()
        .any(|needle| haystack.contains(&needle.as_ref().to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_violent_types() {
        let classifier = Classifier::default();
        assert!(classifier.is_violent("FIGHT/ASSAULT"));
        assert!(classifier.is_violent("Shooting"));
        assert!(classifier.is_violent("ROBBERY IN PROGRESS"));
        assert!(classifier.is_violent("CARJACKING"));
    }

    #[test]
    fn wires_down_is_noise_not_violent() {
        let classifier = Classifier::default();
        assert!(!classifier.is_violent("WIRES DOWN"));
        assert!(classifier.is_noise("WIRES DOWN"));
    }

    #[test]
    fn unmatched_type_has_no_class() {
        let classifier = Classifier::default();
        assert_eq!(classifier.classify("SUSPICIOUS PERSON"), None);
        assert_eq!(classifier.classify(""), None);
    }

    #[test]
    fn first_matching_rule_wins() {
        let classifier = Classifier {
            rules: vec![
                ClassRule::new(IncidentClass::Noise, &["storm"]),
                ClassRule::new(IncidentClass::Violent, &["fight", "storm"]),
            ],
        };
        assert_eq!(
            classifier.classify("STORM FIGHT"),
            Some(IncidentClass::Noise)
        );

        let terms = classifier.precedence_terms(IncidentClass::Violent);
        assert_eq!(terms, vec![(vec!["fight", "storm"], vec!["storm"])]);
    }

    #[test]
    fn rule_keywords_are_lowercased() {
        let rule = ClassRule::new(IncidentClass::Violent, &["HOMICIDE"]);
        assert_eq!(rule.keywords, vec!["homicide".to_string()]);
        assert!(rule.matches("Homicide Investigation"));
    }

    #[test]
    fn classifier_deserializes_from_json() {
        let json = r#"{"rules":[{"class":"VIOLENT","keywords":["Shots Fired"]}]}"#;
        let classifier: Classifier = serde_json::from_str(json).unwrap();
        assert!(classifier.is_violent("SHOTS FIRED"));
    }

    #[test]
    fn class_names_round_trip_through_strum() {
        assert_eq!(IncidentClass::Violent.as_ref(), "VIOLENT");
        assert_eq!("NOISE".parse::<IncidentClass>().unwrap(), IncidentClass::Noise);
    }
}
