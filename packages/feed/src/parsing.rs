//! Timestamp and scalar parsing shared by the normalizer.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

/// Parses an ISO-8601 datetime string.
///
/// Accepts RFC 3339 with an offset, or a naive `YYYY-MM-DDTHH:MM:SS` with
/// optional fractional seconds (interpreted as UTC).
#[must_use]
pub fn parse_iso_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

/// Converts epoch milliseconds (the `ArcGIS` date convention) to UTC.
#[must_use]
pub fn from_epoch_millis(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}

/// Interprets a JSON value as a receipt timestamp.
///
/// Numbers (and numeric strings) are epoch milliseconds; other strings are
/// parsed as ISO-8601.
#[must_use]
pub fn parse_timestamp_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| {
                #[allow(clippy::cast_possible_truncation)]
                n.as_f64().map(|f| f as i64)
            })
            .and_then(from_epoch_millis),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(from_epoch_millis)
            .or_else(|| parse_iso_date(s)),
        _ => None,
    }
}

/// Interprets a JSON value as optional text.
///
/// Blank strings and nulls become `None`; numbers and booleans are
/// stringified.
#[must_use]
pub fn text_value(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_iso_date_with_fractional() {
        let dt = parse_iso_date("2024-01-15T14:30:00.000").unwrap();
        assert_eq!(dt.to_string(), "2024-01-15 14:30:00 UTC");
    }

    #[test]
    fn parses_rfc3339_with_offset() {
        let dt = parse_iso_date("2024-01-15T08:30:00-06:00").unwrap();
        assert_eq!(dt.to_string(), "2024-01-15 14:30:00 UTC");
    }

    #[test]
    fn rejects_invalid_date() {
        assert!(parse_iso_date("not-a-date").is_none());
    }

    #[test]
    fn numbers_are_epoch_millis() {
        let dt = parse_timestamp_value(&serde_json::json!(1_705_329_000_000_i64)).unwrap();
        assert_eq!(dt.to_string(), "2024-01-15 14:30:00 UTC");

        let dt = parse_timestamp_value(&serde_json::json!("1705329000000")).unwrap();
        assert_eq!(dt.timestamp(), 1_705_329_000);
    }

    #[test]
    fn blank_text_is_none() {
        assert_eq!(text_value(Some(&serde_json::json!("   "))), None);
        assert_eq!(text_value(Some(&Value::Null)), None);
        assert_eq!(text_value(None), None);
        assert_eq!(
            text_value(Some(&serde_json::json!(" NASHVILLE "))),
            Some("NASHVILLE".to_string())
        );
        assert_eq!(text_value(Some(&serde_json::json!(42))), Some("42".to_string()));
    }
}
