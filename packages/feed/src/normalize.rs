//! Snapshot normalization.
//!
//! Accepts either a bare JSON array of attribute objects or an `ArcGIS`
//! query response, whose `{ "attributes": {...}, "geometry": {...} }`
//! features are flattened to their attributes.

use incident_watch_incident_models::Incident;
use serde_json::{Map, Value};

use crate::parsing::{parse_timestamp_value, text_value};
use crate::{FeedError, FieldMapping};

/// Fallback type name for records that carry neither a name nor a code.
const UNKNOWN_TYPE: &str = "UNKNOWN";

/// Parses a raw feed payload into incidents, in arrival order.
///
/// Records that cannot be keyed (no identifier or no interpretable receipt
/// time) are skipped with a warning rather than failing the snapshot.
///
/// # Errors
///
/// Returns [`FeedError::Parse`] if the payload is not JSON or is JSON of an
/// unsupported shape.
pub fn normalize(payload: &str, mapping: &FieldMapping) -> Result<Vec<Incident>, FeedError> {
    let value: Value = serde_json::from_str(payload).map_err(|e| FeedError::Parse {
        message: format!("invalid JSON: {e}"),
    })?;

    normalize_value(&value, mapping)
}

/// Same as [`normalize`] for an already-parsed JSON value.
///
/// # Errors
///
/// Returns [`FeedError::Parse`] if the value is of an unsupported shape.
pub fn normalize_value(value: &Value, mapping: &FieldMapping) -> Result<Vec<Incident>, FeedError> {
    let records = records(value)?;
    let total = records.len();

    let incidents: Vec<Incident> = records
        .into_iter()
        .filter_map(|record| {
            let incident = normalize_record(record, mapping);
            if incident.is_none() {
                log::warn!(
                    "Skipping feed record without usable {:?}/{:?}: {}",
                    mapping.id,
                    mapping.received_at,
                    Value::Object(record.clone()),
                );
            }
            incident
        })
        .collect();

    if incidents.len() < total {
        log::info!(
            "Normalized {} of {total} feed records ({} skipped)",
            incidents.len(),
            total - incidents.len(),
        );
    }

    Ok(incidents)
}

/// Extracts the list of attribute objects from the payload.
fn records(value: &Value) -> Result<Vec<&Map<String, Value>>, FeedError> {
    if let Some(items) = value.as_array() {
        return Ok(items.iter().filter_map(as_record).collect());
    }

    if let Some(features) = value.get("features").and_then(Value::as_array) {
        return Ok(features
            .iter()
            .filter_map(|feature| feature.get("attributes"))
            .filter_map(as_record)
            .collect());
    }

    if let Some(error) = value.get("error") {
        return Err(FeedError::Parse {
            message: format!("feed returned an error object: {error}"),
        });
    }

    Err(FeedError::Parse {
        message: "expected an array of records or an object with \"features\"".to_string(),
    })
}

fn as_record(value: &Value) -> Option<&Map<String, Value>> {
    let record = value.as_object();
    if record.is_none() {
        log::warn!("Skipping non-object feed record: {value}");
    }
    record
}

fn normalize_record(record: &Map<String, Value>, mapping: &FieldMapping) -> Option<Incident> {
    let id = text_value(record.get(&mapping.id))?;
    let received_at = record
        .get(&mapping.received_at)
        .and_then(parse_timestamp_value)?;

    let type_code = text_value(record.get(&mapping.type_code)).unwrap_or_default();
    let type_name = text_value(record.get(&mapping.type_name))
        .or_else(|| (!type_code.is_empty()).then(|| type_code.clone()))
        .unwrap_or_else(|| UNKNOWN_TYPE.to_string());

    Some(Incident {
        id,
        type_code,
        type_name,
        location: text_value(record.get(&mapping.location)),
        location_description: text_value(record.get(&mapping.location_description)),
        city: text_value(record.get(&mapping.city)),
        received_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping() -> FieldMapping {
        FieldMapping::default()
    }

    #[test]
    fn normalizes_bare_array() {
        let payload = r#"[
            {
                "IncidentID": 101,
                "IncidentTypeCode": "73",
                "IncidentTypeName": "FIGHT/ASSAULT",
                "Location": "2600 8TH AVE S",
                "LocationDescription": "GAS STATION",
                "CityName": "NASHVILLE",
                "CallReceivedTime": 1705329000000
            }
        ]"#;

        let incidents = normalize(payload, &mapping()).unwrap();
        assert_eq!(incidents.len(), 1);
        let incident = &incidents[0];
        assert_eq!(incident.id, "101");
        assert_eq!(incident.type_code, "73");
        assert_eq!(incident.type_name, "FIGHT/ASSAULT");
        assert_eq!(incident.location.as_deref(), Some("2600 8TH AVE S"));
        assert_eq!(incident.city.as_deref(), Some("NASHVILLE"));
        assert_eq!(incident.received_at.timestamp(), 1_705_329_000);
    }

    #[test]
    fn flattens_arcgis_features() {
        let payload = r#"{
            "features": [
                {"attributes": {"IncidentID": "A1", "IncidentTypeName": "SHOOTING", "CallReceivedTime": 1705329000000}, "geometry": {"x": 1, "y": 2}},
                {"attributes": {"IncidentID": "A2", "IncidentTypeName": "WIRES DOWN", "CallReceivedTime": 1705329060000}}
            ]
        }"#;

        let incidents = normalize(payload, &mapping()).unwrap();
        let ids: Vec<&str> = incidents.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["A1", "A2"]);
    }

    #[test]
    fn tolerates_missing_optional_fields() {
        let payload = r#"[{"IncidentID": 7, "IncidentTypeName": "ALARM", "CallReceivedTime": 1705329000000, "Location": "", "CityName": null}]"#;

        let incidents = normalize(payload, &mapping()).unwrap();
        let incident = &incidents[0];
        assert_eq!(incident.type_code, "");
        assert_eq!(incident.location, None);
        assert_eq!(incident.location_description, None);
        assert_eq!(incident.city, None);
    }

    #[test]
    fn falls_back_to_type_code_for_name() {
        let payload = r#"[{"IncidentID": 7, "IncidentTypeCode": "52P", "CallReceivedTime": 1705329000000}]"#;
        let incidents = normalize(payload, &mapping()).unwrap();
        assert_eq!(incidents[0].type_name, "52P");
    }

    #[test]
    fn skips_unkeyable_records() {
        let payload = r#"[
            {"IncidentTypeName": "NO ID", "CallReceivedTime": 1705329000000},
            {"IncidentID": 2, "IncidentTypeName": "NO TIME"},
            "not an object",
            {"IncidentID": 3, "IncidentTypeName": "OK", "CallReceivedTime": "2024-01-15T14:30:00Z"}
        ]"#;

        let incidents = normalize(payload, &mapping()).unwrap();
        assert_eq!(incidents.len(), 1);
        assert_eq!(incidents[0].id, "3");
    }

    #[test]
    fn preserves_arrival_order() {
        let payload = r#"[
            {"IncidentID": 3, "CallReceivedTime": 3000},
            {"IncidentID": 1, "CallReceivedTime": 1000},
            {"IncidentID": 2, "CallReceivedTime": 2000}
        ]"#;
        let ids: Vec<String> = normalize(payload, &mapping())
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec!["3", "1", "2"]);
    }

    #[test]
    fn rejects_malformed_payload() {
        assert!(matches!(
            normalize("<html>oops</html>", &mapping()),
            Err(FeedError::Parse { .. })
        ));
        assert!(matches!(
            normalize(r#"{"unexpected": true}"#, &mapping()),
            Err(FeedError::Parse { .. })
        ));
        assert!(matches!(
            normalize(r#"{"error": {"code": 400}}"#, &mapping()),
            Err(FeedError::Parse { .. })
        ));
    }

    #[test]
    fn custom_field_mapping() {
        let mapping = FieldMapping {
            id: "event_id".to_string(),
            type_name: "nature".to_string(),
            received_at: "received".to_string(),
            ..FieldMapping::default()
        };
        let payload = r#"[{"event_id": "x9", "nature": "ROBBERY", "received": "2024-01-15T14:30:00"}]"#;
        let incidents = normalize(payload, &mapping).unwrap();
        assert_eq!(incidents[0].id, "x9");
        assert_eq!(incidents[0].type_name, "ROBBERY");
    }
}
