//! Nominatim `jsonv2` wire types.

use super::types::{AddressResult, GeocodeResult};
use crate::{Error, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

// ─── Responses ──────────────────────────────────────────────────────────────

/// One place as returned by `/search` and `/reverse`.
///
/// Nominatim sends coordinates and bounding boxes as strings.
#[derive(Debug, Deserialize)]
pub(super) struct ApiPlace {
    #[serde(default)]
    pub display_name: String,
    pub lat: String,
    pub lon: String,
    #[serde(default)]
    pub boundingbox: Option<Vec<String>>,
    #[serde(default)]
    pub importance: Option<f64>,
    #[serde(default)]
    pub address: BTreeMap<String, Value>,
}

/// `/reverse` answers either a place or an error object (open water, no data).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum ApiReverse {
    Miss { error: Value },
    Hit(ApiPlace),
}

// ─── Conversions ────────────────────────────────────────────────────────────

impl ApiPlace {
    pub fn into_geocode(self) -> Result<GeocodeResult> {
        Ok(GeocodeResult {
            latitude: parse_degrees("lat", &self.lat)?,
            longitude: parse_degrees("lon", &self.lon)?,
            bounding_box: parse_bbox(self.boundingbox.as_deref()),
            importance: self.importance,
            address: flatten(self.address),
            display_name: self.display_name,
        })
    }

    pub fn into_address(self) -> AddressResult {
        AddressResult {
            bounding_box: parse_bbox(self.boundingbox.as_deref()),
            address_components: flatten(self.address),
            display_name: self.display_name,
        }
    }
}

/// Human-readable text of a reverse-geocoding miss.
pub(super) fn miss_message(error: &Value) -> String {
    match error {
        Value::String(s) => s.clone(),
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string()),
        other => other.to_string(),
    }
}

fn parse_degrees(field: &str, raw: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| Error::malformed("geocoding", format!("{field} is not a number: {raw:?}")))
}

/// The box is optional: anything but four numbers is dropped.
fn parse_bbox(raw: Option<&[String]>) -> Option<[f64; 4]> {
    let raw = raw?;
    if raw.len() != 4 {
        debug!(values = raw.len(), "ignoring bounding box");
        return None;
    }
    let mut bbox = [0.0; 4];
    for (slot, value) in bbox.iter_mut().zip(raw) {
        match value.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => *slot = v,
            _ => {
                debug!(value = %value, "ignoring bounding box");
                return None;
            }
        }
    }
    Some(bbox)
}

/// Address parts are almost always strings; anything else is stringified.
fn flatten(address: BTreeMap<String, Value>) -> BTreeMap<String, String> {
    address
        .into_iter()
        .filter_map(|(k, v)| match v {
            Value::String(s) => Some((k, s)),
            Value::Null => None,
            other => Some((k, other.to_string())),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn eiffel() -> Value {
        json!({
            "place_id": 88066702,
            "lat": "48.8582599",
            "lon": "2.2945006",
            "display_name": "Tour Eiffel, 5, Avenue Anatole France, Paris, France",
            "boundingbox": ["48.8574753", "48.8590465", "2.2933084", "2.2956897"],
            "importance": 0.6205937724353116,
            "address": {
                "tourism": "Tour Eiffel",
                "house_number": "5",
                "city": "Paris",
                "postcode": "75007",
                "country": "France",
                "country_code": "fr"
            }
        })
    }

    #[test]
    fn place_converts_strings_to_numbers() {
        let place: ApiPlace = serde_json::from_value(eiffel()).unwrap();
        let result = place.into_geocode().unwrap();
        assert!((result.latitude - 48.85826).abs() < 1e-4);
        assert!((result.longitude - 2.2945).abs() < 1e-4);
        assert_eq!(
            result.bounding_box,
            Some([48.8574753, 48.8590465, 2.2933084, 2.2956897])
        );
        assert_eq!(result.address.get("city").map(String::as_str), Some("Paris"));
    }

    #[test]
    fn reverse_error_body_is_a_miss() {
        let body: ApiReverse =
            serde_json::from_value(json!({"error": "Unable to geocode"})).unwrap();
        match body {
            ApiReverse::Miss { error } => assert_eq!(miss_message(&error), "Unable to geocode"),
            ApiReverse::Hit(_) => panic!("error body parsed as a place"),
        }
    }

    #[test]
    fn reverse_place_is_a_hit() {
        let body: ApiReverse = serde_json::from_value(eiffel()).unwrap();
        let ApiReverse::Hit(place) = body else {
            panic!("place parsed as a miss");
        };
        let address = place.into_address();
        assert_eq!(
            address.address_components.get("postcode").map(String::as_str),
            Some("75007")
        );
    }

    #[test]
    fn bad_coordinate_is_malformed() {
        let mut raw = eiffel();
        raw["lat"] = json!("north-ish");
        let place: ApiPlace = serde_json::from_value(raw).unwrap();
        let err = place.into_geocode().unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Upstream);
    }

    #[test]
    fn short_bbox_is_dropped() {
        let mut raw = eiffel();
        raw["boundingbox"] = json!(["48.85", "48.86"]);
        let place: ApiPlace = serde_json::from_value(raw).unwrap();
        let result = place.into_geocode().unwrap();
        assert_eq!(result.bounding_box, None);
        assert!((result.latitude - 48.85826).abs() < 1e-4);
    }

    #[test]
    fn unparseable_bbox_is_dropped() {
        let raw = ["1", "2", "east", "4"].map(String::from);
        assert_eq!(parse_bbox(Some(&raw)), None);
        assert_eq!(parse_bbox(None), None);
    }
}
