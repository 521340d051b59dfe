//! Overpass QL query construction and response parsing.

use super::types::{PoiQuery, PoiResult};
use crate::{Coordinate, Error, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::warn;

/// Tags whose value is matched against the query text, in category priority.
pub(super) const CATEGORY_TAGS: [&str; 4] = ["amenity", "shop", "tourism", "leisure"];

/// Server-side cap on returned elements.
///
/// Overpass applies it in id order, not by distance. When more elements
/// match, the ones sent back are an arbitrary subset and the nearest
/// places may be missing from it. A smaller radius avoids that.
const MAX_ELEMENTS: usize = 500;

/// Build the QL program for a POI search.
pub(super) fn build_query(query: &PoiQuery, timeout: Duration) -> String {
    let pattern = ql_string(&regex_escape(query.query.trim()));
    let around = format!(
        "(around:{},{},{})",
        query.radius_meters, query.latitude, query.longitude
    );
    let mut ql = format!("[out:json][timeout:{}];\n(\n", timeout.as_secs().max(1));
    for tag in CATEGORY_TAGS {
        ql.push_str(&format!("  nwr[\"{tag}\"~\"{pattern}\",i]{around};\n"));
    }
    ql.push_str(&format!(");\nout center {MAX_ELEMENTS};\n"));
    ql
}

/// Escape regex metacharacters so the query text matches literally.
fn regex_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if "\\.+*?()|[]{}^$".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape for a double-quoted QL string literal.
fn ql_string(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

// ─── Responses ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(super) struct ApiResponse {
    #[serde(default)]
    pub elements: Vec<ApiElement>,
    /// Set when the server hit a runtime error (timeout, memory) mid-query.
    #[serde(default)]
    pub remark: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ApiElement {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub center: Option<ApiCenter>,
    #[serde(default)]
    pub tags: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ApiCenter {
    pub lat: f64,
    pub lon: f64,
}

impl ApiElement {
    /// Node position, or the computed center for ways and relations.
    fn position(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lon, &self.center) {
            (Some(lat), Some(lon), _) => Some((lat, lon)),
            (_, _, Some(c)) => Some((c.lat, c.lon)),
            _ => None,
        }
    }
}

/// Turn the raw elements into results nearest-first, truncated to `limit`.
pub(super) fn into_results(response: ApiResponse, query: &PoiQuery) -> Result<Vec<PoiResult>> {
    if let Some(remark) = response.remark.as_deref().filter(|r| r.contains("runtime error")) {
        return Err(Error::upstream(None, remark));
    }

    if response.elements.len() >= MAX_ELEMENTS {
        warn!(
            cap = MAX_ELEMENTS,
            radius_meters = query.radius_meters,
            "overpass element cap reached; nearest places may be missing"
        );
    }

    let center = Coordinate::new(query.longitude, query.latitude);
    let mut results: Vec<PoiResult> = response
        .elements
        .into_iter()
        .filter_map(|element| {
            let (lat, lon) = element.position()?;
            let tags: BTreeMap<String, String> = element
                .tags
                .into_iter()
                .map(|(k, v)| match v {
                    Value::String(s) => (k, s),
                    other => (k, other.to_string()),
                })
                .collect();
            let category = CATEGORY_TAGS
                .iter()
                .find_map(|t| tags.get(*t).cloned())
                .unwrap_or_else(|| "unknown".to_string());
            let name = tags
                .get("name")
                .cloned()
                .unwrap_or_else(|| "Unnamed".to_string());
            Some(PoiResult {
                name,
                latitude: lat,
                longitude: lon,
                category,
                distance_meters: center.distance_to(&Coordinate::new(lon, lat)),
                tags,
            })
        })
        .collect();

    results.sort_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters));
    results.truncate(query.limit as usize);
    Ok(results)
}
