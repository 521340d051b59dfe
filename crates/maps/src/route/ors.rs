//! OpenRouteService wire types.

use super::types::{
    Isochrone, IsochroneQuery, IsochroneResult, MatrixQuery, MatrixResult, Metric, RangeType,
    RouteResult, RouteStep,
};
use crate::{Coordinate, Error, Result};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// Provider error codes meaning "no path exists".
const ROUTE_NOT_FOUND: u32 = 2009;
const POINT_NOT_FOUND: u32 = 2010;

// ─── Requests ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub(super) struct ApiDirectionsRequest<'a> {
    pub coordinates: &'a [Coordinate],
    pub instructions: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct ApiIsochroneRequest<'a> {
    pub locations: [Coordinate; 1],
    pub range: &'a [f64],
    pub range_type: RangeType,
}

#[derive(Debug, Serialize)]
pub(super) struct ApiMatrixRequest<'a> {
    pub locations: &'a [Coordinate],
    pub metrics: &'a [Metric],
}

// ─── Responses ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "P: Deserialize<'de>"))]
pub(super) struct ApiFeatureCollection<P> {
    #[serde(default)]
    pub features: Vec<ApiFeature<P>>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ApiFeature<P> {
    pub geometry: ApiGeometry,
    pub properties: P,
}

/// Coordinates are kept loose: lines are `[[x, y, z?]]`, polygons
/// `[[[x, y]]]`.
#[derive(Debug, Deserialize)]
pub(super) struct ApiGeometry {
    pub coordinates: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct ApiRouteProperties {
    #[serde(default)]
    pub summary: ApiSummary,
    #[serde(default)]
    pub segments: Vec<ApiSegment>,
}

/// Zero-length routes come back with an empty summary object.
#[derive(Debug, Default, Deserialize)]
pub(super) struct ApiSummary {
    #[serde(default)]
    pub distance: f64,
    #[serde(default)]
    pub duration: f64,
}

#[derive(Debug, Deserialize)]
pub(super) struct ApiSegment {
    #[serde(default)]
    pub steps: Vec<ApiStep>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ApiStep {
    #[serde(default)]
    pub instruction: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub distance: f64,
    #[serde(default)]
    pub duration: f64,
}

#[derive(Debug, Deserialize)]
pub(super) struct ApiIsochroneProperties {
    pub value: f64,
}

#[derive(Debug, Deserialize)]
pub(super) struct ApiMatrix {
    #[serde(default)]
    pub distances: Option<Vec<Vec<Option<f64>>>>,
    #[serde(default)]
    pub durations: Option<Vec<Vec<Option<f64>>>>,
}

/// Error body, either `{"error": {"code", "message"}}` or `{"error": "..."}`.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiErrorDetail {
    Coded {
        code: u32,
        #[serde(default)]
        message: String,
    },
    Text(String),
}

// ─── Conversions ────────────────────────────────────────────────────────────

/// Map a non-2xx response, promoting "no route" codes to `Unreachable` when
/// `routing` is set.
pub(super) fn error_for(status: StatusCode, body: &str, routing: bool) -> Error {
    match serde_json::from_str::<ApiErrorBody>(body).map(|b| b.error) {
        Ok(ApiErrorDetail::Coded { code, message })
            if routing && (code == ROUTE_NOT_FOUND || code == POINT_NOT_FOUND) =>
        {
            Error::Unreachable(message)
        }
        Ok(ApiErrorDetail::Coded { code, message }) => {
            Error::upstream(Some(status.as_u16()), format!("{message} (code {code})"))
        }
        Ok(ApiErrorDetail::Text(message)) => Error::upstream(Some(status.as_u16()), message),
        Err(_) => crate::http::status_error(status, body),
    }
}

fn position(value: &serde_json::Value) -> Result<Coordinate> {
    let pair = value
        .as_array()
        .filter(|a| a.len() >= 2)
        .and_then(|a| Some(Coordinate::new(a[0].as_f64()?, a[1].as_f64()?)));
    pair.ok_or_else(|| Error::malformed("routing", format!("bad position {value}")))
}

fn line(value: &serde_json::Value) -> Result<Vec<Coordinate>> {
    value
        .as_array()
        .ok_or_else(|| Error::malformed("routing", "geometry is not an array"))?
        .iter()
        .map(position)
        .collect()
}

pub(super) fn into_route(
    body: ApiFeatureCollection<ApiRouteProperties>,
    instructions: bool,
) -> Result<RouteResult> {
    let feature = body
        .features
        .into_iter()
        .next()
        .ok_or_else(|| Error::malformed("directions", "no route feature"))?;
    let geometry = line(&feature.geometry.coordinates)?;
    let props = feature.properties;
    let steps = if instructions {
        props
            .segments
            .into_iter()
            .flat_map(|s| s.steps)
            .map(|s| RouteStep {
                instruction: s.instruction,
                name: s.name,
                distance_meters: s.distance,
                duration_seconds: s.duration,
            })
            .collect()
    } else {
        Vec::new()
    };
    Ok(RouteResult {
        distance_meters: props.summary.distance,
        duration_seconds: props.summary.duration,
        geometry,
        steps,
    })
}

/// Pair each requested range value with the feature carrying it.
pub(super) fn into_isochrones(
    body: ApiFeatureCollection<ApiIsochroneProperties>,
    query: &IsochroneQuery,
) -> Result<IsochroneResult> {
    let mut features: Vec<_> = body.features.into_iter().map(Some).collect();
    let mut isochrones = Vec::with_capacity(query.range_values.len());

    for &value in &query.range_values {
        let slot = features
            .iter_mut()
            .find(|f| f.as_ref().is_some_and(|f| same_value(f.properties.value, value)))
            .and_then(Option::take)
            .ok_or_else(|| {
                Error::malformed("isochrones", format!("no polygon for range value {value}"))
            })?;
        let outer = slot
            .geometry
            .coordinates
            .as_array()
            .and_then(|rings| rings.first())
            .ok_or_else(|| Error::malformed("isochrones", "polygon has no ring"))?;
        let mut ring = line(outer)?;
        close_ring(&mut ring);
        isochrones.push(Isochrone { value, ring });
    }

    Ok(IsochroneResult {
        range_type: query.range_type,
        isochrones,
    })
}

fn same_value(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6 * b.abs().max(1.0)
}

fn close_ring(ring: &mut Vec<Coordinate>) {
    if let (Some(&first), Some(&last)) = (ring.first(), ring.last()) {
        if first != last {
            ring.push(first);
        }
    }
}

/// Check shape, force a zero diagonal and drop metrics nobody asked for.
pub(super) fn into_matrix(body: ApiMatrix, query: &MatrixQuery) -> Result<MatrixResult> {
    Ok(MatrixResult {
        distances: table(body.distances, query, Metric::Distance, "distances")?,
        durations: table(body.durations, query, Metric::Duration, "durations")?,
    })
}

type Table = Vec<Vec<Option<f64>>>;

fn table(
    raw: Option<Table>,
    query: &MatrixQuery,
    metric: Metric,
    name: &str,
) -> Result<Option<Table>> {
    if !query.wants(metric) {
        return Ok(None);
    }
    let n = query.locations.len();
    let mut table = raw.ok_or_else(|| Error::malformed("matrix", format!("missing {name}")))?;
    if table.len() != n || table.iter().any(|row| row.len() != n) {
        return Err(Error::malformed("matrix", format!("{name} is not {n}x{n}")));
    }
    for (i, row) in table.iter_mut().enumerate() {
        row[i] = Some(0.0);
    }
    Ok(Some(table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::Profile;
    use serde_json::json;

    #[test]
    fn no_route_codes_become_unreachable() {
        let body = r#"{"error":{"code":2009,"message":"Route could not be found"}}"#;
        let err = error_for(StatusCode::NOT_FOUND, body, true);
        assert!(matches!(err, Error::Unreachable(m) if m == "Route could not be found"));

        let body = r#"{"error":{"code":2010,"message":"Could not find routable point"}}"#;
        assert_eq!(
            error_for(StatusCode::NOT_FOUND, body, true).kind(),
            crate::ErrorKind::Unreachable
        );
    }

    #[test]
    fn other_errors_stay_upstream() {
        let body = r#"{"error":{"code":2004,"message":"Request parameters exceed limits"}}"#;
        let err = error_for(StatusCode::BAD_REQUEST, body, true);
        assert_eq!(err.kind(), crate::ErrorKind::Upstream);
        assert!(err.to_string().contains("code 2004"));

        let body = r#"{"error":"Access to this API has been disallowed"}"#;
        let err = error_for(StatusCode::FORBIDDEN, body, false);
        assert!(matches!(err, Error::Upstream { status: Some(403), .. }));

        let err = error_for(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>", false);
        assert!(matches!(err, Error::Upstream { status: Some(502), .. }));
    }

    #[test]
    fn unreachable_only_for_routing() {
        let body = r#"{"error":{"code":2009,"message":"Route could not be found"}}"#;
        assert_eq!(
            error_for(StatusCode::NOT_FOUND, body, false).kind(),
            crate::ErrorKind::Upstream
        );
    }

    #[test]
    fn route_drops_elevation_and_collects_steps() {
        let body: ApiFeatureCollection<ApiRouteProperties> = serde_json::from_value(json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": {"type": "LineString", "coordinates": [[2.35, 48.85, 35.0], [4.83, 45.76]]},
                "properties": {
                    "summary": {"distance": 465123.4, "duration": 16500.2},
                    "segments": [
                        {"steps": [{"instruction": "Head south", "name": "Rue X", "distance": 100.0, "duration": 20.0}]},
                        {"steps": [{"instruction": "Arrive", "name": "", "distance": 0.0, "duration": 0.0}]}
                    ]
                }
            }]
        }))
        .unwrap();
        let route = into_route(body, true).unwrap();
        assert_eq!(
            route.geometry,
            vec![Coordinate::new(2.35, 48.85), Coordinate::new(4.83, 45.76)]
        );
        assert_eq!(route.steps.len(), 2);
        assert_eq!(route.steps[0].instruction, "Head south");
        assert_eq!(route.distance_meters, 465123.4);
    }

    #[test]
    fn empty_features_are_malformed() {
        let body: ApiFeatureCollection<ApiRouteProperties> =
            serde_json::from_value(json!({"features": []})).unwrap();
        assert_eq!(
            into_route(body, false).unwrap_err().kind(),
            crate::ErrorKind::Upstream
        );
    }

    fn polygon(value: f64, open: bool) -> serde_json::Value {
        let mut ring = vec![json!([2.0, 48.0]), json!([2.1, 48.0]), json!([2.1, 48.1])];
        if !open {
            ring.push(json!([2.0, 48.0]));
        }
        json!({
            "type": "Feature",
            "properties": {"group_index": 0, "value": value, "center": [2.05, 48.05]},
            "geometry": {"type": "Polygon", "coordinates": [ring]}
        })
    }

    #[test]
    fn isochrones_follow_request_order_and_close() {
        // Provider returns largest first.
        let body: ApiFeatureCollection<ApiIsochroneProperties> = serde_json::from_value(json!({
            "features": [polygon(900.0, true), polygon(300.0, false)]
        }))
        .unwrap();
        let query = IsochroneQuery::new(
            Coordinate::new(2.05, 48.05),
            Profile::FootWalking,
            vec![300.0, 900.0],
        );
        let result = into_isochrones(body, &query).unwrap();

        let values: Vec<f64> = result.isochrones.iter().map(|i| i.value).collect();
        assert_eq!(values, vec![300.0, 900.0]);
        for iso in &result.isochrones {
            assert_eq!(iso.ring.first(), iso.ring.last());
            assert_eq!(iso.ring.len(), 4);
        }
    }

    #[test]
    fn missing_isochrone_value_is_malformed() {
        let body: ApiFeatureCollection<ApiIsochroneProperties> =
            serde_json::from_value(json!({"features": [polygon(300.0, false)]})).unwrap();
        let query = IsochroneQuery::new(
            Coordinate::new(2.0, 48.0),
            Profile::FootWalking,
            vec![300.0, 600.0],
        );
        let err = into_isochrones(body, &query).unwrap_err();
        assert!(err.to_string().contains("600"));
    }

    #[test]
    fn isochrone_body_without_features_decodes_empty() {
        let body: ApiFeatureCollection<ApiIsochroneProperties> =
            serde_json::from_value(json!({"type": "FeatureCollection"})).unwrap();
        assert!(body.features.is_empty());

        let query = IsochroneQuery::new(
            Coordinate::new(2.0, 48.0),
            Profile::DrivingCar,
            vec![300.0],
        );
        let err = into_isochrones(body, &query).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Upstream);
    }

    #[test]
    fn matrix_diagonal_forced_and_shape_checked() {
        let locations = vec![Coordinate::new(2.0, 48.0), Coordinate::new(4.0, 45.0)];
        let query = MatrixQuery::new(locations.clone(), Profile::DrivingCar)
            .with_metrics(vec![Metric::Distance]);
        let body: ApiMatrix = serde_json::from_value(json!({
            "distances": [[0.4, 465000.0], [null, 0.0]],
            "durations": [[0.0, 16500.0], [16400.0, 0.0]]
        }))
        .unwrap();
        let result = into_matrix(body, &query).unwrap();
        let distances = result.distances.unwrap();
        assert_eq!(distances[0][0], Some(0.0));
        assert_eq!(distances[1][0], None);
        assert!(result.durations.is_none());

        let body: ApiMatrix =
            serde_json::from_value(json!({"distances": [[0.0, 1.0]]})).unwrap();
        assert!(into_matrix(body, &query).is_err());

        let both = MatrixQuery::new(locations, Profile::DrivingCar);
        let body: ApiMatrix =
            serde_json::from_value(json!({"distances": [[0.0, 1.0], [1.0, 0.0]]})).unwrap();
        let err = into_matrix(body, &both).unwrap_err();
        assert!(err.to_string().contains("missing durations"));
    }
}
