//! Tool contract: the six operations as named, schema-described tools.
//!
//! [`Toolbox`] is what an agent or protocol server talks to. It takes a tool
//! name and raw JSON arguments, checks the arguments against the operation's
//! input type, runs the operation and hands back JSON.

use crate::geo::{
    GeoLookupServer, GeocodeQuery, GeocodeResults, PoiQuery, PoiResults, ReverseGeocodeQuery,
};
use crate::route::{IsochroneQuery, MatrixQuery, RouteQuery, RouteServer};
use crate::{AddressResult, Error, ErrorKind, IsochroneResult, MatrixResult, RouteResult};
use schemars::{JsonSchema, schema_for};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// One of the six map operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ForwardGeocode,
    ReverseGeocode,
    PoiSearch,
    Route,
    Isochrone,
    Matrix,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Self::ForwardGeocode,
        Self::ReverseGeocode,
        Self::PoiSearch,
        Self::Route,
        Self::Isochrone,
        Self::Matrix,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::ForwardGeocode => "forward_geocode",
            Self::ReverseGeocode => "reverse_geocode",
            Self::PoiSearch => "poi_search",
            Self::Route => "route",
            Self::Isochrone => "isochrone",
            Self::Matrix => "matrix",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::ForwardGeocode => {
                "Find the coordinates of an address or place name. Returns candidate \
                 places, most relevant first, each with latitude and longitude."
            }
            Self::ReverseGeocode => {
                "Find the address at a latitude/longitude. Fails with not_found over \
                 open water or where no address exists."
            }
            Self::PoiSearch => {
                "Find points of interest (restaurants, pharmacies, museums, parks...) \
                 within a radius of a latitude/longitude, nearest first."
            }
            Self::Route => {
                "Compute a route through two or more [longitude, latitude] waypoints. \
                 Returns distance in meters, duration in seconds and the route line."
            }
            Self::Isochrone => {
                "Compute areas reachable from a [longitude, latitude] point within \
                 given times (seconds) or distances (meters)."
            }
            Self::Matrix => {
                "Compute travel distances and/or durations between every pair of \
                 [longitude, latitude] locations."
            }
        }
    }

    pub fn spec(&self) -> ToolSpec {
        let (input_schema, output_schema) = match self {
            Self::ForwardGeocode => schemas::<GeocodeQuery, GeocodeResults>(),
            Self::ReverseGeocode => schemas::<ReverseGeocodeQuery, AddressResult>(),
            Self::PoiSearch => schemas::<PoiQuery, PoiResults>(),
            Self::Route => schemas::<RouteQuery, RouteResult>(),
            Self::Isochrone => schemas::<IsochroneQuery, IsochroneResult>(),
            Self::Matrix => schemas::<MatrixQuery, MatrixResult>(),
        };
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema,
            output_schema,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn schemas<I: JsonSchema, O: JsonSchema>() -> (Value, Value) {
    (schema_value::<I>(), schema_value::<O>())
}

fn schema_value<T: JsonSchema>() -> Value {
    let mut value = schema_for!(T).to_value();
    if let Some(map) = value.as_object_mut() {
        map.remove("$schema");
    }
    value
}

/// Name, description and JSON schemas of one tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub output_schema: Value,
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error(transparent)]
    Failed(#[from] Error),

    #[error("failed to encode tool output: {0}")]
    Encode(#[source] serde_json::Error),
}

impl ToolError {
    /// Kind string surfaced to the agent.
    pub fn kind(&self) -> String {
        match self {
            Self::UnknownTool(_) => "unknown_tool".to_string(),
            Self::Failed(e) => e.kind().to_string(),
            Self::Encode(_) => ErrorKind::Upstream.to_string(),
        }
    }

    /// `{"error": {"kind": ..., "message": ...}}`
    pub fn to_json(&self) -> Value {
        json!({
            "error": {
                "kind": self.kind(),
                "message": self.to_string(),
            }
        })
    }
}

/// Both servers behind one name-based dispatch.
#[derive(Debug, Clone)]
pub struct Toolbox {
    geo: Arc<GeoLookupServer>,
    route: Arc<RouteServer>,
}

impl Toolbox {
    pub fn new(geo: Arc<GeoLookupServer>, route: Arc<RouteServer>) -> Self {
        Self { geo, route }
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        Operation::ALL.iter().map(Operation::spec).collect()
    }

    /// Run the named tool with JSON arguments.
    pub async fn call(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        let op = Operation::from_name(name).ok_or_else(|| ToolError::UnknownTool(name.into()))?;
        debug!(tool = %op, "tool call");
        let result = self.dispatch(op, args).await;
        if let Err(e) = &result {
            warn!(tool = %op, kind = %e.kind(), error = %e, "tool failed");
        }
        result
    }

    async fn dispatch(&self, op: Operation, args: Value) -> Result<Value, ToolError> {
        match op {
            Operation::ForwardGeocode => {
                let results = self.geo.forward_geocode(&parse(args)?).await?;
                encode(&GeocodeResults { results })
            }
            Operation::ReverseGeocode => encode(&self.geo.reverse_geocode(&parse(args)?).await?),
            Operation::PoiSearch => {
                let results = self.geo.poi_search(&parse(args)?).await?;
                encode(&PoiResults { results })
            }
            Operation::Route => encode(&self.route.route(&parse(args)?).await?),
            Operation::Isochrone => encode(&self.route.isochrone(&parse(args)?).await?),
            Operation::Matrix => encode(&self.route.matrix(&parse(args)?).await?),
        }
    }
}

/// Argument shape errors are validation failures.
fn parse<T: DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    // Models sometimes send `null` for a tool without required fields.
    let args = if args.is_null() { json!({}) } else { args };
    serde_json::from_value(args)
        .map_err(|e| ToolError::Failed(Error::validation("arguments", e.to_string())))
}

fn encode<T: Serialize>(output: &T) -> Result<Value, ToolError> {
    serde_json::to_value(output).map_err(ToolError::Encode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ServerParams;

    fn toolbox() -> Toolbox {
        let geo = GeoLookupServer::new(ServerParams::nominatim(), crate::DEFAULT_OVERPASS_URL)
            .unwrap();
        let route = RouteServer::new(ServerParams::openrouteservice()).unwrap();
        Toolbox::new(Arc::new(geo), Arc::new(route))
    }

    #[test]
    fn names_round_trip() {
        for op in Operation::ALL {
            assert_eq!(Operation::from_name(op.name()), Some(op));
        }
        assert_eq!(Operation::from_name("osm_geocode"), None);
    }

    #[test]
    fn specs_describe_inputs() {
        let specs = toolbox().specs();
        assert_eq!(specs.len(), 6);

        let reverse = specs.iter().find(|s| s.name == "reverse_geocode").unwrap();
        assert_eq!(reverse.input_schema["type"], "object");
        let props = reverse.input_schema["properties"].as_object().unwrap();
        assert!(props.contains_key("latitude"));
        assert!(props.contains_key("zoom"));
        let required = reverse.input_schema["required"].as_array().unwrap();
        assert!(required.contains(&json!("latitude")));
        assert!(!required.contains(&json!("zoom")));
        assert!(reverse.input_schema.get("$schema").is_none());

        let route = specs.iter().find(|s| s.name == "route").unwrap();
        assert!(route.input_schema.to_string().contains("driving-car"));
    }

    #[tokio::test]
    async fn unknown_tool_rejected() {
        let err = toolbox().call("teleport", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(ref n) if n == "teleport"));
        assert_eq!(err.to_json()["error"]["kind"], "unknown_tool");
    }

    #[tokio::test]
    async fn bad_arguments_are_validation() {
        let err = toolbox()
            .call("route", json!({"coordinates": "Paris to Lyon"}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation");

        let err = toolbox()
            .call("reverse_geocode", json!({"latitude": 95.0, "longitude": 0.0}))
            .await
            .unwrap_err();
        let json = err.to_json();
        assert_eq!(json["error"]["kind"], "validation");
        assert!(json["error"]["message"].as_str().unwrap().contains("latitude"));
    }
}
