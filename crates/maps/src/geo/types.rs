//! Geocoding and POI query/result records.

use crate::coordinate::{check_latitude, check_limit, check_longitude, check_positive, check_text};
use crate::{Error, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const MAX_GEOCODE_LIMIT: u32 = 40;
pub const MAX_POI_LIMIT: u32 = 100;
pub const MAX_POI_RADIUS_M: f64 = 50_000.0;
pub const MAX_ZOOM: u8 = 18;

fn default_geocode_limit() -> u32 {
    5
}

fn default_zoom() -> u8 {
    MAX_ZOOM
}

fn default_poi_limit() -> u32 {
    20
}

fn default_radius() -> f64 {
    1000.0
}

/// Free-text place lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GeocodeQuery {
    /// Address or place name to geocode, e.g. "Eiffel Tower, Paris".
    pub query: String,
    /// Maximum number of results.
    #[serde(default = "default_geocode_limit")]
    #[schemars(range(min = 1, max = 40))]
    pub limit: u32,
}

impl GeocodeQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: default_geocode_limit(),
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn validate(&self) -> Result<()> {
        check_text("query", &self.query)?;
        check_limit("limit", self.limit, MAX_GEOCODE_LIMIT)
    }
}

/// One forward geocoding match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GeocodeResult {
    pub display_name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// `[min_lat, max_lat, min_lon, max_lon]` when the provider has one.
    pub bounding_box: Option<[f64; 4]>,
    /// Provider relevance score; results are already ordered by it.
    pub importance: Option<f64>,
    /// Structured address parts (road, city, country, ...).
    pub address: BTreeMap<String, String>,
}

/// Coordinate-to-address lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ReverseGeocodeQuery {
    /// Latitude in decimal degrees.
    #[schemars(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    /// Longitude in decimal degrees.
    #[schemars(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    /// Level of detail, 0 (country) to 18 (building).
    #[serde(default = "default_zoom")]
    #[schemars(range(max = 18))]
    pub zoom: u8,
}

impl ReverseGeocodeQuery {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            zoom: default_zoom(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_latitude("latitude", self.latitude)?;
        check_longitude("longitude", self.longitude)?;
        if self.zoom > MAX_ZOOM {
            return Err(Error::validation(
                "zoom",
                format!("{} outside [0, {MAX_ZOOM}]", self.zoom),
            ));
        }
        Ok(())
    }
}

/// The address resolved for a coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AddressResult {
    pub display_name: String,
    pub address_components: BTreeMap<String, String>,
    /// `[min_lat, max_lat, min_lon, max_lon]` when the provider has one.
    pub bounding_box: Option<[f64; 4]>,
}

/// Points of interest around a center point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct PoiQuery {
    /// Kind of place, e.g. "restaurant", "pharmacy", "museum".
    pub query: String,
    /// Center latitude.
    #[schemars(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    /// Center longitude.
    #[schemars(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    /// Search radius in meters.
    #[serde(default = "default_radius")]
    #[schemars(range(max = 50000.0))]
    pub radius_meters: f64,
    /// Maximum number of results, nearest first.
    #[serde(default = "default_poi_limit")]
    #[schemars(range(min = 1, max = 100))]
    pub limit: u32,
}

impl PoiQuery {
    pub fn new(query: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            query: query.into(),
            latitude,
            longitude,
            radius_meters: default_radius(),
            limit: default_poi_limit(),
        }
    }

    pub fn with_radius(mut self, radius_meters: f64) -> Self {
        self.radius_meters = radius_meters;
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn validate(&self) -> Result<()> {
        check_text("query", &self.query)?;
        check_latitude("latitude", self.latitude)?;
        check_longitude("longitude", self.longitude)?;
        check_positive("radius_meters", self.radius_meters)?;
        if self.radius_meters > MAX_POI_RADIUS_M {
            return Err(Error::validation(
                "radius_meters",
                format!("{} exceeds {MAX_POI_RADIUS_M}", self.radius_meters),
            ));
        }
        check_limit("limit", self.limit, MAX_POI_LIMIT)
    }
}

/// One point of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PoiResult {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Value of the first matching amenity/shop/tourism/leisure tag.
    pub category: String,
    /// Great-circle distance from the search center.
    pub distance_meters: f64,
    pub tags: BTreeMap<String, String>,
}

/// Wrapper giving the POI sequence a named field in tool output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PoiResults {
    pub results: Vec<PoiResult>,
}

/// Wrapper giving the geocode sequence a named field in tool output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GeocodeResults {
    pub results: Vec<GeocodeResult>,
}
