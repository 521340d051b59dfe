//! Routing query/result records.

use crate::coordinate::check_positive;
use crate::{Coordinate, Error, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MAX_RANGE_VALUES: usize = 10;

/// Travel mode understood by the routing provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Profile {
    #[default]
    DrivingCar,
    DrivingHgv,
    CyclingRegular,
    CyclingRoad,
    CyclingMountain,
    CyclingElectric,
    FootWalking,
    FootHiking,
    Wheelchair,
}

impl Profile {
    pub const ALL: [Profile; 9] = [
        Self::DrivingCar,
        Self::DrivingHgv,
        Self::CyclingRegular,
        Self::CyclingRoad,
        Self::CyclingMountain,
        Self::CyclingElectric,
        Self::FootWalking,
        Self::FootHiking,
        Self::Wheelchair,
    ];

    /// Path segment used in provider URLs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DrivingCar => "driving-car",
            Self::DrivingHgv => "driving-hgv",
            Self::CyclingRegular => "cycling-regular",
            Self::CyclingRoad => "cycling-road",
            Self::CyclingMountain => "cycling-mountain",
            Self::CyclingElectric => "cycling-electric",
            Self::FootWalking => "foot-walking",
            Self::FootHiking => "foot-hiking",
            Self::Wheelchair => "wheelchair",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether isochrone ranges are seconds or meters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RangeType {
    #[default]
    Time,
    Distance,
}

/// Matrix quantity to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Distance,
    Duration,
}

fn default_metrics() -> Vec<Metric> {
    vec![Metric::Distance, Metric::Duration]
}

fn check_coordinates(field: &str, coords: &[Coordinate]) -> Result<()> {
    if coords.len() < 2 {
        return Err(Error::validation(
            field,
            format!("need at least 2 coordinates, got {}", coords.len()),
        ));
    }
    for (i, c) in coords.iter().enumerate() {
        c.validate(&format!("{field}[{i}]"))?;
    }
    Ok(())
}

// ─── Route ──────────────────────────────────────────────────────────────────

/// Directions through an ordered list of waypoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RouteQuery {
    /// Waypoints as `[longitude, latitude]` pairs, start first. At least two.
    pub coordinates: Vec<Coordinate>,
    #[serde(default)]
    pub profile: Profile,
    /// Include turn-by-turn steps.
    #[serde(default)]
    pub instructions: bool,
}

impl RouteQuery {
    pub fn new(coordinates: Vec<Coordinate>, profile: Profile) -> Self {
        Self {
            coordinates,
            profile,
            instructions: false,
        }
    }

    pub fn with_instructions(mut self, instructions: bool) -> Self {
        self.instructions = instructions;
        self
    }

    pub fn validate(&self) -> Result<()> {
        check_coordinates("coordinates", &self.coordinates)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RouteStep {
    pub instruction: String,
    /// Street name, empty when unnamed.
    pub name: String,
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RouteResult {
    pub distance_meters: f64,
    pub duration_seconds: f64,
    /// Route line as `[longitude, latitude]` pairs.
    pub geometry: Vec<Coordinate>,
    /// Empty unless instructions were requested.
    pub steps: Vec<RouteStep>,
}

// ─── Isochrone ──────────────────────────────────────────────────────────────

/// Reachability polygons around one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct IsochroneQuery {
    /// Center as `[longitude, latitude]`.
    pub location: Coordinate,
    #[serde(default)]
    pub profile: Profile,
    /// Ranges in seconds (time) or meters (distance); one polygon each.
    pub range_values: Vec<f64>,
    #[serde(default)]
    pub range_type: RangeType,
}

impl IsochroneQuery {
    pub fn new(location: Coordinate, profile: Profile, range_values: Vec<f64>) -> Self {
        Self {
            location,
            profile,
            range_values,
            range_type: RangeType::Time,
        }
    }

    pub fn with_range_type(mut self, range_type: RangeType) -> Self {
        self.range_type = range_type;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.location.validate("location")?;
        if self.range_values.is_empty() {
            return Err(Error::validation("range_values", "need at least one value"));
        }
        if self.range_values.len() > MAX_RANGE_VALUES {
            return Err(Error::validation(
                "range_values",
                format!(
                    "at most {MAX_RANGE_VALUES} values, got {}",
                    self.range_values.len()
                ),
            ));
        }
        for (i, v) in self.range_values.iter().enumerate() {
            check_positive(&format!("range_values[{i}]"), *v)?;
        }
        Ok(())
    }
}

/// One polygon, tagged with the range value it answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Isochrone {
    pub value: f64,
    /// Closed outer ring as `[longitude, latitude]` pairs.
    pub ring: Vec<Coordinate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IsochroneResult {
    pub range_type: RangeType,
    /// Same order as the requested range values.
    pub isochrones: Vec<Isochrone>,
}

// ─── Matrix ─────────────────────────────────────────────────────────────────

/// Many-to-many distances and/or durations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct MatrixQuery {
    /// Locations as `[longitude, latitude]` pairs. Every location is both an
    /// origin and a destination.
    pub locations: Vec<Coordinate>,
    #[serde(default)]
    pub profile: Profile,
    #[serde(default = "default_metrics")]
    pub metrics: Vec<Metric>,
}

impl MatrixQuery {
    pub fn new(locations: Vec<Coordinate>, profile: Profile) -> Self {
        Self {
            locations,
            profile,
            metrics: default_metrics(),
        }
    }

    pub fn with_metrics(mut self, metrics: Vec<Metric>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn validate(&self) -> Result<()> {
        check_coordinates("locations", &self.locations)?;
        if self.metrics.is_empty() {
            return Err(Error::validation("metrics", "need at least one metric"));
        }
        Ok(())
    }

    pub(crate) fn wants(&self, metric: Metric) -> bool {
        self.metrics.contains(&metric)
    }
}

/// `[origin][destination]` tables; `None` cells are unreachable pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MatrixResult {
    /// Meters; absent when not requested.
    pub distances: Option<Vec<Vec<Option<f64>>>>,
    /// Seconds; absent when not requested.
    pub durations: Option<Vec<Vec<Option<f64>>>>,
}
