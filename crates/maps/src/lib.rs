//! Typed clients for map providers, exposed as agent tools.
//!
//! - [`GeoLookupServer`]: forward/reverse geocoding (Nominatim) and POI
//!   search (Overpass).
//! - [`RouteServer`]: routes, isochrones and distance matrices
//!   (OpenRouteService).
//! - [`Toolbox`]: both servers behind name-based JSON dispatch.
//!
//! Each operation validates its query, sends exactly one HTTP request and
//! maps the response into a typed result or an [`Error`].

mod coordinate;
mod error;
mod http;
mod params;

pub mod geo;
pub mod route;
pub mod tools;

pub use coordinate::{Coordinate, check_latitude, check_longitude};
pub use error::{Error, ErrorKind, Result};
pub use geo::{
    AddressResult, GeoLookupServer, GeocodeQuery, GeocodeResult, PoiQuery, PoiResult,
    ReverseGeocodeQuery,
};
pub use params::{
    DEFAULT_NOMINATIM_URL, DEFAULT_ORS_URL, DEFAULT_OVERPASS_URL, DEFAULT_TIMEOUT,
    DEFAULT_USER_AGENT, ServerParams,
};
pub use route::{
    Isochrone, IsochroneQuery, IsochroneResult, MatrixQuery, MatrixResult, Metric, Profile,
    RangeType, RouteQuery, RouteResult, RouteServer, RouteStep,
};
pub use tools::{Operation, ToolError, ToolSpec, Toolbox};
