//! Geocoding and point-of-interest lookup.
//!
//! Forward and reverse geocoding go to a Nominatim-compatible endpoint; POI
//! search posts an Overpass QL program to a separate Overpass endpoint. Both
//! share one set of [`ServerParams`].

mod nominatim;
mod overpass;
mod types;

pub use types::{
    AddressResult, GeocodeQuery, GeocodeResult, GeocodeResults, MAX_GEOCODE_LIMIT, MAX_POI_LIMIT,
    MAX_POI_RADIUS_M, MAX_ZOOM, PoiQuery, PoiResult, PoiResults, ReverseGeocodeQuery,
};

use crate::params::check_url;
use crate::{Error, Result, ServerParams, http};
use nominatim::{ApiPlace, ApiReverse};
use tracing::{debug, info};

/// Client for the geocoding and spatial-query providers.
#[derive(Debug, Clone)]
pub struct GeoLookupServer {
    params: ServerParams,
    overpass_url: String,
    client: reqwest::Client,
}

impl GeoLookupServer {
    /// Build a server from immutable parameters.
    ///
    /// Fails with `Validation` on a zero timeout, an empty user agent or a
    /// non-http(s) URL.
    pub fn new(params: ServerParams, overpass_url: impl Into<String>) -> Result<Self> {
        params.validate()?;
        let overpass_url = overpass_url.into();
        check_url("overpass_url", &overpass_url)?;
        let client = http::client(&params)?;
        info!(base_url = %params.base_url, %overpass_url, "geo lookup server ready");
        Ok(Self {
            params,
            overpass_url,
            client,
        })
    }

    /// Resolve free text to candidate places, most relevant first.
    pub async fn forward_geocode(&self, query: &GeocodeQuery) -> Result<Vec<GeocodeResult>> {
        query.validate()?;
        let limit = query.limit.to_string();
        let request = self.client.get(self.params.endpoint("search")).query(&[
            ("q", query.query.as_str()),
            ("format", "jsonv2"),
            ("limit", limit.as_str()),
            ("addressdetails", "1"),
        ]);
        let response = http::send(request, self.params.timeout).await?;
        let places: Vec<ApiPlace> = http::json(response, self.params.timeout, "search").await?;

        if places.is_empty() {
            return Err(Error::NotFound(format!(
                "no place matches {:?}",
                query.query
            )));
        }
        debug!(count = places.len(), "geocode matches");
        places.into_iter().map(ApiPlace::into_geocode).collect()
    }

    /// Resolve a coordinate to the nearest address.
    pub async fn reverse_geocode(&self, query: &ReverseGeocodeQuery) -> Result<AddressResult> {
        query.validate()?;
        let (lat, lon, zoom) = (
            query.latitude.to_string(),
            query.longitude.to_string(),
            query.zoom.to_string(),
        );
        let request = self.client.get(self.params.endpoint("reverse")).query(&[
            ("lat", lat.as_str()),
            ("lon", lon.as_str()),
            ("format", "jsonv2"),
            ("zoom", zoom.as_str()),
            ("addressdetails", "1"),
        ]);
        let response = http::send(request, self.params.timeout).await?;
        match http::json(response, self.params.timeout, "reverse").await? {
            ApiReverse::Hit(place) => Ok(place.into_address()),
            ApiReverse::Miss { error } => Err(Error::NotFound(format!(
                "no address at ({lat}, {lon}): {}",
                nominatim::miss_message(&error)
            ))),
        }
    }

    /// Find tagged places within a radius, nearest first.
    ///
    /// An empty area is an empty list, not an error. Overpass returns at
    /// most 500 elements, picked by id rather than distance, so in dense
    /// areas a large radius can miss the closest matches.
    pub async fn poi_search(&self, query: &PoiQuery) -> Result<Vec<PoiResult>> {
        query.validate()?;
        let ql = overpass::build_query(query, self.params.timeout);
        debug!(query = %ql, "overpass query");
        let request = self
            .client
            .post(&self.overpass_url)
            .form(&[("data", ql.as_str())]);
        let response = http::send(request, self.params.timeout).await?;
        let body: overpass::ApiResponse =
            http::json(response, self.params.timeout, "overpass").await?;
        overpass::into_results(body, query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn construction_checks_params() {
        let ok = GeoLookupServer::new(ServerParams::nominatim(), crate::DEFAULT_OVERPASS_URL);
        assert!(ok.is_ok());

        let err = GeoLookupServer::new(
            ServerParams::nominatim().with_timeout(Duration::ZERO),
            crate::DEFAULT_OVERPASS_URL,
        )
        .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Validation);

        let err = GeoLookupServer::new(ServerParams::nominatim(), "overpass.local").unwrap_err();
        assert!(err.to_string().contains("overpass_url"));
    }
}
