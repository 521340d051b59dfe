//! Routing, isochrones and distance matrices against OpenRouteService.

mod ors;
mod types;

pub use types::{
    Isochrone, IsochroneQuery, IsochroneResult, MAX_RANGE_VALUES, MatrixQuery, MatrixResult,
    Metric, Profile, RangeType, RouteQuery, RouteResult, RouteStep,
};

use crate::{Result, ServerParams, http};
use reqwest::RequestBuilder;
use reqwest::header::AUTHORIZATION;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

/// Client for the routing provider.
#[derive(Debug, Clone)]
pub struct RouteServer {
    params: ServerParams,
    client: reqwest::Client,
}

impl RouteServer {
    /// Build a server from immutable parameters. A missing API key is fine.
    pub fn new(params: ServerParams) -> Result<Self> {
        params.validate()?;
        let client = http::client(&params)?;
        info!(
            base_url = %params.base_url,
            authenticated = params.api_key.is_some(),
            "route server ready"
        );
        Ok(Self { params, client })
    }

    /// Directions through the query's waypoints.
    pub async fn route(&self, query: &RouteQuery) -> Result<RouteResult> {
        query.validate()?;
        let path = format!("v2/directions/{}/geojson", query.profile);
        let body = ors::ApiDirectionsRequest {
            coordinates: &query.coordinates,
            instructions: query.instructions,
        };
        let response = self.post(&path, &body, true).await?;
        let result = ors::into_route(response, query.instructions)?;
        debug!(
            distance_m = result.distance_meters,
            duration_s = result.duration_seconds,
            "route computed"
        );
        Ok(result)
    }

    /// One reachability polygon per requested range value, in request order.
    pub async fn isochrone(&self, query: &IsochroneQuery) -> Result<IsochroneResult> {
        query.validate()?;
        let path = format!("v2/isochrones/{}", query.profile);
        let body = ors::ApiIsochroneRequest {
            locations: [query.location],
            range: &query.range_values,
            range_type: query.range_type,
        };
        let response = self.post(&path, &body, false).await?;
        ors::into_isochrones(response, query)
    }

    /// Square distance and/or duration tables over the query's locations.
    pub async fn matrix(&self, query: &MatrixQuery) -> Result<MatrixResult> {
        query.validate()?;
        let path = format!("v2/matrix/{}", query.profile);
        let body = ors::ApiMatrixRequest {
            locations: &query.locations,
            metrics: &query.metrics,
        };
        let response = self.post(&path, &body, false).await?;
        ors::into_matrix(response, query)
    }

    pub(crate) fn request(&self, path: &str) -> RequestBuilder {
        let request = self.client.post(self.params.endpoint(path));
        match &self.params.api_key {
            Some(key) => request.header(AUTHORIZATION, key),
            None => request,
        }
    }

    async fn post<B, T>(&self, path: &str, body: &B, routing: bool) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(path).json(body);
        let response = http::send(request, self.params.timeout).await?;
        let (status, text) = http::text(response, self.params.timeout).await?;
        if !status.is_success() {
            return Err(ors::error_for(status, &text, routing));
        }
        http::decode(&text, path)
    }
}
