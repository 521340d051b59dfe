//! Static connection parameters.

use crate::{Error, Result};
use std::time::Duration;

pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";
pub const DEFAULT_ORS_URL: &str = "https://api.openrouteservice.org";
pub const DEFAULT_USER_AGENT: &str = "MapServersProject/1.0";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection parameters owned by one server instance.
///
/// Immutable once the server is built. The API key is optional: servers
/// construct fine without it and only the provider decides what anonymous
/// callers may do.
#[derive(Debug, Clone)]
pub struct ServerParams {
    pub base_url: String,
    pub api_key: Option<String>,
    pub user_agent: String,
    pub timeout: Duration,
}

impl ServerParams {
    /// Parameters for `base_url` with the default user agent and timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Defaults for the public Nominatim instance.
    pub fn nominatim() -> Self {
        Self::new(DEFAULT_NOMINATIM_URL)
    }

    /// Defaults for the public OpenRouteService API.
    pub fn openrouteservice() -> Self {
        Self::new(DEFAULT_ORS_URL)
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let key = api_key.into();
        self.api_key = (!key.trim().is_empty()).then_some(key);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(Error::validation("timeout", "must be greater than zero"));
        }
        if self.user_agent.trim().is_empty() {
            return Err(Error::validation("user_agent", "must not be empty"));
        }
        check_url("base_url", &self.base_url)
    }

    /// Join `path` onto the base URL without doubling slashes.
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

pub(crate) fn check_url(field: &str, url: &str) -> Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(Error::validation(field, format!("not an http(s) URL: {url:?}")))
    }
}
