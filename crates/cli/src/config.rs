//! Configuration loading from mapassist.toml plus environment overrides.

use maps::{
    DEFAULT_NOMINATIM_URL, DEFAULT_ORS_URL, DEFAULT_OVERPASS_URL, DEFAULT_USER_AGENT,
    ServerParams,
};
use runtime::OpenAiBackend;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// File read when `--config` is not given, if it exists.
pub const CONFIG_FILE: &str = "mapassist.toml";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 120;
const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 60;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub geocoding: GeocodingConfig,

    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default)]
    pub model: ModelConfig,
}

/// Nominatim and Overpass.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeocodingConfig {
    pub base_url: String,
    pub overpass_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_NOMINATIM_URL.to_string(),
            overpass_url: DEFAULT_OVERPASS_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// OpenRouteService. The key is optional.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RoutingConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ORS_URL.to_string(),
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// The chat model behind `chat` and `ask`.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub max_tool_rounds: usize,
    pub timeout_secs: u64,
    /// Budget for one tool call, provider round trip included.
    pub tool_timeout_secs: u64,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Replaces the built-in system prompt.
    pub system_prompt: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: runtime::DEFAULT_MODEL.to_string(),
            base_url: runtime::DEFAULT_BASE_URL.to_string(),
            api_key: None,
            max_tool_rounds: runtime::DEFAULT_MAX_TOOL_ROUNDS,
            timeout_secs: DEFAULT_MODEL_TIMEOUT_SECS,
            tool_timeout_secs: DEFAULT_TOOL_TIMEOUT_SECS,
            temperature: None,
            max_tokens: None,
            system_prompt: None,
        }
    }
}

impl Config {
    /// Resolve the effective configuration.
    ///
    /// An explicit `path` must exist; otherwise [`CONFIG_FILE`] is read when
    /// present. Environment variables win over the file.
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::load(path)?,
            None if Path::new(CONFIG_FILE).exists() => Self::load(CONFIG_FILE)?,
            None => Self::default(),
        };
        let config = config.with_env(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply environment overrides read through `var`.
    pub fn with_env(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| var(name).filter(|v| !v.trim().is_empty());

        if let Some(agent) = get("USER_AGENT") {
            self.geocoding.user_agent = agent;
        }
        if let Some(url) = get("NOMINATIM_URL") {
            self.geocoding.base_url = url;
        }
        if let Some(url) = get("OVERPASS_URL") {
            self.geocoding.overpass_url = url;
        }
        if let Some(url) = get("ORS_URL") {
            self.routing.base_url = url;
        }
        if let Some(key) = get("ORS_API_KEY") {
            self.routing.api_key = Some(key);
        }
        if let Some(key) = get("OPENAI_API_KEY") {
            self.model.api_key = Some(key);
        }
        if let Some(url) = get("OPENAI_BASE_URL") {
            self.model.base_url = url;
        }
        if let Some(model) = get("MAPASSIST_MODEL") {
            self.model.model = model;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.geocoding.timeout_secs == 0 {
            return Err(ConfigError::Invalid("geocoding.timeout_secs must be greater than zero"));
        }
        if self.routing.timeout_secs == 0 {
            return Err(ConfigError::Invalid("routing.timeout_secs must be greater than zero"));
        }
        if self.model.max_tool_rounds == 0 {
            return Err(ConfigError::Invalid("model.max_tool_rounds must be greater than zero"));
        }
        if self.model.timeout_secs == 0 {
            return Err(ConfigError::Invalid("model.timeout_secs must be greater than zero"));
        }
        if self.model.tool_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "model.tool_timeout_secs must be greater than zero",
            ));
        }
        if self
            .model
            .temperature
            .is_some_and(|t| !(0.0..=2.0).contains(&t))
        {
            return Err(ConfigError::Invalid("model.temperature must be within 0..=2"));
        }
        Ok(())
    }

    /// The configured chat backend, or `None` without an API key.
    pub fn backend(&self) -> Option<OpenAiBackend> {
        let api_key = self
            .model
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())?;
        let mut builder = OpenAiBackend::builder(api_key)
            .model(&self.model.model)
            .base_url(&self.model.base_url)
            .timeout(Duration::from_secs(self.model.timeout_secs));
        if let Some(temperature) = self.model.temperature {
            builder = builder.temperature(temperature);
        }
        if let Some(max_tokens) = self.model.max_tokens {
            builder = builder.max_tokens(max_tokens);
        }
        Some(builder.build())
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.model.tool_timeout_secs)
    }

    /// Parameters for the geocoding server. Overpass shares the user agent.
    pub fn geocoding_params(&self) -> ServerParams {
        ServerParams::new(&self.geocoding.base_url)
            .with_user_agent(&self.geocoding.user_agent)
            .with_timeout(Duration::from_secs(self.geocoding.timeout_secs))
    }

    /// Parameters for the routing server.
    pub fn routing_params(&self) -> ServerParams {
        let params = ServerParams::new(&self.routing.base_url)
            .with_user_agent(&self.geocoding.user_agent)
            .with_timeout(Duration::from_secs(self.routing.timeout_secs));
        match &self.routing.api_key {
            Some(key) => params.with_api_key(key),
            None => params,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(&'static str),
}
