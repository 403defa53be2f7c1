use std::env;
use std::path::PathBuf;

use luau_forge_gemini_model::{GeminiConfig, GeminiConfigBuilder};
use thiserror::Error;

/// Relay used when `LUAU_FORGE_RELAY_URL` is not set.
pub const DEFAULT_RELAY_URL: &str = "https://ntfy.sh";

/// Error raised while reading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `GEMINI_API_KEY` is not set. Nothing can run without it.
    #[error("API key not found, set the GEMINI_API_KEY environment variable")]
    MissingApiKey,
    /// No data directory was configured and the platform has none.
    #[error("no data directory available, set LUAU_FORGE_DATA_DIR")]
    MissingDataDir,
}

/// Everything the application needs to start.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Settings for the model service.
    pub gemini: GeminiConfig,
    /// Base URL of the message relay, without a trailing `/`.
    pub relay_url: String,
    /// Where the user identifier is kept.
    pub data_dir: PathBuf,
}

impl AppConfig {
    /// Reads the configuration from the process environment.
    #[inline]
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable
    /// name to its value. Empty values count as unset.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let api_key = var("GEMINI_API_KEY").ok_or(ConfigError::MissingApiKey)?;
        let mut gemini = GeminiConfigBuilder::with_api_key(api_key);
        if let Some(model) = var("GEMINI_MODEL") {
            gemini = gemini.with_model(model);
        }
        if let Some(base_url) = var("GEMINI_BASE_URL") {
            gemini = gemini.with_base_url(base_url);
        }

        let relay_url = var("LUAU_FORGE_RELAY_URL")
            .unwrap_or_else(|| DEFAULT_RELAY_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();

        let data_dir = match var("LUAU_FORGE_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_dir()
                .ok_or(ConfigError::MissingDataDir)?
                .join("luau-forge"),
        };

        Ok(Self {
            gemini: gemini.build(),
            relay_url,
            data_dir,
        })
    }
}
