//! Configuration loading and validation.
//!
//! Configuration comes from a YAML file, from environment variables, or both:
//! values present in the file win, and the API token falls back to
//! `NOTION_TOKEN` (then `NOTION_API_KEY`) when the file leaves it empty.

mod types;
mod validation;

pub use types::*;

use crate::error::Result;
use std::path::Path;
use tracing::debug;

/// Environment variables consulted by [`Config::from_env`].
pub const ENV_TOKEN: &str = "NOTION_TOKEN";
pub const ENV_TOKEN_FALLBACK: &str = "NOTION_API_KEY";
pub const ENV_BASE_URL: &str = "NOTION_BASE_URL";
pub const ENV_API_VERSION: &str = "NOTION_VERSION";

impl Config {
    /// Load configuration from a YAML file, filling gaps from the environment.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = serde_yaml::from_str(&content)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string without consulting the environment.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from environment variables only.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        config.apply_env(lookup);
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if self.api.token.is_empty() {
            if let Some(token) = non_empty(ENV_TOKEN).or_else(|| non_empty(ENV_TOKEN_FALLBACK)) {
                debug!("Using API token from environment");
                self.api.token = token;
            }
        }
        if self.api.base_url == DEFAULT_BASE_URL {
            if let Some(url) = non_empty(ENV_BASE_URL) {
                self.api.base_url = url;
            }
        }
        if self.api.version == DEFAULT_API_VERSION {
            if let Some(version) = non_empty(ENV_API_VERSION) {
                self.api.version = version;
            }
        }
    }
}
