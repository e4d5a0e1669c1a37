//! Process configuration.
//!
//! Settings are layered: built-in defaults, then an optional `sqlscout`
//! config file in the working directory, then `SQLSCOUT_*` environment
//! variables (e.g. `SQLSCOUT_DATABASE__PATH`). Budgets are validated at
//! load so a bad configuration fails at startup, not mid-search.

use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::{Result, ScoutError};
use crate::search::SearchConfig;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Path to the SQLite database file.
    pub path: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: "sqlscout.sqlite".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Ollama-compatible generate endpoint.
    pub endpoint: String,
    pub model: String,
    pub max_tokens: u32,
    /// Per-request timeout in seconds; an expired request is absorbed as a
    /// generation failure, not surfaced.
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434/api/generate".into(),
            model: "mistral".into(),
            max_tokens: 256,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub iterations: u32,
    pub max_time_secs: u64,
    pub exploration: f64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        let defaults = SearchConfig::default();
        Self {
            iterations: defaults.num_iterations,
            max_time_secs: defaults.max_time.as_secs(),
            exploration: defaults.exploration,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub llm: LlmSettings,
    pub search: SearchSettings,
    pub server: ServerSettings,
}

impl Settings {
    /// Load and validate settings from defaults, file and environment.
    pub fn load() -> Result<Self> {
        let settings: Settings = Config::builder()
            .add_source(File::with_name("sqlscout").required(false))
            .add_source(Environment::with_prefix("SQLSCOUT").separator("__"))
            .build()
            .map_err(|e| ScoutError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| ScoutError::Config(e.to_string()))?;
        settings.search_config()?;
        Ok(settings)
    }

    /// Translate the search section into a validated [`SearchConfig`].
    pub fn search_config(&self) -> Result<SearchConfig> {
        let config = SearchConfig {
            num_iterations: self.search.iterations,
            max_time: Duration::from_secs(self.search.max_time_secs),
            exploration: self.search.exploration,
            max_tokens: self.llm.max_tokens,
            ..SearchConfig::default()
        };
        config.validate()?;
        Ok(config)
    }
}
