//! TOML configuration with built-in defaults.
//!
//! Every section and every field is optional. A missing or malformed file
//! degrades to the defaults with a warning; configuration never stops the
//! program from starting.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::query::DEFAULT_NUM_RESULTS;
use crate::{Result, SearchError};

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "METAFIND_CONFIG";

/// File read when neither a path nor [`CONFIG_ENV`] is given.
pub const DEFAULT_CONFIG_FILE: &str = "metafind.toml";

const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub search: SearchSettings,
    pub proxy: ProxySettings,
    pub llm: LlmSettings,
    pub server: ServerSettings,
}

/// `[search]` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Engines enabled by default, in result order.
    pub engines: Vec<String>,
    pub num_results: usize,
    /// Per-engine timeout.
    pub timeout_secs: u64,
    /// Optional bound on the whole fan-out.
    pub deadline_secs: Option<u64>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            engines: vec![
                "duckduckgo".to_string(),
                "bing".to_string(),
                "wikipedia".to_string(),
            ],
            num_results: DEFAULT_NUM_RESULTS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            deadline_secs: None,
        }
    }
}

impl SearchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }
}

/// Where the proxy list comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxySource {
    /// Newline-delimited `[user:pass@]host:port` file.
    File,
    /// One-shot JSON fetch from a provider API.
    Api,
}

/// `[proxy]` section. No `source` means direct connections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    pub source: Option<ProxySource>,
    pub path: Option<PathBuf>,
    pub url: Option<String>,
    /// Bearer token for the API; `$NAME` reads the environment.
    pub api_key: Option<String>,
    /// Probe every proxy once at startup and keep the live ones.
    pub validate: bool,
    pub check_url: Option<String>,
}

/// `[llm]` section. Post-processing hooks run only when `api_key` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
}

/// `[server]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

impl Config {
    /// Loads the configuration, falling back to defaults on any problem.
    ///
    /// The file is `path` if given, else `$METAFIND_CONFIG`, else
    /// `metafind.toml` in the working directory. Only the implicit default
    /// file may be absent without a warning.
    pub fn load(path: Option<&Path>) -> Self {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => match std::env::var_os(CONFIG_ENV) {
                Some(path) => (PathBuf::from(path), true),
                None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
            },
        };

        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if !explicit && e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No configuration file, using defaults");
                return Self::default();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot read configuration, using defaults");
                return Self::default();
            }
        };

        match Self::from_toml_str(&text) {
            Ok(config) => {
                debug!(path = %path.display(), "Loaded configuration");
                config
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Invalid configuration, using defaults");
                Self::default()
            }
        }
    }

    /// Parses a TOML document and normalizes the values.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(text).map_err(|e| SearchError::Config(e.to_string()))?;
        config.normalize();
        Ok(config)
    }

    fn normalize(&mut self) {
        if self.search.num_results == 0 {
            warn!("search.num_results must be positive, using 1");
            self.search.num_results = 1;
        }
        if self.search.timeout_secs == 0 {
            warn!(default = DEFAULT_TIMEOUT_SECS, "search.timeout_secs must be positive");
            self.search.timeout_secs = DEFAULT_TIMEOUT_SECS;
        }
        if self.search.deadline_secs == Some(0) {
            warn!("search.deadline_secs must be positive, ignoring the deadline");
            self.search.deadline_secs = None;
        }
        self.proxy.api_key = expand_env(self.proxy.api_key.take());
        self.llm.api_key = expand_env(self.llm.api_key.take());
    }
}

/// Replaces a `$NAME` value with the environment variable `NAME`.
///
/// An unset variable or an empty result yields `None`.
fn expand_env(value: Option<String>) -> Option<String> {
    let value = value?;
    let resolved = match value.strip_prefix('$') {
        Some(name) => match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                warn!(variable = %name, "Environment variable not set");
                return None;
            }
        },
        None => value,
    };
    Some(resolved).filter(|v| !v.trim().is_empty())
}
