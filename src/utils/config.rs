// src/utils/config.rs
//! Proxy configuration
//!
//! Loaded from an optional `dynproxy.toml` and `DYNPROXY__*` environment
//! variables, in that order.

use crate::utils::errors::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default configuration file name (extension resolved by `config`)
pub const DEFAULT_CONFIG_FILE: &str = "dynproxy";

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "DYNPROXY";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Emit call counters and duration histograms
    pub metrics_enabled: bool,

    /// Render argument values in trace logs
    pub trace_arguments: bool,

    /// Warn when a proceeded call runs longer than this
    pub slow_call_threshold_ms: Option<u64>,

    /// `EnvFilter` directive used by `init_tracing`
    pub log_filter: String,

    /// Emit JSON log lines
    pub log_json: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            trace_arguments: false,
            slow_call_threshold_ms: None,
            log_filter: "info".to_string(),
            log_json: false,
        }
    }
}

impl ProxyConfig {
    /// Load from `dynproxy.toml` (if present) and the environment
    pub fn load() -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Load from an explicit file, still honoring environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Per-proxy settings derived from this configuration
    pub fn settings(&self) -> ProxySettings {
        ProxySettings {
            metrics_enabled: self.metrics_enabled,
            trace_arguments: self.trace_arguments,
            slow_call_threshold: self.slow_call_threshold_ms.map(Duration::from_millis),
        }
    }
}

/// Settings every proxy carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxySettings {
    pub metrics_enabled: bool,
    pub trace_arguments: bool,
    pub slow_call_threshold: Option<Duration>,
}

impl Default for ProxySettings {
    fn default() -> Self {
        ProxyConfig::default().settings()
    }
}
