//! ==============================================================================
//! config.rs - dashboard.toml schema and loading
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `dashboard.toml`.
//!     loads configuration from file or falls back to defaults, then applies
//!     the `API_BASE_URL` environment override.
//!
//! structure:
//!     - ApiConfig: backend base URL and history size.
//!     - BufferConfig: per-sensor cap and merge policy.
//!     - AlertsConfig: scan window and feed ordering.
//!     - ServerConfig: where the JSON snapshot is served.
//!     - LoggingConfig: level and periodic sensor report.
//!     - ClockConfig: header clock tick.
//!     - thresholds: optional per-sensor bound overrides.
//!
//! ==============================================================================

use crate::alerts::{AlertOrder, SensorThresholdConfig, Thresholds, DEFAULT_ALERT_WINDOW};
use crate::buffer::{MergePolicy, DEFAULT_CAP};
use crate::domain::SensorKey;
use crate::error::{DashError, Result};
use crate::state::DashboardOptions;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use url::Url;

pub const BASE_URL_ENV: &str = "API_BASE_URL";
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// everything the dashboard binary reads at startup
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct DashConfig {
    pub api: ApiConfig,
    pub buffer: BufferConfig,
    pub alerts: AlertsConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub clock: ClockConfig,
    pub thresholds: BTreeMap<SensorKey, SensorThresholdConfig>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub history_limit: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            history_limit: DEFAULT_CAP,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BufferConfig {
    pub cap: usize,
    pub merge_policy: MergePolicy,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            cap: DEFAULT_CAP,
            merge_policy: MergePolicy::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AlertsConfig {
    pub window: usize,
    pub order: AlertOrder,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_ALERT_WINDOW,
            order: AlertOrder::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: "0.0.0.0:3000".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub show_sensor_data: bool,
    pub report_interval_seconds: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            show_sensor_data: true,
            report_interval_seconds: 5,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ClockConfig {
    pub tick_millis: u64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self { tick_millis: 1000 }
    }
}

/// where the configuration came from, reported once logging is up
#[derive(Debug, Clone)]
pub enum ConfigOrigin {
    File(PathBuf),
    Defaults,
    /// a file was found but could not be used
    Fallback { path: PathBuf, error: String },
}

impl DashConfig {
    /// parse one dashboard.toml
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| DashError::config(format!("failed to parse config: {e}")))
    }

    /// first dashboard.toml found in the search paths, or defaults, plus
    /// the `API_BASE_URL` override
    pub fn load_or_default() -> (Self, ConfigOrigin) {
        let paths = [
            PathBuf::from("config").join("dashboard.toml"),
            PathBuf::from("..").join("config").join("dashboard.toml"),
        ];

        let (mut config, origin) = match paths.iter().find(|p| p.exists()) {
            Some(path) => match Self::load(path) {
                Ok(config) => (config, ConfigOrigin::File(path.clone())),
                Err(e) => (
                    Self::default(),
                    ConfigOrigin::Fallback {
                        path: path.clone(),
                        error: e.to_string(),
                    },
                ),
            },
            None => (Self::default(), ConfigOrigin::Defaults),
        };

        config.apply_env(std::env::var(BASE_URL_ENV).ok());
        (config, origin)
    }

    pub fn apply_env(&mut self, base_url: Option<String>) {
        if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
            self.api.base_url = url.trim().to_string();
        }
    }

    /// parsed and checked backend base URL
    pub fn base_url(&self) -> Result<Url> {
        let url = Url::parse(&self.api.base_url)?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(DashError::invalid_url(format!(
                "base url must be http or https, got {other}"
            ))),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.base_url()?;
        if self.buffer.cap == 0 {
            return Err(DashError::config("buffer.cap must be at least 1"));
        }
        if self.api.history_limit == 0 {
            return Err(DashError::config("api.history_limit must be at least 1"));
        }
        Ok(())
    }

    pub fn dashboard_options(&self) -> DashboardOptions {
        DashboardOptions {
            cap: self.buffer.cap,
            merge_policy: self.buffer.merge_policy,
            alert_window: self.alerts.window,
            alert_order: self.alerts.order,
            thresholds: Thresholds::with_overrides(&self.thresholds),
        }
    }

    /// one-line summary for the startup log
    pub fn summary(&self) -> String {
        format!(
            "api={} history_limit={} cap={} merge={:?} alert_window={} alert_order={:?} server={}",
            self.api.base_url,
            self.api.history_limit,
            self.buffer.cap,
            self.buffer.merge_policy,
            self.alerts.window,
            self.alerts.order,
            if self.server.enabled { self.server.bind.as_str() } else { "off" },
        )
    }
}
