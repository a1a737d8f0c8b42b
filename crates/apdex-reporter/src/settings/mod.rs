pub mod validation;

use crate::{
    apdex::ApdexThreshold,
    client::{Device, MetricDefinition},
};
use anyhow::{Context, Result};
use clap::Parser;
use config::{Config as ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::{fmt, net::SocketAddr, path::PathBuf, time::Duration};
use url::Url;
use validation::validate_config;

#[derive(Debug, Parser)]
#[command(
    name = "apdex-reporter",
    about = "Computes a rolling Apdex score from user action beacons and reports it to Dynatrace",
    version,
    after_help = r#"Configuration:
    Configuration can be provided via:
    1. Environment variables with APDEX__ prefix (e.g., APDEX__DYNATRACE__API_TOKEN)
    2. .env file in the current directory
    3. Config file with -c option (TOML)"#
)]
pub struct AppArgs {
    /// Path to the configuration file (TOML format)
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Address the beacon endpoint listens on
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
    /// Prometheus exporter address; disabled when unset
    #[serde(default)]
    pub metrics_addr: Option<SocketAddr>,
    #[serde(default)]
    pub apdex: ApdexSettings,
    pub dynatrace: DynatraceSettings,
    #[serde(default)]
    pub export: ExportSettings,
    #[serde(default)]
    pub metric: MetricSettings,
    #[serde(default)]
    pub device: DeviceSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApdexSettings {
    /// Satisfied threshold in seconds
    pub target_seconds: u64,
    /// Number of most recent user actions the score is computed over
    pub window_size: usize,
    /// Only score actions from this application; all applications if unset
    pub application: Option<String>,
}

impl Default for ApdexSettings {
    fn default() -> Self {
        Self {
            target_seconds: 2,
            window_size: 1000,
            application: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynatraceSettings {
    pub server_url: String,
    pub api_token: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub interval_secs: u64,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricSettings {
    pub name: String,
    pub display_name: String,
    pub unit: String,
    pub metric_type: String,
}

impl Default for MetricSettings {
    fn default() -> Self {
        Self {
            name: "apdex".to_string(),
            display_name: "Mobile Apdex".to_string(),
            unit: "Ratio".to_string(),
            metric_type: "MobileDevice".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    pub id: String,
    pub display_name: String,
    pub ip_address: String,
    pub device_type: String,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            id: "MobileApdexCalculator".to_string(),
            display_name: "Mobile Apdex Calculator".to_string(),
            ip_address: "10.0.0.10".to_string(),
            device_type: "MobileDevice".to_string(),
        }
    }
}

impl Settings {
    /// Loads settings from an optional TOML file, with `APDEX__` environment
    /// variables taking priority. Fields missing from both fall back to
    /// their defaults individually.
    pub fn new(config_path: Option<PathBuf>) -> Result<Self> {
        // NOTE: It's ok if this fails (file might not exist)
        let _ = dotenvy::dotenv();

        Self::load(config_path, Self::environment())
    }

    fn environment() -> Environment {
        Environment::with_prefix("APDEX")
            .separator("__")
            .try_parsing(true)
    }

    fn load(config_path: Option<PathBuf>, environment: Environment) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path));
        }

        let settings: Settings = builder
            .add_source(environment)
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        validate_config(&settings)?;

        Ok(settings)
    }

    pub fn threshold(&self) -> ApdexThreshold {
        ApdexThreshold::from_secs(self.apdex.target_seconds)
    }

    pub fn application_filter(&self) -> Option<String> {
        self.apdex
            .application
            .clone()
            .filter(|app| !app.is_empty())
    }

    pub fn server_url(&self) -> Result<Url> {
        Url::parse(&self.dynatrace.server_url).context("Invalid Dynatrace server URL")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.dynatrace.request_timeout_secs)
    }

    pub fn export_interval(&self) -> Duration {
        Duration::from_secs(self.export.interval_secs)
    }

    pub fn metric_definition(&self) -> MetricDefinition {
        MetricDefinition {
            name: self.metric.name.clone(),
            display_name: self.metric.display_name.clone(),
            unit: self.metric.unit.clone(),
            types: vec![self.metric.metric_type.clone()],
        }
    }

    pub fn device(&self) -> Device {
        Device {
            id: self.device.id.clone(),
            display_name: self.device.display_name.clone(),
            ip_address: self.device.ip_address.clone(),
            device_type: self.device.device_type.clone(),
        }
    }

    /// API token with everything past the first four characters masked.
    pub fn redacted_token(&self) -> String {
        let visible: String = self.dynatrace.api_token.chars().take(4).collect();
        format!("{visible}****")
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Settings {{\n\
             \tLog Level: {}\n\
             \tListen Address: {}\n\
             \tDynatrace URL: {}\n\
             \tAPI Token: {}\n\
             \tTarget Seconds: {}\n\
             \tWindow Size: {}\n\
             \tApplication Filter: {}\n\
             \tExport Interval Secs: {}\n\
             }}",
            self.log_level,
            self.listen_addr,
            self.dynatrace.server_url,
            self.redacted_token(),
            self.apdex.target_seconds,
            self.apdex.window_size,
            self.application_filter().as_deref().unwrap_or("<all applications>"),
            self.export.interval_secs,
        )
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_request_timeout_secs() -> u64 {
    10
}
