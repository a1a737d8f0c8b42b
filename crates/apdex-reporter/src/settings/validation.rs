use crate::settings::Settings;
use anyhow::{Result, bail};
use std::net::IpAddr;

/// Validate the configuration values
pub fn validate_config(settings: &Settings) -> Result<()> {
    // Validate Dynatrace settings
    if settings.dynatrace.server_url.is_empty() {
        bail!("Dynatrace server URL cannot be empty");
    }

    if !settings.dynatrace.server_url.starts_with("http://")
        && !settings.dynatrace.server_url.starts_with("https://")
    {
        bail!("Dynatrace server URL must start with http:// or https://");
    }

    if settings.dynatrace.api_token.is_empty() {
        bail!("Dynatrace API token cannot be empty");
    }

    if settings.dynatrace.request_timeout_secs == 0 {
        bail!("Dynatrace request_timeout_secs must be greater than 0");
    }

    // Validate Apdex settings
    if settings.apdex.target_seconds == 0 {
        bail!("Apdex target_seconds must be greater than 0");
    }

    if settings.export.interval_secs == 0 {
        bail!("Export interval_secs must be greater than 0");
    }

    // Validate metric identity
    if settings.metric.name.is_empty() {
        bail!("Metric name cannot be empty");
    }

    if settings.device.id.is_empty() {
        bail!("Device id cannot be empty");
    }

    if settings.device.ip_address.parse::<IpAddr>().is_err() {
        bail!(
            "Device ip_address must be an IP address, got '{}'",
            settings.device.ip_address
        );
    }

    // Validate log level
    let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_log_levels.contains(&settings.log_level.to_lowercase().as_str()) {
        bail!(
            "Invalid log level '{}'. Valid options are: {:?}",
            settings.log_level,
            valid_log_levels
        );
    }

    Ok(())
}
