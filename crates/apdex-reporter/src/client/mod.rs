pub mod dynatrace;

pub use dynatrace::DynatraceClient;

use crate::Result;
use async_trait::async_trait;
use mockall::automock;
use tracing::info;

/// Prefix the backend puts in front of every user-defined timeseries id.
pub const CUSTOM_METRIC_PREFIX: &str = "custom:";

pub fn custom_metric_id(name: &str) -> String {
    format!("{CUSTOM_METRIC_PREFIX}{name}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDefinition {
    pub name: String,
    pub display_name: String,
    pub unit: String,
    pub types: Vec<String>,
}

/// Synthetic device the data points are reported against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub id: String,
    pub display_name: String,
    pub ip_address: String,
    pub device_type: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataPoint {
    pub device: Device,
    pub metric_name: String,
    pub timestamp_ms: i64,
    pub value: f64,
}

/// The three backend operations the reporter depends on.
#[automock]
#[async_trait]
pub trait MetricBackend: Send + Sync {
    /// Every custom timeseries id known to the backend, prefix included.
    async fn custom_metrics(&self) -> Result<Vec<String>>;

    async fn metric_exists(&self, name: &str) -> Result<bool>;

    async fn register_metric(&self, definition: &MetricDefinition) -> Result<()>;

    /// Sends one data point and returns the raw response body.
    async fn publish(&self, data_point: &DataPoint) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    AlreadyExists,
    Created,
}

/// Registers `definition` unless the backend already knows it.
pub async fn ensure_metric_registered<B>(
    backend: &B,
    definition: &MetricDefinition,
) -> Result<Registration>
where
    B: MetricBackend + ?Sized,
{
    info!(metric = %definition.name, "checking if custom metric exists");

    if backend.metric_exists(&definition.name).await? {
        info!(metric = %definition.name, "custom metric exists");
        return Ok(Registration::AlreadyExists);
    }

    info!(metric = %definition.name, "custom metric does not exist; creating it");
    backend.register_metric(definition).await?;
    info!(metric = %definition.name, "custom metric created");

    Ok(Registration::Created)
}
