use crate::{
    Error, Result,
    client::{DataPoint, MetricBackend, MetricDefinition, custom_metric_id},
};
use async_trait::async_trait;
use reqwest::{
    Client, Method, RequestBuilder, StatusCode,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

const TIMESERIES_PATH: &str = "/api/v1/timeseries";
const CUSTOM_DEVICE_PATH: &str = "/api/v1/entity/infrastructure/custom";
const ERROR_MARKER: &str = r#"{"error""#;
const DEVICE_FAVICON: &str =
    "https://dt-cdn.net/assets/images/brand/dynatrace-logo-33a874730e.svg";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimeseriesRecord {
    #[serde(default)]
    timeseries_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterMetricBody<'a> {
    display_name: &'a str,
    unit: &'a str,
    types: &'a [String],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CustomDeviceReport<'a> {
    display_name: &'a str,
    ip_addresses: [&'a str; 1],
    #[serde(rename = "type")]
    device_type: &'a str,
    favicon: &'a str,
    series: [Series; 1],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Series {
    timeseries_id: String,
    data_points: [(i64, f64); 1],
}

impl<'a> CustomDeviceReport<'a> {
    fn new(data_point: &'a DataPoint) -> Self {
        Self {
            display_name: &data_point.device.display_name,
            ip_addresses: [&data_point.device.ip_address],
            device_type: &data_point.device.device_type,
            favicon: DEVICE_FAVICON,
            series: [Series {
                timeseries_id: custom_metric_id(&data_point.metric_name),
                data_points: [(data_point.timestamp_ms, data_point.value)],
            }],
        }
    }
}

/// Dynatrace v1 API client, authenticated with an API token.
#[derive(Debug, Clone)]
pub struct DynatraceClient {
    http: Client,
    server_url: Url,
    api_token: String,
}

impl DynatraceClient {
    pub fn new(server_url: Url, api_token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            server_url,
            api_token: api_token.into(),
        })
    }

    pub fn server_url(&self) -> &Url {
        &self.server_url
    }

    // Paths are appended verbatim so a server URL with an environment
    // prefix (https://host/e/<env-id>) keeps it.
    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = Url::parse(&format!(
            "{}{path}",
            self.server_url.as_str().trim_end_matches('/')
        ))?;

        Ok(self
            .http
            .request(method, url)
            .header(AUTHORIZATION, format!("Api-Token {}", self.api_token)))
    }
}

#[async_trait]
impl MetricBackend for DynatraceClient {
    async fn custom_metrics(&self) -> Result<Vec<String>> {
        let response = self
            .request(Method::GET, &format!("{TIMESERIES_PATH}?filter=CUSTOM"))?
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::UnexpectedStatus {
                status,
                operation: "list_custom_metrics",
                body: response.text().await.unwrap_or_default(),
            });
        }

        let records: Vec<TimeseriesRecord> = serde_json::from_slice(&response.bytes().await?)?;
        let metrics: Vec<String> = records
            .into_iter()
            .filter_map(|record| record.timeseries_id)
            .collect();
        debug!(count = metrics.len(), "fetched custom metric catalog");

        Ok(metrics)
    }

    async fn metric_exists(&self, name: &str) -> Result<bool> {
        let id = custom_metric_id(name);
        Ok(self.custom_metrics().await?.iter().any(|m| *m == id))
    }

    async fn register_metric(&self, definition: &MetricDefinition) -> Result<()> {
        let body = serde_json::to_vec(&RegisterMetricBody {
            display_name: &definition.display_name,
            unit: &definition.unit,
            types: &definition.types,
        })?;

        let path = format!("{TIMESERIES_PATH}/{}/", custom_metric_id(&definition.name));
        let response = self
            .request(Method::PUT, &path)?
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if text.trim_start().starts_with(ERROR_MARKER) {
            return Err(Error::Registration {
                metric: definition.name.clone(),
                body: text,
            });
        }
        if !status.is_success() {
            return Err(Error::UnexpectedStatus {
                status,
                operation: "register_metric",
                body: text,
            });
        }

        Ok(())
    }

    async fn publish(&self, data_point: &DataPoint) -> Result<String> {
        let body = serde_json::to_vec(&CustomDeviceReport::new(data_point))?;

        let path = format!("{CUSTOM_DEVICE_PATH}/{}", data_point.device.id);
        let response = self
            .request(Method::POST, &path)?
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(Error::UnexpectedStatus {
                status,
                operation: "publish",
                body: text,
            });
        }

        Ok(text)
    }
}
