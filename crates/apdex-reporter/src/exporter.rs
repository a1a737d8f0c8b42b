use crate::{
    apdex::{SlidingWindow, TierCounts},
    client::{DataPoint, Device, MetricBackend},
};
use std::{sync::Arc, time::Duration};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Result of a single export tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The window was empty; nothing was sent.
    NoData,
    Published { apdex: f64, samples: usize },
    Failed { apdex: f64, samples: usize },
}

/// Periodically reports the window's Apdex as a custom metric data point.
pub struct Exporter<B: ?Sized> {
    window: Arc<SlidingWindow>,
    backend: Arc<B>,
    device: Device,
    metric_name: String,
    interval: Duration,
}

impl<B> Exporter<B>
where
    B: MetricBackend + ?Sized,
{
    pub fn new(
        window: Arc<SlidingWindow>,
        backend: Arc<B>,
        device: Device,
        metric_name: String,
        interval: Duration,
    ) -> Self {
        Self {
            window,
            backend,
            device,
            metric_name,
            interval,
        }
    }

    /// Ticks every `interval`, starting one interval from now, until cancelled.
    pub async fn run(&self, shutdown_listener: CancellationToken) {
        let mut export_timer = interval_at(Instant::now() + self.interval, self.interval);
        export_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(interval = ?self.interval, metric = %self.metric_name, "apdex exporter started");

        loop {
            tokio::select! {
                biased;
                _ = shutdown_listener.cancelled() => {
                    info!("shutdown signal received; stopping exporter");
                    break;
                }
                _ = export_timer.tick() => {
                    self.tick().await;
                }
            }
        }
    }

    /// Snapshot, aggregate and publish once. Failures are logged, never retried.
    pub async fn tick(&self) -> TickOutcome {
        // The window lock is released before any network I/O
        let snapshot = self.window.snapshot();
        let counts = TierCounts::tally(&snapshot);

        let Some(apdex) = counts.score() else {
            debug!("window is empty; skipping publish");
            metrics::counter!("apdex_reporter_export_skipped").increment(1);
            return TickOutcome::NoData;
        };
        let samples = counts.total();
        metrics::gauge!("apdex_reporter_score").set(apdex);

        let data_point = DataPoint {
            device: self.device.clone(),
            metric_name: self.metric_name.clone(),
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
            value: apdex,
        };

        match self.backend.publish(&data_point).await {
            Ok(body) => {
                debug!(%body, "backend response");
                info!(
                    apdex,
                    samples,
                    satisfied = counts.satisfied,
                    tolerating = counts.tolerating,
                    frustrated = counts.frustrated,
                    "published apdex data point"
                );
                metrics::counter!("apdex_reporter_publish_succeeded").increment(1);
                TickOutcome::Published { apdex, samples }
            }
            Err(err) => {
                if err.is_transient() {
                    warn!(?err, apdex, "failed to publish data point; will report again next tick");
                } else {
                    error!(?err, apdex, "failed to publish data point");
                }
                metrics::counter!("apdex_reporter_publish_failed").increment(1);
                TickOutcome::Failed { apdex, samples }
            }
        }
    }
}
