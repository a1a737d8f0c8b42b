use crate::{
    apdex::{ApdexThreshold, Sample, SlidingWindow, TierCounts},
    beacon::UserAction,
};
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use tracing::trace;

/// Point-in-time view used by the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Status {
    pub visit_count: u64,
    pub action_count: u64,
    pub buffer_size: usize,
    pub apdex: Option<f64>,
}

/// Classifies incoming user actions into the shared window and keeps
/// process-lifetime visit and action counters.
#[derive(Debug)]
pub struct Ingestor {
    window: Arc<SlidingWindow>,
    threshold: ApdexThreshold,
    application_filter: Option<String>,
    visit_count: AtomicU64,
    action_count: AtomicU64,
}

impl Ingestor {
    pub fn new(
        window: Arc<SlidingWindow>,
        threshold: ApdexThreshold,
        application_filter: Option<String>,
    ) -> Self {
        Self {
            window,
            threshold,
            application_filter: application_filter.filter(|app| !app.is_empty()),
            visit_count: AtomicU64::new(0),
            action_count: AtomicU64::new(0),
        }
    }

    pub fn window(&self) -> &Arc<SlidingWindow> {
        &self.window
    }

    pub fn application_filter(&self) -> Option<&str> {
        self.application_filter.as_deref()
    }

    /// Ingests one visit using the configured application filter.
    pub fn ingest(&self, actions: &[UserAction]) {
        self.ingest_with_filter(actions, self.application_filter.as_deref());
    }

    /// Ingests one visit. The visit counter moves even if every action is
    /// filtered out.
    pub fn ingest_with_filter(&self, actions: &[UserAction], application_filter: Option<&str>) {
        self.visit_count.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("apdex_reporter_visits").increment(1);

        for action in actions {
            if application_filter.is_some_and(|app| app != action.application) {
                trace!(application = %action.application, "skipping filtered action");
                continue;
            }

            self.action_count.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("apdex_reporter_actions").increment(1);

            let response_time = action.response_time();
            self.window.enqueue(Sample {
                start_time: action.start_time,
                response_time,
                tier: self.threshold.classify(response_time),
            });
        }
    }

    pub fn visit_count(&self) -> u64 {
        self.visit_count.load(Ordering::Relaxed)
    }

    pub fn action_count(&self) -> u64 {
        self.action_count.load(Ordering::Relaxed)
    }

    pub fn status(&self) -> Status {
        let snapshot = self.window.snapshot();
        Status {
            visit_count: self.visit_count(),
            action_count: self.action_count(),
            buffer_size: snapshot.len(),
            apdex: TierCounts::tally(&snapshot).score(),
        }
    }
}
