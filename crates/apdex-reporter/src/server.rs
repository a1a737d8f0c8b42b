use crate::{beacon, client::MetricBackend, exporter::Exporter, ingestor::Ingestor};
use axum::{Router, body::Bytes, extract::State, routing::get};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

pub fn router(ingestor: Arc<Ingestor>) -> Router {
    Router::new()
        .route("/", get(status).post(ingest))
        .with_state(ingestor)
}

/// Serves the beacon endpoint until `shutdown_listener` is cancelled.
pub async fn serve(
    listener: TcpListener,
    ingestor: Arc<Ingestor>,
    shutdown_listener: CancellationToken,
) -> crate::Result<()> {
    info!(addr = ?listener.local_addr()?, "beacon listener started");

    axum::serve(listener, router(ingestor))
        .with_graceful_shutdown(async move { shutdown_listener.cancelled().await })
        .await?;

    Ok(())
}

/// Runs the exporter and the beacon listener until `shutdown_listener` is
/// cancelled. Returns once in-flight requests have been answered and the
/// exporter has stopped.
pub async fn run<B>(
    listener: TcpListener,
    ingestor: Arc<Ingestor>,
    exporter: Exporter<B>,
    shutdown_listener: CancellationToken,
) -> crate::Result<()>
where
    B: MetricBackend + 'static,
{
    let exporter_task = tokio::spawn({
        let shutdown_listener = shutdown_listener.clone();
        async move { exporter.run(shutdown_listener).await }
    });

    let served = serve(listener, ingestor, shutdown_listener.clone()).await;

    // The listener can also stop on its own error; the exporter goes with it
    shutdown_listener.cancel();
    if let Err(err) = exporter_task.await {
        error!(?err, "apdex exporter task failed");
    }

    served
}

async fn ingest(State(ingestor): State<Arc<Ingestor>>, body: Bytes) -> &'static str {
    let visits = beacon::parse(&body);
    debug!(visits = visits.len(), "received beacon");

    for visit in &visits {
        ingestor.ingest(&visit.user_actions);
    }

    "OK"
}

async fn status(State(ingestor): State<Arc<Ingestor>>) -> String {
    let status = ingestor.status();

    let mut out = format!(
        "visitCount: {}\nactionCount: {}\nbufferSize: {}\n",
        status.visit_count, status.action_count, status.buffer_size
    );
    if let Some(apdex) = status.apdex {
        out.push_str(&format!("apdex: {apdex}\n"));
    }
    out
}
