use apdex_reporter::{
    apdex::SlidingWindow,
    client::{DynatraceClient, ensure_metric_registered},
    exporter::Exporter,
    ingestor::Ingestor,
    server,
    settings::{AppArgs, Settings},
};
use anyhow::Context;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = AppArgs::parse();
    let settings = Settings::new(args.config)?;

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Some(metrics_addr) = settings.metrics_addr {
        PrometheusBuilder::new()
            .with_http_listener(metrics_addr)
            .install()?;
    }

    export_build_info();

    info!("{settings}");
    match settings.application_filter() {
        Some(app) => info!(application = %app, "filtering on application"),
        None => info!("no application filter; scoring all applications"),
    }

    let client = Arc::new(DynatraceClient::new(
        settings.server_url()?,
        settings.dynatrace.api_token.clone(),
        settings.request_timeout(),
    )?);

    // Exporting without a registered metric is pointless, so this is fatal
    ensure_metric_registered(client.as_ref(), &settings.metric_definition())
        .await
        .context("Could not register custom metric")?;

    let window = Arc::new(SlidingWindow::new(settings.apdex.window_size));
    let ingestor = Arc::new(Ingestor::new(
        window.clone(),
        settings.threshold(),
        settings.application_filter(),
    ));
    let exporter = Exporter::new(
        window,
        client,
        settings.device(),
        settings.metric.name.clone(),
        settings.export_interval(),
    );

    let listener = TcpListener::bind(settings.listen_addr)
        .await
        .with_context(|| format!("Could not bind to listener address {}", settings.listen_addr))?;

    let shutdown_listener = shutdown_listener();

    info!(
        listen_addr = %settings.listen_addr,
        dynatrace = %settings.dynatrace.server_url,
        window_size = settings.apdex.window_size,
        target_seconds = settings.apdex.target_seconds,
        "Apdex reporter starting"
    );

    if let Err(err) = server::run(listener, ingestor, exporter, shutdown_listener).await {
        error!(?err, "beacon listener exited with error");
    }

    info!("Apdex reporter shutting down");

    Ok(())
}

fn shutdown_listener() -> CancellationToken {
    let cancellation_token = CancellationToken::new();
    tokio::spawn({
        let cancellation_token = cancellation_token.clone();
        async move {
            let terminate = async {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut sigterm) => {
                        sigterm.recv().await;
                    }
                    Err(err) => {
                        error!(?err, "sigterm listener failed");
                        std::future::pending::<()>().await;
                    }
                }
            };

            tokio::select! {
                _ = terminate => cancellation_token.cancel(),
                _ = signal::ctrl_c() => cancellation_token.cancel(),
            }
        }
    });

    cancellation_token
}

fn export_build_info() {
    let version = option_env!("BUILD_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"));
    let build_commit = option_env!("BUILD_COMMIT").unwrap_or("UNKNOWN");
    let build_date = option_env!("DATE").unwrap_or("UNKNOWN");
    let pkg_version = env!("CARGO_PKG_VERSION");

    metrics::gauge!(
        "apdex_reporter_build_info",
        "version" => version,
        "commit" => build_commit,
        "date" => build_date,
        "pkg_version" => pkg_version
    )
    .set(1);
}
