//! Detection-log replay binary.

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vigil_runner::RunnerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("vigil_engine=info".parse()?)
        .add_directive("vigil_runner=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    info!("Starting vigil-runner");

    let config = RunnerConfig::from_env().with_args(std::env::args().skip(1));
    info!("Runner config: {:?}", config);

    let summary = vigil_runner::run(config).await.context("Replay failed")?;

    for source in &summary.sources {
        info!(
            source_video = %source.source.source_video,
            frames = source.frames,
            alerts = source.alerts,
            rejected_frames = source.rejected_frames,
            "Source summary"
        );
    }
    if summary.failed_sources > 0 {
        warn!(failed = summary.failed_sources, "Some sources failed to replay");
    }
    info!(
        sources = summary.sources.len(),
        alerts_written = summary.alerts_written,
        training_vectors = ?summary.training_vectors,
        "Replay complete"
    );
    debug!("Metrics snapshot:\n{}", metrics.render());

    if summary.failed_sources > 0 {
        std::process::exit(1);
    }
    Ok(())
}
