//! Concurrent replay of detection logs.
//!
//! Each source gets a reader task feeding whole frames, in order, through a
//! bounded channel to the task that owns the source's engine. Alert rows
//! from every source funnel into a single sink writer.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, Semaphore};
use tracing::{error, info, warn};
use vigil_engine::{AlertSink, EngineConfig, EngineError, FeatureDataset, JsonlAlertSink, SurveillanceEngine};
use vigil_models::{AlertRecord, FrameObservations, SourceInfo};

use crate::config::RunnerConfig;
use crate::detection::{DetectionRecord, FrameGrouper};
use crate::error::{RunnerError, RunnerResult};

/// Outcome of replaying one source.
#[derive(Debug, Serialize)]
pub struct SourceSummary {
    pub source: SourceInfo,
    pub frames: u64,
    pub alerts: usize,
    /// Frames the engine refused because their id did not increase
    pub rejected_frames: usize,
    #[serde(skip)]
    pub dataset: Option<FeatureDataset>,
}

/// Outcome of a whole run.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub sources: Vec<SourceSummary>,
    pub failed_sources: usize,
    pub alerts_written: usize,
    pub training_vectors: Option<usize>,
}

/// Source metadata for a log file: its name and its parent folder's name.
pub fn source_info(path: &Path) -> SourceInfo {
    let name = |p: Option<&Path>| {
        p.and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    };
    SourceInfo::new(name(Some(path)), name(path.parent()))
}

/// Stream a log file as whole frames.
async fn read_frames(path: PathBuf, fps: f64, tx: mpsc::Sender<FrameObservations>) -> RunnerResult<usize> {
    let file = tokio::fs::File::open(&path).await?;
    let mut lines = BufReader::new(file).lines();
    let mut grouper = FrameGrouper::new(fps);
    let mut line_no = 0usize;
    let mut sent = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let record = match DetectionRecord::parse_line(&line) {
            Ok(Some(record)) => record,
            Ok(None) => continue,
            Err(e) => {
                return Err(RunnerError::InvalidDetection {
                    path,
                    line: line_no,
                    message: e.to_string(),
                })
            }
        };
        if let Some(frame) = grouper.push(record) {
            tx.send(frame)
                .await
                .map_err(|_| RunnerError::channel_closed("engine task stopped"))?;
            sent += 1;
        }
    }

    if let Some(frame) = grouper.finish() {
        tx.send(frame)
            .await
            .map_err(|_| RunnerError::channel_closed("engine task stopped"))?;
        sent += 1;
    }
    Ok(sent)
}

/// Replay one log through a fresh engine, forwarding alert rows.
pub async fn replay_source(
    path: PathBuf,
    engine_config: EngineConfig,
    alerts_tx: mpsc::Sender<AlertRecord>,
    frame_capacity: usize,
) -> RunnerResult<SourceSummary> {
    let source = source_info(&path);
    let fps = engine_config.fps;
    let mut engine = SurveillanceEngine::new(engine_config)?;

    info!(
        source_video = %source.source_video,
        source_folder = %source.source_folder,
        "Replaying source"
    );

    let (tx, mut rx) = mpsc::channel(frame_capacity.max(1));
    let reader = tokio::spawn(read_frames(path, fps, tx));

    let mut alerts = 0usize;
    let mut rejected_frames = 0usize;
    while let Some(frame) = rx.recv().await {
        match engine.process_frame(&frame) {
            Ok(report) => {
                for alert in &report.alerts {
                    alerts_tx
                        .send(AlertRecord::from_alert(alert, &source))
                        .await
                        .map_err(|_| RunnerError::channel_closed("alert writer stopped"))?;
                }
                alerts += report.alerts.len();
            }
            Err(EngineError::OutOfOrderFrame { last, got }) => {
                warn!(
                    source_video = %source.source_video,
                    last,
                    got,
                    "Dropping out-of-order frame"
                );
                rejected_frames += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    reader
        .await
        .map_err(|e| RunnerError::task_failed(format!("reader task: {}", e)))??;

    let frames = engine.frames_processed();
    let dataset = engine.finish();

    info!(
        source_video = %source.source_video,
        frames,
        alerts,
        rejected_frames,
        "Source replay complete"
    );

    Ok(SourceSummary {
        source,
        frames,
        alerts,
        rejected_frames,
        dataset,
    })
}

/// Drain alert rows into `sink` on a blocking thread until every sender is gone.
pub fn spawn_sink_writer<S>(
    mut sink: S,
    mut rx: mpsc::Receiver<AlertRecord>,
) -> tokio::task::JoinHandle<RunnerResult<usize>>
where
    S: AlertSink + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut written = 0usize;
        while let Some(record) = rx.blocking_recv() {
            sink.emit(&record)?;
            written += 1;
        }
        sink.flush()?;
        Ok(written)
    })
}

/// Replay every configured input.
///
/// A failing source is logged and counted; the others still complete.
pub async fn run(config: RunnerConfig) -> RunnerResult<RunSummary> {
    config.validate()?;
    let engine_config = config.engine_config()?;

    let sink = JsonlAlertSink::open(&config.alerts_path)?;
    let (alerts_tx, alerts_rx) = mpsc::channel(config.alert_channel_capacity);
    let writer = spawn_sink_writer(sink, alerts_rx);

    let semaphore = Arc::new(Semaphore::new(config.max_concurrent_sources));
    let mut handles = Vec::with_capacity(config.inputs.len());
    for path in &config.inputs {
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| RunnerError::task_failed("Semaphore closed"))?;

        let task_path = path.clone();
        let engine_config = engine_config.clone();
        let alerts_tx = alerts_tx.clone();
        let capacity = config.frame_channel_capacity;
        let handle = tokio::spawn(async move {
            let _permit = permit;
            replay_source(task_path, engine_config, alerts_tx, capacity).await
        });
        handles.push((path.clone(), handle));
    }
    drop(alerts_tx);

    let mut sources = Vec::with_capacity(handles.len());
    let mut failed_sources = 0usize;
    for (path, handle) in handles {
        match handle.await {
            Ok(Ok(summary)) => sources.push(summary),
            Ok(Err(e)) => {
                error!(path = %path.display(), error = %e, "Source replay failed");
                failed_sources += 1;
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Source task panicked");
                failed_sources += 1;
            }
        }
    }

    let alerts_written = writer
        .await
        .map_err(|e| RunnerError::task_failed(format!("sink writer: {}", e)))??;

    let training_vectors = match &config.features_path {
        Some(path) => {
            let mut merged = FeatureDataset::new(Vec::new(), 0);
            for summary in sources.iter_mut() {
                if let Some(dataset) = summary.dataset.take() {
                    merged.extend(dataset);
                }
            }
            merged.save(path)?;
            Some(merged.len())
        }
        None => None,
    };

    Ok(RunSummary {
        sources,
        failed_sources,
        alerts_written,
        training_vectors,
    })
}
