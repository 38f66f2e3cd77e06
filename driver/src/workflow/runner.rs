use crate::workflow::audio::read_stereo_wav;
use crate::workflow::config::WorkflowConfig;
use anyhow::{bail, Context};
use aoacore::interface::{Estimate, EstimateRecord};
use aoacore::telemetry::{Metrics, MetricsRecorder};
use aoacore::Estimator;
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Builder;
use tokio::sync::Semaphore;

#[derive(Debug)]
pub struct BatchResult {
    pub records: Vec<EstimateRecord>,
    pub metrics: Metrics,
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
    estimator: Arc<Estimator>,
    metrics: Arc<MetricsRecorder>,
}

/// Recordings are numbered from one: `1.wav`, `2.wav`, ...
pub fn recording_path(directory: &Path, index: usize) -> PathBuf {
    directory.join(format!("{}.wav", index))
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> anyhow::Result<Self> {
        let estimator =
            Estimator::new(config.estimator.clone()).context("building the estimator")?;
        Ok(Self {
            config,
            estimator: Arc::new(estimator),
            metrics: Arc::new(MetricsRecorder::new()),
        })
    }

    /// Estimates recordings `1..=count` of `directory` in parallel.
    ///
    /// At most `workers` recordings are in flight at once. Records come back
    /// in input order. A failed recording yields a failure record; in strict
    /// mode it aborts the batch and no further recordings are started.
    pub fn execute(&self, directory: &Path, count: usize) -> anyhow::Result<BatchResult> {
        let workers = self.config.effective_workers();
        let strict = self.config.strict;
        info!("processing {} recordings with {} workers", count, workers);

        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(workers)
            .build()
            .context("creating the estimation runtime")?;

        let records = runtime.block_on(async {
            let slots = Arc::new(Semaphore::new(workers));
            let failed = Arc::new(AtomicBool::new(false));

            let mut handles = Vec::with_capacity(count);
            for index in 1..=count {
                let permit = slots
                    .clone()
                    .acquire_owned()
                    .await
                    .context("waiting for a worker slot")?;
                if strict && failed.load(Ordering::SeqCst) {
                    break;
                }
                let estimator = self.estimator.clone();
                let metrics = self.metrics.clone();
                let failed = failed.clone();
                let path = recording_path(directory, index);
                handles.push(tokio::task::spawn_blocking(move || {
                    let record = run_one(&estimator, &metrics, index, &path);
                    if record.error.is_some() {
                        failed.store(true, Ordering::SeqCst);
                    }
                    drop(permit);
                    record
                }));
            }

            let mut records = Vec::with_capacity(handles.len());
            let mut pending = handles.into_iter();
            while let Some(handle) = pending.next() {
                let record = handle.await.context("joining an estimation task")?;
                match (&record.estimate, &record.error) {
                    (Some(estimate), _) => println!(
                        "{:6}: Estimated Angle is {:.2} degree",
                        record.index, estimate.angle_deg
                    ),
                    (None, Some(error)) if strict => {
                        for rest in pending.by_ref() {
                            rest.abort();
                        }
                        bail!("recording {} failed: {}", record.file, error);
                    }
                    (None, _) => println!("{:6}: failed", record.index),
                }
                records.push(record);
            }
            Ok::<_, anyhow::Error>(records)
        })?;

        Ok(BatchResult {
            records,
            metrics: self.metrics.snapshot(),
        })
    }
}

fn estimate_file(estimator: &Estimator, path: &Path) -> anyhow::Result<Estimate> {
    let pair = read_stereo_wav(path)?;
    estimator
        .estimate_pair(pair)
        .with_context(|| format!("estimating {}", path.display()))
}

fn run_one(
    estimator: &Estimator,
    metrics: &MetricsRecorder,
    index: usize,
    path: &Path,
) -> EstimateRecord {
    let file = path.display().to_string();
    match estimate_file(estimator, path) {
        Ok(estimate) => {
            metrics.record_processed(estimate.low_confidence);
            EstimateRecord::success(index, file, estimate)
        }
        Err(err) => {
            warn!("{:#}", err);
            metrics.record_error();
            EstimateRecord::failure(index, file, format!("{:#}", err))
        }
    }
}

/// Writes one angle per line in input order; failures are written as `nan`.
pub fn write_results(path: &Path, records: &[EstimateRecord]) -> anyhow::Result<()> {
    let mut contents = String::new();
    for record in records {
        let angle = record.angle_or_nan();
        if angle.is_nan() {
            contents.push_str("nan\n");
        } else {
            contents.push_str(&format!("{:?}\n", angle));
        }
    }
    fs::write(path, contents).with_context(|| format!("writing results to {}", path.display()))
}

pub fn write_report(path: &Path, records: &[EstimateRecord]) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(records).context("serializing the report")?;
    fs::write(path, json).with_context(|| format!("writing report to {}", path.display()))
}
