use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;

use crate::archive;
use crate::client::DatasetClient;
use crate::config::PipelineConfig;
use crate::deadline::{CancelFlag, Deadline};
use crate::download::{self, DownloadInfo};
use crate::error::LiftError;
use crate::loader::RecordLoader;
use crate::metrics::{MetricsPipeline, StageTiming};
use crate::names;
use crate::revision::{RevisionGate, RevisionStatus};
use crate::store::{Store, storage_error, watch_deadline};

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// Forwards progress events to the tracing subscriber.
pub struct LogSink;

impl ProgressSink for LogSink {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => tracing::info!(
                elapsed_ms = elapsed.as_millis() as u64,
                "{}",
                event.message
            ),
            None => tracing::info!("{}", event.message),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Skip the revision comparison and always refresh.
    pub force: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncResult {
    pub updated: bool,
    pub revision: Option<RevisionStatus>,
    pub download: Option<DownloadInfo>,
    pub csv_path: Option<PathBuf>,
    pub rows_loaded: usize,
    pub stages: Vec<StageTiming>,
    pub names_exported: usize,
    pub finished_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecomputeResult {
    pub stages: Vec<StageTiming>,
    pub finished_at: String,
}

/// Runs the revision-gated chain: gate, download, extract, load, metrics.
pub struct Syncer<C: DatasetClient> {
    client: C,
    config: PipelineConfig,
    pipeline: MetricsPipeline,
    cancel: CancelFlag,
}

impl<C: DatasetClient> Syncer<C> {
    pub fn new(client: C, config: PipelineConfig) -> Self {
        Self {
            client,
            config,
            pipeline: MetricsPipeline::default(),
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_pipeline(mut self, pipeline: MetricsPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn deadline(&self, timeout: Duration) -> Deadline {
        Deadline::after(timeout).with_cancel(self.cancel.clone())
    }

    pub fn check(&self) -> Result<RevisionStatus, LiftError> {
        RevisionGate::check(
            &self.client,
            &self.config.revision_url,
            self.config.data_dir.as_std_path(),
            &self.config.csv_prefix,
            &self.deadline(self.config.revision_timeout),
        )
    }

    pub fn sync(&self, options: SyncOptions, sink: &dyn ProgressSink) -> Result<SyncResult, LiftError> {
        let run_started = Instant::now();

        let revision = if options.force {
            sink.event(ProgressEvent {
                message: "phase=Check; skipped (forced)".to_string(),
                elapsed: None,
            });
            None
        } else {
            sink.event(ProgressEvent {
                message: "phase=Check; comparing revisions".to_string(),
                elapsed: None,
            });
            let status = self.check()?;
            if !status.update_required {
                sink.event(ProgressEvent {
                    message: "phase=Done; dataset is current".to_string(),
                    elapsed: Some(run_started.elapsed()),
                });
                return Ok(SyncResult {
                    updated: false,
                    revision: Some(status),
                    download: None,
                    csv_path: None,
                    rows_loaded: 0,
                    stages: Vec::new(),
                    names_exported: 0,
                    finished_at: Utc::now().to_rfc3339(),
                });
            }
            Some(status)
        };

        // Download, extraction and loading share one budget.
        let setup = self.deadline(self.config.download_timeout);
        let archive_path = self.config.archive_path();

        sink.event(ProgressEvent {
            message: format!("phase=Download; {}", self.config.data_url),
            elapsed: None,
        });
        let started = Instant::now();
        let info = download::fetch_archive(
            &self.client,
            &self.config.data_url,
            archive_path.as_std_path(),
            &setup,
        )?;
        sink.event(ProgressEvent {
            message: format!("download.done bytes={}", info.bytes_written),
            elapsed: Some(started.elapsed()),
        });

        sink.event(ProgressEvent {
            message: "phase=Extract; locating CSV member".to_string(),
            elapsed: None,
        });
        let csv_path = archive::extract_first_csv(
            archive_path.as_std_path(),
            self.config.data_dir.as_std_path(),
            &setup,
        )?;

        // The extracted file name is the only record of the local revision, so
        // it must not outlive a failed load.
        let (store, rows_loaded, stages) = match self.load_and_compute(&csv_path, &setup, sink) {
            Ok(loaded) => loaded,
            Err(err) => {
                if let Err(remove_err) = fs::remove_file(&csv_path) {
                    tracing::warn!(error = %remove_err, path = %csv_path.display(), "failed to discard extracted CSV");
                }
                return Err(err);
            }
        };

        sink.event(ProgressEvent {
            message: "phase=Export; writing lifter names".to_string(),
            elapsed: None,
        });
        let names_exported =
            names::export_lifter_names(&store, self.config.lifters_json_path().as_std_path())?;

        sink.event(ProgressEvent {
            message: "phase=Done; dataset refreshed".to_string(),
            elapsed: Some(run_started.elapsed()),
        });

        Ok(SyncResult {
            updated: true,
            revision,
            download: Some(info),
            csv_path: Some(csv_path),
            rows_loaded,
            stages,
            names_exported,
            finished_at: Utc::now().to_rfc3339(),
        })
    }

    fn load_and_compute(
        &self,
        csv_path: &Path,
        setup: &Deadline,
        sink: &dyn ProgressSink,
    ) -> Result<(Store, usize, Vec<StageTiming>), LiftError> {
        sink.event(ProgressEvent {
            message: "phase=Parse; reading records".to_string(),
            elapsed: None,
        });
        let started = Instant::now();
        let mut records = RecordLoader::read_records(csv_path)?;
        sink.event(ProgressEvent {
            message: format!("parse.done rows={}", records.len()),
            elapsed: Some(started.elapsed()),
        });

        sink.event(ProgressEvent {
            message: "phase=Load; replacing records and recomputing metrics".to_string(),
            elapsed: None,
        });
        let started = Instant::now();
        let mut store = Store::open(self.config.database_path().as_std_path())?;
        let (rows, stages) = store.with_deadline(setup, |conn| {
            let tx = conn
                .transaction()
                .map_err(|err| storage_error(err, "begin sync", setup))?;
            let rows = RecordLoader::replace_records(&tx, &mut records, setup)?;

            let metrics = self.deadline(self.config.metrics_timeout);
            watch_deadline(&tx, &metrics);
            let stages = self.pipeline.execute(&tx, &metrics)?;

            tx.commit()
                .map_err(|err| storage_error(err, "commit sync", &metrics))?;
            Ok((rows, stages))
        })?;
        sink.event(ProgressEvent {
            message: format!("load.done rows={rows} stages={}", stages.len()),
            elapsed: Some(started.elapsed()),
        });
        Ok((store, rows, stages))
    }

    /// Reruns the metrics chain over the records already in the store.
    pub fn recompute(&self, sink: &dyn ProgressSink) -> Result<RecomputeResult, LiftError> {
        sink.event(ProgressEvent {
            message: "phase=Metrics; recomputing derived tables".to_string(),
            elapsed: None,
        });
        let started = Instant::now();
        let mut store = Store::open(self.config.database_path().as_std_path())?;
        let stages = self
            .pipeline
            .run(&mut store, &self.deadline(self.config.metrics_timeout))?;
        sink.event(ProgressEvent {
            message: format!("metrics.done stages={}", stages.len()),
            elapsed: Some(started.elapsed()),
        });
        Ok(RecomputeResult {
            stages,
            finished_at: Utc::now().to_rfc3339(),
        })
    }

    pub fn export_names(&self) -> Result<usize, LiftError> {
        let store = Store::open(self.config.database_path().as_std_path())?;
        names::export_lifter_names(&store, self.config.lifters_json_path().as_std_path())
    }
}
