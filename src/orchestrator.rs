use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::dataset::DatasetPaths;
use crate::error::StoreError;
use crate::evaluator::Evaluator;
use crate::grid::{self, JobSpec};
use crate::job::{JobResult, JobStatus};
use crate::store::ResultStore;
use crate::worker;

pub const DEFAULT_WORKERS: usize = 4;
pub const MAX_WORKERS: usize = 64;
pub const DEFAULT_RESULTS_FILE: &str = "results_summary.csv";
const ARTIFACTS_DIR: &str = "predictions";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    pub model_variants: Vec<String>,
    pub partitions: Vec<String>,
    pub workers: usize,
    pub output_dir: PathBuf,
    pub datasets: DatasetPaths,
    pub results_file: String,
}

impl RunConfig {
    pub fn new(output_dir: impl Into<PathBuf>, datasets: DatasetPaths) -> Self {
        Self {
            model_variants: Vec::new(),
            partitions: Vec::new(),
            workers: DEFAULT_WORKERS,
            output_dir: output_dir.into(),
            datasets,
            results_file: DEFAULT_RESULTS_FILE.to_string(),
        }
    }

    pub fn with_models<S: Into<String>>(mut self, models: impl IntoIterator<Item = S>) -> Self {
        self.model_variants = models.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_partitions<S: Into<String>>(
        mut self,
        partitions: impl IntoIterator<Item = S>,
    ) -> Self {
        self.partitions = partitions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn results_path(&self) -> PathBuf {
        self.output_dir.join(&self.results_file)
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.output_dir.join(ARTIFACTS_DIR)
    }

    pub fn pool_size(&self) -> usize {
        self.workers.clamp(1, MAX_WORKERS)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Init,
    Plan,
    Dispatch,
    Collect,
    Finish,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunPhase::Init => "init",
            RunPhase::Plan => "plan",
            RunPhase::Dispatch => "dispatch",
            RunPhase::Collect => "collect",
            RunPhase::Finish => "finish",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    /// Full result table, including rows carried over from earlier runs.
    pub table: Vec<JobResult>,
    pub results_path: PathBuf,
    pub grid_size: usize,
    pub skipped: usize,
    pub dispatched: usize,
    pub completed: usize,
    pub failed: usize,
}

impl RunReport {
    pub fn is_noop(&self) -> bool {
        self.dispatched == 0
    }
}

pub struct Orchestrator {
    config: RunConfig,
    evaluator: Arc<dyn Evaluator>,
}

impl Orchestrator {
    pub fn new(config: RunConfig, evaluator: Arc<dyn Evaluator>) -> Self {
        Self { config, evaluator }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn run(&self) -> Result<RunReport, StoreError> {
        let grid = grid::build_grid(&self.config.model_variants, &self.config.partitions);
        self.run_grid(grid)
    }

    /// Run an explicit job list. Pairs listed twice are both executed and the later
    /// result replaces the earlier one.
    pub fn run_grid(&self, grid: Vec<JobSpec>) -> Result<RunReport, StoreError> {
        enter(RunPhase::Init);
        let results_path = self.config.results_path();
        let mut store = ResultStore::load(&results_path)?;
        info!(
            path = %results_path.display(),
            rows = store.len(),
            "result table loaded"
        );

        enter(RunPhase::Plan);
        let completed = store.completed_keys();
        let planned = grid::plan_jobs(&grid, &completed);
        let skipped = grid.len() - planned.len();
        info!(
            grid = grid.len(),
            skipped,
            to_run = planned.len(),
            "job plan ready"
        );

        if planned.is_empty() {
            enter(RunPhase::Finish);
            return Ok(RunReport {
                table: store.into_rows(),
                results_path,
                grid_size: grid.len(),
                skipped,
                dispatched: 0,
                completed: 0,
                failed: 0,
            });
        }

        enter(RunPhase::Dispatch);
        let rx = self.dispatch(&planned);

        enter(RunPhase::Collect);
        let total = planned.len();
        let mut outstanding = vec![true; total];
        let mut received = 0usize;
        let mut completed_jobs = 0usize;
        let mut failed_jobs = 0usize;

        let mut record = |store: &mut ResultStore, result: JobResult| -> Result<(), StoreError> {
            match result.status {
                JobStatus::Completed => completed_jobs += 1,
                JobStatus::Error => failed_jobs += 1,
            }
            let status = result.status;
            let job = result.key();
            store.append_and_flush(result)?;
            info!(
                done = completed_jobs + failed_jobs,
                total,
                job = %job,
                status = %status,
                "saved result"
            );
            Ok(())
        };

        while received < total {
            let Ok((idx, result)) = rx.recv() else {
                break;
            };
            received += 1;
            if let Some(slot) = outstanding.get_mut(idx) {
                *slot = false;
            }
            record(&mut store, result)?;
        }

        for (idx, missing) in outstanding.iter().enumerate() {
            if !*missing {
                continue;
            }
            let job = &planned[idx];
            error!(job = %job, "worker exited without reporting a result");
            record(
                &mut store,
                JobResult::failed(job, "worker exited without reporting a result"),
            )?;
        }

        enter(RunPhase::Finish);
        Ok(RunReport {
            table: store.into_rows(),
            results_path,
            grid_size: grid.len(),
            skipped,
            dispatched: total,
            completed: completed_jobs,
            failed: failed_jobs,
        })
    }

    fn dispatch(&self, planned: &[JobSpec]) -> mpsc::Receiver<(usize, JobResult)> {
        let (tx, rx) = mpsc::channel();
        let artifacts_dir = self.config.artifacts_dir();
        let pool = build_pool(self.config.pool_size());

        for (idx, job) in planned.iter().cloned().enumerate() {
            let tx = tx.clone();
            let evaluator = Arc::clone(&self.evaluator);
            let paths = self.config.datasets.clone();
            let artifacts_dir = artifacts_dir.clone();
            let task = move || {
                let result = worker::run_job(&job, &paths, evaluator.as_ref(), &artifacts_dir);
                let _ = tx.send((idx, result));
            };
            match pool.as_ref() {
                Some(pool) => pool.spawn(task),
                None => task(),
            }
        }
        rx
    }
}

fn enter(phase: RunPhase) {
    info!(phase = %phase, "run phase");
}

fn build_pool(threads: usize) -> Option<rayon::ThreadPool> {
    match rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|idx| format!("minutes-worker-{idx}"))
        .panic_handler(|_| error!("worker thread panicked outside the job boundary"))
        .build()
    {
        Ok(pool) => Some(pool),
        Err(err) => {
            warn!(error = %err, "could not build worker pool; running jobs inline");
            None
        }
    }
}
