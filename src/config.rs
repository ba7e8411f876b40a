use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use tracing::Level;

use crate::dataset::DatasetPaths;
use crate::evaluator::{BaselineEvaluator, CommandEvaluator, Evaluator};
use crate::grid::parse_ids;
use crate::orchestrator::{DEFAULT_RESULTS_FILE, DEFAULT_WORKERS, RunConfig};

pub const DEFAULT_MODELS: &str =
    "last_value,rolling_mean,rolling_median,training_mean,lag_regression";
pub const DEFAULT_PARTITIONS: &str = "GK,DEF,MID,FWD";

#[derive(Debug, Clone, Args)]
pub struct LogArgs {
    /// Default log level when RUST_LOG is unset.
    #[arg(long, env = "MINUTES_LAB_LOG_LEVEL", default_value = "info")]
    pub log_level: Level,

    /// Emit newline-delimited JSON logs.
    #[arg(long, env = "MINUTES_LAB_LOG_JSON")]
    pub log_json: bool,
}

impl LogArgs {
    pub fn init(&self) {
        crate::telemetry::init_tracing(self.log_json, self.log_level);
    }
}

/// Where the partitioned datasets live.
#[derive(Debug, Clone, Args)]
pub struct DataArgs {
    /// Directory holding training_dictionary.json and validation_dictionary.json.
    #[arg(long, env = "MINUTES_LAB_DATA_DIR", default_value = "datasets")]
    pub data_dir: PathBuf,

    /// Training dataset path, overriding --data-dir.
    #[arg(long, env = "MINUTES_LAB_TRAIN")]
    pub train: Option<PathBuf>,

    /// Validation dataset path, overriding --data-dir.
    #[arg(long, env = "MINUTES_LAB_VALIDATION")]
    pub validation: Option<PathBuf>,
}

impl DataArgs {
    pub fn paths(&self) -> DatasetPaths {
        let defaults = DatasetPaths::in_dir(&self.data_dir);
        DatasetPaths {
            train: self.train.clone().unwrap_or(defaults.train),
            validation: self.validation.clone().unwrap_or(defaults.validation),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Comma separated model variants.
    #[arg(long, env = "MINUTES_LAB_MODELS", default_value = DEFAULT_MODELS)]
    pub models: String,

    /// Comma separated partition ids.
    #[arg(long, env = "MINUTES_LAB_PARTITIONS", default_value = DEFAULT_PARTITIONS)]
    pub partitions: String,

    /// Concurrent worker limit (clamped to 1..=64).
    #[arg(long, env = "MINUTES_LAB_WORKERS", default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// Directory for the result table and prediction artifacts.
    #[arg(long, env = "MINUTES_LAB_OUTPUT_DIR", default_value = "outputs/experiments")]
    pub output_dir: PathBuf,

    /// Result table file name inside the output directory.
    #[arg(long, env = "MINUTES_LAB_RESULTS_FILE", default_value = DEFAULT_RESULTS_FILE)]
    pub results_file: String,

    #[command(flatten)]
    pub data: DataArgs,

    /// External fit-and-score program; built-in baselines are used when absent.
    #[arg(long, env = "MINUTES_LAB_EVALUATOR_CMD")]
    pub evaluator_cmd: Option<PathBuf>,

    /// Extra argument for the evaluator program (repeatable).
    #[arg(long = "evaluator-arg", allow_hyphen_values = true)]
    pub evaluator_args: Vec<String>,
}

impl RunArgs {
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            model_variants: parse_ids(&self.models),
            partitions: parse_ids(&self.partitions),
            workers: self.workers,
            output_dir: self.output_dir.clone(),
            datasets: self.data.paths(),
            results_file: self.results_file.clone(),
        }
    }

    pub fn evaluator(&self) -> Arc<dyn Evaluator> {
        match self.evaluator_cmd.as_ref() {
            Some(cmd) => {
                Arc::new(CommandEvaluator::new(cmd).with_args(self.evaluator_args.clone()))
            }
            None => Arc::new(BaselineEvaluator),
        }
    }
}
