pub mod config;
pub mod dataset;
pub mod error;
pub mod evaluator;
pub mod grid;
pub mod job;
pub mod metrics;
pub mod orchestrator;
pub mod persist;
pub mod store;
pub mod summary;
pub mod synthetic;
pub mod telemetry;
pub mod worker;

pub use dataset::{DatasetPaths, PartitionData, PartitionRow};
pub use error::{EvalError, JobError, StoreError};
pub use evaluator::{BaselineEvaluator, CommandEvaluator, Evaluation, Evaluator};
pub use grid::{JobKey, JobSpec, build_grid};
pub use job::{JobResult, JobStatus, PredictionArtifact};
pub use orchestrator::{Orchestrator, RunConfig, RunReport};
pub use store::ResultStore;
