use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use tracing::{debug, info, warn};

use crate::dataset::{self, DatasetPaths};
use crate::error::JobError;
use crate::evaluator::{Evaluation, Evaluator};
use crate::grid::JobSpec;
use crate::job::{self, JobResult, PredictionArtifact};
use crate::metrics;
use crate::persist;

/// Run one job end to end. Never panics and never returns an error: every failure
/// becomes an `error` row.
pub fn run_job(
    spec: &JobSpec,
    paths: &DatasetPaths,
    evaluator: &dyn Evaluator,
    artifacts_dir: &Path,
) -> JobResult {
    info!(
        model_variant = %spec.model_variant,
        partition_id = %spec.partition_id,
        "starting job"
    );

    match execute(spec, paths, evaluator, artifacts_dir) {
        Ok(result) => {
            info!(
                model_variant = %spec.model_variant,
                partition_id = %spec.partition_id,
                rmse = result.rmse.unwrap_or_default(),
                mae = result.mae.unwrap_or_default(),
                "job completed"
            );
            result
        }
        Err(err) => {
            warn!(
                model_variant = %spec.model_variant,
                partition_id = %spec.partition_id,
                error = %err,
                "job failed"
            );
            JobResult::failed(spec, err.to_string())
        }
    }
}

fn execute(
    spec: &JobSpec,
    paths: &DatasetPaths,
    evaluator: &dyn Evaluator,
    artifacts_dir: &Path,
) -> Result<JobResult, JobError> {
    let data = dataset::load_partition(paths, &spec.partition_id)?;
    debug!(
        job = %spec,
        train_rows = data.train.len(),
        validation_rows = data.validation.len(),
        "partition loaded"
    );

    let evaluation = panic::catch_unwind(AssertUnwindSafe(|| {
        evaluator.evaluate(&data, &spec.model_variant)
    }))
    .map_err(|payload| {
        JobError::Evaluation(format!("evaluator panicked: {}", panic_message(&*payload)))
    })?
    .map_err(|err| JobError::Evaluation(err.to_string()))?;

    let Evaluation {
        predictions,
        actuals,
    } = evaluation;
    validate_output(&predictions, &actuals)?;
    let scores = metrics::evaluate_errors(&predictions, &actuals).ok_or_else(|| {
        JobError::Evaluation("predictions and actuals cannot be scored".to_string())
    })?;

    let artifact = PredictionArtifact::new(spec, predictions, actuals);
    let path = job::artifact_path(artifacts_dir, spec);
    persist::write_json_atomic(&path, &artifact)
        .map_err(|err| JobError::Artifact(format!("{}: {err}", path.display())))?;

    Ok(JobResult::completed(spec, scores))
}

fn validate_output(predictions: &[f64], actuals: &[f64]) -> Result<(), JobError> {
    if predictions.len() != actuals.len() {
        return Err(JobError::Evaluation(format!(
            "length mismatch: {} predictions vs {} actuals",
            predictions.len(),
            actuals.len()
        )));
    }
    if predictions.is_empty() {
        return Err(JobError::Evaluation("no predictions returned".to_string()));
    }
    if let Some(idx) = predictions
        .iter()
        .chain(actuals)
        .position(|v| !v.is_finite())
    {
        return Err(JobError::Evaluation(format!(
            "non-finite value at position {idx}"
        )));
    }
    Ok(())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        return (*msg).to_string();
    }
    if let Some(msg) = payload.downcast_ref::<String>() {
        return msg.clone();
    }
    "unknown panic payload".to_string()
}

#[cfg(test)]
mod tests {
    use super::validate_output;
    use crate::error::JobError;

    #[test]
    fn output_validation_rejects_bad_shapes() {
        assert!(validate_output(&[1.0], &[1.0]).is_ok());
        assert!(matches!(
            validate_output(&[1.0, 2.0], &[1.0]),
            Err(JobError::Evaluation(_))
        ));
        assert!(matches!(
            validate_output(&[], &[]),
            Err(JobError::Evaluation(_))
        ));
        assert!(matches!(
            validate_output(&[f64::NAN], &[1.0]),
            Err(JobError::Evaluation(_))
        ));
    }
}
