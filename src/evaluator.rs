//! Fit-and-score implementations.
//!
//! The orchestrator only sees the [`Evaluator`] trait. Anything that can turn a
//! partition plus a model-variant name into predictions and actuals plugs in here:
//! the native baselines below, an external program, or a closure in tests.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};

use crate::dataset::{PartitionData, PartitionRow};
use crate::error::EvalError;
use crate::metrics;

const DEFAULT_ROLLING_WEEKS: usize = 5;
const MAX_MINUTES: f64 = 90.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub predictions: Vec<f64>,
    pub actuals: Vec<f64>,
}

/// Opaque fit-and-score collaborator. Called concurrently from several workers.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, data: &PartitionData, model_variant: &str)
    -> Result<Evaluation, EvalError>;
}

impl<F> Evaluator for F
where
    F: Fn(&PartitionData, &str) -> Result<Evaluation, EvalError> + Send + Sync,
{
    fn evaluate(
        &self,
        data: &PartitionData,
        model_variant: &str,
    ) -> Result<Evaluation, EvalError> {
        self(data, model_variant)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselineModel {
    /// Previous week's minutes, 0 when there is no history.
    LastValue,
    RollingMean(usize),
    RollingMedian(usize),
    TrainingMean,
    /// Least squares `out_minutes ~ a + b * last_minutes`.
    LagRegression,
}

impl BaselineModel {
    pub fn parse(variant: &str) -> Result<Self, EvalError> {
        let variant = variant.trim();
        let (name, window) = match variant.split_once(':') {
            Some((name, raw)) => {
                let window = raw
                    .trim()
                    .parse::<usize>()
                    .ok()
                    .filter(|w| *w > 0)
                    .ok_or_else(|| EvalError::UnknownVariant(variant.to_string()))?;
                (name.trim(), Some(window))
            }
            None => (variant, None),
        };

        let model = match (name, window) {
            ("last_value", None) => BaselineModel::LastValue,
            ("rolling_mean", w) => BaselineModel::RollingMean(w.unwrap_or(DEFAULT_ROLLING_WEEKS)),
            ("rolling_median", w) => {
                BaselineModel::RollingMedian(w.unwrap_or(DEFAULT_ROLLING_WEEKS))
            }
            ("training_mean", None) => BaselineModel::TrainingMean,
            ("lag_regression", None) => BaselineModel::LagRegression,
            _ => return Err(EvalError::UnknownVariant(variant.to_string())),
        };
        Ok(model)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BaselineEvaluator;

impl Evaluator for BaselineEvaluator {
    fn evaluate(
        &self,
        data: &PartitionData,
        model_variant: &str,
    ) -> Result<Evaluation, EvalError> {
        let model = BaselineModel::parse(model_variant)?;
        if data.validation.is_empty() {
            return Err(EvalError::InsufficientData(format!(
                "partition '{}' has no validation rows",
                data.partition_id
            )));
        }

        let predictions = match model {
            BaselineModel::LastValue => data
                .validation
                .iter()
                .map(|row| row.last_minutes().unwrap_or(0.0))
                .collect(),
            BaselineModel::RollingMean(window) => data
                .validation
                .iter()
                .map(|row| metrics::mean(row.recent(window)).unwrap_or(0.0))
                .collect(),
            BaselineModel::RollingMedian(window) => data
                .validation
                .iter()
                .map(|row| metrics::median(row.recent(window)).unwrap_or(0.0))
                .collect(),
            BaselineModel::TrainingMean => {
                let targets = targets(&data.train);
                let mean = metrics::mean(&targets).ok_or_else(|| {
                    EvalError::InsufficientData(format!(
                        "partition '{}' has no training rows",
                        data.partition_id
                    ))
                })?;
                vec![mean; data.validation.len()]
            }
            BaselineModel::LagRegression => {
                let (intercept, slope) = fit_lag_regression(&data.train).ok_or_else(|| {
                    EvalError::InsufficientData(format!(
                        "partition '{}' has no training rows",
                        data.partition_id
                    ))
                })?;
                data.validation
                    .iter()
                    .map(|row| {
                        let x = row.last_minutes().unwrap_or(0.0);
                        (intercept + slope * x).clamp(0.0, MAX_MINUTES)
                    })
                    .collect()
            }
        };

        Ok(Evaluation {
            predictions,
            actuals: targets(&data.validation),
        })
    }
}

fn targets(rows: &[PartitionRow]) -> Vec<f64> {
    rows.iter().map(|row| row.out_minutes).collect()
}

fn fit_lag_regression(rows: &[PartitionRow]) -> Option<(f64, f64)> {
    if rows.is_empty() {
        return None;
    }
    let n = rows.len() as f64;
    let xs = rows
        .iter()
        .map(|row| row.last_minutes().unwrap_or(0.0))
        .collect::<Vec<_>>();
    let ys = targets(rows);
    let x_mean = xs.iter().sum::<f64>() / n;
    let y_mean = ys.iter().sum::<f64>() / n;

    let mut cov = 0.0_f64;
    let mut var = 0.0_f64;
    for (x, y) in xs.iter().zip(&ys) {
        cov += (x - x_mean) * (y - y_mean);
        var += (x - x_mean).powi(2);
    }
    if var <= f64::EPSILON {
        return Some((y_mean, 0.0));
    }
    let slope = cov / var;
    Some((y_mean - slope * x_mean, slope))
}

#[derive(Serialize)]
struct EvalRequest<'a> {
    model_variant: &'a str,
    partition_id: &'a str,
    train: &'a [PartitionRow],
    validation: &'a [PartitionRow],
}

/// Runs an external program per job: request JSON on stdin, `Evaluation` JSON on stdout.
#[derive(Debug, Clone)]
pub struct CommandEvaluator {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandEvaluator {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl Evaluator for CommandEvaluator {
    fn evaluate(
        &self,
        data: &PartitionData,
        model_variant: &str,
    ) -> Result<Evaluation, EvalError> {
        let request = serde_json::to_vec(&EvalRequest {
            model_variant,
            partition_id: &data.partition_id,
            train: &data.train,
            validation: &data.validation,
        })
        .map_err(|err| EvalError::Process(format!("encode request: {err}")))?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| {
                EvalError::Process(format!("spawn {}: {err}", self.program.display()))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| EvalError::Process("child stdin unavailable".to_string()))?;

        // Feed stdin from a separate thread so a chatty child cannot fill stdout and stall.
        let output = std::thread::scope(|scope| {
            let writer = scope.spawn(move || stdin.write_all(&request));
            let output = child.wait_with_output();
            let written = writer
                .join()
                .unwrap_or_else(|_| Err(std::io::Error::other("stdin writer panicked")));
            (output, written)
        });
        let (output, written) = output;
        let output = output.map_err(|err| EvalError::Process(format!("wait: {err}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EvalError::Process(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }
        // A child that exits 0 without reading all of stdin is fine; only report the
        // broken pipe when the output is unusable as well.
        serde_json::from_slice::<Evaluation>(&output.stdout).map_err(|err| {
            let hint = written
                .err()
                .map(|e| format!(" (stdin: {e})"))
                .unwrap_or_default();
            EvalError::InvalidOutput(format!("decode stdout: {err}{hint}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{BaselineEvaluator, BaselineModel, Evaluator};
    use crate::dataset::{PartitionData, PartitionRow};
    use crate::error::EvalError;

    fn row(minutes: &[f64], out: f64) -> PartitionRow {
        PartitionRow {
            minutes: minutes.to_vec(),
            out_minutes: out,
        }
    }

    fn sample() -> PartitionData {
        PartitionData {
            partition_id: "MID".to_string(),
            train: vec![
                row(&[90.0, 90.0], 90.0),
                row(&[0.0, 0.0], 0.0),
                row(&[90.0, 45.0], 60.0),
            ],
            validation: vec![row(&[90.0, 90.0, 0.0], 90.0), row(&[], 30.0)],
        }
    }

    #[test]
    fn variant_names_parse_with_optional_window() {
        assert_eq!(
            BaselineModel::parse("rolling_mean").unwrap(),
            BaselineModel::RollingMean(5)
        );
        assert_eq!(
            BaselineModel::parse("rolling_median:3").unwrap(),
            BaselineModel::RollingMedian(3)
        );
        assert!(matches!(
            BaselineModel::parse("rolling_mean:0"),
            Err(EvalError::UnknownVariant(_))
        ));
        assert!(matches!(
            BaselineModel::parse("rocket"),
            Err(EvalError::UnknownVariant(_))
        ));
    }

    #[test]
    fn last_value_uses_previous_week_or_zero() {
        let out = BaselineEvaluator.evaluate(&sample(), "last_value").unwrap();
        assert_eq!(out.predictions, vec![0.0, 0.0]);
        assert_eq!(out.actuals, vec![90.0, 30.0]);
    }

    #[test]
    fn rolling_mean_covers_available_history() {
        let out = BaselineEvaluator
            .evaluate(&sample(), "rolling_mean:2")
            .unwrap();
        assert_eq!(out.predictions, vec![45.0, 0.0]);
    }

    #[test]
    fn training_mean_and_regression_use_training_rows() {
        let out = BaselineEvaluator.evaluate(&sample(), "training_mean").unwrap();
        assert_eq!(out.predictions, vec![50.0, 50.0]);

        let out = BaselineEvaluator
            .evaluate(&sample(), "lag_regression")
            .unwrap();
        assert_eq!(out.predictions.len(), 2);
        assert!(out.predictions.iter().all(|p| (0.0..=90.0).contains(p)));
    }

    #[test]
    fn empty_validation_is_insufficient_data() {
        let mut data = sample();
        data.validation.clear();
        assert!(matches!(
            BaselineEvaluator.evaluate(&data, "last_value"),
            Err(EvalError::InsufficientData(_))
        ));
    }
}
