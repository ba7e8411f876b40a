use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::grid::{JobKey, JobSpec};
use crate::metrics::ErrorMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Completed,
    Error,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "completed" => Some(JobStatus::Completed),
            "error" => Some(JobStatus::Error),
            _ => None,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Built only through [`JobResult::completed`] and [`JobResult::failed`], which keep
/// the numeric fields and the error message mutually exclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub model_variant: String,
    pub partition_id: String,
    pub status: JobStatus,
    pub mae: Option<f64>,
    pub rmse: Option<f64>,
    pub n_samples: Option<usize>,
    pub timestamp: String,
    pub error_message: Option<String>,
}

impl JobResult {
    pub fn completed(spec: &JobSpec, metrics: ErrorMetrics) -> Self {
        Self {
            model_variant: spec.model_variant.clone(),
            partition_id: spec.partition_id.clone(),
            status: JobStatus::Completed,
            mae: Some(metrics.mae),
            rmse: Some(metrics.rmse),
            n_samples: Some(metrics.samples),
            timestamp: now_timestamp(),
            error_message: None,
        }
    }

    pub fn failed(spec: &JobSpec, message: impl Into<String>) -> Self {
        Self {
            model_variant: spec.model_variant.clone(),
            partition_id: spec.partition_id.clone(),
            status: JobStatus::Error,
            mae: None,
            rmse: None,
            n_samples: None,
            timestamp: now_timestamp(),
            error_message: Some(message.into()),
        }
    }

    pub fn key(&self) -> JobKey {
        JobSpec::new(self.model_variant.clone(), self.partition_id.clone())
    }

    pub fn is_completed(&self) -> bool {
        self.status == JobStatus::Completed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionArtifact {
    pub model_variant: String,
    pub partition_id: String,
    pub predictions: Vec<f64>,
    pub actuals: Vec<f64>,
    pub timestamp: String,
}

impl PredictionArtifact {
    pub fn new(spec: &JobSpec, predictions: Vec<f64>, actuals: Vec<f64>) -> Self {
        Self {
            model_variant: spec.model_variant.clone(),
            partition_id: spec.partition_id.clone(),
            predictions,
            actuals,
            timestamp: now_timestamp(),
        }
    }
}

/// `<dir>/predictions_<model>_<partition>_<digest8>.json`
pub fn artifact_path(dir: &Path, spec: &JobSpec) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(spec.model_variant.as_bytes());
    hasher.update([0u8]);
    hasher.update(spec.partition_id.as_bytes());
    let digest = hasher.finalize();
    let short = digest
        .iter()
        .take(4)
        .map(|b| format!("{b:02x}"))
        .collect::<String>();

    dir.join(format!(
        "predictions_{}_{}_{}.json",
        sanitize(&spec.model_variant),
        sanitize(&spec.partition_id),
        short
    ))
}

fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '.' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
