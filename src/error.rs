use std::path::PathBuf;

use thiserror::Error;

/// Failures contained inside a single job. These never leave the worker: they are
/// rendered into the `error_message` of an `error` row.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JobError {
    #[error("data load failed: {0}")]
    DataLoad(String),

    #[error("evaluation failed: {0}")]
    Evaluation(String),

    #[error("prediction artifact not written: {0}")]
    Artifact(String),
}

#[derive(Error, Debug)]
pub enum EvalError {
    #[error("unknown model variant '{0}'")]
    UnknownVariant(String),

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("evaluator process failed: {0}")]
    Process(String),

    #[error("invalid evaluator output: {0}")]
    InvalidOutput(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error on {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("json error on {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed row {line} in {path}: {message}")]
    Malformed {
        path: PathBuf,
        line: usize,
        message: String,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}
