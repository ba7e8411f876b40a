use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::JobError;
use crate::persist;

/// One player-week: the lagged minutes history (oldest first) and the minutes to predict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionRow {
    pub minutes: Vec<f64>,
    pub out_minutes: f64,
}

impl PartitionRow {
    pub fn last_minutes(&self) -> Option<f64> {
        self.minutes.last().copied()
    }

        pub fn recent(&self, window: usize) -> &[f64] {
        let start = self.minutes.len().saturating_sub(window);
        &self.minutes[start..]
    }
}

pub type Dataset = BTreeMap<String, Vec<PartitionRow>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionData {
    pub partition_id: String,
    pub train: Vec<PartitionRow>,
    pub validation: Vec<PartitionRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetPaths {
    pub train: PathBuf,
    pub validation: PathBuf,
}

impl DatasetPaths {
    pub fn new(train: impl Into<PathBuf>, validation: impl Into<PathBuf>) -> Self {
        Self {
            train: train.into(),
            validation: validation.into(),
        }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(
            dir.join("training_dictionary.json"),
            dir.join("validation_dictionary.json"),
        )
    }
}

pub fn load_dataset(path: &Path) -> Result<Dataset, JobError> {
    let raw = fs::read_to_string(path)
        .map_err(|err| JobError::DataLoad(format!("read {}: {err}", path.display())))?;
    serde_json::from_str::<Dataset>(&raw)
        .map_err(|err| JobError::DataLoad(format!("parse {}: {err}", path.display())))
}

pub fn save_dataset(path: &Path, dataset: &Dataset) -> std::io::Result<()> {
    persist::write_json_atomic(path, dataset)
}

pub fn load_partition(paths: &DatasetPaths, partition_id: &str) -> Result<PartitionData, JobError> {
    let mut train = load_dataset(&paths.train)?;
    let mut validation = load_dataset(&paths.validation)?;

    let train = train.remove(partition_id).ok_or_else(|| {
        JobError::DataLoad(format!(
            "partition '{partition_id}' missing from {}",
            paths.train.display()
        ))
    })?;
    let validation = validation.remove(partition_id).ok_or_else(|| {
        JobError::DataLoad(format!(
            "partition '{partition_id}' missing from {}",
            paths.validation.display()
        ))
    })?;

    Ok(PartitionData {
        partition_id: partition_id.to_string(),
        train,
        validation,
    })
}

#[cfg(test)]
mod tests {
    use super::{Dataset, DatasetPaths, PartitionRow, load_partition, save_dataset};
    use crate::error::JobError;

    fn row(minutes: &[f64], out: f64) -> PartitionRow {
        PartitionRow {
            minutes: minutes.to_vec(),
            out_minutes: out,
        }
    }

    #[test]
    fn recent_window_clamps_to_history() {
        let r = row(&[10.0, 20.0, 30.0], 0.0);
        assert_eq!(r.recent(2), &[20.0, 30.0]);
        assert_eq!(r.recent(9), &[10.0, 20.0, 30.0]);
        assert_eq!(row(&[], 0.0).last_minutes(), None);
    }

    #[test]
    fn partition_is_loaded_from_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DatasetPaths::in_dir(dir.path());
        let mut train = Dataset::new();
        train.insert("GK".into(), vec![row(&[90.0], 90.0)]);
        let mut val = Dataset::new();
        val.insert("GK".into(), vec![row(&[90.0], 0.0), row(&[0.0], 0.0)]);
        save_dataset(&paths.train, &train).unwrap();
        save_dataset(&paths.validation, &val).unwrap();

        let data = load_partition(&paths, "GK").unwrap();
        assert_eq!(data.train.len(), 1);
        assert_eq!(data.validation.len(), 2);

        let missing = load_partition(&paths, "FWD").unwrap_err();
        assert!(matches!(missing, JobError::DataLoad(_)));
    }

    #[test]
    fn missing_file_is_a_data_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DatasetPaths::in_dir(dir.path());
        assert!(matches!(
            load_partition(&paths, "GK"),
            Err(JobError::DataLoad(_))
        ));
    }
}
