use std::collections::HashSet;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::StoreError;
use crate::grid::JobKey;
use crate::job::{JobResult, JobStatus};
use crate::persist;

pub const RESULT_COLUMNS: [&str; 8] = [
    "model_variant",
    "partition_id",
    "status",
    "mae",
    "rmse",
    "n_samples",
    "timestamp",
    "error_message",
];

/// Durable table of job results, one row per (model_variant, partition_id).
#[derive(Debug)]
pub struct ResultStore {
    csv_path: PathBuf,
    json_path: PathBuf,
    rows: Vec<JobResult>,
    written_this_run: HashSet<JobKey>,
}

impl ResultStore {
    /// Open the table at `path`. A missing file is a fresh, empty table.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let csv_path = path.into();
        let json_path = mirror_path(&csv_path);
        let rows = match read_table(&csv_path) {
            Ok(rows) => rows,
            Err(StoreError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                debug!(path = %csv_path.display(), "no existing results, starting fresh");
                Vec::new()
            }
            Err(err) => return Err(err),
        };

        Ok(Self {
            csv_path,
            json_path,
            rows,
            written_this_run: HashSet::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.csv_path
    }

    pub fn json_path(&self) -> &Path {
        &self.json_path
    }

    pub fn rows(&self) -> &[JobResult] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, key: &JobKey) -> Option<&JobResult> {
        self.rows.iter().find(|row| {
            row.model_variant == key.model_variant && row.partition_id == key.partition_id
        })
    }

    pub fn completed_keys(&self) -> HashSet<JobKey> {
        self.rows
            .iter()
            .filter(|row| row.is_completed())
            .map(JobResult::key)
            .collect()
    }

    /// Record `result` (replacing any row with the same key) and rewrite the table.
    ///
    /// A second write for a key within the same store session wins, with a warning.
    pub fn append_and_flush(&mut self, result: JobResult) -> Result<(), StoreError> {
        let key = result.key();
        if !self.written_this_run.insert(key.clone()) {
            warn!(
                model_variant = %key.model_variant,
                partition_id = %key.partition_id,
                "duplicate result for job in this run; keeping the latest"
            );
        }
        merge_row(&mut self.rows, result);
        self.flush()
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        let csv = encode_csv(&self.rows).map_err(|source| StoreError::Csv {
            path: self.csv_path.clone(),
            source,
        })?;
        persist::write_atomic(&self.csv_path, &csv)
            .map_err(|err| StoreError::io(&self.csv_path, err))?;

        let json = serde_json::to_vec_pretty(&self.rows).map_err(|source| StoreError::Json {
            path: self.json_path.clone(),
            source,
        })?;
        persist::write_atomic(&self.json_path, &json)
            .map_err(|err| StoreError::io(&self.json_path, err))?;
        Ok(())
    }

    pub fn into_rows(self) -> Vec<JobResult> {
        self.rows
    }
}

/// `results.csv` -> `results.csv.json`. Never equal to the table path.
fn mirror_path(csv_path: &Path) -> PathBuf {
    let mut name = csv_path.as_os_str().to_os_string();
    name.push(".json");
    PathBuf::from(name)
}

/// Read a results CSV. Repeated keys collapse to the last row in the file.
pub fn read_table(path: &Path) -> Result<Vec<JobResult>, StoreError> {
    let file = File::open(path).map_err(|err| StoreError::io(path, err))?;
    let mut reader = csv::Reader::from_reader(file);

    let mut rows = Vec::new();
    for (idx, record) in reader.deserialize::<JobResult>().enumerate() {
        // +2: header is line 1
        let line = idx + 2;
        let row = record.map_err(|source| StoreError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        check_row(&row).map_err(|message| StoreError::Malformed {
            path: path.to_path_buf(),
            line,
            message,
        })?;
        if merge_row(&mut rows, row) {
            warn!(path = %path.display(), line, "results file repeats a job; keeping the later row");
        }
    }
    Ok(rows)
}

fn encode_csv(rows: &[JobResult]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(RESULT_COLUMNS)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|err| csv::Error::from(io::Error::other(err.to_string())))
}

fn merge_row(rows: &mut Vec<JobResult>, result: JobResult) -> bool {
    let before = rows.len();
    rows.retain(|row| {
        row.model_variant != result.model_variant || row.partition_id != result.partition_id
    });
    let replaced = rows.len() != before;
    rows.push(result);
    replaced
}

fn check_row(row: &JobResult) -> Result<(), String> {
    match row.status {
        JobStatus::Completed => {
            if row.mae.is_none() || row.rmse.is_none() || row.n_samples.is_none() {
                return Err("completed row without metrics".to_string());
            }
        }
        JobStatus::Error => {
            if row.mae.is_some() || row.rmse.is_some() || row.n_samples.is_some() {
                return Err("error row with metrics".to_string());
            }
            if row.error_message.is_none() {
                return Err("error row without message".to_string());
            }
        }
    }
    Ok(())
}
