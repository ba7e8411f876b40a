use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobSpec {
    pub model_variant: String,
    pub partition_id: String,
}

/// Identity of a row in the result table. Same pair as `JobSpec`.
pub type JobKey = JobSpec;

impl JobSpec {
    pub fn new(model_variant: impl Into<String>, partition_id: impl Into<String>) -> Self {
        Self {
            model_variant: model_variant.into(),
            partition_id: partition_id.into(),
        }
    }
}

impl fmt::Display for JobSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.model_variant, self.partition_id)
    }
}

/// Cartesian product of model variants and partitions, model-major.
pub fn build_grid<M, P>(models: &[M], partitions: &[P]) -> Vec<JobSpec>
where
    M: AsRef<str>,
    P: AsRef<str>,
{
    let models = dedup_ids(models);
    let partitions = dedup_ids(partitions);

    let mut grid = Vec::with_capacity(models.len() * partitions.len());
    for model in &models {
        for partition in &partitions {
            grid.push(JobSpec::new(model.clone(), partition.clone()));
        }
    }
    grid
}

pub fn plan_jobs(grid: &[JobSpec], completed: &HashSet<JobKey>) -> Vec<JobSpec> {
    grid.iter()
        .filter(|job| !completed.contains(*job))
        .cloned()
        .collect()
}

pub fn parse_ids(raw: &str) -> Vec<String> {
    let ids = raw
        .split([',', ';'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>();
    dedup_ids(&ids)
}

fn dedup_ids<S: AsRef<str>>(ids: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for id in ids {
        let id = id.as_ref().trim();
        if id.is_empty() {
            continue;
        }
        if seen.insert(id.to_string()) {
            out.push(id.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{JobSpec, build_grid, parse_ids, plan_jobs};

    #[test]
    fn grid_is_full_product_in_input_order() {
        let grid = build_grid(&["rocket", "minirocket"], &["GK", "DEF", "FWD"]);
        assert_eq!(grid.len(), 6);
        assert_eq!(grid[0], JobSpec::new("rocket", "GK"));
        assert_eq!(grid[2], JobSpec::new("rocket", "FWD"));
        assert_eq!(grid[3], JobSpec::new("minirocket", "GK"));

        let unique: HashSet<_> = grid.iter().collect();
        assert_eq!(unique.len(), grid.len());
    }

    #[test]
    fn empty_side_gives_empty_grid() {
        let none: [&str; 0] = [];
        assert!(build_grid(&none, &["GK"]).is_empty());
        assert!(build_grid(&["rocket"], &none).is_empty());
    }

    #[test]
    fn repeated_ids_are_collapsed() {
        let grid = build_grid(&["rocket", " rocket ", ""], &["GK", "GK"]);
        assert_eq!(grid, vec![JobSpec::new("rocket", "GK")]);
    }

    #[test]
    fn plan_skips_only_completed_pairs() {
        let grid = build_grid(&["rocket"], &["GK", "FWD"]);
        let done: HashSet<_> = [JobSpec::new("rocket", "GK")].into_iter().collect();
        assert_eq!(plan_jobs(&grid, &done), vec![JobSpec::new("rocket", "FWD")]);
    }

    #[test]
    fn parse_ids_splits_on_commas_and_semicolons() {
        assert_eq!(parse_ids("GK, DEF;MID,,GK"), vec!["GK", "DEF", "MID"]);
    }
}
