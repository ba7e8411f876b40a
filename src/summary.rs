use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::job::JobResult;
use crate::store::RESULT_COLUMNS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Mae,
    Rmse,
}

impl Metric {
    pub fn label(self) -> &'static str {
        match self {
            Metric::Mae => "MAE",
            Metric::Rmse => "RMSE",
        }
    }

    fn value(self, row: &JobResult) -> Option<f64> {
        match self {
            Metric::Mae => row.mae,
            Metric::Rmse => row.rmse,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pivot {
    pub metric: Metric,
    pub partitions: Vec<String>,
    pub models: Vec<String>,
    cells: BTreeMap<(String, String), f64>,
}

impl Pivot {
    pub fn get(&self, partition_id: &str, model_variant: &str) -> Option<f64> {
        self.cells
            .get(&(partition_id.to_string(), model_variant.to_string()))
            .copied()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

pub fn pivot(table: &[JobResult], metric: Metric) -> Pivot {
    let mut partitions = BTreeSet::new();
    let mut models = BTreeSet::new();
    let mut cells = BTreeMap::new();

    for row in table.iter().filter(|r| r.is_completed()) {
        let Some(value) = metric.value(row) else {
            continue;
        };
        partitions.insert(row.partition_id.clone());
        models.insert(row.model_variant.clone());
        cells.insert((row.partition_id.clone(), row.model_variant.clone()), value);
    }

    Pivot {
        metric,
        partitions: partitions.into_iter().collect(),
        models: models.into_iter().collect(),
        cells,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PartitionLeaders {
    pub partition_id: String,
    pub best_model: String,
    pub best_value: f64,
    pub worst_model: String,
    pub worst_value: f64,
}

/// Lowest and highest error per partition. Ties keep the alphabetically first model.
pub fn best_and_worst(table: &[JobResult], metric: Metric) -> Vec<PartitionLeaders> {
    let grid = pivot(table, metric);
    let mut out = Vec::new();
    for partition in &grid.partitions {
        let mut best: Option<(&str, f64)> = None;
        let mut worst: Option<(&str, f64)> = None;
        for model in &grid.models {
            let Some(value) = grid.get(partition, model) else {
                continue;
            };
            if best.is_none_or(|(_, b)| value < b) {
                best = Some((model.as_str(), value));
            }
            if worst.is_none_or(|(_, w)| value > w) {
                worst = Some((model.as_str(), value));
            }
        }
        if let (Some((best_model, best_value)), Some((worst_model, worst_value))) = (best, worst) {
            out.push(PartitionLeaders {
                partition_id: partition.clone(),
                best_model: best_model.to_string(),
                best_value,
                worst_model: worst_model.to_string(),
                worst_value,
            });
        }
    }
    out
}

/// Fixed-width text table, partitions down, models across, three decimals.
pub fn render_pivot(pivot: &Pivot) -> String {
    let label = pivot.metric.label();
    let first_width = pivot
        .partitions
        .iter()
        .map(String::len)
        .chain([label.len()])
        .max()
        .unwrap_or(0);
    let widths = pivot
        .models
        .iter()
        .map(|m| m.len().max(8))
        .collect::<Vec<_>>();

    let mut out = String::new();
    let _ = write!(out, "{label:<first_width$}");
    for (model, width) in pivot.models.iter().zip(&widths) {
        let _ = write!(out, "  {model:>width$}");
    }
    out.push('\n');

    for partition in &pivot.partitions {
        let _ = write!(out, "{partition:<first_width$}");
        for (model, width) in pivot.models.iter().zip(&widths) {
            let cell = pivot
                .get(partition, model)
                .map(|v| format!("{v:.3}"))
                .unwrap_or_else(|| "-".to_string());
            let _ = write!(out, "  {cell:>width$}");
        }
        out.push('\n');
    }
    out
}

pub fn export_xlsx(path: &Path, table: &[JobResult]) -> Result<()> {
    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Results")?;
        write_results(sheet, table)?;
    }
    for metric in [Metric::Rmse, Metric::Mae] {
        let sheet = workbook.add_worksheet();
        sheet.set_name(metric.label())?;
        write_pivot(sheet, &pivot(table, metric))?;
    }
    workbook
        .save(path)
        .with_context(|| format!("save workbook {}", path.display()))?;
    Ok(())
}

fn write_results(sheet: &mut Worksheet, table: &[JobResult]) -> Result<()> {
    for (col, name) in RESULT_COLUMNS.iter().enumerate() {
        sheet.write_string(0, col as u16, *name)?;
    }
    for (idx, row) in table.iter().enumerate() {
        let r = (idx + 1) as u32;
        sheet.write_string(r, 0, &row.model_variant)?;
        sheet.write_string(r, 1, &row.partition_id)?;
        sheet.write_string(r, 2, row.status.as_str())?;
        if let Some(mae) = row.mae {
            sheet.write_number(r, 3, mae)?;
        }
        if let Some(rmse) = row.rmse {
            sheet.write_number(r, 4, rmse)?;
        }
        if let Some(n) = row.n_samples {
            sheet.write_number(r, 5, n as f64)?;
        }
        sheet.write_string(r, 6, &row.timestamp)?;
        if let Some(msg) = row.error_message.as_deref() {
            sheet.write_string(r, 7, msg)?;
        }
    }
    Ok(())
}

fn write_pivot(sheet: &mut Worksheet, pivot: &Pivot) -> Result<()> {
    sheet.write_string(0, 0, "partition")?;
    for (col, model) in pivot.models.iter().enumerate() {
        sheet.write_string(0, (col + 1) as u16, model)?;
    }
    for (idx, partition) in pivot.partitions.iter().enumerate() {
        let r = (idx + 1) as u32;
        sheet.write_string(r, 0, partition)?;
        for (col, model) in pivot.models.iter().enumerate() {
            if let Some(value) = pivot.get(partition, model) {
                sheet.write_number(r, (col + 1) as u16, value)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Metric, best_and_worst, pivot, render_pivot};
    use crate::grid::JobSpec;
    use crate::job::JobResult;
    use crate::metrics::ErrorMetrics;

    fn ok(model: &str, partition: &str, rmse: f64) -> JobResult {
        JobResult::completed(
            &JobSpec::new(model, partition),
            ErrorMetrics {
                samples: 5,
                mae: rmse / 2.0,
                rmse,
            },
        )
    }

    fn table() -> Vec<JobResult> {
        vec![
            ok("last_value", "GK", 12.0),
            ok("rolling_mean", "GK", 9.5),
            ok("last_value", "FWD", 20.0),
            JobResult::failed(&JobSpec::new("rolling_mean", "FWD"), "boom"),
        ]
    }

    #[test]
    fn pivot_ignores_error_rows() {
        let p = pivot(&table(), Metric::Rmse);
        assert_eq!(p.partitions, vec!["FWD", "GK"]);
        assert_eq!(p.models, vec!["last_value", "rolling_mean"]);
        assert_eq!(p.get("GK", "rolling_mean"), Some(9.5));
        assert_eq!(p.get("FWD", "rolling_mean"), None);
    }

    #[test]
    fn leaders_per_partition() {
        let leaders = best_and_worst(&table(), Metric::Rmse);
        assert_eq!(leaders.len(), 2);
        let gk = leaders.iter().find(|l| l.partition_id == "GK").unwrap();
        assert_eq!(gk.best_model, "rolling_mean");
        assert_eq!(gk.worst_model, "last_value");
        let fwd = leaders.iter().find(|l| l.partition_id == "FWD").unwrap();
        assert_eq!(fwd.best_model, fwd.worst_model);
    }

    #[test]
    fn rendered_table_marks_missing_cells() {
        let text = render_pivot(&pivot(&table(), Metric::Mae));
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("MAE"));
        assert!(lines[1].starts_with("FWD") && lines[1].trim_end().ends_with('-'));
        assert!(lines[2].contains("4.750"));
    }

    #[test]
    fn workbook_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.xlsx");
        super::export_xlsx(&path, &table()).unwrap();
        assert!(path.metadata().unwrap().len() > 0);
    }
}
