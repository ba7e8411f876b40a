use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use minutes_lab::config::LogArgs;
use minutes_lab::store;
use minutes_lab::summary::{self, Metric};

/// Print pivots for an existing result table, optionally exporting a workbook.
#[derive(Debug, Parser)]
#[command(name = "summarize")]
struct Cli {
    /// Results CSV written by minutes_lab.
    #[arg(
        long,
        env = "MINUTES_LAB_RESULTS",
        default_value = "outputs/experiments/results_summary.csv"
    )]
    results: PathBuf,

    /// Write the table and pivots to this xlsx workbook.
    #[arg(long)]
    xlsx: Option<PathBuf>,

    #[command(flatten)]
    log: LogArgs,
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    cli.log.init();

    let table = store::read_table(&cli.results)
        .with_context(|| format!("read results {}", cli.results.display()))?;
    let completed = table.iter().filter(|row| row.is_completed()).count();

    println!("Results: {}", cli.results.display());
    println!(
        "Rows: {}  completed: {}  errors: {}",
        table.len(),
        completed,
        table.len() - completed
    );

    for metric in [Metric::Rmse, Metric::Mae] {
        let grid = summary::pivot(&table, metric);
        if grid.is_empty() {
            continue;
        }
        println!();
        print!("{}", summary::render_pivot(&grid));
    }

    if let Some(path) = cli.xlsx.as_ref() {
        summary::export_xlsx(path, &table)?;
        println!();
        println!("Workbook: {}", path.display());
    }

    Ok(())
}
