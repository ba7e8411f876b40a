use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use minutes_lab::config::{LogArgs, RunArgs};
use minutes_lab::orchestrator::{Orchestrator, RunReport};
use minutes_lab::summary::{self, Metric};

/// Fan a grid of model variants x partitions out over a worker pool, resuming
/// from any results already on disk.
#[derive(Debug, Parser)]
#[command(name = "minutes_lab", version)]
struct Cli {
    #[command(flatten)]
    run: RunArgs,

    /// Also write the final table and pivots to this xlsx workbook.
    #[arg(long)]
    xlsx: Option<PathBuf>,

    #[command(flatten)]
    log: LogArgs,
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    cli.log.init();

    let config = cli.run.run_config();
    println!(
        "Running {} models x {} partitions with {} workers",
        config.model_variants.len(),
        config.partitions.len(),
        config.pool_size()
    );

    let orchestrator = Orchestrator::new(config, cli.run.evaluator());
    let report = orchestrator
        .run()
        .context("experiment run aborted: results could not be persisted")?;

    print_report(&report);

    if let Some(path) = cli.xlsx.as_ref() {
        summary::export_xlsx(path, &report.table)?;
        println!("Workbook: {}", path.display());
    }

    Ok(())
}

fn print_report(report: &RunReport) {
    println!();
    println!("{}", "=".repeat(50));
    println!("FINAL RESULTS SUMMARY");
    println!("{}", "=".repeat(50));
    println!("Results: {}", report.results_path.display());
    println!(
        "Grid: {}  skipped: {}  ran: {}  completed: {}  errors: {}",
        report.grid_size, report.skipped, report.dispatched, report.completed, report.failed
    );

    let rmse = summary::pivot(&report.table, Metric::Rmse);
    if rmse.is_empty() {
        println!("No completed results found");
        return;
    }

    println!();
    println!("RMSE by partition and model:");
    print!("{}", summary::render_pivot(&rmse));
    println!();
    println!("MAE by partition and model:");
    print!("{}", summary::render_pivot(&summary::pivot(&report.table, Metric::Mae)));

    println!();
    for leader in summary::best_and_worst(&report.table, Metric::Rmse) {
        println!(
            "{}: best {} ({:.3})  worst {} ({:.3})",
            leader.partition_id,
            leader.best_model,
            leader.best_value,
            leader.worst_model,
            leader.worst_value
        );
    }

    let errors = report
        .table
        .iter()
        .filter(|row| !row.is_completed())
        .collect::<Vec<_>>();
    if !errors.is_empty() {
        println!();
        println!("Errors: {}", errors.len());
        for row in errors.iter().take(8) {
            println!(
                " - {}-{}: {}",
                row.model_variant,
                row.partition_id,
                row.error_message.as_deref().unwrap_or("")
            );
        }
    }
}
