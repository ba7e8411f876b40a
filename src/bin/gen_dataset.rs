use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use minutes_lab::config::DEFAULT_PARTITIONS;
use minutes_lab::dataset::{self, DatasetPaths};
use minutes_lab::grid::parse_ids;
use minutes_lab::synthetic::{self, DEFAULT_SEED, SyntheticSpec};

/// Write seeded synthetic training/validation datasets for local runs.
#[derive(Debug, Parser)]
#[command(name = "gen_dataset")]
struct Cli {
    #[arg(long, env = "MINUTES_LAB_DATA_DIR", default_value = "datasets")]
    data_dir: PathBuf,

    #[arg(long, default_value = DEFAULT_PARTITIONS)]
    partitions: String,

    #[arg(long, default_value_t = 20)]
    players: usize,

    #[arg(long, default_value_t = 38)]
    weeks: usize,

    #[arg(long, default_value_t = 5)]
    lags: usize,

    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let spec = SyntheticSpec {
        partitions: parse_ids(&cli.partitions),
        players_per_partition: cli.players,
        weeks: cli.weeks,
        lags: cli.lags.max(1),
        seed: cli.seed,
        ..SyntheticSpec::default()
    };

    let (train, validation) = synthetic::generate(&spec);
    let paths = DatasetPaths::in_dir(&cli.data_dir);
    dataset::save_dataset(&paths.train, &train)
        .with_context(|| format!("write {}", paths.train.display()))?;
    dataset::save_dataset(&paths.validation, &validation)
        .with_context(|| format!("write {}", paths.validation.display()))?;

    println!("Synthetic datasets written (seed {})", spec.seed);
    for (partition, rows) in &train {
        let val_rows = validation.get(partition).map(Vec::len).unwrap_or(0);
        println!("  {partition}: train={} validation={val_rows}", rows.len());
    }
    println!("Train: {}", paths.train.display());
    println!("Validation: {}", paths.validation.display());
    Ok(())
}
