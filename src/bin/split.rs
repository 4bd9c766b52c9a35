/// split: read an epoch attribute file and a JSON splitting config, generate
/// every dataset, and write the masks to a safetensors file.
///
/// Output keys:
///   train_N / val_N / test_N   [E]   u8   membership masks of dataset N
///   names                      [..]  u8   newline-separated dataset names
///   n_datasets                 [1]   i32
use anyhow::{bail, Context, Result};
use clap::Parser;
use log::LevelFilter;
use simplelog::{Config, SimpleLogger};
use std::path::PathBuf;
use std::sync::Arc;

use exg_split::{read_epoch_index, write_datasets, DatasetGenerator, Outcome, SplittingConfig};

#[derive(Parser, Debug)]
#[command(name = "split", about = "Generate train/val/test masks for an epoch collection")]
struct Args {
    /// epochs.safetensors with subject/session/label/trial arrays.
    #[arg(long)]
    epochs: PathBuf,

    /// Splitting configuration (JSON). Defaults to a 20 % subject split.
    #[arg(long)]
    config: Option<PathBuf>,

    /// masks.safetensors output path.
    #[arg(long)]
    output: PathBuf,

    /// Log every dataset and pick.
    #[arg(long, short)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let level = if args.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    SimpleLogger::init(level, Config::default()).context("initialising logger")?;

    let index = Arc::new(read_epoch_index(&args.epochs)?);
    let config = match &args.config {
        Some(path) => SplittingConfig::from_json_file(path)?,
        None => SplittingConfig::default(),
    };

    let (handle, worker) = DatasetGenerator::new(index, config).spawn();

    let stop = handle.clone();
    ctrlc::set_handler(move || {
        log::info!("Received SIGINT, stopping generation...");
        stop.interrupt();
    })?;

    let outcome = match worker.join() {
        Ok(result) => result?,
        Err(_) => bail!("generator thread panicked"),
    };

    let datasets = match outcome {
        Outcome::Completed(datasets) => datasets,
        Outcome::Interrupted => {
            log::warn!("interrupted after {} datasets, nothing written", handle.produced());
            return Ok(());
        }
    };

    for ds in &datasets {
        println!("{ds}");
    }
    write_datasets(&datasets, &args.output)?;
    println!("Written → {}", args.output.display());
    Ok(())
}
