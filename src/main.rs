use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::Parser;

use hflee::{output::OutputWriter, scenario::ScenarioLoader};

#[derive(Debug, Parser)]
#[command(author, version, about = "Hurricane-driven displacement simulation")]
struct Cli {
    /// Path to the scenario YAML file
    #[arg(long, default_value = "scenarios/abaco_dorian.yaml")]
    scenario: PathBuf,

    /// Override day count (uses scenario default when omitted)
    #[arg(long)]
    days: Option<u32>,

    /// Override the number of decision workers
    #[arg(long)]
    workers: Option<usize>,

    /// Write the daily table here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Override snapshot interval in days
    #[arg(long)]
    snapshot_interval: Option<u32>,

    /// Directory for snapshots
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let loader = ScenarioLoader::new(".");
    let scenario = loader
        .load(&cli.scenario)
        .with_context(|| format!("Failed to load scenario {}", cli.scenario.display()))?;

    let mut settings = scenario.settings(cli.days, cli.workers);
    if let Some(interval) = cli.snapshot_interval {
        settings.snapshot.interval_days = interval;
    }
    if let Some(dir) = cli.snapshot_dir {
        settings.snapshot.output_dir = dir;
    }

    let mut engine = scenario
        .engine_builder(settings)?
        .build()
        .context("Failed to assemble simulation")?;

    let sink: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path)
                .with_context(|| format!("Failed to create output file {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    let mut output = OutputWriter::new(sink);
    engine.run(&mut output)?;
    Ok(())
}
