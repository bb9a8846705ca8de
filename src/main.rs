use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use thicket::{
    engine::{EngineBuilder, EngineSettings, StopReason},
    report::StatusTable,
    scenario::{Scenario, ScenarioLoader},
    systems::{BookkeepingSystem, EnvironmentSystem, PopulationSystem},
    weather::{FileSource, Weather},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Predator-prey-plant ecosystem simulator")]
struct Cli {
    /// Path to a scenario YAML file (built-in woodland when omitted)
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Override the step budget
    #[arg(long)]
    steps: Option<u64>,

    /// Override the random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override the grid width
    #[arg(long)]
    width: Option<usize>,

    /// Override the grid depth
    #[arg(long)]
    depth: Option<usize>,

    /// Override the snapshot interval in steps (0 disables)
    #[arg(long)]
    snapshot_interval: Option<u64>,

    /// Directory for snapshots
    #[arg(long, default_value = "snapshots")]
    snapshot_dir: PathBuf,

    /// JSON weather payload re-read on every refresh; random weather otherwise
    #[arg(long)]
    weather_file: Option<PathBuf>,

    /// Print the status tables every N steps (0 prints only the final state)
    #[arg(long, default_value_t = 10)]
    report_every: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut scenario = match &cli.scenario {
        Some(path) => ScenarioLoader::new(".").load(path)?,
        None => Scenario::woodland(),
    };
    if let Some(seed) = cli.seed {
        scenario.seed = seed;
    }
    if let Some(width) = cli.width {
        scenario.width = width;
    }
    if let Some(depth) = cli.depth {
        scenario.depth = depth;
    }

    let steps = scenario.steps(cli.steps);
    let settings = EngineSettings {
        scenario_name: scenario.name.clone(),
        seed: scenario.seed,
        snapshot_interval_steps: cli
            .snapshot_interval
            .unwrap_or(scenario.snapshot_interval_steps),
        snapshot_dir: cli.snapshot_dir.clone(),
        viability: scenario.viability_species()?,
    };
    let weather = match &cli.weather_file {
        Some(path) => Weather::new(Box::new(FileSource::new(path)), scenario.weather_refresh_steps),
        None => Weather::offline(scenario.weather_refresh_steps),
    };

    let mut world = scenario.build_world();
    let mut engine = EngineBuilder::new(settings)
        .with_system(EnvironmentSystem::new(weather))
        .with_system(PopulationSystem::new())
        .with_system(BookkeepingSystem::new())
        .build();

    info!(scenario = %scenario.name, steps, seed = scenario.seed, "Starting run");
    print!("{}", StatusTable(&world.report()));
    let outcome = engine.run_with_hook(&mut world, steps, |report| {
        if cli.report_every > 0 && report.step % cli.report_every == 0 {
            print!("{}", StatusTable(report));
        }
    })?;

    print!("{}", StatusTable(&world.report()));
    let ending = match outcome.reason {
        StopReason::BudgetExhausted => "completed",
        StopReason::Collapsed => "collapsed",
    };
    println!(
        "Scenario '{}' {} after {} steps. Final population: {} animals, {} plants",
        scenario.name,
        ending,
        outcome.steps,
        world.census().total_animals(),
        world.census().total_plants()
    );
    Ok(())
}
