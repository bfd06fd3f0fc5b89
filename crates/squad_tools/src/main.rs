//! Squad Battle - Development Tools
//!
//! # Usage
//!
//! ```bash
//! # Check the shipped data files
//! cargo run -p squad_tools -- validate assets/data
//!
//! # Run the default skirmish headless and print a JSON report
//! cargo run -p squad_tools -- simulate --seed 7 --ticks 4000
//!
//! # Print upgrade prices for the first five levels
//! cargo run -p squad_tools -- cost-table --levels 5
//! ```
//!
//! Reports go to stdout; logs go to stderr (filter with `RUST_LOG`).

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use squad_core::math::Fixed;
use squad_core::progress::{load_progress, save_progress, PlayerProgress};
use squad_tools::costs::cost_table;
use squad_tools::data_loader::{default_data_dir, load_config, load_game_data};
use squad_tools::progress_file::FileProgressStore;
use squad_tools::scenario::{simulate, Scenario};
use squad_tools::validate::validate_data_directory;

#[derive(Parser)]
#[command(name = "squad-tools")]
#[command(about = "Development tools for Squad Battle")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate data files
    Validate {
        /// Path to data directory
        path: Option<PathBuf>,
    },

    /// Run a battle headless and print a JSON report
    Simulate {
        /// Path to data directory
        #[arg(long)]
        data: Option<PathBuf>,

        /// Scenario file (RON); the built-in skirmish when omitted
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Battle config file (RON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// RNG seed, overriding the config
        #[arg(long)]
        seed: Option<u64>,

        /// Maximum ticks to run
        #[arg(short, long, default_value = "6000")]
        ticks: u64,

        /// Seconds per tick
        #[arg(long, default_value = "0.05")]
        delta: f64,

        /// Progress file to apply upgrades from and bank rewards into
        #[arg(long)]
        progress: Option<PathBuf>,
    },

    /// Print upgrade prices per level as JSON
    CostTable {
        /// Path to data directory
        #[arg(long)]
        data: Option<PathBuf>,

        /// Levels to price
        #[arg(short, long, default_value = "10")]
        levels: u32,
    },
}

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { path } => cmd_validate(&path.unwrap_or_else(default_data_dir)),
        Commands::Simulate {
            data,
            scenario,
            config,
            seed,
            ticks,
            delta,
            progress,
        } => cmd_simulate(
            &data.unwrap_or_else(default_data_dir),
            scenario.as_deref(),
            config.as_deref(),
            seed,
            ticks,
            delta,
            progress,
        ),
        Commands::CostTable { data, levels } => cmd_cost_table(&data.unwrap_or_else(default_data_dir), levels),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

type CmdResult = Result<(), Box<dyn std::error::Error>>;

fn cmd_validate(path: &Path) -> CmdResult {
    tracing::info!("Validating data files in: {}", path.display());
    let report = validate_data_directory(path)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    if report.is_valid() {
        tracing::info!("Validation passed");
        Ok(())
    } else {
        Err(format!("Validation failed with {} issue(s)", report.issues.len()).into())
    }
}

fn cmd_simulate(
    data_dir: &Path,
    scenario_path: Option<&Path>,
    config_path: Option<&Path>,
    seed: Option<u64>,
    ticks: u64,
    delta: f64,
    progress_path: Option<PathBuf>,
) -> CmdResult {
    let data = load_game_data(data_dir)?;
    let mut config = load_config(config_path)?;
    if let Some(seed) = seed {
        config.seed = seed;
    }
    let scenario = match scenario_path {
        Some(path) => Scenario::load(path)?,
        None => Scenario::default(),
    };
    let delta = Fixed::checked_from_num(delta).ok_or("tick delta out of range")?;

    let mut store = progress_path.map(FileProgressStore::new);
    let progress = store.as_ref().map_or_else(PlayerProgress::default, |s| load_progress(s));

    let mut engine = scenario.build_engine(data, config, progress)?;
    let report = simulate(&scenario.name, &mut engine, ticks, delta);

    if let Some(store) = store.as_mut() {
        save_progress(store, engine.progress())?;
        tracing::info!("Progress saved to {}", store.path().display());
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_cost_table(data_dir: &Path, levels: u32) -> CmdResult {
    let data = load_game_data(data_dir)?;
    let table = cost_table(&data, levels);
    println!("{}", serde_json::to_string_pretty(&table)?);
    Ok(())
}
