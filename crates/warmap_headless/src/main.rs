//! Headless warmap runner.
//!
//! # Usage
//!
//! ```bash
//! # Run the default skirmish and print a JSON summary
//! cargo run -p warmap_headless -- run
//!
//! # Run a scenario file for 5000 frames at 4x speed
//! cargo run -p warmap_headless -- run --scenario maps/duel.ron --frames 5000 --speed 3
//!
//! # Batch of 100 seeds
//! cargo run -p warmap_headless -- batch --preset coastal --count 100 --output results/
//!
//! # Check that a scenario replays exactly
//! cargo run -p warmap_headless -- verify --preset continent --runs 3
//! ```
//!
//! Logs go to stderr and honor `RUST_LOG`; JSON goes to stdout.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use warmap_headless::{
    batch::{run_batch, BatchConfig, BatchResults},
    runner::{HeadlessConfig, HeadlessRunner},
    scenario::{Scenario, ScenarioError},
};
use warmap_test_utils::determinism::DeterminismResult;

#[derive(Parser)]
#[command(name = "warmap_headless")]
#[command(about = "Headless warmap simulation runner")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Where the scenario comes from and what to override.
#[derive(Args, Debug, Clone, Default)]
struct ScenarioArgs {
    /// Scenario RON file
    #[arg(short, long, conflicts_with = "preset")]
    scenario: Option<PathBuf>,

    /// Built-in scenario: skirmish, coastal or continent
    #[arg(short, long)]
    preset: Option<String>,

    /// RON file with tuning overrides
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// World seed
    #[arg(long)]
    seed: Option<u64>,

    /// Frames to run
    #[arg(short, long)]
    frames: Option<u64>,

    /// Wall time per frame in milliseconds
    #[arg(long)]
    frame_ms: Option<u32>,

    /// Speed index (0 = paused, 1..=4 = 1x, 2x, 4x, 8x)
    #[arg(long)]
    speed: Option<usize>,
}

impl ScenarioArgs {
    fn resolve(&self) -> Result<Scenario, ScenarioError> {
        let mut scenario = match (&self.scenario, &self.preset) {
            (Some(path), _) => Scenario::load(path)?,
            (None, Some(name)) => Scenario::preset(name)?,
            (None, None) => Scenario::default(),
        };
        if let Some(config) = &self.config {
            scenario.config = Some(config.clone());
        }
        if let Some(seed) = self.seed {
            scenario.map.seed = seed;
        }
        if let Some(frames) = self.frames {
            scenario.frames = frames;
        }
        if let Some(frame_ms) = self.frame_ms {
            scenario.frame_ms = frame_ms;
        }
        if let Some(speed) = self.speed {
            scenario.speed_index = speed;
        }
        Ok(scenario)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single scenario and print its summary
    Run {
        #[command(flatten)]
        scenario: ScenarioArgs,

        /// Keep running after only one nation is left
        #[arg(long)]
        full: bool,

        /// Also write the summary to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run one scenario under many seeds
    Batch {
        #[command(flatten)]
        scenario: ScenarioArgs,

        /// Number of runs
        #[arg(short = 'n', long, default_value = "100")]
        count: u32,

        /// Maximum parallel runs (0 = auto)
        #[arg(long, default_value = "0")]
        parallel: u32,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,
    },

    /// Verify determinism by running the same seed several times
    Verify {
        #[command(flatten)]
        scenario: ScenarioArgs,

        /// Number of verification runs
        #[arg(short, long, default_value = "3")]
        runs: u32,
    },
}

fn main() {
    let cli = Cli::parse();

    // Logs to stderr; stdout carries JSON
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    let command = cli.command.unwrap_or(Commands::Run {
        scenario: ScenarioArgs::default(),
        full: false,
        output: None,
    });
    match command {
        Commands::Run {
            scenario,
            full,
            output,
        } => cmd_run(&scenario, full, output),
        Commands::Batch {
            scenario,
            count,
            parallel,
            output,
        } => cmd_batch(&scenario, count, parallel, &output),
        Commands::Verify { scenario, runs } => cmd_verify(&scenario, runs),
    }
}

fn fail(context: &str, error: impl std::fmt::Display) -> ! {
    tracing::error!(%error, "{context}");
    eprintln!("FATAL: {context}: {error}");
    std::process::exit(1);
}

fn load(args: &ScenarioArgs) -> Scenario {
    args.resolve().unwrap_or_else(|e| fail("Cannot load scenario", e))
}

/// Run a single scenario
fn cmd_run(args: &ScenarioArgs, full: bool, output: Option<PathBuf>) {
    let scenario = load(args);
    let config = HeadlessConfig {
        stop_when_decided: !full,
        ..HeadlessConfig::from_scenario(&scenario)
    };
    let mut runner =
        HeadlessRunner::new(&scenario, config).unwrap_or_else(|e| fail("Cannot build world", e));
    let metrics = runner.run();

    let json = metrics
        .to_json()
        .unwrap_or_else(|e| fail("Cannot serialize summary", e));
    println!("{json}");
    if let Some(path) = output {
        if let Err(e) = metrics.save(&path) {
            fail("Cannot write summary", e);
        }
        tracing::info!(path = %path.display(), "Summary saved");
    }
}

/// Run a batch of seeds
fn cmd_batch(args: &ScenarioArgs, count: u32, parallel: u32, output: &std::path::Path) {
    let scenario = load(args);
    let seed_start = scenario.map.seed;
    let results = run_batch(BatchConfig {
        scenario,
        count,
        parallel,
        seed_start,
    });

    let path = BatchResults::path_in(output);
    if let Err(e) = results.save(&path) {
        fail("Failed to save results", e);
    }

    let summary = &results.summary;
    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Runs: {}", summary.runs);
    if !results.errors.is_empty() {
        eprintln!("Failed: {}", results.errors.len());
    }
    eprintln!("Decided: {}", summary.decided);
    eprintln!("Mean nations left: {:.2}", summary.mean_alive_nations);
    eprintln!("Mean wars declared: {:.2}", summary.mean_wars_declared);
    for (name, wins) in &summary.winners {
        eprintln!("  {name}: {wins}");
    }
    eprintln!("Results: {}", path.display());
}

/// Replay a scenario and compare final hashes
fn cmd_verify(args: &ScenarioArgs, runs: u32) {
    let scenario = load(args);
    let config = HeadlessConfig {
        stop_when_decided: false,
        ..HeadlessConfig::from_scenario(&scenario)
    };

    let mut hashes = Vec::with_capacity(runs as usize);
    let mut ticks = 0;
    for run in 0..runs {
        let mut runner =
            HeadlessRunner::new(&scenario, config).unwrap_or_else(|e| fail("Cannot build world", e));
        let metrics = runner.run();
        tracing::info!(run, state_hash = metrics.state_hash, "Verification run");
        ticks = metrics.fast_ticks;
        hashes.push(metrics.state_hash);
    }

    let result = DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        ticks,
    };
    if result.is_deterministic {
        eprintln!(
            "Deterministic: {} runs, {} ticks, hash {:#018x}",
            runs,
            ticks,
            result.hashes.first().copied().unwrap_or_default()
        );
    } else {
        eprintln!(
            "NON-DETERMINISTIC: {} distinct hashes over {} runs",
            result.unique_hashes().len(),
            runs
        );
        std::process::exit(2);
    }
}
