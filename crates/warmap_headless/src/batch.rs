//! Batch runner.
//!
//! Runs one scenario under many seeds in parallel using rayon, to see how
//! often maps end the same way.

use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::metrics::{BatchSummary, RunMetrics};
use crate::runner::run_scenario;
use crate::scenario::Scenario;

/// Configuration for a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Scenario to run
    pub scenario: Scenario,
    /// Number of runs
    pub count: u32,
    /// Maximum parallel runs (0 = use rayon default)
    pub parallel: u32,
    /// Seed of the first run; run `i` uses `seed_start + i`
    pub seed_start: u64,
}

/// A run that could not be started.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    /// Seed used
    pub seed: u64,
    /// Error message
    pub message: String,
}

/// Results from a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used
    pub config: BatchConfig,
    /// Individual run metrics, in seed order
    pub runs: Vec<RunMetrics>,
    /// Aggregate summary
    pub summary: BatchSummary,
    /// Total runtime
    pub duration_seconds: f64,
    /// Errors encountered
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to JSON file
    ///
    /// # Errors
    ///
    /// Fails on IO or serialization errors.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from JSON file
    ///
    /// # Errors
    ///
    /// Fails on IO or parse errors.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }

    /// Default file name inside an output directory.
    #[must_use]
    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join("batch_results.json")
    }
}

/// Run every seed of the batch.
pub fn run_batch(config: BatchConfig) -> BatchResults {
    let start = Instant::now();
    info!(
        scenario = %config.scenario.name,
        count = config.count,
        parallel = config.parallel,
        seed_start = config.seed_start,
        "Starting batch"
    );

    let seeds: Vec<u64> = (0..u64::from(config.count))
        .map(|i| config.seed_start.wrapping_add(i))
        .collect();
    let run_all = || -> Vec<(u64, Result<RunMetrics, String>)> {
        seeds
            .par_iter()
            .map(|&seed| {
                let scenario = config.scenario.clone().with_seed(seed);
                (seed, run_scenario(&scenario).map_err(|e| e.to_string()))
            })
            .collect()
    };

    let outcomes = if config.parallel > 0 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel as usize)
            .build()
        {
            Ok(pool) => pool.install(run_all),
            Err(e) => {
                warn!(error = %e, "Could not build thread pool, using the global one");
                run_all()
            }
        }
    } else {
        run_all()
    };

    let mut runs = Vec::with_capacity(outcomes.len());
    let mut errors = Vec::new();
    for (seed, outcome) in outcomes {
        match outcome {
            Ok(metrics) => runs.push(metrics),
            Err(message) => {
                warn!(seed, %message, "Run failed");
                errors.push(BatchError { seed, message });
            }
        }
    }

    let summary = BatchSummary::from_runs(&runs);
    let duration_seconds = start.elapsed().as_secs_f64();
    info!(
        runs = runs.len(),
        failed = errors.len(),
        decided = summary.decided,
        duration_secs = format!("{duration_seconds:.1}"),
        "Batch finished"
    );

    BatchResults {
        config,
        runs,
        summary,
        duration_seconds,
        errors,
    }
}
