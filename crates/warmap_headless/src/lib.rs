//! Headless runner for the warmap simulation.
//!
//! Drives `warmap_core` without a renderer so maps can be played out from
//! the command line, in CI, or in bulk:
//!
//! - **Single runs**: step a scenario and print a JSON summary
//! - **Batches**: the same scenario under many seeds, in parallel
//! - **Determinism checks**: replay a scenario and compare state hashes
//!
//! Output goes to stdout as JSON; logs go to stderr.
//!
//! # Example
//!
//! ```bash
//! # Run a built-in scenario
//! cargo run -p warmap_headless -- run --preset coastal
//!
//! # Run a scenario file with tuning overrides
//! cargo run -p warmap_headless -- run --scenario maps/duel.ron --config tuning.ron
//!
//! # 200 seeds of the continent preset
//! cargo run -p warmap_headless -- batch --preset continent --count 200 --output results/
//! ```

pub mod batch;
pub mod metrics;
pub mod runner;
pub mod scenario;

pub use batch::{run_batch, BatchConfig, BatchResults};
pub use metrics::{BatchSummary, EventCounts, RunMetrics};
pub use runner::{run_scenario, HeadlessConfig, HeadlessRunner};
pub use scenario::{Scenario, ScenarioError};
