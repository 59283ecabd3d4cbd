//! Run metrics.
//!
//! What a headless run reports: how far the clock got, which wars are being
//! fought, who is still standing, and the state hash for replay checks.
//! Everything serializes to JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use warmap_core::components::Domain;
use warmap_core::ids::{NationId, RegionId};
use warmap_core::simulation::TickEvents;
use warmap_core::world::World;

/// Counts of notable events over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCounts {
    /// Hops committed.
    pub hops: u64,
    /// Wars declared by diplomacy.
    pub wars_declared: u32,
    /// Battles begun.
    pub battles_started: u32,
    /// Units destroyed in battle.
    pub units_destroyed: u32,
    /// Units produced.
    pub units_spawned: u32,
    /// Amphibious landings.
    pub landings: u32,
    /// Capital relocations.
    pub capital_moves: u32,
    /// Civil wars.
    pub civil_wars: u32,
    /// Surrenders.
    pub surrenders: u32,
    /// Eliminations.
    pub eliminations: u32,
}

impl EventCounts {
    /// Add one step's events.
    pub fn record(&mut self, events: &TickEvents) {
        let count = |n: usize| u32::try_from(n).unwrap_or(u32::MAX);
        self.hops += u64::from(events.hops);
        self.wars_declared += count(events.wars_declared.len());
        self.battles_started += count(events.battles_started.len());
        self.units_destroyed += count(events.units_destroyed.len());
        self.units_spawned += count(events.units_spawned.len());
        self.landings += count(events.landings.len());
        self.capital_moves += count(events.capital_moves.len());
        self.civil_wars += count(events.civil_wars.len());
        self.surrenders += count(events.surrenders.len());
        self.eliminations += count(events.eliminations.len());
    }
}

/// One ongoing war.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarSummary {
    /// Side that declared.
    pub aggressor: NationId,
    /// The other side.
    pub defender: NationId,
    /// Fast tick of the declaration.
    pub start_tick: u64,
}

/// One nation at the end of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NationSummary {
    /// Nation id.
    pub id: NationId,
    /// Display name.
    pub name: String,
    /// Seat of government.
    pub capital: Option<RegionId>,
    /// Regions owned.
    pub regions: u32,
    /// Land units.
    pub land_units: u32,
    /// Ships.
    pub ships: u32,
    /// Nation it seceded from.
    pub parent: Option<NationId>,
}

/// Complete metrics for a single run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Scenario name.
    pub scenario: String,
    /// World seed.
    pub seed: u64,
    /// Frames stepped.
    pub frames: u64,
    /// Fast ticks run.
    pub fast_ticks: u64,
    /// Slow ticks run.
    pub slow_ticks: u64,
    /// Nations still in the game.
    pub alive_nations: Vec<NationSummary>,
    /// Nations eliminated.
    pub eliminated: Vec<NationId>,
    /// Wars still being fought.
    pub wars: Vec<WarSummary>,
    /// Units on the map.
    pub unit_count: u32,
    /// What happened along the way.
    pub events: EventCounts,
    /// Final simulation state hash (for determinism validation).
    pub state_hash: u64,
}

impl RunMetrics {
    /// Snapshot a world.
    #[must_use]
    pub fn capture(scenario: &str, seed: u64, frames: u64, world: &World, events: EventCounts) -> Self {
        let count = |n: usize| u32::try_from(n).unwrap_or(u32::MAX);
        let alive_nations = world
            .nations()
            .iter()
            .filter(|n| n.is_alive())
            .map(|n| {
                let units = || world.units().filter(|u| u.owner == n.id);
                NationSummary {
                    id: n.id,
                    name: n.name.clone(),
                    capital: n.capital,
                    regions: count(world.regions_of(n.id).len()),
                    land_units: count(units().filter(|u| u.domain() == Domain::Land).count()),
                    ships: count(units().filter(|u| u.domain() == Domain::Naval).count()),
                    parent: n.parent,
                }
            })
            .collect();
        let eliminated = world
            .nations()
            .iter()
            .filter(|n| !n.is_alive())
            .map(|n| n.id)
            .collect();
        let wars = world
            .wars()
            .map(|w| WarSummary {
                aggressor: w.aggressor,
                defender: w.pair.other(w.aggressor).unwrap_or(w.aggressor),
                start_tick: w.start_tick,
            })
            .collect();

        Self {
            scenario: scenario.to_string(),
            seed,
            frames,
            fast_ticks: world.tick(),
            slow_ticks: world.slow_tick(),
            alive_nations,
            eliminated,
            wars,
            unit_count: count(world.unit_count()),
            events,
            state_hash: world.state_hash(),
        }
    }

    /// Pretty JSON.
    ///
    /// # Errors
    ///
    /// Fails only if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Save to a JSON file, creating parent directories.
    ///
    /// # Errors
    ///
    /// Fails on IO or serialization errors.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = self.to_json().map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

/// Aggregate over many runs of one scenario.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Runs aggregated.
    pub runs: u32,
    /// Runs that ended with a single nation left.
    pub decided: u32,
    /// Mean number of nations left standing.
    pub mean_alive_nations: f64,
    /// Mean wars declared per run.
    pub mean_wars_declared: f64,
    /// Mean battles per run.
    pub mean_battles: f64,
    /// Runs with at least one civil war.
    pub runs_with_civil_war: u32,
    /// Wins per surviving nation name in decided runs.
    pub winners: std::collections::BTreeMap<String, u32>,
}

impl BatchSummary {
    /// Aggregate run metrics.
    #[must_use]
    pub fn from_runs(runs: &[RunMetrics]) -> Self {
        let n = runs.len().max(1) as f64;
        let mut summary = Self {
            runs: u32::try_from(runs.len()).unwrap_or(u32::MAX),
            ..Self::default()
        };
        for run in runs {
            if let [winner] = run.alive_nations.as_slice() {
                summary.decided += 1;
                *summary.winners.entry(winner.name.clone()).or_default() += 1;
            }
            if run.events.civil_wars > 0 {
                summary.runs_with_civil_war += 1;
            }
            summary.mean_alive_nations += run.alive_nations.len() as f64 / n;
            summary.mean_wars_declared += f64::from(run.events.wars_declared) / n;
            summary.mean_battles += f64::from(run.events.battles_started) / n;
        }
        summary
    }
}
