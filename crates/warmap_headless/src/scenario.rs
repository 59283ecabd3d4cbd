//! Scenario loading and configuration.
//!
//! A scenario names a grid map, how long to run it, and optionally a RON
//! file of tuning overrides. Scenarios are stored as RON, like the config.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use warmap_core::config::SimConfig;
use warmap_core::error::SimError;
use warmap_core::world::World;
use warmap_test_utils::fixtures::GridSpec;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Unknown built-in scenario name.
    #[error("Unknown preset: {0}")]
    UnknownPreset(String),
    /// The map or config was rejected by the simulation.
    #[error("Invalid scenario: {0}")]
    Invalid(#[from] SimError),
}

/// A complete scenario configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Map layout, starting armies, opening wars and seed.
    pub map: GridSpec,
    /// Frames to run.
    pub frames: u64,
    /// Wall time per frame in milliseconds.
    pub frame_ms: u32,
    /// Index into the clock's speed table.
    pub speed_index: usize,
    /// RON file with [`SimConfig`] overrides, relative to the scenario file.
    pub config: Option<PathBuf>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self::skirmish()
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    ///
    /// A relative `config` path is resolved against the scenario's directory.
    ///
    /// # Errors
    ///
    /// Fails if the file is missing, unreadable or not a valid scenario.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let mut scenario = Self::from_ron_str(&contents)?;
        if let (Some(config), Some(dir)) = (scenario.config.as_mut(), path.parent()) {
            if config.is_relative() {
                *config = dir.join(&*config);
            }
        }
        Ok(scenario)
    }

    /// Load from a RON string (useful for embedded scenarios).
    ///
    /// # Errors
    ///
    /// Fails if the text is not a valid scenario.
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// Look up a built-in scenario by name.
    ///
    /// # Errors
    ///
    /// Fails on an unknown name.
    pub fn preset(name: &str) -> Result<Self, ScenarioError> {
        match name {
            "skirmish" => Ok(Self::skirmish()),
            "coastal" => Ok(Self::coastal()),
            "continent" => Ok(Self::continent()),
            other => Err(ScenarioError::UnknownPreset(other.to_string())),
        }
    }

    /// Two evenly matched land neighbors.
    #[must_use]
    pub fn skirmish() -> Self {
        Self {
            name: "Skirmish".to_string(),
            description: "Two land neighbors with equal armies".to_string(),
            map: GridSpec::default(),
            frames: 3000,
            frame_ms: 100,
            speed_index: 1,
            config: None,
        }
    }

    /// Two nations sharing a coast, already at war.
    #[must_use]
    pub fn coastal() -> Self {
        Self {
            name: "Coastal".to_string(),
            description: "Two nations at war along a shared sea".to_string(),
            map: GridSpec {
                width: 8,
                height: 4,
                nations: 2,
                units: vec![10, 10],
                city_every: 2,
                sea_row: true,
                wars: vec![(0, 1)],
                seed: 7,
            },
            frames: 3000,
            frame_ms: 100,
            speed_index: 2,
            config: None,
        }
    }

    /// Four nations of uneven strength on one landmass.
    #[must_use]
    pub fn continent() -> Self {
        Self {
            name: "Continent".to_string(),
            description: "Four nations of uneven strength".to_string(),
            map: GridSpec {
                width: 16,
                height: 6,
                nations: 4,
                units: vec![24, 8, 12, 4],
                city_every: 2,
                sea_row: true,
                wars: Vec::new(),
                seed: 1234,
            },
            frames: 6000,
            frame_ms: 100,
            speed_index: 4,
            config: None,
        }
    }

    /// Read the tuning overrides, or the defaults when none are named.
    ///
    /// # Errors
    ///
    /// Fails if the config file cannot be read or parsed.
    pub fn load_config(&self) -> Result<SimConfig, ScenarioError> {
        match &self.config {
            None => Ok(SimConfig::default()),
            Some(path) => {
                if !path.exists() {
                    return Err(ScenarioError::FileNotFound(path.display().to_string()));
                }
                let text = std::fs::read_to_string(path)?;
                Ok(SimConfig::from_ron_str(&text)?)
            }
        }
    }

    /// Build the starting world.
    ///
    /// # Errors
    ///
    /// Fails if the config cannot be loaded or the map is invalid.
    pub fn build_world(&self) -> Result<World, ScenarioError> {
        let config = self.load_config()?;
        Ok(self.map.build_with(config)?)
    }

    /// Same scenario with a different seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.map.seed = seed;
        self
    }
}
