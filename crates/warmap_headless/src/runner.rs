//! Headless run loop.
//!
//! Feeds a world fixed-size frames through the clock, the way a renderer
//! would, and tallies what happened.

use warmap_core::clock::Clock;
use warmap_core::math::Fixed;
use warmap_core::simulation::{step, StepReport};
use warmap_core::world::World;

use crate::metrics::{EventCounts, RunMetrics};
use crate::scenario::{Scenario, ScenarioError};

/// Frames between progress log lines.
const PROGRESS_EVERY: u64 = 1000;

/// Headless runner configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadlessConfig {
    /// Frames to run at most.
    pub frames: u64,
    /// Wall time per frame in milliseconds.
    pub frame_ms: u32,
    /// Index into the clock's speed table.
    pub speed_index: usize,
    /// Stop once at most one nation is left.
    pub stop_when_decided: bool,
}

impl HeadlessConfig {
    /// Run settings stored in a scenario.
    #[must_use]
    pub fn from_scenario(scenario: &Scenario) -> Self {
        Self {
            frames: scenario.frames,
            frame_ms: scenario.frame_ms,
            speed_index: scenario.speed_index,
            stop_when_decided: true,
        }
    }
}

/// Drives one world through a scenario.
#[derive(Debug)]
pub struct HeadlessRunner {
    name: String,
    seed: u64,
    config: HeadlessConfig,
    world: World,
    clock: Clock,
    frames_run: u64,
    events: EventCounts,
}

impl HeadlessRunner {
    /// Build the scenario's world and a clock at the configured speed.
    ///
    /// # Errors
    ///
    /// Fails if the scenario's config or map is invalid.
    pub fn new(scenario: &Scenario, config: HeadlessConfig) -> Result<Self, ScenarioError> {
        let world = scenario.build_world()?;
        let mut clock = Clock::new();
        clock.set_speed_index(config.speed_index);
        Ok(Self {
            name: scenario.name.clone(),
            seed: scenario.map.seed,
            config,
            world,
            clock,
            frames_run: 0,
            events: EventCounts::default(),
        })
    }

    /// The world being simulated.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Frames stepped so far.
    #[must_use]
    pub fn frames_run(&self) -> u64 {
        self.frames_run
    }

    /// Whether at most one nation is left.
    #[must_use]
    pub fn is_decided(&self) -> bool {
        self.world.alive_nations().len() <= 1
    }

    /// Advance one frame.
    pub fn step_frame(&mut self) -> StepReport {
        let report = step(
            &mut self.world,
            &mut self.clock,
            Fixed::from_num(self.config.frame_ms),
        );
        self.frames_run += 1;
        self.events.record(&report.events);
        report
    }

    /// Run until the frame budget is spent or, if configured, the map is
    /// decided.
    pub fn run(&mut self) -> RunMetrics {
        tracing::info!(
            scenario = %self.name,
            seed = self.seed,
            frames = self.config.frames,
            frame_ms = self.config.frame_ms,
            speed = self.clock.speed(),
            "Starting run"
        );
        while self.frames_run < self.config.frames {
            if self.config.stop_when_decided && self.is_decided() {
                tracing::info!(frame = self.frames_run, tick = self.world.tick(), "Map decided");
                break;
            }
            self.step_frame();
            if self.frames_run % PROGRESS_EVERY == 0 {
                tracing::debug!(
                    frame = self.frames_run,
                    tick = self.world.tick(),
                    units = self.world.unit_count(),
                    wars = self.world.wars().count(),
                    "Progress"
                );
            }
        }
        let metrics = self.metrics();
        tracing::info!(
            ticks = metrics.fast_ticks,
            alive = metrics.alive_nations.len(),
            state_hash = metrics.state_hash,
            "Run finished"
        );
        metrics
    }

    /// Metrics for the current state.
    #[must_use]
    pub fn metrics(&self) -> RunMetrics {
        RunMetrics::capture(&self.name, self.seed, self.frames_run, &self.world, self.events)
    }
}

/// Build and run a scenario with its stored run settings.
///
/// # Errors
///
/// Fails if the scenario's config or map is invalid.
pub fn run_scenario(scenario: &Scenario) -> Result<RunMetrics, ScenarioError> {
    let mut runner = HeadlessRunner::new(scenario, HeadlessConfig::from_scenario(scenario))?;
    Ok(runner.run())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short(frames: u64) -> Scenario {
        Scenario {
            frames,
            ..Scenario::coastal()
        }
    }

    #[test]
    fn test_frames_become_ticks() {
        // 100 ms frames at speed 2: two fast ticks per frame, one slow tick
        // every five frames.
        let scenario = short(50);
        let mut runner = HeadlessRunner::new(&scenario, HeadlessConfig::from_scenario(&scenario)).unwrap();
        let metrics = runner.run();
        assert_eq!(metrics.frames, 50);
        assert_eq!(metrics.fast_ticks, 100);
        assert_eq!(metrics.slow_ticks, 10);
    }

    #[test]
    fn test_paused_run_keeps_initial_state() {
        let scenario = Scenario {
            speed_index: 0,
            ..short(20)
        };
        let initial = scenario.build_world().unwrap().state_hash();
        let metrics = run_scenario(&scenario).unwrap();
        assert_eq!(metrics.fast_ticks, 0);
        assert_eq!(metrics.state_hash, initial);
    }

    #[test]
    fn test_runs_replay() {
        let a = run_scenario(&short(300)).unwrap();
        let b = run_scenario(&short(300)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_decided_map_stops_early() {
        let scenario = Scenario {
            map: warmap_test_utils::fixtures::GridSpec {
                nations: 1,
                units: vec![2],
                ..Scenario::skirmish().map
            },
            ..short(100)
        };
        let metrics = run_scenario(&scenario).unwrap();
        assert_eq!(metrics.frames, 0);
        assert_eq!(metrics.alive_nations.len(), 1);
    }
}
