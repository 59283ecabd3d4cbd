//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the simulation
//! produces identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! Two worlds built from the same map and seed must stay bit-identical
//! forever. Sources of non-determinism include:
//!
//! - **Floating-point math**: We use fixed-point arithmetic via
//!   [`warmap_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: World state lives in `Vec`s and
//!   `BTreeMap`s keyed by id, so iteration is always in id order.
//!
//! - **System randomness**: Every roll comes from the world's own seeded
//!   `ChaCha8Rng`.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual system determinism (movement, combat, etc.)
//! 2. **Property tests**: Random maps and seeds must still replay exactly
//! 3. **Integration tests**: Full scenarios are reproducible
//! 4. **Parallel tests**: Running N worlds on N threads all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use warmap_core::clock::Clock;
use warmap_core::math::Fixed;
use warmap_core::simulation::{fast_tick, step};
use warmap_core::world::World;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Result of parallel simulation runs.
#[derive(Debug, Clone)]
pub struct ParallelSimResult {
    /// Final state hash from each world.
    pub hashes: Vec<u64>,
    /// Number of fast ticks each world ran.
    pub ticks: u64,
    /// Number of worlds run.
    pub num_sims: usize,
}

impl ParallelSimResult {
    /// Check if all worlds produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all worlds matched.
    ///
    /// # Panics
    ///
    /// Panics if worlds produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel simulations diverged!\n\
                 Simulations: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.num_sims,
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial simulation state
/// * `step` - Function to advance simulation by one tick
/// * `hash` - Function to compute state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// One frame step of a world together with its clock.
///
/// Every frame is `frame_ms` of wall time, so fast and slow ticks interleave
/// exactly as they would under a renderer.
pub fn step_frame(state: &mut (World, Clock), frame_ms: Fixed) {
    let (world, clock) = state;
    step(world, clock, frame_ms);
}

/// Build a world twice, drive both through `frames` frames of `frame_ms`,
/// and compare the final state hashes.
///
/// # Example
///
/// ```
/// use warmap_core::math::Fixed;
/// use warmap_test_utils::determinism::verify_world_determinism;
/// use warmap_test_utils::fixtures::duel_world;
///
/// let deterministic = verify_world_determinism(
///     || duel_world(6, 6, 9).unwrap(),
///     50,
///     Fixed::from_num(100),
/// );
/// assert!(deterministic);
/// ```
pub fn verify_world_determinism<F>(setup_fn: F, frames: u64, frame_ms: Fixed) -> bool
where
    F: Fn() -> World,
{
    let result = verify_determinism(
        2,
        frames,
        || (setup_fn(), Clock::new()),
        |state| step_frame(state, frame_ms),
        |(world, _)| world.state_hash(),
    );
    result.is_deterministic
}

/// Run N worlds on N scoped threads and collect final hashes.
///
/// Catches non-determinism that only shows up under thread scheduling or
/// memory layout differences. Each world is built on its own thread.
pub fn run_parallel_simulations_scoped<F>(
    setup_fn: F,
    num_sims: usize,
    num_ticks: u64,
) -> ParallelSimResult
where
    F: Fn() -> World + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut world = setup_fn();
                    for _ in 0..num_ticks {
                        fast_tick(&mut world);
                    }
                    world.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("simulation thread panicked"))
            .collect()
    });

    ParallelSimResult {
        hashes,
        ticks: num_ticks,
        num_sims,
    }
}

/// Compare two worlds tick-by-tick, finding the first divergence.
///
/// Both worlds run one fast tick per step, plus a slow tick every
/// `slow_every` fast ticks (0 for none), the way a steady frame rate would
/// schedule them.
///
/// # Returns
///
/// `None` if the worlds stay identical, `Some(tick)` for the first fast tick
/// after which their hashes differ.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64, slow_every: u64) -> Option<u64>
where
    F: Fn() -> World,
{
    let mut a = setup_fn();
    let mut b = setup_fn();

    if a.state_hash() != b.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        for world in [&mut a, &mut b] {
            fast_tick(world);
            if slow_every > 0 && tick % slow_every == 0 {
                warmap_core::simulation::slow_tick(world);
            }
        }

        if a.state_hash() != b.state_hash() {
            tracing::warn!(tick, "worlds diverged");
            return Some(tick);
        }
    }

    None
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for determinism testing.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing of simulation determinism.
pub mod strategies {
    use proptest::prelude::*;
    use warmap_core::ids::NationId;
    use warmap_core::math::Fixed;

    use crate::fixtures::GridSpec;

    /// Generate a world seed.
    pub fn arb_seed() -> impl Strategy<Value = u64> {
        any::<u64>()
    }

    /// Generate a frame delta between 1 ms and 500 ms.
    pub fn arb_frame_ms() -> impl Strategy<Value = Fixed> {
        (1i32..=500).prop_map(Fixed::from_num)
    }

    /// Generate a small grid map with two to four nations, optionally at war
    /// and optionally with a coast.
    pub fn arb_grid_spec() -> impl Strategy<Value = GridSpec> {
        (2u32..=4, 2u32..=4, any::<bool>(), any::<bool>(), any::<u64>()).prop_flat_map(
            |(nations, height, sea_row, at_war, seed)| {
                let width = nations * 2;
                prop::collection::vec(0u32..12, nations as usize).prop_map(move |units| GridSpec {
                    width,
                    height,
                    nations,
                    units,
                    city_every: 2,
                    sea_row,
                    wars: if at_war { vec![(0, 1)] } else { Vec::new() },
                    seed,
                })
            },
        )
    }

    /// Generate per-nation weights, some of them zero.
    pub fn arb_weights(max_nations: u32) -> impl Strategy<Value = Vec<(NationId, Fixed)>> {
        prop::collection::vec(0i32..50, 1..=max_nations as usize).prop_map(|weights| {
            weights
                .into_iter()
                .enumerate()
                .map(|(i, w)| (NationId(i as u32), Fixed::from_num(w)))
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{coastal_war_world, duel_world, GridSpec};

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 100, || 0u64, |s| *s = s.wrapping_add(1), |s| *s);

        assert!(result.is_deterministic);
        assert_eq!(result.hashes.len(), 3);
        assert!(result.hashes.iter().all(|&h| h == 100));
    }

    #[test]
    fn test_unique_hashes() {
        let result = DeterminismResult {
            is_deterministic: false,
            hashes: vec![1, 2, 1, 3, 2],
            ticks: 10,
        };

        assert_eq!(result.unique_hashes(), vec![1, 2, 3]);
    }

    #[test]
    #[should_panic(expected = "non-deterministic")]
    fn test_assert_deterministic_panics() {
        let result = DeterminismResult {
            is_deterministic: false,
            hashes: vec![1, 2],
            ticks: 10,
        };
        result.assert_deterministic();
    }

    #[test]
    fn test_world_replays_with_frames() {
        assert!(verify_world_determinism(
            || coastal_war_world(5).unwrap(),
            80,
            Fixed::from_num(125),
        ));
    }

    #[test]
    fn test_parallel_worlds_match() {
        let result = run_parallel_simulations_scoped(|| coastal_war_world(3).unwrap(), 4, 200);
        assert_eq!(result.num_sims, 4);
        result.assert_deterministic();
    }

    #[test]
    fn test_no_divergence_at_war() {
        let setup = || {
            GridSpec {
                wars: vec![(0, 1)],
                ..GridSpec::default()
            }
            .build()
            .unwrap()
        };
        assert_eq!(find_first_divergence(setup, 150, 10), None);
    }

    #[test]
    fn test_divergence_found_between_armies() {
        let blue = std::cell::Cell::new(3u32);
        let setup = || {
            blue.set(blue.get() + 1);
            duel_world(4, blue.get(), 1).unwrap()
        };
        assert_eq!(find_first_divergence(setup, 10, 0), Some(0));
    }

    #[test]
    fn test_compute_hash_is_stable() {
        assert_eq!(compute_hash(&(1u32, "a")), compute_hash(&(1u32, "a")));
        assert_ne!(compute_hash(&1u32), compute_hash(&2u32));
    }
}
