//! Replay checks: identical inputs must give identical state hashes.

use proptest::prelude::*;
use warmap_core::prelude::*;
use warmap_test_utils::determinism::{
    find_first_divergence, run_parallel_simulations_scoped, verify_determinism, verify_world_determinism,
};
use warmap_test_utils::determinism::strategies::{arb_frame_ms, arb_grid_spec};
use warmap_test_utils::fixtures::{coastal_war_world, GridSpec};

fn contested_map() -> World {
    GridSpec {
        width: 9,
        height: 4,
        nations: 3,
        units: vec![10, 6, 8],
        city_every: 2,
        sea_row: true,
        wars: vec![(0, 1)],
        seed: 2024,
    }
    .build()
    .unwrap()
}

#[test]
fn frames_replay_identically() {
    assert!(verify_world_determinism(contested_map, 400, Fixed::from_num(160)));
}

#[test]
fn parallel_worlds_agree() {
    run_parallel_simulations_scoped(contested_map, 4, 300).assert_deterministic();
}

#[test]
fn slow_ticks_do_not_introduce_divergence() {
    assert_eq!(find_first_divergence(|| coastal_war_world(77).unwrap(), 300, 10), None);
}

#[test]
fn paused_clock_runs_nothing() {
    let result = verify_determinism(
        2,
        20,
        || {
            let mut clock = Clock::new();
            clock.set_speed_index(0);
            (contested_map(), clock)
        },
        |(world, clock)| {
            let report = step(world, clock, Fixed::from_num(200));
            assert_eq!(report.fast_ticks + report.slow_ticks, 0);
        },
        |(world, _)| world.state_hash(),
    );
    result.assert_deterministic();
    assert_eq!(result.hashes[0], contested_map().state_hash());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn random_maps_replay(spec in arb_grid_spec(), frame_ms in arb_frame_ms()) {
        let build = || spec.build().unwrap();
        prop_assert!(verify_world_determinism(build, 60, frame_ms));
    }
}
