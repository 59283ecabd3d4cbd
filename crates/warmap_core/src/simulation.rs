//! Tick scheduling.
//!
//! [`step`] turns a wall-clock frame delta into whole fast and slow ticks via
//! the [`Clock`] and runs every system in a fixed order:
//!
//! # Fast tick
//! 1. **Target assignment** - every `retarget_interval_ticks`
//! 2. **Movement** - advance hops
//! 3. **Transport** - embark and land troops
//! 4. **Naval battles**, then **land battles**
//! 5. **Cleanup** - wear, recovery, dead units, stale battles
//! 6. **Occupation**
//! 7. **Capitals**
//! 8. **War cooperation**
//! 9. **Civil war**
//! 10. **Surrender**
//!
//! # Slow tick
//! 1. **Production**
//! 2. **War declaration**

use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::components::{BattleKey, Domain};
use crate::ids::{GroupId, NationId, RegionId, UnitId};
use crate::math::Fixed;
use crate::world::World;
use crate::{capitals, civil_war, combat, diplomacy, movement, occupation, production, surrender, targeting, transport};

/// A war that started this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarDeclared {
    /// Declaring side.
    pub aggressor: NationId,
    /// Attacked side.
    pub defender: NationId,
    /// Declared across the sea rather than a land border.
    pub amphibious: bool,
}

/// Troops put ashore by a transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Landing {
    /// Transport that carried them.
    pub transport: UnitId,
    /// Land region they stepped onto.
    pub region: RegionId,
    /// Landed units.
    pub units: Vec<UnitId>,
    /// Landed under fire and debuffed.
    pub forced: bool,
}

/// A capital that moved or was lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapitalMove {
    /// Nation concerned.
    pub nation: NationId,
    /// Previous capital.
    pub from: Option<RegionId>,
    /// New capital, `None` if none was available.
    pub to: Option<RegionId>,
}

/// A nation that split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CivilWar {
    /// Nation that lost territory.
    pub parent: NationId,
    /// Newly created nation.
    pub child: NationId,
    /// Groups the child took.
    pub groups: Vec<GroupId>,
}

/// A nation that gave up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Surrender {
    /// Losing nation.
    pub nation: NationId,
    /// Groups handed to each winner.
    pub receivers: Vec<(NationId, Vec<GroupId>)>,
}

/// Everything notable that happened during one or more ticks.
///
/// Purely informational; nothing in the simulation reads it back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickEvents {
    /// Hops committed by moving units.
    pub hops: u32,
    /// Wars started.
    pub wars_declared: Vec<WarDeclared>,
    /// Battles that began.
    pub battles_started: Vec<BattleKey>,
    /// Battles that were not fought this tick and got pruned.
    pub battles_ended: Vec<BattleKey>,
    /// Units removed as destroyed.
    pub units_destroyed: Vec<UnitId>,
    /// Units created by production.
    pub units_spawned: Vec<UnitId>,
    /// Amphibious landings.
    pub landings: Vec<Landing>,
    /// Whether the occupation maps changed.
    pub occupation_changed: bool,
    /// Capital relocations.
    pub capital_moves: Vec<CapitalMove>,
    /// Civil wars.
    pub civil_wars: Vec<CivilWar>,
    /// Surrenders.
    pub surrenders: Vec<Surrender>,
    /// Nations eliminated.
    pub eliminations: Vec<NationId>,
}

impl TickEvents {
    /// Append another tick's events.
    pub fn merge(&mut self, other: Self) {
        self.hops += other.hops;
        self.wars_declared.extend(other.wars_declared);
        self.battles_started.extend(other.battles_started);
        self.battles_ended.extend(other.battles_ended);
        self.units_destroyed.extend(other.units_destroyed);
        self.units_spawned.extend(other.units_spawned);
        self.landings.extend(other.landings);
        self.occupation_changed |= other.occupation_changed;
        self.capital_moves.extend(other.capital_moves);
        self.civil_wars.extend(other.civil_wars);
        self.surrenders.extend(other.surrenders);
        self.eliminations.extend(other.eliminations);
    }
}

/// Outcome of one [`step`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    /// Fast ticks run.
    pub fast_ticks: u32,
    /// Slow ticks run.
    pub slow_ticks: u32,
    /// Merged events of every tick run.
    pub events: TickEvents,
}

/// Advance the world by one rendering frame.
///
/// The frame delta is clamped, scaled by the clock speed, and converted into
/// whole ticks. All fast ticks run before the slow ticks of the same frame.
///
/// # Example
///
/// ```
/// use warmap_core::prelude::*;
///
/// let mut builder = WorldBuilder::new(SimConfig::default(), 1);
/// let r = builder.add_region(Terrain::Land, Vec2Fixed::ZERO);
/// let n = builder.add_nation("Solo");
/// builder.add_group(n, &[r], true).unwrap();
/// let mut world = builder.build().unwrap();
/// let mut clock = Clock::new();
///
/// let report = step(&mut world, &mut clock, Fixed::from_num(250));
/// assert_eq!(report.fast_ticks, 2);
/// assert_eq!(world.tick(), 2);
/// ```
pub fn step(world: &mut World, clock: &mut Clock, frame_delta_ms: Fixed) -> StepReport {
    let mut report = StepReport::default();
    clock.accumulate(frame_delta_ms, &world.config.clock);

    while clock.take_fast_tick(&world.config.clock) {
        report.events.merge(fast_tick(world));
        report.fast_ticks += 1;
    }
    while clock.take_slow_tick(&world.config.clock) {
        report.events.merge(slow_tick(world));
        report.slow_ticks += 1;
    }
    report
}

/// Run one fast tick.
pub fn fast_tick(world: &mut World) -> TickEvents {
    let mut events = TickEvents::default();
    world.tick += 1;
    world.elapsed_ms += world.config.clock.fast_tick_ms;

    let interval = u64::from(world.config.movement.retarget_interval_ticks);
    if interval > 0 && (world.tick - 1) % interval == 0 {
        targeting::assign_targets(world);
    }

    movement::movement_system(world, &mut events);
    transport::transport_system(world, &mut events);
    combat::battle_system(world, Domain::Naval, &mut events);
    combat::battle_system(world, Domain::Land, &mut events);
    combat::cleanup_system(world, &mut events);
    occupation::occupation_system(world, &mut events);
    capitals::capital_system(world, &mut events);
    diplomacy::cooperation_system(world);
    civil_war::civil_war_system(world, &mut events);
    surrender::surrender_system(world, &mut events);

    #[cfg(debug_assertions)]
    {
        let hash = world.state_hash();
        tracing::debug!(tick = world.tick, state_hash = hash, "Simulation state hash");
    }

    events
}

/// Run one slow tick.
pub fn slow_tick(world: &mut World) -> TickEvents {
    let mut events = TickEvents::default();
    world.slow_tick += 1;

    production::production_system(world, &mut events);
    diplomacy::war_declaration_system(world, &mut events);

    events
}

/// Run `count` fast ticks directly, bypassing the clock.
pub fn run_fast_ticks(world: &mut World, count: u32) -> TickEvents {
    let mut events = TickEvents::default();
    for _ in 0..count {
        events.merge(fast_tick(world));
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{line_world, LineSpec};

    #[test]
    fn test_step_counts_ticks() {
        let mut world = line_world(&LineSpec::two_nations(2, 2));
        let mut clock = Clock::new();
        let mut fast = 0;
        let mut slow = 0;
        for _ in 0..8 {
            let report = step(&mut world, &mut clock, Fixed::from_num(250));
            fast += report.fast_ticks;
            slow += report.slow_ticks;
        }
        // 2000 ms of game time at speed 1.
        assert_eq!(fast, 20);
        assert_eq!(slow, 2);
        assert_eq!(world.tick(), 20);
        assert_eq!(world.slow_tick(), 2);
        assert_eq!(world.elapsed_ms(), Fixed::from_num(2000));
    }

    #[test]
    fn test_paused_clock_runs_nothing() {
        let mut world = line_world(&LineSpec::two_nations(2, 2));
        let mut clock = Clock::new();
        clock.set_speed_index(0);
        let report = step(&mut world, &mut clock, Fixed::from_num(250));
        assert_eq!(report.fast_ticks, 0);
        assert_eq!(world.tick(), 0);
    }

    #[test]
    fn test_frame_rate_does_not_change_tick_count() {
        let mut coarse = line_world(&LineSpec::two_nations(3, 3));
        let mut fine = coarse.clone();
        let mut clock_a = Clock::new();
        let mut clock_b = Clock::new();
        for _ in 0..10 {
            step(&mut coarse, &mut clock_a, Fixed::from_num(200));
        }
        for _ in 0..40 {
            step(&mut fine, &mut clock_b, Fixed::from_num(50));
        }
        assert_eq!(coarse.tick(), fine.tick());
        assert_eq!(coarse.slow_tick(), fine.slow_tick());
    }

    #[test]
    fn test_merge_accumulates() {
        let mut a = TickEvents {
            hops: 2,
            ..TickEvents::default()
        };
        let b = TickEvents {
            hops: 3,
            occupation_changed: true,
            eliminations: vec![NationId(1)],
            ..TickEvents::default()
        };
        a.merge(b);
        assert_eq!(a.hops, 5);
        assert!(a.occupation_changed);
        assert_eq!(a.eliminations, vec![NationId(1)]);
    }
}
