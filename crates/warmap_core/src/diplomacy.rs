//! War declaration and war cooperation.
//!
//! Declarations are evaluated on slow ticks. Each nation has its own
//! evaluation timer, re-rolled after every evaluation, so nations do not all
//! reconsider at once. A pair qualifies in one of three ways:
//!
//! - **dominant**: one side clearly outnumbers a land neighbor and declares;
//! - **even**: neighbors are evenly matched and roll a small chance;
//! - **amphibious**: a naval power can ferry troops to a non-neighbor.
//!
//! Cooperation is evaluated every fast tick: sustained war erodes it, faster
//! when units, cities and ground are being lost, and peace restores it.

use std::collections::BTreeSet;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::instrument;

use crate::combat::nation_strength;
use crate::components::{Domain, UnitKind, WarPair};
use crate::ids::{NationId, RegionId};
use crate::math::{clamp_unit, ratio, Fixed};
use crate::simulation::{TickEvents, WarDeclared};
use crate::world::World;

impl World {
    /// Declare war. Returns `false` if the pair is already at war, names the
    /// same nation twice, or names an eliminated nation.
    pub fn declare_war(&mut self, aggressor: NationId, defender: NationId) -> bool {
        let alive = |n: NationId| self.nation(n).is_some_and(|n| n.is_alive());
        if !alive(aggressor) || !alive(defender) {
            return false;
        }
        let declared = self.register_war(aggressor, defender, false);
        if declared {
            tracing::info!(%aggressor, %defender, "war declared");
        }
        declared
    }

    /// Declare a scenario war that does not erode cooperation.
    pub fn declare_test_war(&mut self, aggressor: NationId, defender: NationId) -> bool {
        self.register_war(aggressor, defender, true)
    }

    /// Uniform draw in `[0, 1)` from the world's generator.
    pub(crate) fn roll(&mut self) -> Fixed {
        Fixed::from_bits(i64::from(self.rng.gen::<u32>()))
    }
}

/// Relative strength of two unit counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matchup {
    /// The first side clearly outnumbers the second.
    Dominant,
    /// The sides are close.
    Even,
    /// Neither.
    Uneven,
}

/// Classify `stronger` against `weaker` unit counts.
#[must_use]
pub fn classify(stronger: u32, weaker: u32, config: &crate::config::DiplomacyConfig) -> Matchup {
    let gap = stronger.saturating_sub(weaker);
    let dominant_ratio = weaker == 0 || ratio(stronger, weaker) >= config.dominance_ratio;
    if stronger > weaker && (gap >= config.dominance_gap || dominant_ratio) {
        return Matchup::Dominant;
    }
    if gap <= config.even_gap || (weaker > 0 && ratio(stronger, weaker) <= config.even_ratio) {
        return Matchup::Even;
    }
    Matchup::Uneven
}

/// Evaluate and commit war declarations for ready nations.
#[instrument(skip_all, name = "war_declaration")]
pub fn war_declaration_system(world: &mut World, events: &mut TickEvents) {
    let slow_tick = world.slow_tick;
    let ready: BTreeSet<NationId> = world
        .nations
        .iter()
        .filter(|n| n.is_alive() && slow_tick >= n.next_war_eval_tick)
        .map(|n| n.id)
        .collect();
    if ready.is_empty() {
        return;
    }

    let config = world.config.diplomacy.clone();
    let counts: Vec<u32> = world
        .nations
        .iter()
        .map(|n| world.units_of(n.id) as u32)
        .collect();
    let alive = |world: &World, n: NationId| world.nation(n).is_some_and(|n| n.is_alive());

    let mut candidates: Vec<WarDeclared> = Vec::new();
    let adjacent = world.adjacent_pairs();
    for pair in adjacent.iter() {
        let (a, b) = (pair.low(), pair.high());
        if world.at_war(a, b) || !alive(world, a) || !alive(world, b) {
            continue;
        }
        if !ready.contains(&a) && !ready.contains(&b) {
            continue;
        }
        let (ca, cb) = (counts[a.index()], counts[b.index()]);
        if ca + cb < config.min_combined_units {
            continue;
        }
        let (strong, weak) = if ca >= cb { (a, b) } else { (b, a) };
        let (cs, cw) = (counts[strong.index()], counts[weak.index()]);
        match classify(cs, cw, &config) {
            Matchup::Dominant => {
                if ready.contains(&strong) {
                    candidates.push(WarDeclared {
                        aggressor: strong,
                        defender: weak,
                        amphibious: false,
                    });
                }
            }
            Matchup::Even => {
                if world.roll() < config.even_declare_chance {
                    let sides: Vec<NationId> =
                        [a, b].into_iter().filter(|n| ready.contains(n)).collect();
                    let aggressor = sides[world.rng.gen_range(0..sides.len())];
                    let defender = pair.other(aggressor).unwrap_or(b);
                    candidates.push(WarDeclared {
                        aggressor,
                        defender,
                        amphibious: false,
                    });
                }
            }
            Matchup::Uneven => {}
        }
    }

    for &aggressor in &ready {
        for defender in world.alive_nations() {
            if defender == aggressor
                || world.at_war(aggressor, defender)
                || adjacent.contains(&WarPair::new(aggressor, defender))
            {
                continue;
            }
            if amphibious_feasible(world, aggressor, defender) {
                candidates.push(WarDeclared {
                    aggressor,
                    defender,
                    amphibious: true,
                });
            }
        }
    }

    let mut seen = BTreeSet::new();
    candidates.retain(|c| seen.insert(WarPair::new(c.aggressor, c.defender)));
    let cap = config.max_declarations_per_tick as usize;
    if candidates.len() > cap {
        candidates.shuffle(&mut world.rng);
        candidates.truncate(cap);
    }

    for declaration in candidates {
        if world.register_war(declaration.aggressor, declaration.defender, false) {
            tracing::info!(
                aggressor = %declaration.aggressor,
                defender = %declaration.defender,
                amphibious = declaration.amphibious,
                "war declared"
            );
            events.wars_declared.push(declaration);
        }
    }

    for nation in ready {
        let delay = world
            .rng
            .gen_range(config.war_eval_min_ticks..=config.war_eval_max_ticks);
        if let Some(n) = world.nation_mut(nation) {
            n.next_war_eval_tick = slow_tick + u64::from(delay);
        }
    }
}

/// Sea regions next to land owned by `target`.
fn landing_seas(world: &World, target: NationId) -> Vec<RegionId> {
    let mut seas = BTreeSet::new();
    for region in world.regions_of(target) {
        if !world.is_coastal(region) {
            continue;
        }
        for &n in world.domain_neighbors(Domain::Naval, region) {
            if world.region(n).is_some_and(|r| !r.terrain.is_land()) {
                seas.insert(n);
            }
        }
    }
    seas.into_iter().collect()
}

/// Whether `aggressor` can credibly invade `target` across the sea.
#[must_use]
pub fn amphibious_feasible(world: &World, aggressor: NationId, target: NationId) -> bool {
    let config = &world.config.diplomacy;
    let mut warships = 0;
    let mut transports = 0;
    for unit in world.units().filter(|u| u.owner == aggressor) {
        match unit.kind {
            UnitKind::CombatShip => warships += 1,
            UnitKind::TransportShip => transports += 1,
            UnitKind::Infantry | UnitKind::Tank => {}
        }
    }
    if warships < config.amphibious_min_combat_ships || transports < config.amphibious_min_transports {
        return false;
    }

    let strength_ok = |domain: Domain, needed: Fixed| {
        let ours = nation_strength(world, aggressor, domain);
        let theirs = nation_strength(world, target, domain);
        theirs <= Fixed::ZERO || ours >= needed.saturating_mul(theirs)
    };
    if !strength_ok(Domain::Land, config.amphibious_land_ratio)
        || !strength_ok(Domain::Naval, config.amphibious_naval_ratio)
    {
        return false;
    }

    let reach = world.reachable(Domain::Naval, aggressor);
    landing_seas(world, target)
        .iter()
        .any(|sea| reach.get(sea.index()).copied().unwrap_or(false))
}

/// Share of a nation's baseline that has been lost, in `[0, 1]`.
fn loss_share(initial: u32, current: u32) -> Fixed {
    if initial == 0 {
        return Fixed::ZERO;
    }
    clamp_unit(ratio(initial.saturating_sub(current), initial))
}

/// Erode cooperation at war, restore it at peace.
#[instrument(skip_all, name = "cooperation")]
pub fn cooperation_system(world: &mut World) {
    let config = world.config.cooperation.clone();
    for nation in world.alive_nations() {
        let at_war = world
            .wars
            .values()
            .any(|w| !w.is_test && w.pair.involves(nation));
        let delta = if at_war {
            let Some(n) = world.nation(nation) else {
                continue;
            };
            let (initial_units, initial_cities) = (n.initial_units, n.initial_cities);
            let units = world.units_of(nation) as u32;
            let regions = world.regions_of(nation);
            let occupied = regions
                .iter()
                .filter(|r| world.occupation.is_region_occupied(**r))
                .count() as u32;
            let cities = regions
                .iter()
                .filter(|r| {
                    world.region(**r).is_some_and(|x| x.has_city())
                        && !world.occupation.is_region_occupied(**r)
                })
                .count() as u32;
            let decay = config.decay_per_tick
                + config.unit_loss_penalty * loss_share(initial_units, units)
                + config.city_loss_penalty * loss_share(initial_cities, cities)
                + config.occupation_penalty * ratio(occupied, regions.len() as u32);
            -decay
        } else {
            config.recovery_per_tick
        };
        if let Some(n) = world.nation_mut(nation) {
            n.war_cooperation = (n.war_cooperation + delta).clamp(Fixed::ZERO, config.max);
        }
    }
}
