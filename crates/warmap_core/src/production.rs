//! Economy and unit production.
//!
//! Every `interval_slow_ticks` slow ticks a nation collects income from its
//! unoccupied regions, spends weapons topping up worn equipment, then raises
//! new land units at its capital and cities and one ship per port. All
//! spawning respects the per-nation and global caps and is paid from the
//! stockpile.

use tracing::instrument;

use crate::components::{Building, Domain, Resources, UnitKind};
use crate::ids::{NationId, RegionId, UnitId};
use crate::math::{clamp_unit, Fixed};
use crate::simulation::TickEvents;
use crate::world::World;

/// Income of one production round.
fn income(world: &World, nation: NationId) -> Resources {
    let config = &world.config.production;
    world
        .regions_of(nation)
        .into_iter()
        .filter(|r| !world.occupation.is_region_occupied(*r))
        .filter_map(|r| world.region(r))
        .fold(Resources::ZERO, |acc, region| {
            if region.building.is_some() {
                acc + config.region_income.scaled(config.city_income_multiplier)
            } else {
                acc + config.region_income
            }
        })
}

/// Restore equipment fill from the weapons stock, lowest unit id first.
fn refill_equipment(world: &mut World, nation: NationId) {
    let per_fill = world.config.production.weapons_per_fill;
    let Some(mut weapons) = world.nation(nation).map(|n| n.resources.weapons) else {
        return;
    };
    for unit in world.units.values_mut().filter(|u| u.owner == nation) {
        for slot in &mut unit.equipment {
            let missing = Fixed::ONE - clamp_unit(slot.fill);
            if missing == Fixed::ZERO {
                continue;
            }
            if per_fill == Fixed::ZERO {
                slot.fill = Fixed::ONE;
                continue;
            }
            let spent = missing.saturating_mul(per_fill).min(weapons);
            slot.fill = clamp_unit(slot.fill + spent / per_fill);
            weapons -= spent;
        }
    }
    if let Some(n) = world.nation_mut(nation) {
        n.resources.weapons = weapons;
    }
}

fn under_caps(world: &World, nation: NationId) -> bool {
    let config = &world.config.production;
    world.units_of(nation) < config.max_units_per_nation as usize
        && world.unit_count() < config.max_total_units as usize
}

/// Pay for and create one unit. `None` when the stockpile cannot cover it.
fn recruit(world: &mut World, nation: NationId, kind: UnitKind, region: RegionId) -> Option<UnitId> {
    let cost = world.config.units.get(kind).cost;
    let n = world.nation_mut(nation)?;
    if !n.resources.covers(&cost) {
        return None;
    }
    let weapons = n.resources.weapons;
    let fill = if cost.weapons > Fixed::ZERO {
        clamp_unit(weapons.saturating_div(cost.weapons))
    } else {
        Fixed::ONE
    };
    n.resources -= Resources {
        weapons: weapons.min(cost.weapons),
        ..cost
    };
    if kind.domain() == Domain::Land {
        n.spawn_counter += 1;
    }

    let id = world.spawn_unit(nation, kind, region);
    if let Some(unit) = world.unit_mut(id) {
        for slot in &mut unit.equipment {
            slot.fill = fill;
        }
    }
    Some(id)
}

/// Next ship kind for a port, keeping both fleets equally close to their caps.
fn ship_kind(world: &World, nation: NationId) -> Option<UnitKind> {
    let config = &world.config.production;
    let count = |kind: UnitKind| {
        world
            .units()
            .filter(|u| u.owner == nation && u.kind == kind)
            .count() as u64
    };
    let warships = count(UnitKind::CombatShip);
    let transports = count(UnitKind::TransportShip);
    let (max_w, max_t) = (u64::from(config.max_combat_ships), u64::from(config.max_transports));
    match (warships < max_w, transports < max_t) {
        (true, true) if transports * max_w < warships * max_t => Some(UnitKind::TransportShip),
        (true, _) => Some(UnitKind::CombatShip),
        (false, true) => Some(UnitKind::TransportShip),
        (false, false) => None,
    }
}

/// Run due production rounds.
#[instrument(skip_all, name = "production")]
pub fn production_system(world: &mut World, events: &mut TickEvents) {
    let slow_tick = world.slow_tick;
    let interval = u64::from(world.config.production.interval_slow_ticks);
    for nation in world.alive_nations() {
        let due = world
            .nation(nation)
            .is_some_and(|n| slow_tick >= n.next_production_tick);
        if !due {
            continue;
        }

        let flow = income(world, nation);
        if let Some(n) = world.nation_mut(nation) {
            n.next_production_tick = slow_tick + interval;
            n.resources += flow;
            n.resource_flow = flow;
        }
        refill_equipment(world, nation);

        let before = events.units_spawned.len();
        for (region, count) in land_spawn_sites(world, nation) {
            for _ in 0..count {
                if !under_caps(world, nation) {
                    break;
                }
                let tank_every = world.config.production.tank_every;
                let kind = match world.nation(nation) {
                    Some(n) if (n.spawn_counter + 1) % tank_every == 0 => UnitKind::Tank,
                    _ => UnitKind::Infantry,
                };
                match recruit(world, nation, kind, region) {
                    Some(id) => events.units_spawned.push(id),
                    None => break,
                }
            }
        }

        let ports: Vec<RegionId> = world
            .port_targets()
            .get(&nation)
            .map(|ports| {
                ports
                    .iter()
                    .copied()
                    .filter(|p| !world.occupation.is_region_occupied(*p))
                    .collect()
            })
            .unwrap_or_default();
        for port in ports {
            if !under_caps(world, nation) {
                break;
            }
            let Some(kind) = ship_kind(world, nation) else {
                break;
            };
            if let Some(id) = recruit(world, nation, kind, port) {
                events.units_spawned.push(id);
            }
        }

        tracing::debug!(
            %nation,
            spawned = events.units_spawned.len() - before,
            manpower = %flow.manpower,
            "production round"
        );
    }
}

/// Where land units appear this round and how many.
fn land_spawn_sites(world: &World, nation: NationId) -> Vec<(RegionId, u32)> {
    let Some(n) = world.nation(nation) else {
        return Vec::new();
    };
    let config = &world.config.production;
    let mut sites = Vec::new();

    let held_capital = n.capital.filter(|c| {
        world.owner_of(*c) == Some(nation) && !world.occupation.is_region_occupied(*c)
    });
    if let Some(capital) = held_capital {
        let free_groups = n
            .groups
            .iter()
            .filter(|g| world.occupation.group_occupier(**g).is_none())
            .count() as u32;
        let extra = Fixed::from_num(free_groups)
            .saturating_mul(config.capital_spawn_per_group)
            .to_num::<u32>();
        sites.push((capital, config.capital_base_spawn + extra));
    }
    for region in world.regions_of(nation) {
        let is_city = world
            .region(region)
            .is_some_and(|r| r.building == Some(Building::City));
        if is_city && !world.occupation.is_region_occupied(region) {
            sites.push((region, config.city_spawn_count));
        }
    }
    sites
}
