//! Troop transports.
//!
//! Land units flagged with `embark_request` board a friendly transport at an
//! own port. Carried units ride along without acting on their own. A loaded
//! transport puts its troops ashore when it reaches the sea next to its
//! landing order, when it is back at an own port with no order, or when enemy
//! warships catch it at sea. A landing under fire applies the forced-landing
//! debuff.

use tracing::instrument;

use crate::components::{Debuff, Domain, UnitKind, UnitRole};
use crate::ids::{RegionId, UnitId};
use crate::simulation::{Landing, TickEvents};
use crate::world::World;

/// Load, carry and land troops.
#[instrument(skip_all, name = "transport")]
pub fn transport_system(world: &mut World, events: &mut TickEvents) {
    sync_cargo(world);
    let transports: Vec<UnitId> = world
        .units()
        .filter(|u| u.kind == UnitKind::TransportShip && u.is_alive())
        .map(|u| u.id)
        .collect();
    for id in transports {
        load(world, id);
        if let Some(landing) = try_unload(world, id) {
            tracing::debug!(
                transport = %landing.transport,
                region = %landing.region,
                units = landing.units.len(),
                forced = landing.forced,
                "troops landed"
            );
            events.landings.push(landing);
        }
    }
}

/// Move every carried unit to its transport's region.
fn sync_cargo(world: &mut World) {
    let positions: Vec<(UnitId, RegionId)> = world
        .units()
        .filter(|u| !u.cargo.units.is_empty())
        .flat_map(|t| t.cargo.units.iter().map(move |c| (*c, t.region)))
        .collect();
    for (unit, region) in positions {
        if let Some(u) = world.unit_mut(unit) {
            u.region = region;
        }
    }
}

fn load(world: &mut World, transport: UnitId) {
    let capacity = world.config.production.transport_capacity as usize;
    let Some(t) = world.unit(transport) else {
        return;
    };
    let (owner, port) = (t.owner, t.region);
    let free = capacity.saturating_sub(t.cargo.units.len());
    let at_own_port = world.region(port).is_some_and(|r| r.is_port()) && world.owner_of(port) == Some(owner);
    if free == 0 || !at_own_port {
        return;
    }

    let boarding: Vec<UnitId> = world
        .units()
        .filter(|u| {
            u.owner == owner
                && u.region == port
                && u.domain() == Domain::Land
                && u.embark_request
                && !u.is_embarked()
                && u.is_alive()
        })
        .map(|u| u.id)
        .take(free)
        .collect();
    if boarding.is_empty() {
        return;
    }

    for id in &boarding {
        if let Some(u) = world.unit_mut(*id) {
            u.embarked_on = Some(transport);
            u.embark_request = false;
            u.movement.clear();
        }
    }
    if let Some(t) = world.unit_mut(transport) {
        if t.cargo.units.is_empty() {
            t.cargo.origin = Some(port);
        }
        t.cargo.units.extend(boarding);
    }
}

fn enemy_warships_present(world: &World, transport: UnitId) -> bool {
    let Some(t) = world.unit(transport) else {
        return false;
    };
    world.units().any(|u| {
        u.kind == UnitKind::CombatShip
            && u.region == t.region
            && u.is_alive()
            && world.at_war(t.owner, u.owner)
    })
}

/// Land region adjacent to `sea` to put troops on: the ordered target if it
/// is adjacent, else enemy ground, then neutral ground, then own ground.
/// Never the region the cargo was loaded at.
fn landing_site(world: &World, transport: UnitId) -> Option<RegionId> {
    let t = world.unit(transport)?;
    let from = t.region;
    let origin = t.cargo.origin;
    let shore: Vec<RegionId> = world
        .domain_neighbors(Domain::Naval, from)
        .iter()
        .copied()
        .filter(|r| world.region(*r).is_some_and(|x| x.terrain.is_land()))
        .filter(|r| Some(*r) != origin)
        .collect();
    if let Some(order) = t.landing_order.filter(|o| shore.contains(o)) {
        return Some(order);
    }
    let rank = |r: RegionId| match world.owner_of(r) {
        Some(owner) if world.at_war(t.owner, owner) => 0,
        Some(owner) if owner != t.owner => 1,
        _ => 2,
    };
    shore.into_iter().min_by_key(|r| (rank(*r), *r))
}

fn try_unload(world: &mut World, transport: UnitId) -> Option<Landing> {
    let t = world.unit(transport)?;
    if t.cargo.units.is_empty() {
        return None;
    }
    let (owner, here) = (t.owner, t.region);
    let forced = enemy_warships_present(world, transport);
    let at_own_port = world.region(here).is_some_and(|r| r.is_port()) && world.owner_of(here) == Some(owner);

    let region = if at_own_port {
        if t.landing_order.is_some() && !forced {
            return None;
        }
        if t.cargo.origin == Some(here) && !forced {
            return None;
        }
        here
    } else {
        let at_landing_sea = t.landing_order.is_some_and(|order| {
            world
                .domain_neighbors(Domain::Naval, here)
                .contains(&order)
        });
        if !at_landing_sea && !forced {
            return None;
        }
        landing_site(world, transport)?
    };

    let tick = world.tick;
    let debuff = forced.then(|| Debuff {
        multiplier: world.config.battle.landing_debuff_multiplier,
        expires_tick: tick + u64::from(world.config.battle.landing_debuff_ticks),
    });

    let cargo = world.unit_mut(transport).map(|t| {
        let units = std::mem::take(&mut t.cargo.units);
        t.cargo.origin = None;
        t.landing_order = None;
        t.movement.clear();
        units
    })?;
    for id in &cargo {
        if let Some(u) = world.unit_mut(*id) {
            u.embarked_on = None;
            u.region = region;
            u.movement.clear();
            u.role = UnitRole::Unassigned;
            if debuff.is_some() {
                u.debuff = debuff;
            }
        }
    }
    Some(Landing {
        transport,
        region,
        units: cargo,
        forced,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::NationId;
    use crate::math::HALF;
    use crate::testing::coast_world;

    const PORT: RegionId = RegionId(1);
    const NEAR_SEA: RegionId = RegionId(2);
    const FAR_SEA: RegionId = RegionId(3);
    const BEACH: RegionId = RegionId(4);

    fn run(world: &mut World) -> TickEvents {
        let mut events = TickEvents::default();
        transport_system(world, &mut events);
        events
    }

    #[test]
    fn test_loads_requesting_units_at_own_port() {
        let mut world = coast_world();
        let red = NationId(0);
        let transport = world.spawn_unit(red, UnitKind::TransportShip, PORT);
        let a = world.spawn_unit(red, UnitKind::Infantry, PORT);
        let b = world.spawn_unit(red, UnitKind::Infantry, PORT);
        world.unit_mut(a).unwrap().embark_request = true;
        run(&mut world);
        let t = world.unit(transport).unwrap();
        assert_eq!(t.cargo.units, vec![a]);
        assert_eq!(t.cargo.origin, Some(PORT));
        assert_eq!(world.unit(a).unwrap().embarked_on, Some(transport));
        assert!(!world.unit(a).unwrap().embark_request);
        assert_eq!(world.unit(b).unwrap().embarked_on, None);
    }

    #[test]
    fn test_capacity_limits_boarding() {
        let mut config = crate::testing::coast_config();
        config.production.transport_capacity = 2;
        let mut world = crate::testing::coast_world_with(config);
        let red = NationId(0);
        let transport = world.spawn_unit(red, UnitKind::TransportShip, PORT);
        for _ in 0..3 {
            let id = world.spawn_unit(red, UnitKind::Infantry, PORT);
            world.unit_mut(id).unwrap().embark_request = true;
        }
        run(&mut world);
        assert_eq!(world.unit(transport).unwrap().cargo.units.len(), 2);
    }

    #[test]
    fn test_cargo_follows_and_lands_at_order() {
        let mut world = coast_world();
        let red = NationId(0);
        let blue = NationId(1);
        world.register_war(red, blue, true);
        let transport = world.spawn_unit(red, UnitKind::TransportShip, PORT);
        let soldier = world.spawn_unit(red, UnitKind::Infantry, PORT);
        world.unit_mut(soldier).unwrap().embark_request = true;
        run(&mut world);

        world.unit_mut(transport).unwrap().region = NEAR_SEA;
        let events = run(&mut world);
        assert!(events.landings.is_empty());
        assert_eq!(world.unit(soldier).unwrap().region, NEAR_SEA);

        world.unit_mut(transport).unwrap().landing_order = Some(BEACH);
        world.unit_mut(transport).unwrap().region = FAR_SEA;
        let events = run(&mut world);
        assert_eq!(events.landings.len(), 1);
        let landing = &events.landings[0];
        assert_eq!(landing.region, BEACH);
        assert!(!landing.forced);
        let s = world.unit(soldier).unwrap();
        assert_eq!(s.region, BEACH);
        assert_eq!(s.embarked_on, None);
        assert_eq!(s.debuff, None);
        assert!(world.unit(transport).unwrap().cargo.units.is_empty());
    }

    #[test]
    fn test_forced_landing_applies_debuff_and_skips_origin() {
        let mut world = coast_world();
        let red = NationId(0);
        let blue = NationId(1);
        world.register_war(red, blue, true);
        let transport = world.spawn_unit(red, UnitKind::TransportShip, PORT);
        let soldier = world.spawn_unit(red, UnitKind::Infantry, PORT);
        world.unit_mut(soldier).unwrap().embark_request = true;
        run(&mut world);

        // Caught next to the port it loaded at; the only shore is the origin.
        world.unit_mut(transport).unwrap().region = NEAR_SEA;
        world.spawn_unit(blue, UnitKind::CombatShip, NEAR_SEA);
        let events = run(&mut world);
        assert!(events.landings.is_empty());

        world.unit_mut(transport).unwrap().region = FAR_SEA;
        world.spawn_unit(blue, UnitKind::CombatShip, FAR_SEA);
        let events = run(&mut world);
        assert_eq!(events.landings.len(), 1);
        assert!(events.landings[0].forced);
        let s = world.unit(soldier).unwrap();
        assert_eq!(s.region, BEACH);
        let debuff = s.debuff.unwrap();
        assert_eq!(debuff.multiplier, HALF);
        assert_eq!(debuff.expires_tick, u64::from(world.config().battle.landing_debuff_ticks));
    }

    #[test]
    fn test_returns_cargo_at_home_port_without_order() {
        let mut world = coast_world();
        let red = NationId(0);
        let transport = world.spawn_unit(red, UnitKind::TransportShip, NEAR_SEA);
        let soldier = world.spawn_unit(red, UnitKind::Infantry, NEAR_SEA);
        world.unit_mut(soldier).unwrap().embarked_on = Some(transport);
        {
            let t = world.unit_mut(transport).unwrap();
            t.cargo.units.push(soldier);
            t.cargo.origin = Some(RegionId(0));
            t.region = PORT;
        }
        let events = run(&mut world);
        assert_eq!(events.landings.len(), 1);
        assert_eq!(world.unit(soldier).unwrap().region, PORT);
    }
}
