//! Hop-by-hop unit movement.
//!
//! A unit with a target crosses one region at a time. Each fast tick adds
//! `fast_tick_ms` to its progress; whenever progress covers the hop duration
//! the hop is committed and the surplus carries into the next hop. A hop into
//! a region held by living enemy units of the same domain is refused: the unit
//! stays put with zero progress but keeps the hop, which makes it an attacker
//! in that region's battle.

use tracing::instrument;

use crate::components::{Domain, Hop, Unit};
use crate::ids::{RegionId, UnitId};
use crate::math::Fixed;
use crate::simulation::TickEvents;
use crate::world::World;

impl World {
    /// Send a unit toward `target`. Returns `false` for unknown or embarked
    /// units and unknown regions.
    pub fn order_unit(&mut self, unit: UnitId, target: RegionId) -> bool {
        if self.region(target).is_none() {
            return false;
        }
        match self.unit_mut(unit) {
            Some(u) if !u.is_embarked() => {
                u.set_target(Some(target));
                true
            }
            _ => false,
        }
    }

    /// Whether living enemy units of `domain` stand in `region`.
    #[must_use]
    pub fn is_blocked(&self, unit: &Unit, region: RegionId) -> bool {
        let domain = unit.domain();
        self.units.values().any(|other| {
            other.region == region
                && other.domain() == domain
                && !other.is_embarked()
                && other.is_alive()
                && self.at_war(unit.owner, other.owner)
        })
    }

    /// Time needed for `unit` to cross into `to`.
    #[must_use]
    pub fn hop_duration(&self, unit: &Unit, to: RegionId) -> Fixed {
        let base = self.config.units.get(unit.kind).hop_ms;
        let river = unit.domain() == Domain::Land
            && self
                .region(unit.region)
                .is_some_and(|r| r.crosses_river_to(to));
        if river {
            base.saturating_mul(self.config.movement.river_crossing_multiplier)
        } else {
            base
        }
    }
}

/// Outcome of advancing one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Advance {
    /// Moved this many hops (possibly zero).
    Moved(u32),
    /// Refused entry into an enemy-held region.
    Blocked,
}

/// Advance every unit that has somewhere to go.
#[instrument(skip_all, name = "movement")]
pub fn movement_system(world: &mut World, events: &mut TickEvents) {
    let tick_ms = world.config.clock.fast_tick_ms;
    for id in world.unit_ids() {
        if let Advance::Moved(hops) = advance_unit(world, id, tick_ms) {
            events.hops += hops;
        }
    }
}

fn advance_unit(world: &mut World, id: UnitId, tick_ms: Fixed) -> Advance {
    let Some(unit) = world.unit(id) else {
        return Advance::Moved(0);
    };
    if unit.is_embarked() || !unit.is_alive() {
        return Advance::Moved(0);
    }
    let mut unit = unit.clone();

    let Some(target) = unit.movement.target.filter(|t| *t != unit.region) else {
        unit.movement.clear();
        store(world, unit);
        return Advance::Moved(0);
    };

    let domain = unit.domain();
    if let Some(hop) = unit.movement.hop {
        if hop.from != unit.region || !world.is_passable(domain, unit.owner, hop.to) {
            unit.movement.reset_progress();
        }
    }

    unit.movement.progress_ms = unit.movement.progress_ms.saturating_add(tick_ms);
    let mut hops = 0;
    let outcome = loop {
        let hop = match unit.movement.hop {
            Some(hop) => hop,
            None => match world.next_hop(domain, unit.owner, unit.region, target) {
                Some(to) => {
                    let hop = Hop {
                        from: unit.region,
                        to,
                    };
                    unit.movement.hop = Some(hop);
                    hop
                }
                None => {
                    unit.movement.reset_progress();
                    break Advance::Moved(hops);
                }
            },
        };

        let duration = world.hop_duration(&unit, hop.to);
        if unit.movement.progress_ms < duration {
            break Advance::Moved(hops);
        }
        if world.is_blocked(&unit, hop.to) {
            unit.movement.progress_ms = Fixed::ZERO;
            break Advance::Blocked;
        }

        unit.movement.progress_ms -= duration;
        unit.region = hop.to;
        unit.movement.hop = None;
        hops += 1;
        tracing::trace!(unit = %id, from = %hop.from, to = %hop.to, "hop");

        if unit.region == target {
            unit.movement.clear();
            break Advance::Moved(hops);
        }
    };

    store(world, unit);
    outcome
}

fn store(world: &mut World, unit: Unit) {
    if let Some(slot) = world.unit_mut(unit.id) {
        *slot = unit;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::UnitKind;
    use crate::ids::NationId;
    use crate::testing::{line_world, LineSpec};

    fn ticks_until_arrival(world: &mut World, unit: UnitId, target: RegionId) -> u32 {
        let mut events = TickEvents::default();
        let mut ticks = 0;
        while world.unit(unit).unwrap().region != target {
            movement_system(world, &mut events);
            ticks += 1;
            assert!(ticks < 10_000, "unit never arrived");
        }
        ticks
    }

    #[test]
    fn test_two_hops_take_ceil_of_total_time() {
        // Infantry hops take 3000 ms, fast ticks 100 ms: ceil(6000 / 100) = 60.
        let mut world = line_world(&LineSpec::two_nations(3, 1));
        let unit = world.spawn_unit(NationId(0), UnitKind::Infantry, RegionId(0));
        assert!(world.order_unit(unit, RegionId(2)));
        assert_eq!(ticks_until_arrival(&mut world, unit, RegionId(2)), 60);
        let moved = world.unit(unit).unwrap();
        assert_eq!(moved.movement.hop, None);
        assert_eq!(moved.movement.progress_ms, Fixed::ZERO);
        assert_eq!(moved.movement.target, None);
    }

    #[test]
    fn test_surplus_progress_carries_into_next_hop() {
        let mut spec = LineSpec::two_nations(3, 1);
        spec.config.clock.fast_tick_ms = Fixed::from_num(700);
        let mut world = line_world(&spec);
        let unit = world.spawn_unit(NationId(0), UnitKind::Infantry, RegionId(0));
        world.order_unit(unit, RegionId(2));
        // ceil(6000 / 700) = 9, not 2 * ceil(3000 / 700) = 10.
        assert_eq!(ticks_until_arrival(&mut world, unit, RegionId(2)), 9);
    }

    #[test]
    fn test_river_crossing_slows_land_hops() {
        let mut spec = LineSpec::two_nations(2, 1);
        spec.rivers = vec![0];
        let mut world = line_world(&spec);
        let unit = world.spawn_unit(NationId(0), UnitKind::Infantry, RegionId(0));
        world.order_unit(unit, RegionId(1));
        // 3000 ms * 1.5 = 4500 ms.
        assert_eq!(ticks_until_arrival(&mut world, unit, RegionId(1)), 45);
    }

    #[test]
    fn test_blocked_hop_rolls_back_and_keeps_hop() {
        let mut world = line_world(&LineSpec::two_nations(1, 1));
        let red = NationId(0);
        let blue = NationId(1);
        world.register_war(red, blue, true);
        let attacker = world.spawn_unit(red, UnitKind::Tank, RegionId(0));
        world.spawn_unit(blue, UnitKind::Infantry, RegionId(1));
        world.order_unit(attacker, RegionId(1));

        let mut events = TickEvents::default();
        for _ in 0..30 {
            movement_system(&mut world, &mut events);
        }
        let unit = world.unit(attacker).unwrap();
        assert_eq!(unit.region, RegionId(0));
        assert_eq!(
            unit.movement.hop,
            Some(Hop {
                from: RegionId(0),
                to: RegionId(1)
            })
        );
        assert!(unit.movement.progress_ms < world.hop_duration(unit, RegionId(1)));
        assert_eq!(events.hops, 0);
    }

    #[test]
    fn test_no_target_clears_movement() {
        let mut world = line_world(&LineSpec::two_nations(2, 1));
        let unit = world.spawn_unit(NationId(0), UnitKind::Infantry, RegionId(0));
        world.unit_mut(unit).unwrap().movement.progress_ms = Fixed::from_num(5);
        let mut events = TickEvents::default();
        movement_system(&mut world, &mut events);
        assert_eq!(world.unit(unit).unwrap().movement.progress_ms, Fixed::ZERO);
    }

    #[test]
    fn test_unreachable_target_does_not_accumulate() {
        let mut world = line_world(&LineSpec::two_nations(1, 2));
        let unit = world.spawn_unit(NationId(0), UnitKind::Infantry, RegionId(0));
        world.order_unit(unit, RegionId(2));
        let mut events = TickEvents::default();
        for _ in 0..5 {
            movement_system(&mut world, &mut events);
        }
        let unit = world.unit(unit).unwrap();
        assert_eq!(unit.region, RegionId(0));
        assert_eq!(unit.movement.progress_ms, Fixed::ZERO);
    }
}
