//! Capital relocation.
//!
//! A capital that is lost or occupied is demoted to a city, and the nation's
//! lowest-id unoccupied city takes over. A nation without a usable city stays
//! capital-less until it has one again.

use tracing::instrument;

use crate::components::Building;
use crate::ids::{NationId, RegionId};
use crate::simulation::{CapitalMove, TickEvents};
use crate::world::World;

/// Lowest-id owned, unoccupied city of a nation.
fn successor(world: &World, nation: NationId) -> Option<RegionId> {
    world
        .regions_of(nation)
        .into_iter()
        .find(|r| {
            world
                .region(*r)
                .is_some_and(|region| region.building == Some(Building::City))
                && !world.occupation.is_region_occupied(*r)
        })
}

/// Move capitals that are no longer held.
#[instrument(skip_all, name = "capitals")]
pub fn capital_system(world: &mut World, events: &mut TickEvents) {
    for nation in world.alive_nations() {
        let current = world.nation(nation).and_then(|n| n.capital);
        let held = current.is_some_and(|cap| {
            world.owner_of(cap) == Some(nation) && !world.occupation.is_region_occupied(cap)
        });
        if held {
            continue;
        }

        if let Some(old) = current {
            if let Some(region) = world.regions.get_mut(old.index()) {
                if region.building == Some(Building::Capital) {
                    region.building = Some(Building::City);
                    world.versions.building += 1;
                }
            }
        }

        let next = successor(world, nation);
        if let Some(new) = next {
            world.regions[new.index()].building = Some(Building::Capital);
            world.versions.building += 1;
        }
        if let Some(n) = world.nation_mut(nation) {
            n.capital = next;
        }
        if current.is_some() || next.is_some() {
            tracing::debug!(%nation, from = ?current, to = ?next, "capital moved");
            events.capital_moves.push(CapitalMove {
                nation,
                from: current,
                to: next,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::UnitKind;
    use crate::occupation::occupation_system;
    use crate::testing::{line_world, LineSpec};

    #[test]
    fn test_occupied_capital_moves_to_lowest_city() {
        let mut world = line_world(&LineSpec::two_nations(4, 1));
        let red = NationId(0);
        let blue = NationId(1);
        world.regions[2].building = Some(Building::City);
        world.regions[3].building = Some(Building::City);
        world.register_war(blue, red, true);
        world.spawn_unit(blue, UnitKind::Infantry, RegionId(0));

        let mut events = TickEvents::default();
        occupation_system(&mut world, &mut events);
        capital_system(&mut world, &mut events);

        assert_eq!(world.nation(red).unwrap().capital, Some(RegionId(2)));
        assert_eq!(world.region(RegionId(0)).unwrap().building, Some(Building::City));
        assert_eq!(world.region(RegionId(2)).unwrap().building, Some(Building::Capital));
        assert_eq!(
            events.capital_moves,
            vec![CapitalMove {
                nation: red,
                from: Some(RegionId(0)),
                to: Some(RegionId(2)),
            }]
        );
    }

    #[test]
    fn test_no_city_leaves_nation_capital_less() {
        let mut world = line_world(&LineSpec::two_nations(2, 1));
        let red = NationId(0);
        let blue = NationId(1);
        world.register_war(blue, red, true);
        world.spawn_unit(blue, UnitKind::Infantry, RegionId(0));
        let mut events = TickEvents::default();
        occupation_system(&mut world, &mut events);
        capital_system(&mut world, &mut events);
        assert_eq!(world.nation(red).unwrap().capital, None);

        // Nothing further to report while still capital-less.
        let mut again = TickEvents::default();
        capital_system(&mut world, &mut again);
        assert!(again.capital_moves.is_empty());
    }

    #[test]
    fn test_held_capital_untouched() {
        let mut world = line_world(&LineSpec::two_nations(2, 2));
        let before = world.versions().building;
        let mut events = TickEvents::default();
        capital_system(&mut world, &mut events);
        assert!(events.capital_moves.is_empty());
        assert_eq!(world.versions().building, before);
    }
}
