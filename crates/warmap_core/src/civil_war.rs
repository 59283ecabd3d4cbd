//! Nation fracture.
//!
//! A nation whose war cooperation has collapsed loses a contiguous cluster of
//! its groups to a new nation. The cluster grows outward from a randomly
//! chosen city over group adjacency and never includes the capital group.

use std::collections::{BTreeSet, VecDeque};

use rand::Rng;
use tracing::instrument;

use crate::components::{Building, Nation, Resources, UnitRole};
use crate::ids::{GroupId, NationId, RegionId};
use crate::math::{ratio, Fixed};
use crate::simulation::{CivilWar, TickEvents};
use crate::world::World;

/// Groups that secede when `seed` breaks away from `nation`, in BFS order.
fn seceding_cluster(world: &World, nation: NationId, seed: GroupId, excluded: Option<GroupId>) -> Vec<GroupId> {
    let Some(n) = world.nation(nation) else {
        return Vec::new();
    };
    let total = n.groups.len();
    if total < 2 {
        return Vec::new();
    }
    let fraction = world.config.civil_war.secession_fraction;
    let wanted = Fixed::from_num(total as u32)
        .saturating_mul(fraction)
        .ceil()
        .to_num::<usize>()
        .clamp(1, total - 1);

    let allowed = |g: GroupId| n.groups.contains(&g) && Some(g) != excluded;
    let mut seen = BTreeSet::from([seed]);
    let mut queue = VecDeque::from([seed]);
    let mut cluster = Vec::with_capacity(wanted);
    while let Some(group) = queue.pop_front() {
        cluster.push(group);
        if cluster.len() == wanted {
            break;
        }
        let Some(next) = world.topology().group_neighbors.get(group.index()) else {
            continue;
        };
        for &other in next {
            if allowed(other) && seen.insert(other) {
                queue.push_back(other);
            }
        }
    }
    cluster
}

/// Cities a rebellion could rally around.
fn rebel_cities(world: &World, nation: NationId, capital_group: Option<GroupId>) -> Vec<RegionId> {
    world
        .regions_of(nation)
        .into_iter()
        .filter(|r| {
            world.region(*r).is_some_and(|region| {
                region.building == Some(Building::City) && region.group != capital_group
            }) && !world.occupation.is_region_occupied(*r)
        })
        .collect()
}

/// Split nations whose cooperation fell to the threshold.
#[instrument(skip_all, name = "civil_war")]
pub fn civil_war_system(world: &mut World, events: &mut TickEvents) {
    let threshold = world.config.civil_war.threshold;
    for parent in world.alive_nations() {
        let Some(n) = world.nation(parent) else {
            continue;
        };
        if n.war_cooperation > threshold || n.groups.len() < 2 {
            continue;
        }
        let capital_group = n
            .capital
            .and_then(|c| world.region(c))
            .and_then(|r| r.group);

        let cities = rebel_cities(world, parent, capital_group);
        if cities.is_empty() {
            continue;
        }
        let city = cities[world.rng.gen_range(0..cities.len())];
        let Some(seed) = world.region(city).and_then(|r| r.group) else {
            continue;
        };
        let cluster = seceding_cluster(world, parent, seed, capital_group);
        if cluster.is_empty() {
            continue;
        }
        if let Some(event) = secede(world, parent, city, &cluster) {
            tracing::info!(
                parent = %event.parent,
                child = %event.child,
                groups = event.groups.len(),
                capital = %city,
                "Civil war"
            );
            events.civil_wars.push(event);
        }
    }
}

fn secede(world: &mut World, parent: NationId, capital: RegionId, cluster: &[GroupId]) -> Option<CivilWar> {
    let child = NationId(world.nations.len() as u32);
    let moved: BTreeSet<RegionId> = cluster
        .iter()
        .filter_map(|g| world.group(*g))
        .flat_map(|g| g.regions.iter().copied())
        .collect();
    let cities = moved
        .iter()
        .filter(|r| world.region(**r).is_some_and(|x| x.has_city()))
        .count() as u32;

    let p = world.nation(parent)?;
    let share = ratio(cluster.len() as u32, p.groups.len() as u32);
    let dowry: Resources = p.resources.scaled(share);
    let name = format!("{} Secessionists", p.name);

    let slow_tick = world.slow_tick;
    let config = &world.config;
    world.nations.push(Nation {
        id: child,
        name,
        capital: Some(capital),
        groups: BTreeSet::new(),
        resources: dowry,
        resource_flow: Resources::ZERO,
        war_cooperation: config.cooperation.max,
        surrender_accumulator: 0,
        initial_units: 0,
        initial_cities: cities,
        next_production_tick: slow_tick + u64::from(config.production.interval_slow_ticks),
        next_war_eval_tick: slow_tick + u64::from(config.diplomacy.war_eval_min_ticks),
        spawn_counter: 0,
        parent: Some(parent),
        eliminated: false,
    });

    let boost = world.config.civil_war.cooperation_boost;
    let max = world.config.cooperation.max;
    if let Some(p) = world.nation_mut(parent) {
        p.resources -= dowry;
        p.war_cooperation = (p.war_cooperation + boost).min(max);
    }

    for group in cluster {
        world.transfer_group(*group, child);
    }
    if let Some(region) = world.regions.get_mut(capital.index()) {
        region.building = Some(Building::Capital);
        world.versions.building += 1;
    }

    let mut switched = 0;
    for unit in world.units.values_mut() {
        if unit.owner == parent && moved.contains(&unit.region) {
            unit.owner = child;
            unit.role = UnitRole::Unassigned;
            unit.embark_request = false;
            unit.movement.clear();
            unit.landing_order = None;
            switched += 1;
        }
    }
    if switched > 0 {
        world.versions.units += 1;
    }
    if let Some(c) = world.nation_mut(child) {
        c.initial_units = switched;
    }

    world.register_war(child, parent, false);
    Some(CivilWar {
        parent,
        child,
        groups: cluster.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::UnitKind;
    use crate::testing::{line_world, LineSpec};

    fn fractured() -> World {
        let mut world = line_world(&LineSpec::new(vec![4]));
        world.regions[2].building = Some(Building::City);
        world.regions[3].building = Some(Building::City);
        world.nation_mut(NationId(0)).unwrap().war_cooperation = Fixed::ZERO;
        world
    }

    #[test]
    fn test_collapse_splits_off_a_cluster() {
        let mut world = fractured();
        let parent = NationId(0);
        let loyal = world.spawn_unit(parent, UnitKind::Infantry, RegionId(0));
        let rebel = world.spawn_unit(parent, UnitKind::Infantry, RegionId(2));
        let mut events = TickEvents::default();
        civil_war_system(&mut world, &mut events);

        assert_eq!(events.civil_wars.len(), 1);
        let child = events.civil_wars[0].child;
        assert_eq!(child, NationId(1));
        let c = world.nation(child).unwrap();
        assert_eq!(c.parent, Some(parent));
        assert_eq!(c.groups.len(), 2);
        let capital = c.capital.unwrap();
        assert!(capital == RegionId(2) || capital == RegionId(3));
        assert_eq!(world.region(capital).unwrap().building, Some(Building::Capital));

        let p = world.nation(parent).unwrap();
        assert_eq!(p.groups.len(), 2);
        assert!(p.groups.contains(&GroupId(0)));
        assert_eq!(p.war_cooperation, Fixed::from_num(40));
        assert_eq!(p.resources.steel, Fixed::from_num(100));
        assert_eq!(c.resources.steel, Fixed::from_num(100));

        // Group 2 is in either cluster.
        assert_eq!(world.unit(rebel).unwrap().owner, child);
        assert_eq!(world.unit(loyal).unwrap().owner, parent);
        let war = world.war(parent, child).unwrap();
        assert_eq!(war.aggressor, child);
        assert!(!war.is_test);
    }

    #[test]
    fn test_cluster_is_contiguous_and_skips_capital_group() {
        let world = line_world(&LineSpec::new(vec![5]));
        let cluster = seceding_cluster(&world, NationId(0), GroupId(1), Some(GroupId(0)));
        // ceil(5 x 0.34) = 2.
        assert_eq!(cluster, vec![GroupId(1), GroupId(2)]);
    }

    #[test]
    fn test_single_group_or_loyal_nation_holds_together() {
        let mut world = line_world(&LineSpec::new(vec![1]));
        world.nation_mut(NationId(0)).unwrap().war_cooperation = Fixed::ZERO;
        let mut events = TickEvents::default();
        civil_war_system(&mut world, &mut events);
        assert!(events.civil_wars.is_empty());

        let mut world = fractured();
        world.nation_mut(NationId(0)).unwrap().war_cooperation = Fixed::ONE;
        civil_war_system(&mut world, &mut events);
        assert!(events.civil_wars.is_empty());
        assert_eq!(world.nations().len(), 1);
    }

    #[test]
    fn test_no_eligible_city_no_split() {
        let mut world = line_world(&LineSpec::new(vec![3]));
        world.nation_mut(NationId(0)).unwrap().war_cooperation = Fixed::ZERO;
        let mut events = TickEvents::default();
        civil_war_system(&mut world, &mut events);
        assert!(events.civil_wars.is_empty());
    }
}
