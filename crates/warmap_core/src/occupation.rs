//! Military control of enemy ground.
//!
//! Each fast tick every land region is re-evaluated. The owner's presence
//! always clears occupation. Otherwise an existing occupier keeps the region
//! for as long as it stays a valid enemy, and a vacant region goes to the
//! enemy with the most units standing there. Groups follow their regions: a
//! nation occupies a group once it holds at least `group_occupation_ratio` of
//! the group's regions.

use std::collections::BTreeMap;

use tracing::instrument;

use crate::components::Domain;
use crate::ids::{GroupId, NationId, RegionId};
use crate::math::{ratio, Fixed};
use crate::simulation::TickEvents;
use crate::world::World;

/// Land unit counts per nation in every region, in first-seen order.
fn presence(world: &World) -> BTreeMap<RegionId, Vec<(NationId, u32)>> {
    let mut by_region: BTreeMap<RegionId, Vec<(NationId, u32)>> = BTreeMap::new();
    for unit in world.units() {
        if unit.domain() != Domain::Land || unit.is_embarked() || !unit.is_alive() {
            continue;
        }
        let counts = by_region.entry(unit.region).or_default();
        match counts.iter_mut().find(|(n, _)| *n == unit.owner) {
            Some((_, count)) => *count += 1,
            None => counts.push((unit.owner, 1)),
        }
    }
    by_region
}

/// Whether `occupier` may hold ground owned by `owner`.
fn valid_occupier(world: &World, occupier: NationId, owner: NationId) -> bool {
    occupier != owner
        && world.nation(occupier).is_some_and(|n| n.is_alive())
        && world.at_war(occupier, owner)
}

/// Occupier of a group given region occupiers, if any reaches the threshold.
#[must_use]
pub fn group_occupier(
    members: &[RegionId],
    regions: &BTreeMap<RegionId, NationId>,
    threshold: Fixed,
) -> Option<NationId> {
    let mut counts: BTreeMap<NationId, u32> = BTreeMap::new();
    for region in members {
        if let Some(occupier) = regions.get(region) {
            *counts.entry(*occupier).or_default() += 1;
        }
    }
    let total = members.len() as u32;
    counts
        .into_iter()
        .filter(|(_, count)| ratio(*count, total) >= threshold)
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
        .map(|(nation, _)| nation)
}

/// Recompute region and group occupation.
#[instrument(skip_all, name = "occupation")]
pub fn occupation_system(world: &mut World, events: &mut TickEvents) {
    let presence = presence(world);
    let mut regions: BTreeMap<RegionId, NationId> = BTreeMap::new();

    for region in world.regions() {
        if !region.terrain.is_land() {
            continue;
        }
        let Some(owner) = world.owner_of(region.id) else {
            continue;
        };
        let here = presence.get(&region.id).map_or(&[][..], Vec::as_slice);
        if here.iter().any(|(n, _)| *n == owner) {
            continue;
        }
        let kept = world
            .occupation
            .region_occupier(region.id)
            .filter(|occ| valid_occupier(world, *occ, owner));
        let chosen = kept.or_else(|| {
            let mut best: Option<(NationId, u32)> = None;
            for &(nation, count) in here {
                if !valid_occupier(world, nation, owner) {
                    continue;
                }
                if best.map_or(true, |(_, c)| count > c) {
                    best = Some((nation, count));
                }
            }
            best.map(|(nation, _)| nation)
        });
        if let Some(occupier) = chosen {
            regions.insert(region.id, occupier);
        }
    }

    let threshold = world.config.occupation.group_occupation_ratio;
    let mut groups: BTreeMap<GroupId, NationId> = BTreeMap::new();
    for group in world.groups() {
        if let Some(occupier) = group_occupier(&group.regions, &regions, threshold) {
            groups.insert(group.id, occupier);
        }
    }

    if regions != world.occupation.regions || groups != world.occupation.groups {
        world.occupation.regions = regions;
        world.occupation.groups = groups;
        world.occupation.version += 1;
        events.occupation_changed = true;
        tracing::debug!(
            version = world.occupation.version,
            regions = world.occupation.regions.len(),
            groups = world.occupation.groups.len(),
            "occupation changed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::UnitKind;
    use crate::math::HALF;
    use crate::testing::{line_world, LineSpec};

    fn run(world: &mut World) -> TickEvents {
        let mut events = TickEvents::default();
        occupation_system(world, &mut events);
        events
    }

    #[test]
    fn test_enemy_presence_occupies_and_owner_clears() {
        let mut world = line_world(&LineSpec::two_nations(1, 1));
        let red = NationId(0);
        let blue = NationId(1);
        world.register_war(red, blue, true);
        world.spawn_unit(red, UnitKind::Infantry, RegionId(1));
        let events = run(&mut world);
        assert!(events.occupation_changed);
        assert_eq!(world.occupation().region_occupier(RegionId(1)), Some(red));
        let version = world.occupation().version;

        // No change, no bump.
        let events = run(&mut world);
        assert!(!events.occupation_changed);
        assert_eq!(world.occupation().version, version);

        world.spawn_unit(blue, UnitKind::Infantry, RegionId(1));
        run(&mut world);
        assert_eq!(world.occupation().region_occupier(RegionId(1)), None);
    }

    #[test]
    fn test_occupier_kept_after_leaving() {
        let mut world = line_world(&LineSpec::two_nations(1, 1));
        let red = NationId(0);
        let blue = NationId(1);
        world.register_war(red, blue, true);
        let unit = world.spawn_unit(red, UnitKind::Infantry, RegionId(1));
        run(&mut world);
        world.unit_mut(unit).unwrap().region = RegionId(0);
        run(&mut world);
        assert_eq!(world.occupation().region_occupier(RegionId(1)), Some(red));
    }

    #[test]
    fn test_peace_releases_occupation() {
        let mut world = line_world(&LineSpec::two_nations(1, 1));
        let red = NationId(0);
        let blue = NationId(1);
        world.register_war(red, blue, true);
        world.spawn_unit(red, UnitKind::Infantry, RegionId(1));
        run(&mut world);
        world.end_wars_of(red);
        run(&mut world);
        assert!(world.occupation().regions.is_empty());
    }

    #[test]
    fn test_majority_wins_and_ties_go_to_first_seen() {
        let mut world = line_world(&LineSpec::new(vec![1, 1, 1]));
        let (a, b, c) = (NationId(0), NationId(1), NationId(2));
        world.register_war(a, c, true);
        world.register_war(b, c, true);
        let target = RegionId(2);
        world.spawn_unit(b, UnitKind::Infantry, target);
        world.spawn_unit(a, UnitKind::Infantry, target);
        run(&mut world);
        assert_eq!(world.occupation().region_occupier(target), Some(b));

        let mut world = line_world(&LineSpec::new(vec![1, 1, 1]));
        world.register_war(a, c, true);
        world.register_war(b, c, true);
        world.spawn_unit(b, UnitKind::Infantry, target);
        world.spawn_unit(a, UnitKind::Infantry, target);
        world.spawn_unit(a, UnitKind::Infantry, target);
        run(&mut world);
        assert_eq!(world.occupation().region_occupier(target), Some(a));
    }

    #[test]
    fn test_group_threshold_is_inclusive() {
        let members = [RegionId(0), RegionId(1), RegionId(2), RegionId(3)];
        let mut occupied = BTreeMap::new();
        occupied.insert(RegionId(0), NationId(5));
        assert_eq!(group_occupier(&members, &occupied, HALF), None);
        occupied.insert(RegionId(1), NationId(5));
        assert_eq!(group_occupier(&members, &occupied, HALF), Some(NationId(5)));
        occupied.insert(RegionId(2), NationId(6));
        occupied.insert(RegionId(3), NationId(6));
        // Two nations at exactly half: the lower id wins the tie.
        assert_eq!(group_occupier(&members, &occupied, HALF), Some(NationId(5)));
    }
}
