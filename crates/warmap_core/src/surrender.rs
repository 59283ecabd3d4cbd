//! Surrender and elimination.
//!
//! A nation at war that has no units left, or whose every region is under
//! enemy occupation, builds up its surrender accumulator once per fast tick.
//! When the accumulator reaches `grace_checks` the nation surrenders: its
//! groups are shared among its enemies, it leaves every war and it is
//! eliminated. A nation with neither territory nor units is eliminated
//! outright.

use std::collections::BTreeMap;

use tracing::instrument;

use crate::components::{Building, Domain, Terrain};
use crate::ids::{GroupId, NationId, RegionId, UnitId};
use crate::math::Fixed;
use crate::simulation::{Surrender, TickEvents};
use crate::world::World;

/// Split `total` whole items proportionally to `weights`.
///
/// Uses the largest remainder method, so the result always sums to `total`.
/// Non-positive weights count as zero; when every weight is zero the split
/// is equal. Remainder ties go to the earlier entry.
///
/// ```
/// use warmap_core::ids::NationId;
/// use warmap_core::math::Fixed;
/// use warmap_core::surrender::apportion;
///
/// let quotas = apportion(5, &[(NationId(0), Fixed::from_num(3)), (NationId(1), Fixed::ONE)]);
/// assert_eq!(quotas, vec![(NationId(0), 4), (NationId(1), 1)]);
/// ```
#[must_use]
pub fn apportion(total: u32, weights: &[(NationId, Fixed)]) -> Vec<(NationId, u32)> {
    if weights.is_empty() {
        return Vec::new();
    }
    let mut raw: Vec<u128> = weights
        .iter()
        .map(|(_, w)| u128::try_from(w.to_bits()).unwrap_or(0))
        .collect();
    if raw.iter().all(|w| *w == 0) {
        raw.iter_mut().for_each(|w| *w = 1);
    }
    let sum: u128 = raw.iter().sum();

    let mut quotas: Vec<u32> = Vec::with_capacity(raw.len());
    let mut remainders: Vec<(u128, usize)> = Vec::with_capacity(raw.len());
    for (i, w) in raw.iter().enumerate() {
        let numerator = u128::from(total) * w;
        quotas.push(u32::try_from(numerator / sum).unwrap_or(total));
        remainders.push((numerator % sum, i));
    }
    let assigned: u32 = quotas.iter().sum();
    remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    for k in 0..total.saturating_sub(assigned) as usize {
        quotas[remainders[k % remainders.len()].1] += 1;
    }

    weights
        .iter()
        .zip(quotas)
        .map(|((nation, _), quota)| (*nation, quota))
        .collect()
}

/// Check every nation for surrender or elimination.
#[instrument(skip_all, name = "surrender")]
pub fn surrender_system(world: &mut World, events: &mut TickEvents) {
    let grace = world.config.surrender.grace_checks;
    for nation in world.alive_nations() {
        let Some(n) = world.nation(nation) else {
            continue;
        };
        let units = world.units_of(nation);
        if n.groups.is_empty() && units == 0 {
            eliminate(world, nation);
            events.eliminations.push(nation);
            continue;
        }

        let losing = world.is_at_war(nation) && {
            let regions = world.regions_of(nation);
            units == 0
                || (!regions.is_empty()
                    && regions
                        .iter()
                        .all(|r| world.occupation.is_region_occupied(*r)))
        };
        let Some(n) = world.nation_mut(nation) else {
            continue;
        };
        if !losing {
            n.surrender_accumulator = 0;
            continue;
        }
        n.surrender_accumulator += 1;
        if n.surrender_accumulator < grace {
            continue;
        }

        let receivers = settle(world, nation);
        tracing::info!(
            %nation,
            receivers = receivers.len(),
            groups = receivers.iter().map(|(_, g)| g.len()).sum::<usize>(),
            "Surrender"
        );
        eliminate(world, nation);
        relocate_stranded(world);
        events.surrenders.push(Surrender { nation, receivers });
        events.eliminations.push(nation);
    }
}

/// Share the loser's groups among its enemies.
fn settle(world: &mut World, loser: NationId) -> Vec<(NationId, Vec<GroupId>)> {
    let enemies: Vec<NationId> = world
        .war_adjacency()
        .get(&loser)
        .map(|set| {
            set.iter()
                .copied()
                .filter(|e| world.nation(*e).is_some_and(|n| n.is_alive()))
                .collect()
        })
        .unwrap_or_default();
    let groups: Vec<GroupId> = world
        .nation(loser)
        .map(|n| n.groups.iter().copied().collect())
        .unwrap_or_default();
    if enemies.is_empty() || groups.is_empty() {
        return Vec::new();
    }

    let contributions: Vec<(NationId, Fixed)> = enemies
        .iter()
        .map(|e| (*e, world.war(loser, *e).map_or(Fixed::ZERO, |w| w.contribution_of(*e))))
        .collect();
    let weights = if contributions.iter().any(|(_, w)| *w > Fixed::ZERO) {
        contributions
    } else {
        let regions = world.regions_of(loser);
        enemies
            .iter()
            .map(|e| {
                let held = regions
                    .iter()
                    .filter(|r| world.occupation.region_occupier(**r) == Some(*e))
                    .count();
                (*e, Fixed::from_num(held as u32))
            })
            .collect()
    };
    let mut quota: BTreeMap<NationId, u32> = apportion(groups.len() as u32, &weights)
        .into_iter()
        .collect();

    // Most occupied groups first.
    let mut claims: Vec<(usize, GroupId, NationId)> = Vec::new();
    for group in &groups {
        let Some(g) = world.group(*group) else {
            continue;
        };
        for enemy in &enemies {
            let held = g
                .regions
                .iter()
                .filter(|r| world.occupation.region_occupier(**r) == Some(*enemy))
                .count();
            if held > 0 {
                claims.push((held, *group, *enemy));
            }
        }
    }
    claims.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));

    let mut awarded: BTreeMap<GroupId, NationId> = BTreeMap::new();
    for (_, group, enemy) in claims {
        if awarded.contains_key(&group) {
            continue;
        }
        if let Some(q) = quota.get_mut(&enemy).filter(|q| **q > 0) {
            *q -= 1;
            awarded.insert(group, enemy);
        }
    }
    let mut turn = 0;
    for group in &groups {
        if awarded.contains_key(group) {
            continue;
        }
        for _ in 0..enemies.len() {
            let enemy = enemies[turn % enemies.len()];
            turn += 1;
            if let Some(q) = quota.get_mut(&enemy).filter(|q| **q > 0) {
                *q -= 1;
                awarded.insert(*group, enemy);
                break;
            }
        }
    }

    let mut receivers: BTreeMap<NationId, Vec<GroupId>> = BTreeMap::new();
    for (group, enemy) in awarded {
        world.transfer_group(group, enemy);
        receivers.entry(enemy).or_default().push(group);
    }
    receivers.into_iter().collect()
}

/// Take a nation out of the simulation.
fn eliminate(world: &mut World, nation: NationId) {
    let capital = world.nation(nation).and_then(|n| n.capital);
    if let Some(region) = capital.and_then(|c| world.regions.get_mut(c.index())) {
        if region.building == Some(Building::Capital) {
            region.building = Some(Building::City);
            world.versions.building += 1;
        }
    }
    if let Some(n) = world.nation_mut(nation) {
        n.capital = None;
        n.eliminated = true;
        n.surrender_accumulator = 0;
    }

    world.end_wars_of(nation);
    world
        .battles
        .retain(|key, _| key.attacker != nation && key.defender != nation);

    let doomed: Vec<UnitId> = world
        .units()
        .filter(|u| u.owner == nation)
        .map(|u| u.id)
        .collect();
    for id in doomed {
        world.remove_unit(id);
    }

    release_stale_occupation(world);
    tracing::info!(%nation, "Nation eliminated");
}

/// Drop occupation records whose occupier may no longer hold the ground.
fn release_stale_occupation(world: &mut World) {
    let valid = |world: &World, region: RegionId, occupier: NationId| {
        world.nation(occupier).is_some_and(|n| n.is_alive())
            && world
                .owner_of(region)
                .is_some_and(|owner| world.at_war(owner, occupier))
    };
    let regions: BTreeMap<RegionId, NationId> = world
        .occupation
        .regions
        .iter()
        .filter(|(r, o)| valid(world, **r, **o))
        .map(|(r, o)| (*r, *o))
        .collect();
    let groups: BTreeMap<GroupId, NationId> = world
        .occupation
        .groups
        .iter()
        .filter(|(g, o)| {
            world
                .group(**g)
                .is_some_and(|grp| world.nation(**o).is_some_and(|n| n.is_alive()) && world.at_war(grp.owner, **o))
        })
        .map(|(g, o)| (*g, *o))
        .collect();
    if regions != world.occupation.regions || groups != world.occupation.groups {
        world.occupation.regions = regions;
        world.occupation.groups = groups;
        world.occupation.version += 1;
    }
}

/// Move units standing on the soil of a nation they are not at war with.
fn relocate_stranded(world: &mut World) {
    let stranded: Vec<(UnitId, NationId, RegionId, Domain)> = world
        .units()
        .filter(|u| !u.is_embarked())
        .filter(|u| {
            world
                .owner_of(u.region)
                .is_some_and(|owner| owner != u.owner && !world.at_war(owner, u.owner))
        })
        .map(|u| (u.id, u.owner, u.region, u.domain()))
        .collect();

    for (id, owner, from, domain) in stranded {
        let destination = match domain {
            Domain::Land => world
                .nearest_region(Domain::Land, owner, from, |r| world.owner_of(r) == Some(owner))
                .or_else(|| world.nation(owner).and_then(|n| n.capital)),
            Domain::Naval => world.nearest_region(Domain::Naval, owner, from, |r| {
                world.region(r).is_some_and(|x| x.terrain == Terrain::Sea)
            }),
        };
        match destination {
            Some(to) => {
                if let Some(unit) = world.unit_mut(id) {
                    unit.region = to;
                    unit.movement.clear();
                }
                let cargo: Vec<UnitId> = world
                    .unit(id)
                    .map(|u| u.cargo.units.clone())
                    .unwrap_or_default();
                for carried in cargo {
                    if let Some(c) = world.unit_mut(carried) {
                        c.region = to;
                    }
                }
                tracing::debug!(unit = %id, %from, %to, "stranded unit relocated");
            }
            None => {
                world.remove_unit(id);
                tracing::debug!(unit = %id, %from, "stranded unit disbanded");
            }
        }
    }
}
