//! Periodic target assignment.
//!
//! Every `retarget_interval_ticks` fast ticks each living nation splits its
//! forces into roles and hands out destinations:
//!
//! - land units become defenders or occupiers according to the current
//!   threat, defenders spread over defense objectives by angle, occupiers
//!   over reachable enemy ground by farthest-point spacing;
//! - when no enemy ground is reachable overland but a landing plan exists,
//!   occupiers are nominated for embarkation at the plan's port;
//! - combat ships split into home defense and offense, transports shuttle
//!   between the embark port and the landing sea.
//!
//! Units whose current target is still a valid objective keep it, so
//! reassignment does not reset their movement progress.

use std::collections::{BTreeMap, BTreeSet};

use tracing::instrument;

use crate::components::{Domain, Terrain, Unit, UnitKind, UnitRole};
use crate::ids::{NationId, RegionId, UnitId};
use crate::math::{Fixed, Vec2Fixed, HALF};
use crate::world::{bfs, World};

/// Route for an overseas landing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LandingPlan {
    /// Own port where troops board.
    pub embark_port: RegionId,
    /// Sea region next to the landing target.
    pub landing_sea: RegionId,
    /// Enemy coastal region to put troops ashore at.
    pub landing_target: RegionId,
    /// Naval hops from the port to the landing sea.
    pub path: Vec<RegionId>,
}

#[derive(Debug, Clone, Copy)]
struct Order {
    unit: UnitId,
    role: UnitRole,
    target: Option<RegionId>,
    embark_request: bool,
    landing_order: Option<RegionId>,
}

/// Hand out roles and destinations to every unit.
#[instrument(skip_all, name = "targeting")]
pub fn assign_targets(world: &mut World) {
    for nation in world.alive_nations() {
        let plan = landing_plan(world, nation);
        let mut orders = land_orders(world, nation, plan.as_ref());
        orders.extend(naval_orders(world, nation, plan.as_ref()));
        for order in orders {
            let Some(unit) = world.unit_mut(order.unit) else {
                continue;
            };
            unit.role = order.role;
            unit.set_target(order.target);
            unit.embark_request = order.embark_request;
            if unit.kind == UnitKind::TransportShip {
                unit.landing_order = order.landing_order;
            }
        }
    }
}

fn enemies_of(world: &World, nation: NationId) -> BTreeSet<NationId> {
    world
        .war_adjacency()
        .get(&nation)
        .cloned()
        .unwrap_or_default()
}

fn center(world: &World, region: RegionId) -> Vec2Fixed {
    world.region(region).map_or(Vec2Fixed::ZERO, |r| r.center)
}

/// `round(share × n)` with halves rounded up, capped at `n`.
fn share_of(share: Fixed, n: usize) -> usize {
    let scaled = share.saturating_mul(Fixed::from_num(n as u32)) + HALF;
    scaled.to_num::<usize>().min(n)
}

/// Nearest sea reachable from an own port that touches enemy coast.
#[must_use]
pub fn landing_plan(world: &World, nation: NationId) -> Option<LandingPlan> {
    let enemies = enemies_of(world, nation);
    if enemies.is_empty() {
        return None;
    }
    let ports = world.port_targets().get(&nation).cloned().unwrap_or_default();
    if ports.is_empty() {
        return None;
    }

    let enemy_shore = |sea: RegionId| -> Option<RegionId> {
        world
            .domain_neighbors(Domain::Naval, sea)
            .iter()
            .copied()
            .filter(|r| world.owner_of(*r).is_some_and(|o| enemies.contains(&o)))
            .min()
    };

    let dist = bfs(&world.topology().naval_neighbors, ports.iter().copied(), |r| {
        world.is_passable(Domain::Naval, nation, r)
    });
    let (landing_sea, landing_target) = dist
        .iter()
        .enumerate()
        .filter_map(|(i, d)| d.map(|d| (d, RegionId(i as u32))))
        .filter(|(_, r)| world.region(*r).is_some_and(|x| x.terrain == Terrain::Sea))
        .filter_map(|(d, sea)| enemy_shore(sea).map(|target| (d, sea, target)))
        .min()
        .map(|(_, sea, target)| (sea, target))?;

    let field = world.distance_field(Domain::Naval, nation, landing_sea);
    let embark_port = ports
        .iter()
        .filter_map(|p| field.get(p.index()).copied().flatten().map(|d| (d, *p)))
        .min()
        .map(|(_, p)| p)?;
    let path = world.path_to(Domain::Naval, nation, embark_port, landing_sea)?;
    Some(LandingPlan {
        embark_port,
        landing_sea,
        landing_target,
        path,
    })
}

// ============================================================================
// Objective selection
// ============================================================================

fn sample_evenly(ids: &[RegionId], k: usize) -> Vec<RegionId> {
    if k == 0 || ids.is_empty() {
        return Vec::new();
    }
    (0..k).map(|i| ids[i * ids.len() / k]).collect()
}

fn all_same(points: &[(RegionId, Vec2Fixed)]) -> bool {
    points.windows(2).all(|w| w[0].1 == w[1].1)
}

/// Pick `k` regions evenly spread by angle around their centroid.
///
/// Falls back to even sampling by id when every point sits on the
/// centroid's axis of symmetry (no usable angles).
#[must_use]
pub fn select_angular(points: &[(RegionId, Vec2Fixed)], k: usize) -> Vec<RegionId> {
    let mut ids: Vec<RegionId> = points.iter().map(|(id, _)| *id).collect();
    ids.sort_unstable();
    if k >= points.len() {
        return ids;
    }
    let Some(mid) = Vec2Fixed::centroid(points.iter().map(|(_, p)| *p)) else {
        return Vec::new();
    };
    let angled: Option<Vec<(Fixed, RegionId)>> = points
        .iter()
        .map(|(id, p)| (*p - mid).pseudo_angle().map(|a| (a, *id)))
        .collect();
    match angled {
        Some(mut angled) if !all_same(points) => {
            angled.sort_unstable();
            let ordered: Vec<RegionId> = angled.into_iter().map(|(_, id)| id).collect();
            sample_evenly(&ordered, k)
        }
        _ => sample_evenly(&ids, k),
    }
}

/// Pick `k` regions by greedy farthest-point spacing, starting from the one
/// closest to `anchor`.
#[must_use]
pub fn select_farthest(points: &[(RegionId, Vec2Fixed)], anchor: Vec2Fixed, k: usize) -> Vec<RegionId> {
    let mut sorted = points.to_vec();
    sorted.sort_unstable_by_key(|(id, _)| *id);
    if k >= sorted.len() {
        return sorted.into_iter().map(|(id, _)| id).collect();
    }
    if all_same(&sorted) {
        let ids: Vec<RegionId> = sorted.iter().map(|(id, _)| *id).collect();
        return sample_evenly(&ids, k);
    }

    let mut chosen: Vec<(RegionId, Vec2Fixed)> = Vec::with_capacity(k);
    let mut nearest: Vec<Fixed> = sorted.iter().map(|(_, p)| p.distance_squared(anchor)).collect();
    let mut first = true;
    while chosen.len() < k {
        let pick = sorted
            .iter()
            .enumerate()
            .filter(|(_, (id, _))| !chosen.iter().any(|(c, _)| c == id))
            .map(|(i, (id, _))| (i, *id, nearest[i]))
            .reduce(|best, next| {
                let better = if first { next.2 < best.2 } else { next.2 > best.2 };
                if better {
                    next
                } else {
                    best
                }
            });
        let Some((index, _, _)) = pick else {
            break;
        };
        let point = sorted[index];
        chosen.push(point);
        for (i, (_, p)) in sorted.iter().enumerate() {
            let d = p.distance_squared(point.1);
            nearest[i] = if first { d } else { nearest[i].min(d) };
        }
        first = false;
    }
    chosen.into_iter().map(|(id, _)| id).collect()
}

/// Give each unit an objective: keep a target that is still valid, otherwise
/// take the least crowded objective, nearest first.
fn distribute(
    world: &World,
    units: &[&Unit],
    valid: &BTreeSet<RegionId>,
    objectives: &[RegionId],
) -> Vec<(UnitId, Option<RegionId>)> {
    let mut load: BTreeMap<RegionId, u32> = objectives.iter().map(|r| (*r, 0)).collect();
    let mut result = Vec::with_capacity(units.len());
    let mut pending = Vec::new();
    for unit in units {
        match unit.movement.target.filter(|t| valid.contains(t)) {
            Some(target) => {
                if let Some(count) = load.get_mut(&target) {
                    *count += 1;
                }
                result.push((unit.id, Some(target)));
            }
            None => pending.push(*unit),
        }
    }
    for unit in pending {
        let here = center(world, unit.region);
        let pick = load
            .iter()
            .map(|(r, count)| (*count, center(world, *r).distance_squared(here), *r))
            .min()
            .map(|(_, _, r)| r);
        if let Some(r) = pick {
            if let Some(count) = load.get_mut(&r) {
                *count += 1;
            }
        }
        result.push((unit.id, pick));
    }
    result
}

// ============================================================================
// Land
// ============================================================================

fn land_orders(world: &World, nation: NationId, plan: Option<&LandingPlan>) -> Vec<Order> {
    let enemies = enemies_of(world, nation);
    let owners = world.region_owners();
    let own = |r: RegionId| owners.get(r.index()).copied().flatten() == Some(nation);

    let units: Vec<&Unit> = world
        .units()
        .filter(|u| u.owner == nation && u.domain() == Domain::Land && !u.is_embarked() && u.is_alive())
        .collect();
    if units.is_empty() {
        return Vec::new();
    }

    let intrusion: BTreeSet<RegionId> = world
        .units()
        .filter(|u| {
            u.domain() == Domain::Land
                && !u.is_embarked()
                && u.is_alive()
                && enemies.contains(&u.owner)
                && own(u.region)
        })
        .map(|u| u.region)
        .collect();
    let liberation: BTreeSet<RegionId> = world
        .occupation()
        .regions
        .keys()
        .copied()
        .filter(|r| own(*r))
        .collect();

    let reachable = world.reachable(Domain::Land, nation);
    let occupation_targets: BTreeSet<RegionId> = world
        .regions()
        .iter()
        .filter(|r| reachable.get(r.id.index()).copied().unwrap_or(false))
        .filter(|r| {
            owners
                .get(r.id.index())
                .copied()
                .flatten()
                .is_some_and(|o| enemies.contains(&o))
        })
        .filter(|r| world.occupation().region_occupier(r.id) != Some(nation))
        .map(|r| r.id)
        .collect();

    let transports = world
        .units()
        .filter(|u| u.owner == nation && u.kind == UnitKind::TransportShip && u.is_alive())
        .count();
    let amphibious = occupation_targets.is_empty() && plan.is_some() && transports > 0;

    let movement = &world.config.movement;
    let share = if !intrusion.is_empty() {
        movement.defense_ratio_intrusion
    } else if !liberation.is_empty() {
        movement.defense_ratio_liberation
    } else if !occupation_targets.is_empty() || amphibious {
        movement.defense_ratio_occupation
    } else {
        Fixed::ONE
    };
    let defenders = share_of(share, units.len());
    let (mut defense, mut offense) = units.split_at(defenders);
    let mut orders = Vec::with_capacity(units.len());

    // Offense without an overland target either boards ships or stays home.
    let mut spill: Vec<&Unit> = Vec::new();
    if occupation_targets.is_empty() {
        if let (Some(plan), true) = (plan, amphibious) {
            let seats = transports * world.config.production.transport_capacity as usize;
            let (boarding, rest) = offense.split_at(seats.min(offense.len()));
            for unit in boarding {
                orders.push(Order {
                    unit: unit.id,
                    role: UnitRole::Occupation,
                    target: Some(plan.embark_port),
                    embark_request: true,
                    landing_order: None,
                });
            }
            offense = rest;
        }
        spill.extend_from_slice(defense);
        spill.extend_from_slice(offense);
        defense = &spill;
        offense = &[];
    }

    let defense_set: BTreeSet<RegionId> = if !intrusion.is_empty() || !liberation.is_empty() {
        intrusion.union(&liberation).copied().collect()
    } else {
        let borders = world.border_regions();
        let mine = borders.get(&nation).map_or(&[][..], Vec::as_slice);
        let facing: BTreeSet<RegionId> = if enemies.is_empty() {
            mine.iter().copied().collect()
        } else {
            mine.iter()
                .copied()
                .filter(|r| {
                    world.domain_neighbors(Domain::Land, *r).iter().any(|n| {
                        owners
                            .get(n.index())
                            .copied()
                            .flatten()
                            .is_some_and(|o| enemies.contains(&o))
                    })
                })
                .collect()
        };
        if facing.is_empty() {
            world
                .nation(nation)
                .and_then(|n| n.capital)
                .into_iter()
                .collect()
        } else {
            facing
        }
    };

    if !defense.is_empty() {
        let points: Vec<(RegionId, Vec2Fixed)> =
            defense_set.iter().map(|r| (*r, center(world, *r))).collect();
        let objectives = select_angular(&points, defense.len());
        for (unit, target) in distribute(world, defense, &defense_set, &objectives) {
            orders.push(Order {
                unit,
                role: UnitRole::Defense,
                target,
                embark_request: false,
                landing_order: None,
            });
        }
    }

    if !offense.is_empty() {
        let points: Vec<(RegionId, Vec2Fixed)> = occupation_targets
            .iter()
            .map(|r| (*r, center(world, *r)))
            .collect();
        let anchor = world
            .nation(nation)
            .and_then(|n| n.capital)
            .map_or_else(|| center(world, offense[0].region), |c| center(world, c));
        let objectives = select_farthest(&points, anchor, offense.len());
        for (unit, target) in distribute(world, offense, &occupation_targets, &objectives) {
            orders.push(Order {
                unit,
                role: UnitRole::Occupation,
                target,
                embark_request: false,
                landing_order: None,
            });
        }
    }
    orders
}

// ============================================================================
// Naval
// ============================================================================

fn naval_orders(world: &World, nation: NationId, plan: Option<&LandingPlan>) -> Vec<Order> {
    let enemies = enemies_of(world, nation);
    let ports = world.port_targets().get(&nation).cloned().unwrap_or_default();
    let is_sea = |r: &RegionId| world.region(*r).is_some_and(|x| x.terrain == Terrain::Sea);
    let own_port = |r: RegionId| ports.contains(&r);

    let home_seas: Vec<RegionId> = ports
        .iter()
        .flat_map(|p| world.domain_neighbors(Domain::Naval, *p).iter().copied())
        .filter(is_sea)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut orders = Vec::new();
    let mut warships = Vec::new();
    for unit in world.units().filter(|u| u.owner == nation && u.domain() == Domain::Naval && u.is_alive()) {
        if unit.kind == UnitKind::CombatShip {
            warships.push(unit);
            continue;
        }
        let loaded = !unit.cargo.units.is_empty();
        let (target, landing_order) = match (plan, loaded) {
            (Some(plan), true) => (Some(plan.landing_sea), Some(plan.landing_target)),
            (Some(plan), false) => (Some(plan.embark_port), None),
            (None, true) => (
                world.nearest_region(Domain::Naval, nation, unit.region, own_port),
                None,
            ),
            (None, false) => (None, None),
        };
        orders.push(Order {
            unit: unit.id,
            role: UnitRole::Transport,
            target,
            embark_request: false,
            landing_order,
        });
    }

    let home = if home_seas.is_empty() {
        0
    } else {
        share_of(world.config.movement.naval_home_ratio, warships.len())
    };
    let (guards, hunters) = warships.split_at(home);
    for (i, ship) in guards.iter().enumerate() {
        orders.push(Order {
            unit: ship.id,
            role: UnitRole::HomeDefense,
            target: Some(home_seas[i % home_seas.len()]),
            embark_request: false,
            landing_order: None,
        });
    }

    let escort_route: Vec<RegionId> = plan
        .map(|p| p.path.iter().copied().filter(is_sea).collect())
        .unwrap_or_default();
    let hostile_sea = |r: RegionId| {
        is_sea(&r)
            && world
                .domain_neighbors(Domain::Naval, r)
                .iter()
                .any(|n| world.owner_of(*n).is_some_and(|o| enemies.contains(&o)))
    };
    for (i, ship) in hunters.iter().enumerate() {
        let target = if escort_route.is_empty() {
            let hunt = if enemies.is_empty() {
                None
            } else {
                world.nearest_region(Domain::Naval, nation, ship.region, hostile_sea)
            };
            hunt.or_else(|| (!home_seas.is_empty()).then(|| home_seas[i % home_seas.len()]))
        } else {
            Some(escort_route[i * escort_route.len() / hunters.len()])
        };
        orders.push(Order {
            unit: ship.id,
            role: UnitRole::Offense,
            target,
            embark_request: false,
            landing_order: None,
        });
    }
    orders
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{coast_world, line_world, spawn_many, LineSpec};

    fn roles(world: &World, nation: NationId) -> BTreeMap<UnitRole, usize> {
        let mut counts = BTreeMap::new();
        for unit in world.units().filter(|u| u.owner == nation) {
            *counts.entry(unit.role).or_default() += 1;
        }
        counts
    }

    #[test]
    fn test_share_rounds_half_up() {
        assert_eq!(share_of(Fixed::from_num(0.3), 4), 1);
        assert_eq!(share_of(HALF, 3), 2);
        assert_eq!(share_of(Fixed::ONE, 5), 5);
        assert_eq!(share_of(Fixed::ZERO, 5), 0);
    }

    #[test]
    fn test_farthest_point_spacing_on_a_line() {
        let points: Vec<(RegionId, Vec2Fixed)> =
            (0..10).map(|i| (RegionId(i), Vec2Fixed::from_ints(i as i32, 0))).collect();
        let picked = select_farthest(&points, Vec2Fixed::ZERO, 3);
        assert_eq!(picked, vec![RegionId(0), RegionId(9), RegionId(4)]);
    }

    #[test]
    fn test_angular_spacing_around_centroid() {
        let points = vec![
            (RegionId(0), Vec2Fixed::from_ints(1, 0)),
            (RegionId(1), Vec2Fixed::from_ints(0, 1)),
            (RegionId(2), Vec2Fixed::from_ints(-1, 0)),
            (RegionId(3), Vec2Fixed::from_ints(0, -1)),
        ];
        assert_eq!(select_angular(&points, 2), vec![RegionId(0), RegionId(2)]);
        assert_eq!(select_angular(&points, 9).len(), 4);
    }

    #[test]
    fn test_degenerate_geometry_samples_by_id() {
        let points: Vec<(RegionId, Vec2Fixed)> =
            (0..4).map(|i| (RegionId(i), Vec2Fixed::from_ints(3, 3))).collect();
        assert_eq!(select_angular(&points, 2), vec![RegionId(0), RegionId(2)]);
        assert_eq!(
            select_farthest(&points, Vec2Fixed::ZERO, 2),
            vec![RegionId(0), RegionId(2)]
        );
    }

    #[test]
    fn test_peace_sends_everyone_to_the_border() {
        let mut world = line_world(&LineSpec::two_nations(2, 2));
        let red = NationId(0);
        spawn_many(&mut world, red, UnitKind::Infantry, RegionId(0), 3);
        assign_targets(&mut world);
        for unit in world.units().filter(|u| u.owner == red) {
            assert_eq!(unit.role, UnitRole::Defense);
            assert_eq!(unit.movement.target, Some(RegionId(1)));
        }
    }

    #[test]
    fn test_war_splits_defense_and_occupation() {
        let mut world = line_world(&LineSpec::two_nations(2, 2));
        let red = NationId(0);
        world.register_war(red, NationId(1), true);
        spawn_many(&mut world, red, UnitKind::Infantry, RegionId(0), 4);
        assign_targets(&mut world);

        let counts = roles(&world, red);
        assert_eq!(counts.get(&UnitRole::Defense), Some(&1));
        assert_eq!(counts.get(&UnitRole::Occupation), Some(&3));
        let mut targets = BTreeSet::new();
        for unit in world.units().filter(|u| u.role == UnitRole::Occupation) {
            let target = unit.movement.target.unwrap();
            assert!(target == RegionId(2) || target == RegionId(3));
            targets.insert(target);
        }
        assert_eq!(targets.len(), 2);
    }

    #[test]
    fn test_intrusion_is_defended_first() {
        let mut world = line_world(&LineSpec::two_nations(2, 2));
        let red = NationId(0);
        let blue = NationId(1);
        world.register_war(red, blue, true);
        spawn_many(&mut world, red, UnitKind::Infantry, RegionId(0), 10);
        world.spawn_unit(blue, UnitKind::Infantry, RegionId(1));
        assign_targets(&mut world);

        let counts = roles(&world, red);
        assert_eq!(counts.get(&UnitRole::Defense), Some(&7));
        for unit in world.units().filter(|u| u.owner == red && u.role == UnitRole::Defense) {
            assert_eq!(unit.movement.target, Some(RegionId(1)));
        }
    }

    #[test]
    fn test_valid_target_is_kept() {
        let mut world = line_world(&LineSpec::two_nations(2, 3));
        let red = NationId(0);
        world.register_war(red, NationId(1), true);
        let ids = spawn_many(&mut world, red, UnitKind::Infantry, RegionId(0), 4);
        assign_targets(&mut world);
        let last = *ids.last().unwrap();
        world.unit_mut(last).unwrap().set_target(Some(RegionId(3)));
        world.unit_mut(last).unwrap().movement.progress_ms = Fixed::from_num(50);
        assign_targets(&mut world);
        let unit = world.unit(last).unwrap();
        assert_eq!(unit.movement.target, Some(RegionId(3)));
        assert_eq!(unit.movement.progress_ms, Fixed::from_num(50));
    }

    #[test]
    fn test_landing_plan_over_the_strait() {
        let mut world = coast_world();
        let red = NationId(0);
        assert_eq!(landing_plan(&world, red), None);
        world.register_war(red, NationId(1), true);
        let plan = landing_plan(&world, red).unwrap();
        assert_eq!(plan.embark_port, RegionId(1));
        assert_eq!(plan.landing_sea, RegionId(3));
        assert_eq!(plan.landing_target, RegionId(4));
        assert_eq!(plan.path, vec![RegionId(2), RegionId(3)]);
    }

    #[test]
    fn test_overseas_war_nominates_embarkation() {
        let mut world = coast_world();
        let red = NationId(0);
        world.register_war(red, NationId(1), true);
        spawn_many(&mut world, red, UnitKind::Infantry, RegionId(0), 10);
        let transport = world.spawn_unit(red, UnitKind::TransportShip, RegionId(1));
        let warships = spawn_many(&mut world, red, UnitKind::CombatShip, RegionId(1), 2);
        assign_targets(&mut world);

        // 3 of 10 defend, 4 seats on one transport, the other 3 stay home.
        let boarding: Vec<&Unit> = world.units().filter(|u| u.embark_request).collect();
        assert_eq!(boarding.len(), 4);
        assert!(boarding.iter().all(|u| u.movement.target == Some(RegionId(1))));
        let counts = roles(&world, red);
        assert_eq!(counts.get(&UnitRole::Defense), Some(&6));

        let t = world.unit(transport).unwrap();
        assert_eq!(t.role, UnitRole::Transport);
        assert_eq!(t.movement.target, Some(RegionId(1)));
        assert_eq!(t.landing_order, None);

        // One of two warships guards home, the other escorts.
        let guard = world.unit(warships[0]).unwrap();
        assert_eq!(guard.role, UnitRole::HomeDefense);
        assert_eq!(guard.movement.target, Some(RegionId(2)));
        let escort = world.unit(warships[1]).unwrap();
        assert_eq!(escort.role, UnitRole::Offense);
        assert_eq!(escort.movement.target, Some(RegionId(2)));
    }

    #[test]
    fn test_loaded_transport_heads_for_landing_sea() {
        let mut world = coast_world();
        let red = NationId(0);
        world.register_war(red, NationId(1), true);
        let transport = world.spawn_unit(red, UnitKind::TransportShip, RegionId(1));
        let soldier = world.spawn_unit(red, UnitKind::Infantry, RegionId(1));
        world.unit_mut(soldier).unwrap().embarked_on = Some(transport);
        world.unit_mut(transport).unwrap().cargo.units.push(soldier);
        assign_targets(&mut world);
        let t = world.unit(transport).unwrap();
        assert_eq!(t.movement.target, Some(RegionId(3)));
        assert_eq!(t.landing_order, Some(RegionId(4)));
    }
}
