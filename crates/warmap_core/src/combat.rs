//! Attrition combat for land and naval battles.
//!
//! Battles are grouped by contested region. Every unit hopping into the
//! region, and every non-owner unit already standing in it, attacks; every
//! unit present defends. Each engaging (attacker, defender) nation pair fights
//! one round per fast tick:
//!
//! ```text
//! strength(unit) = manpower * (0.5 + 0.5 * org) * (0.5 + 0.5 * fill) * power * debuff
//! damage budget  = damage_per_tick * opposing strength / damage_scale
//! ```
//!
//! The budget is spread over the receiving side in proportion to each unit's
//! strength. Dead units are only removed by [`cleanup_system`], after every
//! battle of the tick has resolved.

use std::collections::{BTreeMap, BTreeSet};

use tracing::instrument;

use crate::components::{Battle, BattleKey, Domain, Unit, UnitKind, WarPair};
use crate::config::BattleConfig;
use crate::ids::{NationId, RegionId, UnitId};
use crate::math::{clamp_unit, Fixed, HALF};
use crate::simulation::TickEvents;
use crate::world::World;

/// Combat strength of a single unit at `tick`.
#[must_use]
pub fn unit_strength(unit: &Unit, tick: u64) -> Fixed {
    if !unit.is_alive() {
        return Fixed::ZERO;
    }
    let org_factor = HALF + HALF * clamp_unit(unit.organization);
    let fill_factor = HALF + HALF * unit.average_fill();
    unit.manpower
        .saturating_mul(org_factor)
        .saturating_mul(fill_factor)
        .saturating_mul(unit.combat_power)
        .saturating_mul(unit.debuff_multiplier(tick))
}

/// Summed strength of a nation's units of one domain.
#[must_use]
pub fn nation_strength(world: &World, nation: NationId, domain: Domain) -> Fixed {
    world
        .units()
        .filter(|u| u.owner == nation && u.domain() == domain)
        .fold(Fixed::ZERO, |acc, u| {
            acc.saturating_add(unit_strength(u, world.tick()))
        })
}

/// Damage one side inflicts on the other in a single round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageBudget {
    /// Manpower to remove.
    pub manpower: Fixed,
    /// Organization to remove.
    pub organization: Fixed,
}

impl DamageBudget {
    /// Budget produced by `strength` under `domain`'s constants.
    #[must_use]
    pub fn from_strength(strength: Fixed, domain: Domain, config: &BattleConfig) -> Self {
        let (damage, org, damage_scale, org_scale) = match domain {
            Domain::Land => (
                config.land_damage_per_tick,
                config.land_org_damage_per_tick,
                config.land_damage_scale,
                config.land_org_scale,
            ),
            Domain::Naval => (
                config.naval_damage_per_tick,
                config.naval_org_damage_per_tick,
                config.naval_damage_scale,
                config.naval_org_scale,
            ),
        };
        Self {
            manpower: damage.saturating_mul(strength / damage_scale),
            organization: org.saturating_mul(strength / org_scale),
        }
    }
}

/// Split `total` over `weights`, proportionally, or evenly when every weight
/// is zero.
#[must_use]
pub fn distribute(total: Fixed, weights: &[Fixed]) -> Vec<Fixed> {
    if weights.is_empty() {
        return Vec::new();
    }
    let sum = weights
        .iter()
        .fold(Fixed::ZERO, |acc, w| acc.saturating_add(*w));
    if sum <= Fixed::ZERO {
        let share = total / Fixed::from_num(weights.len() as u32);
        return vec![share; weights.len()];
    }
    weights
        .iter()
        .map(|w| total.saturating_mul(*w / sum))
        .collect()
}

/// One side of an engagement.
#[derive(Debug, Default)]
struct Side {
    units: Vec<UnitId>,
    strength: Fixed,
}

/// Resolve every battle of one domain.
#[instrument(skip_all, name = "battles")]
pub fn battle_system(world: &mut World, domain: Domain, events: &mut TickEvents) {
    let tick = world.tick;
    let mut present: BTreeMap<RegionId, BTreeMap<NationId, Vec<UnitId>>> = BTreeMap::new();
    let mut incoming: BTreeMap<RegionId, BTreeMap<NationId, Vec<UnitId>>> = BTreeMap::new();
    for unit in world.units.values() {
        if unit.domain() != domain || unit.is_embarked() || !unit.is_alive() {
            continue;
        }
        present
            .entry(unit.region)
            .or_default()
            .entry(unit.owner)
            .or_default()
            .push(unit.id);
        if let Some(hop) = unit.movement.hop {
            if hop.to != unit.region {
                incoming
                    .entry(hop.to)
                    .or_default()
                    .entry(unit.owner)
                    .or_default()
                    .push(unit.id);
            }
        }
    }

    let contested: BTreeSet<RegionId> = incoming.keys().chain(present.keys()).copied().collect();
    for region in contested {
        let Some(defenders) = present.get(&region) else {
            continue;
        };
        let owner = world.owner_of(region);
        let empty = BTreeMap::new();
        let hoppers = incoming.get(&region).unwrap_or(&empty);

        for (attacker, defender) in engagements(world, owner, hoppers, defenders) {
            let mut attack_units: Vec<UnitId> = hoppers.get(&attacker).cloned().unwrap_or_default();
            if owner != Some(attacker) {
                if let Some(local) = defenders.get(&attacker) {
                    attack_units.extend(local.iter().copied());
                }
            }
            let defend_units = defenders.get(&defender).cloned().unwrap_or_default();
            fight(world, domain, region, attacker, defender, &attack_units, &defend_units);

            let key = BattleKey {
                region,
                attacker,
                defender,
            };
            match world.battles.get_mut(&key) {
                Some(battle) => battle.last_active_tick = tick,
                None => {
                    world.battles.insert(
                        key,
                        Battle {
                            key,
                            domain,
                            started_tick: tick,
                            last_active_tick: tick,
                        },
                    );
                    tracing::info!(%region, %attacker, %defender, ?domain, "battle started");
                    events.battles_started.push(key);
                }
            }
        }
    }
}

/// Nation pairs that fight at one region, attacker first.
fn engagements(
    world: &World,
    owner: Option<NationId>,
    hoppers: &BTreeMap<NationId, Vec<UnitId>>,
    present: &BTreeMap<NationId, Vec<UnitId>>,
) -> Vec<(NationId, NationId)> {
    let mut seen = BTreeSet::new();
    let mut pairs = Vec::new();
    let mut push = |a: NationId, d: NationId| {
        if a != d && world.at_war(a, d) && seen.insert(WarPair::new(a, d)) {
            pairs.push((a, d));
        }
    };
    for &attacker in hoppers.keys() {
        for &defender in present.keys() {
            push(attacker, defender);
        }
    }
    for &attacker in present.keys() {
        if owner == Some(attacker) {
            continue;
        }
        for &defender in present.keys() {
            push(attacker, defender);
        }
    }
    pairs
}

fn side(world: &World, units: &[UnitId], river_target: Option<RegionId>) -> Side {
    let config = &world.config.battle;
    let mut side = Side::default();
    for id in units {
        let Some(unit) = world.unit(*id) else {
            continue;
        };
        if !unit.is_alive() {
            continue;
        }
        let mut strength = unit_strength(unit, world.tick);
        if let Some(target) = river_target {
            let crossing = unit.region != target
                && world
                    .region(unit.region)
                    .is_some_and(|r| r.crosses_river_to(target));
            if crossing {
                strength = strength.saturating_mul(config.river_attack_multiplier);
            }
        }
        side.strength = side.strength.saturating_add(strength);
        side.units.push(*id);
    }
    side
}

fn fight(
    world: &mut World,
    domain: Domain,
    region: RegionId,
    attacker: NationId,
    defender: NationId,
    attack_units: &[UnitId],
    defend_units: &[UnitId],
) {
    let river_target = (domain == Domain::Land).then_some(region);
    let attack = side(world, attack_units, river_target);
    let defend = side(world, defend_units, None);
    if attack.units.is_empty() || defend.units.is_empty() {
        return;
    }

    let config = world.config.battle.clone();
    let to_defender = DamageBudget::from_strength(attack.strength, domain, &config);
    let to_attacker = DamageBudget::from_strength(defend.strength, domain, &config);

    let dealt_by_attacker = apply_damage(world, domain, &defend.units, to_defender);
    let dealt_by_defender = apply_damage(world, domain, &attack.units, to_attacker);

    if let Some(war) = world.wars.get_mut(&WarPair::new(attacker, defender)) {
        let a = war.contributions.entry(attacker).or_insert(Fixed::ZERO);
        *a = a.saturating_add(dealt_by_attacker);
        let d = war.contributions.entry(defender).or_insert(Fixed::ZERO);
        *d = d.saturating_add(dealt_by_defender);
    }

    for id in attack.units.iter().chain(defend.units.iter()) {
        if let Some(unit) = world.unit_mut(*id) {
            wear(unit, config.equipment_wear_per_tick);
        }
    }
}

/// Apply a damage budget to a side; returns manpower actually removed.
fn apply_damage(world: &mut World, domain: Domain, units: &[UnitId], budget: DamageBudget) -> Fixed {
    let tick = world.tick;
    let targets: Vec<UnitId> = if domain == Domain::Naval {
        let warships: Vec<UnitId> = units
            .iter()
            .copied()
            .filter(|id| {
                world
                    .unit(*id)
                    .is_some_and(|u| u.kind == UnitKind::CombatShip && u.is_alive())
            })
            .collect();
        if warships.is_empty() {
            units.to_vec()
        } else {
            warships
        }
    } else {
        units.to_vec()
    };

    let weights: Vec<Fixed> = targets
        .iter()
        .map(|id| world.unit(*id).map_or(Fixed::ZERO, |u| unit_strength(u, tick)))
        .collect();
    let manpower = distribute(budget.manpower, &weights);
    let organization = distribute(budget.organization, &weights);

    let mut dealt = Fixed::ZERO;
    for ((id, mp), org) in targets.iter().zip(manpower).zip(organization) {
        let Some(unit) = world.unit_mut(*id) else {
            continue;
        };
        let removed = mp.min(unit.manpower.max(Fixed::ZERO));
        unit.manpower -= mp;
        unit.organization -= org;
        dealt = dealt.saturating_add(removed);
    }
    dealt
}

fn wear(unit: &mut Unit, amount: Fixed) {
    for slot in &mut unit.equipment {
        slot.fill = clamp_unit(slot.fill - amount);
    }
}

/// Post-battle bookkeeping: recovery, debuff expiry, dead units, stale battles.
#[instrument(skip_all, name = "battle_cleanup")]
pub fn cleanup_system(world: &mut World, events: &mut TickEvents) {
    let tick = world.tick;
    let recovery = world.config.battle.org_recovery_per_tick;

    let engaged: BTreeSet<UnitId> = engaged_units(world);
    let mut dead = Vec::new();
    for unit in world.units.values_mut() {
        if !unit.is_alive() {
            dead.push(unit.id);
            continue;
        }
        if !engaged.contains(&unit.id) {
            unit.organization = (unit.organization + recovery).min(Fixed::ONE);
        }
        if unit.debuff.is_some_and(|d| tick >= d.expires_tick) {
            unit.debuff = None;
        }
    }
    for id in dead {
        let removed = world.remove_unit(id);
        tracing::debug!(unit = %id, cascade = removed.len(), "unit destroyed");
        events.units_destroyed.extend(removed);
    }

    let stale: Vec<BattleKey> = world
        .battles
        .values()
        .filter(|b| b.last_active_tick != tick)
        .map(|b| b.key)
        .collect();
    for key in stale {
        world.battles.remove(&key);
        tracing::info!(region = %key.region, attacker = %key.attacker, defender = %key.defender, "battle ended");
        events.battles_ended.push(key);
    }
}

/// Units that took part in a battle this tick.
fn engaged_units(world: &World) -> BTreeSet<UnitId> {
    let tick = world.tick;
    let active: BTreeSet<(RegionId, NationId)> = world
        .battles
        .values()
        .filter(|b| b.last_active_tick == tick)
        .flat_map(|b| [(b.key.region, b.key.attacker), (b.key.region, b.key.defender)])
        .collect();
    world
        .units
        .values()
        .filter(|u| {
            active.contains(&(u.region, u.owner))
                || u
                    .movement
                    .hop
                    .is_some_and(|h| active.contains(&(h.to, u.owner)))
        })
        .map(|u| u.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Building, Debuff, Hop};
    use crate::testing::{coast_world, line_world, LineSpec};

    fn run_round(world: &mut World) -> TickEvents {
        let mut events = TickEvents::default();
        world.tick += 1;
        battle_system(world, Domain::Naval, &mut events);
        battle_system(world, Domain::Land, &mut events);
        cleanup_system(world, &mut events);
        events
    }

    fn attack_into(world: &mut World, unit: UnitId, to: RegionId) {
        let u = world.unit_mut(unit).unwrap();
        let from = u.region;
        u.movement.target = Some(to);
        u.movement.hop = Some(Hop { from, to });
    }

    #[test]
    fn test_distribute_proportional_and_even() {
        let total = Fixed::from_num(30);
        let split = distribute(total, &[Fixed::from_num(1), Fixed::from_num(2)]);
        assert_eq!(split, vec![Fixed::from_num(10), Fixed::from_num(20)]);
        let even = distribute(total, &[Fixed::ZERO, Fixed::ZERO, Fixed::ZERO]);
        assert_eq!(even, vec![Fixed::from_num(10); 3]);
        assert!(distribute(total, &[]).is_empty());
    }

    #[test]
    fn test_strength_formula() {
        let mut world = line_world(&LineSpec::two_nations(1, 1));
        let id = world.spawn_unit(NationId(0), UnitKind::Infantry, RegionId(0));
        let unit = world.unit_mut(id).unwrap();
        // Full unit: 1000 * 1 * 1 * 1.
        assert_eq!(unit_strength(unit, 0), Fixed::from_num(1000));
        unit.organization = HALF;
        // org factor 0.75.
        assert_eq!(unit_strength(unit, 0), Fixed::from_num(750));
        unit.debuff = Some(Debuff {
            multiplier: HALF,
            expires_tick: 10,
        });
        assert_eq!(unit_strength(unit, 5), Fixed::from_num(375));
        assert_eq!(unit_strength(unit, 10), Fixed::from_num(750));
    }

    #[test]
    fn test_land_battle_damages_both_sides_and_records_battle() {
        let mut world = line_world(&LineSpec::two_nations(1, 1));
        let red = NationId(0);
        let blue = NationId(1);
        world.register_war(red, blue, true);
        let attacker = world.spawn_unit(red, UnitKind::Infantry, RegionId(0));
        let defender = world.spawn_unit(blue, UnitKind::Infantry, RegionId(1));
        attack_into(&mut world, attacker, RegionId(1));

        let events = run_round(&mut world);
        assert_eq!(events.battles_started.len(), 1);
        let key = events.battles_started[0];
        assert_eq!(key.attacker, red);
        assert_eq!(key.defender, blue);

        // Equal strength 1000: budget 40 * 1000 / 1000 = 40 manpower each.
        assert_eq!(world.unit(attacker).unwrap().manpower, Fixed::from_num(960));
        assert_eq!(world.unit(defender).unwrap().manpower, Fixed::from_num(960));
        let war = world.war(red, blue).unwrap();
        assert_eq!(war.contribution_of(red), Fixed::from_num(40));
        assert_eq!(war.contribution_of(blue), Fixed::from_num(40));
    }

    #[test]
    fn test_battle_pruned_when_not_touched() {
        let mut world = line_world(&LineSpec::two_nations(1, 1));
        let red = NationId(0);
        let blue = NationId(1);
        world.register_war(red, blue, true);
        let attacker = world.spawn_unit(red, UnitKind::Infantry, RegionId(0));
        world.spawn_unit(blue, UnitKind::Infantry, RegionId(1));
        attack_into(&mut world, attacker, RegionId(1));
        run_round(&mut world);
        assert_eq!(world.battles().count(), 1);

        world.unit_mut(attacker).unwrap().movement.clear();
        let events = run_round(&mut world);
        assert_eq!(world.battles().count(), 0);
        assert_eq!(events.battles_ended.len(), 1);
    }

    #[test]
    fn test_no_battle_without_war() {
        let mut world = line_world(&LineSpec::two_nations(1, 1));
        let attacker = world.spawn_unit(NationId(0), UnitKind::Infantry, RegionId(0));
        world.spawn_unit(NationId(1), UnitKind::Infantry, RegionId(1));
        attack_into(&mut world, attacker, RegionId(1));
        let events = run_round(&mut world);
        assert!(events.battles_started.is_empty());
        assert_eq!(world.unit(attacker).unwrap().manpower, Fixed::from_num(1000));
    }

    #[test]
    fn test_river_attack_penalty() {
        let mut spec = LineSpec::two_nations(1, 1);
        spec.rivers = vec![0];
        let mut world = line_world(&spec);
        let red = NationId(0);
        let blue = NationId(1);
        world.register_war(red, blue, true);
        let attacker = world.spawn_unit(red, UnitKind::Infantry, RegionId(0));
        let defender = world.spawn_unit(blue, UnitKind::Infantry, RegionId(1));
        attack_into(&mut world, attacker, RegionId(1));
        run_round(&mut world);
        // Attacker strength 750 deals 30; defender at 1000 deals 40.
        assert_eq!(world.unit(defender).unwrap().manpower, Fixed::from_num(970));
        assert_eq!(world.unit(attacker).unwrap().manpower, Fixed::from_num(960));
    }

    #[test]
    fn test_dead_units_removed_after_battles() {
        let mut world = line_world(&LineSpec::two_nations(1, 1));
        let red = NationId(0);
        let blue = NationId(1);
        world.register_war(red, blue, true);
        let attacker = world.spawn_unit(red, UnitKind::Tank, RegionId(0));
        let defender = world.spawn_unit(blue, UnitKind::Infantry, RegionId(1));
        world.unit_mut(defender).unwrap().manpower = Fixed::from_num(10);
        attack_into(&mut world, attacker, RegionId(1));
        let before = world.unit_count();
        let events = run_round(&mut world);
        assert_eq!(events.units_destroyed, vec![defender]);
        assert_eq!(world.unit_count(), before - 1);
        assert!(world.unit(attacker).is_some());
    }

    #[test]
    fn test_naval_damage_hits_warships_before_transports() {
        let mut world = coast_world();
        let red = NationId(0);
        let blue = NationId(1);
        world.register_war(red, blue, true);
        let sea = RegionId(2);
        let hunter = world.spawn_unit(red, UnitKind::CombatShip, RegionId(3));
        let escort = world.spawn_unit(blue, UnitKind::CombatShip, sea);
        let transport = world.spawn_unit(blue, UnitKind::TransportShip, sea);
        attack_into(&mut world, hunter, sea);
        run_round(&mut world);
        assert!(world.unit(escort).unwrap().manpower < Fixed::from_num(800));
        assert_eq!(world.unit(transport).unwrap().manpower, Fixed::from_num(300));
        assert_eq!(world.region(RegionId(1)).unwrap().building, Some(Building::Port));
    }

    #[test]
    fn test_sunk_transport_takes_cargo() {
        let mut world = coast_world();
        let red = NationId(0);
        let blue = NationId(1);
        world.register_war(red, blue, true);
        let sea = RegionId(2);
        let hunter = world.spawn_unit(red, UnitKind::CombatShip, RegionId(3));
        let transport = world.spawn_unit(blue, UnitKind::TransportShip, sea);
        let soldier = world.spawn_unit(blue, UnitKind::Infantry, RegionId(1));
        world.unit_mut(soldier).unwrap().embarked_on = Some(transport);
        world.unit_mut(soldier).unwrap().region = sea;
        world.unit_mut(transport).unwrap().cargo.units.push(soldier);
        world.unit_mut(transport).unwrap().manpower = Fixed::from_num(1);
        attack_into(&mut world, hunter, sea);
        let events = run_round(&mut world);
        assert!(events.units_destroyed.contains(&transport));
        assert!(events.units_destroyed.contains(&soldier));
        assert!(world.unit(soldier).is_none());
    }

    #[test]
    fn test_org_recovers_out_of_battle() {
        let mut world = line_world(&LineSpec::two_nations(1, 1));
        let id = world.spawn_unit(NationId(0), UnitKind::Infantry, RegionId(0));
        world.unit_mut(id).unwrap().organization = HALF;
        run_round(&mut world);
        let expected = HALF + world.config().battle.org_recovery_per_tick;
        assert_eq!(world.unit(id).unwrap().organization, expected);
    }
}
