//! Tuning constants for the simulation.
//!
//! [`SimConfig`] is a read-only bundle handed to [`WorldBuilder`]. Every value
//! is clamped by [`SimConfig::sanitized`] before the world stores it, so the
//! systems can assume ratios live in `[0, 1]`, intervals are at least one
//! tick, and ranges satisfy `min <= max`.
//!
//! Decimal fields are written as plain numbers in RON:
//!
//! ```ron
//! (
//!     clock: (fast_tick_ms: 100.0, slow_tick_ms: 1000.0),
//!     diplomacy: (dominance_ratio: 2.5),
//! )
//! ```
//!
//! [`WorldBuilder`]: crate::world::WorldBuilder

use serde::{Deserialize, Serialize};

use crate::components::{Resources, UnitKind};
use crate::error::Result;
use crate::math::{clamp_unit, decimal_serde, Fixed};

/// Complete tuning bundle.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Tick durations.
    pub clock: ClockConfig,
    /// Movement and target assignment.
    pub movement: MovementConfig,
    /// Pathfinding cache sizes.
    pub cache: CacheConfig,
    /// War declaration heuristics.
    pub diplomacy: DiplomacyConfig,
    /// Land and naval combat.
    pub battle: BattleConfig,
    /// Occupation thresholds.
    pub occupation: OccupationConfig,
    /// War cooperation dynamics.
    pub cooperation: CooperationConfig,
    /// Civil war rules.
    pub civil_war: CivilWarConfig,
    /// Surrender rules.
    pub surrender: SurrenderConfig,
    /// Production, economy and transport capacity.
    pub production: ProductionConfig,
    /// Per-kind unit statistics.
    pub units: UnitStatsTable,
}

impl SimConfig {
    /// Parse a config from RON text. Missing fields take their defaults.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let config: SimConfig = ron::from_str(text)?;
        Ok(config)
    }

    /// Return a copy with every value clamped into its legal range.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        let one_ms = Fixed::ONE;

        let clock = &mut self.clock;
        clock.fast_tick_ms = clock.fast_tick_ms.max(one_ms);
        clock.slow_tick_ms = clock.slow_tick_ms.max(one_ms);
        clock.max_frame_delta_ms = clock.max_frame_delta_ms.max(Fixed::ZERO);

        let movement = &mut self.movement;
        movement.river_crossing_multiplier = movement.river_crossing_multiplier.max(Fixed::ONE);
        movement.defense_ratio_intrusion = clamp_unit(movement.defense_ratio_intrusion);
        movement.defense_ratio_liberation = clamp_unit(movement.defense_ratio_liberation);
        movement.defense_ratio_occupation = clamp_unit(movement.defense_ratio_occupation);
        movement.naval_home_ratio = clamp_unit(movement.naval_home_ratio);

        self.cache.distance_field_capacity = self.cache.distance_field_capacity.max(1);
        self.cache.reachable_capacity = self.cache.reachable_capacity.max(1);

        let diplomacy = &mut self.diplomacy;
        diplomacy.war_eval_min_ticks = diplomacy.war_eval_min_ticks.max(1);
        diplomacy.war_eval_max_ticks = diplomacy
            .war_eval_max_ticks
            .max(diplomacy.war_eval_min_ticks);
        diplomacy.dominance_ratio = diplomacy.dominance_ratio.max(Fixed::ONE);
        diplomacy.even_ratio = diplomacy.even_ratio.max(Fixed::ONE);
        diplomacy.even_declare_chance = clamp_unit(diplomacy.even_declare_chance);
        diplomacy.amphibious_land_ratio = diplomacy.amphibious_land_ratio.max(Fixed::ZERO);
        diplomacy.amphibious_naval_ratio = diplomacy.amphibious_naval_ratio.max(Fixed::ZERO);

        let battle = &mut self.battle;
        battle.land_damage_scale = battle.land_damage_scale.max(Fixed::ONE);
        battle.land_org_scale = battle.land_org_scale.max(Fixed::ONE);
        battle.naval_damage_scale = battle.naval_damage_scale.max(Fixed::ONE);
        battle.naval_org_scale = battle.naval_org_scale.max(Fixed::ONE);
        battle.land_damage_per_tick = battle.land_damage_per_tick.max(Fixed::ZERO);
        battle.land_org_damage_per_tick = battle.land_org_damage_per_tick.max(Fixed::ZERO);
        battle.naval_damage_per_tick = battle.naval_damage_per_tick.max(Fixed::ZERO);
        battle.naval_org_damage_per_tick = battle.naval_org_damage_per_tick.max(Fixed::ZERO);
        battle.river_attack_multiplier = clamp_unit(battle.river_attack_multiplier);
        battle.landing_debuff_multiplier = clamp_unit(battle.landing_debuff_multiplier);
        battle.equipment_wear_per_tick = clamp_unit(battle.equipment_wear_per_tick);
        battle.org_recovery_per_tick = clamp_unit(battle.org_recovery_per_tick);

        self.occupation.group_occupation_ratio = clamp_unit(self.occupation.group_occupation_ratio);

        let cooperation = &mut self.cooperation;
        cooperation.max = cooperation.max.max(Fixed::ONE);
        cooperation.decay_per_tick = cooperation.decay_per_tick.max(Fixed::ZERO);
        cooperation.unit_loss_penalty = cooperation.unit_loss_penalty.max(Fixed::ZERO);
        cooperation.city_loss_penalty = cooperation.city_loss_penalty.max(Fixed::ZERO);
        cooperation.occupation_penalty = cooperation.occupation_penalty.max(Fixed::ZERO);
        cooperation.recovery_per_tick = cooperation.recovery_per_tick.max(Fixed::ZERO);

        let civil_war = &mut self.civil_war;
        civil_war.threshold = civil_war.threshold.clamp(Fixed::ZERO, cooperation.max);
        civil_war.secession_fraction = clamp_unit(civil_war.secession_fraction);
        civil_war.cooperation_boost = civil_war.cooperation_boost.max(Fixed::ZERO);

        self.surrender.grace_checks = self.surrender.grace_checks.max(1);

        let production = &mut self.production;
        production.interval_slow_ticks = production.interval_slow_ticks.max(1);
        production.tank_every = production.tank_every.max(1);
        production.transport_capacity = production.transport_capacity.max(1);
        production.capital_spawn_per_group = production.capital_spawn_per_group.max(Fixed::ZERO);
        production.city_income_multiplier = production.city_income_multiplier.max(Fixed::ZERO);
        production.weapons_per_fill = production.weapons_per_fill.max(Fixed::ZERO);
        production.max_units_per_nation = production
            .max_units_per_nation
            .min(production.max_total_units);

        for kind in UnitKind::ALL {
            let stats = self.units.get_mut(kind);
            stats.manpower = stats.manpower.max(Fixed::ONE);
            stats.combat_power = stats.combat_power.max(Fixed::ZERO);
            stats.hop_ms = stats.hop_ms.max(one_ms);
        }

        self
    }
}

/// Fixed tick durations in milliseconds of scaled game time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Duration of one fast tick (movement, combat, occupation).
    #[serde(with = "decimal_serde")]
    pub fast_tick_ms: Fixed,
    /// Duration of one slow tick (production, war declaration).
    #[serde(with = "decimal_serde")]
    pub slow_tick_ms: Fixed,
    /// Raw frame deltas are clamped to this before scaling.
    #[serde(with = "decimal_serde")]
    pub max_frame_delta_ms: Fixed,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            fast_tick_ms: Fixed::from_num(100),
            slow_tick_ms: Fixed::from_num(1000),
            max_frame_delta_ms: Fixed::from_num(250),
        }
    }
}

/// Movement and target assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Fast ticks between target assignment passes. Zero disables automatic
    /// targeting so that only explicitly ordered units move.
    pub retarget_interval_ticks: u32,
    /// Hop duration multiplier for land hops across a river.
    #[serde(with = "decimal_serde")]
    pub river_crossing_multiplier: Fixed,
    /// Defense share while enemy units stand on own soil.
    #[serde(with = "decimal_serde")]
    pub defense_ratio_intrusion: Fixed,
    /// Defense share while own regions are occupied.
    #[serde(with = "decimal_serde")]
    pub defense_ratio_liberation: Fixed,
    /// Defense share while unoccupied enemy ground is reachable.
    #[serde(with = "decimal_serde")]
    pub defense_ratio_occupation: Fixed,
    /// Share of combat ships kept next to home ports.
    #[serde(with = "decimal_serde")]
    pub naval_home_ratio: Fixed,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            retarget_interval_ticks: 10,
            river_crossing_multiplier: Fixed::from_num(1.5),
            defense_ratio_intrusion: Fixed::from_num(0.7),
            defense_ratio_liberation: Fixed::from_num(0.5),
            defense_ratio_occupation: Fixed::from_num(0.3),
            naval_home_ratio: Fixed::from_num(0.3),
        }
    }
}

/// Bounded pathfinding cache capacities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entries per distance-field cache (land and naval each).
    pub distance_field_capacity: usize,
    /// Entries in the reachable-set cache.
    pub reachable_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            distance_field_capacity: 256,
            reachable_capacity: 64,
        }
    }
}

/// War declaration heuristics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiplomacyConfig {
    /// Lower bound of the re-evaluation delay, in slow ticks.
    pub war_eval_min_ticks: u32,
    /// Upper bound of the re-evaluation delay, in slow ticks.
    pub war_eval_max_ticks: u32,
    /// Pairs with fewer combined units are ignored.
    pub min_combined_units: u32,
    /// Unit-count gap that makes the stronger side dominant.
    pub dominance_gap: u32,
    /// Unit-count ratio that makes the stronger side dominant.
    #[serde(with = "decimal_serde")]
    pub dominance_ratio: Fixed,
    /// Largest gap still considered an even match.
    pub even_gap: u32,
    /// Largest ratio still considered an even match.
    #[serde(with = "decimal_serde")]
    pub even_ratio: Fixed,
    /// Chance that an even pair goes to war on an evaluation.
    #[serde(with = "decimal_serde")]
    pub even_declare_chance: Fixed,
    /// Declarations committed per slow tick at most.
    pub max_declarations_per_tick: u32,
    /// Combat ships needed for a declaration across the sea.
    pub amphibious_min_combat_ships: u32,
    /// Transports needed for a declaration across the sea.
    pub amphibious_min_transports: u32,
    /// Land strength ratio needed for a declaration across the sea.
    #[serde(with = "decimal_serde")]
    pub amphibious_land_ratio: Fixed,
    /// Naval strength ratio needed for a declaration across the sea.
    #[serde(with = "decimal_serde")]
    pub amphibious_naval_ratio: Fixed,
}

impl Default for DiplomacyConfig {
    fn default() -> Self {
        Self {
            war_eval_min_ticks: 3,
            war_eval_max_ticks: 8,
            min_combined_units: 6,
            dominance_gap: 10,
            dominance_ratio: Fixed::from_num(2),
            even_gap: 2,
            even_ratio: Fixed::from_num(1.25),
            even_declare_chance: Fixed::from_num(0.05),
            max_declarations_per_tick: 2,
            amphibious_min_combat_ships: 2,
            amphibious_min_transports: 1,
            amphibious_land_ratio: Fixed::from_num(1.5),
            amphibious_naval_ratio: Fixed::ONE,
        }
    }
}

/// Land and naval combat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    /// Manpower damage budget per tick at unit opposing strength scale.
    #[serde(with = "decimal_serde")]
    pub land_damage_per_tick: Fixed,
    /// Organization damage budget per tick at unit opposing strength scale.
    #[serde(with = "decimal_serde")]
    pub land_org_damage_per_tick: Fixed,
    /// Opposing strength that yields exactly one damage budget.
    #[serde(with = "decimal_serde")]
    pub land_damage_scale: Fixed,
    /// Opposing strength that yields exactly one organization budget.
    #[serde(with = "decimal_serde")]
    pub land_org_scale: Fixed,
    /// Naval manpower damage budget per tick.
    #[serde(with = "decimal_serde")]
    pub naval_damage_per_tick: Fixed,
    /// Naval organization damage budget per tick.
    #[serde(with = "decimal_serde")]
    pub naval_org_damage_per_tick: Fixed,
    /// Naval damage scale.
    #[serde(with = "decimal_serde")]
    pub naval_damage_scale: Fixed,
    /// Naval organization scale.
    #[serde(with = "decimal_serde")]
    pub naval_org_scale: Fixed,
    /// Strength multiplier for attackers hopping across a river.
    #[serde(with = "decimal_serde")]
    pub river_attack_multiplier: Fixed,
    /// Strength multiplier after a forced landing.
    #[serde(with = "decimal_serde")]
    pub landing_debuff_multiplier: Fixed,
    /// Fast ticks a forced-landing debuff lasts.
    pub landing_debuff_ticks: u32,
    /// Equipment fill lost per engaged tick.
    #[serde(with = "decimal_serde")]
    pub equipment_wear_per_tick: Fixed,
    /// Organization regained per tick out of battle.
    #[serde(with = "decimal_serde")]
    pub org_recovery_per_tick: Fixed,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            land_damage_per_tick: Fixed::from_num(40),
            land_org_damage_per_tick: Fixed::from_num(0.08),
            land_damage_scale: Fixed::from_num(1000),
            land_org_scale: Fixed::from_num(1000),
            naval_damage_per_tick: Fixed::from_num(30),
            naval_org_damage_per_tick: Fixed::from_num(0.06),
            naval_damage_scale: Fixed::from_num(1000),
            naval_org_scale: Fixed::from_num(1000),
            river_attack_multiplier: Fixed::from_num(0.75),
            landing_debuff_multiplier: HALF_DEFAULT,
            landing_debuff_ticks: 50,
            equipment_wear_per_tick: Fixed::from_num(0.002),
            org_recovery_per_tick: Fixed::from_num(0.01),
        }
    }
}

const HALF_DEFAULT: Fixed = crate::math::HALF;

/// Occupation thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OccupationConfig {
    /// Fraction of a group's regions a nation must occupy to occupy the group.
    #[serde(with = "decimal_serde")]
    pub group_occupation_ratio: Fixed,
}

impl Default for OccupationConfig {
    fn default() -> Self {
        Self {
            group_occupation_ratio: HALF_DEFAULT,
        }
    }
}

/// War cooperation dynamics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CooperationConfig {
    /// Upper bound, and the starting value of every nation.
    #[serde(with = "decimal_serde")]
    pub max: Fixed,
    /// Flat decay per fast tick while at war.
    #[serde(with = "decimal_serde")]
    pub decay_per_tick: Fixed,
    /// Extra decay scaled by the share of initial units lost.
    #[serde(with = "decimal_serde")]
    pub unit_loss_penalty: Fixed,
    /// Extra decay scaled by the share of initial cities lost.
    #[serde(with = "decimal_serde")]
    pub city_loss_penalty: Fixed,
    /// Extra decay scaled by the share of own regions occupied.
    #[serde(with = "decimal_serde")]
    pub occupation_penalty: Fixed,
    /// Recovery per fast tick at peace.
    #[serde(with = "decimal_serde")]
    pub recovery_per_tick: Fixed,
}

impl Default for CooperationConfig {
    fn default() -> Self {
        Self {
            max: Fixed::from_num(100),
            decay_per_tick: Fixed::from_num(0.02),
            unit_loss_penalty: Fixed::from_num(0.05),
            city_loss_penalty: Fixed::from_num(0.05),
            occupation_penalty: Fixed::from_num(0.05),
            recovery_per_tick: Fixed::from_num(0.05),
        }
    }
}

/// Civil war rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CivilWarConfig {
    /// Cooperation at or below this value triggers a civil war.
    #[serde(with = "decimal_serde")]
    pub threshold: Fixed,
    /// Share of the parent's groups the seceding cluster aims for.
    #[serde(with = "decimal_serde")]
    pub secession_fraction: Fixed,
    /// One-time cooperation boost granted to the parent.
    #[serde(with = "decimal_serde")]
    pub cooperation_boost: Fixed,
}

impl Default for CivilWarConfig {
    fn default() -> Self {
        Self {
            threshold: Fixed::ZERO,
            secession_fraction: Fixed::from_num(0.34),
            cooperation_boost: Fixed::from_num(40),
        }
    }
}

/// Surrender rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurrenderConfig {
    /// Consecutive surrender passes the losing condition must hold.
    pub grace_checks: u32,
}

impl Default for SurrenderConfig {
    fn default() -> Self {
        Self { grace_checks: 1 }
    }
}

/// Production, economy and transport capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductionConfig {
    /// Slow ticks between production rounds of a nation.
    pub interval_slow_ticks: u32,
    /// Unit cap per nation.
    pub max_units_per_nation: u32,
    /// Unit cap across the whole world.
    pub max_total_units: u32,
    /// Land units spawned at the capital regardless of territory.
    pub capital_base_spawn: u32,
    /// Extra capital spawns per owned, unoccupied group.
    #[serde(with = "decimal_serde")]
    pub capital_spawn_per_group: Fixed,
    /// Land units spawned at each owned, unoccupied city.
    pub city_spawn_count: u32,
    /// Every n-th land unit a nation spawns is a tank.
    pub tank_every: u32,
    /// Combat ship cap per nation.
    pub max_combat_ships: u32,
    /// Transport cap per nation.
    pub max_transports: u32,
    /// Land units a transport can carry.
    pub transport_capacity: u32,
    /// Income of one owned, unoccupied region per production round.
    pub region_income: Resources,
    /// Income multiplier for regions with a city, port or capital.
    #[serde(with = "decimal_serde")]
    pub city_income_multiplier: Fixed,
    /// Stockpile every nation starts with.
    pub starting_resources: Resources,
    /// Weapons consumed to restore one full equipment slot.
    #[serde(with = "decimal_serde")]
    pub weapons_per_fill: Fixed,
}

impl Default for ProductionConfig {
    fn default() -> Self {
        Self {
            interval_slow_ticks: 5,
            max_units_per_nation: 60,
            max_total_units: 600,
            capital_base_spawn: 1,
            capital_spawn_per_group: HALF_DEFAULT,
            city_spawn_count: 1,
            tank_every: 4,
            max_combat_ships: 6,
            max_transports: 3,
            transport_capacity: 4,
            region_income: Resources::new(2, 2, 400, 2),
            city_income_multiplier: Fixed::from_num(3),
            starting_resources: Resources::new(200, 200, 20_000, 200),
            weapons_per_fill: Fixed::from_num(10),
        }
    }
}

/// Statistics shared by every unit of one kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitStats {
    /// Manpower of a fresh unit.
    #[serde(with = "decimal_serde")]
    pub manpower: Fixed,
    /// Combat power multiplier.
    #[serde(with = "decimal_serde")]
    pub combat_power: Fixed,
    /// Milliseconds needed to cross one region.
    #[serde(with = "decimal_serde")]
    pub hop_ms: Fixed,
    /// Stockpile cost of producing one unit.
    pub cost: Resources,
}

/// Per-kind unit statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitStatsTable {
    /// Infantry division.
    pub infantry: UnitStats,
    /// Armored division.
    pub tank: UnitStats,
    /// Surface combatant.
    pub combat_ship: UnitStats,
    /// Troop transport.
    pub transport_ship: UnitStats,
}

impl UnitStatsTable {
    /// Stats for a unit kind.
    #[must_use]
    pub fn get(&self, kind: UnitKind) -> &UnitStats {
        match kind {
            UnitKind::Infantry => &self.infantry,
            UnitKind::Tank => &self.tank,
            UnitKind::CombatShip => &self.combat_ship,
            UnitKind::TransportShip => &self.transport_ship,
        }
    }

    /// Mutable stats for a unit kind.
    pub fn get_mut(&mut self, kind: UnitKind) -> &mut UnitStats {
        match kind {
            UnitKind::Infantry => &mut self.infantry,
            UnitKind::Tank => &mut self.tank,
            UnitKind::CombatShip => &mut self.combat_ship,
            UnitKind::TransportShip => &mut self.transport_ship,
        }
    }
}

impl Default for UnitStatsTable {
    fn default() -> Self {
        Self {
            infantry: UnitStats {
                manpower: Fixed::from_num(1000),
                combat_power: Fixed::ONE,
                hop_ms: Fixed::from_num(3000),
                cost: Resources::new(0, 0, 1000, 10),
            },
            tank: UnitStats {
                manpower: Fixed::from_num(600),
                combat_power: Fixed::from_num(2.5),
                hop_ms: Fixed::from_num(2000),
                cost: Resources::new(20, 10, 600, 10),
            },
            combat_ship: UnitStats {
                manpower: Fixed::from_num(800),
                combat_power: Fixed::from_num(2),
                hop_ms: Fixed::from_num(1500),
                cost: Resources::new(40, 20, 800, 10),
            },
            transport_ship: UnitStats {
                manpower: Fixed::from_num(300),
                combat_power: Fixed::from_num(0.1),
                hop_ms: Fixed::from_num(2000),
                cost: Resources::new(20, 10, 300, 0),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_clamps_ratios() {
        let mut config = SimConfig::default();
        config.movement.defense_ratio_intrusion = Fixed::from_num(3);
        config.occupation.group_occupation_ratio = Fixed::from_num(-1);
        let config = config.sanitized();
        assert_eq!(config.movement.defense_ratio_intrusion, Fixed::ONE);
        assert_eq!(config.occupation.group_occupation_ratio, Fixed::ZERO);
    }

    #[test]
    fn test_sanitize_orders_tick_ranges() {
        let mut config = SimConfig::default();
        config.diplomacy.war_eval_min_ticks = 0;
        config.diplomacy.war_eval_max_ticks = 0;
        let config = config.sanitized();
        assert_eq!(config.diplomacy.war_eval_min_ticks, 1);
        assert_eq!(config.diplomacy.war_eval_max_ticks, 1);

        let mut config = SimConfig::default();
        config.diplomacy.war_eval_min_ticks = 9;
        config.diplomacy.war_eval_max_ticks = 4;
        let config = config.sanitized();
        assert!(config.diplomacy.war_eval_min_ticks <= config.diplomacy.war_eval_max_ticks);
    }

    #[test]
    fn test_sanitize_keeps_ticks_positive() {
        let mut config = SimConfig::default();
        config.clock.fast_tick_ms = Fixed::ZERO;
        config.units.infantry.hop_ms = Fixed::from_num(-5);
        let config = config.sanitized();
        assert!(config.clock.fast_tick_ms > Fixed::ZERO);
        assert!(config.units.infantry.hop_ms > Fixed::ZERO);
    }

    #[test]
    fn test_from_ron_overrides_and_defaults() {
        let config = SimConfig::from_ron_str(
            "(clock: (fast_tick_ms: 50.0), diplomacy: (dominance_gap: 3))",
        )
        .unwrap();
        assert_eq!(config.clock.fast_tick_ms, Fixed::from_num(50));
        assert_eq!(config.clock.slow_tick_ms, Fixed::from_num(1000));
        assert_eq!(config.diplomacy.dominance_gap, 3);
        assert_eq!(config.production, ProductionConfig::default());
    }

    #[test]
    fn test_from_ron_rejects_garbage() {
        assert!(SimConfig::from_ron_str("(clock: [1, 2").is_err());
    }
}
