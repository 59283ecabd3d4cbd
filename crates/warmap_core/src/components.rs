//! Entity data definitions.
//!
//! Components are pure data with minimal behavior. Entities reference each
//! other only through ids; all lookups go through the arenas on
//! [`World`](crate::world::World).

use std::collections::{BTreeMap, BTreeSet};
use std::ops::{Add, AddAssign, Sub, SubAssign};

use serde::{Deserialize, Serialize};

use crate::ids::{GroupId, NationId, RegionId, UnitId};
use crate::math::{clamp_unit, decimal_serde, fixed_map_serde, fixed_serde, Fixed, Vec2Fixed};

// ============================================================================
// Regions
// ============================================================================

/// Terrain classification of a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Terrain {
    /// Ordinary land.
    #[default]
    Land,
    /// Open water, passable only by ships.
    Sea,
    /// Land with a river merged into it. Behaves as land everywhere.
    RiverLand,
}

impl Terrain {
    /// Whether land units can stand here.
    #[must_use]
    pub const fn is_land(self) -> bool {
        !matches!(self, Self::Sea)
    }
}

/// The single building a region may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Building {
    /// Seat of a nation's government.
    Capital,
    /// Production center.
    City,
    /// Harbor; lets ships enter the region.
    Port,
}

/// Directed adjacency entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Neighbor {
    /// Adjacent region.
    pub region: RegionId,
    /// Whether crossing into `region` fords a river.
    pub river_crossing: bool,
}

/// Smallest territory-control unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    /// Region id (equal to its arena index).
    pub id: RegionId,
    /// Terrain kind.
    pub terrain: Terrain,
    /// Center point, used for spacing decisions.
    pub center: Vec2Fixed,
    /// Adjacent regions, sorted by id.
    pub neighbors: Vec<Neighbor>,
    /// Optional building.
    pub building: Option<Building>,
    /// Owning group, `None` for sea.
    pub group: Option<GroupId>,
}

impl Region {
    /// Whether the region has a city-like building (capital or city).
    #[must_use]
    pub fn has_city(&self) -> bool {
        matches!(self.building, Some(Building::City | Building::Capital))
    }

    /// Whether the region is a port.
    #[must_use]
    pub fn is_port(&self) -> bool {
        self.building == Some(Building::Port)
    }

    /// Whether the hop from this region into `to` crosses a river.
    #[must_use]
    pub fn crosses_river_to(&self, to: RegionId) -> bool {
        self.neighbors
            .iter()
            .any(|n| n.region == to && n.river_crossing)
    }
}

/// Administrative cluster of regions owned by one nation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegionGroup {
    /// Group id.
    pub id: GroupId,
    /// Owning nation.
    pub owner: NationId,
    /// Member regions in generation order.
    pub regions: Vec<RegionId>,
    /// Near (core) versus distant territory.
    pub core: bool,
}

// ============================================================================
// Nations
// ============================================================================

/// Stockpile or flow of the four strategic resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Resources {
    /// Steel.
    #[serde(with = "decimal_serde")]
    pub steel: Fixed,
    /// Fuel.
    #[serde(with = "decimal_serde")]
    pub fuel: Fixed,
    /// Recruitable manpower.
    #[serde(with = "decimal_serde")]
    pub manpower: Fixed,
    /// Weapons stock.
    #[serde(with = "decimal_serde")]
    pub weapons: Fixed,
}

impl Resources {
    /// Create a bundle from whole amounts.
    #[must_use]
    pub fn new(steel: i32, fuel: i32, manpower: i32, weapons: i32) -> Self {
        Self {
            steel: Fixed::from_num(steel),
            fuel: Fixed::from_num(fuel),
            manpower: Fixed::from_num(manpower),
            weapons: Fixed::from_num(weapons),
        }
    }

    /// Empty bundle.
    pub const ZERO: Self = Self {
        steel: Fixed::ZERO,
        fuel: Fixed::ZERO,
        manpower: Fixed::ZERO,
        weapons: Fixed::ZERO,
    };

    /// Multiply every component by `factor`.
    #[must_use]
    pub fn scaled(self, factor: Fixed) -> Self {
        Self {
            steel: self.steel.saturating_mul(factor),
            fuel: self.fuel.saturating_mul(factor),
            manpower: self.manpower.saturating_mul(factor),
            weapons: self.weapons.saturating_mul(factor),
        }
    }

    /// Whether this stockpile can pay the steel, fuel and manpower of `cost`.
    ///
    /// Weapons are never a hard requirement: a short stock only lowers the
    /// equipment fill of what gets built.
    #[must_use]
    pub fn covers(&self, cost: &Self) -> bool {
        self.steel >= cost.steel && self.fuel >= cost.fuel && self.manpower >= cost.manpower
    }
}

impl Add for Resources {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            steel: self.steel.saturating_add(rhs.steel),
            fuel: self.fuel.saturating_add(rhs.fuel),
            manpower: self.manpower.saturating_add(rhs.manpower),
            weapons: self.weapons.saturating_add(rhs.weapons),
        }
    }
}

impl AddAssign for Resources {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Resources {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            steel: self.steel.saturating_sub(rhs.steel),
            fuel: self.fuel.saturating_sub(rhs.fuel),
            manpower: self.manpower.saturating_sub(rhs.manpower),
            weapons: self.weapons.saturating_sub(rhs.weapons),
        }
    }
}

impl SubAssign for Resources {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

/// A sovereign participant in the simulation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Nation {
    /// Nation id.
    pub id: NationId,
    /// Display name.
    pub name: String,
    /// Current capital, if any.
    pub capital: Option<RegionId>,
    /// Owned groups.
    pub groups: BTreeSet<GroupId>,
    /// Current stockpile.
    pub resources: Resources,
    /// Income applied on the last production round.
    pub resource_flow: Resources,
    /// Willingness to keep fighting, in `[0, cooperation.max]`.
    #[serde(with = "fixed_serde")]
    pub war_cooperation: Fixed,
    /// Consecutive surrender passes the losing condition held.
    pub surrender_accumulator: u32,
    /// Unit count when the nation entered the simulation.
    pub initial_units: u32,
    /// City count when the nation entered the simulation.
    pub initial_cities: u32,
    /// Slow tick of the next production round.
    pub next_production_tick: u64,
    /// Slow tick of the next war declaration evaluation.
    pub next_war_eval_tick: u64,
    /// Land units spawned so far, drives the infantry/tank mix.
    pub spawn_counter: u32,
    /// Nation this one seceded from.
    pub parent: Option<NationId>,
    /// Set once the nation has lost all territory.
    pub eliminated: bool,
}

impl Nation {
    /// Whether the nation still takes part in the simulation.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        !self.eliminated
    }
}

// ============================================================================
// Units
// ============================================================================

/// Movement domain of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Domain {
    /// Moves over land regions.
    Land,
    /// Moves over sea regions and own ports.
    Naval,
}

/// Kind of military unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    /// Infantry division.
    Infantry,
    /// Armored division.
    Tank,
    /// Surface combatant; escorts and fights.
    CombatShip,
    /// Troop transport; carries land units.
    TransportShip,
}

impl UnitKind {
    /// Every unit kind.
    pub const ALL: [Self; 4] = [
        Self::Infantry,
        Self::Tank,
        Self::CombatShip,
        Self::TransportShip,
    ];

    /// Domain this kind moves in.
    #[must_use]
    pub const fn domain(self) -> Domain {
        match self {
            Self::Infantry | Self::Tank => Domain::Land,
            Self::CombatShip | Self::TransportShip => Domain::Naval,
        }
    }

    /// Equipment slots a fresh unit of this kind carries.
    #[must_use]
    pub fn equipment_keys(self) -> &'static [EquipmentKey] {
        match self {
            Self::Infantry => &[EquipmentKey::SmallArms, EquipmentKey::Artillery],
            Self::Tank => &[EquipmentKey::Armor, EquipmentKey::SmallArms],
            Self::CombatShip => &[EquipmentKey::NavalGuns, EquipmentKey::Hull],
            Self::TransportShip => &[EquipmentKey::Hull],
        }
    }
}

/// Equipment category held in a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EquipmentKey {
    /// Rifles and machine guns.
    SmallArms,
    /// Field guns.
    Artillery,
    /// Tanks and armored vehicles.
    Armor,
    /// Ship-mounted guns.
    NavalGuns,
    /// Hull integrity.
    Hull,
}

/// One equipment slot and how full it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EquipmentSlot {
    /// Equipment category.
    pub key: EquipmentKey,
    /// Fill ratio in `[0, 1]`.
    #[serde(with = "fixed_serde")]
    pub fill: Fixed,
}

/// A single graph hop in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hop {
    /// Region the hop starts from.
    pub from: RegionId,
    /// Region the hop ends in.
    pub to: RegionId,
}

/// Movement state of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MovementState {
    /// Final destination.
    pub target: Option<RegionId>,
    /// Hop currently being crossed.
    pub hop: Option<Hop>,
    /// Milliseconds accumulated toward the current hop.
    #[serde(with = "fixed_serde")]
    pub progress_ms: Fixed,
}

impl MovementState {
    /// Drop the hop and zero progress, keeping the target.
    pub fn reset_progress(&mut self) {
        self.hop = None;
        self.progress_ms = Fixed::ZERO;
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Role assigned by target assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum UnitRole {
    /// No role yet.
    #[default]
    Unassigned,
    /// Land unit guarding own territory.
    Defense,
    /// Land unit taking enemy ground.
    Occupation,
    /// Combat ship guarding home ports.
    HomeDefense,
    /// Combat ship hunting or escorting.
    Offense,
    /// Transport shuttling a landing.
    Transport,
}

/// Land units carried by a transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Cargo {
    /// Embarked units in loading order.
    pub units: Vec<UnitId>,
    /// Port where the cargo was loaded.
    pub origin: Option<RegionId>,
}

/// Temporary strength multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Debuff {
    /// Strength multiplier while active.
    #[serde(with = "fixed_serde")]
    pub multiplier: Fixed,
    /// Fast tick at which the debuff lapses.
    pub expires_tick: u64,
}

/// A military unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Unit {
    /// Unit id.
    pub id: UnitId,
    /// Owning nation.
    pub owner: NationId,
    /// Current region (a carried unit follows its transport).
    pub region: RegionId,
    /// Unit kind.
    pub kind: UnitKind,
    /// Equipment slots.
    pub equipment: Vec<EquipmentSlot>,
    /// Organization; the unit breaks at zero.
    #[serde(with = "fixed_serde")]
    pub organization: Fixed,
    /// Manpower; the unit is destroyed at zero.
    #[serde(with = "fixed_serde")]
    pub manpower: Fixed,
    /// Combat power multiplier.
    #[serde(with = "fixed_serde")]
    pub combat_power: Fixed,
    /// Movement state.
    pub movement: MovementState,
    /// Role from the last target assignment.
    pub role: UnitRole,
    /// Transport this unit rides on.
    pub embarked_on: Option<UnitId>,
    /// Land unit waiting at a port for a transport.
    pub embark_request: bool,
    /// Carried units (transports only).
    pub cargo: Cargo,
    /// Land region a loaded transport is ordered to put troops ashore at.
    pub landing_order: Option<RegionId>,
    /// Forced-landing penalty.
    pub debuff: Option<Debuff>,
}

impl Unit {
    /// Domain of this unit.
    #[must_use]
    pub fn domain(&self) -> Domain {
        self.kind.domain()
    }

    /// A unit is alive while both manpower and organization are positive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.manpower > Fixed::ZERO && self.organization > Fixed::ZERO
    }

    /// Whether the unit rides on a transport.
    #[must_use]
    pub fn is_embarked(&self) -> bool {
        self.embarked_on.is_some()
    }

    /// Average equipment fill, one when the unit has no slots.
    #[must_use]
    pub fn average_fill(&self) -> Fixed {
        if self.equipment.is_empty() {
            return Fixed::ONE;
        }
        let total = self
            .equipment
            .iter()
            .fold(Fixed::ZERO, |acc, slot| acc + clamp_unit(slot.fill));
        total / Fixed::from_num(self.equipment.len() as u32)
    }

    /// Assign a new destination. Progress resets only if the target changes.
    pub fn set_target(&mut self, target: Option<RegionId>) {
        if self.movement.target != target {
            self.movement.target = target;
            self.movement.reset_progress();
        }
    }

    /// Strength multiplier from an active debuff at `tick`.
    #[must_use]
    pub fn debuff_multiplier(&self, tick: u64) -> Fixed {
        match self.debuff {
            Some(debuff) if tick < debuff.expires_tick => debuff.multiplier,
            _ => Fixed::ONE,
        }
    }
}

// ============================================================================
// Wars, battles, occupation
// ============================================================================

/// Unordered nation pair, stored lower id first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WarPair {
    low: NationId,
    high: NationId,
}

impl WarPair {
    /// Normalize a pair. `WarPair::new(a, b) == WarPair::new(b, a)`.
    #[must_use]
    pub fn new(a: NationId, b: NationId) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    /// Lower nation id.
    #[must_use]
    pub const fn low(self) -> NationId {
        self.low
    }

    /// Higher nation id.
    #[must_use]
    pub const fn high(self) -> NationId {
        self.high
    }

    /// Whether `nation` is a side of this pair.
    #[must_use]
    pub fn involves(self, nation: NationId) -> bool {
        self.low == nation || self.high == nation
    }

    /// The side opposite `nation`, if `nation` is in the pair.
    #[must_use]
    pub fn other(self, nation: NationId) -> Option<NationId> {
        if nation == self.low {
            Some(self.high)
        } else if nation == self.high {
            Some(self.low)
        } else {
            None
        }
    }
}

/// An active war.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct War {
    /// Normalized participants.
    pub pair: WarPair,
    /// Side that declared.
    pub aggressor: NationId,
    /// Fast tick of the declaration.
    pub start_tick: u64,
    /// Declared by test or scenario setup rather than diplomacy.
    pub is_test: bool,
    /// Damage dealt by each side.
    #[serde(with = "fixed_map_serde")]
    pub contributions: BTreeMap<NationId, Fixed>,
}

impl War {
    /// Damage dealt by `nation` in this war.
    #[must_use]
    pub fn contribution_of(&self, nation: NationId) -> Fixed {
        self.contributions
            .get(&nation)
            .copied()
            .unwrap_or(Fixed::ZERO)
    }
}

/// Key of a battle record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BattleKey {
    /// Contested region.
    pub region: RegionId,
    /// Attacking nation.
    pub attacker: NationId,
    /// Defending nation.
    pub defender: NationId,
}

/// An ongoing engagement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Battle {
    /// Where and between whom.
    pub key: BattleKey,
    /// Land or naval.
    pub domain: Domain,
    /// Fast tick the battle began.
    pub started_tick: u64,
    /// Last fast tick the battle was fought.
    pub last_active_tick: u64,
}

/// Enemy military control of regions and groups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct OccupationState {
    /// Region to occupier.
    pub regions: BTreeMap<RegionId, NationId>,
    /// Group to occupier.
    pub groups: BTreeMap<GroupId, NationId>,
    /// Bumped whenever either map changes.
    pub version: u64,
}

impl OccupationState {
    /// Occupier of a region.
    #[must_use]
    pub fn region_occupier(&self, region: RegionId) -> Option<NationId> {
        self.regions.get(&region).copied()
    }

    /// Occupier of a group.
    #[must_use]
    pub fn group_occupier(&self, group: GroupId) -> Option<NationId> {
        self.groups.get(&group).copied()
    }

    /// Whether a region is occupied by anyone.
    #[must_use]
    pub fn is_region_occupied(&self, region: RegionId) -> bool {
        self.regions.contains_key(&region)
    }
}
