//! The world graph: authoritative state plus derived views.
//!
//! [`World`] owns every region, group, nation, unit, war and battle. Topology
//! never changes after [`WorldBuilder::build`]; ownership, buildings, wars and
//! units do, and each kind of change bumps a counter in [`Versions`] so that
//! cached views know when to rebuild.

use std::cell::RefCell;
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::cache::{PathCaches, RegionsByNation, Views};
use crate::components::{
    Battle, BattleKey, Building, Cargo, Domain, EquipmentSlot, MovementState, Nation, Neighbor,
    OccupationState, Region, RegionGroup, Resources, Terrain, Unit, UnitKind, UnitRole, War,
    WarPair,
};
use crate::config::SimConfig;
use crate::error::{Result, SimError};
use crate::ids::{GroupId, NationId, RegionId, UnitId};
use crate::math::{Fixed, Vec2Fixed};

/// Monotonic change counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Versions {
    /// Group ownership changed.
    pub territory: u64,
    /// A building was added, removed or converted.
    pub building: u64,
    /// Units spawned, died or changed owner.
    pub units: u64,
    /// A war started or ended.
    pub wars: u64,
}

/// Adjacency tables built once from the generated graph.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    /// Land-to-land neighbors of every region.
    pub land_neighbors: Vec<Vec<RegionId>>,
    /// Neighbors across an edge that touches the sea.
    pub naval_neighbors: Vec<Vec<RegionId>>,
    /// Land regions with at least one sea neighbor.
    pub coastal: Vec<bool>,
    /// Groups sharing a land edge with each group.
    pub group_neighbors: Vec<BTreeSet<GroupId>>,
}

/// The complete simulation state.
#[derive(Debug, Clone)]
pub struct World {
    pub(crate) regions: Vec<Region>,
    pub(crate) groups: Vec<RegionGroup>,
    pub(crate) nations: Vec<Nation>,
    pub(crate) units: BTreeMap<UnitId, Unit>,
    pub(crate) wars: BTreeMap<WarPair, War>,
    pub(crate) battles: BTreeMap<BattleKey, Battle>,
    pub(crate) occupation: OccupationState,
    pub(crate) versions: Versions,
    pub(crate) tick: u64,
    pub(crate) slow_tick: u64,
    pub(crate) elapsed_ms: Fixed,
    pub(crate) config: SimConfig,
    pub(crate) rng: ChaCha8Rng,
    pub(crate) next_unit_id: u32,
    pub(crate) topology: Arc<Topology>,
    pub(crate) views: RefCell<Views>,
    pub(crate) paths: RefCell<PathCaches>,
}

impl World {
    // ------------------------------------------------------------------
    // Clock state
    // ------------------------------------------------------------------

    /// Fast ticks run so far.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Slow ticks run so far.
    #[must_use]
    pub const fn slow_tick(&self) -> u64 {
        self.slow_tick
    }

    /// Scaled game time consumed by fast ticks.
    #[must_use]
    pub const fn elapsed_ms(&self) -> Fixed {
        self.elapsed_ms
    }

    /// Sanitized tuning constants.
    #[must_use]
    pub const fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Change counters.
    #[must_use]
    pub const fn versions(&self) -> Versions {
        self.versions
    }

    // ------------------------------------------------------------------
    // Entity lookups
    // ------------------------------------------------------------------

    /// All regions, indexed by id.
    #[must_use]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Look up a region.
    #[must_use]
    pub fn region(&self, id: RegionId) -> Option<&Region> {
        self.regions.get(id.index())
    }

    /// All groups, indexed by id.
    #[must_use]
    pub fn groups(&self) -> &[RegionGroup] {
        &self.groups
    }

    /// Look up a group.
    #[must_use]
    pub fn group(&self, id: GroupId) -> Option<&RegionGroup> {
        self.groups.get(id.index())
    }

    /// All nations, eliminated ones included.
    #[must_use]
    pub fn nations(&self) -> &[Nation] {
        &self.nations
    }

    /// Look up a nation.
    #[must_use]
    pub fn nation(&self, id: NationId) -> Option<&Nation> {
        self.nations.get(id.index())
    }

    /// Ids of nations that are not eliminated, ascending.
    #[must_use]
    pub fn alive_nations(&self) -> Vec<NationId> {
        self.nations
            .iter()
            .filter(|n| n.is_alive())
            .map(|n| n.id)
            .collect()
    }

    /// Units in id order.
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    /// Look up a unit.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    /// Number of units in the world.
    #[must_use]
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Number of units a nation owns.
    #[must_use]
    pub fn units_of(&self, nation: NationId) -> usize {
        self.units.values().filter(|u| u.owner == nation).count()
    }

    /// Active wars in pair order.
    pub fn wars(&self) -> impl Iterator<Item = &War> {
        self.wars.values()
    }

    /// War between two nations, in either order.
    #[must_use]
    pub fn war(&self, a: NationId, b: NationId) -> Option<&War> {
        self.wars.get(&WarPair::new(a, b))
    }

    /// Whether two nations are at war.
    #[must_use]
    pub fn at_war(&self, a: NationId, b: NationId) -> bool {
        a != b && self.wars.contains_key(&WarPair::new(a, b))
    }

    /// Whether a nation is at war with anyone.
    #[must_use]
    pub fn is_at_war(&self, nation: NationId) -> bool {
        self.wars.keys().any(|pair| pair.involves(nation))
    }

    /// Ongoing battles in key order.
    pub fn battles(&self) -> impl Iterator<Item = &Battle> {
        self.battles.values()
    }

    /// Current occupation state.
    #[must_use]
    pub const fn occupation(&self) -> &OccupationState {
        &self.occupation
    }

    /// Owning nation of a region, `None` for sea.
    #[must_use]
    pub fn owner_of(&self, region: RegionId) -> Option<NationId> {
        let group = self.regions.get(region.index())?.group?;
        self.groups.get(group.index()).map(|g| g.owner)
    }

    /// Static adjacency tables.
    #[must_use]
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Whether a land region touches the sea.
    #[must_use]
    pub fn is_coastal(&self, region: RegionId) -> bool {
        self.topology
            .coastal
            .get(region.index())
            .copied()
            .unwrap_or(false)
    }

    /// Neighbors a unit of `domain` may step to from `region`.
    #[must_use]
    pub fn domain_neighbors(&self, domain: Domain, region: RegionId) -> &[RegionId] {
        let table = match domain {
            Domain::Land => &self.topology.land_neighbors,
            Domain::Naval => &self.topology.naval_neighbors,
        };
        table.get(region.index()).map_or(&[], Vec::as_slice)
    }

    /// Land regions owned by a nation, ascending.
    #[must_use]
    pub fn regions_of(&self, nation: NationId) -> Vec<RegionId> {
        let Some(n) = self.nation(nation) else {
            return Vec::new();
        };
        let mut regions: Vec<RegionId> = n
            .groups
            .iter()
            .filter_map(|g| self.group(*g))
            .flat_map(|g| g.regions.iter().copied())
            .collect();
        regions.sort_unstable();
        regions
    }

    // ------------------------------------------------------------------
    // Version-gated views
    // ------------------------------------------------------------------

    /// Owner of every region.
    #[must_use]
    pub fn region_owners(&self) -> Arc<Vec<Option<NationId>>> {
        let stamp = self.versions.territory;
        self.views
            .borrow_mut()
            .region_owners
            .get_or_refresh(stamp, || {
                self.regions.iter().map(|r| self.owner_of(r.id)).collect()
            })
    }

    /// Land regions of each nation that touch land owned by another nation.
    #[must_use]
    pub fn border_regions(&self) -> Arc<RegionsByNation> {
        let owners = self.region_owners();
        let stamp = self.versions.territory;
        self.views
            .borrow_mut()
            .border_regions
            .get_or_refresh(stamp, || {
                let mut borders = RegionsByNation::new();
                for region in &self.regions {
                    let Some(owner) = owners[region.id.index()] else {
                        continue;
                    };
                    let on_border = self.topology.land_neighbors[region.id.index()]
                        .iter()
                        .any(|n| owners[n.index()].is_some_and(|o| o != owner));
                    if on_border {
                        borders.entry(owner).or_default().push(region.id);
                    }
                }
                borders
            })
    }

    /// Nation pairs that share a land border.
    #[must_use]
    pub fn adjacent_pairs(&self) -> Arc<BTreeSet<WarPair>> {
        let owners = self.region_owners();
        let stamp = self.versions.territory;
        self.views
            .borrow_mut()
            .adjacent_pairs
            .get_or_refresh(stamp, || {
                let mut pairs = BTreeSet::new();
                for region in &self.regions {
                    let Some(owner) = owners[region.id.index()] else {
                        continue;
                    };
                    for n in &self.topology.land_neighbors[region.id.index()] {
                        if let Some(other) = owners[n.index()] {
                            if other != owner {
                                pairs.insert(WarPair::new(owner, other));
                            }
                        }
                    }
                }
                pairs
            })
    }

    /// Capital and city regions of each nation.
    #[must_use]
    pub fn city_targets(&self) -> Arc<RegionsByNation> {
        let owners = self.region_owners();
        let stamp = (self.versions.territory, self.versions.building);
        self.views
            .borrow_mut()
            .city_targets
            .get_or_refresh(stamp, || self.regions_by_building(&owners, Region::has_city))
    }

    /// Port regions of each nation.
    #[must_use]
    pub fn port_targets(&self) -> Arc<RegionsByNation> {
        let owners = self.region_owners();
        let stamp = (self.versions.territory, self.versions.building);
        self.views
            .borrow_mut()
            .port_targets
            .get_or_refresh(stamp, || self.regions_by_building(&owners, Region::is_port))
    }

    /// Enemies of every nation currently at war.
    #[must_use]
    pub fn war_adjacency(&self) -> Arc<BTreeMap<NationId, BTreeSet<NationId>>> {
        let stamp = self.versions.wars;
        self.views
            .borrow_mut()
            .war_adjacency
            .get_or_refresh(stamp, || {
                let mut enemies: BTreeMap<NationId, BTreeSet<NationId>> = BTreeMap::new();
                for pair in self.wars.keys() {
                    enemies.entry(pair.low()).or_default().insert(pair.high());
                    enemies.entry(pair.high()).or_default().insert(pair.low());
                }
                enemies
            })
    }

    fn regions_by_building(
        &self,
        owners: &[Option<NationId>],
        keep: impl Fn(&Region) -> bool,
    ) -> RegionsByNation {
        let mut by_nation = RegionsByNation::new();
        for region in self.regions.iter().filter(|r| keep(r)) {
            if let Some(owner) = owners[region.id.index()] {
                by_nation.entry(owner).or_default().push(region.id);
            }
        }
        by_nation
    }

    // ------------------------------------------------------------------
    // Mutation helpers shared by the systems
    // ------------------------------------------------------------------

    pub(crate) fn nation_mut(&mut self, id: NationId) -> Option<&mut Nation> {
        self.nations.get_mut(id.index())
    }

    pub(crate) fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    pub(crate) fn unit_ids(&self) -> Vec<UnitId> {
        self.units.keys().copied().collect()
    }

    /// Create a fresh unit with full equipment, organization and manpower.
    pub(crate) fn spawn_unit(&mut self, owner: NationId, kind: UnitKind, region: RegionId) -> UnitId {
        let id = UnitId(self.next_unit_id);
        self.next_unit_id += 1;
        let unit = new_unit(&self.config, id, owner, kind, region);
        self.units.insert(id, unit);
        self.versions.units += 1;
        id
    }

    /// Remove a unit. A transport takes its cargo down with it.
    ///
    /// Returns the ids of every unit removed.
    pub(crate) fn remove_unit(&mut self, id: UnitId) -> Vec<UnitId> {
        let Some(unit) = self.units.remove(&id) else {
            return Vec::new();
        };
        let mut removed = vec![id];
        for carried in &unit.cargo.units {
            if self.units.remove(carried).is_some() {
                removed.push(*carried);
            }
        }
        if let Some(transport) = unit.embarked_on {
            if let Some(t) = self.units.get_mut(&transport) {
                t.cargo.units.retain(|u| *u != id);
            }
        }
        self.versions.units += 1;
        removed
    }

    /// Hand a group to a new owner.
    pub(crate) fn transfer_group(&mut self, group: GroupId, to: NationId) {
        let Some(g) = self.groups.get_mut(group.index()) else {
            return;
        };
        let from = g.owner;
        if from == to {
            return;
        }
        g.owner = to;
        if let Some(old) = self.nations.get_mut(from.index()) {
            old.groups.remove(&group);
        }
        if let Some(new) = self.nations.get_mut(to.index()) {
            new.groups.insert(group);
        }
        self.versions.territory += 1;
    }

    /// Register a war. Returns `false` if the pair was already at war.
    pub(crate) fn register_war(&mut self, aggressor: NationId, defender: NationId, is_test: bool) -> bool {
        if aggressor == defender {
            return false;
        }
        let pair = WarPair::new(aggressor, defender);
        if self.wars.contains_key(&pair) {
            return false;
        }
        let contributions = [(pair.low(), Fixed::ZERO), (pair.high(), Fixed::ZERO)]
            .into_iter()
            .collect();
        self.wars.insert(
            pair,
            War {
                pair,
                aggressor,
                start_tick: self.tick,
                is_test,
                contributions,
            },
        );
        self.versions.wars += 1;
        true
    }

    /// Remove every war a nation takes part in.
    pub(crate) fn end_wars_of(&mut self, nation: NationId) -> Vec<WarPair> {
        let ended: Vec<WarPair> = self
            .wars
            .keys()
            .filter(|p| p.involves(nation))
            .copied()
            .collect();
        for pair in &ended {
            self.wars.remove(pair);
        }
        if !ended.is_empty() {
            self.versions.wars += 1;
        }
        ended
    }

    // ------------------------------------------------------------------
    // Determinism
    // ------------------------------------------------------------------

    /// Hash of all mutable state.
    ///
    /// Two worlds built from the same input and seed and stepped the same way
    /// produce the same hash.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        self.slow_tick.hash(&mut hasher);
        self.elapsed_ms.to_bits().hash(&mut hasher);
        self.next_unit_id.hash(&mut hasher);

        for region in &self.regions {
            region.building.hash(&mut hasher);
        }
        for group in &self.groups {
            group.owner.hash(&mut hasher);
        }
        self.nations.hash(&mut hasher);

        self.units.len().hash(&mut hasher);
        for unit in self.units.values() {
            unit.hash(&mut hasher);
        }

        for war in self.wars.values() {
            war.hash(&mut hasher);
        }
        for battle in self.battles.values() {
            battle.hash(&mut hasher);
        }
        self.occupation.hash(&mut hasher);

        hasher.finish()
    }
}

pub(crate) fn new_unit(
    config: &SimConfig,
    id: UnitId,
    owner: NationId,
    kind: UnitKind,
    region: RegionId,
) -> Unit {
    let stats = config.units.get(kind);
    Unit {
        id,
        owner,
        region,
        kind,
        equipment: kind
            .equipment_keys()
            .iter()
            .map(|key| EquipmentSlot {
                key: *key,
                fill: Fixed::ONE,
            })
            .collect(),
        organization: Fixed::ONE,
        manpower: stats.manpower,
        combat_power: stats.combat_power,
        movement: MovementState::default(),
        role: UnitRole::Unassigned,
        embarked_on: None,
        embark_request: false,
        cargo: Cargo::default(),
        landing_order: None,
        debuff: None,
    }
}

/// Assembles and validates a [`World`] from a generated map.
///
/// # Example
///
/// ```
/// use warmap_core::prelude::*;
///
/// let mut builder = WorldBuilder::new(SimConfig::default(), 7);
/// let a = builder.add_region(Terrain::Land, Vec2Fixed::from_ints(0, 0));
/// let b = builder.add_region(Terrain::Land, Vec2Fixed::from_ints(1, 0));
/// builder.connect(a, b, false).unwrap();
/// let red = builder.add_nation("Red");
/// let blue = builder.add_nation("Blue");
/// builder.add_group(red, &[a], true).unwrap();
/// builder.add_group(blue, &[b], true).unwrap();
/// builder.add_unit(red, UnitKind::Infantry, a).unwrap();
///
/// let world = builder.build().unwrap();
/// assert_eq!(world.owner_of(b), Some(blue));
/// assert_eq!(world.unit_count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct WorldBuilder {
    config: SimConfig,
    seed: u64,
    regions: Vec<Region>,
    groups: Vec<RegionGroup>,
    nations: Vec<(String, Option<RegionId>)>,
    units: Vec<(NationId, UnitKind, RegionId)>,
    wars: Vec<(NationId, NationId)>,
}

impl WorldBuilder {
    /// Start an empty map.
    #[must_use]
    pub fn new(config: SimConfig, seed: u64) -> Self {
        Self {
            config,
            seed,
            regions: Vec::new(),
            groups: Vec::new(),
            nations: Vec::new(),
            units: Vec::new(),
            wars: Vec::new(),
        }
    }

    /// Add a region and return its id.
    pub fn add_region(&mut self, terrain: Terrain, center: Vec2Fixed) -> RegionId {
        let id = RegionId(self.regions.len() as u32);
        self.regions.push(Region {
            id,
            terrain,
            center,
            neighbors: Vec::new(),
            building: None,
            group: None,
        });
        id
    }

    /// Connect two regions in both directions. Connecting twice is a no-op.
    ///
    /// # Errors
    ///
    /// Fails on unknown ids or a self-loop.
    pub fn connect(&mut self, a: RegionId, b: RegionId, river_crossing: bool) -> Result<()> {
        self.check_region(a)?;
        self.check_region(b)?;
        if a == b {
            return Err(SimError::SelfLoop(a));
        }
        for (from, to) in [(a, b), (b, a)] {
            let neighbors = &mut self.regions[from.index()].neighbors;
            if !neighbors.iter().any(|n| n.region == to) {
                neighbors.push(Neighbor {
                    region: to,
                    river_crossing,
                });
            }
        }
        Ok(())
    }

    /// Place a building on a region, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Fails on an unknown region.
    pub fn set_building(&mut self, region: RegionId, building: Building) -> Result<()> {
        self.check_region(region)?;
        self.regions[region.index()].building = Some(building);
        Ok(())
    }

    /// Add a nation and return its id.
    pub fn add_nation(&mut self, name: impl Into<String>) -> NationId {
        let id = NationId(self.nations.len() as u32);
        self.nations.push((name.into(), None));
        id
    }

    /// Add a group of land regions owned by `owner`.
    ///
    /// # Errors
    ///
    /// Fails on unknown ids, an empty region list, a sea region, or a region
    /// that already belongs to a group.
    pub fn add_group(&mut self, owner: NationId, regions: &[RegionId], core: bool) -> Result<GroupId> {
        self.check_nation(owner)?;
        let id = GroupId(self.groups.len() as u32);
        if regions.is_empty() {
            return Err(SimError::EmptyGroup(id));
        }
        for &region in regions {
            self.check_region(region)?;
            let r = &self.regions[region.index()];
            if !r.terrain.is_land() {
                return Err(SimError::SeaRegionInGroup(region));
            }
            if let Some(first) = r.group {
                return Err(SimError::RegionInTwoGroups {
                    region,
                    first,
                    second: id,
                });
            }
            if regions.iter().filter(|other| **other == region).count() > 1 {
                return Err(SimError::RegionInTwoGroups {
                    region,
                    first: id,
                    second: id,
                });
            }
        }
        for &region in regions {
            self.regions[region.index()].group = Some(id);
        }
        self.groups.push(RegionGroup {
            id,
            owner,
            regions: regions.to_vec(),
            core,
        });
        Ok(id)
    }

    /// Make `region` the capital of `nation`. Ownership is checked on build.
    ///
    /// # Errors
    ///
    /// Fails on unknown ids.
    pub fn set_capital(&mut self, nation: NationId, region: RegionId) -> Result<()> {
        self.check_nation(nation)?;
        self.check_region(region)?;
        self.nations[nation.index()].1 = Some(region);
        self.regions[region.index()].building = Some(Building::Capital);
        Ok(())
    }

    /// Place a starting unit. Terrain is checked on build.
    ///
    /// # Errors
    ///
    /// Fails on unknown ids.
    pub fn add_unit(&mut self, owner: NationId, kind: UnitKind, region: RegionId) -> Result<UnitId> {
        self.check_nation(owner)?;
        self.check_region(region)?;
        let id = UnitId(self.units.len() as u32);
        self.units.push((owner, kind, region));
        Ok(id)
    }

    /// Start the world with two nations already at war.
    ///
    /// Such wars are flagged `is_test` and do not drain cooperation.
    ///
    /// # Errors
    ///
    /// Fails on unknown nations.
    pub fn add_war(&mut self, aggressor: NationId, defender: NationId) -> Result<()> {
        self.check_nation(aggressor)?;
        self.check_nation(defender)?;
        self.wars.push((aggressor, defender));
        Ok(())
    }

    /// Validate the map and produce a world.
    ///
    /// # Errors
    ///
    /// Fails if a land region is ungrouped, a capital is not owned land of
    /// its nation, or a unit stands on terrain its domain cannot hold.
    pub fn build(self) -> Result<World> {
        let config = self.config.sanitized();
        let mut regions = self.regions;
        for region in &mut regions {
            region.neighbors.sort_by_key(|n| n.region);
            if region.terrain.is_land() && region.group.is_none() {
                return Err(SimError::UngroupedRegion(region.id));
            }
        }

        let owner_of = |region: RegionId| -> Option<NationId> {
            regions[region.index()]
                .group
                .map(|g| self.groups[g.index()].owner)
        };

        let mut nations = Vec::with_capacity(self.nations.len());
        for (index, (name, capital)) in self.nations.into_iter().enumerate() {
            let id = NationId(index as u32);
            if let Some(cap) = capital {
                if owner_of(cap) != Some(id) {
                    return Err(SimError::InvalidCapital {
                        nation: id,
                        region: cap,
                    });
                }
            }
            nations.push(Nation {
                id,
                name,
                capital,
                groups: BTreeSet::new(),
                resources: config.production.starting_resources,
                resource_flow: Resources::ZERO,
                war_cooperation: config.cooperation.max,
                surrender_accumulator: 0,
                initial_units: 0,
                initial_cities: 0,
                next_production_tick: u64::from(config.production.interval_slow_ticks),
                next_war_eval_tick: 0,
                spawn_counter: 0,
                parent: None,
                eliminated: false,
            });
        }
        for group in &self.groups {
            nations[group.owner.index()].groups.insert(group.id);
            let cities = group
                .regions
                .iter()
                .filter(|r| regions[r.index()].has_city())
                .count() as u32;
            nations[group.owner.index()].initial_cities += cities;
        }

        let mut units = BTreeMap::new();
        for (index, (owner, kind, region)) in self.units.into_iter().enumerate() {
            let id = UnitId(index as u32);
            let r = &regions[region.index()];
            let allowed = match kind.domain() {
                Domain::Land => r.terrain.is_land(),
                Domain::Naval => !r.terrain.is_land() || r.is_port(),
            };
            if !allowed {
                return Err(SimError::InvalidUnitPlacement { unit: id, region });
            }
            nations[owner.index()].initial_units += 1;
            units.insert(id, new_unit(&config, id, owner, kind, region));
        }

        let topology = build_topology(&regions, &self.groups);
        let paths = PathCaches::new(
            config.cache.distance_field_capacity,
            config.cache.reachable_capacity,
        );
        let next_unit_id = units.len() as u32;

        let mut world = World {
            regions,
            groups: self.groups,
            nations,
            units,
            wars: BTreeMap::new(),
            battles: BTreeMap::new(),
            occupation: OccupationState::default(),
            versions: Versions::default(),
            tick: 0,
            slow_tick: 0,
            elapsed_ms: Fixed::ZERO,
            config,
            rng: ChaCha8Rng::seed_from_u64(self.seed),
            next_unit_id,
            topology: Arc::new(topology),
            views: RefCell::new(Views::default()),
            paths: RefCell::new(paths),
        };
        for (aggressor, defender) in self.wars {
            world.register_war(aggressor, defender, true);
        }
        Ok(world)
    }

    fn check_region(&self, region: RegionId) -> Result<()> {
        if region.index() < self.regions.len() {
            Ok(())
        } else {
            Err(SimError::UnknownRegion(region))
        }
    }

    fn check_nation(&self, nation: NationId) -> Result<()> {
        if nation.index() < self.nations.len() {
            Ok(())
        } else {
            Err(SimError::UnknownNation(nation))
        }
    }
}

fn build_topology(regions: &[Region], groups: &[RegionGroup]) -> Topology {
    let mut topology = Topology {
        land_neighbors: Vec::with_capacity(regions.len()),
        naval_neighbors: Vec::with_capacity(regions.len()),
        coastal: Vec::with_capacity(regions.len()),
        group_neighbors: vec![BTreeSet::new(); groups.len()],
    };
    for region in regions {
        let is_land = region.terrain.is_land();
        let mut land = Vec::new();
        let mut naval = Vec::new();
        let mut coastal = false;
        for n in &region.neighbors {
            let other_land = regions[n.region.index()].terrain.is_land();
            if is_land && other_land {
                land.push(n.region);
            } else {
                naval.push(n.region);
            }
            if is_land && !other_land {
                coastal = true;
            }
        }
        if let Some(group) = region.group {
            for other in &land {
                if let Some(other_group) = regions[other.index()].group {
                    if other_group != group {
                        topology.group_neighbors[group.index()].insert(other_group);
                    }
                }
            }
        }
        topology.land_neighbors.push(land);
        topology.naval_neighbors.push(naval);
        topology.coastal.push(coastal);
    }
    topology
}

/// Breadth-first search over a neighbor table from several sources.
///
/// Returns hop counts; `None` marks regions not reached. `passable` decides
/// which regions the search may expand into; sources are always included.
pub(crate) fn bfs(
    neighbors: &[Vec<RegionId>],
    sources: impl IntoIterator<Item = RegionId>,
    mut passable: impl FnMut(RegionId) -> bool,
) -> Vec<Option<u32>> {
    let mut dist = vec![None; neighbors.len()];
    let mut queue = VecDeque::new();
    for source in sources {
        if let Some(slot) = dist.get_mut(source.index()) {
            if slot.is_none() {
                *slot = Some(0);
                queue.push_back(source);
            }
        }
    }
    while let Some(current) = queue.pop_front() {
        let Some(d) = dist[current.index()] else {
            continue;
        };
        for &next in &neighbors[current.index()] {
            if dist[next.index()].is_none() && passable(next) {
                dist[next.index()] = Some(d + 1);
                queue.push_back(next);
            }
        }
    }
    dist
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{line_world, LineSpec};

    #[test]
    fn test_builder_rejects_ungrouped_land() {
        let mut builder = WorldBuilder::new(SimConfig::default(), 0);
        builder.add_region(Terrain::Land, Vec2Fixed::ZERO);
        assert!(matches!(builder.build(), Err(SimError::UngroupedRegion(_))));
    }

    #[test]
    fn test_builder_rejects_sea_in_group() {
        let mut builder = WorldBuilder::new(SimConfig::default(), 0);
        let sea = builder.add_region(Terrain::Sea, Vec2Fixed::ZERO);
        let n = builder.add_nation("A");
        assert!(matches!(
            builder.add_group(n, &[sea], true),
            Err(SimError::SeaRegionInGroup(_))
        ));
    }

    #[test]
    fn test_builder_rejects_double_grouping() {
        let mut builder = WorldBuilder::new(SimConfig::default(), 0);
        let r = builder.add_region(Terrain::Land, Vec2Fixed::ZERO);
        let n = builder.add_nation("A");
        builder.add_group(n, &[r], true).unwrap();
        assert!(matches!(
            builder.add_group(n, &[r], true),
            Err(SimError::RegionInTwoGroups { .. })
        ));
    }

    #[test]
    fn test_builder_rejects_foreign_capital() {
        let mut builder = WorldBuilder::new(SimConfig::default(), 0);
        let a = builder.add_region(Terrain::Land, Vec2Fixed::ZERO);
        let b = builder.add_region(Terrain::Land, Vec2Fixed::from_ints(1, 0));
        let red = builder.add_nation("Red");
        let blue = builder.add_nation("Blue");
        builder.add_group(red, &[a], true).unwrap();
        builder.add_group(blue, &[b], true).unwrap();
        builder.set_capital(red, b).unwrap();
        assert!(matches!(
            builder.build(),
            Err(SimError::InvalidCapital { .. })
        ));
    }

    #[test]
    fn test_builder_rejects_ship_on_inland_region() {
        let mut builder = WorldBuilder::new(SimConfig::default(), 0);
        let a = builder.add_region(Terrain::Land, Vec2Fixed::ZERO);
        let n = builder.add_nation("A");
        builder.add_group(n, &[a], true).unwrap();
        builder.add_unit(n, UnitKind::CombatShip, a).unwrap();
        assert!(matches!(
            builder.build(),
            Err(SimError::InvalidUnitPlacement { .. })
        ));
    }

    #[test]
    fn test_connect_rejects_self_loop_and_dedups() {
        let mut builder = WorldBuilder::new(SimConfig::default(), 0);
        let a = builder.add_region(Terrain::Land, Vec2Fixed::ZERO);
        let b = builder.add_region(Terrain::Land, Vec2Fixed::ZERO);
        assert!(matches!(builder.connect(a, a, false), Err(SimError::SelfLoop(_))));
        builder.connect(a, b, false).unwrap();
        builder.connect(b, a, false).unwrap();
        assert_eq!(builder.regions[a.index()].neighbors.len(), 1);
        assert!(matches!(
            builder.connect(a, RegionId(9), false),
            Err(SimError::UnknownRegion(_))
        ));
    }

    #[test]
    fn test_views_follow_territory_version() {
        let mut world = line_world(&LineSpec::two_nations(2, 2));
        let borders = world.border_regions();
        assert_eq!(borders[&NationId(0)], vec![RegionId(1)]);
        assert_eq!(borders[&NationId(1)], vec![RegionId(2)]);
        assert!(world.adjacent_pairs().contains(&WarPair::new(NationId(0), NationId(1))));

        let blue_group = world.region(RegionId(2)).unwrap().group.unwrap();
        world.transfer_group(blue_group, NationId(0));
        let borders_after = world.border_regions();
        assert_eq!(borders_after[&NationId(0)], vec![RegionId(2)]);
        // The earlier snapshot is untouched.
        assert_eq!(borders[&NationId(0)], vec![RegionId(1)]);
    }

    #[test]
    fn test_register_war_is_idempotent() {
        let mut world = line_world(&LineSpec::two_nations(1, 1));
        assert!(world.register_war(NationId(0), NationId(1), false));
        assert!(!world.register_war(NationId(1), NationId(0), false));
        assert_eq!(world.wars().count(), 1);
        assert_eq!(world.war_adjacency()[&NationId(1)].len(), 1);
    }

    #[test]
    fn test_remove_transport_takes_cargo() {
        let mut world = line_world(&LineSpec::two_nations(1, 1));
        let infantry = world.spawn_unit(NationId(0), UnitKind::Infantry, RegionId(0));
        let transport = world.spawn_unit(NationId(0), UnitKind::TransportShip, RegionId(0));
        world.unit_mut(infantry).unwrap().embarked_on = Some(transport);
        world.unit_mut(transport).unwrap().cargo.units.push(infantry);
        let removed = world.remove_unit(transport);
        assert_eq!(removed, vec![transport, infantry]);
        assert!(world.unit(infantry).is_none());
    }

    #[test]
    fn test_state_hash_tracks_changes() {
        let mut world = line_world(&LineSpec::two_nations(2, 2));
        let before = world.state_hash();
        assert_eq!(before, world.clone().state_hash());
        world.spawn_unit(NationId(0), UnitKind::Infantry, RegionId(0));
        assert_ne!(before, world.state_hash());
    }

    #[test]
    fn test_bfs_respects_passability() {
        let neighbors = vec![
            vec![RegionId(1)],
            vec![RegionId(0), RegionId(2)],
            vec![RegionId(1)],
        ];
        let dist = bfs(&neighbors, [RegionId(0)], |r| r != RegionId(1));
        assert_eq!(dist, vec![Some(0), None, None]);
        let dist = bfs(&neighbors, [RegionId(0)], |_| true);
        assert_eq!(dist, vec![Some(0), Some(1), Some(2)]);
    }
}
