//! Derived-state caches.
//!
//! Two kinds of memoization live here:
//!
//! - [`Versioned`] views that are recomputed only when the version stamp
//!   they were built from no longer matches the world's counters.
//! - [`LruCache`], a bounded map used for distance fields and reachable
//!   sets. Eviction is oldest-access first.
//!
//! Views are handed out as [`Arc`] snapshots. A snapshot stays valid after
//! the world mutates; it is simply stale until the next read refreshes it.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::hash::Hash;
use std::sync::Arc;

use crate::components::{Domain, WarPair};
use crate::ids::{NationId, RegionId};

/// Bounded map that evicts the least recently used entry.
#[derive(Debug, Clone)]
pub struct LruCache<K, V> {
    entries: HashMap<K, V>,
    access_order: VecDeque<K>,
    capacity: usize,
}

impl<K: Eq + Hash + Clone, V> LruCache<K, V> {
    /// Create an empty cache. A zero capacity is treated as one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            access_order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Look up an entry and mark it most recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        if !self.entries.contains_key(key) {
            return None;
        }
        self.touch(key);
        self.entries.get(key)
    }

    /// Insert an entry, evicting the oldest ones past capacity.
    pub fn insert(&mut self, key: K, value: V) {
        if self.entries.insert(key.clone(), value).is_some() {
            self.touch(&key);
            return;
        }
        self.access_order.push_back(key);
        while self.entries.len() > self.capacity {
            self.evict_lru();
        }
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `key` is cached, without touching recency.
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.access_order.clear();
    }

    fn touch(&mut self, key: &K) {
        if let Some(pos) = self.access_order.iter().position(|k| k == key) {
            self.access_order.remove(pos);
        }
        self.access_order.push_back(key.clone());
    }

    fn evict_lru(&mut self) {
        if let Some(oldest) = self.access_order.pop_front() {
            self.entries.remove(&oldest);
        }
    }
}

/// A value memoized against a version stamp.
#[derive(Debug, Clone)]
pub struct Versioned<S, T> {
    slot: Option<(S, Arc<T>)>,
}

impl<S, T> Default for Versioned<S, T> {
    fn default() -> Self {
        Self { slot: None }
    }
}

impl<S: PartialEq + Copy, T> Versioned<S, T> {
    /// Return the cached value if `stamp` matches, otherwise rebuild it.
    pub fn get_or_refresh(&mut self, stamp: S, build: impl FnOnce() -> T) -> Arc<T> {
        match &self.slot {
            Some((cached, value)) if *cached == stamp => Arc::clone(value),
            _ => {
                let value = Arc::new(build());
                self.slot = Some((stamp, Arc::clone(&value)));
                value
            }
        }
    }

    /// Whether a value for `stamp` is cached.
    #[must_use]
    pub fn is_fresh(&self, stamp: S) -> bool {
        matches!(&self.slot, Some((cached, _)) if *cached == stamp)
    }
}

/// Distance-field cache key. One field per nation and target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldKey {
    /// Nation whose passability rules apply.
    pub nation: NationId,
    /// Region the field flows toward.
    pub target: RegionId,
}

/// Reachable-set cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReachKey {
    /// Nation whose passability rules apply.
    pub nation: NationId,
    /// Movement domain.
    pub domain: Domain,
}

/// Hop counts toward a target, `None` where unreachable.
pub type DistanceField = Vec<Option<u32>>;

/// Per-nation region lists.
pub type RegionsByNation = BTreeMap<NationId, Vec<RegionId>>;

/// Stamp used by views derived from ownership alone.
pub type TerritoryStamp = u64;

/// Stamp used by views derived from ownership and buildings.
pub type TargetStamp = (u64, u64);

/// Stamp of everything passability depends on: territory, buildings, wars.
pub type PathStamp = (u64, u64, u64);

/// Version-gated views over world state.
#[derive(Debug, Clone, Default)]
pub struct Views {
    /// Owning nation of every region, `None` for sea.
    pub region_owners: Versioned<TerritoryStamp, Vec<Option<NationId>>>,
    /// Land regions of each nation that touch another nation's land.
    pub border_regions: Versioned<TerritoryStamp, RegionsByNation>,
    /// Nation pairs sharing a land border.
    pub adjacent_pairs: Versioned<TerritoryStamp, BTreeSet<WarPair>>,
    /// Capital and city regions per nation.
    pub city_targets: Versioned<TargetStamp, RegionsByNation>,
    /// Port regions per nation.
    pub port_targets: Versioned<TargetStamp, RegionsByNation>,
    /// Enemies of each nation.
    pub war_adjacency: Versioned<u64, BTreeMap<NationId, BTreeSet<NationId>>>,
}

/// Bounded pathfinding caches. Flushed whenever passability may have changed.
#[derive(Debug, Clone)]
pub struct PathCaches {
    stamp: Option<PathStamp>,
    /// Land distance fields.
    pub land_fields: LruCache<FieldKey, Arc<DistanceField>>,
    /// Naval distance fields.
    pub naval_fields: LruCache<FieldKey, Arc<DistanceField>>,
    /// Regions reachable by a nation in a domain.
    pub reachable: LruCache<ReachKey, Arc<Vec<bool>>>,
}

impl PathCaches {
    /// Create empty caches with the given capacities.
    #[must_use]
    pub fn new(field_capacity: usize, reachable_capacity: usize) -> Self {
        Self {
            stamp: None,
            land_fields: LruCache::new(field_capacity),
            naval_fields: LruCache::new(field_capacity),
            reachable: LruCache::new(reachable_capacity),
        }
    }

    /// Flush every entry if `stamp` differs from the one the entries were
    /// computed under.
    pub fn sync(&mut self, stamp: PathStamp) {
        if self.stamp != Some(stamp) {
            self.land_fields.clear();
            self.naval_fields.clear();
            self.reachable.clear();
            self.stamp = Some(stamp);
        }
    }

    /// Field cache for a domain.
    pub fn fields_mut(&mut self, domain: Domain) -> &mut LruCache<FieldKey, Arc<DistanceField>> {
        match domain {
            Domain::Land => &mut self.land_fields,
            Domain::Naval => &mut self.naval_fields,
        }
    }
}
