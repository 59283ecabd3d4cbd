//! Graph pathfinding over regions.
//!
//! Movement never searches per unit. Instead a breadth-first *distance field*
//! is computed once per (nation, target) and shared by every unit heading
//! there: the next hop is simply the neighbor with the smallest distance.
//! Fields and reachable sets live in bounded LRU caches that are flushed
//! whenever territory, buildings or wars change.
//!
//! Passability depends on the domain:
//!
//! - land units of nation N may enter land owned by N or by an enemy of N;
//! - naval units of nation N may enter any sea region and N's own ports.

use std::sync::Arc;

use crate::cache::{DistanceField, FieldKey, ReachKey};
use crate::components::Domain;
use crate::ids::{NationId, RegionId};
use crate::world::{bfs, World};

impl World {
    /// Whether a unit of `nation` moving in `domain` may enter `region`.
    #[must_use]
    pub fn is_passable(&self, domain: Domain, nation: NationId, region: RegionId) -> bool {
        let Some(r) = self.region(region) else {
            return false;
        };
        match domain {
            Domain::Land => {
                r.terrain.is_land()
                    && self
                        .owner_of(region)
                        .is_some_and(|owner| owner == nation || self.at_war(nation, owner))
            }
            Domain::Naval => {
                !r.terrain.is_land() || (r.is_port() && self.owner_of(region) == Some(nation))
            }
        }
    }

    fn sync_path_caches(&self) {
        let stamp = (
            self.versions.territory,
            self.versions.building,
            self.versions.wars,
        );
        self.paths.borrow_mut().sync(stamp);
    }

    /// Hop counts from every region to `target` under `nation`'s passability.
    #[must_use]
    pub fn distance_field(&self, domain: Domain, nation: NationId, target: RegionId) -> Arc<DistanceField> {
        self.sync_path_caches();
        let key = FieldKey { nation, target };
        if let Some(field) = self.paths.borrow_mut().fields_mut(domain).get(&key) {
            return Arc::clone(field);
        }
        let neighbors = match domain {
            Domain::Land => &self.topology.land_neighbors,
            Domain::Naval => &self.topology.naval_neighbors,
        };
        let field = Arc::new(bfs(neighbors, [target], |r| {
            self.is_passable(domain, nation, r)
        }));
        self.paths
            .borrow_mut()
            .fields_mut(domain)
            .insert(key, Arc::clone(&field));
        field
    }

    /// Next region on a shortest path from `from` to `target`.
    ///
    /// Ties go to the lowest region id. `None` when already there or when no
    /// neighbor gets closer.
    #[must_use]
    pub fn next_hop(
        &self,
        domain: Domain,
        nation: NationId,
        from: RegionId,
        target: RegionId,
    ) -> Option<RegionId> {
        if from == target {
            return None;
        }
        let field = self.distance_field(domain, nation, target);
        let current = field.get(from.index()).copied().flatten().unwrap_or(u32::MAX);
        self.domain_neighbors(domain, from)
            .iter()
            .filter_map(|&n| field.get(n.index()).copied().flatten().map(|d| (d, n)))
            .filter(|(d, _)| *d < current)
            .min()
            .map(|(_, n)| n)
    }

    /// Full hop sequence from `from` to `target`, excluding `from`.
    #[must_use]
    pub fn path_to(
        &self,
        domain: Domain,
        nation: NationId,
        from: RegionId,
        target: RegionId,
    ) -> Option<Vec<RegionId>> {
        if from == target {
            return Some(Vec::new());
        }
        let mut path = Vec::new();
        let mut current = from;
        while current != target {
            current = self.next_hop(domain, nation, current, target)?;
            path.push(current);
            if path.len() > self.regions.len() {
                return None;
            }
        }
        Some(path)
    }

    /// Hop distance between two regions, `None` if unreachable.
    #[must_use]
    pub fn hop_distance(
        &self,
        domain: Domain,
        nation: NationId,
        from: RegionId,
        target: RegionId,
    ) -> Option<u32> {
        if from == target {
            return Some(0);
        }
        let field = self.distance_field(domain, nation, target);
        let best = self
            .domain_neighbors(domain, from)
            .iter()
            .filter_map(|n| field.get(n.index()).copied().flatten())
            .min()?;
        Some(best + 1)
    }

    /// Regions `nation` can reach in `domain`.
    ///
    /// Land search starts from every owned region, naval search from every
    /// own port.
    #[must_use]
    pub fn reachable(&self, domain: Domain, nation: NationId) -> Arc<Vec<bool>> {
        self.sync_path_caches();
        let key = ReachKey { nation, domain };
        if let Some(set) = self.paths.borrow_mut().reachable.get(&key) {
            return Arc::clone(set);
        }
        let sources: Vec<RegionId> = match domain {
            Domain::Land => self.regions_of(nation),
            Domain::Naval => self
                .port_targets()
                .get(&nation)
                .cloned()
                .unwrap_or_default(),
        };
        let neighbors = match domain {
            Domain::Land => &self.topology.land_neighbors,
            Domain::Naval => &self.topology.naval_neighbors,
        };
        let dist = bfs(neighbors, sources, |r| self.is_passable(domain, nation, r));
        let set = Arc::new(dist.iter().map(Option::is_some).collect::<Vec<_>>());
        self.paths.borrow_mut().reachable.insert(key, Arc::clone(&set));
        set
    }

    /// Closest region satisfying `goal`, searching outward from `from`.
    ///
    /// The search expands through regions passable for `nation`; goal regions
    /// are entered even if impassable. Ties at
    /// equal distance go to the lowest id.
    pub fn nearest_region(
        &self,
        domain: Domain,
        nation: NationId,
        from: RegionId,
        mut goal: impl FnMut(RegionId) -> bool,
    ) -> Option<RegionId> {
        if goal(from) {
            return Some(from);
        }
        let neighbors = match domain {
            Domain::Land => &self.topology.land_neighbors,
            Domain::Naval => &self.topology.naval_neighbors,
        };
        let dist = bfs(neighbors, [from], |r| {
            self.is_passable(domain, nation, r) || goal(r)
        });
        dist.iter()
            .enumerate()
            .filter_map(|(i, d)| d.map(|d| (d, RegionId(i as u32))))
            .filter(|(_, r)| *r != from && goal(*r))
            .min()
            .map(|(_, r)| r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{coast_world, line_world, LineSpec};

    #[test]
    fn test_land_passability_follows_war_status() {
        let mut world = line_world(&LineSpec::two_nations(2, 2));
        let red = NationId(0);
        assert!(world.is_passable(Domain::Land, red, RegionId(1)));
        assert!(!world.is_passable(Domain::Land, red, RegionId(2)));
        world.register_war(red, NationId(1), true);
        assert!(world.is_passable(Domain::Land, red, RegionId(2)));
    }

    #[test]
    fn test_next_hop_walks_toward_target() {
        let mut world = line_world(&LineSpec::two_nations(2, 2));
        let red = NationId(0);
        world.register_war(red, NationId(1), true);
        assert_eq!(
            world.next_hop(Domain::Land, red, RegionId(0), RegionId(3)),
            Some(RegionId(1))
        );
        assert_eq!(
            world.path_to(Domain::Land, red, RegionId(0), RegionId(3)),
            Some(vec![RegionId(1), RegionId(2), RegionId(3)])
        );
        assert_eq!(world.hop_distance(Domain::Land, red, RegionId(0), RegionId(3)), Some(3));
    }

    #[test]
    fn test_no_hop_into_neutral_ground() {
        let world = line_world(&LineSpec::two_nations(2, 2));
        assert_eq!(
            world.next_hop(Domain::Land, NationId(0), RegionId(1), RegionId(3)),
            None
        );
    }

    #[test]
    fn test_distance_field_cache_flushes_on_war() {
        let mut world = line_world(&LineSpec::two_nations(2, 2));
        let red = NationId(0);
        let before = world.distance_field(Domain::Land, red, RegionId(3));
        assert_eq!(before[0], None);
        world.register_war(red, NationId(1), true);
        let after = world.distance_field(Domain::Land, red, RegionId(3));
        assert_eq!(after[0], Some(3));
    }

    #[test]
    fn test_naval_reachability_from_ports() {
        let world = coast_world();
        let red = NationId(0);
        let reach = world.reachable(Domain::Naval, red);
        // Own port and both seas are reachable, foreign land is not.
        assert!(reach[1]);
        assert!(reach[2]);
        assert!(reach[3]);
        assert!(!reach[4]);
        let land = world.reachable(Domain::Land, red);
        assert!(land[0] && land[1]);
        assert!(!land[5]);
    }

    #[test]
    fn test_nearest_region_prefers_closest() {
        let world = line_world(&LineSpec::two_nations(3, 1));
        let red = NationId(0);
        let found = world.nearest_region(Domain::Land, red, RegionId(0), |r| r.0 >= 1);
        assert_eq!(found, Some(RegionId(1)));
        // Goal regions are accepted even when they cannot be crossed.
        let foreign = world.nearest_region(Domain::Land, red, RegionId(0), |r| r == RegionId(3));
        assert_eq!(foreign, Some(RegionId(3)));
        let missing = world.nearest_region(Domain::Land, red, RegionId(0), |r| r.0 > 10);
        assert_eq!(missing, None);
    }
}
