//! Test fixtures and helpers.
//!
//! Pre-built maps for consistent testing. Every fixture goes through
//! [`WorldBuilder`], so fixtures exercise the same validation as real maps.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

use warmap_core::components::{Building, Terrain, UnitKind};
use warmap_core::config::SimConfig;
use warmap_core::error::Result;
use warmap_core::ids::{NationId, RegionId};
use warmap_core::math::Vec2Fixed;
use warmap_core::world::{World, WorldBuilder};

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// A rectangular map split into vertical nation strips.
///
/// Region `(x, y)` has id `y * width + x` and centre `(x, y)`, with
/// four-way adjacency. Each nation owns a band of columns; every row of that
/// band is one group. The capital sits on the band's top-left region, and
/// every `city_every`-th row gets a city on its first region. With
/// `sea_row`, an extra row of sea runs along the bottom and each nation gets
/// a port on its bottom-left land region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSpec {
    /// Columns.
    pub width: u32,
    /// Land rows.
    pub height: u32,
    /// Number of nations, at most `width`.
    pub nations: u32,
    /// Starting infantry per nation, placed on the capital. Missing entries
    /// mean zero.
    pub units: Vec<u32>,
    /// Rows between cities; zero for no cities.
    pub city_every: u32,
    /// Add a sea row with one port per nation.
    pub sea_row: bool,
    /// Nation index pairs that start at war.
    pub wars: Vec<(u32, u32)>,
    /// World seed.
    pub seed: u64,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            width: 8,
            height: 4,
            nations: 2,
            units: vec![6, 6],
            city_every: 2,
            sea_row: false,
            wars: Vec::new(),
            seed: 42,
        }
    }
}

impl GridSpec {
    /// Nation owning column `x`.
    #[must_use]
    pub fn owner_of_column(&self, x: u32) -> u32 {
        x * self.nations / self.width.max(1)
    }

    /// First column of a nation's band.
    #[must_use]
    pub fn first_column(&self, nation: u32) -> u32 {
        (0..self.width)
            .find(|x| self.owner_of_column(*x) == nation)
            .unwrap_or(0)
    }

    /// Region id at `(x, y)`.
    #[must_use]
    pub fn region_at(&self, x: u32, y: u32) -> RegionId {
        RegionId(y * self.width + x)
    }

    /// Build the world with the default configuration.
    ///
    /// # Errors
    ///
    /// Fails if a war names a nation index past `nations`.
    pub fn build(&self) -> Result<World> {
        self.build_with(SimConfig::default())
    }

    /// Build the world with an explicit configuration.
    ///
    /// # Errors
    ///
    /// See [`GridSpec::build`].
    pub fn build_with(&self, config: SimConfig) -> Result<World> {
        let mut builder = WorldBuilder::new(config, self.seed);
        let rows = self.height + u32::from(self.sea_row);
        for y in 0..rows {
            let terrain = if y < self.height { Terrain::Land } else { Terrain::Sea };
            for x in 0..self.width {
                builder.add_region(terrain, Vec2Fixed::from_ints(x as i32, y as i32));
            }
        }
        for y in 0..rows {
            for x in 0..self.width {
                let here = self.region_at(x, y);
                if x + 1 < self.width {
                    builder.connect(here, self.region_at(x + 1, y), false)?;
                }
                if y + 1 < rows {
                    builder.connect(here, self.region_at(x, y + 1), false)?;
                }
            }
        }

        let nations: Vec<NationId> = (0..self.nations)
            .map(|i| builder.add_nation(format!("Nation {i}")))
            .collect();
        for (index, nation) in nations.iter().enumerate() {
            let index = index as u32;
            let columns: Vec<u32> = (0..self.width)
                .filter(|x| self.owner_of_column(*x) == index)
                .collect();
            let Some(&first) = columns.first() else {
                continue;
            };
            for y in 0..self.height {
                let members: Vec<RegionId> = columns.iter().map(|x| self.region_at(*x, y)).collect();
                builder.add_group(*nation, &members, y < self.height.div_ceil(2))?;
                if y > 0 && self.city_every > 0 && y % self.city_every == 0 {
                    builder.set_building(self.region_at(first, y), Building::City)?;
                }
            }
            let capital = self.region_at(first, 0);
            builder.set_capital(*nation, capital)?;
            if self.sea_row && self.height > 1 {
                builder.set_building(self.region_at(first, self.height - 1), Building::Port)?;
            }
            let count = self.units.get(index as usize).copied().unwrap_or(0);
            for _ in 0..count {
                builder.add_unit(*nation, UnitKind::Infantry, capital)?;
            }
        }
        for &(a, b) in &self.wars {
            builder.add_war(NationId(a), NationId(b))?;
        }
        builder.build()
    }
}

/// Two adjacent nations with the given starting armies, not yet at war.
///
/// # Errors
///
/// Never fails for valid counts; the `Result` mirrors [`GridSpec::build`].
pub fn duel_world(red_units: u32, blue_units: u32, seed: u64) -> Result<World> {
    GridSpec {
        width: 4,
        height: 2,
        nations: 2,
        units: vec![red_units, blue_units],
        city_every: 0,
        seed,
        ..GridSpec::default()
    }
    .build()
}

/// Two nations with a shared coast, already at war.
///
/// # Errors
///
/// Never fails; the `Result` mirrors [`GridSpec::build`].
pub fn coastal_war_world(seed: u64) -> Result<World> {
    GridSpec {
        width: 6,
        height: 3,
        nations: 2,
        units: vec![8, 8],
        city_every: 2,
        sea_row: true,
        wars: vec![(0, 1)],
        seed,
    }
    .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_grid_builds() {
        let spec = GridSpec::default();
        let world = spec.build().unwrap();
        assert_eq!(world.regions().len(), 32);
        assert_eq!(world.groups().len(), 8);
        assert_eq!(world.unit_count(), 12);
        assert_eq!(world.owner_of(spec.region_at(0, 0)), Some(NationId(0)));
        assert_eq!(world.owner_of(spec.region_at(7, 3)), Some(NationId(1)));
        assert_eq!(world.nation(NationId(1)).unwrap().capital, Some(spec.region_at(4, 0)));
    }

    #[test]
    fn test_sea_row_adds_ports() {
        let world = coastal_war_world(1).unwrap();
        let ports = world.port_targets();
        assert_eq!(ports.get(&NationId(0)).map(Vec::len), Some(1));
        assert_eq!(ports.get(&NationId(1)).map(Vec::len), Some(1));
        assert!(world.at_war(NationId(0), NationId(1)));
    }

    #[test]
    fn test_nation_without_columns_has_no_land() {
        let spec = GridSpec {
            width: 2,
            nations: 3,
            units: Vec::new(),
            ..GridSpec::default()
        };
        // Columns go to nations 0 and 1; nation 2 exists but holds nothing.
        let world = spec.build().unwrap();
        assert_eq!(world.nations().len(), 3);
        assert!(world.regions_of(NationId(2)).is_empty());
        assert_eq!(world.nation(NationId(2)).unwrap().capital, None);
    }
}
