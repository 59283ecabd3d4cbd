//! Small hand-built worlds for unit tests.

use crate::components::{Building, Terrain, UnitKind};
use crate::config::SimConfig;
use crate::ids::{NationId, RegionId, UnitId};
use crate::math::Vec2Fixed;
use crate::world::{World, WorldBuilder};

/// A row of land regions split into consecutive nation blocks.
///
/// Region `i` sits at `(i, 0)` and forms its own group. Nation `k` owns the
/// `blocks[k]` regions after those of nation `k - 1`, with its capital on the
/// first of them.
#[derive(Debug, Clone)]
pub struct LineSpec {
    pub blocks: Vec<u32>,
    /// Edges `i`–`i + 1` that cross a river.
    pub rivers: Vec<usize>,
    pub config: SimConfig,
    pub seed: u64,
}

impl LineSpec {
    pub fn new(blocks: Vec<u32>) -> Self {
        Self {
            blocks,
            rivers: Vec::new(),
            config: SimConfig::default(),
            seed: 7,
        }
    }

    pub fn two_nations(a: u32, b: u32) -> Self {
        Self::new(vec![a, b])
    }
}

pub fn line_world(spec: &LineSpec) -> World {
    let mut builder = WorldBuilder::new(spec.config.clone(), spec.seed);
    let total: u32 = spec.blocks.iter().sum();
    let regions: Vec<RegionId> = (0..total)
        .map(|i| builder.add_region(Terrain::Land, Vec2Fixed::from_ints(i as i32, 0)))
        .collect();
    for (i, pair) in regions.windows(2).enumerate() {
        builder
            .connect(pair[0], pair[1], spec.rivers.contains(&i))
            .expect("line edge");
    }

    let mut next = 0usize;
    for (k, size) in spec.blocks.iter().enumerate() {
        let nation = builder.add_nation(format!("Nation {k}"));
        for offset in 0..*size as usize {
            let region = regions[next + offset];
            builder.add_group(nation, &[region], true).expect("line group");
        }
        if *size > 0 {
            builder.set_capital(nation, regions[next]).expect("line capital");
        }
        next += *size as usize;
    }
    builder.build().expect("line world")
}

pub fn coast_config() -> SimConfig {
    SimConfig::default()
}

/// Two nations facing each other across a two-region strait.
///
/// ```text
/// r0 (A, capital) - r1 (A, port) ~ r2 (sea) ~ r3 (sea) ~ r4 (B, capital) - r5 (B)
/// ```
pub fn coast_world() -> World {
    coast_world_with(coast_config())
}

pub fn coast_world_with(config: SimConfig) -> World {
    let mut builder = WorldBuilder::new(config, 11);
    let r: Vec<RegionId> = [
        Terrain::Land,
        Terrain::Land,
        Terrain::Sea,
        Terrain::Sea,
        Terrain::Land,
        Terrain::Land,
    ]
    .into_iter()
    .enumerate()
    .map(|(i, terrain)| builder.add_region(terrain, Vec2Fixed::from_ints(i as i32, 0)))
    .collect();
    for i in 0..5 {
        builder.connect(r[i], r[i + 1], false).expect("coast edge");
    }
    builder.set_building(r[1], Building::Port).expect("port");

    let red = builder.add_nation("Red");
    let blue = builder.add_nation("Blue");
    for (nation, region) in [(red, r[0]), (red, r[1]), (blue, r[4]), (blue, r[5])] {
        builder.add_group(nation, &[region], true).expect("coast group");
    }
    builder.set_capital(red, r[0]).expect("red capital");
    builder.set_capital(blue, r[4]).expect("blue capital");
    builder.build().expect("coast world")
}

pub fn spawn_many(
    world: &mut World,
    nation: NationId,
    kind: UnitKind,
    region: RegionId,
    count: u32,
) -> Vec<UnitId> {
    (0..count).map(|_| world.spawn_unit(nation, kind, region)).collect()
}
