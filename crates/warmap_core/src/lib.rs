//! # Warmap Core
//!
//! Deterministic simulation core for a map-based nation conflict game.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No system randomness (one seeded `ChaCha8Rng` per world)
//! - No floating-point math (uses fixed-point)
//!
//! Two worlds built from the same map and seed, stepped with the same frame
//! deltas, stay bit-identical. That is what the determinism harness in
//! `warmap_test_utils` checks via [`World::state_hash`](world::World::state_hash).
//!
//! ## Crate Structure
//!
//! - [`world`] - Authoritative state, builder and version-gated views
//! - [`clock`] / [`simulation`] - Frame-to-tick scheduling and system order
//! - [`pathfinding`] / [`movement`] / [`targeting`] - Getting units places
//! - [`combat`] / [`occupation`] - Fighting and holding ground
//! - [`diplomacy`] / [`civil_war`] / [`surrender`] - Wars and how they end
//! - [`production`] / [`transport`] - Economy, spawning and landings
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod cache;
pub mod capitals;
pub mod civil_war;
pub mod clock;
pub mod combat;
pub mod components;
pub mod config;
pub mod diplomacy;
pub mod error;
pub mod ids;
pub mod math;
pub mod movement;
pub mod occupation;
pub mod pathfinding;
pub mod production;
pub mod simulation;
pub mod surrender;
pub mod targeting;
pub mod transport;
pub mod world;

#[cfg(test)]
mod testing;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::clock::Clock;
    pub use crate::components::{
        Battle, BattleKey, Building, Domain, Nation, Region, RegionGroup, Resources, Terrain,
        Unit, UnitKind, UnitRole, War, WarPair,
    };
    pub use crate::config::SimConfig;
    pub use crate::error::{Result, SimError};
    pub use crate::ids::{GroupId, NationId, RegionId, UnitId};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::simulation::{step, StepReport, TickEvents};
    pub use crate::world::{Versions, World, WorldBuilder};
}
