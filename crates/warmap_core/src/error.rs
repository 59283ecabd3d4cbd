//! Error types for world construction and configuration.
//!
//! The tick loop itself never fails; these errors only surface while a
//! world is being assembled from generated input or a config is parsed.

use thiserror::Error;

use crate::ids::{GroupId, NationId, RegionId, UnitId};

/// Result type alias using [`SimError`].
pub type Result<T> = std::result::Result<T, SimError>;

/// Top-level error type for simulation setup.
#[derive(Debug, Error)]
pub enum SimError {
    /// A region id does not exist in the graph.
    #[error("Unknown region: {0}")]
    UnknownRegion(RegionId),

    /// A nation id does not exist.
    #[error("Unknown nation: {0}")]
    UnknownNation(NationId),

    /// A region was connected to itself.
    #[error("Region {0} cannot neighbor itself")]
    SelfLoop(RegionId),

    /// A land region is not covered by any group.
    #[error("Land region {0} belongs to no group")]
    UngroupedRegion(RegionId),

    /// A region was placed in more than one group.
    #[error("Region {region} belongs to both {first} and {second}")]
    RegionInTwoGroups {
        /// Offending region.
        region: RegionId,
        /// Group that claimed it first.
        first: GroupId,
        /// Group that claimed it again.
        second: GroupId,
    },

    /// A sea region was placed in a group.
    #[error("Sea region {0} cannot belong to a group")]
    SeaRegionInGroup(RegionId),

    /// A group has no member regions.
    #[error("Group {0} has no regions")]
    EmptyGroup(GroupId),

    /// A capital is not owned by its nation or is not land.
    #[error("Capital {region} is not a land region owned by {nation}")]
    InvalidCapital {
        /// Nation declaring the capital.
        nation: NationId,
        /// Region it points at.
        region: RegionId,
    },

    /// A unit was placed on terrain its domain cannot occupy.
    #[error("Unit {unit} cannot stand on region {region}")]
    InvalidUnitPlacement {
        /// Unit being placed.
        unit: UnitId,
        /// Region it was placed on.
        region: RegionId,
    },

    /// Configuration text could not be parsed.
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] ron::error::SpannedError),
}
