//! Opaque identifiers for simulation entities.
//!
//! Every id is a dense index into its arena on [`World`](crate::world::World).
//! Distinct newtypes keep a region id from ever being used where a nation id
//! is expected.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub u32);

        impl $name {
            /// Create an id from its raw index.
            #[must_use]
            pub const fn new(id: u32) -> Self {
                Self(id)
            }

            /// Arena index for this id.
            #[must_use]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Identifier of a region (the smallest territory-control unit).
    RegionId,
    "r"
);
define_id!(
    /// Identifier of a region group (administrative cluster of regions).
    GroupId,
    "g"
);
define_id!(
    /// Identifier of a nation.
    NationId,
    "n"
);
define_id!(
    /// Identifier of a military unit.
    UnitId,
    "u"
);
