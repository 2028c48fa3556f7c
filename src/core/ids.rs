//! Identifiers for game objects.
//!
//! Every identifier is the index of the object in its configuration list,
//! so lookups are plain vector indexing. The engine never interprets the
//! numbers beyond that.

use serde::{Deserialize, Serialize};

/// Money amounts. Negative values only ever appear for a broken bank.
pub type Money = i32;

macro_rules! index_id {
    ($(#[$meta:meta])* $name:ident($inner:ty), $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub $inner);

        impl $name {
            /// Create a new identifier.
            #[must_use]
            pub const fn new(id: $inner) -> Self {
                Self(id)
            }

            /// Index into the owning configuration list.
            #[must_use]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($label, "({})"), self.0)
            }
        }
    };
}

index_id!(
    /// A public (major or minor) company.
    CompanyId(u16),
    "Company"
);

index_id!(
    /// A private company; also identifies its start-packet item.
    PrivateId(u16),
    "Private"
);

index_id!(
    /// A train type ("2", "3", "D" ...).
    TrainTypeId(u16),
    "TrainType"
);

index_id!(
    /// A map hex.
    HexId(u16),
    "Hex"
);

index_id!(
    /// A tile in the tile manifest.
    TileId(u16),
    "Tile"
);
