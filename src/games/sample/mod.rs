//! A small 1830-like ruleset for tests, benches and docs.
//!
//! - Three ten-share majors (PRR, NYC, B&O) and one minor (M1)
//! - Three privates sold in a start round
//! - Trains 2, 3, 4 and 5; the 4 rusts the 2s, the 5 rusts the 3s
//! - A 3x10 stock market with par cells in the middle row
//!
//! Supports 2-6 players.

mod builder;

pub use builder::SampleGameBuilder;

use crate::core::{CompanyId, HexId, PrivateId, TileId, TrainTypeId};

pub const PRR: CompanyId = CompanyId(0);
pub const NYC: CompanyId = CompanyId(1);
pub const BO: CompanyId = CompanyId(2);
pub const M1: CompanyId = CompanyId(3);

pub const SCHUYLKILL: PrivateId = PrivateId(0);
pub const CHAMPLAIN: PrivateId = PrivateId(1);
pub const DELAWARE: PrivateId = PrivateId(2);

pub const TRAIN_2: TrainTypeId = TrainTypeId(0);
pub const TRAIN_3: TrainTypeId = TrainTypeId(1);
pub const TRAIN_4: TrainTypeId = TrainTypeId(2);
pub const TRAIN_5: TrainTypeId = TrainTypeId(3);

/// Home hexes of PRR, NYC, B&O and M1.
pub const PRR_HOME: HexId = HexId(0);
pub const NYC_HOME: HexId = HexId(1);
pub const BO_HOME: HexId = HexId(2);
pub const M1_HOME: HexId = HexId(3);

/// Mountain hex where the Champlain private lays its extra tile.
pub const MOUNTAIN: HexId = HexId(4);

/// Open city where the Delaware private places its extra station.
pub const CITY: HexId = HexId(5);

pub const TILE_7: TileId = TileId(0);
pub const TILE_8: TileId = TileId(1);
pub const TILE_14: TileId = TileId(2);
pub const TILE_15: TileId = TileId(3);
pub const TILE_63: TileId = TileId(4);
