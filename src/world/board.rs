//! The map, reduced to what sequencing needs.
//!
//! Track geometry is resolved ahead of time: each hex lists the tiles that
//! fit it. A tile may be laid when its colour is the next one for the hex
//! and the manifest still has a copy. Station slots are counted, not placed.

use std::sync::Arc;

use im::Vector;

use crate::core::{CompanyId, HexConfig, HexId, Money, TileColour, TileConfig, TileId};

/// Current contents of one hex.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HexState {
    pub colour: Option<TileColour>,
    pub tile: Option<TileId>,
    pub tokens: Vector<CompanyId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Board {
    hex_configs: Arc<Vec<HexConfig>>,
    tile_configs: Arc<Vec<TileConfig>>,
    hexes: Vector<HexState>,
    tile_supply: Vector<u8>,
}

impl Board {
    pub fn new(hex_configs: Arc<Vec<HexConfig>>, tile_configs: Arc<Vec<TileConfig>>) -> Self {
        Self {
            hexes: hex_configs
                .iter()
                .map(|hex| HexState {
                    colour: hex.initial_colour,
                    ..HexState::default()
                })
                .collect(),
            tile_supply: tile_configs.iter().map(|tile| tile.quantity).collect(),
            hex_configs,
            tile_configs,
        }
    }

    pub fn hex_ids(&self) -> impl Iterator<Item = HexId> {
        (0..self.hexes.len() as u16).map(HexId)
    }

    #[must_use]
    pub fn hex(&self, hex: HexId) -> Option<&HexState> {
        self.hexes.get(hex.index())
    }

    #[must_use]
    pub fn lay_cost(&self, hex: HexId) -> Money {
        self.hex_configs.get(hex.index()).map_or(0, |h| h.lay_cost)
    }

    #[must_use]
    pub fn token_cost(&self, hex: HexId) -> Money {
        self.hex_configs.get(hex.index()).map_or(0, |h| h.token_cost)
    }

    #[must_use]
    pub fn tile_colour(&self, tile: TileId) -> Option<TileColour> {
        self.tile_configs.get(tile.index()).map(|t| t.colour)
    }

    /// Tiles that may be laid on a hex now, in manifest order.
    #[must_use]
    pub fn legal_tiles(&self, hex: HexId) -> Vec<TileId> {
        let (Some(config), Some(state)) = (self.hex_configs.get(hex.index()), self.hexes.get(hex.index())) else {
            return Vec::new();
        };
        let Some(next) = TileColour::next_for(state.colour) else {
            return Vec::new();
        };
        config
            .upgrades
            .iter()
            .copied()
            .filter(|tile| self.tile_colour(*tile) == Some(next))
            .filter(|tile| self.tile_supply.get(tile.index()).is_some_and(|left| *left > 0))
            .collect()
    }

    /// Lay a tile; the previous tile goes back to the supply.
    ///
    /// Returns false if the lay is not legal.
    pub fn lay_tile(&mut self, hex: HexId, tile: TileId) -> bool {
        if !self.legal_tiles(hex).contains(&tile) {
            return false;
        }
        let colour = self.tile_colour(tile);
        let Some(state) = self.hexes.get_mut(hex.index()) else {
            return false;
        };
        let previous = state.tile.replace(tile);
        state.colour = colour;

        if let Some(left) = self.tile_supply.get_mut(tile.index()) {
            *left -= 1;
        }
        if let Some(old) = previous.and_then(|old| self.tile_supply.get_mut(old.index())) {
            *old += 1;
        }
        true
    }

    /// Whether a station marker of `company` fits on a hex.
    #[must_use]
    pub fn can_place_token(&self, company: CompanyId, hex: HexId) -> bool {
        match (self.hex_configs.get(hex.index()), self.hexes.get(hex.index())) {
            (Some(config), Some(state)) => {
                state.tokens.len() < config.token_slots as usize && !state.tokens.contains(&company)
            }
            _ => false,
        }
    }

    /// Place a station marker; false if it does not fit.
    pub fn place_token(&mut self, company: CompanyId, hex: HexId) -> bool {
        if !self.can_place_token(company, hex) {
            return false;
        }
        match self.hexes.get_mut(hex.index()) {
            Some(state) => {
                state.tokens.push_back(company);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn tiles_left(&self, tile: TileId) -> u8 {
        self.tile_supply.get(tile.index()).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> Board {
        let tiles = vec![
            TileConfig { name: "7".into(), colour: TileColour::Yellow, quantity: 1 },
            TileConfig { name: "8".into(), colour: TileColour::Yellow, quantity: 2 },
            TileConfig { name: "18".into(), colour: TileColour::Green, quantity: 1 },
        ];
        let hexes = vec![
            HexConfig::new("B2").with_upgrades(&[TileId(0), TileId(1), TileId(2)]),
            HexConfig::new("C3").with_upgrades(&[TileId(0)]).with_stations(1, 40),
        ];
        Board::new(Arc::new(hexes), Arc::new(tiles))
    }

    #[test]
    fn test_empty_hex_takes_yellow() {
        let board = board();
        assert_eq!(board.legal_tiles(HexId(0)), vec![TileId(0), TileId(1)]);
    }

    #[test]
    fn test_upgrade_follows_colour() {
        let mut board = board();
        assert!(board.lay_tile(HexId(0), TileId(1)));
        assert_eq!(board.legal_tiles(HexId(0)), vec![TileId(2)]);
        assert!(board.lay_tile(HexId(0), TileId(2)));
        assert_eq!(board.tiles_left(TileId(1)), 2);
    }

    #[test]
    fn test_supply_runs_out() {
        let mut board = board();
        assert!(board.lay_tile(HexId(1), TileId(0)));
        assert!(board.legal_tiles(HexId(0)).iter().all(|t| *t != TileId(0)));
    }

    #[test]
    fn test_illegal_lay_is_refused() {
        let mut board = board();
        assert!(!board.lay_tile(HexId(0), TileId(2)));
        assert!(!board.lay_tile(HexId(9), TileId(0)));
    }

    #[test]
    fn test_token_slots() {
        let mut board = board();
        assert!(!board.can_place_token(CompanyId(0), HexId(0)));
        assert!(board.place_token(CompanyId(0), HexId(1)));
        assert!(!board.can_place_token(CompanyId(1), HexId(1)));
        assert_eq!(board.token_cost(HexId(1)), 40);
    }
}
