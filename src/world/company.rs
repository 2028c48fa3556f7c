//! Public companies and private companies.
//!
//! ## Share units
//!
//! Holdings are counted in share units. A ten-share company has ten units,
//! the president certificate carries `president_units` of them. The
//! president is the largest holder among the players; a tie keeps the
//! incumbent.
//!
//! ## Capitalisation
//!
//! IPO purchases pay the bank. When a company floats, the bank pays it the
//! full capital (`share_units * par`) at once.

use std::sync::Arc;

use im::Vector;

use crate::core::{
    CompanyConfig, CompanyId, CompanyTypeConfig, MarketPosition, Money, PlayerId, PlayerMap,
    PrivateConfig, PrivateId, SpecialProperty, TrainTypeId,
};

/// A public company and everything it holds.
#[derive(Clone, Debug, PartialEq)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    pub kind: Arc<CompanyTypeConfig>,
    pub home_hex: Option<crate::core::HexId>,
    pub fixed_price: Option<Money>,

    pub started: bool,
    pub floated: bool,
    pub closed: bool,

    /// Operated at least once in the game.
    pub has_operated: bool,

    pub par_price: Option<Money>,
    pub market_position: Option<MarketPosition>,

    pub cash: Money,
    pub trains: Vector<TrainTypeId>,
    pub free_tokens: u8,
    pub loans: u8,
    pub last_revenue: Money,

    pub ipo_units: u8,
    pub pool_units: u8,
    pub treasury_units: u8,
    pub player_units: PlayerMap<u8>,
    pub president: Option<PlayerId>,
}

impl Company {
    pub fn new(id: CompanyId, config: &CompanyConfig, kind: Arc<CompanyTypeConfig>, player_count: usize) -> Self {
        Self {
            id,
            name: config.name.clone(),
            home_hex: config.home_hex,
            fixed_price: config.fixed_price,
            started: false,
            floated: false,
            closed: false,
            has_operated: false,
            par_price: None,
            market_position: None,
            cash: 0,
            trains: Vector::new(),
            free_tokens: kind.base_tokens,
            loans: 0,
            last_revenue: 0,
            ipo_units: kind.share_units,
            pool_units: 0,
            treasury_units: 0,
            player_units: PlayerMap::with_value(player_count, 0),
            president: None,
            kind,
        }
    }

    /// Whether the company takes part in operating rounds.
    #[must_use]
    pub fn is_operating(&self) -> bool {
        self.floated && !self.closed
    }

    #[must_use]
    pub fn units_of(&self, player: PlayerId) -> u8 {
        self.player_units[player]
    }

    /// Largest holding among players other than `player`.
    #[must_use]
    pub fn largest_other_holding(&self, player: PlayerId) -> u8 {
        self.player_units
            .iter()
            .filter(|(other, _)| *other != player)
            .map(|(_, units)| *units)
            .max()
            .unwrap_or(0)
    }

    /// Units that have left the IPO.
    #[must_use]
    pub fn sold_units(&self) -> u8 {
        self.kind.share_units - self.ipo_units
    }

    /// Nothing left in the IPO or the pool.
    #[must_use]
    pub fn is_sold_out(&self) -> bool {
        self.started && self.ipo_units == 0 && self.pool_units == 0
    }

    /// Certificates `player` holds in this company.
    #[must_use]
    pub fn certificates_of(&self, player: PlayerId) -> u32 {
        let units = u32::from(self.units_of(player));
        if units == 0 {
            return 0;
        }
        if self.president == Some(player) {
            units - (u32::from(self.kind.president_units) - 1)
        } else {
            units
        }
    }

    /// Recompute the president after a holding changed.
    ///
    /// Returns the new president when it changed.
    pub fn update_president(&mut self) -> Option<PlayerId> {
        let incumbent = self.president;
        let incumbent_units = incumbent.map_or(0, |p| self.units_of(p));

        let challenger = self
            .player_units
            .iter()
            .filter(|(_, units)| **units > incumbent_units)
            .max_by(|(pa, ua), (pb, ub)| ua.cmp(ub).then(pb.cmp(pa)))
            .map(|(player, _)| player);

        match challenger {
            Some(player) if Some(player) != incumbent => {
                self.president = Some(player);
                Some(player)
            }
            _ => None,
        }
    }

    /// The float threshold has been reached.
    #[must_use]
    pub fn ready_to_float(&self) -> bool {
        self.started && !self.floated && self.sold_units() >= self.kind.float_units
    }

    /// Number of trains of a type.
    #[must_use]
    pub fn train_count(&self, train_type: TrainTypeId) -> usize {
        self.trains.iter().filter(|t| **t == train_type).count()
    }

    /// Remove one train of a type; false if none is held.
    pub fn remove_train(&mut self, train_type: TrainTypeId) -> bool {
        match self.trains.iter().position(|t| *t == train_type) {
            Some(index) => {
                self.trains.remove(index);
                true
            }
            None => false,
        }
    }
}

/// Who holds a private company.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrivateOwner {
    Player(PlayerId),
    Company(CompanyId),
}

/// A private company.
#[derive(Clone, Debug, PartialEq)]
pub struct PrivateCompany {
    pub id: PrivateId,
    pub name: String,
    pub base_price: Money,
    pub revenue: Money,
    pub special: Option<SpecialProperty>,
    pub special_used: bool,
    pub owner: Option<PrivateOwner>,
    pub closed: bool,
}

impl PrivateCompany {
    pub fn new(id: PrivateId, config: &PrivateConfig) -> Self {
        Self {
            id,
            name: config.name.clone(),
            base_price: config.base_price,
            revenue: config.revenue,
            special: config.special.clone(),
            special_used: false,
            owner: None,
            closed: false,
        }
    }

    /// Open and owned by `company`.
    #[must_use]
    pub fn owned_by_company(&self, company: CompanyId) -> bool {
        !self.closed && self.owner == Some(PrivateOwner::Company(company))
    }

    /// Open and owned by `player`.
    #[must_use]
    pub fn owned_by_player(&self, player: PlayerId) -> bool {
        !self.closed && self.owner == Some(PrivateOwner::Player(player))
    }

    /// Hexes of an unused extra tile lay.
    #[must_use]
    pub fn extra_tile_hexes(&self) -> Option<&[crate::core::HexId]> {
        match &self.special {
            Some(SpecialProperty::ExtraTileLay { hexes }) if !self.special_used && !self.closed => {
                Some(hexes)
            }
            _ => None,
        }
    }

    /// Hexes of an unused extra station marker.
    #[must_use]
    pub fn extra_token_hexes(&self) -> Option<&[crate::core::HexId]> {
        match &self.special {
            Some(SpecialProperty::ExtraTokenLay { hexes }) if !self.special_used && !self.closed => {
                Some(hexes)
            }
            _ => None,
        }
    }
}
