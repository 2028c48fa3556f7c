//! Game configuration types.
//!
//! A ruleset is supplied as pre-parsed configuration at setup time:
//! - `CompanyTypeConfig` / `CompanyConfig`: share structure and behaviour
//! - `PrivateConfig` and `StartRoundConfig`: the start packet
//! - `MarketConfig`, `TrainTypeConfig`, `PhaseConfig`: economy and progression
//! - `TileConfig` / `HexConfig`: the pre-resolved board
//! - `GameConfig`: everything above plus the round-sequencing parameters
//!
//! The engine never hardcodes a title; games describe themselves here.
//! `GameConfig::validate` must succeed before a game can be set up.

use serde::{Deserialize, Serialize};

use super::error::ConfigurationFault;
use super::ids::{CompanyId, HexId, Money, PrivateId, TileId, TrainTypeId};

/// Track tile colours, in upgrade order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TileColour {
    Yellow,
    Green,
    Brown,
    Grey,
}

impl TileColour {
    /// The colour a hex of this colour upgrades to.
    #[must_use]
    pub fn upgrade(self) -> Option<TileColour> {
        match self {
            TileColour::Yellow => Some(TileColour::Green),
            TileColour::Green => Some(TileColour::Brown),
            TileColour::Brown => Some(TileColour::Grey),
            TileColour::Grey => None,
        }
    }

    /// The colour laid on an empty hex.
    #[must_use]
    pub fn next_for(current: Option<TileColour>) -> Option<TileColour> {
        match current {
            None => Some(TileColour::Yellow),
            Some(colour) => colour.upgrade(),
        }
    }
}

impl std::fmt::Display for TileColour {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TileColour::Yellow => "yellow",
            TileColour::Green => "green",
            TileColour::Brown => "brown",
            TileColour::Grey => "grey",
        };
        f.write_str(name)
    }
}

/// Which combinations of selling and buying a player may make in one
/// stock-round turn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SequenceRule {
    /// Sell, buy one certificate, then sell again.
    SellBuySell,
    /// Sell first; once a certificate is bought no more selling.
    #[default]
    SellBuy,
    /// Either sell-then-buy or buy-then-sell, but never sell-buy-sell.
    SellBuyOrBuySell,
}

/// How a company distributes its revenue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DividendAllocation {
    Withhold,
    Split,
    Payout,
}

impl std::fmt::Display for DividendAllocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DividendAllocation::Withhold => "withhold",
            DividendAllocation::Split => "split",
            DividendAllocation::Payout => "payout",
        };
        f.write_str(name)
    }
}

/// When reload may drop a `Done` that an older engine needed after a
/// treasury-trading step which is now skipped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LegacyDoneSkip {
    Never,
    /// Only for save files written with a format version below this one.
    BeforeVersion(u32),
    Always,
}

impl Default for LegacyDoneSkip {
    fn default() -> Self {
        LegacyDoneSkip::BeforeVersion(2)
    }
}

/// Loan terms for company types that may borrow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoanTerms {
    pub value: Money,
    pub max_loans: u8,
}

/// Share structure and operating behaviour shared by a class of companies.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompanyTypeConfig {
    pub name: String,

    /// Total share units (10 for a company of 10% shares, 1 for a minor).
    pub share_units: u8,

    /// Units carried by the president's certificate.
    pub president_units: u8,

    /// Units that must leave the IPO before the company floats.
    pub float_units: u8,

    /// Price-bearing companies sit on the stock market; price-less ones
    /// (minors) operate after them in configuration order.
    pub has_stock_price: bool,

    /// Whether the company is forced to own a train at the end of its turn.
    pub must_own_a_train: bool,

    /// Whether the company may trade its own shares from its treasury.
    pub can_trade_treasury: bool,

    /// Maximum units the treasury may hold.
    pub max_treasury_units: u8,

    /// Allowed revenue allocations.
    pub allocations: Vec<DividendAllocation>,

    /// Number of station markers.
    pub base_tokens: u8,

    pub loans: Option<LoanTerms>,
}

impl CompanyTypeConfig {
    /// A ten-share company with a two-unit president certificate.
    pub fn major(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            share_units: 10,
            president_units: 2,
            float_units: 6,
            has_stock_price: true,
            must_own_a_train: true,
            can_trade_treasury: false,
            max_treasury_units: 0,
            allocations: vec![DividendAllocation::Withhold, DividendAllocation::Payout],
            base_tokens: 3,
            loans: None,
        }
    }

    /// A single-certificate company without a stock price that always
    /// splits its revenue.
    pub fn minor(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            share_units: 1,
            president_units: 1,
            float_units: 1,
            has_stock_price: false,
            must_own_a_train: false,
            can_trade_treasury: false,
            max_treasury_units: 0,
            allocations: vec![DividendAllocation::Split],
            base_tokens: 1,
            loans: None,
        }
    }

    /// Allow treasury trading up to `max_units`.
    #[must_use]
    pub fn with_treasury_trading(mut self, max_units: u8) -> Self {
        self.can_trade_treasury = true;
        self.max_treasury_units = max_units;
        self
    }

    /// Allow loans.
    #[must_use]
    pub fn with_loans(mut self, value: Money, max_loans: u8) -> Self {
        self.loans = Some(LoanTerms { value, max_loans });
        self
    }

    /// Set the number of station markers.
    #[must_use]
    pub fn with_base_tokens(mut self, tokens: u8) -> Self {
        self.base_tokens = tokens;
        self
    }
}

/// A single public company.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompanyConfig {
    pub name: String,

    /// Index into `GameConfig::company_types`.
    pub company_type: usize,

    pub home_hex: Option<HexId>,

    /// Start price for price-less companies.
    pub fixed_price: Option<Money>,
}

impl CompanyConfig {
    pub fn new(name: impl Into<String>, company_type: usize) -> Self {
        Self {
            name: name.into(),
            company_type,
            home_hex: None,
            fixed_price: None,
        }
    }

    #[must_use]
    pub fn with_home(mut self, hex: HexId) -> Self {
        self.home_hex = Some(hex);
        self
    }

    #[must_use]
    pub fn with_fixed_price(mut self, price: Money) -> Self {
        self.fixed_price = Some(price);
        self
    }
}

/// A one-shot ability granted to the company owning a private.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecialProperty {
    /// One tile lay on one of these hexes, outside the normal allowance.
    ExtraTileLay { hexes: Vec<HexId> },
    /// One station marker on one of these hexes, outside the normal allowance.
    ExtraTokenLay { hexes: Vec<HexId> },
}

/// A private company, sold in the start round.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrivateConfig {
    pub name: String,
    pub base_price: Money,
    pub revenue: Money,
    pub special: Option<SpecialProperty>,
}

impl PrivateConfig {
    pub fn new(name: impl Into<String>, base_price: Money, revenue: Money) -> Self {
        Self {
            name: name.into(),
            base_price,
            revenue,
            special: None,
        }
    }

    #[must_use]
    pub fn with_special(mut self, special: SpecialProperty) -> Self {
        self.special = Some(special);
        self
    }
}

/// Parameters of the start-packet auction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StartRoundConfig {
    pub min_bid_increment: Money,

    /// Price cut applied to the buyable item when everybody passes.
    pub price_reduction: Money,

    /// If false, a full round of passes ends the start round with the
    /// packet unsold instead of reducing the price.
    pub reduce_price_on_all_pass: bool,
}

impl Default for StartRoundConfig {
    fn default() -> Self {
        Self {
            min_bid_increment: 5,
            price_reduction: 5,
            reduce_price_on_all_pass: true,
        }
    }
}

/// A cell on the stock market grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MarketPosition {
    pub row: u8,
    pub col: u8,
}

impl MarketPosition {
    #[must_use]
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }
}

impl std::fmt::Display for MarketPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", (b'A' + self.row) as char, self.col + 1)
    }
}

/// The stock market grid.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Prices by row and column; `None` marks cells outside the market.
    pub prices: Vec<Vec<Option<Money>>>,

    /// Cells a company may start at.
    pub par_cells: Vec<MarketPosition>,

    /// Reaching one of these cells triggers the end of the game.
    pub end_game_cells: Vec<MarketPosition>,
}

impl MarketConfig {
    /// Price at a cell, if the cell exists.
    #[must_use]
    pub fn price(&self, pos: MarketPosition) -> Option<Money> {
        self.prices
            .get(pos.row as usize)
            .and_then(|row| row.get(pos.col as usize))
            .copied()
            .flatten()
    }
}

/// A train type and its stock in the bank.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrainTypeConfig {
    pub name: String,
    pub cost: Money,
    pub quantity: u8,

    /// Phase index started by the first purchase of this type.
    pub starts_phase: Option<usize>,

    /// This type is removed from play when the first train of that
    /// type is bought.
    pub rusted_by: Option<TrainTypeId>,
}

impl TrainTypeConfig {
    pub fn new(name: impl Into<String>, cost: Money, quantity: u8) -> Self {
        Self {
            name: name.into(),
            cost,
            quantity,
            starts_phase: None,
            rusted_by: None,
        }
    }

    #[must_use]
    pub fn starting_phase(mut self, phase: usize) -> Self {
        self.starts_phase = Some(phase);
        self
    }

    #[must_use]
    pub fn rusted_by(mut self, train_type: TrainTypeId) -> Self {
        self.rusted_by = Some(train_type);
        self
    }
}

/// A game phase.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhaseConfig {
    pub name: String,

    /// Operating rounds per set.
    pub operating_rounds: u8,

    /// Normal tile lays per colour per turn.
    pub tile_lays: Vec<(TileColour, u8)>,

    /// Maximum trains per company.
    pub train_limit: u8,

    pub treasury_trading: bool,

    /// Companies may buy privates from players.
    pub private_sales: bool,

    /// Entering this phase closes all privates.
    pub closes_privates: bool,
}

impl PhaseConfig {
    pub fn new(name: impl Into<String>, operating_rounds: u8, train_limit: u8) -> Self {
        Self {
            name: name.into(),
            operating_rounds,
            tile_lays: vec![(TileColour::Yellow, 1)],
            train_limit,
            treasury_trading: false,
            private_sales: false,
            closes_privates: false,
        }
    }

    #[must_use]
    pub fn with_tile_lays(mut self, lays: &[(TileColour, u8)]) -> Self {
        self.tile_lays = lays.to_vec();
        self
    }

    #[must_use]
    pub fn with_treasury_trading(mut self) -> Self {
        self.treasury_trading = true;
        self
    }

    #[must_use]
    pub fn with_private_sales(mut self) -> Self {
        self.private_sales = true;
        self
    }

    #[must_use]
    pub fn closing_privates(mut self) -> Self {
        self.closes_privates = true;
        self
    }
}

/// A tile in the manifest.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileConfig {
    pub name: String,
    pub colour: TileColour,
    pub quantity: u8,
}

/// A board hex with its pre-resolved legal upgrades.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HexConfig {
    pub name: String,
    pub initial_colour: Option<TileColour>,

    /// Tiles that fit this hex, any colour.
    pub upgrades: Vec<TileId>,

    /// Terrain cost of laying a tile.
    pub lay_cost: Money,

    pub token_slots: u8,
    pub token_cost: Money,
}

impl HexConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            initial_colour: None,
            upgrades: Vec::new(),
            lay_cost: 0,
            token_slots: 0,
            token_cost: 0,
        }
    }

    #[must_use]
    pub fn with_upgrades(mut self, tiles: &[TileId]) -> Self {
        self.upgrades = tiles.to_vec();
        self
    }

    #[must_use]
    pub fn with_lay_cost(mut self, cost: Money) -> Self {
        self.lay_cost = cost;
        self
    }

    #[must_use]
    pub fn with_stations(mut self, slots: u8, cost: Money) -> Self {
        self.token_slots = slots;
        self.token_cost = cost;
        self
    }
}

/// Complete ruleset configuration.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameConfig {
    pub name: String,

    pub min_players: u8,
    pub max_players: u8,

    /// Cash divided equally among players at setup.
    pub player_capital: Money,

    /// Total bank cash, before the player capital is handed out.
    pub bank_cash: Money,

    /// (player count, certificate limit) pairs.
    pub certificate_limits: Vec<(u8, u8)>,

    /// Maximum percentage of one company a player may hold.
    pub player_share_limit_pct: u8,

    /// Maximum percentage of one company the bank pool may hold.
    pub pool_share_limit_pct: u8,

    pub sequence_rule: SequenceRule,
    pub skip_first_stock_round: bool,
    pub dynamic_operating_order: bool,
    pub game_ends_after_set_of_ors: bool,
    pub no_sale_in_first_stock_round: bool,

    /// Allowed price range, in percent of face value, when a company
    /// buys a private from a player.
    pub private_price_range_pct: (u16, u16),

    pub company_types: Vec<CompanyTypeConfig>,
    pub companies: Vec<CompanyConfig>,
    pub privates: Vec<PrivateConfig>,
    pub start_round: Option<StartRoundConfig>,
    pub market: MarketConfig,
    pub train_types: Vec<TrainTypeConfig>,
    pub phases: Vec<PhaseConfig>,
    pub tiles: Vec<TileConfig>,
    pub hexes: Vec<HexConfig>,

    pub legacy_done_skip: LegacyDoneSkip,
}

impl GameConfig {
    /// An empty ruleset with common defaults; callers fill in the lists.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            min_players: 2,
            max_players: 6,
            player_capital: 2400,
            bank_cash: 12_000,
            certificate_limits: Vec::new(),
            player_share_limit_pct: 60,
            pool_share_limit_pct: 50,
            sequence_rule: SequenceRule::default(),
            skip_first_stock_round: false,
            dynamic_operating_order: true,
            game_ends_after_set_of_ors: true,
            no_sale_in_first_stock_round: true,
            private_price_range_pct: (50, 200),
            company_types: Vec::new(),
            companies: Vec::new(),
            privates: Vec::new(),
            start_round: None,
            market: MarketConfig::default(),
            train_types: Vec::new(),
            phases: Vec::new(),
            tiles: Vec::new(),
            hexes: Vec::new(),
            legacy_done_skip: LegacyDoneSkip::default(),
        }
    }

    /// Certificate limit for a player count.
    #[must_use]
    pub fn certificate_limit(&self, player_count: usize) -> Option<u8> {
        self.certificate_limits
            .iter()
            .find(|(players, _)| *players as usize == player_count)
            .map(|(_, limit)| *limit)
    }

    /// The type of a configured company.
    ///
    /// Valid for every company of a validated configuration.
    #[must_use]
    pub fn company_type(&self, company: CompanyId) -> &CompanyTypeConfig {
        &self.company_types[self.companies[company.index()].company_type]
    }

    /// Iterate over all company IDs in configuration order.
    pub fn company_ids(&self) -> impl Iterator<Item = CompanyId> {
        (0..self.companies.len() as u16).map(CompanyId)
    }

    /// Iterate over all private IDs in configuration order.
    pub fn private_ids(&self) -> impl Iterator<Item = PrivateId> {
        (0..self.privates.len() as u16).map(PrivateId)
    }

    /// Check every cross-reference in the configuration.
    pub fn validate(&self) -> Result<(), ConfigurationFault> {
        if self.phases.is_empty() {
            return Err(ConfigurationFault::NoPhases);
        }
        if self.train_types.is_empty() {
            return Err(ConfigurationFault::NoTrainTypes);
        }
        if self.min_players == 0 || self.min_players > self.max_players {
            return Err(ConfigurationFault::InvalidPlayerRange {
                min: self.min_players,
                max: self.max_players,
            });
        }
        for players in self.min_players..=self.max_players {
            if self.certificate_limit(players as usize).is_none() {
                return Err(ConfigurationFault::NoCertificateLimit { players });
            }
        }

        for company_type in &self.company_types {
            if company_type.share_units == 0
                || company_type.president_units == 0
                || company_type.president_units > company_type.share_units
                || company_type.float_units > company_type.share_units
                || company_type.allocations.is_empty()
            {
                return Err(ConfigurationFault::InvalidShareStructure {
                    company_type: company_type.name.clone(),
                });
            }
        }

        let needs_par = self.companies.iter().any(|company| {
            self.company_types
                .get(company.company_type)
                .is_some_and(|t| t.has_stock_price)
        });
        if needs_par && self.market.par_cells.is_empty() {
            return Err(ConfigurationFault::NoParCells);
        }

        for (index, company) in self.companies.iter().enumerate() {
            let Some(company_type) = self.company_types.get(company.company_type) else {
                return Err(ConfigurationFault::UnknownCompanyType {
                    company: company.name.clone(),
                    index: company.company_type,
                });
            };
            if let Some(hex) = company.home_hex {
                if hex.index() >= self.hexes.len() {
                    return Err(ConfigurationFault::UnknownHex {
                        context: format!("home of {}", company.name),
                        hex,
                    });
                }
            }
            if !company_type.has_stock_price && company.fixed_price.is_none() {
                return Err(ConfigurationFault::MissingFixedPrice {
                    company: CompanyId(index as u16),
                });
            }
        }

        for pos in self.market.par_cells.iter().chain(&self.market.end_game_cells) {
            if self.market.price(*pos).is_none() {
                return Err(ConfigurationFault::CellOffMarket { cell: *pos });
            }
        }

        for (index, train) in self.train_types.iter().enumerate() {
            if let Some(phase) = train.starts_phase {
                if phase >= self.phases.len() {
                    return Err(ConfigurationFault::UnknownPhase {
                        train: train.name.clone(),
                        phase,
                    });
                }
            }
            if let Some(rusted_by) = train.rusted_by {
                if rusted_by.index() >= self.train_types.len() || rusted_by.index() == index {
                    return Err(ConfigurationFault::UnknownTrainType {
                        context: format!("rusting of {}", train.name),
                        train_type: rusted_by,
                    });
                }
            }
        }

        for (index, hex) in self.hexes.iter().enumerate() {
            for tile in &hex.upgrades {
                if tile.index() >= self.tiles.len() {
                    return Err(ConfigurationFault::UnknownTile {
                        hex: HexId(index as u16),
                        tile: *tile,
                    });
                }
            }
        }

        for private in &self.privates {
            if let Some(
                SpecialProperty::ExtraTileLay { hexes } | SpecialProperty::ExtraTokenLay { hexes },
            ) = &private.special
            {
                if let Some(hex) = hexes.iter().find(|hex| hex.index() >= self.hexes.len()) {
                    return Err(ConfigurationFault::UnknownHex {
                        context: format!("special property of {}", private.name),
                        hex: *hex,
                    });
                }
            }
        }

        if self.start_round.is_some() && self.privates.is_empty() {
            return Err(ConfigurationFault::EmptyStartPacket);
        }

        Ok(())
    }
}
