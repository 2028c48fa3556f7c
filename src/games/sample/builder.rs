use crate::core::{
    CompanyConfig, CompanyTypeConfig, GameConfig, HexConfig, LegacyDoneSkip, MarketConfig,
    MarketPosition, Money, PhaseConfig, PrivateConfig, SequenceRule, SpecialProperty,
    StartRoundConfig, TileColour, TileConfig, TrainTypeConfig,
};

use super::{CITY, MOUNTAIN, TILE_14, TILE_15, TILE_63, TILE_7, TILE_8, TRAIN_4, TRAIN_5};

const PRICE_LADDER: [Money; 12] = [40, 50, 60, 67, 71, 76, 82, 90, 100, 112, 126, 142];
const MARKET_ROWS: u8 = 3;
const MARKET_COLS: u8 = 10;

/// Builder for the sample ruleset.
#[derive(Clone, Debug)]
pub struct SampleGameBuilder {
    treasury_trading: bool,
    loans: bool,
    start_round: bool,
    reduce_price_on_all_pass: bool,
    skip_first_stock_round: bool,
    dynamic_operating_order: bool,
    game_ends_after_set_of_ors: bool,
    sequence_rule: SequenceRule,
    legacy_done_skip: LegacyDoneSkip,
    bank_cash: Money,
}

impl Default for SampleGameBuilder {
    fn default() -> Self {
        Self {
            treasury_trading: false,
            loans: false,
            start_round: true,
            reduce_price_on_all_pass: true,
            skip_first_stock_round: false,
            dynamic_operating_order: true,
            game_ends_after_set_of_ors: true,
            sequence_rule: SequenceRule::SellBuy,
            legacy_done_skip: LegacyDoneSkip::default(),
            bank_cash: 12_000,
        }
    }
}

impl SampleGameBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Majors may hold up to five treasury units, in every phase.
    pub fn treasury_trading(mut self, enabled: bool) -> Self {
        self.treasury_trading = enabled;
        self
    }

    /// Majors may take loans of 100, at most five.
    pub fn loans(mut self, enabled: bool) -> Self {
        self.loans = enabled;
        self
    }

    /// Play without privates and start round.
    pub fn without_start_round(mut self) -> Self {
        self.start_round = false;
        self
    }

    pub fn reduce_price_on_all_pass(mut self, enabled: bool) -> Self {
        self.reduce_price_on_all_pass = enabled;
        self
    }

    pub fn skip_first_stock_round(mut self, enabled: bool) -> Self {
        self.skip_first_stock_round = enabled;
        self
    }

    pub fn dynamic_operating_order(mut self, enabled: bool) -> Self {
        self.dynamic_operating_order = enabled;
        self
    }

    pub fn game_ends_after_set_of_ors(mut self, enabled: bool) -> Self {
        self.game_ends_after_set_of_ors = enabled;
        self
    }

    pub fn sequence_rule(mut self, rule: SequenceRule) -> Self {
        self.sequence_rule = rule;
        self
    }

    pub fn legacy_done_skip(mut self, policy: LegacyDoneSkip) -> Self {
        self.legacy_done_skip = policy;
        self
    }

    pub fn bank_cash(mut self, cash: Money) -> Self {
        self.bank_cash = cash;
        self
    }

    pub fn build(self) -> GameConfig {
        let mut config = GameConfig::new("Sample");
        config.bank_cash = self.bank_cash;
        config.certificate_limits = vec![(2, 28), (3, 20), (4, 16), (5, 13), (6, 11)];
        config.sequence_rule = self.sequence_rule;
        config.skip_first_stock_round = self.skip_first_stock_round;
        config.dynamic_operating_order = self.dynamic_operating_order;
        config.game_ends_after_set_of_ors = self.game_ends_after_set_of_ors;
        config.legacy_done_skip = self.legacy_done_skip;

        let mut major = CompanyTypeConfig::major("Major");
        if self.treasury_trading {
            major = major.with_treasury_trading(5);
        }
        if self.loans {
            major = major.with_loans(100, 5);
        }
        config.company_types = vec![major, CompanyTypeConfig::minor("Minor")];

        config.companies = vec![
            CompanyConfig::new("PRR", 0).with_home(super::PRR_HOME),
            CompanyConfig::new("NYC", 0).with_home(super::NYC_HOME),
            CompanyConfig::new("B&O", 0).with_home(super::BO_HOME),
            CompanyConfig::new("M1", 1)
                .with_home(super::M1_HOME)
                .with_fixed_price(100),
        ];

        if self.start_round {
            config.privates = vec![
                PrivateConfig::new("Schuylkill Valley", 20, 5),
                PrivateConfig::new("Champlain & St.Lawrence", 40, 10)
                    .with_special(SpecialProperty::ExtraTileLay { hexes: vec![MOUNTAIN] }),
                PrivateConfig::new("Delaware & Hudson", 70, 15)
                    .with_special(SpecialProperty::ExtraTokenLay { hexes: vec![CITY] }),
            ];
            config.start_round = Some(StartRoundConfig {
                reduce_price_on_all_pass: self.reduce_price_on_all_pass,
                ..StartRoundConfig::default()
            });
        }

        config.market = market();

        config.train_types = vec![
            TrainTypeConfig::new("2", 80, 5).rusted_by(TRAIN_4),
            TrainTypeConfig::new("3", 180, 4).starting_phase(1).rusted_by(TRAIN_5),
            TrainTypeConfig::new("4", 300, 3).starting_phase(2),
            TrainTypeConfig::new("5", 450, 2).starting_phase(3),
        ];

        let yellow = [(TileColour::Yellow, 1)];
        let green = [(TileColour::Yellow, 1), (TileColour::Green, 1)];
        let brown = [(TileColour::Yellow, 1), (TileColour::Green, 1), (TileColour::Brown, 1)];
        let mut phases = vec![
            PhaseConfig::new("2", 1, 4).with_tile_lays(&yellow),
            PhaseConfig::new("3", 2, 4).with_tile_lays(&green).with_private_sales(),
            PhaseConfig::new("4", 2, 3).with_tile_lays(&green).with_private_sales(),
            PhaseConfig::new("5", 3, 2).with_tile_lays(&brown).closing_privates(),
        ];
        if self.treasury_trading {
            phases = phases.into_iter().map(PhaseConfig::with_treasury_trading).collect();
        }
        config.phases = phases;

        config.tiles = vec![
            TileConfig { name: "7".into(), colour: TileColour::Yellow, quantity: 4 },
            TileConfig { name: "8".into(), colour: TileColour::Yellow, quantity: 4 },
            TileConfig { name: "14".into(), colour: TileColour::Green, quantity: 2 },
            TileConfig { name: "15".into(), colour: TileColour::Green, quantity: 2 },
            TileConfig { name: "63".into(), colour: TileColour::Brown, quantity: 1 },
        ];

        let all_tiles = [TILE_7, TILE_8, TILE_14, TILE_15, TILE_63];
        config.hexes = vec![
            HexConfig::new("A1").with_upgrades(&all_tiles).with_stations(2, 40),
            HexConfig::new("B2").with_upgrades(&all_tiles).with_stations(1, 40),
            HexConfig::new("C3").with_upgrades(&all_tiles).with_stations(1, 40),
            HexConfig::new("D4").with_upgrades(&all_tiles).with_stations(1, 0),
            HexConfig::new("E5").with_upgrades(&[TILE_7, TILE_8]).with_lay_cost(80),
            HexConfig::new("F6").with_upgrades(&all_tiles).with_stations(1, 40),
        ];

        config
    }
}

/// Row `r`, column `c` holds `PRICE_LADDER[c - r + 2]`: moving down one
/// row costs one rung, moving right gains one.
fn market() -> MarketConfig {
    let prices = (0..MARKET_ROWS)
        .map(|row| {
            (0..MARKET_COLS)
                .map(|col| PRICE_LADDER.get(usize::from(col + 2 - row)).copied())
                .collect()
        })
        .collect();
    MarketConfig {
        prices,
        par_cells: (2..=7).map(|col| MarketPosition::new(1, col)).collect(),
        end_game_cells: vec![MarketPosition::new(0, MARKET_COLS - 1)],
    }
}
