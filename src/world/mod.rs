//! Game-world collaborators.
//!
//! The round engine owns legality and sequencing; `World` executes the
//! effects of validated actions: moving cash, certificates, trains, tiles
//! and station markers. Every collection is an `im` persistent structure so
//! a whole `World` snapshot is cheap to clone for the change stack.
//!
//! Methods here assume the caller has validated the action. They never
//! fail; a few report whether anything changed.

pub mod board;
pub mod company;
pub mod market;
pub mod report;
pub mod start_packet;
pub mod trains;

use std::sync::Arc;

use im::Vector;
use log::{debug, error};

use crate::core::{
    CashHolder, CompanyId, ConfigurationFault, DividendAllocation, GameConfig, Money, PlayerId,
    PlayerMap, PrivateId, ShareSource, TrainSource, TrainTypeId,
};

pub use board::{Board, HexState};
pub use company::{Company, PrivateCompany, PrivateOwner};
pub use market::{PriceMove, StockMarket};
pub use report::GameReport;
pub use start_packet::{ItemStatus, StartItem, StartPacket};
pub use trains::{PhaseManager, TrainDepot, TrainPurchase};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Player {
    pub name: String,
    pub cash: Money,
    pub bankrupt: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bank {
    pub cash: Money,

    /// The bank ran out of money; the game ends at the next end point.
    pub broken: bool,
}

/// Everything on the table.
#[derive(Clone, Debug, PartialEq)]
pub struct World {
    pub players: PlayerMap<Player>,
    pub companies: Vector<Company>,
    pub privates: Vector<PrivateCompany>,
    pub bank: Bank,
    pub market: StockMarket,
    pub trains: TrainDepot,
    pub phases: PhaseManager,
    pub board: Board,
    pub start_packet: StartPacket,

    /// Seat that starts the next stock or start round.
    pub priority_player: PlayerId,

    pub report: GameReport,
}

impl World {
    /// Set up the table for the given seats.
    pub fn new(config: &GameConfig, player_names: &[String]) -> Result<Self, ConfigurationFault> {
        let count = player_names.len();
        if count < config.min_players as usize || count > config.max_players as usize {
            return Err(ConfigurationFault::PlayerCount {
                count,
                min: config.min_players,
                max: config.max_players,
            });
        }

        let start_cash = config.player_capital / count as Money;
        let players = PlayerMap::from_vec(
            player_names
                .iter()
                .map(|name| Player {
                    name: name.clone(),
                    cash: start_cash,
                    bankrupt: false,
                })
                .collect(),
        );

        let kinds: Vec<_> = config.company_types.iter().cloned().map(Arc::new).collect();
        let mut companies = Vector::new();
        for (id, company) in config.company_ids().zip(&config.companies) {
            let Some(kind) = kinds.get(company.company_type) else {
                return Err(ConfigurationFault::UnknownCompanyType {
                    company: company.name.clone(),
                    index: company.company_type,
                });
            };
            companies.push_back(Company::new(id, company, Arc::clone(kind), count));
        }

        let privates = config
            .private_ids()
            .zip(&config.privates)
            .map(|(id, private)| PrivateCompany::new(id, private))
            .collect();

        let mut start_packet = if config.start_round.is_some() {
            StartPacket::new(
                config
                    .private_ids()
                    .zip(&config.privates)
                    .map(|(id, private)| (id, private.base_price)),
                count,
            )
        } else {
            StartPacket::new(std::iter::empty(), count)
        };
        start_packet.refresh_status();

        Ok(Self {
            players,
            companies,
            privates,
            bank: Bank {
                cash: config.bank_cash - start_cash * count as Money,
                broken: false,
            },
            market: StockMarket::new(Arc::new(config.market.clone())),
            trains: TrainDepot::new(Arc::new(config.train_types.clone())),
            phases: PhaseManager::new(Arc::new(config.phases.clone())),
            board: Board::new(
                Arc::new(config.hexes.clone()),
                Arc::new(config.tiles.clone()),
            ),
            start_packet,
            priority_player: PlayerId(0),
            report: GameReport::new(),
        })
    }

    #[must_use]
    pub fn player_count(&self) -> usize {
        self.players.player_count()
    }

    /// Company by id. Ids come from the configuration, so indexing is valid.
    #[must_use]
    pub fn company(&self, id: CompanyId) -> &Company {
        &self.companies[id.index()]
    }

    pub fn company_mut(&mut self, id: CompanyId) -> &mut Company {
        &mut self.companies[id.index()]
    }

    #[must_use]
    pub fn private(&self, id: PrivateId) -> &PrivateCompany {
        &self.privates[id.index()]
    }

    pub fn private_mut(&mut self, id: PrivateId) -> &mut PrivateCompany {
        &mut self.privates[id.index()]
    }

    pub fn company_ids(&self) -> impl Iterator<Item = CompanyId> {
        (0..self.companies.len() as u16).map(CompanyId)
    }

    /// Current share price: the market cell, or the fixed price of a
    /// price-less company.
    #[must_use]
    pub fn share_price(&self, company: CompanyId) -> Option<Money> {
        let company = self.company(company);
        match company.market_position {
            Some(pos) => self.market.price(pos),
            None => company.fixed_price,
        }
    }

    // === Cash ===

    #[must_use]
    pub fn cash(&self, holder: CashHolder) -> Money {
        match holder {
            CashHolder::Player(player) => self.players[player].cash,
            CashHolder::Company(company) => self.company(company).cash,
            CashHolder::Bank => self.bank.cash,
        }
    }

    /// Whether `holder` is the bank or a seat or company of this game.
    #[must_use]
    pub fn has_holder(&self, holder: CashHolder) -> bool {
        match holder {
            CashHolder::Player(player) => player.index() < self.player_count(),
            CashHolder::Company(company) => company.index() < self.companies.len(),
            CashHolder::Bank => true,
        }
    }

    /// Balance of `holder` after receiving `amount`; `None` if it would not
    /// fit in `Money`.
    #[must_use]
    pub fn cash_after(&self, holder: CashHolder, amount: Money) -> Option<Money> {
        self.cash(holder).checked_add(amount)
    }

    fn adjust(&mut self, holder: CashHolder, amount: Money) {
        let cash = match holder {
            CashHolder::Player(player) => &mut self.players[player].cash,
            CashHolder::Company(company) => &mut self.companies[company.index()].cash,
            CashHolder::Bank => &mut self.bank.cash,
        };
        *cash = match cash.checked_add(amount) {
            Some(balance) => balance,
            None => {
                error!("{:?} balance overflows on {:+}", holder, amount);
                cash.saturating_add(amount)
            }
        };
        if holder == CashHolder::Bank && self.bank.cash < 0 && !self.bank.broken {
            self.bank.broken = true;
            self.report.add("The bank is broken");
        }
    }

    /// Move cash between holders. Only the bank may go negative.
    pub fn transfer(&mut self, from: CashHolder, to: CashHolder, amount: Money) {
        if amount == 0 || from == to {
            return;
        }
        self.adjust(from, -amount);
        self.adjust(to, amount);
    }

    /// Name of a cash holder, for messages.
    #[must_use]
    pub fn holder_name(&self, holder: CashHolder) -> String {
        match holder {
            CashHolder::Player(player) => self.players[player].name.clone(),
            CashHolder::Company(company) => self.company(company).name.clone(),
            CashHolder::Bank => "Bank".to_string(),
        }
    }

    // === Certificates and limits ===

    /// Certificates held by a player, privates included.
    #[must_use]
    pub fn certificate_count(&self, player: PlayerId) -> u32 {
        let shares: u32 = self.companies.iter().map(|c| c.certificates_of(player)).sum();
        let privates = self.privates.iter().filter(|p| p.owned_by_player(player)).count() as u32;
        shares + privates
    }

    #[must_use]
    pub fn certificate_limit(&self, config: &GameConfig) -> u32 {
        config
            .certificate_limit(self.player_count())
            .map_or(u32::MAX, u32::from)
    }

    #[must_use]
    pub fn over_certificate_limit(&self, config: &GameConfig, player: PlayerId) -> bool {
        self.certificate_count(player) > self.certificate_limit(config)
    }

    /// Whether `player` can take one more certificate.
    #[must_use]
    pub fn has_certificate_room(&self, config: &GameConfig, player: PlayerId) -> bool {
        self.certificate_count(player) < self.certificate_limit(config)
    }

    /// Maximum units of one company a player may hold.
    #[must_use]
    pub fn holding_limit(&self, config: &GameConfig, company: CompanyId) -> u8 {
        let kind = &self.company(company).kind;
        let by_share = (u16::from(kind.share_units) * u16::from(config.player_share_limit_pct) / 100) as u8;
        by_share.max(kind.president_units)
    }

    /// Maximum units of one company the bank pool may hold.
    #[must_use]
    pub fn pool_limit(&self, config: &GameConfig, company: CompanyId) -> u8 {
        let kind = &self.company(company).kind;
        (u16::from(kind.share_units) * u16::from(config.pool_share_limit_pct) / 100) as u8
    }

    /// First company in which `player` holds more than allowed.
    #[must_use]
    pub fn over_holding_limit(&self, config: &GameConfig, player: PlayerId) -> Option<CompanyId> {
        self.company_ids()
            .find(|c| self.company(*c).units_of(player) > self.holding_limit(config, *c))
    }

    /// Units of `company` that `player` may sell to the pool.
    ///
    /// A president may sell into the president certificate only if another
    /// player holds enough to take the presidency over.
    #[must_use]
    pub fn sellable_units(&self, config: &GameConfig, player: PlayerId, company: CompanyId) -> u8 {
        let c = self.company(company);
        if !c.floated || c.closed || !c.kind.has_stock_price {
            return 0;
        }
        let held = c.units_of(player);
        let tradeable = if c.president == Some(player)
            && c.largest_other_holding(player) < c.kind.president_units
        {
            held.saturating_sub(c.kind.president_units)
        } else {
            held
        };
        let pool_room = self.pool_limit(config, company).saturating_sub(c.pool_units);
        tradeable.min(pool_room)
    }

    // === Share trading ===

    /// Start a company at a par price with the president certificate.
    pub fn start_company(&mut self, player: PlayerId, company: CompanyId, par_price: Money) {
        let (president_units, priced) = {
            let kind = &self.company(company).kind;
            (kind.president_units, kind.has_stock_price)
        };
        let cell = if priced { self.market.par_cell(par_price) } else { None };
        self.transfer(
            CashHolder::Player(player),
            CashHolder::Bank,
            par_price * Money::from(president_units),
        );

        {
            let c = self.company_mut(company);
            c.started = true;
            c.par_price = Some(par_price);
            c.market_position = cell;
            c.ipo_units -= president_units;
            c.player_units[player] += president_units;
            c.president = Some(player);
        }
        if let Some(cell) = cell {
            self.market.place(company, cell);
        }

        let line = format!(
            "{} starts {} at {}",
            self.players[player].name,
            self.company(company).name,
            par_price
        );
        self.report.add(line);
        self.float_if_ready(company);
    }

    /// Buy certificates from the IPO or the pool.
    pub fn buy_shares(&mut self, player: PlayerId, company: CompanyId, source: ShareSource, units: u8, price: Money) {
        self.transfer(
            CashHolder::Player(player),
            CashHolder::Bank,
            price * Money::from(units),
        );
        {
            let c = self.company_mut(company);
            match source {
                ShareSource::Ipo => c.ipo_units -= units,
                ShareSource::Pool => c.pool_units -= units,
            }
            c.player_units[player] += units;
        }
        let line = format!(
            "{} buys {} unit(s) of {} from {} for {}",
            self.players[player].name,
            units,
            self.company(company).name,
            match source {
                ShareSource::Ipo => "IPO",
                ShareSource::Pool => "pool",
            },
            price
        );
        self.report.add(line);
        self.change_president(company);
        self.float_if_ready(company);
    }

    /// Sell certificates to the pool; the price drops one row per unit.
    pub fn sell_shares(&mut self, player: PlayerId, company: CompanyId, units: u8, price: Money) {
        self.transfer(
            CashHolder::Bank,
            CashHolder::Player(player),
            price * Money::from(units),
        );
        {
            let c = self.company_mut(company);
            c.player_units[player] -= units;
            c.pool_units += units;
        }
        let line = format!(
            "{} sells {} unit(s) of {} at {}",
            self.players[player].name,
            units,
            self.company(company).name,
            price
        );
        self.report.add(line);
        for _ in 0..units {
            self.move_price(company, PriceMove::Down);
        }
        self.change_president(company);
    }

    fn change_president(&mut self, company: CompanyId) {
        if let Some(president) = self.company_mut(company).update_president() {
            let line = format!(
                "{} becomes president of {}",
                self.players[president].name,
                self.company(company).name
            );
            self.report.add(line);
        }
    }

    /// Float a company whose threshold was reached: full capital from the
    /// bank and the home station marker.
    pub fn float_if_ready(&mut self, company: CompanyId) {
        if !self.company(company).ready_to_float() {
            return;
        }
        let (capital, home) = {
            let c = self.company(company);
            let price = c.par_price.or(c.fixed_price).unwrap_or(0);
            (price * Money::from(c.kind.share_units), c.home_hex)
        };
        self.company_mut(company).floated = true;
        self.transfer(CashHolder::Bank, CashHolder::Company(company), capital);
        if let Some(hex) = home {
            if self.company(company).free_tokens > 0 && self.board.place_token(company, hex) {
                self.company_mut(company).free_tokens -= 1;
            }
        }
        let line = format!("{} floats with {}", self.company(company).name, capital);
        self.report.add(line);
    }

    /// Move a price token; price-less companies do not move.
    pub fn move_price(&mut self, company: CompanyId, direction: PriceMove) {
        let Some(from) = self.company(company).market_position else {
            return;
        };
        let to = self.market.shift(company, from, direction);
        if to != from {
            debug!("{} moves {:?} from {} to {}", self.company(company).name, direction, from, to);
            self.company_mut(company).market_position = Some(to);
        }
    }

    // === Treasury ===

    pub fn buy_treasury_shares(&mut self, company: CompanyId, units: u8, price: Money) {
        self.transfer(
            CashHolder::Company(company),
            CashHolder::Bank,
            price * Money::from(units),
        );
        let c = self.company_mut(company);
        c.pool_units -= units;
        c.treasury_units += units;
        let line = format!("{} buys {} treasury unit(s) at {}", c.name, units, price);
        self.report.add(line);
    }

    pub fn sell_treasury_shares(&mut self, company: CompanyId, units: u8, price: Money) {
        self.transfer(
            CashHolder::Bank,
            CashHolder::Company(company),
            price * Money::from(units),
        );
        let c = self.company_mut(company);
        c.treasury_units -= units;
        c.pool_units += units;
        let line = format!("{} sells {} treasury unit(s) at {}", c.name, units, price);
        self.report.add(line);
        for _ in 0..units {
            self.move_price(company, PriceMove::Down);
        }
    }

    // === Revenue ===

    /// Distribute a company's revenue and move its price.
    pub fn distribute_revenue(&mut self, company: CompanyId, revenue: Money, allocation: DividendAllocation) {
        for (holder, amount) in self.revenue_payments(company, revenue, allocation) {
            self.transfer(CashHolder::Bank, holder, amount);
        }
        let direction = match allocation {
            DividendAllocation::Withhold => Some(PriceMove::Left),
            DividendAllocation::Payout if revenue > 0 => Some(PriceMove::Right),
            DividendAllocation::Payout => Some(PriceMove::Left),
            DividendAllocation::Split => None,
        };
        if let Some(direction) = direction {
            self.move_price(company, direction);
        }
        self.company_mut(company).last_revenue = revenue;
        let line = format!(
            "{} earns {} and chooses {}",
            self.company(company).name,
            revenue,
            allocation
        );
        self.report.add(line);
    }

    /// Whether the bank can pay `revenue` without any balance leaving the
    /// range of `Money`. The bank itself may still break.
    #[must_use]
    pub fn revenue_fits(&self, company: CompanyId, revenue: Money, allocation: DividendAllocation) -> bool {
        self.bank.cash.checked_sub(revenue).is_some()
            && self
                .revenue_payments(company, revenue, allocation)
                .iter()
                .all(|(holder, amount)| self.cash_after(*holder, *amount).is_some())
    }

    /// Who receives what from the bank. Paid-out revenue goes per share
    /// unit; pool and treasury units pay the company.
    fn revenue_payments(
        &self,
        company: CompanyId,
        revenue: Money,
        allocation: DividendAllocation,
    ) -> Vec<(CashHolder, Money)> {
        let (retained, paid) = match allocation {
            DividendAllocation::Withhold => (revenue, 0),
            DividendAllocation::Payout => (0, revenue),
            DividendAllocation::Split => (revenue / 2, revenue - revenue / 2),
        };
        let c = self.company(company);
        let per_unit = paid / Money::from(c.kind.share_units);
        let mut payments: Vec<_> = c
            .player_units
            .iter()
            .filter(|(_, units)| **units > 0)
            .map(|(player, units)| (CashHolder::Player(player), per_unit * Money::from(*units)))
            .collect();
        let company_units = Money::from(c.pool_units + c.treasury_units);
        payments.push((CashHolder::Company(company), retained + per_unit * company_units));
        payments
    }

    // === Trains ===

    #[must_use]
    pub fn train_limit(&self) -> u8 {
        self.phases.current().train_limit
    }

    #[must_use]
    pub fn over_train_limit(&self, company: CompanyId) -> bool {
        self.company(company).trains.len() > self.train_limit() as usize
    }

    /// Buy a train and apply rusting and phase changes.
    pub fn buy_train(&mut self, company: CompanyId, train_type: TrainTypeId, source: TrainSource, price: Money) {
        let purchase = match source {
            TrainSource::Depot => {
                self.transfer(CashHolder::Company(company), CashHolder::Bank, price);
                self.trains.buy_from_depot(train_type)
            }
            TrainSource::Pool => {
                self.transfer(CashHolder::Company(company), CashHolder::Bank, price);
                self.trains.buy_from_pool(train_type);
                TrainPurchase::default()
            }
            TrainSource::Company(seller) => {
                self.transfer(CashHolder::Company(company), CashHolder::Company(seller), price);
                self.company_mut(seller).remove_train(train_type);
                TrainPurchase::default()
            }
        };
        self.company_mut(company).trains.push_back(train_type);

        let line = format!(
            "{} buys a {} train for {}",
            self.company(company).name,
            self.trains.name(train_type),
            price
        );
        self.report.add(line);

        for rusted in &purchase.rusted {
            for c in self.companies.iter_mut() {
                c.trains.retain(|t| t != rusted);
            }
            let line = format!("{} trains rust", self.trains.name(*rusted));
            self.report.add(line);
        }
        if let Some(phase) = purchase.new_phase {
            self.enter_phase(phase);
        }
    }

    /// Move to a later phase.
    pub fn enter_phase(&mut self, phase: usize) {
        if !self.phases.advance_to(phase) {
            return;
        }
        let current = self.phases.current().clone();
        self.report.add(format!("Phase {} starts", current.name));
        if current.closes_privates {
            let open: Vec<_> = self.privates.iter().filter(|p| !p.closed).map(|p| p.id).collect();
            for private in open {
                self.close_private(private);
            }
        }
    }

    /// Put a company's train into the pool.
    pub fn discard_train(&mut self, company: CompanyId, train_type: TrainTypeId) {
        if self.company_mut(company).remove_train(train_type) {
            self.trains.pool.push_back(train_type);
            let line = format!(
                "{} discards a {} train",
                self.company(company).name,
                self.trains.name(train_type)
            );
            self.report.add(line);
        }
    }

    // === Loans ===

    pub fn take_loans(&mut self, company: CompanyId, count: u8) {
        let value = self.company(company).kind.loans.map_or(0, |terms| terms.value);
        self.transfer(
            CashHolder::Bank,
            CashHolder::Company(company),
            value * Money::from(count),
        );
        self.company_mut(company).loans += count;
        let line = format!("{} takes {} loan(s)", self.company(company).name, count);
        self.report.add(line);
    }

    /// Repay loans; the president covers what the company cannot.
    pub fn repay_loans(&mut self, company: CompanyId, count: u8, president: PlayerId) {
        let value = self.company(company).kind.loans.map_or(0, |terms| terms.value);
        let total = value * Money::from(count);
        let shortfall = (total - self.company(company).cash).max(0);
        self.transfer(CashHolder::Player(president), CashHolder::Company(company), shortfall);
        self.transfer(CashHolder::Company(company), CashHolder::Bank, total);
        let c = self.company_mut(company);
        c.loans = c.loans.saturating_sub(count);
        let line = format!("{} repays {} loan(s)", c.name, count);
        self.report.add(line);
    }

    // === Privates ===

    /// Privates pay their owners at the start of each operating round.
    pub fn pay_private_revenues(&mut self) {
        let payments: Vec<_> = self
            .privates
            .iter()
            .filter(|p| !p.closed)
            .filter_map(|p| p.owner.map(|owner| (owner, p.revenue)))
            .collect();
        for (owner, revenue) in payments {
            let to = match owner {
                PrivateOwner::Player(player) => CashHolder::Player(player),
                PrivateOwner::Company(company) => CashHolder::Company(company),
            };
            self.transfer(CashHolder::Bank, to, revenue);
        }
    }

    pub fn close_private(&mut self, private: PrivateId) {
        let p = self.private_mut(private);
        if !p.closed {
            p.closed = true;
            let line = format!("{} closes", p.name);
            self.report.add(line);
        }
    }

    /// A company buys a private from the player owning it.
    pub fn buy_private(&mut self, company: CompanyId, private: PrivateId, price: Money) {
        if let Some(PrivateOwner::Player(seller)) = self.private(private).owner {
            self.transfer(CashHolder::Company(company), CashHolder::Player(seller), price);
        }
        self.private_mut(private).owner = Some(PrivateOwner::Company(company));
        let line = format!(
            "{} buys {} for {}",
            self.company(company).name,
            self.private(private).name,
            price
        );
        self.report.add(line);
    }

    /// Cash plus share and private value.
    #[must_use]
    pub fn player_worth(&self, player: PlayerId) -> Money {
        let shares: Money = self
            .company_ids()
            .map(|c| {
                let units = Money::from(self.company(c).units_of(player));
                units * self.share_price(c).unwrap_or(0)
            })
            .sum();
        let privates: Money = self
            .privates
            .iter()
            .filter(|p| p.owned_by_player(player))
            .map(|p| p.base_price)
            .sum();
        self.players[player].cash + shares + privates
    }
}
