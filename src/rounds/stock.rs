//! Stock round.
//!
//! ## Turn
//!
//! Sellable holdings are computed first. A player over the certificate
//! limit or over a holding limit may only sell. Otherwise the player may
//! start a company, buy one certificate (IPO at par, pool at the current
//! price) and sell as the sequence rule allows, then ends the turn with
//! `Done`. A player who has not acted passes instead.
//!
//! ## End
//!
//! A run of passes as long as the number of active players ends the round.
//! Sold-out companies move up and priority goes to the seat after the last
//! player who acted.

use im::{OrdSet, Vector};
use log::debug;

use crate::core::{
    Action, CompanyId, Command, GameConfig, Money, PlayerId, PlayerMap, PossibleActionSet,
    RuleViolation, SequenceRule, ShareSource,
};
use crate::world::{PriceMove, World};

use super::round::{wrong_step, Round, RoundContext, RoundKind, RoundStatus};

/// What the current player did this turn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct StockTurn {
    acted: bool,
    bought: bool,
    sold_before_buy: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StockRound {
    number: u32,

    /// Selling is barred in the first stock round of some titles.
    first_of_game: bool,
    current: PlayerId,
    consecutive_passes: usize,
    turn: StockTurn,
    sold_this_round: PlayerMap<OrdSet<CompanyId>>,
    last_actor: Option<PlayerId>,
}

impl StockRound {
    #[must_use]
    pub fn new(number: u32, first_of_game: bool, world: &World) -> Self {
        Self {
            number,
            first_of_game,
            current: world.priority_player,
            consecutive_passes: 0,
            turn: StockTurn::default(),
            sold_this_round: PlayerMap::new(world.player_count(), |_| OrdSet::new()),
            last_actor: None,
        }
    }

    fn active_players(world: &World) -> usize {
        world.players.iter().filter(|(_, p)| !p.bankrupt).count()
    }

    fn selling_allowed(&self, config: &GameConfig) -> bool {
        if self.first_of_game && config.no_sale_in_first_stock_round {
            return false;
        }
        match config.sequence_rule {
            SequenceRule::SellBuySell => true,
            SequenceRule::SellBuy => !self.turn.bought,
            SequenceRule::SellBuyOrBuySell => !(self.turn.bought && self.turn.sold_before_buy),
        }
    }

    /// Units of each company `player` may sell now.
    fn sellables(&self, world: &World, config: &GameConfig, player: PlayerId) -> Vec<(CompanyId, u8, Money)> {
        if !self.selling_allowed(config) {
            return Vec::new();
        }
        world
            .company_ids()
            .filter_map(|company| {
                let units = world.sellable_units(config, player, company);
                let price = world.share_price(company)?;
                (units > 0).then_some((company, units, price))
            })
            .collect()
    }

    /// Whether `player` may take one more certificate of `company`.
    fn may_acquire(&self, world: &World, config: &GameConfig, player: PlayerId, company: CompanyId) -> bool {
        !self.sold_this_round[player].contains(&company)
            && world.has_certificate_room(config, player)
            && world.company(company).units_of(player) < world.holding_limit(config, company)
    }

    /// Price and units of starting `company`, if it can be started at `par`.
    fn start_cost(world: &World, company: CompanyId, par: Money) -> Money {
        par * Money::from(world.company(company).kind.president_units)
    }

    fn par_options(world: &World, company: CompanyId) -> Vec<Money> {
        let c = world.company(company);
        if c.kind.has_stock_price {
            world.market.par_prices().collect()
        } else {
            c.fixed_price.into_iter().collect()
        }
    }

    fn buy_options(&self, world: &World, config: &GameConfig, player: PlayerId, out: &mut PossibleActionSet) {
        let cash = world.players[player].cash;
        for company in world.company_ids() {
            let c = world.company(company);
            if c.closed {
                continue;
            }

            if !c.started {
                if !world.has_certificate_room(config, player) {
                    continue;
                }
                for par in Self::par_options(world, company) {
                    if Self::start_cost(world, company, par) <= cash {
                        out.add(Action::new(
                            player,
                            Command::StartCompany { company, par_price: par },
                        ));
                    }
                }
                continue;
            }

            if !self.may_acquire(world, config, player, company) {
                continue;
            }
            if c.ipo_units > 0 {
                if let Some(par) = c.par_price.filter(|par| *par <= cash) {
                    out.add(Action::new(
                        player,
                        Command::BuyCertificate {
                            company,
                            source: ShareSource::Ipo,
                            units: 1,
                            price: par,
                        },
                    ));
                }
            }
            if c.pool_units > 0 {
                if let Some(price) = world.share_price(company).filter(|p| *p <= cash) {
                    out.add(Action::new(
                        player,
                        Command::BuyCertificate {
                            company,
                            source: ShareSource::Pool,
                            units: 1,
                            price,
                        },
                    ));
                }
            }
        }
    }

    fn end_turn(&mut self, world: &World) {
        self.turn = StockTurn::default();
        self.current = next_solvent(world, self.current);
    }

    fn mark_acted(&mut self, player: PlayerId) {
        self.turn.acted = true;
        self.consecutive_passes = 0;
        self.last_actor = Some(player);
    }

    fn insufficient(world: &World, player: PlayerId, needed: Money) -> RuleViolation {
        RuleViolation::InsufficientFunds {
            holder: world.players[player].name.clone(),
            needed,
            available: world.players[player].cash,
        }
    }
}

impl Round for StockRound {
    fn kind(&self) -> RoundKind {
        RoundKind::Stock
    }

    fn label(&self) -> String {
        format!("SR {}", self.number)
    }

    fn current_player(&self, _world: &World) -> PlayerId {
        self.current
    }

    fn begin(&mut self, world: &mut World, _ctx: &RoundContext<'_>) -> Result<RoundStatus, RuleViolation> {
        world.report.add(format!("{} starts", self.label()));
        Ok(RoundStatus::Continue)
    }

    fn set_possible_actions(&self, world: &World, ctx: &RoundContext<'_>, out: &mut PossibleActionSet) {
        let player = self.current;
        let config = ctx.config;

        for (company, units, price) in self.sellables(world, config, player) {
            out.add(Action::new(
                player,
                Command::SellShares { company, units, price },
            ));
        }

        let over_limit = world.over_certificate_limit(config, player)
            || world.over_holding_limit(config, player).is_some();
        if over_limit {
            if out.is_empty() {
                out.add(Action::pass(player));
            }
            return;
        }

        if !self.turn.bought {
            self.buy_options(world, config, player, out);
        }

        if self.turn.acted {
            out.add(Action::done(player));
        } else {
            out.add(Action::pass(player));
        }
    }

    fn process(
        &mut self,
        world: &mut World,
        ctx: &RoundContext<'_>,
        action: &Action,
    ) -> Result<RoundStatus, RuleViolation> {
        let config = ctx.config;
        let player = action.player;

        match &action.command {
            Command::StartCompany { company, par_price } => {
                let c = world.company(*company);
                if c.started {
                    return Err(RuleViolation::AlreadyStarted { company: *company });
                }
                if self.turn.bought {
                    return Err(wrong_step(action, "a turn after buying"));
                }
                if !Self::par_options(world, *company).contains(par_price) {
                    return Err(RuleViolation::InvalidPrice {
                        price: *par_price,
                        min: 0,
                        max: 0,
                    });
                }
                if !world.has_certificate_room(config, player) {
                    return Err(RuleViolation::CertificateLimit { player });
                }
                let cost = Self::start_cost(world, *company, *par_price);
                if world.players[player].cash < cost {
                    return Err(Self::insufficient(world, player, cost));
                }

                world.start_company(player, *company, *par_price);
                self.turn.bought = true;
                self.mark_acted(player);
                Ok(RoundStatus::Continue)
            }

            Command::BuyCertificate { company, source, units, price } => {
                if self.turn.bought {
                    return Err(wrong_step(action, "a turn after buying"));
                }
                if *units != 1 {
                    return Err(RuleViolation::InvalidQuantity { count: *units });
                }
                let c = world.company(*company);
                let (available, expected) = match source {
                    ShareSource::Ipo => (c.ipo_units, c.par_price),
                    ShareSource::Pool => (c.pool_units, world.share_price(*company)),
                };
                if !c.started || available == 0 {
                    return Err(RuleViolation::NoCertificate { company: *company });
                }
                if expected != Some(*price) {
                    let face = expected.unwrap_or(0);
                    return Err(RuleViolation::InvalidPrice { price: *price, min: face, max: face });
                }
                if self.sold_this_round[player].contains(company) {
                    return Err(RuleViolation::SoldThisRound { company: *company });
                }
                if !world.has_certificate_room(config, player) {
                    return Err(RuleViolation::CertificateLimit { player });
                }
                if c.units_of(player) >= world.holding_limit(config, *company) {
                    return Err(RuleViolation::HoldingLimit { company: *company });
                }
                if world.players[player].cash < *price {
                    return Err(Self::insufficient(world, player, *price));
                }

                world.buy_shares(player, *company, *source, 1, *price);
                self.turn.bought = true;
                self.mark_acted(player);
                Ok(RoundStatus::Continue)
            }

            Command::SellShares { company, units, price } => {
                let allowed = self
                    .sellables(world, config, player)
                    .into_iter()
                    .find(|(c, _, _)| c == company);
                match allowed {
                    Some((_, max, current)) if *units >= 1 && *units <= max && *price == current => {}
                    _ => {
                        return Err(RuleViolation::NotSellable { company: *company, units: *units })
                    }
                }

                world.sell_shares(player, *company, *units, *price);
                self.sold_this_round[player].insert(*company);
                if !self.turn.bought {
                    self.turn.sold_before_buy = true;
                }
                self.mark_acted(player);
                Ok(RoundStatus::Continue)
            }

            Command::Done => {
                if !self.turn.acted {
                    return Err(wrong_step(action, "a turn without action"));
                }
                debug!("{} ends the turn", player);
                self.end_turn(world);
                Ok(RoundStatus::Continue)
            }

            Command::Pass => {
                world.report.add(format!("{} passes", world.players[player].name));
                self.consecutive_passes += 1;
                if self.consecutive_passes >= Self::active_players(world) {
                    return Ok(self.finish_round(world, ctx));
                }
                self.end_turn(world);
                Ok(RoundStatus::Continue)
            }

            _ => Err(wrong_step(action, self.label())),
        }
    }

    fn resume(
        &mut self,
        _world: &mut World,
        _ctx: &RoundContext<'_>,
        pending: Option<Action>,
    ) -> Result<RoundStatus, RuleViolation> {
        if let Some(action) = pending {
            log::error!("stock round cannot resume {}", action);
        }
        Ok(RoundStatus::Continue)
    }

    fn finish_round(&mut self, world: &mut World, _ctx: &RoundContext<'_>) -> RoundStatus {
        let sold_out: Vector<_> = world
            .company_ids()
            .filter(|c| world.company(*c).is_sold_out() && world.company(*c).kind.has_stock_price)
            .collect();
        for company in sold_out {
            world.move_price(company, PriceMove::Up);
        }
        if let Some(actor) = self.last_actor {
            world.priority_player = next_solvent(world, actor);
        }
        world.report.add(format!("{} ends", self.label()));
        RoundStatus::Finished
    }
}

/// The first seat after `player` that is not bankrupt.
fn next_solvent(world: &World, player: PlayerId) -> PlayerId {
    let count = world.player_count();
    let next = player.next(count);
    next.order_from(count)
        .find(|p| !world.players[*p].bankrupt)
        .unwrap_or(next)
}
