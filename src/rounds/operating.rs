//! Operating round: one turn per operating company, in operating order.
//!
//! ## Steps
//!
//! Each turn walks `INITIAL, LAY_TRACK, LAY_TOKEN, CALC_REVENUE, PAYOUT,
//! BUY_TRAIN, TRADE_SHARES, FINAL`. Leaving a step moves to the next one
//! whose precondition holds (`step_skip_reason` is the predicate table,
//! `next_applicable_step` the pure walk). Reaching FINAL ends the turn.
//!
//! A train purchase that lowers the train limit inserts DISCARD_TRAINS:
//! every company over the limit discards, then the turn returns to the
//! step it came from.
//!
//! ## Interruptions
//!
//! - Emergency train purchase or loan repayment the president cannot pay:
//!   share selling, then the same action is applied again on resume.
//! - TRADE_SHARES: treasury trading, then the walk continues on resume.

use std::fmt;

use im::Vector;
use log::{debug, info};
use smallvec::SmallVec;

use crate::core::{
    Action, CashHolder, CompanyId, Command, DividendAllocation, GameConfig, HexId, Money, PlayerId,
    PossibleActionSet, PrivateId, RuleViolation, TileColour, TileId, TrainSource, TrainTypeId,
};
use crate::engine::variant::GameVariant;
use crate::world::{PrivateOwner, World};

use super::operating_order::{operating_order, reorder_tail};
use super::round::{wrong_step, Round, RoundContext, RoundKind, RoundStatus, SubRoundRequest};
use super::treasury::treasury_trade_possible;

/// Steps of an operating turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OrStep {
    Initial,
    LayTrack,
    LayToken,
    CalcRevenue,
    /// Kept for step numbering; revenue is distributed in CALC_REVENUE.
    Payout,
    BuyTrain,
    TradeShares,
    Final,
    /// Out of band: entered after a purchase put companies over the limit.
    DiscardTrains,
}

const STEP_ORDER: [OrStep; 8] = [
    OrStep::Initial,
    OrStep::LayTrack,
    OrStep::LayToken,
    OrStep::CalcRevenue,
    OrStep::Payout,
    OrStep::BuyTrain,
    OrStep::TradeShares,
    OrStep::Final,
];

impl OrStep {
    /// The step after this one in turn order.
    #[must_use]
    pub fn following(self) -> Option<OrStep> {
        let index = STEP_ORDER.iter().position(|step| *step == self)?;
        STEP_ORDER.get(index + 1).copied()
    }
}

impl fmt::Display for OrStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrStep::Initial => "initial",
            OrStep::LayTrack => "lay track",
            OrStep::LayToken => "lay token",
            OrStep::CalcRevenue => "calculate revenue",
            OrStep::Payout => "payout",
            OrStep::BuyTrain => "buy train",
            OrStep::TradeShares => "trade shares",
            OrStep::Final => "final",
            OrStep::DiscardTrains => "discard trains",
        };
        f.write_str(name)
    }
}

/// Why a step is not played.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SkipReason {
    NoFreeTokens,
    NoTrains,
    Placeholder,
    NoTreasuryTrading,
    NotYetOperated,
    /// Treasury trading is allowed but neither a buy nor a sell fits.
    NoTradePossible,
    Vetoed,
}

/// Everything the step predicates look at.
pub struct StepInputs<'a> {
    pub world: &'a World,
    pub config: &'a GameConfig,
    pub variant: &'a dyn GameVariant,
    pub company: CompanyId,
}

/// The reason `step` is skipped for the company, if it is.
#[must_use]
pub fn step_skip_reason(inputs: &StepInputs<'_>, step: OrStep) -> Option<SkipReason> {
    let world = inputs.world;
    let c = world.company(inputs.company);
    let reason = match step {
        OrStep::LayToken if c.free_tokens == 0 => Some(SkipReason::NoFreeTokens),
        OrStep::CalcRevenue if c.trains.is_empty() => Some(SkipReason::NoTrains),
        OrStep::Payout => Some(SkipReason::Placeholder),
        OrStep::TradeShares => {
            if !c.kind.can_trade_treasury || !world.phases.current().treasury_trading {
                Some(SkipReason::NoTreasuryTrading)
            } else if !c.has_operated {
                Some(SkipReason::NotYetOperated)
            } else if !treasury_trade_possible(world, inputs.config, inputs.company) {
                Some(SkipReason::NoTradePossible)
            } else {
                None
            }
        }
        _ => None,
    };
    if reason.is_some() || matches!(step, OrStep::Initial | OrStep::Final | OrStep::DiscardTrains) {
        return reason;
    }
    inputs
        .variant
        .step_vetoed(world, inputs.company, step)
        .then_some(SkipReason::Vetoed)
}

/// First step after `from` that is not skipped.
///
/// None when `from` is FINAL or the out-of-band DISCARD_TRAINS.
#[must_use]
pub fn next_applicable_step(inputs: &StepInputs<'_>, from: OrStep) -> Option<OrStep> {
    let mut step = from.following()?;
    while step_skip_reason(inputs, step).is_some() {
        step = step.following()?;
    }
    Some(step)
}

/// Per-turn scratch data, reset when a company starts its turn.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct TurnState {
    /// Normal tile lays left per colour.
    tile_budget: SmallVec<[(TileColour, u8); 4]>,
    token_laid: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperatingRound {
    set_number: u32,
    round_in_set: u8,
    order: Vector<CompanyId>,
    position: usize,
    step: OrStep,
    turn: TurnState,

    /// Companies still to discard, front first.
    discard_queue: Vector<CompanyId>,
    resume_step: OrStep,

    /// TRADE_SHARES was skipped although treasury trading is allowed; an
    /// older log may carry a `Done` for it.
    redundant_done: bool,
}

impl OperatingRound {
    #[must_use]
    pub fn new(set_number: u32, round_in_set: u8) -> Self {
        Self {
            set_number,
            round_in_set,
            order: Vector::new(),
            position: 0,
            step: OrStep::Initial,
            turn: TurnState::default(),
            discard_queue: Vector::new(),
            resume_step: OrStep::BuyTrain,
            redundant_done: false,
        }
    }

    #[must_use]
    pub fn step(&self) -> OrStep {
        self.step
    }

    #[must_use]
    pub fn round_in_set(&self) -> u8 {
        self.round_in_set
    }

    #[must_use]
    pub fn order(&self) -> &Vector<CompanyId> {
        &self.order
    }

    /// The company whose turn it is.
    #[must_use]
    pub fn operating_company(&self) -> Option<CompanyId> {
        self.order.get(self.position).copied()
    }

    // === Turn flow ===

    fn start_turn(&mut self, world: &mut World, ctx: &RoundContext<'_>) -> RoundStatus {
        let Some(company) = self.operating_company() else {
            return self.finish_round(world, ctx);
        };
        self.step = OrStep::Initial;
        self.turn = TurnState {
            tile_budget: world.phases.current().tile_lays.iter().copied().collect(),
            token_laid: false,
        };
        let line = format!("{} operates", world.company(company).name);
        world.report.add(line);
        self.advance(world, ctx)
    }

    /// Leave the current step for the next applicable one.
    fn advance(&mut self, world: &mut World, ctx: &RoundContext<'_>) -> RoundStatus {
        let Some(company) = self.operating_company() else {
            return self.finish_round(world, ctx);
        };
        while let Some(next) = self.step.following() {
            let reason = step_skip_reason(
                &StepInputs {
                    world: &*world,
                    config: ctx.config,
                    variant: ctx.variant,
                    company,
                },
                next,
            );
            self.step = next;
            match reason {
                Some(reason) => self.skip(world, company, next, reason),
                None => break,
            }
        }
        debug!("{} {}: {}", self.label(), company, self.step);

        match self.step {
            OrStep::Final => self.finish_turn(world, ctx),
            OrStep::TradeShares => {
                RoundStatus::interrupt(SubRoundRequest::TreasuryShares { company }, None)
            }
            _ => RoundStatus::Continue,
        }
    }

    fn skip(&mut self, world: &mut World, company: CompanyId, step: OrStep, reason: SkipReason) {
        debug!("{} skips {} ({:?})", company, step, reason);
        match (step, reason) {
            (OrStep::CalcRevenue, _) => {
                world.distribute_revenue(company, 0, DividendAllocation::Withhold);
            }
            (OrStep::TradeShares, SkipReason::NoTradePossible) => self.redundant_done = true,
            _ => {}
        }
    }

    fn finish_turn(&mut self, world: &mut World, ctx: &RoundContext<'_>) -> RoundStatus {
        if let Some(company) = self.operating_company() {
            world.company_mut(company).has_operated = true;
            ctx.variant.close_exhausted_privates(world, company);
        }
        self.position += 1;

        if ctx.config.dynamic_operating_order && reorder_tail(world, &mut self.order, self.position) {
            debug!("{}: operating order now {:?}", self.label(), self.order);
        }
        while self
            .operating_company()
            .is_some_and(|c| !world.company(c).is_operating())
        {
            self.position += 1;
        }

        if self.operating_company().is_none() {
            return self.finish_round(world, ctx);
        }
        self.start_turn(world, ctx)
    }

    // === Track ===

    fn tile_budget(&self, colour: TileColour) -> u8 {
        self.turn
            .tile_budget
            .iter()
            .find(|(c, _)| *c == colour)
            .map_or(0, |(_, left)| *left)
    }

    /// A normal lay of `colour` uses one lay and rules out other colours.
    fn spend_tile_lay(&mut self, colour: TileColour) {
        for (c, left) in &mut self.turn.tile_budget {
            if *c == colour {
                *left = left.saturating_sub(1);
            } else {
                *left = 0;
            }
        }
    }

    fn usable_special(world: &World, company: CompanyId, private: PrivateId) -> bool {
        world
            .privates
            .get(private.index())
            .is_some_and(|p| !p.closed && !p.special_used && p.owned_by_company(company))
    }

    fn tile_options(&self, world: &World, company: CompanyId) -> Vec<Command> {
        let cash = world.company(company).cash;
        let lay = |hex: HexId, tile: TileId, special: Option<PrivateId>| Command::LayTile {
            company,
            hex,
            tile,
            rotation: 0,
            special,
        };

        let mut options = Vec::new();
        for hex in world.board.hex_ids() {
            if world.board.lay_cost(hex) > cash {
                continue;
            }
            for tile in world.board.legal_tiles(hex) {
                let budget = world.board.tile_colour(tile).map_or(0, |c| self.tile_budget(c));
                if budget > 0 {
                    options.push(lay(hex, tile, None));
                }
            }
        }
        for private in world.privates.iter() {
            if !Self::usable_special(world, company, private.id) {
                continue;
            }
            for hex in private.extra_tile_hexes().unwrap_or_default() {
                if world.board.lay_cost(*hex) > cash {
                    continue;
                }
                for tile in world.board.legal_tiles(*hex) {
                    options.push(lay(*hex, tile, Some(private.id)));
                }
            }
        }
        options
    }

    #[allow(clippy::too_many_arguments)]
    fn lay_tile(
        &mut self,
        world: &mut World,
        ctx: &RoundContext<'_>,
        company: CompanyId,
        hex: HexId,
        tile: TileId,
        rotation: u8,
        special: Option<PrivateId>,
    ) -> Result<RoundStatus, RuleViolation> {
        if rotation >= 6 {
            return Err(RuleViolation::InvalidRotation { rotation });
        }
        let not_allowed = RuleViolation::TileNotAllowed { hex, tile };
        if !world.board.legal_tiles(hex).contains(&tile) {
            return Err(not_allowed);
        }
        let colour = world.board.tile_colour(tile).ok_or(not_allowed)?;
        match special {
            Some(private) => {
                let covers = Self::usable_special(world, company, private)
                    && world.private(private).extra_tile_hexes().is_some_and(|h| h.contains(&hex));
                if !covers {
                    return Err(RuleViolation::SpecialUnavailable { private });
                }
            }
            None => {
                if self.tile_budget(colour) == 0 {
                    return Err(RuleViolation::NoTileLaysLeft);
                }
            }
        }
        let cost = world.board.lay_cost(hex);
        let c = world.company(company);
        if c.cash < cost {
            return Err(RuleViolation::InsufficientFunds {
                holder: c.name.clone(),
                needed: cost,
                available: c.cash,
            });
        }

        world.transfer(CashHolder::Company(company), CashHolder::Bank, cost);
        world.board.lay_tile(hex, tile);
        match special {
            Some(private) => world.private_mut(private).special_used = true,
            None => self.spend_tile_lay(colour),
        }
        let line = format!(
            "{} lays a {} tile on {} for {}",
            world.company(company).name,
            colour,
            hex,
            cost
        );
        world.report.add(line);

        if self.tile_options(world, company).is_empty() {
            Ok(self.advance(world, ctx))
        } else {
            Ok(RoundStatus::Continue)
        }
    }

    // === Stations ===

    fn token_options(&self, world: &World, company: CompanyId) -> Vec<Command> {
        let c = world.company(company);
        if c.free_tokens == 0 {
            return Vec::new();
        }
        let mut options = Vec::new();
        if !self.turn.token_laid {
            for hex in world.board.hex_ids() {
                if world.board.can_place_token(company, hex) && world.board.token_cost(hex) <= c.cash {
                    options.push(Command::LayBaseToken { company, hex, special: None });
                }
            }
        }
        for private in world.privates.iter() {
            if !Self::usable_special(world, company, private.id) {
                continue;
            }
            for hex in private.extra_token_hexes().unwrap_or_default() {
                if world.board.can_place_token(company, *hex) {
                    options.push(Command::LayBaseToken {
                        company,
                        hex: *hex,
                        special: Some(private.id),
                    });
                }
            }
        }
        options
    }

    fn lay_token(
        &mut self,
        world: &mut World,
        ctx: &RoundContext<'_>,
        company: CompanyId,
        hex: HexId,
        special: Option<PrivateId>,
    ) -> Result<RoundStatus, RuleViolation> {
        if world.company(company).free_tokens == 0 {
            return Err(RuleViolation::NoFreeToken { company });
        }
        if !world.board.can_place_token(company, hex) {
            return Err(RuleViolation::TokenNotAllowed { company, hex });
        }
        let cost = match special {
            Some(private) => {
                let covers = Self::usable_special(world, company, private)
                    && world.private(private).extra_token_hexes().is_some_and(|h| h.contains(&hex));
                if !covers {
                    return Err(RuleViolation::SpecialUnavailable { private });
                }
                0
            }
            None => {
                if self.turn.token_laid {
                    return Err(RuleViolation::TokenNotAllowed { company, hex });
                }
                world.board.token_cost(hex)
            }
        };
        let c = world.company(company);
        if c.cash < cost {
            return Err(RuleViolation::InsufficientFunds {
                holder: c.name.clone(),
                needed: cost,
                available: c.cash,
            });
        }

        world.transfer(CashHolder::Company(company), CashHolder::Bank, cost);
        world.board.place_token(company, hex);
        world.company_mut(company).free_tokens -= 1;
        match special {
            Some(private) => world.private_mut(private).special_used = true,
            None => self.turn.token_laid = true,
        }
        let line = format!("{} places a station on {} for {}", world.company(company).name, hex, cost);
        world.report.add(line);

        if self.token_options(world, company).is_empty() {
            Ok(self.advance(world, ctx))
        } else {
            Ok(RoundStatus::Continue)
        }
    }

    // === Revenue ===

    fn set_dividend(
        &mut self,
        world: &mut World,
        ctx: &RoundContext<'_>,
        company: CompanyId,
        revenue: Money,
        allocation: DividendAllocation,
    ) -> Result<RoundStatus, RuleViolation> {
        if revenue < 0 {
            return Err(RuleViolation::InvalidRevenue { revenue });
        }
        if !world.company(company).kind.allocations.contains(&allocation) {
            return Err(RuleViolation::AllocationNotAllowed {
                allocation: allocation.to_string(),
                company,
            });
        }
        if !world.revenue_fits(company, revenue, allocation) {
            return Err(RuleViolation::InvalidRevenue { revenue });
        }
        world.distribute_revenue(company, revenue, allocation);
        Ok(self.advance(world, ctx))
    }

    // === Trains ===

    /// Trains on sale from the bank: the depot's current type and the pool.
    fn train_offers(world: &World) -> Vec<(TrainTypeId, TrainSource, Money)> {
        let mut offers = Vec::new();
        if let Some(current) = world.trains.current_type() {
            offers.push((current, TrainSource::Depot, world.trains.cost(current)));
        }
        for pooled in world.trains.pool_types() {
            offers.push((pooled, TrainSource::Pool, world.trains.cost(pooled)));
        }
        offers
    }

    fn must_buy(world: &World, company: CompanyId) -> bool {
        let c = world.company(company);
        c.kind.must_own_a_train && c.trains.is_empty() && !Self::train_offers(world).is_empty()
    }

    /// The company must own a train and cannot pay for the cheapest one.
    fn emergency_price(world: &World, company: CompanyId) -> Option<Money> {
        if !Self::must_buy(world, company) {
            return None;
        }
        let cheapest = Self::train_offers(world).iter().map(|(_, _, price)| *price).min()?;
        (world.company(company).cash < cheapest).then_some(cheapest)
    }

    fn buy_train_options(
        &self,
        world: &World,
        ctx: &RoundContext<'_>,
        company: CompanyId,
        player: PlayerId,
        out: &mut PossibleActionSet,
    ) {
        let c = world.company(company);
        let offers = Self::train_offers(world);

        if let Some(cheapest) = Self::emergency_price(world, company) {
            for (train_type, source, price) in offers.into_iter().filter(|(_, _, p)| *p == cheapest) {
                out.add(Action::new(
                    player,
                    Command::BuyTrain {
                        company,
                        train_type,
                        source,
                        price,
                        fixed_price: true,
                        president_cash: price - c.cash,
                    },
                ));
            }
            return;
        }

        if c.trains.len() < world.train_limit() as usize {
            for (train_type, source, price) in offers.into_iter().filter(|(_, _, p)| *p <= c.cash) {
                out.add(Action::new(
                    player,
                    Command::BuyTrain {
                        company,
                        train_type,
                        source,
                        price,
                        fixed_price: true,
                        president_cash: 0,
                    },
                ));
            }
            if c.cash > 0 {
                for seller in world.company_ids().filter(|s| *s != company) {
                    let s = world.company(seller);
                    if !s.is_operating() {
                        continue;
                    }
                    let mut types: Vec<_> = s.trains.iter().copied().collect();
                    types.sort();
                    types.dedup();
                    for train_type in types {
                        out.add(Action::new(
                            player,
                            Command::BuyTrain {
                                company,
                                train_type,
                                source: TrainSource::Company(seller),
                                price: 0,
                                fixed_price: false,
                                president_cash: 0,
                            },
                        ));
                    }
                }
            }
        }

        if world.phases.current().private_sales {
            let (low, _) = ctx.config.private_price_range_pct;
            for private in world.privates.iter() {
                let for_sale = !private.closed && matches!(private.owner, Some(PrivateOwner::Player(_)));
                let minimum = private.base_price * Money::from(low) / 100;
                if for_sale && minimum <= c.cash {
                    out.add(Action::new(
                        player,
                        Command::BuyPrivate { company, private: private.id, price: 0 },
                    ));
                }
            }
        }

        if let Some(terms) = c.kind.loans {
            if c.loans < terms.max_loans {
                out.add(Action::new(
                    player,
                    Command::TakeLoans { company, count: terms.max_loans - c.loans },
                ));
            }
            if c.loans > 0 {
                out.add(Action::new(
                    player,
                    Command::RepayLoans { company, count: c.loans, president_cash: 0 },
                ));
            }
        }

        if !Self::must_buy(world, company) {
            out.add(Action::done(player));
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn buy_train(
        &mut self,
        world: &mut World,
        action: &Action,
        company: CompanyId,
        train_type: TrainTypeId,
        source: TrainSource,
        price: Money,
        president_cash: Money,
    ) -> Result<RoundStatus, RuleViolation> {
        let c = world.company(company);
        let limit = world.train_limit();
        if c.trains.len() >= limit as usize {
            return Err(RuleViolation::TrainLimit { company, limit });
        }
        let unavailable = RuleViolation::TrainNotAvailable { train_type };
        let emergency = Self::emergency_price(world, company);

        let face_price = match source {
            TrainSource::Depot => {
                if world.trains.current_type() != Some(train_type) {
                    return Err(unavailable);
                }
                Some(world.trains.cost(train_type))
            }
            TrainSource::Pool => {
                if !world.trains.pool.contains(&train_type) {
                    return Err(unavailable);
                }
                Some(world.trains.cost(train_type))
            }
            TrainSource::Company(seller) => {
                let held = world
                    .companies
                    .get(seller.index())
                    .is_some_and(|s| s.is_operating() && s.train_count(train_type) > 0);
                if emergency.is_some() || seller == company || !held {
                    return Err(unavailable);
                }
                None
            }
        };

        match face_price {
            Some(face) if face != price => {
                return Err(RuleViolation::InvalidPrice { price, min: face, max: face });
            }
            None if price < 1 || price > c.cash => {
                return Err(RuleViolation::InvalidPrice { price, min: 1, max: c.cash });
            }
            _ => {}
        }

        if let Some(cheapest) = emergency {
            if price != cheapest {
                return Err(RuleViolation::InvalidPrice { price, min: cheapest, max: cheapest });
            }
            let needed = price - c.cash;
            if president_cash != needed {
                return Err(RuleViolation::InsufficientFunds {
                    holder: c.name.clone(),
                    needed: price,
                    available: c.cash + president_cash,
                });
            }
            let Some(president) = c.president else {
                return Err(wrong_step(action, self.label()));
            };
            if world.players[president].cash < needed {
                info!(
                    "{} needs {} from {} for an emergency train",
                    c.name, needed, world.players[president].name
                );
                return Ok(RoundStatus::interrupt(
                    SubRoundRequest::ShareSelling {
                        player: president,
                        cash_needed: needed,
                        blocking_company: Some(company),
                    },
                    Some(action.clone()),
                ));
            }
            world.transfer(CashHolder::Player(president), CashHolder::Company(company), needed);
        } else {
            if president_cash != 0 {
                return Err(RuleViolation::Other(format!(
                    "{} is not in an emergency; no president cash is taken",
                    c.name
                )));
            }
            if c.cash < price {
                return Err(RuleViolation::InsufficientFunds {
                    holder: c.name.clone(),
                    needed: price,
                    available: c.cash,
                });
            }
        }

        world.buy_train(company, train_type, source, price);
        self.queue_discards(world);
        Ok(RoundStatus::Continue)
    }

    fn queue_discards(&mut self, world: &mut World) {
        let over: Vector<_> = world
            .company_ids()
            .filter(|c| world.company(*c).is_operating() && world.over_train_limit(*c))
            .collect();
        if over.is_empty() {
            return;
        }
        info!("{} companies must discard trains", over.len());
        if self.step != OrStep::DiscardTrains {
            self.resume_step = self.step;
        }
        self.discard_queue = over;
        self.step = OrStep::DiscardTrains;
    }

    fn discard_train(
        &mut self,
        world: &mut World,
        action: &Action,
        company: CompanyId,
        train_type: TrainTypeId,
    ) -> Result<RoundStatus, RuleViolation> {
        if self.discard_queue.front() != Some(&company) {
            return Err(wrong_step(action, self.context()));
        }
        if world.company(company).train_count(train_type) == 0 {
            return Err(RuleViolation::TrainNotAvailable { train_type });
        }
        world.discard_train(company, train_type);
        if !world.over_train_limit(company) {
            self.discard_queue.pop_front();
        }
        if self.discard_queue.is_empty() {
            self.step = self.resume_step;
        }
        Ok(RoundStatus::Continue)
    }

    // === Privates and loans ===

    fn buy_private(
        &mut self,
        world: &mut World,
        config: &GameConfig,
        company: CompanyId,
        private: PrivateId,
        price: Money,
    ) -> Result<RoundStatus, RuleViolation> {
        let for_sale = world.phases.current().private_sales
            && world
                .privates
                .get(private.index())
                .is_some_and(|p| !p.closed && matches!(p.owner, Some(PrivateOwner::Player(_))));
        if !for_sale {
            return Err(RuleViolation::PrivateUnavailable { private });
        }
        let (low, high) = config.private_price_range_pct;
        let base = world.private(private).base_price;
        let (min, max) = (base * Money::from(low) / 100, base * Money::from(high) / 100);
        if price < min || price > max {
            return Err(RuleViolation::InvalidPrice { price, min, max });
        }
        let c = world.company(company);
        if c.cash < price {
            return Err(RuleViolation::InsufficientFunds {
                holder: c.name.clone(),
                needed: price,
                available: c.cash,
            });
        }
        world.buy_private(company, private, price);
        Ok(RoundStatus::Continue)
    }

    fn take_loans(&mut self, world: &mut World, company: CompanyId, count: u8) -> Result<RoundStatus, RuleViolation> {
        let c = world.company(company);
        let allowed = c
            .kind
            .loans
            .is_some_and(|terms| count >= 1 && u16::from(c.loans) + u16::from(count) <= u16::from(terms.max_loans));
        if !allowed {
            return Err(RuleViolation::LoanNotAllowed { company, count });
        }
        world.take_loans(company, count);
        Ok(RoundStatus::Continue)
    }

    fn repay_loans(
        &mut self,
        world: &mut World,
        action: &Action,
        company: CompanyId,
        count: u8,
    ) -> Result<RoundStatus, RuleViolation> {
        let c = world.company(company);
        let Some(terms) = c.kind.loans.filter(|_| count >= 1 && count <= c.loans) else {
            return Err(RuleViolation::LoanNotAllowed { company, count });
        };
        let Some(president) = c.president else {
            return Err(wrong_step(action, self.label()));
        };
        let shortfall = (terms.value * Money::from(count) - c.cash).max(0);
        if world.players[president].cash < shortfall {
            info!("{} must raise {} to repay loans of {}", world.players[president].name, shortfall, c.name);
            return Ok(RoundStatus::interrupt(
                SubRoundRequest::ShareSelling {
                    player: president,
                    cash_needed: shortfall,
                    blocking_company: Some(company),
                },
                Some(action.clone()),
            ));
        }
        world.repay_loans(company, count, president);
        Ok(RoundStatus::Continue)
    }

    fn done(&mut self, world: &mut World, ctx: &RoundContext<'_>, company: CompanyId) -> Result<RoundStatus, RuleViolation> {
        if Self::must_buy(world, company) {
            return Err(RuleViolation::MustBuyTrain { company });
        }
        Ok(self.advance(world, ctx))
    }

    fn context(&self) -> String {
        format!("{} {}", self.label(), self.step)
    }

    fn command_company(command: &Command) -> Option<CompanyId> {
        match command {
            Command::LayTile { company, .. }
            | Command::LayBaseToken { company, .. }
            | Command::SetDividend { company, .. }
            | Command::BuyTrain { company, .. }
            | Command::DiscardTrain { company, .. }
            | Command::BuyPrivate { company, .. }
            | Command::TakeLoans { company, .. }
            | Command::RepayLoans { company, .. } => Some(*company),
            _ => None,
        }
    }
}

impl Round for OperatingRound {
    fn kind(&self) -> RoundKind {
        RoundKind::Operating
    }

    fn label(&self) -> String {
        format!("OR {}.{}", self.set_number, self.round_in_set)
    }

    fn current_player(&self, world: &World) -> PlayerId {
        let company = if self.step == OrStep::DiscardTrains {
            self.discard_queue.front().copied()
        } else {
            self.operating_company()
        };
        company
            .and_then(|c| world.company(c).president)
            .unwrap_or(world.priority_player)
    }

    fn begin(&mut self, world: &mut World, ctx: &RoundContext<'_>) -> Result<RoundStatus, RuleViolation> {
        world.report.add(format!("{} starts", self.label()));
        world.pay_private_revenues();
        self.order = operating_order(world);
        self.position = 0;
        Ok(self.start_turn(world, ctx))
    }

    fn set_possible_actions(&self, world: &World, ctx: &RoundContext<'_>, out: &mut PossibleActionSet) {
        let Some(company) = self.operating_company() else {
            return;
        };
        let player = self.current_player(world);
        match self.step {
            OrStep::LayTrack => {
                for command in self.tile_options(world, company) {
                    out.add(Action::new(player, command));
                }
                out.add(Action::new(player, Command::Skip));
            }
            OrStep::LayToken => {
                for command in self.token_options(world, company) {
                    out.add(Action::new(player, command));
                }
                out.add(Action::new(player, Command::Skip));
            }
            OrStep::CalcRevenue => {
                for allocation in &world.company(company).kind.allocations {
                    out.add(Action::new(
                        player,
                        Command::SetDividend { company, revenue: 0, allocation: *allocation },
                    ));
                }
            }
            OrStep::BuyTrain => self.buy_train_options(world, ctx, company, player, out),
            OrStep::DiscardTrains => {
                if let Some(discarding) = self.discard_queue.front().copied() {
                    let mut types: Vec<_> = world.company(discarding).trains.iter().copied().collect();
                    types.sort();
                    types.dedup();
                    for train_type in types {
                        out.add(Action::new(
                            player,
                            Command::DiscardTrain { company: discarding, train_type },
                        ));
                    }
                }
            }
            OrStep::Initial | OrStep::Payout | OrStep::TradeShares | OrStep::Final => {}
        }
    }

    fn process(
        &mut self,
        world: &mut World,
        ctx: &RoundContext<'_>,
        action: &Action,
    ) -> Result<RoundStatus, RuleViolation> {
        self.redundant_done = false;
        let Some(company) = self.operating_company() else {
            return Err(wrong_step(action, self.context()));
        };
        let acting = if self.step == OrStep::DiscardTrains {
            self.discard_queue.front().copied()
        } else {
            Some(company)
        };
        if let Some(named) = Self::command_company(&action.command) {
            if Some(named) != acting {
                return Err(wrong_step(action, self.context()));
            }
        }

        match (&action.command, self.step) {
            (Command::LayTile { hex, tile, rotation, special, .. }, OrStep::LayTrack) => {
                self.lay_tile(world, ctx, company, *hex, *tile, *rotation, *special)
            }
            (Command::LayBaseToken { hex, special, .. }, OrStep::LayToken) => {
                self.lay_token(world, ctx, company, *hex, *special)
            }
            (Command::Skip, OrStep::LayTrack | OrStep::LayToken) => Ok(self.advance(world, ctx)),
            (Command::SetDividend { revenue, allocation, .. }, OrStep::CalcRevenue) => {
                self.set_dividend(world, ctx, company, *revenue, *allocation)
            }
            (
                Command::BuyTrain { train_type, source, price, president_cash, .. },
                OrStep::BuyTrain,
            ) => self.buy_train(world, action, company, *train_type, *source, *price, *president_cash),
            (Command::DiscardTrain { company: discarding, train_type }, OrStep::DiscardTrains) => {
                self.discard_train(world, action, *discarding, *train_type)
            }
            (Command::BuyPrivate { private, price, .. }, OrStep::BuyTrain) => {
                self.buy_private(world, ctx.config, company, *private, *price)
            }
            (Command::TakeLoans { count, .. }, OrStep::BuyTrain) => self.take_loans(world, company, *count),
            (Command::RepayLoans { count, .. }, OrStep::BuyTrain) => {
                self.repay_loans(world, action, company, *count)
            }
            (Command::Done, OrStep::BuyTrain) => self.done(world, ctx, company),
            _ => Err(wrong_step(action, self.context())),
        }
    }

    fn resume(
        &mut self,
        world: &mut World,
        ctx: &RoundContext<'_>,
        pending: Option<Action>,
    ) -> Result<RoundStatus, RuleViolation> {
        match pending {
            Some(action) => {
                debug!("{} resumes with {}", self.label(), action);
                self.process(world, ctx, &action)
            }
            None if self.step == OrStep::TradeShares => Ok(self.advance(world, ctx)),
            None => Ok(RoundStatus::Continue),
        }
    }

    fn finish_round(&mut self, world: &mut World, _ctx: &RoundContext<'_>) -> RoundStatus {
        world.report.add(format!("{} ends", self.label()));
        RoundStatus::Finished
    }

    fn redundant_done_expected(&self) -> bool {
        self.redundant_done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ShareSource;
    use crate::engine::variant::StandardVariant;
    use crate::games::sample::{self, SampleGameBuilder};

    fn setup(builder: SampleGameBuilder) -> (GameConfig, World) {
        let config = builder.build();
        let names: Vec<_> = ["Ann", "Bob", "Cy"].iter().map(|s| s.to_string()).collect();
        let mut world = World::new(&config, &names).unwrap();
        world.start_company(PlayerId(0), sample::PRR, 100);
        for _ in 0..4 {
            world.buy_shares(PlayerId(1), sample::PRR, ShareSource::Ipo, 1, 100);
        }
        (config, world)
    }

    fn act(round: &mut OperatingRound, world: &mut World, ctx: &RoundContext<'_>, command: Command) -> RoundStatus {
        round.process(world, ctx, &Action::new(PlayerId(0), command)).unwrap()
    }

    #[test]
    fn test_step_order() {
        assert_eq!(OrStep::Initial.following(), Some(OrStep::LayTrack));
        assert_eq!(OrStep::TradeShares.following(), Some(OrStep::Final));
        assert_eq!(OrStep::Final.following(), None);
        assert_eq!(OrStep::DiscardTrains.following(), None);
    }

    #[test]
    fn test_skip_without_tokens_or_trains() {
        let (config, mut world) = setup(SampleGameBuilder::new());
        world.company_mut(sample::PRR).free_tokens = 0;
        let inputs = StepInputs {
            world: &world,
            config: &config,
            variant: &StandardVariant,
            company: sample::PRR,
        };
        assert_eq!(step_skip_reason(&inputs, OrStep::LayToken), Some(SkipReason::NoFreeTokens));
        assert_eq!(step_skip_reason(&inputs, OrStep::CalcRevenue), Some(SkipReason::NoTrains));
        assert_eq!(next_applicable_step(&inputs, OrStep::LayTrack), Some(OrStep::BuyTrain));
        assert_eq!(next_applicable_step(&inputs, OrStep::BuyTrain), Some(OrStep::Final));
        assert_eq!(next_applicable_step(&inputs, OrStep::Final), None);
    }

    #[derive(Debug)]
    struct NoTrack;

    impl GameVariant for NoTrack {
        fn name(&self) -> &str {
            "no track"
        }

        fn step_vetoed(&self, _world: &World, _company: CompanyId, step: OrStep) -> bool {
            step == OrStep::LayTrack
        }
    }

    #[test]
    fn test_variant_veto() {
        let (config, world) = setup(SampleGameBuilder::new());
        let inputs = StepInputs { world: &world, config: &config, variant: &NoTrack, company: sample::PRR };
        assert_eq!(step_skip_reason(&inputs, OrStep::LayTrack), Some(SkipReason::Vetoed));
        assert_eq!(next_applicable_step(&inputs, OrStep::Initial), Some(OrStep::LayToken));
    }

    #[test]
    fn test_full_turn_without_treasury() {
        let (config, mut world) = setup(SampleGameBuilder::new());
        let ctx = RoundContext { config: &config, variant: &StandardVariant, replaying: false };
        world.buy_train(sample::PRR, sample::TRAIN_2, TrainSource::Depot, 80);

        let mut round = OperatingRound::new(1, 1);
        assert_eq!(round.begin(&mut world, &ctx), Ok(RoundStatus::Continue));
        assert_eq!(round.step(), OrStep::LayTrack);

        let lay = Command::LayTile {
            company: sample::PRR,
            hex: sample::PRR_HOME,
            tile: sample::TILE_7,
            rotation: 2,
            special: None,
        };
        assert_eq!(act(&mut round, &mut world, &ctx, lay), RoundStatus::Continue);
        assert_eq!(round.step(), OrStep::LayToken);

        let token = Command::LayBaseToken { company: sample::PRR, hex: sample::CITY, special: None };
        assert_eq!(act(&mut round, &mut world, &ctx, token), RoundStatus::Continue);
        assert_eq!(round.step(), OrStep::CalcRevenue);

        let dividend = Command::SetDividend {
            company: sample::PRR,
            revenue: 50,
            allocation: DividendAllocation::Payout,
        };
        assert_eq!(act(&mut round, &mut world, &ctx, dividend), RoundStatus::Continue);
        assert_eq!(round.step(), OrStep::BuyTrain);

        assert_eq!(act(&mut round, &mut world, &ctx, Command::Done), RoundStatus::Finished);
        assert_eq!(round.step(), OrStep::Final);
        assert!(world.company(sample::PRR).has_operated);
        assert!(!round.redundant_done_expected());
    }

    #[test]
    fn test_revenue_beyond_money_range_is_refused() {
        let (config, mut world) = setup(SampleGameBuilder::new());
        let ctx = RoundContext { config: &config, variant: &StandardVariant, replaying: false };
        world.buy_train(sample::PRR, sample::TRAIN_2, TrainSource::Depot, 80);
        let mut round = OperatingRound::new(1, 1);
        let _ = round.begin(&mut world, &ctx).unwrap();
        let _ = act(&mut round, &mut world, &ctx, Command::Skip);
        let _ = act(&mut round, &mut world, &ctx, Command::Skip);
        assert_eq!(round.step(), OrStep::CalcRevenue);

        let before = world.clone();
        let huge = Action::new(
            PlayerId(0),
            Command::SetDividend {
                company: sample::PRR,
                revenue: Money::MAX,
                allocation: DividendAllocation::Withhold,
            },
        );
        assert_eq!(
            round.process(&mut world, &ctx, &huge),
            Err(RuleViolation::InvalidRevenue { revenue: Money::MAX })
        );
        assert_eq!(world, before);
        assert_eq!(round.step(), OrStep::CalcRevenue);
    }

    #[test]
    fn test_one_tile_colour_per_turn() {
        let (config, mut world) = setup(SampleGameBuilder::new());
        let ctx = RoundContext { config: &config, variant: &StandardVariant, replaying: false };
        let mut round = OperatingRound::new(1, 1);
        let _ = round.begin(&mut world, &ctx).unwrap();

        let mut set = PossibleActionSet::new();
        round.set_possible_actions(&world, &ctx, &mut set);
        assert!(set.contains_kind(|c| matches!(c, Command::LayTile { .. })));
        assert!(set.contains_option(&Action::new(PlayerId(0), Command::Skip)));

        round.spend_tile_lay(TileColour::Yellow);
        assert!(round.tile_options(&world, sample::PRR).is_empty());
        let lay = Action::new(
            PlayerId(0),
            Command::LayTile {
                company: sample::PRR,
                hex: sample::NYC_HOME,
                tile: sample::TILE_8,
                rotation: 0,
                special: None,
            },
        );
        assert_eq!(round.process(&mut world, &ctx, &lay), Err(RuleViolation::NoTileLaysLeft));
    }

    #[test]
    fn test_no_trains_withholds_and_forces_purchase() {
        let (config, mut world) = setup(SampleGameBuilder::new());
        let ctx = RoundContext { config: &config, variant: &StandardVariant, replaying: false };
        let before = world.company(sample::PRR).market_position;
        let mut round = OperatingRound::new(1, 1);
        let _ = round.begin(&mut world, &ctx).unwrap();
        let _ = act(&mut round, &mut world, &ctx, Command::Skip);
        let _ = act(&mut round, &mut world, &ctx, Command::Skip);

        assert_eq!(round.step(), OrStep::BuyTrain);
        assert_ne!(world.company(sample::PRR).market_position, before);
        let done = Action::done(PlayerId(0));
        assert_eq!(
            round.process(&mut world, &ctx, &done),
            Err(RuleViolation::MustBuyTrain { company: sample::PRR })
        );
    }

    #[test]
    fn test_emergency_purchase_interrupts_then_resumes() {
        let (config, mut world) = setup(SampleGameBuilder::new());
        let ctx = RoundContext { config: &config, variant: &StandardVariant, replaying: false };
        let mut round = OperatingRound::new(1, 1);
        let _ = round.begin(&mut world, &ctx).unwrap();
        let _ = act(&mut round, &mut world, &ctx, Command::Skip);
        let _ = act(&mut round, &mut world, &ctx, Command::Skip);

        let company_cash = world.company(sample::PRR).cash;
        world.transfer(CashHolder::Company(sample::PRR), CashHolder::Bank, company_cash);
        let president_cash = world.players[PlayerId(0)].cash;
        world.transfer(CashHolder::Player(PlayerId(0)), CashHolder::Bank, president_cash - 10);

        let buy = Action::new(
            PlayerId(0),
            Command::BuyTrain {
                company: sample::PRR,
                train_type: sample::TRAIN_2,
                source: TrainSource::Depot,
                price: 80,
                fixed_price: true,
                president_cash: 80,
            },
        );
        let mut set = PossibleActionSet::new();
        round.set_possible_actions(&world, &ctx, &mut set);
        assert!(set.contains_option(&buy));
        assert!(!set.contains_option(&Action::done(PlayerId(0))));

        let status = round.process(&mut world, &ctx, &buy).unwrap();
        assert_eq!(
            status,
            RoundStatus::interrupt(
                SubRoundRequest::ShareSelling {
                    player: PlayerId(0),
                    cash_needed: 80,
                    blocking_company: Some(sample::PRR),
                },
                Some(buy.clone()),
            )
        );
        assert!(world.company(sample::PRR).trains.is_empty());

        world.transfer(CashHolder::Bank, CashHolder::Player(PlayerId(0)), 100);
        assert_eq!(round.resume(&mut world, &ctx, Some(buy)), Ok(RoundStatus::Continue));
        assert_eq!(world.company(sample::PRR).trains.len(), 1);
        assert_eq!(world.players[PlayerId(0)].cash, 30);
        assert_eq!(world.company(sample::PRR).cash, 0);
    }

    #[test]
    fn test_phase_change_forces_discard() {
        let (config, mut world) = setup(SampleGameBuilder::new());
        let ctx = RoundContext { config: &config, variant: &StandardVariant, replaying: false };
        world.transfer(CashHolder::Bank, CashHolder::Company(sample::NYC), 600);
        for _ in 0..5 {
            world.buy_train(sample::NYC, sample::TRAIN_2, TrainSource::Depot, 80);
        }
        world.buy_train(sample::NYC, sample::TRAIN_3, TrainSource::Depot, 180);
        for _ in 0..3 {
            world.buy_train(sample::PRR, sample::TRAIN_3, TrainSource::Depot, 180);
        }
        assert_eq!(world.trains.current_type(), Some(sample::TRAIN_4));

        let mut round = OperatingRound::new(1, 1);
        let _ = round.begin(&mut world, &ctx).unwrap();
        let _ = act(&mut round, &mut world, &ctx, Command::Skip);
        let _ = act(&mut round, &mut world, &ctx, Command::Skip);
        let withhold = Command::SetDividend {
            company: sample::PRR,
            revenue: 0,
            allocation: DividendAllocation::Withhold,
        };
        let _ = act(&mut round, &mut world, &ctx, withhold);
        assert_eq!(round.step(), OrStep::BuyTrain);

        let buy = Command::BuyTrain {
            company: sample::PRR,
            train_type: sample::TRAIN_4,
            source: TrainSource::Depot,
            price: 300,
            fixed_price: true,
            president_cash: 0,
        };
        assert_eq!(act(&mut round, &mut world, &ctx, buy), RoundStatus::Continue);
        assert_eq!(world.train_limit(), 3);
        assert_eq!(round.step(), OrStep::DiscardTrains);
        assert_eq!(world.company(sample::PRR).trains.len(), 4);

        let discard = Command::DiscardTrain { company: sample::PRR, train_type: sample::TRAIN_3 };
        assert_eq!(act(&mut round, &mut world, &ctx, discard), RoundStatus::Continue);
        assert_eq!(round.step(), OrStep::BuyTrain);
        assert_eq!(world.trains.pool_types(), vec![sample::TRAIN_3]);
    }

    #[test]
    fn test_treasury_step_interrupts_after_first_operation() {
        let (config, mut world) = setup(SampleGameBuilder::new().treasury_trading(true));
        let ctx = RoundContext { config: &config, variant: &StandardVariant, replaying: false };
        world.buy_train(sample::PRR, sample::TRAIN_2, TrainSource::Depot, 80);
        world.company_mut(sample::PRR).has_operated = true;
        let price = world.share_price(sample::PRR).unwrap();
        world.sell_shares(PlayerId(1), sample::PRR, 1, price);

        let mut round = OperatingRound::new(1, 1);
        let _ = round.begin(&mut world, &ctx).unwrap();
        let _ = act(&mut round, &mut world, &ctx, Command::Skip);
        let _ = act(&mut round, &mut world, &ctx, Command::Skip);
        let withhold = Command::SetDividend {
            company: sample::PRR,
            revenue: 0,
            allocation: DividendAllocation::Withhold,
        };
        let _ = act(&mut round, &mut world, &ctx, withhold);

        let status = act(&mut round, &mut world, &ctx, Command::Done);
        assert_eq!(
            status,
            RoundStatus::interrupt(SubRoundRequest::TreasuryShares { company: sample::PRR }, None)
        );
        assert_eq!(round.step(), OrStep::TradeShares);
        assert_eq!(round.resume(&mut world, &ctx, None), Ok(RoundStatus::Finished));
    }

    #[test]
    fn test_untradeable_treasury_flags_redundant_done() {
        let (config, mut world) = setup(SampleGameBuilder::new().treasury_trading(true));
        let ctx = RoundContext { config: &config, variant: &StandardVariant, replaying: false };
        world.buy_train(sample::PRR, sample::TRAIN_2, TrainSource::Depot, 80);
        world.company_mut(sample::PRR).has_operated = true;

        let mut round = OperatingRound::new(1, 1);
        let _ = round.begin(&mut world, &ctx).unwrap();
        let _ = act(&mut round, &mut world, &ctx, Command::Skip);
        let _ = act(&mut round, &mut world, &ctx, Command::Skip);
        let withhold = Command::SetDividend {
            company: sample::PRR,
            revenue: 0,
            allocation: DividendAllocation::Withhold,
        };
        let _ = act(&mut round, &mut world, &ctx, withhold);
        assert_eq!(act(&mut round, &mut world, &ctx, Command::Done), RoundStatus::Finished);
        assert!(round.redundant_done_expected());
    }
}
