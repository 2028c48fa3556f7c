//! Treasury share trading, entered from the TRADE_SHARES step.
//!
//! The president of the operating company may make one trade: buy units
//! from the pool into the treasury, or sell treasury units to the pool.
//! `Done` hands control back to the operating round.

use log::debug;

use crate::core::{
    Action, CompanyId, Command, GameConfig, PlayerId, PossibleActionSet, RuleViolation,
};
use crate::world::World;

use super::round::{wrong_step, Round, RoundContext, RoundKind, RoundStatus};

/// Units the company may buy from the pool now.
#[must_use]
pub fn treasury_buy_max(world: &World, company: CompanyId) -> u8 {
    let c = world.company(company);
    let Some(price) = world.share_price(company).filter(|p| *p > 0) else {
        return 0;
    };
    let room = c.kind.max_treasury_units.saturating_sub(c.treasury_units);
    let affordable = u8::try_from(c.cash.max(0) / price).unwrap_or(u8::MAX);
    c.pool_units.min(room).min(affordable)
}

/// Units the company may sell to the pool now.
#[must_use]
pub fn treasury_sell_max(world: &World, config: &GameConfig, company: CompanyId) -> u8 {
    let c = world.company(company);
    if world.share_price(company).is_none() {
        return 0;
    }
    let pool_room = world.pool_limit(config, company).saturating_sub(c.pool_units);
    c.treasury_units.min(pool_room)
}

/// Whether any treasury trade is possible for `company`.
#[must_use]
pub fn treasury_trade_possible(world: &World, config: &GameConfig, company: CompanyId) -> bool {
    treasury_buy_max(world, company) > 0 || treasury_sell_max(world, config, company) > 0
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreasuryShareRound {
    company: CompanyId,
    traded: bool,
}

impl TreasuryShareRound {
    #[must_use]
    pub fn new(company: CompanyId) -> Self {
        Self { company, traded: false }
    }

    #[must_use]
    pub fn company(&self) -> CompanyId {
        self.company
    }
}

impl Round for TreasuryShareRound {
    fn kind(&self) -> RoundKind {
        RoundKind::TreasuryShares
    }

    fn label(&self) -> String {
        format!("Treasury trading {}", self.company)
    }

    fn current_player(&self, world: &World) -> PlayerId {
        world
            .company(self.company)
            .president
            .unwrap_or(world.priority_player)
    }

    fn begin(&mut self, world: &mut World, _ctx: &RoundContext<'_>) -> Result<RoundStatus, RuleViolation> {
        let line = format!("{} may trade treasury shares", world.company(self.company).name);
        world.report.add(line);
        Ok(RoundStatus::Continue)
    }

    fn set_possible_actions(&self, world: &World, ctx: &RoundContext<'_>, out: &mut PossibleActionSet) {
        let player = self.current_player(world);
        if !self.traded {
            if let Some(price) = world.share_price(self.company) {
                let buy = treasury_buy_max(world, self.company);
                if buy > 0 {
                    out.add(Action::new(
                        player,
                        Command::BuyTreasuryShares { company: self.company, units: buy, price },
                    ));
                }
                let sell = treasury_sell_max(world, ctx.config, self.company);
                if sell > 0 {
                    out.add(Action::new(
                        player,
                        Command::SellTreasuryShares { company: self.company, units: sell, price },
                    ));
                }
            }
        }
        out.add(Action::done(player));
    }

    fn process(
        &mut self,
        world: &mut World,
        ctx: &RoundContext<'_>,
        action: &Action,
    ) -> Result<RoundStatus, RuleViolation> {
        match &action.command {
            Command::BuyTreasuryShares { company, units, price }
            | Command::SellTreasuryShares { company, units, price } => {
                if *company != self.company || self.traded {
                    return Err(wrong_step(action, self.label()));
                }
                let buying = matches!(action.command, Command::BuyTreasuryShares { .. });
                let max = if buying {
                    treasury_buy_max(world, self.company)
                } else {
                    treasury_sell_max(world, ctx.config, self.company)
                };
                if *units == 0 || *units > max {
                    return Err(RuleViolation::InvalidQuantity { count: *units });
                }
                let current = world.share_price(self.company).unwrap_or(0);
                if *price != current {
                    return Err(RuleViolation::InvalidPrice { price: *price, min: current, max: current });
                }

                if buying {
                    world.buy_treasury_shares(self.company, *units, *price);
                } else {
                    world.sell_treasury_shares(self.company, *units, *price);
                }
                self.traded = true;
                Ok(RoundStatus::Continue)
            }
            Command::Done => {
                debug!("treasury trading of {} done", self.company);
                Ok(RoundStatus::Finished)
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
            log::error!("treasury round cannot resume {}", action);
        }
        Ok(RoundStatus::Continue)
    }

    fn finish_round(&mut self, _world: &mut World, _ctx: &RoundContext<'_>) -> RoundStatus {
        RoundStatus::Finished
    }
}
