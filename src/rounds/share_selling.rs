//! Forced share selling.
//!
//! Started when a president must contribute cash they do not have. The
//! player sells until their cash reaches `cash_needed`; offers are capped
//! at the units actually needed. The company that caused the round may be
//! sold from only while the seller keeps its presidency. If nothing can be
//! sold and cash is still short, the player is bankrupt.

use crate::core::{
    Action, CompanyId, Command, GameConfig, Money, PlayerId, PossibleActionSet, RuleViolation,
};
use crate::world::World;

use super::round::{wrong_step, Round, RoundContext, RoundKind, RoundStatus};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShareSellingRound {
    player: PlayerId,
    cash_needed: Money,
    blocking_company: Option<CompanyId>,
}

impl ShareSellingRound {
    #[must_use]
    pub fn new(player: PlayerId, cash_needed: Money, blocking_company: Option<CompanyId>) -> Self {
        Self {
            player,
            cash_needed,
            blocking_company,
        }
    }

    #[must_use]
    pub fn cash_needed(&self) -> Money {
        self.cash_needed
    }

    fn shortfall(&self, world: &World) -> Money {
        (self.cash_needed - world.players[self.player].cash).max(0)
    }

    /// Units of `company` the player may sell here.
    fn sellable(&self, world: &World, config: &GameConfig, company: CompanyId) -> u8 {
        let units = world.sellable_units(config, self.player, company);
        if Some(company) != self.blocking_company {
            return units;
        }
        let c = world.company(company);
        let keep = c.kind.president_units.max(c.largest_other_holding(self.player));
        units.min(c.units_of(self.player).saturating_sub(keep))
    }

    /// Sale offers, each capped at the units that cover the shortfall.
    fn offers(&self, world: &World, config: &GameConfig) -> Vec<(CompanyId, u8, Money)> {
        let shortfall = self.shortfall(world);
        world
            .company_ids()
            .filter_map(|company| {
                let units = self.sellable(world, config, company);
                let price = world.share_price(company).filter(|p| *p > 0)?;
                let needed = u8::try_from((shortfall + price - 1) / price).unwrap_or(u8::MAX);
                let units = units.min(needed.max(1));
                (units > 0).then_some((company, units, price))
            })
            .collect()
    }

    fn status(&self, world: &mut World, config: &GameConfig) -> RoundStatus {
        if self.shortfall(world) == 0 {
            return RoundStatus::Finished;
        }
        if self.offers(world, config).is_empty() {
            world.players[self.player].bankrupt = true;
            let line = format!("{} is bankrupt", world.players[self.player].name);
            world.report.add(line);
            return RoundStatus::Bankrupt(self.player);
        }
        RoundStatus::Continue
    }
}

impl Round for ShareSellingRound {
    fn kind(&self) -> RoundKind {
        RoundKind::ShareSelling
    }

    fn label(&self) -> String {
        format!("Share selling by {}", self.player)
    }

    fn current_player(&self, _world: &World) -> PlayerId {
        self.player
    }

    fn begin(&mut self, world: &mut World, ctx: &RoundContext<'_>) -> Result<RoundStatus, RuleViolation> {
        let line = format!(
            "{} must raise {} by selling shares",
            world.players[self.player].name,
            self.shortfall(world)
        );
        world.report.add(line);
        Ok(self.status(world, ctx.config))
    }

    fn set_possible_actions(&self, world: &World, ctx: &RoundContext<'_>, out: &mut PossibleActionSet) {
        for (company, units, price) in self.offers(world, ctx.config) {
            out.add(Action::new(
                self.player,
                Command::SellShares { company, units, price },
            ));
        }
    }

    fn process(
        &mut self,
        world: &mut World,
        ctx: &RoundContext<'_>,
        action: &Action,
    ) -> Result<RoundStatus, RuleViolation> {
        let Command::SellShares { company, units, price } = &action.command else {
            return Err(wrong_step(action, self.label()));
        };
        let offer = self
            .offers(world, ctx.config)
            .into_iter()
            .find(|(c, _, _)| c == company);
        match offer {
            Some((_, max, current)) if *units >= 1 && *units <= max && *price == current => {}
            _ => return Err(RuleViolation::NotSellable { company: *company, units: *units }),
        }

        world.sell_shares(self.player, *company, *units, *price);
        Ok(self.status(world, ctx.config))
    }

    fn resume(
        &mut self,
        _world: &mut World,
        _ctx: &RoundContext<'_>,
        pending: Option<Action>,
    ) -> Result<RoundStatus, RuleViolation> {
        if let Some(action) = pending {
            log::error!("share selling cannot resume {}", action);
        }
        Ok(RoundStatus::Continue)
    }

    fn finish_round(&mut self, _world: &mut World, _ctx: &RoundContext<'_>) -> RoundStatus {
        RoundStatus::Finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ShareSource;
    use crate::engine::variant::StandardVariant;
    use crate::games::sample::{self, SampleGameBuilder};

    fn setup() -> (GameConfig, World) {
        let config = SampleGameBuilder::new().build();
        let names: Vec<_> = ["Ann", "Bob", "Cy"].iter().map(|s| s.to_string()).collect();
        let mut world = World::new(&config, &names).unwrap();
        world.start_company(PlayerId(0), sample::PRR, 100);
        for _ in 0..4 {
            world.buy_shares(PlayerId(0), sample::PRR, ShareSource::Ipo, 1, 100);
        }
        world.start_company(PlayerId(1), sample::NYC, 100);
        for _ in 0..3 {
            world.buy_shares(PlayerId(1), sample::NYC, ShareSource::Ipo, 1, 100);
        }
        world.buy_shares(PlayerId(0), sample::NYC, ShareSource::Ipo, 1, 100);
        (config, world)
    }

    #[test]
    fn test_offers_are_capped_at_need() {
        let (config, mut world) = setup();
        let ctx = RoundContext { config: &config, variant: &StandardVariant, replaying: false };
        let cash = world.players[PlayerId(0)].cash;
        let mut round = ShareSellingRound::new(PlayerId(0), cash + 150, Some(sample::PRR));
        assert_eq!(round.begin(&mut world, &ctx), Ok(RoundStatus::Continue));

        let mut set = PossibleActionSet::new();
        round.set_possible_actions(&world, &ctx, &mut set);
        assert!(set.iter().any(|a| matches!(
            a.command,
            Command::SellShares { company, units: 2, .. } if company == sample::PRR
        )));
        assert!(set.iter().any(|a| matches!(
            a.command,
            Command::SellShares { company, units: 1, .. } if company == sample::NYC
        )));
    }

    #[test]
    fn test_finishes_when_covered() {
        let (config, mut world) = setup();
        let ctx = RoundContext { config: &config, variant: &StandardVariant, replaying: false };
        let cash = world.players[PlayerId(0)].cash;
        let mut round = ShareSellingRound::new(PlayerId(0), cash + 50, Some(sample::PRR));
        let price = world.share_price(sample::NYC).unwrap();
        let sell = Action::new(
            PlayerId(0),
            Command::SellShares { company: sample::NYC, units: 1, price },
        );
        assert_eq!(round.process(&mut world, &ctx, &sell), Ok(RoundStatus::Finished));
    }

    #[test]
    fn test_nothing_to_sell_is_bankruptcy() {
        let (config, mut world) = setup();
        let ctx = RoundContext { config: &config, variant: &StandardVariant, replaying: false };
        let mut round = ShareSellingRound::new(PlayerId(2), 10_000, None);
        assert_eq!(round.begin(&mut world, &ctx), Ok(RoundStatus::Bankrupt(PlayerId(2))));
        assert!(world.players[PlayerId(2)].bankrupt);
    }
}
