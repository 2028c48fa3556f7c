//! Start round: selling the start packet.
//!
//! ## Normal turns
//!
//! The cheapest unsold item is buyable at its face price; every other
//! unsold item takes bids. A bid must beat `max(price, highest bid)` by the
//! configured increment and blocks that much of the bidder's cash.
//!
//! ## Resolution
//!
//! When the buyable item has standing bids after a sale, a single bidder
//! gets it at once. Two or more bidders play a sub-auction in seat order,
//! starting after the highest bidder; a pass leaves the auction and the
//! last bidder standing wins.
//!
//! ## All pass
//!
//! If every player passes in a row, the buyable item gets cheaper and the
//! order restarts with the start player. At price zero the buy is forced.
//! Without price reduction the round ends with the packet unsold.

use im::Vector;
use log::debug;

use crate::core::{Action, Command, Money, PlayerId, PossibleActionSet, PrivateId, RuleViolation};
use crate::world::{ItemStatus, PrivateOwner, World};

use super::round::{wrong_step, Round, RoundContext, RoundKind, RoundStatus};

#[derive(Clone, Debug, PartialEq, Eq)]
struct Auction {
    item: PrivateId,

    /// Remaining bidders in bidding order.
    bidders: Vector<PlayerId>,
    turn: usize,

    /// Seat that continues normal play once the auction is over.
    resume_with: PlayerId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StartRound {
    number: u32,
    start_player: PlayerId,
    current: PlayerId,
    passes: usize,
    auction: Option<Auction>,
    last_buyer: Option<PlayerId>,
}

impl StartRound {
    #[must_use]
    pub fn new(number: u32, world: &World) -> Self {
        Self {
            number,
            start_player: world.priority_player,
            current: world.priority_player,
            passes: 0,
            auction: None,
            last_buyer: None,
        }
    }

    /// The item being auctioned, if a sub-auction runs.
    #[must_use]
    pub fn auctioned_item(&self) -> Option<PrivateId> {
        self.auction.as_ref().map(|a| a.item)
    }

    fn free_cash(world: &World, player: PlayerId) -> Money {
        world.players[player].cash - world.start_packet.blocked_cash(player)
    }

    /// Cash `player` can put into a bid on `item`, counting their own
    /// standing bid on it.
    fn bid_budget(world: &World, player: PlayerId, item: PrivateId) -> Money {
        let own = world
            .start_packet
            .item(item)
            .map_or(0, |i| i.bids[player]);
        Self::free_cash(world, player) + own
    }

    fn sell(world: &mut World, item: PrivateId, buyer: PlayerId, price: Money) {
        if let Some(entry) = world.start_packet.item_mut(item) {
            entry.status = ItemStatus::Sold;
            for (_, bid) in entry.bids.iter_mut() {
                *bid = 0;
            }
        }
        world.transfer(
            crate::core::CashHolder::Player(buyer),
            crate::core::CashHolder::Bank,
            price,
        );
        world.private_mut(item).owner = Some(PrivateOwner::Player(buyer));
        let line = format!(
            "{} buys {} for {}",
            world.players[buyer].name,
            world.private(item).name,
            price
        );
        world.report.add(line);
    }

    /// Settle the next buyable item after a sale.
    fn after_sale(&mut self, world: &mut World, ctx: &RoundContext<'_>, next: PlayerId) -> RoundStatus {
        self.auction = None;
        loop {
            world.start_packet.refresh_status();
            let Some(buyable) = world.start_packet.first_unsold() else {
                return self.finish_round(world, ctx);
            };
            let Some(item) = world.start_packet.item(buyable) else {
                return self.finish_round(world, ctx);
            };
            let bidders = item.bidders();
            let highest = item.highest_bid();

            match (bidders.len(), highest) {
                (1, Some((winner, amount))) => {
                    Self::sell(world, buyable, winner, amount);
                    self.last_buyer = Some(winner);
                }
                (n, Some((top, _))) if n > 1 => {
                    let count = world.player_count();
                    let order: Vector<_> = top
                        .next(count)
                        .order_from(count)
                        .filter(|p| bidders.contains(p))
                        .collect();
                    if let Some(entry) = world.start_packet.item_mut(buyable) {
                        entry.status = ItemStatus::Auctioned;
                    }
                    let line = format!("{} goes to auction", world.private(buyable).name);
                    world.report.add(line);
                    self.auction = Some(Auction {
                        item: buyable,
                        bidders: order,
                        turn: 0,
                        resume_with: next,
                    });
                    return RoundStatus::Continue;
                }
                _ => {
                    self.current = next;
                    return RoundStatus::Continue;
                }
            }
        }
    }

    fn all_passed(&mut self, world: &mut World, ctx: &RoundContext<'_>) -> RoundStatus {
        let config = ctx.config.start_round.unwrap_or_default();
        if !config.reduce_price_on_all_pass {
            world.report.add("All players pass; the start round ends");
            return self.finish_round(world, ctx);
        }

        if let Some(buyable) = world.start_packet.first_unsold() {
            if let Some(item) = world.start_packet.item_mut(buyable) {
                item.price = (item.price - config.price_reduction).max(0);
            }
            let line = format!(
                "All players pass; {} now costs {}",
                world.private(buyable).name,
                world.start_packet.item(buyable).map_or(0, |i| i.price)
            );
            world.report.add(line);
        }
        self.passes = 0;
        self.current = self.start_player;
        RoundStatus::Continue
    }

    fn process_bid(
        &mut self,
        world: &mut World,
        ctx: &RoundContext<'_>,
        player: PlayerId,
        item: PrivateId,
        amount: Money,
    ) -> Result<RoundStatus, RuleViolation> {
        let increment = ctx.config.start_round.unwrap_or_default().min_bid_increment;
        let entry = world
            .start_packet
            .item(item)
            .ok_or(RuleViolation::PrivateUnavailable { private: item })?;

        match &self.auction {
            Some(auction) if auction.item != item => {
                return Err(RuleViolation::PrivateUnavailable { private: item })
            }
            None if entry.status != ItemStatus::Biddable => {
                return Err(RuleViolation::PrivateUnavailable { private: item })
            }
            _ => {}
        }
        let minimum = entry.minimum_bid(increment);
        if amount < minimum {
            return Err(RuleViolation::BidTooLow { amount, minimum });
        }
        let budget = Self::bid_budget(world, player, item);
        if amount > budget {
            return Err(RuleViolation::InsufficientFunds {
                holder: world.players[player].name.clone(),
                needed: amount,
                available: budget,
            });
        }

        if let Some(entry) = world.start_packet.item_mut(item) {
            entry.bids[player] = amount;
        }
        let line = format!(
            "{} bids {} on {}",
            world.players[player].name,
            amount,
            world.private(item).name
        );
        world.report.add(line);

        match &mut self.auction {
            Some(auction) => auction.turn = (auction.turn + 1) % auction.bidders.len().max(1),
            None => {
                self.passes = 0;
                self.current = player.next(world.player_count());
            }
        }
        Ok(RoundStatus::Continue)
    }

    fn process_auction_pass(&mut self, world: &mut World, ctx: &RoundContext<'_>, player: PlayerId) -> RoundStatus {
        let Some(auction) = self.auction.as_mut() else {
            return RoundStatus::Continue;
        };
        if let Some(entry) = world.start_packet.item_mut(auction.item) {
            entry.bids[player] = 0;
        }
        if auction.turn < auction.bidders.len() {
            auction.bidders.remove(auction.turn);
        }
        if auction.turn >= auction.bidders.len() {
            auction.turn = 0;
        }
        debug!("{} leaves the auction", player);

        if auction.bidders.len() > 1 {
            return RoundStatus::Continue;
        }
        let item = auction.item;
        let resume_with = auction.resume_with;
        let winner = world
            .start_packet
            .item(item)
            .and_then(|entry| entry.highest_bid());
        if let Some((winner, amount)) = winner {
            Self::sell(world, item, winner, amount);
            self.last_buyer = Some(winner);
        }
        self.after_sale(world, ctx, resume_with)
    }
}

impl Round for StartRound {
    fn kind(&self) -> RoundKind {
        RoundKind::Start
    }

    fn label(&self) -> String {
        format!("Start round {}", self.number)
    }

    fn current_player(&self, _world: &World) -> PlayerId {
        match &self.auction {
            Some(auction) => auction
                .bidders
                .get(auction.turn)
                .copied()
                .unwrap_or(self.current),
            None => self.current,
        }
    }

    fn begin(&mut self, world: &mut World, ctx: &RoundContext<'_>) -> Result<RoundStatus, RuleViolation> {
        world.report.add(format!("{} starts", self.label()));
        let next = self.current;
        Ok(self.after_sale(world, ctx, next))
    }

    fn set_possible_actions(&self, world: &World, ctx: &RoundContext<'_>, out: &mut PossibleActionSet) {
        let increment = ctx.config.start_round.unwrap_or_default().min_bid_increment;
        let player = self.current_player(world);

        if let Some(auction) = &self.auction {
            if let Some(item) = world.start_packet.item(auction.item) {
                let minimum = item.minimum_bid(increment);
                if Self::bid_budget(world, player, auction.item) >= minimum {
                    out.add(Action::new(
                        player,
                        Command::BidStartItem { item: auction.item, amount: minimum },
                    ));
                }
            }
            out.add(Action::pass(player));
            return;
        }

        let Some(buyable) = world.start_packet.first_unsold() else {
            return;
        };
        let price = world.start_packet.item(buyable).map_or(0, |i| i.price);
        let can_buy = Self::free_cash(world, player) >= price;
        if can_buy {
            out.add(Action::new(
                player,
                Command::BuyStartItem { item: buyable, price },
            ));
        }

        for item in world.start_packet.items() {
            if item.status != ItemStatus::Biddable {
                continue;
            }
            let minimum = item.minimum_bid(increment);
            if Self::bid_budget(world, player, item.private) >= minimum {
                out.add(Action::new(
                    player,
                    Command::BidStartItem { item: item.private, amount: minimum },
                ));
            }
        }

        // A free item must be taken.
        if price > 0 || !can_buy {
            out.add(Action::pass(player));
        }
    }

    fn process(
        &mut self,
        world: &mut World,
        ctx: &RoundContext<'_>,
        action: &Action,
    ) -> Result<RoundStatus, RuleViolation> {
        let player = action.player;
        match &action.command {
            Command::BuyStartItem { item, price } => {
                if self.auction.is_some() || world.start_packet.first_unsold() != Some(*item) {
                    return Err(RuleViolation::PrivateUnavailable { private: *item });
                }
                let face = world.start_packet.item(*item).map_or(0, |i| i.price);
                if *price != face {
                    return Err(RuleViolation::InvalidPrice { price: *price, min: face, max: face });
                }
                let available = Self::free_cash(world, player);
                if available < face {
                    return Err(RuleViolation::InsufficientFunds {
                        holder: world.players[player].name.clone(),
                        needed: face,
                        available,
                    });
                }

                Self::sell(world, *item, player, face);
                self.last_buyer = Some(player);
                self.passes = 0;
                Ok(self.after_sale(world, ctx, player.next(world.player_count())))
            }

            Command::BidStartItem { item, amount } => {
                self.process_bid(world, ctx, player, *item, *amount)
            }

            Command::Pass if self.auction.is_some() => {
                Ok(self.process_auction_pass(world, ctx, player))
            }

            Command::Pass => {
                world.report.add(format!("{} passes", world.players[player].name));
                self.passes += 1;
                if self.passes >= world.player_count() {
                    return Ok(self.all_passed(world, ctx));
                }
                self.current = player.next(world.player_count());
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
            log::error!("start round cannot resume {}", action);
        }
        Ok(RoundStatus::Continue)
    }

    fn finish_round(&mut self, world: &mut World, _ctx: &RoundContext<'_>) -> RoundStatus {
        if let Some(buyer) = self.last_buyer {
            world.priority_player = buyer.next(world.player_count());
        }
        let unsold: Vec<_> = world
            .start_packet
            .items()
            .filter(|item| item.status != ItemStatus::Sold)
            .map(|item| item.private)
            .collect();
        for private in unsold {
            if let Some(item) = world.start_packet.item_mut(private) {
                for (_, bid) in item.bids.iter_mut() {
                    *bid = 0;
                }
                item.status = ItemStatus::Unavailable;
            }
        }
        world.report.add(format!("{} ends", self.label()));
        RoundStatus::Finished
    }
}
