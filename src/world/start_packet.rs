//! The start packet: privates sold in start rounds.

use im::Vector;

use crate::core::{Money, PlayerId, PlayerMap, PrivateId};

/// Sale status of a start item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ItemStatus {
    Unavailable,
    Biddable,
    Buyable,
    /// Bid on by more than one player; being resolved in a sub-auction.
    Auctioned,
    Sold,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StartItem {
    pub private: PrivateId,

    /// Current face price; all-pass reductions lower it.
    pub price: Money,
    pub status: ItemStatus,

    /// Standing bid per player, 0 for none.
    pub bids: PlayerMap<Money>,
}

impl StartItem {
    /// Highest bid and its bidder; the earlier bidder wins a tie.
    #[must_use]
    pub fn highest_bid(&self) -> Option<(PlayerId, Money)> {
        self.bids
            .iter()
            .filter(|(_, amount)| **amount > 0)
            .fold(None, |best: Option<(PlayerId, Money)>, (player, amount)| match best {
                Some((_, top)) if top >= *amount => best,
                _ => Some((player, *amount)),
            })
    }

    /// Players with a standing bid, in seat order.
    #[must_use]
    pub fn bidders(&self) -> Vec<PlayerId> {
        self.bids
            .iter()
            .filter(|(_, amount)| **amount > 0)
            .map(|(player, _)| player)
            .collect()
    }

    /// Minimum acceptable bid.
    #[must_use]
    pub fn minimum_bid(&self, increment: Money) -> Money {
        let top = self.highest_bid().map_or(0, |(_, amount)| amount);
        self.price.max(top) + increment
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StartPacket {
    items: Vector<StartItem>,
}

impl StartPacket {
    /// A packet of privates, cheapest first.
    pub fn new(items: impl IntoIterator<Item = (PrivateId, Money)>, player_count: usize) -> Self {
        Self {
            items: items
                .into_iter()
                .map(|(private, price)| StartItem {
                    private,
                    price,
                    status: ItemStatus::Unavailable,
                    bids: PlayerMap::with_value(player_count, 0),
                })
                .collect(),
        }
    }

    pub fn items(&self) -> impl Iterator<Item = &StartItem> {
        self.items.iter()
    }

    #[must_use]
    pub fn item(&self, private: PrivateId) -> Option<&StartItem> {
        self.items.iter().find(|item| item.private == private)
    }

    pub fn item_mut(&mut self, private: PrivateId) -> Option<&mut StartItem> {
        self.items.iter_mut().find(|item| item.private == private)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn is_sold_out(&self) -> bool {
        self.items.iter().all(|item| item.status == ItemStatus::Sold)
    }

    #[must_use]
    pub fn has_unsold(&self) -> bool {
        !self.is_sold_out()
    }

    /// First unsold item in packet order.
    #[must_use]
    pub fn first_unsold(&self) -> Option<PrivateId> {
        self.items
            .iter()
            .find(|item| item.status != ItemStatus::Sold)
            .map(|item| item.private)
    }

    /// Mark the first unsold item buyable and the rest biddable.
    pub fn refresh_status(&mut self) {
        let first = self.first_unsold();
        for item in self.items.iter_mut() {
            if matches!(item.status, ItemStatus::Sold | ItemStatus::Auctioned) {
                continue;
            }
            item.status = if Some(item.private) == first {
                ItemStatus::Buyable
            } else {
                ItemStatus::Biddable
            };
        }
    }

    /// Total standing bids of a player.
    #[must_use]
    pub fn blocked_cash(&self, player: PlayerId) -> Money {
        self.items
            .iter()
            .filter(|item| item.status != ItemStatus::Sold)
            .map(|item| item.bids[player])
            .sum()
    }
}
