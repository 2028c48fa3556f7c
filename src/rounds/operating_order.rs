//! Operating order.
//!
//! Price-bearing companies operate by share price (high first), then board
//! column (right first), then row (top first), then arrival order within
//! the market cell. Price-less companies follow in configuration order.
//!
//! When the order is dynamic, companies that already operated keep their
//! slots and only the tail is re-sorted. The tail is rearranged by moving
//! entries, so untouched companies keep their positions.

use std::cmp::Reverse;

use im::Vector;

use crate::core::CompanyId;
use crate::world::World;

type SortKey = (bool, Reverse<i32>, Reverse<u8>, u8, usize, usize);

fn sort_key(world: &World, company: CompanyId) -> SortKey {
    let c = world.company(company);
    match c.market_position {
        Some(pos) if c.kind.has_stock_price => (
            false,
            Reverse(world.market.price(pos).unwrap_or(0)),
            Reverse(pos.col),
            pos.row,
            world.market.stack_position(company, pos),
            company.index(),
        ),
        _ => (true, Reverse(0), Reverse(0), 0, 0, company.index()),
    }
}

/// Sort companies into operating order.
pub fn sort_operating(world: &World, companies: &mut [CompanyId]) {
    companies.sort_by_key(|c| sort_key(world, *c));
}

/// Companies taking part in an operating round, in operating order.
#[must_use]
pub fn operating_order(world: &World) -> Vector<CompanyId> {
    let mut companies: Vec<_> = world
        .company_ids()
        .filter(|c| world.company(*c).is_operating())
        .collect();
    sort_operating(world, &mut companies);
    companies.into_iter().collect()
}

/// Re-sort the entries after `stable` by current price and position.
///
/// Returns true if anything moved.
pub fn reorder_tail(world: &World, order: &mut Vector<CompanyId>, stable: usize) -> bool {
    if stable >= order.len() {
        return false;
    }
    let mut desired: Vec<_> = order.iter().skip(stable).copied().collect();
    sort_operating(world, &mut desired);

    let mut moved = false;
    for (offset, company) in desired.into_iter().enumerate() {
        let slot = stable + offset;
        if order.get(slot) == Some(&company) {
            continue;
        }
        if let Some(current) = order.iter().skip(slot).position(|c| *c == company) {
            let entry = order.remove(slot + current);
            order.insert(slot, entry);
            moved = true;
        }
    }
    moved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{MarketPosition, PlayerId, ShareSource};
    use crate::games::sample::{self, SampleGameBuilder};

    fn floated_world() -> World {
        let config = SampleGameBuilder::new().build();
        let names: Vec<_> = ["Ann", "Bob", "Cy"].iter().map(|s| s.to_string()).collect();
        let mut world = World::new(&config, &names).unwrap();
        for (company, par, investor) in [
            (sample::PRR, 67, PlayerId(1)),
            (sample::NYC, 100, PlayerId(2)),
            (sample::BO, 67, PlayerId(1)),
        ] {
            world.start_company(PlayerId(0), company, par);
            for _ in 0..4 {
                world.buy_shares(investor, company, ShareSource::Ipo, 1, par);
            }
        }
        world.start_company(PlayerId(2), sample::M1, 100);
        world
    }

    #[test]
    fn test_price_then_arrival() {
        let world = floated_world();
        let order: Vec<_> = operating_order(&world).into_iter().collect();
        assert_eq!(order, vec![sample::NYC, sample::PRR, sample::BO, sample::M1]);
    }

    #[test]
    fn test_higher_column_first_at_equal_price() {
        let mut world = floated_world();
        let from = world.company(sample::BO).market_position.unwrap();
        let to = MarketPosition::new(from.row + 1, from.col + 1);
        assert_eq!(world.market.price(to), world.market.price(from));
        world.move_price(sample::BO, crate::world::PriceMove::Down);
        world.move_price(sample::BO, crate::world::PriceMove::Right);
        assert_eq!(world.company(sample::BO).market_position, Some(to));

        let order: Vec<_> = operating_order(&world).into_iter().collect();
        assert_eq!(order, vec![sample::NYC, sample::BO, sample::PRR, sample::M1]);
    }

    #[test]
    fn test_reorder_keeps_stable_prefix() {
        let mut world = floated_world();
        let mut order = operating_order(&world);
        // NYC operated and dropped to the bottom of the market.
        for _ in 0..6 {
            world.move_price(sample::NYC, crate::world::PriceMove::Down);
        }
        world.move_price(sample::BO, crate::world::PriceMove::Right);

        let moved = reorder_tail(&world, &mut order, 1);
        assert!(moved);
        let order: Vec<_> = order.into_iter().collect();
        assert_eq!(order, vec![sample::NYC, sample::BO, sample::PRR, sample::M1]);
    }

    #[test]
    fn test_reorder_without_change() {
        let world = floated_world();
        let mut order = operating_order(&world);
        assert!(!reorder_tail(&world, &mut order, 0));
        assert!(!reorder_tail(&world, &mut order, 10));
    }
}
