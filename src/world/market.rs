//! The stock market grid.
//!
//! Each priced cell holds a stack of company tokens. A company arriving on
//! a cell goes to the bottom of the stack, so the stack position records
//! arrival order; operating order uses it as the last tie-break.
//!
//! Movement: payout moves right, withhold moves left, each unit sold moves
//! down, sold out at the end of a stock round moves up. A move towards a
//! cell outside the grid leaves the token where it is.

use std::sync::Arc;

use im::{OrdMap, Vector};

use crate::core::{CompanyId, MarketConfig, MarketPosition, Money};

/// Direction of a price move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PriceMove {
    Right,
    Left,
    Down,
    Up,
}

/// Market state: the configured grid plus token stacks per cell.
#[derive(Clone, Debug, PartialEq)]
pub struct StockMarket {
    config: Arc<MarketConfig>,
    stacks: OrdMap<MarketPosition, Vector<CompanyId>>,

    /// A token reached an end-of-game cell.
    pub end_reached: bool,
}

impl StockMarket {
    pub fn new(config: Arc<MarketConfig>) -> Self {
        Self {
            config,
            stacks: OrdMap::new(),
            end_reached: false,
        }
    }

    #[must_use]
    pub fn price(&self, pos: MarketPosition) -> Option<Money> {
        self.config.price(pos)
    }

    /// The par cell with this price.
    #[must_use]
    pub fn par_cell(&self, price: Money) -> Option<MarketPosition> {
        self.config
            .par_cells
            .iter()
            .copied()
            .find(|cell| self.price(*cell) == Some(price))
    }

    /// Par prices in configuration order.
    pub fn par_prices(&self) -> impl Iterator<Item = Money> + '_ {
        self.config.par_cells.iter().filter_map(|cell| self.price(*cell))
    }

    /// Put a token on a cell.
    pub fn place(&mut self, company: CompanyId, pos: MarketPosition) {
        self.stacks.entry(pos).or_insert_with(Vector::new).push_back(company);
        if self.config.end_game_cells.contains(&pos) {
            self.end_reached = true;
        }
    }

    fn remove(&mut self, company: CompanyId, pos: MarketPosition) {
        if let Some(stack) = self.stacks.get_mut(&pos) {
            if let Some(index) = stack.iter().position(|c| *c == company) {
                stack.remove(index);
            }
            if stack.is_empty() {
                self.stacks.remove(&pos);
            }
        }
    }

    /// Move a token one cell; returns the resulting position.
    pub fn shift(&mut self, company: CompanyId, from: MarketPosition, direction: PriceMove) -> MarketPosition {
        let target = match direction {
            PriceMove::Right => from.col.checked_add(1).map(|col| MarketPosition::new(from.row, col)),
            PriceMove::Left => from.col.checked_sub(1).map(|col| MarketPosition::new(from.row, col)),
            PriceMove::Down => from.row.checked_add(1).map(|row| MarketPosition::new(row, from.col)),
            PriceMove::Up => from.row.checked_sub(1).map(|row| MarketPosition::new(row, from.col)),
        };

        match target.filter(|pos| self.price(*pos).is_some()) {
            Some(to) => {
                self.remove(company, from);
                self.place(company, to);
                to
            }
            None => from,
        }
    }

    /// Index of the token within its cell, 0 = arrived first.
    #[must_use]
    pub fn stack_position(&self, company: CompanyId, pos: MarketPosition) -> usize {
        self.stacks
            .get(&pos)
            .and_then(|stack| stack.iter().position(|c| *c == company))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn market() -> StockMarket {
        StockMarket::new(Arc::new(MarketConfig {
            prices: vec![
                vec![Some(60), Some(70), Some(80)],
                vec![Some(50), Some(60), None],
            ],
            par_cells: vec![MarketPosition::new(0, 1)],
            end_game_cells: vec![MarketPosition::new(0, 2)],
        }))
    }

    #[test]
    fn test_par_cell_lookup() {
        let market = market();
        assert_eq!(market.par_cell(70), Some(MarketPosition::new(0, 1)));
        assert_eq!(market.par_cell(65), None);
        assert_eq!(market.par_prices().collect::<Vec<_>>(), vec![70]);
    }

    #[test]
    fn test_moves() {
        let mut market = market();
        let start = MarketPosition::new(0, 1);
        market.place(CompanyId(0), start);

        let down = market.shift(CompanyId(0), start, PriceMove::Down);
        assert_eq!(down, MarketPosition::new(1, 1));
        let left = market.shift(CompanyId(0), down, PriceMove::Left);
        assert_eq!(market.price(left), Some(50));
    }

    #[test]
    fn test_move_off_grid_is_ignored() {
        let mut market = market();
        let pos = MarketPosition::new(1, 1);
        market.place(CompanyId(0), pos);
        assert_eq!(market.shift(CompanyId(0), pos, PriceMove::Right), pos);
        assert_eq!(market.shift(CompanyId(0), pos, PriceMove::Down), pos);
    }

    #[test]
    fn test_stack_position_is_arrival_order() {
        let mut market = market();
        let pos = MarketPosition::new(0, 0);
        market.place(CompanyId(3), pos);
        market.place(CompanyId(1), pos);
        assert_eq!(market.stack_position(CompanyId(3), pos), 0);
        assert_eq!(market.stack_position(CompanyId(1), pos), 1);
    }

    #[test]
    fn test_end_cell_sets_flag() {
        let mut market = market();
        let pos = MarketPosition::new(0, 1);
        market.place(CompanyId(0), pos);
        assert!(!market.end_reached);
        market.shift(CompanyId(0), pos, PriceMove::Right);
        assert!(market.end_reached);
    }
}
