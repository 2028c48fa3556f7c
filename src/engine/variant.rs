//! Per-title rule hooks.
//!
//! The round machines call into a `GameVariant` at the few points where
//! titles differ:
//! - whether operating rounds run while the start packet is unsold
//! - whether a title vetoes an operating step for a company
//! - which privates close when a company ends its turn
//! - how the final result is ranked

use crate::core::{CompanyId, PlayerId};
use crate::rounds::operating::OrStep;
use crate::world::World;

/// Result of a completed game.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameResult {
    /// Single winner.
    Winner(PlayerId),
    /// Several players share the highest worth.
    Winners(Vec<PlayerId>),
}

impl GameResult {
    /// Check if a player won.
    #[must_use]
    pub fn is_winner(&self, player: PlayerId) -> bool {
        match self {
            GameResult::Winner(p) => *p == player,
            GameResult::Winners(ps) => ps.contains(&player),
        }
    }
}

/// Title-specific hooks.
///
/// ## Implementation Notes
///
/// - Hooks must be deterministic: replay depends on it
/// - `close_exhausted_privates` runs inside the change-set of the action
///   that ended the turn
pub trait GameVariant: std::fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    /// Run operating rounds after a start round that left items unsold.
    ///
    /// If false, another stock round follows instead.
    fn run_if_start_packet_is_not_completely_sold(&self, _world: &World) -> bool {
        true
    }

    /// Veto an operating step the generic rules would otherwise offer.
    fn step_vetoed(&self, _world: &World, _company: CompanyId, _step: OrStep) -> bool {
        false
    }

    /// Close privates that have nothing left to give once `company` has
    /// operated.
    fn close_exhausted_privates(&self, world: &mut World, company: CompanyId) {
        let exhausted: Vec<_> = world
            .privates
            .iter()
            .filter(|p| !p.closed && p.special_used && p.owned_by_company(company))
            .map(|p| p.id)
            .collect();
        for private in exhausted {
            world.close_private(private);
        }
    }

    /// Rank the players at game end by total worth.
    fn game_result(&self, world: &World) -> GameResult {
        let worths: Vec<_> = world.players.player_ids().map(|p| (p, world.player_worth(p))).collect();
        let best = worths.iter().map(|(_, w)| *w).max().unwrap_or(0);
        let winners: Vec<_> = worths.into_iter().filter(|(_, w)| *w == best).map(|(p, _)| p).collect();
        match winners.as_slice() {
            [single] => GameResult::Winner(*single),
            _ => GameResult::Winners(winners),
        }
    }
}

/// The generic rules with no title-specific overrides.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StandardVariant;

impl GameVariant for StandardVariant {
    fn name(&self) -> &str {
        "standard"
    }
}
