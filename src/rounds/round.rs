//! The round protocol.
//!
//! ## Round
//!
//! Every concrete round implements:
//! - `set_possible_actions`: a pure function of round and world state
//! - `process`: validate fully, then mutate
//! - `resume`: continue after an interruption, applying the pending action
//! - `finish_round`: report and hand control back to the manager
//!
//! Rounds never call the manager. They return a `RoundStatus` and the
//! manager drives transitions: a finished round is replaced through the
//! transition table, an interrupting round is pushed on the dormant stack
//! together with its pending action.

use crate::core::{Action, CompanyId, GameConfig, Money, PlayerId, PossibleActionSet, RuleViolation};
use crate::engine::variant::GameVariant;
use crate::world::World;

/// Concrete round kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RoundKind {
    Start,
    Stock,
    Operating,
    ShareSelling,
    TreasuryShares,
}

/// Read-only inputs every round handler receives.
pub struct RoundContext<'a> {
    pub config: &'a GameConfig,
    pub variant: &'a dyn GameVariant,

    /// Actions are being replayed from a save file.
    pub replaying: bool,
}

/// A nested round a round needs before it can continue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubRoundRequest {
    /// `player` must raise their cash to `cash_needed` by selling shares.
    ShareSelling {
        player: PlayerId,
        cash_needed: Money,
        blocking_company: Option<CompanyId>,
    },
    /// The president of `company` may trade treasury shares.
    TreasuryShares { company: CompanyId },
}

/// An interruption: the sub-round to start and the action to re-apply on
/// resume.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Interruption {
    pub request: SubRoundRequest,
    pub pending: Option<Action>,
}

/// Outcome of a round step.
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use]
pub enum RoundStatus {
    /// Waiting for the next action.
    Continue,
    /// The round is over.
    Finished,
    /// Suspend this round and run a sub-round.
    Interrupt(Interruption),
    /// A player cannot meet an obligation; the game ends.
    Bankrupt(PlayerId),
}

impl RoundStatus {
    pub fn interrupt(request: SubRoundRequest, pending: Option<Action>) -> Self {
        RoundStatus::Interrupt(Interruption { request, pending })
    }
}

/// The round protocol.
pub trait Round {
    fn kind(&self) -> RoundKind;

    /// Short label for logs and reports ("SR 2", "OR 1.2").
    fn label(&self) -> String;

    /// Seat expected to act.
    fn current_player(&self, world: &World) -> PlayerId;

    /// Enter the round. May finish or interrupt at once.
    fn begin(&mut self, world: &mut World, ctx: &RoundContext<'_>) -> Result<RoundStatus, RuleViolation>;

    /// Add the legal actions of the current sub-state to `out`.
    fn set_possible_actions(&self, world: &World, ctx: &RoundContext<'_>, out: &mut PossibleActionSet);

    /// Apply a validated-membership action.
    ///
    /// Must check every rule before changing anything.
    fn process(
        &mut self,
        world: &mut World,
        ctx: &RoundContext<'_>,
        action: &Action,
    ) -> Result<RoundStatus, RuleViolation>;

    /// Continue after a sub-round, applying `pending` exactly once.
    fn resume(
        &mut self,
        world: &mut World,
        ctx: &RoundContext<'_>,
        pending: Option<Action>,
    ) -> Result<RoundStatus, RuleViolation>;

    /// Close the round.
    fn finish_round(&mut self, world: &mut World, ctx: &RoundContext<'_>) -> RoundStatus;

    /// A legacy save may contain a `Done` the last step no longer needs.
    fn redundant_done_expected(&self) -> bool {
        false
    }
}

/// Rejection for an action the round does not handle in its current state.
pub(crate) fn wrong_step(action: &Action, context: impl Into<String>) -> RuleViolation {
    RuleViolation::WrongStep {
        action: action.command.name(),
        context: context.into(),
    }
}
