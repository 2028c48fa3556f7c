//! Game state: the world plus round bookkeeping.
//!
//! ## Rounds
//!
//! Exactly one round is active. An interrupting round is pushed on the
//! `interrupted` stack with its pending action while a sub-round runs;
//! when the sub-round finishes the top entry is popped and resumed.
//!
//! ## Transitions
//!
//! A finished round with no dormant parent is replaced through
//! `next_round`:
//!
//! | Finished | Next |
//! |---|---|
//! | start round, packet sold | stock round (operating rounds if the first stock round is skipped) |
//! | start round, packet unsold | operating rounds if the variant allows, else a stock round |
//! | stock round | a set of operating rounds, as many as the phase says |
//! | operating round | next in the set, else start round (unsold packet) or stock round |
//!
//! A pending game end is honoured after an operating round: at once, or at
//! the end of the set when `game_ends_after_set_of_ors` is set.
//!
//! Snapshots of `GameState` are what the change stack stores; every
//! collection inside is persistent, so a clone is cheap.

use im::Vector;
use log::{debug, error, info};

use crate::core::{Action, PlayerId, PossibleActionSet, RuleViolation};
use crate::rounds::{
    ActiveRound, Interruption, OperatingRound, RoundContext, RoundKind, RoundStatus, StartRound,
    StockRound,
};
use crate::world::World;

use super::corrections;

/// A suspended round and the action to re-apply when it resumes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DormantRound {
    pub round: ActiveRound,
    pub pending: Option<Action>,
}

/// Round counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Progress {
    pub start_rounds: u32,
    pub stock_rounds: u32,
    pub operating_sets: u32,

    /// Position in the current set of operating rounds, from 1.
    pub or_in_set: u8,
    pub ors_in_set: u8,
}

/// Why the game ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndReason {
    Bankruptcy(PlayerId),
    BankBroken,
    MarketEnd,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GameState {
    pub world: World,
    pub round: ActiveRound,

    /// Dormant rounds, innermost last.
    pub interrupted: Vector<DormantRound>,
    pub progress: Progress,

    pub game_over: bool,
    pub game_over_pending: bool,
    pub end_reason: Option<EndReason>,

    /// Cash correction mode is on.
    pub cash_correction: bool,

    /// The last action left a treasury step skipped that an older engine
    /// would have waited on.
    pub redundant_done_expected: bool,
}

impl GameState {
    /// A fresh game; the first round has not begun yet.
    #[must_use]
    pub fn new(world: World) -> Self {
        let round = if world.start_packet.is_empty() {
            ActiveRound::Stock(StockRound::new(1, true, &world))
        } else {
            ActiveRound::Start(StartRound::new(1, &world))
        };
        let progress = Progress {
            start_rounds: u32::from(matches!(round, ActiveRound::Start(_))),
            stock_rounds: u32::from(matches!(round, ActiveRound::Stock(_))),
            ..Progress::default()
        };
        Self {
            world,
            round,
            interrupted: Vector::new(),
            progress,
            game_over: false,
            game_over_pending: false,
            end_reason: None,
            cash_correction: false,
            redundant_done_expected: false,
        }
    }

    /// Begin the first round.
    pub fn start(&mut self, ctx: &RoundContext<'_>) -> Result<(), RuleViolation> {
        info!("{} starts", self.round.label());
        let status = self.round.as_round_mut().begin(&mut self.world, ctx)?;
        self.handle_status(ctx, status)
    }

    #[must_use]
    pub fn current_player(&self) -> PlayerId {
        self.round.as_round().current_player(&self.world)
    }

    /// Options of the active round.
    pub fn round_options(&self, ctx: &RoundContext<'_>, out: &mut PossibleActionSet) {
        if !self.game_over {
            self.round.as_round().set_possible_actions(&self.world, ctx, out);
        }
    }

    /// Apply a game action or a correction.
    pub fn apply(&mut self, ctx: &RoundContext<'_>, action: &Action) -> Result<(), RuleViolation> {
        if action.command.is_correction() {
            return corrections::process(self, action);
        }
        let status = self.round.as_round_mut().process(&mut self.world, ctx, action)?;
        self.redundant_done_expected = self.round.as_round().redundant_done_expected();
        self.handle_status(ctx, status)
    }

    /// Drive round changes until a round waits for input or the game ends.
    fn handle_status(&mut self, ctx: &RoundContext<'_>, mut status: RoundStatus) -> Result<(), RuleViolation> {
        loop {
            self.note_end_conditions();
            status = match status {
                RoundStatus::Continue => return Ok(()),
                RoundStatus::Bankrupt(player) => {
                    self.end_game(ctx, EndReason::Bankruptcy(player));
                    return Ok(());
                }
                RoundStatus::Interrupt(Interruption { request, pending }) => {
                    let sub = ActiveRound::from_request(&request);
                    info!("{} interrupted by {}", self.round.label(), sub.label());
                    let dormant = std::mem::replace(&mut self.round, sub);
                    self.interrupted.push_back(DormantRound { round: dormant, pending });
                    self.round.as_round_mut().begin(&mut self.world, ctx)?
                }
                RoundStatus::Finished => match self.interrupted.pop_back() {
                    Some(DormantRound { round, pending }) => {
                        info!("{} finished, {} resumes", self.round.label(), round.label());
                        self.round = round;
                        self.round.as_round_mut().resume(&mut self.world, ctx, pending)?
                    }
                    None => {
                        info!("{} finished", self.round.label());
                        let Some(next) = self.next_round(ctx) else {
                            return Ok(());
                        };
                        self.round = next;
                        info!("{} starts", self.round.label());
                        self.round.as_round_mut().begin(&mut self.world, ctx)?
                    }
                },
            };
        }
    }

    fn note_end_conditions(&mut self) {
        if self.game_over_pending {
            return;
        }
        let reason = if self.world.bank.broken {
            Some(EndReason::BankBroken)
        } else if self.world.market.end_reached {
            Some(EndReason::MarketEnd)
        } else {
            None
        };
        if let Some(reason) = reason {
            info!("game end pending: {:?}", reason);
            self.game_over_pending = true;
            self.end_reason = Some(reason);
        }
    }

    fn end_game(&mut self, ctx: &RoundContext<'_>, reason: EndReason) {
        self.game_over = true;
        self.end_reason = Some(reason);
        let result = ctx.variant.game_result(&self.world);
        info!("game over ({:?}): {:?}", reason, result);
        self.world.report.add(format!("Game over: {:?}", reason));
    }

    fn start_operating_set(&mut self) -> ActiveRound {
        self.progress.operating_sets += 1;
        self.progress.or_in_set = 1;
        self.progress.ors_in_set = self.world.phases.current().operating_rounds.max(1);
        debug!(
            "operating set {} with {} rounds",
            self.progress.operating_sets, self.progress.ors_in_set
        );
        ActiveRound::Operating(OperatingRound::new(self.progress.operating_sets, 1))
    }

    fn stock_round(&mut self) -> ActiveRound {
        self.progress.stock_rounds += 1;
        let first = self.progress.stock_rounds == 1;
        ActiveRound::Stock(StockRound::new(self.progress.stock_rounds, first, &self.world))
    }

    /// The round after the active one, or None when the game ends.
    fn next_round(&mut self, ctx: &RoundContext<'_>) -> Option<ActiveRound> {
        let next = match self.round.kind() {
            RoundKind::Start => {
                let sold = !self.world.start_packet.has_unsold();
                let skip_stock = ctx.config.skip_first_stock_round && self.progress.stock_rounds == 0;
                if sold && !skip_stock {
                    self.stock_round()
                } else if sold || ctx.variant.run_if_start_packet_is_not_completely_sold(&self.world) {
                    self.start_operating_set()
                } else {
                    self.stock_round()
                }
            }
            RoundKind::Stock => self.start_operating_set(),
            RoundKind::Operating => {
                let set_done = self.progress.or_in_set >= self.progress.ors_in_set;
                if self.game_over_pending && (set_done || !ctx.config.game_ends_after_set_of_ors) {
                    let reason = self.end_reason.unwrap_or(EndReason::BankBroken);
                    self.end_game(ctx, reason);
                    return None;
                }
                if !set_done {
                    self.progress.or_in_set += 1;
                    ActiveRound::Operating(OperatingRound::new(
                        self.progress.operating_sets,
                        self.progress.or_in_set,
                    ))
                } else if self.world.start_packet.has_unsold() {
                    self.progress.start_rounds += 1;
                    ActiveRound::Start(StartRound::new(self.progress.start_rounds, &self.world))
                } else {
                    self.stock_round()
                }
            }
            RoundKind::ShareSelling | RoundKind::TreasuryShares => {
                error!("{} finished without a round to resume", self.round.label());
                self.stock_round()
            }
        };
        Some(next)
    }
}
