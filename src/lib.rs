//! # rust-18xx
//!
//! An action-driven round engine for 18xx-style railway games.
//!
//! ## Design Principles
//!
//! 1. **Actions Are the Truth**: every decision is an `Action`; the ordered
//!    `ActionLog` is the save format, and replaying it rebuilds the game.
//!
//! 2. **One Legality Gate**: the engine only accepts members of the current
//!    `PossibleActionSet`. Rejected actions change nothing.
//!
//! 3. **Configuration Over Convention**: rulesets are plain `GameConfig`
//!    data plus a few `GameVariant` hooks.
//!
//! ## Architecture
//!
//! - **Rounds**: start, stock and operating rounds are state machines behind
//!   the `Round` trait. A round may be interrupted by a sub-round and resume
//!   with its pending action.
//!
//! - **Persistent Data Structures**: cheap `GameState` snapshots via `im`
//!   back undo and redo.
//!
//! ## Modules
//!
//! - `core`: ids, actions, the possible-action set, configuration, errors
//! - `world`: players, companies, market, trains, board, start packet
//! - `rounds`: the round state machines
//! - `engine`: game state, `GameManager`, change stack, replay, corrections
//! - `persistence`: save files and codecs
//! - `games`: rulesets

pub mod core;
pub mod engine;
pub mod games;
pub mod persistence;
pub mod rounds;
pub mod world;

// Re-export commonly used types
pub use crate::core::{
    Action, ActionLog, Command, GameConfig, GameError, LoggedAction, PlayerId, PossibleActionSet,
    RejectedAction, ReplayMismatch, Result, RuleViolation,
};

pub use crate::engine::{GameManager, GameResult, GameState, GameVariant, StandardVariant};

pub use crate::persistence::{GameSetup, SaveFile};

pub use crate::rounds::{OrStep, Round, RoundKind};
