//! Core engine types: players, identifiers, configuration, actions, errors.
//!
//! This module contains the title-agnostic building blocks. Titles
//! describe themselves through `GameConfig` rather than modifying the core.

pub mod action;
pub mod config;
pub mod error;
pub mod ids;
pub mod player;
pub mod possible;
pub mod rng;

pub use action::{
    Action, ActionLog, CashHolder, Command, CorrectionKind, LoggedAction, ShareSource,
    TrainSource,
};
pub use config::{
    CompanyConfig, CompanyTypeConfig, DividendAllocation, GameConfig, HexConfig, LegacyDoneSkip,
    LoanTerms, MarketConfig, MarketPosition, PhaseConfig, PrivateConfig, SequenceRule,
    SpecialProperty, StartRoundConfig, TileColour, TileConfig, TrainTypeConfig,
};
pub use error::{
    ConfigurationFault, GameError, PersistenceError, RejectedAction, ReplayMismatch, Result,
    RuleViolation,
};
pub use ids::{CompanyId, HexId, Money, PrivateId, TileId, TrainTypeId};
pub use player::{PlayerId, PlayerMap};
pub use possible::PossibleActionSet;
pub use rng::GameRng;
