//! Error types.
//!
//! - `RuleViolation`: a round handler refused an action (always recoverable)
//! - `RejectedAction`: the manager refused an action; state is unchanged
//! - `ReplayMismatch`: a reload was aborted; live state is unchanged
//! - `ConfigurationFault`: the ruleset is broken; setup must not proceed
//! - `PersistenceError`: save files could not be read or written

use thiserror::Error;

use super::config::MarketPosition;
use super::ids::{CompanyId, HexId, Money, PrivateId, TileId, TrainTypeId};
use super::player::PlayerId;

/// Result alias for engine operations.
pub type Result<T, E = GameError> = std::result::Result<T, E>;

/// A rule check failed inside a round handler.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleViolation {
    #[error("{action} is not allowed in {context}")]
    WrongStep { action: &'static str, context: String },

    #[error("{holder} needs {needed} but has {available}")]
    InsufficientFunds {
        holder: String,
        needed: Money,
        available: Money,
    },

    #[error("{player} would exceed the certificate limit")]
    CertificateLimit { player: PlayerId },

    #[error("holding limit reached for {company}")]
    HoldingLimit { company: CompanyId },

    #[error("bank pool limit reached for {company}")]
    PoolLimit { company: CompanyId },

    #[error("{company} was already sold this round")]
    SoldThisRound { company: CompanyId },

    #[error("cannot sell {units} units of {company}")]
    NotSellable { company: CompanyId, units: u8 },

    #[error("no such certificate of {company}")]
    NoCertificate { company: CompanyId },

    #[error("{company} has already started")]
    AlreadyStarted { company: CompanyId },

    #[error("{player} is not the president of {company}")]
    NotPresident { player: PlayerId, company: CompanyId },

    #[error("{company} is at its train limit of {limit}")]
    TrainLimit { company: CompanyId, limit: u8 },

    #[error("{train_type} is not available")]
    TrainNotAvailable { train_type: TrainTypeId },

    #[error("{company} must buy a train")]
    MustBuyTrain { company: CompanyId },

    #[error("price {price} is outside {min}..={max}")]
    InvalidPrice { price: Money, min: Money, max: Money },

    #[error("bid {amount} is below the minimum of {minimum}")]
    BidTooLow { amount: Money, minimum: Money },

    #[error("revenue {revenue} is invalid")]
    InvalidRevenue { revenue: Money },

    #[error("{allocation} is not allowed for {company}")]
    AllocationNotAllowed { allocation: String, company: CompanyId },

    #[error("rotation {rotation} is invalid")]
    InvalidRotation { rotation: u8 },

    #[error("{tile} cannot be laid on {hex}")]
    TileNotAllowed { hex: HexId, tile: TileId },

    #[error("no tile lays left this turn")]
    NoTileLaysLeft,

    #[error("{company} cannot place a station on {hex}")]
    TokenNotAllowed { company: CompanyId, hex: HexId },

    #[error("{company} has no free station markers")]
    NoFreeToken { company: CompanyId },

    #[error("special property of {private} is not usable")]
    SpecialUnavailable { private: PrivateId },

    #[error("{private} is not for sale")]
    PrivateUnavailable { private: PrivateId },

    #[error("{company} cannot take or repay {count} loans")]
    LoanNotAllowed { company: CompanyId, count: u8 },

    #[error("{count} units is not a valid quantity")]
    InvalidQuantity { count: u8 },

    #[error("correction mode is not active")]
    CorrectionInactive,

    #[error("{holder} would end with a negative balance")]
    NegativeBalance { holder: String },

    #[error("{holder} is not part of this game")]
    UnknownHolder { holder: String },

    #[error("{holder} cannot hold that much cash")]
    CashOverflow { holder: String },

    #[error("{0}")]
    Other(String),
}

/// The manager refused an action. No state was changed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectedAction {
    #[error("it is not the turn of {actual}, {expected} is to act")]
    WrongPlayer { expected: PlayerId, actual: PlayerId },

    #[error("{action} is not a possible action now")]
    NotPossible { action: String },

    #[error(transparent)]
    Rule(#[from] RuleViolation),

    #[error("the game is over")]
    GameOver,
}

/// A reload was aborted; the live game is untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplayMismatch {
    #[error("save file has {loaded} actions but {executed} were already executed")]
    TooShort { loaded: usize, executed: usize },

    #[error("action {index} differs: executed {expected}, file has {found}")]
    Diverged {
        index: usize,
        expected: String,
        found: String,
    },

    #[error("action {index} ({action}) was rejected: {reason}")]
    Rejected {
        index: usize,
        action: String,
        reason: String,
    },

    #[error("save file belongs to a different game setup")]
    SetupMismatch,
}

/// The ruleset cannot be instantiated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationFault {
    #[error("no phases configured")]
    NoPhases,

    #[error("no train types configured")]
    NoTrainTypes,

    #[error("invalid player range {min}..={max}")]
    InvalidPlayerRange { min: u8, max: u8 },

    #[error("{count} players is outside {min}..={max}")]
    PlayerCount { count: usize, min: u8, max: u8 },

    #[error("no certificate limit for {players} players")]
    NoCertificateLimit { players: u8 },

    #[error("company type {company_type} has an invalid share structure")]
    InvalidShareStructure { company_type: String },

    #[error("no par cells on the stock market")]
    NoParCells,

    #[error("company {company} refers to unknown type {index}")]
    UnknownCompanyType { company: String, index: usize },

    #[error("{context} refers to unknown {hex}")]
    UnknownHex { context: String, hex: HexId },

    #[error("{hex} refers to unknown {tile}")]
    UnknownTile { hex: HexId, tile: TileId },

    #[error("{context} refers to unknown {train_type}")]
    UnknownTrainType {
        context: String,
        train_type: TrainTypeId,
    },

    #[error("train {train} starts unknown phase {phase}")]
    UnknownPhase { train: String, phase: usize },

    #[error("{company} has no stock price and no fixed price")]
    MissingFixedPrice { company: CompanyId },

    #[error("market cell {cell} has no price")]
    CellOffMarket { cell: MarketPosition },

    #[error("start round configured without privates")]
    EmptyStartPacket,
}

/// Save files could not be read or written.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encoding error: {0}")]
    Encode(String),

    #[error("decoding error: {0}")]
    Decode(String),

    #[error("not a save file")]
    BadMagic,

    #[error("save format v{found} is newer than supported v{supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
}

/// Umbrella error for the driving boundary.
#[derive(Error, Debug)]
pub enum GameError {
    #[error(transparent)]
    Rejected(#[from] RejectedAction),

    #[error(transparent)]
    Replay(#[from] ReplayMismatch),

    #[error(transparent)]
    Configuration(#[from] ConfigurationFault),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl From<RuleViolation> for GameError {
    fn from(violation: RuleViolation) -> Self {
        GameError::Rejected(RejectedAction::Rule(violation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_violation_display() {
        let err = RuleViolation::InsufficientFunds {
            holder: "PRR".into(),
            needed: 180,
            available: 40,
        };
        assert_eq!(err.to_string(), "PRR needs 180 but has 40");
    }

    #[test]
    fn test_rejected_wraps_rule() {
        let rejected: RejectedAction = RuleViolation::NoTileLaysLeft.into();
        assert_eq!(rejected.to_string(), "no tile lays left this turn");
    }

    #[test]
    fn test_game_error_from_rule() {
        let err: GameError = RuleViolation::CorrectionInactive.into();
        assert!(matches!(
            err,
            GameError::Rejected(RejectedAction::Rule(RuleViolation::CorrectionInactive))
        ));
    }

    #[test]
    fn test_replay_mismatch_display() {
        let err = ReplayMismatch::TooShort { loaded: 3, executed: 5 };
        assert_eq!(
            err.to_string(),
            "save file has 3 actions but 5 were already executed"
        );
    }
}
