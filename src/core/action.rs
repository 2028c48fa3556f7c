//! Actions and the action log.
//!
//! An `Action` is one player decision: the acting seat plus a `Command`,
//! a closed sum type with one variant per kind of decision. The same type
//! serves two roles:
//!
//! - as an *option* in the `PossibleActionSet`, where fields the player
//!   still chooses (a bid amount, a revenue, a rotation, a quantity up to
//!   a maximum) hold placeholders or upper bounds;
//! - as a *chosen* action, fully filled in.
//!
//! Two comparisons follow from that:
//! - `equals_as_option`: does a chosen action fit an offered option?
//! - `equals_as_action`: are two chosen actions the same decision? Used to
//!   validate replays; ignores the `executed` flag and log metadata.

use im::Vector;
use serde::{Deserialize, Serialize};

use super::config::DividendAllocation;
use super::ids::{CompanyId, HexId, Money, PrivateId, TileId, TrainTypeId};
use super::player::PlayerId;

/// Where a certificate is bought from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShareSource {
    Ipo,
    Pool,
}

/// Where a train is bought from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrainSource {
    Depot,
    Pool,
    Company(CompanyId),
}

/// Anything that holds cash.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CashHolder {
    Player(PlayerId),
    Company(CompanyId),
    Bank,
}

/// Correction categories, each with its own manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CorrectionKind {
    Cash,
}

/// What a player decided.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    // === Start round ===
    /// As an option `amount` is the minimum bid.
    BidStartItem { item: PrivateId, amount: Money },
    BuyStartItem { item: PrivateId, price: Money },

    // === Stock rounds ===
    StartCompany { company: CompanyId, par_price: Money },
    BuyCertificate {
        company: CompanyId,
        source: ShareSource,
        units: u8,
        price: Money,
    },
    /// As an option `units` is the maximum sellable.
    SellShares { company: CompanyId, units: u8, price: Money },

    // === Operating round ===
    LayTile {
        company: CompanyId,
        hex: HexId,
        tile: TileId,
        rotation: u8,
        special: Option<PrivateId>,
    },
    LayBaseToken {
        company: CompanyId,
        hex: HexId,
        special: Option<PrivateId>,
    },
    /// As an option `revenue` is a placeholder.
    SetDividend {
        company: CompanyId,
        revenue: Money,
        allocation: DividendAllocation,
    },
    /// `price` is only binding in an option when `fixed_price` is set.
    /// `president_cash` is the emergency contribution of the president.
    BuyTrain {
        company: CompanyId,
        train_type: TrainTypeId,
        source: TrainSource,
        price: Money,
        fixed_price: bool,
        president_cash: Money,
    },
    DiscardTrain { company: CompanyId, train_type: TrainTypeId },
    /// As an option `price` is a placeholder; the range is checked on processing.
    BuyPrivate {
        company: CompanyId,
        private: PrivateId,
        price: Money,
    },
    /// As an option `count` is the maximum.
    TakeLoans { company: CompanyId, count: u8 },
    /// As an option `count` is the maximum and `president_cash` a placeholder.
    RepayLoans {
        company: CompanyId,
        count: u8,
        president_cash: Money,
    },
    /// As an option `units` is the maximum.
    BuyTreasuryShares { company: CompanyId, units: u8, price: Money },
    /// As an option `units` is the maximum.
    SellTreasuryShares { company: CompanyId, units: u8, price: Money },

    // === Null actions ===
    Pass,
    Done,
    Skip,

    // === Corrections ===
    SetCorrectionMode { kind: CorrectionKind, enabled: bool },
    /// As an option both fields are placeholders.
    CorrectCash { holder: CashHolder, amount: Money },

    // === Meta actions (never logged) ===
    Undo,
    Redo,
    Save { path: String },
    Reload { path: String },
    Export { path: String },
}

impl Command {
    /// Short name of the command kind.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Command::BidStartItem { .. } => "BidStartItem",
            Command::BuyStartItem { .. } => "BuyStartItem",
            Command::StartCompany { .. } => "StartCompany",
            Command::BuyCertificate { .. } => "BuyCertificate",
            Command::SellShares { .. } => "SellShares",
            Command::LayTile { .. } => "LayTile",
            Command::LayBaseToken { .. } => "LayBaseToken",
            Command::SetDividend { .. } => "SetDividend",
            Command::BuyTrain { .. } => "BuyTrain",
            Command::DiscardTrain { .. } => "DiscardTrain",
            Command::BuyPrivate { .. } => "BuyPrivate",
            Command::TakeLoans { .. } => "TakeLoans",
            Command::RepayLoans { .. } => "RepayLoans",
            Command::BuyTreasuryShares { .. } => "BuyTreasuryShares",
            Command::SellTreasuryShares { .. } => "SellTreasuryShares",
            Command::Pass => "Pass",
            Command::Done => "Done",
            Command::Skip => "Skip",
            Command::SetCorrectionMode { .. } => "SetCorrectionMode",
            Command::CorrectCash { .. } => "CorrectCash",
            Command::Undo => "Undo",
            Command::Redo => "Redo",
            Command::Save { .. } => "Save",
            Command::Reload { .. } => "Reload",
            Command::Export { .. } => "Export",
        }
    }

    /// Meta actions act on the log and change stack, not on the game.
    #[must_use]
    pub fn is_meta(&self) -> bool {
        matches!(
            self,
            Command::Undo
                | Command::Redo
                | Command::Save { .. }
                | Command::Reload { .. }
                | Command::Export { .. }
        )
    }

    /// Corrections are handled by the correction managers, not by rounds.
    #[must_use]
    pub fn is_correction(&self) -> bool {
        matches!(
            self,
            Command::SetCorrectionMode { .. } | Command::CorrectCash { .. }
        )
    }

    /// Whether a chosen command fits this command used as an option.
    #[must_use]
    pub fn admits(&self, chosen: &Command) -> bool {
        use Command::*;

        match (self, chosen) {
            (
                BidStartItem { item, amount: minimum },
                BidStartItem { item: c_item, amount },
            ) => item == c_item && amount >= minimum,

            (
                SellShares { company, units: max, price },
                SellShares { company: c_company, units, price: c_price },
            ) => company == c_company && price == c_price && (1..=*max).contains(units),

            (
                LayTile { company, hex, tile, special, .. },
                LayTile {
                    company: c_company,
                    hex: c_hex,
                    tile: c_tile,
                    special: c_special,
                    ..
                },
            ) => company == c_company && hex == c_hex && tile == c_tile && special == c_special,

            (
                SetDividend { company, allocation, .. },
                SetDividend {
                    company: c_company,
                    allocation: c_allocation,
                    ..
                },
            ) => company == c_company && allocation == c_allocation,

            (
                BuyTrain {
                    company,
                    train_type,
                    source,
                    price,
                    fixed_price,
                    president_cash,
                },
                BuyTrain {
                    company: c_company,
                    train_type: c_type,
                    source: c_source,
                    price: c_price,
                    president_cash: c_president_cash,
                    ..
                },
            ) => {
                company == c_company
                    && train_type == c_type
                    && source == c_source
                    && (!fixed_price || price == c_price)
                    && president_cash == c_president_cash
            }

            (
                BuyPrivate { company, private, .. },
                BuyPrivate {
                    company: c_company,
                    private: c_private,
                    ..
                },
            ) => company == c_company && private == c_private,

            (
                TakeLoans { company, count: max },
                TakeLoans { company: c_company, count },
            ) => company == c_company && (1..=*max).contains(count),

            (
                RepayLoans { company, count: max, .. },
                RepayLoans { company: c_company, count, .. },
            ) => company == c_company && (1..=*max).contains(count),

            (
                BuyTreasuryShares { company, units: max, price },
                BuyTreasuryShares { company: c_company, units, price: c_price },
            )
            | (
                SellTreasuryShares { company, units: max, price },
                SellTreasuryShares { company: c_company, units, price: c_price },
            ) => company == c_company && price == c_price && (1..=*max).contains(units),

            (CorrectCash { .. }, CorrectCash { .. }) => true,
            (Save { .. }, Save { .. }) => true,
            (Reload { .. }, Reload { .. }) => true,
            (Export { .. }, Export { .. }) => true,

            (option, chosen) => option == chosen,
        }
    }
}

/// One decision by one seat.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Action {
    pub player: PlayerId,
    pub command: Command,

    /// Set once the engine has applied the action.
    pub executed: bool,
}

impl Action {
    /// Create a not-yet-executed action.
    #[must_use]
    pub fn new(player: PlayerId, command: Command) -> Self {
        Self {
            player,
            command,
            executed: false,
        }
    }

    /// Shorthand for a pass.
    #[must_use]
    pub fn pass(player: PlayerId) -> Self {
        Self::new(player, Command::Pass)
    }

    /// Shorthand for done.
    #[must_use]
    pub fn done(player: PlayerId) -> Self {
        Self::new(player, Command::Done)
    }

    /// Semantic equality for replay validation.
    #[must_use]
    pub fn equals_as_action(&self, other: &Action) -> bool {
        self.player == other.player && self.command == other.command
    }

    /// Whether `chosen` fits this action offered as an option.
    #[must_use]
    pub fn equals_as_option(&self, chosen: &Action) -> bool {
        self.player == chosen.player && self.command.admits(&chosen.command)
    }

    #[must_use]
    pub fn is_meta(&self) -> bool {
        self.command.is_meta()
    }

    /// Pass is the only command the engine executes on its own.
    #[must_use]
    pub fn is_pass(&self) -> bool {
        matches!(self.command, Command::Pass)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {:?}", self.player, self.command)
    }
}

/// An executed action with log metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggedAction {
    pub action: Action,

    /// Executed by the engine as an automatic pass.
    pub automatic: bool,

    /// Label of the round it was executed in.
    pub round: String,
}

impl LoggedAction {
    pub fn new(action: Action, automatic: bool, round: impl Into<String>) -> Self {
        Self {
            action,
            automatic,
            round: round.into(),
        }
    }
}

/// Ordered history of executed actions; the source of truth for replay.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionLog {
    entries: Vector<LoggedAction>,
}

impl ActionLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a log from saved entries.
    pub fn from_entries(entries: impl IntoIterator<Item = LoggedAction>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn push(&mut self, entry: LoggedAction) {
        self.entries.push_back(entry);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&LoggedAction> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LoggedAction> {
        self.entries.iter()
    }

    /// Entries as a plain vector, for saving.
    #[must_use]
    pub fn to_vec(&self) -> Vec<LoggedAction> {
        self.entries.iter().cloned().collect()
    }

    /// Drop entries from `len` on; only undo may shorten the log.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }
}
