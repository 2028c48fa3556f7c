//! The concrete rounds as one sum type.
//!
//! The manager stores rounds by value (snapshots for the change stack are
//! plain clones) and dispatches through the `Round` trait.

use super::operating::OperatingRound;
use super::round::{Round, RoundKind, SubRoundRequest};
use super::share_selling::ShareSellingRound;
use super::start::StartRound;
use super::stock::StockRound;
use super::treasury::TreasuryShareRound;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActiveRound {
    Start(StartRound),
    Stock(StockRound),
    Operating(OperatingRound),
    ShareSelling(ShareSellingRound),
    Treasury(TreasuryShareRound),
}

impl ActiveRound {
    /// The sub-round an interruption asks for.
    #[must_use]
    pub fn from_request(request: &SubRoundRequest) -> Self {
        match request {
            SubRoundRequest::ShareSelling {
                player,
                cash_needed,
                blocking_company,
            } => ActiveRound::ShareSelling(ShareSellingRound::new(*player, *cash_needed, *blocking_company)),
            SubRoundRequest::TreasuryShares { company } => {
                ActiveRound::Treasury(TreasuryShareRound::new(*company))
            }
        }
    }

    #[must_use]
    pub fn as_round(&self) -> &dyn Round {
        match self {
            ActiveRound::Start(round) => round,
            ActiveRound::Stock(round) => round,
            ActiveRound::Operating(round) => round,
            ActiveRound::ShareSelling(round) => round,
            ActiveRound::Treasury(round) => round,
        }
    }

    pub fn as_round_mut(&mut self) -> &mut dyn Round {
        match self {
            ActiveRound::Start(round) => round,
            ActiveRound::Stock(round) => round,
            ActiveRound::Operating(round) => round,
            ActiveRound::ShareSelling(round) => round,
            ActiveRound::Treasury(round) => round,
        }
    }

    #[must_use]
    pub fn kind(&self) -> RoundKind {
        self.as_round().kind()
    }

    #[must_use]
    pub fn label(&self) -> String {
        self.as_round().label()
    }

    /// Whether this is one of the nested sub-rounds.
    #[must_use]
    pub fn is_sub_round(&self) -> bool {
        matches!(self, ActiveRound::ShareSelling(_) | ActiveRound::Treasury(_))
    }

    #[must_use]
    pub fn as_start(&self) -> Option<&StartRound> {
        match self {
            ActiveRound::Start(round) => Some(round),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_operating(&self) -> Option<&OperatingRound> {
        match self {
            ActiveRound::Operating(round) => Some(round),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CompanyId, PlayerId};

    #[test]
    fn test_from_request() {
        let round = ActiveRound::from_request(&SubRoundRequest::ShareSelling {
            player: PlayerId(1),
            cash_needed: 120,
            blocking_company: Some(CompanyId(0)),
        });
        assert_eq!(round.kind(), RoundKind::ShareSelling);
        assert!(round.is_sub_round());

        let round = ActiveRound::from_request(&SubRoundRequest::TreasuryShares { company: CompanyId(2) });
        assert_eq!(round.kind(), RoundKind::TreasuryShares);
        assert!(round.as_operating().is_none());
    }

    #[test]
    fn test_operating_label() {
        let round = ActiveRound::Operating(OperatingRound::new(2, 1));
        assert_eq!(round.label(), "OR 2.1");
        assert!(!round.is_sub_round());
    }
}
