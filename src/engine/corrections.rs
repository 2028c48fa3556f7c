//! Cash corrections.
//!
//! A correction changes the game outside the rules: switch the mode on,
//! then move cash between any holder and the bank. Corrections go through
//! the same gate and log as game actions; the active round never sees them.

use crate::core::{
    Action, CashHolder, Command, CorrectionKind, Money, PossibleActionSet, RuleViolation,
};

use super::state::GameState;

/// Add the correction options for `state` to `out`.
pub fn add_options(state: &GameState, out: &mut PossibleActionSet) {
    let player = state.current_player();
    out.add(Action::new(
        player,
        Command::SetCorrectionMode {
            kind: CorrectionKind::Cash,
            enabled: !state.cash_correction,
        },
    ));
    if state.cash_correction {
        out.add(Action::new(
            player,
            Command::CorrectCash { holder: CashHolder::Bank, amount: 0 },
        ));
    }
}

/// Apply a correction command.
pub fn process(state: &mut GameState, action: &Action) -> Result<(), RuleViolation> {
    match &action.command {
        Command::SetCorrectionMode { kind: CorrectionKind::Cash, enabled } => {
            state.cash_correction = *enabled;
            let line = format!(
                "Cash correction {}",
                if *enabled { "enabled" } else { "disabled" }
            );
            state.world.report.add(line);
            Ok(())
        }
        Command::CorrectCash { holder, amount } => correct_cash(state, *holder, *amount),
        _ => Err(RuleViolation::Other(format!(
            "{} is not a correction",
            action.command.name()
        ))),
    }
}

/// Positive amounts come from the bank, negative ones go back to it. A
/// bank-only correction changes the bank's cash directly.
fn correct_cash(state: &mut GameState, holder: CashHolder, amount: Money) -> Result<(), RuleViolation> {
    if !state.cash_correction {
        return Err(RuleViolation::CorrectionInactive);
    }
    let world = &mut state.world;
    if !world.has_holder(holder) {
        return Err(RuleViolation::UnknownHolder {
            holder: format!("{:?}", holder),
        });
    }
    let overflow = || RuleViolation::CashOverflow {
        holder: format!("{:?}", holder),
    };
    let balance = world.cash_after(holder, amount).ok_or_else(overflow)?;
    if balance < 0 {
        return Err(RuleViolation::NegativeBalance {
            holder: world.holder_name(holder),
        });
    }

    match holder {
        CashHolder::Bank => world.bank.cash = balance,
        _ => {
            let to_bank = amount.checked_neg().ok_or_else(overflow)?;
            world.cash_after(CashHolder::Bank, to_bank).ok_or_else(overflow)?;
            if amount >= 0 {
                world.transfer(CashHolder::Bank, holder, amount);
            } else {
                world.transfer(holder, CashHolder::Bank, to_bank);
            }
        }
    }
    let line = format!("Correction: {} cash {:+}", world.holder_name(holder), amount);
    world.report.add(line);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CompanyId, PlayerId};
    use crate::games::sample::SampleGameBuilder;
    use crate::world::World;

    fn state() -> GameState {
        let config = SampleGameBuilder::new().build();
        let names: Vec<_> = ["Ann", "Bob", "Cy"].iter().map(|s| s.to_string()).collect();
        GameState::new(World::new(&config, &names).unwrap())
    }

    fn correct(holder: CashHolder, amount: Money) -> Action {
        Action::new(PlayerId(0), Command::CorrectCash { holder, amount })
    }

    fn enable(enabled: bool) -> Action {
        Action::new(
            PlayerId(0),
            Command::SetCorrectionMode { kind: CorrectionKind::Cash, enabled },
        )
    }

    #[test]
    fn test_correction_needs_mode() {
        let mut s = state();
        let err = process(&mut s, &correct(CashHolder::Player(PlayerId(1)), 50)).unwrap_err();
        assert_eq!(err, RuleViolation::CorrectionInactive);
    }

    #[test]
    fn test_cash_moves_through_bank() {
        let mut s = state();
        let bank = s.world.bank.cash;
        let cash = s.world.players[PlayerId(1)].cash;
        process(&mut s, &enable(true)).unwrap();

        process(&mut s, &correct(CashHolder::Player(PlayerId(1)), 50)).unwrap();
        assert_eq!(s.world.players[PlayerId(1)].cash, cash + 50);
        assert_eq!(s.world.bank.cash, bank - 50);

        process(&mut s, &correct(CashHolder::Player(PlayerId(1)), -80)).unwrap();
        assert_eq!(s.world.players[PlayerId(1)].cash, cash - 30);
        assert_eq!(s.world.bank.cash, bank + 30);

        process(&mut s, &correct(CashHolder::Bank, 100)).unwrap();
        assert_eq!(s.world.bank.cash, bank + 130);
    }

    #[test]
    fn test_negative_balance_refused() {
        let mut s = state();
        process(&mut s, &enable(true)).unwrap();
        let cash = s.world.players[PlayerId(2)].cash;
        let err = process(&mut s, &correct(CashHolder::Player(PlayerId(2)), -(cash + 1))).unwrap_err();
        assert!(matches!(err, RuleViolation::NegativeBalance { .. }));
        assert_eq!(s.world.players[PlayerId(2)].cash, cash);
    }

    #[test]
    fn test_unknown_holder_refused() {
        let mut s = state();
        process(&mut s, &enable(true)).unwrap();
        let before = s.world.clone();

        let err = process(&mut s, &correct(CashHolder::Player(PlayerId(9)), 10)).unwrap_err();
        assert!(matches!(err, RuleViolation::UnknownHolder { .. }));
        let err = process(&mut s, &correct(CashHolder::Company(CompanyId(99)), 10)).unwrap_err();
        assert!(matches!(err, RuleViolation::UnknownHolder { .. }));
        assert_eq!(s.world, before);
    }

    #[test]
    fn test_amounts_outside_money_range_refused() {
        let mut s = state();
        process(&mut s, &enable(true)).unwrap();
        let before = s.world.clone();

        let err = process(&mut s, &correct(CashHolder::Player(PlayerId(0)), Money::MAX)).unwrap_err();
        assert!(matches!(err, RuleViolation::CashOverflow { .. }));
        let err = process(&mut s, &correct(CashHolder::Bank, Money::MAX)).unwrap_err();
        assert!(matches!(err, RuleViolation::CashOverflow { .. }));
        let err = process(&mut s, &correct(CashHolder::Player(PlayerId(0)), Money::MIN)).unwrap_err();
        assert!(matches!(err, RuleViolation::NegativeBalance { .. }));
        assert_eq!(s.world, before);
    }

    #[test]
    fn test_options_follow_mode() {
        let mut s = state();
        let mut options = PossibleActionSet::new();
        add_options(&s, &mut options);
        assert_eq!(options.len(), 1);

        process(&mut s, &enable(true)).unwrap();
        let mut options = PossibleActionSet::new();
        add_options(&s, &mut options);
        assert!(options.contains_kind(|c| matches!(c, Command::CorrectCash { .. })));
        assert!(options.contains_kind(|c| matches!(
            c,
            Command::SetCorrectionMode { enabled: false, .. }
        )));
    }
}
