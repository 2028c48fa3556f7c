//! Operating round scenarios driven through the game manager.

use rust_18xx::core::{Command, GameError, RejectedAction, TrainSource};
use rust_18xx::games::sample::{self, SampleGameBuilder};
use rust_18xx::{Action, GameManager, GameSetup, OrStep, PlayerId, RoundKind};

fn act(m: &mut GameManager, command: Command) {
    let player = m.current_player();
    m.process(Action::new(player, command)).unwrap();
}

fn step(m: &GameManager) -> Option<OrStep> {
    m.state().round.as_operating().map(|or| or.step())
}

/// Ann starts the minor, which floats at once, and everybody passes.
fn minor_operating() -> GameManager {
    let config = SampleGameBuilder::new().without_start_round().build();
    let mut m = GameManager::standard(config, GameSetup::new(["Ann", "Bob", "Cy"])).unwrap();
    act(&mut m, Command::StartCompany { company: sample::M1, par_price: 100 });
    act(&mut m, Command::Done);
    for _ in 0..3 {
        act(&mut m, Command::Pass);
    }
    m
}

// =============================================================================
// Step sequence
// =============================================================================

#[test]
fn test_minor_turn() {
    let mut m = minor_operating();
    assert_eq!(m.state().round.label(), "OR 1.1");
    assert_eq!(step(&m), Some(OrStep::LayTrack));
    assert_eq!(m.current_player(), PlayerId(0));
    assert_eq!(m.world().company(sample::M1).cash, 100);

    // No free station marker and no train: straight to buying trains.
    act(&mut m, Command::Skip);
    assert_eq!(step(&m), Some(OrStep::BuyTrain));
    assert!(m.possible_actions().contains_option(&Action::done(PlayerId(0))));

    act(&mut m, Command::BuyTrain {
        company: sample::M1,
        train_type: sample::TRAIN_2,
        source: TrainSource::Depot,
        price: 80,
        fixed_price: true,
        president_cash: 0,
    });
    assert_eq!(m.world().company(sample::M1).cash, 20);
    assert_eq!(m.world().company(sample::M1).trains.len(), 1);

    act(&mut m, Command::Done);
    assert_eq!(m.state().round.kind(), RoundKind::Stock);
    assert_eq!(m.state().progress.stock_rounds, 2);
    assert!(m.world().company(sample::M1).has_operated);
}

#[test]
fn test_wrong_step_action_is_rejected() {
    let mut m = minor_operating();
    let before = m.state().clone();
    let log_len = m.log().len();

    let err = m.process(Action::done(PlayerId(0))).unwrap_err();
    assert!(matches!(err, GameError::Rejected(RejectedAction::NotPossible { .. })));
    assert_eq!(m.state(), &before);
    assert_eq!(m.log().len(), log_len);
}

#[test]
fn test_other_player_cannot_operate() {
    let mut m = minor_operating();
    let err = m.process(Action::new(PlayerId(1), Command::Skip)).unwrap_err();
    assert!(matches!(
        err,
        GameError::Rejected(RejectedAction::WrongPlayer { expected: PlayerId(0), actual: PlayerId(1) })
    ));
}

#[test]
fn test_phase_two_runs_one_operating_round() {
    let mut m = minor_operating();
    act(&mut m, Command::Skip);
    act(&mut m, Command::Done);

    assert_eq!(m.state().progress.ors_in_set, 1);
    assert_eq!(m.state().round.label(), "SR 2");
}
