//! Stock round scenarios driven through the game manager.

use rust_18xx::core::{Command, GameError, RejectedAction, ShareSource};
use rust_18xx::games::sample::{self, SampleGameBuilder};
use rust_18xx::{Action, GameManager, GameSetup, PlayerId, RoundKind};

fn game(players: &[&str]) -> GameManager {
    let config = SampleGameBuilder::new().without_start_round().build();
    GameManager::standard(config, GameSetup::new(players.iter().copied())).unwrap()
}

fn act(m: &mut GameManager, command: Command) {
    let player = m.current_player();
    m.process(Action::new(player, command)).unwrap();
}

// =============================================================================
// All pass
// =============================================================================

#[test]
fn test_four_players_all_pass() {
    let mut m = game(&["Ann", "Bob", "Cy", "Dee"]);
    assert_eq!(m.state().round.label(), "SR 1");

    for seat in 0..3 {
        assert_eq!(m.current_player(), PlayerId(seat));
        act(&mut m, Command::Pass);
        assert_eq!(m.state().round.kind(), RoundKind::Stock);
        assert_eq!(m.state().progress.stock_rounds, 1);
    }
    act(&mut m, Command::Pass);

    // No company operates, so the operating round is over at once.
    assert_eq!(m.state().progress.operating_sets, 1);
    assert_eq!(m.state().round.label(), "SR 2");
    assert!(m.game_report().lines().any(|line| line == "SR 1 ends"));
    assert_eq!(m.log().len(), 4);
}

#[test]
fn test_action_resets_pass_count() {
    let mut m = game(&["Ann", "Bob", "Cy", "Dee"]);
    act(&mut m, Command::Pass);
    act(&mut m, Command::Pass);
    act(&mut m, Command::StartCompany { company: sample::NYC, par_price: 100 });
    act(&mut m, Command::Done);

    for _ in 0..3 {
        act(&mut m, Command::Pass);
        assert_eq!(m.state().round.label(), "SR 1");
    }
    act(&mut m, Command::Pass);
    assert_eq!(m.state().progress.stock_rounds, 2);
}

// =============================================================================
// Legality
// =============================================================================

#[test]
fn test_done_without_action_is_rejected() {
    let mut m = game(&["Ann", "Bob", "Cy"]);
    let before = m.state().clone();

    let err = m.process(Action::done(PlayerId(0))).unwrap_err();
    assert!(matches!(err, GameError::Rejected(RejectedAction::NotPossible { .. })));
    assert_eq!(m.state(), &before);
    assert!(m.log().is_empty());
}

#[test]
fn test_one_certificate_per_turn() {
    let mut m = game(&["Ann", "Bob", "Cy"]);
    act(&mut m, Command::StartCompany { company: sample::PRR, par_price: 100 });

    let buy = Action::new(
        PlayerId(0),
        Command::BuyCertificate { company: sample::PRR, source: ShareSource::Ipo, units: 1, price: 100 },
    );
    assert!(!m.possible_actions().contains_option(&buy));
    assert!(m.process(buy).is_err());
    assert!(m.possible_actions().contains_option(&Action::done(PlayerId(0))));
}

#[test]
fn test_company_floats_and_operates() {
    let mut m = game(&["Ann", "Bob", "Cy"]);
    act(&mut m, Command::StartCompany { company: sample::PRR, par_price: 67 });
    act(&mut m, Command::Done);
    for _ in 0..4 {
        act(&mut m, Command::Pass);
        act(&mut m, Command::Pass);
        act(&mut m, Command::BuyCertificate {
            company: sample::PRR,
            source: ShareSource::Ipo,
            units: 1,
            price: 67,
        });
        act(&mut m, Command::Done);
    }
    let prr = m.world().company(sample::PRR);
    assert!(prr.floated);
    assert_eq!(prr.cash, 670);
    assert_eq!(prr.units_of(PlayerId(0)), 6);

    act(&mut m, Command::Pass);
    act(&mut m, Command::Pass);
    act(&mut m, Command::Pass);

    let or = m.state().round.as_operating().expect("operating round");
    assert_eq!(or.operating_company(), Some(sample::PRR));
    assert_eq!(m.current_player(), PlayerId(0));
    // Priority goes to the seat after the last buyer.
    assert_eq!(m.world().priority_player, PlayerId(1));
}
