//! Replay, reload and undo.
//!
//! The log is the save format: replaying it must rebuild the game exactly,
//! and a reload must either apply completely or not at all.

use std::sync::Arc;

use proptest::prelude::*;
use rust_18xx::core::{DividendAllocation, LegacyDoneSkip, LoggedAction, ShareSource, TrainSource};
use rust_18xx::games::sample::{self, SampleGameBuilder};
use rust_18xx::persistence::{self, BincodeCodec, JsonCodec};
use rust_18xx::{
    Action, Command, GameConfig, GameError, GameManager, GameSetup, PlayerId, ReplayMismatch, RoundKind,
    StandardVariant,
};

fn config() -> GameConfig {
    SampleGameBuilder::new().without_start_round().build()
}

fn setup() -> GameSetup {
    GameSetup::new(["Ann", "Bob", "Cy"])
}

fn fresh() -> GameManager {
    GameManager::standard(config(), setup()).unwrap()
}

fn act(m: &mut GameManager, command: Command) {
    let player = m.current_player();
    m.process(Action::new(player, command)).unwrap();
}

/// Ten actions of SR 1: Ann builds up PRR while the others pass.
fn ten_actions() -> GameManager {
    let mut m = fresh();
    act(&mut m, Command::StartCompany { company: sample::PRR, par_price: 67 });
    act(&mut m, Command::Done);
    for _ in 0..2 {
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
    assert_eq!(m.log().len(), 10);
    m
}

/// A manager that executed the first `count` entries of `entries`.
fn replayed(entries: &[LoggedAction], count: usize) -> GameManager {
    let mut m = fresh();
    for entry in &entries[..count] {
        let mut action = entry.action.clone();
        action.executed = false;
        m.process(action).unwrap();
    }
    m
}

// =============================================================================
// Reload
// =============================================================================

#[test]
fn test_reload_continues_matching_game() {
    let full = ten_actions();
    let save = full.save_file();
    let mut live = replayed(&save.actions, 6);

    live.reload(&save).unwrap();
    assert_eq!(live.state(), full.state());
    assert_eq!(live.log().to_vec(), full.log().to_vec());
    assert_eq!(live.current_player(), full.current_player());
}

#[test]
fn test_reload_of_shorter_log_fails() {
    let save = ten_actions().save_file();
    let mut live = replayed(&save.actions, 6);
    let before = live.state().clone();

    let mut short = save.clone();
    short.actions.truncate(4);
    assert_eq!(live.reload(&short), Err(ReplayMismatch::TooShort { loaded: 4, executed: 6 }));
    assert_eq!(live.state(), &before);
    assert_eq!(live.log().len(), 6);
}

#[test]
fn test_reload_names_first_divergence() {
    let save = ten_actions().save_file();
    let mut live = replayed(&save.actions, 6);
    let before = live.state().clone();

    let mut other = save.clone();
    other.actions[3].action = Action::new(
        PlayerId(2),
        Command::StartCompany { company: sample::NYC, par_price: 100 },
    );
    assert!(matches!(live.reload(&other), Err(ReplayMismatch::Diverged { index: 3, .. })));
    assert_eq!(live.state(), &before);
}

#[test]
fn test_reload_with_illegal_tail_changes_nothing() {
    let save = ten_actions().save_file();
    let mut live = replayed(&save.actions, 6);
    let before = live.state().clone();
    let log = live.log().to_vec();

    let mut bad = save.clone();
    bad.actions[8].action = Action::done(PlayerId(1));
    assert!(matches!(live.reload(&bad), Err(ReplayMismatch::Rejected { index: 8, .. })));
    assert_eq!(live.state(), &before);
    assert_eq!(live.log().to_vec(), log);
}

#[test]
fn test_reload_clears_history() {
    let save = ten_actions().save_file();
    let mut live = replayed(&save.actions, 6);
    assert!(live.can_undo());
    live.reload(&save).unwrap();
    assert!(!live.can_undo());
}

// =============================================================================
// Files
// =============================================================================

#[test]
fn test_save_and_reload_through_files() {
    let dir = std::env::temp_dir().join("rust_18xx_replay_tests");
    let _ = std::fs::remove_dir_all(&dir);

    let full = ten_actions();
    let binary = dir.join("game.r18x");
    let json = dir.join("game.json");
    full.save(&binary).unwrap();
    full.export(&json).unwrap();

    let from_binary = persistence::read_save(&binary, &BincodeCodec).unwrap();
    let from_json = persistence::read_save(&json, &JsonCodec).unwrap();
    assert_eq!(from_binary, from_json);

    let mut live = fresh();
    let reload = Action::new(live.current_player(), Command::Reload { path: binary.display().to_string() });
    live.process(reload).unwrap();
    assert_eq!(live.state(), full.state());

    let _ = std::fs::remove_dir_all(&dir);
}

// =============================================================================
// Legacy saves
// =============================================================================

fn treasury_config(policy: LegacyDoneSkip) -> GameConfig {
    SampleGameBuilder::new()
        .without_start_round()
        .treasury_trading(true)
        .legacy_done_skip(policy)
        .build()
}

/// Ann floats PRR; it operates in OR 1.1 and OR 2.1. Its second treasury
/// step has nothing to trade and is skipped, leaving SR 3 running.
fn second_treasury_step_skipped(config: GameConfig) -> GameManager {
    let mut m = GameManager::standard(config, setup()).unwrap();
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
    for _ in 0..3 {
        act(&mut m, Command::Pass);
    }

    assert_eq!(m.state().round.label(), "OR 1.1");
    act(&mut m, Command::Skip);
    act(&mut m, Command::Skip);
    act(&mut m, Command::BuyTrain {
        company: sample::PRR,
        train_type: sample::TRAIN_2,
        source: TrainSource::Depot,
        price: 80,
        fixed_price: true,
        president_cash: 0,
    });
    act(&mut m, Command::Done);
    assert!(!m.state().redundant_done_expected);

    assert_eq!(m.state().round.kind(), RoundKind::Stock);
    for _ in 0..3 {
        act(&mut m, Command::Pass);
    }

    assert_eq!(m.state().round.label(), "OR 2.1");
    act(&mut m, Command::Skip);
    act(&mut m, Command::Skip);
    act(&mut m, Command::SetDividend {
        company: sample::PRR,
        revenue: 0,
        allocation: DividendAllocation::Withhold,
    });
    act(&mut m, Command::Done);
    assert_eq!(m.state().round.kind(), RoundKind::Stock);
    assert!(m.state().redundant_done_expected);
    m
}

/// The game above as an old engine logged it: a `Done` for the skipped
/// treasury step, then the first pass of SR 3.
fn legacy_save(format_version: u32) -> (GameManager, rust_18xx::SaveFile) {
    let mut m = second_treasury_step_skipped(treasury_config(LegacyDoneSkip::Never));
    let mut save = m.save_file();
    save.format_version = format_version;
    save.actions.push(LoggedAction::new(Action::done(PlayerId(0)), false, "OR 2.1"));
    let seat = m.current_player();
    save.actions.push(LoggedAction::new(Action::pass(seat), false, "SR 3"));
    act(&mut m, Command::Pass);
    (m, save)
}

#[test]
fn test_old_save_drops_stray_done() {
    let (played, save) = legacy_save(1);
    let config = treasury_config(LegacyDoneSkip::BeforeVersion(2));
    let loaded = GameManager::load(config, Arc::new(StandardVariant), &save).unwrap();

    assert_eq!(loaded.world(), played.world());
    assert_eq!(loaded.log().len(), save.actions.len() - 1);
    assert_eq!(loaded.current_player(), played.current_player());
}

#[test]
fn test_stray_done_rejected_without_legacy_policy() {
    let (_, save) = legacy_save(1);
    let stray = save.actions.len() - 2;

    let strict = treasury_config(LegacyDoneSkip::Never);
    let result = GameManager::load(strict, Arc::new(StandardVariant), &save);
    assert!(matches!(
        result.err(),
        Some(GameError::Replay(ReplayMismatch::Rejected { index, .. })) if index == stray
    ));
}

#[test]
fn test_current_save_keeps_stray_done() {
    let (_, save) = legacy_save(2);
    let config = treasury_config(LegacyDoneSkip::BeforeVersion(2));
    let result = GameManager::load(config, Arc::new(StandardVariant), &save);
    assert!(matches!(result.err(), Some(GameError::Replay(ReplayMismatch::Rejected { .. }))));
}

// =============================================================================
// Undo
// =============================================================================

#[test]
fn test_undo_everything_returns_to_start() {
    let start = fresh();
    let mut m = ten_actions();
    while m.can_undo() {
        m.undo().unwrap();
    }
    assert_eq!(m.state(), start.state());
    assert!(m.log().is_empty());

    for _ in 0..10 {
        m.redo().unwrap();
    }
    assert_eq!(m.state(), ten_actions().state());
}

// =============================================================================
// Determinism
// =============================================================================

/// Play by picking options with `choices`; rejected picks are skipped.
fn random_game(choices: &[usize]) -> GameManager {
    let mut m = GameManager::standard(SampleGameBuilder::new().build(), setup()).unwrap();
    for choice in choices {
        if m.is_game_over() {
            break;
        }
        let options: Vec<_> = m
            .possible_actions()
            .iter()
            .filter(|a| !a.is_meta() && !a.command.is_correction())
            .cloned()
            .collect();
        if options.is_empty() {
            break;
        }
        let _ = m.process(options[choice % options.len()].clone());
    }
    m
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn test_replay_is_deterministic(choices in prop::collection::vec(0usize..64, 0..60)) {
        let played = random_game(&choices);
        let save = played.save_file();

        let first = GameManager::load(SampleGameBuilder::new().build(), Arc::new(StandardVariant), &save).unwrap();
        let second = GameManager::load(SampleGameBuilder::new().build(), Arc::new(StandardVariant), &save).unwrap();

        prop_assert_eq!(first.state(), played.state());
        prop_assert_eq!(first.state(), second.state());
        prop_assert_eq!(first.possible_actions(), second.possible_actions());
        prop_assert_eq!(first.log().to_vec(), save.actions);
    }

    #[test]
    fn test_rejected_actions_change_nothing(choices in prop::collection::vec(0usize..64, 0..30), seat in 0u8..3) {
        let mut m = random_game(&choices);
        let before = m.state().clone();
        let possible = m.possible_actions().clone();
        let log_len = m.log().len();

        let wrong = Action::new(PlayerId(seat), Command::Done);
        if m.process(wrong).is_err() {
            prop_assert_eq!(m.state(), &before);
            prop_assert_eq!(m.possible_actions(), &possible);
            prop_assert_eq!(m.log().len(), log_len);
        }
    }
}
