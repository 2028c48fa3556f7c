//! The game manager: the single entry point for play.
//!
//! ## Processing
//!
//! `process` gates every action on the current player and on membership in
//! the possible-action set. Meta actions (undo, redo, save, reload, export)
//! act on the log and change stack; everything else goes to the active round
//! or the correction manager. A rejected action leaves state, log and
//! possible actions exactly as they were.
//!
//! After a committed action the manager executes lone passes on its own,
//! recomputes the possible actions and closes one change-set covering the
//! action and its automatic passes.

use std::path::Path;
use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::core::{
    Action, ActionLog, Command, GameConfig, LoggedAction, PlayerId, PossibleActionSet,
    RejectedAction, ReplayMismatch, Result, RuleViolation,
};
use crate::persistence::{self, BincodeCodec, GameSetup, JsonCodec, SaveFile};
use crate::rounds::RoundContext;
use crate::world::{GameReport, World};

use super::change_stack::{ChangeSet, ChangeStack};
use super::corrections;
use super::replay::{self, ReplayCompat};
use super::state::GameState;
use super::variant::{GameResult, GameVariant, StandardVariant};

/// Upper bound on automatic passes after one action.
const AUTO_PASS_LIMIT: usize = 256;

#[derive(Clone, Debug)]
pub struct GameManager {
    config: Arc<GameConfig>,
    variant: Arc<dyn GameVariant>,
    setup: GameSetup,
    state: GameState,
    log: ActionLog,
    possible: PossibleActionSet,
    changes: ChangeStack,
    replaying: bool,
}

impl GameManager {
    /// Set up a game and begin its first round.
    pub fn new(config: GameConfig, variant: Arc<dyn GameVariant>, setup: GameSetup) -> Result<Self> {
        config.validate()?;
        let world = World::new(&config, &setup.seat_order())?;
        let mut manager = Self {
            config: Arc::new(config),
            variant,
            setup,
            state: GameState::new(world),
            log: ActionLog::new(),
            possible: PossibleActionSet::new(),
            changes: ChangeStack::new(),
            replaying: false,
        };

        let config = Arc::clone(&manager.config);
        let variant = Arc::clone(&manager.variant);
        let ctx = RoundContext {
            config: &config,
            variant: variant.as_ref(),
            replaying: false,
        };
        manager.state.start(&ctx)?;
        manager.auto_pass()?;
        manager.refresh_possible();
        info!("{} started with {} players", manager.config.name, manager.setup.player_names.len());
        Ok(manager)
    }

    /// A game with the standard rules.
    pub fn standard(config: GameConfig, setup: GameSetup) -> Result<Self> {
        Self::new(config, Arc::new(StandardVariant), setup)
    }

    /// Rebuild a game from a save file.
    pub fn load(config: GameConfig, variant: Arc<dyn GameVariant>, save: &SaveFile) -> Result<Self> {
        let mut manager = Self::new(config, variant, save.setup.clone())?;
        manager.reload(save)?;
        Ok(manager)
    }

    // === Queries ===

    #[must_use]
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    #[must_use]
    pub fn setup(&self) -> &GameSetup {
        &self.setup
    }

    #[must_use]
    pub fn state(&self) -> &GameState {
        &self.state
    }

    #[must_use]
    pub fn world(&self) -> &World {
        &self.state.world
    }

    #[must_use]
    pub fn log(&self) -> &ActionLog {
        &self.log
    }

    #[must_use]
    pub fn current_player(&self) -> PlayerId {
        self.state.current_player()
    }

    /// Everything the engine will accept right now.
    #[must_use]
    pub fn possible_actions(&self) -> &PossibleActionSet {
        &self.possible
    }

    #[must_use]
    pub fn is_game_over(&self) -> bool {
        self.state.game_over
    }

    #[must_use]
    pub fn game_report(&self) -> &GameReport {
        &self.state.world.report
    }

    /// Final ranking once the game is over.
    #[must_use]
    pub fn result(&self) -> Option<GameResult> {
        self.state.game_over.then(|| self.variant.game_result(&self.state.world))
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.changes.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.changes.can_redo()
    }

    pub(crate) fn redundant_done_expected(&self) -> bool {
        self.state.redundant_done_expected
    }

    /// The log as a save file.
    #[must_use]
    pub fn save_file(&self) -> SaveFile {
        SaveFile::new(self.config.name.clone(), self.setup.clone(), self.log.to_vec())
    }

    // === Processing ===

    /// Gate and apply one action.
    pub fn process(&mut self, action: Action) -> Result<()> {
        debug!("process {}", action);
        if let Err(rejected) = self.check_gate(&action) {
            warn!("rejected {}: {}", action, rejected);
            return Err(rejected.into());
        }
        if action.is_meta() {
            return self.process_meta(&action.command);
        }

        let before = self.state.clone();
        let log_len = self.log.len();
        if let Err(violation) = self.execute(action.clone(), false).and_then(|()| self.auto_pass()) {
            warn!("rejected {}: {}", action, violation);
            self.state = before;
            self.log.truncate(log_len);
            return Err(RejectedAction::Rule(violation).into());
        }

        self.refresh_possible();
        let entries = self.log.iter().skip(log_len).cloned().collect();
        self.changes.commit(ChangeSet {
            before,
            after: self.state.clone(),
            entries,
        });
        Ok(())
    }

    fn check_gate(&self, action: &Action) -> std::result::Result<(), RejectedAction> {
        if action.is_meta() {
            let offered = self.possible.iter().any(|option| option.command.admits(&action.command));
            return if offered {
                Ok(())
            } else {
                Err(RejectedAction::NotPossible { action: action.to_string() })
            };
        }
        if self.state.game_over {
            return Err(RejectedAction::GameOver);
        }
        let expected = self.current_player();
        if action.player != expected {
            return Err(RejectedAction::WrongPlayer { expected, actual: action.player });
        }
        if !self.possible.contains_option(action) {
            return Err(RejectedAction::NotPossible { action: action.to_string() });
        }
        Ok(())
    }

    /// Apply an action to the state and log it.
    fn execute(&mut self, mut action: Action, automatic: bool) -> std::result::Result<(), RuleViolation> {
        let round = self.state.round.label();
        let ctx = RoundContext {
            config: &self.config,
            variant: self.variant.as_ref(),
            replaying: self.replaying,
        };
        self.state.apply(&ctx, &action)?;
        action.executed = true;
        self.log.push(LoggedAction::new(action, automatic, round));
        Ok(())
    }

    fn round_options(&self) -> PossibleActionSet {
        let ctx = RoundContext {
            config: &self.config,
            variant: self.variant.as_ref(),
            replaying: self.replaying,
        };
        let mut options = PossibleActionSet::new();
        self.state.round_options(&ctx, &mut options);
        options
    }

    /// Execute lone passes until a real decision is due.
    fn auto_pass(&mut self) -> std::result::Result<(), RuleViolation> {
        for _ in 0..AUTO_PASS_LIMIT {
            let Some(pass) = self.round_options().single_pass().cloned() else {
                return Ok(());
            };
            debug!("automatic {}", pass);
            self.execute(pass, true)?;
        }
        error!("automatic passes did not settle after {} actions", AUTO_PASS_LIMIT);
        Ok(())
    }

    /// Rebuild the possible actions: round options, corrections, meta.
    fn refresh_possible(&mut self) {
        let mut possible = self.round_options();
        let player = self.current_player();
        if !self.state.game_over {
            corrections::add_options(&self.state, &mut possible);
        }
        if self.changes.can_undo() {
            possible.add(Action::new(player, Command::Undo));
        }
        if self.changes.can_redo() {
            possible.add(Action::new(player, Command::Redo));
        }
        possible.add(Action::new(player, Command::Save { path: String::new() }));
        possible.add(Action::new(player, Command::Reload { path: String::new() }));
        possible.add(Action::new(player, Command::Export { path: String::new() }));
        self.possible = possible;
    }

    // === Meta actions ===

    fn process_meta(&mut self, command: &Command) -> Result<()> {
        match command {
            Command::Undo => self.undo(),
            Command::Redo => self.redo(),
            Command::Save { path } => self.save(Path::new(path)),
            Command::Export { path } => self.export(Path::new(path)),
            Command::Reload { path } => self.reload_path(Path::new(path)),
            other => {
                error!("{} routed as a meta action", other.name());
                Err(RejectedAction::NotPossible { action: other.name().to_string() }.into())
            }
        }
    }

    /// Roll back the last committed action and its automatic passes.
    pub fn undo(&mut self) -> Result<()> {
        let Some(set) = self.changes.undo() else {
            return Err(RejectedAction::NotPossible { action: "Undo".to_string() }.into());
        };
        self.state = set.before.clone();
        self.log.truncate(self.log.len().saturating_sub(set.entries.len()));
        info!("undo to {} actions", self.log.len());
        self.refresh_possible();
        Ok(())
    }

    pub fn redo(&mut self) -> Result<()> {
        let Some(set) = self.changes.redo() else {
            return Err(RejectedAction::NotPossible { action: "Redo".to_string() }.into());
        };
        self.state = set.after.clone();
        for entry in &set.entries {
            self.log.push(entry.clone());
        }
        info!("redo to {} actions", self.log.len());
        self.refresh_possible();
        Ok(())
    }

    /// Write a binary save file.
    pub fn save(&self, path: &Path) -> Result<()> {
        persistence::write_save(path, &self.save_file(), &BincodeCodec)?;
        Ok(())
    }

    /// Write a JSON export.
    pub fn export(&self, path: &Path) -> Result<()> {
        persistence::write_save(path, &self.save_file(), &JsonCodec)?;
        Ok(())
    }

    fn reload_path(&mut self, path: &Path) -> Result<()> {
        let save = persistence::read_save(path, persistence::codec_for_path(path).as_ref())?;
        self.reload(&save)?;
        Ok(())
    }

    /// Continue this game with the actions of `save` it has not executed.
    ///
    /// Nothing changes unless the whole file replays.
    pub fn reload(&mut self, save: &SaveFile) -> std::result::Result<(), ReplayMismatch> {
        let executed = self.log.len();
        replay::check_prefix(&self.log.to_vec(), &save.actions)?;
        if save.game != self.config.name || save.setup != self.setup {
            warn!("reload refused: save file is for another game");
            return Err(ReplayMismatch::SetupMismatch);
        }

        let compat = ReplayCompat::new(self.config.legacy_done_skip, save.format_version);
        let mut replica = self.clone();
        replica.replaying = true;
        replay::replay_entries(&mut replica, &save.actions[executed..], executed, compat)?;
        replica.replaying = false;
        replica.changes.clear();
        replica.refresh_possible();

        info!("reloaded {} actions ({} new)", replica.log.len(), replica.log.len() - executed);
        *self = replica;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GameError;
    use crate::games::sample::SampleGameBuilder;
    use crate::rounds::RoundKind;

    fn manager() -> GameManager {
        let config = SampleGameBuilder::new().without_start_round().build();
        GameManager::standard(config, GameSetup::new(["Ann", "Bob", "Cy"])).unwrap()
    }

    fn pass(manager: &mut GameManager) {
        let player = manager.current_player();
        manager.process(Action::pass(player)).unwrap();
    }

    #[test]
    fn test_wrong_player_is_rejected() {
        let mut m = manager();
        let before = m.state().clone();
        let possible = m.possible_actions().clone();

        let err = m.process(Action::pass(PlayerId(1))).unwrap_err();
        assert!(matches!(
            err,
            GameError::Rejected(RejectedAction::WrongPlayer { expected: PlayerId(0), .. })
        ));
        assert_eq!(m.state(), &before);
        assert_eq!(m.possible_actions(), &possible);
        assert!(m.log().is_empty());
    }

    #[test]
    fn test_action_outside_set_is_rejected() {
        let mut m = manager();
        let err = m.process(Action::done(PlayerId(0))).unwrap_err();
        assert!(matches!(err, GameError::Rejected(RejectedAction::NotPossible { .. })));
        assert!(m.log().is_empty());
    }

    #[test]
    fn test_committed_action_is_logged_as_executed() {
        let mut m = manager();
        pass(&mut m);
        let entry = m.log().get(0).unwrap();
        assert!(entry.action.executed);
        assert!(!entry.automatic);
        assert_eq!(entry.round, "SR 1");
        assert_eq!(m.current_player(), PlayerId(1));
        assert!(m.possible_actions().contains_kind(|c| matches!(c, Command::Undo)));
    }

    #[test]
    fn test_undo_and_redo() {
        let mut m = manager();
        pass(&mut m);
        let after_one = m.state().clone();
        pass(&mut m);

        m.process(Action::new(m.current_player(), Command::Undo)).unwrap();
        assert_eq!(m.state(), &after_one);
        assert_eq!(m.log().len(), 1);
        assert!(m.can_redo());

        m.redo().unwrap();
        assert_eq!(m.log().len(), 2);
        assert_eq!(m.current_player(), PlayerId(2));

        m.undo().unwrap();
        pass(&mut m);
        assert!(!m.can_redo());
    }

    #[test]
    fn test_all_pass_moves_to_next_stock_round() {
        let mut m = manager();
        for _ in 0..3 {
            pass(&mut m);
        }
        assert_eq!(m.state().round.kind(), RoundKind::Stock);
        assert_eq!(m.state().progress.stock_rounds, 2);
        assert_eq!(m.state().progress.operating_sets, 1);
    }

    #[test]
    fn test_meta_options_are_present() {
        let m = manager();
        let possible = m.possible_actions();
        assert!(possible.contains_kind(|c| matches!(c, Command::Save { .. })));
        assert!(possible.contains_kind(|c| matches!(c, Command::Export { .. })));
        assert!(!possible.contains_kind(|c| matches!(c, Command::Undo)));
    }

    #[test]
    fn test_correction_is_logged_and_undoable() {
        let mut m = manager();
        let cash = m.world().players[PlayerId(2)].cash;
        let player = m.current_player();
        m.process(Action::new(
            player,
            Command::SetCorrectionMode { kind: crate::core::CorrectionKind::Cash, enabled: true },
        ))
        .unwrap();
        m.process(Action::new(
            player,
            Command::CorrectCash { holder: crate::core::CashHolder::Player(PlayerId(2)), amount: 25 },
        ))
        .unwrap();
        assert_eq!(m.world().players[PlayerId(2)].cash, cash + 25);
        assert_eq!(m.log().len(), 2);

        m.undo().unwrap();
        assert_eq!(m.world().players[PlayerId(2)].cash, cash);
    }

    #[test]
    fn test_correction_for_unknown_seat_is_rejected() {
        let mut m = manager();
        let player = m.current_player();
        m.process(Action::new(
            player,
            Command::SetCorrectionMode { kind: crate::core::CorrectionKind::Cash, enabled: true },
        ))
        .unwrap();
        let before = m.state().clone();

        let stranger = Action::new(
            player,
            Command::CorrectCash { holder: crate::core::CashHolder::Player(PlayerId(9)), amount: 10 },
        );
        let err = m.process(stranger).unwrap_err();
        assert!(matches!(
            err,
            GameError::Rejected(RejectedAction::Rule(RuleViolation::UnknownHolder { .. }))
        ));
        assert_eq!(m.state(), &before);
        assert_eq!(m.log().len(), 1);
    }

    #[test]
    fn test_save_file_round_trip_through_load() {
        let mut m = manager();
        pass(&mut m);
        pass(&mut m);
        let save = m.save_file();

        let config = SampleGameBuilder::new().without_start_round().build();
        let loaded = GameManager::load(config, Arc::new(StandardVariant), &save).unwrap();
        assert_eq!(loaded.state(), m.state());
        assert_eq!(loaded.log().to_vec(), m.log().to_vec());
        assert!(!loaded.can_undo());
    }

    #[test]
    fn test_reload_refuses_other_setup() {
        let mut m = manager();
        let mut save = m.save_file();
        save.setup = GameSetup::new(["Ann", "Bob", "Dee"]);
        assert_eq!(m.reload(&save), Err(ReplayMismatch::SetupMismatch));
    }
}
