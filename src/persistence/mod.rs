//! Save files.
//!
//! A save file is the game setup plus the action log; loading replays the
//! log. The byte format is a codec concern:
//!
//! - `BincodeCodec`: compact binary saves, `R18X` magic and a version header
//! - `JsonCodec`: human-readable exports
//!
//! Files are written with the write-rename pattern so a failed save never
//! corrupts the previous one.

mod codec;

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::{GameRng, LoggedAction, PersistenceError};

pub use codec::{ActionLogCodec, BincodeCodec, JsonCodec};

/// Current save format.
///
/// Version 1 logs may carry a `Done` after a treasury step that is now
/// skipped; see `LegacyDoneSkip`.
pub const SAVE_FORMAT_VERSION: u32 = 2;

/// Who plays, and how seats are assigned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSetup {
    pub player_names: Vec<String>,
    pub seed: u64,

    /// Shuffle seats with the seed instead of keeping the given order.
    pub randomize_order: bool,
}

impl GameSetup {
    pub fn new<S: Into<String>>(player_names: impl IntoIterator<Item = S>) -> Self {
        Self {
            player_names: player_names.into_iter().map(Into::into).collect(),
            seed: 0,
            randomize_order: false,
        }
    }

    /// Shuffle seats deterministically from `seed`.
    #[must_use]
    pub fn randomized(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.randomize_order = true;
        self
    }

    /// Player names in seat order.
    #[must_use]
    pub fn seat_order(&self) -> Vec<String> {
        if self.randomize_order {
            GameRng::new(self.seed).seat_order(&self.player_names)
        } else {
            self.player_names.clone()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveFile {
    pub format_version: u32,

    /// Name of the ruleset the game was played with.
    pub game: String,
    pub setup: GameSetup,
    pub actions: Vec<LoggedAction>,
}

impl SaveFile {
    pub fn new(game: impl Into<String>, setup: GameSetup, actions: Vec<LoggedAction>) -> Self {
        Self {
            format_version: SAVE_FORMAT_VERSION,
            game: game.into(),
            setup,
            actions,
        }
    }
}

/// Pick the codec from the file extension: `.json` exports, anything else
/// is a binary save.
#[must_use]
pub fn codec_for_path(path: &Path) -> Box<dyn ActionLogCodec> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Box::new(JsonCodec),
        _ => Box::new(BincodeCodec),
    }
}

/// Write a save file atomically.
pub fn write_save(path: &Path, save: &SaveFile, codec: &dyn ActionLogCodec) -> Result<(), PersistenceError> {
    let bytes = codec.serialize(save)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = Path::new(&tmp);
    if let Err(err) = write_then_rename(tmp, path, &bytes) {
        let _ = fs::remove_file(tmp);
        log::warn!("save to {} failed: {}", path.display(), err);
        return Err(err.into());
    }
    log::info!("saved {} actions to {}", save.actions.len(), path.display());
    Ok(())
}

fn write_then_rename(tmp: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(tmp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    fs::rename(tmp, path)
}

pub fn read_save(path: &Path, codec: &dyn ActionLogCodec) -> Result<SaveFile, PersistenceError> {
    let bytes = fs::read(path)?;
    codec.deserialize(&bytes)
}
