//! Reload by replay.
//!
//! ## Algorithm
//!
//! 1. A file with fewer entries than the executed log is refused.
//! 2. Every executed entry must equal its counterpart in the file, compared
//!    with `equals_as_action`; the first difference is reported by index.
//! 3. The file must describe the same game and seats.
//! 4. The remaining entries are fed through the normal gate on a copy of
//!    the manager. Automatic passes are not fed; the engine repeats them.
//!    The live manager is only replaced when every entry was accepted.
//!
//! ## Compatibility
//!
//! Logs written before the treasury step learned to skip itself carry a
//! `Done` that the engine no longer expects. `ReplayCompat` drops exactly
//! that entry, and only when the last action left the redundant flag set.

use log::{debug, info, warn};

use crate::core::{Action, Command, LegacyDoneSkip, LoggedAction, PossibleActionSet, ReplayMismatch};

use super::manager::GameManager;

/// Versioned adapter for logs written by older engines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReplayCompat {
    policy: LegacyDoneSkip,
    file_version: u32,
}

impl ReplayCompat {
    #[must_use]
    pub fn new(policy: LegacyDoneSkip, file_version: u32) -> Self {
        Self { policy, file_version }
    }

    /// Whether redundant `Done` entries may be dropped for this file.
    #[must_use]
    pub fn skips_redundant_done(&self) -> bool {
        match self.policy {
            LegacyDoneSkip::Never => false,
            LegacyDoneSkip::Always => true,
            LegacyDoneSkip::BeforeVersion(version) => self.file_version < version,
        }
    }

    /// Whether `action` is the redundant `Done` to drop.
    #[must_use]
    pub fn skips(&self, redundant_done_expected: bool, action: &Action, possible: &PossibleActionSet) -> bool {
        self.skips_redundant_done()
            && redundant_done_expected
            && matches!(action.command, Command::Done)
            && !possible.contains_option(action)
    }
}

/// Check the file against the executed log.
pub fn check_prefix(executed: &[LoggedAction], loaded: &[LoggedAction]) -> Result<(), ReplayMismatch> {
    if loaded.len() < executed.len() {
        return Err(ReplayMismatch::TooShort {
            loaded: loaded.len(),
            executed: executed.len(),
        });
    }
    for (index, (done, found)) in executed.iter().zip(loaded).enumerate() {
        if !done.action.equals_as_action(&found.action) {
            return Err(ReplayMismatch::Diverged {
                index,
                expected: done.action.to_string(),
                found: found.action.to_string(),
            });
        }
    }
    Ok(())
}

/// Feed `entries`, which start at file index `offset`, through the gate of
/// `manager`.
pub fn replay_entries(
    manager: &mut GameManager,
    entries: &[LoggedAction],
    offset: usize,
    compat: ReplayCompat,
) -> Result<(), ReplayMismatch> {
    let mut skipped = 0;
    for (i, entry) in entries.iter().enumerate() {
        if entry.automatic {
            continue;
        }
        let index = offset + i;
        let mut action = entry.action.clone();
        action.executed = false;

        if compat.skips(manager.redundant_done_expected(), &action, manager.possible_actions()) {
            debug!("skipping redundant {} at {}", action, index);
            skipped += 1;
            continue;
        }
        if let Err(err) = manager.process(action) {
            warn!("replay stopped at action {}: {}", index, err);
            return Err(ReplayMismatch::Rejected {
                index,
                action: entry.action.to_string(),
                reason: err.to_string(),
            });
        }
    }
    info!("replayed {} entries, {} skipped", entries.len(), skipped);
    Ok(())
}
