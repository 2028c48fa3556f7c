//! Undo and redo.
//!
//! One closed change-set per committed action. A change-set keeps the game
//! state before and after the action plus the log entries it added (the
//! action itself and any automatic passes that followed it). Snapshots are
//! plain clones of `GameState`, which shares structure through `im`.

use crate::core::LoggedAction;

use super::state::GameState;

#[derive(Clone, Debug)]
pub struct ChangeSet {
    pub before: GameState,
    pub after: GameState,

    /// Log entries appended by this change-set, in order.
    pub entries: Vec<LoggedAction>,
}

/// Committed change-sets with a cursor; sets past the cursor can be redone.
#[derive(Clone, Debug, Default)]
pub struct ChangeStack {
    sets: Vec<ChangeSet>,
    cursor: usize,
}

impl ChangeStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Close a change-set. The redo tail is discarded.
    pub fn commit(&mut self, set: ChangeSet) {
        self.sets.truncate(self.cursor);
        self.sets.push(set);
        self.cursor = self.sets.len();
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.cursor < self.sets.len()
    }

    /// Step back over the last committed set and return it.
    pub fn undo(&mut self) -> Option<&ChangeSet> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        self.sets.get(self.cursor)
    }

    /// Step forward over the next undone set and return it.
    pub fn redo(&mut self) -> Option<&ChangeSet> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        self.sets.get(self.cursor - 1)
    }

    /// Forget all history, e.g. after a reload.
    pub fn clear(&mut self) {
        self.sets.clear();
        self.cursor = 0;
    }

    /// Number of sets that can be undone.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.cursor
    }
}
