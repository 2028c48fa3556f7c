//! The legality gate.
//!
//! `PossibleActionSet` is the exhaustive list of actions the engine will
//! accept right now. It is rebuilt from scratch after every committed
//! action and is a pure function of state, so insertion order is kept
//! (rounds add options in a deterministic order) and duplicates are
//! dropped on insert.

use serde::{Deserialize, Serialize};

use super::action::{Action, Command};

/// Ordered, duplicate-free list of options.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PossibleActionSet {
    options: Vec<Action>,
}

impl PossibleActionSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an option unless an identical one is present.
    pub fn add(&mut self, option: Action) {
        if !self.options.contains(&option) {
            self.options.push(option);
        }
    }

    pub fn extend(&mut self, options: impl IntoIterator<Item = Action>) {
        for option in options {
            self.add(option);
        }
    }

    pub fn clear(&mut self) {
        self.options.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.options.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.options.iter()
    }

    /// The first option that admits `chosen`.
    #[must_use]
    pub fn find_option(&self, chosen: &Action) -> Option<&Action> {
        self.options.iter().find(|option| option.equals_as_option(chosen))
    }

    /// Structural membership test used by the legality gate.
    #[must_use]
    pub fn contains_option(&self, chosen: &Action) -> bool {
        self.find_option(chosen).is_some()
    }

    /// Whether any option has a command of this kind.
    #[must_use]
    pub fn contains_kind(&self, matches: impl Fn(&Command) -> bool) -> bool {
        self.options.iter().any(|option| matches(&option.command))
    }

    /// The lone option when it is a Pass; the engine executes it unasked.
    #[must_use]
    pub fn single_pass(&self) -> Option<&Action> {
        match self.options.as_slice() {
            [only] if only.is_pass() => Some(only),
            _ => None,
        }
    }
}

impl<'a> IntoIterator for &'a PossibleActionSet {
    type Item = &'a Action;
    type IntoIter = std::slice::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.options.iter()
    }
}
