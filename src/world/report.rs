//! Human-readable game report.
//!
//! Every line is also emitted through the `log` facade at info level, so a
//! host that installs a logger sees the game unfold.

use im::Vector;
use log::info;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GameReport {
    lines: Vector<String>,
}

impl GameReport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, line: impl Into<String>) {
        let line = line.into();
        info!("{}", line);
        self.lines.push_back(line);
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Most recent line.
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.lines.last().map(String::as_str)
    }
}
