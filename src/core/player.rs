//! Seats.
//!
//! ## PlayerId
//!
//! A seat in turn order; seat 0 acts first in the first round. Names live
//! in `GameSetup`, the engine only ever sees seats.
//!
//! ## PlayerMap
//!
//! One value per seat (cash, share units, bids), indexable by `PlayerId`.
//! Seats never change during a game, so the map is a plain `Vec`.

use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u8);

impl PlayerId {
    #[must_use]
    pub const fn new(seat: u8) -> Self {
        Self(seat)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// The seat to the left, wrapping round the table.
    ///
    /// ```
    /// use rust_18xx::core::PlayerId;
    ///
    /// assert_eq!(PlayerId(1).next(3), PlayerId(2));
    /// assert_eq!(PlayerId(2).next(3), PlayerId(0));
    /// ```
    #[must_use]
    pub fn next(self, player_count: usize) -> PlayerId {
        PlayerId(((self.index() + 1) % player_count) as u8)
    }

    /// Every seat once, in turn order starting here.
    pub fn order_from(self, player_count: usize) -> impl Iterator<Item = PlayerId> {
        let start = self.index();
        (0..player_count).map(move |offset| PlayerId(((start + offset) % player_count) as u8))
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Player {}", self.0)
    }
}

/// A value for every seat at the table.
///
/// ```
/// use rust_18xx::core::{PlayerId, PlayerMap};
///
/// let mut cash = PlayerMap::with_value(4, 600);
/// cash[PlayerId(1)] -= 90;
/// assert_eq!(cash[PlayerId(1)], 510);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerMap<T> {
    seats: Vec<T>,
}

impl<T> PlayerMap<T> {
    /// Fill every seat from `init`.
    ///
    /// Panics on an empty table or more than 255 seats; `GameConfig`
    /// validation keeps player counts far inside that range.
    pub fn new(player_count: usize, init: impl Fn(PlayerId) -> T) -> Self {
        Self::from_vec((0..player_count).map(|seat| init(PlayerId(seat as u8))).collect())
    }

    pub fn with_value(player_count: usize, value: T) -> Self
    where
        T: Clone,
    {
        Self::from_vec(vec![value; player_count])
    }

    /// One value per seat, in seat order.
    pub fn from_vec(seats: Vec<T>) -> Self {
        assert!(!seats.is_empty(), "a game needs at least one seat");
        assert!(seats.len() <= usize::from(u8::MAX), "too many seats");
        Self { seats }
    }

    #[must_use]
    pub fn player_count(&self) -> usize {
        self.seats.len()
    }

    pub fn player_ids(&self) -> impl Iterator<Item = PlayerId> {
        (0..self.seats.len()).map(|seat| PlayerId(seat as u8))
    }

    /// Seats with their values, in seat order.
    pub fn iter(&self) -> impl Iterator<Item = (PlayerId, &T)> {
        self.player_ids().zip(self.seats.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (PlayerId, &mut T)> {
        (0..self.seats.len())
            .map(|seat| PlayerId(seat as u8))
            .zip(self.seats.iter_mut())
    }
}

impl<T> Index<PlayerId> for PlayerMap<T> {
    type Output = T;

    fn index(&self, player: PlayerId) -> &T {
        &self.seats[player.index()]
    }
}

impl<T> IndexMut<PlayerId> for PlayerMap<T> {
    fn index_mut(&mut self, player: PlayerId) -> &mut T {
        &mut self.seats[player.index()]
    }
}
