//! Train depot and game phases.
//!
//! Train types are tiers in configuration order. Only the lowest tier with
//! stock left is on sale from the depot. The first purchase of a type may
//! start a phase and rust older types; both are reported back to the
//! caller as a `TrainPurchase` so it can apply the consequences.

use std::sync::Arc;

use im::Vector;
use smallvec::SmallVec;

use crate::core::{Money, PhaseConfig, TrainTypeConfig, TrainTypeId};

/// Consequences of buying a train from the depot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrainPurchase {
    /// Phase started by this purchase.
    pub new_phase: Option<usize>,

    /// Types removed from play by this purchase.
    pub rusted: SmallVec<[TrainTypeId; 2]>,
}

/// Trains held by the bank.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainDepot {
    types: Arc<Vec<TrainTypeConfig>>,
    remaining: Vector<u8>,
    first_sold: Vector<bool>,
    rusted: Vector<bool>,

    /// Trains discarded or sold to the bank pool.
    pub pool: Vector<TrainTypeId>,
}

impl TrainDepot {
    pub fn new(types: Arc<Vec<TrainTypeConfig>>) -> Self {
        Self {
            remaining: types.iter().map(|t| t.quantity).collect(),
            first_sold: types.iter().map(|_| false).collect(),
            rusted: types.iter().map(|_| false).collect(),
            pool: Vector::new(),
            types,
        }
    }

    #[must_use]
    pub fn train_type(&self, id: TrainTypeId) -> Option<&TrainTypeConfig> {
        self.types.get(id.index())
    }

    #[must_use]
    pub fn cost(&self, id: TrainTypeId) -> Money {
        self.train_type(id).map_or(0, |t| t.cost)
    }

    #[must_use]
    pub fn name(&self, id: TrainTypeId) -> &str {
        self.train_type(id).map_or("?", |t| t.name.as_str())
    }

    /// The type currently on sale from the depot.
    #[must_use]
    pub fn current_type(&self) -> Option<TrainTypeId> {
        self.remaining
            .iter()
            .position(|left| *left > 0)
            .map(|index| TrainTypeId(index as u16))
    }

    #[must_use]
    pub fn remaining(&self, id: TrainTypeId) -> u8 {
        self.remaining.get(id.index()).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn is_rusted(&self, id: TrainTypeId) -> bool {
        self.rusted.get(id.index()).copied().unwrap_or(false)
    }

    /// Distinct types in the pool, lowest tier first.
    #[must_use]
    pub fn pool_types(&self) -> Vec<TrainTypeId> {
        let mut types: Vec<_> = self.pool.iter().copied().collect();
        types.sort();
        types.dedup();
        types
    }

    /// Take the current type from the depot.
    ///
    /// The caller has checked that `id` is on sale.
    pub fn buy_from_depot(&mut self, id: TrainTypeId) -> TrainPurchase {
        let mut purchase = TrainPurchase::default();
        if let Some(left) = self.remaining.get_mut(id.index()) {
            *left = left.saturating_sub(1);
        }

        let first = self.first_sold.get(id.index()).is_some_and(|sold| !*sold);
        if first {
            self.first_sold.set(id.index(), true);
            purchase.new_phase = self.train_type(id).and_then(|t| t.starts_phase);

            for (index, train) in self.types.iter().enumerate() {
                if train.rusted_by == Some(id) && !self.rusted[index] {
                    self.rusted.set(index, true);
                    purchase.rusted.push(TrainTypeId(index as u16));
                }
            }
            let rusted = &purchase.rusted;
            self.pool.retain(|t| !rusted.contains(t));
        }
        purchase
    }

    /// Take one train of a type from the pool.
    pub fn buy_from_pool(&mut self, id: TrainTypeId) -> bool {
        match self.pool.iter().position(|t| *t == id) {
            Some(index) => {
                self.pool.remove(index);
                true
            }
            None => false,
        }
    }
}

/// Current game phase.
///
/// Never empty: a validated configuration has at least one phase and the
/// index only ever moves to configured phases.
#[derive(Clone, Debug, PartialEq)]
pub struct PhaseManager {
    phases: Arc<Vec<PhaseConfig>>,
    current: usize,
}

impl PhaseManager {
    pub fn new(phases: Arc<Vec<PhaseConfig>>) -> Self {
        Self { phases, current: 0 }
    }

    #[must_use]
    pub fn current(&self) -> &PhaseConfig {
        &self.phases[self.current.min(self.phases.len().saturating_sub(1))]
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.current
    }

    /// Move to a later phase; false if `phase` is not ahead of the current one.
    pub fn advance_to(&mut self, phase: usize) -> bool {
        if phase > self.current && phase < self.phases.len() {
            self.current = phase;
            true
        } else {
            false
        }
    }
}
