//! The engine: game state, the manager and its collaborators.
//!
//! - `state`: world, active round, dormant rounds and round transitions
//! - `manager`: legality gate, auto-pass, meta actions
//! - `change_stack`: undo and redo
//! - `replay`: reload by replay and the legacy log adapter
//! - `corrections`: cash corrections
//! - `variant`: per-title hooks

pub mod change_stack;
pub mod corrections;
pub mod manager;
pub mod replay;
pub mod state;
pub mod variant;

pub use change_stack::{ChangeSet, ChangeStack};
pub use manager::GameManager;
pub use replay::ReplayCompat;
pub use state::{DormantRound, EndReason, GameState, Progress};
pub use variant::{GameResult, GameVariant, StandardVariant};
