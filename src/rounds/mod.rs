//! Rounds: the state machines that decide what is legal.
//!
//! - `start`: auction of the start packet
//! - `stock`: share trading in player order
//! - `operating`: one step-sequenced turn per company
//! - `share_selling`, `treasury`: sub-rounds entered by interruption
//!
//! All of them implement `Round`; `ActiveRound` holds whichever is current.

pub mod active;
pub mod operating;
pub mod operating_order;
pub mod round;
pub mod share_selling;
pub mod start;
pub mod stock;
pub mod treasury;

pub use active::ActiveRound;
pub use operating::{next_applicable_step, step_skip_reason, OperatingRound, OrStep, SkipReason, StepInputs};
pub use operating_order::{operating_order, reorder_tail};
pub use round::{Interruption, Round, RoundContext, RoundKind, RoundStatus, SubRoundRequest};
pub use share_selling::ShareSellingRound;
pub use start::StartRound;
pub use stock::StockRound;
pub use treasury::TreasuryShareRound;
