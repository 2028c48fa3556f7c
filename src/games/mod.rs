//! Rulesets.
//!
//! - `sample`: a small 1830-like ruleset

pub mod sample;
