// src/core/encoder/mod.rs

//! Composite score encoding.
//!
//! A leaderboard score is a primary value (the thing players compete on) plus
//! a tie-break factor (usually a timestamp). Sorted-set stores only order by a
//! single `f64`, so both are packed into one integer: the primary in the high
//! bits, the factor in the low 31 bits. Ordering by the packed value is
//! ordering by primary first, then by factor.
//!
//! Encoded values stay exact in a double only while the primary is at most
//! [`MAX_SAFE_PRIMARY`] (for arbitrary factors). The encoder does not check
//! this; see [`is_precision_safe`].

pub mod packer;
pub mod strategies;

pub use packer::{
    FACTOR_BITS, FACTOR_MASK, MAX_SAFE_INTEGER, MAX_SAFE_PRIMARY, ScoreI32, is_precision_safe,
};
pub use strategies::{FirstInIsBigger, LastInIsBigger};

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;

/// A reversible mapping between `(primary, factor)` and a stored score.
pub trait ScoreEncoder: Debug + Send + Sync {
    /// Packs a primary value and a tie-break factor. `primary <= 0` yields `0`.
    fn encode(&self, primary: i32, factor: i32) -> i64;

    /// Recovers the primary value, discarding the factor.
    fn decode(&self, score: i64) -> i32;

    /// Stable identifier used in configuration and logs.
    fn name(&self) -> &'static str;
}

/// Selects a tie-break strategy by name, e.g. from a config file.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EncoderKind {
    LastInIsBigger,
    FirstInIsBigger,
}

impl EncoderKind {
    pub fn encoder(self) -> Arc<dyn ScoreEncoder> {
        match self {
            EncoderKind::LastInIsBigger => Arc::new(LastInIsBigger::new()),
            EncoderKind::FirstInIsBigger => Arc::new(FirstInIsBigger::new()),
        }
    }
}
