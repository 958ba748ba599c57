// src/core/encoder/strategies.rs

//! The two tie-break policies. Both delegate the packing to `ScoreI32`.

use super::ScoreEncoder;
use super::packer::ScoreI32;

/// At equal primary values, the larger factor ranks higher.
///
/// With a timestamp as factor, the most recent submission wins the tie.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LastInIsBigger {
    packer: ScoreI32,
}

impl LastInIsBigger {
    pub const fn new() -> Self {
        Self {
            packer: ScoreI32::new(),
        }
    }
}

impl ScoreEncoder for LastInIsBigger {
    fn encode(&self, primary: i32, factor: i32) -> i64 {
        self.packer.pack(primary, factor)
    }

    fn decode(&self, score: i64) -> i32 {
        self.packer.unpack(score)
    }

    fn name(&self) -> &'static str {
        "last-in-is-bigger"
    }
}

/// At equal primary values, the smaller factor ranks higher.
///
/// The factor is inverted against `i32::MAX` before packing, so the earliest
/// timestamp produces the largest score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FirstInIsBigger {
    packer: ScoreI32,
}

impl FirstInIsBigger {
    pub const fn new() -> Self {
        Self {
            packer: ScoreI32::new(),
        }
    }
}

impl ScoreEncoder for FirstInIsBigger {
    fn encode(&self, primary: i32, factor: i32) -> i64 {
        // i32::MAX - i32::MIN overflows i32; saturate before clamping at zero.
        let inverted = i32::MAX.saturating_sub(factor).max(0);
        self.packer.pack(primary, inverted)
    }

    fn decode(&self, score: i64) -> i32 {
        self.packer.unpack(score)
    }

    fn name(&self) -> &'static str {
        "first-in-is-bigger"
    }
}
