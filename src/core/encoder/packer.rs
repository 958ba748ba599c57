// src/core/encoder/packer.rs

//! The bit-packing arithmetic shared by every tie-break strategy.

/// Number of low bits reserved for the tie-break factor.
pub const FACTOR_BITS: u32 = 31;

/// Mask selecting the factor field of an encoded score.
pub const FACTOR_MASK: i64 = (1 << FACTOR_BITS) - 1;

/// The largest integer an IEEE-754 double holds exactly (`2^53 - 1`).
pub const MAX_SAFE_INTEGER: i64 = (1 << 53) - 1;

/// The largest primary value callers should encode with arbitrary factors.
///
/// `MAX_SAFE_PRIMARY << 31 | i32::MAX` is `2^52 + 2^31 - 1`, well below
/// `MAX_SAFE_INTEGER`.
pub const MAX_SAFE_PRIMARY: i32 = 1 << 21;

/// Packs a 31-bit primary value and a 31-bit factor into one `i64`.
///
/// Non-positive primaries encode to `0`, the unranked sentinel. Negative
/// factors are clamped to `0` so they cannot sign-extend into the primary
/// field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreI32;

impl ScoreI32 {
    pub const fn new() -> Self {
        ScoreI32
    }

    pub const fn pack(&self, primary: i32, factor: i32) -> i64 {
        if primary <= 0 {
            return 0;
        }
        let factor = if factor < 0 { 0 } else { factor as i64 };
        ((primary as i64) << FACTOR_BITS) | (factor & FACTOR_MASK)
    }

    /// Recovers the primary value of a packed score.
    ///
    /// Values inside the `i32` range are returned unchanged, which covers the
    /// `0` sentinel and scores written without an encoder.
    pub const fn unpack(&self, score: i64) -> i32 {
        if score >= i32::MIN as i64 && score <= i32::MAX as i64 {
            return score as i32;
        }
        let primary = score >> FACTOR_BITS;
        if primary < 0 {
            0
        } else if primary > i32::MAX as i64 {
            i32::MAX
        } else {
            primary as i32
        }
    }
}

/// True when `score` survives a round trip through an `f64` unchanged.
pub const fn is_precision_safe(score: i64) -> bool {
    score >= -MAX_SAFE_INTEGER && score <= MAX_SAFE_INTEGER
}
