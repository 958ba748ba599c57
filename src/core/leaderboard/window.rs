// src/core/leaderboard/window.rs

//! Translation between leaderboard ranks and store-native rank offsets.
//!
//! A store addresses a sorted set by ascending index: `0` is the lowest
//! score, `-1` the highest. A leaderboard addresses it by 1-based rank in its
//! own ordering. For an ascending board these agree up to the off-by-one; for
//! a descending board rank 1 is store index `-1`, so the window has to be
//! mirrored onto negative offsets.

use crate::core::Ordering;

/// Store range `[start, end]` (inclusive, ascending indexes) covering ranks
/// `rank ..= rank + count - 1` of a leaderboard ranked by `order`.
///
/// Callers guarantee `rank >= 1` and `count >= 1`. Windows that run past
/// either end of the set are clamped by the store.
pub fn rank_window_to_store_range(order: Ordering, rank: i64, count: i64) -> (i64, i64) {
    match order {
        Ordering::Ascending => (rank - 1, (rank - 1).saturating_add(count - 1)),
        Ordering::Descending => ((-rank).saturating_sub(count - 1), -rank),
    }
}

/// Inclusive end offset of a `count`-sized read window starting at `start`.
/// Returns `None` when the window is empty (`count <= 0`).
pub fn list_window_end(start: i64, count: i64) -> Option<i64> {
    let end = start.checked_add(count)?.checked_sub(1)?;
    (end >= start).then_some(end)
}
