// src/core/storage/sorted_set.rs

//! The in-memory sorted set used by `MemoryStore`.

use ordered_float::OrderedFloat;
use std::collections::{BTreeSet, HashMap};

/// A member and its score. Entries sort by score, then lexicographically by
/// member, which is the order Redis uses for `ZRANGE`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ZSetEntry {
    pub score: OrderedFloat<f64>,
    pub member: String,
}

impl ZSetEntry {
    pub fn new(score: f64, member: impl Into<String>) -> Self {
        Self {
            score: OrderedFloat(score),
            member: member.into(),
        }
    }
}

/// A `HashMap` for O(1) score lookups plus a `BTreeSet` kept in rank order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortedSet {
    members: HashMap<String, OrderedFloat<f64>>,
    sorted: BTreeSet<ZSetEntry>,
}

impl SortedSet {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Adds or updates a member.
    /// Returns `true` if the member was new or its score changed.
    pub fn add(&mut self, score: f64, member: &str) -> bool {
        let score = OrderedFloat(score);
        if let Some(old_score) = self.members.insert(member.to_string(), score) {
            if old_score == score {
                return false;
            }
            self.sorted.remove(&ZSetEntry {
                score: old_score,
                member: member.to_string(),
            });
        }
        self.sorted.insert(ZSetEntry {
            score,
            member: member.to_string(),
        });
        true
    }

    /// Removes a member. Returns `true` if the member was present.
    pub fn remove(&mut self, member: &str) -> bool {
        match self.members.remove(member) {
            Some(score) => {
                self.sorted.remove(&ZSetEntry {
                    score,
                    member: member.to_string(),
                });
                true
            }
            None => false,
        }
    }

    pub fn get_score(&self, member: &str) -> Option<f64> {
        self.members.get(member).map(|s| s.into_inner())
    }

    pub fn contains_member(&self, member: &str) -> bool {
        self.members.contains_key(member)
    }

    /// 0-based rank, lowest score first.
    ///
    /// Counts the entries below the member, so this is O(n) rather than the
    /// O(log n) of a skiplist-backed `ZRANK`.
    pub fn get_rank(&self, member: &str) -> Option<usize> {
        let score = *self.members.get(member)?;
        let target = ZSetEntry {
            score,
            member: member.to_string(),
        };
        Some(self.sorted.range(..&target).count())
    }

    /// 0-based rank, highest score first.
    pub fn get_rev_rank(&self, member: &str) -> Option<usize> {
        self.get_rank(member).map(|rank| self.len() - 1 - rank)
    }

    /// Entries with rank in `[start, stop]`, lowest score first. Negative
    /// indexes count from the end, as in `ZRANGE`.
    pub fn get_range(&self, start: i64, stop: i64) -> Vec<ZSetEntry> {
        match normalize_range(self.len(), start, stop) {
            Some((skip, take)) => self.sorted.iter().skip(skip).take(take).cloned().collect(),
            None => vec![],
        }
    }

    /// Entries with reverse rank in `[start, stop]`, highest score first.
    pub fn get_rev_range(&self, start: i64, stop: i64) -> Vec<ZSetEntry> {
        match normalize_range(self.len(), start, stop) {
            Some((skip, take)) => self
                .sorted
                .iter()
                .rev()
                .skip(skip)
                .take(take)
                .cloned()
                .collect(),
            None => vec![],
        }
    }

    /// Removes entries with ascending rank in `[start, stop]`, as
    /// `ZREMRANGEBYRANK` does.
    pub fn remove_range_by_rank(&mut self, start: i64, stop: i64) -> usize {
        let doomed = self.get_range(start, stop);
        for entry in &doomed {
            self.remove(&entry.member);
        }
        doomed.len()
    }
}

/// Resolves Redis-style inclusive rank bounds into `(skip, take)`.
/// Returns `None` when the window selects nothing.
fn normalize_range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = len as i64;
    if len == 0 {
        return None;
    }
    let start = if start < 0 { len + start } else { start }.max(0);
    let stop = if stop < 0 { len + stop } else { stop }.min(len - 1);
    if start > stop || start >= len {
        return None;
    }
    Some((start as usize, (stop - start + 1) as usize))
}
